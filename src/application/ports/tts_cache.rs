//! TTS Cache Port - 合成音频缓存
//!
//! 相同文本、语言、音色的合成结果可以复用，避免重复调用 TTS 服务

use async_trait::async_trait;

use super::SpeechAudio;
use crate::domain::story::Language;

/// 缓存统计信息
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub total_entries: usize,
    pub total_size_bytes: u64,
    pub max_size_bytes: u64,
    pub hit_count: u64,
    pub miss_count: u64,
}

/// TTS Cache Port
///
/// 按总字节数限容，超出时淘汰最久未访问的条目
#[async_trait]
pub trait TtsCachePort: Send + Sync {
    /// 获取缓存，命中时更新访问时间
    async fn get(&self, cache_key: &str) -> Option<SpeechAudio>;

    /// 写入缓存，单条超过容量上限时忽略
    async fn put(&self, cache_key: &str, audio: SpeechAudio);

    /// 获取缓存统计信息
    async fn stats(&self) -> CacheStats;
}

/// 生成缓存 key
///
/// 使用 md5(text|language|voice) 作为缓存 key
pub fn generate_cache_key(text: &str, language: Language, voice: Option<&str>) -> String {
    let material = format!("{}|{}|{}", text, language, voice.unwrap_or_default());
    format!("{:x}", md5::compute(material.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_varies_by_input() {
        let a = generate_cache_key("hello", Language::En, None);
        assert_eq!(a, generate_cache_key("hello", Language::En, None));
        assert_eq!(a.len(), 32);
        assert_ne!(a, generate_cache_key("hello", Language::Zh, None));
        assert_ne!(a, generate_cache_key("hello", Language::En, Some("alloy")));
    }
}
