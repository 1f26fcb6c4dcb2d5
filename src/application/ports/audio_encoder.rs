//! Audio Encoder Port - 录音规范化抽象
//!
//! 把任意格式的录音转换为上游可接受的规范 WAV：
//! 单声道、16 kHz、16 位 PCM、最长 8 秒

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use thiserror::Error;

/// 规范采样率（Hz）
pub const TARGET_SAMPLE_RATE: u32 = 16_000;
/// 最长时长（秒）
pub const MAX_DURATION_SECS: u32 = 8;
/// 规范输出的最大样本数
pub const MAX_ENCODED_SAMPLES: usize = (TARGET_SAMPLE_RATE * MAX_DURATION_SECS) as usize;
/// 规范 WAV 头长度
pub const WAV_HEADER_LEN: usize = 44;
/// 规范输出的 MIME
pub const WAV_MIME: &str = "audio/wav";

/// 编码错误
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Input too large: {size} bytes (limit {limit})")]
    TooLarge { size: usize, limit: usize },

    #[error("Decoding error: {0}")]
    DecodeError(String),

    #[error("Encoding error: {0}")]
    EncodingError(String),
}

/// 原始音频（录音或收到的音频，格式任意）
#[derive(Debug, Clone)]
pub struct AudioClip {
    pub bytes: Vec<u8>,
    pub mime_type: String,
    /// 已知时的原始采样率
    pub sample_rate: Option<u32>,
    /// 已知时的原始声道数
    pub channel_count: Option<u16>,
}

impl AudioClip {
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
            sample_rate: None,
            channel_count: None,
        }
    }

    /// 从 base64 构建（允许 data URL 前缀）
    pub fn from_base64(data: &str, mime_type: impl Into<String>) -> Result<Self, EncodeError> {
        let payload = match data.split_once(";base64,") {
            Some((_, rest)) => rest,
            None => data,
        };
        let bytes = BASE64
            .decode(payload.trim())
            .map_err(|e| EncodeError::InvalidInput(format!("Invalid base64 audio: {}", e)))?;
        Ok(Self::new(bytes, mime_type))
    }

    pub fn to_base64(&self) -> String {
        BASE64.encode(&self.bytes)
    }

    /// 容器格式名（去掉 `audio/` 前缀和参数）
    pub fn container_format(&self) -> String {
        container_format(&self.mime_type)
    }
}

/// 从 MIME 中取容器格式名，如 `audio/webm;codecs=opus` -> `webm`
pub fn container_format(mime_type: &str) -> String {
    let base = mime_type.split(';').next().unwrap_or_default().trim();
    let subtype = base.rsplit('/').next().unwrap_or(base);
    match subtype {
        "x-wav" | "wave" | "vnd.wave" => "wav".to_string(),
        "mpeg" => "mp3".to_string(),
        "x-m4a" => "m4a".to_string(),
        other => other.to_lowercase(),
    }
}

/// 规范化后的音频
#[derive(Debug, Clone)]
pub struct EncodedAudio {
    /// 完整 WAV 文件（44 字节头 + PCM16 数据）
    pub wav: Vec<u8>,
    /// 输出样本数
    pub num_samples: usize,
    /// 解码得到的原始采样率
    pub source_sample_rate: u32,
    /// 解码得到的原始声道数
    pub source_channels: u16,
}

impl EncodedAudio {
    pub fn mime_type(&self) -> &'static str {
        WAV_MIME
    }

    pub fn to_base64(&self) -> String {
        BASE64.encode(&self.wav)
    }

    pub fn duration_ms(&self) -> u64 {
        self.num_samples as u64 * 1000 / TARGET_SAMPLE_RATE as u64
    }
}

/// WAV 头信息
#[derive(Debug, Clone)]
pub struct AudioInfo {
    /// 时长（毫秒）
    pub duration_ms: u64,
    /// 采样率
    pub sample_rate: u32,
    /// 声道数
    pub channels: u16,
    /// 位深度
    pub bits_per_sample: u16,
    /// data chunk 大小
    pub data_size: usize,
}

/// Audio Encoder Port
#[async_trait]
pub trait AudioEncoderPort: Send + Sync {
    /// 解码 → 下混 → 重采样 → 截断 → 写出规范 WAV
    ///
    /// 无法解码时返回 `EncodeError::DecodeError`，调用方应转发原始录音
    async fn encode(&self, clip: &AudioClip) -> Result<EncodedAudio, EncodeError>;

    /// 读取 WAV 头信息（不解码）
    fn get_audio_info(&self, wav_data: &[u8]) -> Result<AudioInfo, EncodeError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_container_format() {
        assert_eq!(container_format("audio/webm;codecs=opus"), "webm");
        assert_eq!(container_format("audio/x-wav"), "wav");
        assert_eq!(container_format("audio/mpeg"), "mp3");
        assert_eq!(container_format("audio/mp4"), "mp4");
    }

    #[test]
    fn test_clip_from_data_url() {
        let clip = AudioClip::from_base64("data:audio/wav;base64,AQID", "audio/wav").unwrap();
        assert_eq!(clip.bytes, vec![1, 2, 3]);
        assert!(AudioClip::from_base64("%%%", "audio/wav").is_err());
    }

    #[test]
    fn test_max_samples() {
        assert_eq!(MAX_ENCODED_SAMPLES, 128_000);
    }
}
