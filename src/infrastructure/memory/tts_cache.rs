//! In-Memory LRU TTS Cache Implementation

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::application::ports::{CacheStats, SpeechAudio, TtsCachePort};

/// 内部缓存条目
#[derive(Debug, Clone)]
struct CachedSpeech {
    audio: SpeechAudio,
    size_bytes: u64,
    /// 访问序号，越大越新
    last_accessed: u64,
}

/// 内存 TTS 缓存
///
/// 按总字节数限容，超出时淘汰最久未访问的条目
pub struct InMemoryTtsCache {
    entries: DashMap<String, CachedSpeech>,
    max_size_bytes: u64,
    current_size: AtomicU64,
    clock: AtomicU64,
    hit_count: AtomicU64,
    miss_count: AtomicU64,
}

impl InMemoryTtsCache {
    pub fn new(max_size_bytes: u64) -> Self {
        Self {
            entries: DashMap::new(),
            max_size_bytes,
            current_size: AtomicU64::new(0),
            clock: AtomicU64::new(0),
            hit_count: AtomicU64::new(0),
            miss_count: AtomicU64::new(0),
        }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed)
    }

    /// LRU 淘汰，缓存为空时返回 false
    fn evict_lru(&self) -> bool {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|entry| entry.last_accessed)
            .map(|entry| entry.key().clone());

        match oldest.and_then(|key| self.entries.remove(&key)) {
            Some((key, entry)) => {
                self.current_size
                    .fetch_sub(entry.size_bytes, Ordering::Relaxed);
                tracing::debug!(
                    cache_key = %key,
                    size_bytes = entry.size_bytes,
                    "LRU evicted TTS cache entry"
                );
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl TtsCachePort for InMemoryTtsCache {
    async fn get(&self, cache_key: &str) -> Option<SpeechAudio> {
        match self.entries.get_mut(cache_key) {
            Some(mut entry) => {
                // LRU touch
                entry.last_accessed = self.tick();
                self.hit_count.fetch_add(1, Ordering::Relaxed);
                Some(entry.audio.clone())
            }
            None => {
                self.miss_count.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    async fn put(&self, cache_key: &str, audio: SpeechAudio) {
        let size = audio.size() as u64;
        if size > self.max_size_bytes {
            tracing::debug!(
                cache_key = %cache_key,
                size_bytes = size,
                "Audio larger than cache capacity, not cached"
            );
            return;
        }

        if let Some((_, old)) = self.entries.remove(cache_key) {
            self.current_size.fetch_sub(old.size_bytes, Ordering::Relaxed);
        }

        // 淘汰以腾出空间
        while self.current_size.load(Ordering::Relaxed) + size > self.max_size_bytes {
            if !self.evict_lru() {
                break;
            }
        }

        let entry = CachedSpeech {
            audio,
            size_bytes: size,
            last_accessed: self.tick(),
        };
        self.entries.insert(cache_key.to_string(), entry);
        self.current_size.fetch_add(size, Ordering::Relaxed);

        tracing::debug!(cache_key = %cache_key, size_bytes = size, "Speech cached");
    }

    async fn stats(&self) -> CacheStats {
        CacheStats {
            total_entries: self.entries.len(),
            total_size_bytes: self.current_size.load(Ordering::Relaxed),
            max_size_bytes: self.max_size_bytes,
            hit_count: self.hit_count.load(Ordering::Relaxed),
            miss_count: self.miss_count.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn audio(size: usize) -> SpeechAudio {
        SpeechAudio::new(vec![0; size], "audio/mpeg")
    }

    #[tokio::test]
    async fn test_hit_and_miss() {
        let cache = InMemoryTtsCache::new(100);
        assert!(cache.get("a").await.is_none());
        cache.put("a", audio(10)).await;
        assert_eq!(cache.get("a").await.unwrap().size(), 10);

        let stats = cache.stats().await;
        assert_eq!(stats.total_entries, 1);
        assert_eq!(stats.total_size_bytes, 10);
        assert_eq!(stats.hit_count, 1);
        assert_eq!(stats.miss_count, 1);
    }

    #[tokio::test]
    async fn test_lru_eviction() {
        let cache = InMemoryTtsCache::new(30);
        cache.put("a", audio(10)).await;
        cache.put("b", audio(10)).await;
        cache.put("c", audio(10)).await;
        // 访问 a，使 b 成为最久未访问
        cache.get("a").await;
        cache.put("d", audio(10)).await;

        assert!(cache.get("b").await.is_none());
        assert!(cache.get("a").await.is_some());
        assert!(cache.get("d").await.is_some());
        assert_eq!(cache.stats().await.total_size_bytes, 30);
    }

    #[tokio::test]
    async fn test_oversized_and_replaced_entries() {
        let cache = InMemoryTtsCache::new(20);
        cache.put("big", audio(21)).await;
        assert!(cache.get("big").await.is_none());

        cache.put("k", audio(5)).await;
        cache.put("k", audio(8)).await;
        let stats = cache.stats().await;
        assert_eq!(stats.total_entries, 1);
        assert_eq!(stats.total_size_bytes, 8);
    }
}
