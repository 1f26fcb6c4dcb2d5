//! TTS Command Handlers

use std::sync::Arc;
use std::time::Duration;

use crate::application::commands::tts_commands::*;
use crate::application::error::ApplicationError;
use crate::application::ports::{
    generate_cache_key, SpeechRequest, TtsCachePort, TtsEnginePort, TtsError,
};

/// 单次合成的文本长度上限（字符）
pub const MAX_SPEECH_CHARS: usize = 2000;

/// SynthesizeSpeech Handler - 故事朗读，带缓存
pub struct SynthesizeSpeechHandler {
    tts: Option<Arc<dyn TtsEnginePort>>,
    cache: Arc<dyn TtsCachePort>,
    default_voice: Option<String>,
    timeout: Duration,
}

impl SynthesizeSpeechHandler {
    pub fn new(
        tts: Option<Arc<dyn TtsEnginePort>>,
        cache: Arc<dyn TtsCachePort>,
        default_voice: Option<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            tts,
            cache,
            default_voice,
            timeout,
        }
    }

    pub async fn handle(
        &self,
        cmd: SynthesizeSpeechCommand,
    ) -> Result<SynthesizeSpeechResponse, ApplicationError> {
        let text = cmd.text.trim();
        if text.is_empty() {
            return Err(ApplicationError::validation("Text is empty"));
        }
        if text.chars().count() > MAX_SPEECH_CHARS {
            return Err(ApplicationError::validation(format!(
                "Text too long (max {} characters)",
                MAX_SPEECH_CHARS
            )));
        }

        let tts = self
            .tts
            .as_ref()
            .ok_or_else(|| ApplicationError::upstream(TtsError::Disabled.to_string()))?;

        let voice = cmd.voice.or_else(|| self.default_voice.clone());
        let cache_key = generate_cache_key(text, cmd.language, voice.as_deref());

        if let Some(audio) = self.cache.get(&cache_key).await {
            tracing::debug!(cache_key = %cache_key, "TTS cache hit");
            return Ok(SynthesizeSpeechResponse {
                audio,
                cached: true,
            });
        }

        let attempt_id = format!("tts-{}", uuid::Uuid::new_v4());
        let request = SpeechRequest::new(text, cmd.language)
            .with_voice(voice)
            .with_attempt_id(&attempt_id);

        let audio = match tokio::time::timeout(self.timeout, tts.synthesize(request)).await {
            Ok(result) => result?,
            Err(_) => return Err(TtsError::Timeout.into()),
        };

        tracing::info!(
            attempt_id = %attempt_id,
            language = %cmd.language,
            text_chars = text.chars().count(),
            audio_size = audio.size(),
            mime_type = %audio.mime_type,
            "Speech synthesized"
        );

        self.cache.put(&cache_key, audio.clone()).await;

        Ok(SynthesizeSpeechResponse {
            audio,
            cached: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::SpeechAudio;
    use crate::domain::story::Language;
    use crate::infrastructure::memory::InMemoryTtsCache;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingTts {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TtsEnginePort for CountingTts {
        async fn synthesize(&self, request: SpeechRequest) -> Result<SpeechAudio, TtsError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(SpeechAudio::new(request.text.into_bytes(), "audio/mpeg"))
        }
    }

    fn command(text: &str) -> SynthesizeSpeechCommand {
        SynthesizeSpeechCommand {
            text: text.to_string(),
            language: Language::En,
            voice: None,
        }
    }

    #[tokio::test]
    async fn test_second_request_hits_cache() {
        let tts = Arc::new(CountingTts::default());
        let handler = SynthesizeSpeechHandler::new(
            Some(tts.clone()),
            Arc::new(InMemoryTtsCache::new(1024 * 1024)),
            None,
            Duration::from_secs(5),
        );

        let first = handler.handle(command("Hello fox.")).await.unwrap();
        assert!(!first.cached);
        let second = handler.handle(command("Hello fox.")).await.unwrap();
        assert!(second.cached);
        assert_eq!(first.audio, second.audio);
        assert_eq!(tts.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_validation_and_disabled() {
        let handler = SynthesizeSpeechHandler::new(
            None,
            Arc::new(InMemoryTtsCache::new(1024)),
            None,
            Duration::from_secs(5),
        );
        assert!(matches!(
            handler.handle(command("  ")).await,
            Err(ApplicationError::ValidationError(_))
        ));
        assert!(matches!(
            handler.handle(command(&"a".repeat(MAX_SPEECH_CHARS + 1))).await,
            Err(ApplicationError::ValidationError(_))
        ));
        assert!(matches!(
            handler.handle(command("hello")).await,
            Err(ApplicationError::UpstreamUnavailable(_))
        ));
    }
}
