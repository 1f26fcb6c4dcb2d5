//! Application Ports - 出站端口定义
//!
//! 定义应用层与基础设施层的抽象接口

mod audio_encoder;
mod conversation_store;
mod llm;
mod story_log;
mod tts_cache;
mod tts_engine;

pub use audio_encoder::{
    container_format, AudioClip, AudioEncoderPort, AudioInfo, EncodeError, EncodedAudio,
    MAX_DURATION_SECS, MAX_ENCODED_SAMPLES, TARGET_SAMPLE_RATE, WAV_HEADER_LEN, WAV_MIME,
};
pub use conversation_store::{ConversationStoreError, ConversationStorePort};
pub use llm::{
    ChatMessage, ChatReply, ChatRequest, ChatRole, ContentPart, InputAudio, LlmError, LlmPort,
    MessageContent, ReplyAudio,
};
pub use story_log::{LogKind, LogRecord, LogSinkError, StoryLogPort};
pub use tts_cache::{generate_cache_key, CacheStats, TtsCachePort};
pub use tts_engine::{SpeechAudio, SpeechRequest, TtsEnginePort, TtsError};
