//! Memory Layer - In-Memory State Management
//!
//! 实现 ConversationStore 和 TtsCache，管理对话会话与合成音频的内存状态

mod conversation_store;
mod tts_cache;

pub use conversation_store::InMemoryConversationStore;
pub use tts_cache::InMemoryTtsCache;
