//! 应用层 - 命令（写操作）
//!
//! CQRS 命令侧：故事生成、对话回合、语音合成

mod chat_commands;
mod story_commands;
mod tts_commands;

pub mod handlers;

pub use chat_commands::*;
pub use story_commands::*;
pub use tts_commands::*;
