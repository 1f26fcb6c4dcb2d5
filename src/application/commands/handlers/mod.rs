//! Command Handlers 实现
//!
//! 所有 CommandHandler 的具体实现

mod chat_handlers;
mod story_handlers;
mod tts_handlers;

pub use chat_handlers::*;
pub use story_handlers::*;
pub use tts_handlers::*;
