//! HTTP Handlers

mod admin;
mod chat;
mod health;
mod story;
mod tts;

pub use admin::*;
pub use chat::*;
pub use health::*;
pub use story::*;
pub use tts::*;
