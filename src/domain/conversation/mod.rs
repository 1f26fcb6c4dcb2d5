//! Conversation Context - 对话限界上下文
//!
//! 职责:
//! - 对话会话聚合（有界历史窗口、单回合进行中约束）
//! - 对话回合实体

mod aggregate;
mod entities;
mod errors;
mod value_objects;

pub use aggregate::{ConversationSession, DEFAULT_HISTORY_WINDOW, MIN_HISTORY_WINDOW};
pub use entities::{AudioContent, ConversationTurn, Role};
pub use errors::ConversationError;
pub use value_objects::ConversationId;
