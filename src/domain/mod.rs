//! Domain Layer - 领域层
//!
//! 包含两个限界上下文:
//! - Story Context: 种子、清洗、兜底故事
//! - Conversation Context: 故事之后的追问对话

pub mod conversation;
pub mod story;

// 共享的多路径 JSON 提取
mod json_path;

pub use json_path::{lookup, JsonPathExtractor};
