//! LLM Adapter - OpenAI 兼容的 HTTP 客户端实现

mod http_chat_client;

pub use http_chat_client::*;
