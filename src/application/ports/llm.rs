//! LLM Port - 文本/语音模型抽象
//!
//! 文本模型与语音模型共用同一个端口，区别只在消息内容：
//! 语音模型的用户消息带 `input_audio` 片段，回复可能附带音频。

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

/// LLM 错误
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Service error: {0}")]
    ServiceError(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// 请求成功但没有可用文本
    #[error("Empty reply")]
    EmptyReply,

    #[error("Model disabled: {0}")]
    Disabled(String),
}

impl LlmError {
    /// 是否属于上游不可用（用于日志分类）
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            LlmError::NetworkError(_) | LlmError::Timeout | LlmError::ServiceError(_)
        )
    }
}

/// 消息角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// 输入音频片段
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InputAudio {
    /// base64 编码
    pub data: String,
    /// 容器格式，如 `wav`、`webm`
    pub format: String,
    pub mime_type: String,
}

/// 多模态消息片段
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    InputAudio { input_audio: InputAudio },
}

/// 消息内容：纯文本或片段数组
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

/// 对话消息
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: MessageContent,
}

impl ChatMessage {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: MessageContent::Text(text.into()),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: MessageContent::Text(text.into()),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: MessageContent::Text(text.into()),
        }
    }

    /// 带音频的用户消息
    pub fn user_with_audio(text: impl Into<String>, audio: InputAudio) -> Self {
        Self {
            role: ChatRole::User,
            content: MessageContent::Parts(vec![
                ContentPart::Text { text: text.into() },
                ContentPart::InputAudio { input_audio: audio },
            ]),
        }
    }

    pub fn has_audio(&self) -> bool {
        match &self.content {
            MessageContent::Text(_) => false,
            MessageContent::Parts(parts) => parts
                .iter()
                .any(|p| matches!(p, ContentPart::InputAudio { .. })),
        }
    }
}

/// 补全请求
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub max_tokens: Option<u32>,
    /// 关联 ID，写入日志
    pub attempt_id: Option<String>,
}

impl ChatRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            temperature: None,
            top_p: None,
            max_tokens: None,
            attempt_id: None,
        }
    }

    pub fn with_sampling(mut self, temperature: f32, top_p: f32, max_tokens: u32) -> Self {
        self.temperature = Some(temperature);
        self.top_p = Some(top_p);
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_attempt_id(mut self, attempt_id: impl Into<String>) -> Self {
        self.attempt_id = Some(attempt_id.into());
        self
    }
}

/// 回复附带的音频
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyAudio {
    /// base64 编码
    pub data: String,
    pub mime_type: String,
}

/// 补全回复
#[derive(Debug, Clone)]
pub struct ChatReply {
    /// 非空文本
    pub text: String,
    pub audio: Option<ReplyAudio>,
}

/// LLM Port
///
/// 实现必须保证：返回 `Ok` 时 `text` 非空，否则返回 `LlmError::EmptyReply`
#[async_trait]
pub trait LlmPort: Send + Sync {
    async fn complete(&self, request: ChatRequest) -> Result<ChatReply, LlmError>;

    /// 检查模型服务是否可用
    async fn health_check(&self) -> bool {
        true
    }
}
