//! 应用层错误定义
//!
//! 统一的命令/查询错误类型

use thiserror::Error;

use crate::application::ports::{
    ConversationStoreError, EncodeError, LlmError, LogSinkError, TtsError,
};
use crate::domain::conversation::ConversationError;
use crate::domain::story::StoryError;

/// 应用层错误
#[derive(Debug, Error)]
pub enum ApplicationError {
    /// 资源未找到
    #[error("{resource_type} not found: {id}")]
    NotFound {
        resource_type: &'static str,
        id: String,
    },

    /// 验证错误
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// 并发冲突（同一会话已有进行中的回合）
    #[error("Conflict: {0}")]
    Conflict(String),

    /// 未授权
    #[error("Unauthorized")]
    Unauthorized,

    /// 上游服务不可用（所有降级都已失败）
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// 上游内容无效
    #[error("Invalid content: {0}")]
    InvalidContent(String),

    /// 音频无法解码
    #[error("Decode error: {0}")]
    DecodeError(String),

    /// 内部错误
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl ApplicationError {
    /// 创建 NotFound 错误
    pub fn not_found(resource_type: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            resource_type,
            id: id.to_string(),
        }
    }

    /// 创建验证错误
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError(message.into())
    }

    /// 创建冲突错误
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    /// 创建上游不可用错误
    pub fn upstream(message: impl Into<String>) -> Self {
        Self::UpstreamUnavailable(message.into())
    }

    /// 创建内部错误
    pub fn internal(message: impl Into<String>) -> Self {
        Self::InternalError(message.into())
    }
}

impl From<StoryError> for ApplicationError {
    fn from(err: StoryError) -> Self {
        match err {
            StoryError::InvalidContent(msg) => Self::InvalidContent(msg),
            other => Self::ValidationError(other.to_string()),
        }
    }
}

impl From<ConversationError> for ApplicationError {
    fn from(err: ConversationError) -> Self {
        match err {
            ConversationError::NotFound(id) => Self::not_found("Conversation", id),
            ConversationError::TurnInFlight(id) => {
                Self::conflict(format!("conversation {} already has a turn in flight", id))
            }
            ConversationError::NoTurnInFlight(_) => Self::InternalError(err.to_string()),
            ConversationError::InvalidTurn(msg) => Self::ValidationError(msg),
        }
    }
}

impl From<ConversationStoreError> for ApplicationError {
    fn from(err: ConversationStoreError) -> Self {
        match err {
            ConversationStoreError::NotFound(id) => Self::not_found("Conversation", id),
            ConversationStoreError::AlreadyExists(id) => {
                Self::conflict(format!("conversation {} already exists", id))
            }
            ConversationStoreError::Conversation(inner) => inner.into(),
        }
    }
}

impl From<LlmError> for ApplicationError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::InvalidResponse(msg) => Self::InvalidContent(msg),
            other => Self::UpstreamUnavailable(other.to_string()),
        }
    }
}

impl From<TtsError> for ApplicationError {
    fn from(err: TtsError) -> Self {
        Self::UpstreamUnavailable(err.to_string())
    }
}

impl From<EncodeError> for ApplicationError {
    fn from(err: EncodeError) -> Self {
        match err {
            EncodeError::DecodeError(msg) => Self::DecodeError(msg),
            EncodeError::InvalidInput(msg) => Self::ValidationError(msg),
            EncodeError::TooLarge { .. } => Self::ValidationError(err.to_string()),
            EncodeError::EncodingError(msg) => Self::InternalError(msg),
        }
    }
}

impl From<LogSinkError> for ApplicationError {
    fn from(err: LogSinkError) -> Self {
        Self::InternalError(err.to_string())
    }
}
