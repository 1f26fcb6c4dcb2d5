//! Story Log Port - 只追加的生成/对话日志
//!
//! 每次故事生成、每个对话回合写一条记录，供管理端审阅。
//! 写入失败只记日志，不影响用户请求。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::conversation::ConversationId;
use crate::domain::story::{GenerationId, Language};

/// Log Sink 错误
#[derive(Debug, Error)]
pub enum LogSinkError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Service error: {0}")]
    ServiceError(String),
}

/// 记录类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogKind {
    Generation,
    ChatTurn,
}

/// 日志记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    pub id: Uuid,
    pub kind: LogKind,
    pub generation_id: GenerationId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<ConversationId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<Language>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<String>,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl LogRecord {
    pub fn generation(
        generation_id: GenerationId,
        seed: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: LogKind::Generation,
            generation_id,
            conversation_id: None,
            language: None,
            seed: Some(seed.into()),
            payload,
            created_at: Utc::now(),
        }
    }

    pub fn chat_turn(
        generation_id: GenerationId,
        conversation_id: ConversationId,
        language: Language,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: LogKind::ChatTurn,
            generation_id,
            conversation_id: Some(conversation_id),
            language: Some(language),
            seed: None,
            payload,
            created_at: Utc::now(),
        }
    }
}

/// Story Log Port
#[async_trait]
pub trait StoryLogPort: Send + Sync {
    /// 追加一条记录
    async fn append(&self, record: LogRecord) -> Result<(), LogSinkError>;

    /// 最近的 `limit` 条记录，按时间倒序
    async fn recent(&self, limit: usize) -> Result<Vec<LogRecord>, LogSinkError>;
}
