//! Conversation Context - Errors

use thiserror::Error;

use super::ConversationId;

#[derive(Debug, Error)]
pub enum ConversationError {
    #[error("对话不存在: {0}")]
    NotFound(ConversationId),

    #[error("对话已有进行中的回合: {0}")]
    TurnInFlight(ConversationId),

    #[error("没有进行中的回合: {0}")]
    NoTurnInFlight(ConversationId),

    #[error("无效的回合内容: {0}")]
    InvalidTurn(String),
}
