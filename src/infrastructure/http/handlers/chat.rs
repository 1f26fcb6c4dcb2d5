//! Chat HTTP Handlers

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::application::ports::AudioClip;
use crate::application::{ApplicationError, ChatTurnCommand, ResetConversationCommand};
use crate::infrastructure::http::dto::{
    ApiResponse, ChatReplyResponse, ChatTurnRequest, ResetConversationRequest,
    ResetConversationResult,
};
use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::http::state::AppState;

/// 发送一个对话回合（文字和/或 base64 录音）
pub async fn chat_turn(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChatTurnRequest>,
) -> Result<Json<ApiResponse<ChatReplyResponse>>, ApiError> {
    let audio = req
        .audio
        .map(|a| AudioClip::from_base64(&a.data, a.mime_type))
        .transpose()
        .map_err(ApplicationError::from)?;

    let cmd = ChatTurnCommand {
        conversation_id: req.conversation_id,
        generation_id: req.generation_id,
        language: req.language,
        story: req.story,
        text: req.text,
        audio,
    };

    let reply = state.chat_turn_handler.handle(cmd).await?;

    Ok(Json(ApiResponse::success(reply.into())))
}

/// 重置会话，会话不存在时同样成功
pub async fn reset_conversation(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ResetConversationRequest>,
) -> Result<Json<ApiResponse<ResetConversationResult>>, ApiError> {
    let result = state
        .reset_conversation_handler
        .handle(ResetConversationCommand {
            conversation_id: req.conversation_id,
        })
        .await?;

    Ok(Json(ApiResponse::success(ResetConversationResult {
        conversation_id: result.conversation_id,
        existed: result.existed,
    })))
}
