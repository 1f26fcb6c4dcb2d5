//! Story HTTP Handlers

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::application::GenerateStoryCommand;
use crate::infrastructure::http::dto::{ApiResponse, GenerateStoryRequest, StoryResponse};
use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::http::state::AppState;

/// 根据种子生成双语故事
///
/// 模型失败时返回兜底故事，不会因上游故障报错
pub async fn generate_story(
    State(state): State<Arc<AppState>>,
    Json(req): Json<GenerateStoryRequest>,
) -> Result<Json<ApiResponse<StoryResponse>>, ApiError> {
    let result = state
        .generate_story_handler
        .handle(GenerateStoryCommand { seed: req.seed })
        .await?;

    Ok(Json(ApiResponse::success(result.into())))
}
