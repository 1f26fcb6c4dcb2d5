//! Admin Handlers

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::application::ports::LogRecord;
use crate::application::RecentLogs;
use crate::infrastructure::http::dto::ApiResponse;
use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::http::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LogsParams {
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct LogsResponse {
    pub total: usize,
    pub records: Vec<LogRecord>,
}

/// 取 `Authorization: Bearer <token>` 中的 token
fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
}

/// 最近的生成/对话日志，按时间倒序
pub async fn recent_logs(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<LogsParams>,
) -> Result<Json<ApiResponse<LogsResponse>>, ApiError> {
    let records = state
        .recent_logs_handler
        .handle(RecentLogs {
            limit: params.limit,
            bearer_token: bearer_token(&headers),
        })
        .await?;

    Ok(Json(ApiResponse::success(LogsResponse {
        total: records.len(),
        records,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_token() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer s3cret"));
        assert_eq!(bearer_token(&headers).as_deref(), Some("s3cret"));
    }
}
