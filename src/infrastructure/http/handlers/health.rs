//! Health Handlers

use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::application::{ServiceHealth, ServiceHealthResponse};
use crate::infrastructure::http::dto::ApiResponse;
use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::http::state::AppState;

/// 存活检查响应
#[derive(Serialize)]
pub struct PingResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

/// 存活检查，不访问上游
pub async fn ping() -> Json<PingResponse> {
    Json(PingResponse {
        status: "ok",
        service: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// 上游服务健康检查，未启用的服务为 null
pub async fn health(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<ServiceHealthResponse>>, ApiError> {
    let result = state.service_health_handler.handle(ServiceHealth).await?;
    Ok(Json(ApiResponse::success(result)))
}
