//! HTTP Routes
//!
//! API Endpoints:
//! - /api/ping              GET   存活检查
//! - /api/health            GET   上游服务健康检查
//! - /api/story/generate    POST  根据种子生成双语故事
//! - /api/chat/turn         POST  对话回合（语音 → 文本 → TTS 逐级降级）
//! - /api/chat/reset        POST  重置会话
//! - /api/tts               POST  合成语音，返回音频
//! - /api/admin/logs        GET   最近的生成/对话日志（Bearer token）

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use super::handlers;
use super::state::AppState;

/// 创建所有路由
pub fn create_routes() -> Router<Arc<AppState>> {
    Router::new().nest("/api", api_routes())
}

/// API 路由
fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/ping", get(handlers::ping))
        .route("/health", get(handlers::health))
        .route("/story/generate", post(handlers::generate_story))
        .nest("/chat", chat_routes())
        .route("/tts", post(handlers::synthesize))
        .route("/admin/logs", get(handlers::recent_logs))
}

/// Chat 路由
fn chat_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/turn", post(handlers::chat_turn))
        .route("/reset", post(handlers::reset_conversation))
}
