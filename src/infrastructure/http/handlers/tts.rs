//! TTS Handlers

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, StatusCode},
    response::Response,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::application::SynthesizeSpeechCommand;
use crate::domain::story::Language;
use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::http::state::AppState;

/// 缓存命中标记头
pub const CACHE_HEADER: &str = "x-tts-cache";

#[derive(Debug, Deserialize)]
pub struct SynthesizeRequest {
    pub text: String,
    pub language: Language,
    #[serde(default)]
    pub voice: Option<String>,
}

/// 合成语音，直接返回音频
pub async fn synthesize(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SynthesizeRequest>,
) -> Result<Response, ApiError> {
    let cmd = SynthesizeSpeechCommand {
        text: req.text,
        language: req.language,
        voice: req.voice,
    };

    let result = state.synthesize_speech_handler.handle(cmd).await?;

    let content_type = HeaderValue::from_str(&result.audio.mime_type)
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, result.audio.bytes.len())
        .header(CACHE_HEADER, if result.cached { "hit" } else { "miss" })
        .body(Body::from(result.audio.bytes))
        .map_err(|e| ApiError::Internal(e.to_string()))
}
