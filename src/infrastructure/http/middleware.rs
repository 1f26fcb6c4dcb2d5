//! HTTP Middleware
//!
//! 请求耗时与 HTTP 状态码日志

use std::time::{Duration, Instant};

use axum::{extract::Request, http::StatusCode, middleware::Next, response::Response};

/// 超过该耗时的请求记为慢请求（对话回合包含三层上游调用）
const SLOW_REQUEST: Duration = Duration::from_secs(10);

/// HTTP 状态码错误日志中间件
///
/// 业务错误（errno != 0）统一返回 200，已在 `ApiError::into_response()` 中记录；
/// 这里只处理框架层拒绝（请求体超限、JSON 解析失败、路由不存在）和慢请求。
pub async fn error_logging_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let started = Instant::now();

    let response = next.run(request).await;
    let status = response.status();
    let elapsed_ms = started.elapsed().as_millis() as u64;

    if status.is_server_error() {
        tracing::error!(
            method = %method,
            uri = %uri,
            status = status.as_u16(),
            elapsed_ms,
            "HTTP server error"
        );
    } else if status == StatusCode::PAYLOAD_TOO_LARGE {
        tracing::warn!(
            method = %method,
            uri = %uri,
            elapsed_ms,
            "Request body exceeds limit, recording may be too long"
        );
    } else if status.is_client_error() {
        tracing::warn!(
            method = %method,
            uri = %uri,
            status = status.as_u16(),
            elapsed_ms,
            "HTTP client error"
        );
    } else if started.elapsed() >= SLOW_REQUEST {
        tracing::warn!(method = %method, uri = %uri, elapsed_ms, "Slow request");
    }

    response
}
