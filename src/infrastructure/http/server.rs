//! HTTP Server
//!
//! Axum HTTP 服务器启动和配置

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::Router;
use http::header::{AUTHORIZATION, CONTENT_TYPE};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

use super::middleware::error_logging_middleware;
use super::routes::create_routes;
use super::state::AppState;
use crate::config;

/// 服务器配置
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// 请求体上限（字节），录音以 base64 放在 JSON 里
    pub body_limit: usize,
    /// 前端页面目录，设置后作为 `/api` 之外的兜底路由
    pub static_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5060,
            body_limit: 16 * 1024 * 1024,
            static_dir: None,
        }
    }
}

impl ServerConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    pub fn with_body_limit(mut self, bytes: usize) -> Self {
        self.body_limit = bytes;
        self
    }

    pub fn with_static_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.static_dir = dir;
        self
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl From<&config::ServerConfig> for ServerConfig {
    fn from(c: &config::ServerConfig) -> Self {
        let static_dir = c.static_files.enabled.then(|| c.static_files.dir.clone());
        Self::new(&c.host, c.port)
            .with_body_limit(c.body_limit_bytes)
            .with_static_dir(static_dir)
    }
}

/// 构建 Router
pub fn build_router(state: Arc<AppState>, config: &ServerConfig) -> Router {
    // 前端可能与 API 分开部署
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .expose_headers(Any)
        .max_age(Duration::from_secs(3600));

    let mut router = create_routes();
    if let Some(dir) = &config.static_dir {
        router = router.fallback_service(ServeDir::new(dir).append_index_html_on_directories(true));
    }

    router
        .layer(DefaultBodyLimit::max(config.body_limit))
        .layer(middleware::from_fn(error_logging_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// HTTP 服务器
pub struct HttpServer {
    config: ServerConfig,
    state: Arc<AppState>,
}

impl HttpServer {
    pub fn new(config: ServerConfig, state: AppState) -> Self {
        Self {
            config,
            state: Arc::new(state),
        }
    }

    /// 启动服务器，`shutdown_signal` 完成后优雅关闭
    pub async fn run_with_shutdown<F>(self, shutdown_signal: F) -> Result<(), std::io::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let router = build_router(self.state, &self.config);
        let addr = self.config.addr();

        let listener = TcpListener::bind(&addr).await?;
        info!(
            addr = %addr,
            body_limit = self.config.body_limit,
            static_dir = ?self.config.static_dir,
            "HTTP server listening"
        );

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal)
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_app_config() {
        let mut app = config::ServerConfig::default();
        app.port = 8088;
        app.body_limit_bytes = 1024;

        let server = ServerConfig::from(&app);
        assert_eq!(server.addr(), "0.0.0.0:8088");
        assert_eq!(server.body_limit, 1024);
        assert!(server.static_dir.is_none());

        app.static_files.enabled = true;
        let server = ServerConfig::from(&app);
        assert_eq!(server.static_dir, Some(PathBuf::from("web")));
    }
}
