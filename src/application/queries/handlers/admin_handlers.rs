//! Admin Query Handlers

use crate::application::error::ApplicationError;
use crate::application::log_dispatch::LogDispatcher;
use crate::application::ports::LogRecord;
use crate::application::queries::RecentLogs;

/// 默认返回条数
pub const DEFAULT_LOG_LIMIT: usize = 50;

/// RecentLogs Handler
///
/// admin token 作为不透明的 Bearer 凭据比对；未配置 token 时管理端关闭
pub struct RecentLogsHandler {
    log: LogDispatcher,
    admin_token: Option<String>,
    max_limit: usize,
}

impl RecentLogsHandler {
    pub fn new(log: LogDispatcher, admin_token: Option<String>, max_limit: usize) -> Self {
        Self {
            log,
            admin_token: admin_token.filter(|t| !t.is_empty()),
            max_limit: max_limit.max(1),
        }
    }

    fn authorize(&self, presented: Option<&str>) -> Result<(), ApplicationError> {
        match (&self.admin_token, presented) {
            (Some(expected), Some(presented)) if constant_time_eq(expected, presented) => Ok(()),
            _ => Err(ApplicationError::Unauthorized),
        }
    }

    pub async fn handle(&self, query: RecentLogs) -> Result<Vec<LogRecord>, ApplicationError> {
        self.authorize(query.bearer_token.as_deref())?;

        let limit = query
            .limit
            .unwrap_or(DEFAULT_LOG_LIMIT)
            .clamp(1, self.max_limit);

        let Some(sink) = self.log.sink() else {
            return Ok(Vec::new());
        };
        let records = sink.recent(limit).await?;

        tracing::info!(limit = limit, returned = records.len(), "Admin logs read");
        Ok(records)
    }
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{LogSinkError, StoryLogPort};
    use crate::domain::story::GenerationId;
    use async_trait::async_trait;
    use std::sync::Arc;

    struct FixedSink(usize);

    #[async_trait]
    impl StoryLogPort for FixedSink {
        async fn append(&self, _record: LogRecord) -> Result<(), LogSinkError> {
            Ok(())
        }

        async fn recent(&self, limit: usize) -> Result<Vec<LogRecord>, LogSinkError> {
            Ok((0..self.0.min(limit))
                .map(|_| LogRecord::generation(GenerationId::new(), "s", serde_json::json!({})))
                .collect())
        }
    }

    fn handler(token: Option<&str>) -> RecentLogsHandler {
        RecentLogsHandler::new(
            LogDispatcher::new(Arc::new(FixedSink(300))),
            token.map(str::to_string),
            200,
        )
    }

    fn query(limit: Option<usize>, token: Option<&str>) -> RecentLogs {
        RecentLogs {
            limit,
            bearer_token: token.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_token_required() {
        let h = handler(Some("secret"));
        assert!(matches!(
            h.handle(query(None, None)).await,
            Err(ApplicationError::Unauthorized)
        ));
        assert!(matches!(
            h.handle(query(None, Some("guess"))).await,
            Err(ApplicationError::Unauthorized)
        ));
        assert_eq!(h.handle(query(None, Some("secret"))).await.unwrap().len(), 50);
    }

    #[tokio::test]
    async fn test_unconfigured_token_locks_endpoint() {
        let h = handler(Some(""));
        assert!(matches!(
            h.handle(query(None, Some(""))).await,
            Err(ApplicationError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn test_limit_is_clamped() {
        let h = handler(Some("t"));
        assert_eq!(h.handle(query(Some(1000), Some("t"))).await.unwrap().len(), 200);
        assert_eq!(h.handle(query(Some(0), Some("t"))).await.unwrap().len(), 1);
    }
}
