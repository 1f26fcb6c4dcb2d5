//! HTTP Log Sink - 远程日志存储
//!
//! 外部 API:
//! POST {url}            body: LogRecord
//! GET  {url}?limit=N    → [LogRecord] 或 {"records": [...]}，按时间倒序

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Client;
use std::time::Duration;

use crate::application::ports::{LogRecord, LogSinkError, StoryLogPort};

/// HTTP Log Sink 配置
#[derive(Debug, Clone)]
pub struct HttpLogSinkConfig {
    pub url: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl HttpLogSinkConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            api_key: None,
            timeout_secs: 10,
        }
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key.filter(|k| !k.is_empty());
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

pub struct HttpLogSink {
    client: Client,
    url: String,
}

fn map_send_error(e: reqwest::Error) -> LogSinkError {
    if e.is_timeout() {
        LogSinkError::NetworkError("Log sink request timed out".to_string())
    } else {
        LogSinkError::NetworkError(e.to_string())
    }
}

/// 兼容裸数组与 `{"records": [...]}` 两种返回
fn parse_records(body: serde_json::Value) -> Result<Vec<LogRecord>, LogSinkError> {
    let list = match body {
        serde_json::Value::Object(mut map) => map
            .remove("records")
            .ok_or_else(|| LogSinkError::ServiceError("Missing records field".to_string()))?,
        other => other,
    };
    serde_json::from_value(list).map_err(|e| LogSinkError::SerializationError(e.to_string()))
}

impl HttpLogSink {
    pub fn new(config: HttpLogSinkConfig) -> Result<Self, LogSinkError> {
        let mut headers = HeaderMap::new();
        if let Some(key) = &config.api_key {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {}", key))
                    .map_err(|e| LogSinkError::ServiceError(e.to_string()))?,
            );
        }

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LogSinkError::NetworkError(e.to_string()))?;

        Ok(Self {
            client,
            url: config.url,
        })
    }
}

#[async_trait]
impl StoryLogPort for HttpLogSink {
    async fn append(&self, record: LogRecord) -> Result<(), LogSinkError> {
        let response = self
            .client
            .post(&self.url)
            .json(&record)
            .send()
            .await
            .map_err(map_send_error)?;

        if !response.status().is_success() {
            return Err(LogSinkError::ServiceError(format!(
                "HTTP {}",
                response.status()
            )));
        }
        Ok(())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<LogRecord>, LogSinkError> {
        let response = self
            .client
            .get(&self.url)
            .query(&[("limit", limit)])
            .send()
            .await
            .map_err(map_send_error)?;

        if !response.status().is_success() {
            return Err(LogSinkError::ServiceError(format!(
                "HTTP {}",
                response.status()
            )));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| LogSinkError::SerializationError(e.to_string()))?;

        let mut records = parse_records(body)?;
        records.truncate(limit);
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::story::GenerationId;
    use axum::extract::{Query, State};
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    type Stored = Arc<Mutex<Vec<LogRecord>>>;

    async fn store(State(stored): State<Stored>, Json(record): Json<LogRecord>) {
        stored.lock().unwrap().push(record);
    }

    async fn list(
        State(stored): State<Stored>,
        Query(params): Query<HashMap<String, usize>>,
    ) -> Json<serde_json::Value> {
        let limit = params.get("limit").copied().unwrap_or(10);
        let records: Vec<LogRecord> = stored
            .lock()
            .unwrap()
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect();
        Json(json!({ "records": records }))
    }

    #[test]
    fn test_parse_records_shapes() {
        let record = LogRecord::generation(GenerationId::new(), "s", json!({}));
        let bare = serde_json::to_value(vec![record.clone()]).unwrap();
        assert_eq!(parse_records(bare).unwrap().len(), 1);

        let wrapped = json!({ "records": [record] });
        assert_eq!(parse_records(wrapped).unwrap().len(), 1);

        assert!(parse_records(json!({"other": 1})).is_err());
    }

    #[tokio::test]
    async fn test_append_and_recent_over_http() {
        let stored: Stored = Arc::default();
        let router = Router::new()
            .route("/logs", get(list).post(store))
            .with_state(stored.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        let sink =
            HttpLogSink::new(HttpLogSinkConfig::new(format!("http://{}/logs", addr))).unwrap();
        for seed in ["a", "b", "c"] {
            sink.append(LogRecord::generation(GenerationId::new(), seed, json!({})))
                .await
                .unwrap();
        }

        let recent = sink.recent(2).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].seed.as_deref(), Some("c"));
        assert_eq!(stored.lock().unwrap().len(), 3);
    }
}
