//! JSONL File Log Sink - 本地只追加日志
//!
//! 实现 StoryLogPort trait，每条记录一行 JSON

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::application::ports::{LogRecord, LogSinkError, StoryLogPort};

/// JSONL 文件日志
pub struct JsonlFileLogSink {
    path: PathBuf,
    /// 串行化写入，避免行交错
    write_lock: Mutex<()>,
}

impl JsonlFileLogSink {
    /// 创建日志文件所在目录
    pub async fn new(path: impl AsRef<Path>) -> Result<Self, LogSinkError> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| LogSinkError::IoError(e.to_string()))?;
        }

        Ok(Self {
            path,
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl StoryLogPort for JsonlFileLogSink {
    async fn append(&self, record: LogRecord) -> Result<(), LogSinkError> {
        let mut line = serde_json::to_string(&record)
            .map_err(|e| LogSinkError::SerializationError(e.to_string()))?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| LogSinkError::IoError(e.to_string()))?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| LogSinkError::IoError(e.to_string()))?;
        file.flush()
            .await
            .map_err(|e| LogSinkError::IoError(e.to_string()))?;

        tracing::debug!(record_id = %record.id, kind = ?record.kind, "Log record appended");
        Ok(())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<LogRecord>, LogSinkError> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(LogSinkError::IoError(e.to_string())),
        };

        let mut records = Vec::with_capacity(limit);
        for line in content.lines().rev() {
            if records.len() >= limit {
                break;
            }
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<LogRecord>(line) {
                Ok(record) => records.push(record),
                // 截断的行跳过
                Err(e) => tracing::warn!(error = %e, "Skipping malformed log line"),
            }
        }

        Ok(records)
    }
}
