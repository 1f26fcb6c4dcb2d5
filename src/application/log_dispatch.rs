//! 日志投递
//!
//! 生成与对话记录以 fire-and-forget 方式写入日志存储：
//! 写入在独立任务中进行，失败只打 warn，不回传给请求方。

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::application::ports::{LogRecord, StoryLogPort};

/// 日志投递器
#[derive(Clone, Default)]
pub struct LogDispatcher {
    sink: Option<Arc<dyn StoryLogPort>>,
}

impl LogDispatcher {
    pub fn new(sink: Arc<dyn StoryLogPort>) -> Self {
        Self { sink: Some(sink) }
    }

    /// 不写日志
    pub fn disabled() -> Self {
        Self { sink: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.sink.is_some()
    }

    pub fn sink(&self) -> Option<&Arc<dyn StoryLogPort>> {
        self.sink.as_ref()
    }

    /// 异步投递一条记录
    pub fn dispatch(&self, record: LogRecord) -> Option<JoinHandle<()>> {
        let sink = self.sink.clone()?;
        Some(tokio::spawn(async move {
            let kind = record.kind;
            let generation_id = record.generation_id;
            if let Err(e) = sink.append(record).await {
                tracing::warn!(
                    kind = ?kind,
                    generation_id = %generation_id,
                    error = %e,
                    "Failed to append log record"
                );
            }
        }))
    }
}
