//! Session Sweeper - 清理空闲会话的后台任务

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::application::ports::ConversationStorePort;

/// Sweeper 配置
#[derive(Debug, Clone)]
pub struct SessionSweeperConfig {
    /// 扫描间隔
    pub interval: Duration,
    /// 空闲超过该秒数的会话被移除
    pub idle_secs: u64,
}

impl Default for SessionSweeperConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            idle_secs: 1800,
        }
    }
}

/// 会话过期清理
pub struct SessionSweeper {
    config: SessionSweeperConfig,
    store: Arc<dyn ConversationStorePort>,
    shutdown: CancellationToken,
}

impl SessionSweeper {
    pub fn new(
        config: SessionSweeperConfig,
        store: Arc<dyn ConversationStorePort>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            config,
            store,
            shutdown,
        }
    }

    /// 单次扫描，返回移除数量
    pub fn sweep_once(&self) -> usize {
        let expired = self.store.get_expired(self.config.idle_secs);
        let mut removed = 0;
        for id in expired {
            match self.store.remove(id) {
                Ok(()) => removed += 1,
                // 扫描与移除之间可能已被重置
                Err(e) => tracing::debug!(conversation_id = %id, error = %e, "Skip expired session"),
            }
        }
        if removed > 0 {
            tracing::info!(
                removed,
                remaining = self.store.len(),
                "Expired idle conversations"
            );
        }
        removed
    }

    /// 启动 Sweeper，收到关闭信号后退出
    pub async fn run(self) {
        tracing::info!(
            interval_secs = self.config.interval.as_secs(),
            idle_secs = self.config.idle_secs,
            "SessionSweeper started"
        );

        let mut ticker = tokio::time::interval(self.config.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    self.sweep_once();
                }
            }
        }

        tracing::info!("SessionSweeper stopped");
    }
}
