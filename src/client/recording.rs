//! Recording Session - 录音尝试生命周期
//!
//! 每次开始录音分配递增的尝试序号，看门狗、停止和完成回调都携带
//! `AttemptToken`，过期的回调为空操作。录音分片通过有界通道交给
//! 唯一的收集任务，超过字节上限的分片被丢弃。
//!
//! 平台录音器的顺序是 `stop()` → 最后一个分片 → 完成回调，停止之后
//! 收集任务继续接收，直到发送端关闭或完成回调到来。

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::errors::RecordingError;
use super::platform::{select_recorder_mime, PlatformClass};
use crate::application::ports::AudioClip;

/// 默认录音字节上限
pub const DEFAULT_MAX_RECORDING_BYTES: usize = 5 * 1024 * 1024;
/// 默认分片通道容量
pub const DEFAULT_CHUNK_CAPACITY: usize = 32;

/// 平台录音设备
pub trait RecorderDevice: Send + Sync {
    /// 请求麦克风权限
    fn request_access(&self) -> Result<(), RecordingError>;

    fn is_type_supported(&self, mime_type: &str) -> bool;
}

/// 录音尝试标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct AttemptToken(u64);

impl AttemptToken {
    pub fn value(&self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingPhase {
    Idle,
    Recording,
    Stopping,
}

/// 开始录音的结果，`chunks` 交给平台录音回调
pub struct RecordingStart {
    pub token: AttemptToken,
    pub mime_type: &'static str,
    pub chunks: mpsc::Sender<Vec<u8>>,
}

struct ActiveAttempt {
    mime_type: &'static str,
    abort: CancellationToken,
    /// 完成回调到来后通知收集任务收尾
    finish: CancellationToken,
    collector: JoinHandle<Vec<u8>>,
}

/// 录音会话，由录音流程持有并按引用传入
pub struct RecordingSession {
    attempt: u64,
    phase: RecordingPhase,
    active: Option<ActiveAttempt>,
    max_bytes: usize,
    chunk_capacity: usize,
}

/// 消费分片直到发送端关闭、完成或中止
async fn collect_chunks(
    mut rx: mpsc::Receiver<Vec<u8>>,
    abort: CancellationToken,
    finish: CancellationToken,
    max_bytes: usize,
) -> Vec<u8> {
    let mut buffer = Vec::new();
    let mut dropped = 0usize;

    let mut push = |buffer: &mut Vec<u8>, chunk: Vec<u8>| {
        if buffer.len() + chunk.len() > max_bytes {
            dropped += chunk.len();
        } else {
            buffer.extend_from_slice(&chunk);
        }
    };

    loop {
        tokio::select! {
            _ = abort.cancelled() => return Vec::new(),
            _ = finish.cancelled() => {
                // 完成前已送达的分片仍然保留
                while let Ok(chunk) = rx.try_recv() {
                    push(&mut buffer, chunk);
                }
                break;
            }
            chunk = rx.recv() => match chunk {
                Some(chunk) => push(&mut buffer, chunk),
                None => break,
            },
        }
    }

    if dropped > 0 {
        tracing::warn!(
            dropped_bytes = dropped,
            max_bytes,
            "Recording exceeded byte cap, trailing chunks dropped"
        );
    }
    buffer
}

impl RecordingSession {
    pub fn new(max_bytes: usize, chunk_capacity: usize) -> Self {
        Self {
            attempt: 0,
            phase: RecordingPhase::Idle,
            active: None,
            max_bytes,
            chunk_capacity: chunk_capacity.max(1),
        }
    }

    pub fn phase(&self) -> RecordingPhase {
        self.phase
    }

    pub fn current_attempt(&self) -> AttemptToken {
        AttemptToken(self.attempt)
    }

    pub fn is_current(&self, token: AttemptToken) -> bool {
        token.0 == self.attempt
    }

    /// 开始新的录音尝试，进行中的旧尝试被中止
    pub fn start(
        &mut self,
        device: &dyn RecorderDevice,
        platform: PlatformClass,
    ) -> Result<RecordingStart, RecordingError> {
        device.request_access()?;
        let mime_type = select_recorder_mime(platform, |m| device.is_type_supported(m))
            .ok_or_else(|| {
                RecordingError::DeviceUnsupported("No supported recorder format".to_string())
            })?;

        self.release();
        self.attempt += 1;

        let abort = CancellationToken::new();
        let finish = CancellationToken::new();
        let (tx, rx) = mpsc::channel(self.chunk_capacity);
        let collector = tokio::spawn(collect_chunks(
            rx,
            abort.clone(),
            finish.clone(),
            self.max_bytes,
        ));

        self.active = Some(ActiveAttempt {
            mime_type,
            abort,
            finish,
            collector,
        });
        self.phase = RecordingPhase::Recording;

        tracing::debug!(attempt = self.attempt, mime_type, "Recording started");

        Ok(RecordingStart {
            token: AttemptToken(self.attempt),
            mime_type,
            chunks: tx,
        })
    }

    /// 用户停止录音；过期 token 返回 false
    ///
    /// 只切换阶段，收集任务继续接收平台在停止后送来的最后分片
    pub fn stop(&mut self, token: AttemptToken) -> bool {
        if !self.is_current(token) || self.phase != RecordingPhase::Recording {
            tracing::debug!(attempt = token.0, current = self.attempt, "Ignoring stale stop");
            return false;
        }
        self.phase = RecordingPhase::Stopping;
        true
    }

    /// 录音时长看门狗
    pub fn on_watchdog(&mut self, token: AttemptToken) -> bool {
        let fired = self.stop(token);
        if fired {
            tracing::info!(attempt = token.0, "Recording watchdog stopped the recorder");
        }
        fired
    }

    /// 中止当前录音，已收集的数据被丢弃
    pub fn abort(&mut self) {
        if self.active.is_some() {
            tracing::info!(attempt = self.attempt, "Recording aborted");
        }
        self.release();
    }

    /// 完成回调：过期或已中止时返回 `Ok(None)`，不产生录音
    pub async fn complete(
        &mut self,
        token: AttemptToken,
    ) -> Result<Option<AudioClip>, RecordingError> {
        if !self.is_current(token) {
            tracing::debug!(attempt = token.0, current = self.attempt, "Ignoring stale completion");
            return Ok(None);
        }

        let active = match self.active.take() {
            Some(active) => active,
            None => return Ok(None),
        };
        self.phase = RecordingPhase::Idle;

        if active.abort.is_cancelled() {
            return Ok(None);
        }

        active.finish.cancel();
        let bytes = active
            .collector
            .await
            .map_err(|e| RecordingError::RecorderFailed(e.to_string()))?;

        if bytes.is_empty() {
            tracing::warn!(attempt = token.0, "Recording finished without audio");
            return Ok(None);
        }

        tracing::info!(attempt = token.0, size = bytes.len(), "Recording completed");
        Ok(Some(AudioClip::new(bytes, active.mime_type)))
    }

    /// 释放当前尝试占用的资源
    fn release(&mut self) {
        if let Some(active) = self.active.take() {
            active.abort.cancel();
        }
        self.phase = RecordingPhase::Idle;
    }
}

impl Default for RecordingSession {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RECORDING_BYTES, DEFAULT_CHUNK_CAPACITY)
    }
}

impl Drop for RecordingSession {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeDevice {
        granted: bool,
        supported: &'static [&'static str],
    }

    impl RecorderDevice for FakeDevice {
        fn request_access(&self) -> Result<(), RecordingError> {
            if self.granted {
                Ok(())
            } else {
                Err(RecordingError::PermissionDenied)
            }
        }

        fn is_type_supported(&self, mime_type: &str) -> bool {
            self.supported.contains(&mime_type)
        }
    }

    fn device() -> FakeDevice {
        FakeDevice {
            granted: true,
            supported: &["audio/webm", "audio/mp4"],
        }
    }

    #[tokio::test]
    async fn test_record_and_complete() {
        let mut session = RecordingSession::default();
        let start = session.start(&device(), PlatformClass::Other).unwrap();
        assert_eq!(start.mime_type, "audio/webm");
        assert_eq!(session.phase(), RecordingPhase::Recording);

        start.chunks.send(vec![1, 2]).await.unwrap();
        start.chunks.send(vec![3]).await.unwrap();
        assert!(session.stop(start.token));

        let clip = session.complete(start.token).await.unwrap().unwrap();
        assert_eq!(clip.bytes, vec![1, 2, 3]);
        assert_eq!(clip.mime_type, "audio/webm");
        assert_eq!(session.phase(), RecordingPhase::Idle);
    }

    #[tokio::test]
    async fn test_final_chunk_after_stop_is_kept() {
        let mut session = RecordingSession::default();
        let start = session.start(&device(), PlatformClass::Other).unwrap();

        // 未设置 timeslice 的录音器在 stop 之后才送出唯一的分片
        assert!(session.stop(start.token));
        assert_eq!(session.phase(), RecordingPhase::Stopping);
        tokio::task::yield_now().await;
        start.chunks.send(vec![1, 2, 3]).await.unwrap();

        let clip = session.complete(start.token).await.unwrap().unwrap();
        assert_eq!(clip.bytes, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_sender_closed_after_stop_completes() {
        let mut session = RecordingSession::default();
        let start = session.start(&device(), PlatformClass::Other).unwrap();
        start.chunks.send(vec![4]).await.unwrap();
        assert!(session.stop(start.token));
        start.chunks.send(vec![5]).await.unwrap();
        drop(start.chunks);

        let clip = session.complete(start.token).await.unwrap().unwrap();
        assert_eq!(clip.bytes, vec![4, 5]);
    }

    #[tokio::test]
    async fn test_platform_picks_mime() {
        let mut session = RecordingSession::default();
        let start = session.start(&device(), PlatformClass::Ios).unwrap();
        assert_eq!(start.mime_type, "audio/mp4");
    }

    #[tokio::test]
    async fn test_abort_short_circuits_completion() {
        let mut session = RecordingSession::default();
        let start = session.start(&device(), PlatformClass::Other).unwrap();
        start.chunks.send(vec![9; 4]).await.unwrap();

        session.abort();
        assert!(session.complete(start.token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_stale_watchdog_does_not_touch_newer_attempt() {
        let mut session = RecordingSession::default();
        let first = session.start(&device(), PlatformClass::Other).unwrap();
        session.abort();

        let second = session.start(&device(), PlatformClass::Other).unwrap();
        assert!(first.token < second.token);

        // 第一次尝试的看门狗迟到
        assert!(!session.on_watchdog(first.token));
        assert_eq!(session.phase(), RecordingPhase::Recording);
        assert!(session.complete(first.token).await.unwrap().is_none());
        assert_eq!(session.phase(), RecordingPhase::Recording);

        second.chunks.send(vec![7]).await.unwrap();
        assert!(session.on_watchdog(second.token));
        let clip = session.complete(second.token).await.unwrap().unwrap();
        assert_eq!(clip.bytes, vec![7]);
    }

    #[tokio::test]
    async fn test_byte_cap_drops_overflow() {
        let mut session = RecordingSession::new(4, 8);
        let start = session.start(&device(), PlatformClass::Other).unwrap();
        start.chunks.send(vec![1, 1, 1]).await.unwrap();
        start.chunks.send(vec![2, 2]).await.unwrap();
        start.chunks.send(vec![3]).await.unwrap();
        drop(start.chunks);

        let clip = session.complete(start.token).await.unwrap().unwrap();
        assert_eq!(clip.bytes, vec![1, 1, 1, 3]);
    }

    #[tokio::test]
    async fn test_permission_and_support_errors() {
        let mut session = RecordingSession::default();
        let denied = FakeDevice {
            granted: false,
            supported: &["audio/webm"],
        };
        assert!(matches!(
            session.start(&denied, PlatformClass::Other),
            Err(RecordingError::PermissionDenied)
        ));

        let none = FakeDevice {
            granted: true,
            supported: &[],
        };
        assert!(matches!(
            session.start(&none, PlatformClass::Other),
            Err(RecordingError::DeviceUnsupported(_))
        ));
        assert_eq!(session.phase(), RecordingPhase::Idle);
    }
}
