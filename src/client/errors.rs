//! Client Errors - 播放与录音错误定义

use thiserror::Error;

/// 播放错误
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PlaybackError {
    /// 自动播放策略拒绝，需要等待用户手势
    #[error("Playback blocked: {0}")]
    PlaybackBlocked(String),

    /// 平台缺少语音合成或解码能力
    #[error("Device unsupported: {0}")]
    DeviceUnsupported(String),
}

/// 录音错误
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RecordingError {
    #[error("Microphone permission denied")]
    PermissionDenied,

    #[error("Device unsupported: {0}")]
    DeviceUnsupported(String),

    #[error("Recording not active")]
    NotRecording,

    #[error("Recorder failed: {0}")]
    RecorderFailed(String),
}
