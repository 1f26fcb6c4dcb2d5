//! Client - 浏览器端播放与录音逻辑
//!
//! 平台能力（语音合成、音频元素、录音器）通过 trait 注入，
//! 状态保存在显式的 `PlaybackSession` / `RecordingSession` 中。

mod errors;
mod platform;
mod playback;
mod recording;

pub use errors::{PlaybackError, RecordingError};
pub use platform::{select_recorder_mime, PlatformClass};
pub use playback::{
    GestureKind, GestureOutcome, Modality, PendingPlayback, PlaybackBackend, PlaybackOutcome,
    PlaybackScheduler, PlaybackSession,
};
pub use recording::{
    AttemptToken, RecorderDevice, RecordingPhase, RecordingSession, RecordingStart,
    DEFAULT_CHUNK_CAPACITY, DEFAULT_MAX_RECORDING_BYTES,
};
