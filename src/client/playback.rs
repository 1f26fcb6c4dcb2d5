//! Playback Scheduler - 手势延迟播放
//!
//! 自动播放被拒绝时，把请求存为对应通道的待播项，
//! 并在下一次合格的用户手势（pointerdown / touchstart / click）时重试一次。

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;

use super::errors::PlaybackError;
use crate::application::commands::ChatTurnResponse;
use crate::domain::story::Language;

/// 平台播放能力
#[async_trait]
pub trait PlaybackBackend: Send + Sync {
    /// 语音合成朗读
    async fn speak(&self, text: &str, language: Language) -> Result<(), PlaybackError>;

    /// 播放音频 URL（含 data URL）
    async fn play_audio(&self, url: &str) -> Result<(), PlaybackError>;

    /// 启动一段静音缓冲，让音频子系统保持运行，必须在手势调用栈内同步调用
    fn unlock(&self) -> Result<(), PlaybackError>;
}

/// 播放通道，每个通道最多一个待播项
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Modality {
    Story,
    Conversation,
}

/// 用户输入事件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureKind {
    PointerDown,
    TouchStart,
    Click,
    KeyDown,
    Scroll,
}

impl GestureKind {
    /// 平台认可可解锁音频的手势
    pub fn qualifies(&self) -> bool {
        matches!(
            self,
            GestureKind::PointerDown | GestureKind::TouchStart | GestureKind::Click
        )
    }
}

/// 待播项
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingPlayback {
    Speech { text: String, language: Language },
    Audio { url: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackOutcome {
    Played,
    /// 已存为待播项，等待手势
    Deferred,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureOutcome {
    /// 非合格手势，或未布防
    Ignored,
    Replayed { attempted: usize, failed: usize },
}

/// 播放状态，由发起播放的流程持有并按引用传入
#[derive(Debug, Default)]
pub struct PlaybackSession {
    pending: BTreeMap<Modality, PendingPlayback>,
    armed: bool,
    tap_prompt: bool,
}

impl PlaybackSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn pending(&self, modality: Modality) -> Option<&PendingPlayback> {
        self.pending.get(&modality)
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// 是否需要提示“点击屏幕播放”
    pub fn needs_tap_prompt(&self) -> bool {
        self.tap_prompt
    }

    /// 布防手势监听，重复调用无副作用
    pub fn arm_on_next_gesture(&mut self) {
        if self.armed {
            return;
        }
        self.armed = true;
        tracing::debug!("Armed one-shot gesture listener");
    }

    fn defer(&mut self, modality: Modality, item: PendingPlayback) {
        // 同通道新请求替换旧请求
        self.pending.insert(modality, item);
        self.arm_on_next_gesture();
    }
}

/// 播放调度器
pub struct PlaybackScheduler {
    backend: Arc<dyn PlaybackBackend>,
}

impl PlaybackScheduler {
    pub fn new(backend: Arc<dyn PlaybackBackend>) -> Self {
        Self { backend }
    }

    pub async fn speak(
        &self,
        session: &mut PlaybackSession,
        modality: Modality,
        text: &str,
        language: Language,
    ) -> PlaybackOutcome {
        match self.backend.speak(text, language).await {
            Ok(()) => {
                session.tap_prompt = false;
                PlaybackOutcome::Played
            }
            Err(e) => {
                tracing::info!(error = %e, ?modality, "Speech rejected, deferring to next gesture");
                session.defer(
                    modality,
                    PendingPlayback::Speech {
                        text: text.to_string(),
                        language,
                    },
                );
                PlaybackOutcome::Deferred
            }
        }
    }

    pub async fn play_audio(
        &self,
        session: &mut PlaybackSession,
        modality: Modality,
        url: &str,
    ) -> PlaybackOutcome {
        match self.backend.play_audio(url).await {
            Ok(()) => {
                session.tap_prompt = false;
                PlaybackOutcome::Played
            }
            Err(e) => {
                tracing::info!(error = %e, ?modality, "Audio rejected, deferring to next gesture");
                session.defer(
                    modality,
                    PendingPlayback::Audio {
                        url: url.to_string(),
                    },
                );
                PlaybackOutcome::Deferred
            }
        }
    }

    /// 在已知手势内同步调用，失败只记日志
    pub fn unlock_audio(&self) {
        if let Err(e) = self.backend.unlock() {
            tracing::warn!(error = %e, "Audio unlock failed");
        }
    }

    /// 处理一次用户输入事件
    pub async fn on_gesture(
        &self,
        session: &mut PlaybackSession,
        gesture: GestureKind,
    ) -> GestureOutcome {
        if !gesture.qualifies() || !session.armed {
            return GestureOutcome::Ignored;
        }

        // 先撤防，无论重试结果如何都不会再次触发
        session.armed = false;
        self.unlock_audio();

        let items = std::mem::take(&mut session.pending);
        let attempted = items.len();
        let mut failed = 0;

        for (modality, item) in items {
            let result = match &item {
                PendingPlayback::Speech { text, language } => {
                    self.backend.speak(text, *language).await
                }
                PendingPlayback::Audio { url } => self.backend.play_audio(url).await,
            };
            if let Err(e) = result {
                tracing::warn!(error = %e, ?modality, "Deferred playback failed after gesture");
                failed += 1;
            }
        }

        session.tap_prompt = failed > 0;
        GestureOutcome::Replayed { attempted, failed }
    }

    /// 播放对话回复：有内嵌音频则播放音频，否则朗读文本
    pub async fn present_reply(
        &self,
        session: &mut PlaybackSession,
        reply: &ChatTurnResponse,
        language: Language,
    ) -> PlaybackOutcome {
        match &reply.audio {
            Some(audio) => {
                let url = format!("data:{};base64,{}", audio.mime_type, audio.data);
                self.play_audio(session, Modality::Conversation, &url).await
            }
            None => {
                self.speak(session, Modality::Conversation, &reply.text, language)
                    .await
            }
        }
    }
}
