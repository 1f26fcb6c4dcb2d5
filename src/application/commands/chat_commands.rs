//! Chat Commands - 对话回合相关命令

use serde::Serialize;

use crate::application::ports::{AudioClip, ReplyAudio};
use crate::domain::conversation::ConversationId;
use crate::domain::story::{GenerationId, Language};

/// 对话回合命令
#[derive(Debug, Clone)]
pub struct ChatTurnCommand {
    /// 为空时创建新会话
    pub conversation_id: Option<ConversationId>,
    pub generation_id: GenerationId,
    pub language: Language,
    /// 故事正文，作为对话上下文
    pub story: Option<String>,
    pub text: Option<String>,
    /// 录音（任意格式）
    pub audio: Option<AudioClip>,
}

/// 产出最终回复的层级
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplyTier {
    Voice,
    Text,
    Tts,
}

impl ReplyTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReplyTier::Voice => "voice",
            ReplyTier::Text => "text",
            ReplyTier::Tts => "tts",
        }
    }

    /// 生成带层级前缀的尝试 ID
    pub fn attempt_id(&self) -> String {
        format!("{}-{}", self.as_str(), uuid::Uuid::new_v4())
    }
}

impl std::fmt::Display for ReplyTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 录音如何送往上游
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VoiceInputMode {
    /// 没有录音
    None,
    /// 已规范化为 16 kHz WAV
    Encoded,
    /// 无法解码，原样转发
    Forwarded,
}

/// 对话回合响应
#[derive(Debug, Clone)]
pub struct ChatTurnResponse {
    pub conversation_id: ConversationId,
    pub text: String,
    pub audio: Option<ReplyAudio>,
    pub tier: ReplyTier,
    pub attempt_id: String,
    pub voice_input: VoiceInputMode,
}

/// 重置会话命令
#[derive(Debug, Clone)]
pub struct ResetConversationCommand {
    pub conversation_id: ConversationId,
}

/// 重置会话响应
#[derive(Debug, Clone)]
pub struct ResetConversationResponse {
    pub conversation_id: ConversationId,
    /// 会话是否存在（重置是幂等的）
    pub existed: bool,
}
