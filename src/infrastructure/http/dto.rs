//! Data Transfer Objects

use serde::{Deserialize, Serialize};

use crate::application::ports::ReplyAudio;
use crate::application::{ChatTurnResponse, GenerateStoryResponse, ReplyTier, VoiceInputMode};
use crate::domain::conversation::ConversationId;
use crate::domain::story::{GenerationId, Language, StoryOutcome};

// ============================================================================
// 统一响应结构
// ============================================================================

/// 统一 API 响应格式
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub errno: i32,
    pub error: String,
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    /// 成功响应
    pub fn success(data: T) -> Self {
        Self {
            errno: 0,
            error: String::new(),
            data: Some(data),
        }
    }
}

// ============================================================================
// Story DTOs
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct GenerateStoryRequest {
    pub seed: String,
}

#[derive(Debug, Serialize)]
pub struct StoryResponse {
    pub generation_id: GenerationId,
    pub seed: String,
    pub stories: Vec<StoryOutcome>,
}

impl From<GenerateStoryResponse> for StoryResponse {
    fn from(r: GenerateStoryResponse) -> Self {
        Self {
            generation_id: r.generation_id,
            seed: r.seed,
            stories: r.stories,
        }
    }
}

// ============================================================================
// Chat DTOs
// ============================================================================

/// base64 音频
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioPayload {
    pub data: String,
    pub mime_type: String,
}

impl From<ReplyAudio> for AudioPayload {
    fn from(a: ReplyAudio) -> Self {
        Self {
            data: a.data,
            mime_type: a.mime_type,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ChatTurnRequest {
    #[serde(default)]
    pub conversation_id: Option<ConversationId>,
    pub generation_id: GenerationId,
    pub language: Language,
    #[serde(default)]
    pub story: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub audio: Option<AudioPayload>,
}

#[derive(Debug, Serialize)]
pub struct ChatReplyResponse {
    pub conversation_id: ConversationId,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio: Option<AudioPayload>,
    pub tier: ReplyTier,
    pub attempt_id: String,
    pub voice_input: VoiceInputMode,
}

impl From<ChatTurnResponse> for ChatReplyResponse {
    fn from(r: ChatTurnResponse) -> Self {
        Self {
            conversation_id: r.conversation_id,
            text: r.text,
            audio: r.audio.map(AudioPayload::from),
            tier: r.tier,
            attempt_id: r.attempt_id,
            voice_input: r.voice_input,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ResetConversationRequest {
    pub conversation_id: ConversationId,
}

#[derive(Debug, Serialize)]
pub struct ResetConversationResult {
    pub conversation_id: ConversationId,
    pub existed: bool,
}
