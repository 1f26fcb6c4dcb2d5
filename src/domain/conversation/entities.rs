//! Conversation Context - Entities

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 发言角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// 回合附带的音频
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioContent {
    /// base64 编码的音频数据
    pub data: String,
    pub mime_type: String,
}

/// 对话回合
///
/// 不变量:
/// - text 与 audio 至少有一个
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    role: Role,
    text: String,
    audio: Option<AudioContent>,
    created_at: DateTime<Utc>,
}

impl ConversationTurn {
    pub fn new(
        role: Role,
        text: impl Into<String>,
        audio: Option<AudioContent>,
    ) -> Result<Self, &'static str> {
        let text = text.into();
        if text.trim().is_empty() && audio.is_none() {
            return Err("回合内容不能为空");
        }
        Ok(Self {
            role,
            text,
            audio,
            created_at: Utc::now(),
        })
    }

    pub fn user(text: impl Into<String>, audio: Option<AudioContent>) -> Result<Self, &'static str> {
        Self::new(Role::User, text, audio)
    }

    pub fn assistant(
        text: impl Into<String>,
        audio: Option<AudioContent>,
    ) -> Result<Self, &'static str> {
        Self::new(Role::Assistant, text, audio)
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn audio(&self) -> Option<&AudioContent> {
        self.audio.as_ref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
