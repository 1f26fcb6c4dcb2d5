//! Story Context - Value Objects

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::StoryError;

/// 种子文本最大长度（UTF-16 code units）
pub const MAX_SEED_UNITS: usize = 200;

/// 故事语言
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Zh,
    En,
}

impl Language {
    /// 单次双语生成覆盖的全部语言
    pub const ALL: [Language; 2] = [Language::Zh, Language::En];

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Zh => "zh",
            Language::En => "en",
        }
    }

    /// 句末标点
    pub fn terminator(&self) -> char {
        match self {
            Language::Zh => '。',
            Language::En => '.',
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Language {
    type Err = StoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "zh" | "zh-cn" | "cn" | "chinese" => Ok(Language::Zh),
            "en" | "en-us" | "english" => Ok(Language::En),
            other => Err(StoryError::UnsupportedLanguage(other.to_string())),
        }
    }
}

/// 种子文本
///
/// 不变量:
/// - 去除首尾空白后不为空
/// - 长度不超过 200 个 UTF-16 code units（超出部分按字符边界截断）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seed(String);

impl Seed {
    pub fn new(raw: impl AsRef<str>) -> Result<Self, StoryError> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(StoryError::InvalidSeed("种子文本不能为空".to_string()));
        }
        Ok(Self(truncate_utf16(trimmed, MAX_SEED_UNITS).to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// UTF-16 长度
    pub fn utf16_len(&self) -> usize {
        self.0.encode_utf16().count()
    }
}

impl std::fmt::Display for Seed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn truncate_utf16(text: &str, max_units: usize) -> &str {
    let mut units = 0;
    for (idx, ch) in text.char_indices() {
        units += ch.len_utf16();
        if units > max_units {
            return &text[..idx];
        }
    }
    text
}

/// 一次生成的关联 ID（同一种子的中英文故事共享）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GenerationId(Uuid);

impl GenerationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for GenerationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for GenerationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 故事文本来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorySource {
    /// 上游模型生成并通过清洗
    Model,
    /// 确定性模板兜底
    Fallback,
}

impl StorySource {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorySource::Model => "model",
            StorySource::Fallback => "fallback",
        }
    }
}

/// 单语言故事结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryOutcome {
    pub language: Language,
    pub text: String,
    pub source: StorySource,
}
