//! 双语故事组装
//!
//! 一次模型调用同时产出中英文故事，回复约定为 `{"zh": "...", "en": "..."}`。
//! 回复解析是宽容的：先整体按 JSON 解析，失败再取第一个 `{` 到最后一个 `}`。
//! 每种语言独立清洗，缺失或清洗后为空的语言独立兜底。

use once_cell::sync::Lazy;
use serde_json::Value;

use super::fallback::fallback;
use super::sanitizer::clean_story;
use super::{Language, StoryOutcome, StorySource};
use crate::domain::json_path::JsonPathExtractor;

static ZH_PATHS: Lazy<JsonPathExtractor> = Lazy::new(|| {
    JsonPathExtractor::new(vec!["zh", "chinese", "story.zh", "stories.zh", "zh_story", "cn"])
});

static EN_PATHS: Lazy<JsonPathExtractor> = Lazy::new(|| {
    JsonPathExtractor::new(vec!["en", "english", "story.en", "stories.en", "en_story"])
});

/// 从回复中解析出的原始双语文本
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BilingualDraft {
    pub zh: Option<String>,
    pub en: Option<String>,
}

impl BilingualDraft {
    pub fn get(&self, language: Language) -> Option<&str> {
        match language {
            Language::Zh => self.zh.as_deref(),
            Language::En => self.en.as_deref(),
        }
    }
}

fn parse_object(text: &str) -> Option<Value> {
    if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(text.trim()) {
        return Some(value);
    }
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    match serde_json::from_str::<Value>(&text[start..=end]) {
        Ok(value @ Value::Object(_)) => Some(value),
        _ => None,
    }
}

/// 宽容解析模型回复
pub fn parse_bilingual(reply: &str) -> BilingualDraft {
    match parse_object(reply) {
        Some(value) => BilingualDraft {
            zh: ZH_PATHS.first_text(&value),
            en: EN_PATHS.first_text(&value),
        },
        None => BilingualDraft::default(),
    }
}

/// 单语言：清洗，为空则兜底
pub fn resolve_story(raw: Option<&str>, language: Language, seed: &str) -> StoryOutcome {
    if let Some(raw) = raw {
        let text = clean_story(raw, language, seed);
        if !text.is_empty() {
            return StoryOutcome {
                language,
                text,
                source: StorySource::Model,
            };
        }
        tracing::info!(language = %language, "Model story empty after sanitizing, using fallback");
    }
    StoryOutcome {
        language,
        text: fallback(seed, language),
        source: StorySource::Fallback,
    }
}

/// 组装双语结果
///
/// `reply` 为 `None` 表示上游失败，两种语言全部兜底
pub fn compose_stories(seed: &str, reply: Option<&str>) -> Vec<StoryOutcome> {
    let draft = reply.map(parse_bilingual).unwrap_or_default();
    Language::ALL
        .iter()
        .map(|&language| resolve_story(draft.get(language), language, seed))
        .collect()
}
