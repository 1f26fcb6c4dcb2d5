//! Story Context - 故事限界上下文
//!
//! 职责:
//! - 种子与语言值对象
//! - 确定性兜底故事生成
//! - 故事清洗与结尾改写
//! - 双语回复解析与逐语言兜底

mod bilingual;
mod ending;
mod errors;
mod fallback;
mod sanitizer;
mod stable_choice;
mod value_objects;

pub use bilingual::{compose_stories, parse_bilingual, resolve_story, BilingualDraft};
pub use ending::{energetic_ending, rewrite_ending};
pub use errors::StoryError;
pub use fallback::{fallback, pick_cast, sentence_count, StoryCast};
pub use sanitizer::{clean_story, sanitize, MAX_SENTENCES};
pub use stable_choice::{stable_choice, stable_hash};
pub use value_objects::{
    GenerationId, Language, Seed, StoryOutcome, StorySource, MAX_SEED_UNITS,
};
