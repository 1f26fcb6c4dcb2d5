//! Story Context - Errors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoryError {
    #[error("无效的种子文本: {0}")]
    InvalidSeed(String),

    #[error("不支持的语言: {0}")]
    UnsupportedLanguage(String),

    #[error("生成内容无效: {0}")]
    InvalidContent(String),
}
