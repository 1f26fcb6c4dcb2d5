//! Story Commands - 故事生成命令

use crate::domain::story::{GenerationId, StoryOutcome};

/// 生成双语故事命令
#[derive(Debug, Clone)]
pub struct GenerateStoryCommand {
    /// 用户输入的原始种子文本
    pub seed: String,
}

/// 生成双语故事响应
#[derive(Debug, Clone)]
pub struct GenerateStoryResponse {
    pub generation_id: GenerationId,
    /// 截断后的种子
    pub seed: String,
    /// 每种语言一条，顺序固定为 zh、en
    pub stories: Vec<StoryOutcome>,
}
