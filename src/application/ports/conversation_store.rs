//! Conversation Store Port - 对话会话生命周期管理
//!
//! 定义会话存储的抽象接口，具体实现在 infrastructure/memory 层。
//! 回合的开始/完成/放弃必须在单个条目锁内完成，保证同一会话的回合严格串行。

use thiserror::Error;

use crate::domain::conversation::{
    ConversationError, ConversationId, ConversationSession, ConversationTurn,
};

/// Conversation Store 错误
#[derive(Debug, Error)]
pub enum ConversationStoreError {
    #[error("Conversation not found: {0}")]
    NotFound(ConversationId),

    #[error("Conversation already exists: {0}")]
    AlreadyExists(ConversationId),

    #[error(transparent)]
    Conversation(#[from] ConversationError),
}

/// Conversation Store Port
///
/// 所有状态存储在内存中
pub trait ConversationStorePort: Send + Sync {
    /// 创建新会话
    fn create(&self, session: ConversationSession)
        -> Result<ConversationId, ConversationStoreError>;

    /// 获取会话快照
    fn get(&self, id: ConversationId) -> Result<ConversationSession, ConversationStoreError>;

    /// 开始回合，返回包含用户发言的会话快照
    fn begin_turn(
        &self,
        id: ConversationId,
        user_turn: ConversationTurn,
    ) -> Result<ConversationSession, ConversationStoreError>;

    /// 完成回合
    fn complete_turn(
        &self,
        id: ConversationId,
        assistant_turn: ConversationTurn,
    ) -> Result<(), ConversationStoreError>;

    /// 放弃回合（会话不存在时无操作）
    fn abandon_turn(&self, id: ConversationId);

    /// 删除会话
    fn remove(&self, id: ConversationId) -> Result<(), ConversationStoreError>;

    /// 获取所有空闲超时的会话 ID（进行中的会话不算空闲）
    fn get_expired(&self, idle_timeout_secs: u64) -> Vec<ConversationId>;

    /// 会话数量
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
