//! Conversation Context - Aggregate Root

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ConversationError, ConversationId, ConversationTurn, Role};
use crate::domain::story::{GenerationId, Language};

/// 默认保留的历史回合数
pub const DEFAULT_HISTORY_WINDOW: usize = 10;

/// 历史窗口下限，配置更小时按此值处理
pub const MIN_HISTORY_WINDOW: usize = 8;

/// ConversationSession 聚合根
///
/// 不变量:
/// - 历史只保留最近 `max_turns` 个回合，按发生顺序排列
/// - 同一时刻最多一个回合在进行中
/// - 用户发言在请求发出前入历史，助手回复在回合完成后入历史
/// - 窗口只在回合完成时裁剪，进行中的回合可能临时多出一条用户发言
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSession {
    id: ConversationId,
    generation_id: GenerationId,
    language: Language,
    story: Option<String>,
    history: VecDeque<ConversationTurn>,
    max_turns: usize,
    in_flight: bool,
    created_at: DateTime<Utc>,
    last_activity: DateTime<Utc>,
}

impl ConversationSession {
    pub fn new(
        generation_id: GenerationId,
        language: Language,
        story: Option<String>,
        max_turns: usize,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: ConversationId::new(),
            generation_id,
            language,
            story,
            history: VecDeque::new(),
            max_turns: max_turns.max(MIN_HISTORY_WINDOW),
            in_flight: false,
            created_at: now,
            last_activity: now,
        }
    }

    /// 开始新回合：记录用户发言并标记进行中
    pub fn begin_turn(&mut self, user_turn: ConversationTurn) -> Result<(), ConversationError> {
        if self.in_flight {
            return Err(ConversationError::TurnInFlight(self.id));
        }
        if user_turn.role() != Role::User {
            return Err(ConversationError::InvalidTurn(
                "回合必须由用户发言开始".to_string(),
            ));
        }
        // 回合完成前不裁剪窗口，放弃回合时历史保持原样
        self.history.push_back(user_turn);
        self.last_activity = Utc::now();
        self.in_flight = true;
        Ok(())
    }

    /// 完成回合：记录助手回复
    pub fn complete_turn(
        &mut self,
        assistant_turn: ConversationTurn,
    ) -> Result<(), ConversationError> {
        if !self.in_flight {
            return Err(ConversationError::NoTurnInFlight(self.id));
        }
        if assistant_turn.role() != Role::Assistant {
            return Err(ConversationError::InvalidTurn(
                "回合必须以助手回复结束".to_string(),
            ));
        }
        self.push(assistant_turn);
        self.in_flight = false;
        Ok(())
    }

    /// 放弃回合：撤回本回合的用户发言，允许重试
    pub fn abandon_turn(&mut self) {
        if !self.in_flight {
            return;
        }
        if self.history.back().is_some_and(|t| t.role() == Role::User) {
            self.history.pop_back();
        }
        self.in_flight = false;
        self.last_activity = Utc::now();
    }

    fn push(&mut self, turn: ConversationTurn) {
        self.history.push_back(turn);
        while self.history.len() > self.max_turns {
            self.history.pop_front();
        }
        self.last_activity = Utc::now();
    }

    pub fn touch(&mut self) {
        self.last_activity = Utc::now();
    }

    // Getters
    pub fn id(&self) -> ConversationId {
        self.id
    }

    pub fn generation_id(&self) -> GenerationId {
        self.generation_id
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn story(&self) -> Option<&str> {
        self.story.as_deref()
    }

    pub fn history(&self) -> impl Iterator<Item = &ConversationTurn> {
        self.history.iter()
    }

    pub fn turn_count(&self) -> usize {
        self.history.len()
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn last_activity(&self) -> DateTime<Utc> {
        self.last_activity
    }
}
