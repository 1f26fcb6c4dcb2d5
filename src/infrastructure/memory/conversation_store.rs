//! In-Memory Conversation Store Implementation

use chrono::Utc;
use dashmap::DashMap;
use std::sync::Arc;

use crate::application::ports::{ConversationStoreError, ConversationStorePort};
use crate::domain::conversation::{ConversationId, ConversationSession, ConversationTurn};

/// 内存会话存储
pub struct InMemoryConversationStore {
    sessions: DashMap<ConversationId, ConversationSession>,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }
}

impl Default for InMemoryConversationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversationStorePort for InMemoryConversationStore {
    fn create(
        &self,
        session: ConversationSession,
    ) -> Result<ConversationId, ConversationStoreError> {
        let id = session.id();
        if self.sessions.contains_key(&id) {
            return Err(ConversationStoreError::AlreadyExists(id));
        }
        self.sessions.insert(id, session);
        tracing::info!(conversation_id = %id, "Conversation created");
        Ok(id)
    }

    fn get(&self, id: ConversationId) -> Result<ConversationSession, ConversationStoreError> {
        self.sessions
            .get(&id)
            .map(|s| s.clone())
            .ok_or(ConversationStoreError::NotFound(id))
    }

    fn begin_turn(
        &self,
        id: ConversationId,
        user_turn: ConversationTurn,
    ) -> Result<ConversationSession, ConversationStoreError> {
        let mut session = self
            .sessions
            .get_mut(&id)
            .ok_or(ConversationStoreError::NotFound(id))?;
        session.begin_turn(user_turn)?;
        tracing::debug!(conversation_id = %id, turns = session.turn_count(), "Turn started");
        Ok(session.clone())
    }

    fn complete_turn(
        &self,
        id: ConversationId,
        assistant_turn: ConversationTurn,
    ) -> Result<(), ConversationStoreError> {
        let mut session = self
            .sessions
            .get_mut(&id)
            .ok_or(ConversationStoreError::NotFound(id))?;
        session.complete_turn(assistant_turn)?;
        tracing::debug!(conversation_id = %id, turns = session.turn_count(), "Turn completed");
        Ok(())
    }

    fn abandon_turn(&self, id: ConversationId) {
        if let Some(mut session) = self.sessions.get_mut(&id) {
            session.abandon_turn();
            tracing::debug!(conversation_id = %id, "Turn abandoned");
        }
    }

    fn remove(&self, id: ConversationId) -> Result<(), ConversationStoreError> {
        self.sessions
            .remove(&id)
            .map(|_| {
                tracing::info!(conversation_id = %id, "Conversation removed");
            })
            .ok_or(ConversationStoreError::NotFound(id))
    }

    fn get_expired(&self, idle_timeout_secs: u64) -> Vec<ConversationId> {
        let now = Utc::now();
        let timeout = chrono::Duration::seconds(idle_timeout_secs as i64);

        self.sessions
            .iter()
            .filter_map(|entry| {
                let elapsed = now - entry.last_activity();
                if !entry.is_in_flight() && elapsed > timeout {
                    Some(*entry.key())
                } else {
                    None
                }
            })
            .collect()
    }

    fn len(&self) -> usize {
        self.sessions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::conversation::ConversationError;
    use crate::domain::story::{GenerationId, Language};

    fn session() -> ConversationSession {
        ConversationSession::new(GenerationId::new(), Language::En, None, 10)
    }

    #[test]
    fn test_conversation_lifecycle() {
        let store = InMemoryConversationStore::new();
        let id = store.create(session()).unwrap();
        assert_eq!(store.len(), 1);

        let snapshot = store
            .begin_turn(id, ConversationTurn::user("hi", None).unwrap())
            .unwrap();
        assert!(snapshot.is_in_flight());
        assert_eq!(snapshot.turn_count(), 1);

        store
            .complete_turn(id, ConversationTurn::assistant("hello", None).unwrap())
            .unwrap();
        let stored = store.get(id).unwrap();
        assert!(!stored.is_in_flight());
        assert_eq!(stored.turn_count(), 2);

        store.remove(id).unwrap();
        assert!(store.is_empty());
        assert!(matches!(
            store.get(id),
            Err(ConversationStoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_concurrent_turn_rejected() {
        let store = InMemoryConversationStore::new();
        let id = store.create(session()).unwrap();
        store
            .begin_turn(id, ConversationTurn::user("one", None).unwrap())
            .unwrap();
        let err = store
            .begin_turn(id, ConversationTurn::user("two", None).unwrap())
            .unwrap_err();
        assert!(matches!(
            err,
            ConversationStoreError::Conversation(ConversationError::TurnInFlight(_))
        ));

        store.abandon_turn(id);
        assert_eq!(store.get(id).unwrap().turn_count(), 0);
    }

    #[test]
    fn test_expiry_skips_in_flight() {
        let store = InMemoryConversationStore::new();
        let idle = store.create(session()).unwrap();
        let busy = store.create(session()).unwrap();
        store
            .begin_turn(busy, ConversationTurn::user("wait", None).unwrap())
            .unwrap();

        std::thread::sleep(std::time::Duration::from_millis(20));
        let expired = store.get_expired(0);
        assert_eq!(expired, vec![idle]);
        assert!(store.get_expired(3600).is_empty());
    }
}
