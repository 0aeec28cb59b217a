//! In-memory session store

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use super::{SessionStore, StoreError};
use crate::combat::CombatState;

/// Session store backed by a map, for tests and single-process use
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, CombatState>>,
}

impl MemorySessionStore {
    /// Create a new, empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a shared instance
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Number of stored sessions
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

impl SessionStore for MemorySessionStore {
    async fn get(&self, character_id: &str) -> Result<Option<CombatState>, StoreError> {
        let sessions = self.sessions.read().await;
        Ok(sessions.get(character_id).cloned())
    }

    async fn upsert(&self, character_id: &str, state: &CombatState) -> Result<(), StoreError> {
        let mut sessions = self.sessions.write().await;
        sessions.insert(character_id.to_string(), state.clone());
        Ok(())
    }

    async fn delete(&self, character_id: &str) -> Result<bool, StoreError> {
        let mut sessions = self.sessions.write().await;
        Ok(sessions.remove(character_id).is_some())
    }
}
