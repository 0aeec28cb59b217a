//! Combat session storage
//!
//! One session per character, keyed by character id. Stores only need
//! latest-write-wins semantics; retries are the caller's concern.

mod memory;
mod sqlite;

use std::future::Future;
use std::sync::Arc;

use thiserror::Error;

use crate::combat::CombatState;

pub use memory::MemorySessionStore;
pub use sqlite::SqliteSessionStore;

/// Session store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Durable keyed storage for combat sessions
pub trait SessionStore: Send + Sync {
    fn get(
        &self,
        character_id: &str,
    ) -> impl Future<Output = Result<Option<CombatState>, StoreError>> + Send;

    fn upsert(
        &self,
        character_id: &str,
        state: &CombatState,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Returns whether a session was removed
    fn delete(&self, character_id: &str) -> impl Future<Output = Result<bool, StoreError>> + Send;
}

impl<S: SessionStore> SessionStore for Arc<S> {
    async fn get(&self, character_id: &str) -> Result<Option<CombatState>, StoreError> {
        self.as_ref().get(character_id).await
    }

    async fn upsert(&self, character_id: &str, state: &CombatState) -> Result<(), StoreError> {
        self.as_ref().upsert(character_id, state).await
    }

    async fn delete(&self, character_id: &str) -> Result<bool, StoreError> {
        self.as_ref().delete(character_id).await
    }
}
