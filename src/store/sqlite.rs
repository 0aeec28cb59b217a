//! SQLite-backed session store
//!
//! Sessions are stored as JSON documents keyed by character id. The phase
//! and in-combat flag are mirrored into columns for inspection.

use sqlx::SqlitePool;
use tracing::debug;

use super::{SessionStore, StoreError};
use crate::combat::CombatState;

/// Session store with database backing
#[derive(Debug, Clone)]
pub struct SqliteSessionStore {
    pool: SqlitePool,
}

impl SqliteSessionStore {
    /// Create a new session store with the given connection pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Character ids with an unfinished combat
    pub async fn active_characters(&self) -> Result<Vec<String>, StoreError> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT character_id FROM combat_sessions WHERE in_combat = 1 ORDER BY character_id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }
}

impl SessionStore for SqliteSessionStore {
    async fn get(&self, character_id: &str) -> Result<Option<CombatState>, StoreError> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT state FROM combat_sessions WHERE character_id = ?")
                .bind(character_id)
                .fetch_optional(&self.pool)
                .await?;

        match row {
            Some((json,)) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn upsert(&self, character_id: &str, state: &CombatState) -> Result<(), StoreError> {
        let json = serde_json::to_string(state)?;
        let phase = serde_json::to_value(state.phase)?
            .as_str()
            .unwrap_or_default()
            .to_string();
        let now = chrono::Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO combat_sessions (character_id, session_id, in_combat, phase, state, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(character_id) DO UPDATE SET
                session_id = excluded.session_id,
                in_combat = excluded.in_combat,
                phase = excluded.phase,
                state = excluded.state,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(character_id)
        .bind(&state.session_id)
        .bind(state.in_combat)
        .bind(&phase)
        .bind(&json)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        debug!("Stored combat session for {} ({})", character_id, phase);
        Ok(())
    }

    async fn delete(&self, character_id: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM combat_sessions WHERE character_id = ?")
            .bind(character_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::{CombatState, EnemyCombatant, Phase, PlayerCombatStats, ScriptedDice};
    use crate::db::test_utils::test_pool;

    fn sample_state(character_id: &str) -> CombatState {
        let player = PlayerCombatStats {
            character_id: character_id.into(),
            name: "Hero".into(),
            hp: 10,
            hp_max: 10,
            ac: 14,
            initiative: 18,
            attack_bonus: 5,
            damage_dice: "1d8".into(),
            damage_bonus: 3,
        };
        let goblin = EnemyCombatant {
            id: "enemy-1".into(),
            name: "Goblin".into(),
            initiative: 10,
            hp: 7,
            hp_max: 7,
            ac: 13,
            attack_bonus: 3,
            damage_dice: "1d6".into(),
            damage_bonus: 1,
        };
        let mut dice = ScriptedDice::default();
        CombatState::begin(character_id, player, vec![goblin], &mut dice)
            .unwrap()
            .0
    }

    #[tokio::test]
    async fn test_upsert_and_get() {
        let store = SqliteSessionStore::new(test_pool().await);
        assert!(store.get("hero").await.unwrap().is_none());

        let state = sample_state("hero");
        store.upsert("hero", &state).await.unwrap();
        assert_eq!(store.get("hero").await.unwrap(), Some(state));
    }

    #[tokio::test]
    async fn test_latest_write_wins() {
        let store = SqliteSessionStore::new(test_pool().await);

        let mut state = sample_state("hero");
        store.upsert("hero", &state).await.unwrap();

        state.enemies[0].hp = 2;
        state.round_number = 3;
        store.upsert("hero", &state).await.unwrap();

        let loaded = store.get("hero").await.unwrap().unwrap();
        assert_eq!(loaded.enemies[0].hp, 2);
        assert_eq!(loaded.round_number, 3);
    }

    #[tokio::test]
    async fn test_active_characters_and_delete() {
        let store = SqliteSessionStore::new(test_pool().await);

        store.upsert("alice", &sample_state("alice")).await.unwrap();
        let mut ended = sample_state("bob");
        ended.in_combat = false;
        ended.phase = Phase::CombatEnded;
        store.upsert("bob", &ended).await.unwrap();

        assert_eq!(store.active_characters().await.unwrap(), vec!["alice".to_string()]);

        assert!(store.delete("alice").await.unwrap());
        assert!(!store.delete("alice").await.unwrap());
        assert!(store.get("alice").await.unwrap().is_none());
    }
}
