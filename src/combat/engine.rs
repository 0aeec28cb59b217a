//! Combat engine
//!
//! Orchestrates sessions over a [`SessionStore`]: load the state, validate
//! and transition it in memory, then write it back. Operations for the same
//! character are serialized through a per-character lock; different
//! characters never contend.
//!
//! Dice are drawn in a fixed order. At combat start: one d20 per enemy (in
//! input order), one d20 for the player, then any opening enemy attacks.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info};

use super::combatant::{build_enemies, EnemyCombatant, EnemyDefaults, EnemySpec};
use super::dice::DiceSource;
use super::error::CombatError;
use super::outcome::{ActivationOutcome, AttackOutcome, CombatStart, CombatSummary, EndCombatSummary};
use super::state::{ActionKind, CombatState};
use super::stats::derive_player_stats;
use super::turn_order::roll_initiative;
use crate::character::{ArmorClassRule, CharacterProvider, CharacterSheet, UnarmoredDefense};
use crate::store::SessionStore;

/// Turn-based combat engine
pub struct CombatEngine<S, D> {
    store: S,
    dice: Mutex<D>,
    session_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
    enemy_defaults: EnemyDefaults,
    armor: Box<dyn ArmorClassRule>,
}

impl<S, D> CombatEngine<S, D>
where
    S: SessionStore,
    D: DiceSource + Send,
{
    /// Create a new engine over a store and dice source
    pub fn new(store: S, dice: D) -> Self {
        Self {
            store,
            dice: Mutex::new(dice),
            session_locks: Mutex::new(HashMap::new()),
            enemy_defaults: EnemyDefaults::default(),
            armor: Box::new(UnarmoredDefense),
        }
    }

    /// Attack stats for enemies that do not bring their own
    pub fn with_enemy_defaults(mut self, defaults: EnemyDefaults) -> Self {
        self.enemy_defaults = defaults;
        self
    }

    /// Armor class computation for players
    pub fn with_armor_class_rule(mut self, rule: impl ArmorClassRule + 'static) -> Self {
        self.armor = Box::new(rule);
        self
    }

    /// Get the session store
    pub fn store(&self) -> &S {
        &self.store
    }

    fn session_lock(&self, character_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        self.session_locks
            .lock()
            .entry(character_id.to_string())
            .or_default()
            .clone()
    }

    /// Forget a character's lock once nobody else holds or awaits it
    fn release_session_lock(&self, character_id: &str, lock: Arc<tokio::sync::Mutex<()>>) {
        let mut locks = self.session_locks.lock();
        let idle = locks
            .get(character_id)
            .is_some_and(|held| Arc::ptr_eq(held, &lock) && Arc::strong_count(&lock) == 2);
        if idle {
            locks.remove(character_id);
        }
    }

    /// Start combat for a character.
    ///
    /// If an active session already exists it is returned unchanged with
    /// `resumed = true`. An ended session is replaced.
    pub async fn start_combat(
        &self,
        character: &CharacterSheet,
        enemies: &[EnemySpec],
    ) -> Result<CombatStart, CombatError> {
        let lock = self.session_lock(&character.id);
        let _guard = lock.lock().await;

        if let Some(existing) = self.store.get(&character.id).await? {
            if existing.in_combat {
                debug!("{} is already in combat, resuming", character.id);
                return Ok(CombatStart {
                    state: existing,
                    opening: Vec::new(),
                    resumed: true,
                });
            }
        }

        let (state, opening) = {
            let mut dice = self.dice.lock();
            let enemies = build_enemies(enemies, &self.enemy_defaults, &mut *dice)?;
            let mut player = derive_player_stats(character, self.armor.as_ref());
            player.initiative =
                roll_initiative(&mut *dice, character.abilities.dexterity_modifier());
            CombatState::begin(&character.id, player, enemies, &mut *dice)?
        };

        self.store.upsert(&character.id, &state).await?;
        info!(
            "{} started combat {} against {} enemies",
            character.id,
            state.session_id,
            state.enemies.len()
        );

        Ok(CombatStart {
            state,
            opening,
            resumed: false,
        })
    }

    /// Load a character through `provider`, then start combat
    pub async fn start_combat_for<P: CharacterProvider>(
        &self,
        provider: &P,
        user_id: &str,
        character_id: &str,
        enemies: &[EnemySpec],
    ) -> Result<CombatStart, CombatError> {
        let character = provider
            .load(user_id, character_id)
            .await?
            .ok_or_else(|| CombatError::CharacterNotFound(character_id.to_string()))?;
        self.start_combat(&character, enemies).await
    }

    /// Load, transition and commit a session
    async fn transition<T>(
        &self,
        character_id: &str,
        apply: impl FnOnce(CombatState, &mut D) -> Result<(CombatState, T), CombatError> + Send,
    ) -> Result<T, CombatError> {
        let lock = self.session_lock(character_id);
        let _guard = lock.lock().await;

        let state = self
            .store
            .get(character_id)
            .await?
            .ok_or_else(|| CombatError::NotInCombat(character_id.to_string()))?;

        let (next, output) = {
            let mut dice = self.dice.lock();
            apply(state, &mut *dice)?
        };

        self.store.upsert(character_id, &next).await?;
        Ok(output)
    }

    /// Attack a living enemy with the player's action
    pub async fn attack(&self, character_id: &str, target: &str) -> Result<AttackOutcome, CombatError> {
        self.transition(character_id, |state, dice| {
            state.attack(target, ActionKind::Action, dice)
        })
        .await
    }

    /// Attack a living enemy with the player's bonus action
    pub async fn bonus_attack(
        &self,
        character_id: &str,
        target: &str,
    ) -> Result<AttackOutcome, CombatError> {
        self.transition(character_id, |state, dice| {
            state.attack(target, ActionKind::BonusAction, dice)
        })
        .await
    }

    /// Roll to hit only; a hit waits for [`CombatEngine::apply_damage_roll`]
    pub async fn declare_attack(
        &self,
        character_id: &str,
        target: &str,
        kind: ActionKind,
    ) -> Result<AttackOutcome, CombatError> {
        self.transition(character_id, |state, dice| {
            state.declare_attack(target, kind, dice)
        })
        .await
    }

    /// Apply client-rolled damage faces to a declared hit
    pub async fn apply_damage_roll(
        &self,
        character_id: &str,
        rolls: Vec<u32>,
    ) -> Result<AttackOutcome, CombatError> {
        self.transition(character_id, |state, _| state.apply_damage_roll(rolls))
            .await
    }

    /// End the player's activation, resolving enemy activations up to the
    /// next player activation or the end of combat
    pub async fn end_player_activation(
        &self,
        character_id: &str,
    ) -> Result<ActivationOutcome, CombatError> {
        self.transition(character_id, |state, dice| state.end_player_activation(dice))
            .await
    }

    /// Close the session (victory, defeat or flee).
    ///
    /// Returns `None` if there was no session.
    pub async fn end_combat(
        &self,
        character_id: &str,
    ) -> Result<Option<EndCombatSummary>, CombatError> {
        let lock = self.session_lock(character_id);
        let guard = lock.lock().await;

        let Some(state) = self.store.get(character_id).await? else {
            drop(guard);
            self.release_session_lock(character_id, lock);
            return Ok(None);
        };

        self.store.delete(character_id).await?;
        drop(guard);
        self.release_session_lock(character_id, lock);

        let summary = state.end_summary();
        info!(
            "{} closed combat {} ({} XP)",
            character_id, state.session_id, summary.xp_gained
        );
        Ok(Some(summary))
    }

    /// Living enemies the player may target
    pub async fn valid_targets(
        &self,
        character_id: &str,
    ) -> Result<Vec<EnemyCombatant>, CombatError> {
        Ok(self
            .store
            .get(character_id)
            .await?
            .filter(|s| s.in_combat)
            .map(|s| s.valid_targets().into_iter().cloned().collect())
            .unwrap_or_default())
    }

    /// Snapshot of the session, active or ended
    pub async fn combat_summary(
        &self,
        character_id: &str,
    ) -> Result<Option<CombatSummary>, CombatError> {
        Ok(self.store.get(character_id).await?.map(|s| s.summary()))
    }

    pub async fn is_in_combat(&self, character_id: &str) -> Result<bool, CombatError> {
        Ok(self
            .store
            .get(character_id)
            .await?
            .is_some_and(|s| s.in_combat))
    }
}
