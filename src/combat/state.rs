//! Combat session state
//!
//! One `CombatState` exists per character. It is a plain value: the
//! transitions in `machine` consume a state and hand back the next one, and
//! the engine commits it to the session store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::attack::AttackResult;
use super::combatant::{EnemyCombatant, PlayerCombatStats, TurnEntry};
use super::error::CombatError;
use super::outcome::{CombatSummary, EndCombatSummary, EnemyStatus};

/// Where the session is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    PlayerTurn,
    EnemyTurn,
    AwaitingDamageRoll,
    CombatEnded,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Phase::PlayerTurn => "player turn",
            Phase::EnemyTurn => "enemy turn",
            Phase::AwaitingDamageRoll => "awaiting damage roll",
            Phase::CombatEnded => "combat ended",
        };
        write!(f, "{}", s)
    }
}

/// Budget an offensive action draws from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Action,
    BonusAction,
}

/// How a finished combat ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombatEnd {
    Victory,
    Defeat,
}

/// A hit waiting on a client-supplied damage roll
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingAttack {
    pub target_id: String,
    pub result: AttackResult,
}

/// Default number of actions per player activation
pub const DEFAULT_ACTIONS: u32 = 1;
/// Default number of bonus actions per player activation
pub const DEFAULT_BONUS_ACTIONS: u32 = 1;

/// XP for one defeated enemy
pub fn xp_for(enemy: &EnemyCombatant) -> u32 {
    enemy.hp_max.max(0) as u32 * 10
}

/// `sum(hp_max * 10)` over the defeated enemies
pub fn calculate_xp_reward(enemies: &[EnemyCombatant]) -> u32 {
    enemies.iter().filter(|e| e.is_defeated()).map(xp_for).sum()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatState {
    pub session_id: String,
    pub character_id: String,
    pub in_combat: bool,
    pub enemies: Vec<EnemyCombatant>,
    pub player: PlayerCombatStats,
    pub turn_order: Vec<TurnEntry>,
    pub current_turn_index: usize,
    pub round_number: u32,
    pub phase: Phase,
    pub action_remaining: u32,
    pub action_max: u32,
    pub bonus_action_remaining: u32,
    pub bonus_action_max: u32,
    #[serde(default)]
    pub result: Option<CombatEnd>,
    #[serde(default)]
    pub pending_attack: Option<PendingAttack>,
    pub started_at: DateTime<Utc>,
}

impl CombatState {
    /// Entry about to act or currently acting
    pub fn current_entry(&self) -> Option<&TurnEntry> {
        self.turn_order.get(self.current_turn_index)
    }

    pub fn is_player_activation(&self) -> bool {
        self.current_entry().is_some_and(|e| e.is_player)
    }

    pub fn alive_enemies(&self) -> impl Iterator<Item = &EnemyCombatant> {
        self.enemies.iter().filter(|e| !e.is_defeated())
    }

    /// Enemies the player may attack
    pub fn valid_targets(&self) -> Vec<&EnemyCombatant> {
        self.alive_enemies().collect()
    }

    pub fn defeated_enemy_names(&self) -> Vec<String> {
        self.enemies
            .iter()
            .filter(|e| e.is_defeated())
            .map(|e| e.name.clone())
            .collect()
    }

    pub fn xp_reward(&self) -> u32 {
        calculate_xp_reward(&self.enemies)
    }

    pub fn is_victory(&self) -> bool {
        self.result == Some(CombatEnd::Victory)
    }

    pub fn is_defeat(&self) -> bool {
        self.result == Some(CombatEnd::Defeat)
    }

    /// Index of the living enemy matching `query`: exact id, then
    /// case-insensitive exact name, then the first case-insensitive
    /// substring match.
    pub fn find_target(&self, query: &str) -> Result<usize, CombatError> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Err(CombatError::InvalidTarget(query.to_string()));
        }

        let alive = || {
            self.enemies
                .iter()
                .enumerate()
                .filter(|(_, e)| !e.is_defeated())
        };

        alive()
            .find(|(_, e)| e.id == query.trim())
            .or_else(|| alive().find(|(_, e)| e.name.to_lowercase() == needle))
            .or_else(|| alive().find(|(_, e)| e.name.to_lowercase().contains(&needle)))
            .map(|(idx, _)| idx)
            .ok_or_else(|| CombatError::InvalidTarget(query.to_string()))
    }

    pub fn summary(&self) -> CombatSummary {
        CombatSummary {
            character_id: self.character_id.clone(),
            in_combat: self.in_combat,
            round_number: self.round_number,
            phase: self.phase,
            current: self.current_entry().cloned(),
            player_name: self.player.name.clone(),
            player_hp: self.player.hp,
            player_hp_max: self.player.hp_max,
            player_ac: self.player.ac,
            action_remaining: self.action_remaining,
            bonus_action_remaining: self.bonus_action_remaining,
            enemies: self
                .enemies
                .iter()
                .map(|e| EnemyStatus {
                    id: e.id.clone(),
                    name: e.name.clone(),
                    hp: e.hp,
                    hp_max: e.hp_max,
                    ac: e.ac,
                    alive: !e.is_defeated(),
                })
                .collect(),
            turn_order: self.turn_order.clone(),
        }
    }

    pub fn end_summary(&self) -> EndCombatSummary {
        EndCombatSummary {
            character_id: self.character_id.clone(),
            defeated_enemies: self.defeated_enemy_names(),
            xp_gained: self.xp_reward(),
            victory: self.is_victory(),
            defeat: self.is_defeat(),
            player_hp: self.player.hp,
            rounds: self.round_number,
        }
    }
}
