//! Values returned by combat operations
//!
//! These carry every roll and flag needed to narrate a turn, but no text
//! templates. Post-combat character updates are emitted as tagged
//! [`CombatInstruction`]s for the caller to apply.

use serde::{Deserialize, Serialize};

use super::attack::AttackResult;
use super::combatant::TurnEntry;
use super::state::{CombatState, Phase};

/// One automatic enemy activation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnemyActivation {
    pub enemy_id: String,
    pub enemy_name: String,
    pub attack: AttackResult,
}

/// Result of starting combat
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CombatStart {
    pub state: CombatState,
    /// Enemies that won initiative and acted before the player's first activation
    pub opening: Vec<EnemyActivation>,
    /// True when an active session already existed and was returned unchanged
    pub resumed: bool,
}

/// Result of a player attack
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackOutcome {
    pub character_id: String,
    pub target_id: String,
    pub target_name: String,
    pub attack: AttackResult,
    /// Hit declared, damage roll still owed
    pub awaiting_damage: bool,
    pub turn_order_rebuilt: bool,
    pub action_remaining: u32,
    pub bonus_action_remaining: u32,
    pub victory: bool,
    pub xp_gained: Option<u32>,
}

/// Result of ending a player activation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivationOutcome {
    pub character_id: String,
    pub enemy_activations: Vec<EnemyActivation>,
    pub round_number: u32,
    /// The player activation now up, if combat continues
    pub current: Option<TurnEntry>,
    pub player_hp: i32,
    pub combat_ended: bool,
    pub defeat: bool,
}

/// Post-combat update for the character record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CombatInstruction {
    AwardXp { character_id: String, amount: u32 },
    SetHp { character_id: String, hp: i32 },
}

/// Returned when a session is closed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndCombatSummary {
    pub character_id: String,
    pub defeated_enemies: Vec<String>,
    pub xp_gained: u32,
    pub victory: bool,
    pub defeat: bool,
    pub player_hp: i32,
    pub rounds: u32,
}

impl EndCombatSummary {
    /// Character updates implied by this result
    pub fn instructions(&self) -> Vec<CombatInstruction> {
        let mut instructions = Vec::new();
        if self.xp_gained > 0 {
            instructions.push(CombatInstruction::AwardXp {
                character_id: self.character_id.clone(),
                amount: self.xp_gained,
            });
        }
        instructions.push(CombatInstruction::SetHp {
            character_id: self.character_id.clone(),
            hp: self.player_hp,
        });
        instructions
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnemyStatus {
    pub id: String,
    pub name: String,
    pub hp: i32,
    pub hp_max: i32,
    pub ac: i32,
    pub alive: bool,
}

/// Read-only snapshot of a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatSummary {
    pub character_id: String,
    pub in_combat: bool,
    pub round_number: u32,
    pub phase: Phase,
    pub current: Option<TurnEntry>,
    pub player_name: String,
    pub player_hp: i32,
    pub player_hp_max: i32,
    pub player_ac: i32,
    pub action_remaining: u32,
    pub bonus_action_remaining: u32,
    pub enemies: Vec<EnemyStatus>,
    pub turn_order: Vec<TurnEntry>,
}

impl std::fmt::Display for CombatSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Round {} - {}", self.round_number, self.phase)?;
        if let Some(current) = &self.current {
            writeln!(f, "Acting: {}", current.name)?;
        }
        writeln!(
            f,
            "{}: {}/{} HP, AC {} (actions {}, bonus {})",
            self.player_name,
            self.player_hp,
            self.player_hp_max,
            self.player_ac,
            self.action_remaining,
            self.bonus_action_remaining
        )?;
        for enemy in &self.enemies {
            let status = if enemy.alive { "" } else { " [defeated]" };
            writeln!(
                f,
                "  {} ({}): {}/{} HP, AC {}{}",
                enemy.name, enemy.id, enemy.hp, enemy.hp_max, enemy.ac, status
            )?;
        }
        let order: Vec<&str> = self.turn_order.iter().map(|e| e.name.as_str()).collect();
        write!(f, "Order: {}", order.join(" > "))
    }
}
