//! Combat system module
//!
//! Turn-based combat between one player character and a group of enemies:
//! - Dice notation parsing and rolling (e.g., "2d6+3")
//! - Player stats derived from the character sheet
//! - Initiative order with one player activation per living enemy
//! - Attack resolution with criticals, fumbles and HP clamping
//! - Automatic enemy activations, victory, defeat and XP
//! - Session orchestration over a pluggable store

mod attack;
mod combatant;
mod dice;
mod engine;
mod error;
mod machine;
mod outcome;
mod state;
mod stats;
mod turn_order;

pub use attack::{resolve_attack, roll_to_hit, AttackResult, DamageRoll};
pub use combatant::{
    build_enemies, clamp_hp, AttackProfile, Combatant, DefenseProfile, EnemyCombatant,
    EnemyDefaults, EnemySpec, PlayerCombatStats, TurnEntry,
};
pub use dice::{
    face_sum, is_critical, is_fumble, parse_dice, roll_d20, roll_expression, DiceError,
    DiceRoll, DiceSource, RollOutcome, ScriptedDice, MAX_DICE, MAX_SIDES,
};
pub use engine::CombatEngine;
pub use error::CombatError;
pub use outcome::{
    ActivationOutcome, AttackOutcome, CombatInstruction, CombatStart, CombatSummary,
    EndCombatSummary, EnemyActivation, EnemyStatus,
};
pub use state::{
    calculate_xp_reward, xp_for, ActionKind, CombatEnd, CombatState, PendingAttack, Phase,
    DEFAULT_ACTIONS, DEFAULT_BONUS_ACTIONS,
};
pub use stats::{derive_player_stats, UNARMED_DAMAGE_DICE};
pub use turn_order::{build_turn_order, player_activation_count, rebuild_turn_order};
