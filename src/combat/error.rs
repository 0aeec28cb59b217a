//! Combat errors
//!
//! Every variant is recoverable: operations validate before writing, so a
//! failed call leaves the stored session as it was.

use thiserror::Error;

use super::dice::DiceError;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum CombatError {
    #[error(transparent)]
    InvalidDiceExpression(#[from] DiceError),

    #[error("character {0} is not in combat")]
    NotInCombat(String),

    #[error("no living enemy matches '{0}'")]
    InvalidTarget(String),

    #[error("illegal activation: {0}")]
    IllegalActivation(String),

    #[error("no attack is awaiting a damage roll")]
    NoPendingAttack,

    #[error("damage roll {rolls:?} does not fit {dice}")]
    InvalidDamageRoll { dice: String, rolls: Vec<u32> },

    #[error("combat needs at least one enemy")]
    NoEnemies,

    #[error("character {0} has no hit points left")]
    Incapacitated(String),

    #[error("character {0} not found")]
    CharacterNotFound(String),

    #[error("session store error: {0}")]
    Store(#[from] StoreError),

    #[error(transparent)]
    Provider(#[from] anyhow::Error),
}
