//! Attack resolution
//!
//! A natural 20 always hits and doubles the damage dice (never the flat
//! bonus). A natural 1 always misses. Otherwise the attack hits when
//! `d20 + attack_bonus >= AC`.

use serde::{Deserialize, Serialize};

use super::combatant::{clamp_hp, AttackProfile, DefenseProfile};
use super::dice::{face_sum, is_critical, is_fumble, parse_dice, roll_d20, DiceError, DiceSource};

/// The damage half of a hit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DamageRoll {
    /// Expression that was rolled, e.g. "1d8"
    pub dice: String,
    /// Individual faces
    pub rolls: Vec<u32>,
    /// Sum of the faces, doubled on a critical
    pub dice_total: i32,
    pub damage_bonus: i32,
    /// `max(0, dice_total + damage_bonus)`
    pub total: i32,
}

impl DamageRoll {
    /// Combine faces into damage
    pub fn from_faces(dice: &str, rolls: Vec<u32>, damage_bonus: i32, critical: bool) -> Self {
        let sum = face_sum(&rolls);
        let dice_total = if critical { sum.saturating_mul(2) } else { sum };

        Self {
            dice: dice.to_string(),
            rolls,
            dice_total,
            damage_bonus,
            total: dice_total.saturating_add(damage_bonus).max(0),
        }
    }
}

/// Result of an attack
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackResult {
    /// The d20 roll
    pub roll: u32,
    /// Total attack value (roll + bonus)
    pub attack_total: i32,
    /// Target's AC
    pub target_ac: i32,
    /// Whether the attack hit
    pub hit: bool,
    /// Whether it was a critical hit
    pub critical: bool,
    /// Whether it was a fumble
    pub fumble: bool,
    /// Damage roll if hit
    pub damage: Option<DamageRoll>,
    pub total_damage: i32,
    pub target_hp_before: i32,
    pub target_hp_after: i32,
    pub target_defeated: bool,
}

impl AttackResult {
    /// To-hit result with no damage applied yet
    pub fn new(roll: u32, attack_bonus: i32, target: &DefenseProfile) -> Self {
        let critical = is_critical(roll);
        let fumble = is_fumble(roll);
        let attack_total = (roll as i32).saturating_add(attack_bonus);

        // Critical always hits, fumble always misses
        let hit = critical || (!fumble && attack_total >= target.ac);

        Self {
            roll,
            attack_total,
            target_ac: target.ac,
            hit,
            critical,
            fumble,
            damage: None,
            total_damage: 0,
            target_hp_before: target.hp,
            target_hp_after: target.hp,
            target_defeated: target.hp <= 0,
        }
    }

    /// Apply a damage roll against the target's current hit points
    pub fn with_damage(mut self, damage: DamageRoll, target: &DefenseProfile) -> Self {
        self.total_damage = damage.total;
        self.target_hp_before = target.hp;
        self.target_hp_after = clamp_hp(target.hp.saturating_sub(damage.total), target.hp_max);
        self.target_defeated = self.target_hp_after <= 0;
        self.damage = Some(damage);
        self
    }
}

/// Roll to hit only
pub fn roll_to_hit<D: DiceSource + ?Sized>(
    dice: &mut D,
    attacker: &AttackProfile,
    target: &DefenseProfile,
) -> AttackResult {
    AttackResult::new(roll_d20(dice), attacker.attack_bonus, target)
}

/// Resolve a full attack: to-hit, then damage on a hit.
///
/// The damage expression is validated before the d20 is rolled.
pub fn resolve_attack<D: DiceSource + ?Sized>(
    dice: &mut D,
    attacker: &AttackProfile,
    target: &DefenseProfile,
) -> Result<AttackResult, DiceError> {
    let damage_dice = parse_dice(&attacker.damage_dice)?;
    let result = roll_to_hit(dice, attacker, target);

    if !result.hit {
        return Ok(result);
    }

    // a modifier inside the expression counts as flat bonus
    let faces = damage_dice.roll(dice).rolls;
    let damage = DamageRoll::from_faces(
        &attacker.damage_dice,
        faces,
        attacker.damage_bonus.saturating_add(damage_dice.modifier),
        result.critical,
    );
    Ok(result.with_damage(damage, target))
}
