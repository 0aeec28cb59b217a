//! Combatant value types
//!
//! Enemies and the player carry the same combat-relevant stats (HP, AC,
//! attack bonus, damage dice and bonus). The player may additionally appear
//! in the turn order several times, once per activation.

use serde::{Deserialize, Serialize};

use super::dice::{parse_dice, roll_d20, DiceError, DiceSource};

/// Clamp a hit point value into `[0, hp_max]`
pub fn clamp_hp(hp: i32, hp_max: i32) -> i32 {
    hp.clamp(0, hp_max.max(0))
}

/// Stats used when this combatant attacks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttackProfile {
    pub attack_bonus: i32,
    pub damage_dice: String,
    pub damage_bonus: i32,
}

/// Stats used when this combatant is attacked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefenseProfile {
    pub ac: i32,
    pub hp: i32,
    pub hp_max: i32,
}

/// Anything that can attack and be attacked
pub trait Combatant {
    fn attack_profile(&self) -> AttackProfile;
    fn defense(&self) -> DefenseProfile;

    /// Set hit points, clamped to `[0, hp_max]`
    fn set_hp(&mut self, hp: i32);

    fn is_alive(&self) -> bool {
        self.defense().hp > 0
    }
}

/// Enemy as described by the caller at combat start
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnemySpec {
    pub name: String,
    pub hp: i32,
    pub ac: i32,
    #[serde(default)]
    pub attack_bonus: Option<i32>,
    #[serde(default)]
    pub damage_dice: Option<String>,
    #[serde(default)]
    pub damage_bonus: Option<i32>,
    #[serde(default)]
    pub initiative_bonus: Option<i32>,
}

impl EnemySpec {
    pub fn new(name: impl Into<String>, hp: i32, ac: i32) -> Self {
        Self {
            name: name.into(),
            hp,
            ac,
            attack_bonus: None,
            damage_dice: None,
            damage_bonus: None,
            initiative_bonus: None,
        }
    }

    pub fn with_attack(mut self, attack_bonus: i32, damage_dice: &str, damage_bonus: i32) -> Self {
        self.attack_bonus = Some(attack_bonus);
        self.damage_dice = Some(damage_dice.to_string());
        self.damage_bonus = Some(damage_bonus);
        self
    }
}

/// Attack stats given to enemies that do not bring their own
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnemyDefaults {
    pub attack_bonus: i32,
    pub damage_dice: String,
    pub damage_bonus: i32,
    pub initiative_bonus: i32,
}

impl Default for EnemyDefaults {
    fn default() -> Self {
        Self {
            attack_bonus: 3,
            damage_dice: "1d6".to_string(),
            damage_bonus: 1,
            initiative_bonus: 0,
        }
    }
}

/// An enemy in an active combat
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnemyCombatant {
    /// `enemy-{n}`, assigned at combat start
    pub id: String,
    pub name: String,
    pub initiative: i32,
    pub hp: i32,
    pub hp_max: i32,
    pub ac: i32,
    pub attack_bonus: i32,
    pub damage_dice: String,
    pub damage_bonus: i32,
}

impl EnemyCombatant {
    pub fn is_defeated(&self) -> bool {
        self.hp <= 0
    }
}

impl Combatant for EnemyCombatant {
    fn attack_profile(&self) -> AttackProfile {
        AttackProfile {
            attack_bonus: self.attack_bonus,
            damage_dice: self.damage_dice.clone(),
            damage_bonus: self.damage_bonus,
        }
    }

    fn defense(&self) -> DefenseProfile {
        DefenseProfile {
            ac: self.ac,
            hp: self.hp,
            hp_max: self.hp_max,
        }
    }

    fn set_hp(&mut self, hp: i32) {
        self.hp = clamp_hp(hp, self.hp_max);
    }
}

/// Player stats, derived once at combat start
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerCombatStats {
    pub character_id: String,
    pub name: String,
    pub hp: i32,
    pub hp_max: i32,
    pub ac: i32,
    pub initiative: i32,
    pub attack_bonus: i32,
    pub damage_dice: String,
    pub damage_bonus: i32,
}

impl Combatant for PlayerCombatStats {
    fn attack_profile(&self) -> AttackProfile {
        AttackProfile {
            attack_bonus: self.attack_bonus,
            damage_dice: self.damage_dice.clone(),
            damage_bonus: self.damage_bonus,
        }
    }

    fn defense(&self) -> DefenseProfile {
        DefenseProfile {
            ac: self.ac,
            hp: self.hp,
            hp_max: self.hp_max,
        }
    }

    fn set_hp(&mut self, hp: i32) {
        self.hp = clamp_hp(hp, self.hp_max);
    }
}

/// One activation slot in the turn order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnEntry {
    /// Enemy id, or `{characterId}#{idx}` for a player activation
    pub id: String,
    /// Underlying combatant (the character id for every player activation)
    pub origin_id: String,
    pub name: String,
    pub initiative: i32,
    pub is_player: bool,
}

/// Build enemies from specs, rolling each one's initiative.
///
/// Damage dice are validated before any die is rolled. Enemies enter combat
/// with at least 1 HP.
pub fn build_enemies<D: DiceSource + ?Sized>(
    specs: &[EnemySpec],
    defaults: &EnemyDefaults,
    dice: &mut D,
) -> Result<Vec<EnemyCombatant>, DiceError> {
    for spec in specs {
        parse_dice(spec.damage_dice.as_deref().unwrap_or(&defaults.damage_dice))?;
    }

    Ok(specs
        .iter()
        .enumerate()
        .map(|(idx, spec)| {
            let hp = spec.hp.max(1);
            let initiative_bonus = spec.initiative_bonus.unwrap_or(defaults.initiative_bonus);
            EnemyCombatant {
                id: format!("enemy-{}", idx + 1),
                name: spec.name.clone(),
                initiative: (roll_d20(dice) as i32).saturating_add(initiative_bonus),
                hp,
                hp_max: hp,
                ac: spec.ac,
                attack_bonus: spec.attack_bonus.unwrap_or(defaults.attack_bonus),
                damage_dice: spec
                    .damage_dice
                    .clone()
                    .unwrap_or_else(|| defaults.damage_dice.clone()),
                damage_bonus: spec.damage_bonus.unwrap_or(defaults.damage_bonus),
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::dice::ScriptedDice;

    #[test]
    fn test_clamp_hp() {
        assert_eq!(clamp_hp(-4, 10), 0);
        assert_eq!(clamp_hp(14, 10), 10);
        assert_eq!(clamp_hp(6, 10), 6);
    }

    #[test]
    fn test_build_enemies_assigns_ids_and_defaults() {
        let mut dice = ScriptedDice::new([12, 5]);
        let specs = vec![
            EnemySpec::new("Goblin", 7, 13),
            EnemySpec::new("Orc", 15, 13).with_attack(5, "1d12", 3),
        ];

        let enemies = build_enemies(&specs, &EnemyDefaults::default(), &mut dice).unwrap();

        assert_eq!(enemies[0].id, "enemy-1");
        assert_eq!(enemies[0].initiative, 12);
        assert_eq!(enemies[0].hp_max, 7);
        assert_eq!(enemies[0].attack_bonus, 3);
        assert_eq!(enemies[0].damage_dice, "1d6");

        assert_eq!(enemies[1].id, "enemy-2");
        assert_eq!(enemies[1].initiative, 5);
        assert_eq!(enemies[1].damage_dice, "1d12");
        assert_eq!(enemies[1].damage_bonus, 3);
    }

    #[test]
    fn test_build_enemies_rejects_bad_dice_before_rolling() {
        let mut dice = ScriptedDice::new([10, 10]);
        let specs = vec![
            EnemySpec::new("Goblin", 7, 13),
            EnemySpec::new("Blob", 4, 8).with_attack(1, "lots", 0),
        ];

        assert!(build_enemies(&specs, &EnemyDefaults::default(), &mut dice).is_err());
        assert_eq!(dice.remaining(), 2);
    }

    #[test]
    fn test_set_hp_clamps() {
        let mut dice = ScriptedDice::new([10]);
        let mut enemy = build_enemies(&[EnemySpec::new("Rat", 3, 10)], &EnemyDefaults::default(), &mut dice)
            .unwrap()
            .remove(0);

        enemy.set_hp(-8);
        assert_eq!(enemy.hp, 0);
        assert!(!enemy.is_alive());
        assert!(enemy.is_defeated());

        enemy.set_hp(99);
        assert_eq!(enemy.hp, 3);
    }
}
