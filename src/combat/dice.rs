//! Dice rolling system
//!
//! Parses and rolls dice notation like "2d6+3", "1d20", "4d6-2".
//! Every roll draws from a caller-supplied [`DiceSource`], so a seeded or
//! scripted source makes combat fully reproducible.

use std::collections::VecDeque;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// Upper bound on dice in a single expression
pub const MAX_DICE: u32 = 100;

/// Upper bound on sides per die
pub const MAX_SIDES: u32 = 1000;

/// Sum of die faces, saturating at `i32::MAX`
pub fn face_sum(faces: &[u32]) -> i32 {
    let sum: i64 = faces.iter().map(|&f| i64::from(f)).sum();
    saturate(sum)
}

fn saturate(value: i64) -> i32 {
    value.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

/// Dice errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiceError {
    #[error("invalid dice expression '{expression}': {reason}")]
    InvalidExpression { expression: String, reason: String },
}

impl DiceError {
    fn invalid(expression: &str, reason: impl Into<String>) -> Self {
        DiceError::InvalidExpression {
            expression: expression.to_string(),
            reason: reason.into(),
        }
    }
}

/// Uniform source of die faces
pub trait DiceSource {
    /// Roll one die, returning a value in `1..=sides`
    fn roll_die(&mut self, sides: u32) -> u32;
}

impl<R: rand::RngCore> DiceSource for R {
    fn roll_die(&mut self, sides: u32) -> u32 {
        self.random_range(1..=sides.max(1))
    }
}

/// A dice source that replays a fixed sequence of faces.
///
/// Values are clamped into `1..=sides` for the die being rolled. Once the
/// script runs out every die shows its lowest face.
#[derive(Debug, Clone, Default)]
pub struct ScriptedDice {
    faces: VecDeque<u32>,
}

impl ScriptedDice {
    pub fn new(faces: impl IntoIterator<Item = u32>) -> Self {
        Self {
            faces: faces.into_iter().collect(),
        }
    }

    /// Faces not yet consumed
    pub fn remaining(&self) -> usize {
        self.faces.len()
    }
}

impl DiceSource for ScriptedDice {
    fn roll_die(&mut self, sides: u32) -> u32 {
        let sides = sides.max(1);
        match self.faces.pop_front() {
            Some(face) => face.clamp(1, sides),
            None => {
                warn!("Scripted dice exhausted, rolling 1 on a d{}", sides);
                1
            }
        }
    }
}

/// A parsed dice roll specification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiceRoll {
    /// Number of dice to roll
    pub count: u32,
    /// Number of sides per die
    pub sides: u32,
    /// Modifier to add/subtract
    pub modifier: i32,
}

/// Individual faces plus the modified total
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollOutcome {
    pub rolls: Vec<u32>,
    pub total: i32,
}

impl RollOutcome {
    /// Sum of the faces, without the modifier
    pub fn dice_total(&self) -> i32 {
        face_sum(&self.rolls)
    }
}

impl DiceRoll {
    /// Create a new dice roll
    pub fn new(count: u32, sides: u32, modifier: i32) -> Self {
        Self { count, sides, modifier }
    }

    /// Roll and return individual die results plus total
    pub fn roll<D: DiceSource + ?Sized>(&self, source: &mut D) -> RollOutcome {
        let rolls: Vec<u32> = (0..self.count).map(|_| source.roll_die(self.sides)).collect();
        let total = face_sum(&rolls).saturating_add(self.modifier);
        RollOutcome { rolls, total }
    }

    /// Check that externally supplied faces fit this roll
    pub fn accepts(&self, faces: &[u32]) -> bool {
        faces.len() == self.count as usize && faces.iter().all(|f| (1..=self.sides).contains(f))
    }

    /// Get the minimum possible result
    pub fn min(&self) -> i32 {
        saturate(i64::from(self.count) + i64::from(self.modifier))
    }

    /// Get the maximum possible result
    pub fn max(&self) -> i32 {
        saturate(i64::from(self.count) * i64::from(self.sides) + i64::from(self.modifier))
    }

    /// Get the expected average (rounded down)
    pub fn average(&self) -> i32 {
        let avg_per_die = (1.0 + self.sides as f64) / 2.0;
        (self.count as f64 * avg_per_die + self.modifier as f64) as i32
    }
}

impl FromStr for DiceRoll {
    type Err = DiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_dice(s)
    }
}

impl std::fmt::Display for DiceRoll {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.modifier > 0 {
            write!(f, "{}d{}+{}", self.count, self.sides, self.modifier)
        } else if self.modifier < 0 {
            write!(f, "{}d{}{}", self.count, self.sides, self.modifier)
        } else {
            write!(f, "{}d{}", self.count, self.sides)
        }
    }
}

/// Parse a dice notation string like "2d6+3"
pub fn parse_dice(notation: &str) -> Result<DiceRoll, DiceError> {
    let original = notation;
    let notation = notation.trim().to_lowercase();

    let d_pos = notation
        .find('d')
        .ok_or_else(|| DiceError::invalid(original, "missing 'd'"))?;

    // "d6" means "1d6"
    let count_str = &notation[..d_pos];
    let count: u32 = if count_str.is_empty() {
        1
    } else {
        count_str
            .parse()
            .map_err(|_| DiceError::invalid(original, format!("bad dice count '{}'", count_str)))?
    };

    if count == 0 {
        return Err(DiceError::invalid(original, "dice count must be at least 1"));
    }
    if count > MAX_DICE {
        return Err(DiceError::invalid(
            original,
            format!("at most {} dice per roll", MAX_DICE),
        ));
    }

    let rest = &notation[d_pos + 1..];

    let (sides_str, modifier) = if let Some(plus_pos) = rest.find('+') {
        let mod_str = &rest[plus_pos + 1..];
        let modifier: i32 = mod_str
            .parse()
            .map_err(|_| DiceError::invalid(original, format!("bad modifier '{}'", mod_str)))?;
        (&rest[..plus_pos], modifier)
    } else if let Some(minus_pos) = rest.rfind('-').filter(|&pos| pos > 0) {
        // includes the minus sign
        let mod_str = &rest[minus_pos..];
        let modifier: i32 = mod_str
            .parse()
            .map_err(|_| DiceError::invalid(original, format!("bad modifier '{}'", mod_str)))?;
        (&rest[..minus_pos], modifier)
    } else {
        (rest, 0)
    };

    let sides: u32 = sides_str
        .parse()
        .map_err(|_| DiceError::invalid(original, format!("bad die sides '{}'", sides_str)))?;

    if sides == 0 {
        return Err(DiceError::invalid(original, "die sides must be at least 1"));
    }
    if sides > MAX_SIDES {
        return Err(DiceError::invalid(
            original,
            format!("at most {} sides per die", MAX_SIDES),
        ));
    }

    Ok(DiceRoll { count, sides, modifier })
}

/// Parse and roll an expression in one step
pub fn roll_expression<D: DiceSource + ?Sized>(
    expression: &str,
    source: &mut D,
) -> Result<RollOutcome, DiceError> {
    Ok(parse_dice(expression)?.roll(source))
}

/// Roll a single d20
pub fn roll_d20<D: DiceSource + ?Sized>(source: &mut D) -> u32 {
    source.roll_die(20)
}

/// Check if a d20 roll is a natural 20 (critical hit)
pub fn is_critical(roll: u32) -> bool {
    roll == 20
}

/// Check if a d20 roll is a natural 1 (critical fail)
pub fn is_fumble(roll: u32) -> bool {
    roll == 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_parse_basic() {
        let roll = parse_dice("2d6").unwrap();
        assert_eq!(roll, DiceRoll::new(2, 6, 0));
    }

    #[test]
    fn test_parse_with_modifiers() {
        assert_eq!(parse_dice("1d20+5").unwrap(), DiceRoll::new(1, 20, 5));
        assert_eq!(parse_dice("3d8-2").unwrap(), DiceRoll::new(3, 8, -2));
        assert_eq!(parse_dice("  2D10+3 ").unwrap(), DiceRoll::new(2, 10, 3));
    }

    #[test]
    fn test_parse_implicit_one() {
        assert_eq!(parse_dice("d6").unwrap(), DiceRoll::new(1, 6, 0));
    }

    #[test]
    fn test_parse_invalid() {
        for bad in ["abc", "2d", "d", "0d6", "2d0", "2d-6", "1d6+x", "500d6", ""] {
            assert!(
                matches!(parse_dice(bad), Err(DiceError::InvalidExpression { .. })),
                "{:?} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_parse_rejects_oversized_die() {
        assert_eq!(parse_dice("1d1000").unwrap().sides, MAX_SIDES);
        for bad in ["1d1001", "3d4000000000", "1d99999999999"] {
            assert!(
                matches!(parse_dice(bad), Err(DiceError::InvalidExpression { .. })),
                "{:?} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_extreme_values_saturate() {
        assert_eq!(face_sum(&[u32::MAX, u32::MAX, u32::MAX]), i32::MAX);

        let roll = DiceRoll::new(u32::MAX, u32::MAX, i32::MAX);
        assert_eq!(roll.max(), i32::MAX);
        assert_eq!(roll.min(), i32::MAX);

        let mut dice = ScriptedDice::new([4_000_000_000, 4_000_000_000]);
        let outcome = DiceRoll::new(2, u32::MAX, 5).roll(&mut dice);
        assert_eq!(outcome.dice_total(), i32::MAX);
        assert_eq!(outcome.total, i32::MAX);
    }

    #[test]
    fn test_roll_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        let roll = DiceRoll::new(2, 6, 0);

        for _ in 0..200 {
            let outcome = roll.roll(&mut rng);
            assert_eq!(outcome.rolls.len(), 2);
            assert!(outcome.rolls.iter().all(|r| (1..=6).contains(r)));
            assert!((2..=12).contains(&outcome.total));
        }
    }

    #[test]
    fn test_roll_expression_reports_faces() {
        let mut dice = ScriptedDice::new([3, 5, 6]);
        let outcome = roll_expression("3d6+2", &mut dice).unwrap();
        assert_eq!(outcome.rolls, vec![3, 5, 6]);
        assert_eq!(outcome.dice_total(), 14);
        assert_eq!(outcome.total, 16);
    }

    #[test]
    fn test_invalid_expression_consumes_no_entropy() {
        let mut dice = ScriptedDice::new([4]);
        assert!(roll_expression("xd6", &mut dice).is_err());
        assert_eq!(dice.remaining(), 1);
    }

    #[test]
    fn test_scripted_dice_clamps_and_exhausts() {
        let mut dice = ScriptedDice::new([9, 0]);
        assert_eq!(dice.roll_die(6), 6);
        assert_eq!(dice.roll_die(6), 1);
        assert_eq!(dice.roll_die(20), 1);
    }

    #[test]
    fn test_accepts() {
        let roll = DiceRoll::new(2, 6, 0);
        assert!(roll.accepts(&[1, 6]));
        assert!(!roll.accepts(&[7, 1]));
        assert!(!roll.accepts(&[3]));
    }

    #[test]
    fn test_min_max_average() {
        let roll = DiceRoll::new(2, 6, 3);
        assert_eq!(roll.min(), 5);
        assert_eq!(roll.max(), 15);
        assert_eq!(roll.average(), 10);
    }

    #[test]
    fn test_display() {
        assert_eq!(DiceRoll::new(2, 6, 0).to_string(), "2d6");
        assert_eq!(DiceRoll::new(1, 20, 5).to_string(), "1d20+5");
        assert_eq!(DiceRoll::new(3, 8, -2).to_string(), "3d8-2");
    }

    #[test]
    fn test_critical_fumble() {
        assert!(is_critical(20));
        assert!(!is_critical(19));
        assert!(is_fumble(1));
        assert!(!is_fumble(2));
    }
}
