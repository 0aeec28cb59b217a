//! Character data boundary
//!
//! The engine reads a character's ability scores, proficiency, hit points
//! and equipped inventory once at combat start. Loading and updating the
//! character record belongs to the surrounding application and is reached
//! through [`CharacterProvider`].

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::combat::CombatInstruction;

/// Ability modifier for a score: `floor((score - 10) / 2)`
pub fn ability_modifier(score: i32) -> i32 {
    (score - 10).div_euclid(2)
}

/// The six ability scores
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilityScores {
    pub strength: i32,
    pub dexterity: i32,
    pub constitution: i32,
    pub intelligence: i32,
    pub wisdom: i32,
    pub charisma: i32,
}

impl Default for AbilityScores {
    fn default() -> Self {
        Self {
            strength: 10,
            dexterity: 10,
            constitution: 10,
            intelligence: 10,
            wisdom: 10,
            charisma: 10,
        }
    }
}

impl AbilityScores {
    pub fn strength_modifier(&self) -> i32 {
        ability_modifier(self.strength)
    }

    pub fn dexterity_modifier(&self) -> i32 {
        ability_modifier(self.dexterity)
    }
}

/// Free-form item metadata as stored on the character record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemMetadata {
    /// Damage text, e.g. "1d8 slashing"
    pub damage: Option<String>,
    /// Weapon properties, e.g. "finesse", "ammunition", "light"
    pub properties: Vec<String>,
    /// Weapon category, e.g. "simple melee", "martial ranged"
    pub category: Option<String>,
}

/// An inventory entry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InventoryItem {
    pub definition_id: String,
    pub name: String,
    pub equipped: bool,
    pub is_weapon: bool,
    pub metadata: ItemMetadata,
}

impl InventoryItem {
    pub fn has_property(&self, property: &str) -> bool {
        self.metadata
            .properties
            .iter()
            .any(|p| p.trim().eq_ignore_ascii_case(property))
    }

    pub fn is_ranged(&self) -> bool {
        self.metadata
            .category
            .as_deref()
            .is_some_and(|c| c.to_lowercase().contains("ranged"))
    }
}

/// The slice of a character record the combat engine needs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterSheet {
    pub id: String,
    #[serde(default)]
    pub user_id: String,
    pub name: String,
    #[serde(default)]
    pub abilities: AbilityScores,
    pub proficiency_bonus: i32,
    pub hp: i32,
    pub hp_max: i32,
    #[serde(default)]
    pub experience: u32,
    #[serde(default)]
    pub inventory: Vec<InventoryItem>,
}

/// Computes a character's armor class
pub trait ArmorClassRule: Send + Sync {
    fn armor_class(&self, character: &CharacterSheet) -> i32;
}

impl<F> ArmorClassRule for F
where
    F: Fn(&CharacterSheet) -> i32 + Send + Sync,
{
    fn armor_class(&self, character: &CharacterSheet) -> i32 {
        self(character)
    }
}

/// 10 + DEX modifier
#[derive(Debug, Clone, Copy, Default)]
pub struct UnarmoredDefense;

impl ArmorClassRule for UnarmoredDefense {
    fn armor_class(&self, character: &CharacterSheet) -> i32 {
        10 + character.abilities.dexterity_modifier()
    }
}

/// Loads characters and applies post-combat instructions to them
pub trait CharacterProvider: Send + Sync {
    fn load(
        &self,
        user_id: &str,
        character_id: &str,
    ) -> impl Future<Output = anyhow::Result<Option<CharacterSheet>>> + Send;

    fn apply(
        &self,
        user_id: &str,
        instruction: &CombatInstruction,
    ) -> impl Future<Output = anyhow::Result<()>> + Send;
}
