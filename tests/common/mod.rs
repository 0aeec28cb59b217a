//! Common test utilities - characters, engines and a recording provider

#![allow(dead_code)]

use std::collections::HashMap;

use anyhow::Result;
use parking_lot::Mutex;

use skirmish::character::{
    AbilityScores, CharacterProvider, CharacterSheet, InventoryItem, ItemMetadata,
};
use skirmish::combat::{CombatEngine, CombatInstruction, ScriptedDice};
use skirmish::store::MemorySessionStore;

pub type TestEngine = CombatEngine<MemorySessionStore, ScriptedDice>;

/// STR 16, proficiency 2, 12 HP, unarmed (1d4+3, +5 to hit, AC 10)
pub fn fighter(id: &str) -> CharacterSheet {
    CharacterSheet {
        id: id.to_string(),
        user_id: "user-1".to_string(),
        name: "Brienne".to_string(),
        abilities: AbilityScores {
            strength: 16,
            ..AbilityScores::default()
        },
        proficiency_bonus: 2,
        hp: 12,
        hp_max: 12,
        experience: 0,
        inventory: vec![],
    }
}

/// `fighter` wielding a 1d6 club
pub fn fighter_with_club(id: &str) -> CharacterSheet {
    let mut sheet = fighter(id);
    sheet.inventory.push(InventoryItem {
        definition_id: "weapon_club".to_string(),
        name: "Club".to_string(),
        equipped: true,
        is_weapon: true,
        metadata: ItemMetadata {
            damage: Some("1d6 bludgeoning".to_string()),
            properties: vec!["light".to_string()],
            category: Some("simple melee".to_string()),
        },
    });
    sheet
}

pub fn engine(faces: impl IntoIterator<Item = u32>) -> TestEngine {
    CombatEngine::new(MemorySessionStore::new(), ScriptedDice::new(faces))
}

/// In-memory character records that remember applied instructions
#[derive(Default)]
pub struct RecordingProvider {
    pub characters: Mutex<HashMap<String, CharacterSheet>>,
    pub applied: Mutex<Vec<CombatInstruction>>,
}

impl RecordingProvider {
    pub fn with(sheet: CharacterSheet) -> Self {
        let provider = Self::default();
        provider.characters.lock().insert(sheet.id.clone(), sheet);
        provider
    }

    pub fn get(&self, character_id: &str) -> Option<CharacterSheet> {
        self.characters.lock().get(character_id).cloned()
    }
}

impl CharacterProvider for RecordingProvider {
    async fn load(&self, user_id: &str, character_id: &str) -> Result<Option<CharacterSheet>> {
        Ok(self
            .characters
            .lock()
            .get(character_id)
            .filter(|c| c.user_id == user_id)
            .cloned())
    }

    async fn apply(&self, _user_id: &str, instruction: &CombatInstruction) -> Result<()> {
        let mut characters = self.characters.lock();
        match instruction {
            CombatInstruction::AwardXp {
                character_id,
                amount,
            } => {
                if let Some(c) = characters.get_mut(character_id) {
                    c.experience += amount;
                }
            }
            CombatInstruction::SetHp { character_id, hp } => {
                if let Some(c) = characters.get_mut(character_id) {
                    c.hp = (*hp).clamp(0, c.hp_max);
                }
            }
        }
        self.applied.lock().push(instruction.clone());
        Ok(())
    }
}
