//! Player stat derivation
//!
//! Runs once at combat start. The attack ability is STR unless the equipped
//! weapon is finesse, uses ammunition, or is ranged, in which case DEX is
//! used. Unarmed characters hit for 1d4.

use std::sync::LazyLock;

use regex::Regex;

use super::combatant::PlayerCombatStats;
use crate::character::{ability_modifier, ArmorClassRule, CharacterSheet, InventoryItem};

/// Damage for an unarmed strike
pub const UNARMED_DAMAGE_DICE: &str = "1d4";

static DAMAGE_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+d\d+$").expect("static regex"));

/// Ability an attack is made with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttackAbility {
    Strength,
    Dexterity,
}

/// Pick the equipped weapon: a flagged weapon, else a weapon-prefixed
/// definition, else any equipped item.
pub fn equipped_weapon(inventory: &[InventoryItem]) -> Option<&InventoryItem> {
    let equipped: Vec<&InventoryItem> = inventory.iter().filter(|i| i.equipped).collect();

    equipped
        .iter()
        .find(|i| i.is_weapon)
        .or_else(|| {
            equipped
                .iter()
                .find(|i| i.definition_id.to_lowercase().starts_with("weapon"))
        })
        .or_else(|| equipped.first())
        .copied()
}

/// First whitespace-delimited `NdM` token in the item's damage text
pub fn weapon_damage_dice(item: &InventoryItem) -> Option<String> {
    item.metadata
        .damage
        .as_deref()?
        .split_whitespace()
        .map(str::to_lowercase)
        .find(|token| DAMAGE_TOKEN.is_match(token))
}

pub fn attack_ability(weapon: &InventoryItem) -> AttackAbility {
    if weapon.has_property("finesse") || weapon.has_property("ammunition") || weapon.is_ranged() {
        AttackAbility::Dexterity
    } else {
        AttackAbility::Strength
    }
}

/// Derive combat stats for a character. Initiative is left at 0; it is
/// rolled separately.
pub fn derive_player_stats(
    character: &CharacterSheet,
    armor: &dyn ArmorClassRule,
) -> PlayerCombatStats {
    let strength_mod = character.abilities.strength_modifier();
    let mut attack_bonus = strength_mod + character.proficiency_bonus;
    let mut damage_bonus = strength_mod;
    let mut damage_dice = UNARMED_DAMAGE_DICE.to_string();

    if let Some(weapon) = equipped_weapon(&character.inventory) {
        if let Some(dice) = weapon_damage_dice(weapon) {
            damage_dice = dice;
        }

        let ability_mod = match attack_ability(weapon) {
            AttackAbility::Strength => strength_mod,
            AttackAbility::Dexterity => ability_modifier(character.abilities.dexterity),
        };
        attack_bonus = ability_mod + character.proficiency_bonus;
        damage_bonus = ability_mod;
    }

    let hp_max = character.hp_max.max(1);

    PlayerCombatStats {
        character_id: character.id.clone(),
        name: character.name.clone(),
        hp: character.hp.clamp(0, hp_max),
        hp_max,
        ac: armor.armor_class(character),
        initiative: 0,
        attack_bonus,
        damage_dice,
        damage_bonus,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::{AbilityScores, ItemMetadata, UnarmoredDefense};

    fn fighter(inventory: Vec<InventoryItem>) -> CharacterSheet {
        CharacterSheet {
            id: "char-1".into(),
            user_id: "user-1".into(),
            name: "Brann".into(),
            abilities: AbilityScores {
                strength: 16,
                dexterity: 14,
                ..AbilityScores::default()
            },
            proficiency_bonus: 2,
            hp: 12,
            hp_max: 12,
            experience: 0,
            inventory,
        }
    }

    fn item(definition_id: &str, is_weapon: bool, damage: &str, properties: &[&str]) -> InventoryItem {
        InventoryItem {
            definition_id: definition_id.into(),
            name: definition_id.into(),
            equipped: true,
            is_weapon,
            metadata: ItemMetadata {
                damage: Some(damage.into()),
                properties: properties.iter().map(|p| p.to_string()).collect(),
                category: None,
            },
        }
    }

    #[test]
    fn test_unarmed_uses_strength() {
        let stats = derive_player_stats(&fighter(vec![]), &UnarmoredDefense);
        assert_eq!(stats.attack_bonus, 5);
        assert_eq!(stats.damage_bonus, 3);
        assert_eq!(stats.damage_dice, "1d4");
        assert_eq!(stats.ac, 12);
    }

    #[test]
    fn test_longsword_overrides_dice() {
        let sword = item("weapon-longsword", true, "1d8 slashing", &["versatile"]);
        let stats = derive_player_stats(&fighter(vec![sword]), &UnarmoredDefense);
        assert_eq!(stats.damage_dice, "1d8");
        assert_eq!(stats.attack_bonus, 5);
        assert_eq!(stats.damage_bonus, 3);
    }

    #[test]
    fn test_finesse_uses_dexterity() {
        let rapier = item("rapier", true, "1d8 piercing", &["Finesse"]);
        let stats = derive_player_stats(&fighter(vec![rapier]), &UnarmoredDefense);
        assert_eq!(stats.attack_bonus, 4);
        assert_eq!(stats.damage_bonus, 2);
    }

    #[test]
    fn test_ranged_category_uses_dexterity() {
        let mut bow = item("shortbow", true, "1d6 piercing", &[]);
        bow.metadata.category = Some("simple ranged".into());
        let stats = derive_player_stats(&fighter(vec![bow]), &UnarmoredDefense);
        assert_eq!(stats.attack_bonus, 4);
        assert_eq!(stats.damage_dice, "1d6");
    }

    #[test]
    fn test_weapon_preference_order() {
        let cloak = item("cloak", false, "", &[]);
        let prefixed = item("weapon-club", false, "1d4 bludgeoning", &[]);
        let flagged = item("greataxe", true, "1d12 slashing", &["heavy"]);

        let inventory = vec![cloak.clone(), prefixed.clone(), flagged];
        assert_eq!(equipped_weapon(&inventory).unwrap().definition_id, "greataxe");

        let inventory = vec![cloak.clone(), prefixed];
        assert_eq!(equipped_weapon(&inventory).unwrap().definition_id, "weapon-club");

        let inventory = vec![cloak];
        assert_eq!(equipped_weapon(&inventory).unwrap().definition_id, "cloak");
    }

    #[test]
    fn test_unequipped_items_are_ignored() {
        let mut axe = item("greataxe", true, "1d12 slashing", &[]);
        axe.equipped = false;
        assert!(equipped_weapon(&[axe]).is_none());
    }

    #[test]
    fn test_damage_token_without_dice_keeps_default() {
        let staff = item("staff", true, "bludgeoning damage", &[]);
        let stats = derive_player_stats(&fighter(vec![staff]), &UnarmoredDefense);
        assert_eq!(stats.damage_dice, "1d4");
        assert_eq!(weapon_damage_dice(&item("x", true, "deals 2D6 fire", &[])), Some("2d6".into()));
    }
}
