//! Initiative order
//!
//! The player gets one activation per living enemy, all sharing the
//! player's initiative. Entries are sorted by initiative descending and
//! enemies win ties.

use std::cmp::Ordering;

use super::combatant::{EnemyCombatant, PlayerCombatStats, TurnEntry};
use super::dice::{roll_d20, DiceSource};

/// Activation id for the player's `idx`-th slot
pub fn player_activation_id(character_id: &str, idx: usize) -> String {
    format!("{}#{}", character_id, idx)
}

/// `1d20 + modifier`
pub fn roll_initiative<D: DiceSource + ?Sized>(dice: &mut D, modifier: i32) -> i32 {
    (roll_d20(dice) as i32).saturating_add(modifier)
}

fn initiative_order(a: &TurnEntry, b: &TurnEntry) -> Ordering {
    b.initiative
        .cmp(&a.initiative)
        .then_with(|| a.is_player.cmp(&b.is_player))
}

/// Build the activation sequence from the living enemies
pub fn build_turn_order(player: &PlayerCombatStats, enemies: &[EnemyCombatant]) -> Vec<TurnEntry> {
    let alive: Vec<&EnemyCombatant> = enemies.iter().filter(|e| !e.is_defeated()).collect();
    let activations = alive.len().max(1);

    let mut order: Vec<TurnEntry> = (0..activations)
        .map(|idx| TurnEntry {
            id: player_activation_id(&player.character_id, idx),
            origin_id: player.character_id.clone(),
            name: player.name.clone(),
            initiative: player.initiative,
            is_player: true,
        })
        .chain(alive.iter().map(|enemy| TurnEntry {
            id: enemy.id.clone(),
            origin_id: enemy.id.clone(),
            name: enemy.name.clone(),
            initiative: enemy.initiative,
            is_player: false,
        }))
        .collect();

    // stable: equal entries keep emission order
    order.sort_by(initiative_order);
    order
}

/// Rebuild after an enemy death and re-point the current index.
///
/// The current entry is located by id. A player activation that no longer
/// exists maps to the player's last remaining activation; anything else
/// falls back to index 0.
pub fn rebuild_turn_order(
    player: &PlayerCombatStats,
    enemies: &[EnemyCombatant],
    current: Option<&TurnEntry>,
) -> (Vec<TurnEntry>, usize) {
    let order = build_turn_order(player, enemies);

    let index = current
        .and_then(|entry| {
            order.iter().position(|e| e.id == entry.id).or_else(|| {
                entry
                    .is_player
                    .then(|| order.iter().rposition(|e| e.is_player))
                    .flatten()
            })
        })
        .unwrap_or(0);

    (order, index)
}

/// Number of player activations in an order
pub fn player_activation_count(order: &[TurnEntry]) -> usize {
    order.iter().filter(|e| e.is_player).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(initiative: i32) -> PlayerCombatStats {
        PlayerCombatStats {
            character_id: "hero".into(),
            name: "Hero".into(),
            hp: 10,
            hp_max: 10,
            ac: 14,
            initiative,
            attack_bonus: 5,
            damage_dice: "1d8".into(),
            damage_bonus: 3,
        }
    }

    fn enemy(n: usize, initiative: i32, hp: i32) -> EnemyCombatant {
        EnemyCombatant {
            id: format!("enemy-{}", n),
            name: format!("Goblin {}", n),
            initiative,
            hp,
            hp_max: 7,
            ac: 13,
            attack_bonus: 3,
            damage_dice: "1d6".into(),
            damage_bonus: 1,
        }
    }

    fn ids(order: &[TurnEntry]) -> Vec<&str> {
        order.iter().map(|e| e.id.as_str()).collect()
    }

    #[test]
    fn test_one_player_entry_per_enemy() {
        let order = build_turn_order(&player(10), &[enemy(1, 15, 7), enemy(2, 5, 7)]);
        assert_eq!(ids(&order), vec!["enemy-1", "hero#0", "hero#1", "enemy-2"]);
        assert!(order
            .iter()
            .filter(|e| e.is_player)
            .all(|e| e.origin_id == "hero" && e.initiative == 10));
    }

    #[test]
    fn test_enemies_win_ties() {
        let order = build_turn_order(&player(12), &[enemy(1, 12, 7)]);
        assert_eq!(ids(&order), vec!["enemy-1", "hero#0"]);
    }

    #[test]
    fn test_dead_enemies_are_excluded() {
        let order = build_turn_order(&player(12), &[enemy(1, 3, 0), enemy(2, 18, 7)]);
        assert_eq!(ids(&order), vec!["enemy-2", "hero#0"]);
    }

    #[test]
    fn test_at_least_one_player_activation() {
        let order = build_turn_order(&player(8), &[enemy(1, 3, 0)]);
        assert_eq!(ids(&order), vec!["hero#0"]);
    }

    #[test]
    fn test_rebuild_keeps_current_entry() {
        let before = build_turn_order(&player(10), &[enemy(1, 15, 7), enemy(2, 5, 7)]);
        let current = before[1].clone();
        let (after, index) =
            rebuild_turn_order(&player(10), &[enemy(1, 15, 0), enemy(2, 5, 7)], Some(&current));

        assert_eq!(ids(&after), vec!["hero#0", "enemy-2"]);
        assert_eq!(index, 0);
        assert_eq!(player_activation_count(&after), 1);
    }

    #[test]
    fn test_rebuild_maps_lost_activation_to_last_player_slot() {
        let before = build_turn_order(&player(10), &[enemy(1, 15, 7), enemy(2, 5, 7)]);
        assert_eq!(ids(&before), vec!["enemy-1", "hero#0", "hero#1", "enemy-2"]);
        let current = before[2].clone();
        assert_eq!(current.id, "hero#1");

        let (after, index) =
            rebuild_turn_order(&player(10), &[enemy(1, 15, 7), enemy(2, 5, 0)], Some(&current));
        assert_eq!(ids(&after), vec!["enemy-1", "hero#0"]);
        // not index 0, which would hand the turn back to enemy-1
        assert_eq!(index, 1);
        assert!(after[index].is_player);
    }

    #[test]
    fn test_rebuild_without_current_falls_back_to_zero() {
        let (_, index) = rebuild_turn_order(&player(1), &[enemy(1, 15, 7)], None);
        assert_eq!(index, 0);
    }
}
