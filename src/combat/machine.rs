//! Combat state transitions
//!
//! Each transition takes a `CombatState` by value and returns the next state
//! together with the operation's result. Nothing here touches storage.
//!
//! Lifecycle:
//! `PLAYER_TURN` (attacks) -> end activation -> `ENEMY_TURN` (automatic enemy
//! activations) -> `PLAYER_TURN` (next activation) ... -> `COMBAT_ENDED`.
//! `AWAITING_DAMAGE_ROLL` sits between a declared hit and its damage roll.

use chrono::Utc;
use tracing::{debug, info, warn};

use super::attack::{resolve_attack, roll_to_hit, AttackResult, DamageRoll};
use super::combatant::{Combatant, EnemyCombatant, PlayerCombatStats};
use super::dice::{parse_dice, DiceSource};
use super::error::CombatError;
use super::outcome::{ActivationOutcome, AttackOutcome, EnemyActivation};
use super::state::{
    ActionKind, CombatEnd, CombatState, PendingAttack, Phase, DEFAULT_ACTIONS,
    DEFAULT_BONUS_ACTIONS,
};
use super::turn_order::{build_turn_order, rebuild_turn_order};

impl CombatState {
    /// Create a session and resolve any enemy activations that precede the
    /// player's first one.
    pub fn begin<D: DiceSource + ?Sized>(
        character_id: &str,
        player: PlayerCombatStats,
        enemies: Vec<EnemyCombatant>,
        dice: &mut D,
    ) -> Result<(Self, Vec<EnemyActivation>), CombatError> {
        if enemies.is_empty() {
            return Err(CombatError::NoEnemies);
        }
        if player.hp <= 0 {
            return Err(CombatError::Incapacitated(character_id.to_string()));
        }
        parse_dice(&player.damage_dice)?;

        let turn_order = build_turn_order(&player, &enemies);
        let mut state = Self {
            session_id: uuid::Uuid::new_v4().to_string(),
            character_id: character_id.to_string(),
            in_combat: true,
            enemies,
            player,
            turn_order,
            current_turn_index: 0,
            round_number: 1,
            phase: Phase::PlayerTurn,
            action_remaining: DEFAULT_ACTIONS,
            action_max: DEFAULT_ACTIONS,
            bonus_action_remaining: DEFAULT_BONUS_ACTIONS,
            bonus_action_max: DEFAULT_BONUS_ACTIONS,
            result: None,
            pending_attack: None,
            started_at: Utc::now(),
        };

        let opening = if state.is_player_activation() {
            Vec::new()
        } else {
            state.run_enemy_activations(dice, false)?
        };

        Ok((state, opening))
    }

    /// Attack a living enemy, spending from `kind`'s budget
    pub fn attack<D: DiceSource + ?Sized>(
        mut self,
        target: &str,
        kind: ActionKind,
        dice: &mut D,
    ) -> Result<(Self, AttackOutcome), CombatError> {
        self.ensure_player_turn()?;
        let idx = self.find_target(target)?;

        let result = resolve_attack(
            dice,
            &self.player.attack_profile(),
            &self.enemies[idx].defense(),
        )?;
        self.spend(kind);

        Ok(self.land_player_attack(idx, result))
    }

    /// Roll to hit only. A hit parks the session in `AWAITING_DAMAGE_ROLL`
    /// until [`CombatState::apply_damage_roll`] supplies the damage faces.
    pub fn declare_attack<D: DiceSource + ?Sized>(
        mut self,
        target: &str,
        kind: ActionKind,
        dice: &mut D,
    ) -> Result<(Self, AttackOutcome), CombatError> {
        self.ensure_player_turn()?;
        let idx = self.find_target(target)?;

        let result = roll_to_hit(
            dice,
            &self.player.attack_profile(),
            &self.enemies[idx].defense(),
        );
        self.spend(kind);

        let awaiting_damage = result.hit;
        if awaiting_damage {
            debug!(
                "{} hit {} and awaits a damage roll",
                self.character_id, self.enemies[idx].name
            );
            self.phase = Phase::AwaitingDamageRoll;
            self.pending_attack = Some(PendingAttack {
                target_id: self.enemies[idx].id.clone(),
                result: result.clone(),
            });
        }

        let outcome = AttackOutcome {
            character_id: self.character_id.clone(),
            target_id: self.enemies[idx].id.clone(),
            target_name: self.enemies[idx].name.clone(),
            attack: result,
            awaiting_damage,
            turn_order_rebuilt: false,
            action_remaining: self.action_remaining,
            bonus_action_remaining: self.bonus_action_remaining,
            victory: false,
            xp_gained: None,
        };
        Ok((self, outcome))
    }

    /// Apply client-rolled damage faces to the pending hit
    pub fn apply_damage_roll(mut self, rolls: Vec<u32>) -> Result<(Self, AttackOutcome), CombatError> {
        self.ensure_active()?;
        if self.phase != Phase::AwaitingDamageRoll {
            return Err(CombatError::NoPendingAttack);
        }
        let pending = self.pending_attack.clone().ok_or(CombatError::NoPendingAttack)?;

        let damage_dice = parse_dice(&self.player.damage_dice)?;
        if !damage_dice.accepts(&rolls) {
            return Err(CombatError::InvalidDamageRoll {
                dice: self.player.damage_dice.clone(),
                rolls,
            });
        }

        let idx = self
            .enemies
            .iter()
            .position(|e| e.id == pending.target_id && !e.is_defeated())
            .ok_or_else(|| CombatError::InvalidTarget(pending.target_id.clone()))?;

        let damage = DamageRoll::from_faces(
            &self.player.damage_dice,
            rolls,
            self.player.damage_bonus.saturating_add(damage_dice.modifier),
            pending.result.critical,
        );
        let result = pending.result.with_damage(damage, &self.enemies[idx].defense());

        self.pending_attack = None;
        self.phase = Phase::PlayerTurn;
        Ok(self.land_player_attack(idx, result))
    }

    /// Finish the current player activation and run enemy activations until
    /// the next player activation or the end of combat.
    pub fn end_player_activation<D: DiceSource + ?Sized>(
        mut self,
        dice: &mut D,
    ) -> Result<(Self, ActivationOutcome), CombatError> {
        self.ensure_player_turn()?;

        let enemy_activations = self.run_enemy_activations(dice, true)?;
        let combat_ended = self.phase == Phase::CombatEnded;

        let outcome = ActivationOutcome {
            character_id: self.character_id.clone(),
            enemy_activations,
            round_number: self.round_number,
            current: if combat_ended {
                None
            } else {
                self.current_entry().cloned()
            },
            player_hp: self.player.hp,
            combat_ended,
            defeat: self.is_defeat(),
        };
        Ok((self, outcome))
    }

    fn ensure_active(&self) -> Result<(), CombatError> {
        if !self.in_combat || self.phase == Phase::CombatEnded {
            return Err(CombatError::NotInCombat(self.character_id.clone()));
        }
        Ok(())
    }

    fn ensure_player_turn(&self) -> Result<(), CombatError> {
        self.ensure_active()?;
        if self.phase == Phase::AwaitingDamageRoll {
            return Err(CombatError::IllegalActivation(
                "an attack is awaiting its damage roll".to_string(),
            ));
        }
        if self.phase != Phase::PlayerTurn || !self.is_player_activation() {
            let acting = self
                .current_entry()
                .map(|e| e.name.clone())
                .unwrap_or_default();
            return Err(CombatError::IllegalActivation(format!(
                "current activation belongs to {}",
                acting
            )));
        }
        Ok(())
    }

    /// Counters saturate at zero; an empty budget never blocks the attack
    fn spend(&mut self, kind: ActionKind) {
        let budget = match kind {
            ActionKind::Action => &mut self.action_remaining,
            ActionKind::BonusAction => &mut self.bonus_action_remaining,
        };
        if *budget == 0 {
            debug!("{} attacks with no {:?} remaining", self.character_id, kind);
        }
        *budget = budget.saturating_sub(1);
    }

    fn reset_action_economy(&mut self) {
        self.action_remaining = self.action_max;
        self.bonus_action_remaining = self.bonus_action_max;
    }

    fn finish(&mut self, end: CombatEnd) {
        self.phase = Phase::CombatEnded;
        self.in_combat = false;
        self.result = Some(end);
        self.pending_attack = None;
    }

    fn land_player_attack(mut self, idx: usize, result: AttackResult) -> (Self, AttackOutcome) {
        self.enemies[idx].set_hp(result.target_hp_after);

        let turn_order_rebuilt = result.target_defeated;
        if turn_order_rebuilt {
            info!(
                "{} defeated {} ({})",
                self.character_id, self.enemies[idx].name, self.enemies[idx].id
            );
            let (order, index) =
                rebuild_turn_order(&self.player, &self.enemies, self.current_entry());
            self.turn_order = order;
            self.current_turn_index = index;
        }

        let victory = self.alive_enemies().next().is_none();
        let xp_gained = if victory {
            self.finish(CombatEnd::Victory);
            let xp = self.xp_reward();
            info!("{} won combat for {} XP", self.character_id, xp);
            Some(xp)
        } else {
            None
        };

        let outcome = AttackOutcome {
            character_id: self.character_id.clone(),
            target_id: self.enemies[idx].id.clone(),
            target_name: self.enemies[idx].name.clone(),
            attack: result,
            awaiting_damage: false,
            turn_order_rebuilt,
            action_remaining: self.action_remaining,
            bonus_action_remaining: self.bonus_action_remaining,
            victory,
            xp_gained,
        };
        (self, outcome)
    }

    /// Walk the turn order resolving enemy activations.
    ///
    /// With `advance` the walk starts at the entry after the current one.
    /// Wrapping to index 0 starts a new round. Bounded at `len + 1` steps.
    fn run_enemy_activations<D: DiceSource + ?Sized>(
        &mut self,
        dice: &mut D,
        advance: bool,
    ) -> Result<Vec<EnemyActivation>, CombatError> {
        let mut activations = Vec::new();
        let len = self.turn_order.len();
        if len == 0 {
            warn!("{} has an empty turn order", self.character_id);
            return Ok(activations);
        }

        let mut step = advance;
        for _ in 0..=len {
            if step {
                self.current_turn_index += 1;
                if self.current_turn_index >= len {
                    self.current_turn_index = 0;
                    self.round_number += 1;
                    debug!("{} enters round {}", self.character_id, self.round_number);
                }
            }
            step = true;

            let entry = self.turn_order[self.current_turn_index].clone();
            if entry.is_player {
                self.reset_action_economy();
                self.phase = Phase::PlayerTurn;
                return Ok(activations);
            }

            self.phase = Phase::EnemyTurn;
            let Some(enemy) = self
                .enemies
                .iter()
                .find(|e| e.id == entry.id && !e.is_defeated())
            else {
                continue;
            };

            let attack = resolve_attack(dice, &enemy.attack_profile(), &self.player.defense())?;
            let activation = EnemyActivation {
                enemy_id: enemy.id.clone(),
                enemy_name: enemy.name.clone(),
                attack,
            };
            self.player.set_hp(activation.attack.target_hp_after);
            activations.push(activation);

            if !self.player.is_alive() {
                info!("{} was defeated in round {}", self.character_id, self.round_number);
                self.finish(CombatEnd::Defeat);
                return Ok(activations);
            }
        }

        warn!(
            "{} turn order has no reachable player activation",
            self.character_id
        );
        self.reset_action_economy();
        self.phase = Phase::PlayerTurn;
        Ok(activations)
    }
}
