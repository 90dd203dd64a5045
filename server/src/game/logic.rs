//! Typed state transitions of a battle.
//!
//! Every transition reads a `&Battle` and returns a new snapshot. Failing
//! preconditions return an error before anything is written, so callers never
//! observe a partially applied action.

use uuid::Uuid;

use crate::cache::CardCatalog;
use crate::error::{BattleError, BattleResult};
use crate::game::combat::{resolve_attack, AttackOutcome, DefenderView, RollSource};
use crate::game::rules::{MAX_ENERGY, MAX_HP, MIN_ATTACK_ROUND, PLACE_CARD_COST, SPELL_COOLDOWN};
use crate::game::turns::{apply_end_turn, ensure_turn, resting_phase};
use crate::game::types::{
    Action, AttackTarget, Battle, BattlePhase, BattleStatus, BattleUnit, Slot, SpellEffect, Winner,
};

/// New snapshot plus the combat outcome when the action was an attack.
#[derive(Debug, Clone)]
pub struct Transition {
    pub battle: Battle,
    pub outcome: Option<AttackOutcome>,
}

impl From<Battle> for Transition {
    fn from(battle: Battle) -> Self {
        Transition {
            battle,
            outcome: None,
        }
    }
}

/// Route a typed action to its transition.
pub fn apply_action(
    battle: &Battle,
    catalog: &dyn CardCatalog,
    actor: Uuid,
    action: &Action,
    roll: &mut impl RollSource,
) -> BattleResult<Transition> {
    match action {
        Action::Attack { unit_id, target } => {
            let (battle, outcome) = apply_attack(battle, catalog, actor, *unit_id, *target, roll)?;
            Ok(Transition {
                battle,
                outcome: Some(outcome),
            })
        }
        Action::PlaceCard { card_id, slot } => {
            apply_place_card(battle, catalog, actor, card_id, *slot).map(Transition::from)
        }
        Action::CastSpell { spell_id, target } => {
            apply_cast_spell(battle, catalog, actor, spell_id, *target).map(Transition::from)
        }
        Action::EndTurn => apply_end_turn(battle, actor).map(Transition::from),
        Action::Leave => apply_leave(battle, actor).map(Transition::from),
    }
}

/// Resolve an attack of `unit_id` (owned by `actor`) against `target`.
///
/// An empty target slot turns into a direct attack on the opposing player.
pub fn apply_attack(
    battle: &Battle,
    catalog: &dyn CardCatalog,
    actor: Uuid,
    unit_id: Uuid,
    target: AttackTarget,
    roll: &mut impl RollSource,
) -> BattleResult<(Battle, AttackOutcome)> {
    ensure_turn(battle, actor)?;
    if battle.current_round < MIN_ATTACK_ROUND {
        return Err(BattleError::AttackTooEarly {
            min_round: MIN_ATTACK_ROUND,
        });
    }
    let me = battle.player(actor)?;
    let slot = me
        .battlefield
        .find(unit_id)
        .ok_or(BattleError::UnitNotFound)?;
    if me.battlefield_attacks.get(slot) {
        return Err(BattleError::AlreadyAttacked);
    }
    let attacker_card = me
        .battlefield
        .get(slot)
        .map(|u| u.card_id.clone())
        .ok_or(BattleError::UnitNotFound)?;
    let attacker = catalog.unit_stats(&attacker_card)?;

    let foe = battle.opponent_of(actor).ok_or(BattleError::BattleNotActive)?;
    let defender_unit = match target {
        AttackTarget::Slot(s) => battle
            .player(foe)?
            .battlefield
            .get(s)
            .cloned()
            .map(|u| (s, u)),
        AttackTarget::Player => None,
    };

    let mut next = battle.clone();
    let outcome = match defender_unit {
        Some((def_slot, unit)) => {
            let stats = catalog.unit_stats(&unit.card_id)?;
            let current_health = battle.unit_health(unit.id, stats.health);
            let outcome = resolve_attack(
                &attacker,
                Some(DefenderView {
                    stats: &stats,
                    current_health,
                }),
                roll,
            );
            wound_unit(&mut next, foe, def_slot, &unit, current_health, outcome.damage)?;
            outcome
        }
        None => {
            let outcome = resolve_attack(&attacker, None, roll);
            let foe_state = next.player_mut(foe)?;
            foe_state.hp = foe_state.hp.saturating_sub(outcome.damage);
            outcome
        }
    };

    next.player_mut(actor)?.battlefield_attacks.set(slot, true);
    next.phase = BattlePhase::Damage;
    settle_if_defeated(&mut next);

    log::debug!(
        "battle {}: {attacker_card} attacked {target:?}: {}",
        next.id,
        outcome.narrative_text()
    );
    Ok((next, outcome))
}

/// Put a unit card from `actor`'s hand onto `slot`.
pub fn apply_place_card(
    battle: &Battle,
    catalog: &dyn CardCatalog,
    actor: Uuid,
    card_id: &str,
    slot: Slot,
) -> BattleResult<Battle> {
    ensure_turn(battle, actor)?;
    let me = battle.player(actor)?;
    let hand_index = me
        .hand
        .iter()
        .position(|c| c == card_id)
        .ok_or_else(|| BattleError::CardNotFound(card_id.to_string()))?;
    catalog.unit_stats(card_id)?;
    if me.battlefield.get(slot).is_some() {
        return Err(BattleError::SlotOccupied);
    }
    if me.energy < PLACE_CARD_COST {
        return Err(BattleError::InsufficientEnergy {
            need: PLACE_CARD_COST,
            have: me.energy,
        });
    }

    let mut next = battle.clone();
    let me = next.player_mut(actor)?;
    let card_id = me.hand.remove(hand_index);
    me.energy -= PLACE_CARD_COST;
    *me.battlefield.slot_mut(slot) = Some(BattleUnit {
        id: Uuid::new_v4(),
        card_id,
    });
    leave_damage_phase(&mut next);
    Ok(next)
}

/// Cast a spell from `actor`'s spell deck.
pub fn apply_cast_spell(
    battle: &Battle,
    catalog: &dyn CardCatalog,
    actor: Uuid,
    spell_id: &str,
    target: Option<AttackTarget>,
) -> BattleResult<Battle> {
    ensure_turn(battle, actor)?;
    let me = battle.player(actor)?;
    if !me.spell_deck.iter().any(|s| s == spell_id) {
        return Err(BattleError::CardNotFound(spell_id.to_string()));
    }
    let spell = catalog.spell_stats(spell_id)?;
    if let Some(&rounds) = me.spell_cooldowns.get(spell_id) {
        if rounds > 0 {
            return Err(BattleError::SpellOnCooldown { rounds });
        }
    }
    if me.energy < spell.cost {
        return Err(BattleError::InsufficientEnergy {
            need: spell.cost,
            have: me.energy,
        });
    }
    let foe = battle.opponent_of(actor).ok_or(BattleError::BattleNotActive)?;

    let mut next = battle.clone();
    let me = next.player_mut(actor)?;
    me.energy -= spell.cost;
    me.spell_cooldowns.insert(spell_id.to_string(), SPELL_COOLDOWN);

    match spell.effect {
        SpellEffect::Damage { amount } => match target.ok_or(BattleError::InvalidTarget)? {
            AttackTarget::Slot(slot) => {
                let unit = battle
                    .player(foe)?
                    .battlefield
                    .get(slot)
                    .cloned()
                    .ok_or(BattleError::SlotEmpty)?;
                let stats = catalog.unit_stats(&unit.card_id)?;
                let current = battle.unit_health(unit.id, stats.health);
                wound_unit(&mut next, foe, slot, &unit, current, amount)?;
            }
            AttackTarget::Player => {
                let foe_state = next.player_mut(foe)?;
                foe_state.hp = foe_state.hp.saturating_sub(amount);
            }
        },
        SpellEffect::Heal { amount } => {
            let me = next.player_mut(actor)?;
            me.hp = me.hp.saturating_add(amount).min(MAX_HP);
        }
        SpellEffect::Energize { amount } => {
            let me = next.player_mut(actor)?;
            me.energy = me.energy.saturating_add(amount).min(MAX_ENERGY);
        }
    }

    leave_damage_phase(&mut next);
    settle_if_defeated(&mut next);
    Ok(next)
}

/// Forfeit. Idempotent: leaving a finished battle returns it unchanged.
pub fn apply_leave(battle: &Battle, actor: Uuid) -> BattleResult<Battle> {
    if battle.is_finished() {
        return Ok(battle.clone());
    }
    if !battle.players.contains_key(&actor) {
        return Err(BattleError::PlayerNotInBattle);
    }

    let mut next = battle.clone();
    next.winner = match battle.status {
        BattleStatus::Active => battle.opponent_of(actor).map(Winner::Player),
        _ => None,
    };
    next.status = BattleStatus::Finished;
    next.phase = BattlePhase::Finished;
    log::info!("battle {}: {actor} left, winner {:?}", next.id, next.winner);
    Ok(next)
}

/// Apply `damage` to a placed unit; destroys it when it reaches 0 health.
/// Returns whether the unit was destroyed.
fn wound_unit(
    battle: &mut Battle,
    owner: Uuid,
    slot: Slot,
    unit: &BattleUnit,
    current_health: u32,
    damage: u32,
) -> BattleResult<bool> {
    if damage >= current_health {
        *battle.player_mut(owner)?.battlefield.slot_mut(slot) = None;
        battle.card_healths.remove(&unit.id);
        Ok(true)
    } else {
        battle
            .card_healths
            .insert(unit.id, current_health - damage);
        Ok(false)
    }
}

fn leave_damage_phase(battle: &mut Battle) {
    if battle.phase == BattlePhase::Damage {
        battle.phase = resting_phase(battle.current_round);
    }
}

/// Finish the battle if any player is out of HP.
///
/// Both players at 0 in one mutation is only reachable from an already
/// inconsistent record; it is logged and recorded as a tie.
pub fn settle_if_defeated(battle: &mut Battle) {
    let fallen: Vec<Uuid> = battle
        .players
        .iter()
        .filter(|(_, p)| p.hp == 0)
        .map(|(id, _)| *id)
        .collect();

    let winner = match fallen.as_slice() {
        [] => return,
        [loser] => match battle.opponent_of(*loser) {
            Some(w) => Winner::Player(w),
            None => return,
        },
        _ => {
            log::warn!(
                "battle {}: both players at 0 hp in one mutation, recording a tie",
                battle.id
            );
            Winner::Tie
        }
    };

    battle.status = BattleStatus::Finished;
    battle.phase = BattlePhase::Finished;
    battle.winner = Some(winner);
    log::info!("battle {} finished, winner {winner:?}", battle.id);
}
