//! Greedy policy for the server-side AI profile.
//!
//! The AI never mutates state itself: [`next_action`] looks at the latest
//! committed snapshot and proposes one action, which the session submits
//! through the same validated pipeline as a human player.

use uuid::Uuid;

use crate::cache::CardCatalog;
use crate::game::rules::{MAX_HP, MIN_ATTACK_ROUND, PLACE_CARD_COST};
use crate::game::types::{Action, AttackTarget, Battle, CardKind, SpellEffect};

/// Upper bound on actions per AI turn.
pub const MAX_AI_STEPS: usize = 16;

/// Pick the AI's next move: place units, attack, cast a useful spell, end turn.
pub fn next_action(battle: &Battle, catalog: &dyn CardCatalog, ai: Uuid) -> Action {
    let (Ok(me), Some(foe)) = (battle.player(ai), battle.opponent_of(ai)) else {
        return Action::EndTurn;
    };

    // fill empty slots while affordable
    if me.energy >= PLACE_CARD_COST {
        if let Some(slot) = me.battlefield.first_empty() {
            let unit_card = me
                .hand
                .iter()
                .find(|id| matches!(catalog.card(id).map(|c| c.kind), Some(CardKind::Unit(_))));
            if let Some(card_id) = unit_card {
                return Action::PlaceCard {
                    card_id: card_id.clone(),
                    slot,
                };
            }
        }
    }

    let target = weakest_target(battle, catalog, foe);

    if battle.current_round >= MIN_ATTACK_ROUND {
        let ready = me
            .battlefield
            .units()
            .find(|(slot, _)| !me.battlefield_attacks.get(*slot));
        if let Some((_, unit)) = ready {
            return Action::Attack {
                unit_id: unit.id,
                target,
            };
        }
    }

    for spell_id in &me.spell_deck {
        if me.spell_cooldowns.get(spell_id).copied().unwrap_or(0) > 0 {
            continue;
        }
        let Ok(spell) = catalog.spell_stats(spell_id) else {
            continue;
        };
        if spell.cost > me.energy {
            continue;
        }
        let useful = match spell.effect {
            SpellEffect::Damage { .. } => Some(Some(target)),
            SpellEffect::Heal { amount } if me.hp.saturating_add(amount) <= MAX_HP => Some(None),
            SpellEffect::Energize { .. } if me.energy < PLACE_CARD_COST => Some(None),
            _ => None,
        };
        if let Some(target) = useful {
            return Action::CastSpell {
                spell_id: spell_id.clone(),
                target,
            };
        }
    }

    Action::EndTurn
}

/// Opposing unit with the lowest current health, or the player if none.
fn weakest_target(battle: &Battle, catalog: &dyn CardCatalog, foe: Uuid) -> AttackTarget {
    let Ok(foe_state) = battle.player(foe) else {
        return AttackTarget::Player;
    };
    foe_state
        .battlefield
        .units()
        .filter_map(|(slot, unit)| {
            let stats = catalog.unit_stats(&unit.card_id).ok()?;
            Some((battle.unit_health(unit.id, stats.health), slot))
        })
        .min_by_key(|(health, _)| *health)
        .map(|(_, slot)| AttackTarget::Slot(slot))
        .unwrap_or(AttackTarget::Player)
}
