//! Greedy AI policy.

mod common;

use cardbattle_server::game::{
    ai::next_action,
    rules::PLACE_CARD_COST,
    types::{Action, AttackTarget, Slot},
};
use common::{active_battle, battle_in_round_two, catalog, station};

#[test]
fn fills_the_first_empty_slot_first() {
    let cat = catalog();
    let (battle, host, _) = active_battle(&cat);

    assert_eq!(
        next_action(&battle, &cat, host),
        Action::PlaceCard {
            card_id: "scout".into(),
            slot: Slot::Left
        }
    );
}

#[test]
fn attacks_the_weakest_enemy_unit() {
    let cat = catalog();
    let (mut battle, host, guest) = battle_in_round_two(&cat);
    let knight = station(&mut battle, host, Slot::Left, "knight");
    station(&mut battle, guest, Slot::Left, "mage");
    let wounded = station(&mut battle, guest, Slot::Right, "knight");
    battle.card_healths.insert(wounded, 3);
    battle.player_mut(host).unwrap().energy = PLACE_CARD_COST - 1;

    assert_eq!(
        next_action(&battle, &cat, host),
        Action::Attack {
            unit_id: knight,
            target: AttackTarget::Slot(Slot::Right)
        }
    );
}

#[test]
fn goes_for_the_player_when_the_field_is_clear() {
    let cat = catalog();
    let (mut battle, host, _) = battle_in_round_two(&cat);
    let scout = station(&mut battle, host, Slot::Center, "scout");
    battle.player_mut(host).unwrap().energy = 0;

    assert_eq!(
        next_action(&battle, &cat, host),
        Action::Attack {
            unit_id: scout,
            target: AttackTarget::Player
        }
    );
}

#[test]
fn recharges_then_ends_the_turn() {
    let cat = catalog();
    let (mut battle, host, _) = active_battle(&cat);
    battle.player_mut(host).unwrap().energy = 5;

    // only focus is affordable
    assert_eq!(
        next_action(&battle, &cat, host),
        Action::CastSpell {
            spell_id: "focus".into(),
            target: None
        }
    );

    battle
        .player_mut(host)
        .unwrap()
        .spell_cooldowns
        .insert("focus".into(), 3);
    assert_eq!(next_action(&battle, &cat, host), Action::EndTurn);
}
