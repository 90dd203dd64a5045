//! Action transitions: preconditions, placement, attacks, spells, leave.

mod common;

use cardbattle_server::{
    error::BattleError,
    game::{
        logic::{
            apply_action, apply_attack, apply_cast_spell, apply_leave, apply_place_card,
            settle_if_defeated,
        },
        rules::{MAX_ENERGY, MAX_HP, PLACE_CARD_COST, SPELL_COOLDOWN},
        types::{Action, AttackTarget, BattlePhase, BattleStatus, Slot, Winner},
    },
};
use common::{active_battle, battle_in_round_two, catalog, no_crit, station};
use uuid::Uuid;

#[test]
fn attacks_are_rejected_in_round_one() {
    let cat = catalog();
    let (mut battle, host, _) = active_battle(&cat);
    let unit = station(&mut battle, host, Slot::Left, "scout");

    let err = apply_attack(&battle, &cat, host, unit, AttackTarget::Player, &mut no_crit)
        .unwrap_err();
    assert_eq!(err, BattleError::AttackTooEarly { min_round: 2 });
}

#[test]
fn only_the_current_player_may_act() {
    let cat = catalog();
    let (battle, _, guest) = active_battle(&cat);

    let err = apply_place_card(&battle, &cat, guest, "scout", Slot::Left).unwrap_err();
    assert_eq!(err, BattleError::NotYourTurn);

    let stranger = Uuid::new_v4();
    let err = apply_action(&battle, &cat, stranger, &Action::EndTurn, &mut no_crit).unwrap_err();
    assert_eq!(err, BattleError::PlayerNotInBattle);
}

#[test]
fn placing_a_card_spends_energy_and_fills_the_slot() {
    let cat = catalog();
    let (battle, host, guest) = active_battle(&cat);

    let next = apply_place_card(&battle, &cat, host, "mage", Slot::Center).unwrap();
    let me = next.player(host).unwrap();
    assert_eq!(me.energy, MAX_ENERGY - PLACE_CARD_COST);
    assert_eq!(me.hand.len(), 4);
    assert!(!me.hand.contains(&"mage".to_string()));
    assert_eq!(
        me.battlefield.get(Slot::Center).map(|u| u.card_id.as_str()),
        Some("mage")
    );
    // the opponent is untouched
    assert_eq!(next.player(guest).unwrap(), battle.player(guest).unwrap());
    // the input snapshot is untouched
    assert_eq!(battle.player(host).unwrap().energy, MAX_ENERGY);

    assert_eq!(
        apply_place_card(&next, &cat, host, "scout", Slot::Center).unwrap_err(),
        BattleError::SlotOccupied
    );
    assert_eq!(
        apply_place_card(&next, &cat, host, "mage", Slot::Left).unwrap_err(),
        BattleError::CardNotFound("mage".into())
    );
}

#[test]
fn placing_without_energy_fails() {
    let cat = catalog();
    let (mut battle, host, _) = active_battle(&cat);
    battle.player_mut(host).unwrap().energy = PLACE_CARD_COST - 1;

    assert_eq!(
        apply_place_card(&battle, &cat, host, "scout", Slot::Left).unwrap_err(),
        BattleError::InsufficientEnergy {
            need: PLACE_CARD_COST,
            have: PLACE_CARD_COST - 1
        }
    );
}

#[test]
fn unit_attack_wounds_and_marks_the_slot() {
    let cat = catalog();
    let (mut battle, host, guest) = battle_in_round_two(&cat);
    let attacker = station(&mut battle, host, Slot::Left, "scout");
    let defender = station(&mut battle, guest, Slot::Center, "scout");

    let (next, out) = apply_attack(
        &battle,
        &cat,
        host,
        attacker,
        AttackTarget::Slot(Slot::Center),
        &mut no_crit,
    )
    .unwrap();

    assert_eq!(out.damage, 3);
    assert!(!out.destroyed);
    assert_eq!(next.card_healths.get(&defender), Some(&5));
    assert!(next.player(host).unwrap().battlefield_attacks.get(Slot::Left));
    assert_eq!(next.phase, BattlePhase::Damage);

    assert_eq!(
        apply_attack(
            &next,
            &cat,
            host,
            attacker,
            AttackTarget::Player,
            &mut no_crit
        )
        .unwrap_err(),
        BattleError::AlreadyAttacked
    );
}

#[test]
fn wounds_accumulate_and_destroy() {
    let cat = catalog();
    let (mut battle, host, guest) = battle_in_round_two(&cat);
    let knight = station(&mut battle, host, Slot::Right, "knight");
    let archer = station(&mut battle, guest, Slot::Left, "archer");
    battle.card_healths.insert(archer, 4);

    let (next, out) = apply_attack(
        &battle,
        &cat,
        host,
        knight,
        AttackTarget::Slot(Slot::Left),
        &mut no_crit,
    )
    .unwrap();

    assert!(out.destroyed);
    assert!(next.player(guest).unwrap().battlefield.left.is_none());
    assert!(!next.card_healths.contains_key(&archer));
}

#[test]
fn empty_target_slot_becomes_a_direct_hit() {
    let cat = catalog();
    let (mut battle, host, guest) = battle_in_round_two(&cat);
    let scout = station(&mut battle, host, Slot::Left, "scout");

    let (next, out) = apply_attack(
        &battle,
        &cat,
        host,
        scout,
        AttackTarget::Slot(Slot::Right),
        &mut no_crit,
    )
    .unwrap();
    assert_eq!(out.damage, 6);
    assert_eq!(next.player(guest).unwrap().hp, MAX_HP - 6);
}

#[test]
fn lethal_direct_hit_finishes_the_battle() {
    let cat = catalog();
    let (mut battle, host, guest) = battle_in_round_two(&cat);
    let archer = station(&mut battle, host, Slot::Center, "archer");
    battle.player_mut(guest).unwrap().hp = 5;

    let (next, out) = apply_attack(
        &battle,
        &cat,
        host,
        archer,
        AttackTarget::Player,
        &mut no_crit,
    )
    .unwrap();

    assert_eq!(out.damage, 7);
    assert_eq!(next.player(guest).unwrap().hp, 0);
    assert_eq!(next.status, BattleStatus::Finished);
    assert_eq!(next.phase, BattlePhase::Finished);
    assert_eq!(next.winner, Some(Winner::Player(host)));

    // nothing but leave is accepted afterwards
    assert_eq!(
        apply_action(&next, &cat, guest, &Action::EndTurn, &mut no_crit).unwrap_err(),
        BattleError::BattleNotActive
    );
}

#[test]
fn unknown_unit_cannot_attack() {
    let cat = catalog();
    let (battle, host, _) = battle_in_round_two(&cat);
    assert_eq!(
        apply_attack(
            &battle,
            &cat,
            host,
            Uuid::new_v4(),
            AttackTarget::Player,
            &mut no_crit
        )
        .unwrap_err(),
        BattleError::UnitNotFound
    );
}

#[test]
fn next_action_leaves_the_damage_phase() {
    let cat = catalog();
    let (mut battle, host, _) = battle_in_round_two(&cat);
    let scout = station(&mut battle, host, Slot::Left, "scout");

    let (hit, _) =
        apply_attack(&battle, &cat, host, scout, AttackTarget::Player, &mut no_crit).unwrap();
    assert_eq!(hit.phase, BattlePhase::Damage);

    let placed = apply_place_card(&hit, &cat, host, "archer", Slot::Right).unwrap();
    assert_eq!(placed.phase, BattlePhase::Battle);
}

#[test]
fn damage_spell_hits_player_and_starts_cooldown() {
    let cat = catalog();
    let (battle, host, guest) = active_battle(&cat);

    let next = apply_cast_spell(&battle, &cat, host, "fireball", Some(AttackTarget::Player)).unwrap();
    assert_eq!(next.player(guest).unwrap().hp, MAX_HP - 10);
    let me = next.player(host).unwrap();
    assert_eq!(me.energy, MAX_ENERGY - 30);
    assert_eq!(me.spell_cooldowns.get("fireball"), Some(&SPELL_COOLDOWN));

    assert_eq!(
        apply_cast_spell(&next, &cat, host, "fireball", Some(AttackTarget::Player)).unwrap_err(),
        BattleError::SpellOnCooldown {
            rounds: SPELL_COOLDOWN
        }
    );
}

#[test]
fn damage_spell_needs_a_target() {
    let cat = catalog();
    let (battle, host, _) = active_battle(&cat);

    assert_eq!(
        apply_cast_spell(&battle, &cat, host, "fireball", None).unwrap_err(),
        BattleError::InvalidTarget
    );
    assert_eq!(
        apply_cast_spell(
            &battle,
            &cat,
            host,
            "fireball",
            Some(AttackTarget::Slot(Slot::Left))
        )
        .unwrap_err(),
        BattleError::SlotEmpty
    );
    assert_eq!(
        apply_cast_spell(&battle, &cat, host, "meteor", None).unwrap_err(),
        BattleError::CardNotFound("meteor".into())
    );
}

#[test]
fn damage_spell_can_destroy_a_unit() {
    let cat = catalog();
    let (mut battle, host, guest) = active_battle(&cat);
    let mage = station(&mut battle, guest, Slot::Center, "mage");

    let next = apply_cast_spell(
        &battle,
        &cat,
        host,
        "fireball",
        Some(AttackTarget::Slot(Slot::Center)),
    )
    .unwrap();
    // spells ignore resistance and defense
    assert_eq!(next.card_healths.get(&mage), Some(&2));
}

#[test]
fn heal_and_energize_are_clamped() {
    let cat = catalog();
    let (mut battle, host, _) = active_battle(&cat);
    {
        let me = battle.player_mut(host).unwrap();
        me.hp = MAX_HP - 5;
        me.energy = 80;
    }

    let healed = apply_cast_spell(&battle, &cat, host, "mend", None).unwrap();
    assert_eq!(healed.player(host).unwrap().hp, MAX_HP);
    assert_eq!(healed.player(host).unwrap().energy, 70);

    let charged = apply_cast_spell(&healed, &cat, host, "focus", None).unwrap();
    assert_eq!(charged.player(host).unwrap().energy, MAX_ENERGY);
}

#[test]
fn leaving_an_active_battle_forfeits() {
    let cat = catalog();
    let (battle, host, guest) = active_battle(&cat);

    // leaving does not need the turn
    let done = apply_leave(&battle, guest).unwrap();
    assert_eq!(done.status, BattleStatus::Finished);
    assert_eq!(done.winner, Some(Winner::Player(host)));

    let again = apply_leave(&done, host).unwrap();
    assert_eq!(again, done);

    assert_eq!(
        apply_leave(&battle, Uuid::new_v4()).unwrap_err(),
        BattleError::PlayerNotInBattle
    );
}

#[test]
fn leaving_a_waiting_battle_has_no_winner() {
    let cat = catalog();
    let host = Uuid::new_v4();
    let waiting = cardbattle_server::game::turns::new_battle(
        Uuid::new_v4(),
        host,
        &common::deck(),
        &cat,
        chrono::Utc::now(),
    )
    .unwrap();

    let done = apply_leave(&waiting, host).unwrap();
    assert_eq!(done.status, BattleStatus::Finished);
    assert_eq!(done.winner, None);
}

#[test]
fn simultaneous_knockout_is_a_tie() {
    let cat = catalog();
    let (mut battle, host, guest) = active_battle(&cat);
    battle.player_mut(host).unwrap().hp = 0;
    battle.player_mut(guest).unwrap().hp = 0;

    settle_if_defeated(&mut battle);
    assert_eq!(battle.status, BattleStatus::Finished);
    assert_eq!(battle.winner, Some(Winner::Tie));
}
