//! Shared fixtures for the integration tests.
#![allow(dead_code)]

use chrono::Utc;
use uuid::Uuid;

use cardbattle_server::{
    cache::CardCache,
    game::{
        turns,
        types::{
            Battle, BattleUnit, Card, CardKind, Deck, Slot, SpellEffect, SpellStats, UnitClass,
            UnitStats,
        },
    },
};

pub fn stats(attack: u32, defense: u32, health: u32, class: UnitClass) -> UnitStats {
    UnitStats {
        attack,
        defense,
        critical_chance: 0,
        critical_damage: 50,
        ranged_resistance: 0,
        melee_resistance: 0,
        magic_resistance: 0,
        health,
        class,
    }
}

fn unit_card(id: &str, stats: UnitStats) -> Card {
    Card {
        id: id.into(),
        name: id.into(),
        kind: CardKind::Unit(stats),
    }
}

fn spell_card(id: &str, cost: u32, effect: SpellEffect) -> Card {
    Card {
        id: id.into(),
        name: id.into(),
        kind: CardKind::Spell(SpellStats { cost, effect }),
    }
}

/// scout 6/2/8 melee (10% melee res), archer 7/0/5 ranged,
/// mage 9/1/12 mage (20% magic res), knight 10/3/20 melee,
/// fireball (30, 10 dmg), mend (10, +15 hp), focus (0, +40 energy).
pub fn catalog() -> CardCache {
    let mut scout = stats(6, 2, 8, UnitClass::Melee);
    scout.melee_resistance = 10;
    let mut mage = stats(9, 1, 12, UnitClass::Mage);
    mage.magic_resistance = 20;

    CardCache::from_cards([
        unit_card("scout", scout),
        unit_card("archer", stats(7, 0, 5, UnitClass::Ranged)),
        unit_card("mage", mage),
        unit_card("knight", stats(10, 3, 20, UnitClass::Melee)),
        spell_card("fireball", 30, SpellEffect::Damage { amount: 10 }),
        spell_card("mend", 10, SpellEffect::Heal { amount: 15 }),
        spell_card("focus", 0, SpellEffect::Energize { amount: 40 }),
    ])
}

/// Six units (five in hand, one in the draw pile) and three spells.
pub fn deck() -> Deck {
    Deck {
        cards: ["scout", "archer", "mage", "knight", "scout", "archer"]
            .map(String::from)
            .to_vec(),
        spells: ["fireball", "mend", "focus"].map(String::from).to_vec(),
    }
}

/// Active battle at round 1 with `host` to move.
pub fn active_battle(catalog: &CardCache) -> (Battle, Uuid, Uuid) {
    let host = Uuid::new_v4();
    let guest = Uuid::new_v4();
    let waiting = turns::new_battle(Uuid::new_v4(), host, &deck(), catalog, Utc::now())
        .expect("new battle");
    let battle = turns::join_battle(&waiting, guest, &deck(), catalog).expect("join");
    (battle, host, guest)
}

/// Active battle advanced to round 2, `host` to move.
pub fn battle_in_round_two(catalog: &CardCache) -> (Battle, Uuid, Uuid) {
    let (battle, host, guest) = active_battle(catalog);
    let battle = turns::apply_end_turn(&battle, host).expect("host ends");
    let battle = turns::apply_end_turn(&battle, guest).expect("guest ends");
    assert_eq!(battle.current_round, 2);
    (battle, host, guest)
}

/// Put a unit straight onto the field, bypassing hand and energy rules.
pub fn station(battle: &mut Battle, owner: Uuid, slot: Slot, card_id: &str) -> Uuid {
    let id = Uuid::new_v4();
    *battle
        .player_mut(owner)
        .expect("seated")
        .battlefield
        .slot_mut(slot) = Some(BattleUnit {
        id,
        card_id: card_id.into(),
    });
    id
}

pub fn no_crit() -> f64 {
    0.99
}

pub fn always_crit() -> f64 {
    0.0
}
