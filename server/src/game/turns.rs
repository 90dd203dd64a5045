//! Battle creation, seating and turn/round hand-off.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::cache::CardCatalog;
use crate::error::{BattleError, BattleResult};
use crate::game::rules::{HAND_SIZE, MAX_ENERGY, MAX_HP, MIN_ATTACK_ROUND, SPELL_DECK_SIZE};
use crate::game::types::{
    Battle, BattlePhase, BattleStatus, Battlefield, CardKind, Deck, PlayerBattleState, SlotFlags,
};

/// Validate a deck against the catalog and build a fresh player seat.
pub fn seat_player(deck: &Deck, catalog: &dyn CardCatalog) -> BattleResult<PlayerBattleState> {
    if deck.cards.is_empty() {
        return Err(BattleError::InvalidDeck("deck has no unit cards".into()));
    }
    if deck.spells.len() > SPELL_DECK_SIZE {
        return Err(BattleError::InvalidDeck(format!(
            "at most {SPELL_DECK_SIZE} spells allowed, got {}",
            deck.spells.len()
        )));
    }
    for id in &deck.cards {
        match catalog.card(id).map(|c| c.kind) {
            Some(CardKind::Unit(_)) => {}
            Some(CardKind::Spell(_)) => {
                return Err(BattleError::InvalidDeck(format!("'{id}' is a spell")))
            }
            None => return Err(BattleError::CardNotFound(id.clone())),
        }
    }
    for id in &deck.spells {
        match catalog.card(id).map(|c| c.kind) {
            Some(CardKind::Spell(_)) => {}
            Some(CardKind::Unit(_)) => {
                return Err(BattleError::InvalidDeck(format!("'{id}' is not a spell")))
            }
            None => return Err(BattleError::CardNotFound(id.clone())),
        }
    }

    let split = deck.cards.len().min(HAND_SIZE);
    Ok(PlayerBattleState {
        hp: MAX_HP,
        energy: MAX_ENERGY,
        battlefield: Battlefield::default(),
        battlefield_attacks: SlotFlags::default(),
        hand: deck.cards[..split].to_vec(),
        draw_pile: deck.cards[split..].to_vec(),
        spell_deck: deck.spells.clone(),
        spell_cooldowns: HashMap::new(),
    })
}

/// A battle waiting for its second player.
pub fn new_battle(
    id: Uuid,
    host: Uuid,
    deck: &Deck,
    catalog: &dyn CardCatalog,
    now: DateTime<Utc>,
) -> BattleResult<Battle> {
    let seat = seat_player(deck, catalog)?;
    Ok(Battle {
        id,
        version: 0,
        players: BTreeMap::from([(host, seat)]),
        round_starter: Some(host),
        current_turn: None,
        current_round: 1,
        status: BattleStatus::Waiting,
        phase: BattlePhase::Preparation,
        card_healths: HashMap::new(),
        winner: None,
        ai_player: None,
        created_at: now,
        updated_at: now,
    })
}

/// A battle against the server AI profile, active immediately.
pub fn new_ai_battle(
    id: Uuid,
    host: Uuid,
    deck: &Deck,
    ai_id: Uuid,
    ai_deck: &Deck,
    catalog: &dyn CardCatalog,
    now: DateTime<Utc>,
) -> BattleResult<Battle> {
    if ai_id == host {
        return Err(BattleError::AlreadyJoined);
    }
    let waiting = new_battle(id, host, deck, catalog, now)?;
    let mut battle = join_battle(&waiting, ai_id, ai_deck, catalog)?;
    battle.ai_player = Some(ai_id);
    Ok(battle)
}

/// Seat the second player and activate the battle (`Waiting → Active`).
pub fn join_battle(
    battle: &Battle,
    player: Uuid,
    deck: &Deck,
    catalog: &dyn CardCatalog,
) -> BattleResult<Battle> {
    if battle.players.contains_key(&player) {
        return Err(BattleError::AlreadyJoined);
    }
    if battle.status != BattleStatus::Waiting || battle.players.len() != 1 {
        return Err(BattleError::BattleNotActive);
    }
    let seat = seat_player(deck, catalog)?;

    let mut next = battle.clone();
    next.players.insert(player, seat);
    let host = next.round_starter.or_else(|| next.opponent_of(player));
    next.round_starter = host;
    next.current_turn = host;
    next.status = BattleStatus::Active;
    next.phase = BattlePhase::Preparation;
    log::info!("battle {} active: {:?} vs {player}", next.id, host);
    Ok(next)
}

/// Shared precondition of every in-battle action of `actor`.
pub fn ensure_turn(battle: &Battle, actor: Uuid) -> BattleResult<()> {
    if battle.status != BattleStatus::Active || battle.players.len() != 2 {
        return Err(BattleError::BattleNotActive);
    }
    if !battle.players.contains_key(&actor) {
        return Err(BattleError::PlayerNotInBattle);
    }
    if battle.current_turn != Some(actor) {
        return Err(BattleError::NotYourTurn);
    }
    Ok(())
}

/// Phase to show while no damage animation is pending.
pub fn resting_phase(round: u32) -> BattlePhase {
    if round >= MIN_ATTACK_ROUND {
        BattlePhase::Battle
    } else {
        BattlePhase::Preparation
    }
}

/// Hand the turn to the other player.
///
/// The ending player's attack flags reset and their positive spell cooldowns
/// tick down by one. The round counter advances when the turn returns to the
/// round starter, and the incoming player draws a card if their hand has room.
pub fn apply_end_turn(battle: &Battle, actor: Uuid) -> BattleResult<Battle> {
    ensure_turn(battle, actor)?;
    let next_player = battle
        .opponent_of(actor)
        .ok_or(BattleError::BattleNotActive)?;

    let mut next = battle.clone();
    let ending = next.player_mut(actor)?;
    ending.battlefield_attacks.reset();
    for rounds in ending.spell_cooldowns.values_mut() {
        *rounds = rounds.saturating_sub(1);
    }

    next.current_turn = Some(next_player);
    if next.round_starter == Some(next_player) {
        next.current_round += 1;
    }

    let incoming = next.player_mut(next_player)?;
    if incoming.hand.len() < HAND_SIZE && !incoming.draw_pile.is_empty() {
        let card = incoming.draw_pile.remove(0);
        incoming.hand.push(card);
    }

    next.phase = resting_phase(next.current_round);
    log::debug!(
        "battle {}: turn {actor} -> {next_player}, round {}",
        next.id,
        next.current_round
    );
    Ok(next)
}
