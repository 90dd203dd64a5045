use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{BattleError, BattleResult};

/// Catalog identifier of a card definition.
pub type CardId = String;

/// Attacker class; selects which resistance of the defender applies.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum UnitClass {
    Melee,
    Ranged,
    Mage,
}

/// Combat attributes of a unit card. Read-only once the card is defined.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct UnitStats {
    pub attack: u32,
    pub defense: u32,
    /// Percent chance (0-100) that an attack is critical.
    pub critical_chance: u32,
    /// Percent of `attack` added on a critical hit.
    pub critical_damage: u32,
    pub ranged_resistance: u32,
    pub melee_resistance: u32,
    pub magic_resistance: u32,
    /// Static max health; runtime health lives in [`Battle::card_healths`].
    pub health: u32,
    pub class: UnitClass,
}

impl UnitStats {
    /// Resistance percentage this unit has against an attacker of `class`.
    pub fn resistance_against(&self, class: UnitClass) -> u32 {
        match class {
            UnitClass::Melee => self.melee_resistance,
            UnitClass::Ranged => self.ranged_resistance,
            UnitClass::Mage => self.magic_resistance,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum SpellEffect {
    /// Unmitigated damage to a unit slot or the opposing player.
    Damage { amount: u32 },
    /// Restores the caster's HP.
    Heal { amount: u32 },
    /// Restores the caster's energy.
    Energize { amount: u32 },
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct SpellStats {
    pub cost: u32,
    pub effect: SpellEffect,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CardKind {
    Unit(UnitStats),
    Spell(SpellStats),
}

/// One catalog entry.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Card {
    pub id: CardId,
    pub name: String,
    pub kind: CardKind,
}

/// Deck submitted when creating or joining a battle.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct Deck {
    /// Unit cards; the first five form the opening hand.
    pub cards: Vec<CardId>,
    #[serde(default)]
    pub spells: Vec<CardId>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Slot {
    Left,
    Center,
    Right,
}

impl Slot {
    pub const ALL: [Slot; 3] = [Slot::Left, Slot::Center, Slot::Right];

    pub fn as_str(self) -> &'static str {
        match self {
            Slot::Left => "left",
            Slot::Center => "center",
            Slot::Right => "right",
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Slot {
    type Err = BattleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "left" => Ok(Slot::Left),
            "center" => Ok(Slot::Center),
            "right" => Ok(Slot::Right),
            other => Err(BattleError::InvalidSlot(other.to_string())),
        }
    }
}

/// What an attack or a targeted spell aims at.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AttackTarget {
    Slot(Slot),
    Player,
}

impl FromStr for AttackTarget {
    type Err = BattleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "player" => Ok(AttackTarget::Player),
            other => other.parse().map(AttackTarget::Slot),
        }
    }
}

/// A card instance standing on the battlefield.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct BattleUnit {
    /// Instance id, fresh for every placement.
    pub id: Uuid,
    pub card_id: CardId,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct Battlefield {
    pub left: Option<BattleUnit>,
    pub center: Option<BattleUnit>,
    pub right: Option<BattleUnit>,
}

impl Battlefield {
    pub fn get(&self, slot: Slot) -> Option<&BattleUnit> {
        match slot {
            Slot::Left => self.left.as_ref(),
            Slot::Center => self.center.as_ref(),
            Slot::Right => self.right.as_ref(),
        }
    }

    pub fn slot_mut(&mut self, slot: Slot) -> &mut Option<BattleUnit> {
        match slot {
            Slot::Left => &mut self.left,
            Slot::Center => &mut self.center,
            Slot::Right => &mut self.right,
        }
    }

    /// Slot holding the given unit instance.
    pub fn find(&self, unit_id: Uuid) -> Option<Slot> {
        self.units()
            .find(|(_, unit)| unit.id == unit_id)
            .map(|(slot, _)| slot)
    }

    pub fn units(&self) -> impl Iterator<Item = (Slot, &BattleUnit)> {
        Slot::ALL
            .into_iter()
            .filter_map(move |slot| self.get(slot).map(|unit| (slot, unit)))
    }

    pub fn first_empty(&self) -> Option<Slot> {
        Slot::ALL.into_iter().find(|slot| self.get(*slot).is_none())
    }
}

/// Per-slot "already attacked this round" flags.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
pub struct SlotFlags {
    pub left: bool,
    pub center: bool,
    pub right: bool,
}

impl SlotFlags {
    pub fn get(&self, slot: Slot) -> bool {
        match slot {
            Slot::Left => self.left,
            Slot::Center => self.center,
            Slot::Right => self.right,
        }
    }

    pub fn set(&mut self, slot: Slot, value: bool) {
        match slot {
            Slot::Left => self.left = value,
            Slot::Center => self.center = value,
            Slot::Right => self.right = value,
        }
    }

    pub fn reset(&mut self) {
        *self = SlotFlags::default();
    }
}

/// One player's side of a battle.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct PlayerBattleState {
    /// Life pool, clamped to `[0, MAX_HP]`.
    pub hp: u32,
    /// Clamped to `[0, MAX_ENERGY]`.
    pub energy: u32,
    pub battlefield: Battlefield,
    pub battlefield_attacks: SlotFlags,
    pub hand: Vec<CardId>,
    pub draw_pile: Vec<CardId>,
    pub spell_deck: Vec<CardId>,
    pub spell_cooldowns: HashMap<CardId, u32>,
}

/// Duel life-cycle.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BattleStatus {
    Waiting,
    Active,
    Finished,
}

/// Display phase; `Damage` is transient and left by the next action.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BattlePhase {
    Preparation,
    Battle,
    Damage,
    Finished,
}

/// Battle result. Serialized as the winner's id or the string `"tie"`.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(into = "String", try_from = "String")]
pub enum Winner {
    Player(Uuid),
    Tie,
}

impl From<Winner> for String {
    fn from(w: Winner) -> Self {
        match w {
            Winner::Player(id) => id.to_string(),
            Winner::Tie => "tie".to_string(),
        }
    }
}

impl TryFrom<String> for Winner {
    type Error = uuid::Error;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        if s == "tie" {
            Ok(Winner::Tie)
        } else {
            Uuid::parse_str(&s).map(Winner::Player)
        }
    }
}

/// Authoritative state of one match.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Battle {
    pub id: Uuid,
    /// Bumped by every successful commit; the compare-and-swap key.
    pub version: u64,
    pub players: BTreeMap<Uuid, PlayerBattleState>,
    /// Player who opens every round.
    pub round_starter: Option<Uuid>,
    pub current_turn: Option<Uuid>,
    pub current_round: u32,
    pub status: BattleStatus,
    pub phase: BattlePhase,
    /// Runtime health per unit instance; absent means full health.
    pub card_healths: HashMap<Uuid, u32>,
    pub winner: Option<Winner>,
    /// Seat controlled by the server-side AI profile, if any.
    pub ai_player: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Battle {
    pub fn player(&self, id: Uuid) -> BattleResult<&PlayerBattleState> {
        self.players.get(&id).ok_or(BattleError::PlayerNotInBattle)
    }

    pub fn player_mut(&mut self, id: Uuid) -> BattleResult<&mut PlayerBattleState> {
        self.players.get_mut(&id).ok_or(BattleError::PlayerNotInBattle)
    }

    /// The other seat, if it is taken.
    pub fn opponent_of(&self, id: Uuid) -> Option<Uuid> {
        self.players.keys().copied().find(|p| *p != id)
    }

    /// Current health of a placed unit given its static max health.
    pub fn unit_health(&self, unit_id: Uuid, max_health: u32) -> u32 {
        self.card_healths.get(&unit_id).copied().unwrap_or(max_health)
    }

    pub fn is_finished(&self) -> bool {
        self.status == BattleStatus::Finished
    }
}

/// Typed player intent, validated by the mutator.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    Attack {
        unit_id: Uuid,
        target: AttackTarget,
    },
    PlaceCard {
        card_id: CardId,
        slot: Slot,
    },
    CastSpell {
        spell_id: CardId,
        target: Option<AttackTarget>,
    },
    EndTurn,
    Leave,
}

impl Action {
    /// Short label used for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Action::Attack { .. } => "attack",
            Action::PlaceCard { .. } => "place_card",
            Action::CastSpell { .. } => "cast_spell",
            Action::EndTurn => "end_turn",
            Action::Leave => "leave",
        }
    }
}
