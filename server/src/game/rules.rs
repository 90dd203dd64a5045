//! Fixed game-balance constants shared by the mutator, the AI and tests.

/// Player life pool ceiling (and starting value).
pub const MAX_HP: u32 = 50;
/// Energy ceiling (and starting value). Energy is not regenerated per round.
pub const MAX_ENERGY: u32 = 100;
/// Energy spent to put a unit card on the battlefield.
pub const PLACE_CARD_COST: u32 = 20;
/// Rounds a spell stays unavailable after being cast.
pub const SPELL_COOLDOWN: u32 = 3;
/// First round in which units may attack.
pub const MIN_ATTACK_ROUND: u32 = 2;
/// Maximum cards held in hand.
pub const HAND_SIZE: usize = 5;
/// Spell slots of a completed deck.
pub const SPELL_DECK_SIZE: usize = 3;
