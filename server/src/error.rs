//! Typed failures for every battle operation.
//!
//! Rule violations are expected, caller-recoverable conditions: they are
//! returned as values and translated into user-facing messages by the HTTP /
//! WS layers. Only [`BattleError::VersionConflict`] and
//! [`BattleError::StoreTimeout`] are retried internally.

use thiserror::Error;

pub type BattleResult<T> = Result<T, BattleError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BattleError {
    #[error("it is not your turn")]
    NotYourTurn,

    #[error("attacks are not allowed before round {min_round}")]
    AttackTooEarly { min_round: u32 },

    #[error("invalid battlefield slot '{0}'")]
    InvalidSlot(String),

    #[error("battlefield slot is already occupied")]
    SlotOccupied,

    #[error("battlefield slot is empty")]
    SlotEmpty,

    #[error("this unit has already attacked this round")]
    AlreadyAttacked,

    #[error("not enough energy: need {need}, have {have}")]
    InsufficientEnergy { need: u32, have: u32 },

    #[error("spell is on cooldown for {rounds} more round(s)")]
    SpellOnCooldown { rounds: u32 },

    #[error("unit not found on your battlefield")]
    UnitNotFound,

    #[error("card '{0}' not found")]
    CardNotFound(String),

    #[error("battle was modified concurrently, re-read and retry")]
    VersionConflict,

    #[error("battle is not active")]
    BattleNotActive,

    #[error("battle not found")]
    BattleNotFound,

    #[error("player is not part of this battle")]
    PlayerNotInBattle,

    #[error("player already joined this battle")]
    AlreadyJoined,

    #[error("invalid deck: {0}")]
    InvalidDeck(String),

    #[error("this action needs a valid target")]
    InvalidTarget,

    #[error("battle store did not answer in time")]
    StoreTimeout,

    #[error("battle store failure: {0}")]
    Store(String),
}

impl BattleError {
    /// Stable machine-readable name sent to clients.
    pub fn code(&self) -> &'static str {
        match self {
            BattleError::NotYourTurn => "NotYourTurn",
            BattleError::AttackTooEarly { .. } => "AttackTooEarly",
            BattleError::InvalidSlot(_) => "InvalidSlot",
            BattleError::SlotOccupied => "SlotOccupied",
            BattleError::SlotEmpty => "SlotEmpty",
            BattleError::AlreadyAttacked => "AlreadyAttacked",
            BattleError::InsufficientEnergy { .. } => "InsufficientEnergy",
            BattleError::SpellOnCooldown { .. } => "SpellOnCooldown",
            BattleError::UnitNotFound => "UnitNotFound",
            BattleError::CardNotFound(_) => "CardNotFound",
            BattleError::VersionConflict => "VersionConflict",
            BattleError::BattleNotActive => "BattleNotActive",
            BattleError::BattleNotFound => "BattleNotFound",
            BattleError::PlayerNotInBattle => "PlayerNotInBattle",
            BattleError::AlreadyJoined => "AlreadyJoined",
            BattleError::InvalidDeck(_) => "InvalidDeck",
            BattleError::InvalidTarget => "InvalidTarget",
            BattleError::StoreTimeout => "StoreTimeout",
            BattleError::Store(_) => "StoreError",
        }
    }

    /// Contention errors that a fresh read-modify-write may resolve.
    pub fn is_retryable(&self) -> bool {
        matches!(self, BattleError::VersionConflict | BattleError::StoreTimeout)
    }
}

impl From<redis::RedisError> for BattleError {
    fn from(e: redis::RedisError) -> Self {
        BattleError::Store(e.to_string())
    }
}

impl From<serde_json::Error> for BattleError {
    fn from(e: serde_json::Error) -> Self {
        BattleError::Store(format!("corrupt battle record: {e}"))
    }
}
