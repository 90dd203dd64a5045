//! Wire-protocol shared by HTTP handlers, the WS endpoint and pub/sub pushes.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{BattleError, BattleResult};
use crate::game::{
    combat::AttackOutcome,
    hooks::CommitEvent,
    types::{Action, Battle, CardId, Winner},
};

/// Action as sent by a client. Positions are raw strings (`left`, `center`,
/// `right`, `player`) and are validated by [`ActionRequest::into_action`].
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionPayload {
    Attack {
        unit_id: Uuid,
        target: String,
    },
    PlaceCard {
        card_id: CardId,
        slot: String,
    },
    CastSpell {
        spell_id: CardId,
        #[serde(default)]
        target: Option<String>,
    },
    EndTurn,
    Leave,
}

/// `{ type, actor_id, ...payload }`
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ActionRequest {
    pub actor_id: Uuid,
    #[serde(flatten)]
    pub payload: ActionPayload,
}

impl ActionRequest {
    pub fn into_action(self) -> BattleResult<Action> {
        Ok(match self.payload {
            ActionPayload::Attack { unit_id, target } => Action::Attack {
                unit_id,
                target: target.parse()?,
            },
            ActionPayload::PlaceCard { card_id, slot } => Action::PlaceCard {
                card_id,
                slot: slot.parse()?,
            },
            ActionPayload::CastSpell { spell_id, target } => Action::CastSpell {
                spell_id,
                target: target.map(|t| t.parse()).transpose()?,
            },
            ActionPayload::EndTurn => Action::EndTurn,
            ActionPayload::Leave => Action::Leave,
        })
    }
}

/// Result of a committed action returned to the submitting client.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ActionResponse {
    pub battle: Battle,
    pub outcome: Option<AttackOutcome>,
}

// ---------- client → server ----------
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMsg {
    Action {
        battle_id: Uuid,
        request: ActionRequest,
    },
    /// Sent by a client that re-opened its socket; answered with a snapshot.
    Resume { battle_id: Uuid },
}

impl ClientMsg {
    pub fn battle_id(&self) -> Uuid {
        match self {
            ClientMsg::Action { battle_id, .. } | ClientMsg::Resume { battle_id } => *battle_id,
        }
    }
}

// ---------- server → client ----------
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMsg {
    BattleUpdate {
        battle: Battle,
        event: CommitEvent,
    },
    BattleOver {
        battle_id: Uuid,
        winner: Option<Winner>,
    },
    Snapshot {
        battle: Battle,
    },
    ActionRejected {
        battle_id: Uuid,
        code: String,
        message: String,
    },
}

impl ServerMsg {
    pub fn rejected(battle_id: Uuid, err: &BattleError) -> Self {
        ServerMsg::ActionRejected {
            battle_id,
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}
