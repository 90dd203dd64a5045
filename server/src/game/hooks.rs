//! Explicit post-commit hooks.
//!
//! The session runs every registered hook after a successful commit, in
//! registration order. Hooks see the committed snapshot and cannot veto it;
//! they log their own failures.

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::game::combat::AttackOutcome;
use crate::game::types::{Action, Battle};

/// What was committed. `action` is `None` for seating changes (create/join).
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CommitEvent {
    pub actor_id: Uuid,
    pub action: Option<Action>,
    pub outcome: Option<AttackOutcome>,
}

pub trait PostCommitHook: Send + Sync {
    fn after_commit<'a>(&'a self, battle: &'a Battle, event: &'a CommitEvent) -> BoxFuture<'a, ()>;
}
