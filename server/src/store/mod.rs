//! Versioned battle persistence.
//!
//! A commit only succeeds when the stored record still carries the version
//! the caller read; otherwise it fails with
//! [`BattleError::VersionConflict`] and nothing is written.

use std::future::Future;
use std::time::Duration;

use futures::future::BoxFuture;
use uuid::Uuid;

use crate::error::{BattleError, BattleResult};
use crate::game::types::Battle;

pub mod memory;
pub mod redis_store;

pub use memory::MemoryStore;
pub use redis_store::RedisStore;

pub trait BattleStore: Send + Sync {
    /// Latest committed snapshot.
    fn get(&self, id: Uuid) -> BoxFuture<'_, BattleResult<Battle>>;

    /// Store a brand-new battle; fails if the id is taken.
    fn insert(&self, battle: Battle) -> BoxFuture<'_, BattleResult<Battle>>;

    /// Compare-and-swap on `expected_version`. Returns the stored snapshot
    /// whose version is `expected_version + 1`.
    fn commit(
        &self,
        id: Uuid,
        expected_version: u64,
        battle: Battle,
    ) -> BoxFuture<'_, BattleResult<Battle>>;
}

/// Bound a store call; a slow store surfaces as retryable `StoreTimeout`.
pub async fn with_timeout<T>(
    limit: Duration,
    fut: impl Future<Output = BattleResult<T>>,
) -> BattleResult<T> {
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| BattleError::StoreTimeout)?
}
