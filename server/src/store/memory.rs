use dashmap::{mapref::entry::Entry, DashMap};
use futures::future::{self, BoxFuture, FutureExt};
use uuid::Uuid;

use crate::error::{BattleError, BattleResult};
use crate::game::types::Battle;
use crate::store::BattleStore;

/// Single-process store. The version check and the write happen under the
/// same shard lock.
#[derive(Debug, Default)]
pub struct MemoryStore {
    battles: DashMap<Uuid, Battle>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn get_now(&self, id: Uuid) -> BattleResult<Battle> {
        self.battles
            .get(&id)
            .map(|b| b.value().clone())
            .ok_or(BattleError::BattleNotFound)
    }

    fn insert_now(&self, battle: Battle) -> BattleResult<Battle> {
        match self.battles.entry(battle.id) {
            Entry::Occupied(_) => Err(BattleError::Store(format!(
                "battle {} already exists",
                battle.id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(battle.clone());
                Ok(battle)
            }
        }
    }

    fn commit_now(&self, id: Uuid, expected_version: u64, mut battle: Battle) -> BattleResult<Battle> {
        let mut stored = self
            .battles
            .get_mut(&id)
            .ok_or(BattleError::BattleNotFound)?;
        if stored.version != expected_version {
            return Err(BattleError::VersionConflict);
        }
        battle.version = expected_version + 1;
        *stored = battle.clone();
        Ok(battle)
    }
}

impl BattleStore for MemoryStore {
    fn get(&self, id: Uuid) -> BoxFuture<'_, BattleResult<Battle>> {
        future::ready(self.get_now(id)).boxed()
    }

    fn insert(&self, battle: Battle) -> BoxFuture<'_, BattleResult<Battle>> {
        future::ready(self.insert_now(battle)).boxed()
    }

    fn commit(
        &self,
        id: Uuid,
        expected_version: u64,
        battle: Battle,
    ) -> BoxFuture<'_, BattleResult<Battle>> {
        future::ready(self.commit_now(id, expected_version, battle)).boxed()
    }
}
