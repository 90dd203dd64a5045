//! Redis-backed battle records.
//
//  Keys
//  ----
//  battle:<battle_id>   – JSON `Battle`, expires `ttl` seconds after the last write
//
//  Commits run a Lua script so the version comparison and the overwrite are
//  one atomic step on the server.

use futures::future::{BoxFuture, FutureExt};
use once_cell::sync::Lazy;
use redis::{AsyncCommands, Client as RedisClient, Script};
use uuid::Uuid;

use crate::error::{BattleError, BattleResult};
use crate::game::types::Battle;
use crate::store::BattleStore;

/// Returns -1 when the key is missing, 0 on version mismatch, 1 on success.
static COMMIT_SCRIPT: Lazy<Script> = Lazy::new(|| {
    Script::new(
        r#"
        local current = redis.call('GET', KEYS[1])
        if not current then return -1 end
        local stored = cjson.decode(current)
        if tonumber(stored['version']) ~= tonumber(ARGV[1]) then return 0 end
        redis.call('SET', KEYS[1], ARGV[2], 'EX', ARGV[3])
        return 1
        "#,
    )
});

#[derive(Clone)]
pub struct RedisStore {
    client: RedisClient,
    ttl: u64,
}

impl RedisStore {
    pub fn new(client: RedisClient, ttl: u64) -> Self {
        Self { client, ttl }
    }

    fn key(id: Uuid) -> String {
        format!("battle:{id}")
    }

    async fn get_inner(&self, id: Uuid) -> BattleResult<Battle> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let json: Option<String> = conn.get(Self::key(id)).await?;
        let json = json.ok_or(BattleError::BattleNotFound)?;
        Ok(serde_json::from_str(&json)?)
    }

    async fn insert_inner(&self, battle: Battle) -> BattleResult<Battle> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let json = serde_json::to_string(&battle)?;
        let created: Option<String> = redis::cmd("SET")
            .arg(Self::key(battle.id))
            .arg(json)
            .arg("NX")
            .arg("EX")
            .arg(self.ttl)
            .query_async(&mut conn)
            .await?;
        match created {
            Some(_) => Ok(battle),
            None => Err(BattleError::Store(format!(
                "battle {} already exists",
                battle.id
            ))),
        }
    }

    async fn commit_inner(
        &self,
        id: Uuid,
        expected_version: u64,
        mut battle: Battle,
    ) -> BattleResult<Battle> {
        battle.version = expected_version + 1;
        let json = serde_json::to_string(&battle)?;
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let status: i64 = COMMIT_SCRIPT
            .key(Self::key(id))
            .arg(expected_version)
            .arg(json)
            .arg(self.ttl)
            .invoke_async(&mut conn)
            .await?;
        match status {
            1 => Ok(battle),
            0 => Err(BattleError::VersionConflict),
            _ => Err(BattleError::BattleNotFound),
        }
    }
}

impl BattleStore for RedisStore {
    fn get(&self, id: Uuid) -> BoxFuture<'_, BattleResult<Battle>> {
        self.get_inner(id).boxed()
    }

    fn insert(&self, battle: Battle) -> BoxFuture<'_, BattleResult<Battle>> {
        self.insert_inner(battle).boxed()
    }

    fn commit(
        &self,
        id: Uuid,
        expected_version: u64,
        battle: Battle,
    ) -> BoxFuture<'_, BattleResult<Battle>> {
        self.commit_inner(id, expected_version, battle).boxed()
    }
}
