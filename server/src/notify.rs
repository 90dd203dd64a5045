//! Pushes committed battle state to every seated player.
//
//  Redis channels
//  --------------
//  player:<player_id>:events – PUB/SUB channel for one-off pushes (JSON)

use futures::future::{BoxFuture, FutureExt};
use redis::{AsyncCommands, Client as RedisClient};
use uuid::Uuid;

use crate::game::{
    hooks::{CommitEvent, PostCommitHook},
    types::Battle,
};
use crate::protocol::ServerMsg;

pub fn player_channel(player: Uuid) -> String {
    format!("player:{player}:events")
}

pub struct RedisNotifier {
    redis: RedisClient,
}

impl RedisNotifier {
    pub fn new(redis: RedisClient) -> Self {
        Self { redis }
    }

    async fn publish_all(&self, battle: &Battle, event: &CommitEvent) -> redis::RedisResult<()> {
        let mut msgs = vec![ServerMsg::BattleUpdate {
            battle: battle.clone(),
            event: event.clone(),
        }];
        if battle.is_finished() {
            msgs.push(ServerMsg::BattleOver {
                battle_id: battle.id,
                winner: battle.winner,
            });
        }

        let mut conn = self.redis.get_multiplexed_async_connection().await?;
        for player in battle.players.keys() {
            if battle.ai_player == Some(*player) {
                continue;
            }
            for msg in &msgs {
                let payload = match serde_json::to_string(msg) {
                    Ok(p) => p,
                    Err(e) => {
                        log::error!("encoding battle push failed: {e}");
                        continue;
                    }
                };
                let _: () = conn.publish(player_channel(*player), payload).await?;
            }
        }
        Ok(())
    }
}

impl PostCommitHook for RedisNotifier {
    fn after_commit<'a>(&'a self, battle: &'a Battle, event: &'a CommitEvent) -> BoxFuture<'a, ()> {
        async move {
            if let Err(e) = self.publish_all(battle, event).await {
                log::warn!("battle {}: publish failed: {e}", battle.id);
            }
        }
        .boxed()
    }
}
