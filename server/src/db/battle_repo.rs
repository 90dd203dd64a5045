use anyhow::{Context, Result};
use futures::future::{BoxFuture, FutureExt};
use sqlx::PgPool;
use uuid::Uuid;

use crate::game::{
    hooks::{CommitEvent, PostCommitHook},
    types::{Battle, Winner},
};

/// Record a finished battle. Re-archiving the same battle is a no-op.
pub async fn archive(db: &PgPool, battle: &Battle) -> Result<()> {
    let (winner_id, is_tie): (Option<Uuid>, bool) = match battle.winner {
        Some(Winner::Player(id)) => (Some(id), false),
        Some(Winner::Tie) => (None, true),
        None => (None, false),
    };
    let players: Vec<Uuid> = battle.players.keys().copied().collect();
    let rounds = i32::try_from(battle.current_round).unwrap_or(i32::MAX);

    sqlx::query(
        r#"INSERT INTO battle_results
               (battle_id, player1_id, player2_id, winner_id, is_tie, rounds, finished_at)
           VALUES ($1, $2, $3, $4, $5, $6, $7)
           ON CONFLICT (battle_id) DO NOTHING"#,
    )
    .bind(battle.id)
    .bind(players.first().copied())
    .bind(players.get(1).copied())
    .bind(winner_id)
    .bind(is_tie)
    .bind(rounds)
    .bind(battle.updated_at)
    .execute(db)
    .await
    .context("archiving battle result")?;
    Ok(())
}

/// Archives battles once they reach `Finished`.
pub struct PgArchive {
    db: PgPool,
}

impl PgArchive {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

impl PostCommitHook for PgArchive {
    fn after_commit<'a>(&'a self, battle: &'a Battle, _event: &'a CommitEvent) -> BoxFuture<'a, ()> {
        async move {
            if !battle.is_finished() {
                return;
            }
            if let Err(e) = archive(&self.db, battle).await {
                log::warn!("battle {}: {e:?}", battle.id);
            }
        }
        .boxed()
    }
}
