//! Authoritative read-modify-write loop around the battle mutator.
//! ✔ compare-and-swap commit keyed on the battle version
//! ✔ bounded retry on version conflicts / store time-outs
//! ✔ per-battle serialization inside this process
//! ✔ post-commit hooks (notify, archive) and AI turns

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::Mutex;
use tokio_retry::{strategy::FixedInterval, RetryIf};
use uuid::Uuid;

use crate::{
    cache::CardCatalog,
    config::settings,
    error::{BattleError, BattleResult},
    game::{
        ai,
        combat::{AttackOutcome, ThreadRoll},
        hooks::{CommitEvent, PostCommitHook},
        logic::{self, Transition},
        turns,
        types::{Action, AttackTarget, Battle, BattleStatus, Deck},
    },
    metrics,
    protocol::{ActionRequest, ActionResponse},
    store::{with_timeout, BattleStore},
};

/// Seat and deck played by the server.
#[derive(Debug, Clone)]
pub struct AiProfile {
    pub player_id: Uuid,
    pub deck: Deck,
}

#[derive(Debug, Clone, Copy)]
pub struct SessionLimits {
    pub store_timeout: Duration,
    pub commit_retries: usize,
    pub retry_backoff: Duration,
}

impl SessionLimits {
    pub fn from_settings() -> Self {
        let s = settings();
        Self {
            store_timeout: s.store_timeout,
            commit_retries: s.commit_retries,
            retry_backoff: s.retry_backoff,
        }
    }
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self {
            store_timeout: Duration::from_secs(2),
            commit_retries: 3,
            retry_backoff: Duration::from_millis(10),
        }
    }
}

/// Outcome of one read-modify-write; `changed` is false for no-ops.
struct Committed {
    battle: Battle,
    outcome: Option<AttackOutcome>,
    changed: bool,
}

pub struct BattleService {
    store: Arc<dyn BattleStore>,
    catalog: Arc<dyn CardCatalog>,
    hooks: Vec<Arc<dyn PostCommitHook>>,
    ai: Option<AiProfile>,
    limits: SessionLimits,
    /// battle_id → lock held for the whole read-modify-write.
    locks: DashMap<Uuid, Arc<Mutex<()>>>,
}

impl BattleService {
    pub fn new(store: Arc<dyn BattleStore>, catalog: Arc<dyn CardCatalog>) -> Self {
        Self {
            store,
            catalog,
            hooks: Vec::new(),
            ai: None,
            limits: SessionLimits::default(),
            locks: DashMap::new(),
        }
    }

    pub fn with_hook(mut self, hook: Arc<dyn PostCommitHook>) -> Self {
        self.hooks.push(hook);
        self
    }

    pub fn with_ai(mut self, profile: AiProfile) -> Self {
        self.ai = Some(profile);
        self
    }

    pub fn with_limits(mut self, limits: SessionLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn catalog(&self) -> &dyn CardCatalog {
        self.catalog.as_ref()
    }

    pub async fn get_battle(&self, id: Uuid) -> BattleResult<Battle> {
        with_timeout(self.limits.store_timeout, self.store.get(id)).await
    }

    /// Open a battle for `host`; against the AI profile it starts at once.
    pub async fn create_battle(&self, host: Uuid, deck: &Deck, vs_ai: bool) -> BattleResult<Battle> {
        let now = Utc::now();
        let id = Uuid::new_v4();
        let battle = match (&self.ai, vs_ai) {
            (Some(ai), true) => turns::new_ai_battle(
                id,
                host,
                deck,
                ai.player_id,
                &ai.deck,
                self.catalog(),
                now,
            )?,
            (None, true) => return Err(BattleError::InvalidDeck("no AI profile configured".into())),
            (_, false) => turns::new_battle(id, host, deck, self.catalog(), now)?,
        };
        let battle = with_timeout(self.limits.store_timeout, self.store.insert(battle)).await?;
        log::info!("battle {id} created by {host} (vs_ai: {vs_ai})");

        let event = CommitEvent {
            actor_id: host,
            action: None,
            outcome: None,
        };
        self.run_hooks(&battle, &event).await;
        Ok(battle)
    }

    /// Seat the second player.
    pub async fn join_battle(&self, id: Uuid, player: Uuid, deck: &Deck) -> BattleResult<Battle> {
        let catalog = self.catalog.clone();
        let deck = deck.clone();
        let committed = self
            .mutate(id, player, None, move |b| {
                turns::join_battle(b, player, &deck, catalog.as_ref()).map(Transition::from)
            })
            .await?;
        Ok(committed.battle)
    }

    /// Validate and commit one client action, then let the AI answer if it
    /// holds the next turn.
    pub async fn submit(&self, id: Uuid, request: ActionRequest) -> BattleResult<ActionResponse> {
        let actor = request.actor_id;
        let action = request.into_action()?;
        let committed = match self.commit_action(id, actor, action.clone()).await {
            Err(BattleError::NotYourTurn) => {
                // an AI turn cut short by a store failure is resumed here
                let stalled = self.get_battle(id).await?;
                if stalled.ai_player.is_none()
                    || stalled.current_turn != stalled.ai_player
                    || stalled.ai_player == Some(actor)
                {
                    return Err(BattleError::NotYourTurn);
                }
                log::warn!("battle {id}: resuming stalled AI turn");
                self.drive_ai(stalled).await;
                self.commit_action(id, actor, action).await?
            }
            other => other?,
        };
        let battle = self.drive_ai(committed.battle).await;
        Ok(ActionResponse {
            battle,
            outcome: committed.outcome,
        })
    }

    /// Resolve an attack against the latest snapshot without committing it.
    pub async fn preview_attack(
        &self,
        id: Uuid,
        actor: Uuid,
        unit_id: Uuid,
        target: AttackTarget,
    ) -> BattleResult<AttackOutcome> {
        let battle = self.get_battle(id).await?;
        let (_, outcome) =
            logic::apply_attack(&battle, self.catalog(), actor, unit_id, target, &mut ThreadRoll)?;
        Ok(outcome)
    }

    async fn commit_action(&self, id: Uuid, actor: Uuid, action: Action) -> BattleResult<Committed> {
        let kind = action.kind();
        let catalog = self.catalog.clone();
        let applied = action.clone();
        let result = self
            .mutate(id, actor, Some(action), move |b| {
                logic::apply_action(b, catalog.as_ref(), actor, &applied, &mut ThreadRoll)
            })
            .await;

        match &result {
            Ok(_) => metrics::record_action(kind, "ok"),
            Err(e) => {
                metrics::record_action(kind, e.code());
                log::debug!("battle {id}: {kind} by {actor} rejected: {e}");
            }
        }
        result
    }

    /// Read the latest snapshot, apply `transition`, commit on the version
    /// that was read. Conflicts and time-outs are retried with a fixed
    /// back-off; every other error surfaces at once.
    ///
    /// Hooks run before the battle lock is released so pushes leave in
    /// commit order.
    async fn mutate<F>(
        &self,
        id: Uuid,
        actor: Uuid,
        action: Option<Action>,
        transition: F,
    ) -> BattleResult<Committed>
    where
        F: Fn(&Battle) -> BattleResult<Transition>,
    {
        let lock = self.locks.entry(id).or_default().clone();
        let result = match tokio::time::timeout(self.limits.store_timeout, lock.lock()).await {
            Err(_) => Err(BattleError::StoreTimeout),
            Ok(_guard) => {
                let strategy =
                    FixedInterval::new(self.limits.retry_backoff).take(self.limits.commit_retries);
                let result = RetryIf::spawn(
                    strategy,
                    || self.try_commit(id, &transition),
                    |e: &BattleError| {
                        if e.is_retryable() {
                            log::warn!("battle {id}: {e}, retrying");
                            true
                        } else {
                            false
                        }
                    },
                )
                .await;

                if let Ok(committed) = &result {
                    if committed.changed {
                        let event = CommitEvent {
                            actor_id: actor,
                            action,
                            outcome: committed.outcome.clone(),
                        };
                        self.run_hooks(&committed.battle, &event).await;
                    }
                }
                result
            }
        };

        // drop the entry once nobody else holds or waits on it
        drop(lock);
        self.locks.remove_if(&id, |_, l| Arc::strong_count(l) == 1);
        result
    }

    async fn try_commit<F>(&self, id: Uuid, transition: &F) -> BattleResult<Committed>
    where
        F: Fn(&Battle) -> BattleResult<Transition>,
    {
        let current = self.get_battle(id).await?;
        let Transition { battle, outcome } = transition(&current)?;
        if battle == current {
            // no-op (e.g. leaving a finished battle): nothing to commit
            return Ok(Committed {
                battle: current,
                outcome,
                changed: false,
            });
        }

        let mut next = battle;
        next.updated_at = Utc::now();
        let committed = with_timeout(
            self.limits.store_timeout,
            self.store.commit(id, current.version, next),
        )
        .await;
        if let Err(BattleError::VersionConflict) = committed {
            metrics::record_conflict();
        }
        Ok(Committed {
            battle: committed?,
            outcome,
            changed: true,
        })
    }

    async fn run_hooks(&self, battle: &Battle, event: &CommitEvent) {
        for hook in &self.hooks {
            hook.after_commit(battle, event).await;
        }
    }

    /// Play the AI seat's turn, one committed action at a time.
    async fn drive_ai(&self, mut battle: Battle) -> Battle {
        let Some(ai_id) = battle.ai_player else {
            return battle;
        };
        for _ in 0..ai::MAX_AI_STEPS {
            if battle.status != BattleStatus::Active || battle.current_turn != Some(ai_id) {
                break;
            }
            let action = ai::next_action(&battle, self.catalog(), ai_id);
            match self.commit_action(battle.id, ai_id, action.clone()).await {
                Ok(committed) => battle = committed.battle,
                Err(e) => {
                    log::warn!("battle {}: AI action {action:?} failed: {e}", battle.id);
                    if !matches!(action, Action::EndTurn) {
                        if let Ok(c) = self.commit_action(battle.id, ai_id, Action::EndTurn).await {
                            battle = c.battle;
                        }
                    }
                    break;
                }
            }
        }
        battle
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CardCache;
    use crate::game::types::{Card, CardKind, UnitClass, UnitStats};
    use crate::protocol::ActionPayload;
    use crate::store::MemoryStore;

    fn service() -> BattleService {
        let knight = Card {
            id: "knight".into(),
            name: "Knight".into(),
            kind: CardKind::Unit(UnitStats {
                attack: 4,
                defense: 1,
                critical_chance: 0,
                critical_damage: 0,
                ranged_resistance: 0,
                melee_resistance: 0,
                magic_resistance: 0,
                health: 10,
                class: UnitClass::Melee,
            }),
        };
        BattleService::new(
            Arc::new(MemoryStore::new()),
            Arc::new(CardCache::from_cards([knight])),
        )
    }

    fn end_turn(actor_id: Uuid) -> ActionRequest {
        ActionRequest {
            actor_id,
            payload: ActionPayload::EndTurn,
        }
    }

    #[tokio::test]
    async fn lock_entries_do_not_outlive_requests() {
        let svc = service();
        for _ in 0..50 {
            let err = svc
                .submit(Uuid::new_v4(), end_turn(Uuid::new_v4()))
                .await
                .unwrap_err();
            assert_eq!(err, BattleError::BattleNotFound);
        }
        assert_eq!(svc.locks.len(), 0);

        let host = Uuid::new_v4();
        let deck = Deck {
            cards: vec!["knight".into()],
            spells: vec![],
        };
        let battle = svc.create_battle(host, &deck, false).await.unwrap();
        // rejected on a waiting battle
        assert_eq!(
            svc.submit(battle.id, end_turn(host)).await.unwrap_err(),
            BattleError::BattleNotActive
        );
        // committed join on a live battle
        svc.join_battle(battle.id, Uuid::new_v4(), &deck)
            .await
            .unwrap();
        svc.submit(battle.id, end_turn(host)).await.unwrap();
        assert_eq!(svc.locks.len(), 0);
    }
}
