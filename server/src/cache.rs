//! In-memory card catalog.
//!
//! Card definitions are content-managed elsewhere; the battle core only
//! needs read access to their stats. [`CardCache`] holds every definition in
//! a `DashMap` warmed once at start-up (from Postgres or a JSON file) so
//! that stat look-ups during combat never touch the database.

use std::path::Path;

use anyhow::Context;
use dashmap::DashMap;
use sqlx::{types::Json, PgPool};

use crate::error::{BattleError, BattleResult};
use crate::game::types::{Card, CardId, CardKind, Deck, SpellStats, UnitStats};

/// Read-only look-up of card definitions by id.
pub trait CardCatalog: Send + Sync {
    fn card(&self, id: &str) -> Option<Card>;

    fn card_count(&self) -> usize;

    fn unit_stats(&self, id: &str) -> BattleResult<UnitStats> {
        match self.card(id).map(|c| c.kind) {
            Some(CardKind::Unit(stats)) => Ok(stats),
            _ => Err(BattleError::CardNotFound(id.to_string())),
        }
    }

    fn spell_stats(&self, id: &str) -> BattleResult<SpellStats> {
        match self.card(id).map(|c| c.kind) {
            Some(CardKind::Spell(stats)) => Ok(stats),
            _ => Err(BattleError::CardNotFound(id.to_string())),
        }
    }
}

#[derive(Debug, Default)]
pub struct CardCache {
    cards: DashMap<CardId, Card>,
}

impl CardCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_cards(cards: impl IntoIterator<Item = Card>) -> Self {
        let cache = Self::new();
        for card in cards {
            cache.insert(card);
        }
        cache
    }

    pub fn insert(&self, card: Card) {
        self.cards.insert(card.id.clone(), card);
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Load a JSON array of cards. Idempotent; returns the number loaded.
    pub fn load_json(&self, path: impl AsRef<Path>) -> anyhow::Result<usize> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading card file {}", path.display()))?;
        let cards: Vec<Card> = serde_json::from_str(&raw)
            .with_context(|| format!("parsing card file {}", path.display()))?;
        let n = cards.len();
        for card in cards {
            self.insert(card);
        }
        Ok(n)
    }

    /// Fetch the `cards` table. `stats` is the tagged JSON of [`CardKind`].
    pub async fn warm_from_db(&self, db: &PgPool) -> anyhow::Result<usize> {
        let rows = sqlx::query_as::<_, (String, String, Json<CardKind>)>(
            "SELECT id, name, stats FROM cards",
        )
        .fetch_all(db)
        .await
        .context("fetching card catalog")?;

        let n = rows.len();
        for (id, name, Json(kind)) in rows {
            self.insert(Card { id, name, kind });
        }
        Ok(n)
    }

    /// Deck of the server-side AI profile: every unit card and up to three
    /// spells, in id order so the profile is stable across restarts.
    pub fn ai_deck(&self) -> Deck {
        let mut units = Vec::new();
        let mut spells = Vec::new();
        for entry in self.cards.iter() {
            match entry.value().kind {
                CardKind::Unit(_) => units.push(entry.key().clone()),
                CardKind::Spell(_) => spells.push(entry.key().clone()),
            }
        }
        units.sort();
        spells.sort();
        spells.truncate(crate::game::rules::SPELL_DECK_SIZE);
        Deck {
            cards: units,
            spells,
        }
    }
}

impl CardCatalog for CardCache {
    fn card(&self, id: &str) -> Option<Card> {
        self.cards.get(id).map(|e| e.value().clone())
    }

    fn card_count(&self) -> usize {
        self.len()
    }
}

/// Warm the catalog from every configured source (called once at start-up).
pub async fn warm_all(cache: &CardCache, db: Option<&PgPool>, cards_path: &str) {
    if Path::new(cards_path).exists() {
        match cache.load_json(cards_path) {
            Ok(n) => log::info!("loaded {n} cards from {cards_path}"),
            Err(e) => log::warn!("card file load failed: {e:?}"),
        }
    }
    if let Some(db) = db {
        match cache.warm_from_db(db).await {
            Ok(n) => log::info!("warmed {n} cards from database"),
            Err(e) => log::warn!("card cache warm-up failed: {e:?}"),
        }
    }
}
