//! Runtime configuration for the battle server.

use once_cell::sync::Lazy;
use std::env;
use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;

#[derive(Debug)]
pub struct Settings {
    pub server_addr: String,
    pub redis_url: String,
    /// Postgres is optional: without it cards come from `cards_path` only
    /// and finished battles are not archived.
    pub database_url: Option<String>,
    pub cards_path: String,
    /// Upper bound on every battle-store call.
    pub store_timeout: Duration,
    /// Automatic retries of a read-modify-write after a version conflict.
    pub commit_retries: usize,
    pub retry_backoff: Duration,
    /// Seconds a battle record lives in Redis after its last write.
    pub battle_ttl: u64,
    /// Redis presence-key TTL (seconds).
    pub presence_ttl: u64,
    /// Seconds a player may stay disconnected before forfeit.
    pub disconnect_grace: u64,
    /// Seat id of the server AI profile.
    pub ai_player_id: Uuid,
}

fn var_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

impl Settings {
    fn from_env() -> Self {
        Settings {
            server_addr: var_or("SERVER_ADDR", "127.0.0.1:8080".to_string()),
            redis_url: var_or("REDIS_URL", "redis://127.0.0.1/".to_string()),
            database_url: env::var("DATABASE_URL").ok().filter(|v| !v.is_empty()),
            cards_path: var_or("CARDS_PATH", "data/cards.json".to_string()),
            store_timeout: Duration::from_millis(var_or("STORE_TIMEOUT_MS", 2_000)),
            commit_retries: var_or("COMMIT_RETRIES", 3),
            retry_backoff: Duration::from_millis(var_or("RETRY_BACKOFF_MS", 25)),
            battle_ttl: var_or("BATTLE_TTL", 6 * 60 * 60),
            presence_ttl: var_or("PRESENCE_TTL", 600),
            disconnect_grace: var_or("DISCONNECT_GRACE", 120), // 2 min default
            ai_player_id: var_or("AI_PLAYER_ID", Uuid::from_u128(0xA1)),
        }
    }
}

static SETTINGS: Lazy<Settings> = Lazy::new(Settings::from_env);

pub fn settings() -> &'static Settings {
    &SETTINGS
}
