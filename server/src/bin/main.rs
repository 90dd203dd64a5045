use std::sync::Arc;

use actix_web::{middleware::Logger, web, App, HttpServer};
use cardbattle_server::{
    cache::{self, CardCache},
    config::settings,
    db::battle_repo::PgArchive,
    game::session::{AiProfile, BattleService, SessionLimits},
    http, metrics,
    notify::RedisNotifier,
    store::RedisStore,
    ws,
};
use redis::Client as RedisClient;
use sqlx::postgres::PgPoolOptions;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init();

    let cfg = settings();

    // Redis client (battle records, pub/sub, presence)
    let redis_client = RedisClient::open(cfg.redis_url.as_str()).expect("Invalid REDIS_URL");

    // Postgres pool, optional
    let db_pool = match &cfg.database_url {
        Some(url) => Some(
            PgPoolOptions::new()
                .max_connections(5)
                .connect(url)
                .await
                .expect("Failed to create Postgres pool"),
        ),
        None => {
            log::info!("DATABASE_URL not set; battle archive disabled");
            None
        }
    };

    // Warm the card catalog once; combat never reads cards from storage
    let cards = Arc::new(CardCache::new());
    cache::warm_all(&cards, db_pool.as_ref(), &cfg.cards_path).await;
    if cards.is_empty() {
        log::warn!("card catalog is empty; every deck will be rejected");
    }

    let ai = AiProfile {
        player_id: cfg.ai_player_id,
        deck: cards.ai_deck(),
    };
    let mut service = BattleService::new(
        Arc::new(RedisStore::new(redis_client.clone(), cfg.battle_ttl)),
        cards.clone(),
    )
    .with_limits(SessionLimits::from_settings())
    .with_ai(ai)
    .with_hook(Arc::new(RedisNotifier::new(redis_client.clone())));
    if let Some(db) = &db_pool {
        service = service.with_hook(Arc::new(PgArchive::new(db.clone())));
    }
    let service = web::Data::new(service);

    log::info!("battle server listening on {}", cfg.server_addr);

    // Start HTTP + WS server
    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(metrics::METRICS.clone())
            .app_data(service.clone())
            .app_data(web::Data::new(redis_client.clone()))
            .configure(http::routes::init_routes)
            .configure(ws::routes::init_routes)
    })
    .bind(&cfg.server_addr)?
    .run()
    .await
}
