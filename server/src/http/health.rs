//! Simple liveness / readiness probe

use actix_web::{get, web, HttpResponse, Responder};
use redis::{AsyncCommands, Client as RedisClient};

use crate::game::session::BattleService;
use crate::metrics;

#[get("/healthz")]
pub async fn healthz(
    svc: web::Data<BattleService>,
    redis: Option<web::Data<RedisClient>>,
) -> impl Responder {
    // Redis is optional when running on the in-memory store
    if let Some(redis) = redis {
        let mut conn = match redis.get_multiplexed_async_connection().await {
            Ok(c) => c,
            Err(_) => return HttpResponse::ServiceUnavailable().body("redis"),
        };
        // Annotate ping return type so compiler can infer RV
        if conn.ping::<String>().await.is_err() {
            return HttpResponse::ServiceUnavailable().body("redis");
        }
    }

    // Without cards no deck can be validated
    if svc.catalog().card_count() == 0 {
        return HttpResponse::ServiceUnavailable().body("catalog");
    }

    HttpResponse::Ok().body("ok")
}

/// GET /api/metrics/battles
#[get("/metrics/battles")]
pub async fn battle_metrics() -> impl Responder {
    HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(metrics::render_battle_metrics())
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(healthz).service(battle_metrics);
}
