//! Battle endpoints: create / join / read / act / preview.

use actix_web::{get, post, web, HttpResponse, Responder};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::BattleError;
use crate::game::session::BattleService;
use crate::game::types::{AttackTarget, Deck};
use crate::protocol::ActionRequest;

//////////////////////////////////////////////////
// Requests
//////////////////////////////////////////////////

#[derive(Deserialize)]
pub struct CreateReq {
    pub player_id: Uuid,
    pub deck: Deck,
    #[serde(default)]
    pub vs_ai: bool,
}

#[derive(Deserialize)]
pub struct JoinReq {
    pub player_id: Uuid,
    pub deck: Deck,
}

#[derive(Deserialize)]
pub struct PreviewReq {
    pub actor_id: Uuid,
    pub unit_id: Uuid,
    pub target: String,
}

/// Map a domain error to a status code and `{ error, message }` body.
pub fn reject(e: &BattleError) -> HttpResponse {
    let mut builder = match e {
        BattleError::BattleNotFound
        | BattleError::UnitNotFound
        | BattleError::CardNotFound(_)
        | BattleError::PlayerNotInBattle => HttpResponse::NotFound(),
        BattleError::NotYourTurn
        | BattleError::BattleNotActive
        | BattleError::AlreadyJoined
        | BattleError::VersionConflict => HttpResponse::Conflict(),
        BattleError::InvalidSlot(_) | BattleError::InvalidDeck(_) | BattleError::InvalidTarget => {
            HttpResponse::BadRequest()
        }
        BattleError::StoreTimeout | BattleError::Store(_) => HttpResponse::ServiceUnavailable(),
        _ => HttpResponse::UnprocessableEntity(),
    };
    builder.json(serde_json::json!({ "error": e.code(), "message": e.to_string() }))
}

//////////////////////////////////////////////////
// Handlers
//////////////////////////////////////////////////

/// POST /api/battles
#[post("/battles")]
pub async fn create(info: web::Json<CreateReq>, svc: web::Data<BattleService>) -> impl Responder {
    match svc.create_battle(info.player_id, &info.deck, info.vs_ai).await {
        Ok(battle) => HttpResponse::Created().json(battle),
        Err(e) => reject(&e),
    }
}

/// POST /api/battles/{id}/join
#[post("/battles/{id}/join")]
pub async fn join(
    path: web::Path<Uuid>,
    info: web::Json<JoinReq>,
    svc: web::Data<BattleService>,
) -> impl Responder {
    match svc.join_battle(path.into_inner(), info.player_id, &info.deck).await {
        Ok(battle) => HttpResponse::Ok().json(battle),
        Err(e) => reject(&e),
    }
}

/// GET /api/battles/{id}
#[get("/battles/{id}")]
pub async fn show(path: web::Path<Uuid>, svc: web::Data<BattleService>) -> impl Responder {
    match svc.get_battle(path.into_inner()).await {
        Ok(battle) => HttpResponse::Ok().json(battle),
        Err(e) => reject(&e),
    }
}

/// POST /api/battles/{id}/actions
#[post("/battles/{id}/actions")]
pub async fn act(
    path: web::Path<Uuid>,
    info: web::Json<ActionRequest>,
    svc: web::Data<BattleService>,
) -> impl Responder {
    match svc.submit(path.into_inner(), info.into_inner()).await {
        Ok(resp) => HttpResponse::Ok().json(resp),
        Err(e) => reject(&e),
    }
}

/// POST /api/battles/{id}/preview
#[post("/battles/{id}/preview")]
pub async fn preview(
    path: web::Path<Uuid>,
    info: web::Json<PreviewReq>,
    svc: web::Data<BattleService>,
) -> impl Responder {
    let target = match info.target.parse::<AttackTarget>() {
        Ok(t) => t,
        Err(e) => return reject(&e),
    };
    match svc
        .preview_attack(path.into_inner(), info.actor_id, info.unit_id, target)
        .await
    {
        Ok(outcome) => HttpResponse::Ok().json(outcome),
        Err(e) => reject(&e),
    }
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(create)
        .service(join)
        .service(show)
        .service(act)
        .service(preview);
}
