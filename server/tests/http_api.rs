//! HTTP surface: routes, status codes and error bodies.

mod common;

use std::sync::Arc;

use actix_web::{http::StatusCode, test, web, App};
use serde_json::{json, Value};
use uuid::Uuid;

use cardbattle_server::{
    game::{
        session::BattleService,
        types::{Battle, BattleStatus},
    },
    http,
    protocol::ActionResponse,
    store::MemoryStore,
};
use common::{catalog, deck};

fn service() -> web::Data<BattleService> {
    web::Data::new(BattleService::new(
        Arc::new(MemoryStore::new()),
        Arc::new(catalog()),
    ))
}

#[actix_rt::test]
async fn battle_lifecycle_over_http() {
    let app = test::init_service(
        App::new()
            .app_data(service())
            .configure(http::routes::init_routes),
    )
    .await;
    let host = Uuid::new_v4();
    let guest = Uuid::new_v4();

    // create
    let req = test::TestRequest::post()
        .uri("/api/battles")
        .set_json(json!({ "player_id": host, "deck": deck() }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let battle: Battle = test::read_body_json(resp).await;
    assert_eq!(battle.status, BattleStatus::Waiting);

    // join
    let req = test::TestRequest::post()
        .uri(&format!("/api/battles/{}/join", battle.id))
        .set_json(json!({ "player_id": guest, "deck": deck() }))
        .to_request();
    let joined: Battle = test::call_and_read_body_json(&app, req).await;
    assert_eq!(joined.status, BattleStatus::Active);
    assert_eq!(joined.current_turn, Some(host));

    // act
    let req = test::TestRequest::post()
        .uri(&format!("/api/battles/{}/actions", battle.id))
        .set_json(json!({
            "type": "place_card",
            "actor_id": host,
            "card_id": "scout",
            "slot": "left"
        }))
        .to_request();
    let resp: ActionResponse = test::call_and_read_body_json(&app, req).await;
    assert_eq!(resp.battle.player(host).unwrap().energy, 80);

    // read back
    let req = test::TestRequest::get()
        .uri(&format!("/api/battles/{}", battle.id))
        .to_request();
    let stored: Battle = test::call_and_read_body_json(&app, req).await;
    assert_eq!(stored, resp.battle);
}

#[actix_rt::test]
async fn domain_errors_map_to_status_codes() {
    let svc = service();
    let app = test::init_service(
        App::new()
            .app_data(svc.clone())
            .configure(http::routes::init_routes),
    )
    .await;
    let host = Uuid::new_v4();
    let guest = Uuid::new_v4();
    let battle = svc.create_battle(host, &deck(), false).await.unwrap();
    svc.join_battle(battle.id, guest, &deck()).await.unwrap();
    let actions = format!("/api/battles/{}/actions", battle.id);

    let cases = [
        (
            json!({ "type": "end_turn", "actor_id": guest }),
            StatusCode::CONFLICT,
            "NotYourTurn",
        ),
        (
            json!({ "type": "place_card", "actor_id": host, "card_id": "scout", "slot": "middle" }),
            StatusCode::BAD_REQUEST,
            "InvalidSlot",
        ),
        (
            json!({ "type": "cast_spell", "actor_id": host, "spell_id": "fireball", "target": "player" }),
            StatusCode::OK,
            "",
        ),
        (
            json!({ "type": "cast_spell", "actor_id": host, "spell_id": "fireball", "target": "player" }),
            StatusCode::UNPROCESSABLE_ENTITY,
            "SpellOnCooldown",
        ),
        (
            json!({ "type": "place_card", "actor_id": host, "card_id": "dragon", "slot": "left" }),
            StatusCode::NOT_FOUND,
            "CardNotFound",
        ),
    ];

    for (body, status, code) in cases {
        let req = test::TestRequest::post()
            .uri(&actions)
            .set_json(body)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), status, "expected {code}");
        if !code.is_empty() {
            let err: Value = test::read_body_json(resp).await;
            assert_eq!(err["error"], code);
            assert!(err["message"].is_string());
        }
    }

    let req = test::TestRequest::get()
        .uri(&format!("/api/battles/{}", Uuid::new_v4()))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_rt::test]
async fn preview_rejects_unknown_targets() {
    let svc = service();
    let app = test::init_service(
        App::new()
            .app_data(svc.clone())
            .configure(http::routes::init_routes),
    )
    .await;
    let host = Uuid::new_v4();
    let battle = svc.create_battle(host, &deck(), false).await.unwrap();

    let req = test::TestRequest::post()
        .uri(&format!("/api/battles/{}/preview", battle.id))
        .set_json(json!({ "actor_id": host, "unit_id": Uuid::new_v4(), "target": "moon" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    // still waiting for an opponent
    let req = test::TestRequest::post()
        .uri(&format!("/api/battles/{}/preview", battle.id))
        .set_json(json!({ "actor_id": host, "unit_id": Uuid::new_v4(), "target": "player" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
}

#[actix_rt::test]
async fn health_and_battle_metrics() {
    let svc = service();
    let app = test::init_service(
        App::new()
            .app_data(svc.clone())
            .configure(http::routes::init_routes),
    )
    .await;

    let req = test::TestRequest::get().uri("/api/healthz").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let host = Uuid::new_v4();
    let battle = svc.create_battle(host, &deck(), false).await.unwrap();
    svc.join_battle(battle.id, Uuid::new_v4(), &deck())
        .await
        .unwrap();
    let req = test::TestRequest::post()
        .uri(&format!("/api/battles/{}/actions", battle.id))
        .set_json(json!({ "type": "end_turn", "actor_id": host }))
        .to_request();
    assert!(test::call_service(&app, req).await.status().is_success());

    let req = test::TestRequest::get()
        .uri("/api/metrics/battles")
        .to_request();
    let body = test::call_and_read_body(&app, req).await;
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("battle_actions_total"));
}
