//! WebSocket endpoint with Redis event subscription.

use std::collections::HashSet;
use std::time::Duration;

use actix_web::{web, Error, HttpRequest, HttpResponse};
use actix_ws::{handle, Message, Session};
use futures::StreamExt;
use redis::{AsyncCommands, Client as RedisClient};
use uuid::Uuid;

use crate::config::settings;
use crate::game::session::BattleService;
use crate::notify::player_channel;
use crate::protocol::{ActionPayload, ActionRequest, ClientMsg, ServerMsg};

fn presence_key(player_id: Uuid) -> String {
    format!("session:{player_id}")
}

pub async fn ws_index(
    req: HttpRequest,
    body: web::Payload,
    svc: web::Data<BattleService>,
    redis: web::Data<RedisClient>,
) -> Result<HttpResponse, Error> {
    // 1 · player_id query param
    let pid_str = req
        .query_string()
        .split('&')
        .find_map(|kv| kv.strip_prefix("player_id="))
        .ok_or_else(|| actix_web::error::ErrorBadRequest("player_id missing"))?;
    let player_id =
        Uuid::parse_str(pid_str).map_err(|_| actix_web::error::ErrorBadRequest("bad UUID"))?;

    // 2 · handshake
    let (response, mut session, mut ws_stream) = handle(&req, body)?;

    // 3 · presence key
    {
        let mut conn = redis
            .get_multiplexed_async_connection()
            .await
            .map_err(|_| actix_web::error::ErrorInternalServerError("redis"))?;
        let _: () = conn
            .set_ex(presence_key(player_id), "1", settings().presence_ttl)
            .await
            .unwrap_or(());
    }

    // 4 · Redis subscribe
    let mut pubsub = redis
        .get_async_pubsub()
        .await
        .map_err(|_| actix_web::error::ErrorInternalServerError("redis subscribe"))?;
    pubsub
        .subscribe(player_channel(player_id))
        .await
        .map_err(|_| actix_web::error::ErrorInternalServerError("redis subscribe"))?;

    let svc = svc.clone();
    let redis_client = redis.get_ref().clone();

    actix::spawn(async move {
        let mut redis_stream = pubsub.on_message();
        let mut battles: HashSet<Uuid> = HashSet::new();

        loop {
            tokio::select! {
                // client → server
                Some(frame) = ws_stream.next() => {
                    match frame {
                        Ok(Message::Text(text)) => {
                            match serde_json::from_str::<ClientMsg>(&text) {
                                Ok(cmsg) => {
                                    battles.insert(cmsg.battle_id());
                                    handle_client_msg(&svc, &mut session, player_id, cmsg).await;
                                }
                                Err(e) => log::debug!("bad frame from {player_id}: {e}"),
                            }
                        }
                        Ok(Message::Ping(bytes)) => {
                            if session.pong(&bytes).await.is_err() {
                                break;
                            }
                        }
                        Ok(Message::Close(_)) | Err(_) => break,
                        _ => {}
                    }
                }
                // redis → client
                Some(msg) = redis_stream.next() => {
                    if let Ok(json) = msg.get_payload::<String>() {
                        if let Err(e) = session.text(json).await {
                            log::warn!("WS send failed for {player_id}: {e:?}");
                            break;
                        }
                    }
                }
                else => break,
            }
        }

        // On disconnect …
        if let Ok(mut conn) = redis_client.get_multiplexed_async_connection().await {
            let _: () = conn.del(presence_key(player_id)).await.unwrap_or(());
        }
        log::info!("WS closed for player {player_id}");

        if !battles.is_empty() {
            actix::spawn(forfeit_after_grace(svc, redis_client, player_id, battles));
        }
    });

    Ok(response)
}

async fn send(session: &mut Session, msg: &ServerMsg) {
    match serde_json::to_string(msg) {
        Ok(json) => {
            if let Err(e) = session.text(json).await {
                log::warn!("WS reply failed: {e:?}");
            }
        }
        Err(e) => log::error!("encoding WS reply failed: {e}"),
    }
}

async fn handle_client_msg(
    svc: &BattleService,
    session: &mut Session,
    player_id: Uuid,
    msg: ClientMsg,
) {
    match msg {
        ClientMsg::Action {
            battle_id,
            mut request,
        } => {
            // a socket can only act for the player it was opened for
            request.actor_id = player_id;
            // success is pushed through pub/sub like every other commit
            if let Err(e) = svc.submit(battle_id, request).await {
                send(session, &ServerMsg::rejected(battle_id, &e)).await;
            }
        }
        ClientMsg::Resume { battle_id } => match svc.get_battle(battle_id).await {
            Ok(battle) => send(session, &ServerMsg::Snapshot { battle }).await,
            Err(e) => send(session, &ServerMsg::rejected(battle_id, &e)).await,
        },
    }
}

/// Forfeit every battle the socket touched unless the player came back
/// within the grace period.
async fn forfeit_after_grace(
    svc: web::Data<BattleService>,
    redis: RedisClient,
    player_id: Uuid,
    battles: HashSet<Uuid>,
) {
    tokio::time::sleep(Duration::from_secs(settings().disconnect_grace)).await;

    let reconnected = match redis.get_multiplexed_async_connection().await {
        Ok(mut conn) => conn
            .exists::<_, bool>(presence_key(player_id))
            .await
            .unwrap_or(true),
        // unknown presence: never forfeit on a Redis outage
        Err(_) => true,
    };
    if reconnected {
        return;
    }

    for battle_id in battles {
        let request = ActionRequest {
            actor_id: player_id,
            payload: ActionPayload::Leave,
        };
        match svc.submit(battle_id, request).await {
            Ok(_) => log::info!("battle {battle_id}: {player_id} left after disconnect"),
            Err(e) => log::debug!("battle {battle_id}: disconnect leave skipped: {e}"),
        }
    }
}
