//! WebSocket upgrade handler

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::game::{PlayerId, WeaponType};
use crate::util::rate_limit::PlayerRateLimiter;
use crate::ws::protocol::{ClientMsg, ServerMsg};

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState) {
    // Identity is assigned by the server, never taken from the client
    let player_id = Uuid::new_v4();
    let spawn = state.scene.next_spawn_point();
    let weapon_id = state
        .scene
        .spawn_player(player_id, spawn, WeaponType::Rifle);
    info!(player_id = %player_id, weapon_id = %weapon_id, ?spawn, "New WebSocket connection");

    let (mut ws_sink, ws_stream) = socket.split();

    let welcome = ServerMsg::Welcome {
        player_id,
        weapon_id,
        server_time: state.clock.now(),
    };

    if let Err(e) = send_msg(&mut ws_sink, &welcome).await {
        error!(player_id = %player_id, error = %e, "Failed to send welcome");
        cleanup(&state, player_id);
        return;
    }

    let events_rx = state.authority.subscribe();
    run_session(player_id, &state, ws_sink, ws_stream, events_rx).await;

    cleanup(&state, player_id);
    info!(player_id = %player_id, "WebSocket connection closed");
}

/// Authority cleanup must see the equipped weapon, so it runs before the
/// character is removed from the scene
fn cleanup(state: &AppState, player_id: PlayerId) {
    state.authority.handle_disconnect(player_id);
    if let Some(weapon_id) = state.scene.remove_player(player_id) {
        state.authority.handle_weapon_destroyed(weapon_id);
    }
}

/// Run the WebSocket session with read/write split
async fn run_session(
    player_id: PlayerId,
    state: &AppState,
    mut ws_sink: futures::stream::SplitSink<WebSocket, Message>,
    mut ws_stream: futures::stream::SplitStream<WebSocket>,
    mut events_rx: broadcast::Receiver<crate::game::CombatEvent>,
) {
    let rate_limiter = PlayerRateLimiter::new(state.config.input_rate_limit);
    let (direct_tx, mut direct_rx) = mpsc::channel::<ServerMsg>(16);

    // Writer task: combat events and direct replies -> WebSocket
    let writer_handle = tokio::spawn(async move {
        loop {
            let msg = tokio::select! {
                direct = direct_rx.recv() => match direct {
                    Some(msg) => msg,
                    None => break,
                },
                event = events_rx.recv() => match event {
                    Ok(event) => ServerMsg::from(event),
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(player_id = %player_id, lagged_count = n, "Client lagged, skipping {} events", n);
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        debug!(player_id = %player_id, "Event channel closed");
                        break;
                    }
                },
            };

            if let Err(e) = send_msg(&mut ws_sink, &msg).await {
                debug!(player_id = %player_id, error = %e, "WebSocket send failed");
                break;
            }
        }
    });

    // Reader loop: WebSocket -> authority
    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                if !rate_limiter.check_input() {
                    warn!(player_id = %player_id, "Rate limited input message");
                    continue;
                }

                match serde_json::from_str::<ClientMsg>(&text) {
                    Ok(ClientMsg::FireBullet(request)) => {
                        // Outcome is deliberately not reported back
                        if let Ok(outcome) = state.authority.handle_fire_intent(player_id, &request) {
                            debug!(
                                player_id = %player_id,
                                weapon_id = %outcome.weapon_id,
                                pellets = outcome.trajectories.len(),
                                remaining_ammo = outcome.remaining_ammo,
                                "Fire intent accepted"
                            );
                        }
                    }
                    Ok(ClientMsg::ReloadWeapon) => {
                        let _ = state.authority.handle_reload_intent(player_id);
                    }
                    Ok(ClientMsg::Ping { t }) => {
                        let pong = ServerMsg::Pong {
                            t,
                            server_time: state.clock.now(),
                        };
                        if direct_tx.send(pong).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(player_id = %player_id, error = %e, "Failed to parse client message");
                    }
                }
            }
            Ok(Message::Binary(_)) => {
                warn!(player_id = %player_id, "Received binary message, ignoring");
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {
                debug!(player_id = %player_id, "Received transport ping/pong");
            }
            Ok(Message::Close(_)) => {
                info!(player_id = %player_id, "Client initiated close");
                break;
            }
            Err(e) => {
                error!(player_id = %player_id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    writer_handle.abort();
}

/// Send a message over WebSocket
async fn send_msg(
    sink: &mut futures::stream::SplitSink<WebSocket, Message>,
    msg: &ServerMsg,
) -> Result<(), String> {
    let json = serde_json::to_string(msg).map_err(|e| e.to_string())?;
    sink.send(Message::Text(json))
        .await
        .map_err(|e| e.to_string())
}
