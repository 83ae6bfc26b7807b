//! WebSocket upgrade handler

use std::collections::HashMap;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{stream::SplitSink, SinkExt, StreamExt};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::game::{PlayerId, RoomError};
use crate::util::rate_limit::ConnectionRateLimiter;
use crate::util::time::unix_millis;
use crate::ws::protocol::{ClientMsg, ServerMsg};

/// Outbound queue depth per connection
const OUTBOUND_BUFFER: usize = 256;

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState) {
    let connection_id = Uuid::new_v4();
    info!(connection_id = %connection_id, "New WebSocket connection");

    let (ws_sink, mut ws_stream) = socket.split();
    let (out_tx, out_rx) = mpsc::channel::<ServerMsg>(OUTBOUND_BUFFER);
    let writer_handle = tokio::spawn(run_writer(connection_id, ws_sink, out_rx));

    let _ = out_tx
        .send(ServerMsg::Welcome {
            connection_id,
            server_time: unix_millis(),
        })
        .await;

    let mut session = Session::new(connection_id, state.clone(), out_tx);

    // Reader loop: WebSocket -> rooms
    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                if !session.rate_limiter.check_message() {
                    warn!(connection_id = %connection_id, "Rate limited socket message");
                    continue;
                }

                match serde_json::from_str::<ClientMsg>(&text) {
                    Ok(msg) => session.dispatch(msg).await,
                    Err(e) => {
                        warn!(connection_id = %connection_id, error = %e, "Failed to parse client message");
                    }
                }
            }
            Ok(Message::Binary(_)) => {
                warn!(connection_id = %connection_id, "Received binary message, ignoring");
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(Message::Close(_)) => {
                info!(connection_id = %connection_id, "Client initiated close");
                break;
            }
            Err(e) => {
                error!(connection_id = %connection_id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    session.close();
    state.rooms.handle_disconnect(connection_id).await;
    writer_handle.abort();

    info!(connection_id = %connection_id, "WebSocket connection closed");
}

/// Drain the outbound queue into the socket
async fn run_writer(
    connection_id: Uuid,
    mut ws_sink: SplitSink<WebSocket, Message>,
    mut out_rx: mpsc::Receiver<ServerMsg>,
) {
    while let Some(msg) = out_rx.recv().await {
        if let Err(e) = send_msg(&mut ws_sink, &msg).await {
            debug!(connection_id = %connection_id, error = %e, "WebSocket send failed");
            break;
        }
    }
}

/// Per-connection routing state
struct Session {
    connection_id: Uuid,
    state: AppState,
    out_tx: mpsc::Sender<ServerMsg>,
    rate_limiter: ConnectionRateLimiter,
    /// room -> task forwarding that room's broadcasts to this socket
    subscriptions: HashMap<Uuid, JoinHandle<()>>,
    /// room -> player this connection controls there
    players: HashMap<Uuid, PlayerId>,
}

impl Session {
    fn new(connection_id: Uuid, state: AppState, out_tx: mpsc::Sender<ServerMsg>) -> Self {
        let rate_limiter = ConnectionRateLimiter::new(state.config.input_rate_limit);
        Self {
            connection_id,
            state,
            out_tx,
            rate_limiter,
            subscriptions: HashMap::new(),
            players: HashMap::new(),
        }
    }

    async fn reply(&self, msg: ServerMsg) {
        if self.out_tx.send(msg).await.is_err() {
            debug!(connection_id = %self.connection_id, "Outbound channel closed");
        }
    }

    async fn dispatch(&mut self, msg: ClientMsg) {
        match msg {
            ClientMsg::CreateRoom { teams } => {
                let room_id = self.state.rooms.create_room(self.connection_id, teams);
                if let Err(e) = self.watch(room_id) {
                    self.reply(ServerMsg::room_error(e)).await;
                    return;
                }
                self.reply(ServerMsg::RoomCreated { room_id }).await;
            }
            ClientMsg::JoinRoom { room_id } => {
                if let Err(e) = self.watch(room_id) {
                    self.reply(ServerMsg::room_error(e)).await;
                }
            }
            ClientMsg::JoinRequest {
                room_id,
                session_id,
                team_id,
                team_details,
            } => {
                // Subscribe first so the sync caused by this join reaches us
                let result = match self.watch(room_id) {
                    Ok(()) => {
                        self.state
                            .rooms
                            .join_request(self.connection_id, room_id, team_id, team_details)
                            .await
                    }
                    Err(e) => Err(e),
                };
                match result {
                    Ok((player, teams)) => {
                        self.players.insert(room_id, player.id);
                        self.reply(ServerMsg::PlayerAssigned {
                            session_id,
                            player,
                            teams,
                        })
                        .await;
                    }
                    Err(e) => {
                        debug!(connection_id = %self.connection_id, room_id = %room_id, error = %e, "Join refused");
                        self.reply(ServerMsg::room_error(e)).await;
                    }
                }
            }
            ClientMsg::PlayerInput {
                room_id,
                player_id,
                keys,
                attack_keys,
            } => {
                if self.players.get(&room_id) != Some(&player_id) {
                    warn!(
                        connection_id = %self.connection_id,
                        room_id = %room_id,
                        player_id,
                        "Input for a player this connection does not own"
                    );
                    return;
                }
                self.state
                    .rooms
                    .submit_input(room_id, player_id, keys, attack_keys);
            }
            ClientMsg::Ping { t } => {
                self.reply(ServerMsg::Pong { t }).await;
            }
        }
    }

    /// Start forwarding a room's broadcasts, once per room
    fn watch(&mut self, room_id: Uuid) -> Result<(), RoomError> {
        if self.subscriptions.contains_key(&room_id) {
            return Ok(());
        }
        let rx = self.state.rooms.subscribe(self.connection_id, room_id)?;
        let task = tokio::spawn(forward_room(
            self.connection_id,
            room_id,
            rx,
            self.out_tx.clone(),
        ));
        self.subscriptions.insert(room_id, task);
        Ok(())
    }

    fn close(&mut self) {
        for (_, task) in self.subscriptions.drain() {
            task.abort();
        }
    }
}

/// Room broadcasts -> this connection's outbound queue
async fn forward_room(
    connection_id: Uuid,
    room_id: Uuid,
    mut rx: broadcast::Receiver<ServerMsg>,
    out_tx: mpsc::Sender<ServerMsg>,
) {
    loop {
        match rx.recv().await {
            Ok(msg) => {
                if out_tx.send(msg).await.is_err() {
                    break;
                }
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                // Full-state syncs, so skipping stale ones loses nothing
                warn!(
                    connection_id = %connection_id,
                    room_id = %room_id,
                    lagged_count = n,
                    "Client lagged, skipped state syncs"
                );
            }
            Err(broadcast::error::RecvError::Closed) => {
                debug!(connection_id = %connection_id, room_id = %room_id, "Room channel closed");
                break;
            }
        }
    }
}

/// Send a message over WebSocket
async fn send_msg(sink: &mut SplitSink<WebSocket, Message>, msg: &ServerMsg) -> Result<(), String> {
    let json = serde_json::to_string(msg).map_err(|e| e.to_string())?;
    sink.send(Message::Text(json))
        .await
        .map_err(|e| e.to_string())
}
