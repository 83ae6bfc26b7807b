//! Room actor: owns one `Room` and drives its countdown and tick schedulers

use std::collections::HashMap;
use std::future::pending;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::{interval_at, sleep, Instant, Interval, MissedTickBehavior, Sleep};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::game::room::TickReport;
use crate::game::{
    GamePhase, PlayerId, Room, RoomError, RoomSnapshot, Stickman, Team, TeamId, Teams,
};
use crate::util::time::{tick_duration, COUNTDOWN_STEP};
use crate::ws::protocol::ServerMsg;

/// Commands accepted by a room task
#[derive(Debug)]
pub enum RoomCommand {
    Join {
        connection_id: Uuid,
        team: TeamId,
        details: Team,
        /// The assigned stickman and the team details as of this join
        reply: oneshot::Sender<Result<(Stickman, Teams), RoomError>>,
    },
    Input {
        player_id: PlayerId,
        keys: HashMap<String, bool>,
        attack_keys: Vec<String>,
    },
    /// Drop whatever the connection owns. Replies true when the room is
    /// now empty and the task has stopped.
    Disconnect {
        connection_id: Uuid,
        reply: oneshot::Sender<bool>,
    },
    Snapshot {
        reply: oneshot::Sender<RoomSnapshot>,
    },
}

/// Handle to a running room
#[derive(Clone)]
pub struct RoomHandle {
    pub id: Uuid,
    pub command_tx: mpsc::Sender<RoomCommand>,
    pub state_tx: broadcast::Sender<ServerMsg>,
    pub player_count: Arc<AtomicUsize>,
}

impl RoomHandle {
    pub fn player_count(&self) -> usize {
        self.player_count.load(Ordering::Relaxed)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ServerMsg> {
        self.state_tx.subscribe()
    }
}

/// The timer currently driving a room. Exactly one exists at a time, so a
/// room is never counted down and ticked at once.
enum Schedule {
    Idle,
    Countdown(Interval),
    Ticking(Interval),
    RoundPause(Pin<Box<Sleep>>),
}

impl Schedule {
    fn for_phase(phase: GamePhase, round_pause: Duration) -> Self {
        match phase {
            GamePhase::Countdown => Schedule::Countdown(periodic(COUNTDOWN_STEP)),
            GamePhase::Playing => Schedule::Ticking(periodic(tick_duration())),
            GamePhase::RoundOver => Schedule::RoundPause(Box::pin(sleep(round_pause))),
            GamePhase::Lobby | GamePhase::MatchOver => Schedule::Idle,
        }
    }

    async fn fire(&mut self) {
        match self {
            Schedule::Idle => pending::<()>().await,
            Schedule::Countdown(interval) | Schedule::Ticking(interval) => {
                interval.tick().await;
            }
            Schedule::RoundPause(delay) => delay.as_mut().await,
        }
    }
}

/// Interval whose first tick is one full period away
fn periodic(period: Duration) -> Interval {
    let mut interval = interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval
}

/// Single writer for one room's state
pub struct RoomTask {
    room: Room,
    command_rx: mpsc::Receiver<RoomCommand>,
    state_tx: broadcast::Sender<ServerMsg>,
    player_count: Arc<AtomicUsize>,
    round_pause: Duration,
}

impl RoomTask {
    pub fn new(room: Room, round_pause: Duration) -> (Self, RoomHandle) {
        let (command_tx, command_rx) = mpsc::channel(256);
        let (state_tx, _) = broadcast::channel(64);
        let player_count = Arc::new(AtomicUsize::new(0));

        let handle = RoomHandle {
            id: room.id(),
            command_tx,
            state_tx: state_tx.clone(),
            player_count: player_count.clone(),
        };

        let task = Self {
            room,
            command_rx,
            state_tx,
            player_count,
            round_pause,
        };

        (task, handle)
    }

    /// Serve commands and timers until the room empties or every handle is gone
    pub async fn run(mut self) {
        let room_id = self.room.id();
        info!(room_id = %room_id, "Room task started");

        let mut phase = self.room.phase();
        let mut schedule = Schedule::for_phase(phase, self.round_pause);

        loop {
            let keep_running = tokio::select! {
                cmd = self.command_rx.recv() => match cmd {
                    Some(cmd) => self.handle_command(cmd),
                    None => false,
                },
                _ = schedule.fire() => {
                    self.on_timer(phase);
                    true
                }
            };
            if !keep_running {
                break;
            }

            let current = self.room.phase();
            if current != phase {
                info!(room_id = %room_id, from = ?phase, to = ?current, "Room phase changed");
                phase = current;
                schedule = Schedule::for_phase(phase, self.round_pause);
            }
        }

        info!(room_id = %room_id, "Room task stopped");
    }

    /// Returns false when the task should stop
    fn handle_command(&mut self, cmd: RoomCommand) -> bool {
        match cmd {
            RoomCommand::Join {
                connection_id,
                team,
                details,
                reply,
            } => {
                let result = self
                    .room
                    .join(connection_id, team, details)
                    .map(|stickman| (stickman, self.room.teams().clone()));
                if let Ok((stickman, _)) = &result {
                    info!(
                        room_id = %self.room.id(),
                        connection_id = %connection_id,
                        player_id = stickman.id,
                        team = ?team,
                        "Player joined room"
                    );
                    self.update_player_count();
                    self.broadcast_state();
                }
                let _ = reply.send(result);
                true
            }
            RoomCommand::Input {
                player_id,
                keys,
                attack_keys,
            } => {
                self.room.submit_input(player_id, &keys, attack_keys);
                true
            }
            RoomCommand::Disconnect {
                connection_id,
                reply,
            } => {
                if let Some(departure) = self.room.disconnect(connection_id) {
                    info!(
                        room_id = %self.room.id(),
                        connection_id = %connection_id,
                        player_id = departure.player_id,
                        team = ?departure.team,
                        forfeit = departure.forfeit,
                        "Player left room"
                    );
                    if departure.forfeit {
                        info!(
                            room_id = %self.room.id(),
                            winner = ?self.room.match_winner(),
                            "Match forfeited"
                        );
                    }
                    self.update_player_count();
                    self.broadcast_state();
                }
                let empty = self.room.is_empty();
                let _ = reply.send(empty);
                !empty
            }
            RoomCommand::Snapshot { reply } => {
                let _ = reply.send(RoomSnapshot::capture(&self.room));
                true
            }
        }
    }

    fn on_timer(&mut self, phase: GamePhase) {
        match phase {
            GamePhase::Countdown => {
                if self.room.countdown_step() {
                    info!(room_id = %self.room.id(), round = self.room.round(), "Round started");
                } else {
                    debug!(room_id = %self.room.id(), countdown = self.room.countdown(), "Countdown");
                }
                self.broadcast_state();
            }
            GamePhase::Playing => {
                let report = self.room.tick();
                self.log_tick(&report);
                if let Some(result) = report.round {
                    info!(
                        room_id = %self.room.id(),
                        round = self.room.round(),
                        winner = ?result.winner,
                        team_a = result.scores.get(TeamId::A),
                        team_b = result.scores.get(TeamId::B),
                        "Round over"
                    );
                    if let Some(winner) = result.match_winner {
                        info!(room_id = %self.room.id(), winner = ?winner, "Match over");
                    }
                }
                self.broadcast_state();
            }
            GamePhase::RoundOver => {
                if self.room.finish_round_pause() {
                    self.broadcast_state();
                }
            }
            GamePhase::Lobby | GamePhase::MatchOver => {
                warn!(room_id = %self.room.id(), phase = ?phase, "Timer fired in an untimed phase");
            }
        }
    }

    fn log_tick(&self, report: &TickReport) {
        let room_id = self.room.id();
        for player_id in &report.attacks {
            debug!(room_id = %room_id, player_id, "Attack started");
        }
        for kill in &report.kills {
            debug!(
                room_id = %room_id,
                killer_id = kill.killer_id,
                victim_id = kill.victim_id,
                "Stickman killed"
            );
        }
        if let Some(player_id) = report.power_up_claimed_by {
            debug!(room_id = %room_id, player_id, "Power-up claimed");
        }
        if report.power_up_spawned {
            debug!(room_id = %room_id, "Power-up spawned");
        }
    }

    fn update_player_count(&self) {
        self.player_count
            .store(self.room.player_count(), Ordering::Relaxed);
    }

    fn broadcast_state(&self) {
        // No subscribers is not an error
        let _ = self
            .state_tx
            .send(ServerMsg::GameStateSync(RoomSnapshot::capture(&self.room)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RoomSettings;

    fn spawn_room() -> RoomHandle {
        let settings = RoomSettings {
            obstacle_count: 0,
            ..RoomSettings::default()
        };
        let room = Room::new(Uuid::new_v4(), Teams::default(), settings.clone(), 21);
        let (task, handle) = RoomTask::new(room, settings.round_pause);
        tokio::spawn(task.run());
        handle
    }

    async fn join(handle: &RoomHandle, team: TeamId) -> (Uuid, Stickman) {
        let connection_id = Uuid::new_v4();
        let (reply, rx) = oneshot::channel();
        handle
            .command_tx
            .send(RoomCommand::Join {
                connection_id,
                team,
                details: Teams::default().get(team).clone(),
                reply,
            })
            .await
            .unwrap();
        (connection_id, rx.await.unwrap().unwrap().0)
    }

    async fn snapshot(handle: &RoomHandle) -> RoomSnapshot {
        let (reply, rx) = oneshot::channel();
        handle.command_tx.send(RoomCommand::Snapshot { reply }).await.unwrap();
        rx.await.unwrap()
    }

    async fn next_sync(rx: &mut broadcast::Receiver<ServerMsg>) -> RoomSnapshot {
        match rx.recv().await.unwrap() {
            ServerMsg::GameStateSync(snapshot) => snapshot,
            other => panic!("unexpected message {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn countdown_then_ticks_at_sixty_hertz() {
        let handle = spawn_room();
        let mut rx = handle.subscribe();
        join(&handle, TeamId::A).await;
        join(&handle, TeamId::B).await;
        assert_eq!(handle.player_count(), 2);

        let lobby_sync = next_sync(&mut rx).await;
        assert_eq!(lobby_sync.game_state, GamePhase::Lobby);
        let countdown_sync = next_sync(&mut rx).await;
        assert_eq!(countdown_sync.game_state, GamePhase::Countdown);
        assert_eq!(countdown_sync.countdown, 5);

        // 5, 4, 3, 2, 1, 0 then below zero
        for expected in (0..5).rev() {
            let sync = next_sync(&mut rx).await;
            assert_eq!(sync.countdown, expected);
            assert_eq!(sync.game_state, GamePhase::Countdown);
        }
        let started = next_sync(&mut rx).await;
        assert_eq!(started.game_state, GamePhase::Playing);
        assert_eq!(started.tick, 0);

        tokio::time::sleep(Duration::from_millis(500)).await;
        let state = snapshot(&handle).await;
        assert!((28..=31).contains(&state.tick), "ticked {} times", state.tick);
    }

    #[tokio::test(start_paused = true)]
    async fn lobby_does_not_tick() {
        let handle = spawn_room();
        join(&handle, TeamId::A).await;
        tokio::time::sleep(Duration::from_secs(10)).await;
        let state = snapshot(&handle).await;
        assert_eq!(state.game_state, GamePhase::Lobby);
        assert_eq!(state.tick, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn last_disconnect_stops_the_task() {
        let handle = spawn_room();
        let (a, _) = join(&handle, TeamId::A).await;
        let (b, _) = join(&handle, TeamId::B).await;

        let (reply, rx) = oneshot::channel();
        handle
            .command_tx
            .send(RoomCommand::Disconnect { connection_id: a, reply })
            .await
            .unwrap();
        assert!(!rx.await.unwrap());

        let state = snapshot(&handle).await;
        assert_eq!(state.game_state, GamePhase::MatchOver);
        assert_eq!(state.winner.map(|t| t.name), Some("Team B".to_string()));

        let (reply, rx) = oneshot::channel();
        handle
            .command_tx
            .send(RoomCommand::Disconnect { connection_id: b, reply })
            .await
            .unwrap();
        assert!(rx.await.unwrap());

        tokio::task::yield_now().await;
        assert!(handle.command_tx.is_closed());
    }

    #[tokio::test(start_paused = true)]
    async fn full_team_is_refused_without_broadcast() {
        let handle = spawn_room();
        for _ in 0..4 {
            join(&handle, TeamId::A).await;
        }
        let mut rx = handle.subscribe();

        let (reply, reply_rx) = oneshot::channel();
        handle
            .command_tx
            .send(RoomCommand::Join {
                connection_id: Uuid::new_v4(),
                team: TeamId::A,
                details: Teams::default().team_a,
                reply,
            })
            .await
            .unwrap();
        let err = reply_rx.await.unwrap().unwrap_err();
        assert_eq!(err.to_string(), "Team A is full (4/4 players)");
        assert!(matches!(
            rx.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }
}
