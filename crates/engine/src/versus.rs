//! Two-player match over a room.
//!
//! Both sides run their own engine; only snapshots and attacks cross the wire.
//! The host announces a seed and a start time, both sides count down and reset
//! with that seed at the same instant, then each broadcasts its state on a
//! fixed interval. Line clears since the previous broadcast ride along as
//! `attack`, which the receiver turns into garbage rows.

use tracing::{debug, info};

use crate::clock::Clock;
use crate::controls::{apply_controls, ControlPolicy};
use crate::core::{GameSnapshot, GameState};
use crate::game_loop::LoopCallbacks;
use crate::input::InputState;
use crate::net::sync::{
    plan_start, random_seed, Countdown, CountdownStep, COUNTDOWN_STEP_MS, START_LEAD_MS,
};
use crate::net::{
    AttackMeter, EventQueue, HostInfoPayload, OpponentSnapshot, ReadyPayload, Relay, RoomEvent,
    StartPayload, StatePayload, TransportClient, WireStatus,
};
use crate::solo::Renderer;
use crate::types::GameStatus;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchConfig {
    /// Garbage rows per cleared line
    pub attack_ratio: f64,
    pub broadcast_ms: u64,
    pub start_lead_ms: u64,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            attack_ratio: 1.0,
            broadcast_ms: 150,
            start_lead_ms: START_LEAD_MS,
        }
    }
}

impl MatchConfig {
    /// Create from `TETRIS_ATTACK_RATIO` / `TETRIS_BROADCAST_MS`
    pub fn from_env() -> Self {
        use std::env;

        let defaults = Self::default();
        let attack_ratio = env::var("TETRIS_ATTACK_RATIO")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.attack_ratio);
        let broadcast_ms = env::var("TETRIS_BROADCAST_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .filter(|&ms: &u64| ms > 0)
            .unwrap_or(defaults.broadcast_ms);

        Self {
            attack_ratio,
            broadcast_ms,
            ..defaults
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Host,
    Guest,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Peer {
    pub user_id: String,
    pub name: Option<String>,
    pub ready: bool,
}

/// Where the match is, from this side's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchPhase {
    /// Waiting for a peer, readiness, or the host's start
    Waiting,
    Countdown,
    Playing,
    /// Local game over
    Finished,
}

pub struct VersusMatch<R: Relay, K: Clock, V: Renderer> {
    transport: TransportClient<R>,
    events: EventQueue,
    clock: K,
    renderer: V,
    config: MatchConfig,
    role: Role,
    name: Option<String>,
    game: GameState,
    input: InputState,
    snapshot: GameSnapshot,
    peer: Option<Peer>,
    ready: bool,
    start: Option<StartPayload>,
    countdown: Option<Countdown>,
    started: bool,
    opponent: OpponentSnapshot,
    meter: AttackMeter,
    next_broadcast: Option<u64>,
    final_sent: bool,
    garbage_received: u32,
}

impl<R: Relay, K: Clock, V: Renderer> VersusMatch<R, K, V> {
    /// Join `room_id` in `role`. The local game idles until the countdown ends.
    pub fn new(
        mut transport: TransportClient<R>,
        clock: K,
        renderer: V,
        config: MatchConfig,
        role: Role,
        room_id: &str,
        name: Option<&str>,
    ) -> Self {
        let events = EventQueue::new();
        transport.join(room_id, name, Box::new(events.clone()));
        let mut input = InputState::new();
        input.attach();

        Self {
            transport,
            events,
            clock,
            renderer,
            config,
            role,
            name: name.map(str::to_string),
            game: GameState::idle(random_seed()),
            input,
            snapshot: GameSnapshot::default(),
            peer: None,
            ready: false,
            start: None,
            countdown: None,
            started: false,
            opponent: OpponentSnapshot::empty(),
            meter: AttackMeter::new(config.attack_ratio),
            next_broadcast: None,
            final_sent: false,
            garbage_received: 0,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn user_id(&self) -> &str {
        self.transport.user_id()
    }

    pub fn peer(&self) -> Option<&Peer> {
        self.peer.as_ref()
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn game(&self) -> &GameState {
        &self.game
    }

    pub fn game_mut(&mut self) -> &mut GameState {
        &mut self.game
    }

    pub fn input_mut(&mut self) -> &mut InputState {
        &mut self.input
    }

    /// Last state received from the peer; stale if the connection dropped
    pub fn opponent(&self) -> &OpponentSnapshot {
        &self.opponent
    }

    /// Garbage rows applied to the local game so far
    pub fn garbage_received(&self) -> u32 {
        self.garbage_received
    }

    pub fn transport(&self) -> &TransportClient<R> {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut TransportClient<R> {
        &mut self.transport
    }

    pub fn phase(&self) -> MatchPhase {
        if self.started {
            if self.game.status() == GameStatus::GameOver {
                MatchPhase::Finished
            } else {
                MatchPhase::Playing
            }
        } else if self.countdown.is_some() {
            MatchPhase::Countdown
        } else {
            MatchPhase::Waiting
        }
    }

    /// "3", "2", "1", "Go", or None outside the countdown
    pub fn countdown_label(&self) -> Option<&'static str> {
        let now = self.clock.now_ms();
        self.countdown.as_ref().and_then(|c| c.label(now))
    }

    pub fn set_ready(&mut self, ready: bool) {
        self.ready = ready;
        let event = RoomEvent::Ready(ReadyPayload {
            user_id: self.transport.user_id().to_string(),
            ready,
        });
        self.transport.send(&event);
    }

    /// Host only: announce a synchronized start once the peer is ready.
    /// Also starts a rematch after a finished game.
    pub fn start(&mut self) -> bool {
        let idle = matches!(self.phase(), MatchPhase::Waiting | MatchPhase::Finished);
        if self.role != Role::Host || !idle {
            return false;
        }
        if !self.peer.as_ref().map(|p| p.ready).unwrap_or(false) {
            debug!("start refused: peer not ready");
            return false;
        }

        let now = self.clock.now_ms();
        let start = plan_start(now, self.config.start_lead_ms, random_seed());
        info!(seed = start.seed, at = start.at, "announcing match start");
        self.schedule(start, now);
        self.transport.send(&RoomEvent::Start(start));
        true
    }

    fn schedule(&mut self, start: StartPayload, now: u64) {
        self.start = Some(start);
        self.countdown = Some(Countdown::schedule(&start, now));
        self.started = false;
        self.final_sent = false;
    }

    /// Leave the room; the local game keeps its last state
    pub fn leave(&mut self) {
        self.transport.leave();
        self.peer = None;
    }

    /// Pump transport, countdown, input, engine, and broadcast for one step
    pub fn update(&mut self, step_ms: f64) {
        let now = self.clock.now_ms();

        self.transport.poll(now);
        for event in self.events.drain() {
            self.handle_event(event, now);
        }

        if let Some(countdown) = self.countdown {
            if !self.started && countdown.step(now) == CountdownStep::Go {
                info!(seed = countdown.seed(), "match started");
                self.game.reset_with_seed(countdown.seed());
                self.input.clear();
                self.meter.reset(0);
                self.started = true;
                self.next_broadcast = Some(now);
            }
            // "Go" stays up for one step of the countdown
            if self.started && now >= countdown.go_at() + COUNTDOWN_STEP_MS {
                self.countdown = None;
            }
        }

        if self.started {
            apply_controls(&mut self.input, &mut self.game, ControlPolicy::VERSUS);
            self.game.tick(step_ms);
            self.broadcast(now);
        }
    }

    fn broadcast(&mut self, now: u64) {
        let Some(due) = self.next_broadcast else {
            return;
        };
        if now < due || self.final_sent {
            return;
        }
        self.next_broadcast = Some(now + self.config.broadcast_ms);

        let attack = self.meter.sample(self.game.lines());
        self.game.snapshot_into(&mut self.snapshot);
        let snapshot = OpponentSnapshot::from_game(&self.snapshot);
        if snapshot.status == WireStatus::Gameover {
            self.final_sent = true;
        }
        if attack > 0 {
            debug!(attack, "sending garbage");
        }
        let event = RoomEvent::State(StatePayload {
            user_id: self.transport.user_id().to_string(),
            snapshot,
            attack,
        });
        self.transport.send(&event);
    }

    fn is_self(&self, user_id: &str) -> bool {
        user_id == self.transport.user_id()
    }

    /// Remember `user_id` as the peer, keeping readiness if already known
    fn learn_peer(&mut self, user_id: &str, name: Option<String>) {
        match self.peer.as_mut() {
            Some(p) if p.user_id == user_id => {
                if name.is_some() {
                    p.name = name;
                }
            }
            _ => {
                info!(peer = user_id, "peer joined");
                self.peer = Some(Peer {
                    user_id: user_id.to_string(),
                    name,
                    ready: false,
                });
            }
        }
    }

    fn handle_event(&mut self, event: RoomEvent, now: u64) {
        match event {
            RoomEvent::Join(p) => {
                self.learn_peer(&p.user_id, p.name);
                if self.role == Role::Host {
                    let info = RoomEvent::HostInfo(HostInfoPayload {
                        user_id: self.transport.user_id().to_string(),
                        name: self.name.clone(),
                    });
                    self.transport.send(&info);
                    if self.ready {
                        self.set_ready(true);
                    }
                }
            }
            RoomEvent::HostInfo(p) => {
                if self.role == Role::Guest && !self.is_self(&p.user_id) {
                    self.learn_peer(&p.user_id, p.name);
                }
            }
            RoomEvent::Leave(p) => {
                if self.peer.as_ref().map(|peer| peer.user_id == p.user_id).unwrap_or(false) {
                    info!(peer = %p.user_id, "peer left");
                    self.peer = None;
                    if !self.started {
                        self.countdown = None;
                        self.start = None;
                    }
                }
            }
            RoomEvent::Ready(p) => {
                if self.is_self(&p.user_id) {
                    return;
                }
                self.learn_peer(&p.user_id, None);
                if let Some(peer) = self.peer.as_mut() {
                    peer.ready = p.ready;
                }
            }
            RoomEvent::Start(start) => {
                if self.start == Some(start) {
                    return;
                }
                info!(seed = start.seed, at = start.at, "start received");
                self.schedule(start, now);
            }
            RoomEvent::State(p) => {
                if self.is_self(&p.user_id) {
                    return;
                }
                self.learn_peer(&p.user_id, None);
                if p.attack > 0 {
                    if self.game.add_garbage(p.attack) {
                        self.garbage_received += p.attack;
                    } else {
                        debug!(attack = p.attack, "garbage ignored, not playing");
                    }
                }
                self.opponent = p.snapshot;
            }
        }
    }
}

impl<R: Relay, K: Clock, V: Renderer> LoopCallbacks for VersusMatch<R, K, V> {
    fn update(&mut self, step_ms: f64) {
        VersusMatch::update(self, step_ms);
    }

    fn render(&mut self) {
        self.game.snapshot_into(&mut self.snapshot);
        self.renderer.render(&self.snapshot);
        self.renderer.render_opponent(&self.opponent);
        let label = self.countdown_label();
        self.renderer.render_countdown(label);
    }
}
