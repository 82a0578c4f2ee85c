//! The session state machine.
//!
//! [`Session`] never touches a socket or a timer. The driver feeds it
//! [`Event`]s (socket opened, frame received, timer fired, user action)
//! and carries out the [`Command`]s it returns (open, send, close,
//! schedule, cancel, notify). That keeps every protocol rule here, in
//! one `handle` entry point, testable with a hand-cranked clock.
//!
//! Timers are tracked by kind. The machine remembers which ones it has
//! armed, so a disconnect cancels all of them and a timer that fires
//! after being cancelled is ignored.

use std::collections::HashSet;
use std::time::Duration;

use diceroom_names::RoomIdentifier;
use diceroom_protocol::{
    Codec, JsonCodec, Player, PlayerId, RollRecord, RoomMessage,
};

use crate::election;
use crate::history::{RollDraft, RollHistory};
use crate::peers::PeerMap;
use crate::player::{
    Clock, SystemClock, generate_player_id, sanitize_display_name,
};
use crate::{ConnectionState, SessionConfig};

// ---------------------------------------------------------------------------
// Events, commands, notifications
// ---------------------------------------------------------------------------

/// Something that happened, fed into [`Session::handle`].
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// User asked to join a room.
    Connect(RoomIdentifier),
    /// The socket requested by the last [`Command::Open`] is open.
    Opened,
    /// A text frame arrived.
    Frame(String),
    /// The socket closed or failed without us asking.
    Closed,
    /// A scheduled timer is due.
    TimerFired(Timer),
    /// User asked to leave.
    Disconnect,
    /// User asked to retry after the session gave up.
    ManualReconnect,
    /// The window regained focus or became visible.
    Focused,
    /// The local player rolled.
    Roll(RollDraft),
    /// The process is going away; leave if possible.
    Teardown,
}

/// Something the driver must do.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Open a socket to `url`, replacing any existing one.
    Open { url: String },
    /// Send one text frame on the current socket.
    Send(String),
    /// Close the current socket. No [`Event::Closed`] is expected back.
    Close,
    /// Fire `timer` after `after`, replacing any earlier deadline for it.
    Schedule { timer: Timer, after: Duration },
    /// Forget `timer`.
    Cancel(Timer),
    /// Tell the UI.
    Notify(Notification),
}

/// Timer kinds. At most one of each is pending at a time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Timer {
    /// Next `PING`.
    Heartbeat,
    /// The `PONG` for the last `PING` is overdue.
    PingTimeout,
    /// Next reconnect attempt.
    Reconnect,
    /// Run the history-keeper election for a peer that just joined.
    Election(PlayerId),
}

/// What the UI hears about.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    StateChanged(ConnectionState),
    PlayerJoined(Player),
    PlayerLeft(PlayerId),
    /// A peer's roll.
    RollReceived(RollRecord),
    /// A local roll, stamped and recorded.
    RollRecorded(RollRecord),
    /// Rolls merged from a peer's history share, newest first.
    HistoryReceived(Vec<RollRecord>),
    Error(String),
}

/// Connection health as the UI should show it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Health {
    Disconnected,
    /// Connected, and the relay answered recently.
    Healthy,
    /// Connected, but the last `PING` went unanswered or nothing has been
    /// heard for longer than `stale_after`.
    Stale,
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// One participant's view of one room.
pub struct Session<C: Clock = SystemClock> {
    config: SessionConfig,
    clock: C,
    codec: JsonCodec,
    player: Player,
    room: Option<RoomIdentifier>,
    state: ConnectionState,
    peers: PeerMap,
    history: RollHistory,
    armed: HashSet<Timer>,
    reconnect_attempts: u32,
    /// Set by a user-initiated disconnect; suppresses every automatic
    /// reconnect until the user connects again.
    manual_disconnect: bool,
    last_contact: Option<u64>,
    ping_missed: bool,
}

impl Session<SystemClock> {
    /// Creates a disconnected session with a fresh player id.
    pub fn new(config: SessionConfig, display_name: &str) -> Self {
        Self::with_clock(config, display_name, SystemClock)
    }
}

impl<C: Clock> Session<C> {
    /// Creates a disconnected session reading time from `clock`.
    pub fn with_clock(
        config: SessionConfig,
        display_name: &str,
        clock: C,
    ) -> Self {
        let now = clock.now_millis();
        let player = Player {
            id: generate_player_id(),
            display_name: sanitize_display_name(display_name),
            joined_at: now,
            last_seen: now,
            active: false,
        };
        let history = RollHistory::new(config.history_limit);
        Self {
            config,
            clock,
            codec: JsonCodec,
            player,
            room: None,
            state: ConnectionState::Disconnected,
            peers: PeerMap::new(),
            history,
            armed: HashSet::new(),
            reconnect_attempts: 0,
            manual_disconnect: false,
            last_contact: None,
            ping_missed: false,
        }
    }

    /// Replaces the generated id, e.g. with one restored from the
    /// browser session so a reload is recognised as the same player.
    pub fn with_player_id(mut self, id: PlayerId) -> Self {
        self.player.id = id;
        self
    }

    pub fn player(&self) -> &Player {
        &self.player
    }

    pub fn room(&self) -> Option<&RoomIdentifier> {
        self.room.as_ref()
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn peers(&self) -> &PeerMap {
        &self.peers
    }

    pub fn history(&self) -> &RollHistory {
        &self.history
    }

    pub fn reconnect_attempts(&self) -> u32 {
        self.reconnect_attempts
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Returns `true` if `timer` is armed.
    pub fn is_armed(&self, timer: &Timer) -> bool {
        self.armed.contains(timer)
    }

    pub fn health(&self) -> Health {
        if self.state != ConnectionState::Connected {
            return Health::Disconnected;
        }
        let stale_ms =
            u64::try_from(self.config.stale_after.as_millis()).unwrap_or(u64::MAX);
        let now = self.clock.now_millis();
        match self.last_contact {
            Some(at) if !self.ping_missed && now.saturating_sub(at) <= stale_ms => {
                Health::Healthy
            }
            _ => Health::Stale,
        }
    }

    /// Applies one event and returns what the driver must do, in order.
    pub fn handle(&mut self, event: Event) -> Vec<Command> {
        let mut out = Vec::new();
        match event {
            Event::Connect(room) => self.on_connect(room, &mut out),
            Event::Opened => self.on_opened(&mut out),
            Event::Frame(text) => self.on_frame(&text, &mut out),
            Event::Closed => self.on_closed(&mut out),
            Event::TimerFired(timer) => self.on_timer(timer, &mut out),
            Event::Disconnect => {
                tracing::info!(player_id = %self.player.id, "disconnecting");
                self.leave(&mut out);
            }
            Event::Teardown => {
                tracing::debug!(player_id = %self.player.id, "teardown");
                self.leave(&mut out);
            }
            Event::ManualReconnect => self.on_manual_reconnect(&mut out),
            Event::Focused => self.on_focused(&mut out),
            Event::Roll(draft) => self.on_roll(draft, &mut out),
        }
        out
    }

    // -----------------------------------------------------------------------
    // Connection lifecycle
    // -----------------------------------------------------------------------

    fn on_connect(&mut self, room: RoomIdentifier, out: &mut Vec<Command>) {
        let same_room = self.room.as_ref().is_some_and(|r| r.same_room(&room));
        if same_room && self.state.is_active() && !self.manual_disconnect {
            tracing::debug!(%room, "already connecting or connected");
            return;
        }

        if self.state != ConnectionState::Disconnected {
            self.leave(out);
        }
        if !same_room {
            self.peers.clear();
            self.history.clear();
        }

        self.room = Some(room);
        self.manual_disconnect = false;
        self.reconnect_attempts = 0;
        self.open(out);
    }

    fn open(&mut self, out: &mut Vec<Command>) {
        let Some(room) = &self.room else {
            return;
        };
        let url = self.config.room_url(room);
        tracing::info!(
            %room,
            %url,
            attempt = self.reconnect_attempts,
            "connecting"
        );
        self.set_state(ConnectionState::Connecting, out);
        out.push(Command::Open { url });
    }

    fn on_opened(&mut self, out: &mut Vec<Command>) {
        if self.state != ConnectionState::Connecting {
            tracing::debug!(state = %self.state, "open no longer wanted");
            out.push(Command::Close);
            return;
        }

        let now = self.clock.now_millis();
        self.reconnect_attempts = 0;
        self.last_contact = Some(now);
        self.ping_missed = false;
        self.player.active = true;
        self.player.last_seen = now;
        self.set_state(ConnectionState::Connected, out);
        tracing::info!(
            player_id = %self.player.id,
            peers = self.peers.len(),
            "connected"
        );

        let join = RoomMessage::JoinAnnouncement {
            player: self.player.clone(),
        };
        self.send(&join, out);
        self.schedule(Timer::Heartbeat, self.config.heartbeat_interval, out);
    }

    fn on_closed(&mut self, out: &mut Vec<Command>) {
        self.cancel_all(out);
        self.player.active = false;

        if self.manual_disconnect || !self.state.is_active() {
            return;
        }

        if self.reconnect_attempts < self.config.max_reconnect_attempts {
            let delay = self.config.reconnect_delay(self.reconnect_attempts);
            self.reconnect_attempts += 1;
            tracing::info!(
                attempt = self.reconnect_attempts,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                "connection lost, reconnect scheduled"
            );
            self.set_state(ConnectionState::Connecting, out);
            self.schedule(Timer::Reconnect, delay, out);
        } else {
            tracing::warn!(
                attempts = self.reconnect_attempts,
                "reconnect attempts exhausted"
            );
            self.set_state(ConnectionState::Error, out);
            out.push(Command::Notify(Notification::Error(format!(
                "connection lost after {} reconnect attempts",
                self.reconnect_attempts
            ))));
        }
    }

    /// Leaves the room on the user's behalf: announce, stop every timer,
    /// close, forget peers, and stay down.
    fn leave(&mut self, out: &mut Vec<Command>) {
        self.manual_disconnect = true;
        if self.state == ConnectionState::Connected {
            let leave = RoomMessage::LeaveAnnouncement {
                player_id: self.player.id.clone(),
            };
            self.send(&leave, out);
        }
        self.cancel_all(out);
        if self.state != ConnectionState::Disconnected {
            out.push(Command::Close);
        }
        self.peers.clear();
        self.player.active = false;
        self.reconnect_attempts = 0;
        self.set_state(ConnectionState::Disconnected, out);
    }

    fn on_manual_reconnect(&mut self, out: &mut Vec<Command>) {
        if self.room.is_none() {
            out.push(Command::Notify(Notification::Error(
                "no room to reconnect to".to_string(),
            )));
            return;
        }
        if self.state == ConnectionState::Connected {
            return;
        }
        self.manual_disconnect = false;
        self.retry_now(out);
    }

    fn on_focused(&mut self, out: &mut Vec<Command>) {
        if self.manual_disconnect || self.room.is_none() {
            return;
        }
        let waiting = self.state == ConnectionState::Connecting
            && self.armed.contains(&Timer::Reconnect);
        if self.state == ConnectionState::Error || waiting {
            tracing::debug!(state = %self.state, "focused, retrying now");
            self.retry_now(out);
        }
    }

    fn retry_now(&mut self, out: &mut Vec<Command>) {
        self.reconnect_attempts = 0;
        self.cancel(Timer::Reconnect, out);
        self.open(out);
    }

    // -----------------------------------------------------------------------
    // Timers
    // -----------------------------------------------------------------------

    fn on_timer(&mut self, timer: Timer, out: &mut Vec<Command>) {
        if !self.armed.remove(&timer) {
            tracing::debug!(?timer, "ignoring cancelled timer");
            return;
        }

        match timer {
            Timer::Heartbeat => {
                if self.state == ConnectionState::Connected {
                    self.send(&RoomMessage::Ping, out);
                    self.schedule(Timer::PingTimeout, self.config.ping_timeout, out);
                    self.schedule(
                        Timer::Heartbeat,
                        self.config.heartbeat_interval,
                        out,
                    );
                }
            }
            Timer::PingTimeout => {
                if self.state == ConnectionState::Connected {
                    tracing::warn!(player_id = %self.player.id, "PONG overdue");
                    self.ping_missed = true;
                }
            }
            Timer::Reconnect => {
                if self.state == ConnectionState::Connecting && !self.manual_disconnect {
                    self.open(out);
                }
            }
            Timer::Election(joined) => self.run_election(&joined, out),
        }
    }

    fn run_election(&mut self, joined: &PlayerId, out: &mut Vec<Command>) {
        if self.state != ConnectionState::Connected {
            return;
        }
        if !election::is_history_keeper(&self.player.id, self.peers.ids(), joined) {
            tracing::debug!(%joined, "not the history keeper");
            return;
        }
        let rolls = self.history.shareable();
        if rolls.is_empty() {
            return;
        }
        tracing::info!(%joined, rolls = rolls.len(), "sharing history");
        self.send(&RoomMessage::HistoryShare { rolls }, out);
    }

    // -----------------------------------------------------------------------
    // Inbound frames
    // -----------------------------------------------------------------------

    fn on_frame(&mut self, text: &str, out: &mut Vec<Command>) {
        let mut msg: RoomMessage = match self.codec.decode(text) {
            Ok(msg) => msg,
            Err(e) => {
                tracing::warn!(error = %e, "dropping unreadable frame");
                return;
            }
        };
        tracing::debug!(kind = msg.kind(), "frame received");
        sanitize_names(&mut msg);

        match msg {
            RoomMessage::JoinAnnouncement { player } => {
                if player.id == self.player.id {
                    return;
                }
                let id = player.id.clone();
                if !self.peers.upsert(player.clone()) {
                    tracing::debug!(player_id = %id, "duplicate announcement");
                    return;
                }
                tracing::info!(player_id = %id, name = %player.display_name, "player joined");
                out.push(Command::Notify(Notification::PlayerJoined(player)));
                let reply = RoomMessage::PlayerResponse {
                    player: self.player.clone(),
                };
                self.send(&reply, out);
                self.schedule(Timer::Election(id), self.config.election_settle, out);
            }
            RoomMessage::PlayerResponse { player } => {
                if player.id == self.player.id {
                    return;
                }
                if self.peers.upsert(player.clone()) {
                    tracing::info!(player_id = %player.id, "player already present");
                    out.push(Command::Notify(Notification::PlayerJoined(player)));
                }
            }
            RoomMessage::LeaveAnnouncement { player_id } => {
                if self.peers.remove(&player_id).is_some() {
                    tracing::info!(%player_id, "player left");
                    self.cancel(Timer::Election(player_id.clone()), out);
                    out.push(Command::Notify(Notification::PlayerLeft(player_id)));
                }
            }
            RoomMessage::Roll { roll } => {
                if roll.player_id == self.player.id {
                    tracing::debug!("ignoring echo of own roll");
                    return;
                }
                self.history.push(roll.clone());
                out.push(Command::Notify(Notification::RollReceived(roll)));
            }
            RoomMessage::HistoryShare { rolls } => {
                let added = self.history.merge(rolls);
                if !added.is_empty() {
                    tracing::info!(rolls = added.len(), "history merged");
                    out.push(Command::Notify(Notification::HistoryReceived(added)));
                }
            }
            RoomMessage::Ping => self.send(&RoomMessage::Pong, out),
            RoomMessage::Pong => {
                self.last_contact = Some(self.clock.now_millis());
                self.ping_missed = false;
                self.cancel(Timer::PingTimeout, out);
            }
        }
    }

    // -----------------------------------------------------------------------
    // Local rolls
    // -----------------------------------------------------------------------

    fn on_roll(&mut self, draft: RollDraft, out: &mut Vec<Command>) {
        let record = draft.stamp(&self.player, self.clock.now_millis());
        self.history.push(record.clone());

        if record.is_shareable() {
            if self.state == ConnectionState::Connected {
                let msg = RoomMessage::Roll {
                    roll: record.clone(),
                };
                self.send(&msg, out);
            } else {
                tracing::debug!(state = %self.state, "not connected, roll kept locally");
            }
        }
        out.push(Command::Notify(Notification::RollRecorded(record)));
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn send(&self, msg: &RoomMessage, out: &mut Vec<Command>) {
        match self.codec.encode(msg) {
            Ok(frame) => out.push(Command::Send(frame)),
            Err(e) => tracing::error!(kind = msg.kind(), error = %e, "encode failed"),
        }
    }

    fn set_state(&mut self, next: ConnectionState, out: &mut Vec<Command>) {
        if self.state == next {
            return;
        }
        if !self.state.can_transition_to(next) {
            tracing::warn!(from = %self.state, to = %next, "unexpected state transition");
        }
        self.state = next;
        out.push(Command::Notify(Notification::StateChanged(next)));
    }

    fn schedule(&mut self, timer: Timer, after: Duration, out: &mut Vec<Command>) {
        self.armed.insert(timer.clone());
        out.push(Command::Schedule { timer, after });
    }

    fn cancel(&mut self, timer: Timer, out: &mut Vec<Command>) {
        if self.armed.remove(&timer) {
            out.push(Command::Cancel(timer));
        }
    }

    fn cancel_all(&mut self, out: &mut Vec<Command>) {
        out.extend(self.armed.drain().map(Command::Cancel));
    }
}

// =========================================================================
// Tests
// =========================================================================

/// Peers pick their own names; hold theirs to the same rules as ours.
fn sanitize_names(msg: &mut RoomMessage) {
    match msg {
        RoomMessage::JoinAnnouncement { player }
        | RoomMessage::PlayerResponse { player } => {
            player.display_name = sanitize_display_name(&player.display_name);
        }
        RoomMessage::Roll { roll } => {
            roll.player_name = sanitize_display_name(&roll.player_name);
        }
        RoomMessage::HistoryShare { rolls } => {
            for roll in rolls {
                roll.player_name = sanitize_display_name(&roll.player_name);
            }
        }
        RoomMessage::LeaveAnnouncement { .. }
        | RoomMessage::Ping
        | RoomMessage::Pong => {}
    }
}
