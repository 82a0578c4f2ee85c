//! Tokio driver for [`Session`].
//!
//! [`SessionClient::start`] spawns one task that owns the state machine,
//! the timer deadlines and the current socket. Everything else talks to
//! it through channels:
//!
//! ```text
//!   SessionClient ──Request──→ driver ──Outbound──→ link task ──→ relay
//!        ↑                       │  ↑                   │
//!   Notification ←───────────────┘  └──(generation, LinkEvent)
//! ```
//!
//! Each socket gets a generation number. Events from a socket the
//! driver has already replaced or closed are dropped, so a late close
//! from an abandoned socket never triggers a reconnect.

use std::collections::HashMap;

use diceroom_names::RoomIdentifier;
use diceroom_protocol::{Player, RollRecord};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use crate::machine::{Command, Event, Health, Notification, Session, Timer};
use crate::{ConnectionState, RollDraft, SessionConfig, SessionError};

type Query = Box<dyn FnOnce(&Session) + Send>;

enum Request {
    Event(Event),
    Query(Query),
}

/// Handle to a running session driver.
///
/// Cheap to clone. When every clone is dropped the driver announces a
/// leave (if connected) and exits.
#[derive(Clone)]
pub struct SessionClient {
    inbox: mpsc::UnboundedSender<Request>,
    player: Player,
}

impl SessionClient {
    /// Spawns a driver for a new, disconnected session.
    ///
    /// Returns the handle and the stream of UI notifications.
    pub fn start(
        config: SessionConfig,
        display_name: &str,
    ) -> (Self, mpsc::UnboundedReceiver<Notification>) {
        Self::spawn(Session::new(config, display_name))
    }

    /// Spawns a driver around an existing session (for example one
    /// built with [`Session::with_player_id`]).
    pub fn spawn(
        session: Session,
    ) -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();
        let (notify_tx, notify_rx) = mpsc::unbounded_channel();
        let (link_tx, link_rx) = mpsc::unbounded_channel();
        let player = session.player().clone();

        let driver = Driver {
            session,
            inbox: inbox_rx,
            notify: notify_tx,
            link_tx,
            link_rx,
            link: None,
            generation: 0,
            deadlines: HashMap::new(),
        };
        tokio::spawn(driver.run());

        (
            Self {
                inbox: inbox_tx,
                player,
            },
            notify_rx,
        )
    }

    /// The local player as created at start. The id never changes.
    pub fn player(&self) -> &Player {
        &self.player
    }

    /// Joins `room` (compact code, friendly name or legacy code).
    ///
    /// The identifier is validated here; connection progress is reported
    /// through notifications.
    pub fn connect(&self, room: &str) -> Result<(), SessionError> {
        let room = RoomIdentifier::parse(room)?;
        self.send(Event::Connect(room))
    }

    /// Records a local roll and broadcasts it unless it is private.
    pub fn roll(&self, draft: RollDraft) -> Result<(), SessionError> {
        self.send(Event::Roll(draft))
    }

    /// Leaves the room and stops reconnecting.
    pub fn disconnect(&self) -> Result<(), SessionError> {
        self.send(Event::Disconnect)
    }

    /// Retries immediately with a fresh attempt budget.
    pub fn reconnect(&self) -> Result<(), SessionError> {
        self.send(Event::ManualReconnect)
    }

    /// Reports that the window regained focus or became visible.
    pub fn focus(&self) -> Result<(), SessionError> {
        self.send(Event::Focused)
    }

    /// Leaves (best-effort) and stops the driver.
    pub fn teardown(&self) -> Result<(), SessionError> {
        self.send(Event::Teardown)
    }

    pub async fn state(&self) -> Result<ConnectionState, SessionError> {
        self.query(|s| s.state()).await
    }

    pub async fn health(&self) -> Result<Health, SessionError> {
        self.query(|s| s.health()).await
    }

    /// Local history, most recent first.
    pub async fn history(&self) -> Result<Vec<RollRecord>, SessionError> {
        self.query(|s| s.history().to_vec()).await
    }

    /// Known peers, sorted by id.
    pub async fn peers(&self) -> Result<Vec<Player>, SessionError> {
        self.query(|s| s.peers().players()).await
    }

    fn send(&self, event: Event) -> Result<(), SessionError> {
        self.inbox
            .send(Request::Event(event))
            .map_err(|_| SessionError::Stopped)
    }

    async fn query<T, F>(&self, f: F) -> Result<T, SessionError>
    where
        T: Send + 'static,
        F: FnOnce(&Session) -> T + Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        let query: Query = Box::new(move |session| {
            let _ = reply_tx.send(f(session));
        });
        self.inbox
            .send(Request::Query(query))
            .map_err(|_| SessionError::Stopped)?;
        reply_rx.await.map_err(|_| SessionError::Stopped)
    }
}

// ---------------------------------------------------------------------------
// Driver
// ---------------------------------------------------------------------------

enum LinkEvent {
    Opened,
    Frame(String),
    Closed,
}

enum Outbound {
    Frame(String),
    Close,
}

struct Link {
    generation: u64,
    outbound: mpsc::UnboundedSender<Outbound>,
}

struct Driver {
    session: Session,
    inbox: mpsc::UnboundedReceiver<Request>,
    notify: mpsc::UnboundedSender<Notification>,
    link_tx: mpsc::UnboundedSender<(u64, LinkEvent)>,
    link_rx: mpsc::UnboundedReceiver<(u64, LinkEvent)>,
    link: Option<Link>,
    generation: u64,
    deadlines: HashMap<Timer, Instant>,
}

impl Driver {
    async fn run(mut self) {
        tracing::debug!(player_id = %self.session.player().id, "session driver started");

        loop {
            let next = self.deadlines.values().min().copied();

            tokio::select! {
                request = self.inbox.recv() => match request {
                    Some(Request::Event(Event::Teardown)) | None => {
                        self.dispatch(Event::Teardown);
                        break;
                    }
                    Some(Request::Event(event)) => self.dispatch(event),
                    Some(Request::Query(query)) => query(&self.session),
                },
                Some((generation, event)) = self.link_rx.recv() => {
                    let current = self.link.as_ref().map(|l| l.generation);
                    if current != Some(generation) {
                        continue;
                    }
                    let event = match event {
                        LinkEvent::Opened => Event::Opened,
                        LinkEvent::Frame(text) => Event::Frame(text),
                        LinkEvent::Closed => {
                            self.link = None;
                            Event::Closed
                        }
                    };
                    self.dispatch(event);
                },
                _ = tokio::time::sleep_until(next.unwrap_or_else(Instant::now)), if next.is_some() => {
                    self.fire_due_timers();
                },
            }
        }

        tracing::debug!(player_id = %self.session.player().id, "session driver stopped");
    }

    fn fire_due_timers(&mut self) {
        let now = Instant::now();
        let due: Vec<Timer> = self
            .deadlines
            .iter()
            .filter(|(_, at)| **at <= now)
            .map(|(timer, _)| timer.clone())
            .collect();
        for timer in due {
            self.deadlines.remove(&timer);
            self.dispatch(Event::TimerFired(timer));
        }
    }

    fn dispatch(&mut self, event: Event) {
        for command in self.session.handle(event) {
            self.execute(command);
        }
    }

    fn execute(&mut self, command: Command) {
        match command {
            Command::Open { url } => {
                self.close_link();
                self.generation += 1;
                let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
                tokio::spawn(run_link(
                    url,
                    self.generation,
                    outbound_rx,
                    self.link_tx.clone(),
                ));
                self.link = Some(Link {
                    generation: self.generation,
                    outbound: outbound_tx,
                });
            }
            Command::Send(frame) => match &self.link {
                Some(link) => {
                    let _ = link.outbound.send(Outbound::Frame(frame));
                }
                None => tracing::debug!("no socket, frame dropped"),
            },
            Command::Close => self.close_link(),
            Command::Schedule { timer, after } => {
                match Instant::now().checked_add(after) {
                    Some(at) => {
                        self.deadlines.insert(timer, at);
                    }
                    None => tracing::warn!(?timer, "deadline out of range, not scheduled"),
                }
            }
            Command::Cancel(timer) => {
                self.deadlines.remove(&timer);
            }
            Command::Notify(notification) => {
                let _ = self.notify.send(notification);
            }
        }
    }

    fn close_link(&mut self) {
        if let Some(link) = self.link.take() {
            let _ = link.outbound.send(Outbound::Close);
        }
    }
}

/// Owns one socket: reports open, frames and close to the driver, and
/// writes whatever the driver queues until told to close.
async fn run_link(
    url: String,
    generation: u64,
    mut outbound: mpsc::UnboundedReceiver<Outbound>,
    events: mpsc::UnboundedSender<(u64, LinkEvent)>,
) {
    let ws = match connect_async(url.as_str()).await {
        Ok((ws, _)) => ws,
        Err(e) => {
            tracing::warn!(%url, error = %e, "connect failed");
            let _ = events.send((generation, LinkEvent::Closed));
            return;
        }
    };
    let _ = events.send((generation, LinkEvent::Opened));
    let (mut write, mut read) = ws.split();

    loop {
        tokio::select! {
            out = outbound.recv() => match out {
                Some(Outbound::Frame(text)) => {
                    if let Err(e) = write.send(Message::text(text)).await {
                        tracing::warn!(error = %e, "send failed");
                        break;
                    }
                }
                Some(Outbound::Close) | None => {
                    // Closed on purpose; the driver expects no event.
                    let _ = write.close().await;
                    return;
                }
            },
            msg = read.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    let _ = events.send((generation, LinkEvent::Frame(text.as_str().to_owned())));
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::warn!(error = %e, "socket error");
                    break;
                }
            },
        }
    }

    let _ = events.send((generation, LinkEvent::Closed));
}
