//! Session controller.
//!
//! One tokio task per open widget owns the session and everything attached
//! to it: the transport, the keep-alive interval, the reconnect timer and the
//! dedup filter. Host commands and transport events are processed one at a
//! time by that task, which makes it the single writer of session state.
//!
//! State machine:
//! - `Idle -> Connecting` when the task starts
//! - `Connecting -> Open` on `Opened` (attempts reset, keep-alive armed)
//! - `Connecting | Open -> Reconnecting` on `Closed` while attempts remain,
//!   otherwise `-> Closed`
//! - `Reconnecting -> Connecting` when the linear delay elapses
//! - any state `-> Closing -> Closed` when the user closes the widget

use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use cw_core::config::AppConfig;
use cw_core::constants::text::FALLBACK_ERROR;
use cw_core::error::CwResult;
use cw_socket::{
    DedupFilter, Endpoint, Frame, KeepAlive, ReconnectDecision, ReconnectPolicy, ReconnectTimer,
    Transport, TransportEvent,
};

use crate::events::{ConnectionState, EventDispatcher, SessionEvent};
use crate::presentation::Sender;
use crate::session::{Session, SessionStatus};

/// Commands from the host to a running session.
#[derive(Debug)]
enum SessionCommand {
    /// The user submitted text.
    Submit(String),
    /// The user closed the widget.
    Close,
}

/// One unit of work for the controller loop.
enum Step {
    Command(Option<SessionCommand>),
    Transport(TransportEvent),
    Reconnect,
    KeepAlive,
}

/// Host-side handle to a running session.
///
/// Dropping the handle closes the session.
pub struct SessionHandle {
    id: Uuid,
    commands: mpsc::UnboundedSender<SessionCommand>,
    status: watch::Receiver<SessionStatus>,
    task: Option<JoinHandle<()>>,
}

impl SessionHandle {
    /// Session identifier.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Submit user text. Echoed locally; sent when open and not rate limited.
    pub fn submit(&self, text: impl Into<String>) {
        if self.commands.send(SessionCommand::Submit(text.into())).is_err() {
            debug!("session {} already ended, dropping submission", self.id);
        }
    }

    /// Current status snapshot.
    pub fn status(&self) -> SessionStatus {
        *self.status.borrow()
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        self.status.borrow().state
    }

    /// Subscribe to status changes.
    pub fn status_receiver(&self) -> watch::Receiver<SessionStatus> {
        self.status.clone()
    }

    /// Close the session and wait until its timers and transport are gone.
    ///
    /// Idempotent.
    pub async fn close(&mut self) {
        let _ = self.commands.send(SessionCommand::Close);
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!("session {} task ended abnormally: {e}", self.id);
            }
        }
    }

    /// Whether `close` has completed.
    pub fn is_closed(&self) -> bool {
        self.task.is_none()
    }
}

/// Orchestrates transport, reconnection, keep-alive, codec and dedup for
/// one session.
pub struct SessionController<T: Transport> {
    session: Session,
    endpoint: Endpoint,
    transport: T,
    transport_tx: mpsc::UnboundedSender<TransportEvent>,
    transport_rx: mpsc::UnboundedReceiver<TransportEvent>,
    commands: mpsc::UnboundedReceiver<SessionCommand>,
    keep_alive: KeepAlive,
    reconnect: ReconnectTimer,
    policy: ReconnectPolicy,
    dedup: DedupFilter,
    send_interval: Duration,
    welcome_message: Option<String>,
    events: EventDispatcher,
    status_tx: watch::Sender<SessionStatus>,
}

impl<T: Transport> SessionController<T> {
    /// Start a session on `transport` and return its handle.
    ///
    /// Fails only on configuration problems (empty room key, unsupported
    /// endpoint scheme). Must be called within a tokio runtime.
    pub fn spawn(config: &AppConfig, transport: T, events: EventDispatcher) -> CwResult<SessionHandle> {
        let session = Session::new(config.widget.effective_room_key());
        let endpoint = Endpoint::new(&config.widget.api_url, &session.room_key)?;

        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (transport_tx, transport_rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = watch::channel(session.status());
        let id = session.id;

        let controller = Self {
            session,
            endpoint,
            transport,
            transport_tx,
            transport_rx,
            commands: commands_rx,
            keep_alive: KeepAlive::new(config.widget.heartbeat_interval()),
            reconnect: ReconnectTimer::new(),
            policy: ReconnectPolicy::from(&config.reconnect),
            dedup: DedupFilter::new(),
            send_interval: Duration::from_millis(config.session.send_interval_ms),
            welcome_message: config
                .widget
                .welcome_message
                .clone()
                .filter(|m| !m.trim().is_empty()),
            events,
            status_tx,
        };

        info!("session {id} created for room {}", controller.session.room_key);
        let task = tokio::spawn(controller.run());

        Ok(SessionHandle {
            id,
            commands: commands_tx,
            status: status_rx,
            task: Some(task),
        })
    }

    async fn run(mut self) {
        self.connect();

        loop {
            let step = tokio::select! {
                biased;
                command = self.commands.recv() => Step::Command(command),
                Some(event) = self.transport_rx.recv() => Step::Transport(event),
                _ = self.reconnect.fired() => Step::Reconnect,
                _ = self.keep_alive.tick() => Step::KeepAlive,
            };

            match step {
                Step::Command(Some(SessionCommand::Submit(text))) => self.submit(&text),
                Step::Command(Some(SessionCommand::Close)) | Step::Command(None) => {
                    self.shutdown();
                    break;
                }
                Step::Transport(event) => self.on_transport_event(event),
                Step::Reconnect => self.connect(),
                Step::KeepAlive => self.send_keep_alive(),
            }
        }

        info!("session {} ended", self.session.id);
    }

    /// Start a connection attempt.
    fn connect(&mut self) {
        self.transition(ConnectionState::Connecting);
        if let Err(e) = self.transport.open(&self.endpoint, self.transport_tx.clone()) {
            warn!("session {} could not start connection: {e}", self.session.id);
            self.on_unexpected_close();
        }
    }

    fn on_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Opened => self.on_opened(),
            TransportEvent::Closed => {
                self.keep_alive.stop();
                match self.session.state() {
                    ConnectionState::Connecting | ConnectionState::Open => self.on_unexpected_close(),
                    state => debug!("transport closed while {state}, ignoring"),
                }
            }
            TransportEvent::Error(e) => {
                warn!("session {} transport error: {e}", self.session.id);
                self.set_typing(false);
            }
            TransportEvent::Message(raw) => {
                if let Some(frame) = Frame::decode(&raw) {
                    self.on_frame(frame);
                }
            }
        }
    }

    fn on_opened(&mut self) {
        match self.session.state() {
            ConnectionState::Connecting => {
                self.session.mark_opened();
                self.keep_alive.start();
                self.transition(ConnectionState::Open);

                if self.session.take_welcome() {
                    if let Some(text) = self.welcome_message.clone() {
                        self.events.dispatch(SessionEvent::Notice {
                            sender: Sender::Bot,
                            text,
                        });
                    }
                }
            }
            ConnectionState::Closing | ConnectionState::Closed => {
                debug!("transport opened after close, closing it");
                self.transport.close();
            }
            state => warn!("unexpected transport open while {state}"),
        }
    }

    /// The connection dropped while the widget still wants one.
    fn on_unexpected_close(&mut self) {
        self.set_typing(false);
        match self.policy.decide(self.session.reconnect_attempt()) {
            ReconnectDecision::Retry { attempt, delay } => {
                self.session.set_reconnect_attempt(attempt);
                self.reconnect.schedule(delay);
                info!(
                    "session {} reconnect attempt {attempt}/{} in {:.1}s",
                    self.session.id,
                    self.policy.max_attempts,
                    delay.as_secs_f64()
                );
                self.transition(ConnectionState::Reconnecting);
            }
            ReconnectDecision::GiveUp => {
                warn!(
                    "session {} giving up after {} reconnect attempt(s)",
                    self.session.id,
                    self.session.reconnect_attempt()
                );
                self.transition(ConnectionState::Closed);
            }
        }
    }

    fn on_frame(&mut self, frame: Frame) {
        match frame {
            Frame::ServerMessage(message) => {
                if !self.dedup.accept(&message) {
                    return;
                }
                self.set_typing(false);
                self.events.dispatch(SessionEvent::BotReply {
                    text: message.message,
                    sources: message.sources,
                });
            }
            Frame::ServerTyping { is_typing } => self.set_typing(is_typing),
            Frame::ServerError { message, code } => {
                warn!(
                    "backend reported an error (code={}): {}",
                    code.as_deref().unwrap_or("none"),
                    message.as_deref().unwrap_or("")
                );
                self.set_typing(false);
                self.events.dispatch(SessionEvent::Notice {
                    sender: Sender::Bot,
                    text: FALLBACK_ERROR.to_string(),
                });
            }
            Frame::ServerWarning { message } => {
                warn!("backend warning: {message}");
                if !message.is_empty() {
                    self.events.dispatch(SessionEvent::Notice {
                        sender: Sender::System,
                        text: message,
                    });
                }
            }
            Frame::Pong { .. } => debug!("pong received"),
            other => debug!("ignoring {} frame from server", other.kind().as_str()),
        }
    }

    fn submit(&mut self, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }

        // The echo is unconditional; only the network send is gated.
        self.events.dispatch(SessionEvent::UserEcho {
            text: text.to_string(),
        });

        if self.session.state() != ConnectionState::Open {
            debug!("session {} not open, dropping send", self.session.id);
            return;
        }
        if !self.session.try_reserve_send(Instant::now(), self.send_interval) {
            debug!("session {} send rate limited, dropping", self.session.id);
            return;
        }

        match Frame::client_message(text).encode() {
            Ok(raw) => {
                self.transport.send(raw);
                self.set_typing(true);
            }
            Err(e) => warn!("failed to encode client message: {e}"),
        }
    }

    fn send_keep_alive(&mut self) {
        if self.session.state() != ConnectionState::Open {
            self.keep_alive.stop();
            return;
        }
        match Frame::ping_now().encode() {
            Ok(raw) => {
                debug!("keep-alive ping");
                self.transport.send(raw);
            }
            Err(e) => warn!("failed to encode ping: {e}"),
        }
    }

    /// User closed the widget: cancel every timer and close the transport.
    fn shutdown(&mut self) {
        self.transition(ConnectionState::Closing);
        self.reconnect.cancel();
        self.keep_alive.stop();
        self.transport.close();
        self.set_typing(false);
        self.transition(ConnectionState::Closed);
    }

    fn set_typing(&mut self, typing: bool) {
        if self.session.set_typing(typing) {
            self.events.dispatch(SessionEvent::Typing(typing));
        }
    }

    fn transition(&mut self, next: ConnectionState) {
        if self.session.transition(next) {
            self.events.dispatch(SessionEvent::StateChanged(next));
        }
        self.status_tx.send_replace(self.session.status());
    }
}
