//! Session event types and the event dispatcher.
//!
//! The controller publishes what the presentation needs to know (state
//! changes, typing toggles, messages to show) through a broadcast-based
//! dispatcher, so the presentation never touches session state directly.

use cw_socket::Source;
use tokio::sync::broadcast;
use tracing::debug;

use crate::presentation::Sender;

/// Connection state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Created, not yet connecting.
    Idle,
    /// Handshake in progress.
    Connecting,
    /// Connected; keep-alive running.
    Open,
    /// Connection lost, waiting for the reconnect delay.
    Reconnecting,
    /// The user is closing the widget.
    Closing,
    /// Terminal: closed by the user or out of reconnect attempts.
    Closed,
}

impl ConnectionState {
    /// Whether the widget still wants a connection in this state.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Connecting | Self::Open | Self::Reconnecting)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Connecting => write!(f, "connecting"),
            Self::Open => write!(f, "open"),
            Self::Reconnecting => write!(f, "reconnecting"),
            Self::Closing => write!(f, "closing"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

/// Events forwarded from the session controller to the presentation.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// The connection state changed.
    StateChanged(ConnectionState),
    /// Show or hide the typing indicator.
    Typing(bool),
    /// The user's own submission, echoed before any send is attempted.
    UserEcho { text: String },
    /// An accepted backend reply, to be revealed incrementally.
    BotReply { text: String, sources: Vec<Source> },
    /// A message appended as-is (welcome, fallback, warnings).
    Notice { sender: Sender, text: String },
}

impl SessionEvent {
    /// Short name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::StateChanged(_) => "state-changed",
            Self::Typing(_) => "typing",
            Self::UserEcho { .. } => "user-echo",
            Self::BotReply { .. } => "bot-reply",
            Self::Notice { .. } => "notice",
        }
    }
}

/// Broadcast-based event dispatcher.
///
/// Uses tokio::broadcast channels so the presentation and any host-side
/// observers receive events independently.
#[derive(Clone)]
pub struct EventDispatcher {
    sender: broadcast::Sender<SessionEvent>,
}

impl EventDispatcher {
    /// Dispatcher whose subscribers may fall `capacity` events behind.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Subscribe to receive session events.
    ///
    /// Slow consumers that fall behind receive `RecvError::Lagged`.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.sender.subscribe()
    }

    /// Publish `event` to every current subscriber.
    pub fn dispatch(&self, event: SessionEvent) {
        let name = event.name();
        match self.sender.send(event) {
            Ok(count) => {
                debug!("dispatched {name} to {count} subscriber(s)");
            }
            Err(_) => {
                // Nobody listening yet, or already gone
                debug!("no subscribers for event {name}");
            }
        }
    }

    /// Number of live receivers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}
