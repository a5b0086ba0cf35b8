//! Per-widget conversation state.

use std::time::Duration;

use tokio::time::Instant;
use tracing::info;
use uuid::Uuid;

use crate::events::ConnectionState;

/// Observable snapshot of a session, published on every change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionStatus {
    pub state: ConnectionState,
    pub reconnect_attempt: u32,
}

/// The logical conversation of one open widget.
///
/// Owned exclusively by its controller; spans any number of underlying
/// connections.
#[derive(Debug)]
pub struct Session {
    /// Identifier used in logs.
    pub id: Uuid,
    /// Tenant/room identifier sent on every connect attempt.
    pub room_key: String,
    state: ConnectionState,
    reconnect_attempt: u32,
    last_outbound_send: Option<Instant>,
    typing: bool,
    welcomed: bool,
}

impl Session {
    pub fn new(room_key: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            room_key: room_key.into(),
            state: ConnectionState::Idle,
            reconnect_attempt: 0,
            last_outbound_send: None,
            typing: false,
            welcomed: false,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn reconnect_attempt(&self) -> u32 {
        self.reconnect_attempt
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            state: self.state,
            reconnect_attempt: self.reconnect_attempt,
        }
    }

    /// Move to `next`. Returns whether the state actually changed.
    pub fn transition(&mut self, next: ConnectionState) -> bool {
        if self.state == next {
            return false;
        }
        info!("session {} state: {} -> {}", self.id, self.state, next);
        self.state = next;
        true
    }

    /// Record a successful open: the attempt counter starts over.
    pub fn mark_opened(&mut self) {
        self.reconnect_attempt = 0;
    }

    /// Record a scheduled reconnect attempt.
    pub fn set_reconnect_attempt(&mut self, attempt: u32) {
        self.reconnect_attempt = attempt;
    }

    /// Reserve the outbound send slot at `now`.
    ///
    /// Fails when the previous accepted send is less than `min_interval` ago.
    pub fn try_reserve_send(&mut self, now: Instant, min_interval: Duration) -> bool {
        if let Some(last) = self.last_outbound_send {
            if now.saturating_duration_since(last) < min_interval {
                return false;
            }
        }
        self.last_outbound_send = Some(now);
        true
    }

    /// Update the typing flag. Returns whether it changed.
    pub fn set_typing(&mut self, typing: bool) -> bool {
        if self.typing == typing {
            return false;
        }
        self.typing = typing;
        true
    }

    pub fn is_typing(&self) -> bool {
        self.typing
    }

    /// Whether the welcome message is still due. Only true once.
    pub fn take_welcome(&mut self) -> bool {
        !std::mem::replace(&mut self.welcomed, true)
    }
}
