//! Duplicate suppression for server messages.
//!
//! Only the most recently accepted fingerprint is remembered, so an
//! immediately redelivered reply is dropped while the same content arriving
//! after some other reply is accepted again.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tracing::debug;

use crate::frame::ServerMessage;

/// Compute the fingerprint of a reply: `base64(content + timestamp)`.
pub fn fingerprint(content: &str, timestamp: Option<&str>) -> String {
    let mut input = String::with_capacity(content.len() + timestamp.map_or(0, str::len));
    input.push_str(content);
    input.push_str(timestamp.unwrap_or_default());
    STANDARD.encode(input.as_bytes())
}

/// Session-scoped single-fingerprint filter.
#[derive(Debug, Default)]
pub struct DedupFilter {
    last_accepted: Option<String>,
}

impl DedupFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decide whether a reply should be delivered.
    ///
    /// Returns `false` when it matches the previously accepted reply;
    /// otherwise records it as the new last-accepted reply.
    pub fn accept(&mut self, message: &ServerMessage) -> bool {
        let print = fingerprint(&message.message, message.timestamp.as_deref());
        if self.last_accepted.as_deref() == Some(print.as_str()) {
            debug!("duplicate server message suppressed");
            return false;
        }
        self.last_accepted = Some(print);
        true
    }

    /// Forget the last accepted fingerprint.
    pub fn reset(&mut self) {
        self.last_accepted = None;
    }

    /// The fingerprint of the last accepted reply, if any.
    pub fn last_accepted(&self) -> Option<&str> {
        self.last_accepted.as_deref()
    }
}
