//! The transport seam.
//!
//! A transport owns one realtime connection at a time and reports its
//! lifecycle as [`TransportEvent`]s on a channel handed over at `open`. The
//! session controller holds the only receiver, so it is the sole subscriber.

use tokio::sync::mpsc;

use cw_core::error::CwResult;

use crate::endpoint::Endpoint;

/// Lifecycle and data events reported by a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The handshake completed. Sent once per successful connection.
    Opened,
    /// The connection terminated, normally or not. Sent once per connection.
    Closed,
    /// Something went wrong. Does not by itself imply `Closed`.
    Error(String),
    /// One inbound text frame.
    Message(String),
}

/// Sending half of a transport's event channel.
pub type TransportEvents = mpsc::UnboundedSender<TransportEvent>;

/// A realtime connection.
pub trait Transport: Send + 'static {
    /// Start connecting to `endpoint`; progress is reported on `events`.
    ///
    /// Returns immediately. Fails if a connection is still active.
    fn open(&mut self, endpoint: &Endpoint, events: TransportEvents) -> CwResult<()>;

    /// Send one text frame. Silently dropped unless the connection is open.
    fn send(&mut self, frame: String);

    /// Close the connection. Idempotent.
    fn close(&mut self);

    /// Whether the connection is currently open.
    fn is_open(&self) -> bool;
}
