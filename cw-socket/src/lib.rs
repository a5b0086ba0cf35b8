//! Chat widget socket - realtime transport and protocol plumbing.
//!
//! This crate provides the pieces a session is built from:
//! - The `Transport` seam and its WebSocket implementation
//! - Endpoint normalization (scheme + `room_key` query parameter)
//! - The JSON frame codec, which drops unknown or malformed frames
//! - Single-fingerprint duplicate suppression for server messages
//! - The linear, bounded reconnection policy and its timer
//! - The keep-alive interval

pub mod dedup;
pub mod endpoint;
pub mod frame;
pub mod keepalive;
pub mod reconnect;
pub mod transport;
pub mod ws;

// Re-export key types
pub use dedup::DedupFilter;
pub use endpoint::Endpoint;
pub use frame::{Frame, FrameKind, ServerMessage, Source};
pub use keepalive::KeepAlive;
pub use reconnect::{ReconnectDecision, ReconnectPolicy, ReconnectTimer};
pub use transport::{Transport, TransportEvent, TransportEvents};
pub use ws::WsTransport;
