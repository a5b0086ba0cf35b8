//! Application-wide constants.

/// Application name.
pub const APP_NAME: &str = "ChatWidget";

/// Application version.
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default realtime endpoint.
pub const DEFAULT_API_URL: &str = "ws://localhost:8000/v1/ws/chat";

/// Room key used when none is configured.
pub const DEFAULT_ROOM_KEY: &str = "default";

/// Query parameter carrying the room key on every connect attempt.
pub const ROOM_KEY_PARAM: &str = "room_key";

/// Default keep-alive interval in milliseconds.
pub const DEFAULT_HEARTBEAT_MS: u64 = 30_000;

/// Base delay of the linear reconnect backoff in milliseconds.
pub const DEFAULT_RECONNECT_BASE_DELAY_MS: u64 = 3_000;

/// Reconnect attempts before the session gives up.
pub const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 5;

/// Minimum spacing between two accepted outbound sends in milliseconds.
pub const DEFAULT_SEND_INTERVAL_MS: u64 = 1_000;

/// Per-character delay of the streaming reveal in milliseconds.
pub const DEFAULT_STREAM_CHAR_DELAY_MS: u64 = 20;

/// Capacity of the session event broadcast channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// User-facing strings shown by the widget.
pub mod text {
    /// Shown when the backend reports a failed exchange.
    pub const FALLBACK_ERROR: &str = "Sorry, something went wrong. Please try again.";

    /// Acknowledgement for a reply rated as helpful.
    pub const FEEDBACK_THANKS: &str = "Thanks! Glad that helped.";

    /// Acknowledgement for a reply rated as unhelpful.
    pub const FEEDBACK_SORRY: &str = "Sorry about that. Could you tell me more?";

    /// Display title for a source without one, before its 1-based index.
    pub const SOURCE_TITLE_PREFIX: &str = "Source";
}
