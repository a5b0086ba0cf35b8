//! Chat widget session - the realtime session client and its presentation.
//!
//! This crate ties the socket plumbing together:
//! - `Session`: the per-widget conversation state
//! - `SessionController`: the actor that owns the transport, timers and
//!   filters, and enforces the connection state machine
//! - `EventDispatcher`: broadcast of session events to the presentation
//! - `Presentation`: message list, typing indicator and streaming renderer
//! - `Widget`: open/close/submit facade used by embedding hosts

pub mod controller;
pub mod events;
pub mod presentation;
pub mod session;
pub mod widget;

// Re-export key types
pub use controller::{SessionController, SessionHandle};
pub use events::{ConnectionState, EventDispatcher, SessionEvent};
pub use presentation::{
    MessageList, Presentation, PresentationHandle, RenderedMessage, Sender, StreamingRenderer,
    ViewUpdate,
};
pub use session::{Session, SessionStatus};
pub use widget::Widget;
