//! Shared test utilities for integration tests.
//!
//! `FakeTransport` is a scripted in-memory transport: the test drives the
//! remote side through a `FakeRemote` sharing its state.

#![allow(dead_code)]

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use cw_core::config::AppConfig;
use cw_core::error::{CwError, CwResult};
use cw_session::{EventDispatcher, SessionEvent};
use cw_socket::{Endpoint, Transport, TransportEvent, TransportEvents};
use serde_json::Value;
use tokio::sync::broadcast;

#[derive(Default)]
struct FakeState {
    events: Option<TransportEvents>,
    open: bool,
    opens: Vec<String>,
    sent: Vec<String>,
    attempted: Vec<String>,
    close_calls: usize,
    closed_emitted: usize,
}

impl FakeState {
    /// End the current connection, emitting exactly one `Closed`.
    fn terminate(&mut self) {
        self.open = false;
        if let Some(events) = self.events.take() {
            self.closed_emitted += 1;
            let _ = events.send(TransportEvent::Closed);
        }
    }
}

/// In-memory transport handed to the code under test.
pub struct FakeTransport {
    state: Arc<Mutex<FakeState>>,
}

/// Test-side control of a `FakeTransport`.
#[derive(Clone)]
pub struct FakeRemote {
    state: Arc<Mutex<FakeState>>,
}

/// Create a connected transport/remote pair.
pub fn fake_transport() -> (FakeTransport, FakeRemote) {
    let state = Arc::new(Mutex::new(FakeState::default()));
    (
        FakeTransport {
            state: Arc::clone(&state),
        },
        FakeRemote { state },
    )
}

impl FakeTransport {
    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().expect("fake transport state poisoned")
    }
}

impl Transport for FakeTransport {
    fn open(&mut self, endpoint: &Endpoint, events: TransportEvents) -> CwResult<()> {
        let mut state = self.state();
        if state.events.is_some() {
            return Err(CwError::Socket("connection already active".into()));
        }
        state.opens.push(endpoint.as_str().to_string());
        state.events = Some(events);
        Ok(())
    }

    fn send(&mut self, frame: String) {
        let mut state = self.state();
        state.attempted.push(frame.clone());
        if state.open {
            state.sent.push(frame);
        }
    }

    fn close(&mut self) {
        let mut state = self.state();
        state.close_calls += 1;
        state.terminate();
    }

    fn is_open(&self) -> bool {
        self.state().open
    }
}

impl FakeRemote {
    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().expect("fake transport state poisoned")
    }

    fn emit(&self, event: TransportEvent) {
        if let Some(events) = self.state().events.as_ref() {
            let _ = events.send(event);
        }
    }

    /// Complete the pending handshake.
    pub fn accept(&self) {
        self.state().open = true;
        self.emit(TransportEvent::Opened);
    }

    /// Fail the pending handshake: an error followed by a close.
    pub fn refuse(&self) {
        self.emit(TransportEvent::Error("connection refused".into()));
        self.state().terminate();
    }

    /// Drop the connection from the remote side.
    pub fn drop_connection(&self) {
        self.state().terminate();
    }

    /// Report an error without closing.
    pub fn error(&self, message: &str) {
        self.emit(TransportEvent::Error(message.to_string()));
    }

    /// Deliver one raw inbound frame.
    pub fn push(&self, raw: &str) {
        self.emit(TransportEvent::Message(raw.to_string()));
    }

    /// Deliver one inbound frame built from JSON.
    pub fn push_json(&self, frame: Value) {
        self.push(&frame.to_string());
    }

    /// Endpoints of every open attempt so far.
    pub fn opens(&self) -> Vec<String> {
        self.state().opens.clone()
    }

    /// Frames delivered to the remote, parsed.
    pub fn sent(&self) -> Vec<Value> {
        self.state()
            .sent
            .iter()
            .map(|raw| serde_json::from_str(raw).expect("client sent invalid JSON"))
            .collect()
    }

    /// Frames of the given `type` delivered to the remote.
    pub fn sent_of_type(&self, kind: &str) -> Vec<Value> {
        self.sent()
            .into_iter()
            .filter(|frame| frame["type"] == kind)
            .collect()
    }

    /// Every frame the client tried to send, delivered or not.
    pub fn attempted_of_type(&self, kind: &str) -> Vec<Value> {
        self.state()
            .attempted
            .iter()
            .map(|raw| serde_json::from_str::<Value>(raw).expect("client sent invalid JSON"))
            .filter(|frame| frame["type"] == kind)
            .collect()
    }

    pub fn is_open(&self) -> bool {
        self.state().open
    }

    pub fn close_calls(&self) -> usize {
        self.state().close_calls
    }

    pub fn closed_emitted(&self) -> usize {
        self.state().closed_emitted
    }
}

/// Configuration for a widget on `room_key` with the given heartbeat.
pub fn create_test_config(room_key: &str, heartbeat_ms: u64) -> AppConfig {
    let mut config = AppConfig::default();
    config.widget.room_key = room_key.to_string();
    config.widget.heartbeat = heartbeat_ms;
    config
}

/// Create an EventDispatcher with a small buffer suitable for tests.
pub fn create_test_dispatcher() -> EventDispatcher {
    EventDispatcher::new(256)
}

/// Let spawned tasks process everything already queued.
pub async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

/// Advance paused time by `ms`, then settle.
pub async fn advance_ms(ms: u64) {
    tokio::time::advance(Duration::from_millis(ms)).await;
    settle().await;
}

/// Drain every event received so far.
pub fn drain_events(rx: &mut broadcast::Receiver<SessionEvent>) -> Vec<SessionEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
