//! WebSocket transport built on `tokio-tungstenite`.
//!
//! Each `open` spawns one connection task that performs the handshake,
//! pumps outbound frames, forwards inbound text frames and reports exactly
//! one `Closed` when it ends, however it ends.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use cw_core::error::{CwError, CwResult};

use crate::endpoint::Endpoint;
use crate::transport::{Transport, TransportEvent, TransportEvents};

/// Realtime transport over a WebSocket.
#[derive(Default)]
pub struct WsTransport {
    /// Set from `open` until the connection task reports `Closed`.
    active: Arc<AtomicBool>,
    /// Set between `Opened` and `Closed`.
    open: Arc<AtomicBool>,
    /// Outbound frames for the connection task.
    outbound: Option<mpsc::UnboundedSender<String>>,
    /// Signals the connection task to shut down.
    shutdown: Option<oneshot::Sender<()>>,
}

impl WsTransport {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Transport for WsTransport {
    fn open(&mut self, endpoint: &Endpoint, events: TransportEvents) -> CwResult<()> {
        if self.active.swap(true, Ordering::SeqCst) {
            return Err(CwError::Socket("a connection is already active".into()));
        }

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        self.outbound = Some(outbound_tx);
        self.shutdown = Some(shutdown_tx);

        info!("socket connecting to {endpoint}");
        tokio::spawn(run_connection(
            endpoint.as_str().to_string(),
            events,
            outbound_rx,
            shutdown_rx,
            Arc::clone(&self.active),
            Arc::clone(&self.open),
        ));
        Ok(())
    }

    fn send(&mut self, frame: String) {
        if !self.open.load(Ordering::SeqCst) {
            debug!("socket not open, dropping outbound frame");
            return;
        }
        if let Some(outbound) = &self.outbound {
            if outbound.send(frame).is_err() {
                debug!("connection task gone, dropping outbound frame");
            }
        }
    }

    fn close(&mut self) {
        self.outbound = None;
        if let Some(shutdown) = self.shutdown.take() {
            // The task may already have ended on its own.
            let _ = shutdown.send(());
        }
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }
}

impl Drop for WsTransport {
    fn drop(&mut self) {
        self.close();
    }
}

/// Connection task: handshake, then pump frames until either side closes.
async fn run_connection(
    url: String,
    events: TransportEvents,
    mut outbound: mpsc::UnboundedReceiver<String>,
    mut shutdown: oneshot::Receiver<()>,
    active: Arc<AtomicBool>,
    open: Arc<AtomicBool>,
) {
    let connected = tokio::select! {
        result = connect_async(url.as_str()) => result,
        _ = &mut shutdown => {
            debug!("socket closed during handshake");
            finish(&events, &active, &open);
            return;
        }
    };

    let stream = match connected {
        Ok((stream, _response)) => stream,
        Err(e) => {
            warn!("socket connect failed: {e}");
            let _ = events.send(TransportEvent::Error(e.to_string()));
            finish(&events, &active, &open);
            return;
        }
    };

    open.store(true, Ordering::SeqCst);
    let _ = events.send(TransportEvent::Opened);
    info!("socket connected");

    let (mut sink, mut inbound) = stream.split();
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                open.store(false, Ordering::SeqCst);
                if let Err(e) = sink.send(Message::Close(None)).await {
                    debug!("close frame not sent: {e}");
                }
                break;
            }
            Some(frame) = outbound.recv() => {
                if let Err(e) = sink.send(Message::text(frame)).await {
                    warn!("socket send failed: {e}");
                    let _ = events.send(TransportEvent::Error(e.to_string()));
                }
            }
            message = inbound.next() => match message {
                Some(Ok(Message::Text(text))) => {
                    let _ = events.send(TransportEvent::Message(text.as_str().to_owned()));
                }
                Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes.to_vec()) {
                    Ok(text) => {
                        let _ = events.send(TransportEvent::Message(text));
                    }
                    Err(_) => warn!("dropping non-UTF-8 binary frame"),
                },
                Some(Ok(Message::Close(frame))) => {
                    debug!("socket closed by peer: {frame:?}");
                    break;
                }
                Some(Ok(_)) => {} // ping/pong are answered by tungstenite
                Some(Err(e)) => {
                    warn!("socket read failed: {e}");
                    let _ = events.send(TransportEvent::Error(e.to_string()));
                    break;
                }
                None => break,
            }
        }
    }

    finish(&events, &active, &open);
    info!("socket disconnected");
}

/// Report the single `Closed` of this connection.
fn finish(events: &TransportEvents, active: &AtomicBool, open: &AtomicBool) {
    open.store(false, Ordering::SeqCst);
    active.store(false, Ordering::SeqCst);
    let _ = events.send(TransportEvent::Closed);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use tokio::net::TcpListener;
    use tokio::time::timeout;
    use tokio_tungstenite::accept_hdr_async;
    use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};

    /// True when no further event arrives (the channel may also have closed).
    async fn no_more_events(rx: &mut mpsc::UnboundedReceiver<TransportEvent>, wait: Duration) -> bool {
        !matches!(timeout(wait, rx.recv()).await, Ok(Some(_)))
    }

    async fn next_event(rx: &mut mpsc::UnboundedReceiver<TransportEvent>) -> TransportEvent {
        timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("timed out waiting for transport event")
            .expect("event channel closed")
    }

    #[tokio::test]
    async fn test_round_trip_against_local_server() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (uri_tx, uri_rx) = oneshot::channel::<String>();

        let server = tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let callback = move |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
                let _ = uri_tx.send(req.uri().to_string());
                Ok(resp)
            };
            let mut ws = accept_hdr_async(tcp, callback).await.unwrap();

            // Echo the first client frame back inside a server reply, then hang up.
            let first = ws.next().await.unwrap().unwrap();
            let reply = format!(r#"{{"type":"server.message","message":{}}}"#, first.to_text().unwrap().len());
            ws.send(Message::text(reply)).await.unwrap();
            ws.close(None).await.unwrap();
        });

        let endpoint = Endpoint::new(&format!("http://{addr}/v1/ws/chat"), "tenant_123").unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut transport = WsTransport::new();

        // Sending before the handshake is a silent no-op
        transport.send("dropped".into());

        transport.open(&endpoint, tx.clone()).unwrap();
        assert!(transport.open(&endpoint, tx).is_err());

        assert_eq!(next_event(&mut rx).await, TransportEvent::Opened);
        assert!(transport.is_open());
        assert_eq!(uri_rx.await.unwrap(), "/v1/ws/chat?room_key=tenant_123");

        transport.send("hello".into());
        assert_eq!(
            next_event(&mut rx).await,
            TransportEvent::Message(r#"{"type":"server.message","message":5}"#.into())
        );
        assert_eq!(next_event(&mut rx).await, TransportEvent::Closed);
        assert!(!transport.is_open());

        // Closing after the peer hung up emits nothing further
        transport.close();
        transport.close();
        server.await.unwrap();
        assert!(no_more_events(&mut rx, Duration::from_millis(100)).await);
    }

    #[tokio::test]
    async fn test_failed_connect_reports_error_then_closed() {
        // Bind then drop to get a port nobody listens on.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let endpoint = Endpoint::new(&format!("ws://{addr}/ws"), "default").unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut transport = WsTransport::new();
        transport.open(&endpoint, tx.clone()).unwrap();

        assert!(matches!(next_event(&mut rx).await, TransportEvent::Error(_)));
        assert_eq!(next_event(&mut rx).await, TransportEvent::Closed);

        // The transport can be reopened once the previous connection ended
        transport.open(&endpoint, tx).unwrap();
        assert!(matches!(next_event(&mut rx).await, TransportEvent::Error(_)));
        assert_eq!(next_event(&mut rx).await, TransportEvent::Closed);
    }

    #[tokio::test]
    async fn test_close_during_handshake_emits_single_closed() {
        // Accept TCP but never complete the WebSocket handshake.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (_tcp, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(2)).await;
        });

        let endpoint = Endpoint::new(&format!("ws://{addr}/ws"), "default").unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut transport = WsTransport::new();
        transport.open(&endpoint, tx).unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        transport.close();
        transport.close();
        assert_eq!(next_event(&mut rx).await, TransportEvent::Closed);
        assert!(no_more_events(&mut rx, Duration::from_millis(200)).await);
        server.abort();
    }
}
