//! Presentation: message list, typing indicator and streaming reveal.
//!
//! Runs as its own task, consuming session events and publishing
//! `ViewUpdate`s for whatever host draws the widget. Replies are revealed one
//! at a time in arrival order; a reply that arrives mid-stream waits its turn.

mod message;
mod renderer;

pub use message::{MessageList, RenderedMessage, Sender};
pub use renderer::{Reply, StreamStep, StreamingRenderer};

use std::collections::VecDeque;
use std::future::pending;
use std::time::Duration;

use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use cw_core::config::AppConfig;
use cw_core::constants::text::{FEEDBACK_SORRY, FEEDBACK_THANKS};

use crate::events::{ConnectionState, SessionEvent};

/// What a host needs to redraw.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewUpdate {
    /// Connection state changed.
    Connection(ConnectionState),
    /// Typing indicator shown or hidden.
    Typing(bool),
    /// A bot reply started revealing.
    StreamStarted,
    /// The partially revealed reply text.
    StreamProgress(String),
    /// The reply being revealed is done; its `Committed` comes next.
    StreamEnded,
    /// A message was appended to the permanent list.
    Committed {
        index: usize,
        message: RenderedMessage,
    },
}

#[derive(Debug)]
enum PresentationCommand {
    SkipStream,
    Feedback { index: usize, helpful: bool },
    Snapshot(oneshot::Sender<Vec<RenderedMessage>>),
    Close(oneshot::Sender<MessageList>),
}

/// Handle to a running presentation task.
pub struct PresentationHandle {
    commands: mpsc::UnboundedSender<PresentationCommand>,
    task: Option<JoinHandle<()>>,
}

impl PresentationHandle {
    /// Commit the reply being revealed right away.
    pub fn skip_stream(&self) {
        self.send(PresentationCommand::SkipStream);
    }

    /// Rate the bot reply at `index`.
    pub fn feedback(&self, index: usize, helpful: bool) {
        self.send(PresentationCommand::Feedback { index, helpful });
    }

    /// Copy of the committed messages.
    pub async fn snapshot(&self) -> Vec<RenderedMessage> {
        let (tx, rx) = oneshot::channel();
        self.send(PresentationCommand::Snapshot(tx));
        rx.await.unwrap_or_default()
    }

    /// Stop the task, committing anything still streaming or queued, and
    /// return the final list. `None` if already closed.
    pub async fn close(&mut self) -> Option<MessageList> {
        let task = self.task.take()?;
        let (tx, rx) = oneshot::channel();
        self.send(PresentationCommand::Close(tx));
        let messages = rx.await.ok();
        if let Err(e) = task.await {
            warn!("presentation task ended abnormally: {e}");
        }
        messages
    }

    fn send(&self, command: PresentationCommand) {
        if self.commands.send(command).is_err() {
            debug!("presentation already stopped");
        }
    }
}

/// Presentation state, owned by its task.
pub struct Presentation {
    messages: MessageList,
    renderer: StreamingRenderer,
    queue: VecDeque<Reply>,
    feedback_enabled: bool,
    typing: bool,
    updates: broadcast::Sender<ViewUpdate>,
}

impl Presentation {
    pub fn new(
        config: &AppConfig,
        messages: MessageList,
        updates: broadcast::Sender<ViewUpdate>,
    ) -> Self {
        Self {
            messages,
            renderer: StreamingRenderer::new(Duration::from_millis(
                config.session.stream_char_delay_ms,
            )),
            queue: VecDeque::new(),
            feedback_enabled: config.widget.enable_feedback,
            typing: false,
            updates,
        }
    }

    /// Start consuming `events` on a new task.
    pub fn spawn(self, events: broadcast::Receiver<SessionEvent>) -> PresentationHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(self.run(events, rx));
        PresentationHandle {
            commands: tx,
            task: Some(task),
        }
    }

    async fn run(
        mut self,
        events: broadcast::Receiver<SessionEvent>,
        mut commands: mpsc::UnboundedReceiver<PresentationCommand>,
    ) {
        let mut events = Some(events);

        loop {
            tokio::select! {
                biased;
                command = commands.recv() => match command {
                    Some(PresentationCommand::SkipStream) => self.skip_stream(),
                    Some(PresentationCommand::Feedback { index, helpful }) => {
                        self.feedback(index, helpful)
                    }
                    Some(PresentationCommand::Snapshot(reply)) => {
                        let _ = reply.send(self.messages.as_slice().to_vec());
                    }
                    Some(PresentationCommand::Close(reply)) => {
                        self.drain(&mut events);
                        self.commit_pending();
                        let _ = reply.send(self.messages);
                        return;
                    }
                    None => {
                        self.drain(&mut events);
                        self.commit_pending();
                        return;
                    }
                },
                event = next_event(&mut events) => match event {
                    Ok(event) => self.on_event(event),
                    Err(RecvError::Lagged(n)) => warn!("presentation lagged, {n} event(s) lost"),
                    Err(RecvError::Closed) => {
                        debug!("session events closed");
                        events = None;
                    }
                },
                step = self.renderer.advance() => match step {
                    StreamStep::Progress(text) => self.publish(ViewUpdate::StreamProgress(text)),
                    StreamStep::Complete(reply) => {
                        self.end_stream(reply);
                        self.start_next();
                    }
                },
            }
        }
    }

    fn on_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::StateChanged(state) => self.publish(ViewUpdate::Connection(state)),
            SessionEvent::Typing(typing) => {
                if self.typing != typing {
                    self.typing = typing;
                    self.publish(ViewUpdate::Typing(typing));
                }
            }
            SessionEvent::UserEcho { text } => {
                self.commit(RenderedMessage::new(Sender::User, text));
            }
            SessionEvent::BotReply { text, sources } => {
                self.queue.push_back(Reply { text, sources });
                if !self.renderer.is_streaming() {
                    self.start_next();
                }
            }
            SessionEvent::Notice { sender, text } => {
                self.commit(RenderedMessage::new(sender, text));
            }
        }
    }

    fn start_next(&mut self) {
        if let Some(reply) = self.queue.pop_front() {
            self.renderer.begin(reply);
            self.publish(ViewUpdate::StreamStarted);
        }
    }

    fn skip_stream(&mut self) {
        if let Some(reply) = self.renderer.finish() {
            debug!("stream skipped");
            self.end_stream(reply);
            self.start_next();
        }
    }

    fn feedback(&mut self, index: usize, helpful: bool) {
        if !self.feedback_enabled || !self.messages.record_feedback(index) {
            debug!("feedback for message {index} ignored");
            return;
        }
        let text = if helpful { FEEDBACK_THANKS } else { FEEDBACK_SORRY };
        self.commit(RenderedMessage::new(Sender::Bot, text));
    }

    /// Apply events already buffered when the widget closes.
    fn drain(&mut self, events: &mut Option<broadcast::Receiver<SessionEvent>>) {
        let Some(rx) = events.as_mut() else {
            return;
        };
        loop {
            match rx.try_recv() {
                Ok(event) => self.on_event(event),
                Err(TryRecvError::Lagged(n)) => warn!("presentation lagged, {n} event(s) lost"),
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
    }

    /// Commit the in-flight reply and everything queued, without animation.
    fn commit_pending(&mut self) {
        if let Some(reply) = self.renderer.finish() {
            self.end_stream(reply);
        }
        while let Some(reply) = self.queue.pop_front() {
            self.commit_reply(reply);
        }
    }

    fn end_stream(&mut self, reply: Reply) {
        self.publish(ViewUpdate::StreamEnded);
        self.commit_reply(reply);
    }

    fn commit_reply(&mut self, reply: Reply) {
        let message = RenderedMessage::new(Sender::Bot, reply.text)
            .with_sources(reply.sources)
            .with_feedback(self.feedback_enabled);
        self.commit(message);
    }

    fn commit(&mut self, message: RenderedMessage) {
        let index = self.messages.push(message.clone());
        self.publish(ViewUpdate::Committed { index, message });
    }

    fn publish(&self, update: ViewUpdate) {
        // No subscribers is fine; the list itself is the source of truth.
        let _ = self.updates.send(update);
    }
}

async fn next_event(
    events: &mut Option<broadcast::Receiver<SessionEvent>>,
) -> Result<SessionEvent, RecvError> {
    match events {
        Some(rx) => rx.recv().await,
        None => pending().await,
    }
}
