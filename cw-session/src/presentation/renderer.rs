//! Incremental reveal of bot replies.
//!
//! The renderer only animates. The reply it holds is committed in full when
//! the reveal completes or is skipped, so interrupting an animation never
//! loses or duplicates the underlying message.

use std::future::pending;
use std::pin::Pin;
use std::time::Duration;

use tokio::time::{sleep, Instant, Sleep};

use cw_socket::Source;

/// A bot reply waiting to be committed.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub text: String,
    pub sources: Vec<Source>,
}

/// Result of one renderer step.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamStep {
    /// A longer prefix of the reply is now visible.
    Progress(String),
    /// Every character has been shown; commit the reply.
    Complete(Reply),
}

#[derive(Debug)]
struct Stream {
    reply: Reply,
    revealed: usize,
    next: Pin<Box<Sleep>>,
}

/// Reveals one reply at a time, one character per `char_delay`.
#[derive(Debug)]
pub struct StreamingRenderer {
    char_delay: Duration,
    active: Option<Stream>,
}

impl StreamingRenderer {
    pub fn new(char_delay: Duration) -> Self {
        Self {
            char_delay,
            active: None,
        }
    }

    /// Start revealing `reply`, replacing any current stream.
    pub fn begin(&mut self, reply: Reply) {
        self.active = Some(Stream {
            reply,
            revealed: 0,
            next: Box::pin(sleep(self.char_delay)),
        });
    }

    pub fn is_streaming(&self) -> bool {
        self.active.is_some()
    }

    /// Text revealed so far, if streaming.
    pub fn visible(&self) -> Option<&str> {
        self.active
            .as_ref()
            .map(|stream| &stream.reply.text[..stream.revealed])
    }

    /// Wait for the next step. Never resolves while idle. Cancel-safe.
    pub async fn advance(&mut self) -> StreamStep {
        let delay = self.char_delay;
        let done = self
            .active
            .as_ref()
            .is_some_and(|stream| stream.revealed >= stream.reply.text.len());
        if done {
            if let Some(stream) = self.active.take() {
                return StreamStep::Complete(stream.reply);
            }
        }

        let Some(stream) = self.active.as_mut() else {
            return pending().await;
        };
        let Some(next_char) = stream.reply.text[stream.revealed..].chars().next() else {
            return pending().await;
        };

        stream.next.as_mut().await;
        stream.revealed += next_char.len_utf8();
        stream.next.as_mut().reset(Instant::now() + delay);
        StreamStep::Progress(stream.reply.text[..stream.revealed].to_string())
    }

    /// Stop the animation and hand back the reply for an immediate commit.
    pub fn finish(&mut self) -> Option<Reply> {
        self.active.take().map(|stream| stream.reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reply(text: &str) -> Reply {
        Reply {
            text: text.to_string(),
            sources: Vec::new(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_reveals_growing_prefixes() {
        let mut renderer = StreamingRenderer::new(Duration::from_millis(20));
        renderer.begin(reply("Hey"));

        let start = Instant::now();
        assert_eq!(renderer.advance().await, StreamStep::Progress("H".into()));
        assert_eq!(renderer.advance().await, StreamStep::Progress("He".into()));
        assert_eq!(renderer.advance().await, StreamStep::Progress("Hey".into()));
        assert_eq!(renderer.advance().await, StreamStep::Complete(reply("Hey")));
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(60) && elapsed < Duration::from_millis(70));
        assert!(!renderer.is_streaming());
    }

    #[tokio::test(start_paused = true)]
    async fn test_multibyte_characters() {
        let mut renderer = StreamingRenderer::new(Duration::from_millis(1));
        renderer.begin(reply("çö"));

        assert_eq!(renderer.advance().await, StreamStep::Progress("ç".into()));
        assert_eq!(renderer.visible(), Some("ç"));
        assert_eq!(renderer.advance().await, StreamStep::Progress("çö".into()));
        assert!(matches!(renderer.advance().await, StreamStep::Complete(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_reply_completes_immediately() {
        let mut renderer = StreamingRenderer::new(Duration::from_millis(20));
        renderer.begin(reply(""));
        let start = Instant::now();
        assert_eq!(renderer.advance().await, StreamStep::Complete(reply("")));
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_finish_returns_full_reply() {
        let mut renderer = StreamingRenderer::new(Duration::from_millis(20));
        renderer.begin(reply("Merhaba"));
        let _ = renderer.advance().await;

        assert_eq!(renderer.finish(), Some(reply("Merhaba")));
        assert!(!renderer.is_streaming());
        assert_eq!(renderer.finish(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_renderer_stays_pending() {
        let mut renderer = StreamingRenderer::new(Duration::from_millis(20));
        let step = tokio::time::timeout(Duration::from_secs(5), renderer.advance()).await;
        assert!(step.is_err());
    }
}
