//! Widget facade for embedding hosts.
//!
//! A `Widget` lives as long as the host page. Each open starts a fresh
//! session (new dedup memory, attempt counter at zero) and a presentation
//! task; each close tears both down. The message list carries over from one
//! open to the next.

use tokio::sync::{broadcast, watch};
use tracing::{info, warn};

use cw_core::config::{AppConfig, ColorScheme, Theme};
use cw_core::error::CwResult;
use cw_socket::Transport;

use crate::controller::{SessionController, SessionHandle};
use crate::events::{EventDispatcher, SessionEvent};
use crate::presentation::{MessageList, Presentation, PresentationHandle, RenderedMessage, ViewUpdate};
use crate::session::SessionStatus;

struct OpenWidget {
    session: SessionHandle,
    presentation: PresentationHandle,
    dispatcher: EventDispatcher,
    theme: Theme,
}

/// One embedded chat widget.
pub struct Widget {
    config: AppConfig,
    history: MessageList,
    updates: broadcast::Sender<ViewUpdate>,
    open: Option<OpenWidget>,
}

impl Widget {
    pub fn new(config: AppConfig) -> Self {
        let (updates, _) = broadcast::channel(config.session.event_capacity.max(1));
        Self {
            config,
            history: MessageList::new(),
            updates,
            open: None,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Open the widget on `transport` and start connecting.
    ///
    /// `system` is the host's color-scheme preference, used when the theme
    /// is `auto`. Returns the resolved theme. Opening an already open widget
    /// keeps the current session.
    pub fn open<T: Transport>(&mut self, transport: T, system: ColorScheme) -> CwResult<Theme> {
        if let Some(open) = &self.open {
            warn!("widget already open, keeping session {}", open.session.id());
            return Ok(open.theme);
        }

        let theme = self.config.widget.theme.resolve(system);
        let dispatcher = EventDispatcher::new(self.config.session.event_capacity);
        // Subscribe before the controller starts so no event is missed.
        let events = dispatcher.subscribe();
        let session = SessionController::spawn(&self.config, transport, dispatcher.clone())?;

        let history = std::mem::take(&mut self.history);
        let presentation = Presentation::new(&self.config, history, self.updates.clone()).spawn(events);

        info!("widget opened (theme {theme})");
        self.open = Some(OpenWidget {
            session,
            presentation,
            dispatcher,
            theme,
        });
        Ok(theme)
    }

    /// Close the widget: cancel timers, close the transport and commit any
    /// reply still being revealed. Idempotent.
    pub async fn close(&mut self) {
        let Some(mut open) = self.open.take() else {
            return;
        };

        open.session.close().await;
        match open.presentation.close().await {
            Some(messages) => self.history = messages,
            None => warn!("presentation did not hand back its messages"),
        }
        info!("widget closed");
    }

    pub fn is_open(&self) -> bool {
        self.open.is_some()
    }

    /// Theme resolved at the last open.
    pub fn theme(&self) -> Option<Theme> {
        self.open.as_ref().map(|open| open.theme)
    }

    /// Submit user text. Ignored while the widget is closed.
    pub fn submit(&self, text: impl Into<String>) {
        match &self.open {
            Some(open) => open.session.submit(text),
            None => warn!("widget is closed, submission ignored"),
        }
    }

    /// Skip the current streaming reveal.
    pub fn skip_stream(&self) {
        if let Some(open) = &self.open {
            open.presentation.skip_stream();
        }
    }

    /// Rate the bot reply at `index`.
    pub fn give_feedback(&self, index: usize, helpful: bool) {
        if let Some(open) = &self.open {
            open.presentation.feedback(index, helpful);
        }
    }

    /// Committed messages, including those from earlier opens.
    pub async fn messages(&self) -> Vec<RenderedMessage> {
        match &self.open {
            Some(open) => open.presentation.snapshot().await,
            None => self.history.as_slice().to_vec(),
        }
    }

    /// Subscribe to view updates. Survives close and reopen.
    pub fn subscribe(&self) -> broadcast::Receiver<ViewUpdate> {
        self.updates.subscribe()
    }

    /// Subscribe to raw session events of the current session.
    pub fn subscribe_events(&self) -> Option<broadcast::Receiver<SessionEvent>> {
        self.open.as_ref().map(|open| open.dispatcher.subscribe())
    }

    /// Status of the current session.
    pub fn status(&self) -> Option<SessionStatus> {
        self.open.as_ref().map(|open| open.session.status())
    }

    /// Watch the status of the current session.
    pub fn status_receiver(&self) -> Option<watch::Receiver<SessionStatus>> {
        self.open.as_ref().map(|open| open.session.status_receiver())
    }
}
