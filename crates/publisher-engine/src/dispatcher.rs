//! Engine status dispatch and host notification.

use std::time::Instant;

use crossbeam_channel::{Sender, TrySendError};
use tracing::{debug, warn};

use publisher_ipc::PublisherEvent;
use publisher_transport::{EngineStatus, StreamingEngine};

use crate::session::Session;

/// Delivers notifications to the host.
///
/// A notifier without a subscriber, or whose subscriber has gone away,
/// drops notifications silently.
#[derive(Debug, Clone, Default)]
pub struct Notifier {
    event_tx: Option<Sender<PublisherEvent>>,
}

impl Notifier {
    /// Create a notifier delivering to `event_tx`.
    pub fn new(event_tx: Sender<PublisherEvent>) -> Self {
        Self {
            event_tx: Some(event_tx),
        }
    }

    /// Send one event.
    pub fn notify(&self, event: PublisherEvent) {
        let Some(ref tx) = self.event_tx else {
            return;
        };

        match tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => warn!(?event, "Event channel full, dropping event"),
            Err(TrySendError::Disconnected(_)) => debug!("No event subscriber"),
        }
    }

    /// Report a transition: the optional typed event, then the state string.
    pub fn transition(&self, event: Option<PublisherEvent>, status: &str) {
        if let Some(event) = event {
            self.notify(event);
        }
        self.notify(PublisherEvent::StreamStateChanged(status.to_string()));
    }
}

impl<E: StreamingEngine> Session<E> {
    /// Route an engine status to the matching transition.
    ///
    /// Statuses arriving after the session is detached are dropped.
    pub fn handle_status(&mut self, status: EngineStatus, now: Instant) {
        if !self.is_attached() {
            debug!(?status, "Session detached, dropping engine status");
            return;
        }

        debug!(?status, state = self.state().name(), "Engine status");

        match status {
            EngineStatus::ConnectSuccess => self.on_connect_success(),
            EngineStatus::ConnectFailed => self.on_connect_failed(now),
            EngineStatus::ConnectClosed => self.on_connect_closed(now),
            EngineStatus::PublishStart => self.on_publish_start(),
            EngineStatus::IoError(description) => self.on_io_error(&description),
            EngineStatus::Other(code) => self.notifier().transition(None, &code),
        }
    }
}
