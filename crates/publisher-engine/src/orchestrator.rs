//! Publisher driver thread.

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel::{select, Receiver, Sender, TrySendError};
use parking_lot::RwLock;
use tracing::{debug, info, instrument, warn};

use publisher_ipc::{PublisherCommand, PublisherEvent, SessionSnapshot, SessionState};
use publisher_transport::{EngineStatus, StreamingEngine};

use crate::error::PublisherError;
use crate::session::Session;
use crate::PublisherResult;

/// Wake-up interval while no reconnect is pending.
const IDLE_TICK: Duration = Duration::from_millis(100);

enum Input {
    Command(PublisherCommand),
    Status(EngineStatus),
    StatusClosed,
    CommandsClosed,
    Tick,
}

/// Owns the session and serialises everything that touches it.
pub struct Publisher<E: StreamingEngine> {
    session: Session<E>,
    command_rx: Receiver<PublisherCommand>,
    status_rx: Receiver<EngineStatus>,
    snapshot: Arc<RwLock<SessionSnapshot>>,
}

impl<E: StreamingEngine> Publisher<E> {
    /// Attach the session and prepare the loop.
    pub fn new(
        mut session: Session<E>,
        command_rx: Receiver<PublisherCommand>,
        snapshot: Arc<RwLock<SessionSnapshot>>,
    ) -> PublisherResult<Self> {
        let status_rx = session.attach()?;
        *snapshot.write() = session.snapshot();

        Ok(Self {
            session,
            command_rx,
            status_rx,
            snapshot,
        })
    }

    /// Run until shutdown (blocking).
    #[instrument(name = "publisher_run", skip(self))]
    pub fn run(&mut self) {
        info!("Publisher starting");

        let command_rx = self.command_rx.clone();

        loop {
            let timeout = self
                .session
                .next_deadline()
                .map(|deadline| deadline.saturating_duration_since(Instant::now()))
                .unwrap_or(IDLE_TICK);

            let input = select! {
                recv(command_rx) -> msg => match msg {
                    Ok(command) => Input::Command(command),
                    Err(_) => Input::CommandsClosed,
                },
                recv(self.status_rx) -> msg => match msg {
                    Ok(status) => Input::Status(status),
                    Err(_) => Input::StatusClosed,
                },
                default(timeout) => Input::Tick,
            };

            match input {
                Input::Command(command) => {
                    if !self.handle_command(command) {
                        break;
                    }
                }
                Input::Status(status) => self.session.handle_status(status, Instant::now()),
                Input::StatusClosed => {
                    debug!("Engine status channel closed");
                    self.status_rx = crossbeam_channel::never();
                }
                Input::CommandsClosed => {
                    info!("Command channel disconnected, shutting down");
                    break;
                }
                Input::Tick => {}
            }

            self.session.poll_timers(Instant::now());
            self.publish_snapshot();
        }

        self.session.detach();
        self.publish_snapshot();
        info!("Publisher stopped");
    }

    /// Handle a command. Returns false if the publisher should stop.
    fn handle_command(&mut self, command: PublisherCommand) -> bool {
        debug!(?command, "Handling command");

        match command {
            PublisherCommand::SetStreamUrl(url) => self.session.set_stream_url(url),
            PublisherCommand::SetStreamName(name) => self.session.set_stream_name(name),
            PublisherCommand::SetVideoSettings(video) => {
                if let Err(e) = self.session.set_video_settings(video) {
                    warn!("Ignoring video settings: {}", e);
                }
            }
            PublisherCommand::SetAllowedOrientations(names) => {
                self.session.set_allowed_orientations(&names)
            }
            PublisherCommand::StartPublish => self.session.start_publish(),
            PublisherCommand::StopPublish => self.session.stop_publish(),
            PublisherCommand::DeviceOrientationChanged(device) => {
                self.session.on_device_orientation_changed(device)
            }
            PublisherCommand::SetAudioInput(input) => {
                if let Err(e) = self.session.set_audio_input(input) {
                    warn!("Audio input not changed: {}", e);
                }
            }
            PublisherCommand::SetAudioMuted(muted) => self.session.set_audio_muted(muted),
            PublisherCommand::SwitchCamera => {
                if let Err(e) = self.session.switch_camera() {
                    warn!("Camera switch failed: {}", e);
                }
            }
            PublisherCommand::ToggleTorch => self.session.toggle_torch(),
            PublisherCommand::Shutdown => return false,
        }

        true
    }

    fn publish_snapshot(&self) {
        *self.snapshot.write() = self.session.snapshot();
    }
}

/// Host-side handle to a running publisher.
///
/// Dropping the handle shuts the publisher down and waits for its thread.
pub struct PublisherHandle {
    command_tx: Sender<PublisherCommand>,
    event_rx: Receiver<PublisherEvent>,
    snapshot: Arc<RwLock<SessionSnapshot>>,
    thread: Option<JoinHandle<()>>,
}

impl PublisherHandle {
    pub(crate) fn new(
        command_tx: Sender<PublisherCommand>,
        event_rx: Receiver<PublisherEvent>,
        snapshot: Arc<RwLock<SessionSnapshot>>,
        thread: JoinHandle<()>,
    ) -> Self {
        Self {
            command_tx,
            event_rx,
            snapshot,
            thread: Some(thread),
        }
    }

    /// Queue a command for the publisher thread.
    pub fn send(&self, command: PublisherCommand) -> PublisherResult<()> {
        self.command_tx.try_send(command).map_err(|e| match e {
            TrySendError::Full(command) => {
                warn!(?command, "Command channel full");
                PublisherError::ChannelFull
            }
            TrySendError::Disconnected(_) => PublisherError::ChannelDisconnected,
        })
    }

    /// Host notifications, in transition order.
    pub fn events(&self) -> &Receiver<PublisherEvent> {
        &self.event_rx
    }

    /// Latest published view of the session.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot.read().clone()
    }

    pub fn is_streaming(&self) -> bool {
        self.snapshot.read().is_streaming
    }

    pub fn publish_url(&self) -> String {
        self.snapshot.read().publish_url.clone()
    }

    pub fn state(&self) -> SessionState {
        self.snapshot.read().state
    }

    pub fn is_muted(&self) -> bool {
        self.snapshot.read().muted
    }

    pub fn has_congestion(&self) -> bool {
        self.snapshot.read().congested
    }

    pub fn is_audio_prepared(&self) -> bool {
        self.snapshot.read().audio_prepared
    }

    pub fn is_video_prepared(&self) -> bool {
        self.snapshot.read().video_prepared
    }

    pub fn is_camera_on_preview(&self) -> bool {
        self.snapshot.read().camera_on_preview
    }

    /// Stop the publisher and wait for its thread to finish.
    #[instrument(name = "publisher_shutdown", skip(self))]
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        let Some(thread) = self.thread.take() else {
            return;
        };

        // A disconnected channel already stops the loop.
        let _ = self.command_tx.send(PublisherCommand::Shutdown);

        if thread.join().is_err() {
            warn!("Publisher thread panicked");
        }
    }
}

impl Drop for PublisherHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
