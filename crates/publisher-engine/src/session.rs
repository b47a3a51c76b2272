//! Publish session state machine.

use std::time::Instant;

use crossbeam_channel::Receiver;
use tracing::{debug, info, instrument, warn};

use publisher_audio::select_route;
use publisher_encoder::EncoderSettings;
use publisher_ipc::{
    AudioInputType, CameraPosition, DeviceOrientation, Orientation, PublisherConfig,
    PublisherEvent, SessionSnapshot, SessionState, StreamTarget, VideoSettings, STATUS_CLOSED,
    STATUS_CONNECTED, STATUS_CONNECTING, STATUS_FAILED, STATUS_IO_ERROR,
    STATUS_RETRIES_EXHAUSTED,
};
use publisher_transport::{EngineStatus, ReconnectPolicy, StreamingEngine};

use crate::dispatcher::Notifier;
use crate::error::PublisherError;
use crate::orientation::OrientationTracker;
use crate::PublisherResult;

/// Connection lifecycle of one publish session.
///
/// The session is the single writer of the stream target, video settings
/// and connection state. It never sleeps: a bounded reconnect is recorded as
/// a deadline that the owner drives through [`Session::poll_timers`].
pub struct Session<E: StreamingEngine> {
    engine: E,
    notifier: Notifier,
    target: StreamTarget,
    video: VideoSettings,
    orientation: OrientationTracker,
    camera: CameraPosition,
    audio_input: Option<AudioInputType>,
    muted: bool,
    torch: bool,
    state: SessionState,
    is_streaming: bool,
    retry_count: u32,
    policy: ReconnectPolicy,
    pending_reconnect: Option<Instant>,
    retries_exhausted: bool,
    attached: bool,
}

impl<E: StreamingEngine> Session<E> {
    /// Create a detached session from the host configuration.
    pub fn new(engine: E, config: &PublisherConfig, notifier: Notifier) -> Self {
        Self {
            engine,
            notifier,
            target: config.target(),
            video: config.video_settings,
            orientation: OrientationTracker::new(
                Orientation::default(),
                Orientation::parse_list(&config.allowed_orientations),
            ),
            camera: config.camera,
            audio_input: config.audio_input,
            muted: false,
            torch: false,
            state: SessionState::Idle,
            is_streaming: false,
            retry_count: 0,
            policy: ReconnectPolicy::from(&config.reconnect),
            pending_reconnect: None,
            retries_exhausted: false,
            attached: false,
        }
    }

    /// Wire the engine: subscribe to its events, attach capture devices,
    /// keep the device awake and push the initial encoder configuration.
    #[instrument(name = "session_attach", skip(self), fields(engine = self.engine.name()))]
    pub fn attach(&mut self) -> PublisherResult<Receiver<EngineStatus>> {
        let statuses = self.engine.subscribe();
        self.attached = true;

        self.engine.attach_devices(self.camera)?;
        self.engine.set_idle_timer_disabled(true);
        self.engine.set_video_orientation(self.orientation.current());
        self.apply_encoder_settings();

        if let Some(input) = self.audio_input {
            if let Err(e) = self.set_audio_input(input) {
                warn!("Initial audio input not applied: {}", e);
            }
        }

        info!("Session attached");
        Ok(statuses)
    }

    /// Unwire the engine. Cancels any pending reconnect; no transition fires
    /// afterwards. Safe to call more than once.
    #[instrument(name = "session_detach", skip(self))]
    pub fn detach(&mut self) {
        if !self.attached {
            return;
        }
        self.attached = false;

        self.cancel_reconnect();
        self.engine.unsubscribe();
        self.engine.detach_devices();
        self.engine.set_idle_timer_disabled(false);

        info!("Session detached");
    }

    pub fn set_stream_url(&mut self, url: String) {
        self.target.url = url;
    }

    pub fn set_stream_name(&mut self, name: String) {
        self.target.stream_name = name;
    }

    /// Replace the natural video settings and re-apply the encoder
    /// configuration. Settings the encoder cannot use are ignored.
    pub fn set_video_settings(&mut self, video: VideoSettings) -> PublisherResult<()> {
        let resolved = EncoderSettings::resolve(&video, self.orientation.current())?;
        self.video = video;
        if self.attached {
            self.engine.apply_encoder_settings(&resolved);
        }
        Ok(())
    }

    /// Replace the orientation allow-list. Unrecognised names are dropped.
    pub fn set_allowed_orientations(&mut self, names: &[String]) {
        let allowed = Orientation::parse_list(names);
        if allowed.len() != names.len() {
            debug!(?names, "Ignoring unrecognised orientation names");
        }
        self.orientation.set_allowed(allowed);
    }

    /// Connect to the stream URL and start publishing once connected.
    ///
    /// Calling this while already streaming re-issues the connect.
    #[instrument(name = "start_publish", skip(self))]
    pub fn start_publish(&mut self) {
        if let Err(e) = check_target(&self.target) {
            warn!("{}", e);
        }

        info!(url = %self.target.url, stream = %self.target.stream_name, "Starting publish");

        self.retry_count = 0;
        self.retries_exhausted = false;
        self.cancel_reconnect();

        self.engine.connect(&self.target.url);
        self.is_streaming = true;
        self.transition_to(SessionState::Connecting);
    }

    /// Close the stream and the connection. Never waits on the network.
    #[instrument(name = "stop_publish", skip(self))]
    pub fn stop_publish(&mut self) {
        info!("Stopping publish");

        self.cancel_reconnect();
        self.engine.close();
        self.is_streaming = false;
        self.transition_to(SessionState::Idle);
    }

    pub fn on_connect_success(&mut self) {
        self.retry_count = 0;
        self.retries_exhausted = false;
        self.cancel_reconnect();
        self.transition_to(SessionState::Connected);

        self.notifier
            .transition(Some(PublisherEvent::ConnectionSuccess), STATUS_CONNECTING);
        self.engine.publish(&self.target.stream_name);
    }

    pub fn on_publish_start(&mut self) {
        self.transition_to(SessionState::Publishing);
        self.notifier
            .transition(Some(PublisherEvent::ConnectionStarted), STATUS_CONNECTED);
    }

    pub fn on_connect_failed(&mut self, now: Instant) {
        self.transition_to(SessionState::Failed);
        self.notifier
            .transition(Some(PublisherEvent::ConnectionFailed), STATUS_FAILED);
        self.reconnect(now);
    }

    pub fn on_connect_closed(&mut self, now: Instant) {
        self.transition_to(SessionState::Closed);
        self.notifier
            .transition(Some(PublisherEvent::Disconnect), STATUS_CLOSED);
        self.reconnect(now);
    }

    /// Reconnect immediately after a transport fault. This path has no
    /// backoff and does not count against the retry budget.
    pub fn on_io_error(&mut self, description: &str) {
        warn!(error = %description, "Engine I/O error");
        self.notifier.transition(None, STATUS_IO_ERROR);

        if self.is_streaming {
            // The immediate connect supersedes any scheduled one.
            self.cancel_reconnect();
            self.engine.connect(&self.target.url);
        }
    }

    /// Schedule a bounded reconnect after `2^retry_count` delay units.
    pub fn reconnect(&mut self, now: Instant) {
        if !self.is_streaming {
            debug!("Not streaming, skipping reconnect");
            return;
        }

        if !self.policy.should_retry(self.retry_count) {
            if !self.retries_exhausted {
                self.retries_exhausted = true;
                warn!(attempts = self.retry_count, "Reconnect attempts exhausted");
                self.notifier.transition(
                    Some(PublisherEvent::RetriesExhausted {
                        attempts: self.retry_count,
                    }),
                    STATUS_RETRIES_EXHAUSTED,
                );
            }
            return;
        }

        if self.pending_reconnect.is_some() {
            debug!("Reconnect already scheduled");
            return;
        }

        let delay = self.policy.delay_for_retry(self.retry_count);
        info!(retry = self.retry_count, ?delay, "Scheduling reconnect");
        self.pending_reconnect = Some(now + delay);
    }

    /// Fire the pending reconnect if its deadline has passed.
    pub fn poll_timers(&mut self, now: Instant) {
        match self.pending_reconnect {
            Some(deadline) if now >= deadline => {
                self.pending_reconnect = None;
                info!(retry = self.retry_count, "Reconnecting");
                self.engine.connect(&self.target.url);
                self.retry_count += 1;
                self.transition_to(SessionState::Connecting);
            }
            _ => {}
        }
    }

    /// When the pending reconnect is due, if any.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending_reconnect
    }

    /// Apply a device orientation change. Ignored changes touch nothing.
    pub fn on_device_orientation_changed(&mut self, device: DeviceOrientation) {
        let Some(orientation) = self.orientation.accept(device) else {
            return;
        };

        info!(%orientation, "Capture orientation changed");
        self.engine.set_video_orientation(orientation);
        self.apply_encoder_settings();
    }

    /// Route audio from the first available input of the given type.
    pub fn set_audio_input(&mut self, input: AudioInputType) -> PublisherResult<()> {
        let route = select_route(&self.engine.audio_inputs(), input)?;
        self.engine.set_audio_route(&route)?;
        self.audio_input = Some(input);
        Ok(())
    }

    /// Mute or unmute audio. Repeating the current value does nothing.
    pub fn set_audio_muted(&mut self, muted: bool) {
        if self.muted == muted {
            debug!(muted, "Audio mute unchanged");
            return;
        }
        self.muted = muted;
        self.engine.set_audio_muted(muted);
    }

    /// Re-attach capture with the other camera.
    pub fn switch_camera(&mut self) -> PublisherResult<()> {
        let camera = self.camera.flipped();
        self.engine.attach_devices(camera)?;
        self.camera = camera;
        Ok(())
    }

    pub fn toggle_torch(&mut self) {
        self.torch = !self.torch;
        self.engine.set_torch(self.torch);
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_streaming(&self) -> bool {
        self.is_streaming
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation.current()
    }

    pub fn video_settings(&self) -> VideoSettings {
        self.video
    }

    pub fn publish_url(&self) -> String {
        self.target.publish_url()
    }

    /// Copy of the state for host queries.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.state,
            is_streaming: self.is_streaming,
            retry_count: self.retry_count,
            publish_url: self.target.publish_url(),
            orientation: self.orientation.current(),
            muted: self.muted,
            congested: self.engine.has_congestion(),
            audio_prepared: self.engine.is_audio_prepared(),
            video_prepared: self.engine.is_video_prepared(),
            camera_on_preview: self.engine.is_on_preview(),
        }
    }

    pub(crate) fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    fn apply_encoder_settings(&mut self) {
        match EncoderSettings::resolve(&self.video, self.orientation.current()) {
            Ok(settings) => self.engine.apply_encoder_settings(&settings),
            Err(e) => warn!("Encoder settings not applied: {}", e),
        }
    }

    fn cancel_reconnect(&mut self) {
        if self.pending_reconnect.take().is_some() {
            debug!("Pending reconnect cancelled");
        }
    }

    fn transition_to(&mut self, new_state: SessionState) {
        let previous = std::mem::replace(&mut self.state, new_state);
        debug!(
            previous = %previous.name(),
            current = %new_state.name(),
            "State transition"
        );
    }
}

impl<E: StreamingEngine> Drop for Session<E> {
    fn drop(&mut self) {
        self.detach();
    }
}

fn check_target(target: &StreamTarget) -> PublisherResult<()> {
    if target.url.is_empty() {
        return Err(PublisherError::Configuration("stream URL is empty".into()));
    }
    if target.stream_name.is_empty() {
        return Err(PublisherError::Configuration("stream name is empty".into()));
    }
    Ok(())
}
