//! Recording engine for unit tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;

use publisher_encoder::EncoderSettings;
use publisher_ipc::{AudioPort, AudioPortType, AudioRoute, CameraPosition, Orientation};
use publisher_transport::{EngineStatus, StreamingEngine, TransportResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCall {
    Subscribe,
    Unsubscribe,
    Connect(String),
    Publish(String),
    Close,
    ApplyEncoder(EncoderSettings),
    SetOrientation(Orientation),
    AttachDevices(CameraPosition),
    DetachDevices,
    SetAudioRoute(AudioRoute),
    SetMuted(bool),
    SetTorch(bool),
    IdleTimerDisabled(bool),
}

/// Engine double that records every call. Clones share the record.
#[derive(Clone, Default)]
pub struct MockEngine {
    calls: Arc<Mutex<Vec<EngineCall>>>,
    status_tx: Arc<Mutex<Option<Sender<EngineStatus>>>>,
    audio_inputs: Vec<AudioPort>,
    devices_attached: Arc<AtomicBool>,
    encoder_applied: Arc<AtomicBool>,
    congested: Arc<AtomicBool>,
}

impl MockEngine {
    pub fn with_audio_inputs(mut self, inputs: Vec<AudioPort>) -> Self {
        self.audio_inputs = inputs;
        self
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        self.calls.lock().clone()
    }

    pub fn clear(&self) {
        self.calls.lock().clear();
    }

    pub fn connect_count(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| matches!(c, EngineCall::Connect(_)))
            .count()
    }

    pub fn set_congested(&self, congested: bool) {
        self.congested.store(congested, Ordering::SeqCst);
    }

    fn is_prepared(&self) -> bool {
        self.devices_attached.load(Ordering::SeqCst) && self.encoder_applied.load(Ordering::SeqCst)
    }

    fn record(&self, call: EngineCall) {
        self.calls.lock().push(call);
    }
}

impl StreamingEngine for MockEngine {
    fn subscribe(&mut self) -> Receiver<EngineStatus> {
        self.record(EngineCall::Subscribe);
        let (tx, rx) = crossbeam_channel::unbounded();
        *self.status_tx.lock() = Some(tx);
        rx
    }

    fn unsubscribe(&mut self) {
        self.record(EngineCall::Unsubscribe);
        self.status_tx.lock().take();
    }

    fn connect(&mut self, url: &str) {
        self.record(EngineCall::Connect(url.to_string()));
    }

    fn publish(&mut self, stream_name: &str) {
        self.record(EngineCall::Publish(stream_name.to_string()));
    }

    fn close(&mut self) {
        self.record(EngineCall::Close);
    }

    fn apply_encoder_settings(&mut self, settings: &EncoderSettings) {
        self.encoder_applied.store(true, Ordering::SeqCst);
        self.record(EngineCall::ApplyEncoder(*settings));
    }

    fn set_video_orientation(&mut self, orientation: Orientation) {
        self.record(EngineCall::SetOrientation(orientation));
    }

    fn attach_devices(&mut self, camera: CameraPosition) -> TransportResult<()> {
        self.devices_attached.store(true, Ordering::SeqCst);
        self.record(EngineCall::AttachDevices(camera));
        Ok(())
    }

    fn detach_devices(&mut self) {
        self.devices_attached.store(false, Ordering::SeqCst);
        self.record(EngineCall::DetachDevices);
    }

    fn audio_inputs(&self) -> Vec<AudioPort> {
        self.audio_inputs.clone()
    }

    fn set_audio_route(&mut self, route: &AudioRoute) -> TransportResult<()> {
        self.record(EngineCall::SetAudioRoute(route.clone()));
        Ok(())
    }

    fn set_audio_muted(&mut self, muted: bool) {
        self.record(EngineCall::SetMuted(muted));
    }

    fn set_torch(&mut self, on: bool) {
        self.record(EngineCall::SetTorch(on));
    }

    fn set_idle_timer_disabled(&mut self, disabled: bool) {
        self.record(EngineCall::IdleTimerDisabled(disabled));
    }

    fn has_congestion(&self) -> bool {
        self.congested.load(Ordering::SeqCst)
    }

    fn is_audio_prepared(&self) -> bool {
        self.is_prepared()
    }

    fn is_video_prepared(&self) -> bool {
        self.is_prepared()
    }

    fn is_on_preview(&self) -> bool {
        self.devices_attached.load(Ordering::SeqCst)
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

pub fn audio_port(id: &str, port_type: AudioPortType) -> AudioPort {
    AudioPort {
        id: id.to_string(),
        name: id.to_string(),
        port_type,
        data_sources: Vec::new(),
    }
}
