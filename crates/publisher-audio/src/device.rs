//! Audio input selection.

use tracing::{debug, instrument};

use publisher_ipc::{AudioInputType, AudioPort, AudioPortType, AudioRoute};

use crate::error::AudioError;
use crate::AudioResult;

/// Port type that serves an input type.
pub fn port_type_for(input: AudioInputType) -> AudioPortType {
    match input {
        AudioInputType::Bluetooth => AudioPortType::BluetoothHfp,
        AudioInputType::Speaker => AudioPortType::BuiltInMic,
        AudioInputType::Headset => AudioPortType::HeadsetMic,
    }
}

/// Pick the audio route for an input type from the available ports.
///
/// The first port with a matching type wins. For the built-in microphone
/// the front-facing data source is selected when the port exposes one.
#[instrument(name = "select_audio_route", skip(ports))]
pub fn select_route(ports: &[AudioPort], input: AudioInputType) -> AudioResult<AudioRoute> {
    let wanted = port_type_for(input);

    let port = ports
        .iter()
        .find(|port| port.port_type == wanted)
        .ok_or(AudioError::NoMatchingInput(input))?;

    let data_source_id = match input {
        AudioInputType::Speaker => port
            .data_sources
            .iter()
            .find(|source| source.front_facing)
            .map(|source| source.id.clone()),
        _ => None,
    };

    debug!(port = %port.id, data_source = ?data_source_id, "Selected audio input");

    Ok(AudioRoute {
        port_id: port.id.clone(),
        data_source_id,
    })
}
