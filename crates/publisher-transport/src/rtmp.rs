//! RTMP engine implementation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};
use parking_lot::RwLock;
use rml_rtmp::handshake::{Handshake, HandshakeProcessResult, PeerType};
use rml_rtmp::sessions::{
    ClientSession, ClientSessionConfig, ClientSessionEvent, ClientSessionResult,
    PublishRequestType, StreamMetadata,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::runtime::Runtime;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, trace, warn};
use url::Url;

use publisher_encoder::EncoderSettings;
use publisher_ipc::{AudioPort, AudioRoute, CameraPosition, Orientation};

use crate::connection::EngineStatus;
use crate::engine::StreamingEngine;
use crate::error::TransportError;
use crate::{TransportResult, DEFAULT_RTMP_PORT, STATUS_CHANNEL_CAPACITY};

/// Time allowed for the server to accept the connect request.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Time allowed for the stop-publishing handshake on close.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

/// A single write blocking longer than this marks the connection congested.
const CONGESTION_WRITE_TIME: Duration = Duration::from_millis(250);

const READ_BUFFER_SIZE: usize = 4096;

type StatusSink = Arc<RwLock<Option<Sender<EngineStatus>>>>;
type EncoderSlot = Arc<RwLock<Option<EncoderSettings>>>;

/// Requests from the engine to its connection task.
#[derive(Debug)]
enum ConnectionCommand {
    Publish(String),
    RefreshMetadata,
    Close,
}

/// State shared between the engine and one connection task.
#[derive(Debug, Default)]
struct ConnectionFlags {
    publishing: AtomicBool,
    closing: AtomicBool,
    congested: AtomicBool,
}

/// Streaming engine that publishes over RTMP using `rml_rtmp` sessions.
///
/// This engine owns the network side only. Capture devices are recorded but
/// not opened; encoder settings are announced to the server as stream
/// metadata once publishing starts.
pub struct RtmpEngine {
    runtime: Runtime,
    status_sink: StatusSink,
    encoder_settings: EncoderSlot,
    flags: Arc<ConnectionFlags>,
    control: Option<mpsc::UnboundedSender<ConnectionCommand>>,
    task: Option<JoinHandle<()>>,
    camera: Option<CameraPosition>,
    audio_ports: Vec<AudioPort>,
    audio_route: Option<AudioRoute>,
    muted: bool,
}

impl RtmpEngine {
    /// Create a new RTMP engine with its own network runtime.
    pub fn new() -> TransportResult<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("rtmp-engine")
            .enable_all()
            .build()?;

        Ok(Self {
            runtime,
            status_sink: Arc::new(RwLock::new(None)),
            encoder_settings: Arc::new(RwLock::new(None)),
            flags: Arc::default(),
            control: None,
            task: None,
            camera: None,
            audio_ports: Vec::new(),
            audio_route: None,
            muted: false,
        })
    }

    /// Offer the given audio input ports to the session.
    pub fn with_audio_inputs(mut self, ports: Vec<AudioPort>) -> Self {
        self.audio_ports = ports;
        self
    }

    /// The last encoder settings applied.
    pub fn encoder_settings(&self) -> Option<EncoderSettings> {
        *self.encoder_settings.read()
    }

    /// The selected audio route, if any.
    pub fn audio_route(&self) -> Option<&AudioRoute> {
        self.audio_route.as_ref()
    }

    /// Whether audio is muted.
    pub fn is_muted(&self) -> bool {
        self.muted
    }

    /// Drop the current connection at once. The task reports nothing more.
    fn stop_connection(&mut self) {
        self.flags.closing.store(true, Ordering::SeqCst);
        self.flags.congested.store(false, Ordering::Relaxed);
        self.control = None;
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    fn send_command(&self, command: ConnectionCommand) {
        match self.control {
            Some(ref control) => {
                if control.send(command).is_err() {
                    debug!("Connection task already finished");
                }
            }
            None => debug!(?command, "No connection, ignoring command"),
        }
    }
}

impl StreamingEngine for RtmpEngine {
    fn subscribe(&mut self) -> Receiver<EngineStatus> {
        let (tx, rx) = crossbeam_channel::bounded(STATUS_CHANNEL_CAPACITY);
        *self.status_sink.write() = Some(tx);
        rx
    }

    fn unsubscribe(&mut self) {
        self.status_sink.write().take();
    }

    #[instrument(name = "rtmp_connect", skip(self))]
    fn connect(&mut self, url: &str) {
        // A new connect replaces any attempt still in flight.
        self.stop_connection();

        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let flags = Arc::new(ConnectionFlags::default());
        let sink = Arc::clone(&self.status_sink);
        let encoder = Arc::clone(&self.encoder_settings);
        let task_flags = Arc::clone(&flags);
        let url = url.to_string();

        let task = self.runtime.spawn(async move {
            match connect_rtmp(&url, Arc::clone(&task_flags)).await {
                Ok(connection) => {
                    info!("RTMP connection established");
                    report(&sink, &task_flags, EngineStatus::ConnectSuccess);
                    run_connection(connection, control_rx, sink, encoder).await;
                }
                Err(e) => {
                    warn!("RTMP connect failed: {}", e);
                    report(&sink, &task_flags, EngineStatus::ConnectFailed);
                }
            }
        });

        self.flags = flags;
        self.control = Some(control_tx);
        self.task = Some(task);
    }

    fn publish(&mut self, stream_name: &str) {
        self.send_command(ConnectionCommand::Publish(stream_name.to_string()));
    }

    /// Unpublish the stream if it is live, then drop the connection.
    #[instrument(name = "rtmp_close", skip(self))]
    fn close(&mut self) {
        if !self.flags.publishing.load(Ordering::SeqCst) {
            info!("Closing RTMP connection");
            self.stop_connection();
            return;
        }

        info!("Unpublishing and closing RTMP connection");
        let flags = std::mem::take(&mut self.flags);
        flags.closing.store(true, Ordering::SeqCst);
        self.send_command(ConnectionCommand::Close);
        self.control = None;

        if let Some(task) = self.task.take() {
            let abort = task.abort_handle();
            self.runtime.spawn(async move {
                if tokio::time::timeout(CLOSE_TIMEOUT, task).await.is_err() {
                    warn!("RTMP close timed out, dropping connection");
                    abort.abort();
                }
            });
        }
    }

    fn apply_encoder_settings(&mut self, settings: &EncoderSettings) {
        *self.encoder_settings.write() = Some(*settings);
        if self.control.is_some() {
            self.send_command(ConnectionCommand::RefreshMetadata);
        }
    }

    fn set_video_orientation(&mut self, orientation: Orientation) {
        debug!(%orientation, "Capture orientation changed");
    }

    fn attach_devices(&mut self, camera: CameraPosition) -> TransportResult<()> {
        debug!(?camera, "Capture devices attached");
        self.camera = Some(camera);
        Ok(())
    }

    fn detach_devices(&mut self) {
        debug!("Capture devices detached");
        self.camera = None;
    }

    fn audio_inputs(&self) -> Vec<AudioPort> {
        self.audio_ports.clone()
    }

    fn set_audio_route(&mut self, route: &AudioRoute) -> TransportResult<()> {
        if !self.audio_ports.iter().any(|port| port.id == route.port_id) {
            return Err(TransportError::DeviceUnavailable(route.port_id.clone()));
        }
        self.audio_route = Some(route.clone());
        Ok(())
    }

    fn set_audio_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    fn set_torch(&mut self, on: bool) {
        debug!(on, "RTMP engine has no torch");
    }

    fn has_congestion(&self) -> bool {
        self.flags.congested.load(Ordering::Relaxed)
    }

    fn is_audio_prepared(&self) -> bool {
        let settings = *self.encoder_settings.read();
        self.camera.is_some() && settings.is_some_and(|s| s.audio_bitrate > 0)
    }

    fn is_video_prepared(&self) -> bool {
        self.camera.is_some() && self.encoder_settings.read().is_some()
    }

    fn is_on_preview(&self) -> bool {
        self.camera.is_some()
    }

    fn name(&self) -> &'static str {
        "rtmp"
    }
}

impl Drop for RtmpEngine {
    fn drop(&mut self) {
        self.unsubscribe();
        self.stop_connection();
    }
}

fn emit(sink: &StatusSink, status: EngineStatus) {
    if let Some(tx) = sink.read().as_ref() {
        if let Err(e) = tx.try_send(status) {
            warn!("Failed to deliver engine status: {}", e);
        }
    }
}

/// Emit a status unless the engine has already let go of the connection.
fn report(sink: &StatusSink, flags: &ConnectionFlags, status: EngineStatus) {
    if flags.closing.load(Ordering::SeqCst) {
        debug!(?status, "Connection closing, status not reported");
        return;
    }
    emit(sink, status);
}

/// Split an RTMP URL into host, port and application name.
fn parse_rtmp_url(url: &str) -> TransportResult<(String, u16, String)> {
    let parsed = Url::parse(url).map_err(|e| TransportError::InvalidUrl(e.to_string()))?;

    if parsed.scheme() != "rtmp" {
        return Err(TransportError::InvalidUrl(format!(
            "unsupported scheme: {}",
            parsed.scheme()
        )));
    }

    let host = parsed
        .host_str()
        .ok_or_else(|| TransportError::InvalidUrl("Missing host".to_string()))?
        .to_string();
    let port = parsed.port().unwrap_or(DEFAULT_RTMP_PORT);
    let app_name = parsed.path().trim_matches('/').to_string();

    if app_name.is_empty() {
        return Err(TransportError::InvalidUrl(
            "Missing application name in URL path".to_string(),
        ));
    }

    Ok((host, port, app_name))
}

/// RTMP connection with session state.
struct RtmpConnection {
    stream: TcpStream,
    session: ClientSession,
    flags: Arc<ConnectionFlags>,
}

impl RtmpConnection {
    async fn send(&mut self, result: ClientSessionResult) -> TransportResult<()> {
        if let ClientSessionResult::OutboundResponse(packet) = result {
            let started = Instant::now();
            self.stream.write_all(&packet.bytes).await?;
            self.flags
                .congested
                .store(started.elapsed() > CONGESTION_WRITE_TIME, Ordering::Relaxed);
        }
        Ok(())
    }

    fn is_publishing(&self) -> bool {
        self.flags.publishing.load(Ordering::SeqCst)
    }

    async fn await_connection_accepted(&mut self) -> TransportResult<()> {
        let mut read_buf = vec![0u8; READ_BUFFER_SIZE];

        loop {
            let n = self.stream.read(&mut read_buf).await?;
            if n == 0 {
                return Err(TransportError::Connection("Connection closed".to_string()));
            }

            let results = self
                .session
                .handle_input(&read_buf[..n])
                .map_err(|e| TransportError::Protocol(format!("Session input error: {:?}", e)))?;

            let mut accepted = false;
            for result in results {
                match result {
                    ClientSessionResult::RaisedEvent(
                        ClientSessionEvent::ConnectionRequestAccepted,
                    ) => {
                        debug!("Connection accepted by server");
                        accepted = true;
                    }
                    ClientSessionResult::RaisedEvent(
                        ClientSessionEvent::ConnectionRequestRejected { description },
                    ) => {
                        return Err(TransportError::ConnectionRejected(description));
                    }
                    ClientSessionResult::RaisedEvent(event) => {
                        trace!("Received event: {:?}", event);
                    }
                    other => self.send(other).await?,
                }
            }

            if accepted {
                return Ok(());
            }
        }
    }

    async fn handle_command(
        &mut self,
        command: ConnectionCommand,
        encoder: &EncoderSlot,
    ) -> TransportResult<()> {
        match command {
            ConnectionCommand::Publish(stream_name) => {
                debug!(stream_name = %stream_name, "Requesting publish");
                let result = self
                    .session
                    .request_publishing(stream_name, PublishRequestType::Live)
                    .map_err(|e| {
                        TransportError::Protocol(format!("Publish request failed: {:?}", e))
                    })?;
                self.send(result).await
            }
            ConnectionCommand::RefreshMetadata => {
                let settings = *encoder.read();
                match settings {
                    Some(settings) if self.is_publishing() => self.send_metadata(&settings).await,
                    _ => Ok(()),
                }
            }
            ConnectionCommand::Close => self.finish().await,
        }
    }

    async fn handle_input(
        &mut self,
        bytes: &[u8],
        sink: &StatusSink,
        encoder: &EncoderSlot,
    ) -> TransportResult<()> {
        let results = self
            .session
            .handle_input(bytes)
            .map_err(|e| TransportError::Protocol(format!("Session input error: {:?}", e)))?;

        for result in results {
            match result {
                ClientSessionResult::RaisedEvent(ClientSessionEvent::PublishRequestAccepted) => {
                    info!("Publish request accepted");
                    self.flags.publishing.store(true, Ordering::SeqCst);
                    let settings = *encoder.read();
                    if let Some(settings) = settings {
                        self.send_metadata(&settings).await?;
                    }
                    report(sink, &self.flags, EngineStatus::PublishStart);
                }
                ClientSessionResult::RaisedEvent(event) => {
                    trace!("Received event: {:?}", event);
                }
                other => self.send(other).await?,
            }
        }

        Ok(())
    }

    async fn send_metadata(&mut self, settings: &EncoderSettings) -> TransportResult<()> {
        let mut metadata = StreamMetadata::new();
        metadata.video_width = Some(settings.width);
        metadata.video_height = Some(settings.height);
        metadata.video_bitrate_kbps = Some(settings.bitrate / 1000);
        metadata.audio_bitrate_kbps = Some(settings.audio_bitrate / 1000);

        let result = self
            .session
            .publish_metadata(&metadata)
            .map_err(|e| TransportError::Protocol(format!("Metadata publish failed: {:?}", e)))?;
        self.send(result).await
    }

    /// Tell the server the stream is finished, then close the socket.
    async fn finish(&mut self) -> TransportResult<()> {
        if self.is_publishing() {
            debug!("Stopping publish");
            let results = self.session.stop_publishing().map_err(|e| {
                TransportError::Protocol(format!("Stop publishing failed: {:?}", e))
            })?;
            for result in results {
                self.send(result).await?;
            }
            self.flags.publishing.store(false, Ordering::SeqCst);
        }

        self.stream.shutdown().await?;
        Ok(())
    }
}

async fn perform_handshake(stream: &mut TcpStream) -> TransportResult<Vec<u8>> {
    let mut handshake = Handshake::new(PeerType::Client);

    let p0_p1 = handshake
        .generate_outbound_p0_and_p1()
        .map_err(|e| TransportError::Protocol(format!("Handshake generation failed: {:?}", e)))?;
    stream.write_all(&p0_p1).await?;

    let mut read_buf = vec![0u8; READ_BUFFER_SIZE];
    loop {
        let n = stream.read(&mut read_buf).await?;
        if n == 0 {
            return Err(TransportError::Connection(
                "Connection closed during handshake".to_string(),
            ));
        }

        let result = handshake
            .process_bytes(&read_buf[..n])
            .map_err(|e| TransportError::Protocol(format!("Handshake failed: {:?}", e)))?;

        match result {
            HandshakeProcessResult::InProgress { response_bytes } => {
                if !response_bytes.is_empty() {
                    stream.write_all(&response_bytes).await?;
                }
            }
            HandshakeProcessResult::Completed {
                response_bytes,
                remaining_bytes,
            } => {
                if !response_bytes.is_empty() {
                    stream.write_all(&response_bytes).await?;
                }
                return Ok(remaining_bytes);
            }
        }
    }
}

async fn connect_rtmp(url: &str, flags: Arc<ConnectionFlags>) -> TransportResult<RtmpConnection> {
    let (host, port, app_name) = parse_rtmp_url(url)?;

    info!(host = %host, port = port, app = %app_name, "Connecting to RTMP server");

    let mut stream = TcpStream::connect((host.as_str(), port))
        .await
        .map_err(|e| TransportError::Connection(format!("TCP connect failed: {}", e)))?;

    debug!("TCP connection established, starting handshake");
    let leftover_bytes = perform_handshake(&mut stream).await?;

    let (session, initial_results) = ClientSession::new(ClientSessionConfig::new())
        .map_err(|e| TransportError::Protocol(format!("Session creation failed: {:?}", e)))?;

    let mut connection = RtmpConnection {
        stream,
        session,
        flags,
    };

    for result in initial_results {
        connection.send(result).await?;
    }

    if !leftover_bytes.is_empty() {
        let results = connection
            .session
            .handle_input(&leftover_bytes)
            .map_err(|e| TransportError::Protocol(format!("Session input error: {:?}", e)))?;
        for result in results {
            connection.send(result).await?;
        }
    }

    debug!(app = %app_name, "Requesting RTMP connection");
    let request = connection
        .session
        .request_connection(app_name)
        .map_err(|e| TransportError::Protocol(format!("Connection request failed: {:?}", e)))?;
    connection.send(request).await?;

    tokio::time::timeout(CONNECT_TIMEOUT, connection.await_connection_accepted())
        .await
        .map_err(|_| TransportError::Timeout("connection acceptance"))??;

    Ok(connection)
}

/// Drive an established connection until it ends or the engine drops it.
async fn run_connection(
    mut connection: RtmpConnection,
    mut control_rx: mpsc::UnboundedReceiver<ConnectionCommand>,
    sink: StatusSink,
    encoder: EncoderSlot,
) {
    let mut read_buf = vec![0u8; READ_BUFFER_SIZE];
    let flags = Arc::clone(&connection.flags);

    loop {
        let outcome = tokio::select! {
            command = control_rx.recv() => match command {
                Some(ConnectionCommand::Close) => {
                    if let Err(e) = connection.finish().await {
                        debug!("RTMP close incomplete: {}", e);
                    }
                    info!("RTMP connection closed");
                    return;
                }
                Some(command) => connection.handle_command(command, &encoder).await,
                None => {
                    debug!("Connection released by engine");
                    return;
                }
            },
            read = connection.stream.read(&mut read_buf) => match read {
                Ok(0) => {
                    info!("Server closed the connection");
                    report(&sink, &flags, EngineStatus::ConnectClosed);
                    return;
                }
                Ok(n) => connection.handle_input(&read_buf[..n], &sink, &encoder).await,
                Err(e) => Err(TransportError::Io(e)),
            },
        };

        if let Err(e) = outcome {
            warn!("RTMP connection error: {}", e);
            report(&sink, &flags, EngineStatus::IoError(e.to_string()));
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use rml_rtmp::sessions::{
        ServerSession, ServerSessionConfig, ServerSessionEvent, ServerSessionResult,
    };
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;

    use publisher_ipc::{AudioPortType, VideoSettings};

    use super::*;

    const WAIT: Duration = Duration::from_secs(5);

    /// What the loopback server observed from the client.
    #[derive(Debug, Clone, PartialEq, Eq)]
    enum ServerSaw {
        Publish(String),
        Metadata(u32, u32),
        PublishFinished,
    }

    /// Minimal RTMP server accepting one connection and every request.
    struct LoopbackServer {
        _runtime: Runtime,
        url: String,
        seen: Receiver<ServerSaw>,
        close_tx: Option<oneshot::Sender<()>>,
    }

    impl LoopbackServer {
        fn start() -> Self {
            let runtime = Runtime::new().unwrap();
            let listener = runtime.block_on(TcpListener::bind("127.0.0.1:0")).unwrap();
            let port = listener.local_addr().unwrap().port();
            let (seen_tx, seen) = crossbeam_channel::unbounded();
            let (close_tx, close_rx) = oneshot::channel();

            runtime.spawn(serve(listener, seen_tx, close_rx));

            Self {
                _runtime: runtime,
                url: format!("rtmp://127.0.0.1:{port}/live"),
                seen,
                close_tx: Some(close_tx),
            }
        }

        fn next(&self) -> ServerSaw {
            self.seen.recv_timeout(WAIT).unwrap()
        }

        /// Drop the client socket from the server side.
        fn disconnect(&mut self) {
            if let Some(tx) = self.close_tx.take() {
                let _ = tx.send(());
            }
        }
    }

    async fn serve(
        listener: TcpListener,
        seen: Sender<ServerSaw>,
        mut close_rx: oneshot::Receiver<()>,
    ) {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = vec![0u8; READ_BUFFER_SIZE];

        let mut handshake = Handshake::new(PeerType::Server);
        let leftover = loop {
            let n = socket.read(&mut buf).await.unwrap();
            match handshake.process_bytes(&buf[..n]).unwrap() {
                HandshakeProcessResult::InProgress { response_bytes } => {
                    socket.write_all(&response_bytes).await.unwrap();
                }
                HandshakeProcessResult::Completed {
                    response_bytes,
                    remaining_bytes,
                } => {
                    socket.write_all(&response_bytes).await.unwrap();
                    break remaining_bytes;
                }
            }
        };

        let (mut session, initial) = ServerSession::new(ServerSessionConfig::new()).unwrap();
        let mut queue: VecDeque<ServerSessionResult> = initial.into();
        queue.extend(session.handle_input(&leftover).unwrap());

        loop {
            while let Some(result) = queue.pop_front() {
                match result {
                    ServerSessionResult::OutboundResponse(packet) => {
                        socket.write_all(&packet.bytes).await.unwrap();
                    }
                    ServerSessionResult::RaisedEvent(event) => match event {
                        ServerSessionEvent::ConnectionRequested { request_id, .. } => {
                            queue.extend(session.accept_request(request_id).unwrap());
                        }
                        ServerSessionEvent::PublishStreamRequested {
                            request_id,
                            stream_key,
                            ..
                        } => {
                            let _ = seen.send(ServerSaw::Publish(stream_key));
                            queue.extend(session.accept_request(request_id).unwrap());
                        }
                        ServerSessionEvent::StreamMetadataChanged { metadata, .. } => {
                            let _ = seen.send(ServerSaw::Metadata(
                                metadata.video_width.unwrap_or_default(),
                                metadata.video_height.unwrap_or_default(),
                            ));
                        }
                        ServerSessionEvent::PublishStreamFinished { .. } => {
                            let _ = seen.send(ServerSaw::PublishFinished);
                        }
                        _ => {}
                    },
                    ServerSessionResult::UnhandleableMessageReceived(_) => {}
                }
            }

            tokio::select! {
                read = socket.read(&mut buf) => match read {
                    Ok(0) | Err(_) => return,
                    Ok(n) => queue.extend(session.handle_input(&buf[..n]).unwrap()),
                },
                _ = &mut close_rx => return,
            }
        }
    }

    fn settings(orientation: Orientation) -> EncoderSettings {
        EncoderSettings::resolve(&VideoSettings::default(), orientation).unwrap()
    }

    fn publishing_engine(server: &LoopbackServer) -> (RtmpEngine, Receiver<EngineStatus>) {
        let mut engine = RtmpEngine::new().unwrap();
        let statuses = engine.subscribe();
        engine.attach_devices(CameraPosition::Back).unwrap();
        engine.apply_encoder_settings(&settings(Orientation::Portrait));

        engine.connect(&server.url);
        assert_eq!(statuses.recv_timeout(WAIT).unwrap(), EngineStatus::ConnectSuccess);

        engine.publish("s1");
        assert_eq!(statuses.recv_timeout(WAIT).unwrap(), EngineStatus::PublishStart);
        assert_eq!(server.next(), ServerSaw::Publish("s1".to_string()));
        assert_eq!(server.next(), ServerSaw::Metadata(720, 1280));

        (engine, statuses)
    }

    #[test]
    fn test_publish_refresh_and_server_close() {
        let mut server = LoopbackServer::start();
        let (mut engine, statuses) = publishing_engine(&server);

        engine.apply_encoder_settings(&settings(Orientation::LandscapeLeft));
        assert_eq!(server.next(), ServerSaw::Metadata(1280, 720));
        assert!(!engine.has_congestion());

        server.disconnect();
        assert_eq!(statuses.recv_timeout(WAIT).unwrap(), EngineStatus::ConnectClosed);
    }

    #[test]
    fn test_close_unpublishes_before_disconnecting() {
        let server = LoopbackServer::start();
        let (mut engine, statuses) = publishing_engine(&server);

        engine.close();

        assert_eq!(server.next(), ServerSaw::PublishFinished);
        assert!(statuses.recv_timeout(Duration::from_millis(300)).is_err());
    }

    #[test]
    fn test_parse_rtmp_url() {
        let (host, port, app) = parse_rtmp_url("rtmp://live.example.com/app").unwrap();
        assert_eq!(host, "live.example.com");
        assert_eq!(port, DEFAULT_RTMP_PORT);
        assert_eq!(app, "app");

        let (_, port, app) = parse_rtmp_url("rtmp://127.0.0.1:1936/live/app/").unwrap();
        assert_eq!(port, 1936);
        assert_eq!(app, "live/app");
    }

    #[test]
    fn test_parse_rtmp_url_rejects_bad_input() {
        assert!(matches!(
            parse_rtmp_url("http://example.com/app"),
            Err(TransportError::InvalidUrl(_))
        ));
        assert!(matches!(
            parse_rtmp_url("rtmp://example.com"),
            Err(TransportError::InvalidUrl(_))
        ));
        assert!(matches!(parse_rtmp_url(""), Err(TransportError::InvalidUrl(_))));
    }

    #[test]
    fn test_invalid_url_reports_connect_failed() {
        let mut engine = RtmpEngine::new().unwrap();
        let statuses = engine.subscribe();

        engine.connect("/app");

        assert_eq!(
            statuses.recv_timeout(Duration::from_secs(5)).unwrap(),
            EngineStatus::ConnectFailed
        );
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let mut engine = RtmpEngine::new().unwrap();
        let statuses = engine.subscribe();
        engine.unsubscribe();

        engine.connect("/app");

        assert!(statuses.recv_timeout(Duration::from_millis(200)).is_err());
    }

    #[test]
    fn test_readiness_follows_devices_and_encoder() {
        let mut engine = RtmpEngine::new().unwrap();
        assert!(!engine.is_on_preview());
        assert!(!engine.is_video_prepared());

        engine.attach_devices(CameraPosition::Front).unwrap();
        assert!(engine.is_on_preview());
        assert!(!engine.is_video_prepared());

        engine.apply_encoder_settings(&settings(Orientation::Portrait));
        assert!(engine.is_video_prepared());
        assert!(engine.is_audio_prepared());

        engine.detach_devices();
        assert!(!engine.is_on_preview());
        assert!(!engine.is_audio_prepared());
    }

    #[test]
    fn test_audio_route_requires_known_port() {
        let mut engine = RtmpEngine::new().unwrap().with_audio_inputs(vec![AudioPort {
            id: "mic".to_string(),
            name: "Built-in".to_string(),
            port_type: AudioPortType::BuiltInMic,
            data_sources: Vec::new(),
        }]);

        let route = AudioRoute {
            port_id: "mic".to_string(),
            data_source_id: None,
        };
        engine.set_audio_route(&route).unwrap();
        assert_eq!(engine.audio_route(), Some(&route));

        let missing = AudioRoute {
            port_id: "bt".to_string(),
            data_source_id: None,
        };
        assert!(matches!(
            engine.set_audio_route(&missing),
            Err(TransportError::DeviceUnavailable(_))
        ));
    }
}
