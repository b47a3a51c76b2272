//! Publish session state machine and its driver thread.
//!
//! The [`Session`] owns connection state and the reconnect policy, the
//! dispatcher routes engine statuses into it, and the [`Publisher`] thread
//! serialises host commands, engine statuses and reconnect deadlines.

mod dispatcher;
mod error;
mod orchestrator;
mod orientation;
mod session;

#[cfg(test)]
mod testing;

pub use dispatcher::Notifier;
pub use error::PublisherError;
pub use orchestrator::{Publisher, PublisherHandle};
pub use orientation::{capture_orientation, OrientationTracker};
pub use session::Session;

use std::sync::Arc;
use std::thread;

use parking_lot::RwLock;
use tracing::{error, info};

use publisher_ipc::{command_channel, event_channel, PublisherConfig, SessionSnapshot};
use publisher_transport::StreamingEngine;

/// Result type for publisher operations.
pub type PublisherResult<T> = Result<T, PublisherError>;

/// Start a publisher for `engine` on its own thread.
///
/// The engine is attached on the publisher thread before this returns.
pub fn spawn_publisher<E>(engine: E, config: &PublisherConfig) -> PublisherResult<PublisherHandle>
where
    E: StreamingEngine + 'static,
{
    let (command_tx, command_rx) = command_channel();
    let (event_tx, event_rx) = event_channel();
    let snapshot = Arc::new(RwLock::new(SessionSnapshot::default()));
    let (ready_tx, ready_rx) = crossbeam_channel::bounded(1);

    let session = Session::new(engine, config, Notifier::new(event_tx));
    let shared = Arc::clone(&snapshot);

    let thread = thread::Builder::new()
        .name("publisher".into())
        .spawn(move || match Publisher::new(session, command_rx, shared) {
            Ok(mut publisher) => {
                let _ = ready_tx.send(Ok(()));
                publisher.run();
            }
            Err(e) => {
                error!("Publisher failed to attach: {}", e);
                let _ = ready_tx.send(Err(e));
            }
        })?;

    match ready_rx.recv() {
        Ok(Ok(())) => {
            info!("Publisher started");
            Ok(PublisherHandle::new(command_tx, event_rx, snapshot, thread))
        }
        Ok(Err(e)) => {
            let _ = thread.join();
            Err(e)
        }
        Err(_) => {
            let _ = thread.join();
            Err(PublisherError::ChannelDisconnected)
        }
    }
}
