//! Command-line host for the RTMP publisher.
//!
//! Usage: `rtmp-publisher [config.json]`. Reads one command per line from
//! stdin: `start`, `stop`, `mute`, `unmute`, `camera`, `torch`, `status`,
//! `quit`.

use std::fs;
use std::io::{self, BufRead};
use std::path::Path;
use std::thread;

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use publisher_engine::{spawn_publisher, PublisherHandle};
use publisher_ipc::{PublisherCommand, PublisherConfig, PublisherEvent};
use publisher_transport::RtmpEngine;

/// Initialize logging.
fn init_logging() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            "rtmp_publisher=debug,publisher_engine=debug,publisher_audio=debug,publisher_transport=debug".into()
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn load_config(path: Option<&Path>) -> Result<PublisherConfig> {
    let Some(path) = path else {
        return Ok(PublisherConfig::default());
    };

    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Invalid config {}", path.display()))
}

fn parse_command(line: &str) -> Option<PublisherCommand> {
    let command = match line.trim() {
        "start" => PublisherCommand::StartPublish,
        "stop" => PublisherCommand::StopPublish,
        "mute" => PublisherCommand::SetAudioMuted(true),
        "unmute" => PublisherCommand::SetAudioMuted(false),
        "camera" => PublisherCommand::SwitchCamera,
        "torch" => PublisherCommand::ToggleTorch,
        _ => return None,
    };
    Some(command)
}

fn run_console(handle: &PublisherHandle) -> Result<()> {
    for line in io::stdin().lock().lines() {
        let line = line.context("Failed to read stdin")?;

        match line.trim() {
            "" => continue,
            "quit" | "exit" => break,
            "status" => println!("{:?}", handle.snapshot()),
            other => match parse_command(other) {
                Some(command) => handle.send(command)?,
                None => warn!("Unknown command: {}", other),
            },
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    init_logging();

    let config_path = std::env::args().nth(1);
    let config = load_config(config_path.as_deref().map(Path::new))?;
    info!(url = %config.target().publish_url(), "RTMP publisher starting");

    let engine = RtmpEngine::new().context("Failed to create RTMP engine")?;
    let handle = spawn_publisher(engine, &config).context("Failed to start publisher")?;

    let events = handle.events().clone();
    thread::Builder::new()
        .name("events".into())
        .spawn(move || {
            for event in events.iter() {
                match event {
                    PublisherEvent::StreamStateChanged(status) => info!(%status, "Stream state"),
                    PublisherEvent::RetriesExhausted { attempts } => {
                        warn!(attempts, "Giving up on reconnect")
                    }
                    other => info!(event = ?other, "Publisher event"),
                }
            }
        })
        .context("Failed to spawn event thread")?;

    if config.target().is_complete() {
        handle.send(PublisherCommand::StartPublish)?;
    }

    run_console(&handle)?;

    handle.shutdown();
    info!("RTMP publisher stopped");
    Ok(())
}
