//! Demo collector service
//!
//! Binds the profiling pipe endpoint, serves exactly one producer
//! connection through the stream metadata handshake, acknowledges it,
//! and then dispatches every received packet through the command
//! registry, accumulating decoded timeline records until the producer
//! hangs up.

use std::path::PathBuf;
use std::sync::atomic::AtomicU32;
use std::sync::Arc;

use anyhow::{anyhow, Context};
use clap::Parser;
use codec::{
    TimelineModel, CONNECTION_ACK_PACKET_ID, CONTROL_FAMILY, TIMELINE_DIRECTORY_PACKET_ID,
    TIMELINE_FAMILY, TIMELINE_MESSAGE_PACKET_ID,
};
use parking_lot::Mutex;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use transport::{
    CommandRegistry, PipeListener, PipeServerConfig, TimelineDirectoryHandler,
    TimelineMessageHandler, TransportError, DEFAULT_THREAD_ID_SIZE,
};

#[derive(Debug, Parser)]
#[command(name = "collector", about = "Profiling pipe collector")]
struct Args {
    /// Filesystem name of the endpoint to create.
    #[arg(long, default_value = "/tmp/tracepipe.sock")]
    socket: PathBuf,

    /// Dump raw packet bytes to the log, tagged by direction.
    #[arg(long)]
    echo: bool,

    /// Header wait bound per receive loop turn, in milliseconds.
    #[arg(long, default_value_t = 1000)]
    timeout_ms: u32,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();
    let config = PipeServerConfig {
        path: args.socket,
        echo_packets: args.echo,
        ..Default::default()
    };

    let listener = PipeListener::bind(config).context("creating the pipe endpoint")?;
    info!(path = %listener.local_path().display(), "waiting for a producer");

    let session = listener.accept().await.context("accepting the producer")?;
    session
        .wait_for_stream_metadata()
        .await
        .context("stream metadata handshake")?;

    let endianness = session
        .endianness()
        .ok_or_else(|| anyhow!("handshake finished without a negotiated byte order"))?;
    let versions = session
        .stream_metadata()
        .map(|metadata| metadata.packet_versions.clone())
        .ok_or_else(|| anyhow!("handshake finished without stream metadata"))?;

    session
        .send_packet(CONTROL_FAMILY, CONNECTION_ACK_PACKET_ID, &[])
        .await
        .context("acknowledging the connection")?;

    let thread_id_size = Arc::new(AtomicU32::new(DEFAULT_THREAD_ID_SIZE));
    let model = Arc::new(Mutex::new(TimelineModel::default()));

    let mut registry = CommandRegistry::new();
    registry.register(Box::new(TimelineDirectoryHandler::new(
        versions.resolve(TIMELINE_FAMILY, TIMELINE_DIRECTORY_PACKET_ID),
        endianness,
        Arc::clone(&thread_id_size),
    )))?;
    registry.register(Box::new(TimelineMessageHandler::new(
        versions.resolve(TIMELINE_FAMILY, TIMELINE_MESSAGE_PACKET_ID),
        endianness,
        Arc::clone(&thread_id_size),
        Arc::clone(&model),
    )))?;

    loop {
        match session.wait_for_packet(args.timeout_ms).await {
            Ok(None) => continue,
            Ok(Some(packet)) => {
                let family = packet.family();
                let packet_id = packet.packet_id();
                let version = versions.resolve(family, packet_id);
                if let Err(error) = registry.handle(family, packet_id, version, packet) {
                    error!(%error, family, packet_id, "dispatch failed");
                    break;
                }
            }
            Err(TransportError::ShortRead { got: 0, .. }) => {
                info!("producer disconnected");
                break;
            }
            Err(error) => {
                warn!(%error, "receive loop stopped");
                break;
            }
        }
    }
    session.close().await;

    let model = model.lock();
    info!(
        labels = model.labels.len(),
        entities = model.entities.len(),
        event_classes = model.event_classes.len(),
        relationships = model.relationships.len(),
        events = model.events.len(),
        "timeline capture finished"
    );
    Ok(())
}
