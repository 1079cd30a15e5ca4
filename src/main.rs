//! `chunkcast` binary: send a file as chunked UDP datagrams or run a
//! collector that reassembles and stores them.

mod cli;

use std::error::Error;

use chunkcast::{
    config,
    fragment::{Fragmenter, FrameId, FrameIdAllocator},
    sink::FileSink,
    transport::{ChunkSender, Receiver, ReceiverConfig},
};
use clap::Parser;
use cli::{Cli, Command, ReceiveArgs, SendArgs};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match Cli::parse().command {
        Command::Receive(args) => receive(args).await,
        Command::Send(args) => send(args).await,
    }
}

async fn receive(args: ReceiveArgs) -> Result<(), Box<dyn Error>> {
    let receiver_config = ReceiverConfig {
        bind: args.bind,
        transfer: config::transfer_config(
            args.max_payload,
            args.timeout_secs,
            args.max_in_flight,
            args.max_artifact_size,
        )?,
        queue_depth: config::queue_depth(args.queue_depth)?,
        ..ReceiverConfig::default()
    };

    let mut sink = FileSink::new(&args.output);
    if let Some(path) = args.metadata {
        sink = sink.with_metadata_path(path);
    }
    if let Some(location) = config::geo_point(args.lat, args.lon)? {
        sink = sink.with_location(location);
    }

    let receiver = Receiver::bind(receiver_config, sink).await?;
    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("interrupt received; shutting down"),
            Err(error) => warn!(%error, "failed to listen for interrupt; shutting down"),
        }
        signal.cancel();
    });

    let stats = receiver.run(shutdown).await;
    info!(
        accepted = stats.accepted,
        duplicates = stats.duplicates,
        completed = stats.completed,
        "collector finished"
    );
    Ok(())
}

async fn send(args: SendArgs) -> Result<(), Box<dyn Error>> {
    // Limits other than the chunk size only matter to the receiver.
    let transfer = config::transfer_config(args.max_payload, 1, 1, None)?;
    let ids = args
        .start_id
        .map_or_else(FrameIdAllocator::new, |id| FrameIdAllocator::with_start(FrameId::new(id)));
    let sender = ChunkSender::with_fragmenter(
        args.to,
        Fragmenter::with_allocator(transfer.max_payload, ids),
    );

    let artifact = tokio::fs::read(&args.file).await?;
    let report = sender.send_artifact(artifact).await?;
    if !report.is_complete() {
        warn!(
            frame_id = %report.frame_id,
            sent = report.sent,
            total_chunks = report.total_chunks,
            "some chunks could not be sent"
        );
    }
    Ok(())
}
