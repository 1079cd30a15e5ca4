//! Command line interface for the `chunkcast` binary.
//!
//! Also compiled by the build script to render the manual page, so this
//! module only depends on `clap` and the standard library.

use std::{
    net::{Ipv4Addr, SocketAddr},
    path::PathBuf,
};

use clap::{Args, Parser, Subcommand};

/// Command line arguments for the `chunkcast` binary.
#[derive(Debug, Parser)]
#[command(
    name = "chunkcast",
    version,
    about = "Send and collect artifacts as chunked UDP datagrams"
)]
pub struct Cli {
    /// Operation to perform.
    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands of the `chunkcast` binary.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Collect chunks and persist every completed artifact.
    Receive(ReceiveArgs),
    /// Send one file as a chunked artifact.
    Send(SendArgs),
}

/// Arguments for `chunkcast receive`.
#[derive(Debug, Args)]
pub struct ReceiveArgs {
    /// Address to listen on.
    #[arg(long, default_value_t = SocketAddr::from((Ipv4Addr::UNSPECIFIED, 9200)))]
    pub bind: SocketAddr,
    /// Directory that receives `image_<id>/image_<id>.jpg`.
    #[arg(short, long, default_value = ".")]
    pub output: PathBuf,
    /// Metadata index path. Defaults to `<output>/data/esp32.json`.
    #[arg(long)]
    pub metadata: Option<PathBuf>,
    /// Latitude recorded with every artifact.
    #[arg(long, requires = "lon", allow_negative_numbers = true)]
    pub lat: Option<f64>,
    /// Longitude recorded with every artifact.
    #[arg(long, requires = "lat", allow_negative_numbers = true)]
    pub lon: Option<f64>,
    /// Largest chunk payload senders use, in bytes.
    #[arg(long, default_value_t = 1400)]
    pub max_payload: u16,
    /// Seconds before an incomplete artifact is discarded.
    #[arg(long, default_value_t = 30)]
    pub timeout_secs: u64,
    /// Incomplete artifacts tracked at once.
    #[arg(long, default_value_t = 64)]
    pub max_in_flight: usize,
    /// Largest artifact accepted, in bytes. Defaults to the most a sender
    /// with `--max-payload` can describe.
    #[arg(long)]
    pub max_artifact_size: Option<usize>,
    /// Completed artifacts that may wait for disk before intake pauses.
    #[arg(long, default_value_t = 8)]
    pub queue_depth: usize,
}

/// Arguments for `chunkcast send`.
#[derive(Debug, Args)]
pub struct SendArgs {
    /// File to send.
    pub file: PathBuf,
    /// Collector address.
    #[arg(long, default_value_t = SocketAddr::from((Ipv4Addr::LOCALHOST, 9200)))]
    pub to: SocketAddr,
    /// Largest chunk payload, in bytes.
    #[arg(long, default_value_t = 1400)]
    pub max_payload: u16,
    /// Frame identifier to send under instead of the first allocated one.
    #[arg(long)]
    pub start_id: Option<u16>,
}
