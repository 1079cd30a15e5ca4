//! Shared utilities for integration tests.
//!
//! Provides a sink that forwards completed artifacts over a channel and a
//! harness that runs a [`Receiver`] on an ephemeral loopback port.

// Items in this shared module may not be used by all test binaries that import it.
#![allow(
    dead_code,
    reason = "shared test utilities are not used by all test binaries"
)]

use std::{net::SocketAddr, time::Duration};

use async_trait::async_trait;
use chunkcast::{
    ArtifactSink,
    CompletedArtifact,
    ReassemblyStats,
    Receiver,
    ReceiverConfig,
    SinkError,
    sink::PersistedArtifact,
};
use rstest::fixture;
use tokio::{net::UdpSocket, sync::mpsc, task::JoinHandle, time::timeout};
use tokio_util::sync::CancellationToken;

/// How long a test waits for an artifact before giving up.
pub const ARRIVAL_TIMEOUT: Duration = Duration::from_secs(5);

/// Sink that hands every completed artifact to a test over a channel.
#[derive(Clone, Debug)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<CompletedArtifact>,
}

impl ChannelSink {
    /// Create a sink and the receiving end of its channel.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<CompletedArtifact>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl ArtifactSink for ChannelSink {
    async fn persist(&self, artifact: &CompletedArtifact) -> Result<PersistedArtifact, SinkError> {
        // A test that stopped listening has already failed or finished.
        let _ = self.tx.send(artifact.clone());
        Ok(PersistedArtifact {
            frame_id: artifact.frame_id(),
            image_path: "channel".into(),
            metadata_path: "channel".into(),
            len: artifact.payload().len(),
        })
    }
}

/// Receiver configuration bound to an ephemeral loopback port.
#[fixture]
pub fn loopback_config() -> ReceiverConfig {
    ReceiverConfig {
        bind: "127.0.0.1:0".parse().expect("valid loopback address"),
        ..ReceiverConfig::default()
    }
}

/// A receiver running in the background.
pub struct RunningReceiver {
    pub addr: SocketAddr,
    shutdown: CancellationToken,
    handle: JoinHandle<ReassemblyStats>,
}

impl RunningReceiver {
    /// Bind `config` with `sink` and start receiving.
    pub async fn start<S: ArtifactSink + 'static>(config: ReceiverConfig, sink: S) -> Self {
        let receiver = Receiver::bind(config, sink).await.expect("bind receiver");
        let addr = receiver.local_addr().expect("receiver address");
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(receiver.run(shutdown.clone()));
        Self {
            addr,
            shutdown,
            handle,
        }
    }

    /// Stop the receiver and return its counters.
    pub async fn stop(self) -> ReassemblyStats {
        self.shutdown.cancel();
        self.handle.await.expect("receiver task panicked")
    }
}

/// Wait for the next artifact, failing the test after [`ARRIVAL_TIMEOUT`].
pub async fn next_artifact(rx: &mut mpsc::UnboundedReceiver<CompletedArtifact>) -> CompletedArtifact {
    timeout(ARRIVAL_TIMEOUT, rx.recv())
        .await
        .expect("artifact did not arrive in time")
        .expect("sink channel closed")
}

/// Send raw datagrams to `addr` from a fresh socket.
pub async fn send_raw<I, D>(addr: SocketAddr, datagrams: I)
where
    I: IntoIterator<Item = D>,
    D: AsRef<[u8]>,
{
    let socket = UdpSocket::bind("127.0.0.1:0").await.expect("bind client");
    for datagram in datagrams {
        socket
            .send_to(datagram.as_ref(), addr)
            .await
            .expect("send datagram");
    }
}
