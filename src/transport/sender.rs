//! Fire-and-forget sender for chunked artifacts.

use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};

use bytes::Bytes;
use tokio::net::UdpSocket;
use tracing::{debug, info};

use super::TransportError;
use crate::{
    fragment::{Fragmenter, FrameId, TransferConfig},
    metrics,
};

/// Outcome of one [`ChunkSender::send_artifact`] call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SendReport {
    /// Identifier the artifact was sent under.
    pub frame_id: FrameId,
    /// Number of chunks the artifact was split into.
    pub total_chunks: u16,
    /// Number of datagrams the socket accepted.
    pub sent: u16,
}

impl SendReport {
    /// Whether every chunk was handed to the socket.
    ///
    /// Delivery is still unconfirmed; a complete report only rules out
    /// local send failures.
    #[must_use]
    pub const fn is_complete(&self) -> bool { self.sent == self.total_chunks }
}

/// Sends artifacts to a single collector address.
///
/// Each call binds a fresh ephemeral socket, so the sender holds no socket
/// between artifacts. Chunks are sent in order with no acknowledgement and
/// no retransmission.
///
/// # Examples
///
/// ```no_run
/// use chunkcast::{fragment::TransferConfig, transport::ChunkSender};
///
/// # async fn demo() -> Result<(), chunkcast::transport::TransportError> {
/// let sender = ChunkSender::new("127.0.0.1:9200".parse().unwrap(), &TransferConfig::default());
/// let report = sender.send_artifact(vec![0xff_u8, 0xd8, 0xff, 0xd9]).await?;
/// assert_eq!(report.total_chunks, 1);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ChunkSender {
    target: SocketAddr,
    fragmenter: Fragmenter,
}

impl ChunkSender {
    /// Create a sender targeting `target` with the chunk size from `config`.
    #[must_use]
    pub const fn new(target: SocketAddr, config: &TransferConfig) -> Self {
        Self::with_fragmenter(target, Fragmenter::new(config.max_payload))
    }

    /// Create a sender that splits artifacts with `fragmenter`.
    #[must_use]
    pub const fn with_fragmenter(target: SocketAddr, fragmenter: Fragmenter) -> Self {
        Self { target, fragmenter }
    }

    /// Return the collector address.
    #[must_use]
    pub const fn target(&self) -> SocketAddr { self.target }

    /// Return the fragmenter used to split artifacts.
    #[must_use]
    pub const fn fragmenter(&self) -> &Fragmenter { &self.fragmenter }

    /// Split `artifact` and send every chunk to the collector.
    ///
    /// A failed datagram is logged and skipped; the receiver sees an
    /// incomplete frame and evicts it later.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Fragmentation`] when the artifact is too
    /// large to describe, and [`TransportError::Bind`] or
    /// [`TransportError::Connect`] when no socket is available. No datagram
    /// is sent in any of these cases.
    pub async fn send_artifact(
        &self,
        artifact: impl Into<Bytes>,
    ) -> Result<SendReport, TransportError> {
        let batch = self.fragmenter.fragment(artifact)?;
        let socket = self.connect().await?;

        let frame_id = batch.frame_id();
        let total_chunks = u16::try_from(batch.len()).unwrap_or(u16::MAX);
        let mut sent: u16 = 0;
        for chunk in batch.chunks() {
            match socket.send(&chunk.to_datagram()).await {
                Ok(_) => sent = sent.saturating_add(1),
                Err(error) => debug!(
                    %frame_id,
                    chunk_id = chunk.header().chunk_id(),
                    %error,
                    "chunk send failed"
                ),
            }
        }
        metrics::add_chunks_sent(u64::from(sent));

        info!(
            %frame_id,
            total_chunks,
            sent,
            target = %self.target,
            "artifact sent"
        );
        Ok(SendReport {
            frame_id,
            total_chunks,
            sent,
        })
    }

    async fn connect(&self) -> Result<UdpSocket, TransportError> {
        let local = if self.target.is_ipv4() {
            SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0))
        } else {
            SocketAddr::from((Ipv6Addr::UNSPECIFIED, 0))
        };
        let socket = UdpSocket::bind(local)
            .await
            .map_err(|source| TransportError::Bind {
                addr: local,
                source,
            })?;
        socket
            .connect(self.target)
            .await
            .map_err(|source| TransportError::Connect {
                addr: self.target,
                source,
            })?;
        Ok(socket)
    }
}
