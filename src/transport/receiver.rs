//! Collector side: a single receive loop feeding a persistence worker.
//!
//! The loop owns the [`Reassembler`], so every datagram is parsed and applied
//! before the next `recv_from`. Completed artifacts are queued on a bounded
//! channel; a full queue pauses intake until the worker catches up.

use std::{
    io,
    net::{Ipv4Addr, SocketAddr},
    num::NonZeroUsize,
    time::Duration,
};

use tokio::{
    net::UdpSocket,
    select,
    sync::mpsc,
    time::{Interval, MissedTickBehavior, interval, sleep},
};
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tracing::{debug, error, info, trace, warn};

use super::{BackoffConfig, TransportError};
use crate::{
    fragment::{CompletedArtifact, ReassemblyStats, Reassembler, TransferConfig},
    metrics,
    sink::ArtifactSink,
};

/// UDP port collectors listen on unless configured otherwise.
pub const DEFAULT_IMAGE_PORT: u16 = 9200;

/// Smallest receive buffer, one Ethernet MTU.
const MIN_RECV_BUFFER: usize = 1500;

const DEFAULT_QUEUE_DEPTH: NonZeroUsize = match NonZeroUsize::new(8) {
    Some(depth) => depth,
    None => unreachable!(),
};

const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// Settings for a [`Receiver`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReceiverConfig {
    /// Address the collector socket binds to.
    pub bind: SocketAddr,
    /// Chunk and retention limits shared with senders.
    pub transfer: TransferConfig,
    /// Completed artifacts that may wait for persistence before intake
    /// pauses.
    pub queue_depth: NonZeroUsize,
    /// Period of the retention sweep over incomplete frames.
    pub sweep_interval: Duration,
    /// Back-off applied when the socket reports receive errors.
    pub backoff: BackoffConfig,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_IMAGE_PORT)),
            transfer: TransferConfig::default(),
            queue_depth: DEFAULT_QUEUE_DEPTH,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            backoff: BackoffConfig::default(),
        }
    }
}

impl ReceiverConfig {
    /// Receive buffer size needed for the configured chunk size.
    #[must_use]
    pub fn recv_buffer_len(&self) -> usize { self.transfer.datagram_ceiling().max(MIN_RECV_BUFFER) }
}

/// Collects chunk datagrams and persists completed artifacts through `S`.
///
/// # Examples
///
/// ```no_run
/// use chunkcast::{
///     sink::FileSink,
///     transport::{Receiver, ReceiverConfig},
/// };
/// use tokio_util::sync::CancellationToken;
///
/// # async fn demo() -> Result<(), chunkcast::transport::TransportError> {
/// let receiver = Receiver::bind(ReceiverConfig::default(), FileSink::new(".")).await?;
/// let shutdown = CancellationToken::new();
/// let stats = receiver.run(shutdown).await;
/// println!("completed {} artifacts", stats.completed);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Receiver<S> {
    socket: UdpSocket,
    config: ReceiverConfig,
    sink: S,
}

impl<S> Receiver<S>
where
    S: ArtifactSink + 'static,
{
    /// Bind the collector socket described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Bind`] if the address cannot be bound.
    pub async fn bind(config: ReceiverConfig, sink: S) -> Result<Self, TransportError> {
        let socket = UdpSocket::bind(config.bind)
            .await
            .map_err(|source| TransportError::Bind {
                addr: config.bind,
                source,
            })?;
        Ok(Self::from_socket(socket, config, sink))
    }

    /// Wrap an already bound socket. `config.bind` is ignored.
    #[must_use]
    pub fn from_socket(socket: UdpSocket, config: ReceiverConfig, sink: S) -> Self {
        Self {
            socket,
            config,
            sink,
        }
    }

    /// Return the address the collector socket is bound to.
    ///
    /// # Errors
    ///
    /// Propagates the socket's `local_addr` failure.
    pub fn local_addr(&self) -> io::Result<SocketAddr> { self.socket.local_addr() }

    /// Return the receiver configuration.
    #[must_use]
    pub const fn config(&self) -> &ReceiverConfig { &self.config }

    /// Receive until `shutdown` is cancelled.
    ///
    /// Artifacts already queued for persistence are written before this
    /// returns. Receive errors are retried with exponential back-off and
    /// never end the loop.
    pub async fn run(self, shutdown: CancellationToken) -> ReassemblyStats {
        let Self {
            socket,
            config,
            sink,
        } = self;
        let (queue, pending) = mpsc::channel(config.queue_depth.get());
        let tracker = TaskTracker::new();
        tracker.spawn(persist_artifacts(sink, pending));

        let mut sweep = interval(config.sweep_interval);
        sweep.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let backoff = config.backoff.normalized();
        let mut intake = Intake {
            socket,
            reassembler: Reassembler::from_config(&config.transfer),
            buf: vec![0; config.recv_buffer_len()],
            sweep,
            queue,
            shutdown,
            backoff,
        };

        info!(addr = ?intake.socket.local_addr().ok(), "receiver listening");
        let mut delay = backoff.initial_delay;
        while let Some(next_delay) = intake.iteration(delay).await {
            delay = next_delay;
        }

        let stats = intake.reassembler.stats();
        // Closing the queue lets the worker finish what is already pending.
        drop(intake);
        tracker.close();
        tracker.wait().await;
        info!(
            completed = stats.completed,
            evicted = stats.evicted,
            discarded = stats.discarded,
            "receiver stopped"
        );
        stats
    }
}

struct Intake {
    socket: UdpSocket,
    reassembler: Reassembler,
    buf: Vec<u8>,
    sweep: Interval,
    queue: mpsc::Sender<CompletedArtifact>,
    shutdown: CancellationToken,
    backoff: BackoffConfig,
}

impl Intake {
    /// Wait for one event. Returns the back-off delay for the next receive
    /// failure, or `None` once the loop should stop.
    #[expect(
        clippy::integer_division_remainder_used,
        reason = "tokio::select! expands to modulus internally"
    )]
    async fn iteration(&mut self, delay: Duration) -> Option<Duration> {
        select! {
            biased;

            () = self.shutdown.cancelled() => None,
            _ = self.sweep.tick() => {
                let evicted = self.reassembler.purge_expired();
                if !evicted.is_empty() {
                    debug!(count = evicted.len(), "retention sweep evicted frames");
                }
                Some(delay)
            }
            res = self.socket.recv_from(&mut self.buf) => match res {
                Ok((len, peer)) => {
                    let completed = match self.reassembler.on_datagram(&self.buf[..len]) {
                        Ok(completed) => completed,
                        Err(error) => {
                            trace!(%peer, %error, "datagram rejected");
                            None
                        }
                    };
                    if let Some(artifact) = completed {
                        if self.queue.send(artifact).await.is_err() {
                            error!("persistence worker stopped; shutting down receiver");
                            return None;
                        }
                    }
                    Some(self.backoff.initial_delay)
                }
                Err(e) => {
                    warn!(error = %e, ?delay, "recv_from failed; backing off");
                    select! {
                        biased;

                        () = self.shutdown.cancelled() => None,
                        () = sleep(delay) => Some(self.backoff.next_delay(delay)),
                    }
                }
            },
        }
    }
}

async fn persist_artifacts<S: ArtifactSink>(sink: S, mut pending: mpsc::Receiver<CompletedArtifact>) {
    while let Some(artifact) = pending.recv().await {
        match sink.persist(&artifact).await {
            Ok(saved) => {
                metrics::inc_artifacts_persisted(true);
                debug!(
                    frame_id = %saved.frame_id,
                    path = %saved.image_path.display(),
                    "artifact persisted"
                );
            }
            Err(error) => {
                metrics::inc_artifacts_persisted(false);
                error!(frame_id = %artifact.frame_id(), %error, "failed to persist artifact");
            }
        }
    }
}
