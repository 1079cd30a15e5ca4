//! Configuration shared by the fragmenting sender and the reassembling receiver.

use std::{
    num::{NonZeroU16, NonZeroUsize},
    time::Duration,
};

use bytes::Bytes;

use super::HEADER_LEN;

/// Payload bytes per chunk used when nothing else is configured. Keeps a
/// chunk datagram under a typical 1500 byte path MTU once IP and UDP headers
/// are added.
pub const DEFAULT_MAX_PAYLOAD: NonZeroU16 = match NonZeroU16::new(1400) {
    Some(cap) => cap,
    None => unreachable!(),
};

const DEFAULT_MAX_ARTIFACT_SIZE: NonZeroUsize = match NonZeroUsize::new(8 * 1024 * 1024) {
    Some(cap) => cap,
    None => unreachable!(),
};

const DEFAULT_MAX_IN_FLIGHT: NonZeroUsize = match NonZeroUsize::new(64) {
    Some(cap) => cap,
    None => unreachable!(),
};

const DEFAULT_REASSEMBLY_TIMEOUT: Duration = Duration::from_secs(30);

/// Settings that bound chunk sizes and reassembly resource usage.
///
/// `max_payload` must match on both ends of a link.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransferConfig {
    /// Maximum number of artifact bytes carried by a single chunk.
    pub max_payload: NonZeroU16,
    /// Hard cap on a fully reassembled artifact. Artifacts above it are
    /// dropped by the receiver even though a sender can still describe them;
    /// see [`TransferConfig::largest_describable_artifact`].
    pub max_artifact_size: NonZeroUsize,
    /// Age after which an incomplete frame is evicted.
    pub reassembly_timeout: Duration,
    /// Number of incomplete frames tracked at once. Starting a new frame at
    /// the cap evicts the oldest one.
    ///
    /// Every tracked frame preallocates one slot per chunk declared by its
    /// first header, before any payload arrives. A single datagram claiming
    /// 65535 chunks reserves about 2 MiB, so unauthenticated senders can pin
    /// up to [`TransferConfig::slot_reservation_ceiling`] bytes, roughly
    /// 128 MiB at the default cap of 64 frames.
    pub max_in_flight: NonZeroUsize,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            max_payload: DEFAULT_MAX_PAYLOAD,
            max_artifact_size: DEFAULT_MAX_ARTIFACT_SIZE,
            reassembly_timeout: DEFAULT_REASSEMBLY_TIMEOUT,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
        }
    }
}

impl TransferConfig {
    /// Derive a configuration from the largest datagram the path carries.
    ///
    /// `datagram_budget` is the UDP payload size that is safe to send (for
    /// example 1472 bytes on a 1500 byte Ethernet MTU). The chunk header is
    /// subtracted from it and the result clamped to what `payload_size` can
    /// express.
    ///
    /// Returns `None` when the budget cannot hold a header and one payload
    /// byte.
    ///
    /// # Examples
    ///
    /// ```
    /// use chunkcast::fragment::TransferConfig;
    /// let config = TransferConfig::for_datagram_budget(1408).expect("budget fits a header");
    /// assert_eq!(config.max_payload.get(), 1400);
    /// assert!(TransferConfig::for_datagram_budget(8).is_none());
    /// ```
    #[must_use]
    pub fn for_datagram_budget(datagram_budget: usize) -> Option<Self> {
        let available = datagram_budget.checked_sub(HEADER_LEN)?;
        let capped = u16::try_from(available).unwrap_or(u16::MAX);
        Some(Self {
            max_payload: NonZeroU16::new(capped)?,
            ..Self::default()
        })
    }

    /// Size of the largest datagram this configuration produces, and so the
    /// receive buffer a collector needs.
    #[must_use]
    pub fn datagram_ceiling(&self) -> usize { usize::from(self.max_payload.get()) + HEADER_LEN }

    /// Largest artifact a sender with this chunk size can describe, given
    /// that `total_chunks` is a `u16`.
    ///
    /// # Examples
    ///
    /// ```
    /// use chunkcast::fragment::TransferConfig;
    /// assert_eq!(TransferConfig::default().largest_describable_artifact(), 65_535 * 1400);
    /// ```
    #[must_use]
    pub fn largest_describable_artifact(&self) -> usize {
        usize::from(u16::MAX) * usize::from(self.max_payload.get())
    }

    /// Worst-case memory reserved for chunk slots when every tracked frame
    /// declares the maximum chunk count.
    #[must_use]
    pub fn slot_reservation_ceiling(&self) -> usize {
        self.max_in_flight.get() * usize::from(u16::MAX) * size_of::<Option<Bytes>>()
    }
}
