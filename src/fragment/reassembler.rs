//! Inbound helper that rebuilds artifacts from chunk datagrams.
//!
//! [`Reassembler`] mirrors the outbound [`Fragmenter`](crate::fragment::Fragmenter)
//! by collecting chunk payloads keyed by [`FrameId`]. Each frame gets a slot
//! arena sized to its declared chunk count on first sight, so arrival order
//! does not matter and duplicates are detected by index. Incomplete frames are
//! evicted once they outlive the retention window or when the number of
//! tracked frames reaches its cap. Completion removes every trace of the
//! frame, so a later chunk with the same identifier starts a new frame.

use std::{
    collections::HashMap,
    num::NonZeroUsize,
    time::{Duration, Instant},
};

use bytes::{Bytes, BytesMut};
use tracing::{debug, info, trace};

use super::{ChunkHeader, FrameId, ReassemblyError, TransferConfig};
use crate::metrics::{self, ChunkOutcome};

#[derive(Debug)]
struct FrameAssembly {
    slots: Box<[Option<Bytes>]>,
    received: u16,
    bytes: usize,
    started_at: Instant,
}

impl FrameAssembly {
    fn new(total: u16, started_at: Instant) -> Self {
        Self {
            slots: vec![None; usize::from(total)].into_boxed_slice(),
            received: 0,
            bytes: 0,
            started_at,
        }
    }

    fn total(&self) -> u16 {
        // Slot count was taken from a `u16` header field.
        u16::try_from(self.slots.len()).unwrap_or(u16::MAX)
    }

    fn is_filled(&self, chunk_id: u16) -> bool {
        self.slots
            .get(usize::from(chunk_id))
            .is_some_and(Option::is_some)
    }

    fn store(&mut self, chunk_id: u16, payload: &[u8]) {
        if let Some(slot) = self.slots.get_mut(usize::from(chunk_id)) {
            *slot = Some(Bytes::copy_from_slice(payload));
            self.received += 1;
            self.bytes += payload.len();
        }
    }

    fn is_complete(&self) -> bool { usize::from(self.received) == self.slots.len() }

    fn into_payload(self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.bytes);
        for chunk in self.slots.iter().flatten() {
            buf.extend_from_slice(chunk);
        }
        buf.freeze()
    }
}

/// A fully reconstructed artifact, emitted once per completed frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompletedArtifact {
    frame_id: FrameId,
    payload: Bytes,
}

impl CompletedArtifact {
    /// Construct a new [`CompletedArtifact`].
    #[must_use]
    pub fn new(frame_id: FrameId, payload: Bytes) -> Self { Self { frame_id, payload } }

    /// Identifier shared by the chunks that formed this artifact.
    #[must_use]
    pub const fn frame_id(&self) -> FrameId { self.frame_id }

    /// Borrow the reassembled bytes.
    #[must_use]
    pub fn payload(&self) -> &[u8] { &self.payload }

    /// Consume the artifact, returning the owned bytes.
    #[must_use]
    pub fn into_payload(self) -> Bytes { self.payload }
}

/// How far along an incomplete frame is.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameProgress {
    /// Distinct chunk positions filled so far.
    pub received: u16,
    /// Chunk count declared by the first chunk seen for the frame.
    pub total: u16,
}

/// Cumulative counters kept by a [`Reassembler`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReassemblyStats {
    /// Chunks stored into an empty slot.
    pub accepted: u64,
    /// Chunks dropped because their slot was already filled.
    pub duplicates: u64,
    /// Datagrams dropped as malformed, out of range, or oversized.
    pub discarded: u64,
    /// Frames that reached completion.
    pub completed: u64,
    /// Incomplete frames dropped by the retention policy.
    pub evicted: u64,
}

/// Stateful chunk re-assembler with bounded retention.
#[derive(Debug)]
pub struct Reassembler {
    max_artifact_size: NonZeroUsize,
    timeout: Duration,
    max_in_flight: NonZeroUsize,
    frames: HashMap<FrameId, FrameAssembly>,
    stats: ReassemblyStats,
}

impl Reassembler {
    /// Create a re-assembler.
    ///
    /// `max_artifact_size` caps a reconstructed artifact, `timeout` is the
    /// age at which an incomplete frame is evicted, and `max_in_flight` caps
    /// the number of incomplete frames tracked at once.
    #[must_use]
    pub fn new(
        max_artifact_size: NonZeroUsize,
        timeout: Duration,
        max_in_flight: NonZeroUsize,
    ) -> Self {
        Self {
            max_artifact_size,
            timeout,
            max_in_flight,
            frames: HashMap::new(),
            stats: ReassemblyStats::default(),
        }
    }

    /// Create a re-assembler from the retention settings in `config`.
    #[must_use]
    pub fn from_config(config: &TransferConfig) -> Self {
        Self::new(
            config.max_artifact_size,
            config.reassembly_timeout,
            config.max_in_flight,
        )
    }

    /// Process one raw datagram using the current time.
    ///
    /// Returns `Ok(Some(_))` when the datagram completes its frame and
    /// `Ok(None)` while more chunks are required or when the chunk was a
    /// duplicate.
    ///
    /// # Errors
    ///
    /// Returns [`ReassemblyError`] when the datagram is dropped. Malformed
    /// datagrams leave all frame state untouched.
    pub fn on_datagram(
        &mut self,
        datagram: &[u8],
    ) -> Result<Option<CompletedArtifact>, ReassemblyError> {
        self.on_datagram_at(datagram, Instant::now())
    }

    /// Process one raw datagram using an explicit clock reading.
    ///
    /// # Errors
    ///
    /// Returns [`ReassemblyError`] when the datagram is dropped.
    pub fn on_datagram_at(
        &mut self,
        datagram: &[u8],
        now: Instant,
    ) -> Result<Option<CompletedArtifact>, ReassemblyError> {
        match ChunkHeader::parse(datagram) {
            Ok((header, payload)) => self.push_at(header, payload, now),
            Err(err) => {
                self.purge_expired_at(now);
                Err(self.discard(err.into()))
            }
        }
    }

    /// Process an already parsed chunk using the current time.
    ///
    /// # Errors
    ///
    /// Returns [`ReassemblyError`] when the chunk is dropped.
    pub fn push(
        &mut self,
        header: ChunkHeader,
        payload: impl AsRef<[u8]>,
    ) -> Result<Option<CompletedArtifact>, ReassemblyError> {
        self.push_at(header, payload, Instant::now())
    }

    /// Process an already parsed chunk using an explicit clock reading.
    ///
    /// Accepting an explicit `now` simplifies deterministic testing and lets
    /// callers co-ordinate eviction sweeps with their own timers.
    ///
    /// # Errors
    ///
    /// Returns [`ReassemblyError`] when the chunk is dropped.
    pub fn push_at(
        &mut self,
        header: ChunkHeader,
        payload: impl AsRef<[u8]>,
        now: Instant,
    ) -> Result<Option<CompletedArtifact>, ReassemblyError> {
        self.purge_expired_at(now);
        let result = self.accept(header, payload.as_ref(), now);
        metrics::set_frames_in_flight(self.frames.len());
        result.map_err(|err| self.discard(err))
    }

    /// Remove incomplete frames that outlived the retention window.
    ///
    /// Returns the identifiers of frames that were evicted.
    pub fn purge_expired(&mut self) -> Vec<FrameId> { self.purge_expired_at(Instant::now()) }

    /// Remove incomplete frames that outlived the retention window using an
    /// explicit clock reading.
    ///
    /// Returns the identifiers of frames that were evicted.
    pub fn purge_expired_at(&mut self, now: Instant) -> Vec<FrameId> {
        let mut evicted = Vec::new();
        let timeout = self.timeout;

        self.frames.retain(|frame_id, frame| {
            let expired = now.saturating_duration_since(frame.started_at) >= timeout;
            if expired {
                info!(
                    %frame_id,
                    received = frame.received,
                    total = frame.slots.len(),
                    "evicting stale frame"
                );
                evicted.push(*frame_id);
            }
            !expired
        });

        if !evicted.is_empty() {
            self.record_evictions(evicted.len());
        }
        evicted
    }

    /// Number of incomplete frames currently tracked.
    #[must_use]
    pub fn in_flight(&self) -> usize { self.frames.len() }

    /// Report whether an incomplete frame with `frame_id` is tracked.
    #[must_use]
    pub fn is_tracking(&self, frame_id: FrameId) -> bool { self.frames.contains_key(&frame_id) }

    /// Report how many chunks of an incomplete frame have arrived.
    #[must_use]
    pub fn progress(&self, frame_id: FrameId) -> Option<FrameProgress> {
        self.frames.get(&frame_id).map(|frame| FrameProgress {
            received: frame.received,
            total: frame.total(),
        })
    }

    /// Return the cumulative counters.
    #[must_use]
    pub const fn stats(&self) -> ReassemblyStats { self.stats }

    fn accept(
        &mut self,
        header: ChunkHeader,
        payload: &[u8],
        now: Instant,
    ) -> Result<Option<CompletedArtifact>, ReassemblyError> {
        let frame_id = header.frame_id();
        let chunk_id = header.chunk_id();

        if !self.frames.contains_key(&frame_id) {
            if chunk_id >= header.total_chunks() {
                return Err(ReassemblyError::ChunkOutOfRange {
                    frame_id,
                    chunk_id,
                    total: header.total_chunks(),
                });
            }
            self.make_room();
            debug!(%frame_id, total = header.total_chunks(), "tracking new frame");
        }

        let frame = self
            .frames
            .entry(frame_id)
            .or_insert_with(|| FrameAssembly::new(header.total_chunks(), now));

        if chunk_id >= frame.total() {
            return Err(ReassemblyError::ChunkOutOfRange {
                frame_id,
                chunk_id,
                total: frame.total(),
            });
        }

        if frame.is_filled(chunk_id) {
            trace!(%frame_id, chunk_id, "duplicate chunk suppressed");
            self.stats.duplicates += 1;
            metrics::inc_chunks_received(ChunkOutcome::Duplicate);
            return Ok(None);
        }

        let attempted = frame.bytes.saturating_add(payload.len());
        if attempted > self.max_artifact_size.get() {
            self.frames.remove(&frame_id);
            return Err(ReassemblyError::MessageTooLarge {
                frame_id,
                attempted,
                limit: self.max_artifact_size,
            });
        }

        frame.store(chunk_id, payload);
        self.stats.accepted += 1;
        metrics::inc_chunks_received(ChunkOutcome::Accepted);

        if !frame.is_complete() {
            return Ok(None);
        }

        let Some(frame) = self.frames.remove(&frame_id) else {
            return Ok(None);
        };
        self.stats.completed += 1;
        metrics::inc_artifacts_completed();
        let payload = frame.into_payload();
        debug!(%frame_id, len = payload.len(), "frame complete");
        Ok(Some(CompletedArtifact::new(frame_id, payload)))
    }

    fn make_room(&mut self) {
        if self.frames.len() < self.max_in_flight.get() {
            return;
        }
        let oldest = self
            .frames
            .iter()
            .min_by_key(|(_, frame)| frame.started_at)
            .map(|(frame_id, _)| *frame_id);
        if let Some(frame_id) = oldest {
            self.frames.remove(&frame_id);
            info!(%frame_id, "evicting oldest frame to stay within in-flight cap");
            self.record_evictions(1);
        }
    }

    fn record_evictions(&mut self, count: usize) {
        let count = u64::try_from(count).unwrap_or(u64::MAX);
        self.stats.evicted += count;
        metrics::add_frames_evicted(count);
    }

    fn discard(&mut self, err: ReassemblyError) -> ReassemblyError {
        debug!(error = %err, "dropping datagram");
        self.stats.discarded += 1;
        metrics::inc_chunks_received(ChunkOutcome::Discarded);
        err
    }
}
