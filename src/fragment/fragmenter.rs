//! Outbound helper that splits an artifact into chunk datagrams.
//!
//! [`Fragmenter`] slices a buffer into `max_payload` sized pieces, tagging
//! each with a [`ChunkHeader`]. It draws a fresh [`FrameId`] per artifact from
//! its own [`FrameIdAllocator`] so callers can request chunking without
//! tracking identifiers themselves. Slices share the input allocation.

use std::num::NonZeroU16;

use bytes::{BufMut, Bytes, BytesMut};

use super::{ChunkHeader, FragmentationError, FrameId, FrameIdAllocator, HEADER_LEN};

/// Splits artifacts into chunk-sized frames.
#[derive(Debug)]
pub struct Fragmenter {
    max_payload: NonZeroU16,
    ids: FrameIdAllocator,
}

impl Fragmenter {
    /// Create a fragmenter that caps chunk payloads at `max_payload` bytes.
    #[must_use]
    pub const fn new(max_payload: NonZeroU16) -> Self {
        Self::with_allocator(max_payload, FrameIdAllocator::new())
    }

    /// Create a fragmenter that draws identifiers from `ids`.
    #[must_use]
    pub const fn with_allocator(max_payload: NonZeroU16, ids: FrameIdAllocator) -> Self {
        Self { max_payload, ids }
    }

    /// Return the maximum chunk payload size in bytes.
    #[must_use]
    pub const fn max_payload(&self) -> NonZeroU16 { self.max_payload }

    /// Return the allocator backing this fragmenter.
    #[must_use]
    pub const fn ids(&self) -> &FrameIdAllocator { &self.ids }

    /// Split `payload` into chunks under a freshly drawn [`FrameId`].
    ///
    /// An empty payload yields a single chunk with no payload bytes so the
    /// receiver still observes a completed, empty artifact.
    ///
    /// # Errors
    ///
    /// Returns [`FragmentationError::TooManyChunks`] when the artifact needs
    /// more than `u16::MAX` chunks. No identifier is consumed in that case.
    pub fn fragment(&self, payload: impl Into<Bytes>) -> Result<ChunkBatch, FragmentationError> {
        let payload = payload.into();
        let total_chunks = self.count_chunks(payload.len())?;
        let frame_id = self.ids.next_id();
        Ok(self.build_batch(frame_id, total_chunks, &payload))
    }

    /// Split `payload` into chunks tagged with `frame_id`.
    ///
    /// # Errors
    ///
    /// Returns [`FragmentationError::TooManyChunks`] when the artifact needs
    /// more than `u16::MAX` chunks.
    pub fn fragment_with_id(
        &self,
        frame_id: FrameId,
        payload: impl Into<Bytes>,
    ) -> Result<ChunkBatch, FragmentationError> {
        let payload = payload.into();
        let total_chunks = self.count_chunks(payload.len())?;
        Ok(self.build_batch(frame_id, total_chunks, &payload))
    }

    fn count_chunks(&self, len: usize) -> Result<u16, FragmentationError> {
        let max = usize::from(self.max_payload.get());
        let needed = len.div_ceil(max).max(1);
        u16::try_from(needed).map_err(|_| FragmentationError::TooManyChunks {
            len,
            max_payload: self.max_payload.get(),
        })
    }

    fn build_batch(&self, frame_id: FrameId, total_chunks: u16, payload: &Bytes) -> ChunkBatch {
        if payload.is_empty() {
            let header = ChunkHeader::new(frame_id, 0, 1, 0);
            return ChunkBatch::new(frame_id, vec![ChunkFrame::new(header, Bytes::new())]);
        }

        let max = usize::from(self.max_payload.get());
        let chunks = (0..total_chunks)
            .zip(payload.chunks(max))
            .map(|(chunk_id, piece)| {
                // `chunks(max)` never yields more than `max_payload` bytes.
                let size = u16::try_from(piece.len()).unwrap_or(self.max_payload.get());
                ChunkFrame::new(
                    ChunkHeader::new(frame_id, chunk_id, total_chunks, size),
                    payload.slice_ref(piece),
                )
            })
            .collect();
        ChunkBatch::new(frame_id, chunks)
    }
}

/// Header and payload for a single outbound chunk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChunkFrame {
    header: ChunkHeader,
    payload: Bytes,
}

impl ChunkFrame {
    /// Construct a new chunk frame.
    #[must_use]
    pub fn new(header: ChunkHeader, payload: Bytes) -> Self { Self { header, payload } }

    /// Return the chunk header.
    #[must_use]
    pub fn header(&self) -> &ChunkHeader { &self.header }

    /// Return the chunk payload bytes.
    #[must_use]
    pub fn payload(&self) -> &[u8] { &self.payload }

    /// Encode the chunk as one datagram: header followed by payload.
    #[must_use]
    pub fn to_datagram(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(HEADER_LEN + self.payload.len());
        buf.put_slice(&self.header.encode());
        buf.put_slice(&self.payload);
        buf.freeze()
    }

    /// Consume the frame, returning its components.
    #[must_use]
    pub fn into_parts(self) -> (ChunkHeader, Bytes) { (self.header, self.payload) }
}

/// Chunks produced for a single artifact.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChunkBatch {
    frame_id: FrameId,
    chunks: Vec<ChunkFrame>,
}

impl ChunkBatch {
    fn new(frame_id: FrameId, chunks: Vec<ChunkFrame>) -> Self {
        debug_assert!(!chunks.is_empty(), "chunk batches must not be empty");
        Self { frame_id, chunks }
    }

    /// Return the [`FrameId`] shared by all chunks.
    #[must_use]
    pub const fn frame_id(&self) -> FrameId { self.frame_id }

    /// Return the chunks in ascending position order.
    #[must_use]
    pub fn chunks(&self) -> &[ChunkFrame] { self.chunks.as_slice() }

    /// Number of chunks in the batch.
    #[expect(
        clippy::len_without_is_empty,
        reason = "batches are guaranteed non-empty"
    )]
    #[must_use]
    pub fn len(&self) -> usize { self.chunks.len() }

    /// Encode every chunk as a datagram, in position order.
    pub fn datagrams(&self) -> impl Iterator<Item = Bytes> + '_ {
        self.chunks.iter().map(ChunkFrame::to_datagram)
    }

    /// Consume the batch, returning all chunks.
    #[must_use]
    pub fn into_chunks(self) -> Vec<ChunkFrame> { self.chunks }
}

impl IntoIterator for ChunkBatch {
    type Item = ChunkFrame;
    type IntoIter = std::vec::IntoIter<ChunkFrame>;

    fn into_iter(self) -> Self::IntoIter { self.chunks.into_iter() }
}
