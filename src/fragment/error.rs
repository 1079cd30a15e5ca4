//! Error types emitted by the chunking layer.
//!
//! None of these are fatal to a receive loop: they describe why a datagram
//! was dropped so callers can log or count it and move on.

use std::num::NonZeroUsize;

use thiserror::Error;

use super::FrameId;

/// Reasons a datagram could not be read as a chunk.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum HeaderError {
    /// The datagram is shorter than the fixed header.
    #[error("datagram of {len} bytes is shorter than the chunk header")]
    Truncated { len: usize },
    /// The header declares more payload than the datagram carries.
    #[error("declared payload of {declared} bytes exceeds the {available} bytes received")]
    PayloadOverrun { declared: usize, available: usize },
    /// The header declares a frame made of zero chunks.
    #[error("frame {frame_id} declares zero chunks")]
    EmptyFrame { frame_id: FrameId },
}

/// Errors produced by [`Reassembler`](crate::fragment::Reassembler).
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum ReassemblyError {
    /// The datagram was malformed and left all state untouched.
    #[error("malformed datagram: {0}")]
    Malformed(#[from] HeaderError),
    /// The chunk position lies outside the frame's authoritative shape.
    #[error("chunk {chunk_id} out of range for frame {frame_id} of {total} chunks")]
    ChunkOutOfRange {
        frame_id: FrameId,
        chunk_id: u16,
        total: u16,
    },
    /// Accepting the chunk would grow the artifact past the configured cap.
    /// The partial frame is dropped.
    #[error("frame {frame_id} would grow to {attempted} bytes (limit {limit})")]
    MessageTooLarge {
        frame_id: FrameId,
        attempted: usize,
        limit: NonZeroUsize,
    },
}

/// Errors produced while splitting outbound artifacts.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum FragmentationError {
    /// The artifact needs more chunks than a 16-bit header can describe.
    #[error("artifact of {len} bytes needs more than {} chunks of {max_payload} bytes", u16::MAX)]
    TooManyChunks { len: usize, max_payload: u16 },
}
