//! Chunked transfer primitives: framing, splitting, and reassembly.
//!
//! This module collects the domain types used to move one artifact across a
//! datagram link. Each sub-module focuses on a single concept to keep the
//! code small and easy to audit while still providing a cohesive API at the
//! crate root.

pub mod allocator;
pub mod config;
pub mod error;
pub mod fragmenter;
pub mod header;
pub mod id;
pub mod reassembler;

pub use allocator::FrameIdAllocator;
pub use config::{DEFAULT_MAX_PAYLOAD, TransferConfig};
pub use error::{FragmentationError, HeaderError, ReassemblyError};
pub use fragmenter::{ChunkBatch, ChunkFrame, Fragmenter};
pub use header::{ChunkHeader, HEADER_LEN};
pub use id::FrameId;
pub use reassembler::{CompletedArtifact, FrameProgress, ReassemblyStats, Reassembler};
