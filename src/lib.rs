//! Public API for the `chunkcast` library.
//!
//! `chunkcast` moves binary artifacts, typically camera captures, over UDP
//! by splitting each one into numbered chunk datagrams and reassembling them
//! on a collector. There are no acknowledgements or retransmissions: a frame
//! either completes from the chunks that arrive or is evicted.

pub mod byte_order;
pub mod config;
pub mod fragment;
pub mod metrics;
pub mod sink;
pub mod transport;

pub use config::ConfigError;
pub use fragment::{
    ChunkBatch,
    ChunkFrame,
    ChunkHeader,
    CompletedArtifact,
    FragmentationError,
    Fragmenter,
    FrameId,
    FrameIdAllocator,
    HEADER_LEN,
    HeaderError,
    Reassembler,
    ReassemblyError,
    ReassemblyStats,
    TransferConfig,
};
pub use sink::{ArtifactSink, FileSink, SinkError};
pub use transport::{ChunkSender, Receiver, ReceiverConfig, TransportError};
