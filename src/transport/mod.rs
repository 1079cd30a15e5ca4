//! UDP plumbing around the chunking core.
//!
//! [`ChunkSender`] pushes one artifact per call as independent, unconfirmed
//! datagrams. [`Receiver`] drives a single reassembly loop over a bound
//! socket and hands completed artifacts to an
//! [`ArtifactSink`](crate::sink::ArtifactSink) through a bounded queue, so a
//! slow write never stalls chunk intake for other frames.

pub mod backoff;
pub mod error;
pub mod receiver;
pub mod sender;

pub use backoff::BackoffConfig;
pub use error::TransportError;
pub use receiver::{DEFAULT_IMAGE_PORT, Receiver, ReceiverConfig};
pub use sender::{ChunkSender, SendReport};
