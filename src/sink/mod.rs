//! Persistence of completed artifacts.
//!
//! The receive path hands every [`CompletedArtifact`] to an [`ArtifactSink`]
//! exactly once. Sinks own storage layout and metadata; the transfer core
//! neither retries nor observes their failures beyond logging and metrics.

pub mod error;
pub mod file;

use async_trait::async_trait;
pub use error::SinkError;
pub use file::{FileSink, GeoPoint, MetadataEntry, PersistedArtifact};

use crate::fragment::CompletedArtifact;

/// Destination for completed artifacts.
#[async_trait]
pub trait ArtifactSink: Send + Sync {
    /// Durably store `artifact` and record its metadata.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError`] when the artifact or its metadata cannot be
    /// written.
    async fn persist(&self, artifact: &CompletedArtifact) -> Result<PersistedArtifact, SinkError>;
}
