//! Errors raised by [`ArtifactSink`](crate::sink::ArtifactSink) implementations.

use std::{io, path::PathBuf};

use thiserror::Error;

/// Errors that may occur while persisting an artifact.
#[derive(Debug, Error)]
pub enum SinkError {
    /// A directory in the storage layout could not be created.
    #[error("failed to create directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// A file could not be written.
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// The metadata record could not be serialised.
    #[error("failed to encode metadata: {0}")]
    Metadata(#[from] serde_json::Error),
}
