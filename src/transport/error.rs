//! Errors raised by the UDP transport.

use std::{io, net::SocketAddr};

use thiserror::Error;

use crate::fragment::FragmentationError;

/// Errors that abort a send attempt or prevent a receiver from starting.
#[derive(Debug, Error)]
pub enum TransportError {
    /// A datagram socket could not be bound.
    #[error("failed to bind datagram socket on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
    /// The send socket could not be associated with the collector address.
    #[error("failed to connect datagram socket to {addr}: {source}")]
    Connect {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
    /// The artifact could not be split into chunks.
    #[error(transparent)]
    Fragmentation(#[from] FragmentationError),
}
