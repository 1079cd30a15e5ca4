//! Validation of user-supplied settings.
//!
//! Command line values arrive as plain integers and floats. The helpers here
//! turn them into the typed configuration structs used by the library,
//! rejecting values that would produce an unusable link.

use std::{
    num::{NonZeroU16, NonZeroUsize},
    time::Duration,
};

use thiserror::Error;

use crate::{
    fragment::{HEADER_LEN, TransferConfig},
    sink::GeoPoint,
};

/// Largest UDP payload an IPv4 datagram can carry.
pub const MAX_UDP_PAYLOAD: usize = 65_507;

/// Errors raised for invalid configuration values.
#[derive(Clone, Copy, Debug, Error, PartialEq)]
pub enum ConfigError {
    /// A chunk must carry at least one payload byte.
    #[error("max payload must be at least 1 byte")]
    ZeroMaxPayload,
    /// Header plus payload would not fit in one UDP datagram.
    #[error("max payload {max_payload} exceeds the datagram limit of {limit} bytes")]
    PayloadTooLarge { max_payload: u16, limit: usize },
    /// Incomplete frames must be retained for some time.
    #[error("reassembly timeout must be at least 1 second")]
    ZeroTimeout,
    /// An artifact cap of zero would drop every frame.
    #[error("max artifact size must be at least 1 byte")]
    ZeroMaxArtifactSize,
    /// At least one frame must be trackable.
    #[error("max in-flight frames must be at least 1")]
    ZeroMaxInFlight,
    /// The persistence queue needs room for one artifact.
    #[error("queue depth must be at least 1")]
    ZeroQueueDepth,
    /// Only one of latitude and longitude was given.
    #[error("latitude and longitude must be given together")]
    IncompleteLocation,
    /// Latitude outside `-90..=90`.
    #[error("latitude {0} is outside -90..=90")]
    Latitude(f64),
    /// Longitude outside `-180..=180`.
    #[error("longitude {0} is outside -180..=180")]
    Longitude(f64),
}

/// Build a [`TransferConfig`] from raw limits.
///
/// Without an explicit `max_artifact_size` the cap is the largest artifact a
/// sender using `max_payload` can describe, so nothing a peer can send is
/// rejected for size alone.
///
/// # Errors
///
/// Returns [`ConfigError`] when any limit is zero or the chunk size does not
/// fit a UDP datagram.
///
/// # Examples
///
/// ```
/// use chunkcast::config::{ConfigError, transfer_config};
///
/// let config = transfer_config(1400, 30, 64, None).expect("valid limits");
/// assert_eq!(config.datagram_ceiling(), 1408);
/// assert_eq!(config.max_artifact_size.get(), 65_535 * 1400);
/// assert_eq!(transfer_config(0, 30, 64, None), Err(ConfigError::ZeroMaxPayload));
/// ```
pub fn transfer_config(
    max_payload: u16,
    timeout_secs: u64,
    max_in_flight: usize,
    max_artifact_size: Option<usize>,
) -> Result<TransferConfig, ConfigError> {
    let max_payload = NonZeroU16::new(max_payload).ok_or(ConfigError::ZeroMaxPayload)?;
    let limit = MAX_UDP_PAYLOAD - HEADER_LEN;
    if usize::from(max_payload.get()) > limit {
        return Err(ConfigError::PayloadTooLarge {
            max_payload: max_payload.get(),
            limit,
        });
    }
    if timeout_secs == 0 {
        return Err(ConfigError::ZeroTimeout);
    }
    let max_in_flight = NonZeroUsize::new(max_in_flight).ok_or(ConfigError::ZeroMaxInFlight)?;
    let mut config = TransferConfig {
        max_payload,
        reassembly_timeout: Duration::from_secs(timeout_secs),
        max_in_flight,
        ..TransferConfig::default()
    };
    let cap = max_artifact_size.unwrap_or_else(|| config.largest_describable_artifact());
    config.max_artifact_size = NonZeroUsize::new(cap).ok_or(ConfigError::ZeroMaxArtifactSize)?;
    Ok(config)
}

/// Validate the persistence queue depth.
///
/// # Errors
///
/// Returns [`ConfigError::ZeroQueueDepth`] for zero.
pub fn queue_depth(depth: usize) -> Result<NonZeroUsize, ConfigError> {
    NonZeroUsize::new(depth).ok_or(ConfigError::ZeroQueueDepth)
}

/// Combine optional coordinates into a capture location.
///
/// # Errors
///
/// Returns [`ConfigError`] when only one coordinate is present or either is
/// out of range.
pub fn geo_point(lat: Option<f64>, lon: Option<f64>) -> Result<Option<GeoPoint>, ConfigError> {
    match (lat, lon) {
        (None, None) => Ok(None),
        (Some(lat), Some(lon)) => {
            if !(-90.0..=90.0).contains(&lat) {
                return Err(ConfigError::Latitude(lat));
            }
            if !(-180.0..=180.0).contains(&lon) {
                return Err(ConfigError::Longitude(lon));
            }
            Ok(Some(GeoPoint { lat, lon }))
        }
        _ => Err(ConfigError::IncompleteLocation),
    }
}
