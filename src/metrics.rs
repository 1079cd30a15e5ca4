//! Metric helpers for `chunkcast`.
//!
//! This module defines metric names and simple helper functions wrapping the
//! [`metrics`](https://docs.rs/metrics) crate. With the `metrics` feature
//! disabled every helper compiles to a no-op.

#[cfg(feature = "metrics")]
use metrics::{counter, gauge};

/// Name of the counter tracking inbound chunks, labelled by outcome.
pub const CHUNKS_RECEIVED: &str = "chunkcast_chunks_received_total";
/// Name of the counter tracking chunk datagrams handed to the socket.
pub const CHUNKS_SENT: &str = "chunkcast_chunks_sent_total";
/// Name of the counter tracking fully reassembled artifacts.
pub const ARTIFACTS_COMPLETED: &str = "chunkcast_artifacts_completed_total";
/// Name of the counter tracking incomplete frames dropped by retention.
pub const FRAMES_EVICTED: &str = "chunkcast_frames_evicted_total";
/// Name of the gauge tracking incomplete frames held by the reassembler.
pub const FRAMES_IN_FLIGHT: &str = "chunkcast_frames_in_flight";
/// Name of the counter tracking persistence outcomes, labelled by result.
pub const ARTIFACTS_PERSISTED: &str = "chunkcast_artifacts_persisted_total";

/// What the reassembler did with an inbound chunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChunkOutcome {
    /// Stored in an empty slot.
    Accepted,
    /// Dropped because its slot was already filled.
    Duplicate,
    /// Dropped as malformed or inconsistent.
    Discarded,
}

impl ChunkOutcome {
    #[cfg_attr(not(feature = "metrics"), allow(dead_code))]
    fn as_str(self) -> &'static str {
        match self {
            ChunkOutcome::Accepted => "accepted",
            ChunkOutcome::Duplicate => "duplicate",
            ChunkOutcome::Discarded => "discarded",
        }
    }
}

/// Record an inbound chunk with the given outcome.
pub fn inc_chunks_received(outcome: ChunkOutcome) {
    #[cfg(feature = "metrics")]
    counter!(CHUNKS_RECEIVED, "outcome" => outcome.as_str()).increment(1);
    #[cfg(not(feature = "metrics"))]
    let _ = outcome;
}

/// Record chunk datagrams handed to the socket.
pub fn add_chunks_sent(count: u64) {
    #[cfg(feature = "metrics")]
    counter!(CHUNKS_SENT).increment(count);
    #[cfg(not(feature = "metrics"))]
    let _ = count;
}

/// Record a completed artifact.
pub fn inc_artifacts_completed() {
    #[cfg(feature = "metrics")]
    counter!(ARTIFACTS_COMPLETED).increment(1);
}

/// Record frames dropped by the retention policy.
pub fn add_frames_evicted(count: u64) {
    #[cfg(feature = "metrics")]
    counter!(FRAMES_EVICTED).increment(count);
    #[cfg(not(feature = "metrics"))]
    let _ = count;
}

/// Publish the number of incomplete frames currently tracked.
pub fn set_frames_in_flight(count: usize) {
    #[cfg(feature = "metrics")]
    #[expect(
        clippy::cast_precision_loss,
        reason = "in-flight counts are far below f64 precision limits"
    )]
    gauge!(FRAMES_IN_FLIGHT).set(count as f64);
    #[cfg(not(feature = "metrics"))]
    let _ = count;
}

/// Record the result of handing an artifact to the sink.
pub fn inc_artifacts_persisted(ok: bool) {
    #[cfg(feature = "metrics")]
    counter!(ARTIFACTS_PERSISTED, "result" => if ok { "ok" } else { "error" }).increment(1);
    #[cfg(not(feature = "metrics"))]
    let _ = ok;
}
