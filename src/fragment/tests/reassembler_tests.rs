//! Tests for inbound reassembly: ordering, duplicates, malformed input, and
//! retention.

use std::{
    num::{NonZeroU16, NonZeroUsize},
    time::{Duration, Instant},
};

use bytes::Bytes;
use rstest::{fixture, rstest};
use tracing_test::traced_test;

use crate::fragment::{
    ChunkBatch,
    ChunkHeader,
    Fragmenter,
    FrameId,
    FrameProgress,
    HEADER_LEN,
    HeaderError,
    ReassemblyError,
    ReassemblyStats,
    Reassembler,
    TransferConfig,
};

const TIMEOUT: Duration = Duration::from_secs(30);

fn reassembler_with(max_artifact_size: usize, max_in_flight: usize) -> Reassembler {
    Reassembler::new(
        NonZeroUsize::new(max_artifact_size).expect("non-zero"),
        TIMEOUT,
        NonZeroUsize::new(max_in_flight).expect("non-zero"),
    )
}

#[fixture]
fn reassembler() -> Reassembler { reassembler_with(1 << 20, 16) }

fn datagram(frame_id: u16, chunk_id: u16, total: u16, payload: &[u8]) -> Vec<u8> {
    let size = u16::try_from(payload.len()).expect("test payload fits u16");
    let mut out = ChunkHeader::new(FrameId::new(frame_id), chunk_id, total, size)
        .encode()
        .to_vec();
    out.extend_from_slice(payload);
    out
}

fn batch_of(len: usize, max_payload: u16) -> (Vec<u8>, ChunkBatch) {
    let artifact: Vec<u8> = (0..len)
        .map(|i| u8::try_from(i % 251).expect("remainder fits u8"))
        .collect();
    let batch = Fragmenter::new(NonZeroU16::new(max_payload).expect("non-zero"))
        .fragment(artifact.clone())
        .expect("fragment artifact");
    (artifact, batch)
}

#[rstest]
fn single_chunk_frame_completes_immediately(mut reassembler: Reassembler) {
    let artifact = reassembler
        .on_datagram(&datagram(1, 0, 1, &[1, 2, 3, 4]))
        .expect("datagram accepted")
        .expect("single chunk completes frame");

    assert_eq!(artifact.frame_id(), FrameId::new(1));
    assert_eq!(artifact.payload(), &[1, 2, 3, 4]);
    assert_eq!(reassembler.in_flight(), 0);
}

#[rstest]
fn reversed_delivery_rebuilds_original(mut reassembler: Reassembler) {
    let (artifact, batch) = batch_of(3000, 1400);
    let datagrams: Vec<Bytes> = batch.datagrams().collect();

    let mut completed = Vec::new();
    for datagram in datagrams.iter().rev() {
        if let Some(done) = reassembler.on_datagram(datagram).expect("accepted") {
            completed.push(done);
        }
    }

    assert_eq!(completed.len(), 1, "exactly one completion event");
    assert_eq!(completed[0].payload(), artifact.as_slice());
    assert_eq!(completed[0].frame_id(), batch.frame_id());
}

#[rstest]
fn completion_fires_only_on_last_missing_chunk(mut reassembler: Reassembler) {
    let frame = FrameId::new(9);
    assert!(
        reassembler
            .on_datagram(&datagram(9, 2, 3, b"cc"))
            .expect("accepted")
            .is_none()
    );
    assert!(
        reassembler
            .on_datagram(&datagram(9, 0, 3, b"aa"))
            .expect("accepted")
            .is_none()
    );
    assert_eq!(
        reassembler.progress(frame),
        Some(FrameProgress {
            received: 2,
            total: 3,
        })
    );

    let done = reassembler
        .on_datagram(&datagram(9, 1, 3, b"bb"))
        .expect("accepted")
        .expect("frame complete");
    assert_eq!(done.payload(), b"aabbcc");
    assert!(!reassembler.is_tracking(frame));
}

#[rstest]
fn duplicate_chunk_does_not_double_count(mut reassembler: Reassembler) {
    let first = datagram(4, 0, 2, b"head");
    reassembler.on_datagram(&first).expect("accepted");
    reassembler
        .on_datagram(&first)
        .expect("duplicate is not an error");

    assert_eq!(
        reassembler.progress(FrameId::new(4)),
        Some(FrameProgress {
            received: 1,
            total: 2,
        })
    );

    let done = reassembler
        .on_datagram(&datagram(4, 1, 2, b"tail"))
        .expect("accepted")
        .expect("complete");
    assert_eq!(done.payload(), b"headtail");
    assert_eq!(reassembler.stats().duplicates, 1);
    assert_eq!(reassembler.stats().accepted, 2);
}

#[rstest]
fn conflicting_duplicate_keeps_first_writer(mut reassembler: Reassembler) {
    reassembler
        .on_datagram(&datagram(5, 0, 2, b"keep"))
        .expect("accepted");
    reassembler
        .on_datagram(&datagram(5, 0, 2, b"lose"))
        .expect("duplicate suppressed");

    let done = reassembler
        .on_datagram(&datagram(5, 1, 2, b"!"))
        .expect("accepted")
        .expect("complete");
    assert_eq!(done.payload(), b"keep!");
}

#[rstest]
fn first_seen_total_is_authoritative(mut reassembler: Reassembler) {
    reassembler
        .on_datagram(&datagram(6, 0, 2, b"a"))
        .expect("accepted");

    let err = reassembler
        .on_datagram(&datagram(6, 4, 5, b"e"))
        .expect_err("chunk beyond first-seen total");
    assert_eq!(
        err,
        ReassemblyError::ChunkOutOfRange {
            frame_id: FrameId::new(6),
            chunk_id: 4,
            total: 2,
        }
    );
    assert_eq!(
        reassembler.progress(FrameId::new(6)),
        Some(FrameProgress {
            received: 1,
            total: 2,
        })
    );

    // A later chunk claiming a larger total still lands in the original shape.
    let done = reassembler
        .on_datagram(&datagram(6, 1, 5, b"b"))
        .expect("accepted")
        .expect("complete under first-seen total");
    assert_eq!(done.payload(), b"ab");
}

#[rstest]
fn out_of_range_first_chunk_creates_no_record(mut reassembler: Reassembler) {
    let err = reassembler
        .on_datagram(&datagram(7, 3, 3, b"x"))
        .expect_err("chunk id equals total");
    assert!(matches!(err, ReassemblyError::ChunkOutOfRange { .. }));
    assert_eq!(reassembler.in_flight(), 0);
}

#[rstest]
#[case::empty(Vec::new(), HeaderError::Truncated { len: 0 })]
#[case::short(vec![0_u8; HEADER_LEN - 1], HeaderError::Truncated { len: HEADER_LEN - 1 })]
#[case::overrun(
    {
        let mut d = datagram(8, 0, 1, b"abcdef");
        d.truncate(HEADER_LEN + 2);
        d
    },
    HeaderError::PayloadOverrun { declared: 6, available: 2 }
)]
#[case::zero_total(datagram(8, 0, 0, b""), HeaderError::EmptyFrame { frame_id: FrameId::new(8) })]
fn malformed_datagrams_leave_state_untouched(
    mut reassembler: Reassembler,
    #[case] bytes: Vec<u8>,
    #[case] expected: HeaderError,
) {
    reassembler
        .on_datagram(&datagram(2, 0, 2, b"in-flight"))
        .expect("accepted");
    let before = reassembler.progress(FrameId::new(2));

    let err = reassembler
        .on_datagram(&bytes)
        .expect_err("malformed datagram rejected");

    assert_eq!(err, ReassemblyError::Malformed(expected));
    assert_eq!(reassembler.in_flight(), 1);
    assert_eq!(reassembler.progress(FrameId::new(2)), before);
    assert_eq!(reassembler.stats().discarded, 1);
}

#[rstest]
fn empty_artifact_completes_with_empty_payload(mut reassembler: Reassembler) {
    let (_, batch) = batch_of(0, 1400);
    let datagrams: Vec<Bytes> = batch.datagrams().collect();
    assert_eq!(datagrams.len(), 1);

    let done = reassembler
        .on_datagram(&datagrams[0])
        .expect("accepted")
        .expect("empty artifact completes");
    assert!(done.payload().is_empty());
}

#[rstest]
fn missing_chunk_never_completes_and_record_persists(mut reassembler: Reassembler) {
    let (_, batch) = batch_of(5000, 1000);
    let start = Instant::now();

    for (position, datagram) in batch.datagrams().enumerate() {
        if position == 2 {
            continue;
        }
        let outcome = reassembler
            .on_datagram_at(&datagram, start)
            .expect("accepted");
        assert!(outcome.is_none(), "frame must not complete with a gap");
    }

    assert!(reassembler.is_tracking(batch.frame_id()));
    assert_eq!(
        reassembler.progress(batch.frame_id()),
        Some(FrameProgress {
            received: 4,
            total: 5,
        })
    );

    // Still held just inside the retention window.
    assert!(
        reassembler
            .purge_expired_at(start + TIMEOUT - Duration::from_millis(1))
            .is_empty()
    );
    assert!(reassembler.is_tracking(batch.frame_id()));
}

#[rstest]
fn purge_evicts_stuck_frames_after_timeout(mut reassembler: Reassembler) {
    let now = Instant::now();
    reassembler
        .on_datagram_at(&datagram(11, 0, 2, b"a"), now)
        .expect("accepted");

    let evicted = reassembler.purge_expired_at(now + TIMEOUT);
    assert_eq!(evicted, vec![FrameId::new(11)]);
    assert_eq!(reassembler.in_flight(), 0);
    assert_eq!(reassembler.stats().evicted, 1);
}

#[rstest]
fn incoming_datagram_sweeps_expired_frames(mut reassembler: Reassembler) {
    let now = Instant::now();
    reassembler
        .on_datagram_at(&datagram(12, 0, 2, b"a"), now)
        .expect("accepted");

    reassembler
        .on_datagram_at(&datagram(13, 0, 2, b"b"), now + TIMEOUT)
        .expect("accepted");

    assert!(!reassembler.is_tracking(FrameId::new(12)));
    assert!(reassembler.is_tracking(FrameId::new(13)));
}

#[test]
fn new_frame_at_capacity_evicts_oldest() {
    let mut reassembler = reassembler_with(1 << 20, 2);
    let start = Instant::now();

    for (offset, frame) in [20_u16, 21, 22].into_iter().enumerate() {
        let at = start + Duration::from_millis(u64::try_from(offset).expect("small offset"));
        reassembler
            .on_datagram_at(&datagram(frame, 0, 2, b"x"), at)
            .expect("accepted");
    }

    assert_eq!(reassembler.in_flight(), 2);
    assert!(!reassembler.is_tracking(FrameId::new(20)));
    assert!(reassembler.is_tracking(FrameId::new(21)));
    assert!(reassembler.is_tracking(FrameId::new(22)));
    assert_eq!(reassembler.stats().evicted, 1);
}

#[test]
fn oversized_frame_is_dropped() {
    let mut reassembler = reassembler_with(4, 4);
    reassembler
        .on_datagram(&datagram(30, 0, 2, b"abc"))
        .expect("within limit");

    let err = reassembler
        .on_datagram(&datagram(30, 1, 2, b"de"))
        .expect_err("growth beyond cap");
    assert_eq!(
        err,
        ReassemblyError::MessageTooLarge {
            frame_id: FrameId::new(30),
            attempted: 5,
            limit: NonZeroUsize::new(4).expect("non-zero"),
        }
    );
    assert_eq!(reassembler.in_flight(), 0);
}

#[test]
fn artifact_beyond_library_default_completes_with_describable_cap() {
    let config = crate::config::transfer_config(1400, 30, 64, None).expect("valid limits");
    let len = 9_000_000;
    assert!(len > TransferConfig::default().max_artifact_size.get());
    assert!(len <= config.max_artifact_size.get());

    let (artifact, batch) = batch_of(len, 1400);
    let mut reassembler = Reassembler::from_config(&config);
    let mut completed = None;
    for datagram in batch.datagrams() {
        if let Some(done) = reassembler.on_datagram(&datagram).expect("within cap") {
            completed = Some(done);
        }
    }

    let completed = completed.expect("artifact completes");
    assert_eq!(completed.payload().len(), len);
    assert_eq!(completed.payload(), artifact.as_slice());
    assert_eq!(reassembler.stats().discarded, 0);
}

#[rstest]
fn completion_releases_the_identifier(mut reassembler: Reassembler) {
    let now = Instant::now();
    let first = reassembler
        .on_datagram_at(&datagram(40, 0, 1, b"only"), now)
        .expect("accepted")
        .expect("single chunk completes frame");
    assert_eq!(first.payload(), b"only");
    assert!(!reassembler.is_tracking(FrameId::new(40)));

    // The next chunk under the same id starts a fresh frame straight away.
    let second = reassembler
        .on_datagram_at(&datagram(40, 0, 1, b"new"), now + Duration::from_millis(1))
        .expect("accepted")
        .expect("reused identifier completes");
    assert_eq!(second.payload(), b"new");
    assert_eq!(reassembler.stats().completed, 2);
    assert_eq!(reassembler.stats().duplicates, 0);
}

#[rstest]
fn restarted_sender_reusing_an_identifier_delivers_both_artifacts(mut reassembler: Reassembler) {
    let start = Instant::now();
    let (first_artifact, first_batch) = batch_of(3000, 1400);
    let second_artifact: Vec<u8> = first_artifact.iter().map(|b| b.wrapping_add(1)).collect();
    // A fresh fragmenter draws the same first identifier again.
    let second_batch = Fragmenter::new(NonZeroU16::new(1400).expect("non-zero"))
        .fragment(second_artifact.clone())
        .expect("fragment artifact");
    assert_eq!(first_batch.frame_id(), second_batch.frame_id());

    let mut completed = Vec::new();
    for (offset, batch) in [(0, &first_batch), (5, &second_batch)] {
        let now = start + Duration::from_secs(offset);
        for datagram in batch.datagrams() {
            if let Some(done) = reassembler.on_datagram_at(&datagram, now).expect("accepted") {
                completed.push(done);
            }
        }
    }

    assert_eq!(completed.len(), 2, "both artifacts complete");
    assert_eq!(completed[0].payload(), first_artifact.as_slice());
    assert_eq!(completed[1].payload(), second_artifact.as_slice());
    assert_eq!(reassembler.stats().duplicates, 0);
}

#[rstest]
fn stats_track_every_outcome(mut reassembler: Reassembler) {
    let now = Instant::now();
    reassembler
        .on_datagram_at(&datagram(50, 0, 2, b"a"), now)
        .expect("accepted");
    reassembler
        .on_datagram_at(&datagram(50, 0, 2, b"a"), now)
        .expect("duplicate");
    let _ = reassembler.on_datagram_at(&[0_u8; 3], now);
    reassembler
        .on_datagram_at(&datagram(50, 1, 2, b"b"), now)
        .expect("accepted");

    assert_eq!(
        reassembler.stats(),
        ReassemblyStats {
            accepted: 2,
            duplicates: 1,
            discarded: 1,
            completed: 1,
            evicted: 0,
        }
    );
}

#[traced_test]
#[test]
fn dropped_datagrams_are_logged() {
    let mut reassembler = reassembler_with(64, 4);
    let _ = reassembler.on_datagram(&[1_u8, 2]);
    assert!(logs_contain("dropping datagram"));
}
