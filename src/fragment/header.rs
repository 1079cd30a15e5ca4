//! Fixed-size header carried at the front of every chunk datagram.
//!
//! Layout, all fields big-endian:
//!
//! ```text
//! offset 0: frame_id      u16
//! offset 2: chunk_id      u16
//! offset 4: total_chunks  u16
//! offset 6: payload_size  u16
//! offset 8: payload bytes
//! ```

use super::{FrameId, HeaderError};
use crate::byte_order::{read_network_u16s, write_network_u16s};

/// Encoded size of a [`ChunkHeader`] in bytes.
pub const HEADER_LEN: usize = 8;

/// Header describing a single chunk of a frame.
///
/// # Examples
///
/// ```
/// use chunkcast::fragment::{ChunkHeader, FrameId};
/// let header = ChunkHeader::new(FrameId::new(7), 0, 3, 1400);
/// let wire = header.encode();
/// assert_eq!(wire, [0, 7, 0, 0, 0, 3, 0x05, 0x78]);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChunkHeader {
    frame_id: FrameId,
    chunk_id: u16,
    total_chunks: u16,
    payload_size: u16,
}

impl ChunkHeader {
    /// Create a new chunk header.
    #[must_use]
    pub const fn new(frame_id: FrameId, chunk_id: u16, total_chunks: u16, payload_size: u16) -> Self {
        Self {
            frame_id,
            chunk_id,
            total_chunks,
            payload_size,
        }
    }

    /// Return the frame this chunk belongs to.
    #[must_use]
    pub const fn frame_id(&self) -> FrameId { self.frame_id }

    /// Return the zero-based position of the chunk within its frame.
    #[must_use]
    pub const fn chunk_id(&self) -> u16 { self.chunk_id }

    /// Return the number of chunks the sender split the frame into.
    #[must_use]
    pub const fn total_chunks(&self) -> u16 { self.total_chunks }

    /// Return the number of payload bytes following the header.
    #[must_use]
    pub const fn payload_size(&self) -> u16 { self.payload_size }

    /// Report whether this chunk carries the final position of its frame.
    #[must_use]
    pub const fn is_last(&self) -> bool { self.chunk_id.saturating_add(1) == self.total_chunks }

    /// Serialise the header into its wire representation.
    #[must_use]
    pub fn encode(&self) -> [u8; HEADER_LEN] {
        write_network_u16s([
            self.frame_id.get(),
            self.chunk_id,
            self.total_chunks,
            self.payload_size,
        ])
    }

    /// Split a datagram into its header and the declared payload bytes.
    ///
    /// Bytes beyond `payload_size` are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`HeaderError::Truncated`] when the datagram cannot hold a
    /// header, [`HeaderError::PayloadOverrun`] when the declared payload is
    /// longer than the bytes received, and [`HeaderError::EmptyFrame`] when
    /// the header declares zero chunks.
    pub fn parse(datagram: &[u8]) -> Result<(Self, &[u8]), HeaderError> {
        let Some((head, body)) = datagram.split_first_chunk::<HEADER_LEN>() else {
            return Err(HeaderError::Truncated {
                len: datagram.len(),
            });
        };

        let [frame_id, chunk_id, total_chunks, payload_size] = read_network_u16s::<4, HEADER_LEN>(head);
        let header = Self::new(FrameId::new(frame_id), chunk_id, total_chunks, payload_size);

        let declared = usize::from(header.payload_size);
        let Some(payload) = body.get(..declared) else {
            return Err(HeaderError::PayloadOverrun {
                declared,
                available: body.len(),
            });
        };
        if header.total_chunks == 0 {
            return Err(HeaderError::EmptyFrame {
                frame_id: header.frame_id,
            });
        }

        Ok((header, payload))
    }
}
