use derive_more::{Display, From, Into};

/// Identifier shared by every chunk of one transferred artifact.
///
/// The space is only 16 bits wide and wraps, so an identifier is unique only
/// among frames that are in flight at the same time.
///
/// # Examples
///
/// ```
/// use chunkcast::fragment::FrameId;
/// let id = FrameId::new(42);
/// assert_eq!(id.get(), 42);
/// assert_eq!(id.to_string(), "42");
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Display, From, Into)]
#[display("{_0}")]
pub struct FrameId(u16);

impl FrameId {
    /// Create a new identifier.
    #[must_use]
    pub const fn new(value: u16) -> Self { Self(value) }

    /// Return the inner numeric identifier.
    #[must_use]
    pub const fn get(self) -> u16 { self.0 }
}
