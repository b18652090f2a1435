//! Constant variables.

/// Width of SHA-1 digests, the widest identifier space supported.
pub const MAX_ID_BITS: u8 = 160;
/// Default width of the identifier space.
pub const DEFAULT_ID_BITS: u8 = MAX_ID_BITS;
