//! 128-bit composite key and the empty-slot sentinel.
//!
//! ```text
//!  bytes:  [ 0 .. 8 ) [ 8 .. 16 )
//!           first      second      (little-endian u64 halves)
//! ```
//!
//! A [`FixedKey`] holds either raw packed column bytes (see [`crate::pack`])
//! or a 128-bit digest (see [`crate::digest`]). The value with both halves
//! zero is reserved for empty slots in the consuming hash table.

/// Width of a [`FixedKey`] in bytes.
pub const FIXED_KEY_BYTES: usize = 16;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct FixedKey([u8; FIXED_KEY_BYTES]);

impl FixedKey {
    pub const ZERO: Self = Self([0; FIXED_KEY_BYTES]);

    #[inline(always)]
    pub const fn from_bytes(bytes: [u8; FIXED_KEY_BYTES]) -> Self {
        Self(bytes)
    }

    #[inline(always)]
    pub fn from_halves(first: u64, second: u64) -> Self {
        let mut bytes = [0u8; FIXED_KEY_BYTES];
        bytes[..8].copy_from_slice(&first.to_le_bytes());
        bytes[8..].copy_from_slice(&second.to_le_bytes());
        Self(bytes)
    }

    #[inline(always)]
    pub fn first(&self) -> u64 {
        u128::from_le_bytes(self.0) as u64
    }

    #[inline(always)]
    pub fn second(&self) -> u64 {
        (u128::from_le_bytes(self.0) >> 64) as u64
    }

    #[inline(always)]
    pub fn as_bytes(&self) -> &[u8; FIXED_KEY_BYTES] {
        &self.0
    }

    #[inline(always)]
    pub(crate) fn bytes_mut(&mut self) -> &mut [u8; FIXED_KEY_BYTES] {
        &mut self.0
    }
}

impl From<u128> for FixedKey {
    /// Low 64 bits become `first`, high 64 bits `second`.
    fn from(value: u128) -> Self {
        Self(value.to_le_bytes())
    }
}

/// Marks and detects empty slots of an open-addressing table without a
/// separate occupancy flag.
pub trait ZeroSentinel {
    fn is_zero(&self) -> bool;
    fn set_zero(&mut self);
}

impl ZeroSentinel for FixedKey {
    #[inline(always)]
    fn is_zero(&self) -> bool {
        self.first() == 0 && self.second() == 0
    }

    #[inline(always)]
    fn set_zero(&mut self) {
        self.0 = [0; FIXED_KEY_BYTES];
    }
}

impl ZeroSentinel for u64 {
    #[inline(always)]
    fn is_zero(&self) -> bool {
        *self == 0
    }

    #[inline(always)]
    fn set_zero(&mut self) {
        *self = 0;
    }
}
