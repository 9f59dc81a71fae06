//! Keyed 128-bit digests of variable-length or wide keys.
//!
//! Each column contributes its value followed by one zero byte, in column
//! order, to a single running hash. The terminator keeps `("ab", "c")` and
//! `("a", "bc")` apart; without it both would feed `abc` to the hasher.
//!
//! The digest stands in for the key itself: two different rows collide with
//! negligible but non-zero probability. Digests are already well mixed, so the
//! table may hash them with [`TrivialHash`](crate::hash::TrivialHash).

use crate::column::KeyColumn;
use crate::hash::{BuildHasher128, Hasher128, Xxh3Keyed};
use crate::key::FixedKey;

#[derive(Clone, Debug, Default)]
pub struct DigestBuilder<S = Xxh3Keyed> {
    hasher: S,
}

impl DigestBuilder<Xxh3Keyed> {
    pub fn with_seed(seed: u64) -> Self {
        Self::new(Xxh3Keyed::new(seed))
    }
}

impl<S: BuildHasher128> DigestBuilder<S> {
    pub fn new(hasher: S) -> Self {
        Self { hasher }
    }

    /// Digest of the terminated key bytes of `row`.
    #[inline(always)]
    pub fn digest(&self, row: usize, columns: &[&dyn KeyColumn]) -> FixedKey {
        let mut state = self.hasher.build_hasher();
        for column in columns {
            state.update(column.value_with_terminator_at(row));
        }
        let (first, second) = state.finish128();
        FixedKey::from_halves(first, second)
    }

    /// Same digest as [`digest`](Self::digest), also leaving each column's
    /// terminated view in `out_views` (cleared first) so the caller can
    /// materialize the key later without reading the columns again.
    #[inline(always)]
    pub fn digest_with_views<'a>(
        &self,
        row: usize,
        columns: &[&'a dyn KeyColumn],
        out_views: &mut Vec<&'a [u8]>,
    ) -> FixedKey {
        out_views.clear();
        let mut state = self.hasher.build_hasher();
        for column in columns {
            let view = column.value_with_terminator_at(row);
            state.update(view);
            out_views.push(view);
        }
        let (first, second) = state.finish128();
        FixedKey::from_halves(first, second)
    }
}
