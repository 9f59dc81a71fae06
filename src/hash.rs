//! Hash functors for aggregation keys.
//!
//! | Functor            | Input        | Use for                               |
//! |--------------------|--------------|---------------------------------------|
//! | [`CombinedHash`]   | [`FixedKey`] | raw packed bytes ([`crate::pack`])    |
//! | [`TrivialHash`]    | [`FixedKey`] | digests only ([`crate::digest`])      |
//! | [`FastStringHash`] | byte strings | single string keys, materialized keys |
//!
//! # TrivialHash precondition
//!
//! [`TrivialHash`] returns the first half of the key unchanged. That is only
//! well distributed when the key is already the output of a keyed 128-bit
//! hash. On a packed buffer the first half is raw column bytes (small
//! integers, mostly zero bytes) and the consuming table degrades to long
//! probe chains. Nothing checks this at runtime; the caller picks the functor
//! that matches the strategy that produced the key.

use xxhash_rust::xxh3::{Xxh3, xxh3_64};

use crate::key::FixedKey;

/// A hash functor over keys of type `K`, as consumed by an external table.
pub trait KeyHash<K: ?Sized> {
    fn hash_key(&self, key: &K) -> u64;
}

/// 64-bit integer mixer (Murmur3 `fmix64`).
#[inline(always)]
pub fn int_hash64(mut x: u64) -> u64 {
    x ^= x >> 33;
    x = x.wrapping_mul(0xff51_afd7_ed55_8ccd);
    x ^= x >> 33;
    x = x.wrapping_mul(0xc4ce_b9fe_1a85_ec53);
    x ^= x >> 33;
    x
}

/// Hashes the first half, folds in the second, and hashes again.
#[derive(Copy, Clone, Debug, Default)]
pub struct CombinedHash;

impl KeyHash<FixedKey> for CombinedHash {
    #[inline(always)]
    fn hash_key(&self, key: &FixedKey) -> u64 {
        int_hash64(int_hash64(key.first()) ^ key.second())
    }
}

/// Identity on the first half. Digest keys only; see the module docs.
#[derive(Copy, Clone, Debug, Default)]
pub struct TrivialHash;

impl KeyHash<FixedKey> for TrivialHash {
    #[inline(always)]
    fn hash_key(&self, key: &FixedKey) -> u64 {
        key.first()
    }
}

/// XXH3-64 over an arbitrary byte string.
#[derive(Copy, Clone, Debug, Default)]
pub struct FastStringHash;

impl KeyHash<[u8]> for FastStringHash {
    #[inline(always)]
    fn hash_key(&self, key: &[u8]) -> u64 {
        xxh3_64(key)
    }
}

impl KeyHash<str> for FastStringHash {
    #[inline(always)]
    fn hash_key(&self, key: &str) -> u64 {
        xxh3_64(key.as_bytes())
    }
}

impl KeyHash<Vec<u8>> for FastStringHash {
    #[inline(always)]
    fn hash_key(&self, key: &Vec<u8>) -> u64 {
        xxh3_64(key)
    }
}

/// Running 128-bit hash state fed with byte strings in order.
pub trait Hasher128 {
    fn update(&mut self, bytes: &[u8]);
    /// Returns `(first, second)` halves of the digest.
    fn finish128(&self) -> (u64, u64);
}

/// Creates fresh [`Hasher128`] states sharing one key.
pub trait BuildHasher128 {
    type Hasher: Hasher128;

    fn build_hasher(&self) -> Self::Hasher;
}

/// Seeded XXH3-128. The seed keys the hash.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Xxh3Keyed {
    seed: u64,
}

impl Xxh3Keyed {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }
}

impl BuildHasher128 for Xxh3Keyed {
    type Hasher = Xxh3;

    #[inline(always)]
    fn build_hasher(&self) -> Xxh3 {
        Xxh3::with_seed(self.seed)
    }
}

impl Hasher128 for Xxh3 {
    #[inline(always)]
    fn update(&mut self, bytes: &[u8]) {
        Xxh3::update(self, bytes);
    }

    #[inline(always)]
    fn finish128(&self) -> (u64, u64) {
        let digest = self.digest128();
        (digest as u64, (digest >> 64) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn int_hash64_fixes_zero_only() {
        assert_eq!(int_hash64(0), 0);
        assert_ne!(int_hash64(1), 1);
        assert_ne!(int_hash64(1), int_hash64(2));
    }

    #[test]
    fn combined_hash_mixes_both_halves() {
        let h = CombinedHash;
        let base = h.hash_key(&FixedKey::from_halves(7, 11));
        assert_ne!(base, h.hash_key(&FixedKey::from_halves(7, 12)));
        assert_ne!(base, h.hash_key(&FixedKey::from_halves(8, 11)));
        assert_eq!(base, h.hash_key(&FixedKey::from_halves(7, 11)));
    }

    #[test]
    fn combined_hash_spreads_small_packed_keys() {
        let h = CombinedHash;
        let mut buckets = HashSet::new();
        for a in 0..100u64 {
            for b in 0..100u64 {
                let key = FixedKey::from_halves(a | (b << 32), 0);
                buckets.insert(h.hash_key(&key) >> 54);
            }
        }
        // 10_000 keys over 1024 top-bit buckets should touch nearly all.
        assert!(buckets.len() > 1000, "only {} buckets", buckets.len());
    }

    #[test]
    fn trivial_hash_is_first_half() {
        let key = FixedKey::from_halves(0xdead_beef, 0x1234);
        assert_eq!(TrivialHash.hash_key(&key), 0xdead_beef);
    }

    #[test]
    fn trivial_hash_on_packed_keys_clusters() {
        // The hazard: small packed integers leave the top bits empty.
        let mut buckets = HashSet::new();
        for a in 0..10_000u64 {
            buckets.insert(TrivialHash.hash_key(&FixedKey::from_halves(a, 0)) >> 54);
        }
        assert_eq!(buckets.len(), 1);
    }

    #[test]
    fn fast_string_hash_agrees_across_input_types() {
        let h = FastStringHash;
        let bytes: &[u8] = b"group-by";
        assert_eq!(h.hash_key(bytes), h.hash_key("group-by"));
        assert_eq!(h.hash_key(bytes), h.hash_key(&bytes.to_vec()));
        assert_ne!(h.hash_key(bytes), h.hash_key("group-bz"));
    }

    #[test]
    fn keyed_hash_depends_on_seed_and_order() {
        let digest = |seed: u64, parts: &[&[u8]]| {
            let mut state = Xxh3Keyed::new(seed).build_hasher();
            for part in parts {
                state.update(part);
            }
            state.finish128()
        };

        assert_eq!(digest(1, &[b"a", b"b"]), digest(1, &[b"a", b"b"]));
        assert_eq!(digest(1, &[b"a", b"b"]), digest(1, &[b"ab"]));
        assert_ne!(digest(1, &[b"a", b"b"]), digest(2, &[b"a", b"b"]));
        assert_ne!(digest(1, &[b"a", b"b"]), digest(1, &[b"b", b"a"]));
    }
}
