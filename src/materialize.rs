//! Copying key bytes into an arena so they outlive the source row.
//!
//! ```text
//!  arena:  ... │ "ab\0" │ 07 00 00 00 00 │ desc 0 │ desc 1 │ ...
//!                  ▲           ▲              ▲
//!                  └───────────┼──── desc 0 ──┘
//!                              └──────────────────── desc 1
//!  MaterializedKey ──► desc 0   (desc i = desc 0 + 16 * i)
//! ```
//!
//! The key's identity is the full byte content of every column, so equality is
//! exact. The cost is arena growth per new group and an extra indirection on
//! every comparison, where a [`digest`](crate::digest) costs neither but may
//! collide.

use crate::arena::{Arena, ArenaSpan};
use crate::column::KeyColumn;
use crate::error::Result;
use crate::hash::{FastStringHash, KeyHash, int_hash64};

const DESCRIPTOR_BYTES: usize = ArenaSpan::ENCODED_LEN;

/// Handle to a descriptor array written by [`KeyMaterializer`].
///
/// Equality on the handle is identity (same arena location). Compare
/// content through [`resolve`](Self::resolve).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct MaterializedKey {
    descriptors: ArenaSpan,
}

impl MaterializedKey {
    pub fn column_count(&self) -> usize {
        self.descriptors.len() / DESCRIPTOR_BYTES
    }

    /// Location of descriptor `i`, counted from the first descriptor.
    pub fn descriptor_span(&self, i: usize) -> ArenaSpan {
        assert!(i < self.column_count(), "descriptor {i} out of range");
        self.descriptors.slice(i * DESCRIPTOR_BYTES, DESCRIPTOR_BYTES)
    }

    /// Borrow the key's columns from `arena`, which must be the arena that
    /// produced this handle.
    pub fn resolve(self, arena: &Arena) -> MaterializedKeyView<'_> {
        MaterializedKeyView { arena, key: self }
    }
}

#[derive(Copy, Clone)]
pub struct MaterializedKeyView<'a> {
    arena: &'a Arena,
    key: MaterializedKey,
}

impl<'a> MaterializedKeyView<'a> {
    pub fn len(&self) -> usize {
        self.key.column_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn descriptor(&self, i: usize) -> ArenaSpan {
        ArenaSpan::decode(self.arena.bytes(self.key.descriptor_span(i)))
    }

    /// Terminated bytes of column `i`.
    pub fn get(&self, i: usize) -> &'a [u8] {
        self.arena.bytes(self.descriptor(i))
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a [u8]> + '_ {
        (0..self.len()).map(|i| self.get(i))
    }

    pub fn to_vec(&self) -> Vec<&'a [u8]> {
        self.iter().collect()
    }
}

impl std::fmt::Debug for MaterializedKeyView<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl PartialEq for MaterializedKeyView<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl Eq for MaterializedKeyView<'_> {}

impl<'v> PartialEq<[&'v [u8]]> for MaterializedKeyView<'_> {
    fn eq(&self, row: &[&'v [u8]]) -> bool {
        self.len() == row.len() && self.iter().eq(row.iter().copied())
    }
}

/// Order-sensitive fold of per-column XXH3 hashes.
pub fn hash_views<'v>(views: impl IntoIterator<Item = &'v [u8]>) -> u64 {
    views.into_iter().fold(0, |acc, view| {
        int_hash64(acc ^ FastStringHash.hash_key(view))
    })
}

impl<'v> KeyHash<[&'v [u8]]> for FastStringHash {
    fn hash_key(&self, row: &[&'v [u8]]) -> u64 {
        hash_views(row.iter().copied())
    }
}

impl<'a> KeyHash<MaterializedKeyView<'a>> for FastStringHash {
    fn hash_key(&self, key: &MaterializedKeyView<'a>) -> u64 {
        hash_views(key.iter())
    }
}

/// Places key bytes and their descriptors in an arena. Holds a scratch list
/// of spans reused across rows.
#[derive(Clone, Debug, Default)]
pub struct KeyMaterializer {
    spans: Vec<ArenaSpan>,
}

impl KeyMaterializer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy already extracted views (typically from
    /// [`DigestBuilder::digest_with_views`](crate::digest::DigestBuilder::digest_with_views))
    /// into `arena`.
    pub fn place_in_pool(&mut self, views: &[&[u8]], arena: &mut Arena) -> Result<MaterializedKey> {
        self.spans.clear();
        for view in views {
            self.spans.push(arena.alloc_copy(view)?);
        }
        self.write_descriptors(arena)
    }

    /// Extract the terminated view of every column at `row` and place it in
    /// `arena`.
    pub fn extract_and_place_in_pool(
        &mut self,
        row: usize,
        columns: &[&dyn KeyColumn],
        arena: &mut Arena,
    ) -> Result<MaterializedKey> {
        self.spans.clear();
        for column in columns {
            self.spans
                .push(arena.alloc_copy(column.value_with_terminator_at(row))?);
        }
        self.write_descriptors(arena)
    }

    fn write_descriptors(&self, arena: &mut Arena) -> Result<MaterializedKey> {
        let descriptors = arena.alloc(self.spans.len() * DESCRIPTOR_BYTES)?;
        let out = arena.bytes_mut(descriptors);
        for (slot, span) in out.chunks_exact_mut(DESCRIPTOR_BYTES).zip(&self.spans) {
            slot.copy_from_slice(&span.encode());
        }
        Ok(MaterializedKey { descriptors })
    }
}
