//! Choosing a key strategy once per query and encoding rows with it.
//!
//! ```text
//!  layouts ──► KeyStrategy::select ──► KeyEncoder ──(per row)──► KeyRepresentation
//!              all fixed, <= 16 B  ─► Packed        ─► FixedPacked(FixedKey)
//!              prefer exact keys   ─► Materialized  ─► MaterializedRefs(handle)
//!              otherwise           ─► Digest        ─► Digest(FixedKey)
//! ```

use tracing::debug;

use crate::arena::{Arena, ArenaConfig};
use crate::column::{ColumnLayout, KeyColumn};
use crate::digest::DigestBuilder;
use crate::error::{KeyError, Result};
use crate::hash::{BuildHasher128, CombinedHash, KeyHash, TrivialHash, Xxh3Keyed};
use crate::key::FixedKey;
use crate::materialize::{KeyMaterializer, MaterializedKey, hash_views};
use crate::pack::{FixedWidthPacker, KeySizes};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncoderConfig {
    /// Keep exact key bytes in the arena instead of a 128-bit digest when the
    /// key cannot be packed.
    pub prefer_exact_keys: bool,
    pub digest_seed: u64,
    pub arena: ArenaConfig,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl EncoderConfig {
    pub fn new() -> Self {
        Self {
            prefer_exact_keys: false,
            digest_seed: 0,
            arena: ArenaConfig::new(),
        }
    }

    pub fn with_exact_keys(mut self, exact: bool) -> Self {
        self.prefer_exact_keys = exact;
        self
    }

    pub fn with_digest_seed(mut self, seed: u64) -> Self {
        self.digest_seed = seed;
        self
    }

    pub fn with_arena(mut self, arena: ArenaConfig) -> Self {
        self.arena = arena;
        self
    }

    /// A fresh arena for one aggregation shard.
    pub fn new_arena(&self) -> Arena {
        Arena::new(self.arena.clone())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KeyStrategy {
    Packed(KeySizes),
    Digest,
    Materialized,
}

impl KeyStrategy {
    pub fn select(layouts: &[ColumnLayout], config: &EncoderConfig) -> Result<Self> {
        if layouts.is_empty() {
            return Err(KeyError::NoKeyColumns);
        }
        if let Some(column) = layouts
            .iter()
            .position(|layout| *layout == ColumnLayout::Fixed(0))
        {
            return Err(KeyError::ZeroWidth { column });
        }

        let widths: Option<Vec<usize>> = layouts
            .iter()
            .map(|layout| match layout {
                ColumnLayout::Fixed(width) => Some(*width),
                ColumnLayout::Variable => None,
            })
            .collect();

        let strategy = match widths.map(KeySizes::new) {
            Some(Ok(sizes)) => Self::Packed(sizes),
            Some(Err(KeyError::PackedWidthExceeded { .. })) | None => {
                if config.prefer_exact_keys {
                    Self::Materialized
                } else {
                    Self::Digest
                }
            }
            Some(Err(err)) => return Err(err),
        };

        debug!(columns = layouts.len(), ?strategy, "selected aggregation key strategy");
        Ok(strategy)
    }

    pub fn for_columns(columns: &[&dyn KeyColumn], config: &EncoderConfig) -> Result<Self> {
        let layouts: Vec<ColumnLayout> = columns.iter().map(|c| c.layout()).collect();
        Self::select(&layouts, config)
    }
}

/// One row's key in whichever representation the strategy produces.
///
/// Hash and equality dispatch per variant. Keys from different variants never
/// compare equal; a table only ever holds one variant.
#[derive(Copy, Clone, Debug)]
pub enum KeyRepresentation {
    FixedPacked(FixedKey),
    Digest(FixedKey),
    MaterializedRefs(MaterializedKey),
}

impl KeyRepresentation {
    /// `arena` is only read for materialized keys.
    pub fn hash(&self, arena: &Arena) -> u64 {
        match self {
            Self::FixedPacked(key) => CombinedHash.hash_key(key),
            Self::Digest(key) => TrivialHash.hash_key(key),
            Self::MaterializedRefs(key) => hash_views(key.resolve(arena).iter()),
        }
    }

    pub fn key_eq(&self, other: &Self, arena: &Arena) -> bool {
        match (self, other) {
            (Self::FixedPacked(a), Self::FixedPacked(b)) => a == b,
            (Self::Digest(a), Self::Digest(b)) => a == b,
            (Self::MaterializedRefs(a), Self::MaterializedRefs(b)) => {
                a == b || a.resolve(arena) == b.resolve(arena)
            }
            _ => false,
        }
    }

    pub fn as_fixed(&self) -> Option<FixedKey> {
        match self {
            Self::FixedPacked(key) | Self::Digest(key) => Some(*key),
            Self::MaterializedRefs(_) => None,
        }
    }
}

/// Encodes rows with a strategy fixed for the whole query.
pub struct KeyEncoder<S = Xxh3Keyed> {
    strategy: KeyStrategy,
    packer: Option<FixedWidthPacker>,
    digest: DigestBuilder<S>,
    materializer: KeyMaterializer,
}

impl KeyEncoder<Xxh3Keyed> {
    pub fn new(strategy: KeyStrategy, config: &EncoderConfig) -> Self {
        Self::with_hasher(strategy, Xxh3Keyed::new(config.digest_seed))
    }

    pub fn for_columns(columns: &[&dyn KeyColumn], config: &EncoderConfig) -> Result<Self> {
        Ok(Self::new(KeyStrategy::for_columns(columns, config)?, config))
    }
}

impl<S: BuildHasher128> KeyEncoder<S> {
    pub fn with_hasher(strategy: KeyStrategy, hasher: S) -> Self {
        let packer = match &strategy {
            KeyStrategy::Packed(sizes) => Some(FixedWidthPacker::new(sizes.clone())),
            _ => None,
        };
        Self {
            strategy,
            packer,
            digest: DigestBuilder::new(hasher),
            materializer: KeyMaterializer::new(),
        }
    }

    pub fn strategy(&self) -> &KeyStrategy {
        &self.strategy
    }

    /// Build the key of `row`. Only the materialized strategy touches
    /// `arena`, once per call, so call it for rows that start a new group.
    pub fn encode(
        &mut self,
        row: usize,
        columns: &[&dyn KeyColumn],
        arena: &mut Arena,
    ) -> Result<KeyRepresentation> {
        Ok(match &self.packer {
            Some(packer) => KeyRepresentation::FixedPacked(packer.pack(row, columns)),
            None if self.strategy == KeyStrategy::Digest => {
                KeyRepresentation::Digest(self.digest.digest(row, columns))
            }
            None => KeyRepresentation::MaterializedRefs(
                self.materializer
                    .extract_and_place_in_pool(row, columns, arena)?,
            ),
        })
    }

    /// Hash of `row`'s key without materializing it. Equal to
    /// [`KeyRepresentation::hash`] of the encoded row.
    pub fn probe_hash(&self, row: usize, columns: &[&dyn KeyColumn]) -> u64 {
        match &self.packer {
            Some(packer) => CombinedHash.hash_key(&packer.pack(row, columns)),
            None if self.strategy == KeyStrategy::Digest => {
                TrivialHash.hash_key(&self.digest.digest(row, columns))
            }
            None => hash_views(columns.iter().map(|c| c.value_with_terminator_at(row))),
        }
    }

    /// Whether `row` encodes to a key equal to `stored`, without
    /// materializing it.
    pub fn matches(
        &self,
        row: usize,
        columns: &[&dyn KeyColumn],
        stored: &KeyRepresentation,
        arena: &Arena,
    ) -> bool {
        match stored {
            KeyRepresentation::FixedPacked(key) => self
                .packer
                .as_ref()
                .is_some_and(|packer| packer.pack(row, columns) == *key),
            KeyRepresentation::Digest(key) => {
                self.strategy == KeyStrategy::Digest && self.digest.digest(row, columns) == *key
            }
            KeyRepresentation::MaterializedRefs(key) => {
                let stored = key.resolve(arena);
                stored.len() == columns.len()
                    && columns
                        .iter()
                        .zip(stored.iter())
                        .all(|(c, bytes)| c.value_with_terminator_at(row) == bytes)
            }
        }
    }
}
