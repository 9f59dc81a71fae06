//! Aggregation key encoding for hash-based GROUP BY.
//!
//! A query picks one [`KeyStrategy`] from its key column layouts, then turns
//! every row into a [`KeyRepresentation`]:
//!
//! - fixed-width keys of at most 16 bytes are packed into a [`FixedKey`],
//! - wider or variable-length keys become a keyed 128-bit digest,
//! - or, when exact keys are required, are copied into an [`Arena`].

pub mod arena;
pub mod column;
pub mod digest;
pub mod error;
pub mod hash;
pub mod key;
pub mod materialize;
pub mod pack;
pub mod strategy;

pub use arena::{Arena, ArenaConfig, ArenaSpan};
pub use column::{ColumnLayout, FixedWidthColumn, KeyColumn, StringColumn};
pub use digest::DigestBuilder;
pub use error::{ArenaError, KeyError, Result};
pub use hash::{CombinedHash, FastStringHash, KeyHash, TrivialHash, Xxh3Keyed};
pub use key::{FIXED_KEY_BYTES, FixedKey, ZeroSentinel};
pub use materialize::{KeyMaterializer, MaterializedKey, MaterializedKeyView};
pub use pack::{FixedWidthPacker, KeySizes};
pub use strategy::{EncoderConfig, KeyEncoder, KeyRepresentation, KeyStrategy};
