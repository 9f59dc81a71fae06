use thiserror::Error;

/// Failures raised while configuring or building aggregation keys.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KeyError {
    #[error("a grouping key needs at least one column")]
    NoKeyColumns,

    #[error("key column {column} declares a zero byte width")]
    ZeroWidth { column: usize },

    #[error("packed key columns need {total} bytes, at most {max} fit")]
    PackedWidthExceeded { total: usize, max: usize },

    #[error(transparent)]
    Arena(#[from] ArenaError),
}

/// Arena allocation failures. Any of these aborts the current query.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ArenaError {
    #[error("arena limit of {limit} bytes exceeded by a {requested} byte request")]
    LimitExceeded { requested: usize, limit: usize },

    #[error("out of memory allocating a {requested} byte arena chunk")]
    OutOfMemory { requested: usize },

    #[error("{requested} byte allocation does not fit an arena chunk")]
    AllocationTooLarge { requested: usize },
}

pub type Result<T> = std::result::Result<T, KeyError>;
