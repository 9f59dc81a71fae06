//! Key column accessors.
//!
//! Both reference columns store a zero byte after every value, so the
//! terminated view handed to the digest builder and the materializer is a
//! plain borrow of column storage rather than a per-row copy.

/// Storage shape of a key column, inspected once per query to pick a key
/// strategy.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ColumnLayout {
    /// Every value is exactly this many bytes.
    Fixed(usize),
    Variable,
}

/// Per-row byte access to one GROUP BY key column.
pub trait KeyColumn {
    fn layout(&self) -> ColumnLayout {
        ColumnLayout::Variable
    }

    /// Number of rows.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Value bytes at `row`, without the terminator.
    fn value_at(&self, row: usize) -> &[u8];

    /// Value bytes at `row` followed by one zero byte, which is included in
    /// the returned length.
    fn value_with_terminator_at(&self, row: usize) -> &[u8];
}

/// Fixed-width values (integers, dates, fixed strings).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FixedWidthColumn {
    width: usize,
    data: Vec<u8>,
}

impl FixedWidthColumn {
    /// Panics if `width` is zero.
    pub fn new(width: usize) -> Self {
        assert!(width > 0, "fixed-width column needs a non-zero width");
        Self {
            width,
            data: Vec::new(),
        }
    }

    pub fn with_capacity(width: usize, rows: usize) -> Self {
        let mut column = Self::new(width);
        column.data.reserve(rows * (width + 1));
        column
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Panics if `value` is not exactly `width` bytes.
    pub fn push(&mut self, value: &[u8]) {
        assert_eq!(value.len(), self.width, "value width mismatch");
        self.data.extend_from_slice(value);
        self.data.push(0);
    }

    pub fn from_u32s(values: impl IntoIterator<Item = u32>) -> Self {
        let mut column = Self::new(size_of::<u32>());
        for v in values {
            column.push(&v.to_le_bytes());
        }
        column
    }

    pub fn from_u64s(values: impl IntoIterator<Item = u64>) -> Self {
        let mut column = Self::new(size_of::<u64>());
        for v in values {
            column.push(&v.to_le_bytes());
        }
        column
    }

    #[inline(always)]
    fn stride(&self) -> usize {
        self.width + 1
    }
}

impl KeyColumn for FixedWidthColumn {
    fn layout(&self) -> ColumnLayout {
        ColumnLayout::Fixed(self.width)
    }

    fn len(&self) -> usize {
        self.data.len() / self.stride()
    }

    #[inline(always)]
    fn value_at(&self, row: usize) -> &[u8] {
        let start = row * self.stride();
        &self.data[start..start + self.width]
    }

    #[inline(always)]
    fn value_with_terminator_at(&self, row: usize) -> &[u8] {
        let start = row * self.stride();
        &self.data[start..start + self.stride()]
    }
}

/// Variable-length byte strings.
///
/// ```text
///  chars:   a b \0 c \0 \0 d e f \0
///  offsets:       3     5  6       10    (end of each value, terminator included)
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StringColumn {
    chars: Vec<u8>,
    offsets: Vec<usize>,
}

impl StringColumn {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, value: &[u8]) {
        self.chars.extend_from_slice(value);
        self.chars.push(0);
        self.offsets.push(self.chars.len());
    }

    #[inline(always)]
    fn start(&self, row: usize) -> usize {
        if row == 0 { 0 } else { self.offsets[row - 1] }
    }
}

impl<T: AsRef<[u8]>> FromIterator<T> for StringColumn {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut column = Self::new();
        for value in iter {
            column.push(value.as_ref());
        }
        column
    }
}

impl KeyColumn for StringColumn {
    fn len(&self) -> usize {
        self.offsets.len()
    }

    #[inline(always)]
    fn value_at(&self, row: usize) -> &[u8] {
        &self.chars[self.start(row)..self.offsets[row] - 1]
    }

    #[inline(always)]
    fn value_with_terminator_at(&self, row: usize) -> &[u8] {
        &self.chars[self.start(row)..self.offsets[row]]
    }
}
