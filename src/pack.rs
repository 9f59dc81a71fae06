//! Packing fixed-width key columns into a [`FixedKey`].
//!
//! ```text
//!  col 0 (u32)   col 1 (u16)   col 2 (u8)
//!  ┌─────────┐   ┌─────┐       ┌──┐
//!  │ 07 00 00 00 │ 0b 00 │ 2a │ 00 00 00 00 00 00 00 00 00 │
//!  └─────────────┴───────┴────┴────────────────────────────┘
//!   offset 0      4       6    7 .. 16 zero padding
//! ```
//!
//! Two rows pack to equal keys iff every column's first `width` bytes match.
//! No hashing happens here; hash packed keys with
//! [`CombinedHash`](crate::hash::CombinedHash).

use crate::column::KeyColumn;
use crate::error::{KeyError, Result};
use crate::key::{FIXED_KEY_BYTES, FixedKey};

/// Per-column byte widths of a packed key, validated once per query.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeySizes {
    widths: Vec<usize>,
    total: usize,
}

impl KeySizes {
    /// Rejects zero widths and totals above [`FIXED_KEY_BYTES`].
    pub fn new(widths: Vec<usize>) -> Result<Self> {
        if widths.is_empty() {
            return Err(KeyError::NoKeyColumns);
        }
        if let Some(column) = widths.iter().position(|&w| w == 0) {
            return Err(KeyError::ZeroWidth { column });
        }
        // An overflowing sum is reported as usize::MAX.
        let total = widths
            .iter()
            .try_fold(0usize, |acc, &w| acc.checked_add(w))
            .unwrap_or(usize::MAX);
        if total > FIXED_KEY_BYTES {
            return Err(KeyError::PackedWidthExceeded {
                total,
                max: FIXED_KEY_BYTES,
            });
        }
        Ok(Self { widths, total })
    }

    pub fn widths(&self) -> &[usize] {
        &self.widths
    }

    pub fn len(&self) -> usize {
        self.widths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.widths.is_empty()
    }

    /// Packed bytes actually used; the rest of the key is zero padding.
    pub fn total(&self) -> usize {
        self.total
    }
}

#[derive(Clone, Debug)]
pub struct FixedWidthPacker {
    sizes: KeySizes,
}

impl FixedWidthPacker {
    pub fn new(sizes: KeySizes) -> Self {
        Self { sizes }
    }

    pub fn sizes(&self) -> &KeySizes {
        &self.sizes
    }

    /// Concatenate the first `widths[j]` bytes of each column's value at
    /// `row`.
    ///
    /// Panics if `columns` and the configured widths differ in length, or if
    /// a column value is shorter than its declared width.
    #[inline(always)]
    pub fn pack(&self, row: usize, columns: &[&dyn KeyColumn]) -> FixedKey {
        assert_eq!(
            columns.len(),
            self.sizes.len(),
            "key column count does not match configured widths"
        );

        let mut key = FixedKey::ZERO;
        let bytes = key.bytes_mut();
        let mut offset = 0;
        for (column, &width) in columns.iter().zip(&self.sizes.widths) {
            let value = column.value_at(row);
            bytes[offset..offset + width].copy_from_slice(&value[..width]);
            offset += width;
        }
        key
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::{FixedWidthColumn, StringColumn};
    use crate::key::ZeroSentinel;
    use proptest::prelude::*;

    #[test]
    fn sizes_validation() {
        assert_eq!(KeySizes::new(vec![]), Err(KeyError::NoKeyColumns));
        assert_eq!(
            KeySizes::new(vec![4, 0, 2]),
            Err(KeyError::ZeroWidth { column: 1 })
        );
        assert_eq!(
            KeySizes::new(vec![8, 8, 1]),
            Err(KeyError::PackedWidthExceeded { total: 17, max: 16 })
        );
        assert_eq!(
            KeySizes::new(vec![usize::MAX, 2]),
            Err(KeyError::PackedWidthExceeded {
                total: usize::MAX,
                max: 16
            })
        );
        let sizes = KeySizes::new(vec![8, 8]).unwrap();
        assert_eq!(sizes.total(), 16);
        assert_eq!(sizes.widths(), &[8, 8]);
    }

    #[test]
    fn two_u32_columns() {
        let a = FixedWidthColumn::from_u32s([7, 7, 7]);
        let b = FixedWidthColumn::from_u32s([11, 11, 12]);
        let columns: [&dyn KeyColumn; 2] = [&a, &b];
        let packer = FixedWidthPacker::new(KeySizes::new(vec![4, 4]).unwrap());

        let k0 = packer.pack(0, &columns);
        let k1 = packer.pack(1, &columns);
        let k2 = packer.pack(2, &columns);

        assert_eq!(
            k0.as_bytes(),
            &[7, 0, 0, 0, 11, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]
        );
        assert_eq!(k0, k1);
        assert_ne!(k0, k2);
        assert_eq!(k0.first(), 7 | (11 << 32));
        assert_eq!(k0.second(), 0);
    }

    #[test]
    fn narrower_width_reads_prefix_only() {
        // A u64 column declared 2 bytes wide: only the low bytes take part.
        let a = FixedWidthColumn::from_u64s([0x0102, 0xff_0102]);
        let columns: [&dyn KeyColumn; 1] = [&a];
        let packer = FixedWidthPacker::new(KeySizes::new(vec![2]).unwrap());
        assert_eq!(packer.pack(0, &columns), packer.pack(1, &columns));
    }

    #[test]
    fn column_order_matters() {
        let a = FixedWidthColumn::from_u32s([1]);
        let b = FixedWidthColumn::from_u32s([2]);
        let packer = FixedWidthPacker::new(KeySizes::new(vec![4, 4]).unwrap());
        assert_ne!(packer.pack(0, &[&a, &b]), packer.pack(0, &[&b, &a]));
    }

    #[test]
    fn all_zero_full_width_key_is_the_sentinel() {
        // Known degenerate collision: a genuine all-zero 16 byte key cannot be
        // told apart from an empty slot.
        let a = FixedWidthColumn::from_u64s([0]);
        let b = FixedWidthColumn::from_u64s([0]);
        let packer = FixedWidthPacker::new(KeySizes::new(vec![8, 8]).unwrap());
        let key = packer.pack(0, &[&a, &b]);
        assert!(key.is_zero());
        assert_eq!(key, FixedKey::ZERO);
    }

    #[test]
    fn deterministic() {
        let a = FixedWidthColumn::from_u32s([5, 6]);
        let packer = FixedWidthPacker::new(KeySizes::new(vec![4]).unwrap());
        let first = packer.pack(1, &[&a]);
        for _ in 0..10 {
            assert_eq!(packer.pack(1, &[&a]), first);
        }
    }

    #[test]
    #[should_panic(expected = "key column count")]
    fn column_count_mismatch_panics() {
        let a = FixedWidthColumn::from_u32s([1]);
        let packer = FixedWidthPacker::new(KeySizes::new(vec![4, 4]).unwrap());
        packer.pack(0, &[&a]);
    }

    #[test]
    #[should_panic]
    fn short_value_panics() {
        let s: StringColumn = ["ab"].into_iter().collect();
        let packer = FixedWidthPacker::new(KeySizes::new(vec![4]).unwrap());
        packer.pack(0, &[&s]);
    }

    /// Widths summing to at most 16, with two rows of values for each.
    fn widths_and_rows() -> impl Strategy<Value = (Vec<usize>, Vec<Vec<u8>>, Vec<Vec<u8>>)> {
        prop::collection::vec(1usize..=4, 1..=4).prop_flat_map(|widths| {
            let row = |widths: &Vec<usize>| {
                widths
                    .iter()
                    .map(|&w| prop::collection::vec(0u8..4, w))
                    .collect::<Vec<_>>()
            };
            (Just(widths.clone()), row(&widths), row(&widths))
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(256))]

        #[test]
        fn prop_equal_iff_bytes_equal((widths, left, right) in widths_and_rows()) {
            let columns: Vec<FixedWidthColumn> = widths
                .iter()
                .enumerate()
                .map(|(j, &w)| {
                    let mut column = FixedWidthColumn::new(w);
                    column.push(&left[j]);
                    column.push(&right[j]);
                    column
                })
                .collect();
            let refs: Vec<&dyn KeyColumn> = columns.iter().map(|c| c as &dyn KeyColumn).collect();
            let packer = FixedWidthPacker::new(KeySizes::new(widths.clone()).unwrap());

            let a = packer.pack(0, &refs);
            let b = packer.pack(1, &refs);
            prop_assert_eq!(a == b, left == right);

            let concat: Vec<u8> = left.concat();
            prop_assert_eq!(&a.as_bytes()[..concat.len()], concat.as_slice());
            prop_assert!(a.as_bytes()[concat.len()..].iter().all(|&b| b == 0));
        }
    }
}
