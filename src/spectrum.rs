//! The per-pixel spectrum index produced by the imzML parser.
use std::ops::Range;

/// The numeric encoding of a binary data array, as declared by a
/// referenceable parameter group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BinaryDataArrayType {
    Float32,
    Float64,
    Int32,
    Int64,
}

impl BinaryDataArrayType {
    /// The width of a single element in bytes
    pub const fn size_of(&self) -> usize {
        match self {
            Self::Float32 | Self::Int32 => 4,
            Self::Float64 | Self::Int64 => 8,
        }
    }

    pub const fn name(&self) -> &'static str {
        match self {
            Self::Float32 => "32-bit float",
            Self::Float64 => "64-bit float",
            Self::Int32 => "32-bit integer",
            Self::Int64 => "64-bit integer",
        }
    }
}

/// The binary arrays an imzML spectrum refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ArrayType {
    MZArray,
    IntensityArray,
}

impl ArrayType {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::MZArray => "m/z array",
            Self::IntensityArray => "intensity array",
        }
    }
}

/**
The location of one pixel's spectrum in the binary payload.

Offsets are byte offsets into the `.ibd` file, lengths are element counts.
*/
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SpectrumRecord {
    /// Zero-based pixel index `(x, y, z)`
    pub index: [u32; 3],
    /// Raw physical position, only populated by legacy 3D documents
    pub world: [f64; 3],
    pub mz_offset: u64,
    pub mz_length: u64,
    pub int_offset: u64,
    pub int_length: u64,
    pub in_file_normalization_factor: f64,
}

impl Default for SpectrumRecord {
    fn default() -> Self {
        Self {
            index: [0; 3],
            world: [0.0; 3],
            mz_offset: 0,
            mz_length: 0,
            int_offset: 0,
            int_length: 0,
            in_file_normalization_factor: 1.0,
        }
    }
}

impl SpectrumRecord {
    #[inline]
    pub fn x(&self) -> u32 {
        self.index[0]
    }

    #[inline]
    pub fn y(&self) -> u32 {
        self.index[1]
    }

    #[inline]
    pub fn z(&self) -> u32 {
        self.index[2]
    }

    /// The byte range of the m/z array given the width of its elements, or
    /// `None` if the declared location does not fit in a `u64`
    pub fn mz_byte_range(&self, dtype: BinaryDataArrayType) -> Option<Range<u64>> {
        byte_range(self.mz_offset, self.mz_length, dtype)
    }

    /// The byte range of the intensity array given the width of its elements,
    /// or `None` if the declared location does not fit in a `u64`
    pub fn intensity_byte_range(&self, dtype: BinaryDataArrayType) -> Option<Range<u64>> {
        byte_range(self.int_offset, self.int_length, dtype)
    }
}

/// The bytes spanned by `length` elements of `dtype` starting at `offset`
pub(crate) fn byte_range(
    offset: u64,
    length: u64,
    dtype: BinaryDataArrayType,
) -> Option<Range<u64>> {
    let end = length
        .checked_mul(dtype.size_of() as u64)
        .and_then(|n| offset.checked_add(n))?;
    Some(offset..end)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_dtype_names() {
        assert_eq!(BinaryDataArrayType::Float32.name(), "32-bit float");
        assert_eq!(BinaryDataArrayType::Int64.name(), "64-bit integer");
        assert_eq!(BinaryDataArrayType::Float64.size_of(), 8);
        assert_eq!(BinaryDataArrayType::Int32.size_of(), 4);
    }

    #[test]
    fn test_record_ranges() {
        let rec = SpectrumRecord {
            mz_offset: 16,
            mz_length: 10,
            int_offset: 56,
            int_length: 10,
            ..Default::default()
        };
        assert_eq!(rec.in_file_normalization_factor, 1.0);
        assert_eq!(rec.mz_byte_range(BinaryDataArrayType::Float32), Some(16..56));
        assert_eq!(
            rec.intensity_byte_range(BinaryDataArrayType::Float64),
            Some(56..136)
        );
        assert_eq!((rec.x(), rec.y(), rec.z()), (0, 0, 0));
    }

    #[test]
    fn test_record_ranges_overflow() {
        let rec = SpectrumRecord {
            mz_offset: 16,
            mz_length: u64::MAX / 2,
            int_offset: u64::MAX - 4,
            int_length: 2,
            ..Default::default()
        };
        assert_eq!(rec.mz_byte_range(BinaryDataArrayType::Float32), None);
        assert_eq!(rec.intensity_byte_range(BinaryDataArrayType::Int32), None);
    }
}
