use std::borrow::Cow;
use std::collections::BTreeMap;

use serde::Deserialize;

use crate::error::{CodecError, Result};

/// Largest structure, in bytes, a layout may describe.
pub const MAX_LAYOUT_LEN: usize = 1 << 16;

/// One named field of a layout.
///
/// `mask` is given in place: `0xc0` at offset 2 means bits 7..6 of byte 2.
/// A mask wider than one byte covers consecutive bytes starting at `offset`,
/// most significant byte first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: Cow<'static, str>,
    pub mask: u64,
    pub offset: usize,
}

impl FieldSpec {
    /// A field with a static name, for compiled-in tables.
    pub const fn new(name: &'static str, mask: u64, offset: usize) -> Self {
        Self {
            name: Cow::Borrowed(name),
            mask,
            offset,
        }
    }

    /// A field with an owned name, for layouts built at run time.
    pub fn owned(name: impl Into<String>, mask: u64, offset: usize) -> Self {
        Self {
            name: Cow::Owned(name.into()),
            mask,
            offset,
        }
    }

    /// Number of bytes the mask covers.
    pub const fn span(&self) -> usize {
        (64 - self.mask.leading_zeros() as usize).div_ceil(8)
    }

    /// First byte past this field.
    pub const fn end(&self) -> usize {
        self.offset.saturating_add(self.span())
    }

    /// Bit position of the least significant bit of the field.
    pub const fn shift(&self) -> u32 {
        if self.mask == 0 {
            0
        } else {
            self.mask.trailing_zeros()
        }
    }

    /// Width of the field in bits.
    pub const fn width(&self) -> u32 {
        if self.mask == 0 {
            0
        } else {
            64 - self.mask.leading_zeros() - self.mask.trailing_zeros()
        }
    }

    /// Largest value that fits without truncation.
    pub const fn max_value(&self) -> u64 {
        self.mask >> self.shift()
    }

    /// Mask bits that land in absolute byte `index` of the buffer.
    pub(crate) fn mask_byte(&self, index: usize) -> u8 {
        if index < self.offset || index >= self.end() {
            return 0;
        }
        let from_end = self.end() - 1 - index;
        (self.mask >> (8 * from_end)) as u8
    }

    fn overlaps(&self, other: &FieldSpec) -> bool {
        let start = self.offset.max(other.offset);
        let end = self.end().min(other.end());
        (start..end).any(|index| self.mask_byte(index) & other.mask_byte(index) != 0)
    }

    fn check(&self) -> Result<()> {
        if self.mask == 0 {
            return Err(CodecError::EmptyMask {
                field: self.name.to_string(),
            });
        }
        let normalized = self.mask >> self.shift();
        if normalized & normalized.wrapping_add(1) != 0 {
            return Err(CodecError::NonContiguousMask {
                field: self.name.to_string(),
                mask: self.mask,
            });
        }
        match self.offset.checked_add(self.span()) {
            Some(end) if end <= MAX_LAYOUT_LEN => Ok(()),
            _ => Err(CodecError::OffsetOutOfRange {
                field: self.name.to_string(),
                offset: self.offset,
            }),
        }
    }
}

/// An immutable table of fields describing one binary structure.
///
/// Field order carries no meaning; fields are independent of each other.
/// A layout may declare a total length longer than its last field, for
/// command blocks whose trailing bytes are reserved or carry `CONTROL`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "BTreeMap<String, (u64, usize)>")]
pub struct FieldLayout {
    fields: Cow<'static, [FieldSpec]>,
    len: usize,
}

impl FieldLayout {
    /// A layout over a compiled-in table, sized to its last field.
    pub const fn new(fields: &'static [FieldSpec]) -> Self {
        Self::sized(fields, 0)
    }

    /// A layout over a compiled-in table with a declared total length.
    pub const fn sized(fields: &'static [FieldSpec], len: usize) -> Self {
        Self {
            fields: Cow::Borrowed(fields),
            len,
        }
    }

    /// Build and validate a layout from owned fields.
    pub fn from_fields(fields: Vec<FieldSpec>) -> Result<Self> {
        let layout = Self {
            fields: Cow::Owned(fields),
            len: 0,
        };
        layout.validate()?;
        Ok(layout)
    }

    /// Declare a total length for this layout.
    pub fn with_len(mut self, len: usize) -> Self {
        self.len = len;
        self
    }

    /// All fields of the layout.
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Look up a field by name.
    pub fn get(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Returns true if the layout declares a field called `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Number of bytes touched by fields.
    pub fn extent(&self) -> usize {
        self.fields.iter().map(FieldSpec::end).max().unwrap_or(0)
    }

    /// Total length of the structure: the declared length, or the extent if
    /// that is larger.
    pub fn byte_len(&self) -> usize {
        self.len.max(self.extent())
    }

    /// Check every structural rule of the layout.
    ///
    /// Masks must be non-zero and contiguous, names unique, and no two
    /// fields may claim the same bit. Neither a field nor the declared
    /// length may reach past [`MAX_LAYOUT_LEN`].
    pub fn validate(&self) -> Result<()> {
        if self.len > MAX_LAYOUT_LEN {
            return Err(CodecError::LayoutTooLong {
                len: self.len,
                max: MAX_LAYOUT_LEN,
            });
        }
        for field in self.fields.iter() {
            field.check()?;
        }
        for (index, field) in self.fields.iter().enumerate() {
            for other in &self.fields[index + 1..] {
                if field.name == other.name {
                    return Err(CodecError::DuplicateField(field.name.to_string()));
                }
                if field.overlaps(other) {
                    return Err(CodecError::Overlap {
                        first: field.name.to_string(),
                        second: other.name.to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}

impl TryFrom<BTreeMap<String, (u64, usize)>> for FieldLayout {
    type Error = CodecError;

    fn try_from(table: BTreeMap<String, (u64, usize)>) -> Result<Self> {
        let fields = table
            .into_iter()
            .map(|(name, (mask, offset))| FieldSpec::owned(name, mask, offset))
            .collect();
        Self::from_fields(fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static MODE_SENSE6: [FieldSpec; 6] = [
        FieldSpec::new("opcode", 0xff, 0),
        FieldSpec::new("dbd", 0x08, 1),
        FieldSpec::new("pc", 0xc0, 2),
        FieldSpec::new("page_code", 0x3f, 2),
        FieldSpec::new("sub_page_code", 0xff, 3),
        FieldSpec::new("alloc_len", 0xff, 4),
    ];

    #[test]
    fn geometry_of_single_byte_field() {
        let pc = FieldSpec::new("pc", 0xc0, 2);
        assert_eq!(pc.span(), 1);
        assert_eq!(pc.end(), 3);
        assert_eq!(pc.shift(), 6);
        assert_eq!(pc.width(), 2);
        assert_eq!(pc.max_value(), 3);
    }

    #[test]
    fn geometry_of_multi_byte_field() {
        let lowest_aligned_lba = FieldSpec::new("lowest_aligned_lba", 0x3fff, 14);
        assert_eq!(lowest_aligned_lba.span(), 2);
        assert_eq!(lowest_aligned_lba.end(), 16);
        assert_eq!(lowest_aligned_lba.shift(), 0);
        assert_eq!(lowest_aligned_lba.width(), 14);
        assert_eq!(lowest_aligned_lba.mask_byte(14), 0x3f);
        assert_eq!(lowest_aligned_lba.mask_byte(15), 0xff);
        assert_eq!(lowest_aligned_lba.mask_byte(16), 0x00);
    }

    #[test]
    fn full_width_field_spans_eight_bytes() {
        let lba = FieldSpec::new("lba", u64::MAX, 2);
        assert_eq!(lba.span(), 8);
        assert_eq!(lba.width(), 64);
        assert_eq!(lba.max_value(), u64::MAX);
    }

    #[test]
    fn static_layout_is_valid() {
        let layout = FieldLayout::sized(&MODE_SENSE6, 6);
        layout.validate().expect("layout should be valid");
        assert_eq!(layout.extent(), 5);
        assert_eq!(layout.byte_len(), 6);
        assert!(layout.contains("page_code"));
        assert!(!layout.contains("control"));
    }

    #[test]
    fn declared_length_never_shrinks_extent() {
        let layout = FieldLayout::sized(&MODE_SENSE6, 2);
        assert_eq!(layout.byte_len(), 5);
    }

    #[test]
    fn rejects_empty_mask() {
        let err = FieldLayout::from_fields(vec![FieldSpec::owned("nothing", 0, 0)])
            .expect_err("empty mask should be rejected");
        assert_eq!(
            err,
            CodecError::EmptyMask {
                field: "nothing".to_string()
            }
        );
    }

    #[test]
    fn rejects_offset_that_overflows() {
        let err = FieldLayout::from_fields(vec![FieldSpec::owned("a", 0xff, usize::MAX)])
            .expect_err("offset past the address space should be rejected");
        assert_eq!(
            err,
            CodecError::OffsetOutOfRange {
                field: "a".to_string(),
                offset: usize::MAX
            }
        );
        assert_eq!(FieldSpec::new("a", 0xffff, usize::MAX).end(), usize::MAX);
    }

    #[test]
    fn rejects_offset_overflow_before_overlap_check() {
        let err = FieldLayout::from_fields(vec![
            FieldSpec::owned("a", 0xff, 0),
            FieldSpec::owned("b", 0xffff, usize::MAX),
        ])
        .expect_err("second field should be rejected");
        assert!(matches!(err, CodecError::OffsetOutOfRange { ref field, .. } if field == "b"));
    }

    #[test]
    fn rejects_field_past_layout_limit() {
        FieldLayout::from_fields(vec![FieldSpec::owned("last", 0xff, MAX_LAYOUT_LEN - 1)])
            .expect("field ending at the limit should be accepted");
        let err = FieldLayout::from_fields(vec![FieldSpec::owned(
            "last",
            0xffff,
            MAX_LAYOUT_LEN - 1,
        )])
        .expect_err("field ending past the limit should be rejected");
        assert!(matches!(err, CodecError::OffsetOutOfRange { .. }));
    }

    #[test]
    fn rejects_declared_length_past_limit() {
        let err = FieldLayout::sized(&MODE_SENSE6, MAX_LAYOUT_LEN + 1)
            .validate()
            .expect_err("oversized declared length should be rejected");
        assert_eq!(
            err,
            CodecError::LayoutTooLong {
                len: MAX_LAYOUT_LEN + 1,
                max: MAX_LAYOUT_LEN
            }
        );
    }

    #[test]
    fn json_offset_out_of_range_is_an_error() {
        let result =
            serde_json::from_str::<FieldLayout>(r#"{"a": [255, 18446744073709551615]}"#);
        let err = result.expect_err("huge offset should fail to load");
        assert!(err.to_string().contains("out of range"), "{err}");
    }

    #[test]
    fn rejects_non_contiguous_mask() {
        let err = FieldLayout::from_fields(vec![FieldSpec::owned("holey", 0b1010, 0)])
            .expect_err("mask with a hole should be rejected");
        assert!(matches!(err, CodecError::NonContiguousMask { mask: 0b1010, .. }));
    }

    #[test]
    fn rejects_duplicate_names() {
        let err = FieldLayout::from_fields(vec![
            FieldSpec::owned("flag", 0x01, 1),
            FieldSpec::owned("flag", 0x02, 1),
        ])
        .expect_err("duplicate names should be rejected");
        assert_eq!(err, CodecError::DuplicateField("flag".to_string()));
    }

    #[test]
    fn rejects_overlap_within_a_byte() {
        let err = FieldLayout::from_fields(vec![
            FieldSpec::owned("pc", 0xc0, 2),
            FieldSpec::owned("page_code", 0x7f, 2),
        ])
        .expect_err("overlapping masks should be rejected");
        assert!(matches!(err, CodecError::Overlap { .. }));
    }

    #[test]
    fn rejects_overlap_across_byte_boundary() {
        let err = FieldLayout::from_fields(vec![
            FieldSpec::owned("alloc_len", 0xffff, 3),
            FieldSpec::owned("control", 0xff, 4),
        ])
        .expect_err("a field inside a multi-byte field should be rejected");
        assert!(matches!(err, CodecError::Overlap { .. }));
    }

    #[test]
    fn adjacent_multi_byte_fields_do_not_overlap() {
        FieldLayout::from_fields(vec![
            FieldSpec::owned("medium_transport_address", 0xffff, 2),
            FieldSpec::owned("destination_address", 0xffff, 4),
        ])
        .expect("adjacent fields should be accepted");
    }

    #[test]
    fn loads_from_json_table() {
        let layout: FieldLayout = serde_json::from_str(
            r#"{"opcode": [255, 0], "evpd": [1, 1], "page_code": [255, 2], "alloc_len": [65535, 3]}"#,
        )
        .expect("layout json should load");
        assert_eq!(layout.fields().len(), 4);
        assert_eq!(layout.byte_len(), 5);
        assert_eq!(
            layout.get("alloc_len"),
            Some(&FieldSpec::new("alloc_len", 0xffff, 3))
        );
    }

    #[test]
    fn json_table_is_validated() {
        let result = serde_json::from_str::<FieldLayout>(r#"{"a": [255, 0], "b": [15, 0]}"#);
        assert!(result.is_err());
    }
}
