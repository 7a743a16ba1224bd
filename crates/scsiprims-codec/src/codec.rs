use bytes::BytesMut;
use tracing::trace;

use crate::error::{CodecError, Result};
use crate::field::{FieldLayout, FieldSpec};
use crate::values::FieldValues;

/// Pack `values` into `buf` according to `layout`.
///
/// Every field of the layout is written. Fields missing from `values` are
/// written as zero, so a reused buffer never keeps stale bits of a field.
/// Bits outside every field mask are left as they are.
///
/// Values wider than their field are truncated to the low-order bits that
/// fit, matching the fixed-width fields of the protocol. Callers that care
/// must range-check with [`FieldSpec::max_value`] first.
///
/// Packing `invert = 1` with mask `0x01` at offset 8, and a 16-bit
/// `destination_address = 0x0020` at offset 4:
/// ```text
/// byte:   0    1    2    3    4    5    6    7    8
///       ┌────┬────┬────┬────┬────┬────┬────┬────┬────┐
///       │    │    │    │    │0x00│0x20│    │    │0x01│
///       └────┴────┴────┴────┴────┴────┴────┴────┴────┘
///                             MSB  LSB
/// ```
pub fn pack(layout: &FieldLayout, values: &FieldValues, buf: &mut [u8]) -> Result<()> {
    layout.validate()?;
    if let Some((name, _)) = values.iter().find(|(name, _)| !layout.contains(name)) {
        return Err(CodecError::UnknownField(name.to_string()));
    }
    check_len(layout, buf.len())?;

    for field in layout.fields() {
        let value = values.get(&field.name).unwrap_or(0);
        if value > field.max_value() {
            trace!(
                field = %field.name,
                value,
                width = field.width(),
                "value truncated to field width"
            );
        }
        write_field(field, value, buf);
    }
    Ok(())
}

/// Unpack every field of `layout` from `buf`.
///
/// Inverse of [`pack`]: any value that fits its field comes back unchanged.
pub fn unpack(layout: &FieldLayout, buf: &[u8]) -> Result<FieldValues> {
    layout.validate()?;
    check_len(layout, buf.len())?;

    Ok(layout
        .fields()
        .iter()
        .map(|field| (field.name.to_string(), read_field(field, buf)))
        .collect())
}

/// Pack `values` into a fresh zeroed buffer of the layout's full length.
pub fn marshall(layout: &FieldLayout, values: &FieldValues) -> Result<BytesMut> {
    layout.validate()?;
    let mut buf = BytesMut::zeroed(layout.byte_len());
    pack(layout, values, &mut buf)?;
    Ok(buf)
}

fn check_len(layout: &FieldLayout, actual: usize) -> Result<()> {
    let needed = layout.extent();
    if actual < needed {
        return Err(CodecError::BufferTooSmall { needed, actual });
    }
    Ok(())
}

fn write_field(field: &FieldSpec, value: u64, buf: &mut [u8]) {
    let positioned = value.wrapping_shl(field.shift()) & field.mask;
    let span = field.span();
    for (i, byte) in buf[field.offset..field.end()].iter_mut().enumerate() {
        let from_end = 8 * (span - 1 - i);
        let mask = (field.mask >> from_end) as u8;
        let bits = (positioned >> from_end) as u8;
        *byte = (*byte & !mask) | bits;
    }
}

fn read_field(field: &FieldSpec, buf: &[u8]) -> u64 {
    let raw = buf[field.offset..field.end()]
        .iter()
        .fold(0u64, |acc, byte| (acc << 8) | u64::from(*byte));
    (raw & field.mask) >> field.shift()
}

#[cfg(test)]
mod tests {
    use super::*;

    static POSITION_TO_ELEMENT: [FieldSpec; 4] = [
        FieldSpec::new("opcode", 0xff, 0),
        FieldSpec::new("medium_transport_address", 0xffff, 2),
        FieldSpec::new("destination_address", 0xffff, 4),
        FieldSpec::new("invert", 0x01, 8),
    ];

    static READ_CAPACITY16_DATA: [FieldSpec; 9] = [
        FieldSpec::new("returned_lba", u64::MAX, 0),
        FieldSpec::new("block_length", 0xffff_ffff, 8),
        FieldSpec::new("p_type", 0x0e, 12),
        FieldSpec::new("prot_en", 0x01, 12),
        FieldSpec::new("p_i_exponent", 0xf0, 13),
        FieldSpec::new("lbppbe", 0x0f, 13),
        FieldSpec::new("lbpme", 0x80, 14),
        FieldSpec::new("lbprz", 0x40, 14),
        FieldSpec::new("lowest_aligned_lba", 0x3fff, 14),
    ];

    #[test]
    fn packs_position_to_element() {
        let layout = FieldLayout::new(&POSITION_TO_ELEMENT);
        let values = FieldValues::from([
            ("opcode", 0x2b),
            ("medium_transport_address", 0x0010),
            ("destination_address", 0x0020),
            ("invert", 1),
        ]);

        let mut buf = [0u8; 9];
        pack(&layout, &values, &mut buf).expect("pack should succeed");
        assert_eq!(buf, [0x2b, 0x00, 0x00, 0x10, 0x00, 0x20, 0x00, 0x00, 0x01]);

        let decoded = unpack(&layout, &buf).expect("unpack should succeed");
        assert_eq!(decoded, values);
    }

    #[test]
    fn unpacks_read_capacity16_parameter_data() {
        let layout = FieldLayout::sized(&READ_CAPACITY16_DATA, 32);
        let mut data = [0u8; 32];
        data[0..8].copy_from_slice(&[0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]);
        data[8..12].copy_from_slice(&[0x00, 0x00, 0x10, 0x00]);
        data[12] = 0x09;
        data[13] = 0x88;
        data[14] = 0xe0;
        data[15] = 0x01;

        let values = unpack(&layout, &data).expect("unpack should succeed");
        assert_eq!(values.get("returned_lba"), Some(281_474_976_710_656));
        assert_eq!(values.get("block_length"), Some(4096));
        assert_eq!(values.get("p_type"), Some(4));
        assert_eq!(values.get("prot_en"), Some(1));
        assert_eq!(values.get("p_i_exponent"), Some(8));
        assert_eq!(values.get("lbppbe"), Some(8));
        assert_eq!(values.get("lbpme"), Some(1));
        assert_eq!(values.get("lbprz"), Some(1));
        assert_eq!(values.get("lowest_aligned_lba"), Some(8193));

        let repacked = marshall(&layout, &values).expect("marshall should succeed");
        assert_eq!(repacked.as_ref(), &data[..]);
    }

    #[test]
    fn each_field_round_trips_alone() {
        let layout = FieldLayout::new(&READ_CAPACITY16_DATA);
        for field in layout.fields() {
            for value in [0, 1, field.max_value() / 2, field.max_value()] {
                let values = FieldValues::new().with(field.name.clone(), value);
                let buf = marshall(&layout, &values).expect("marshall should succeed");
                let decoded = unpack(&layout, &buf).expect("unpack should succeed");
                assert_eq!(decoded.get(&field.name), Some(value), "field {}", field.name);
            }
        }
    }

    #[test]
    fn oversized_value_is_truncated_to_mask() {
        let layout = FieldLayout::new(&POSITION_TO_ELEMENT);
        let mut buf = [0u8; 9];
        pack(&layout, &FieldValues::from([("opcode", 0x1ff)]), &mut buf)
            .expect("pack should succeed");
        assert_eq!(buf[0], 0xff);

        pack(&layout, &FieldValues::from([("invert", 2)]), &mut buf)
            .expect("pack should succeed");
        assert_eq!(buf[8], 0x00);
    }

    #[test]
    fn truncation_does_not_spill_into_neighbours() {
        static NIBBLES: [FieldSpec; 2] = [
            FieldSpec::new("high", 0xf0, 0),
            FieldSpec::new("low", 0x0f, 0),
        ];
        let layout = FieldLayout::new(&NIBBLES);
        let buf = marshall(&layout, &FieldValues::from([("high", 0x1a), ("low", 0x3)]))
            .expect("marshall should succeed");
        assert_eq!(buf.as_ref(), &[0xa3]);
    }

    #[test]
    fn absent_fields_clear_stale_bits() {
        let layout = FieldLayout::new(&POSITION_TO_ELEMENT);
        let mut buf = [0xffu8; 9];
        pack(&layout, &FieldValues::from([("opcode", 0x2b)]), &mut buf)
            .expect("pack should succeed");
        // Bytes 1, 6 and 7 and the reserved bits of byte 8 belong to no field.
        assert_eq!(buf, [0x2b, 0xff, 0x00, 0x00, 0x00, 0x00, 0xff, 0xff, 0xfe]);
    }

    #[test]
    fn single_bit_flags_read_as_zero_or_one() {
        let layout = FieldLayout::new(&POSITION_TO_ELEMENT);
        let mut buf = [0u8; 9];
        buf[8] = 0xff;
        let values = unpack(&layout, &buf).expect("unpack should succeed");
        assert_eq!(values.get("invert"), Some(1));
    }

    #[test]
    fn unknown_field_is_rejected() {
        let layout = FieldLayout::new(&POSITION_TO_ELEMENT);
        let mut buf = [0u8; 9];
        let err = pack(&layout, &FieldValues::from([("control", 1)]), &mut buf)
            .expect_err("unknown field should fail");
        assert_eq!(err, CodecError::UnknownField("control".to_string()));
        assert_eq!(buf, [0u8; 9]);
    }

    #[test]
    fn short_buffer_is_rejected() {
        let layout = FieldLayout::new(&POSITION_TO_ELEMENT);
        let mut buf = [0u8; 8];
        let err = pack(&layout, &FieldValues::new(), &mut buf).expect_err("pack should fail");
        assert_eq!(err, CodecError::BufferTooSmall { needed: 9, actual: 8 });

        let err = unpack(&layout, &buf).expect_err("unpack should fail");
        assert_eq!(err, CodecError::BufferTooSmall { needed: 9, actual: 8 });
    }

    #[test]
    fn invalid_layout_is_rejected_before_writing() {
        static BROKEN: [FieldSpec; 2] = [
            FieldSpec::new("opcode", 0xff, 0),
            FieldSpec::new("empty", 0x00, 1),
        ];
        let layout = FieldLayout::new(&BROKEN);
        let mut buf = [0u8; 2];
        let err = pack(&layout, &FieldValues::from([("opcode", 0x12)]), &mut buf)
            .expect_err("pack should fail");
        assert!(matches!(err, CodecError::EmptyMask { .. }));
        assert_eq!(buf, [0u8; 2]);
    }

    #[test]
    fn out_of_range_offset_fails_instead_of_indexing() {
        static FAR: [FieldSpec; 1] = [FieldSpec::new("a", 0xff, usize::MAX)];
        let layout = FieldLayout::new(&FAR);
        let mut buf = [0u8; 4];
        assert!(matches!(
            pack(&layout, &FieldValues::new(), &mut buf),
            Err(CodecError::OffsetOutOfRange { .. })
        ));
        assert!(matches!(
            unpack(&layout, &buf),
            Err(CodecError::OffsetOutOfRange { .. })
        ));
        assert!(matches!(
            marshall(&layout, &FieldValues::new()),
            Err(CodecError::OffsetOutOfRange { .. })
        ));
    }

    #[test]
    fn marshall_sizes_to_declared_length() {
        let layout = FieldLayout::sized(&POSITION_TO_ELEMENT, 10);
        let buf = marshall(&layout, &FieldValues::from([("opcode", 0x2b)]))
            .expect("marshall should succeed");
        assert_eq!(buf.len(), 10);
        assert_eq!(buf[0], 0x2b);
    }
}
