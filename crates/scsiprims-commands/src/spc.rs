//! Primary commands (SPC), implemented by every device type.

use scsiprims_codec::{FieldLayout, FieldSpec};

use crate::definition::{CommandDefinition, DataPhase};
use crate::mode::{MODE_PARAMETER_HEADER10, MODE_PARAMETER_HEADER6};
use crate::sense::FIXED_SENSE;

pub const TEST_UNIT_READY_OPCODE: u8 = 0x00;
pub const REQUEST_SENSE_OPCODE: u8 = 0x03;
pub const INQUIRY_OPCODE: u8 = 0x12;
pub const MODE_SELECT6_OPCODE: u8 = 0x15;
pub const MODE_SENSE6_OPCODE: u8 = 0x1a;
pub const MODE_SENSE10_OPCODE: u8 = 0x5a;

static TEST_UNIT_READY_CDB: [FieldSpec; 1] = [FieldSpec::new("opcode", 0xff, 0)];

pub static TEST_UNIT_READY: CommandDefinition = CommandDefinition {
    name: "testunitready",
    opcode: TEST_UNIT_READY_OPCODE,
    cdb: FieldLayout::sized(&TEST_UNIT_READY_CDB, 6),
    phase: DataPhase::None,
    length_field: None,
    defaults: &[],
    datain: None,
};

static REQUEST_SENSE_CDB: [FieldSpec; 3] = [
    FieldSpec::new("opcode", 0xff, 0),
    FieldSpec::new("desc", 0x01, 1),
    FieldSpec::new("alloc_len", 0xff, 4),
];

pub static REQUEST_SENSE: CommandDefinition = CommandDefinition {
    name: "requestsense",
    opcode: REQUEST_SENSE_OPCODE,
    cdb: FieldLayout::sized(&REQUEST_SENSE_CDB, 6),
    phase: DataPhase::In,
    length_field: Some("alloc_len"),
    defaults: &[("alloc_len", 18)],
    datain: Some(FieldLayout::new(&FIXED_SENSE)),
};

static INQUIRY_CDB: [FieldSpec; 4] = [
    FieldSpec::new("opcode", 0xff, 0),
    FieldSpec::new("evpd", 0x01, 1),
    FieldSpec::new("page_code", 0xff, 2),
    FieldSpec::new("alloc_len", 0xffff, 3),
];

/// Bit fields of standard INQUIRY data. The identification strings that
/// follow are read with [`inquiry_strings`].
static STANDARD_INQUIRY_DATA: [FieldSpec; 17] = [
    FieldSpec::new("peripheral_qualifier", 0xe0, 0),
    FieldSpec::new("peripheral_device_type", 0x1f, 0),
    FieldSpec::new("rmb", 0x80, 1),
    FieldSpec::new("version", 0xff, 2),
    FieldSpec::new("normaca", 0x20, 3),
    FieldSpec::new("hisup", 0x10, 3),
    FieldSpec::new("response_data_format", 0x0f, 3),
    FieldSpec::new("additional_length", 0xff, 4),
    FieldSpec::new("sccs", 0x80, 5),
    FieldSpec::new("acc", 0x40, 5),
    FieldSpec::new("tpgs", 0x30, 5),
    FieldSpec::new("3pc", 0x08, 5),
    FieldSpec::new("protect", 0x01, 5),
    FieldSpec::new("encserv", 0x40, 6),
    FieldSpec::new("multip", 0x10, 6),
    FieldSpec::new("addr16", 0x01, 6),
    FieldSpec::new("cmdque", 0x02, 7),
];

pub static INQUIRY: CommandDefinition = CommandDefinition {
    name: "inquiry",
    opcode: INQUIRY_OPCODE,
    cdb: FieldLayout::sized(&INQUIRY_CDB, 6),
    phase: DataPhase::In,
    length_field: Some("alloc_len"),
    defaults: &[("alloc_len", 96)],
    datain: Some(FieldLayout::new(&STANDARD_INQUIRY_DATA)),
};

static MODE_SENSE6_CDB: [FieldSpec; 6] = [
    FieldSpec::new("opcode", 0xff, 0),
    FieldSpec::new("dbd", 0x08, 1),
    FieldSpec::new("pc", 0xc0, 2),
    FieldSpec::new("page_code", 0x3f, 2),
    FieldSpec::new("sub_page_code", 0xff, 3),
    FieldSpec::new("alloc_len", 0xff, 4),
];

pub static MODE_SENSE6: CommandDefinition = CommandDefinition {
    name: "modesense6",
    opcode: MODE_SENSE6_OPCODE,
    cdb: FieldLayout::sized(&MODE_SENSE6_CDB, 6),
    phase: DataPhase::In,
    length_field: Some("alloc_len"),
    defaults: &[("alloc_len", 96), ("page_code", 0x3f)],
    datain: Some(FieldLayout::new(&MODE_PARAMETER_HEADER6)),
};

static MODE_SENSE10_CDB: [FieldSpec; 7] = [
    FieldSpec::new("opcode", 0xff, 0),
    FieldSpec::new("llbaa", 0x10, 1),
    FieldSpec::new("dbd", 0x08, 1),
    FieldSpec::new("pc", 0xc0, 2),
    FieldSpec::new("page_code", 0x3f, 2),
    FieldSpec::new("sub_page_code", 0xff, 3),
    FieldSpec::new("alloc_len", 0xffff, 7),
];

pub static MODE_SENSE10: CommandDefinition = CommandDefinition {
    name: "modesense10",
    opcode: MODE_SENSE10_OPCODE,
    cdb: FieldLayout::sized(&MODE_SENSE10_CDB, 10),
    phase: DataPhase::In,
    length_field: Some("alloc_len"),
    defaults: &[("alloc_len", 96), ("page_code", 0x3f)],
    datain: Some(FieldLayout::new(&MODE_PARAMETER_HEADER10)),
};

static MODE_SELECT6_CDB: [FieldSpec; 4] = [
    FieldSpec::new("opcode", 0xff, 0),
    FieldSpec::new("pf", 0x10, 1),
    FieldSpec::new("sp", 0x01, 1),
    FieldSpec::new("parameter_list_length", 0xff, 4),
];

/// MODE SELECT(6). The parameter list is a mode parameter header, optional
/// block descriptors and the pages to change; pages are in the page format
/// when `pf` is set, which is the default.
pub static MODE_SELECT6: CommandDefinition = CommandDefinition {
    name: "modeselect6",
    opcode: MODE_SELECT6_OPCODE,
    cdb: FieldLayout::sized(&MODE_SELECT6_CDB, 6),
    phase: DataPhase::Out,
    length_field: Some("parameter_list_length"),
    defaults: &[("pf", 1)],
    datain: None,
};

/// Vendor, product and revision strings of standard INQUIRY data.
///
/// Returns `None` if `data` is too short to hold them.
pub fn inquiry_strings(data: &[u8]) -> Option<(String, String, String)> {
    let field = |range: std::ops::Range<usize>| {
        data.get(range)
            .map(|bytes| String::from_utf8_lossy(bytes).trim().to_string())
    };
    Some((field(8..16)?, field(16..32)?, field(32..36)?))
}

#[cfg(test)]
mod tests {
    use scsiprims_codec::FieldValues;

    use super::*;

    #[test]
    fn mode_sense6_packs_page_control_and_code() {
        let cmd = MODE_SENSE6
            .build(&FieldValues::from([("pc", 1), ("page_code", 0x0a), ("dbd", 1)]))
            .expect("mode sense should build");
        assert_eq!(cmd.cdb.as_ref(), &[0x1a, 0x08, 0x4a, 0x00, 0x60, 0x00]);
        assert_eq!(cmd.datain.len(), 96);
    }

    #[test]
    fn mode_sense10_carries_sixteen_bit_allocation_length() {
        let cmd = MODE_SENSE10
            .build(&FieldValues::from([("llbaa", 1), ("page_code", 0x1a), ("alloc_len", 0x200)]))
            .expect("mode sense(10) should build");
        assert_eq!(
            cmd.cdb.as_ref(),
            &[0x5a, 0x10, 0x1a, 0x00, 0x00, 0x00, 0x00, 0x02, 0x00, 0x00]
        );
        assert_eq!(cmd.datain.len(), 0x200);
    }

    #[test]
    fn mode_select6_sends_parameter_list() {
        let cmd = MODE_SELECT6
            .build(&FieldValues::from([("sp", 1), ("parameter_list_length", 16)]))
            .expect("mode select should build");
        assert_eq!(cmd.cdb.as_ref(), &[0x15, 0x11, 0x00, 0x00, 0x10, 0x00]);
        assert_eq!(cmd.dataout.len(), 16);
        assert!(cmd.datain.is_empty());
    }

    #[test]
    fn standard_inquiry_data_decodes() {
        let mut data = vec![0u8; 36];
        data[0] = 0x05;
        data[1] = 0x80;
        data[2] = 0x06;
        data[3] = 0x12;
        data[4] = 31;
        data[7] = 0x02;
        data[8..16].copy_from_slice(b"ACME    ");
        data[16..32].copy_from_slice(b"Tape Library    ");
        data[32..36].copy_from_slice(b"1.0 ");

        let mut cmd = INQUIRY.build(&FieldValues::from([("alloc_len", 36)])).expect("build");
        cmd.datain.copy_from_slice(&data);

        let values = INQUIRY
            .unmarshall(&cmd)
            .expect("unmarshall should succeed")
            .expect("inquiry returns data");
        assert_eq!(values.get("peripheral_device_type"), Some(5));
        assert_eq!(values.get("rmb"), Some(1));
        assert_eq!(values.get("version"), Some(6));
        assert_eq!(values.get("hisup"), Some(1));
        assert_eq!(values.get("response_data_format"), Some(2));
        assert_eq!(values.get("cmdque"), Some(1));

        let (vendor, product, revision) = inquiry_strings(&data).expect("strings present");
        assert_eq!(vendor, "ACME");
        assert_eq!(product, "Tape Library");
        assert_eq!(revision, "1.0");
    }

    #[test]
    fn inquiry_strings_need_full_header() {
        assert_eq!(inquiry_strings(&[0u8; 20]), None);
    }
}
