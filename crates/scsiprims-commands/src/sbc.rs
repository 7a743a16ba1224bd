//! Block commands (SBC).

use scsiprims_codec::{FieldLayout, FieldSpec};

use crate::definition::{CommandDefinition, DataPhase};

/// SERVICE ACTION IN(16); READ CAPACITY(16) is service action 0x10.
pub const SERVICE_ACTION_IN16_OPCODE: u8 = 0x9e;
pub const READ_CAPACITY16_SERVICE_ACTION: u64 = 0x10;

static READ_CAPACITY16_CDB: [FieldSpec; 3] = [
    FieldSpec::new("opcode", 0xff, 0),
    FieldSpec::new("service_action", 0x1f, 1),
    FieldSpec::new("alloc_len", 0xffff_ffff, 10),
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

pub static READ_CAPACITY16: CommandDefinition = CommandDefinition {
    name: "readcapacity16",
    opcode: SERVICE_ACTION_IN16_OPCODE,
    cdb: FieldLayout::sized(&READ_CAPACITY16_CDB, 16),
    phase: DataPhase::In,
    length_field: Some("alloc_len"),
    defaults: &[
        ("service_action", READ_CAPACITY16_SERVICE_ACTION),
        ("alloc_len", 32),
    ],
    datain: Some(FieldLayout::sized(&READ_CAPACITY16_DATA, 32)),
};
