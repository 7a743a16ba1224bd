//! Media changer commands (SMC).

use scsiprims_codec::{FieldLayout, FieldSpec};

use crate::definition::{CommandDefinition, DataPhase};

pub const POSITION_TO_ELEMENT_OPCODE: u8 = 0x2b;

static POSITION_TO_ELEMENT_CDB: [FieldSpec; 4] = [
    FieldSpec::new("opcode", 0xff, 0),
    FieldSpec::new("medium_transport_address", 0xffff, 2),
    FieldSpec::new("destination_address", 0xffff, 4),
    FieldSpec::new("invert", 0x01, 8),
];

pub static POSITION_TO_ELEMENT: CommandDefinition = CommandDefinition {
    name: "positiontoelement",
    opcode: POSITION_TO_ELEMENT_OPCODE,
    cdb: FieldLayout::sized(&POSITION_TO_ELEMENT_CDB, 10),
    phase: DataPhase::None,
    length_field: None,
    defaults: &[],
    datain: None,
};
