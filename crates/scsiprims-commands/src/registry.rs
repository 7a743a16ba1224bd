use crate::definition::CommandDefinition;
use crate::{sbc, smc, spc};

/// Every shipped command definition.
pub static COMMANDS: [&CommandDefinition; 8] = [
    &spc::TEST_UNIT_READY,
    &spc::REQUEST_SENSE,
    &spc::INQUIRY,
    &spc::MODE_SENSE6,
    &spc::MODE_SENSE10,
    &spc::MODE_SELECT6,
    &sbc::READ_CAPACITY16,
    &smc::POSITION_TO_ELEMENT,
];

/// Find a command by name. Case, `-` and `_` are ignored, so
/// `read-capacity-16` finds `readcapacity16`.
pub fn lookup(name: &str) -> Option<&'static CommandDefinition> {
    let wanted: String = name
        .chars()
        .filter(|c| *c != '-' && *c != '_')
        .map(|c| c.to_ascii_lowercase())
        .collect();
    COMMANDS.iter().copied().find(|def| def.name == wanted)
}
