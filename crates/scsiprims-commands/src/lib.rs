//! Field layouts for common SCSI commands and sense data.
//!
//! Each command is a [`CommandDefinition`]: its opcode, the layout of its
//! CDB, which way its data flows, and optionally the layout of the data it
//! returns. The tables are plain data consumed by `scsiprims-codec`.

pub mod definition;
pub mod mode;
pub mod registry;
pub mod sbc;
pub mod sense;
pub mod smc;
pub mod spc;

pub use definition::{CommandDefinition, DataPhase};
pub use mode::{ModeHeader, ModePage, ModeParameters, PageControl, RawModePage, MODE_PAGES};
pub use registry::{lookup, COMMANDS};
pub use sense::{SenseData, SenseKey};
