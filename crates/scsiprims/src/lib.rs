//! SCSI command block codec and device execution.
//!
//! scsiprims packs declarative field layouts into SCSI command descriptor
//! blocks, runs them against a device through a pass-through transport, and
//! unpacks the data that comes back.
//!
//! # Crate Structure
//!
//! - [`transport`] - Pass-through transport abstraction (Linux SG_IO)
//! - [`codec`] - Field layouts, bit-field pack/unpack, command envelopes
//! - [`device`] - Device sessions, replug detection, status errors
//! - [`commands`] - Shipped command layouts and sense decoding (behind `commands` feature)

/// Re-export transport types.
pub mod transport {
    pub use scsiprims_transport::*;
}

/// Re-export codec types.
pub mod codec {
    pub use scsiprims_codec::*;
}

/// Re-export device types.
pub mod device {
    pub use scsiprims_device::*;
}

/// Re-export command definitions (requires `commands` feature).
#[cfg(feature = "commands")]
pub mod commands {
    pub use scsiprims_commands::*;
}
