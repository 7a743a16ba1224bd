//! Low-level SCSI pass-through transport abstraction.
//!
//! This is the lowest layer of scsiprims. It moves an already encoded command
//! block and its data buffers to a device and reports the raw status byte.
//! It knows nothing about field layouts or what a command means.
//!
//! - [`Transport`] is the seam every backend implements.
//! - [`SgioTransport`] is the Linux `SG_IO` backend.
//! - [`status`] holds the raw status codes a transport can report.

pub mod error;
pub mod sgio;
pub mod status;
pub mod traits;

pub use error::{Result, TransportError};
pub use sgio::{SgioConfig, SgioTransport};
pub use traits::{Completion, DeviceIdentity, Direction, Exchange, Transport};
