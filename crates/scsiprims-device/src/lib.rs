//! SCSI device sessions.
//!
//! A [`DeviceSession`] owns one transport handle for one device path. It
//! executes [`CommandBlock`]s, checks before each execution that the device
//! at the path is still the one it opened, and turns raw status codes into
//! [`DeviceError`] variants.
//!
//! [`CommandBlock`]: scsiprims_codec::CommandBlock

pub mod config;
pub mod error;
pub mod opener;
pub mod session;
pub mod status;

pub use config::SessionConfig;
pub use error::{DeviceError, Result};
pub use opener::{open, open_with_config};
pub use session::DeviceSession;
pub use status::{classify, StatusClass};
