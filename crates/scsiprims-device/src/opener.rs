use std::path::Path;

use scsiprims_transport::{SgioConfig, SgioTransport};

use crate::config::SessionConfig;
use crate::error::Result;
use crate::session::DeviceSession;

/// Open a device through the SG_IO transport with default settings.
pub fn open(path: impl AsRef<Path>) -> Result<DeviceSession<SgioTransport>> {
    open_with_config(path, SessionConfig::default(), SgioConfig::default())
}

/// Open a device through the SG_IO transport with explicit configuration.
pub fn open_with_config(
    path: impl AsRef<Path>,
    session_config: SessionConfig,
    sgio_config: SgioConfig,
) -> Result<DeviceSession<SgioTransport>> {
    DeviceSession::open(SgioTransport::with_config(sgio_config), path, session_config)
}
