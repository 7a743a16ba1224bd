use std::path::{Path, PathBuf};

use bytes::Bytes;
use scsiprims_codec::CommandBlock;
use scsiprims_transport::{DeviceIdentity, Direction, Exchange, Transport, TransportError};
use tracing::{debug, info, warn};

use crate::config::SessionConfig;
use crate::error::{DeviceError, Result};
use crate::status::{classify, StatusClass};

/// An open SCSI device.
///
/// The session owns one transport handle and the identity of the device
/// node it was opened on. The handle is released by [`close`] or, failing
/// that, when the session is dropped.
///
/// A session is not synchronized; callers sharing one across threads must
/// serialize access themselves.
///
/// [`close`]: DeviceSession::close
pub struct DeviceSession<T: Transport> {
    transport: T,
    path: PathBuf,
    config: SessionConfig,
    handle: Option<T::Handle>,
    identity: Option<DeviceIdentity>,
}

impl<T: Transport> DeviceSession<T> {
    /// Open `path` through `transport` and record its identity.
    pub fn open(transport: T, path: impl AsRef<Path>, config: SessionConfig) -> Result<Self> {
        let mut session = Self {
            transport,
            path: path.as_ref().to_path_buf(),
            config,
            handle: None,
            identity: None,
        };
        session.acquire()?;
        Ok(session)
    }

    /// Release the current handle, if any, and acquire a fresh one.
    ///
    /// A failure to release the old handle is logged and otherwise ignored;
    /// only a failure to acquire the new one is returned.
    pub fn reopen(&mut self) -> Result<()> {
        if let Err(err) = self.close() {
            warn!(path = ?self.path, %err, "close failed during reopen");
        }
        self.acquire()
    }

    /// Release the handle. Closing a closed session does nothing.
    pub fn close(&mut self) -> Result<()> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };
        self.identity = None;
        self.transport.close(handle)?;
        info!(path = ?self.path, "closed device");
        Ok(())
    }

    /// Execute `cmd` and wait for it to complete.
    ///
    /// On success the response, if any, is in `cmd.datain`. On a check
    /// condition the error carries the sense bytes reported by the device.
    pub fn execute(&mut self, cmd: &mut CommandBlock) -> Result<()> {
        let direction = transfer_direction(cmd)?;
        if self.handle.is_none() {
            return Err(TransportError::NotOpen.into());
        }
        self.ensure_same_device()?;

        let handle = self.handle.as_mut().ok_or(TransportError::NotOpen)?;
        cmd.sense.fill(0);
        debug!(
            opcode = cmd.opcode,
            direction = direction.as_str(),
            datain = cmd.datain.len(),
            dataout = cmd.dataout.len(),
            "executing command"
        );

        let completion = self.transport.execute(
            handle,
            Exchange {
                direction,
                cdb: &cmd.cdb[..],
                dataout: &cmd.dataout[..],
                datain: &mut cmd.datain[..],
                sense: &mut cmd.sense[..],
            },
        )?;

        match classify(completion.status) {
            StatusClass::Success => Ok(()),
            StatusClass::CheckCondition => {
                let len = completion.sense_len.min(cmd.sense.len());
                debug!(opcode = cmd.opcode, sense_len = len, "check condition");
                Err(DeviceError::CheckCondition {
                    sense: Bytes::copy_from_slice(&cmd.sense[..len]),
                })
            }
            StatusClass::TransportFailure => Err(DeviceError::TransportFailure {
                status: completion.status,
            }),
        }
    }

    /// Returns true while the session holds a handle.
    pub fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    /// The device path this session is bound to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Identity recorded at the last successful open.
    pub fn identity(&self) -> Option<DeviceIdentity> {
        self.identity
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Borrow the underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn acquire(&mut self) -> Result<()> {
        let handle = self.transport.open(&self.path, self.config.writable)?;
        let identity = match self.transport.probe(&self.path) {
            Ok(identity) => identity,
            Err(err) => {
                if let Err(close_err) = self.transport.close(handle) {
                    warn!(
                        path = ?self.path,
                        err = %close_err,
                        "close failed after identity lookup error"
                    );
                }
                return Err(err.into());
            }
        };
        info!(
            path = ?self.path,
            transport = self.transport.transport_name(),
            ?identity,
            "opened device"
        );
        self.handle = Some(handle);
        self.identity = Some(identity);
        Ok(())
    }

    fn ensure_same_device(&mut self) -> Result<()> {
        if !self.config.detect_replugged {
            return Ok(());
        }
        let live = self.transport.probe(&self.path)?;
        if self.identity == Some(live) {
            return Ok(());
        }
        warn!(
            path = ?self.path,
            recorded = ?self.identity,
            ?live,
            "device replaced at path, reopening"
        );
        self.reopen()
    }
}

impl<T: Transport> Drop for DeviceSession<T> {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            warn!(path = ?self.path, %err, "failed to close device on drop");
        }
    }
}

impl<T: Transport> std::fmt::Debug for DeviceSession<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceSession")
            .field("path", &self.path)
            .field("transport", &self.transport.transport_name())
            .field("open", &self.is_open())
            .field("identity", &self.identity)
            .finish()
    }
}

fn transfer_direction(cmd: &CommandBlock) -> Result<Direction> {
    match (cmd.datain.is_empty(), cmd.dataout.is_empty()) {
        (true, true) => Ok(Direction::None),
        (false, true) => Ok(Direction::FromDevice),
        (true, false) => Ok(Direction::ToDevice),
        (false, false) => Err(DeviceError::UnsupportedTransfer {
            datain: cmd.datain.len(),
            dataout: cmd.dataout.len(),
        }),
    }
}
