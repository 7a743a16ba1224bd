use std::path::Path;
use std::time::Duration;

use crate::error::{Result, TransportError};

#[cfg(not(target_os = "linux"))]
pub use other::UnsupportedHandle;

/// Default command timeout: 30 seconds.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for the SG_IO transport.
#[derive(Debug, Clone)]
pub struct SgioConfig {
    /// How long the kernel waits for a command before aborting it.
    pub timeout: Duration,
}

impl Default for SgioConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Linux SCSI generic pass-through transport.
///
/// Commands are submitted with the `SG_IO` ioctl on a device node under
/// `/dev/` (`/dev/sg*`, or a block device such as `/dev/sda`).
#[derive(Debug, Clone, Default)]
pub struct SgioTransport {
    config: SgioConfig,
}

impl SgioTransport {
    /// Create a transport with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a transport with explicit configuration.
    pub fn with_config(config: SgioConfig) -> Self {
        Self { config }
    }

    /// Current configuration.
    pub fn config(&self) -> &SgioConfig {
        &self.config
    }
}

fn require_device_path(path: &Path) -> Result<()> {
    if path.starts_with("/dev/") {
        Ok(())
    } else {
        Err(TransportError::Unsupported(format!(
            "no backend implemented for {}",
            path.display()
        )))
    }
}

#[cfg(target_os = "linux")]
mod linux {
    use std::fs::{File, OpenOptions};
    use std::os::fd::{AsRawFd, IntoRawFd};
    use std::path::Path;

    use tracing::{debug, info};

    use super::{require_device_path, SgioTransport};
    use crate::error::{Result, TransportError};
    use crate::status;
    use crate::traits::{Completion, DeviceIdentity, Direction, Exchange, Transport};

    const SG_IO: libc::c_ulong = 0x2285;
    const SG_INTERFACE_ID: libc::c_int = b'S' as libc::c_int;
    const SG_DXFER_NONE: libc::c_int = -1;
    const SG_DXFER_TO_DEV: libc::c_int = -2;
    const SG_DXFER_FROM_DEV: libc::c_int = -3;

    /// `driver_status` low nibble reporting that sense data was collected.
    const DRIVER_SENSE: u16 = 0x08;
    const DRIVER_STATUS_MASK: u16 = 0x0f;

    /// `struct sg_io_hdr` from `<scsi/sg.h>`.
    #[repr(C)]
    #[allow(dead_code)]
    struct SgIoHdr {
        interface_id: libc::c_int,
        dxfer_direction: libc::c_int,
        cmd_len: libc::c_uchar,
        mx_sb_len: libc::c_uchar,
        iovec_count: libc::c_ushort,
        dxfer_len: libc::c_uint,
        dxferp: *mut libc::c_void,
        cmdp: *mut libc::c_uchar,
        sbp: *mut libc::c_uchar,
        timeout: libc::c_uint,
        flags: libc::c_uint,
        pack_id: libc::c_int,
        usr_ptr: *mut libc::c_void,
        status: libc::c_uchar,
        masked_status: libc::c_uchar,
        msg_status: libc::c_uchar,
        sb_len_wr: libc::c_uchar,
        host_status: libc::c_ushort,
        driver_status: libc::c_ushort,
        resid: libc::c_int,
        duration: libc::c_uint,
        info: libc::c_uint,
    }

    fn invalid_input(message: String) -> TransportError {
        TransportError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            message,
        ))
    }

    impl Transport for SgioTransport {
        type Handle = File;

        fn open(&mut self, path: &Path, writable: bool) -> Result<File> {
            require_device_path(path)?;
            let file = OpenOptions::new()
                .read(true)
                .write(writable)
                .open(path)
                .map_err(|e| TransportError::Open {
                    path: path.to_path_buf(),
                    source: e,
                })?;
            info!(?path, writable, "opened sg device");
            Ok(file)
        }

        fn close(&mut self, handle: File) -> Result<()> {
            let fd = handle.into_raw_fd();
            // SAFETY: `fd` was just released from an owned `File`; nothing else
            // refers to it and it is closed exactly once here.
            let rc = unsafe { libc::close(fd) };
            if rc == 0 {
                debug!(fd, "closed sg device");
                Ok(())
            } else {
                Err(TransportError::Close(std::io::Error::last_os_error()))
            }
        }

        fn execute(&mut self, handle: &mut File, exchange: Exchange<'_>) -> Result<Completion> {
            let Exchange {
                direction,
                cdb,
                dataout,
                datain,
                sense,
            } = exchange;

            let cmd_len = u8::try_from(cdb.len())
                .map_err(|_| invalid_input(format!("cdb too long ({} bytes)", cdb.len())))?;
            let mx_sb_len = u8::try_from(sense.len()).unwrap_or(u8::MAX);

            let (dxfer_direction, dxferp, dxfer_len) = match direction {
                Direction::None => (SG_DXFER_NONE, std::ptr::null_mut(), 0),
                Direction::ToDevice => (
                    SG_DXFER_TO_DEV,
                    dataout.as_ptr().cast_mut().cast::<libc::c_void>(),
                    dataout.len(),
                ),
                Direction::FromDevice => (
                    SG_DXFER_FROM_DEV,
                    datain.as_mut_ptr().cast::<libc::c_void>(),
                    datain.len(),
                ),
            };
            let dxfer_len = u32::try_from(dxfer_len)
                .map_err(|_| invalid_input(format!("transfer too long ({dxfer_len} bytes)")))?;
            let timeout = u32::try_from(self.config.timeout.as_millis()).unwrap_or(u32::MAX);

            let mut hdr = SgIoHdr {
                interface_id: SG_INTERFACE_ID,
                dxfer_direction,
                cmd_len,
                mx_sb_len,
                iovec_count: 0,
                dxfer_len,
                dxferp,
                // The kernel only reads the command block.
                cmdp: cdb.as_ptr().cast_mut(),
                sbp: sense.as_mut_ptr(),
                timeout,
                flags: 0,
                pack_id: 0,
                usr_ptr: std::ptr::null_mut(),
                status: 0,
                masked_status: 0,
                msg_status: 0,
                sb_len_wr: 0,
                host_status: 0,
                driver_status: 0,
                resid: 0,
                duration: 0,
                info: 0,
            };

            // SAFETY: every pointer in `hdr` refers to a live slice borrowed for
            // the duration of this call, with lengths set from those slices.
            // The ioctl blocks until the kernel is done with the buffers.
            let rc = unsafe {
                libc::ioctl(
                    handle.as_raw_fd(),
                    SG_IO as _,
                    &mut hdr as *mut SgIoHdr,
                )
            };
            if rc < 0 {
                return Err(TransportError::Io(std::io::Error::last_os_error()));
            }

            let sense_len = usize::from(hdr.sb_len_wr).min(sense.len());
            let driver = hdr.driver_status & DRIVER_STATUS_MASK;
            let status = if i32::from(hdr.status) == status::CHECK_CONDITION
                || (driver == DRIVER_SENSE && sense_len > 0)
            {
                status::CHECK_CONDITION
            } else if hdr.host_status != 0 || (driver != 0 && driver != DRIVER_SENSE) {
                debug!(
                    host_status = hdr.host_status,
                    driver_status = hdr.driver_status,
                    "sg transfer failed"
                );
                status::SGIO_ERROR
            } else {
                i32::from(hdr.status)
            };

            Ok(Completion { status, sense_len })
        }

        fn probe(&self, path: &Path) -> Result<DeviceIdentity> {
            DeviceIdentity::of(path)
        }

        fn transport_name(&self) -> &'static str {
            "linux-sg-io"
        }
    }
}

#[cfg(not(target_os = "linux"))]
mod other {
    use std::path::Path;

    use super::{require_device_path, SgioTransport};
    use crate::error::{Result, TransportError};
    use crate::traits::{Completion, DeviceIdentity, Exchange, Transport};

    /// Placeholder handle on platforms without `SG_IO`.
    #[derive(Debug)]
    pub struct UnsupportedHandle;

    fn unsupported() -> TransportError {
        TransportError::Unsupported("SG_IO is only available on Linux".to_string())
    }

    impl Transport for SgioTransport {
        type Handle = UnsupportedHandle;

        fn open(&mut self, path: &Path, _writable: bool) -> Result<UnsupportedHandle> {
            require_device_path(path)?;
            Err(unsupported())
        }

        fn close(&mut self, _handle: UnsupportedHandle) -> Result<()> {
            Ok(())
        }

        fn execute(
            &mut self,
            _handle: &mut UnsupportedHandle,
            _exchange: Exchange<'_>,
        ) -> Result<Completion> {
            Err(unsupported())
        }

        #[cfg(unix)]
        fn probe(&self, path: &Path) -> Result<DeviceIdentity> {
            DeviceIdentity::of(path)
        }

        #[cfg(not(unix))]
        fn probe(&self, path: &Path) -> Result<DeviceIdentity> {
            Err(TransportError::Unsupported(format!(
                "cannot probe {}",
                path.display()
            )))
        }

        fn transport_name(&self) -> &'static str {
            "unsupported"
        }
    }
}

#[cfg(all(test, target_os = "linux"))]
mod tests {
    use super::*;
    use crate::traits::{Direction, Exchange, Transport};

    fn unique_temp_dir(tag: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "scsiprims-{tag}-{}-{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .expect("time should be after epoch")
                .as_nanos()
        ));
        std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
        dir
    }

    #[test]
    fn open_rejects_paths_outside_dev() {
        let mut transport = SgioTransport::new();
        let result = transport.open(Path::new("/tmp/not-a-device"), false);
        assert!(matches!(result, Err(TransportError::Unsupported(_))));
    }

    #[test]
    fn open_missing_device_reports_path() {
        let mut transport = SgioTransport::new();
        let result = transport.open(Path::new("/dev/scsiprims-does-not-exist"), false);
        match result {
            Err(TransportError::Open { path, source }) => {
                assert_eq!(path, Path::new("/dev/scsiprims-does-not-exist"));
                assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
            }
            other => panic!("expected open error, got {other:?}"),
        }
    }

    #[test]
    fn execute_on_non_sg_node_fails_before_completion() {
        let mut transport = SgioTransport::new();
        let mut handle = transport
            .open(Path::new("/dev/null"), false)
            .expect("/dev/null should open");

        let cdb = [0u8; 6];
        let mut sense = [0u8; 32];
        let result = transport.execute(
            &mut handle,
            Exchange {
                direction: Direction::None,
                cdb: &cdb,
                dataout: &[],
                datain: &mut [],
                sense: &mut sense,
            },
        );
        assert!(matches!(result, Err(TransportError::Io(_))));

        transport.close(handle).expect("close should succeed");
    }

    #[test]
    fn probe_detects_replaced_node() {
        let dir = unique_temp_dir("probe");
        let node = dir.join("node");
        std::fs::write(&node, b"first").expect("node should be writable");

        let transport = SgioTransport::new();
        let before = transport.probe(&node).expect("probe should succeed");
        assert_eq!(before, transport.probe(&node).expect("probe should succeed"));

        // Keep the old inode alive so the filesystem cannot reuse its number.
        let parked = dir.join("parked");
        std::fs::rename(&node, &parked).expect("rename should succeed");
        std::fs::write(&node, b"second").expect("replacement should be writable");

        let after = transport.probe(&node).expect("probe should succeed");
        assert_ne!(before, after);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn probe_missing_path_is_probe_error() {
        let transport = SgioTransport::new();
        let result = transport.probe(Path::new("/dev/scsiprims-does-not-exist"));
        assert!(matches!(result, Err(TransportError::Probe { .. })));
    }

    #[test]
    fn default_timeout_is_thirty_seconds() {
        assert_eq!(SgioTransport::new().config().timeout, DEFAULT_TIMEOUT);
    }
}
