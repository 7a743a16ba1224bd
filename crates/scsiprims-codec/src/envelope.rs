use bytes::{Bytes, BytesMut};
use tracing::debug;

use crate::codec::{pack, unpack};
use crate::error::{CodecError, Result};
use crate::field::FieldLayout;
use crate::values::FieldValues;

/// Name of the field every command layout reserves for the operation code.
pub const OPCODE_FIELD: &str = "opcode";

/// Default sense buffer capacity.
pub const DEFAULT_SENSE_LEN: usize = 32;

/// Longest command block a pass-through request can carry.
pub const MAX_CDB_LEN: usize = u8::MAX as usize;

/// Largest data phase a command block allocates.
pub const MAX_TRANSFER_LEN: usize = 16 << 20;

/// Declared data-transfer lengths of a command.
///
/// A command moves data in at most one direction; a value with both lengths
/// set is representable but is rejected when the command is executed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransferLength {
    /// Bytes expected from the device.
    pub datain: usize,
    /// Bytes sent to the device.
    pub dataout: usize,
}

impl TransferLength {
    /// No data phase.
    pub const NONE: Self = Self {
        datain: 0,
        dataout: 0,
    };

    /// Receive `len` bytes from the device.
    pub const fn data_in(len: usize) -> Self {
        Self {
            datain: len,
            dataout: 0,
        }
    }

    /// Send `len` bytes to the device.
    pub const fn data_out(len: usize) -> Self {
        Self {
            datain: 0,
            dataout: len,
        }
    }
}

/// A command ready to execute: the packed CDB plus its data and sense buffers.
///
/// Built once per invocation. After a successful execution `datain` holds
/// the device's response; after a check condition `sense` holds the sense
/// data. A block may be executed again as-is to retry the same command.
#[derive(Debug, Clone)]
pub struct CommandBlock {
    /// Operation code injected into the `opcode` field.
    pub opcode: u8,
    /// The packed command descriptor block.
    pub cdb: Bytes,
    /// Device to caller buffer.
    pub datain: BytesMut,
    /// Caller to device buffer.
    pub dataout: BytesMut,
    /// Sense buffer filled by the transport on abnormal completion.
    pub sense: BytesMut,
}

impl CommandBlock {
    /// Pack a command block from `layout` and `values`, with `opcode` written
    /// into the layout's `opcode` field.
    ///
    /// The CDB is sized to the layout's full length, at most
    /// [`MAX_CDB_LEN`]. Data buffers are zeroed and sized from `transfer`,
    /// each at most [`MAX_TRANSFER_LEN`].
    pub fn build(
        opcode: u8,
        layout: &FieldLayout,
        values: &FieldValues,
        transfer: TransferLength,
    ) -> Result<Self> {
        if !layout.contains(OPCODE_FIELD) {
            return Err(CodecError::MissingOpcodeField);
        }
        layout.validate()?;
        let cdb_len = layout.byte_len();
        if cdb_len > MAX_CDB_LEN {
            return Err(CodecError::CdbTooLong {
                len: cdb_len,
                max: MAX_CDB_LEN,
            });
        }
        let largest = transfer.datain.max(transfer.dataout);
        if largest > MAX_TRANSFER_LEN {
            return Err(CodecError::TransferTooLarge {
                len: largest,
                max: MAX_TRANSFER_LEN,
            });
        }
        let values = values.clone().with(OPCODE_FIELD, u64::from(opcode));

        let mut cdb = BytesMut::zeroed(cdb_len);
        pack(layout, &values, &mut cdb)?;
        debug!(
            opcode,
            cdb_len = cdb.len(),
            datain = transfer.datain,
            dataout = transfer.dataout,
            "built command block"
        );

        Ok(Self {
            opcode,
            cdb: cdb.freeze(),
            datain: BytesMut::zeroed(transfer.datain),
            dataout: BytesMut::zeroed(transfer.dataout),
            sense: BytesMut::zeroed(DEFAULT_SENSE_LEN),
        })
    }

    /// Replace the outgoing payload.
    pub fn with_dataout(mut self, data: impl AsRef<[u8]>) -> Self {
        self.dataout = BytesMut::from(data.as_ref());
        self
    }

    /// Interpret `datain` with a response layout.
    pub fn unmarshall_datain(&self, layout: &FieldLayout) -> Result<FieldValues> {
        unmarshall(layout, &self.datain)
    }
}

/// Interpret a response payload with its layout.
pub fn unmarshall(layout: &FieldLayout, data: &[u8]) -> Result<FieldValues> {
    unpack(layout, data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldSpec;

    static INQUIRY: [FieldSpec; 4] = [
        FieldSpec::new("opcode", 0xff, 0),
        FieldSpec::new("evpd", 0x01, 1),
        FieldSpec::new("page_code", 0xff, 2),
        FieldSpec::new("alloc_len", 0xffff, 3),
    ];

    static STANDARD_INQUIRY_DATA: [FieldSpec; 2] = [
        FieldSpec::new("peripheral_qualifier", 0xe0, 0),
        FieldSpec::new("peripheral_device_type", 0x1f, 0),
    ];

    #[test]
    fn build_injects_opcode_and_sizes_buffers() {
        let layout = FieldLayout::sized(&INQUIRY, 6);
        let values = FieldValues::from([("alloc_len", 96)]);

        let cmd = CommandBlock::build(0x12, &layout, &values, TransferLength::data_in(96))
            .expect("build should succeed");

        assert_eq!(cmd.opcode, 0x12);
        assert_eq!(cmd.cdb.as_ref(), &[0x12, 0x00, 0x00, 0x00, 0x60, 0x00]);
        assert_eq!(cmd.datain.len(), 96);
        assert!(cmd.dataout.is_empty());
        assert_eq!(cmd.sense.len(), DEFAULT_SENSE_LEN);
        assert!(cmd.sense.iter().all(|b| *b == 0));
    }

    #[test]
    fn explicit_opcode_overrides_supplied_value() {
        let layout = FieldLayout::new(&INQUIRY);
        let values = FieldValues::from([("opcode", 0x00)]);
        let cmd = CommandBlock::build(0x12, &layout, &values, TransferLength::NONE)
            .expect("build should succeed");
        assert_eq!(cmd.cdb[0], 0x12);
    }

    #[test]
    fn build_requires_opcode_field() {
        let layout = FieldLayout::new(&STANDARD_INQUIRY_DATA);
        let err = CommandBlock::build(0x12, &layout, &FieldValues::new(), TransferLength::NONE)
            .expect_err("layout without opcode should fail");
        assert_eq!(err, CodecError::MissingOpcodeField);
    }

    #[test]
    fn build_rejects_unknown_fields() {
        let layout = FieldLayout::new(&INQUIRY);
        let err = CommandBlock::build(
            0x12,
            &layout,
            &FieldValues::from([("allocation_length", 1)]),
            TransferLength::NONE,
        )
        .expect_err("unknown field should fail");
        assert_eq!(err, CodecError::UnknownField("allocation_length".to_string()));
    }

    #[test]
    fn build_rejects_oversized_cdb() {
        let layout = FieldLayout::sized(&INQUIRY, MAX_CDB_LEN + 1);
        let err = CommandBlock::build(0x12, &layout, &FieldValues::new(), TransferLength::NONE)
            .expect_err("cdb longer than a pass-through request should fail");
        assert_eq!(
            err,
            CodecError::CdbTooLong {
                len: MAX_CDB_LEN + 1,
                max: MAX_CDB_LEN
            }
        );
    }

    #[test]
    fn build_rejects_oversized_transfer() {
        let layout = FieldLayout::new(&INQUIRY);
        let err = CommandBlock::build(
            0x12,
            &layout,
            &FieldValues::new(),
            TransferLength::data_in(0xffff_ffff),
        )
        .expect_err("4 GiB allocation length should fail");
        assert_eq!(
            err,
            CodecError::TransferTooLarge {
                len: 0xffff_ffff,
                max: MAX_TRANSFER_LEN
            }
        );

        CommandBlock::build(
            0x12,
            &layout,
            &FieldValues::new(),
            TransferLength::data_in(MAX_TRANSFER_LEN),
        )
        .expect("transfer at the limit should build");
    }

    #[test]
    fn unmarshall_reads_response_layout() {
        let layout = FieldLayout::new(&INQUIRY);
        let mut cmd = CommandBlock::build(0x12, &layout, &FieldValues::new(), TransferLength::data_in(36))
            .expect("build should succeed");
        cmd.datain[0] = 0x05;

        let data = cmd
            .unmarshall_datain(&FieldLayout::new(&STANDARD_INQUIRY_DATA))
            .expect("unmarshall should succeed");
        assert_eq!(data.get("peripheral_qualifier"), Some(0));
        assert_eq!(data.get("peripheral_device_type"), Some(5));
    }

    #[test]
    fn with_dataout_replaces_payload() {
        let layout = FieldLayout::new(&INQUIRY);
        let cmd = CommandBlock::build(0x15, &layout, &FieldValues::new(), TransferLength::NONE)
            .expect("build should succeed")
            .with_dataout([1u8, 2, 3]);
        assert_eq!(cmd.dataout.as_ref(), &[1, 2, 3]);
    }
}
