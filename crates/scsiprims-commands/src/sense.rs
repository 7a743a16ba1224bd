//! Sense data returned with a CHECK CONDITION status.

use std::fmt;

use scsiprims_codec::{unmarshall, CodecError, FieldLayout, FieldSpec, FieldValues, Result};

/// Fixed-format sense data (response codes 0x70 and 0x71).
pub static FIXED_SENSE: [FieldSpec; 15] = [
    FieldSpec::new("valid", 0x80, 0),
    FieldSpec::new("response_code", 0x7f, 0),
    FieldSpec::new("filemark", 0x80, 2),
    FieldSpec::new("eom", 0x40, 2),
    FieldSpec::new("ili", 0x20, 2),
    FieldSpec::new("sdat_ovfl", 0x10, 2),
    FieldSpec::new("sense_key", 0x0f, 2),
    FieldSpec::new("information", 0xffff_ffff, 3),
    FieldSpec::new("additional_sense_length", 0xff, 7),
    FieldSpec::new("command_specific_information", 0xffff_ffff, 8),
    FieldSpec::new("additional_sense_code", 0xff, 12),
    FieldSpec::new("additional_sense_code_qualifier", 0xff, 13),
    FieldSpec::new("field_replaceable_unit_code", 0xff, 14),
    FieldSpec::new("sksv", 0x80, 15),
    FieldSpec::new("sense_key_specific", 0x7f_ffff, 15),
];

/// Descriptor-format sense data header (response codes 0x72 and 0x73).
pub static DESCRIPTOR_SENSE: [FieldSpec; 6] = [
    FieldSpec::new("response_code", 0x7f, 0),
    FieldSpec::new("sense_key", 0x0f, 1),
    FieldSpec::new("additional_sense_code", 0xff, 2),
    FieldSpec::new("additional_sense_code_qualifier", 0xff, 3),
    FieldSpec::new("sdat_ovfl", 0x80, 4),
    FieldSpec::new("additional_sense_length", 0xff, 7),
];

/// Sense keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SenseKey {
    NoSense = 0x00,
    RecoveredError = 0x01,
    NotReady = 0x02,
    MediumError = 0x03,
    HardwareError = 0x04,
    IllegalRequest = 0x05,
    UnitAttention = 0x06,
    DataProtect = 0x07,
    BlankCheck = 0x08,
    VendorSpecific = 0x09,
    CopyAborted = 0x0a,
    AbortedCommand = 0x0b,
    Reserved = 0x0c,
    VolumeOverflow = 0x0d,
    Miscompare = 0x0e,
    Completed = 0x0f,
}

impl SenseKey {
    /// Sense key for the low nibble of `code`.
    pub fn from_code(code: u8) -> Self {
        match code & 0x0f {
            0x00 => SenseKey::NoSense,
            0x01 => SenseKey::RecoveredError,
            0x02 => SenseKey::NotReady,
            0x03 => SenseKey::MediumError,
            0x04 => SenseKey::HardwareError,
            0x05 => SenseKey::IllegalRequest,
            0x06 => SenseKey::UnitAttention,
            0x07 => SenseKey::DataProtect,
            0x08 => SenseKey::BlankCheck,
            0x09 => SenseKey::VendorSpecific,
            0x0a => SenseKey::CopyAborted,
            0x0b => SenseKey::AbortedCommand,
            0x0c => SenseKey::Reserved,
            0x0d => SenseKey::VolumeOverflow,
            0x0e => SenseKey::Miscompare,
            _ => SenseKey::Completed,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            SenseKey::NoSense => "NO SENSE",
            SenseKey::RecoveredError => "RECOVERED ERROR",
            SenseKey::NotReady => "NOT READY",
            SenseKey::MediumError => "MEDIUM ERROR",
            SenseKey::HardwareError => "HARDWARE ERROR",
            SenseKey::IllegalRequest => "ILLEGAL REQUEST",
            SenseKey::UnitAttention => "UNIT ATTENTION",
            SenseKey::DataProtect => "DATA PROTECT",
            SenseKey::BlankCheck => "BLANK CHECK",
            SenseKey::VendorSpecific => "VENDOR SPECIFIC",
            SenseKey::CopyAborted => "COPY ABORTED",
            SenseKey::AbortedCommand => "ABORTED COMMAND",
            SenseKey::Reserved => "RESERVED",
            SenseKey::VolumeOverflow => "VOLUME OVERFLOW",
            SenseKey::Miscompare => "MISCOMPARE",
            SenseKey::Completed => "COMPLETED",
        }
    }
}

impl fmt::Display for SenseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Decoded sense data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SenseData {
    pub response_code: u8,
    pub sense_key: SenseKey,
    /// Additional sense code.
    pub asc: u8,
    /// Additional sense code qualifier.
    pub ascq: u8,
    /// Every field of the format's layout.
    pub fields: FieldValues,
}

impl SenseData {
    /// Decode fixed- or descriptor-format sense data.
    ///
    /// Devices often return less than a full fixed-format block; missing
    /// trailing bytes read as zero.
    pub fn parse(sense: &[u8]) -> Result<Self> {
        let Some(first) = sense.first() else {
            return Err(CodecError::BufferTooSmall {
                needed: 1,
                actual: 0,
            });
        };
        let layout = match first & 0x7f {
            0x72 | 0x73 => FieldLayout::new(&DESCRIPTOR_SENSE),
            _ => FieldLayout::new(&FIXED_SENSE),
        };

        let mut padded = sense.to_vec();
        if padded.len() < layout.byte_len() {
            padded.resize(layout.byte_len(), 0);
        }
        let fields = unmarshall(&layout, &padded)?;

        let byte = |name: &str| fields.get(name).unwrap_or(0) as u8;
        Ok(Self {
            response_code: byte("response_code"),
            sense_key: SenseKey::from_code(byte("sense_key")),
            asc: byte("additional_sense_code"),
            ascq: byte("additional_sense_code_qualifier"),
            fields,
        })
    }
}

impl fmt::Display for SenseData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (asc {:#04x}, ascq {:#04x})",
            self.sense_key, self.asc, self.ascq
        )
    }
}
