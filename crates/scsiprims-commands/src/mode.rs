//! Mode parameters: the headers returned by MODE SENSE, the mode pages that
//! follow them, and the page tables MODE SELECT sends back.
//!
//! Page layouts are positioned from the first byte of the page, so the page
//! header (`ps`, `spf`, `page_code`, and `page_length`, plus `sub_page_code`
//! for sub-page format) is part of every table.

use std::fmt;

use bytes::BytesMut;
use scsiprims_codec::{marshall, unmarshall, CodecError, FieldLayout, FieldSpec, FieldValues, Result};

/// Mode parameter header of MODE SENSE(6) / MODE SELECT(6) data.
pub static MODE_PARAMETER_HEADER6: [FieldSpec; 4] = [
    FieldSpec::new("mode_data_length", 0xff, 0),
    FieldSpec::new("medium_type", 0xff, 1),
    FieldSpec::new("device_specific_parameter", 0xff, 2),
    FieldSpec::new("block_descriptor_length", 0xff, 3),
];

/// Mode parameter header of MODE SENSE(10) / MODE SELECT(10) data.
pub static MODE_PARAMETER_HEADER10: [FieldSpec; 5] = [
    FieldSpec::new("mode_data_length", 0xffff, 0),
    FieldSpec::new("medium_type", 0xff, 2),
    FieldSpec::new("device_specific_parameter", 0xff, 3),
    FieldSpec::new("longlba", 0x01, 4),
    FieldSpec::new("block_descriptor_length", 0xffff, 6),
];

/// Header of a page in page_0 format.
pub static PAGE_ZERO: [FieldSpec; 4] = [
    FieldSpec::new("ps", 0x80, 0),
    FieldSpec::new("spf", 0x40, 0),
    FieldSpec::new("page_code", 0x3f, 0),
    FieldSpec::new("page_length", 0xff, 1),
];

/// Header of a page in sub_page format.
pub static SUB_PAGE: [FieldSpec; 5] = [
    FieldSpec::new("ps", 0x80, 0),
    FieldSpec::new("spf", 0x40, 0),
    FieldSpec::new("page_code", 0x3f, 0),
    FieldSpec::new("sub_page_code", 0xff, 1),
    FieldSpec::new("page_length", 0xffff, 2),
];

static DISCONNECT_RECONNECT_FIELDS: [FieldSpec; 15] = [
    FieldSpec::new("ps", 0x80, 0),
    FieldSpec::new("spf", 0x40, 0),
    FieldSpec::new("page_code", 0x3f, 0),
    FieldSpec::new("page_length", 0xff, 1),
    FieldSpec::new("buffer_full_ratio", 0xff, 2),
    FieldSpec::new("buffer_empty_ratio", 0xff, 3),
    FieldSpec::new("bus_inactivity_limit", 0xffff, 4),
    FieldSpec::new("disconnect_time_limit", 0xffff, 6),
    FieldSpec::new("connect_time_limit", 0xffff, 8),
    FieldSpec::new("maximum_burst_size", 0xffff, 10),
    FieldSpec::new("emdp", 0x80, 12),
    FieldSpec::new("fair_arbitration", 0x70, 12),
    FieldSpec::new("dimm", 0x08, 12),
    FieldSpec::new("dtdc", 0x07, 12),
    FieldSpec::new("first_burst_size", 0xffff, 14),
];

static CONTROL_FIELDS: [FieldSpec; 24] = [
    FieldSpec::new("ps", 0x80, 0),
    FieldSpec::new("spf", 0x40, 0),
    FieldSpec::new("page_code", 0x3f, 0),
    FieldSpec::new("page_length", 0xff, 1),
    FieldSpec::new("tst", 0xe0, 2),
    FieldSpec::new("tmf_only", 0x10, 2),
    FieldSpec::new("dpicz", 0x08, 2),
    FieldSpec::new("d_sense", 0x04, 2),
    FieldSpec::new("gltsd", 0x02, 2),
    FieldSpec::new("rlec", 0x01, 2),
    FieldSpec::new("queue_algorithm_modifier", 0xf0, 3),
    FieldSpec::new("nuar", 0x08, 3),
    FieldSpec::new("qerr", 0x06, 3),
    FieldSpec::new("vs", 0x80, 4),
    FieldSpec::new("rac", 0x40, 4),
    FieldSpec::new("ua_intlck_ctrl", 0x30, 4),
    FieldSpec::new("swp", 0x08, 4),
    FieldSpec::new("ato", 0x80, 5),
    FieldSpec::new("tas", 0x40, 5),
    FieldSpec::new("atmpe", 0x20, 5),
    FieldSpec::new("rwwp", 0x10, 5),
    FieldSpec::new("autoload_mode", 0x07, 5),
    FieldSpec::new("busy_timeout_period", 0xffff, 8),
    FieldSpec::new("extended_self_test_completion_time", 0xffff, 10),
];

static CONTROL_EXTENSION_FIELDS: [FieldSpec; 10] = [
    FieldSpec::new("ps", 0x80, 0),
    FieldSpec::new("spf", 0x40, 0),
    FieldSpec::new("page_code", 0x3f, 0),
    FieldSpec::new("sub_page_code", 0xff, 1),
    FieldSpec::new("page_length", 0xffff, 2),
    FieldSpec::new("tcmos", 0x04, 4),
    FieldSpec::new("scsip", 0x02, 4),
    FieldSpec::new("ialuae", 0x01, 4),
    FieldSpec::new("initial_command_priority", 0x0f, 5),
    FieldSpec::new("maximum_sense_data_length", 0xff, 6),
];

static PROTOCOL_SPECIFIC_LOGICAL_UNIT_FIELDS: [FieldSpec; 6] = [
    FieldSpec::new("ps", 0x80, 0),
    FieldSpec::new("spf", 0x40, 0),
    FieldSpec::new("page_code", 0x3f, 0),
    FieldSpec::new("page_length", 0xff, 1),
    FieldSpec::new("protocol_specific_mode_parameters", 0xf0, 2),
    FieldSpec::new("protocol_identifier", 0x0f, 2),
];

static POWER_CONDITION_FIELDS: [FieldSpec; 18] = [
    FieldSpec::new("ps", 0x80, 0),
    FieldSpec::new("spf", 0x40, 0),
    FieldSpec::new("page_code", 0x3f, 0),
    FieldSpec::new("page_length", 0xff, 1),
    FieldSpec::new("pm_bg_precedence", 0xc0, 2),
    FieldSpec::new("standby_y", 0x01, 2),
    FieldSpec::new("idle_c", 0x08, 3),
    FieldSpec::new("idle_b", 0x04, 3),
    FieldSpec::new("idle_a", 0x02, 3),
    FieldSpec::new("standby_z", 0x01, 3),
    FieldSpec::new("idle_a_condition_timer", 0xffff_ffff, 4),
    FieldSpec::new("standby_z_condition_timer", 0xffff_ffff, 8),
    FieldSpec::new("idle_b_condition_timer", 0xffff_ffff, 12),
    FieldSpec::new("idle_c_condition_timer", 0xffff_ffff, 16),
    FieldSpec::new("standby_y_condition_timer", 0xffff_ffff, 20),
    FieldSpec::new("ccf_idle", 0xc0, 39),
    FieldSpec::new("ccf_standby", 0x30, 39),
    FieldSpec::new("ccf_stopped", 0x0c, 39),
];

static POWER_CONSUMPTION_FIELDS: [FieldSpec; 7] = [
    FieldSpec::new("ps", 0x80, 0),
    FieldSpec::new("spf", 0x40, 0),
    FieldSpec::new("page_code", 0x3f, 0),
    FieldSpec::new("sub_page_code", 0xff, 1),
    FieldSpec::new("page_length", 0xffff, 2),
    FieldSpec::new("active_level", 0x03, 6),
    FieldSpec::new("power_consumption_identifier", 0xff, 7),
];

static ELEMENT_ADDRESS_ASSIGNMENT_FIELDS: [FieldSpec; 12] = [
    FieldSpec::new("ps", 0x80, 0),
    FieldSpec::new("spf", 0x40, 0),
    FieldSpec::new("page_code", 0x3f, 0),
    FieldSpec::new("page_length", 0xff, 1),
    FieldSpec::new("first_medium_transport_element_address", 0xffff, 2),
    FieldSpec::new("num_medium_transport_elements", 0xffff, 4),
    FieldSpec::new("first_storage_element_address", 0xffff, 6),
    FieldSpec::new("num_storage_elements", 0xffff, 8),
    FieldSpec::new("first_import_element_address", 0xffff, 10),
    FieldSpec::new("num_import_elements", 0xffff, 12),
    FieldSpec::new("first_data_transfer_element_address", 0xffff, 14),
    FieldSpec::new("num_data_transfer_elements", 0xffff, 16),
];

/// Page control: which copy of the mode parameters MODE SENSE returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PageControl {
    Current = 0x00,
    Changeable = 0x01,
    Default = 0x02,
    Saved = 0x03,
}

impl PageControl {
    pub fn from_code(code: u8) -> Self {
        match code & 0x03 {
            0x00 => PageControl::Current,
            0x01 => PageControl::Changeable,
            0x02 => PageControl::Default,
            _ => PageControl::Saved,
        }
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            PageControl::Current => "CURRENT",
            PageControl::Changeable => "CHANGEABLE",
            PageControl::Default => "DEFAULT",
            PageControl::Saved => "SAVED",
        }
    }
}

impl fmt::Display for PageControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Page codes of the mode pages with a shipped layout.
pub mod page_code {
    pub const DISCONNECT_RECONNECT: u8 = 0x02;
    pub const CONTROL: u8 = 0x0a;
    pub const PROTOCOL_SPECIFIC_LOGICAL_UNIT: u8 = 0x18;
    pub const POWER_CONDITION: u8 = 0x1a;
    pub const ELEMENT_ADDRESS_ASSIGNMENT: u8 = 0x1d;
    /// Requests every supported page.
    pub const ALL_PAGES: u8 = 0x3f;

    /// Uppercase name of a page code.
    pub fn name(code: u8) -> Option<&'static str> {
        Some(match code {
            DISCONNECT_RECONNECT => "DISCONNECT_RECONNECT",
            CONTROL => "CONTROL",
            PROTOCOL_SPECIFIC_LOGICAL_UNIT => "PROTOCOL_SPECIFIC_LOGICAL_UNIT",
            POWER_CONDITION => "POWER_CONDITION",
            ELEMENT_ADDRESS_ASSIGNMENT => "ELEMENT_ADDRESS_ASSIGNMENT",
            ALL_PAGES => "ALL_PAGES",
            _ => return None,
        })
    }
}

/// One mode page: its address and field layout.
#[derive(Debug)]
pub struct ModePage {
    /// Lowercase page name, e.g. `control`.
    pub name: &'static str,
    pub page_code: u8,
    /// Non-zero for pages in sub_page format.
    pub sub_page_code: u8,
    pub layout: FieldLayout,
}

pub static DISCONNECT_RECONNECT: ModePage = ModePage {
    name: "disconnect_reconnect",
    page_code: page_code::DISCONNECT_RECONNECT,
    sub_page_code: 0,
    layout: FieldLayout::new(&DISCONNECT_RECONNECT_FIELDS),
};

pub static CONTROL: ModePage = ModePage {
    name: "control",
    page_code: page_code::CONTROL,
    sub_page_code: 0,
    layout: FieldLayout::new(&CONTROL_FIELDS),
};

pub static CONTROL_EXTENSION: ModePage = ModePage {
    name: "control_extension",
    page_code: page_code::CONTROL,
    sub_page_code: 0x01,
    layout: FieldLayout::sized(&CONTROL_EXTENSION_FIELDS, 32),
};

pub static PROTOCOL_SPECIFIC_LOGICAL_UNIT: ModePage = ModePage {
    name: "protocol_specific_logical_unit",
    page_code: page_code::PROTOCOL_SPECIFIC_LOGICAL_UNIT,
    sub_page_code: 0,
    layout: FieldLayout::new(&PROTOCOL_SPECIFIC_LOGICAL_UNIT_FIELDS),
};

pub static POWER_CONDITION: ModePage = ModePage {
    name: "power_condition",
    page_code: page_code::POWER_CONDITION,
    sub_page_code: 0,
    layout: FieldLayout::new(&POWER_CONDITION_FIELDS),
};

pub static POWER_CONSUMPTION: ModePage = ModePage {
    name: "power_consumption",
    page_code: page_code::POWER_CONDITION,
    sub_page_code: 0x01,
    layout: FieldLayout::sized(&POWER_CONSUMPTION_FIELDS, 16),
};

pub static ELEMENT_ADDRESS_ASSIGNMENT: ModePage = ModePage {
    name: "element_address_assignment",
    page_code: page_code::ELEMENT_ADDRESS_ASSIGNMENT,
    sub_page_code: 0,
    layout: FieldLayout::sized(&ELEMENT_ADDRESS_ASSIGNMENT_FIELDS, 20),
};

/// Every mode page with a shipped layout.
pub static MODE_PAGES: [&ModePage; 7] = [
    &DISCONNECT_RECONNECT,
    &CONTROL,
    &CONTROL_EXTENSION,
    &PROTOCOL_SPECIFIC_LOGICAL_UNIT,
    &POWER_CONDITION,
    &POWER_CONSUMPTION,
    &ELEMENT_ADDRESS_ASSIGNMENT,
];

/// Find the layout of a page by address.
pub fn mode_page(page_code: u8, sub_page_code: u8) -> Option<&'static ModePage> {
    MODE_PAGES
        .iter()
        .copied()
        .find(|page| page.page_code == page_code && page.sub_page_code == sub_page_code)
}

impl ModePage {
    pub fn is_sub_page(&self) -> bool {
        self.sub_page_code != 0
    }

    /// Bytes taken by the page header.
    pub fn header_len(&self) -> usize {
        if self.is_sub_page() {
            4
        } else {
            2
        }
    }

    /// Pack a page for MODE SELECT. The page address, the `spf` bit and
    /// `page_length` are filled in from the layout.
    pub fn marshall(&self, values: &FieldValues) -> Result<BytesMut> {
        let page_length = (self.layout.byte_len() - self.header_len()) as u64;
        let mut values = values
            .clone()
            .with("page_code", u64::from(self.page_code))
            .with("spf", u64::from(self.is_sub_page()))
            .with("page_length", page_length);
        if self.is_sub_page() {
            values.insert("sub_page_code", u64::from(self.sub_page_code));
        }
        marshall(&self.layout, &values)
    }

    /// Unpack a page. Devices may return a page shorter than its layout;
    /// missing trailing bytes read as zero.
    pub fn unmarshall(&self, data: &[u8]) -> Result<FieldValues> {
        if data.len() >= self.layout.extent() {
            return unmarshall(&self.layout, data);
        }
        let mut padded = data.to_vec();
        padded.resize(self.layout.extent(), 0);
        unmarshall(&self.layout, &padded)
    }
}

/// Which mode parameter header precedes the pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeHeader {
    /// MODE SENSE(6) / MODE SELECT(6).
    Six,
    /// MODE SENSE(10) / MODE SELECT(10).
    Ten,
}

impl ModeHeader {
    pub fn layout(self) -> FieldLayout {
        match self {
            ModeHeader::Six => FieldLayout::new(&MODE_PARAMETER_HEADER6),
            ModeHeader::Ten => FieldLayout::new(&MODE_PARAMETER_HEADER10),
        }
    }

    pub fn len(self) -> usize {
        match self {
            ModeHeader::Six => 4,
            ModeHeader::Ten => 8,
        }
    }

    /// Bytes of the mode data length field itself, which the length does
    /// not count.
    fn length_field_len(self) -> usize {
        match self {
            ModeHeader::Six => 1,
            ModeHeader::Ten => 2,
        }
    }
}

/// One page as returned by the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawModePage {
    pub page_code: u8,
    pub sub_page_code: u8,
    /// Parameters savable.
    pub ps: bool,
    /// The page bytes, header included.
    pub data: Vec<u8>,
}

impl RawModePage {
    /// The shipped layout for this page, if there is one.
    pub fn definition(&self) -> Option<&'static ModePage> {
        mode_page(self.page_code, self.sub_page_code)
    }

    /// Decode the page with its shipped layout.
    pub fn decode(&self) -> Result<Option<FieldValues>> {
        self.definition()
            .map(|page| page.unmarshall(&self.data))
            .transpose()
    }
}

/// Decoded MODE SENSE data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeParameters {
    pub header: FieldValues,
    pub block_descriptors: Vec<u8>,
    pub pages: Vec<RawModePage>,
}

impl ModeParameters {
    /// Split MODE SENSE data into header, block descriptors and pages.
    ///
    /// Only the bytes counted by the mode data length are read; the rest of
    /// the allocation is padding. A page cut short by the allocation length
    /// is kept with the bytes that arrived.
    pub fn parse(format: ModeHeader, data: &[u8]) -> Result<Self> {
        let header_len = format.len();
        if data.len() < header_len {
            return Err(CodecError::BufferTooSmall {
                needed: header_len,
                actual: data.len(),
            });
        }
        let header = unmarshall(&format.layout(), data)?;

        let mode_data_length = header.get("mode_data_length").unwrap_or(0) as usize;
        let end = (mode_data_length + format.length_field_len()).min(data.len());
        let descriptor_len = header.get("block_descriptor_length").unwrap_or(0) as usize;
        let pages_start = (header_len + descriptor_len).min(end.max(header_len));
        let block_descriptors = data[header_len..pages_start].to_vec();

        let mut pages = Vec::new();
        let mut offset = pages_start;
        while offset + 2 <= end {
            let first = data[offset];
            let sub_page = first & 0x40 != 0;
            let len = if sub_page {
                if offset + 4 > end {
                    break;
                }
                4 + usize::from(u16::from_be_bytes([data[offset + 2], data[offset + 3]]))
            } else {
                2 + usize::from(data[offset + 1])
            };
            let page_end = (offset + len).min(end);
            pages.push(RawModePage {
                page_code: first & 0x3f,
                sub_page_code: if sub_page { data[offset + 1] } else { 0 },
                ps: first & 0x80 != 0,
                data: data[offset..page_end].to_vec(),
            });
            offset += len;
        }

        Ok(Self {
            header,
            block_descriptors,
            pages,
        })
    }

    /// The first page at the given address.
    pub fn page(&self, page_code: u8, sub_page_code: u8) -> Option<&RawModePage> {
        self.pages
            .iter()
            .find(|page| page.page_code == page_code && page.sub_page_code == sub_page_code)
    }
}
