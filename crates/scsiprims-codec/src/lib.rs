//! Bit-field marshalling of SCSI command blocks and response payloads.
//!
//! A [`FieldLayout`] is a table of named fields, each a positioned bit mask
//! at a byte offset. Multi-byte fields are big-endian, as on the wire.
//! [`pack`] writes a set of [`FieldValues`] into a buffer and [`unpack`]
//! reads them back out. [`CommandBlock`] builds a complete command envelope
//! on top of that: the packed CDB plus the data and sense buffers that go
//! with it.

pub mod codec;
pub mod envelope;
pub mod error;
pub mod field;
pub mod values;

pub use codec::{marshall, pack, unpack};
pub use envelope::{
    unmarshall, CommandBlock, TransferLength, DEFAULT_SENSE_LEN, MAX_CDB_LEN, MAX_TRANSFER_LEN,
    OPCODE_FIELD,
};
pub use error::{CodecError, Result};
pub use field::{FieldLayout, FieldSpec, MAX_LAYOUT_LEN};
pub use values::FieldValues;
