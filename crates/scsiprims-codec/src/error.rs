/// Errors raised by malformed field layouts or bad field references.
///
/// These are programming errors; retrying the same call fails the same way.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// A field has an all-zero mask and therefore no width.
    #[error("field {field} has an empty mask")]
    EmptyMask { field: String },

    /// A field mask has a hole in it.
    #[error("field {field} mask {mask:#x} is not contiguous")]
    NonContiguousMask { field: String, mask: u64 },

    /// A field reaches past the largest structure a layout may describe.
    #[error("field {field} at offset {offset} is out of range")]
    OffsetOutOfRange { field: String, offset: usize },

    /// The declared length exceeds the largest structure a layout may describe.
    #[error("layout length {len} exceeds {max} bytes")]
    LayoutTooLong { len: usize, max: usize },

    /// Two fields share a name.
    #[error("field {0} is declared more than once")]
    DuplicateField(String),

    /// Two fields claim the same bit.
    #[error("fields {first} and {second} overlap")]
    Overlap { first: String, second: String },

    /// A value was supplied for a field the layout does not declare.
    #[error("unknown field {0}")]
    UnknownField(String),

    /// The buffer cannot hold every field of the layout.
    #[error("buffer too small ({actual} bytes, layout needs {needed})")]
    BufferTooSmall { needed: usize, actual: usize },

    /// A command block longer than a pass-through CDB can carry.
    #[error("command block is {len} bytes, at most {max} allowed")]
    CdbTooLong { len: usize, max: usize },

    /// A data phase larger than a command block will allocate.
    #[error("transfer of {len} bytes exceeds {max} bytes")]
    TransferTooLarge { len: usize, max: usize },

    /// A command layout has no `opcode` field to carry the operation code.
    #[error("command layout has no opcode field")]
    MissingOpcodeField,
}

pub type Result<T> = std::result::Result<T, CodecError>;
