/// Errors that can occur while building tables or coding metadata.
#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    /// An insertion would give one value two owners.
    #[error("value {value} is already paired with {owner}")]
    MappingConflict { value: String, owner: String },

    /// A lookup key is not part of the table.
    #[error("unknown identifier {0}")]
    UnknownIdentifier(String),

    /// No address map exists for this EEPROM layout revision.
    #[error("unsupported EEPROM layout revision {0:?}")]
    UnsupportedRevision(String),

    /// A single field could not be decoded.
    #[error("field {field} could not be decoded: {reason}")]
    FieldDecode { field: &'static str, reason: String },

    /// A text value contains a byte that separates or pads fields.
    #[error("field {field} contains a newline or filler byte")]
    InvalidFieldText { field: &'static str },

    /// The textual form of the record does not fit the EEPROM block.
    #[error("metadata needs {size} bytes, block holds {max}")]
    BlockOverflow { size: usize, max: usize },
}

pub type Result<T> = std::result::Result<T, MetadataError>;
