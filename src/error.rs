//! Codec error types.
//!
//! Every failure raised while packing or unpacking carries a kind from the
//! taxonomy below and a human-readable message. Decode failures additionally
//! carry the byte offset at which they were detected when one is available.

use thiserror::Error;

/// Errors raised by the packer and unpacker.
#[derive(Error, Debug)]
pub enum PackStreamError {
    /// The underlying input or output failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Unknown marker, truncated payload, oversized declared length, invalid
    /// map key, or inconsistent path indices.
    #[error("Malformed format: {message}{}", .offset.map(|o| format!(" (at byte offset {o})")).unwrap_or_default())]
    MalformedFormat { message: String, offset: Option<u64> },

    /// Signature byte not present in any known protocol version.
    #[error("Unknown struct signature 0x{signature:02X}")]
    StructSignatureUnknown { signature: u8 },

    /// Signature known to a newer protocol version only.
    #[error("Struct signature 0x{signature:02X} is not supported in protocol version {version}")]
    StructNotSupportedInThisVersion { signature: u8, version: u32 },

    /// Caller attempted to encode a value outside this version's type universe.
    #[error("Type {type_name} is not supported in protocol version {version}")]
    TypeNotSupportedInThisVersion {
        type_name: &'static str,
        version: u32,
    },

    /// Caller attempted a reference-only write; the wire carries full values.
    #[error("{entity} references cannot be serialized over the wire")]
    ReferenceNotSerializable { entity: &'static str },

    /// The property supplier reported a non-swallowable failure.
    #[error("Failed to read {entity} {id}: {message}")]
    EntityReadFailure {
        entity: &'static str,
        id: i64,
        message: String,
    },
}

/// Result type for codec operations.
pub type PackStreamResult<T> = Result<T, PackStreamError>;

impl PackStreamError {
    /// Create a malformed-format error without a byte offset.
    pub fn malformed<S: Into<String>>(message: S) -> Self {
        PackStreamError::MalformedFormat {
            message: message.into(),
            offset: None,
        }
    }

    /// Create a malformed-format error attributed to a byte offset.
    pub fn malformed_at<S: Into<String>>(message: S, offset: u64) -> Self {
        PackStreamError::MalformedFormat {
            message: message.into(),
            offset: Some(offset),
        }
    }

    /// Byte offset at which a decode failure was detected, when available.
    pub fn offset(&self) -> Option<u64> {
        match self {
            PackStreamError::MalformedFormat { offset, .. } => *offset,
            _ => None,
        }
    }

    /// Get the wire status code for Neo4j-compatible FAILURE responses.
    pub fn status_code(&self) -> &'static str {
        match self {
            PackStreamError::Io(_) => "Neo.ClientError.General.ConnectionError",
            PackStreamError::MalformedFormat { .. } => "Neo.ClientError.Request.InvalidFormat",
            PackStreamError::StructSignatureUnknown { .. } => {
                "Neo.ClientError.Request.InvalidFormat"
            }
            PackStreamError::StructNotSupportedInThisVersion { .. } => {
                "Neo.ClientError.Statement.FeatureNotSupported"
            }
            PackStreamError::TypeNotSupportedInThisVersion { .. } => {
                "Neo.ClientError.Statement.FeatureNotSupported"
            }
            PackStreamError::ReferenceNotSerializable { .. } => {
                "Neo.ClientError.Statement.TypeError"
            }
            PackStreamError::EntityReadFailure { .. } => {
                "Neo.DatabaseError.Statement.ExecutionFailed"
            }
        }
    }
}
