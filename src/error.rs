//! Error taxonomy shared by the schema compiler and the codec
//!
//! Every failure carries a stable numeric code so host bindings can map
//! errors into their own idiom without parsing messages.

use serde::Serialize;
use thiserror::Error;

/// Numeric error codes exposed to bindings
pub mod code {
    pub const FILE_NOT_FOUND: i32 = 1;
    pub const OUT_OF_MEMORY: i32 = 2;
    pub const PARSE_ERROR: i32 = 3;
    pub const UNKNOWN_BLOCK: i32 = 4;
    pub const ENCODE_ERROR: i32 = 5;
    pub const DECODE_ERROR: i32 = 6;
    pub const NO_BLOCKS: i32 = 7;
}

/// Errors produced while compiling a schema or running the codec
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtoError {
    /// Schema file does not exist
    #[error("file not found: {0}")]
    FileNotFound(String),

    /// Schema file exists but could not be read
    #[error("failed to read {path}: {reason}")]
    Io { path: String, reason: String },

    /// An allocation could not be satisfied
    #[error("memory not enough: {0}")]
    OutOfMemory(String),

    /// Syntax error in the IDL text
    #[error("{message} at line: {line}")]
    Parse { line: usize, message: String },

    /// A field references a block name that was never declared
    #[error("not found custom type({type_name}) in block({block}:{field})")]
    UndefinedType {
        block: String,
        field: String,
        type_name: String,
    },

    /// The IDL text declared no blocks at all
    #[error("not found any block defined")]
    NoBlocks,

    /// Encode was asked for a block name the schema does not know
    #[error("block name not found: {0}")]
    UnknownBlock(String),

    /// Getter contract violation or unsupported value during encode
    #[error("encode error: {0}")]
    Encode(String),

    /// Malformed, corrupted or mismatching wire data during decode
    #[error("decode error: {0}")]
    Decode(String),
}

impl ProtoError {
    pub(crate) fn parse(line: usize, message: impl Into<String>) -> Self {
        ProtoError::Parse {
            line,
            message: message.into(),
        }
    }

    /// Stable numeric code for this error
    pub fn code(&self) -> i32 {
        match self {
            ProtoError::FileNotFound(_) | ProtoError::Io { .. } => code::FILE_NOT_FOUND,
            ProtoError::OutOfMemory(_) => code::OUT_OF_MEMORY,
            ProtoError::Parse { .. } | ProtoError::UndefinedType { .. } => code::PARSE_ERROR,
            ProtoError::UnknownBlock(_) => code::UNKNOWN_BLOCK,
            ProtoError::Encode(_) => code::ENCODE_ERROR,
            ProtoError::Decode(_) => code::DECODE_ERROR,
            ProtoError::NoBlocks => code::NO_BLOCKS,
        }
    }

    /// Snapshot of this error as a `{code, message}` record
    pub fn record(&self) -> ErrorRecord {
        ErrorRecord {
            code: self.code(),
            message: self.to_string(),
        }
    }
}

/// Result alias used throughout the crate
pub type ProtoResult<T> = Result<T, ProtoError>;

/// The `{code, message}` pair kept in a schema's error slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorRecord {
    pub code: i32,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(ProtoError::FileNotFound("x".into()).code(), 1);
        assert_eq!(ProtoError::OutOfMemory("x".into()).code(), 2);
        assert_eq!(ProtoError::parse(3, "bad").code(), 3);
        assert_eq!(ProtoError::UnknownBlock("x".into()).code(), 4);
        assert_eq!(ProtoError::Encode("x".into()).code(), 5);
        assert_eq!(ProtoError::Decode("x".into()).code(), 6);
        assert_eq!(ProtoError::NoBlocks.code(), 7);
    }

    #[test]
    fn test_parse_message_carries_line() {
        let err = ProtoError::parse(12, "invalid block id");
        assert_eq!(err.to_string(), "invalid block id at line: 12");

        let record = err.record();
        assert_eq!(record.code, code::PARSE_ERROR);
        assert_eq!(record.message, "invalid block id at line: 12");
    }
}
