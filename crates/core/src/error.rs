//! Error types for the dviread library.

use crate::search::FormatClass;
use thiserror::Error;

/// Primary error type for DVI interpretation and font resource resolution.
#[derive(Error, Debug)]
pub enum DviError {
    #[error("truncated stream at offset {offset}: wanted {wanted} bytes, {remaining} remaining")]
    TruncatedStream {
        offset: usize,
        wanted: usize,
        remaining: usize,
        /// Opcode whose operands ran past the end; `None` for bare reads
        opcode: Option<u8>,
    },

    #[error("seek to {pos} outside stream of length {len}")]
    OutOfRange { pos: usize, len: usize },

    #[error("malformed header at offset {offset}: found opcode {opcode}")]
    MalformedHeader { offset: usize, opcode: u8 },

    #[error("unexpected opcode {opcode} between pages at offset {offset}")]
    UnexpectedOpcode { offset: usize, opcode: u8 },

    #[error("malformed opcode {opcode} inside page at offset {offset}")]
    MalformedOpcode { offset: usize, opcode: u8 },

    #[error("pop on empty stack at offset {offset}")]
    StackUnderflow { offset: usize, opcode: u8 },

    #[error("end of page at offset {offset} with {depth} unpopped stack entries")]
    UnbalancedStack {
        offset: usize,
        opcode: u8,
        depth: usize,
    },

    #[error("font {font} used at offset {offset} was never defined")]
    UndefinedFont {
        offset: usize,
        opcode: u8,
        font: u32,
    },

    #[error("character typeset at offset {offset} with no font selected")]
    NoFontSelected { offset: usize, opcode: u8 },

    #[error("format id mismatch at offset {offset}: preamble declares {expected}, trailer has {found}")]
    VersionMismatch {
        offset: usize,
        opcode: u8,
        expected: u8,
        found: u8,
    },

    #[error("font not mapped: {0}")]
    FontNotMapped(String),

    #[error("{name} not found for format {class}")]
    NotFound { name: String, class: FormatClass },

    #[error("malformed font metrics {name}: {msg}")]
    MalformedMetrics { name: String, msg: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(#[from] serde_json::Error),
}

impl DviError {
    /// Byte offset in the input stream, for errors raised while reading one.
    pub fn offset(&self) -> Option<usize> {
        match self {
            DviError::TruncatedStream { offset, .. }
            | DviError::MalformedHeader { offset, .. }
            | DviError::UnexpectedOpcode { offset, .. }
            | DviError::MalformedOpcode { offset, .. }
            | DviError::StackUnderflow { offset, .. }
            | DviError::UnbalancedStack { offset, .. }
            | DviError::UndefinedFont { offset, .. }
            | DviError::NoFontSelected { offset, .. }
            | DviError::VersionMismatch { offset, .. } => Some(*offset),
            DviError::OutOfRange { pos, .. } => Some(*pos),
            _ => None,
        }
    }

    /// The opcode that triggered an interpreter failure, if any.
    pub fn opcode(&self) -> Option<u8> {
        match self {
            DviError::MalformedHeader { opcode, .. }
            | DviError::UnexpectedOpcode { opcode, .. }
            | DviError::MalformedOpcode { opcode, .. }
            | DviError::StackUnderflow { opcode, .. }
            | DviError::UnbalancedStack { opcode, .. }
            | DviError::UndefinedFont { opcode, .. }
            | DviError::NoFontSelected { opcode, .. }
            | DviError::VersionMismatch { opcode, .. } => Some(*opcode),
            DviError::TruncatedStream { opcode, .. } => *opcode,
            _ => None,
        }
    }

    /// Attribute a truncated read to the opcode whose operands were being
    /// read. Other errors are returned unchanged.
    pub fn with_opcode(self, byte: u8) -> Self {
        match self {
            DviError::TruncatedStream {
                offset,
                wanted,
                remaining,
                opcode: None,
            } => DviError::TruncatedStream {
                offset,
                wanted,
                remaining,
                opcode: Some(byte),
            },
            other => other,
        }
    }
}

/// Convenience Result type alias for DviError.
pub type Result<T> = std::result::Result<T, DviError>;
