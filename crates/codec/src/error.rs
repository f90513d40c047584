//! Boundary error type for the conversion engine.
//!
//! Per-module failures ([`ParseError`], [`GeometryError`], [`CipherError`])
//! fold into [`ConvertError`] at the boundary operations; the gateway maps
//! the result onto HTTP statuses. No conversion ever returns a partial
//! document — a single failing mandatory field invalidates the whole call.

use thiserror::Error;

use crate::cipher::CipherError;
use crate::geometry::GeometryError;
use crate::parser::ParseError;

/// Errors returned by the boundary operations.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// A precondition on the call itself failed: blank content or
    /// delimiter, or a key under the minimum length.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The text document parsed to zero records.
    #[error("no valid client records found in the input")]
    NoValidRecords,

    /// A record failed validation or encryption during XML emission.
    /// Field-level detail is deliberately withheld; only the 1-based
    /// record index escapes to the caller.
    #[error("error processing client record {index}")]
    RecordProcessing {
        /// 1-based position of the failing record.
        index: usize,
    },

    /// A JSON client entry is missing one of the mandatory fields.
    #[error("incomplete record: {0}")]
    IncompleteRecord(String),

    /// The JSON document did not parse or lacks the `clientes` array.
    #[error("malformed JSON document: {0}")]
    MalformedJson(String),

    /// The XML document did not parse or lacks the `clientes` root.
    #[error("malformed XML document: {0}")]
    MalformedXml(String),

    /// The XML document has a `clientes` root but no `cliente` elements.
    #[error("no cliente elements found in the XML document")]
    NoClientElements,

    /// Delimited-text parsing failed.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Structural geometry validation failed during JSON emission.
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    /// Field encryption or decryption failed.
    #[error(transparent)]
    Cipher(#[from] CipherError),

    /// An unexpected internal failure (serialiser or worker task).
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type alias for the boundary operations.
pub type Result<T> = std::result::Result<T, ConvertError>;
