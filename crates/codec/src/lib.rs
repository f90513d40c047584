//! Conversion engine for client-record documents.
//!
//! The same record set moves between three textual representations:
//! delimiter-separated plain text, JSON, and XML. Every record carries six
//! mandatory fields plus an optional service-area polygon; the card field
//! is encrypted at rest in JSON/XML and decrypted on the way back to text.
//!
//! # Boundary operations
//!
//! - [`generate_json`] — delimited text → JSON document
//! - [`generate_xml`] — delimited text → XML document
//! - [`json_to_text`] — JSON document → delimited text
//! - [`xml_to_text`] — XML document → delimited text (async; the XML
//!   tree parse is the one suspension point)
//!
//! Conversions are synchronous, single-document, in-memory
//! transformations over caller-owned input; nothing here holds mutable
//! process-wide state, so callers may run conversions concurrently
//! without coordination. A conversion either completes or fails
//! atomically — partial output is never returned.

pub mod cipher;
pub mod error;
pub mod geometry;
pub mod json;
pub mod parser;
pub mod xml;
pub mod xmltree;

pub use error::ConvertError;
pub use json::{generate_json, json_to_text};
pub use parser::ClientRecord;
pub use xml::{generate_xml, xml_to_text};
