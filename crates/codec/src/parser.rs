//! Delimited-text parser: one client record per line, fields separated by a
//! caller-supplied delimiter, with an optional trailing geometry field.
//!
//! ```text
//! documento;nombres;apellidos;tarjeta;tipo;telefono;((lon lat, ...))
//! ```
//!
//! Blank lines and `//` comment lines are skipped. A record line may carry
//! 6, 7, or 8 fields — some producers emit an extra empty field before the
//! geometry, so the geometry is indexed from the end of the line.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::{self, Polygon};

/// Lines starting with this marker are skipped wholesale.
const COMMENT_MARKER: &str = "//";

/// Minimum number of delimiter-separated fields on a data line.
pub const MIN_FIELDS: usize = 6;

/// The canonical in-memory client record.
///
/// All six textual fields are trimmed on parse. `card` holds either the
/// plaintext value or an encrypted token depending on which pipeline stage
/// produced the record — the type does not distinguish the two; callers
/// track context.
///
/// Serialisation uses the Spanish wire names shared by every document
/// format (`documento`, `nombres`, …), in the emission field order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientRecord {
    #[serde(rename = "documento")]
    pub document: String,
    #[serde(rename = "nombres")]
    pub first_names: String,
    #[serde(rename = "apellidos")]
    pub last_names: String,
    #[serde(rename = "tarjeta")]
    pub card: String,
    #[serde(rename = "tipo")]
    pub kind: String,
    #[serde(rename = "telefono")]
    pub phone: String,
    #[serde(rename = "poligono", default, skip_serializing_if = "Option::is_none")]
    pub polygon: Option<Polygon>,
}

/// Errors produced by the delimited-text parser.
///
/// Line numbers are 1-based absolute positions in the original input;
/// skipped blank and comment lines still count.
#[derive(Debug, Error)]
pub enum ParseError {
    /// A data line had fewer than the six mandatory fields.
    #[error("line {line}: expected at least {MIN_FIELDS} fields, got {got}")]
    FieldCount { line: usize, got: usize },

    /// The geometry field of a data line did not parse. At this stage the
    /// text is the authoritative source, so the failure is not swallowed
    /// the way emission-side geometry problems are.
    #[error("line {line}: {detail}")]
    Geometry { line: usize, detail: String },
}

/// Parse a whole text document into client records.
///
/// # Errors
///
/// Returns the first [`ParseError`] encountered; no partial record list is
/// ever produced.
pub fn parse(content: &str, delimiter: &str) -> Result<Vec<ClientRecord>, ParseError> {
    let mut records = Vec::new();
    for (line_no, line) in data_lines(content) {
        records.push(parse_line(line, delimiter, line_no)?);
    }
    Ok(records)
}

/// Pre-pass: `(original line number, content)` for every line that is
/// neither blank nor a comment.
fn data_lines(content: &str) -> impl Iterator<Item = (usize, &str)> {
    content
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line))
        .filter(|(_, line)| !line.trim().is_empty() && !line.starts_with(COMMENT_MARKER))
}

fn parse_line(line: &str, delimiter: &str, line_no: usize) -> Result<ClientRecord, ParseError> {
    let parts: Vec<&str> = line.split(delimiter).collect();
    if parts.len() < MIN_FIELDS {
        return Err(ParseError::FieldCount {
            line: line_no,
            got: parts.len(),
        });
    }

    // Geometry rides in the last slot: part 7 when an extra empty field
    // precedes it (8 parts), otherwise part 6; absent with exactly 6 parts.
    let geometry_text = if parts.len() > 7 {
        parts.get(7)
    } else {
        parts.get(6)
    };
    let polygon = match geometry_text.map(|t| t.trim()).filter(|t| !t.is_empty()) {
        Some(text) => Some(geometry::parse_delimited_ring(text).map_err(|e| {
            ParseError::Geometry {
                line: line_no,
                detail: e.to_string(),
            }
        })?),
        None => None,
    };

    Ok(ClientRecord {
        document: parts[0].trim().to_owned(),
        first_names: parts[1].trim().to_owned(),
        last_names: parts[2].trim().to_owned(),
        card: parts[3].trim().to_owned(),
        kind: parts[4].trim().to_owned(),
        phone: parts[5].trim().to_owned(),
        polygon,
    })
}
