//! Record-to-XML codec and the XML half of the text import path.
//!
//! Emission writes `<clientes>` with one `<cliente>` per record, the card
//! field encrypted and the polygon rendered in the tagged WKT-like form.
//! Import walks the generic tree from [`crate::xmltree`], so documents
//! from producers with different text-node conventions all extract the
//! same way.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use serde_json::Value;
use tracing::warn;

use crate::cipher;
use crate::error::ConvertError;
use crate::geometry::{self, Polygon};
use crate::parser::{self, ClientRecord};
use crate::xmltree::{self, node_text, ParseOptions};

/// Minimum accepted encryption key length for XML generation.
pub const MIN_KEY_LEN: usize = 8;

/// Element names of the six mandatory fields, in document order.
const FIELD_ELEMENTS: [&str; 6] = [
    "documento",
    "nombres",
    "apellidos",
    "tarjeta",
    "tipo",
    "telefono",
];

/// Convert a delimited-text document to the XML representation.
///
/// # Errors
///
/// Returns [`ConvertError::InvalidInput`] when content or delimiter is
/// blank or the key is shorter than [`MIN_KEY_LEN`],
/// [`ConvertError::NoValidRecords`] when the text parses to zero records,
/// and [`ConvertError::RecordProcessing`] when a record has a blank
/// mandatory field (only the record index escapes; field detail stays in
/// the logs). A polygon that cannot be rendered is omitted silently — it
/// never fails its record.
pub fn generate_xml(content: &str, delimiter: &str, key: &str) -> Result<String, ConvertError> {
    if content.trim().is_empty() {
        return Err(ConvertError::InvalidInput("content must not be empty".into()));
    }
    if delimiter.is_empty() {
        return Err(ConvertError::InvalidInput(
            "delimiter must not be empty".into(),
        ));
    }
    if key.len() < MIN_KEY_LEN {
        return Err(ConvertError::InvalidInput(format!(
            "key must be at least {MIN_KEY_LEN} characters"
        )));
    }

    let records = parser::parse(content, delimiter)?;
    if records.is_empty() {
        return Err(ConvertError::NoValidRecords);
    }

    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(write_error)?;
    writer
        .write_event(Event::Start(BytesStart::new("clientes")))
        .map_err(write_error)?;

    for (i, record) in records.iter().enumerate() {
        let index = i + 1;
        write_client(&mut writer, record, key).map_err(|e| match e {
            ClientWriteError::Record(detail) => {
                warn!(index, %detail, "client record rejected during XML emission");
                ConvertError::RecordProcessing { index }
            }
            ClientWriteError::Writer(e) => e,
        })?;
    }

    writer
        .write_event(Event::End(BytesEnd::new("clientes")))
        .map_err(write_error)?;

    String::from_utf8(writer.into_inner())
        .map_err(|e| ConvertError::Internal(format!("XML output is not UTF-8: {e}")))
}

/// Why a single `<cliente>` could not be written.
enum ClientWriteError {
    /// The record itself is bad: blank mandatory field or encryption
    /// failure. Wrapped into [`ConvertError::RecordProcessing`] above.
    Record(String),
    /// The underlying writer failed (unreachable with a `Vec` sink).
    Writer(ConvertError),
}

fn write_client<W: std::io::Write>(
    writer: &mut Writer<W>,
    record: &ClientRecord,
    key: &str,
) -> Result<(), ClientWriteError> {
    let values = [
        &record.document,
        &record.first_names,
        &record.last_names,
        &record.card,
        &record.kind,
        &record.phone,
    ];
    for (name, value) in FIELD_ELEMENTS.iter().zip(values) {
        if value.trim().is_empty() {
            return Err(ClientWriteError::Record(format!(
                "required field '{name}' is empty"
            )));
        }
    }

    let card_token = cipher::encrypt(&record.card, key)
        .map_err(|e| ClientWriteError::Record(format!("card encryption failed: {e}")))?;

    let write = |writer: &mut Writer<W>| -> Result<(), ConvertError> {
        writer
            .write_event(Event::Start(BytesStart::new("cliente")))
            .map_err(write_error)?;
        write_text_element(writer, "documento", &record.document)?;
        write_text_element(writer, "nombres", &record.first_names)?;
        write_text_element(writer, "apellidos", &record.last_names)?;
        write_text_element(writer, "tarjeta", &card_token)?;
        write_text_element(writer, "tipo", &record.kind)?;
        write_text_element(writer, "telefono", &record.phone)?;
        if let Some(polygon) = &record.polygon {
            let wkt = geometry::to_tagged_wkt(polygon);
            if !wkt.is_empty() {
                write_text_element(writer, "poligono", &wkt)?;
            }
        }
        writer
            .write_event(Event::End(BytesEnd::new("cliente")))
            .map_err(write_error)?;
        Ok(())
    };
    write(writer).map_err(ClientWriteError::Writer)
}

/// Write `<name>text</name>`; the writer escapes `& < > " '` on the way out.
fn write_text_element<W: std::io::Write>(
    writer: &mut Writer<W>,
    name: &str,
    text: &str,
) -> Result<(), ConvertError> {
    writer
        .write_event(Event::Start(BytesStart::new(name)))
        .map_err(write_error)?;
    writer
        .write_event(Event::Text(BytesText::new(text)))
        .map_err(write_error)?;
    writer
        .write_event(Event::End(BytesEnd::new(name)))
        .map_err(write_error)?;
    Ok(())
}

fn write_error<E: std::fmt::Display>(e: E) -> ConvertError {
    ConvertError::Internal(format!("XML serialisation failed: {e}"))
}

/// Convert an XML document back to delimited text, one record per line.
///
/// The tree builder is callback-driven in spirit: the whole document is
/// parsed on the blocking pool — the function's single suspension point —
/// before any field extraction begins; no partial results are observed.
///
/// # Errors
///
/// Returns [`ConvertError::MalformedXml`] for unparseable documents or a
/// missing `clientes` root, [`ConvertError::NoClientElements`] when the
/// root holds no `cliente` children, and a cipher error when a card token
/// does not decrypt. Polygon problems degrade to an empty geometry field.
pub async fn xml_to_text(content: &str, key: &str, delimiter: &str) -> Result<String, ConvertError> {
    let xml = content.to_owned();
    let tree = tokio::task::spawn_blocking(move || {
        xmltree::parse_to_tree(&xml, &ParseOptions::default())
    })
    .await
    .map_err(|e| ConvertError::Internal(format!("XML parser task failed: {e}")))?
    .map_err(|e| ConvertError::MalformedXml(e.to_string()))?;

    let clientes = tree.get("clientes").ok_or_else(|| {
        ConvertError::MalformedXml("document must contain a clientes element".into())
    })?;
    // A single <cliente> child arrives as a bare object; normalise to a
    // sequence either way.
    let clients: Vec<&Value> = match clientes.get("cliente") {
        Some(Value::Array(items)) => items.iter().collect(),
        Some(single) => vec![single],
        None => return Err(ConvertError::NoClientElements),
    };

    let mut lines = Vec::with_capacity(clients.len());
    for client in clients {
        lines.push(client_line(client, key, delimiter)?);
    }
    Ok(lines.join("\n"))
}

fn client_line(client: &Value, key: &str, delimiter: &str) -> Result<String, ConvertError> {
    let document = field_text(client, "documento");
    let first_names = field_text(client, "nombres");
    let last_names = field_text(client, "apellidos");
    let card_token = field_text(client, "tarjeta");
    let kind = field_text(client, "tipo");
    let phone = field_text(client, "telefono");

    let card = if card_token.is_empty() {
        String::new()
    } else {
        cipher::decrypt(&card_token, key)?
    };

    let geometry_text = client.get("poligono").map(polygon_text).unwrap_or_default();

    Ok([
        document.as_str(),
        first_names.as_str(),
        last_names.as_str(),
        card.as_str(),
        kind.as_str(),
        phone.as_str(),
        geometry_text.as_str(),
    ]
    .join(delimiter))
}

fn field_text(client: &Value, name: &str) -> String {
    client.get(name).map(node_text).unwrap_or_default()
}

/// Resolve `<poligono>` content to the delimited-ring text syntax.
///
/// Probing order: a nested `geoJSON` child carrying a JSON-encoded
/// polygon (produced by some senders), the node's own text as JSON, and
/// finally the tagged WKT form this codec itself emits. Any failure
/// yields an empty geometry field, never an error.
fn polygon_text(node: &Value) -> String {
    if let Some(geo) = node.get("geoJSON").or_else(|| node.get("geojson")) {
        if let Some(rendered) = render_polygon_json(&node_text(geo)) {
            return rendered;
        }
    }

    let text = node_text(node);
    if let Some(rendered) = render_polygon_json(&text) {
        return rendered;
    }
    if let Some(rest) = text.strip_prefix("POLYGON") {
        if let Ok(polygon) = geometry::parse_delimited_ring(rest.trim()) {
            return geometry::to_delimited_ring(&polygon);
        }
    }
    String::new()
}

fn render_polygon_json(text: &str) -> Option<String> {
    let polygon: Polygon = serde_json::from_str(text).ok()?;
    let rendered = geometry::to_delimited_ring(&polygon);
    (!rendered.is_empty()).then_some(rendered)
}
