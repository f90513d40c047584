//! Record-to-JSON codec and the JSON half of the text import path.
//!
//! Emission encrypts the card field and upgrades each polygon to its
//! OGC-enhanced form (closed rings, recomputed bbox). Import decrypts the
//! card and renders the polygon back to the delimited-ring text syntax.

use serde::Serialize;
use serde_json::Value;

use crate::cipher;
use crate::error::ConvertError;
use crate::geometry::{self, Polygon};
use crate::parser::{self, ClientRecord};

/// Top-level JSON document: `{"clientes": [...]}`.
#[derive(Debug, Serialize)]
struct JsonDocument {
    clientes: Vec<ClientRecord>,
}

/// Convert a delimited-text document to the JSON representation.
///
/// # Errors
///
/// Text parsing failures and structurally invalid polygons are fatal for
/// the whole conversion — a polygon that survived lexical parsing must be
/// OGC-valid by the time it reaches JSON emission. (A polygon that failed
/// lexical parsing never gets here; the text parser already rejected the
/// line.)
pub fn generate_json(content: &str, delimiter: &str, key: &str) -> Result<String, ConvertError> {
    let records = parser::parse(content, delimiter)?;

    let mut clients = Vec::with_capacity(records.len());
    for mut record in records {
        record.card = cipher::encrypt(&record.card, key)?;
        record.polygon = match record.polygon {
            Some(polygon) => Some(geometry::to_geojson(polygon)?),
            None => None,
        };
        clients.push(record);
    }

    serde_json::to_string_pretty(&JsonDocument { clientes: clients })
        .map_err(|e| ConvertError::Internal(format!("JSON serialisation failed: {e}")))
}

/// Convert a JSON document back to delimited text, one record per line.
///
/// # Errors
///
/// Returns [`ConvertError::MalformedJson`] when the document does not
/// parse or has no `clientes` array, [`ConvertError::IncompleteRecord`]
/// when an entry is missing `documento`/`nombres`/`apellidos`/`tarjeta`,
/// and a cipher error when the card token cannot be decrypted.
pub fn json_to_text(content: &str, key: &str, delimiter: &str) -> Result<String, ConvertError> {
    let document: Value =
        serde_json::from_str(content).map_err(|e| ConvertError::MalformedJson(e.to_string()))?;
    let clients = document
        .get("clientes")
        .and_then(Value::as_array)
        .ok_or_else(|| {
            ConvertError::MalformedJson("document must contain a clientes array".into())
        })?;

    let mut lines = Vec::with_capacity(clients.len());
    for client in clients {
        lines.push(client_line(client, key, delimiter)?);
    }
    Ok(lines.join("\n"))
}

fn client_line(client: &Value, key: &str, delimiter: &str) -> Result<String, ConvertError> {
    let document = required_field(client, "documento")?;
    let first_names = required_field(client, "nombres")?;
    let last_names = required_field(client, "apellidos")?;
    let card_token = required_field(client, "tarjeta")?;

    let card = cipher::decrypt(card_token, key)?;
    let kind = optional_field(client, "tipo");
    let phone = optional_field(client, "telefono");
    let geometry_text = client.get("poligono").map(polygon_text).unwrap_or_default();

    Ok([
        document,
        first_names,
        last_names,
        card.as_str(),
        kind,
        phone,
        geometry_text.as_str(),
    ]
    .join(delimiter))
}

fn required_field<'a>(client: &'a Value, name: &str) -> Result<&'a str, ConvertError> {
    client
        .get(name)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ConvertError::IncompleteRecord(format!("client record is missing {name}")))
}

fn optional_field<'a>(client: &'a Value, name: &str) -> &'a str {
    client.get(name).and_then(Value::as_str).unwrap_or("")
}

/// Import-side polygon rendering: any shape problem degrades to an empty
/// geometry field instead of failing the record.
fn polygon_text(value: &Value) -> String {
    match serde_json::from_value::<Polygon>(value.clone()) {
        Ok(polygon) => geometry::to_delimited_ring(&polygon),
        Err(_) => String::new(),
    }
}
