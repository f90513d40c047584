//! Generic XML→tree parsing and node-text extraction.
//!
//! [`parse_to_tree`] turns an XML document into a [`serde_json::Value`]
//! tree the way lenient XML-to-object mappers do: an element with only
//! text collapses to a string, repeated sibling names group into arrays,
//! attributes merge into the element object, and mixed content keeps its
//! text under the conventional `_` key. The importer in [`crate::xml`]
//! then walks the tree without caring which producer wrote the document.
//!
//! Because different producers leave text in different places (bare
//! string, wrapper object with a text key, arbitrary structure),
//! extraction goes through the [`NodeShape`] sum type and the total
//! [`node_text`] function — every shape yields *some* string, never an
//! error.

use quick_xml::events::Event;
use quick_xml::Reader;
use serde_json::{Map, Value};
use thiserror::Error;

/// Conventional key carrying an element's text when the node object also
/// has attributes or children.
pub const TEXT_KEY: &str = "_";

/// Alternative text key used by other XML-to-object mappers.
pub const ALT_TEXT_KEY: &str = "#text";

/// Errors produced by the XML→tree parser.
#[derive(Debug, Error)]
pub enum XmlTreeError {
    /// The document is not well-formed XML.
    #[error("XML syntax error: {0}")]
    Syntax(String),

    /// The document contains no root element.
    #[error("XML document has no root element")]
    NoRoot,
}

/// Normalisation options for [`parse_to_tree`].
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Trim surrounding whitespace from text content.
    pub trim_text: bool,
    /// Merge attributes into the element object as string properties.
    pub merge_attrs: bool,
    /// Keep a single child as a scalar instead of a one-element array.
    pub flatten_single: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            trim_text: true,
            merge_attrs: true,
            flatten_single: true,
        }
    }
}

/// An element while its subtree is still being read.
struct PendingElement {
    name: String,
    attrs: Vec<(String, String)>,
    children: Vec<(String, Value)>,
    text: String,
}

impl PendingElement {
    fn new(name: String, attrs: Vec<(String, String)>) -> Self {
        Self {
            name,
            attrs,
            children: Vec::new(),
            text: String::new(),
        }
    }

    /// Collapse a fully-read element into its tree value.
    fn into_value(self, opts: &ParseOptions) -> Value {
        let attrs = if opts.merge_attrs { self.attrs } else { Vec::new() };
        if attrs.is_empty() && self.children.is_empty() {
            return Value::String(self.text);
        }

        let mut map = Map::new();
        for (name, value) in attrs {
            map.insert(name, Value::String(value));
        }
        for (name, value) in self.children {
            match map.get_mut(&name) {
                None if opts.flatten_single => {
                    map.insert(name, value);
                }
                None => {
                    map.insert(name, Value::Array(vec![value]));
                }
                Some(Value::Array(items)) => items.push(value),
                Some(existing) => {
                    let previous = existing.take();
                    *existing = Value::Array(vec![previous, value]);
                }
            }
        }
        if !self.text.is_empty() {
            map.insert(TEXT_KEY.into(), Value::String(self.text));
        }
        Value::Object(map)
    }
}

/// Parse an XML document into a tree, wrapped as `{root_name: value}`.
///
/// # Errors
///
/// Returns [`XmlTreeError::Syntax`] on malformed XML and
/// [`XmlTreeError::NoRoot`] when the input holds no element at all.
pub fn parse_to_tree(xml: &str, opts: &ParseOptions) -> Result<Value, XmlTreeError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(opts.trim_text);

    // Virtual container; its single child is the document root.
    let mut stack = vec![PendingElement::new(String::new(), Vec::new())];

    loop {
        match reader.read_event() {
            Err(e) => return Err(XmlTreeError::Syntax(e.to_string())),
            Ok(Event::Eof) => break,
            Ok(Event::Start(start)) => {
                let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
                let attrs = read_attrs(&start)?;
                stack.push(PendingElement::new(name, attrs));
            }
            Ok(Event::Empty(start)) => {
                let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
                let attrs = read_attrs(&start)?;
                let value = PendingElement::new(name.clone(), attrs).into_value(opts);
                if let Some(parent) = stack.last_mut() {
                    parent.children.push((name, value));
                }
            }
            Ok(Event::End(_)) => {
                let Some(element) = stack.pop() else {
                    return Err(XmlTreeError::Syntax("unbalanced closing tag".into()));
                };
                if stack.is_empty() {
                    return Err(XmlTreeError::Syntax("unbalanced closing tag".into()));
                }
                let name = element.name.clone();
                let value = element.into_value(opts);
                if let Some(parent) = stack.last_mut() {
                    parent.children.push((name, value));
                }
            }
            Ok(Event::Text(text)) => {
                let text = text
                    .unescape()
                    .map_err(|e| XmlTreeError::Syntax(e.to_string()))?;
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&text);
                }
            }
            Ok(Event::CData(data)) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&String::from_utf8_lossy(&data));
                }
            }
            // Declarations, comments, processing instructions, doctypes.
            Ok(_) => {}
        }
    }

    if stack.len() != 1 {
        return Err(XmlTreeError::Syntax("unexpected end of document".into()));
    }
    let container = match stack.pop() {
        Some(c) => c,
        None => return Err(XmlTreeError::NoRoot),
    };
    match container.children.len() {
        0 => Err(XmlTreeError::NoRoot),
        1 => {
            let mut map = Map::new();
            let mut children = container.children;
            let (name, value) = children.remove(0);
            map.insert(name, value);
            Ok(Value::Object(map))
        }
        _ => Err(XmlTreeError::Syntax("multiple root elements".into())),
    }
}

fn read_attrs(start: &quick_xml::events::BytesStart<'_>) -> Result<Vec<(String, String)>, XmlTreeError> {
    let mut attrs = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| XmlTreeError::Syntax(e.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| XmlTreeError::Syntax(e.to_string()))?
            .into_owned();
        attrs.push((key, value));
    }
    Ok(attrs)
}

// ---------------------------------------------------------------------------
// Node-text extraction
// ---------------------------------------------------------------------------

/// The shapes an extracted tree node can take.
pub enum NodeShape<'a> {
    /// Bare string content.
    Plain(&'a str),
    /// Object carrying its text under a conventional key, or exposing a
    /// first string-valued property.
    Wrapper(&'a str),
    /// Anything else; rendered structurally as a last resort.
    Opaque(&'a Value),
}

/// Classify a tree node by where its text lives.
pub fn classify(node: &Value) -> NodeShape<'_> {
    match node {
        Value::String(s) => NodeShape::Plain(s),
        Value::Object(map) => {
            for key in [TEXT_KEY, ALT_TEXT_KEY] {
                if let Some(Value::String(s)) = map.get(key) {
                    return NodeShape::Wrapper(s);
                }
            }
            for value in map.values() {
                if let Value::String(s) = value {
                    return NodeShape::Wrapper(s);
                }
            }
            NodeShape::Opaque(node)
        }
        Value::Array(items) => {
            for value in items {
                if let Value::String(s) = value {
                    return NodeShape::Wrapper(s);
                }
            }
            NodeShape::Opaque(node)
        }
        other => NodeShape::Opaque(other),
    }
}

/// Extract a node's text content. Total: every shape yields some string.
pub fn node_text(node: &Value) -> String {
    match classify(node) {
        NodeShape::Plain(s) | NodeShape::Wrapper(s) => s.to_owned(),
        NodeShape::Opaque(Value::Null) => String::new(),
        NodeShape::Opaque(value) => serde_json::to_string(value).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(xml: &str) -> Value {
        parse_to_tree(xml, &ParseOptions::default()).unwrap()
    }

    #[test]
    fn text_only_element_collapses_to_string() {
        let tree = parse("<a><b>hello</b></a>");
        assert_eq!(tree["a"]["b"], json!("hello"));
    }

    #[test]
    fn single_child_stays_scalar() {
        let tree = parse("<clientes><cliente><documento>D1</documento></cliente></clientes>");
        assert_eq!(tree["clientes"]["cliente"]["documento"], json!("D1"));
    }

    #[test]
    fn repeated_children_group_into_array() {
        let tree = parse("<l><i>1</i><i>2</i><i>3</i></l>");
        assert_eq!(tree["l"]["i"], json!(["1", "2", "3"]));
    }

    #[test]
    fn without_flattening_children_are_always_arrays() {
        let opts = ParseOptions {
            flatten_single: false,
            ..ParseOptions::default()
        };
        let tree = parse_to_tree("<a><b>x</b></a>", &opts).unwrap();
        assert_eq!(tree["a"]["b"], json!(["x"]));
    }

    #[test]
    fn attributes_merge_into_the_object() {
        let tree = parse(r#"<a><b id="7">x</b></a>"#);
        assert_eq!(tree["a"]["b"]["id"], json!("7"));
        assert_eq!(tree["a"]["b"][TEXT_KEY], json!("x"));
    }

    #[test]
    fn text_is_trimmed() {
        let tree = parse("<a><b>  spaced  </b></a>");
        assert_eq!(tree["a"]["b"], json!("spaced"));
    }

    #[test]
    fn entities_are_unescaped() {
        let tree = parse("<a><b>J&amp;J &lt;co&gt;</b></a>");
        assert_eq!(tree["a"]["b"], json!("J&J <co>"));
    }

    #[test]
    fn empty_element_becomes_empty_string() {
        let tree = parse("<a><b/></a>");
        assert_eq!(tree["a"]["b"], json!(""));
    }

    #[test]
    fn rejects_unbalanced_document() {
        assert!(matches!(
            parse_to_tree("<a><b>x</a>", &ParseOptions::default()),
            Err(XmlTreeError::Syntax(_))
        ));
    }

    #[test]
    fn rejects_empty_input() {
        assert!(matches!(
            parse_to_tree("", &ParseOptions::default()),
            Err(XmlTreeError::NoRoot)
        ));
    }

    #[test]
    fn node_text_handles_every_shape() {
        assert_eq!(node_text(&json!("plain")), "plain");
        assert_eq!(node_text(&json!({"_": "wrapped"})), "wrapped");
        assert_eq!(node_text(&json!({"#text": "alt"})), "alt");
        assert_eq!(node_text(&json!({"other": "first string"})), "first string");
        assert_eq!(node_text(&json!(["in array"])), "in array");
        assert_eq!(node_text(&Value::Null), "");
        // Opaque structures serialise rather than fail.
        assert_eq!(node_text(&json!({"n": 7})), r#"{"n":7}"#);
    }
}
