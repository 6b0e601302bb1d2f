//! XML document to generic map conversion.
//!
//! The root element's name is dropped and its content becomes the result.
//! Child elements become keys in document order. Siblings sharing a name are
//! gathered into an array at the position of the first one, so repetition
//! is never lost. Attributes live under `@attributes`; text that sits next
//! to attributes lives under `#text`.

use roxmltree::{Document, Node, ParsingOptions};
use serde_json::{Map, Value};

use crate::parser::{DecodeErrorKind, MAX_DEPTH};

pub(crate) const ATTRIBUTES_KEY: &str = "@attributes";
pub(crate) const TEXT_KEY: &str = "#text";

pub(crate) fn xml_to_value(raw: &str) -> Result<Value, (DecodeErrorKind, String)> {
    let options = ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    };
    let doc = Document::parse_with_options(raw, options).map_err(|err| {
        let detail = err.to_string();
        let kind = if detail.contains("non-XML character") {
            DecodeErrorKind::ControlCharacter
        } else {
            DecodeErrorKind::Syntax
        };
        (kind, detail)
    })?;
    element_to_value(doc.root_element(), 1)
}

fn element_to_value(node: Node<'_, '_>, depth: usize) -> Result<Value, (DecodeErrorKind, String)> {
    if depth > MAX_DEPTH {
        return Err((
            DecodeErrorKind::DepthExceeded,
            format!("element <{}> nested deeper than {MAX_DEPTH}", node.tag_name().name()),
        ));
    }

    let mut map = Map::new();

    let attributes: Map<String, Value> = node
        .attributes()
        .map(|attr| (attr.name().to_string(), Value::String(attr.value().to_string())))
        .collect();
    if !attributes.is_empty() {
        map.insert(ATTRIBUTES_KEY.to_string(), Value::Object(attributes));
    }

    let mut has_children = false;
    for child in node.children().filter(Node::is_element) {
        has_children = true;
        let value = element_to_value(child, depth + 1)?;
        let name = child.tag_name().name().to_string();
        match map.get_mut(&name) {
            // Element values are never arrays, so an array here is a run of
            // repeated siblings.
            Some(Value::Array(items)) => items.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                map.insert(name, value);
            }
        }
    }

    if has_children {
        return Ok(Value::Object(map));
    }

    let text = collect_text(node);
    match (text.is_empty(), map.is_empty()) {
        (false, true) => Ok(Value::String(text)),
        (false, false) => {
            map.insert(TEXT_KEY.to_string(), Value::String(text));
            Ok(Value::Object(map))
        }
        (true, _) => Ok(Value::Object(map)),
    }
}

fn collect_text(node: Node<'_, '_>) -> String {
    let text: String = node
        .children()
        .filter(|child| child.is_text())
        .filter_map(|child| child.text())
        .collect();
    text.trim().to_string()
}
