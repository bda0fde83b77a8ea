use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::{Handle, NodeData, RcDom};
use serde_json::{Map, Number, Value};

use super::{HtmlCodec, NodeKind, ROOT_ELEMENT_ID};
use crate::document::{deep_merge, Document};
use crate::error::{Result, SyncError};

pub fn html_to_document(codec: &HtmlCodec, markup: &str) -> Result<Document> {
    let dom = parse_document(RcDom::default(), Default::default()).one(markup);

    let script = find_element_by_id(&dom.document, ROOT_ELEMENT_ID)
        .ok_or_else(|| SyncError::Codec(format!("missing {} script tag", ROOT_ELEMENT_ID)))?;
    let embedded = text_content(&script);
    if embedded.trim().is_empty() {
        return Err(SyncError::Codec(format!(
            "{} script tag has no content",
            ROOT_ELEMENT_ID
        )));
    }
    let original: Value = serde_json::from_str(&embedded)
        .map_err(|e| SyncError::Codec(format!("embedded document is not valid JSON: {}", e)))?;

    let merged = match find_first_element(&dom.document, "body")
        .and_then(|body| element_children(&body).into_iter().next())
    {
        Some(root) => {
            let overrides = visible_overrides(codec, &original, parse_node(&root));
            deep_merge(&original, &overrides)
        }
        None => original,
    };

    serde_json::from_value(merged)
        .map_err(|e| SyncError::Codec(format!("embedded document is not a document: {}", e)))
}

/// Drop what the markup may not change: hidden fields, hidden object types, and
/// strings that only differ from the original by line endings.
fn visible_overrides(codec: &HtmlCodec, original: &Value, overlay: Value) -> Value {
    if codec.is_hidden_object(original) {
        return Value::Null;
    }

    match overlay {
        Value::Object(object) => Value::Object(
            object
                .into_iter()
                .filter(|(key, _)| !codec.should_hide(key))
                .map(|(key, value)| {
                    let stored = original.get(key.as_str()).unwrap_or(&Value::Null);
                    let next = visible_overrides(codec, stored, value);
                    (key, next)
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .enumerate()
                .map(|(index, item)| {
                    let stored = original.get(index).unwrap_or(&Value::Null);
                    visible_overrides(codec, stored, item)
                })
                .collect(),
        ),
        // HTML parsing turns CR LF and lone CR into LF.
        Value::String(text) => match original.as_str() {
            Some(stored) if normalize_newlines(stored) == text => Value::Null,
            _ => Value::String(text),
        },
        other => other,
    }
}

fn normalize_newlines(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

/// Visible node to JSON. `Value::Null` means "no override".
fn parse_node(node: &Handle) -> Value {
    let kind = get_node_attr(node, "data-type")
        .as_deref()
        .and_then(NodeKind::from_str)
        .unwrap_or(NodeKind::String);

    match kind {
        NodeKind::Array => Value::Array(element_children(node).iter().map(parse_node).collect()),
        NodeKind::Object => {
            let mut object = Map::new();
            for child in element_children(node) {
                if let Some(field) = get_node_attr(&child, "data-field") {
                    object.insert(last_field_part(&field), parse_node(&child));
                }
            }
            Value::Object(object)
        }
        NodeKind::Boolean | NodeKind::Null => Value::Null,
        NodeKind::Number => parse_number(text_content(node).trim())
            .map(Value::Number)
            .unwrap_or(Value::Null),
        NodeKind::String => Value::String(text_content(node)),
    }
}

fn parse_number(text: &str) -> Option<Number> {
    if let Ok(n) = text.parse::<u64>() {
        return Some(Number::from(n));
    }
    if let Ok(n) = text.parse::<i64>() {
        return Some(Number::from(n));
    }
    text.parse::<f64>().ok().and_then(Number::from_f64)
}

/// `body[0].children[2]` -> `children`
pub fn last_field_part(field: &str) -> String {
    let last = field.rsplit('.').next().unwrap_or(field);
    match last.rfind('[') {
        Some(open) if last.ends_with(']') && last[open + 1..last.len() - 1].chars().all(|c| c.is_ascii_digit()) => {
            last[..open].to_string()
        }
        _ => last.to_string(),
    }
}

fn element_children(node: &Handle) -> Vec<Handle> {
    node.children
        .borrow()
        .iter()
        .filter(|child| matches!(child.data, NodeData::Element { .. }))
        .cloned()
        .collect()
}

fn get_node_attr(node: &Handle, attr_name: &str) -> Option<String> {
    match &node.data {
        NodeData::Element { attrs, .. } => attrs
            .borrow()
            .iter()
            .find(|attr| &*attr.name.local == attr_name)
            .map(|attr| attr.value.to_string()),
        _ => None,
    }
}

fn text_content(node: &Handle) -> String {
    let mut text = String::new();
    collect_text(node, &mut text);
    text
}

fn collect_text(node: &Handle, out: &mut String) {
    if let NodeData::Text { contents } = &node.data {
        out.push_str(&contents.borrow());
    }
    for child in node.children.borrow().iter() {
        collect_text(child, out);
    }
}

fn find_element_by_id(node: &Handle, id: &str) -> Option<Handle> {
    if get_node_attr(node, "id").as_deref() == Some(id) {
        return Some(node.clone());
    }
    node.children
        .borrow()
        .iter()
        .find_map(|child| find_element_by_id(child, id))
}

fn find_first_element(node: &Handle, name: &str) -> Option<Handle> {
    if let NodeData::Element { name: node_name, .. } = &node.data {
        if &*node_name.local == name {
            return Some(node.clone());
        }
    }
    node.children
        .borrow()
        .iter()
        .find_map(|child| find_first_element(child, name))
}
