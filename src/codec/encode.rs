use serde_json::Value;

use super::{HtmlCodec, NodeKind, ROOT_ELEMENT_ID};
use crate::document::Document;
use crate::error::Result;

pub fn document_to_html(codec: &HtmlCodec, document: &Document) -> Result<String> {
    let root = document.to_value();
    let embedded = escape_script_json(&serde_json::to_string(&root)?);

    let mut html = Vec::with_capacity(6);
    html.push("<!DOCTYPE html><html><head>".to_string());
    html.push(format!(
        "<script type=\"application/json\" id=\"{}\">{}</script>",
        ROOT_ELEMENT_ID, embedded
    ));
    html.push("</head><body>".to_string());
    html.push(render_value(codec, &root, ""));
    html.push("</body></html>".to_string());
    Ok(html.join("\n"))
}

fn render_value(codec: &HtmlCodec, value: &Value, path: &str) -> String {
    match value {
        Value::Array(items) => {
            if path.ends_with(".marks") || path == "marks" {
                return empty_node(path, NodeKind::Array);
            }
            let children = items
                .iter()
                .enumerate()
                .map(|(index, item)| {
                    let item_path = format!("{}[{}]", path, index);
                    // Placeholder keeps the positions of the following items.
                    if codec.is_hidden_object(item) {
                        empty_node(&item_path, NodeKind::Object)
                    } else {
                        render_value(codec, item, &item_path)
                    }
                })
                .collect::<Vec<_>>()
                .join("\n");
            container_node(path, NodeKind::Array, &children)
        }
        Value::Object(object) => {
            let children = object
                .iter()
                .filter(|(key, child)| !codec.should_hide(key) && !codec.is_hidden_object(child))
                .map(|(key, child)| {
                    let child_path = if path.is_empty() {
                        key.clone()
                    } else {
                        format!("{}.{}", path, key)
                    };
                    render_value(codec, child, &child_path)
                })
                .collect::<Vec<_>>()
                .join("\n");
            container_node(path, NodeKind::Object, &children)
        }
        // Non-translatable leaves only carry their type.
        Value::Bool(_) => empty_node(path, NodeKind::Boolean),
        Value::Null => empty_node(path, NodeKind::Null),
        Value::Number(number) => leaf_node(path, NodeKind::Number, &number.to_string()),
        Value::String(text) => leaf_node(path, NodeKind::String, text),
    }
}

fn container_node(path: &str, kind: NodeKind, children: &str) -> String {
    format!(
        "<div data-field=\"{}\" data-type=\"{}\">\n{}\n</div>",
        escape_attr(path),
        kind.as_str(),
        children
    )
}

fn leaf_node(path: &str, kind: NodeKind, text: &str) -> String {
    format!(
        "<div data-field=\"{}\" data-type=\"{}\">{}</div>",
        escape_attr(path),
        kind.as_str(),
        escape_html(text)
    )
}

fn empty_node(path: &str, kind: NodeKind) -> String {
    format!(
        "<div data-field=\"{}\" data-type=\"{}\"></div>",
        escape_attr(path),
        kind.as_str()
    )
}

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

pub fn escape_attr(text: &str) -> String {
    text.replace('&', "&amp;").replace('"', "&quot;")
}

/// `<`, `>` and `&` only occur inside JSON strings, where unicode escapes are equivalent.
fn escape_script_json(json: &str) -> String {
    json.replace('<', "\\u003c")
        .replace('>', "\\u003e")
        .replace('&', "\\u0026")
}
