use serde_json::{json, Value};

/// Wrap plain text into an Atlassian Document Format (ADF) document.
///
/// Blank lines separate paragraphs; single newlines become hard breaks.
/// Empty text yields a document with no content, which Jira accepts.
pub fn document_from_text(text: &str) -> Value {
    let normalized = text.replace("\r\n", "\n");
    let content: Vec<Value> = normalized
        .split("\n\n")
        .filter(|block| !block.trim().is_empty())
        .map(paragraph)
        .collect();

    json!({
        "type": "doc",
        "version": 1,
        "content": content,
    })
}

fn paragraph(block: &str) -> Value {
    let mut content = Vec::new();
    for (i, line) in block.trim_matches('\n').split('\n').enumerate() {
        if i > 0 {
            content.push(json!({ "type": "hardBreak" }));
        }
        if !line.is_empty() {
            content.push(json!({ "type": "text", "text": line }));
        }
    }
    json!({ "type": "paragraph", "content": content })
}
