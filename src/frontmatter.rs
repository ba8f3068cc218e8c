//! Minimal front-matter handling.
//!
//! No YAML dependency: the only recognized key is `title`, one `key: value`
//! line per block, inside a leading block delimited by lines containing
//! exactly `---`. A file without the block is treated as all-body.

const DELIM: &str = "---";

/// A parsed file: optional title plus the body that follows the block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    pub title: Option<String>,
    pub body: String,
}

/// Split `text` into its front-matter title (if any) and body.
pub fn parse(text: &str) -> Document {
    let mut lines = text.lines();
    let Some(first) = lines.next() else {
        return Document {
            title: None,
            body: String::new(),
        };
    };
    if first.trim_end() != DELIM {
        return Document {
            title: None,
            body: text.to_string(),
        };
    }

    let mut title = None;
    let mut consumed_header = false;
    let rest = lines.as_str();
    let mut offset = first.len() + 1; // account for newline after the opening delimiter
    for line in rest.lines() {
        if line.trim_end() == DELIM {
            consumed_header = true;
            offset += line.len() + 1;
            break;
        }
        if let Some(value) = line.strip_prefix("title:") {
            title = Some(value.trim().to_string());
        }
        offset += line.len() + 1;
    }

    if !consumed_header {
        // Never found a closing delimiter: treat the whole thing as body,
        // including the stray opening marker.
        return Document {
            title: None,
            body: text.to_string(),
        };
    }

    let body = text.get(offset.min(text.len())..).unwrap_or("").to_string();
    Document { title, body }
}

/// Strip a leading front-matter block, if present, returning only the body.
pub fn strip(text: &str) -> String {
    parse(text).body
}

/// Render a document back to text, writing the front-matter block only when
/// a title is present.
pub fn render(title: Option<&str>, body: &str) -> String {
    match title {
        Some(title) => format!("{DELIM}\ntitle: {title}\n{DELIM}\n{body}"),
        None => body.to_string(),
    }
}
