//! Utilities (document reading, R source quoting).

use std::fs;
use std::path::Path;

use anyhow::{bail, Result};

/// How a document's code blocks are marked up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Markdown,
    Html,
}

impl DocumentKind {
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("")
            .to_lowercase();
        match extension.as_str() {
            "md" | "markdown" | "rmd" | "qmd" | "txt" | "" => Some(DocumentKind::Markdown),
            "html" | "htm" => Some(DocumentKind::Html),
            _ => None,
        }
    }
}

/// Read a document file and report how its code blocks are marked up.
pub fn read_document(file_path: &str) -> Result<(DocumentKind, String)> {
    let path = Path::new(file_path);

    if !path.exists() {
        bail!("Document file '{}' does not exist", file_path);
    }
    if !path.is_file() {
        bail!("'{}' is not a file", file_path);
    }

    let Some(kind) = DocumentKind::from_path(path) else {
        bail!(
            "Unsupported file type: {}\nCurrently supported: .md, .Rmd, .qmd, .txt, .html, .htm",
            path.display()
        );
    };

    let content = fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read file '{}': {}", file_path, e))?;
    Ok((kind, content))
}

/// Quote `s` as a double-quoted R string literal.
///
/// The result never contains a raw newline, so it can be sent to the
/// interpreter as a single input line.
pub fn r_quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 || c == '\u{7f}' => {
                out.push_str(&format!("\\x{:02x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
