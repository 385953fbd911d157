//! Discovery of runnable R code blocks in documents.

use once_cell::sync::Lazy;
use pulldown_cmark::{CodeBlockKind, Event, Parser, Tag, TagEnd};
use regex::{Captures, Regex};
use serde::Serialize;

use crate::utils::DocumentKind;

static PRE_CODE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<pre\b[^>]*?\bclass\s*=\s*["']([^"']*)["'][^>]*>\s*<code\b[^>]*>(.*?)</code>\s*</pre>"#)
        .expect("valid pre/code regex")
});
static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("valid tag regex"));
static ENTITY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"&(#[xX][0-9a-fA-F]+|#[0-9]+|[a-zA-Z]+);").expect("valid entity regex")
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snippet {
    /// Position among the document's R blocks, starting at 0.
    pub index: usize,
    /// Chunk label from an R Markdown header such as `{r setup}`.
    pub label: Option<String>,
    pub code: String,
}

impl Snippet {
    pub fn title(&self) -> String {
        match &self.label {
            Some(label) => format!("[{}] {}", self.index + 1, label),
            None => format!("[{}]", self.index + 1),
        }
    }
}

pub fn extract(kind: DocumentKind, content: &str) -> Vec<Snippet> {
    match kind {
        DocumentKind::Markdown => from_markdown(content),
        DocumentKind::Html => from_html(content),
    }
}

/// Fenced blocks tagged `r`, or R Markdown chunks `{r ...}`.
pub fn from_markdown(src: &str) -> Vec<Snippet> {
    let mut snippets = Vec::new();
    let mut current: Option<(Option<String>, String)> = None;

    for event in Parser::new(src) {
        match event {
            Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(info))) => {
                current = parse_info(&info).map(|label| (label, String::new()));
            }
            Event::Text(text) => {
                if let Some((_, code)) = current.as_mut() {
                    code.push_str(&text);
                }
            }
            Event::End(TagEnd::CodeBlock) => {
                if let Some((label, code)) = current.take() {
                    snippets.push(Snippet { index: snippets.len(), label, code });
                }
            }
            _ => {}
        }
    }
    snippets
}

/// `Some(label)` when the fence info string marks an R block.
fn parse_info(info: &str) -> Option<Option<String>> {
    let info = info.trim();
    let inner = match info.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
        Some(inner) => inner.trim(),
        None => {
            let lang = info.split_whitespace().next()?;
            return lang.eq_ignore_ascii_case("r").then_some(None);
        }
    };

    let split = inner
        .find(|c: char| c.is_whitespace() || c == ',')
        .unwrap_or(inner.len());
    let (lang, rest) = inner.split_at(split);
    if !lang.eq_ignore_ascii_case("r") {
        return None;
    }
    let rest = rest.trim_start_matches(|c: char| c.is_whitespace() || c == ',');
    let first = rest.split(',').next().unwrap_or("").trim();
    let label = (!first.is_empty() && !first.contains('=')).then(|| first.to_string());
    Some(label)
}

/// `<pre class="r"><code>…</code></pre>` blocks from rendered HTML.
pub fn from_html(src: &str) -> Vec<Snippet> {
    let mut snippets = Vec::new();
    for caps in PRE_CODE_RE.captures_iter(src) {
        let is_r = caps[1].split_whitespace().any(|c| c.eq_ignore_ascii_case("r"));
        if !is_r {
            continue;
        }
        let text = TAG_RE.replace_all(&caps[2], "");
        snippets.push(Snippet {
            index: snippets.len(),
            label: None,
            code: unescape_html(&text),
        });
    }
    snippets
}

fn unescape_html(s: &str) -> String {
    ENTITY_RE
        .replace_all(s, |caps: &Captures| {
            let name = &caps[1];
            let decoded = if let Some(hex) = name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
            } else if let Some(dec) = name.strip_prefix('#') {
                dec.parse::<u32>().ok().and_then(char::from_u32)
            } else {
                match name {
                    "amp" => Some('&'),
                    "lt" => Some('<'),
                    "gt" => Some('>'),
                    "quot" => Some('"'),
                    "apos" => Some('\''),
                    "nbsp" => Some('\u{a0}'),
                    _ => None,
                }
            };
            decoded.map(String::from).unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}
