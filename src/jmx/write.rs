//! Deterministic JMX serialization.
//!
//! Output is a pure function of the tree: attributes keep insertion order,
//! indentation is two spaces per level, and line endings are always `\n`.
use super::Element;
use crate::assemble::Artifact;
use crate::error::{CompileError, Result};
use std::fs;
use std::io::Write;
use std::path::Path;

const XML_DECLARATION: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n";

/// Render the artifact to the bytes JMeter reads.
pub fn serialize(artifact: &Artifact) -> Vec<u8> {
    render_document(&artifact.to_tree()).into_bytes()
}

/// Serialize and write the artifact to `path`, replacing any existing file.
///
/// Bytes go to a temporary file beside `path` first, so a failure never
/// leaves a truncated plan behind.
pub fn write(artifact: &Artifact, path: &Path) -> Result<()> {
    let bytes = serialize(artifact);
    write_bytes(path, &bytes)?;
    tracing::info!(
        path = %path.display(),
        bytes = bytes.len(),
        "wrote test plan"
    );
    Ok(())
}

fn write_bytes(path: &Path, bytes: &[u8]) -> Result<()> {
    let io_err = |source| CompileError::Io {
        path: path.to_path_buf(),
        source,
    };
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(io_err)?;
    let mut staged = tempfile::NamedTempFile::new_in(parent).map_err(io_err)?;
    staged.write_all(bytes).map_err(io_err)?;
    staged.flush().map_err(io_err)?;
    staged.persist(path).map_err(|err| io_err(err.error))?;
    Ok(())
}

pub fn render_document(root: &Element) -> String {
    let mut out = String::from(XML_DECLARATION);
    append_element(&mut out, root, 0);
    out
}

fn append_element(out: &mut String, element: &Element, depth: usize) {
    for _ in 0..depth {
        out.push_str("  ");
    }
    out.push('<');
    out.push_str(&element.tag);
    for (name, value) in &element.attrs {
        out.push_str(&format!(" {}=\"{}\"", name, escape_attr(value)));
    }
    if let Some(text) = element.text.as_deref() {
        out.push_str(&format!(">{}</{}>\n", escape_text(text), element.tag));
        return;
    }
    if element.children.is_empty() {
        out.push_str("/>\n");
        return;
    }
    out.push_str(">\n");
    for child in &element.children {
        append_element(out, child, depth + 1);
    }
    for _ in 0..depth {
        out.push_str("  ");
    }
    out.push_str(&format!("</{}>\n", element.tag));
}

fn escape_text(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '\n' | '\t' => escaped.push(ch),
            ch if ch.is_ascii_control() => push_char_ref(&mut escaped, ch),
            _ => escaped.push(ch),
        }
    }
    escaped
}

fn escape_attr(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            ch if ch.is_ascii_control() => push_char_ref(&mut escaped, ch),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Numeric character reference, e.g. `&#13;`.
fn push_char_ref(out: &mut String, ch: char) {
    out.push_str(&format!("&#{};", u32::from(ch)));
}
