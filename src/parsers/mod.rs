//! Source adapters
//!
//! Turn files on disk into something the inspections can walk:
//! - `java` lowers tree-sitter-java nodes into the expression model
//! - `mapper_xml` finds the SQL text nodes of MyBatis mapper files

pub mod java;
pub mod mapper_xml;

use std::path::Path;

/// Extensions the scanner reads
pub const SUPPORTED_EXTENSIONS: &[&str] = &["java", "xml"];

/// Kind of source file, by extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Java,
    Xml,
}

impl SourceKind {
    pub fn of(path: &Path) -> Option<SourceKind> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("java") => Some(SourceKind::Java),
            Some("xml") => Some(SourceKind::Xml),
            _ => None,
        }
    }
}

/// 1-based line number of a byte offset
pub fn line_of(source: &str, offset: usize) -> u32 {
    let offset = offset.min(source.len());
    source.as_bytes()[..offset]
        .iter()
        .filter(|b| **b == b'\n')
        .count() as u32
        + 1
}

/// Byte offset where the line holding `offset` starts, and its indentation
pub fn line_start_and_indent(source: &str, offset: usize) -> (usize, &str) {
    let offset = offset.min(source.len());
    let start = source[..offset].rfind('\n').map(|i| i + 1).unwrap_or(0);
    let line = &source[start..];
    let indent_len = line.len() - line.trim_start_matches([' ', '\t']).len();
    (start, &source[start..start + indent_len])
}
