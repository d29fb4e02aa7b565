//! Text edits produced by the detectors
//!
//! A fix is a set of byte-range edits against the original source. Edits for
//! one file are applied together, back to front, so no edit ever sees offsets
//! shifted by another.

use crate::models::FixStatus;
use crate::parsers::line_start_and_indent;
use serde::Serialize;
use tracing::debug;

/// Body of the advisory comment placed before code that needs manual attention
pub const ADVISORY_TEXT: &str =
    "sqlsentry: possible SQL injection; bind values as parameters instead of concatenating them";

/// Replace `start..end` of the source with `replacement`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Edit {
    pub start: usize,
    pub end: usize,
    pub replacement: String,
}

impl Edit {
    pub fn replace(start: usize, end: usize, replacement: impl Into<String>) -> Self {
        Self {
            start,
            end,
            replacement: replacement.into(),
        }
    }

    pub fn insert(at: usize, text: impl Into<String>) -> Self {
        Self::replace(at, at, text)
    }
}

/// Edits for one finding and what they achieve
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fix {
    pub edits: Vec<Edit>,
    pub status: FixStatus,
}

impl Fix {
    /// Automatic rewrite to bound parameters
    pub fn rewrite(edits: Vec<Edit>) -> Self {
        Self {
            edits,
            status: FixStatus::Fixed,
        }
    }

    /// Advisory comment only; `None` when the comment is already in place
    pub fn advisory(edit: Option<Edit>) -> Self {
        Self {
            edits: edit.into_iter().collect(),
            status: FixStatus::Unresolved,
        }
    }

    /// Keep a partial rewrite but flag the location for manual attention
    pub fn with_advisory(mut self, edit: Option<Edit>) -> Self {
        self.edits.extend(edit);
        self.status = FixStatus::Unresolved;
        self
    }

    /// Short human description for reports
    pub fn describe(&self) -> String {
        match self.status {
            FixStatus::Fixed => "rewrite the template to bound parameters".to_string(),
            FixStatus::Unresolved => "bind the values as parameters by hand".to_string(),
        }
    }
}

/// Java line comment on its own line before the line holding `offset`
pub fn java_advisory(source: &str, offset: usize) -> Option<Edit> {
    let comment = format!("// {ADVISORY_TEXT}");
    advisory_line(source, offset, &comment)
}

/// XML comment on its own line before the line holding `offset`
pub fn xml_advisory(source: &str, offset: usize) -> Option<Edit> {
    let comment = format!("<!-- {ADVISORY_TEXT} -->");
    advisory_line(source, offset, &comment)
}

fn advisory_line(source: &str, offset: usize, comment: &str) -> Option<Edit> {
    let (line_start, indent) = line_start_and_indent(source, offset);
    let previous = source[..line_start.saturating_sub(1)]
        .rsplit('\n')
        .next()
        .unwrap_or_default();
    if line_start > 0 && previous.trim() == comment {
        return None;
    }
    Some(Edit::insert(line_start, format!("{indent}{comment}\n")))
}

/// Apply `edits` to `source` in one pass.
///
/// Identical edits collapse into one; an edit overlapping one already applied
/// is dropped.
pub fn apply_edits(source: &str, edits: &[Edit]) -> String {
    let mut ordered: Vec<&Edit> = edits.iter().collect();
    ordered.sort();
    ordered.dedup();

    let mut out = source.to_string();
    let mut limit = source.len();
    for edit in ordered.into_iter().rev() {
        if edit.start > edit.end || edit.end > limit {
            debug!("Skipping overlapping edit at {}..{}", edit.start, edit.end);
            continue;
        }
        out.replace_range(edit.start..edit.end, &edit.replacement);
        limit = edit.start;
    }
    out
}
