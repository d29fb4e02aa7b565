//! String concatenation SQL injection detector
//!
//! Flags `+` chains that build a SQL statement with a text-carrying value
//! spliced into a value position:
//!
//! ```java
//! String sql = "select * from users where name = '" + name + "'";
//! ```
//!
//! Chains that only splice identifiers (`"select * from " + table`) or
//! numbers are left alone. Chains that build a `String.format` template are
//! checked placeholder by placeholder.

use crate::detectors::base::{Detection, Detector, DetectorContext, SourceFile};
use crate::expr::{apparent_shape, apparent_source, deconstruct, Fragment, Span};
use crate::fixes::{java_advisory, Fix};
use crate::parsers::java::{ancestors, JavaFile};
use crate::sqli::patterns::format_placeholder;
use crate::sqli::{additive_risk, has_sql_verb, is_sql, template_risk};
use tracing::debug;
use tree_sitter::Node;

pub const CONCAT_MESSAGE: &str = "SQL built by string concatenation; use parameter placeholders";
pub const FORMAT_MESSAGE: &str = "SQL built with a format template; use parameter placeholders";

pub struct PolyadicSqliDetector;

impl PolyadicSqliDetector {
    pub fn new() -> Self {
        Self
    }

    fn inspect(&self, java: &JavaFile, node: Node, ctx: &DetectorContext) -> Option<Detection> {
        let fragments = deconstruct(&java.lower(node));
        let apparent = apparent_source(&fragments);
        let looks_like_sql = if ctx.require_sql_shape {
            is_sql(&apparent)
        } else {
            has_sql_verb(&apparent)
        };
        if !looks_like_sql {
            return None;
        }
        if java.inside_call_named(node, |name| ctx.is_log_method(name)) {
            debug!("Skipping logged concatenation at byte {}", node.start_byte());
            return None;
        }

        let message = if carries_text(&fragments) && additive_risk(&fragments).is_risky() {
            CONCAT_MESSAGE
        } else if builds_risky_template(&fragments, &apparent) {
            FORMAT_MESSAGE
        } else {
            return None;
        };

        let anchor = java
            .enclosing_statement(node)
            .map(|s| s.start_byte())
            .unwrap_or(node.start_byte());
        Some(Detection {
            detector: self.name(),
            message: message.to_string(),
            span: Span::new(node.start_byte(), node.end_byte()),
            flagged_text: java.text(node).to_string(),
            fqname: java.location_fqname(node),
            fix: Fix::advisory(java_advisory(&java.source, anchor)),
        })
    }
}

impl Default for PolyadicSqliDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl Detector for PolyadicSqliDetector {
    fn name(&self) -> &'static str {
        "polyadic-sqli"
    }

    fn description(&self) -> &'static str {
        "Detects SQL statements built by string concatenation"
    }

    fn detect(&self, file: &SourceFile, ctx: &DetectorContext) -> Vec<Detection> {
        let SourceFile::Java(java) = file else {
            return Vec::new();
        };
        java.descendants()
            .into_iter()
            .filter(|n| is_plus(java, *n) && !is_nested_operand(java, *n))
            .filter_map(|n| self.inspect(java, n, ctx))
            .collect()
    }
}

fn is_plus(java: &JavaFile, node: Node) -> bool {
    node.kind() == "binary_expression"
        && node
            .child_by_field_name("operator")
            .is_some_and(|op| java.text(op) == "+")
}

/// Part of a larger `+` chain, possibly through parentheses
fn is_nested_operand(java: &JavaFile, node: Node) -> bool {
    ancestors(node)
        .skip(1)
        .find(|n| n.kind() != "parenthesized_expression")
        .is_some_and(|parent| is_plus(java, parent))
}

fn carries_text(fragments: &[Fragment]) -> bool {
    fragments
        .iter()
        .any(|f| matches!(f, Fragment::Dynamic(e) if e.is_sql_care()))
}

/// The chain assembles a format template whose placeholders sit in value positions
fn builds_risky_template(fragments: &[Fragment], apparent: &str) -> bool {
    let shape = apparent_shape(fragments);
    format_placeholder().is_match(&shape)
        && is_sql(apparent)
        && template_risk(&shape, format_placeholder()).is_risky()
}
