//! `String.format` SQL injection detector
//!
//! Flags format templates that splice a text argument into a value position:
//!
//! ```java
//! String.format("select * from users where name = '%s'", name);
//! ```
//!
//! Each `%s` (or positional `%1$s`) is paired with its argument; numeric
//! arguments only stand in as `?` in the running template text.

use crate::detectors::base::{Detection, Detector, DetectorContext, SourceFile};
use crate::detectors::polyadic::FORMAT_MESSAGE;
use crate::expr::{deconstruct, Expression, Fragment, Span};
use crate::fixes::{java_advisory, Fix};
use crate::parsers::java::{argument_nodes, JavaFile};
use crate::sqli::patterns::format_placeholder;
use crate::sqli::{additive_risk, is_sql};
use tree_sitter::Node;

pub struct FormatStringSqliDetector;

impl FormatStringSqliDetector {
    pub fn new() -> Self {
        Self
    }

    fn inspect(&self, java: &JavaFile, call: Node, ctx: &DetectorContext) -> Option<Detection> {
        let mut args = argument_nodes(call);
        if args.first().is_some_and(|a| is_locale(java, *a)) {
            args.remove(0);
        }
        let (template_node, rest) = args.split_first()?;
        let template = template_text(&java.lower(*template_node))?;
        if !format_placeholder().is_match(&template) || !is_sql(&template) {
            return None;
        }
        if java.inside_call_named(call, |name| ctx.is_log_method(name)) {
            return None;
        }

        let arguments: Vec<Expression> = rest.iter().map(|a| java.lower(*a)).collect();
        if !additive_risk(&template_fragments(&template, &arguments)).is_risky() {
            return None;
        }

        let anchor = java
            .enclosing_statement(call)
            .map(|s| s.start_byte())
            .unwrap_or(call.start_byte());
        Some(Detection {
            detector: self.name(),
            message: FORMAT_MESSAGE.to_string(),
            span: Span::new(call.start_byte(), call.end_byte()),
            flagged_text: java.text(call).to_string(),
            fqname: java.location_fqname(call),
            fix: Fix::advisory(java_advisory(&java.source, anchor)),
        })
    }
}

impl Default for FormatStringSqliDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl Detector for FormatStringSqliDetector {
    fn name(&self) -> &'static str {
        "format-string-sqli"
    }

    fn description(&self) -> &'static str {
        "Detects SQL statements built with String.format templates"
    }

    fn detect(&self, file: &SourceFile, ctx: &DetectorContext) -> Vec<Detection> {
        let SourceFile::Java(java) = file else {
            return Vec::new();
        };
        java.descendants()
            .into_iter()
            .filter(|n| java.is_string_format(*n))
            .filter_map(|n| self.inspect(java, n, ctx))
            .collect()
    }
}

/// `Locale.ROOT`, `Locale.getDefault()` or a `Locale`-typed reference
fn is_locale(java: &JavaFile, arg: Node) -> bool {
    if java.text(arg).starts_with("Locale.") {
        return true;
    }
    match java.lower(arg) {
        Expression::VariableRef(r) | Expression::FieldRef(r) => r.ty.as_deref() == Some("Locale"),
        _ => false,
    }
}

/// Literal template, or a reference whose initializer is one
fn template_text(expr: &Expression) -> Option<String> {
    if let Some(text) = expr.literal_text() {
        return Some(text.to_string());
    }
    match expr {
        Expression::VariableRef(r) | Expression::FieldRef(r) => r
            .resolution
            .as_deref()
            .and_then(Expression::literal_text)
            .map(str::to_string),
        _ => None,
    }
}

/// Interleave template text with the deconstructed argument of each placeholder
fn template_fragments(template: &str, arguments: &[Expression]) -> Vec<Fragment> {
    let mut fragments = Vec::new();
    let mut cursor = 0;
    let mut next_sequential = 0;
    for caps in format_placeholder().captures_iter(template) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        fragments.push(Fragment::Constant(template[cursor..whole.start()].to_string()));
        cursor = whole.end();

        let index = match caps.get(1) {
            // `1$` is the first argument
            Some(position) => position
                .as_str()
                .split('$')
                .next()
                .and_then(|n| n.parse::<usize>().ok())
                .map(|n| n.saturating_sub(1)),
            None => {
                next_sequential += 1;
                Some(next_sequential - 1)
            }
        };
        match index.and_then(|i| arguments.get(i)) {
            Some(argument) => fragments.extend(deconstruct(argument)),
            None => fragments.push(Fragment::Dynamic(Expression::opaque(whole.as_str()))),
        }
    }
    fragments.push(Fragment::Constant(template[cursor..].to_string()));
    fragments
}
