//! MyBatis statement annotation SQL injection detector
//!
//! Flags `${}` interpolation in a value position of `@Select`, `@Update`,
//! `@Insert` and `@Delete` mapper annotations, and rewrites literal values
//! to bound `#{}` parameters where it can.

use crate::detectors::base::{Detection, Detector, DetectorContext, SourceFile};
use crate::expr::{apparent_source, deconstruct, Expression, Span};
use crate::fixes::{java_advisory, Edit, Fix};
use crate::parsers::java::{encode_string_content, JavaFile};
use crate::sqli::{RewriteOptions, Rewriter};
use tree_sitter::Node;

pub const ANNOTATION_MESSAGE: &str =
    "MyBatis annotation interpolates ${} into a value position; use #{} parameters";

const STATEMENT_ANNOTATIONS: &[&str] = &["Select", "Delete", "Update", "Insert"];
const MYBATIS_ANNOTATIONS: &str = "org.apache.ibatis.annotations";

const SCRIPT_OPEN: &str = "<script>";
const SCRIPT_CLOSE: &str = "</script>";

/// Statement text carried by an annotation value
struct Content {
    text: String,
    /// A single literal or a `+` chain of literals, which can be replaced by one new literal
    literal_only: bool,
}

pub struct MybatisAnnotationSqliDetector;

impl MybatisAnnotationSqliDetector {
    pub fn new() -> Self {
        Self
    }

    fn inspect(
        &self,
        java: &JavaFile,
        imports: &[String],
        node: Node,
        ctx: &DetectorContext,
    ) -> Option<Detection> {
        let value = statement_value(java, imports, node)?;
        let content = content(java, value)?;
        let text = content.text.as_str();

        let (body_start, body_end, scripted) = match script_body(text) {
            Some((start, end)) => (start, end, true),
            None => (0, text.len(), false),
        };
        let body = &text[body_start..body_end];
        // plain annotation strings are not dynamic SQL, so no <foreach> there
        let options = if scripted {
            RewriteOptions::xml(true)
        } else {
            RewriteOptions::default()
        };
        let rewriter = Rewriter::new(ctx.ignore.clone(), options);
        if !rewriter.remaining_risk(body).is_risky() {
            return None;
        }

        let anchor = java
            .enclosing_method(node)
            .map(|m| m.start_byte())
            .unwrap_or(node.start_byte());
        let advisory = java_advisory(&java.source, anchor);
        let fix = if content.literal_only {
            let rewrite = rewriter.fix(body);
            let mut edits = Vec::new();
            if rewrite.text != body {
                let fixed = format!("{}{}{}", &text[..body_start], rewrite.text, &text[body_end..]);
                edits.push(Edit::replace(
                    value.start_byte(),
                    value.end_byte(),
                    format!("\"{}\"", encode_string_content(&fixed)),
                ));
            }
            let fix = Fix::rewrite(edits);
            if rewrite.complete {
                fix
            } else {
                fix.with_advisory(advisory)
            }
        } else {
            Fix::advisory(advisory)
        };

        Some(Detection {
            detector: self.name(),
            message: ANNOTATION_MESSAGE.to_string(),
            span: Span::new(node.start_byte(), node.end_byte()),
            flagged_text: java.text(node).to_string(),
            fqname: java.location_fqname(node),
            fix,
        })
    }
}

impl Default for MybatisAnnotationSqliDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl Detector for MybatisAnnotationSqliDetector {
    fn name(&self) -> &'static str {
        "mybatis-annotation-sqli"
    }

    fn description(&self) -> &'static str {
        "Detects ${} interpolation in MyBatis statement annotations"
    }

    fn detect(&self, file: &SourceFile, ctx: &DetectorContext) -> Vec<Detection> {
        let SourceFile::Java(java) = file else {
            return Vec::new();
        };
        let imports = java.imports();
        java.descendants()
            .into_iter()
            .filter(|n| n.kind() == "annotation")
            .filter_map(|n| self.inspect(java, &imports, n, ctx))
            .collect()
    }
}

/// The single value of a MyBatis statement annotation
fn statement_value<'a>(java: &JavaFile, imports: &[String], node: Node<'a>) -> Option<Node<'a>> {
    let name = java.text(node.child_by_field_name("name")?);
    let simple = name.rsplit('.').next().unwrap_or(name);
    if !STATEMENT_ANNOTATIONS.contains(&simple) {
        return None;
    }
    let qualified = name.starts_with(MYBATIS_ANNOTATIONS);
    let imported = imports.iter().any(|i| {
        i.strip_prefix(MYBATIS_ANNOTATIONS)
            .and_then(|rest| rest.strip_prefix('.'))
            .is_some_and(|rest| rest == simple || rest == "*")
    });
    if !qualified && !imported {
        return None;
    }

    let arguments = node.child_by_field_name("arguments")?;
    let mut cursor = arguments.walk();
    let elements: Vec<Node<'a>> = arguments
        .named_children(&mut cursor)
        .filter(|n| !matches!(n.kind(), "line_comment" | "block_comment"))
        .collect();
    let [element] = elements.as_slice() else {
        return None;
    };
    if element.kind() == "element_value_pair" {
        let key = element.child_by_field_name("key")?;
        if java.text(key) != "value" {
            return None;
        }
        return element.child_by_field_name("value");
    }
    Some(*element)
}

fn content(java: &JavaFile, value: Node) -> Option<Content> {
    if value.kind() == "element_value_array_initializer" {
        let mut cursor = value.walk();
        let parts: Option<Vec<String>> = value
            .named_children(&mut cursor)
            .filter(|n| !matches!(n.kind(), "line_comment" | "block_comment"))
            .map(|n| expression_text(&java.lower(n)))
            .collect();
        return Some(Content {
            text: parts?.concat(),
            literal_only: false,
        });
    }
    let expr = java.lower(value);
    Some(Content {
        text: expression_text(&expr)?,
        literal_only: is_literal_only(&expr),
    })
}

fn expression_text(expr: &Expression) -> Option<String> {
    if let Some(text) = expr.literal_text() {
        return Some(text.to_string());
    }
    match expr {
        Expression::Concat(_) if expr.is_plus_concat() => Some(apparent_source(&deconstruct(expr))),
        Expression::VariableRef(r) | Expression::FieldRef(r) => {
            r.resolution.as_deref().and_then(expression_text)
        }
        _ => None,
    }
}

fn is_literal_only(expr: &Expression) -> bool {
    match expr {
        Expression::Concat(c) if expr.is_plus_concat() => {
            c.operands.iter().all(|o| o.literal_text().is_some())
        }
        _ => expr.literal_text().is_some(),
    }
}

/// Byte range of the body of a `<script>` wrapped statement
fn script_body(text: &str) -> Option<(usize, usize)> {
    let start = text.len() - text.trim_start().len();
    let end = text.trim_end().len();
    let wrapped = &text[start..end];
    if !wrapped.starts_with(SCRIPT_OPEN) || !wrapped.ends_with(SCRIPT_CLOSE) {
        return None;
    }
    let body_start = start + SCRIPT_OPEN.len();
    let body_end = end - SCRIPT_CLOSE.len();
    (body_start <= body_end).then_some((body_start, body_end))
}
