//! MyBatis mapper XML SQL injection detector
//!
//! Each text and CDATA node of a mapper statement is scanned for `${}`
//! interpolation in a value position. Risky nodes are rewritten in place;
//! whatever cannot be rewritten gets an advisory comment above the
//! statement element.

use crate::detectors::base::{Detection, Detector, DetectorContext, SourceFile};
use crate::fixes::{xml_advisory, Edit, Fix};
use crate::parsers::mapper_xml::{MapperFile, TextNode};
use crate::sqli::{RewriteOptions, Rewriter};

pub const XML_MESSAGE: &str = "Mapper statement interpolates ${} into a value position; use #{} parameters";

pub struct MybatisXmlSqliDetector;

impl MybatisXmlSqliDetector {
    pub fn new() -> Self {
        Self
    }

    fn inspect(&self, mapper: &MapperFile, node: &TextNode, ctx: &DetectorContext) -> Option<Detection> {
        // CDATA content is copied verbatim: no entities, and a <foreach> block would not be parsed
        let options = if node.cdata {
            RewriteOptions::default()
        } else {
            RewriteOptions::xml(true)
        };
        let rewriter = Rewriter::new(ctx.ignore.clone(), options);
        if !rewriter.remaining_risk(&node.text).is_risky() {
            return None;
        }

        let rewrite = rewriter.fix(&node.text);
        let mut edits = Vec::new();
        if rewrite.text != node.text {
            edits.push(Edit::replace(node.span.start, node.span.end, rewrite.text));
        }
        let fix = Fix::rewrite(edits);
        let fix = if rewrite.complete {
            fix
        } else {
            fix.with_advisory(xml_advisory(&mapper.source, node.anchor))
        };

        Some(Detection {
            detector: self.name(),
            message: XML_MESSAGE.to_string(),
            span: node.span,
            flagged_text: node.text.clone(),
            fqname: mapper.fqname(node),
            fix,
        })
    }
}

impl Default for MybatisXmlSqliDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl Detector for MybatisXmlSqliDetector {
    fn name(&self) -> &'static str {
        "mybatis-xml-sqli"
    }

    fn description(&self) -> &'static str {
        "Detects ${} interpolation in MyBatis mapper XML statements"
    }

    fn detect(&self, file: &SourceFile, ctx: &DetectorContext) -> Vec<Detection> {
        let SourceFile::Mapper(mapper) = file else {
            return Vec::new();
        };
        mapper
            .nodes
            .iter()
            .filter_map(|node| self.inspect(mapper, node, ctx))
            .collect()
    }
}
