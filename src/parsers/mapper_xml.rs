//! MyBatis mapper XML scanning
//!
//! Mapper files are scanned with a small regex tokenizer rather than a full
//! XML parser: the inspection only needs the raw text of each text/CDATA
//! node with its byte span, the element it sits in, and the enclosing
//! statement's `id`. Raw text is kept byte for byte so rewrites can be
//! spliced straight back into the file.

use crate::expr::Span;
use anyhow::{Context, Result};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Elements whose text is never inspected
const SKIPPED_PARENTS: &[&str] = &["mapper", "sql"];

/// Elements carrying a statement `id`
const STATEMENT_TAGS: &[&str] = &["select", "insert", "update", "delete", "sql"];

static MARKUP: OnceLock<Regex> = OnceLock::new();
static ATTRIBUTE: OnceLock<Regex> = OnceLock::new();
static DOCTYPE: OnceLock<Regex> = OnceLock::new();

fn markup() -> &'static Regex {
    MARKUP.get_or_init(|| {
        Regex::new(
            r#"(?s)(?P<comment><!--.*?-->)|<!\[CDATA\[(?P<cdata>.*?)\]\]>|(?P<decl><![^>]*>|<\?.*?\?>)|<(?P<close>/)?(?P<name>[A-Za-z_][\w:.\-]*)(?P<attrs>(?:\s+[^\s=>/]+(?:\s*=\s*(?:"[^"]*"|'[^']*'))?)*)\s*(?P<selfclose>/)?>"#,
        )
        .expect("valid regex")
    })
}

fn attribute() -> &'static Regex {
    ATTRIBUTE.get_or_init(|| {
        Regex::new(r#"([^\s=]+)\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("valid regex")
    })
}

fn doctype() -> &'static Regex {
    DOCTYPE.get_or_init(|| Regex::new(r"(?is)<!DOCTYPE[^>]*>").expect("valid regex"))
}

/// Whether `source` declares the MyBatis mapper DTD
pub fn is_mapper_document(source: &str) -> bool {
    doctype().find(source).is_some_and(|m| {
        let decl = m.as_str();
        decl.contains("mybatis.org") && decl.contains("mapper.dtd")
    })
}

/// A text or CDATA node of a mapper
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextNode {
    /// Raw text exactly as it appears in the file
    pub text: String,
    pub span: Span,
    pub cdata: bool,
    /// Name of the element holding the node
    pub parent: String,
    pub statement_id: Option<String>,
    /// Offset of the enclosing statement's start tag (or of the node itself)
    pub anchor: usize,
}

/// A parsed MyBatis mapper file
#[derive(Debug, Clone)]
pub struct MapperFile {
    pub path: PathBuf,
    pub source: String,
    pub namespace: Option<String>,
    pub nodes: Vec<TextNode>,
}

struct OpenElement {
    name: String,
    id: Option<String>,
    start: usize,
}

impl MapperFile {
    /// Read a file; `None` when it is not a MyBatis mapper
    pub fn parse(path: &Path) -> Result<Option<Self>> {
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read file: {}", path.display()))?;
        Ok(Self::parse_source(source, path))
    }

    pub fn parse_source(source: impl Into<String>, path: &Path) -> Option<Self> {
        let source = source.into();
        if !is_mapper_document(&source) {
            return None;
        }

        let mut namespace = None;
        let mut nodes = Vec::new();
        let mut stack: Vec<OpenElement> = Vec::new();
        let mut cursor = 0;

        for caps in markup().captures_iter(&source) {
            let Some(whole) = caps.get(0) else {
                continue;
            };
            if whole.start() > cursor {
                push_text(&mut nodes, &stack, &source, cursor, whole.start(), false);
            }
            cursor = whole.end();

            if caps.name("comment").is_some() || caps.name("decl").is_some() {
                continue;
            }
            if let Some(cdata) = caps.name("cdata") {
                push_text(&mut nodes, &stack, &source, cdata.start(), cdata.end(), true);
                continue;
            }
            let Some(name) = caps.name("name").map(|m| m.as_str()) else {
                continue;
            };
            if caps.name("close").is_some() {
                if let Some(pos) = stack.iter().rposition(|e| e.name == name) {
                    stack.truncate(pos);
                }
                continue;
            }

            let attrs = caps.name("attrs").map(|m| m.as_str()).unwrap_or_default();
            if name == "mapper" {
                namespace = attribute_value(attrs, "namespace");
            }
            if caps.name("selfclose").is_none() {
                stack.push(OpenElement {
                    name: name.to_string(),
                    id: attribute_value(attrs, "id"),
                    start: whole.start(),
                });
            }
        }
        if cursor < source.len() {
            push_text(&mut nodes, &stack, &source, cursor, source.len(), false);
        }

        Some(Self {
            path: path.to_path_buf(),
            source,
            namespace,
            nodes,
        })
    }

    /// `namespace#statement id`
    pub fn fqname(&self, node: &TextNode) -> String {
        format!(
            "{}#{}",
            self.namespace.as_deref().unwrap_or("null"),
            node.statement_id.as_deref().unwrap_or("null")
        )
    }
}

fn push_text(
    nodes: &mut Vec<TextNode>,
    stack: &[OpenElement],
    source: &str,
    start: usize,
    end: usize,
    cdata: bool,
) {
    let Some(parent) = stack.last() else {
        return;
    };
    if SKIPPED_PARENTS.contains(&parent.name.as_str()) {
        return;
    }
    let text = &source[start..end];
    if text.trim().is_empty() {
        return;
    }
    let statement = stack
        .iter()
        .rev()
        .find(|e| STATEMENT_TAGS.contains(&e.name.as_str()));
    nodes.push(TextNode {
        text: text.to_string(),
        span: Span::new(start, end),
        cdata,
        parent: parent.name.clone(),
        statement_id: statement.and_then(|e| e.id.clone()),
        anchor: statement.map(|e| e.start).unwrap_or(start),
    });
}

fn attribute_value(attrs: &str, key: &str) -> Option<String> {
    attribute().captures_iter(attrs).find_map(|caps| {
        if caps.get(1)?.as_str() != key {
            return None;
        }
        caps.get(2)
            .or_else(|| caps.get(3))
            .map(|v| v.as_str().to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAPPER: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE mapper PUBLIC "-//mybatis.org//DTD Mapper 3.0//EN" "http://mybatis.org/dtd/mybatis-3-mapper.dtd">
<mapper namespace="com.example.UserMapper">
    <sql id="columns">id, name ${extra}</sql>
    <!-- where id = ${commented} -->
    <select id="findByName" resultType="User">
        select <include refid="columns"/> from users
        <where>
            <if test="name != null and age > 3">
                and name = '${name}'
            </if>
        </where>
    </select>
    <update id="rename"><![CDATA[update users set name = ${name} where id < 3]]></update>
</mapper>
"#;

    fn parse() -> MapperFile {
        MapperFile::parse_source(MAPPER, Path::new("UserMapper.xml")).expect("mapper")
    }

    #[test]
    fn test_rejects_other_xml() {
        assert!(MapperFile::parse_source("<project><x>${a}</x></project>", Path::new("pom.xml")).is_none());
        let config = r#"<!DOCTYPE configuration PUBLIC "-//mybatis.org//DTD Config 3.0//EN" "http://mybatis.org/dtd/mybatis-3-config.dtd"><configuration/>"#;
        assert!(!is_mapper_document(config));
    }

    #[test]
    fn test_namespace_and_statement_ids() {
        let mapper = parse();
        assert_eq!(mapper.namespace.as_deref(), Some("com.example.UserMapper"));
        let risky = mapper
            .nodes
            .iter()
            .find(|n| n.text.contains("${name}") && !n.cdata)
            .expect("if body");
        assert_eq!(risky.parent, "if");
        assert_eq!(mapper.fqname(risky), "com.example.UserMapper#findByName");
        assert_eq!(&mapper.source[risky.anchor..risky.anchor + 7], "<select");
        assert_eq!(&mapper.source[risky.span.start..risky.span.end], risky.text);
    }

    #[test]
    fn test_skips_sql_fragments_and_comments() {
        let mapper = parse();
        assert!(mapper.nodes.iter().all(|n| !n.text.contains("${extra}")));
        assert!(mapper.nodes.iter().all(|n| !n.text.contains("${commented}")));
    }

    #[test]
    fn test_quoted_attribute_with_angle_bracket() {
        let mapper = parse();
        assert!(mapper.nodes.iter().all(|n| !n.text.contains("age > 3")));
    }

    #[test]
    fn test_cdata_body() {
        let mapper = parse();
        let cdata = mapper.nodes.iter().find(|n| n.cdata).expect("cdata node");
        assert_eq!(cdata.text, "update users set name = ${name} where id < 3");
        assert_eq!(cdata.statement_id.as_deref(), Some("rename"));
        assert_eq!(cdata.parent, "update");
    }

    #[test]
    fn test_text_split_around_child_elements() {
        let mapper = parse();
        assert!(mapper
            .nodes
            .iter()
            .any(|n| n.parent == "select" && n.text.contains("from users")));
    }
}
