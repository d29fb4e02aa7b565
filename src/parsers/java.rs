//! Java adapter using tree-sitter
//!
//! Lowers Java expressions into [`Expression`] values and answers the
//! structural questions the inspections ask: enclosing statement, method
//! and class, imports, and a location name for fingerprints.
//!
//! Reference resolution is lexical and local to the file: a local variable
//! resolves to its initializer when nothing reassigns it before the use (or
//! only appends constant text), a field resolves to its initializer, and a
//! `StringBuilder` local resolves to its constructor plus the statement-level
//! `append` calls that precede the use.

use crate::expr::{Call, Concat, Expression, Literal, LiteralValue, Opaque, Reference, Span};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tree_sitter::{Node, Parser, Tree};

/// Bound on nested resolution (field -> field -> ...)
const MAX_RESOLUTION_DEPTH: usize = 12;

const CALLABLE_KINDS: &[&str] = &[
    "method_declaration",
    "constructor_declaration",
    "compact_constructor_declaration",
];

const TYPE_KINDS: &[&str] = &[
    "class_declaration",
    "interface_declaration",
    "enum_declaration",
    "record_declaration",
];

const BUILDER_TYPES: &[&str] = &["StringBuilder", "StringBuffer"];

/// A parsed Java compilation unit
pub struct JavaFile {
    pub path: PathBuf,
    pub source: String,
    tree: Tree,
}

impl std::fmt::Debug for JavaFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JavaFile").field("path", &self.path).finish()
    }
}

impl JavaFile {
    /// Read and parse a Java file
    pub fn parse(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read file: {}", path.display()))?;
        Self::parse_source(source, path)
    }

    /// Parse Java source code directly (useful for testing)
    pub fn parse_source(source: impl Into<String>, path: &Path) -> Result<Self> {
        let source = source.into();
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_java::LANGUAGE.into())
            .context("Failed to set Java language")?;
        let tree = parser
            .parse(&source, None)
            .context("Failed to parse Java source")?;
        Ok(Self {
            path: path.to_path_buf(),
            source,
            tree,
        })
    }

    pub fn root(&self) -> Node<'_> {
        self.tree.root_node()
    }

    pub fn text(&self, node: Node) -> &str {
        node.utf8_text(self.source.as_bytes()).unwrap_or_default()
    }

    /// All named nodes in document order
    pub fn descendants(&self) -> Vec<Node<'_>> {
        let mut out = Vec::new();
        let mut stack = vec![self.root()];
        while let Some(node) = stack.pop() {
            out.push(node);
            let mut cursor = node.walk();
            let children: Vec<Node> = node.named_children(&mut cursor).collect();
            stack.extend(children.into_iter().rev());
        }
        out
    }

    /// Imported names as written (`org.apache.ibatis.annotations.Select`, `java.util.*`)
    pub fn imports(&self) -> Vec<String> {
        let root = self.root();
        let mut cursor = root.walk();
        root.named_children(&mut cursor)
            .filter(|n| n.kind() == "import_declaration")
            .map(|n| {
                self.text(n)
                    .trim_start_matches("import")
                    .trim_end_matches(';')
                    .replace("static ", "")
                    .trim()
                    .to_string()
            })
            .collect()
    }

    pub fn package(&self) -> Option<String> {
        let root = self.root();
        let mut cursor = root.walk();
        let package = root
            .named_children(&mut cursor)
            .find(|n| n.kind() == "package_declaration")?;
        let mut inner = package.walk();
        let name = package
            .named_children(&mut inner)
            .find(|n| matches!(n.kind(), "scoped_identifier" | "identifier"))?;
        Some(self.text(name).to_string())
    }

    /// Lower an expression node into the expression model
    pub fn lower(&self, node: Node) -> Expression {
        self.lower_at(node, 0)
    }

    fn lower_at(&self, node: Node, depth: usize) -> Expression {
        let span = Span::new(node.start_byte(), node.end_byte());
        let text = self.text(node).to_string();
        if depth > MAX_RESOLUTION_DEPTH {
            return Expression::Opaque(Opaque {
                ty: None,
                text,
                span,
            });
        }

        match node.kind() {
            "string_literal" => {
                let value = LiteralValue::Text(decode_string_literal(&text));
                literal(value, text, span)
            }
            "decimal_integer_literal"
            | "hex_integer_literal"
            | "octal_integer_literal"
            | "binary_integer_literal"
            | "decimal_floating_point_literal"
            | "hex_floating_point_literal" => {
                literal(LiteralValue::Number(text.clone()), text, span)
            }
            "true" => literal(LiteralValue::Bool(true), text, span),
            "false" => literal(LiteralValue::Bool(false), text, span),
            "character_literal" => literal(LiteralValue::Char(text.clone()), text, span),
            "null_literal" => literal(LiteralValue::Null, text, span),
            "parenthesized_expression" => match first_named_child(node) {
                Some(inner) => self.lower_at(inner, depth),
                None => opaque(text, span, None),
            },
            "identifier" => self.resolve_identifier(node, depth),
            "field_access" => self.lower_field_access(node, depth),
            "binary_expression" => self.lower_binary(node, depth),
            "method_invocation" => self.lower_invocation(node, depth),
            "object_creation_expression" => self.lower_creation(node, depth),
            "cast_expression" => {
                let ty = node
                    .child_by_field_name("type")
                    .map(|t| simple_type_name(self.text(t)));
                opaque(text, span, ty)
            }
            _ => opaque(text, span, None),
        }
    }

    fn lower_binary(&self, node: Node, depth: usize) -> Expression {
        let operator = node
            .child_by_field_name("operator")
            .map(|op| op.kind().to_string())
            .unwrap_or_default();
        let mut operands = Vec::new();
        self.flatten_binary(node, &operator, depth, &mut operands);
        Expression::Concat(Concat {
            operator,
            operands,
            text: self.text(node).to_string(),
            span: Span::new(node.start_byte(), node.end_byte()),
        })
    }

    /// tree-sitter nests `a + b + c` to the left; collect it left to right
    fn flatten_binary(&self, node: Node, operator: &str, depth: usize, out: &mut Vec<Expression>) {
        for field in ["left", "right"] {
            let Some(side) = node.child_by_field_name(field) else {
                continue;
            };
            let same_op = side.kind() == "binary_expression"
                && side
                    .child_by_field_name("operator")
                    .is_some_and(|op| op.kind() == operator);
            if field == "left" && same_op {
                self.flatten_binary(side, operator, depth, out);
            } else {
                out.push(self.lower_at(side, depth));
            }
        }
    }

    fn lower_invocation(&self, node: Node, depth: usize) -> Expression {
        let receiver = node
            .child_by_field_name("object")
            .map(|o| Box::new(self.lower_at(o, depth)));
        let name = node
            .child_by_field_name("name")
            .map(|n| self.text(n).to_string())
            .unwrap_or_default();
        Expression::Call(Call {
            receiver,
            name,
            args: self.lower_arguments(node, depth),
            constructor: false,
            text: self.text(node).to_string(),
            span: Span::new(node.start_byte(), node.end_byte()),
        })
    }

    fn lower_creation(&self, node: Node, depth: usize) -> Expression {
        let name = node
            .child_by_field_name("type")
            .map(|t| simple_type_name(self.text(t)))
            .unwrap_or_default();
        Expression::Call(Call {
            receiver: None,
            name,
            args: self.lower_arguments(node, depth),
            constructor: true,
            text: self.text(node).to_string(),
            span: Span::new(node.start_byte(), node.end_byte()),
        })
    }

    fn lower_arguments(&self, node: Node, depth: usize) -> Vec<Expression> {
        argument_nodes(node)
            .into_iter()
            .map(|a| self.lower_at(a, depth))
            .collect()
    }

    fn lower_field_access(&self, node: Node, depth: usize) -> Expression {
        let span = Span::new(node.start_byte(), node.end_byte());
        let text = self.text(node).to_string();
        let (Some(object), Some(field)) = (
            node.child_by_field_name("object"),
            node.child_by_field_name("field"),
        ) else {
            return opaque(text, span, None);
        };
        let name = self.text(field);
        let declaration = match object.kind() {
            "this" => self.find_field(node, name),
            // `Constants.SQL_BASE` declared in this file
            "identifier" => self
                .find_type(self.text(object))
                .and_then(|ty| self.field_in_type(ty, name)),
            _ => None,
        };
        match declaration {
            Some(decl) => self.field_reference(decl, text, span, depth),
            None => Expression::FieldRef(Reference {
                name: name.to_string(),
                ty: None,
                resolution: None,
                text,
                span,
            }),
        }
    }

    fn resolve_identifier(&self, ident: Node, depth: usize) -> Expression {
        let name = self.text(ident);
        let span = Span::new(ident.start_byte(), ident.end_byte());
        let text = name.to_string();

        if let Some(callable) = self.enclosing_callable(ident) {
            if let Some(local) = self.find_local(callable, name, ident.start_byte()) {
                return self.local_reference(local, callable, ident.start_byte(), text, span, depth);
            }
            if let Some(ty) = self.find_parameter(ident, callable, name) {
                return Expression::VariableRef(Reference {
                    name: text.clone(),
                    ty,
                    resolution: None,
                    text,
                    span,
                });
            }
        }
        if let Some(decl) = self.find_field(ident, name) {
            return self.field_reference(decl, text, span, depth);
        }
        opaque(text, span, None)
    }

    fn field_reference(&self, declarator: Node, text: String, span: Span, depth: usize) -> Expression {
        let ty = declarator
            .parent()
            .and_then(|p| p.child_by_field_name("type"))
            .map(|t| simple_type_name(self.text(t)));
        let resolution = declarator
            .child_by_field_name("value")
            .map(|v| Box::new(self.lower_at(v, depth + 1)));
        let name = declarator
            .child_by_field_name("name")
            .map(|n| self.text(n).to_string())
            .unwrap_or_default();
        Expression::FieldRef(Reference {
            name,
            ty,
            resolution,
            text,
            span,
        })
    }

    fn local_reference(
        &self,
        local: LocalDecl<'_>,
        callable: Node,
        use_at: usize,
        text: String,
        span: Span,
        depth: usize,
    ) -> Expression {
        let resolution = match local.declarator {
            Some(declarator) => {
                self.local_resolution(declarator, local.ty.as_deref(), callable, use_at, depth)
            }
            None => None,
        };
        Expression::VariableRef(Reference {
            name: text.clone(),
            ty: local.ty,
            resolution: resolution.map(Box::new),
            text,
            span,
        })
    }

    fn local_resolution(
        &self,
        declarator: Node,
        ty: Option<&str>,
        callable: Node,
        use_at: usize,
        depth: usize,
    ) -> Option<Expression> {
        let name = self.text(declarator.child_by_field_name("name")?);
        let value = declarator.child_by_field_name("value");
        let from = declarator.end_byte();
        let assignments = self.assignments_to(callable, name, from, use_at);

        if ty.is_some_and(|t| BUILDER_TYPES.contains(&t)) {
            if !assignments.is_empty() {
                return None;
            }
            let mut acc = self.lower_at(value?, depth + 1);
            for arg in self.builder_appends(callable, name, from, use_at)? {
                let call_text = format!("{}.append({})", acc.source_text(), arg.source_text());
                acc = Expression::Call(Call {
                    span: arg.span(),
                    receiver: Some(Box::new(acc)),
                    name: "append".to_string(),
                    args: vec![arg],
                    constructor: false,
                    text: call_text,
                });
            }
            return Some(acc);
        }

        if assignments.is_empty() {
            return value.map(|v| self.lower_at(v, depth + 1));
        }

        // constant accumulation: `sql = sql + "..."` / `sql += "..."`
        let mut folded = self.constant_text(value?, depth)?;
        for assignment in assignments {
            let operator = assignment.child_by_field_name("operator")?.kind();
            let rhs = assignment.child_by_field_name("right")?;
            match operator {
                "=" => folded = self.constant_text(rhs, depth)?,
                "+=" => folded.push_str(&self.constant_text(rhs, depth)?),
                _ => return None,
            }
        }
        Some(Expression::Literal(Literal {
            text: format!("\"{}\"", encode_string_content(&folded)),
            value: LiteralValue::Text(folded),
            span: Span::new(declarator.start_byte(), declarator.end_byte()),
        }))
    }

    /// Text of an expression that reduces entirely to constants
    fn constant_text(&self, node: Node, depth: usize) -> Option<String> {
        let fragments = crate::expr::deconstruct(&self.lower_at(node, depth + 1));
        fragments
            .iter()
            .map(|f| match f {
                crate::expr::Fragment::Constant(s) => Some(s.as_str()),
                crate::expr::Fragment::Dynamic(_) => None,
            })
            .collect()
    }

    /// Assignments to `name` that complete inside `from..use_at`
    fn assignments_to<'a>(
        &'a self,
        callable: Node<'a>,
        name: &str,
        from: usize,
        use_at: usize,
    ) -> Vec<Node<'a>> {
        descendants_of(callable)
            .into_iter()
            .filter(|n| n.kind() == "assignment_expression")
            .filter(|n| n.start_byte() >= from && n.end_byte() <= use_at)
            .filter(|n| {
                n.child_by_field_name("left")
                    .is_some_and(|l| l.kind() == "identifier" && self.text(l) == name)
            })
            .collect()
    }

    /// Arguments of `name.append(..)` statements inside `from..use_at`.
    /// `None` when the builder is mutated any other way.
    fn builder_appends(&self, callable: Node, name: &str, from: usize, use_at: usize) -> Option<Vec<Expression>> {
        let mut appended = Vec::new();
        for statement in descendants_of(callable)
            .into_iter()
            .filter(|n| n.kind() == "expression_statement")
            .filter(|n| n.start_byte() >= from && n.end_byte() <= use_at)
        {
            let Some(mut node) = first_named_child(statement) else {
                continue;
            };
            let mut chain = Vec::new();
            let targets_builder = loop {
                match node.kind() {
                    "method_invocation" => {
                        let method = node.child_by_field_name("name").map(|n| self.text(n));
                        chain.push((method, argument_nodes(node)));
                        match node.child_by_field_name("object") {
                            Some(object) => node = object,
                            None => break false,
                        }
                    }
                    "identifier" => break self.text(node) == name,
                    _ => break false,
                }
            };
            if !targets_builder {
                continue;
            }
            for (method, args) in chain.into_iter().rev() {
                match (method, args.as_slice()) {
                    (Some("append"), [arg]) => appended.push(self.lower(*arg)),
                    _ => return None,
                }
            }
        }
        Some(appended)
    }

    fn find_local<'a>(&'a self, callable: Node<'a>, name: &str, use_at: usize) -> Option<LocalDecl<'a>> {
        let mut found = None;
        for node in descendants_of(callable) {
            if node.start_byte() >= use_at {
                break;
            }
            match node.kind() {
                "variable_declarator"
                    if node.parent().is_some_and(|p| p.kind() == "local_variable_declaration") =>
                {
                    if node
                        .child_by_field_name("name")
                        .is_some_and(|n| self.text(n) == name)
                        && node.end_byte() <= use_at
                    {
                        let ty = node
                            .parent()
                            .and_then(|p| p.child_by_field_name("type"))
                            .map(|t| simple_type_name(self.text(t)));
                        found = Some(LocalDecl {
                            ty,
                            declarator: Some(node),
                        });
                    }
                }
                "enhanced_for_statement" | "catch_formal_parameter" | "resource" => {
                    if node
                        .child_by_field_name("name")
                        .is_some_and(|n| self.text(n) == name)
                    {
                        let ty = node
                            .child_by_field_name("type")
                            .map(|t| simple_type_name(self.text(t)));
                        found = Some(LocalDecl {
                            ty,
                            declarator: None,
                        });
                    }
                }
                _ => {}
            }
        }
        found
    }

    /// Declared type of a method or lambda parameter named `name`
    fn find_parameter(&self, ident: Node, callable: Node, name: &str) -> Option<Option<String>> {
        // lambda parameters shadow method parameters
        let mut current = ident.parent();
        while let Some(node) = current {
            if node.kind() == "lambda_expression" {
                if let Some(params) = node.child_by_field_name("parameters") {
                    if params.kind() == "identifier" && self.text(params) == name {
                        return Some(None);
                    }
                    if let Some(ty) = self.parameter_type(params, name) {
                        return Some(ty);
                    }
                }
            }
            if node.id() == callable.id() {
                break;
            }
            current = node.parent();
        }
        let params = callable.child_by_field_name("parameters")?;
        self.parameter_type(params, name)
    }

    fn parameter_type(&self, params: Node, name: &str) -> Option<Option<String>> {
        let mut cursor = params.walk();
        for param in params.named_children(&mut cursor) {
            match param.kind() {
                "formal_parameter" => {
                    if param
                        .child_by_field_name("name")
                        .is_some_and(|n| self.text(n) == name)
                    {
                        return Some(
                            param
                                .child_by_field_name("type")
                                .map(|t| simple_type_name(self.text(t))),
                        );
                    }
                }
                "spread_parameter" => {
                    let mut inner = param.walk();
                    let declarator = param
                        .named_children(&mut inner)
                        .find(|n| n.kind() == "variable_declarator");
                    if declarator
                        .and_then(|d| d.child_by_field_name("name"))
                        .is_some_and(|n| self.text(n) == name)
                    {
                        return Some(None);
                    }
                }
                "identifier" if self.text(param) == name => return Some(None),
                _ => {}
            }
        }
        None
    }

    /// Field declarator named `name` in the types enclosing `node`
    fn find_field<'a>(&'a self, node: Node<'a>, name: &str) -> Option<Node<'a>> {
        ancestors(node)
            .skip(1)
            .filter(|n| TYPE_KINDS.contains(&n.kind()))
            .find_map(|n| self.field_in_type(n, name))
    }

    fn find_type(&self, name: &str) -> Option<Node<'_>> {
        self.descendants().into_iter().find(|n| {
            TYPE_KINDS.contains(&n.kind())
                && n.child_by_field_name("name")
                    .is_some_and(|id| self.text(id) == name)
        })
    }

    fn field_in_type<'a>(&'a self, type_node: Node<'a>, name: &str) -> Option<Node<'a>> {
        let body = type_node.child_by_field_name("body")?;
        let mut members = Vec::new();
        let mut cursor = body.walk();
        for child in body.named_children(&mut cursor) {
            if child.kind() == "enum_body_declarations" {
                let mut inner = child.walk();
                members.extend(child.named_children(&mut inner));
            } else {
                members.push(child);
            }
        }
        members
            .into_iter()
            .filter(|m| matches!(m.kind(), "field_declaration" | "constant_declaration"))
            .flat_map(|m| {
                let mut cursor = m.walk();
                m.children_by_field_name("declarator", &mut cursor)
                    .collect::<Vec<_>>()
            })
            .find(|d| {
                d.child_by_field_name("name")
                    .is_some_and(|n| self.text(n) == name)
            })
    }

    fn enclosing_callable<'a>(&'a self, node: Node<'a>) -> Option<Node<'a>> {
        ancestors(node).find(|n| CALLABLE_KINDS.contains(&n.kind()))
    }

    /// Nearest method or constructor declaration
    pub fn enclosing_method<'a>(&'a self, node: Node<'a>) -> Option<Node<'a>> {
        self.enclosing_callable(node)
    }

    /// Nearest statement or field declaration holding `node`
    pub fn enclosing_statement<'a>(&'a self, node: Node<'a>) -> Option<Node<'a>> {
        ancestors(node)
            .take_while(|n| !matches!(n.kind(), "class_body" | "program"))
            .find(|n| {
                let kind = n.kind();
                kind == "local_variable_declaration"
                    || kind == "field_declaration"
                    || kind == "constant_declaration"
                    || kind == "explicit_constructor_invocation"
                    || (kind.ends_with("_statement") && kind != "block")
            })
    }

    /// Whether `node` is an argument (possibly through `String.format`) of a
    /// call whose name satisfies `is_excluded`
    pub fn inside_call_named(&self, node: Node, is_excluded: impl Fn(&str) -> bool) -> bool {
        let mut calls = ancestors(node)
            .skip(1)
            .take_while(|n| !matches!(n.kind(), "class_body" | "program"))
            .filter(|n| n.kind() == "method_invocation");
        let Some(mut call) = calls.next() else {
            return false;
        };
        if self.is_string_format(call) {
            match calls.next() {
                Some(outer) => call = outer,
                None => return false,
            }
        }
        call.child_by_field_name("name")
            .is_some_and(|n| is_excluded(self.text(n)))
    }

    /// `String.format(...)` or `java.lang.String.format(...)`
    pub fn is_string_format(&self, call: Node) -> bool {
        call.kind() == "method_invocation"
            && call
                .child_by_field_name("name")
                .is_some_and(|n| self.text(n) == "format")
            && call
                .child_by_field_name("object")
                .is_some_and(|o| matches!(self.text(o), "String" | "java.lang.String"))
    }

    /// Qualified name of the innermost type holding `node`
    pub fn class_qname(&self, node: Node) -> Option<String> {
        let names: Vec<&str> = ancestors(node)
            .filter(|n| TYPE_KINDS.contains(&n.kind()))
            .filter_map(|n| n.child_by_field_name("name").map(|id| self.text(id)))
            .collect();
        if names.is_empty() {
            return None;
        }
        let nested: Vec<&str> = names.into_iter().rev().collect();
        Some(match self.package() {
            Some(pkg) => format!("{}.{}", pkg, nested.join(".")),
            None => nested.join("."),
        })
    }

    /// Location name used for fingerprints.
    ///
    /// `"<class> <return type> <method>(<type> <param>, ...)"` inside a method,
    /// `"<class> <field>"` inside a field initializer, `"<class>"` otherwise,
    /// and `"null"` outside any type.
    pub fn location_fqname(&self, node: Node) -> String {
        let Some(class) = self.class_qname(node) else {
            return "null".to_string();
        };
        if let Some(method) = self.enclosing_method(node) {
            let name = method
                .child_by_field_name("name")
                .map(|n| self.text(n))
                .unwrap_or_default();
            let params = method
                .child_by_field_name("parameters")
                .map(|p| self.parameter_list(p))
                .unwrap_or_default();
            return match method.child_by_field_name("type") {
                Some(ret) => format!("{} {} {}({})", class, self.text(ret), name, params),
                None => format!("{} {}({})", class, name, params),
            };
        }
        let field = ancestors(node)
            .find(|n| n.kind() == "field_declaration")
            .and_then(|f| f.child_by_field_name("declarator"))
            .and_then(|d| d.child_by_field_name("name"));
        match field {
            Some(name) => format!("{} {}", class, self.text(name)),
            None => class,
        }
    }

    fn parameter_list(&self, params: Node) -> String {
        let mut cursor = params.walk();
        params
            .named_children(&mut cursor)
            .filter(|p| matches!(p.kind(), "formal_parameter" | "spread_parameter"))
            .map(|p| {
                let ty = p
                    .child_by_field_name("type")
                    .map(|t| self.text(t).to_string())
                    .unwrap_or_default();
                let name = p
                    .child_by_field_name("name")
                    .map(|n| self.text(n).to_string())
                    .unwrap_or_else(|| self.text(p).to_string());
                format!("{} {}", ty, name).trim().to_string()
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// A local variable-like declaration found before a use
struct LocalDecl<'a> {
    ty: Option<String>,
    /// Present for `local_variable_declaration` declarators
    declarator: Option<Node<'a>>,
}

fn literal(value: LiteralValue, text: String, span: Span) -> Expression {
    Expression::Literal(Literal { value, text, span })
}

fn opaque(text: String, span: Span, ty: Option<String>) -> Expression {
    Expression::Opaque(Opaque { ty, text, span })
}

fn first_named_child(node: Node) -> Option<Node> {
    let mut cursor = node.walk();
    let first = node.named_children(&mut cursor).next();
    first
}

/// Expression arguments of a call or object creation
pub fn argument_nodes(node: Node) -> Vec<Node> {
    let Some(args) = node.child_by_field_name("arguments") else {
        return Vec::new();
    };
    let mut cursor = args.walk();
    args.named_children(&mut cursor)
        .filter(|n| !matches!(n.kind(), "line_comment" | "block_comment"))
        .collect()
}

/// `node` and its ancestors, innermost first
pub fn ancestors(node: Node) -> impl Iterator<Item = Node> {
    std::iter::successors(Some(node), |n| n.parent())
}

/// Named nodes under `node` in document order
pub fn descendants_of(node: Node) -> Vec<Node> {
    let mut out = Vec::new();
    let mut stack = vec![node];
    while let Some(n) = stack.pop() {
        out.push(n);
        let mut cursor = n.walk();
        let children: Vec<Node> = n.named_children(&mut cursor).collect();
        stack.extend(children.into_iter().rev());
    }
    out
}

/// `java.util.List<String>` -> `List`
fn simple_type_name(ty: &str) -> String {
    let base = ty.split('<').next().unwrap_or(ty).trim();
    let base = base.trim_end_matches("[]");
    base.rsplit('.').next().unwrap_or(base).to_string()
}

/// Decode a Java string literal or text block into its value
pub fn decode_string_literal(raw: &str) -> String {
    if let Some(body) = raw
        .strip_prefix("\"\"\"")
        .and_then(|s| s.strip_suffix("\"\"\""))
    {
        // content starts after the line terminator following the opening delimiter
        let body = body.split_once('\n').map(|(_, rest)| rest).unwrap_or(body);
        return unescape(&strip_incidental_indent(body));
    }
    let body = raw
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(raw);
    unescape(body)
}

fn strip_incidental_indent(body: &str) -> String {
    let lines: Vec<&str> = body.split('\n').collect();
    let indent = lines
        .iter()
        .enumerate()
        .filter(|(i, l)| !l.trim().is_empty() || *i == lines.len() - 1)
        .map(|(_, l)| l.len() - l.trim_start().len())
        .min()
        .unwrap_or(0);
    lines
        .iter()
        .map(|l| {
            let cut = indent.min(l.len() - l.trim_start().len());
            l[cut..].trim_end()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn unescape(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('b') => out.push('\u{8}'),
            Some('f') => out.push('\u{c}'),
            Some('s') => out.push(' '),
            Some('\n') => {}
            Some('u') => {
                while chars.peek() == Some(&'u') {
                    chars.next();
                }
                let hex: String = chars.by_ref().take(4).collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(decoded) => out.push(decoded),
                    None => {
                        out.push_str("\\u");
                        out.push_str(&hex);
                    }
                }
            }
            Some(d @ '0'..='7') => {
                let mut value = d.to_digit(8).unwrap_or(0);
                let max_digits = if d <= '3' { 2 } else { 1 };
                for _ in 0..max_digits {
                    match chars.peek().and_then(|c| c.to_digit(8)) {
                        Some(next) => {
                            value = value * 8 + next;
                            chars.next();
                        }
                        None => break,
                    }
                }
                out.push(char::from_u32(value).unwrap_or('\u{fffd}'));
            }
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

/// Escape text for use between the quotes of a Java string literal
pub fn encode_string_content(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 8);
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out
}
