//! Expression model and fragment deconstruction
//!
//! A host-agnostic view of the string-building expressions the SQL
//! inspections reason over. The Java adapter in `parsers::java` lowers
//! tree-sitter nodes into [`Expression`]; everything downstream works on
//! owned values and never touches the syntax tree again.

use serde::Serialize;

/// Byte range of an expression in its source file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

/// Value carried by a literal node
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    /// String literal or text block, escapes already decoded
    Text(String),
    Number(String),
    Bool(bool),
    Char(String),
    Null,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Literal {
    pub value: LiteralValue,
    pub text: String,
    pub span: Span,
}

/// A local variable, parameter or field reference
#[derive(Debug, Clone, PartialEq)]
pub struct Reference {
    pub name: String,
    /// Declared type as written (`String`, `int`, `var`, ...)
    pub ty: Option<String>,
    /// Initializer when it is visible and effectively constant
    pub resolution: Option<Box<Expression>>,
    pub text: String,
    pub span: Span,
}

/// Binary chain flattened left to right
#[derive(Debug, Clone, PartialEq)]
pub struct Concat {
    pub operator: String,
    pub operands: Vec<Expression>,
    pub text: String,
    pub span: Span,
}

/// Method invocation or object creation
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub receiver: Option<Box<Expression>>,
    pub name: String,
    pub args: Vec<Expression>,
    /// `new Name(args)`
    pub constructor: bool,
    pub text: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Opaque {
    pub ty: Option<String>,
    pub text: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Literal(Literal),
    VariableRef(Reference),
    FieldRef(Reference),
    Concat(Concat),
    Call(Call),
    Opaque(Opaque),
}

/// One slice of a string-building expression, in source order
#[derive(Debug, Clone, PartialEq)]
pub enum Fragment {
    Constant(String),
    Dynamic(Expression),
}

/// Placeholder standing in for a dynamic fragment in apparent text
pub const DYNAMIC_MARKER: &str = "?";

const SQL_CARE_TYPES: &[&str] = &[
    "String",
    "java.lang.String",
    "StringBuilder",
    "java.lang.StringBuilder",
    "StringBuffer",
    "java.lang.StringBuffer",
    "CharSequence",
];

const BUILDER_TYPES: &[&str] = &[
    "StringBuilder",
    "java.lang.StringBuilder",
    "StringBuffer",
    "java.lang.StringBuffer",
];

/// Calls whose result is numeric no matter the receiver
const NUMERIC_METHODS: &[&str] = &[
    "size",
    "length",
    "ordinal",
    "hashCode",
    "intValue",
    "longValue",
    "compareTo",
    "indexOf",
    "count",
];

impl Expression {
    pub fn text(value: &str) -> Self {
        Expression::Literal(Literal {
            value: LiteralValue::Text(value.to_string()),
            text: format!("\"{}\"", value.replace('"', "\\\"")),
            span: Span::default(),
        })
    }

    pub fn number(value: &str) -> Self {
        Expression::Literal(Literal {
            value: LiteralValue::Number(value.to_string()),
            text: value.to_string(),
            span: Span::default(),
        })
    }

    pub fn variable(name: &str, ty: Option<&str>, resolution: Option<Expression>) -> Self {
        Expression::VariableRef(Reference::new(name, ty, resolution))
    }

    pub fn field(name: &str, ty: Option<&str>, resolution: Option<Expression>) -> Self {
        Expression::FieldRef(Reference::new(name, ty, resolution))
    }

    pub fn concat(operands: Vec<Expression>) -> Self {
        let text = operands
            .iter()
            .map(|o| o.source_text())
            .collect::<Vec<_>>()
            .join(" + ");
        Expression::Concat(Concat {
            operator: "+".to_string(),
            operands,
            text,
            span: Span::default(),
        })
    }

    pub fn call(receiver: Option<Expression>, name: &str, args: Vec<Expression>) -> Self {
        let args_text = args
            .iter()
            .map(|a| a.source_text())
            .collect::<Vec<_>>()
            .join(", ");
        let text = match &receiver {
            Some(r) => format!("{}.{}({})", r.source_text(), name, args_text),
            None => format!("{}({})", name, args_text),
        };
        Expression::Call(Call {
            receiver: receiver.map(Box::new),
            name: name.to_string(),
            args,
            constructor: false,
            text,
            span: Span::default(),
        })
    }

    pub fn opaque(text: &str) -> Self {
        Expression::Opaque(Opaque {
            ty: None,
            text: text.to_string(),
            span: Span::default(),
        })
    }

    pub fn span(&self) -> Span {
        match self {
            Expression::Literal(l) => l.span,
            Expression::VariableRef(r) | Expression::FieldRef(r) => r.span,
            Expression::Concat(c) => c.span,
            Expression::Call(c) => c.span,
            Expression::Opaque(o) => o.span,
        }
    }

    /// Source text as written
    pub fn source_text(&self) -> &str {
        match self {
            Expression::Literal(l) => &l.text,
            Expression::VariableRef(r) | Expression::FieldRef(r) => &r.text,
            Expression::Concat(c) => &c.text,
            Expression::Call(c) => &c.text,
            Expression::Opaque(o) => &o.text,
        }
    }

    /// Text value of a string literal
    pub fn literal_text(&self) -> Option<&str> {
        match self {
            Expression::Literal(Literal {
                value: LiteralValue::Text(s),
                ..
            }) => Some(s),
            _ => None,
        }
    }

    pub fn is_plus_concat(&self) -> bool {
        matches!(self, Expression::Concat(c) if c.operator == "+")
    }

    /// Whether this expression can carry attacker-controlled text.
    ///
    /// Numbers, booleans and references declared with a non-textual type
    /// cannot change the shape of a query and are left out of the risk
    /// question. Unknown types are assumed textual.
    pub fn is_sql_care(&self) -> bool {
        match self {
            Expression::Literal(l) => matches!(l.value, LiteralValue::Text(_)),
            Expression::VariableRef(r) | Expression::FieldRef(r) => match r.ty.as_deref() {
                None | Some("var") => r.resolution.as_ref().is_none_or(|e| e.is_sql_care()),
                Some(ty) => SQL_CARE_TYPES.contains(&ty),
            },
            Expression::Concat(c) => {
                c.operator == "+" && c.operands.iter().any(|o| o.is_sql_care())
            }
            Expression::Call(c) => call_is_sql_care(c),
            Expression::Opaque(o) => o.ty.as_deref().is_none_or(|ty| SQL_CARE_TYPES.contains(&ty)),
        }
    }
}

impl Reference {
    fn new(name: &str, ty: Option<&str>, resolution: Option<Expression>) -> Self {
        Self {
            name: name.to_string(),
            ty: ty.map(str::to_string),
            resolution: resolution.map(Box::new),
            text: name.to_string(),
            span: Span::default(),
        }
    }

    fn is_builder(&self) -> bool {
        self.ty
            .as_deref()
            .is_some_and(|ty| BUILDER_TYPES.contains(&ty))
    }
}

fn call_is_sql_care(call: &Call) -> bool {
    if call.constructor {
        return BUILDER_TYPES.contains(&call.name.as_str()) || call.name == "String";
    }
    if call.name == "join" {
        return join_is_sql_care(call);
    }
    if NUMERIC_METHODS.contains(&call.name.as_str()) {
        return false;
    }
    // `Status.ACTIVE.name()` and friends: enum constants render fixed text
    let receiver = call
        .receiver
        .as_deref()
        .map(Expression::source_text)
        .unwrap_or_default();
    !is_constant_name(last_segment(receiver))
}

/// A join carries text unless every collection argument has a known non-text element type
fn join_is_sql_care(call: &Call) -> bool {
    let elements: Vec<Option<&str>> = call.args.iter().filter_map(element_type).collect();
    elements.is_empty()
        || elements
            .iter()
            .any(|e| e.is_none_or(|ty| SQL_CARE_TYPES.contains(&ty)))
}

/// Element type of a reference declared as `T[]` or `Coll<T>`.
///
/// `None` when the argument is not such a collection; `Some(None)` when it
/// is but the element type cannot be read off the declaration.
fn element_type(arg: &Expression) -> Option<Option<&str>> {
    let (Expression::VariableRef(r) | Expression::FieldRef(r)) = arg else {
        return None;
    };
    let ty = r.ty.as_deref()?.trim();
    if let Some(element) = ty.strip_suffix("[]") {
        return Some(Some(element.trim()));
    }
    let (_, params) = ty.split_once('<')?;
    let params = params.strip_suffix('>')?.trim();
    if params.contains([',', '<', '?']) {
        return Some(None);
    }
    Some(Some(params))
}

fn last_segment(qualified: &str) -> &str {
    qualified.rsplit('.').next().unwrap_or(qualified)
}

/// `UPPER_SNAKE` identifiers name constants or enum members
fn is_constant_name(name: &str) -> bool {
    !name.is_empty()
        && name.chars().any(|c| c.is_ascii_uppercase())
        && name
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

/// Flatten a string-building expression into constant and dynamic slices.
///
/// Only `+` chains are walked; any other operator yields the whole
/// expression as a single dynamic fragment. References resolving to a
/// literal become constants, references resolving to a chain are spliced
/// in, and `StringBuilder` append chains are unrolled.
pub fn deconstruct(expr: &Expression) -> Vec<Fragment> {
    let mut out = Vec::new();
    match expr {
        Expression::Concat(c) if c.operator == "+" => {
            for operand in &c.operands {
                push_operand(operand, &mut out);
            }
        }
        Expression::Concat(_) => out.push(Fragment::Dynamic(expr.clone())),
        other => push_operand(other, &mut out),
    }
    merge_constants(out)
}

fn push_operand(operand: &Expression, out: &mut Vec<Fragment>) {
    match operand {
        Expression::Literal(l) => match &l.value {
            LiteralValue::Text(s) => out.push(Fragment::Constant(s.clone())),
            _ => out.push(Fragment::Dynamic(operand.clone())),
        },
        Expression::VariableRef(r) | Expression::FieldRef(r) => match r.resolution.as_deref() {
            Some(Expression::Literal(Literal {
                value: LiteralValue::Text(s),
                ..
            })) => out.push(Fragment::Constant(s.clone())),
            Some(resolved @ Expression::Concat(c)) if c.operator == "+" => {
                out.extend(deconstruct(resolved));
            }
            Some(resolved @ Expression::Call(_)) if r.is_builder() => {
                match builder_fragments(resolved) {
                    Some(fragments) => out.extend(fragments),
                    None => out.push(Fragment::Dynamic(operand.clone())),
                }
            }
            _ => out.push(Fragment::Dynamic(operand.clone())),
        },
        Expression::Concat(c) if c.operator == "+" => {
            for nested in &c.operands {
                push_operand(nested, out);
            }
        }
        Expression::Call(call) if call.name == "toString" && call.args.is_empty() => {
            match call.receiver.as_deref().and_then(builder_fragments) {
                Some(fragments) => out.extend(fragments),
                None => out.push(Fragment::Dynamic(operand.clone())),
            }
        }
        _ => out.push(Fragment::Dynamic(operand.clone())),
    }
}

/// Unroll `new StringBuilder(a).append(b).append(c)` into fragments
fn builder_fragments(expr: &Expression) -> Option<Vec<Fragment>> {
    match expr {
        Expression::Call(call) if call.constructor && BUILDER_TYPES.contains(&call.name.as_str()) => {
            let mut out = Vec::new();
            match call.args.as_slice() {
                [] => {}
                [arg] if arg.is_sql_care() => push_operand(arg, &mut out),
                // capacity argument
                [_] => {}
                _ => return None,
            }
            Some(out)
        }
        Expression::Call(call) if call.name == "append" && call.args.len() == 1 => {
            let mut out = builder_fragments(call.receiver.as_deref()?)?;
            push_operand(&call.args[0], &mut out);
            Some(out)
        }
        Expression::VariableRef(r) if r.is_builder() => {
            builder_fragments(r.resolution.as_deref()?)
        }
        _ => None,
    }
}

fn merge_constants(fragments: Vec<Fragment>) -> Vec<Fragment> {
    let mut merged: Vec<Fragment> = Vec::with_capacity(fragments.len());
    for fragment in fragments {
        match (merged.last_mut(), fragment) {
            (Some(Fragment::Constant(prev)), Fragment::Constant(next)) => prev.push_str(&next),
            (_, fragment) => merged.push(fragment),
        }
    }
    merged
}

/// Apparent text of a fragment list: constants verbatim, dynamics as `?`
pub fn apparent_shape(fragments: &[Fragment]) -> String {
    fragments
        .iter()
        .map(|f| match f {
            Fragment::Constant(s) => s.as_str(),
            Fragment::Dynamic(_) => DYNAMIC_MARKER,
        })
        .collect()
}

/// Apparent text with dynamics rendered as their source text
pub fn apparent_source(fragments: &[Fragment]) -> String {
    fragments
        .iter()
        .map(|f| match f {
            Fragment::Constant(s) => s.as_str(),
            Fragment::Dynamic(e) => e.source_text(),
        })
        .collect()
}

#[cfg(test)]
mod tests;
