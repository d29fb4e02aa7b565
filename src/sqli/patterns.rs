//! Compiled patterns and keyword tables for SQL clause analysis.

use regex::Regex;
use std::borrow::Cow;
use std::sync::OnceLock;

/// Keywords whose operand is not part of the risk question
pub(crate) const SKIPPED_KEYWORDS: &[&str] = &["limit", "by", "having"];

/// Keywords introducing a value position
pub(crate) const VALUE_KEYWORDS: &[&str] = &["where", "values", "set"];

/// Keywords introducing an identifier position
pub(crate) const IDENTIFIER_KEYWORDS: &[&str] = &["from", "into", "join", "select", "update"];

/// Variable names that never reach a value position in mapper templates
pub const DEFAULT_IGNORED_VARS: &[&str] = &[
    "orderByClause",
    "pageStart",
    "pageSize",
    "criterion.condition",
    "alias",
];

/// Wrapper object prefixes produced by query-builder plugins
pub const DEFAULT_IGNORED_VAR_PREFIXES: &[&str] = &["ew."];

/// Substrings of logging/reporting method names
pub const DEFAULT_LOG_METHOD_MARKERS: &[&str] = &[
    "log", "trace", "debug", "info", "alarm", "warn", "error", "fatal", "ok", "succ", "fail",
    "print",
];

static WHERE_IN_END: OnceLock<Regex> = OnceLock::new();
static LIKE_END: OnceLock<Regex> = OnceLock::new();
static ORDER_OR_GROUP_BY_END: OnceLock<Regex> = OnceLock::new();
static HAVING_END: OnceLock<Regex> = OnceLock::new();
static LIMIT_END: OnceLock<Regex> = OnceLock::new();
static FORMAT_PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
static DOLLAR_VAR: OnceLock<Regex> = OnceLock::new();
static SQL_SHAPE: OnceLock<Regex> = OnceLock::new();
static SQL_VERB: OnceLock<Regex> = OnceLock::new();

/// `... where id in (` / `... or col in`
pub(crate) fn where_in_end() -> &'static Regex {
    WHERE_IN_END.get_or_init(|| {
        Regex::new(r#"(?i)(where|and|or)\s+\S+?\s+in\s*\(?\s*('|")?$"#).expect("valid regex")
    })
}

/// `... name like '%`
pub(crate) fn like_end() -> &'static Regex {
    LIKE_END.get_or_init(|| Regex::new(r#"(?i)\S+?\s+like\s+('|")%?$"#).expect("valid regex"))
}

pub(crate) fn order_or_group_by_end() -> &'static Regex {
    ORDER_OR_GROUP_BY_END.get_or_init(|| {
        Regex::new(r"(?i)(group|order)\s+by\s*([a-zA-Z0-9_\-\(\)]+,?\s{0,3}){0,5}$")
            .expect("valid regex")
    })
}

pub(crate) fn having_end() -> &'static Regex {
    HAVING_END.get_or_init(|| {
        Regex::new(r"(?i)having\s*([a-zA-Z0-9_\-\(\)]+,?\s{0,3}){0,5}$").expect("valid regex")
    })
}

pub(crate) fn limit_end() -> &'static Regex {
    LIMIT_END.get_or_init(|| {
        Regex::new(r"(?i)limit\s*([a-zA-Z0-9_\-\(\)]+,?\s{0,3})?$").expect("valid regex")
    })
}

/// `%s` and positional `%1$s` format placeholders
pub fn format_placeholder() -> &'static Regex {
    FORMAT_PLACEHOLDER.get_or_init(|| Regex::new(r"%(\d\$\d{0,5})?s").expect("valid regex"))
}

/// `${var}` template interpolation
pub fn dollar_var() -> &'static Regex {
    DOLLAR_VAR.get_or_init(|| Regex::new(r"\$\{(\S+?)\}").expect("valid regex"))
}

/// Predefined XML entities, `&amp;` last so `&amp;lt;` stays `&lt;`
const XML_ENTITIES: &[(&str, &str)] = &[
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&quot;", "\""),
    ("&apos;", "'"),
    ("&amp;", "&"),
];

/// Text as the XML parser will hand it to MyBatis
pub fn decode_xml_entities(text: &str) -> Cow<'_, str> {
    if !text.contains('&') {
        return Cow::Borrowed(text);
    }
    let mut decoded = text.to_string();
    for (entity, replacement) in XML_ENTITIES {
        decoded = decoded.replace(entity, replacement);
    }
    Cow::Owned(decoded)
}

/// Statement that reads like a filtered SQL query
pub(crate) fn sql_shape() -> &'static Regex {
    SQL_SHAPE.get_or_init(|| {
        Regex::new(r"(?i)^\s*(select|delete|update|insert)\s+.*?(from|into|set)\s+.*?where.*")
            .expect("valid regex")
    })
}

/// Whether `text` looks like a `select/update/delete/insert ... where` statement
pub fn is_sql(text: &str) -> bool {
    sql_shape().is_match(text)
}

/// Whether `text` mentions a SQL statement verb anywhere
pub fn has_sql_verb(text: &str) -> bool {
    SQL_VERB
        .get_or_init(|| Regex::new(r"(?i)\b(select|delete|update|insert)\s").expect("valid regex"))
        .is_match(text)
}
