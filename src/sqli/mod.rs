//! SQL clause classification and injection risk scanning
//!
//! Decides, from the literal text around a dynamic point alone, whether the
//! point sits in a value position (injectable) or an identifier position
//! (table/column names, which parameter binding cannot express anyway).
//!
//! Two scanners sit on top of the classifier:
//! - the additive scanner walks a deconstructed `+` chain or format template
//! - the join-string scanner inspects one `${var}` interpolation in a template

pub mod patterns;
pub mod rewrite;

use crate::expr::{Fragment, DYNAMIC_MARKER};
use patterns::{
    having_end, limit_end, order_or_group_by_end, IDENTIFIER_KEYWORDS, SKIPPED_KEYWORDS,
    VALUE_KEYWORDS,
};
use regex::Regex;
use serde::Serialize;

pub use patterns::{has_sql_verb, is_sql};
pub use rewrite::{FixPlan, RewriteOptions, Rewriter};

/// Verdict for one dynamic point; verdicts over a fragment list combine by OR
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskVerdict {
    Safe,
    Risky,
}

impl RiskVerdict {
    pub fn is_risky(self) -> bool {
        self == RiskVerdict::Risky
    }

    pub fn or(self, other: RiskVerdict) -> RiskVerdict {
        if self.is_risky() || other.is_risky() {
            RiskVerdict::Risky
        } else {
            RiskVerdict::Safe
        }
    }
}

impl FromIterator<RiskVerdict> for RiskVerdict {
    fn from_iter<I: IntoIterator<Item = RiskVerdict>>(iter: I) -> Self {
        iter.into_iter().fold(RiskVerdict::Safe, RiskVerdict::or)
    }
}

/// Text window around one interpolation point
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClauseContext {
    pub prefix: String,
    /// The matched token, e.g. `${id}`
    pub token: String,
    pub suffix: Option<String>,
}

impl ClauseContext {
    /// Slice `text` around the match at `start..end`
    pub fn around(text: &str, start: usize, end: usize) -> Self {
        Self {
            prefix: text[..start].to_string(),
            token: text[start..end].to_string(),
            suffix: Some(text[end..].to_string()),
        }
    }
}

/// Classify the position right after `prefix`
pub fn classify(prefix: &str) -> RiskVerdict {
    classify_join(prefix, "", None)
}

/// Classify one interpolation point given the literal text on both sides.
///
/// `prefix` is scanned right to left for the nearest clause keyword. A
/// comparison operator right after the point means the point is the field
/// side of `where`/`set`, which is not a value position.
pub fn classify_join(prefix: &str, _var: &str, suffix: Option<&str>) -> RiskVerdict {
    let lowered = prefix.to_lowercase();
    let tokens: Vec<&str> = lowered
        .split(|c: char| c.is_whitespace() || c == '(')
        .filter(|t| !t.is_empty())
        .collect();

    if let Some(last) = tokens.last() {
        if last.trim_end_matches(['\'', '"', '%']).ends_with('=') {
            return RiskVerdict::Risky;
        }
    }

    let compares = suffix
        .map(str::trim_start)
        .is_some_and(|s| s.starts_with(['=', '>', '<']));

    for token in tokens.iter().rev() {
        if SKIPPED_KEYWORDS.contains(token) {
            continue;
        }
        if VALUE_KEYWORDS.contains(token) {
            if compares && (*token == "where" || *token == "set") {
                return RiskVerdict::Safe;
            }
            return RiskVerdict::Risky;
        }
        if IDENTIFIER_KEYWORDS.contains(token) {
            return RiskVerdict::Safe;
        }
    }
    RiskVerdict::Risky
}

/// Ordering and `having` operands, unless a `limit` trails them
fn is_ordering_operand(prefix: &str) -> bool {
    (order_or_group_by_end().is_match(prefix) && !limit_end().is_match(prefix))
        || having_end().is_match(prefix)
}

/// Prefixes that structurally precede an identifier, never a value
fn is_excluded_additive_prefix(prefix: &str) -> bool {
    if is_ordering_operand(prefix) {
        return true;
    }
    prefix.ends_with("from")
        || prefix.ends_with("join")
        || prefix.ends_with("update")
        || (prefix.starts_with("select") && !prefix.contains("from"))
        || (prefix.starts_with("update") && prefix.ends_with("set"))
        || (prefix.starts_with("insert into") && !prefix.contains("value"))
        || prefix == "("
}

/// Risk of a single additive point given the literal text preceding it
pub fn additive_point_risk(prefix: &str) -> RiskVerdict {
    let item = prefix.to_lowercase();
    let item = item.trim();
    if is_excluded_additive_prefix(item) {
        return RiskVerdict::Safe;
    }
    classify(item)
}

/// Additive scanner over a deconstructed fragment list.
///
/// Each text-carrying dynamic fragment is a risk point whose prefix is all
/// literal text seen so far, earlier dynamic points standing in as `?`.
/// Numeric and other non-text fragments only contribute the marker.
pub fn additive_risk(fragments: &[Fragment]) -> RiskVerdict {
    let mut seen = String::new();
    let mut verdict = RiskVerdict::Safe;
    for fragment in fragments {
        match fragment {
            Fragment::Constant(s) => seen.push_str(s),
            Fragment::Dynamic(expr) => {
                if expr.is_sql_care() {
                    verdict = verdict.or(additive_point_risk(&seen));
                }
                seen.push_str(DYNAMIC_MARKER);
            }
        }
    }
    verdict
}

/// Additive scanner over plain literal prefixes, one per dynamic point
pub fn additive_prefixes_risk<S: AsRef<str>>(prefixes: &[S]) -> RiskVerdict {
    prefixes
        .iter()
        .map(|p| additive_point_risk(p.as_ref()))
        .collect()
}

/// Additive scan of every placeholder in a template, each assumed to carry text.
///
/// The prefix of the n-th placeholder is all template text before it, earlier
/// placeholders standing in as `?`.
pub fn template_risk(content: &str, pattern: &Regex) -> RiskVerdict {
    let mut seen = String::new();
    split_template(content, pattern)
        .iter()
        .map(|segment| {
            seen.push_str(segment);
            let verdict = additive_point_risk(&seen);
            seen.push_str(DYNAMIC_MARKER);
            verdict
        })
        .collect()
}

/// Join-string scanner for one interpolation point
pub fn join_risk(ctx: &ClauseContext) -> RiskVerdict {
    let item = ctx.prefix.to_lowercase();
    if is_ordering_operand(item.trim()) {
        return RiskVerdict::Safe;
    }
    classify_join(&ctx.prefix, &ctx.token, ctx.suffix.as_deref())
}

/// Split `content` on `pattern`, dropping the text after the last match.
///
/// The trailing segment follows every interpolation point and so can never
/// be a prefix; it is removed when `content` ends with it.
pub fn split_template(content: &str, pattern: &Regex) -> Vec<String> {
    let mut segments: Vec<String> = pattern.split(content).map(str::to_string).collect();
    if let Some(last) = segments.last() {
        if content.ends_with(last.as_str()) {
            segments.pop();
        }
    }
    segments
}

/// Names that never reach a value position
#[derive(Debug, Clone, Default)]
pub struct IgnoreList {
    names: Vec<String>,
    prefixes: Vec<String>,
}

impl IgnoreList {
    pub fn new(names: Vec<String>, prefixes: Vec<String>) -> Self {
        Self { names, prefixes }
    }

    pub fn builtin() -> Self {
        Self::new(
            patterns::DEFAULT_IGNORED_VARS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            patterns::DEFAULT_IGNORED_VAR_PREFIXES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        )
    }

    pub fn contains(&self, var: &str) -> bool {
        self.names.iter().any(|n| n == var) || self.prefixes.iter().any(|p| var.starts_with(p))
    }
}

/// Whether a method name belongs to a logging or reporting call
pub fn is_log_method(name: &str, markers: &[String]) -> bool {
    let lowered = name.to_lowercase();
    markers.iter().any(|m| lowered.contains(m.as_str()))
}

#[cfg(test)]
mod tests;
