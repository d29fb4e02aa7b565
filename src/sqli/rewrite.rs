//! Template rewriting from `${var}` interpolation to bound parameters.
//!
//! The rewriter threads `(text, offset)` through the template: find the
//! next interpolation at or after `offset`, classify it, and either skip
//! it or apply one [`FixPlan`], which yields the new text and the offset
//! to resume scanning from. Every plan rebalances whatever quotes or
//! parentheses it strips, so an abandoned point leaves the text untouched.

use super::patterns::{decode_xml_entities, dollar_var, like_end, where_in_end};
use super::{join_risk, ClauseContext, IgnoreList, RiskVerdict};
use tracing::debug;

/// Strategy chosen for one interpolation point
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FixPlan {
    /// `'${id}'` becomes `#{id}`
    DirectPlaceholder { text: String, resume: usize },
    /// `like '%${name}%'` becomes `like CONCAT('%', #{name}, '%')`
    LikeWrap { text: String, resume: usize },
    /// `in (${ids})` becomes a `<foreach>` block over the collection
    WhereInForeach { text: String, resume: usize },
}

impl FixPlan {
    pub fn text(&self) -> &str {
        match self {
            FixPlan::DirectPlaceholder { text, .. }
            | FixPlan::LikeWrap { text, .. }
            | FixPlan::WhereInForeach { text, .. } => text,
        }
    }

    pub fn resume(&self) -> usize {
        match self {
            FixPlan::DirectPlaceholder { resume, .. }
            | FixPlan::LikeWrap { resume, .. }
            | FixPlan::WhereInForeach { resume, .. } => *resume,
        }
    }

    fn into_parts(self) -> (String, usize) {
        match self {
            FixPlan::DirectPlaceholder { text, resume }
            | FixPlan::LikeWrap { text, resume }
            | FixPlan::WhereInForeach { text, resume } => (text, resume),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RewriteOptions {
    /// Allow `<foreach>` synthesis; only dynamic SQL templates understand it
    pub foreach: bool,
    /// Text is XML content: classify `&lt;`, `&gt;` and friends as the characters they encode
    pub xml_entities: bool,
}

impl RewriteOptions {
    /// Options for XML-parsed template text
    pub fn xml(foreach: bool) -> Self {
        Self {
            foreach,
            xml_entities: true,
        }
    }
}

/// Outcome of a full rewriting pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewrite {
    pub text: String,
    /// No risky interpolation is left in `text`
    pub complete: bool,
}

/// One step of the scan loop
enum Step {
    Skip(usize),
    Apply(FixPlan),
}

#[derive(Debug, Clone, Default)]
pub struct Rewriter {
    ignore: IgnoreList,
    options: RewriteOptions,
}

impl Rewriter {
    pub fn new(ignore: IgnoreList, options: RewriteOptions) -> Self {
        Self { ignore, options }
    }

    /// Rewrite every risky interpolation at or after `scan_from`
    pub fn rewrite(&self, text: String, scan_from: usize) -> String {
        let mut text = text;
        let mut offset = scan_from;
        while offset <= text.len() {
            let Some(caps) = dollar_var().captures_at(&text, offset) else {
                break;
            };
            let (Some(whole), Some(var)) = (caps.get(0), caps.get(1)) else {
                break;
            };
            match self.step(&text, whole.start(), whole.end(), var.as_str()) {
                Step::Skip(next) => offset = next,
                Step::Apply(plan) => {
                    debug!("Applying {} at offset {}", plan_name(&plan), whole.start());
                    let (next_text, resume) = plan.into_parts();
                    text = next_text;
                    offset = resume;
                }
            }
        }
        text
    }

    /// Rewrite the whole template and report whether anything risky remains
    pub fn fix(&self, text: &str) -> Rewrite {
        let rewritten = self.rewrite(text.to_string(), 0);
        let complete = !self.remaining_risk(&rewritten).is_risky();
        Rewrite {
            text: rewritten,
            complete,
        }
    }

    /// Join-string scan of every interpolation in `text`
    pub fn remaining_risk(&self, text: &str) -> RiskVerdict {
        dollar_var()
            .captures_iter(text)
            .filter_map(|caps| Some((caps.get(0)?, caps.get(1)?)))
            .filter(|(_, var)| !self.ignore.contains(var.as_str()))
            .map(|(whole, _)| join_risk(&self.context(text, whole.start(), whole.end())))
            .collect()
    }

    /// Clause window around `start..end`, entity-decoded for XML text.
    ///
    /// Entities never straddle a `${}` token, so decoding each side on its
    /// own matches decoding the whole text.
    fn context(&self, text: &str, start: usize, end: usize) -> ClauseContext {
        let ctx = ClauseContext::around(text, start, end);
        if !self.options.xml_entities {
            return ctx;
        }
        ClauseContext {
            prefix: decode_xml_entities(&ctx.prefix).into_owned(),
            suffix: ctx.suffix.as_deref().map(|s| decode_xml_entities(s).into_owned()),
            token: ctx.token,
        }
    }

    /// Choose a plan for the interpolation at `start..end`
    pub fn plan(&self, text: &str, start: usize, end: usize, var: &str) -> Option<FixPlan> {
        match self.step(text, start, end, var) {
            Step::Apply(plan) => Some(plan),
            Step::Skip(_) => None,
        }
    }

    fn step(&self, text: &str, start: usize, end: usize, var: &str) -> Step {
        if self.ignore.contains(var) {
            return Step::Skip(end);
        }
        if !join_risk(&self.context(text, start, end)).is_risky() {
            return Step::Skip(end);
        }

        let prefix = &text[..start];
        let suffix = &text[end..];

        if where_in_end().is_match(prefix) {
            if !self.options.foreach {
                return Step::Skip(end);
            }
            return Step::Apply(where_in_foreach(prefix, suffix, var));
        }
        if like_end().is_match(prefix) {
            return match like_wrap(prefix, suffix, var) {
                Some(plan) => Step::Apply(plan),
                None => Step::Skip(end),
            };
        }
        Step::Apply(direct_placeholder(prefix, suffix, var))
    }
}

fn plan_name(plan: &FixPlan) -> &'static str {
    match plan {
        FixPlan::DirectPlaceholder { .. } => "DirectPlaceholder",
        FixPlan::LikeWrap { .. } => "LikeWrap",
        FixPlan::WhereInForeach { .. } => "WhereInForeach",
    }
}

/// `ids,jdbcType=ARRAY` names the collection `ids`
fn collection_name(var: &str) -> &str {
    var.split(',').next().unwrap_or(var).trim()
}

/// Quote spellings that may wrap an interpolation
const QUOTES: &[&str] = &["'", "\"", "&apos;", "&quot;"];

/// Drop `open` ending `prefix` together with `close` starting `suffix`
fn strip_pair<'t>(prefix: &'t str, suffix: &'t str, open: &str, close: &str) -> Option<(&'t str, &'t str)> {
    let prefix = prefix.trim_end().strip_suffix(open)?;
    let suffix = suffix.trim_start().strip_prefix(close)?;
    Some((prefix, suffix))
}

fn strip_quotes<'t>(prefix: &'t str, suffix: &'t str) -> Option<(&'t str, &'t str)> {
    QUOTES.iter().find_map(|q| strip_pair(prefix, suffix, q, q))
}

fn where_in_foreach(prefix: &str, suffix: &str, var: &str) -> FixPlan {
    let (prefix, suffix) = strip_quotes(prefix, suffix).unwrap_or((prefix, suffix));
    let (prefix, suffix) = strip_pair(prefix, suffix, "(", ")").unwrap_or((prefix, suffix));

    let collection = collection_name(var);
    let item = format!(
        "{}Item",
        collection.rsplit('.').next().unwrap_or(collection)
    );
    let block = format!(
        "<foreach collection=\"{collection}\" item=\"{item}\" open=\"(\" separator=\",\" close=\")\">\n#{{{item}}}\n</foreach>"
    );

    let head = format!("{prefix}\n{block}\n");
    let resume = head.len();
    FixPlan::WhereInForeach {
        text: format!("{head}{suffix}"),
        resume,
    }
}

fn like_wrap(prefix: &str, suffix: &str, var: &str) -> Option<FixPlan> {
    let (body, leading_wildcard) = match prefix.strip_suffix('%') {
        Some(body) => (body, true),
        None => (prefix, false),
    };
    let quote = body.chars().last().filter(|c| *c == '\'' || *c == '"')?;
    let body = &body[..body.len() - quote.len_utf8()];

    let (rest, trailing_wildcard) = match suffix.strip_prefix('%') {
        Some(rest) => (rest, true),
        None => (suffix, false),
    };
    // the closing quote must match, otherwise stripping would unbalance the text
    let rest = rest.strip_prefix(quote)?;
    let rest = rest.trim_start_matches([' ', '\t']);

    let head = body.trim_end();
    let mut args = Vec::with_capacity(3);
    if leading_wildcard {
        args.push("'%'".to_string());
    }
    args.push(format!("#{{{var}}}"));
    if trailing_wildcard {
        args.push("'%'".to_string());
    }
    let wrapped = if args.len() == 1 {
        format!(" {} ", args[0])
    } else {
        format!(" CONCAT({}) ", args.join(", "))
    };

    Some(FixPlan::LikeWrap {
        text: format!("{head}{wrapped}{rest}"),
        resume: head.len() + wrapped.len(),
    })
}

fn direct_placeholder(prefix: &str, suffix: &str, var: &str) -> FixPlan {
    let (prefix, suffix) = strip_quotes(prefix, suffix).unwrap_or((prefix, suffix));
    let placeholder = format!("#{{{var}}}");
    FixPlan::DirectPlaceholder {
        text: format!("{prefix}{placeholder}{suffix}"),
        resume: prefix.len() + placeholder.len(),
    }
}
