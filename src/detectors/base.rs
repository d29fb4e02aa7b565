//! Base detector trait and types
//!
//! This module defines the core abstractions for the SQL injection
//! inspections:
//! - `Detector` trait that all inspections implement
//! - `SourceFile`, the parsed input a detector runs over
//! - `Detection`, one flagged location with its fix

use crate::config::SqliConfig;
use crate::expr::Span;
use crate::fingerprint::fingerprint;
use crate::fixes::Fix;
use crate::models::{deterministic_finding_id, Finding, Severity};
use crate::parsers::java::JavaFile;
use crate::parsers::line_of;
use crate::parsers::mapper_xml::MapperFile;
use crate::sqli::{is_log_method, IgnoreList};
use std::path::Path;

/// CWE-89: Improper Neutralization of Special Elements used in an SQL Command
pub const SQL_INJECTION_CWE: &str = "CWE-89";

/// A parsed input file
#[derive(Debug)]
pub enum SourceFile {
    Java(JavaFile),
    Mapper(MapperFile),
}

impl SourceFile {
    pub fn path(&self) -> &Path {
        match self {
            SourceFile::Java(f) => &f.path,
            SourceFile::Mapper(f) => &f.path,
        }
    }

    pub fn source(&self) -> &str {
        match self {
            SourceFile::Java(f) => &f.source,
            SourceFile::Mapper(f) => &f.source,
        }
    }
}

/// Settings every detector consults
#[derive(Debug, Clone)]
pub struct DetectorContext {
    pub ignore: IgnoreList,
    pub log_markers: Vec<String>,
    /// Only report concatenations shaped like a filtered statement
    pub require_sql_shape: bool,
}

impl DetectorContext {
    pub fn from_config(config: &SqliConfig) -> Self {
        Self {
            ignore: config.ignore_list(),
            log_markers: config.log_method_markers.clone(),
            require_sql_shape: config.require_sql_shape,
        }
    }

    pub fn is_log_method(&self, name: &str) -> bool {
        is_log_method(name, &self.log_markers)
    }
}

impl Default for DetectorContext {
    fn default() -> Self {
        Self::from_config(&SqliConfig::default())
    }
}

/// One flagged location
#[derive(Debug, Clone)]
pub struct Detection {
    pub detector: &'static str,
    pub message: String,
    pub span: Span,
    pub flagged_text: String,
    pub fqname: String,
    pub fix: Fix,
}

impl Detection {
    pub fn fingerprint(&self) -> u32 {
        fingerprint(&self.fqname, &self.flagged_text)
    }

    /// Report form of this detection; `file` is the path shown to users
    pub fn to_finding(&self, file: &Path, source: &str, severity: Severity, category: &str) -> Finding {
        let line_start = line_of(source, self.span.start);
        let line_end = line_of(source, self.span.end);
        let file_str = file.to_string_lossy();
        Finding {
            id: deterministic_finding_id(self.detector, &file_str, line_start, &self.flagged_text),
            detector: self.detector.to_string(),
            severity,
            title: "Possible SQL injection".to_string(),
            description: self.message.clone(),
            file: file.to_path_buf(),
            line_start: Some(line_start),
            line_end: Some(line_end),
            fqname: self.fqname.clone(),
            flagged_text: self.flagged_text.clone(),
            fingerprint: self.fingerprint(),
            suggested_fix: Some(self.fix.describe()),
            fix_status: Some(self.fix.status),
            category: Some(category.to_string()),
            cwe_id: Some(SQL_INJECTION_CWE.to_string()),
        }
    }
}

/// Trait for all SQL injection inspections
///
/// # Example Implementation
///
/// ```ignore
/// pub struct MyDetector;
///
/// impl Detector for MyDetector {
///     fn name(&self) -> &'static str {
///         "my-sqli"
///     }
///
///     fn description(&self) -> &'static str {
///         "Detects my specific query shape"
///     }
///
///     fn detect(&self, file: &SourceFile, ctx: &DetectorContext) -> Vec<Detection> {
///         vec![]
///     }
/// }
/// ```
pub trait Detector: Send + Sync {
    /// Unique kebab-case identifier, also the config key
    fn name(&self) -> &'static str;

    /// Human-readable description of what this detector finds
    fn description(&self) -> &'static str;

    /// Flag every risky location in `file`.
    ///
    /// Files of a kind the detector does not handle yield nothing.
    fn detect(&self, file: &SourceFile, ctx: &DetectorContext) -> Vec<Detection>;

    /// Category of issues this detector finds
    fn category(&self) -> &'static str {
        "security"
    }

    /// Severity used unless the project config overrides it
    fn default_severity(&self) -> Severity {
        Severity::High
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixes::{Edit, Fix};
    use crate::models::FixStatus;

    #[test]
    fn test_detection_to_finding() {
        let source = "class A {\n  String q = \"select\" + x;\n}\n";
        let start = source.find("\"select\"").unwrap();
        let detection = Detection {
            detector: "polyadic-sqli",
            message: "SQL built by string concatenation".to_string(),
            span: Span::new(start, start + 12),
            flagged_text: "\"select\" + x".to_string(),
            fqname: "A q".to_string(),
            fix: Fix::advisory(Some(Edit::insert(10, "// x\n"))),
        };
        let finding =
            detection.to_finding(Path::new("src/A.java"), source, Severity::High, "security");
        assert_eq!(finding.line_start, Some(2));
        assert_eq!(finding.fingerprint, fingerprint("A q", "\"select\" + x"));
        assert_eq!(finding.fix_status, Some(FixStatus::Unresolved));
        assert_eq!(finding.cwe_id.as_deref(), Some("CWE-89"));
        assert_eq!(finding.category.as_deref(), Some("security"));
        assert_eq!(finding.id.len(), 16);
    }

    #[test]
    fn test_context_defaults() {
        let ctx = DetectorContext::default();
        assert!(ctx.require_sql_shape);
        assert!(ctx.is_log_method("logger.info".rsplit('.').next().unwrap()));
        assert!(ctx.ignore.contains("pageSize"));
    }
}
