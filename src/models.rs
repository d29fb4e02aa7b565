//! Core data models for sqlsentry
//!
//! Findings are what the detectors report and what every reporter and the
//! feedback collaborator consume.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;
use xxhash_rust::xxh3::xxh3_64;

/// Generate a deterministic finding ID based on content hash.
///
/// The ID is a 16-character hex string derived from the detector name, the
/// file, the line and the flagged text, so the same finding keeps its ID
/// across runs.
pub fn deterministic_finding_id(detector: &str, file: &str, line: u32, flagged: &str) -> String {
    let input = format!("{detector}\n{file}\n{line}\n{flagged}");
    format!("{:016x}", xxh3_64(input.as_bytes()))
}

/// Severity levels for findings
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Info,
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Low => write!(f, "low"),
            Severity::Medium => write!(f, "medium"),
            Severity::High => write!(f, "high"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

/// Outcome of a fix for one flagged location
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FixStatus {
    /// The template was rewritten to bound parameters
    Fixed,
    /// Only an advisory comment can be offered
    Unresolved,
}

impl std::fmt::Display for FixStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FixStatus::Fixed => write!(f, "fixed"),
            FixStatus::Unresolved => write!(f, "unresolved"),
        }
    }
}

/// A SQL injection finding
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Finding {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub detector: String,
    #[serde(default)]
    pub severity: Severity,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub file: PathBuf,
    #[serde(default)]
    pub line_start: Option<u32>,
    #[serde(default)]
    pub line_end: Option<u32>,
    /// Location name the fingerprint is computed over
    #[serde(default)]
    pub fqname: String,
    #[serde(default)]
    pub flagged_text: String,
    #[serde(default)]
    pub fingerprint: u32,
    #[serde(default)]
    pub suggested_fix: Option<String>,
    #[serde(default)]
    pub fix_status: Option<FixStatus>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub cwe_id: Option<String>,
}

/// Summary of findings by severity
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FindingsSummary {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub info: usize,
    pub total: usize,
    /// Findings with an automatic rewrite available
    pub fixable: usize,
}

impl FindingsSummary {
    pub fn from_findings(findings: &[Finding]) -> Self {
        let mut summary = Self::default();
        for f in findings {
            match f.severity {
                Severity::Critical => summary.critical += 1,
                Severity::High => summary.high += 1,
                Severity::Medium => summary.medium += 1,
                Severity::Low => summary.low += 1,
                Severity::Info => summary.info += 1,
            }
            if f.fix_status == Some(FixStatus::Fixed) {
                summary.fixable += 1;
            }
            summary.total += 1;
        }
        summary
    }
}

/// Result of one scan, as the reporters render it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanReport {
    pub scan_id: String,
    /// RFC 3339 timestamp
    pub generated_at: String,
    pub root: PathBuf,
    pub files_scanned: usize,
    pub findings_summary: FindingsSummary,
    pub findings: Vec<Finding>,
}

impl ScanReport {
    pub fn new(root: PathBuf, files_scanned: usize, findings: Vec<Finding>) -> Self {
        Self {
            scan_id: Uuid::new_v4().to_string(),
            generated_at: Utc::now().to_rfc3339(),
            root,
            files_scanned,
            findings_summary: FindingsSummary::from_findings(&findings),
            findings,
        }
    }
}
