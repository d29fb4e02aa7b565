//! Text (terminal) reporter, findings grouped by file

use crate::models::{Finding, FixStatus, ScanReport, Severity};
use anyhow::Result;
use console::style;
use std::collections::BTreeMap;
use std::path::PathBuf;

fn severity_tag(severity: Severity) -> String {
    let tag = match severity {
        Severity::Critical => "[C]",
        Severity::High => "[H]",
        Severity::Medium => "[M]",
        Severity::Low => "[L]",
        Severity::Info => "[I]",
    };
    match severity {
        Severity::Critical => style(tag).red().bold().to_string(),
        Severity::High => style(tag).red().to_string(),
        Severity::Medium => style(tag).yellow().to_string(),
        Severity::Low => style(tag).blue().to_string(),
        Severity::Info => style(tag).dim().to_string(),
    }
}

fn fix_label(finding: &Finding) -> String {
    match finding.fix_status {
        Some(FixStatus::Fixed) => style("autofix").green().to_string(),
        Some(FixStatus::Unresolved) => style("manual").yellow().to_string(),
        None => String::new(),
    }
}

pub fn render(report: &ScanReport) -> Result<String> {
    let mut out = String::new();

    out.push_str(&format!("\n{}\n", style("sqlsentry scan").bold()));
    out.push_str(&format!(
        "{}\n",
        style("──────────────────────────────────────").dim()
    ));
    out.push_str(&format!(
        "Files scanned: {}  Findings: {}  Auto-fixable: {}\n\n",
        report.files_scanned, report.findings_summary.total, report.findings_summary.fixable
    ));

    if report.findings.is_empty() {
        out.push_str(&format!("{}\n", style("No SQL injection risks found.").green()));
        return Ok(out);
    }

    let mut by_file: BTreeMap<&PathBuf, Vec<&Finding>> = BTreeMap::new();
    for finding in &report.findings {
        by_file.entry(&finding.file).or_default().push(finding);
    }

    for (file, findings) in by_file {
        out.push_str(&format!("{}\n", style(file.display()).bold().underlined()));
        for finding in findings {
            let line = finding
                .line_start
                .map(|l| l.to_string())
                .unwrap_or_else(|| "?".to_string());
            out.push_str(&format!(
                "  {:>5}  {}  {}  {}\n",
                line,
                severity_tag(finding.severity),
                finding.description,
                fix_label(finding)
            ));
            out.push_str(&format!(
                "         {} {}  {} {:08x}\n",
                style("at").dim(),
                finding.fqname,
                style("fingerprint").dim(),
                finding.fingerprint
            ));
        }
        out.push('\n');
    }

    out.push_str(&format!(
        "{}\n",
        style("Run `sqlsentry fix` to apply rewrites and advisory comments.").dim()
    ));
    Ok(out)
}
