//! JSON reporter
//!
//! Outputs the full ScanReport as pretty-printed JSON for piping to jq or CI.

use crate::models::ScanReport;
use anyhow::Result;

pub fn render(report: &ScanReport) -> Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}
