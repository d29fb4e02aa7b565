//! Scan command

use super::{load_user_config, repo_root};
use crate::config::load_project_config;
use crate::feedback::FeedbackService;
use crate::pipeline::Pipeline;
use crate::reporters::{render, OutputFormat};
use anyhow::{Context, Result};
use console::{style, Term};
use std::path::Path;

/// Run the scan command; returns the number of findings reported
pub fn run(path: &Path, format: OutputFormat, output: Option<&Path>) -> Result<usize> {
    let repo_path = repo_root(path)?;
    let config = load_project_config(&repo_path);
    let user_config = load_user_config();
    let feedback = FeedbackService::new(&user_config, &repo_path);

    let pipeline = Pipeline::new(&repo_path, &config, feedback.sink())
        .with_progress(Term::stderr().is_term());
    let scan = pipeline.scan();
    let report = pipeline.report(&scan);
    let rendered = render(&report, format)?;

    match output {
        Some(out) => {
            std::fs::write(out, &rendered)
                .with_context(|| format!("Failed to write report to {}", out.display()))?;
            eprintln!(
                "{} Report written to {}",
                style("✓").green(),
                style(out.display()).cyan()
            );
        }
        None => print!("{rendered}"),
    }

    Ok(report.findings_summary.total)
}
