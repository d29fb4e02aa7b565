//! Fix command
//!
//! Applies every rewrite the detectors produced and inserts the advisory
//! comment where only manual attention helps.

use super::{load_user_config, repo_root};
use crate::config::load_project_config;
use crate::feedback::FeedbackService;
use crate::pipeline::{FixSummary, Pipeline};
use anyhow::Result;
use console::{style, Term};
use std::path::Path;

pub fn run(path: &Path, dry_run: bool) -> Result<()> {
    let repo_path = repo_root(path)?;
    let config = load_project_config(&repo_path);
    let user_config = load_user_config();
    let feedback = FeedbackService::new(&user_config, &repo_path);

    let pipeline = Pipeline::new(&repo_path, &config, feedback.sink())
        .with_progress(Term::stderr().is_term());
    let scan = pipeline.scan();
    let summary = pipeline.apply_fixes(&scan, dry_run)?;

    print_summary(&summary, dry_run);
    Ok(())
}

fn print_summary(summary: &FixSummary, dry_run: bool) {
    if summary.changes.is_empty() {
        println!("{} Nothing to fix", style("✓").green());
        return;
    }

    let verb = if dry_run { "Would change" } else { "Changed" };
    for change in &summary.changes {
        println!(
            "{} {}  {} rewritten, {} advisory",
            style(verb).bold(),
            style(change.relative.display()).cyan(),
            style(change.fixed).green(),
            style(change.unresolved).yellow()
        );
    }
    println!(
        "\n{} fixed, {} need manual attention across {} file(s)",
        style(summary.fixed).green().bold(),
        style(summary.unresolved).yellow().bold(),
        summary.files_changed()
    );
    if dry_run {
        println!("{}", style("Dry run: no files were written.").dim());
    }
}
