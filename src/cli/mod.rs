//! CLI command definitions and handlers

mod fix;
mod init;
mod scan;

use crate::config::UserConfig;
use crate::reporters::OutputFormat;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::warn;

/// sqlsentry - SQL injection scanner and autofixer
#[derive(Parser, Debug)]
#[command(name = "sqlsentry")]
#[command(
    version,
    about = "Find and fix SQL injection in Java string-built queries and MyBatis mappers",
    after_help = "\
Examples:
  sqlsentry scan .                        Scan current directory
  sqlsentry scan . --format json          JSON output for scripting
  sqlsentry scan . --fail-on-findings     Exit code 1 when anything is found (CI mode)
  sqlsentry fix . --dry-run               Show which files a fix would change
  sqlsentry init                          Write a default sqlsentry.toml"
)]
pub struct Cli {
    /// Path to repository (default: current directory)
    #[arg(global = true, default_value = ".")]
    pub path: PathBuf,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "warn", value_parser = ["error", "warn", "info", "debug", "trace"])]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scan for SQL injection risks
    Scan {
        /// Output format: text or json
        #[arg(long, short = 'f', default_value = "text", value_parser = ["text", "json"])]
        format: String,

        /// Output file path (default: stdout)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Exit with code 1 when anything is reported
        #[arg(long)]
        fail_on_findings: bool,
    },

    /// Rewrite risky templates and add advisory comments where a rewrite is not possible
    Fix {
        /// Report what would change without writing
        #[arg(long)]
        dry_run: bool,
    },

    /// Write a sqlsentry.toml with the default settings
    Init,
}

pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Scan {
            format,
            output,
            fail_on_findings,
        } => {
            let format: OutputFormat = format.parse()?;
            let found = scan::run(&cli.path, format, output.as_deref())?;
            if fail_on_findings && found > 0 {
                std::process::exit(1);
            }
            Ok(())
        }
        Commands::Fix { dry_run } => fix::run(&cli.path, dry_run),
        Commands::Init => init::run(&cli.path),
    }
}

/// Canonical directory to work on
fn repo_root(path: &Path) -> Result<PathBuf> {
    let repo_path = path
        .canonicalize()
        .with_context(|| format!("Path does not exist: {}", path.display()))?;
    if !repo_path.is_dir() {
        anyhow::bail!("Path is not a directory: {}", repo_path.display());
    }
    Ok(repo_path)
}

fn load_user_config() -> UserConfig {
    UserConfig::load().unwrap_or_else(|e| {
        warn!("Ignoring user config: {:#}", e);
        UserConfig::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_scan_args() {
        let cli = Cli::parse_from(["sqlsentry", "scan", "repo", "--format", "json", "--fail-on-findings"]);
        assert_eq!(cli.path, PathBuf::from("repo"));
        match cli.command {
            Commands::Scan {
                format,
                output,
                fail_on_findings,
            } => {
                assert_eq!(format, "json");
                assert!(output.is_none());
                assert!(fail_on_findings);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_fix_defaults() {
        let cli = Cli::parse_from(["sqlsentry", "fix", "--dry-run"]);
        assert_eq!(cli.path, PathBuf::from("."));
        assert_eq!(cli.log_level, "warn");
        assert!(matches!(cli.command, Commands::Fix { dry_run: true }));
    }

    #[test]
    fn test_rejects_unknown_format() {
        assert!(Cli::try_parse_from(["sqlsentry", "scan", "--format", "sarif"]).is_err());
    }
}
