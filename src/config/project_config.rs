//! Project-level configuration support
//!
//! Loads per-project configuration from `sqlsentry.toml` in the scanned root.
//!
//! # Configuration Format
//!
//! ```toml
//! [sqli]
//! ignored_vars = ["orderByClause", "pageStart"]
//! ignored_var_prefixes = ["ew."]
//! require_sql_shape = true
//!
//! [detectors.mybatis-xml-sqli]
//! enabled = false
//! severity = "medium"
//!
//! [allowlist]
//! fingerprints = [3735928559]
//!
//! [exclude]
//! paths = ["generated/", "**/legacy/**"]
//! ```

use crate::error::{ScanError, ScanResult};
use crate::fingerprint::AllowList;
use crate::models::Severity;
use crate::sqli::patterns::{
    DEFAULT_IGNORED_VARS, DEFAULT_IGNORED_VAR_PREFIXES, DEFAULT_LOG_METHOD_MARKERS,
};
use crate::sqli::IgnoreList;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, warn};

pub const CONFIG_FILE_NAME: &str = "sqlsentry.toml";

/// Directories never worth scanning
const BUILTIN_EXCLUDES: &[&str] = &["target/", "build/", "node_modules/", ".git/"];

/// Written by `sqlsentry init`
pub const DEFAULT_CONFIG_TOML: &str = r#"# sqlsentry project configuration

[sqli]
# Interpolated names that never reach a value position
ignored_vars = ["orderByClause", "pageStart", "pageSize", "criterion.condition", "alias"]
ignored_var_prefixes = ["ew."]
# Calls whose name contains one of these are treated as logging, not queries
log_method_markers = ["log", "trace", "debug", "info", "alarm", "warn", "error", "fatal", "ok", "succ", "fail", "print"]
# Only report concatenations that look like a full select/update/delete/insert
require_sql_shape = true

# [detectors.polyadic-sqli]
# enabled = true
# severity = "high"

[allowlist]
# Fingerprints of reviewed false positives (see `sqlsentry scan --format json`)
fingerprints = []

[exclude]
paths = []
"#;

/// Project-level configuration loaded from sqlsentry.toml
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ProjectConfig {
    #[serde(default)]
    pub sqli: SqliConfig,

    /// Per-detector configuration overrides
    #[serde(default)]
    pub detectors: HashMap<String, DetectorConfigOverride>,

    #[serde(default)]
    pub allowlist: AllowlistConfig,

    /// Path exclusion patterns
    #[serde(default)]
    pub exclude: ExcludeConfig,
}

/// Heuristic knobs shared by all inspections
#[derive(Debug, Clone, Deserialize)]
pub struct SqliConfig {
    #[serde(default = "default_ignored_vars")]
    pub ignored_vars: Vec<String>,

    #[serde(default = "default_ignored_var_prefixes")]
    pub ignored_var_prefixes: Vec<String>,

    #[serde(default = "default_log_method_markers")]
    pub log_method_markers: Vec<String>,

    #[serde(default = "default_require_sql_shape")]
    pub require_sql_shape: bool,
}

impl Default for SqliConfig {
    fn default() -> Self {
        Self {
            ignored_vars: default_ignored_vars(),
            ignored_var_prefixes: default_ignored_var_prefixes(),
            log_method_markers: default_log_method_markers(),
            require_sql_shape: default_require_sql_shape(),
        }
    }
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn default_ignored_vars() -> Vec<String> {
    owned(DEFAULT_IGNORED_VARS)
}

fn default_ignored_var_prefixes() -> Vec<String> {
    owned(DEFAULT_IGNORED_VAR_PREFIXES)
}

fn default_log_method_markers() -> Vec<String> {
    owned(DEFAULT_LOG_METHOD_MARKERS)
}

fn default_require_sql_shape() -> bool {
    true
}

impl SqliConfig {
    pub fn ignore_list(&self) -> IgnoreList {
        IgnoreList::new(self.ignored_vars.clone(), self.ignored_var_prefixes.clone())
    }
}

/// Configuration override for a specific detector
#[derive(Debug, Clone, Deserialize, Default)]
pub struct DetectorConfigOverride {
    /// Whether the detector is enabled (default: true)
    #[serde(default)]
    pub enabled: Option<bool>,

    /// Override the default severity (critical, high, medium, low, info)
    #[serde(default)]
    pub severity: Option<String>,
}

/// Reviewed false positives
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AllowlistConfig {
    #[serde(default)]
    pub fingerprints: Vec<u32>,
}

impl AllowlistConfig {
    pub fn allow_list(&self) -> AllowList {
        AllowList::new(self.fingerprints.iter().copied())
    }
}

/// Path exclusion configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ExcludeConfig {
    /// Paths/patterns to exclude from analysis
    #[serde(default)]
    pub paths: Vec<String>,
}

/// Load project configuration from the repository root.
///
/// Returns default configuration if no config file is found or it fails to
/// parse.
pub fn load_project_config(repo_path: &Path) -> ProjectConfig {
    let toml_path = repo_path.join(CONFIG_FILE_NAME);
    if toml_path.exists() {
        match load_toml_config(&toml_path) {
            Ok(config) => {
                debug!("Loaded project config from {}", toml_path.display());
                return config;
            }
            Err(e) => {
                warn!("Failed to load {}: {}", toml_path.display(), e);
            }
        }
    }

    debug!("No project config found, using defaults");
    ProjectConfig::default()
}

fn load_toml_config(path: &Path) -> ScanResult<ProjectConfig> {
    let content = std::fs::read_to_string(path)?;
    toml::from_str(&content).map_err(|e| ScanError::Parse {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

impl ProjectConfig {
    fn detector_override(&self, name: &str) -> Option<&DetectorConfigOverride> {
        let normalized = normalize_detector_name(name);
        self.detectors
            .get(&normalized)
            .or_else(|| self.detectors.get(name))
    }

    /// Check if a detector is enabled (defaults to true if not specified)
    pub fn is_detector_enabled(&self, name: &str) -> bool {
        self.detector_override(name)
            .and_then(|c| c.enabled)
            .unwrap_or(true)
    }

    /// Severity override for a detector; unknown names are ignored with a warning
    pub fn severity_override(&self, name: &str) -> Option<Severity> {
        let raw = self.detector_override(name)?.severity.as_deref()?;
        let severity = match raw.to_lowercase().as_str() {
            "critical" => Severity::Critical,
            "high" => Severity::High,
            "medium" => Severity::Medium,
            "low" => Severity::Low,
            "info" => Severity::Info,
            other => {
                warn!("Unknown severity '{}' for detector {}", other, name);
                return None;
            }
        };
        Some(severity)
    }

    /// Check if a path (relative to the scanned root) should be excluded
    pub fn should_exclude(&self, path: &Path) -> bool {
        let path_str = path.to_string_lossy().replace('\\', "/");

        BUILTIN_EXCLUDES
            .iter()
            .any(|dir| path_str.starts_with(dir) || path_str.contains(&format!("/{dir}")))
            || self
                .exclude
                .paths
                .iter()
                .any(|pattern| glob_match(pattern, &path_str))
    }
}

/// Normalize detector name for config lookup
/// Converts various formats to kebab-case for matching
pub fn normalize_detector_name(name: &str) -> String {
    // PolyadicSqliDetector -> polyadic-sqli
    // polyadic_sqli -> polyadic-sqli
    let mut result = String::new();
    let chars: Vec<char> = name.chars().collect();

    for (i, c) in chars.iter().enumerate() {
        if c.is_uppercase() {
            let prev_is_lower = i > 0 && chars[i - 1].is_lowercase();
            let is_acronym_end = i > 0
                && chars[i - 1].is_uppercase()
                && i + 1 < chars.len()
                && chars[i + 1].is_lowercase();

            if prev_is_lower || is_acronym_end {
                result.push('-');
            }
            result.extend(c.to_lowercase());
        } else if *c == '_' {
            result.push('-');
        } else {
            result.push(*c);
        }
    }

    result.trim_end_matches("-detector").to_string()
}

/// Simple glob pattern matching
fn glob_match(pattern: &str, path: &str) -> bool {
    // **/X/** matches X as any directory
    if pattern.starts_with("**/") && pattern.ends_with("/**") {
        let middle = pattern.trim_start_matches("**/").trim_end_matches("/**");
        return path.contains(&format!("/{}/", middle))
            || path.starts_with(&format!("{}/", middle));
    }

    if pattern.contains("**") {
        let parts: Vec<&str> = pattern.split("**").collect();
        if parts.len() == 2 {
            let prefix = parts[0].trim_end_matches('/');
            let suffix = parts[1].trim_start_matches('/');

            if !prefix.is_empty() && !path.starts_with(prefix) {
                return false;
            }
            if !suffix.is_empty() && !path.ends_with(suffix) {
                return false;
            }
            return true;
        }
    }

    if pattern.contains('*') {
        let parts: Vec<&str> = pattern.split('*').collect();
        if parts.len() == 2 {
            return path.starts_with(parts[0]) && path.ends_with(parts[1]);
        }
    }

    path.starts_with(pattern)
}

#[cfg(test)]
mod tests;
