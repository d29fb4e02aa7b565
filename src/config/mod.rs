//! Configuration module for sqlsentry
//!
//! This module handles:
//! - Project-level configuration (sqlsentry.toml)
//! - Detector enablement and severity overrides
//! - User-level feedback collaborator settings

mod project_config;
pub mod user_config;

pub use project_config::{
    load_project_config, normalize_detector_name, AllowlistConfig, DetectorConfigOverride,
    ExcludeConfig, ProjectConfig, SqliConfig, CONFIG_FILE_NAME, DEFAULT_CONFIG_TOML,
};
pub use user_config::{FeedbackConfig, UserConfig};
