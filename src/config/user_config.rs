//! User-level configuration for sqlsentry
//!
//! Supports loading config from:
//! - Environment variables
//! - ~/.config/sqlsentry/config.toml

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_TIMEOUT_MS: u64 = 2000;
pub const DEFAULT_BATCH_THRESHOLD: usize = 30;

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct UserConfig {
    #[serde(default)]
    pub feedback: FeedbackConfig,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FeedbackConfig {
    /// Endpoint receiving finding batches; feedback is off when unset
    pub endpoint: Option<String>,

    /// Reported as the `user` of each batch
    pub user: Option<String>,

    /// Upload timeout in milliseconds (default: 2000)
    pub timeout_ms: Option<u64>,

    /// Records held before a batch is flushed (default: 30)
    pub batch_threshold: Option<usize>,
}

impl UserConfig {
    /// Load config from all sources, with priority:
    /// 1. Environment variables (highest)
    /// 2. User config (~/.config/sqlsentry/config.toml)
    pub fn load() -> Result<Self> {
        let mut config = UserConfig::default();

        if let Some(user_config) = Self::user_config_path()
            .filter(|p| p.exists())
            .and_then(|p| std::fs::read_to_string(&p).ok())
            .and_then(|content| toml::from_str::<UserConfig>(&content).ok())
        {
            config.merge(user_config);
        }

        if let Ok(url) = std::env::var("SQLSENTRY_FEEDBACK_URL") {
            config.feedback.endpoint = Some(url);
        }
        if let Ok(user) = std::env::var("SQLSENTRY_USER") {
            config.feedback.user = Some(user);
        }

        Ok(config)
    }

    /// Get the user config file path
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("sqlsentry").join("config.toml"))
    }

    /// Merge another config into this one (other takes priority)
    fn merge(&mut self, other: UserConfig) {
        if other.feedback.endpoint.is_some() {
            self.feedback.endpoint = other.feedback.endpoint;
        }
        if other.feedback.user.is_some() {
            self.feedback.user = other.feedback.user;
        }
        if other.feedback.timeout_ms.is_some() {
            self.feedback.timeout_ms = other.feedback.timeout_ms;
        }
        if other.feedback.batch_threshold.is_some() {
            self.feedback.batch_threshold = other.feedback.batch_threshold;
        }
    }

    pub fn feedback_endpoint(&self) -> Option<&str> {
        self.feedback
            .endpoint
            .as_deref()
            .filter(|url| !url.trim().is_empty())
    }

    /// Configured user, else the login name from the environment
    pub fn feedback_user(&self) -> String {
        self.feedback
            .user
            .clone()
            .or_else(|| std::env::var("USER").ok())
            .or_else(|| std::env::var("USERNAME").ok())
            .unwrap_or_else(|| "unknown".to_string())
    }

    pub fn timeout_ms(&self) -> u64 {
        self.feedback.timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS)
    }

    pub fn batch_threshold(&self) -> usize {
        self.feedback
            .batch_threshold
            .unwrap_or(DEFAULT_BATCH_THRESHOLD)
    }
}
