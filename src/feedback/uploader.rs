//! Background upload of finding batches

use super::{Batch, VulnRecord};
use crate::error::{ScanError, ScanResult};
use crossbeam_channel::Receiver;
use git2::Repository;
use serde::Serialize;
use std::path::Path;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, warn};

/// Where and as whom batches are posted
#[derive(Debug, Clone)]
pub struct UploadContext {
    pub endpoint: String,
    pub user: String,
    pub git_info: Option<String>,
    pub plugin_version: String,
    pub timeout_ms: u64,
}

#[derive(Debug, Serialize)]
pub struct Payload<'a> {
    pub git_info: &'a str,
    pub user: &'a str,
    pub plugin_version: &'a str,
    pub vulns: &'a [VulnRecord],
}

pub fn payload<'a>(context: &'a UploadContext, batch: &'a Batch) -> Payload<'a> {
    Payload {
        git_info: context.git_info.as_deref().unwrap_or("null"),
        user: &context.user,
        plugin_version: &context.plugin_version,
        vulns: &batch.records,
    }
}

/// Worker thread posting every batch it receives; failures are logged and dropped
pub struct Uploader {
    handle: Option<JoinHandle<()>>,
}

impl Uploader {
    /// Start the worker; it exits once every sender of `batches` is dropped
    pub fn spawn(context: UploadContext, batches: Receiver<Batch>) -> Self {
        let handle = thread::spawn(move || {
            let agent = ureq::config::Config::builder()
                .http_status_as_error(false)
                .timeout_global(Some(Duration::from_millis(context.timeout_ms)))
                .build()
                .new_agent();
            for batch in batches.iter() {
                match post(&agent, &context, &batch) {
                    Ok(status) => debug!("Posted {} findings ({})", batch.len(), status),
                    Err(e) => warn!("Feedback post failed: {}", e),
                }
            }
        });
        Self {
            handle: Some(handle),
        }
    }
}

impl Drop for Uploader {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Feedback uploader panicked");
            }
        }
    }
}

fn post(agent: &ureq::Agent, context: &UploadContext, batch: &Batch) -> ScanResult<u16> {
    let response = agent
        .post(&context.endpoint)
        .header("Content-Type", "application/json; charset=UTF-8")
        .send_json(payload(context, batch))
        .map_err(|e| ScanError::Feedback(e.to_string()))?;
    Ok(response.status().as_u16())
}

/// `origin` remote URL of the repository containing `repo_path`, if any
pub fn read_git_remote(repo_path: &Path) -> Option<String> {
    let repo = match Repository::discover(repo_path) {
        Ok(repo) => repo,
        Err(e) => {
            debug!("No git repository at {}: {}", repo_path.display(), e.message());
            return None;
        }
    };
    let remote = repo.find_remote("origin").ok()?;
    remote.url().map(str::to_string)
}
