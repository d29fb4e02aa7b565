//! Finding feedback collaborator
//!
//! Flagged locations are recorded by fingerprint and handed to a background
//! uploader in batches. The scanning core only sees the [`FeedbackSink`]
//! trait; it never waits on the network.

pub mod uploader;

pub use uploader::{read_git_remote, UploadContext, Uploader};

use crate::config::UserConfig;
use crossbeam_channel::{unbounded, Sender};
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info};

/// Lifecycle of a recorded vulnerability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VulnStatus {
    Open,
    Fixed,
    /// A fix was attempted but left the finding for manual attention
    Unresolved,
}

/// One flagged location as reported upstream
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VulnRecord {
    pub project_name: String,
    pub fqname: String,
    pub message: String,
    pub elem_text: String,
    pub sign: u32,
    pub status: VulnStatus,
}

/// Records drained from a store in one go
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Batch {
    pub records: Vec<VulnRecord>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Receiver of findings and fix outcomes
pub trait FeedbackSink: Send + Sync {
    /// Record a finding; a known fingerprint is ignored
    fn record(&self, record: VulnRecord);

    /// Report the outcome of a fix attempt on a recorded finding, even one
    /// already handed off in an earlier batch
    fn resolve(&self, sign: u32, status: VulnStatus);

    /// Drain everything recorded so far
    fn flush(&self) -> Batch;
}

#[derive(Debug, Default)]
struct Ledger {
    /// Waiting for the next batch
    pending: HashMap<u32, VulnRecord>,
    /// Every fingerprint recorded this session, as first seen
    seen: HashMap<u32, VulnRecord>,
}

impl Ledger {
    /// Queue `record`, draining the pending set first once it is over `threshold`
    fn enqueue(&mut self, record: VulnRecord, threshold: usize) -> Option<HashMap<u32, VulnRecord>> {
        let overflow = if self.pending.len() > threshold {
            Some(std::mem::take(&mut self.pending))
        } else {
            None
        };
        self.pending.insert(record.sign, record);
        overflow
    }
}

/// In-memory sink keyed by fingerprint
#[derive(Debug)]
pub struct FeedbackStore {
    ledger: Mutex<Ledger>,
    batch_threshold: usize,
    outbox: Option<Sender<Batch>>,
}

impl FeedbackStore {
    pub fn new(batch_threshold: usize) -> Self {
        Self {
            ledger: Mutex::new(Ledger::default()),
            batch_threshold,
            outbox: None,
        }
    }

    /// Send batches drained by the threshold or by [`FeedbackStore::dispatch`] here
    pub fn with_outbox(mut self, outbox: Sender<Batch>) -> Self {
        self.outbox = Some(outbox);
        self
    }

    /// Records waiting for the next batch
    pub fn len(&self) -> usize {
        self.lock().pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().pending.is_empty()
    }

    /// Flush and hand the batch to the outbox, if any
    pub fn dispatch(&self) {
        let batch = self.flush();
        self.send(batch);
    }

    fn send(&self, batch: Batch) {
        if batch.is_empty() {
            return;
        }
        match &self.outbox {
            Some(outbox) => {
                if outbox.send(batch).is_err() {
                    debug!("Feedback uploader is gone; batch dropped");
                }
            }
            None => debug!("No feedback endpoint; dropping {} records", batch.len()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Ledger> {
        self.ledger.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl FeedbackSink for FeedbackStore {
    fn record(&self, record: VulnRecord) {
        let overflow = {
            let mut ledger = self.lock();
            if ledger.seen.contains_key(&record.sign) {
                return;
            }
            debug!(
                "Recording finding fqname:[{}] sign:[{}]",
                record.fqname, record.sign
            );
            ledger.seen.insert(record.sign, record.clone());
            ledger.enqueue(record, self.batch_threshold)
        };
        if let Some(drained) = overflow {
            self.send(into_batch(drained));
        }
    }

    fn resolve(&self, sign: u32, status: VulnStatus) {
        let overflow = {
            let mut ledger = self.lock();
            if let Some(record) = ledger.pending.get_mut(&sign) {
                record.status = status;
                return;
            }
            // already sent as open; queue the new status on its own
            let Some(mut record) = ledger.seen.get(&sign).cloned() else {
                debug!("Ignoring status for unknown sign:[{}]", sign);
                return;
            };
            record.status = status;
            ledger.enqueue(record, self.batch_threshold)
        };
        if let Some(drained) = overflow {
            self.send(into_batch(drained));
        }
    }

    fn flush(&self) -> Batch {
        let drained = std::mem::take(&mut self.lock().pending);
        into_batch(drained)
    }
}

fn into_batch(records: HashMap<u32, VulnRecord>) -> Batch {
    let mut records: Vec<VulnRecord> = records.into_values().collect();
    records.sort_by_key(|r| r.sign);
    Batch { records }
}

/// A store wired to a background uploader when an endpoint is configured
pub struct FeedbackService {
    // dropped before the uploader so the channel closes before the join
    store: FeedbackStore,
    uploader: Option<Uploader>,
}

impl FeedbackService {
    pub fn new(user_config: &UserConfig, repo_path: &Path) -> Self {
        let threshold = user_config.batch_threshold();
        let Some(endpoint) = user_config.feedback_endpoint() else {
            return Self::disabled(threshold);
        };
        info!("Feedback enabled, posting to {}", endpoint);
        let context = UploadContext {
            endpoint: endpoint.to_string(),
            user: user_config.feedback_user(),
            git_info: read_git_remote(repo_path),
            plugin_version: env!("CARGO_PKG_VERSION").to_string(),
            timeout_ms: user_config.timeout_ms(),
        };
        let (tx, rx) = unbounded();
        Self {
            store: FeedbackStore::new(threshold).with_outbox(tx),
            uploader: Some(Uploader::spawn(context, rx)),
        }
    }

    pub fn disabled(batch_threshold: usize) -> Self {
        Self {
            store: FeedbackStore::new(batch_threshold),
            uploader: None,
        }
    }

    pub fn sink(&self) -> &dyn FeedbackSink {
        &self.store
    }

    pub fn is_uploading(&self) -> bool {
        self.uploader.is_some()
    }
}

impl Drop for FeedbackService {
    fn drop(&mut self) {
        // last batch goes out on shutdown
        self.store.dispatch();
    }
}
