//! Stable vulnerability fingerprints and the allow-list that suppresses them

use std::collections::HashSet;
use xxhash_rust::xxh32::xxh32;

/// 32-bit signature of a flagged location and its text
pub fn fingerprint(fqname: &str, flagged_text: &str) -> u32 {
    xxh32(format!("{fqname}|{flagged_text}").as_bytes(), 0)
}

/// Fingerprints of known false positives
#[derive(Debug, Clone, Default)]
pub struct AllowList {
    known: HashSet<u32>,
}

impl AllowList {
    pub fn new(fingerprints: impl IntoIterator<Item = u32>) -> Self {
        Self {
            known: fingerprints.into_iter().collect(),
        }
    }

    pub fn allows(&self, fingerprint: u32) -> bool {
        self.known.contains(&fingerprint)
    }

    pub fn len(&self) -> usize {
        self.known.len()
    }

    pub fn is_empty(&self) -> bool {
        self.known.is_empty()
    }
}
