//! Scan pipeline
//!
//! Orchestrates one scan:
//! 1. Walk source files (`.gitignore` aware, config excludes applied)
//! 2. Parse Java files and MyBatis mappers
//! 3. Run the detectors, files in parallel
//! 4. Drop allow-listed fingerprints and record the rest with the feedback sink
//! 5. Optionally apply the fixes back to disk

use crate::config::ProjectConfig;
use crate::detectors::{Detection, DetectorEngine, SourceFile};
use crate::feedback::{FeedbackSink, VulnRecord, VulnStatus};
use crate::fingerprint::AllowList;
use crate::fixes::{apply_edits, Edit};
use crate::models::{Finding, FixStatus, ScanReport};
use crate::parsers::java::JavaFile;
use crate::parsers::mapper_xml::MapperFile;
use crate::parsers::{SourceKind, SUPPORTED_EXTENSIONS};
use anyhow::{Context, Result};
use ignore::WalkBuilder;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Per-directory ignore file honoured on top of `.gitignore`
pub const IGNORE_FILE_NAME: &str = ".sqlsentryignore";

/// Detections for one file, with the source they were computed against
#[derive(Debug)]
pub struct FileScan {
    pub path: PathBuf,
    /// Path relative to the scanned root, as shown in reports
    pub relative: PathBuf,
    pub source: String,
    pub detections: Vec<Detection>,
}

/// Everything one scan produced
#[derive(Debug, Default)]
pub struct ScanOutput {
    pub files_scanned: usize,
    /// Files with at least one detection, ordered by path
    pub files: Vec<FileScan>,
}

impl ScanOutput {
    pub fn detection_count(&self) -> usize {
        self.files.iter().map(|f| f.detections.len()).sum()
    }
}

/// Outcome of applying fixes to one file
#[derive(Debug, Clone)]
pub struct FileChange {
    pub relative: PathBuf,
    pub fixed: usize,
    pub unresolved: usize,
    pub new_source: String,
}

#[derive(Debug, Default)]
pub struct FixSummary {
    pub changes: Vec<FileChange>,
    pub fixed: usize,
    pub unresolved: usize,
}

impl FixSummary {
    pub fn files_changed(&self) -> usize {
        self.changes.len()
    }
}

pub struct Pipeline<'a> {
    root: PathBuf,
    config: &'a ProjectConfig,
    engine: DetectorEngine,
    allow_list: AllowList,
    sink: &'a dyn FeedbackSink,
    project_name: String,
    show_progress: bool,
}

impl<'a> Pipeline<'a> {
    pub fn new(root: &Path, config: &'a ProjectConfig, sink: &'a dyn FeedbackSink) -> Self {
        let project_name = root
            .canonicalize()
            .ok()
            .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
            .unwrap_or_else(|| "unknown".to_string());
        Self {
            root: root.to_path_buf(),
            config,
            engine: DetectorEngine::from_config(config),
            allow_list: config.allowlist.allow_list(),
            sink,
            project_name,
            show_progress: false,
        }
    }

    /// Show a progress bar on stderr while files are scanned
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn engine(&self) -> &DetectorEngine {
        &self.engine
    }

    /// Source files under the root, respecting ignore files and config excludes
    pub fn collect_files(&self) -> Vec<PathBuf> {
        let mut builder = WalkBuilder::new(&self.root);
        builder
            .hidden(true)
            .git_ignore(true)
            .git_global(true)
            .git_exclude(true)
            .require_git(false)
            .add_custom_ignore_filename(IGNORE_FILE_NAME);

        let mut files = Vec::new();
        for entry in builder.build().flatten() {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let supported = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|ext| SUPPORTED_EXTENSIONS.contains(&ext));
            if !supported {
                continue;
            }
            if self.config.should_exclude(self.relative(path)) {
                debug!("Excluded by config: {}", path.display());
                continue;
            }
            files.push(path.to_path_buf());
        }
        files.sort();
        files
    }

    /// Walk, parse and inspect every source file
    pub fn scan(&self) -> ScanOutput {
        let files = self.collect_files();
        info!(
            "Scanning {} files with {} detectors",
            files.len(),
            self.engine.detector_count()
        );

        let progress = if self.show_progress {
            let bar = ProgressBar::new(files.len() as u64);
            bar.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} files {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("=> "),
            );
            bar
        } else {
            ProgressBar::hidden()
        };

        let scanned: Vec<Option<FileScan>> = files
            .par_iter()
            .map(|path| {
                let result = self.scan_file(path);
                progress.inc(1);
                result
            })
            .collect();
        progress.finish_and_clear();

        let mut output = ScanOutput {
            files_scanned: files.len(),
            files: Vec::new(),
        };
        for mut file in scanned.into_iter().flatten() {
            file.detections.retain(|d| {
                let allowed = self.allow_list.allows(d.fingerprint());
                if allowed {
                    debug!(
                        "Allow-listed {} in {} ({})",
                        d.fingerprint(),
                        file.relative.display(),
                        d.fqname
                    );
                }
                !allowed
            });
            if file.detections.is_empty() {
                continue;
            }
            for detection in &file.detections {
                self.sink.record(self.vuln_record(detection));
            }
            output.files.push(file);
        }
        info!(
            "Scan complete: {} detections in {} files",
            output.detection_count(),
            output.files.len()
        );
        output
    }

    fn scan_file(&self, path: &Path) -> Option<FileScan> {
        let file = match load_source(path) {
            Ok(Some(file)) => file,
            Ok(None) => return None,
            Err(e) => {
                warn!("Skipping {}: {:#}", path.display(), e);
                return None;
            }
        };
        let detections = self.engine.run(&file);
        if detections.is_empty() {
            return None;
        }
        let source = match file {
            SourceFile::Java(java) => java.source,
            SourceFile::Mapper(mapper) => mapper.source,
        };
        Some(FileScan {
            path: path.to_path_buf(),
            relative: self.relative(path).to_path_buf(),
            source,
            detections,
        })
    }

    fn relative<'p>(&self, path: &'p Path) -> &'p Path {
        path.strip_prefix(&self.root).unwrap_or(path)
    }

    fn vuln_record(&self, detection: &Detection) -> VulnRecord {
        VulnRecord {
            project_name: self.project_name.clone(),
            fqname: detection.fqname.clone(),
            message: detection.message.clone(),
            elem_text: detection.flagged_text.clone(),
            sign: detection.fingerprint(),
            status: VulnStatus::Open,
        }
    }

    /// Report form of a scan
    pub fn findings(&self, output: &ScanOutput) -> Vec<Finding> {
        output
            .files
            .iter()
            .flat_map(|file| {
                file.detections.iter().map(|d| {
                    d.to_finding(
                        &file.relative,
                        &file.source,
                        self.engine.severity(d.detector),
                        self.engine.category(d.detector),
                    )
                })
            })
            .collect()
    }

    pub fn report(&self, output: &ScanOutput) -> ScanReport {
        ScanReport::new(self.root.clone(), output.files_scanned, self.findings(output))
    }

    /// Apply every fix of `output` and report each outcome to the feedback sink;
    /// with `dry_run` nothing is written or reported
    pub fn apply_fixes(&self, output: &ScanOutput, dry_run: bool) -> Result<FixSummary> {
        let mut summary = FixSummary::default();
        for file in &output.files {
            let edits: Vec<Edit> = file
                .detections
                .iter()
                .flat_map(|d| d.fix.edits.iter().cloned())
                .collect();
            let new_source = apply_edits(&file.source, &edits);
            let fixed = file
                .detections
                .iter()
                .filter(|d| d.fix.status == FixStatus::Fixed)
                .count();
            let unresolved = file.detections.len() - fixed;
            summary.fixed += fixed;
            summary.unresolved += unresolved;
            let changed = new_source != file.source;

            if !dry_run {
                if changed {
                    std::fs::write(&file.path, &new_source)
                        .with_context(|| format!("Failed to write {}", file.path.display()))?;
                    debug!("Rewrote {}", file.path.display());
                }
                for detection in &file.detections {
                    self.sink.resolve(detection.fingerprint(), vuln_status(detection.fix.status));
                }
            }
            if !changed {
                continue;
            }
            summary.changes.push(FileChange {
                relative: file.relative.clone(),
                fixed,
                unresolved,
                new_source,
            });
        }
        info!(
            "{} fixed, {} need manual attention, {} files changed",
            summary.fixed,
            summary.unresolved,
            summary.files_changed()
        );
        Ok(summary)
    }
}

fn vuln_status(status: FixStatus) -> VulnStatus {
    match status {
        FixStatus::Fixed => VulnStatus::Fixed,
        FixStatus::Unresolved => VulnStatus::Unresolved,
    }
}

/// Parse a file by extension; `None` for XML that is not a MyBatis mapper
pub fn load_source(path: &Path) -> Result<Option<SourceFile>> {
    match SourceKind::of(path) {
        Some(SourceKind::Java) => Ok(Some(SourceFile::Java(JavaFile::parse(path)?))),
        Some(SourceKind::Xml) => Ok(MapperFile::parse(path)?.map(SourceFile::Mapper)),
        None => Ok(None),
    }
}
