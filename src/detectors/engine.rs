//! Detector execution engine
//!
//! Runs every registered detector over one parsed file. Files are scanned
//! in parallel by the pipeline; within a file detectors run in turn, each
//! isolated with `catch_unwind` so one failing inspection does not take
//! the others down.

use crate::config::ProjectConfig;
use crate::detectors::base::{Detection, Detector, DetectorContext, SourceFile};
use crate::models::Severity;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error};

/// Orchestrates the inspections for a scan
pub struct DetectorEngine {
    detectors: Vec<Arc<dyn Detector>>,
    context: DetectorContext,
    severities: HashMap<&'static str, Severity>,
    categories: HashMap<&'static str, &'static str>,
}

impl DetectorEngine {
    pub fn new(context: DetectorContext) -> Self {
        Self {
            detectors: Vec::new(),
            context,
            severities: HashMap::new(),
            categories: HashMap::new(),
        }
    }

    /// Engine with the enabled default detectors and config overrides applied
    pub fn from_config(config: &ProjectConfig) -> Self {
        let mut engine = Self::new(DetectorContext::from_config(&config.sqli));
        for detector in super::default_detectors() {
            if !config.is_detector_enabled(detector.name()) {
                debug!("Detector {} disabled by config", detector.name());
                continue;
            }
            let severity = config
                .severity_override(detector.name())
                .unwrap_or_else(|| detector.default_severity());
            engine.severities.insert(detector.name(), severity);
            engine.register(detector);
        }
        engine
    }

    pub fn register(&mut self, detector: Arc<dyn Detector>) {
        debug!("Registering detector: {}", detector.name());
        self.severities
            .entry(detector.name())
            .or_insert_with(|| detector.default_severity());
        self.categories.insert(detector.name(), detector.category());
        self.detectors.push(detector);
    }

    pub fn register_all(&mut self, detectors: impl IntoIterator<Item = Arc<dyn Detector>>) {
        for detector in detectors {
            self.register(detector);
        }
    }

    pub fn detector_count(&self) -> usize {
        self.detectors.len()
    }

    pub fn detector_names(&self) -> Vec<&'static str> {
        self.detectors.iter().map(|d| d.name()).collect()
    }

    /// Severity reported for a detector's findings
    pub fn severity(&self, detector: &str) -> Severity {
        self.severities.get(detector).copied().unwrap_or(Severity::High)
    }

    /// Category reported for a detector's findings
    pub fn category(&self, detector: &str) -> &'static str {
        self.categories.get(detector).copied().unwrap_or("security")
    }

    /// Run every detector over `file`, in registration order
    pub fn run(&self, file: &SourceFile) -> Vec<Detection> {
        self.detectors
            .iter()
            .flat_map(|detector| self.run_single_detector(detector, file))
            .collect()
    }

    fn run_single_detector(&self, detector: &Arc<dyn Detector>, file: &SourceFile) -> Vec<Detection> {
        let name = detector.name();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            detector.detect(file, &self.context)
        }));
        match result {
            Ok(detections) => {
                if !detections.is_empty() {
                    debug!(
                        "Detector {} flagged {} location(s) in {}",
                        name,
                        detections.len(),
                        file.path().display()
                    );
                }
                detections
            }
            Err(panic_info) => {
                let panic_msg = if let Some(s) = panic_info.downcast_ref::<&str>() {
                    s.to_string()
                } else if let Some(s) = panic_info.downcast_ref::<String>() {
                    s.clone()
                } else {
                    "Unknown panic".to_string()
                };
                error!(
                    "Detector {} panicked on {}: {}",
                    name,
                    file.path().display(),
                    panic_msg
                );
                Vec::new()
            }
        }
    }
}

impl Default for DetectorEngine {
    fn default() -> Self {
        Self::from_config(&ProjectConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DetectorConfigOverride;
    use crate::parsers::java::JavaFile;
    use std::path::Path;

    struct PanickingDetector;

    impl Detector for PanickingDetector {
        fn name(&self) -> &'static str {
            "panicking"
        }

        fn description(&self) -> &'static str {
            "always panics"
        }

        fn detect(&self, _file: &SourceFile, _ctx: &DetectorContext) -> Vec<Detection> {
            panic!("boom");
        }

        fn category(&self) -> &'static str {
            "reliability"
        }
    }

    fn java(source: &str) -> SourceFile {
        SourceFile::Java(JavaFile::parse_source(source, Path::new("A.java")).unwrap())
    }

    #[test]
    fn test_default_engine_has_all_detectors() {
        let engine = DetectorEngine::default();
        assert_eq!(
            engine.detector_names(),
            vec![
                "polyadic-sqli",
                "format-string-sqli",
                "mybatis-annotation-sqli",
                "mybatis-xml-sqli"
            ]
        );
    }

    #[test]
    fn test_config_disables_and_overrides() {
        let mut config = ProjectConfig::default();
        config.detectors.insert(
            "format-string-sqli".to_string(),
            DetectorConfigOverride {
                enabled: Some(false),
                severity: None,
            },
        );
        config.detectors.insert(
            "polyadic-sqli".to_string(),
            DetectorConfigOverride {
                enabled: None,
                severity: Some("medium".to_string()),
            },
        );
        let engine = DetectorEngine::from_config(&config);
        assert_eq!(engine.detector_count(), 3);
        assert!(!engine.detector_names().contains(&"format-string-sqli"));
        assert_eq!(engine.severity("polyadic-sqli"), Severity::Medium);
        assert_eq!(engine.severity("mybatis-xml-sqli"), Severity::High);
    }

    #[test]
    fn test_panicking_detector_is_isolated() {
        let mut engine = DetectorEngine::default();
        engine.register(Arc::new(PanickingDetector));
        let file = java("class A {\n  String q(String n) { return \"select * from T where n = '\" + n + \"'\"; }\n}\n");
        let detections = engine.run(&file);
        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].detector, "polyadic-sqli");
    }

    #[test]
    fn test_category_follows_detector() {
        let mut engine = DetectorEngine::default();
        engine.register(Arc::new(PanickingDetector));
        assert_eq!(engine.category("polyadic-sqli"), "security");
        assert_eq!(engine.category("panicking"), "reliability");
    }
}
