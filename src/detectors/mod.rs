//! SQL injection detectors
//!
//! Four inspections share the classification core in [`crate::sqli`]:
//!
//! ```text
//! ┌──────────────────────────────┐   ┌──────────────────────────────┐
//! │ Java (tree-sitter)           │   │ MyBatis mapper XML           │
//! │ - PolyadicSqliDetector       │   │ - MybatisXmlSqliDetector     │
//! │ - FormatStringSqliDetector   │   │                              │
//! │ - MybatisAnnotationSqli...   │   │                              │
//! └──────────────┬───────────────┘   └──────────────┬───────────────┘
//!                ▼                                  ▼
//!        additive risk scan                join-string risk scan
//!                └──────────────┬───────────────────┘
//!                               ▼
//!                  Detection { fingerprint, Fix }
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use sqlsentry::detectors::{DetectorEngine, SourceFile};
//!
//! let engine = DetectorEngine::from_config(&config);
//! let detections = engine.run(&SourceFile::Java(java));
//! ```

mod base;
mod engine;
mod format_string;
mod mybatis_annotation;
mod mybatis_xml;
mod polyadic;

pub use base::{Detection, Detector, DetectorContext, SourceFile, SQL_INJECTION_CWE};
pub use engine::DetectorEngine;
pub use format_string::FormatStringSqliDetector;
pub use mybatis_annotation::MybatisAnnotationSqliDetector;
pub use mybatis_xml::MybatisXmlSqliDetector;
pub use polyadic::PolyadicSqliDetector;

use std::sync::Arc;

/// Every inspection, in reporting order
pub fn default_detectors() -> Vec<Arc<dyn Detector>> {
    vec![
        // Java string building
        Arc::new(PolyadicSqliDetector::new()),
        Arc::new(FormatStringSqliDetector::new()),
        // MyBatis templates
        Arc::new(MybatisAnnotationSqliDetector::new()),
        Arc::new(MybatisXmlSqliDetector::new()),
    ]
}
