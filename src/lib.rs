//! sqlsentry - SQL injection scanner and autofixer
//!
//! Finds SQL statements assembled from untrusted text in Java code (`+`
//! concatenation, `StringBuilder`, `String.format`) and in MyBatis templates
//! (`${}` in annotations and mapper XML), and rewrites what it can to bound
//! parameters.
//!
//! The classification core ([`expr`], [`sqli`]) is pure text analysis; the
//! [`parsers`] adapt Java and mapper XML to it and the [`detectors`] tie the
//! two together.

pub mod cli;
pub mod config;
pub mod detectors;
pub mod error;
pub mod expr;
pub mod feedback;
pub mod fingerprint;
pub mod fixes;
pub mod models;
pub mod parsers;
pub mod pipeline;
pub mod reporters;
pub mod sqli;

pub use error::{ScanError, ScanResult};
