//! Scanner layer for the runner
//!
//! Walks the fragment tree and parses every fragment into a declaration.
//! Per-file and per-entry problems are logged and skipped; only an
//! unusable root directory fails a scan.

pub mod directory;

pub use directory::{DeclaredSet, DirectoryScanner, ScanError};
