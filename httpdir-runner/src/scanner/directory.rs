//! Directory scanner
//!
//! Produces the set of declared jobs found under the configured root.

use httpdir_core::JobDeclaration;
use httpdir_toml::parse_declaration;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, error};
use walkdir::WalkDir;

/// Extension of the files holding job fragments
pub const FRAGMENT_EXTENSION: &str = "toml";

/// Declarations found by one scan, keyed by absolute file path
pub type DeclaredSet = BTreeMap<PathBuf, JobDeclaration>;

/// A scan that could not even start
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("walking '{}'", path.display())]
    Root {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Walks a fragment tree
#[derive(Debug, Clone)]
pub struct DirectoryScanner {
    root: PathBuf,
}

impl DirectoryScanner {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Lazily lists the fragment files under the root, in file name order
    ///
    /// Entries that cannot be read are logged and skipped. Fails only when
    /// the root itself cannot be resolved.
    pub fn fragment_paths(&self) -> Result<impl Iterator<Item = PathBuf> + use<>, ScanError> {
        let root = self
            .root
            .canonicalize()
            .map_err(|source| ScanError::Root {
                path: self.root.clone(),
                source,
            })?;

        let paths = WalkDir::new(root)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => {
                    if entry.file_type().is_file() && is_fragment(entry.path()) {
                        Some(entry.into_path())
                    } else {
                        None
                    }
                }
                Err(e) => {
                    let path = e
                        .path()
                        .map(|p| p.display().to_string())
                        .unwrap_or_default();
                    error!("walking '{}': {}", path, e);
                    None
                }
            });

        Ok(paths)
    }

    /// Parses every fragment under the root
    pub fn scan(&self) -> Result<DeclaredSet, ScanError> {
        let mut declared = DeclaredSet::new();

        for path in self.fragment_paths()? {
            match parse_declaration(&path) {
                Ok(declaration) => {
                    debug!(
                        "Declared '{}' in {}",
                        declaration.logical_name,
                        path.display()
                    );
                    declared.insert(path, declaration);
                }
                Err(e) => error!("loading http file '{}': {}", path.display(), e),
            }
        }

        Ok(declared)
    }
}

fn is_fragment(path: &Path) -> bool {
    path.extension()
        .is_some_and(|extension| extension == FRAGMENT_EXTENSION)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn job(name: &str) -> String {
        format!("[{name}]\ntype = \"HttpInput\"\nurl = \"http://localhost/{name}\"\n")
    }

    #[test]
    fn test_scan_finds_nested_fragments() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("team/checks")).unwrap();
        fs::write(dir.path().join("health.toml"), job("health")).unwrap();
        fs::write(dir.path().join("team/checks/orders.toml"), job("orders")).unwrap();

        let declared = DirectoryScanner::new(dir.path()).scan().unwrap();
        let names: Vec<&str> = declared
            .values()
            .map(|d| d.logical_name.as_str())
            .collect();

        assert_eq!(declared.len(), 2);
        assert!(names.contains(&"health"));
        assert!(names.contains(&"orders"));
        for (path, declaration) in &declared {
            assert!(path.is_absolute());
            assert_eq!(path, &declaration.source_path);
        }
    }

    #[test]
    fn test_scan_skips_other_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("health.toml"), job("health")).unwrap();
        fs::write(dir.path().join("README.md"), "# jobs").unwrap();
        fs::write(dir.path().join("health.toml.bak"), job("backup")).unwrap();
        fs::create_dir(dir.path().join("dir.toml")).unwrap();

        let declared = DirectoryScanner::new(dir.path()).scan().unwrap();
        assert_eq!(declared.len(), 1);
        assert_eq!(declared.values().next().unwrap().logical_name, "health");
    }

    #[test]
    fn test_scan_skips_invalid_fragments() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("good.toml"), job("good")).unwrap();
        fs::write(dir.path().join("broken.toml"), "[broken").unwrap();
        fs::write(dir.path().join("other.toml"), "[out]\ntype = \"LogOutput\"\n").unwrap();

        let declared = DirectoryScanner::new(dir.path()).scan().unwrap();
        assert_eq!(declared.len(), 1);
        assert_eq!(declared.values().next().unwrap().logical_name, "good");
    }

    #[test]
    fn test_scan_keys_by_path_not_name() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.toml"), job("same")).unwrap();
        fs::write(dir.path().join("b.toml"), job("same")).unwrap();

        let declared = DirectoryScanner::new(dir.path()).scan().unwrap();
        assert_eq!(declared.len(), 2);
    }

    #[test]
    fn test_scan_empty_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert!(DirectoryScanner::new(dir.path()).scan().unwrap().is_empty());
    }

    #[test]
    fn test_scan_missing_root_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let scanner = DirectoryScanner::new(dir.path().join("missing"));
        let err = scanner.scan().unwrap_err();
        assert!(matches!(err, ScanError::Root { .. }));

        // The io cause is carried as the source, not repeated in the message
        let source = std::error::Error::source(&err).unwrap().to_string();
        assert!(!err.to_string().contains(&source));
    }

    #[test]
    fn test_fragment_paths_are_restartable() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.toml"), job("b")).unwrap();
        fs::write(dir.path().join("a.toml"), job("a")).unwrap();

        let scanner = DirectoryScanner::new(dir.path());
        let first: Vec<PathBuf> = scanner.fragment_paths().unwrap().collect();
        let second: Vec<PathBuf> = scanner.fragment_paths().unwrap().collect();

        assert_eq!(first, second);
        assert!(first[0].ends_with("a.toml"));
        assert!(first[1].ends_with("b.toml"));
    }
}
