//! Source repository detection
//!
//! Inspects a checked-out source directory for language marker files and a
//! Dockerfile. The result decides which builder image a repository is paired
//! with when the user did not name one.

mod dockerfile;
mod language;

pub use dockerfile::Dockerfile;
pub use language::detect_languages;

use crate::fs::FileSystem;
use anyhow::{Context, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// A detected platform, optionally with a version
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceLanguageType {
    pub platform: String,
    pub version: String,
}

impl SourceLanguageType {
    /// The search term used to find a builder: `platform[:version]`
    pub fn term(&self) -> String {
        if self.version.is_empty() {
            self.platform.clone()
        } else {
            format!("{}:{}", self.platform, self.version)
        }
    }
}

impl fmt::Display for SourceLanguageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.term())
    }
}

/// What detection found in a source directory
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceRepositoryInfo {
    pub path: PathBuf,
    pub types: Vec<SourceLanguageType>,
    pub dockerfile: Option<Dockerfile>,
}

impl SourceRepositoryInfo {
    pub fn terms(&self) -> Vec<String> {
        self.types.iter().map(SourceLanguageType::term).collect()
    }
}

/// Detects languages and a Dockerfile in a source directory
pub trait Detector {
    fn detect(&self, dir: &Path, skip_languages: bool) -> Result<SourceRepositoryInfo>;
}

/// Detector backed by a [`FileSystem`]
#[derive(Clone)]
pub struct SourceRepositoryEnumerator {
    fs: Arc<dyn FileSystem>,
}

impl SourceRepositoryEnumerator {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }
}

impl Detector for SourceRepositoryEnumerator {
    fn detect(&self, dir: &Path, skip_languages: bool) -> Result<SourceRepositoryInfo> {
        let mut info = SourceRepositoryInfo {
            path: dir.to_path_buf(),
            ..Default::default()
        };
        if !skip_languages {
            info.types = detect_languages(self.fs.as_ref(), dir);
        }

        let dockerfile_path = dir.join("Dockerfile");
        if self.fs.is_file(&dockerfile_path) {
            let content = self
                .fs
                .read_to_string(&dockerfile_path)
                .with_context(|| format!("Failed to read {:?}", dockerfile_path))?;
            info.dockerfile = Some(Dockerfile::parse(&content));
        }

        debug!(
            path = %dir.display(),
            types = ?info.terms(),
            dockerfile = info.dockerfile.is_some(),
            "Detected source repository"
        );
        Ok(info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MockFileSystem;

    #[test]
    fn test_detects_languages_and_dockerfile() {
        let fs = MockFileSystem::new();
        fs.add_file("/app/Gemfile", "source 'https://rubygems.org'");
        fs.add_file("/app/Dockerfile", "FROM centos:7\nEXPOSE 8080\n");
        let detector = SourceRepositoryEnumerator::new(Arc::new(fs));

        let info = detector.detect(Path::new("/app"), false).unwrap();
        assert_eq!(info.terms(), vec!["ruby"]);
        assert_eq!(info.dockerfile.unwrap().last_from(), Some("centos:7"));

        let info = detector.detect(Path::new("/app"), true).unwrap();
        assert!(info.types.is_empty());
    }

    #[test]
    fn test_language_term_includes_version() {
        let lang = SourceLanguageType {
            platform: "ruby".to_string(),
            version: "2.5".to_string(),
        };
        assert_eq!(lang.term(), "ruby:2.5");
    }
}
