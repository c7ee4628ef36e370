use super::{DirEntry, FileSystem, FileType};
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Host file system, used for local source repositories and template files
#[derive(Debug, Default, Clone, Copy)]
pub struct RealFileSystem;

impl RealFileSystem {
    pub fn new() -> Self {
        Self
    }
}

fn entry_type(entry: &fs::DirEntry) -> FileType {
    match entry.file_type() {
        Ok(t) if t.is_symlink() => FileType::Symlink,
        Ok(t) if t.is_dir() => FileType::Directory,
        _ => FileType::File,
    }
}

impl FileSystem for RealFileSystem {
    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn read_to_string(&self, path: &Path) -> Result<String> {
        fs::read_to_string(path).with_context(|| format!("unable to read {}", path.display()))
    }

    /// Children sorted by name so detection order does not depend on the OS
    fn read_dir(&self, path: &Path) -> Result<Vec<DirEntry>> {
        let mut children = fs::read_dir(path)
            .with_context(|| format!("unable to list {}", path.display()))?
            .map(|entry| {
                let entry = entry.with_context(|| format!("unable to list {}", path.display()))?;
                Ok(DirEntry {
                    name: entry.file_name().to_string_lossy().into_owned(),
                    file_type: entry_type(&entry),
                    path: entry.path(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        children.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(children)
    }

    fn canonicalize(&self, path: &Path) -> Result<PathBuf> {
        fs::canonicalize(path).with_context(|| format!("unable to resolve {}", path.display()))
    }
}
