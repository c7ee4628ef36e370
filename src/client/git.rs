use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// Git plumbing used to locate and fetch source repositories
pub trait Git {
    /// Top level of the working tree containing `dir`
    fn root_dir(&self, dir: &Path) -> Result<PathBuf>;

    /// URL of the `origin` remote, or `None` when the repository has none
    fn origin_url(&self, dir: &Path) -> Result<Option<String>>;

    /// Current branch name, or an empty string on a detached head
    fn current_ref(&self, dir: &Path) -> String;

    fn clone_repo(&self, url: &str, dir: &Path) -> Result<()>;

    fn checkout(&self, dir: &Path, git_ref: &str) -> Result<()>;
}

/// Git implemented by shelling out to the `git` binary
#[derive(Debug, Default, Clone, Copy)]
pub struct GitCli;

impl GitCli {
    fn run(&self, dir: Option<&Path>, args: &[&str]) -> Result<String> {
        let mut command = Command::new("git");
        if let Some(dir) = dir {
            command.current_dir(dir);
        }
        debug!("Running git {}", args.join(" "));
        let output = command
            .args(args)
            .output()
            .context("Failed to execute git")?;
        if !output.status.success() {
            return Err(anyhow!(
                "git {} failed: {}",
                args.join(" "),
                String::from_utf8_lossy(&output.stderr).trim()
            ));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

impl Git for GitCli {
    fn root_dir(&self, dir: &Path) -> Result<PathBuf> {
        self.run(Some(dir), &["rev-parse", "--show-toplevel"])
            .map(PathBuf::from)
    }

    fn origin_url(&self, dir: &Path) -> Result<Option<String>> {
        match self.run(Some(dir), &["config", "--get", "remote.origin.url"]) {
            Ok(url) if !url.is_empty() => Ok(Some(url)),
            Ok(_) => Ok(None),
            Err(e) => {
                debug!("No origin remote in {:?}: {}", dir, e);
                Ok(None)
            }
        }
    }

    fn current_ref(&self, dir: &Path) -> String {
        match self.run(Some(dir), &["symbolic-ref", "-q", "--short", "HEAD"]) {
            Ok(branch) => branch,
            Err(_) => String::new(),
        }
    }

    fn clone_repo(&self, url: &str, dir: &Path) -> Result<()> {
        let target = dir.to_string_lossy();
        self.run(None, &["clone", "--recursive", url, &target])
            .map(|_| ())
    }

    fn checkout(&self, dir: &Path, git_ref: &str) -> Result<()> {
        self.run(Some(dir), &["checkout", git_ref]).map(|_| ())
    }
}
