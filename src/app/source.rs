use super::component::ComponentId;
use super::errors::SourceError;
use crate::client::Git;
use crate::detect::SourceRepositoryInfo;
use crate::fs::FileSystem;
use regex::Regex;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::OnceLock;
use tracing::{debug, info};
use url::Url;
use uuid::Uuid;

const REMOTE_SCHEMES: &[&str] = &["http", "https", "git", "ssh", "git+ssh"];

fn scp_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^([\w.-]+@[\w.-]+):([^/].*)$").expect("valid regex")
    })
}

/// Index of a repository inside its [`ReferenceBuilder`](super::ReferenceBuilder)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RepositoryId(pub usize);

/// How a repository is built
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Strategy {
    #[default]
    Unspecified,
    Source,
    Docker,
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "" => Ok(Strategy::Unspecified),
            "source" => Ok(Strategy::Source),
            "docker" => Ok(Strategy::Docker),
            other => Err(format!(
                "invalid build strategy {:?}: must be 'source' or 'docker'",
                other
            )),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Strategy::Unspecified => "",
            Strategy::Source => "source",
            Strategy::Docker => "docker",
        })
    }
}

/// Whether `s` names a remote git repository rather than a local path
pub fn is_remote_repository(s: &str) -> bool {
    match Url::parse(s) {
        Ok(url) => REMOTE_SCHEMES.contains(&url.scheme()) && url.host_str().is_some(),
        Err(_) => scp_regex().is_match(s),
    }
}

/// Parses a remote location, rewriting `user@host:path` into an ssh URL
fn parse_remote(location: &str) -> Option<Url> {
    if let Ok(url) = Url::parse(location) {
        if REMOTE_SCHEMES.contains(&url.scheme()) && url.host_str().is_some() {
            return Some(url);
        }
    }
    let caps = scp_regex().captures(location)?;
    Url::parse(&format!("ssh://{}/{}", &caps[1], &caps[2])).ok()
}

/// One source code location, local or remote
#[derive(Debug, Clone)]
pub struct SourceRepository {
    location: String,
    url: Url,
    local_dir: Option<PathBuf>,
    remote: bool,
    context_dir: String,
    strategy: Strategy,
    used_by: Vec<ComponentId>,
    info: Option<SourceRepositoryInfo>,
}

impl SourceRepository {
    /// Parses `location` as a remote URL (optionally with `#ref`) or a local
    /// directory, which must exist.
    pub fn new(location: &str, fs: &dyn FileSystem) -> Result<Self, SourceError> {
        let invalid = |reason: String| SourceError::InvalidLocation {
            location: location.to_string(),
            reason,
        };

        if let Some(url) = parse_remote(location) {
            return Ok(Self::with_url(location, url, None, true));
        }

        let (path, fragment) = match location.split_once('#') {
            Some((path, fragment)) => (path, Some(fragment)),
            None => (location, None),
        };
        let path = match Url::parse(path) {
            Ok(url) if url.scheme() == "file" => url
                .to_file_path()
                .map_err(|_| invalid("not a valid file URL".to_string()))?,
            _ => PathBuf::from(path),
        };
        if !fs.is_dir(&path) {
            return Err(invalid("the directory does not exist".to_string()));
        }
        let dir = fs
            .canonicalize(&path)
            .map_err(|err| invalid(err.to_string()))?;
        let mut url = Url::from_directory_path(&dir)
            .map_err(|_| invalid("the path must be absolute".to_string()))?;
        url.set_fragment(fragment.filter(|f| !f.is_empty()));
        Ok(Self::with_url(location, url, Some(dir), false))
    }

    pub fn with_strategy(
        location: &str,
        fs: &dyn FileSystem,
        strategy: Strategy,
    ) -> Result<Self, SourceError> {
        let mut repo = Self::new(location, fs)?;
        repo.strategy = strategy;
        Ok(repo)
    }

    fn with_url(location: &str, url: Url, local_dir: Option<PathBuf>, remote: bool) -> Self {
        Self {
            location: location.to_string(),
            url,
            local_dir,
            remote,
            context_dir: String::new(),
            strategy: Strategy::Unspecified,
            used_by: Vec::new(),
            info: None,
        }
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn is_remote(&self) -> bool {
        self.remote
    }

    /// The ref named in the location's fragment, if any
    pub fn git_ref(&self) -> Option<&str> {
        self.url.fragment().filter(|f| !f.is_empty())
    }

    /// The local checkout, once there is one
    pub fn local_path(&self) -> Option<&Path> {
        self.local_dir.as_deref()
    }

    pub fn context_dir(&self) -> &str {
        &self.context_dir
    }

    pub fn set_context_dir(&mut self, dir: impl Into<String>) {
        self.context_dir = dir.into();
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    pub fn set_strategy(&mut self, strategy: Strategy) {
        self.strategy = strategy;
    }

    pub fn build_with_docker(&mut self) {
        self.strategy = Strategy::Docker;
    }

    pub fn is_docker_build(&self) -> bool {
        self.strategy == Strategy::Docker
    }

    pub fn used_by(&self) -> &[ComponentId] {
        &self.used_by
    }

    pub(crate) fn add_user(&mut self, component: ComponentId) {
        if !self.used_by.contains(&component) {
            self.used_by.push(component);
        }
    }

    pub(crate) fn remove_user(&mut self, component: ComponentId) {
        self.used_by.retain(|c| *c != component);
    }

    pub fn info(&self) -> Option<&SourceRepositoryInfo> {
        self.info.as_ref()
    }

    pub fn set_info(&mut self, info: SourceRepositoryInfo) {
        self.info = Some(info);
    }

    /// Returns a local checkout, cloning a remote repository into a
    /// temporary directory on first use.
    pub fn prepare_local(&mut self, git: &dyn Git) -> Result<PathBuf, SourceError> {
        if let Some(dir) = &self.local_dir {
            return Ok(dir.clone());
        }
        let access = |source: anyhow::Error| SourceError::Access {
            location: self.location.clone(),
            source,
        };

        let dir = std::env::temp_dir().join(format!("appgen-{}", Uuid::new_v4()));
        let mut clone_url = self.url.clone();
        clone_url.set_fragment(None);
        info!(location = %self.location, dir = %dir.display(), "Cloning source repository");
        git.clone_repo(clone_url.as_str(), &dir).map_err(access)?;
        if let Some(git_ref) = self.git_ref() {
            git.checkout(&dir, git_ref).map_err(access)?;
        }
        self.local_dir = Some(dir.clone());
        Ok(dir)
    }

    /// The URL a build clones from.
    ///
    /// Remote repositories use their own URL. A local checkout uses its
    /// `origin` remote and current branch, and records its position inside
    /// the working tree as the context directory.
    pub fn remote_url(&mut self, git: &dyn Git) -> Result<Url, SourceError> {
        if self.remote {
            return Ok(self.url.clone());
        }
        let dir = self.local_dir.clone().unwrap_or_default();
        let access = |source: anyhow::Error| SourceError::Access {
            location: self.location.clone(),
            source,
        };

        let root = git.root_dir(&dir).map_err(access)?;
        let origin = git
            .origin_url(&root)
            .map_err(access)?
            .ok_or_else(|| access(anyhow::anyhow!("the repository has no 'origin' remote")))?;
        let mut url = parse_remote(&origin)
            .or_else(|| Url::parse(&origin).ok())
            .ok_or_else(|| access(anyhow::anyhow!("origin {:?} is not a valid URL", origin)))?;

        let git_ref = match self.git_ref() {
            Some(r) => r.to_string(),
            None => git.current_ref(&root),
        };
        url.set_fragment(Some(git_ref.as_str()).filter(|r| !r.is_empty()));

        if self.context_dir.is_empty() {
            if let Ok(relative) = dir.strip_prefix(&root) {
                self.context_dir = relative.to_string_lossy().to_string();
            }
        }
        debug!(location = %self.location, url = %url, context_dir = %self.context_dir, "Resolved remote URL");
        Ok(url)
    }
}

impl fmt::Display for SourceRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MockFileSystem;
    use anyhow::Result;
    use yare::parameterized;

    #[parameterized(
        https = { "https://github.com/openshift/ruby-hello-world.git", true },
        git = { "git://github.com/openshift/ruby-hello-world", true },
        ssh = { "ssh://git@github.com/openshift/ruby-hello-world", true },
        scp = { "git@github.com:openshift/ruby-hello-world.git", true },
        local = { "./app", false },
        absolute = { "/srv/app", false },
        file = { "file:///srv/app", false },
        image = { "centos:7", false },
    )]
    fn test_is_remote_repository(location: &str, remote: bool) {
        assert_eq!(is_remote_repository(location), remote);
    }

    #[test]
    fn test_remote_location_keeps_ref() {
        let fs = MockFileSystem::new();
        let repo = SourceRepository::new("https://github.com/openshift/ruby-ex.git#beta", &fs).unwrap();
        assert!(repo.is_remote());
        assert_eq!(repo.git_ref(), Some("beta"));
        assert!(repo.local_path().is_none());

        let scp = SourceRepository::new("git@github.com:openshift/ruby-ex.git", &fs).unwrap();
        assert_eq!(scp.url().as_str(), "ssh://git@github.com/openshift/ruby-ex.git");
    }

    #[test]
    fn test_local_location_must_exist() {
        let fs = MockFileSystem::new();
        fs.add_dir("/mock/app");

        let repo = SourceRepository::new("app#dev", &fs).unwrap();
        assert!(!repo.is_remote());
        assert_eq!(repo.local_path(), Some(Path::new("/mock/app")));
        assert_eq!(repo.git_ref(), Some("dev"));
        assert_eq!(repo.url().scheme(), "file");

        assert!(matches!(
            SourceRepository::new("missing", &fs),
            Err(SourceError::InvalidLocation { .. })
        ));
    }

    struct FakeGit;

    impl Git for FakeGit {
        fn root_dir(&self, _dir: &Path) -> Result<PathBuf> {
            Ok(PathBuf::from("/mock"))
        }

        fn origin_url(&self, _dir: &Path) -> Result<Option<String>> {
            Ok(Some("git@github.com:acme/app.git".to_string()))
        }

        fn current_ref(&self, _dir: &Path) -> String {
            "main".to_string()
        }

        fn clone_repo(&self, _url: &str, _dir: &Path) -> Result<()> {
            Ok(())
        }

        fn checkout(&self, _dir: &Path, _git_ref: &str) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_local_remote_url_uses_origin_and_context_dir() {
        let fs = MockFileSystem::new();
        fs.add_dir("/mock/services/api");
        let mut repo = SourceRepository::new("/mock/services/api", &fs).unwrap();

        let url = repo.remote_url(&FakeGit).unwrap();
        assert_eq!(url.as_str(), "ssh://git@github.com/acme/app.git#main");
        assert_eq!(repo.context_dir(), "services/api");
    }

    #[test]
    fn test_strategy_parsing() {
        assert_eq!("Docker".parse::<Strategy>().unwrap(), Strategy::Docker);
        assert_eq!("".parse::<Strategy>().unwrap(), Strategy::Unspecified);
        assert!("pipeline".parse::<Strategy>().is_err());
    }
}
