//! Configuration management for appgen
//!
//! Settings are loaded from environment variables with defaults; command line
//! flags override them afterwards.
//!
//! # Environment Variables
//!
//! - `APPGEN_NAMESPACE`: Namespace objects are generated for - default: "default"
//! - `APPGEN_SHARED_NAMESPACE`: Namespace searched after the current one - default: "openshift"
//! - `APPGEN_CATALOG`: Path to a YAML catalog of image streams, templates and registry images
//! - `APPGEN_DOCKER_ENABLED`: Search the local Docker daemon (true|false) - default: "true"
//! - `APPGEN_INSECURE_REGISTRY`: Allow insecure registries (true|false) - default: "false"
//! - `APPGEN_LOG_LEVEL`: Logging level - default: "info"
//!
//! # Example
//!
//! ```no_run
//! use appgen::AppgenConfig;
//!
//! let config = AppgenConfig::default();
//! config.validate().expect("Invalid configuration");
//! println!("{}", config);
//! ```

use crate::client::Catalog;
use regex::Regex;
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::sync::OnceLock;
use thiserror::Error;

const DEFAULT_NAMESPACE: &str = "default";
const DEFAULT_SHARED_NAMESPACE: &str = "openshift";
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_DOCKER_ENABLED: bool = true;
const DEFAULT_INSECURE_REGISTRY: bool = false;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration validation failed
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),

    /// The catalog file could not be loaded
    #[error("Failed to load catalog {path}: {source}")]
    Catalog {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },
}

fn namespace_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?$").expect("valid regex"))
}

/// Main configuration structure for appgen
#[derive(Debug, Clone, PartialEq)]
pub struct AppgenConfig {
    /// Namespace the generated objects belong to
    pub namespace: String,

    /// Namespace searched for shared image streams and templates
    pub shared_namespace: String,

    /// Offline catalog standing in for the cluster and registries
    pub catalog: Option<PathBuf>,

    /// Search the local Docker daemon
    pub docker_enabled: bool,

    /// Allow insecure registries
    pub insecure_registry: bool,

    /// Logging level (trace, debug, info, warn, error)
    pub log_level: String,
}

fn env_bool(key: &str, default: bool) -> bool {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<bool>().ok())
        .unwrap_or(default)
}

impl Default for AppgenConfig {
    /// Loads `APPGEN_*` environment variables, falling back to defaults
    fn default() -> Self {
        let namespace = env::var("APPGEN_NAMESPACE").unwrap_or_else(|_| DEFAULT_NAMESPACE.to_string());
        let shared_namespace = env::var("APPGEN_SHARED_NAMESPACE")
            .unwrap_or_else(|_| DEFAULT_SHARED_NAMESPACE.to_string());
        let catalog = env::var("APPGEN_CATALOG")
            .ok()
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);
        let log_level = env::var("APPGEN_LOG_LEVEL")
            .unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string())
            .to_lowercase();

        Self {
            namespace,
            shared_namespace,
            catalog,
            docker_enabled: env_bool("APPGEN_DOCKER_ENABLED", DEFAULT_DOCKER_ENABLED),
            insecure_registry: env_bool("APPGEN_INSECURE_REGISTRY", DEFAULT_INSECURE_REGISTRY),
            log_level,
        }
    }
}

impl AppgenConfig {
    /// Validates the configuration
    ///
    /// Namespaces must be DNS labels and the log level one of the
    /// `tracing` levels.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("namespace", &self.namespace),
            ("shared namespace", &self.shared_namespace),
        ] {
            if value.len() > 63 || !namespace_regex().is_match(value) {
                return Err(ConfigError::ValidationFailed(format!(
                    "Invalid {}: {:?}. Must be a lowercase DNS label",
                    field, value
                )));
            }
        }

        match self.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(ConfigError::ValidationFailed(format!(
                    "Invalid log level: {}. Valid options: trace, debug, info, warn, error",
                    self.log_level
                )))
            }
        }

        Ok(())
    }

    /// Loads the configured catalog, or an empty one when none is set
    pub fn load_catalog(&self) -> Result<Catalog, ConfigError> {
        match &self.catalog {
            Some(path) => Catalog::from_path(path).map_err(|source| ConfigError::Catalog {
                path: path.clone(),
                source,
            }),
            None => Ok(Catalog::default()),
        }
    }
}

impl fmt::Display for AppgenConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Appgen Configuration:")?;
        writeln!(f, "  Namespace: {}", self.namespace)?;
        writeln!(f, "  Shared Namespace: {}", self.shared_namespace)?;
        match &self.catalog {
            Some(path) => writeln!(f, "  Catalog: {}", path.display())?,
            None => writeln!(f, "  Catalog: none")?,
        }
        writeln!(f, "  Docker Enabled: {}", self.docker_enabled)?;
        writeln!(f, "  Insecure Registry: {}", self.insecure_registry)?;
        writeln!(f, "  Log Level: {}", self.log_level)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    struct EnvGuard {
        key: String,
        old_value: Option<String>,
    }

    impl EnvGuard {
        fn set(key: &str, value: &str) -> Self {
            let old_value = env::var(key).ok();
            env::set_var(key, value);
            Self {
                key: key.to_string(),
                old_value,
            }
        }

        fn unset(key: &str) -> Self {
            let old_value = env::var(key).ok();
            env::remove_var(key);
            Self {
                key: key.to_string(),
                old_value,
            }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            match &self.old_value {
                Some(v) => env::set_var(&self.key, v),
                None => env::remove_var(&self.key),
            }
        }
    }

    #[test]
    #[serial]
    fn test_default_configuration() {
        let _guards = [
            EnvGuard::unset("APPGEN_NAMESPACE"),
            EnvGuard::unset("APPGEN_SHARED_NAMESPACE"),
            EnvGuard::unset("APPGEN_CATALOG"),
            EnvGuard::unset("APPGEN_DOCKER_ENABLED"),
            EnvGuard::unset("APPGEN_INSECURE_REGISTRY"),
            EnvGuard::unset("APPGEN_LOG_LEVEL"),
        ];

        let config = AppgenConfig::default();

        assert_eq!(config.namespace, DEFAULT_NAMESPACE);
        assert_eq!(config.shared_namespace, DEFAULT_SHARED_NAMESPACE);
        assert_eq!(config.catalog, None);
        assert_eq!(config.docker_enabled, DEFAULT_DOCKER_ENABLED);
        assert_eq!(config.insecure_registry, DEFAULT_INSECURE_REGISTRY);
        assert_eq!(config.log_level, DEFAULT_LOG_LEVEL);
        assert!(config.validate().is_ok());
    }

    #[test]
    #[serial]
    fn test_environment_variable_parsing() {
        let _guards = [
            EnvGuard::set("APPGEN_NAMESPACE", "team-a"),
            EnvGuard::set("APPGEN_CATALOG", "/etc/appgen/catalog.yaml"),
            EnvGuard::set("APPGEN_DOCKER_ENABLED", "false"),
            EnvGuard::set("APPGEN_INSECURE_REGISTRY", "true"),
            EnvGuard::set("APPGEN_LOG_LEVEL", "DEBUG"),
        ];

        let config = AppgenConfig::default();

        assert_eq!(config.namespace, "team-a");
        assert_eq!(config.catalog, Some(PathBuf::from("/etc/appgen/catalog.yaml")));
        assert!(!config.docker_enabled);
        assert!(config.insecure_registry);
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    #[serial]
    fn test_unparseable_booleans_fall_back() {
        let _guard = EnvGuard::set("APPGEN_DOCKER_ENABLED", "sometimes");
        assert!(AppgenConfig::default().docker_enabled);
    }

    #[test]
    #[serial]
    fn test_configuration_validation_invalid_namespace() {
        let mut config = AppgenConfig::default();
        config.namespace = "Team_A".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    #[serial]
    fn test_configuration_validation_invalid_log_level() {
        let mut config = AppgenConfig::default();
        config.log_level = "invalid".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    #[serial]
    fn test_load_catalog() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "imageStreams: []").unwrap();

        let mut config = AppgenConfig::default();
        config.catalog = Some(file.path().to_path_buf());
        assert!(config.load_catalog().is_ok());

        config.catalog = Some(PathBuf::from("/nonexistent/catalog.yaml"));
        assert!(matches!(config.load_catalog(), Err(ConfigError::Catalog { .. })));
    }

    #[test]
    #[serial]
    fn test_config_display() {
        let config = AppgenConfig::default();
        let display = format!("{}", config);
        assert!(display.contains("Appgen Configuration:"));
        assert!(display.contains("Namespace:"));
    }
}
