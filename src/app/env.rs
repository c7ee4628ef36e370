use crate::api::EnvVar;
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;
use thiserror::Error;

fn env_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([A-Za-z_][A-Za-z0-9_.-]*)=(.*)$").expect("valid regex"))
}

#[derive(Debug, Error, PartialEq)]
pub enum EnvironmentError {
    #[error("invalid environment variable {0:?}: must be KEY=VALUE")]
    Invalid(String),
    #[error("environment variable {0:?} is specified more than once")]
    Duplicate(String),
}

/// Whether `s` looks like a `KEY=VALUE` assignment
pub fn is_environment_argument(s: &str) -> bool {
    env_regex().is_match(s)
}

/// Environment variables, ordered by name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Environment(BTreeMap<String, String>);

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses `KEY=VALUE` assignments; a key may appear only once
    pub fn parse<S: AsRef<str>>(values: &[S]) -> Result<Self, EnvironmentError> {
        let mut env = Self::new();
        for value in values {
            let value = value.as_ref();
            let caps = env_regex()
                .captures(value)
                .ok_or_else(|| EnvironmentError::Invalid(value.to_string()))?;
            if env.0.insert(caps[1].to_string(), caps[2].to_string()).is_some() {
                return Err(EnvironmentError::Duplicate(caps[1].to_string()));
            }
        }
        Ok(env)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Adds every entry of `other`, overwriting on conflict
    pub fn merge(&mut self, other: &Environment) {
        for (k, v) in &other.0 {
            self.0.insert(k.clone(), v.clone());
        }
    }

    /// `self` overlaid with `other`
    pub fn merged(&self, other: &Environment) -> Environment {
        let mut env = self.clone();
        env.merge(other);
        env
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn list(&self) -> Vec<EnvVar> {
        self.0
            .iter()
            .map(|(name, value)| EnvVar {
                name: name.clone(),
                value: value.clone(),
            })
            .collect()
    }
}

impl FromIterator<(String, String)> for Environment {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_list() {
        let env = Environment::parse(&["B=2", "A=x=y", "EMPTY="]).unwrap();
        let names: Vec<String> = env.list().into_iter().map(|e| format!("{}={}", e.name, e.value)).collect();
        assert_eq!(names, vec!["A=x=y", "B=2", "EMPTY="]);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            Environment::parse(&["no-equals"]),
            Err(EnvironmentError::Invalid("no-equals".to_string()))
        );
        assert_eq!(
            Environment::parse(&["A=1", "A=2"]),
            Err(EnvironmentError::Duplicate("A".to_string()))
        );
    }

    #[test]
    fn test_merged_is_right_biased() {
        let left = Environment::parse(&["A=1", "B=1"]).unwrap();
        let right = Environment::parse(&["B=2", "C=2"]).unwrap();
        let merged = left.merged(&right);
        assert_eq!(merged.get("A"), Some("1"));
        assert_eq!(merged.get("B"), Some("2"));
        assert_eq!(merged.get("C"), Some("2"));
    }

    #[test]
    fn test_environment_argument_detection() {
        assert!(is_environment_argument("RACK_ENV=production"));
        assert!(!is_environment_argument("ruby"));
        assert!(!is_environment_argument("=value"));
        assert!(!is_environment_argument("https://example.com/?a=b"));
    }
}
