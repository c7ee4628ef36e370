use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;
use thiserror::Error;

const MAX_NAME_LENGTH: usize = 253;

fn invalid_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^-a-z0-9]").expect("valid regex"))
}

#[derive(Debug, Error, PartialEq)]
#[error("invalid name {0:?}: must be at least 2 characters of lowercase letters, digits or '-'")]
pub struct InvalidNameError(pub String);

/// Lower-cases and strips a suggested name into a valid object name
pub fn sanitize_name(name: &str) -> Result<String, InvalidNameError> {
    let lower = name.to_lowercase();
    let stripped = invalid_chars().replace_all(&lower, "");
    let mut cleaned = stripped.trim_start_matches('-').to_string();
    cleaned.truncate(MAX_NAME_LENGTH);
    if cleaned.len() < 2 {
        return Err(InvalidNameError(name.to_string()));
    }
    Ok(cleaned)
}

/// Hands out sanitized names, suffixing `-N` when one is reused
#[derive(Debug, Default)]
pub struct UniqueNameGenerator {
    names: HashMap<String, usize>,
}

impl UniqueNameGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generate(&mut self, name: &str) -> Result<String, InvalidNameError> {
        let base = sanitize_name(name)?;
        let count = self.names.entry(base.clone()).or_insert(0);
        *count += 1;
        if *count == 1 {
            return Ok(base);
        }
        let suffix = format!("-{}", *count - 1);
        let mut truncated = base;
        truncated.truncate(MAX_NAME_LENGTH - suffix.len());
        Ok(format!("{}{}", truncated, suffix))
    }
}
