//! Dockerfile parsing

use regex::Regex;
use std::sync::OnceLock;

fn instruction_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*([A-Za-z]+)\s+(.*?)\s*$").expect("valid regex"))
}

/// The instructions of a Dockerfile the generator cares about
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dockerfile {
    /// Base image of every stage, in order
    pub from: Vec<String>,
    /// `EXPOSE` entries of the final stage, as written
    pub exposed_ports: Vec<String>,
}

impl Dockerfile {
    pub fn parse(content: &str) -> Self {
        let mut dockerfile = Dockerfile::default();
        for line in logical_lines(content) {
            let Some(caps) = instruction_regex().captures(&line) else {
                continue;
            };
            let args = &caps[2];
            match caps[1].to_ascii_uppercase().as_str() {
                "FROM" => {
                    let image = args
                        .split_whitespace()
                        .find(|arg| !arg.starts_with("--"))
                        .unwrap_or_default();
                    if !image.is_empty() {
                        dockerfile.from.push(image.to_string());
                        dockerfile.exposed_ports.clear();
                    }
                }
                "EXPOSE" => {
                    dockerfile
                        .exposed_ports
                        .extend(args.split_whitespace().map(str::to_string));
                }
                _ => {}
            }
        }
        dockerfile
    }

    /// The image the final stage builds on
    pub fn last_from(&self) -> Option<&str> {
        self.from.last().map(String::as_str)
    }

    /// Exposed ports whose port number is not numeric, e.g. `$PORT`
    pub fn invalid_ports(&self) -> Vec<&str> {
        self.exposed_ports
            .iter()
            .filter(|p| {
                let port = p.split('/').next().unwrap_or_default();
                port.parse::<u16>().is_err()
            })
            .map(String::as_str)
            .collect()
    }
}

/// Joins continuation lines and drops comments and blank lines
fn logical_lines(content: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for raw in content.lines() {
        let trimmed = raw.trim();
        if trimmed.starts_with('#') || (trimmed.is_empty() && current.is_empty()) {
            continue;
        }
        match trimmed.strip_suffix('\\') {
            Some(head) => {
                current.push_str(head);
                current.push(' ');
            }
            None => {
                current.push_str(trimmed);
                lines.push(std::mem::take(&mut current));
            }
        }
    }
    if !current.trim().is_empty() {
        lines.push(current);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_multi_stage() {
        let dockerfile = Dockerfile::parse(
            r#"
# build
FROM --platform=linux/amd64 golang:1.21 AS build
EXPOSE 9999
RUN go build \
    -o /app
from centos:7
EXPOSE 8080/tcp \
       8443
CMD ["/app"]
"#,
        );

        assert_eq!(dockerfile.from, vec!["golang:1.21", "centos:7"]);
        assert_eq!(dockerfile.last_from(), Some("centos:7"));
        assert_eq!(dockerfile.exposed_ports, vec!["8080/tcp", "8443"]);
        assert!(dockerfile.invalid_ports().is_empty());
    }

    #[test]
    fn test_invalid_ports_and_missing_from() {
        let dockerfile = Dockerfile::parse("EXPOSE $PORT 80\n");
        assert_eq!(dockerfile.last_from(), None);
        assert_eq!(dockerfile.invalid_ports(), vec!["$PORT"]);
    }
}
