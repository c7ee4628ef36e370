//! Language detection from marker files

use super::SourceLanguageType;
use crate::fs::FileSystem;
use std::path::Path;

/// A platform and the files whose presence identifies it
struct LanguageMarkers {
    platform: &'static str,
    files: &'static [&'static str],
    extensions: &'static [&'static str],
}

/// Checked in order; every platform with a marker is reported
const LANGUAGES: &[LanguageMarkers] = &[
    LanguageMarkers {
        platform: "ruby",
        files: &["Gemfile", "Rakefile", "config.ru"],
        extensions: &[],
    },
    LanguageMarkers {
        platform: "jee",
        files: &["pom.xml"],
        extensions: &[],
    },
    LanguageMarkers {
        platform: "nodejs",
        files: &["app.json", "package.json"],
        extensions: &[],
    },
    LanguageMarkers {
        platform: "php",
        files: &["index.php", "composer.json"],
        extensions: &[],
    },
    LanguageMarkers {
        platform: "python",
        files: &["requirements.txt", "setup.py"],
        extensions: &[],
    },
    LanguageMarkers {
        platform: "perl",
        files: &["index.pl", "cpanfile"],
        extensions: &[],
    },
    LanguageMarkers {
        platform: "scala",
        files: &["build.sbt"],
        extensions: &[],
    },
    LanguageMarkers {
        platform: "dotnet",
        files: &["project.json"],
        extensions: &["csproj"],
    },
    LanguageMarkers {
        platform: "golang",
        files: &["main.go", "Godeps"],
        extensions: &[],
    },
];

/// Platforms whose markers appear directly in `dir`
pub fn detect_languages(fs: &dyn FileSystem, dir: &Path) -> Vec<SourceLanguageType> {
    let names: Vec<String> = fs
        .read_dir(dir)
        .map(|entries| entries.into_iter().map(|e| e.name).collect())
        .unwrap_or_default();

    LANGUAGES
        .iter()
        .filter(|lang| {
            lang.files.iter().any(|f| names.iter().any(|n| n == f))
                || names.iter().any(|n| {
                    Path::new(n)
                        .extension()
                        .and_then(|e| e.to_str())
                        .is_some_and(|e| lang.extensions.contains(&e))
                })
        })
        .map(|lang| SourceLanguageType {
            platform: lang.platform.to_string(),
            version: String::new(),
        })
        .collect()
}
