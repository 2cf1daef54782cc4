//! Workspace scanning
//!
//! Enumerates project files and classifies them by extension. Metadata
//! only - no file contents are read. The scan result feeds both prompt
//! construction and deterministic fallback synthesis.

mod context;

pub use context::ProjectContext;

use std::path::Path;

use glob::Pattern;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::config::ScanConfig;

/// Errors that can occur while scanning a workspace
#[derive(Debug, Error)]
pub enum ScanError {
    /// No usable project root - fatal for the current request only
    #[error("No project root open at {path}")]
    WorkspaceUnavailable { path: String },

    #[error("Invalid exclude pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        source: glob::PatternError,
    },
}

/// Metadata for one scanned file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScannedFile {
    /// Workspace-relative path
    pub path: String,
    /// Language classification tag, or "unknown"
    pub language: String,
    /// Size in bytes
    pub size: u64,
}

/// Manifest files recognized for validation-step references, in priority order
const MANIFEST_NAMES: &[&str] = &[
    "Cargo.toml",
    "package.json",
    "pyproject.toml",
    "go.mod",
    "pom.xml",
    "Makefile",
];

/// Scan a workspace root, honoring the configured exclusions and cap
///
/// Files are returned in deterministic walk order (sorted by name at each
/// directory level); the earliest-scanned files win when downstream caps
/// truncate the list.
pub fn scan_workspace(root: &Path, config: &ScanConfig) -> Result<Vec<ScannedFile>, ScanError> {
    if !root.is_dir() {
        return Err(ScanError::WorkspaceUnavailable {
            path: root.display().to_string(),
        });
    }

    let patterns = compile_patterns(&config.exclude)?;
    let mut files = Vec::new();

    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_hidden(e.file_name().to_str().unwrap_or("")));

    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!(error = %e, "Skipping unreadable entry during scan");
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };
        let rel_str = relative.to_string_lossy().replace('\\', "/");

        if patterns.iter().any(|p| p.matches(&rel_str)) {
            continue;
        }

        let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
        let language = classify_language(&rel_str);

        files.push(ScannedFile {
            path: rel_str,
            language: language.to_string(),
            size,
        });

        if files.len() >= config.max_files {
            debug!(cap = config.max_files, "Scan cap reached, truncating");
            break;
        }
    }

    debug!(file_count = files.len(), root = %root.display(), "Workspace scan complete");
    Ok(files)
}

fn compile_patterns(excludes: &[String]) -> Result<Vec<Pattern>, ScanError> {
    excludes
        .iter()
        .map(|raw| {
            Pattern::new(raw).map_err(|source| ScanError::InvalidPattern {
                pattern: raw.clone(),
                source,
            })
        })
        .collect()
}

fn is_hidden(name: &str) -> bool {
    name.starts_with('.') && name.len() > 1
}

/// Classify a file path by extension
pub fn classify_language(path: &str) -> &'static str {
    let ext = Path::new(path).extension().and_then(|e| e.to_str()).unwrap_or("");

    match ext.to_ascii_lowercase().as_str() {
        "rs" => "Rust",
        "ts" | "tsx" => "TypeScript",
        "js" | "jsx" | "mjs" => "JavaScript",
        "py" => "Python",
        "go" => "Go",
        "java" => "Java",
        "kt" | "kts" => "Kotlin",
        "rb" => "Ruby",
        "c" | "h" => "C",
        "cpp" | "cc" | "cxx" | "hpp" => "C++",
        "cs" => "C#",
        "swift" => "Swift",
        "php" => "PHP",
        "sh" | "bash" => "Shell",
        "sql" => "SQL",
        "html" | "htm" => "HTML",
        "css" | "scss" => "CSS",
        "md" => "Markdown",
        "json" => "JSON",
        "yaml" | "yml" => "YAML",
        "toml" => "TOML",
        _ => "unknown",
    }
}

/// Find the first recognized manifest file in a scanned file list
pub fn manifest_reference(files: &[ScannedFile]) -> Option<&str> {
    for name in MANIFEST_NAMES {
        if let Some(file) = files.iter().find(|f| {
            Path::new(&f.path)
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n == *name)
        }) {
            return Some(&file.path);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    use crate::config::ScanConfig;

    fn write_file(root: &Path, rel: &str) {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, "x").unwrap();
    }

    #[test]
    fn test_classify_language() {
        assert_eq!(classify_language("src/main.rs"), "Rust");
        assert_eq!(classify_language("web/app.tsx"), "TypeScript");
        assert_eq!(classify_language("scripts/build.py"), "Python");
        assert_eq!(classify_language("README.md"), "Markdown");
        assert_eq!(classify_language("LICENSE"), "unknown");
        assert_eq!(classify_language("image.PNG"), "unknown");
    }

    #[test]
    fn test_scan_respects_excludes_and_cap() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "src/main.rs");
        write_file(dir.path(), "src/lib.rs");
        write_file(dir.path(), "target/debug/out.rs");
        write_file(dir.path(), "Cargo.toml");

        let config = ScanConfig {
            max_files: 500,
            exclude: vec!["target/**".to_string()],
        };

        let files = scan_workspace(dir.path(), &config).unwrap();
        let paths: Vec<&str> = files.iter().map(|f| f.path.as_str()).collect();

        assert!(paths.contains(&"src/main.rs"));
        assert!(paths.contains(&"Cargo.toml"));
        assert!(!paths.iter().any(|p| p.starts_with("target/")));

        let capped = ScanConfig {
            max_files: 2,
            exclude: vec![],
        };
        let files = scan_workspace(dir.path(), &capped).unwrap();
        assert_eq!(files.len(), 2);
    }

    #[test]
    fn test_scan_skips_hidden_directories() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), ".git/config");
        write_file(dir.path(), "src/main.rs");

        let files = scan_workspace(dir.path(), &ScanConfig::default()).unwrap();
        assert!(files.iter().all(|f| !f.path.starts_with(".git")));
        assert!(files.iter().any(|f| f.path == "src/main.rs"));
    }

    #[test]
    fn test_scan_missing_root_is_workspace_unavailable() {
        let result = scan_workspace(Path::new("/nonexistent/project/root"), &ScanConfig::default());
        assert!(matches!(result, Err(ScanError::WorkspaceUnavailable { .. })));
    }

    #[test]
    fn test_manifest_reference_priority() {
        let files = vec![
            ScannedFile {
                path: "package.json".to_string(),
                language: "JSON".to_string(),
                size: 1,
            },
            ScannedFile {
                path: "backend/Cargo.toml".to_string(),
                language: "TOML".to_string(),
                size: 1,
            },
        ];

        // Cargo.toml outranks package.json regardless of scan order
        assert_eq!(manifest_reference(&files), Some("backend/Cargo.toml"));
        assert_eq!(manifest_reference(&[]), None);
    }
}
