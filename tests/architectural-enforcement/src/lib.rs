//! Architectural Enforcement
//!
//! Source scanners shared by the integration tests in `tests/`. They walk
//! the production sources of the chat crates line by line and report
//! calls that break the crate's runtime rules:
//! - no blocking I/O inside async functions
//! - no sleeping in production code
//! - no `unwrap()` / `expect()` outside tests
//!
//! The scan is textual. A `#[cfg(test)]` attribute ends the production
//! part of a file, so inline test modules must sit at the bottom.

use std::fs;
use std::path::{Path, PathBuf};

/// Production source roots, relative to the workspace root
pub const PRODUCTION_DIRS: &[&str] = &["chat/core/src", "chat/cli/src"];

/// One line of production code
#[derive(Debug, Clone)]
pub struct SourceLine {
    /// File the line came from
    pub path: PathBuf,
    /// 1-based line number
    pub number: usize,
    /// Full line text
    pub text: String,
    /// Line text with any `//` comment removed
    pub code: String,
    /// Whether the enclosing function is `async`
    pub in_async_fn: bool,
}

impl SourceLine {
    /// Render as `path:line - label: text`
    #[must_use]
    pub fn describe(&self, label: &str) -> String {
        format!(
            "{}:{} - {}: {}",
            self.path.display(),
            self.number,
            label,
            self.text.trim()
        )
    }
}

/// Workspace root, resolved from this package's manifest directory
#[must_use]
pub fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
}

/// All `.rs` files under the production roots
#[must_use]
pub fn production_files() -> Vec<PathBuf> {
    let root = workspace_root();
    let mut files = Vec::new();

    for dir in PRODUCTION_DIRS {
        let path = root.join(dir);
        assert!(path.exists(), "production source root missing: {}", path.display());

        for entry in walkdir::WalkDir::new(&path)
            .into_iter()
            .filter_map(Result::ok)
        {
            if entry.path().extension().and_then(|s| s.to_str()) == Some("rs") {
                files.push(entry.into_path());
            }
        }
    }

    files.sort();
    files
}

/// Production lines of every production file
#[must_use]
pub fn production_lines() -> Vec<SourceLine> {
    production_files()
        .iter()
        .flat_map(|path| {
            let content = fs::read_to_string(path).unwrap_or_default();
            scan_source(path, &content)
        })
        .collect()
}

/// Split `content` into production lines, stopping at `#[cfg(test)]`
#[must_use]
pub fn scan_source(path: &Path, content: &str) -> Vec<SourceLine> {
    let mut lines = Vec::new();
    let mut in_async_fn = false;

    for (idx, text) in content.lines().enumerate() {
        let trimmed = text.trim();
        if trimmed.starts_with("#[cfg(test)]") {
            break;
        }
        if trimmed.starts_with("//") {
            continue;
        }

        if let Some(is_async) = fn_signature(trimmed) {
            in_async_fn = is_async;
        } else if trimmed.starts_with("impl ") || trimmed.starts_with("mod ") {
            in_async_fn = false;
        }

        let code = text.split("//").next().unwrap_or(text).to_string();
        lines.push(SourceLine {
            path: path.to_path_buf(),
            number: idx + 1,
            text: text.to_string(),
            code,
            in_async_fn,
        });
    }

    lines
}

/// If `line` opens a function, whether that function is `async`
#[must_use]
pub fn fn_signature(line: &str) -> Option<bool> {
    let mut rest = line;
    for prefix in ["pub(crate) ", "pub(super) ", "pub ", "const ", "unsafe "] {
        rest = rest.strip_prefix(prefix).unwrap_or(rest);
    }

    if rest.starts_with("async fn ") {
        Some(true)
    } else if rest.starts_with("fn ") {
        Some(false)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fn_signature() {
        assert_eq!(fn_signature("fn main() {"), Some(false));
        assert_eq!(fn_signature("pub fn load_config_with_env<F>("), Some(false));
        assert_eq!(fn_signature("pub async fn send(&self) {"), Some(true));
        assert_eq!(fn_signature("async fn stream_reply("), Some(true));
        assert_eq!(fn_signature("let f = fn_ptr;"), None);
        assert_eq!(fn_signature("impl ChatSession {"), None);
    }

    #[test]
    fn test_async_scope_tracking() {
        let source = "\
pub fn load() {
    std::fs::read_to_string(\"a\");
}

pub async fn send() {
    std::fs::read_to_string(\"b\");
}
";
        let lines = scan_source(Path::new("x.rs"), source);

        assert!(!lines[1].in_async_fn);
        assert!(lines[5].in_async_fn);
    }

    #[test]
    fn test_scan_stops_at_test_module() {
        let source = "\
fn a() {}

#[cfg(test)]
mod tests {
    fn b() { x.unwrap(); }
}
";
        let lines = scan_source(Path::new("x.rs"), source);

        assert_eq!(lines.len(), 2);
        assert!(lines.iter().all(|l| !l.code.contains("unwrap")));
    }

    #[test]
    fn test_comments_are_stripped() {
        let lines = scan_source(Path::new("x.rs"), "let x = 1; // std::fs::read\n");
        assert!(!lines[0].code.contains("std::fs"));
    }

    #[test]
    fn test_production_roots_exist() {
        assert!(!production_files().is_empty());
    }
}
