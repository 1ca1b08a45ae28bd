//! Integration Test: Blocking I/O Prohibition
//!
//! **Policy**: async functions in the chat crates MUST NOT block the runtime.
//! **Required**: `tokio::fs`, `tokio::net`, `tokio::io`, async `reqwest`.
//!
//! Synchronous functions may block; configuration is loaded that way before
//! any exchange starts.

use architectural_enforcement::{production_lines, SourceLine};

const BLOCKING_CALLS: &[(&str, &str)] = &[
    ("std::fs::", "Blocking file I/O"),
    ("std::net::", "Blocking network I/O"),
    ("std::process::Command", "Blocking process I/O"),
    ("std::io::stdin()", "Blocking stdin"),
    ("std::io::stdout()", "Blocking stdout"),
    ("std::thread::sleep", "Blocking sleep"),
];

#[test]
fn test_no_blocking_io_in_async_code() {
    let violations: Vec<String> = production_lines()
        .iter()
        .filter(|line| line.in_async_fn)
        .filter_map(blocking_violation)
        .collect();

    if !violations.is_empty() {
        eprintln!("\nBlocking I/O inside async functions:\n");
        for violation in &violations {
            eprintln!("  {violation}");
        }
        eprintln!("\nUse tokio::fs, tokio::net, tokio::io or move the call into a sync fn.");

        panic!("Found {} blocking I/O violation(s)", violations.len());
    }
}

#[test]
fn test_no_blocking_http_client() {
    let violations: Vec<String> = production_lines()
        .iter()
        .filter(|line| line.code.contains("reqwest::blocking"))
        .map(|line| line.describe("Blocking HTTP client"))
        .collect();

    assert!(violations.is_empty(), "{violations:#?}");
}

fn blocking_violation(line: &SourceLine) -> Option<String> {
    BLOCKING_CALLS
        .iter()
        .find(|(pattern, _)| line.code.contains(pattern))
        .map(|(_, label)| line.describe(label))
}

#[test]
fn test_detector_flags_blocking_read_in_async_fn() {
    let source = "\
pub async fn attach(path: &Path) {
    let text = std::fs::read_to_string(path);
}
";
    let lines = architectural_enforcement::scan_source(std::path::Path::new("x.rs"), source);
    let flagged: Vec<_> = lines
        .iter()
        .filter(|l| l.in_async_fn)
        .filter_map(blocking_violation)
        .collect();

    assert_eq!(flagged.len(), 1);
    assert!(flagged[0].contains("Blocking file I/O"));
}

#[test]
fn test_detector_allows_sync_config_loading() {
    let source = "\
pub fn load_config_with_env<F>(path: Option<PathBuf>, env: F)
where
    F: Fn(&str) -> Option<String>,
{
    let toml = std::fs::read_to_string(path);
}
";
    let lines = architectural_enforcement::scan_source(std::path::Path::new("x.rs"), source);

    assert!(lines.iter().all(|l| !l.in_async_fn));
}
