//! Integration Test: Sleep Prohibition
//!
//! **Policy**: production code never sleeps. Streams are driven by the
//! body, cancellation by `CancellationToken`, and observers by the watch
//! channel; there is nothing to poll.

use architectural_enforcement::production_lines;

#[test]
fn test_no_sleep_in_production_code() {
    let violations: Vec<String> = production_lines()
        .iter()
        .filter(|line| line.code.contains("::sleep(") || line.code.contains(".sleep("))
        .map(|line| line.describe("Sleep call"))
        .collect();

    if !violations.is_empty() {
        eprintln!("\nSleep calls found in production code:\n");
        for violation in &violations {
            eprintln!("  {violation}");
        }
        eprintln!("\nWait on I/O, a CancellationToken or a watch channel instead.");

        panic!("Found {} sleep violation(s)", violations.len());
    }
}

#[test]
fn test_no_unwrap_in_production_code() {
    let violations: Vec<String> = production_lines()
        .iter()
        .filter(|line| line.code.contains(".unwrap()") || line.code.contains(".expect("))
        .map(|line| line.describe("Panicking unwrap"))
        .collect();

    assert!(
        violations.is_empty(),
        "Propagate errors instead of unwrapping:\n{violations:#?}"
    );
}
