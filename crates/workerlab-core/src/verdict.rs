//! Verdict engine: judge a captured execution result against an expectation.

use crate::model::{ExecutionResult, Expectation, Verdict};

/// Longest value quoted verbatim in a failure reason.
const MAX_QUOTED_CHARS: usize = 200;

/// Judge one execution result.
///
/// A failed execution never passes, whatever the expectation says. Otherwise
/// every present criterion is checked and all mismatches are reported.
pub fn judge(test_name: &str, result: &ExecutionResult, expectation: &Expectation) -> Verdict {
    if let Some(failure) = &result.failure {
        return Verdict {
            test_name: test_name.to_string(),
            passed: false,
            reason: failure.to_string(),
            result: result.clone(),
        };
    }

    let mut mismatches = Vec::new();

    if let Some(expected) = expectation.status {
        if result.status != Some(expected) {
            let actual = result
                .status
                .map(|s| s.to_string())
                .unwrap_or_else(|| "no status".to_string());
            mismatches.push(format!("expected status {expected}, got {actual}"));
        }
    }

    if let Some(expected) = &expectation.body_equals {
        if result.body != *expected {
            mismatches.push(format!(
                "expected body {}, got {}",
                quote(expected),
                quote(&result.body)
            ));
        }
    }

    if let Some(needle) = &expectation.body_contains {
        if !result.body.contains(needle.as_str()) {
            mismatches.push(format!("expected body to contain {}", quote(needle)));
        }
    }

    let passed = mismatches.is_empty();
    let reason = if !passed {
        mismatches.join("; ")
    } else if expectation.is_empty() {
        "no expectations to check".to_string()
    } else {
        "all checks passed".to_string()
    };

    Verdict {
        test_name: test_name.to_string(),
        passed,
        reason,
        result: result.clone(),
    }
}

/// Quote a value for a reason string, truncating long values.
fn quote(value: &str) -> String {
    if value.chars().count() <= MAX_QUOTED_CHARS {
        return format!("{value:?}");
    }
    let head: String = value.chars().take(MAX_QUOTED_CHARS).collect();
    format!("{head:?}... ({} chars total)", value.chars().count())
}
