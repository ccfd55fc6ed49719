//! Core data model types for workerlab.
//!
//! These are the values that flow through a run: the learner's submission,
//! declarative test cases supplied by exercise content, the captured
//! execution result, and the verdict rendered against it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Source code submitted for one run. Never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    /// The module source, expected to default-export a `fetch` handler.
    pub source_text: String,
}

impl Submission {
    pub fn new(source_text: impl Into<String>) -> Self {
        Self {
            source_text: source_text.into(),
        }
    }
}

/// Declarative description of the request a test sends.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestSpec {
    /// HTTP method; `GET` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    /// Path plus optional query string, e.g. `/?name=Jordan`.
    pub path: String,
    /// Raw request body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl RequestSpec {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: None,
            path: path.into(),
            body: None,
        }
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }
}

/// What a test checks about the captured response.
///
/// Every present criterion must hold. With no criteria at all the
/// verdict is vacuously a pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Expectation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_equals: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_contains: Option<String>,
}

impl Expectation {
    /// Returns `true` if no criterion is set.
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.body_equals.is_none() && self.body_contains.is_none()
    }
}

/// A named request/expectation pair supplied by exercise content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    pub name: String,
    pub request: RequestSpec,
    #[serde(default, alias = "expect")]
    pub expectation: Expectation,
}

/// Classification of a failure that originated in submitted code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureKind {
    /// The entrypoint threw, rejected, failed to load, or returned a non-response.
    ExecutionError,
    /// The entrypoint did not finish within the time budget.
    Timeout,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::ExecutionError => write!(f, "ExecutionError"),
            FailureKind::Timeout => write!(f, "Timeout"),
        }
    }
}

/// A failure captured as data rather than propagated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    pub kind: FailureKind,
    pub message: String,
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// What one invocation of a sandboxed entrypoint produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    /// Response status; absent when the invocation failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    /// Response body text; empty when the invocation failed.
    #[serde(default)]
    pub body: String,
    /// Wall-clock duration of the call in milliseconds.
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<Failure>,
}

impl ExecutionResult {
    pub fn completed(status: u16, body: String, duration_ms: u64) -> Self {
        Self {
            status: Some(status),
            body,
            duration_ms,
            failure: None,
        }
    }

    pub fn failed(kind: FailureKind, message: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            status: None,
            body: String::new(),
            duration_ms,
            failure: Some(Failure {
                kind,
                message: message.into(),
            }),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.failure.is_some()
    }
}

/// The pass/fail judgment for one (submission, test case) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Verdict {
    pub test_name: String,
    pub passed: bool,
    pub reason: String,
    pub result: ExecutionResult,
}

/// Status reported at the `/run` boundary when submitted code failed.
pub const EXECUTION_FAILURE_STATUS: u16 = 500;

/// Wire shape of a single `/run` invocation result.
///
/// Failures from submitted code are folded into a synthetic 500 response
/// so the caller renders them as a failed run rather than a broken harness.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunOutcome {
    pub status: u16,
    pub body: String,
    pub duration: u64,
}

impl From<&ExecutionResult> for RunOutcome {
    fn from(result: &ExecutionResult) -> Self {
        match &result.failure {
            Some(failure) => RunOutcome {
                status: EXECUTION_FAILURE_STATUS,
                body: format!("Error: {}", failure.message),
                duration: result.duration_ms,
            },
            None => RunOutcome {
                status: result.status.unwrap_or(EXECUTION_FAILURE_STATUS),
                body: result.body.clone(),
                duration: result.duration_ms,
            },
        }
    }
}

/// One graded exercise as supplied by lesson content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Exercise {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Starter code shown to the learner.
    #[serde(default)]
    pub initial: String,
    /// Reference solution; grading it must pass every test.
    pub solution: String,
    #[serde(default)]
    pub tests: Vec<TestCase>,
}
