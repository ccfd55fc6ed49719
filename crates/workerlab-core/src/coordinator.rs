//! Run coordinator: the entry point that drives
//! provisioning → synthesis → invocation → verdict for each run.
//!
//! Every invocation gets its own freshly provisioned sandbox. Nothing is
//! shared between runs except the substrate and the id generator.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};

use crate::error::HarnessError;
use crate::invoker::{invoke, DEFAULT_TIME_BUDGET};
use crate::model::{ExecutionResult, RequestSpec, Submission, TestCase, Verdict};
use crate::provision::{Provisioner, DEFAULT_MAX_SOURCE_BYTES};
use crate::synth::synthesize;
use crate::traits::IsolationSubstrate;
use crate::verdict::judge;

/// Default compatibility tag handed to the substrate.
pub const DEFAULT_COMPATIBILITY_TAG: &str = "2025-01-01";

/// Configuration for the run coordinator.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Wall-clock budget for each entrypoint call.
    pub time_budget: Duration,
    /// Maximum sandboxes alive at once during batch grading.
    pub parallelism: usize,
    /// Compatibility tag passed to every provisioned sandbox.
    pub compatibility_tag: String,
    /// Largest accepted submission, in bytes.
    pub max_source_bytes: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            time_budget: DEFAULT_TIME_BUDGET,
            parallelism: 4,
            compatibility_tag: DEFAULT_COMPATIBILITY_TAG.to_string(),
            max_source_bytes: DEFAULT_MAX_SOURCE_BYTES,
        }
    }
}

/// Coordinates runs of submissions against test cases.
pub struct RunCoordinator {
    provisioner: Provisioner,
    config: RunConfig,
}

impl RunCoordinator {
    pub fn new(substrate: Arc<dyn IsolationSubstrate>, config: RunConfig) -> Self {
        let provisioner =
            Provisioner::new(substrate).with_max_source_bytes(config.max_source_bytes);
        Self {
            provisioner,
            config,
        }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn substrate_name(&self) -> &str {
        self.provisioner.substrate_name()
    }

    /// Run one request against a fresh sandbox without judging it.
    pub async fn execute(
        &self,
        submission: &Submission,
        request: &RequestSpec,
    ) -> Result<ExecutionResult, HarnessError> {
        let mut handle = self
            .provisioner
            .provision(&submission.source_text, &self.config.compatibility_tag)
            .await?;
        let request = synthesize(request);
        Ok(invoke(&mut handle, &request, self.config.time_budget).await)
    }

    /// Run and judge a single test case.
    pub async fn run(
        &self,
        submission: &Submission,
        test_case: &TestCase,
    ) -> Result<Verdict, HarnessError> {
        let result = self.execute(submission, &test_case.request).await?;
        let verdict = judge(&test_case.name, &result, &test_case.expectation);
        tracing::info!(
            test = %test_case.name,
            passed = verdict.passed,
            duration_ms = result.duration_ms,
            "test graded"
        );
        Ok(verdict)
    }

    /// Run and judge every test case, each in its own sandbox.
    ///
    /// Verdicts come back in input order. Graded failures never stop the
    /// batch; only harness errors abort it.
    pub async fn run_all(
        &self,
        submission: &Submission,
        test_cases: &[TestCase],
    ) -> Result<Vec<Verdict>, HarnessError> {
        self.provisioner.validate(&submission.source_text)?;

        let parallelism = self.config.parallelism.max(1);
        let verdicts: Vec<Result<Verdict, HarnessError>> =
            stream::iter(test_cases.iter().cloned())
                .map(|case| async move { self.run(submission, &case).await })
                .buffered(parallelism)
                .collect()
                .await;

        let verdicts = verdicts.into_iter().collect::<Result<Vec<_>, _>>()?;
        let passed = verdicts.iter().filter(|v| v.passed).count();
        tracing::info!(total = verdicts.len(), passed, "batch graded");
        Ok(verdicts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EntrypointError;
    use crate::mock::{MockBehavior, MockSubstrate};
    use crate::model::{Expectation, FailureKind};
    use crate::traits::EntrypointResponse;

    fn coordinator(substrate: Arc<MockSubstrate>) -> RunCoordinator {
        RunCoordinator::new(substrate, RunConfig::default())
    }

    fn case(name: &str, path: &str, body_equals: &str) -> TestCase {
        TestCase {
            name: name.into(),
            request: RequestSpec::get(path),
            expectation: Expectation {
                status: Some(200),
                body_equals: Some(body_equals.into()),
                body_contains: None,
            },
        }
    }

    fn greeter() -> MockBehavior {
        MockBehavior::handler(|req| {
            let name = req
                .url
                .split_once("name=")
                .map(|(_, n)| n.to_string())
                .unwrap_or_else(|| "World".to_string());
            Ok(EntrypointResponse {
                status: 200,
                body: format!("Hello, {name}!"),
            })
        })
    }

    #[tokio::test]
    async fn hello_world_is_case_sensitive() {
        let substrate = Arc::new(MockSubstrate::new(MockBehavior::respond(
            200,
            "Hello World!",
        )));
        let coordinator = coordinator(substrate);
        let submission = Submission::new("export default {}");

        let exact = coordinator
            .run(&submission, &case("exact", "/", "Hello World!"))
            .await
            .unwrap();
        assert!(exact.passed);

        let lower = coordinator
            .run(&submission, &case("lower", "/", "hello world!"))
            .await
            .unwrap();
        assert!(!lower.passed);
    }

    #[tokio::test]
    async fn query_parameter_echo() {
        let submission = Submission::new("export default {}");
        let test = case("personalized", "/?name=Jordan", "Hello, Jordan!");

        let echo = coordinator(Arc::new(MockSubstrate::new(greeter())));
        assert!(echo.run(&submission, &test).await.unwrap().passed);

        let baseline = coordinator(Arc::new(MockSubstrate::new(MockBehavior::respond(
            200,
            "Hello, World!",
        ))));
        let verdict = baseline.run(&submission, &test).await.unwrap();
        assert!(!verdict.passed);
        assert!(verdict.reason.contains("\"Hello, Jordan!\""));
        assert!(verdict.reason.contains("\"Hello, World!\""));
    }

    #[tokio::test]
    async fn thrown_error_is_a_failing_verdict() {
        let substrate = Arc::new(MockSubstrate::new(MockBehavior::Throw(
            "Error: kaboom".into(),
        )));
        let verdict = coordinator(substrate)
            .run(&Submission::new("throw"), &case("throws", "/", "ok"))
            .await
            .unwrap();
        assert!(!verdict.passed);
        assert!(verdict.reason.contains("ExecutionError"));
        assert!(verdict.reason.contains("kaboom"));
    }

    #[tokio::test(start_paused = true)]
    async fn infinite_loop_times_out_in_batch() {
        let substrate = Arc::new(MockSubstrate::new(MockBehavior::Hang));
        let config = RunConfig {
            time_budget: Duration::from_secs(2),
            ..Default::default()
        };
        let coordinator = RunCoordinator::new(substrate.clone(), config);
        let tests = vec![case("a", "/", "x"), case("b", "/", "y"), case("c", "/", "z")];

        let verdicts = coordinator
            .run_all(&Submission::new("while(true){}"), &tests)
            .await
            .unwrap();
        assert_eq!(verdicts.len(), 3);
        for v in &verdicts {
            assert!(!v.passed);
            let failure = v.result.failure.as_ref().unwrap();
            assert_eq!(failure.kind, FailureKind::Timeout);
            assert_eq!(v.result.duration_ms, 2000);
        }
        assert_eq!(substrate.terminations(), 3);
    }

    #[tokio::test]
    async fn runs_do_not_share_state() {
        let substrate = Arc::new(MockSubstrate::new(MockBehavior::CountCalls));
        let coordinator = coordinator(substrate.clone());
        let submission = Submission::new("let n = 0; export default {}");
        let test = case("first call", "/", "1");

        let first = coordinator.run(&submission, &test).await.unwrap();
        let second = coordinator.run(&submission, &test).await.unwrap();
        assert!(first.passed);
        assert!(second.passed);
        assert_eq!(first.result.body, second.result.body);
        assert_eq!(first.result.status, second.result.status);

        let verdicts = coordinator
            .run_all(&submission, &[test.clone(), test.clone(), test])
            .await
            .unwrap();
        assert!(verdicts.iter().all(|v| v.passed));

        let ids = substrate.loaded_ids();
        assert_eq!(ids.len(), 5);
        let unique: std::collections::HashSet<_> = ids.iter().collect();
        assert_eq!(unique.len(), 5);
    }

    #[tokio::test]
    async fn batch_preserves_order_and_does_not_short_circuit() {
        let substrate = Arc::new(MockSubstrate::new(MockBehavior::handler(|req| {
            if req.url.ends_with("/boom") {
                return Err(EntrypointError::new("Error: boom"));
            }
            let path = req.url.trim_start_matches("http://test");
            Ok(EntrypointResponse {
                status: 200,
                body: path.to_string(),
            })
        })));
        let coordinator = coordinator(substrate);
        let tests = vec![
            case("one", "/one", "/one"),
            case("boom", "/boom", "/boom"),
            case("wrong", "/two", "/nope"),
            case("three", "/three", "/three"),
        ];

        let verdicts = coordinator
            .run_all(&Submission::new("export default {}"), &tests)
            .await
            .unwrap();
        let names: Vec<&str> = verdicts.iter().map(|v| v.test_name.as_str()).collect();
        assert_eq!(names, vec!["one", "boom", "wrong", "three"]);
        let passed: Vec<bool> = verdicts.iter().map(|v| v.passed).collect();
        assert_eq!(passed, vec![true, false, false, true]);
    }

    #[tokio::test]
    async fn empty_submission_is_rejected_before_provisioning() {
        let substrate = Arc::new(MockSubstrate::new(MockBehavior::respond(200, "ok")));
        let coordinator = coordinator(substrate.clone());

        let err = coordinator
            .run_all(&Submission::new(""), &[case("a", "/", "ok")])
            .await
            .unwrap_err();
        assert!(matches!(err, HarnessError::InvalidSubmission(_)));

        let err = coordinator
            .execute(&Submission::new(" "), &RequestSpec::get("/"))
            .await
            .unwrap_err();
        assert!(matches!(err, HarnessError::InvalidSubmission(_)));
        assert_eq!(substrate.load_count(), 0);
    }

    #[tokio::test]
    async fn provision_failure_is_a_harness_error() {
        let substrate = Arc::new(
            MockSubstrate::new(MockBehavior::respond(200, "ok")).failing_loads(2, true),
        );
        let err = coordinator(substrate)
            .run(&Submission::new("code"), &case("a", "/", "ok"))
            .await
            .unwrap_err();
        assert!(matches!(err, HarnessError::ProvisionFailed(_)));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn empty_batch_returns_no_verdicts() {
        let substrate = Arc::new(MockSubstrate::new(MockBehavior::respond(200, "ok")));
        let verdicts = coordinator(substrate.clone())
            .run_all(&Submission::new("code"), &[])
            .await
            .unwrap();
        assert!(verdicts.is_empty());
        assert_eq!(substrate.load_count(), 0);
    }
}
