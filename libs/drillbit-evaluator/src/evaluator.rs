/// Submission Evaluator - Scoring a Submission Against Its Test Cases
///
/// **Core Responsibility:**
/// Locate the entry point, run it once per test case through an execution
/// engine, normalize and compare outputs, and tally the verdicts.
///
/// **Critical Properties:**
/// - Never fails: every problem becomes a failing outcome
/// - One outcome per test case, in input order
/// - No state survives a call; identical inputs give identical results
/// - Test cases run sequentially, each in a fresh engine context
///
/// **Outcome Rules (first match wins):**
/// 1. Submission too large → `runtime_error` for every test case
/// 2. No entry point → `no_entry_point` for every test case, `actual` is the
///    user-facing "No function found" message
/// 3. Input too large → `runtime_error`
/// 4. Submission threw or engine failed → `runtime_error`, `actual` is
///    `"Error: <message>"`
/// 5. Wall-clock timeout → `time_limit_exceeded`, `actual` is `"Error: ..."`
/// 6. Otherwise `passed` or `wrong_answer` by normalized string equality

use crate::compare::{canonicalize, compare, render_expected};
use crate::engine::{build_engine, BoaEngine, ExecutionEngine, ExecutionLimits};
use crate::error::EngineError;
use crate::extract::find_entry_point;
use crate::harness::{Harness, HarnessReport};
use crate::input::{arguments_for, input_size};
use drillbit_common::config::EvaluatorConfig;
use drillbit_common::types::{EvaluationResult, OutcomeStatus, TestCase, TestOutcome};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct Evaluator {
    engine: Arc<dyn ExecutionEngine>,
    limits: ExecutionLimits,
    entry_point_hint: Option<String>,
    max_submission_bytes: usize,
    max_input_bytes: usize,
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new(Arc::new(BoaEngine::new()))
    }
}

impl Evaluator {
    /// Evaluator with default limits on the given engine
    pub fn new(engine: Arc<dyn ExecutionEngine>) -> Self {
        let defaults = EvaluatorConfig::default();
        Self {
            engine,
            limits: ExecutionLimits::from(&defaults),
            entry_point_hint: defaults.entry_point_hint,
            max_submission_bytes: defaults.max_submission_bytes,
            max_input_bytes: defaults.max_input_bytes,
        }
    }

    pub fn from_config(config: &EvaluatorConfig) -> Self {
        Self {
            engine: build_engine(config),
            limits: ExecutionLimits::from(config),
            entry_point_hint: config.entry_point_hint.clone(),
            max_submission_bytes: config.max_submission_bytes,
            max_input_bytes: config.max_input_bytes,
        }
    }

    pub fn with_limits(mut self, limits: ExecutionLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_entry_point_hint(mut self, hint: impl Into<String>) -> Self {
        self.entry_point_hint = Some(hint.into());
        self
    }

    pub fn engine_name(&self) -> &'static str {
        self.engine.name()
    }

    /// Evaluate a submission against its test cases
    #[instrument(
        skip_all,
        fields(run_id = %Uuid::new_v4(), engine = self.engine.name(), test_cases = test_cases.len())
    )]
    pub async fn evaluate(&self, submission: &str, test_cases: &[TestCase]) -> EvaluationResult {
        info!(submission_bytes = submission.len(), "Evaluating submission");

        if submission.len() > self.max_submission_bytes {
            warn!(
                submission_bytes = submission.len(),
                limit = self.max_submission_bytes,
                "Submission rejected by size guard"
            );
            let message = format!(
                "Error: Submission exceeds maximum size of {} bytes",
                self.max_submission_bytes
            );
            return fail_all(test_cases, OutcomeStatus::RuntimeError, &message);
        }

        let entry_point = match find_entry_point(submission, self.entry_point_hint.as_deref()) {
            Ok(binding) => binding,
            Err(e) => {
                warn!("No entry point found in submission");
                return fail_all(test_cases, OutcomeStatus::NoEntryPoint, &e.to_string());
            }
        };

        debug!(
            entry_point = %entry_point.name,
            kind = ?entry_point.kind,
            offset = entry_point.offset,
            "Entry point selected"
        );

        let mut outcomes = Vec::with_capacity(test_cases.len());
        for (index, test_case) in test_cases.iter().enumerate() {
            let start = Instant::now();
            let outcome = self.run_test(submission, &entry_point.name, test_case).await;

            debug!(
                test_num = index + 1,
                status = ?outcome.status,
                execution_ms = start.elapsed().as_millis() as u64,
                "Test result"
            );
            outcomes.push(outcome);
        }

        let result = EvaluationResult::from_outcomes(outcomes);
        info!(
            passed = result.passed_tests,
            total = result.total_tests,
            score = result.score(),
            "Evaluation complete"
        );
        result
    }

    async fn run_test(&self, submission: &str, entry_point: &str, test_case: &TestCase) -> TestOutcome {
        if input_size(test_case) > self.max_input_bytes {
            let message = format!(
                "Error: Test input exceeds maximum size of {} bytes",
                self.max_input_bytes
            );
            return failed_outcome(test_case, OutcomeStatus::RuntimeError, message);
        }

        let harness = Harness::build(submission, entry_point, &arguments_for(test_case));

        match self.engine.execute(&harness, &self.limits).await {
            Ok(HarnessReport::Returned { actual }) => judge(test_case, &actual),
            Ok(HarnessReport::Threw { message }) => {
                failed_outcome(test_case, OutcomeStatus::RuntimeError, format!("Error: {}", message))
            }
            Err(e @ EngineError::TimedOut { .. }) => {
                warn!(limit_ms = self.limits.timeout_ms, "Execution timed out; test cannot pass");
                failed_outcome(test_case, OutcomeStatus::TimeLimitExceeded, format!("Error: {}", e))
            }
            Err(e) => {
                warn!(error = %e, "Execution failed; test cannot pass");
                failed_outcome(test_case, OutcomeStatus::RuntimeError, format!("Error: {}", e))
            }
        }
    }
}

/// Evaluate with the embedded interpreter and default limits
pub async fn evaluate(submission: &str, test_cases: &[TestCase]) -> EvaluationResult {
    Evaluator::default().evaluate(submission, test_cases).await
}

/// Compare a returned value against a test case's expectation
pub fn judge(test_case: &TestCase, actual: &str) -> TestOutcome {
    let comparison = compare(actual, &test_case.expected);
    let status = if comparison.passed {
        OutcomeStatus::Passed
    } else {
        OutcomeStatus::WrongAnswer
    };

    TestOutcome {
        input: test_case.input.clone(),
        expected: comparison.expected,
        actual: comparison.actual,
        passed: comparison.passed,
        status,
    }
}

fn failed_outcome(test_case: &TestCase, status: OutcomeStatus, actual: String) -> TestOutcome {
    TestOutcome {
        input: test_case.input.clone(),
        expected: canonicalize(&render_expected(&test_case.expected)),
        actual,
        passed: false,
        status,
    }
}

fn fail_all(test_cases: &[TestCase], status: OutcomeStatus, actual: &str) -> EvaluationResult {
    EvaluationResult::from_outcomes(
        test_cases
            .iter()
            .map(|test_case| failed_outcome(test_case, status, actual.to_string()))
            .collect(),
    )
}
