/// Execution Engine - Abstraction for Running Submissions
///
/// **Core Responsibility:**
/// Run one harness script and hand back the harness report.
///
/// **Critical Architectural Boundary:**
/// - Engine knows HOW to execute (embedded interpreter, child process)
/// - Engine does NOT extract entry points or materialize inputs
/// - Engine does NOT compare outputs
/// - Engine returns the raw report for the Evaluator to judge
///
/// **Isolation:**
/// Every call gets a brand-new interpreter context (or process), so nothing
/// a submission does can leak into another test case or another evaluation.

use crate::error::EngineError;
use crate::harness::{Harness, HarnessReport};
use crate::node::NodeEngine;
use async_trait::async_trait;
use boa_engine::{Context, Source};
use drillbit_common::config::{EngineKind, EvaluatorConfig};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, warn};

/// Interpreter threads need headroom for deeply nested user code
const INTERPRETER_STACK_BYTES: usize = 16 * 1024 * 1024;

/// Resource limits applied to a single test-case execution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionLimits {
    pub timeout_ms: u64,
    pub loop_iteration_limit: u64,
    pub recursion_limit: usize,
    /// VM instructions one execution may run before it is aborted
    pub instruction_budget: u64,
}

impl Default for ExecutionLimits {
    fn default() -> Self {
        Self::from(&EvaluatorConfig::default())
    }
}

impl From<&EvaluatorConfig> for ExecutionLimits {
    fn from(config: &EvaluatorConfig) -> Self {
        Self {
            timeout_ms: config.timeout_ms,
            loop_iteration_limit: config.loop_iteration_limit,
            recursion_limit: config.recursion_limit,
            instruction_budget: config.instruction_budget,
        }
    }
}

impl ExecutionLimits {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[async_trait]
pub trait ExecutionEngine: std::fmt::Debug + Send + Sync {
    fn name(&self) -> &'static str;

    async fn execute(
        &self,
        harness: &Harness,
        limits: &ExecutionLimits,
    ) -> Result<HarnessReport, EngineError>;
}

/// Build the engine selected in the configuration
pub fn build_engine(config: &EvaluatorConfig) -> Arc<dyn ExecutionEngine> {
    match config.engine {
        EngineKind::Boa => Arc::new(BoaEngine::new()),
        EngineKind::Node => Arc::new(NodeEngine::new(
            config.node_binary.clone(),
            config.node_max_old_space_mb,
        )),
    }
}

/// Embedded ECMAScript interpreter (Boa)
///
/// **Execution Rules:**
/// 1. Each call spawns a dedicated interpreter thread with a fresh `Context`
/// 2. Loop-iteration and recursion limits stop runaway scripts inside the VM
/// 3. A wall-clock timeout races the thread; on expiry the call returns
///    `TimedOut` right away
/// 4. Every context carries an instruction budget, so a timed-out thread
///    stops on its own once the budget runs out, nested loops included
/// 5. The context exposes no host I/O, filesystem, or network
#[derive(Debug, Default, Clone)]
pub struct BoaEngine {
    live_threads: Arc<AtomicUsize>,
}

impl BoaEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Interpreter threads of this engine that have not finished yet,
    /// including ones whose caller already gave up on them
    pub fn live_threads(&self) -> usize {
        self.live_threads.load(Ordering::SeqCst)
    }
}

/// Counts an interpreter thread as live until it exits
struct LiveThread(Arc<AtomicUsize>);

impl LiveThread {
    fn register(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(counter))
    }
}

impl Drop for LiveThread {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ExecutionEngine for BoaEngine {
    fn name(&self) -> &'static str {
        "boa"
    }

    async fn execute(
        &self,
        harness: &Harness,
        limits: &ExecutionLimits,
    ) -> Result<HarnessReport, EngineError> {
        let script = harness.script().to_string();
        let thread_limits = *limits;
        let (tx, rx) = oneshot::channel();
        let live = LiveThread::register(&self.live_threads);

        std::thread::Builder::new()
            .name("drillbit-boa".to_string())
            .stack_size(INTERPRETER_STACK_BYTES)
            .spawn(move || {
                let result = run_script(&script, &thread_limits);
                drop(live);
                let _ = tx.send(result);
            })
            .map_err(|e| EngineError::Unavailable(format!("failed to spawn interpreter thread: {}", e)))?;

        match tokio::time::timeout(limits.timeout(), rx).await {
            Ok(Ok(result)) => {
                let text = result?;
                HarnessReport::parse(&text)
            }
            Ok(Err(_)) => {
                warn!("Interpreter thread exited without reporting");
                Err(EngineError::Aborted(
                    "interpreter stopped unexpectedly".to_string(),
                ))
            }
            Err(_) => {
                debug!(
                    timeout_ms = limits.timeout_ms,
                    live_threads = self.live_threads(),
                    "Interpreter timed out"
                );
                Err(EngineError::TimedOut {
                    limit_ms: limits.timeout_ms,
                })
            }
        }
    }
}

/// Evaluate the harness in a fresh context and return its report text
fn run_script(script: &str, limits: &ExecutionLimits) -> Result<String, EngineError> {
    let budget = usize::try_from(limits.instruction_budget).unwrap_or(usize::MAX);
    let mut context = Context::builder()
        .instructions_remaining(budget)
        .build()
        .map_err(|e| EngineError::Unavailable(format!("failed to create interpreter context: {}", e)))?;
    context
        .runtime_limits_mut()
        .set_loop_iteration_limit(limits.loop_iteration_limit);
    context
        .runtime_limits_mut()
        .set_recursion_limit(limits.recursion_limit);

    let value = context
        .eval(Source::from_bytes(script))
        .map_err(|e| EngineError::Aborted(e.to_string()))?;

    let text = value
        .to_string(&mut context)
        .map_err(|e| EngineError::Aborted(e.to_string()))?;

    Ok(text.to_std_string_escaped())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::Argument;
    use serde_json::json;

    fn limits(timeout_ms: u64) -> ExecutionLimits {
        ExecutionLimits {
            timeout_ms,
            ..ExecutionLimits::default()
        }
    }

    async fn run(submission: &str, name: &str, args: &[Argument], timeout_ms: u64) -> Result<HarnessReport, EngineError> {
        let harness = Harness::build(submission, name, args);
        BoaEngine::new().execute(&harness, &limits(timeout_ms)).await
    }

    #[tokio::test]
    async fn test_returns_rendered_array() {
        let report = run(
            "function solution(arr) { return arr.slice().reverse(); }",
            "solution",
            &[Argument::Value(json!([1, 2, 3]))],
            5000,
        )
        .await
        .unwrap();

        assert_eq!(report, HarnessReport::Returned { actual: "[3,2,1]".to_string() });
    }

    #[tokio::test]
    async fn test_renders_primitives_with_string() {
        let cases = [
            ("const f = (x) => x * 2;", json!(21), "42"),
            ("const f = (x) => x > 0;", json!(1), "true"),
            ("const f = (x) => null;", json!(1), "null"),
            ("const f = (x) => undefined;", json!(1), "undefined"),
            ("const f = (x) => 'abc';", json!(1), "abc"),
            ("const f = (x) => x / 2;", json!(3), "1.5"),
        ];

        for (source, input, expected) in cases {
            let report = run(source, "f", &[Argument::Value(input)], 5000).await.unwrap();
            assert_eq!(
                report,
                HarnessReport::Returned { actual: expected.to_string() },
                "source: {}",
                source
            );
        }
    }

    #[tokio::test]
    async fn test_literal_argument_is_evaluated() {
        let report = run(
            "function keys(o) { return Object.keys(o).length; }",
            "keys",
            &[Argument::Literal("{a: 1, 'b': 2,}".to_string())],
            5000,
        )
        .await
        .unwrap();

        assert_eq!(report, HarnessReport::Returned { actual: "2".to_string() });
    }

    #[tokio::test]
    async fn test_unparseable_literal_falls_back_to_raw_string() {
        let report = run(
            "function echo(s) { return typeof s + ':' + s; }",
            "echo",
            &[Argument::Literal("hello world".to_string())],
            5000,
        )
        .await
        .unwrap();

        assert_eq!(
            report,
            HarnessReport::Returned { actual: "string:hello world".to_string() }
        );
    }

    #[tokio::test]
    async fn test_thrown_error_is_reported() {
        let report = run(
            "function boom() { throw new Error('kaboom'); }",
            "boom",
            &[Argument::Undefined],
            5000,
        )
        .await
        .unwrap();

        assert_eq!(report, HarnessReport::Threw { message: "kaboom".to_string() });
    }

    #[tokio::test]
    async fn test_syntax_error_is_reported() {
        let report = run("function broken( { return 1; }", "broken", &[], 5000)
            .await
            .unwrap();

        assert!(matches!(report, HarnessReport::Threw { .. }));
    }

    #[tokio::test]
    async fn test_multiple_arguments() {
        let report = run(
            "function add(a, b) { return a + b; }",
            "add",
            &[Argument::Value(json!(2)), Argument::Value(json!(40))],
            5000,
        )
        .await
        .unwrap();

        assert_eq!(report, HarnessReport::Returned { actual: "42".to_string() });
    }

    #[tokio::test]
    async fn test_slow_loop_hits_wall_clock() {
        // Stays under the loop limit, but no build runs 4M iterations in 20ms
        let result = run(
            "function slow() { let s = 0; for (let i = 0; i < 4000000; i++) { s += i; } return s; }",
            "slow",
            &[],
            20,
        )
        .await;

        assert_eq!(result, Err(EngineError::TimedOut { limit_ms: 20 }));
    }

    #[tokio::test]
    async fn test_loop_limit_aborts_script() {
        let engine = BoaEngine::new();
        let harness = Harness::build("function spin() { while (true) {} }", "spin", &[]);
        let limits = ExecutionLimits {
            timeout_ms: 30_000,
            loop_iteration_limit: 1_000,
            ..ExecutionLimits::default()
        };

        let result = engine.execute(&harness, &limits).await;

        assert!(matches!(result, Err(EngineError::Aborted(_))), "unexpected result: {:?}", result);
    }

    #[tokio::test]
    async fn test_instruction_budget_stops_nested_loops() {
        let engine = BoaEngine::new();
        let harness = Harness::build(
            "function nested() { let s = 0; for (let i = 0; i < 4000000; i++) { for (let j = 0; j < 4000000; j++) { s += j; } } return s; }",
            "nested",
            &[],
        );
        let limits = ExecutionLimits {
            timeout_ms: 30_000,
            instruction_budget: 200_000,
            ..ExecutionLimits::default()
        };

        let result = engine.execute(&harness, &limits).await;

        assert!(matches!(result, Err(EngineError::Aborted(_))), "unexpected result: {:?}", result);
        assert_eq!(engine.live_threads(), 0);
    }

    #[tokio::test]
    async fn test_timed_out_threads_drain() {
        let engine = BoaEngine::new();
        let harness = Harness::build(
            "function nested() { let s = 0; for (let i = 0; i < 4000000; i++) { for (let j = 0; j < 4000000; j++) { s += j; } } return s; }",
            "nested",
            &[],
        );
        let limits = ExecutionLimits {
            timeout_ms: 1,
            instruction_budget: 5_000_000,
            ..ExecutionLimits::default()
        };

        for _ in 0..3 {
            let result = engine.execute(&harness, &limits).await;
            assert_eq!(result, Err(EngineError::TimedOut { limit_ms: 1 }));
        }

        let deadline = std::time::Instant::now() + Duration::from_secs(60);
        while engine.live_threads() > 0 && std::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(engine.live_threads(), 0);
    }

    #[tokio::test]
    async fn test_console_calls_are_silent() {
        let report = run(
            "function solution(arr) { console.log(arr); console.error('dbg'); return arr.slice().reverse(); }",
            "solution",
            &[Argument::Value(json!([1, 2, 3]))],
            5000,
        )
        .await
        .unwrap();

        assert_eq!(report, HarnessReport::Returned { actual: "[3,2,1]".to_string() });
    }

    #[tokio::test]
    async fn test_thrown_string_is_reported_as_is() {
        let report = run("function boom() { throw 'x'; }", "boom", &[], 5000)
            .await
            .unwrap();

        assert_eq!(report, HarnessReport::Threw { message: "x".to_string() });
    }

    #[tokio::test]
    async fn test_contexts_are_isolated() {
        let source = "var counter = (globalThis.counter || 0) + 1; globalThis.counter = counter; function f() { return counter; }";

        for _ in 0..2 {
            let report = run(source, "f", &[], 5000).await.unwrap();
            assert_eq!(report, HarnessReport::Returned { actual: "1".to_string() });
        }
    }
}
