// Node.js child-process engine
use crate::engine::{ExecutionEngine, ExecutionLimits};
use crate::error::EngineError;
use crate::harness::{Harness, HarnessReport};
use async_trait::async_trait;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

/// Runs each harness in its own `node` process.
///
/// The program is piped over stdin, the environment is cleared, the heap is
/// capped, and the process is killed when the wall-clock timeout fires
/// (`kill_on_drop`).
#[derive(Debug, Clone)]
pub struct NodeEngine {
    binary: String,
    max_old_space_mb: u32,
}

impl NodeEngine {
    pub fn new(binary: impl Into<String>, max_old_space_mb: u32) -> Self {
        Self {
            binary: binary.into(),
            max_old_space_mb,
        }
    }
}

#[async_trait]
impl ExecutionEngine for NodeEngine {
    fn name(&self) -> &'static str {
        "node"
    }

    async fn execute(
        &self,
        harness: &Harness,
        limits: &ExecutionLimits,
    ) -> Result<HarnessReport, EngineError> {
        let mut child = Command::new(&self.binary)
            .arg(format!("--max-old-space-size={}", self.max_old_space_mb))
            .arg("-")
            .env_clear()
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| EngineError::Unavailable(format!("failed to start '{}': {}", self.binary, e)))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| EngineError::Unavailable("child stdin was not captured".to_string()))?;
        let program = harness.stdout_program();

        let run = async move {
            stdin.write_all(program.as_bytes()).await?;
            drop(stdin);
            child.wait_with_output().await
        };

        // Dropping `run` on timeout drops the child, which kills it
        let output = match tokio::time::timeout(limits.timeout(), run).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                warn!(error = %e, "Node process I/O failed");
                return Err(EngineError::Unavailable(format!("node process I/O failed: {}", e)));
            }
            Err(_) => {
                debug!(timeout_ms = limits.timeout_ms, "Node process timed out");
                return Err(EngineError::TimedOut {
                    limit_ms: limits.timeout_ms,
                });
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let message = stderr
                .lines()
                .map(str::trim)
                .find(|line| line.contains("Error"))
                .or_else(|| stderr.lines().map(str::trim).find(|line| !line.is_empty()))
                .unwrap_or("node exited without output")
                .to_string();
            return Err(EngineError::Aborted(message));
        }

        HarnessReport::from_stdout(&String::from_utf8_lossy(&output.stdout))
    }
}
