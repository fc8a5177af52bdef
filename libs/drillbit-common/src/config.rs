// Evaluator configuration: config/evaluator.json plus environment overrides
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

pub const DEFAULT_CONFIG_PATH: &str = "config/evaluator.json";

/// Backend used to run submissions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    /// Embedded ECMAScript interpreter, no host access
    Boa,
    /// `node` child process
    Node,
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineKind::Boa => write!(f, "boa"),
            EngineKind::Node => write!(f, "node"),
        }
    }
}

impl FromStr for EngineKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "boa" => Ok(EngineKind::Boa),
            "node" => Ok(EngineKind::Node),
            other => bail!("Unknown engine '{}' (valid options: boa, node)", other),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluatorConfig {
    pub engine: EngineKind,
    /// Wall-clock budget per test case
    pub timeout_ms: u64,
    pub loop_iteration_limit: u64,
    pub recursion_limit: usize,
    /// Interpreter instructions per test case; bounds work that outlives a timeout
    pub instruction_budget: u64,
    pub node_binary: String,
    pub node_max_old_space_mb: u32,
    /// Name preferred when a submission binds several top-level functions
    pub entry_point_hint: Option<String>,
    pub max_submission_bytes: usize,
    pub max_input_bytes: usize,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            engine: EngineKind::Boa,
            timeout_ms: 1000,
            loop_iteration_limit: 5_000_000,
            recursion_limit: 512,
            instruction_budget: 200_000_000,
            node_binary: "node".to_string(),
            node_max_old_space_mb: 128,
            entry_point_hint: None,
            max_submission_bytes: 64 * 1024,
            max_input_bytes: 1024 * 1024,
        }
    }
}

impl EvaluatorConfig {
    /// Load configuration from a JSON file
    pub fn load(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            bail!("Evaluator config file not found: {}", config_path.display());
        }

        let content = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;

        let config: EvaluatorConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", config_path.display()))?;

        info!(path = %config_path.display(), engine = %config.engine, "Loaded evaluator config");
        Ok(config)
    }

    /// Load config/evaluator.json when present, defaults otherwise, then
    /// apply environment overrides
    pub fn load_default() -> Result<Self> {
        let default_path = Path::new(DEFAULT_CONFIG_PATH);
        let config = if default_path.exists() {
            Self::load(default_path)?
        } else {
            debug!("No {} found, using built-in defaults", DEFAULT_CONFIG_PATH);
            Self::default()
        };
        config.with_env_overrides()
    }

    /// Apply `DRILLBIT_*` environment variables on top of this config
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(engine) = lookup("DRILLBIT_ENGINE") {
            self.engine = engine.parse().context("Invalid DRILLBIT_ENGINE")?;
        }
        if let Some(timeout) = lookup("DRILLBIT_TIMEOUT_MS") {
            self.timeout_ms = timeout
                .trim()
                .parse()
                .with_context(|| format!("Invalid DRILLBIT_TIMEOUT_MS: {}", timeout))?;
        }
        if let Some(node) = lookup("DRILLBIT_NODE_BIN") {
            self.node_binary = node;
        }
        if let Some(hint) = lookup("DRILLBIT_ENTRY_POINT") {
            let hint = hint.trim().to_string();
            self.entry_point_hint = if hint.is_empty() { None } else { Some(hint) };
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.timeout_ms == 0 {
            bail!("timeout_ms must be greater than zero");
        }
        if self.instruction_budget == 0 {
            bail!("instruction_budget must be greater than zero");
        }
        if self.max_submission_bytes == 0 {
            bail!("max_submission_bytes must be greater than zero");
        }
        Ok(())
    }
}
