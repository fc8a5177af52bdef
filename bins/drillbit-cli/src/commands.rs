// CLI commands for evaluating and inspecting submissions
use anyhow::{bail, Context, Result};
use drillbit_common::config::{EngineKind, EvaluatorConfig, DEFAULT_CONFIG_PATH};
use drillbit_common::types::{load_test_cases, EvaluationResult, TestOutcome};
use drillbit_evaluator::extract::{find_entry_point, top_level_bindings};
use drillbit_evaluator::Evaluator;
use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::info;

/// Command-line values that take precedence over the config file
#[derive(Debug, Default)]
pub struct RunOverrides {
    pub engine: Option<EngineKind>,
    pub timeout_ms: Option<u64>,
    pub entry_point: Option<String>,
}

/// Report printed by `run`: the evaluation result plus the caller-side score
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionReport {
    pub score: u32,
    pub passed_tests: usize,
    pub total_tests: usize,
    pub test_results: Vec<TestOutcome>,
}

impl From<EvaluationResult> for SubmissionReport {
    fn from(result: EvaluationResult) -> Self {
        Self {
            score: result.score(),
            passed_tests: result.passed_tests,
            total_tests: result.total_tests,
            test_results: result.test_results,
        }
    }
}

fn resolve_config(config_path: Option<&Path>, overrides: RunOverrides) -> Result<EvaluatorConfig> {
    let mut config = match config_path {
        Some(path) => EvaluatorConfig::load(path)?.with_env_overrides()?,
        None => EvaluatorConfig::load_default()?,
    };

    if let Some(engine) = overrides.engine {
        config.engine = engine;
    }
    if let Some(timeout_ms) = overrides.timeout_ms {
        config.timeout_ms = timeout_ms;
    }
    if let Some(entry_point) = overrides.entry_point {
        config.entry_point_hint = Some(entry_point);
    }
    config.validate()?;
    Ok(config)
}

/// Evaluate a submission file against a test-suite file
pub async fn run(
    submission_path: &Path,
    tests_path: &Path,
    config_path: Option<&Path>,
    overrides: RunOverrides,
    pretty: bool,
) -> Result<()> {
    let config = resolve_config(config_path, overrides)?;

    let submission = fs::read_to_string(submission_path)
        .with_context(|| format!("Failed to read submission {}", submission_path.display()))?;
    if submission.trim().is_empty() {
        bail!("Submission {} is empty", submission_path.display());
    }

    let suite = fs::read_to_string(tests_path)
        .with_context(|| format!("Failed to read test suite {}", tests_path.display()))?;
    let test_cases = load_test_cases(&suite)
        .with_context(|| format!("Failed to parse test suite {}", tests_path.display()))?;

    info!(
        engine = %config.engine,
        timeout_ms = config.timeout_ms,
        test_cases = test_cases.len(),
        "Running evaluation"
    );

    let evaluator = Evaluator::from_config(&config);
    let report = SubmissionReport::from(evaluator.evaluate(&submission, &test_cases).await);

    let output = if pretty {
        serde_json::to_string_pretty(&report)
    } else {
        serde_json::to_string(&report)
    }
    .context("Failed to serialize evaluation report")?;

    println!("{}", output);
    Ok(())
}

/// Print the top-level bindings of a submission and the chosen entry point
pub fn inspect(submission_path: &Path, hint: Option<&str>) -> Result<()> {
    let submission = fs::read_to_string(submission_path)
        .with_context(|| format!("Failed to read submission {}", submission_path.display()))?;

    let bindings = top_level_bindings(&submission);
    if bindings.is_empty() {
        println!("No top-level functions found");
    } else {
        println!("Top-level functions:");
        for binding in &bindings {
            println!("  {} ({:?}, byte {})", binding.name, binding.kind, binding.offset);
        }
    }

    match find_entry_point(&submission, hint) {
        Ok(binding) => println!("Entry point: {}", binding.name),
        Err(e) => println!("{}", e),
    }

    Ok(())
}

/// Write a default evaluator config under `<path>/config/evaluator.json`
pub fn init_config(path: &Path, force: bool) -> Result<()> {
    let config_path = path.join(DEFAULT_CONFIG_PATH);

    if config_path.exists() && !force {
        bail!(
            "{} already exists (use --force to overwrite)",
            config_path.display()
        );
    }

    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let content = serde_json::to_string_pretty(&EvaluatorConfig::default())
        .context("Failed to serialize default config")?;
    fs::write(&config_path, content + "\n")
        .with_context(|| format!("Failed to write {}", config_path.display()))?;

    println!("Wrote {}", config_path.display());
    Ok(())
}
