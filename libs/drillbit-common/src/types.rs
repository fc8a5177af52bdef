use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Test case exactly as an upstream generator hands it over.
///
/// Field names are not stable across producers, so every known spelling of
/// the expected value is captured and resolved once in `TestCase::from`.
/// Presence is tracked separately from value: `"expected": null` is present,
/// a missing `expected` key is not.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawTestCase {
    #[serde(default, deserialize_with = "present")]
    pub input: Option<Value>,
    #[serde(default)]
    pub args: Option<Vec<Value>>,
    #[serde(default, deserialize_with = "present")]
    pub expected: Option<Value>,
    #[serde(default, rename = "expectedOutput", deserialize_with = "present")]
    pub expected_output: Option<Value>,
    /// Snake-case spelling; a separate field so sending both is not a duplicate
    #[serde(default, rename = "expected_output", deserialize_with = "present")]
    pub expected_output_snake: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub output: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub stdout: Option<Value>,
}

/// Keeps an explicit JSON `null` as `Some(Value::Null)`.
fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// Expected value of a test case after field-name resolution
#[derive(Debug, Clone, PartialEq)]
pub enum Expected {
    /// None of the known keys were present
    Absent,
    Value(Value),
}

/// Canonical test case consumed by the evaluator
#[derive(Debug, Clone, PartialEq)]
pub struct TestCase {
    /// Original input, echoed back verbatim in the outcome
    pub input: Option<Value>,
    /// Explicit positional arguments; `None` means "call with `input` only"
    pub args: Option<Vec<Value>>,
    pub expected: Expected,
}

impl TestCase {
    /// Single-argument test case with a present expected value
    pub fn new(input: impl Into<Value>, expected: impl Into<Value>) -> Self {
        Self {
            input: Some(input.into()),
            args: None,
            expected: Expected::Value(expected.into()),
        }
    }

    /// Multi-argument test case
    pub fn with_args(args: Vec<Value>, expected: impl Into<Value>) -> Self {
        Self {
            input: Some(Value::Array(args.clone())),
            args: Some(args),
            expected: Expected::Value(expected.into()),
        }
    }
}

impl From<RawTestCase> for TestCase {
    fn from(raw: RawTestCase) -> Self {
        let expected = raw
            .expected
            .or(raw.expected_output)
            .or(raw.expected_output_snake)
            .or(raw.output)
            .or(raw.stdout)
            .map(Expected::Value)
            .unwrap_or(Expected::Absent);

        Self {
            input: raw.input,
            args: raw.args,
            expected,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TestSuiteDocument {
    Bare(Vec<RawTestCase>),
    Wrapped {
        #[serde(rename = "testCases", alias = "test_cases")]
        test_cases: Vec<RawTestCase>,
    },
}

/// Parse a test suite from JSON text: either a bare array of test cases or
/// an object carrying a `testCases` array.
pub fn load_test_cases(json: &str) -> serde_json::Result<Vec<TestCase>> {
    let document: TestSuiteDocument = serde_json::from_str(json)?;
    let raw = match document {
        TestSuiteDocument::Bare(cases) => cases,
        TestSuiteDocument::Wrapped { test_cases } => test_cases,
    };
    Ok(raw.into_iter().map(TestCase::from).collect())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Passed,
    WrongAnswer,
    RuntimeError,
    TimeLimitExceeded,
    NoEntryPoint,
}

/// Per-test-case record. `expected` and `actual` are the normalized strings
/// that were compared.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestOutcome {
    pub input: Option<Value>,
    pub expected: String,
    pub actual: String,
    pub passed: bool,
    pub status: OutcomeStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationResult {
    pub total_tests: usize,
    pub passed_tests: usize,
    pub test_results: Vec<TestOutcome>,
}

impl EvaluationResult {
    pub fn from_outcomes(test_results: Vec<TestOutcome>) -> Self {
        let passed_tests = test_results.iter().filter(|outcome| outcome.passed).count();
        Self {
            total_tests: test_results.len(),
            passed_tests,
            test_results,
        }
    }

    pub fn score(&self) -> u32 {
        score_percentage(self.passed_tests, self.total_tests)
    }
}

/// Rounded percentage of passed tests. An empty suite scores 0.
pub fn score_percentage(passed: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    (passed as f64 / total as f64 * 100.0).round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_expected_field_priority() {
        let raw: RawTestCase = serde_json::from_value(json!({
            "input": "[1]",
            "stdout": "stdout",
            "output": "output",
            "expectedOutput": "expectedOutput"
        }))
        .unwrap();

        let case = TestCase::from(raw);
        assert_eq!(case.expected, Expected::Value(json!("expectedOutput")));
    }

    #[test]
    fn test_expected_snake_case_alias() {
        let raw: RawTestCase =
            serde_json::from_value(json!({ "input": 1, "expected_output": 2 })).unwrap();

        assert_eq!(TestCase::from(raw).expected, Expected::Value(json!(2)));
    }

    #[test]
    fn test_both_expected_output_spellings() {
        let raw: RawTestCase = serde_json::from_value(json!({
            "input": 1,
            "expected_output": "snake",
            "expectedOutput": "camel"
        }))
        .unwrap();
        assert_eq!(TestCase::from(raw).expected, Expected::Value(json!("camel")));

        let cases = load_test_cases(
            r#"[{"input":1,"expectedOutput":2,"expected_output":3}]"#,
        )
        .unwrap();
        assert_eq!(cases[0].expected, Expected::Value(json!(2)));
    }

    #[test]
    fn test_explicit_null_is_present() {
        let raw: RawTestCase =
            serde_json::from_value(json!({ "input": 1, "expected": null, "output": 5 })).unwrap();

        assert_eq!(TestCase::from(raw).expected, Expected::Value(Value::Null));
    }

    #[test]
    fn test_missing_expected_is_absent() {
        let raw: RawTestCase = serde_json::from_value(json!({ "input": 1 })).unwrap();
        let case = TestCase::from(raw);

        assert_eq!(case.expected, Expected::Absent);
        assert_eq!(case.input, Some(json!(1)));
    }

    #[test]
    fn test_load_bare_and_wrapped_suites() {
        let bare = load_test_cases(r#"[{"input":"[1,2]","expected":"[2,1]"}]"#).unwrap();
        let wrapped =
            load_test_cases(r#"{"testCases":[{"input":"[1,2]","expected":"[2,1]"}]}"#).unwrap();

        assert_eq!(bare, wrapped);
        assert_eq!(bare.len(), 1);
    }

    #[test]
    fn test_score_percentage() {
        assert_eq!(score_percentage(0, 0), 0);
        assert_eq!(score_percentage(2, 3), 67);
        assert_eq!(score_percentage(1, 3), 33);
        assert_eq!(score_percentage(3, 3), 100);
    }

    #[test]
    fn test_result_serializes_camel_case() {
        let result = EvaluationResult::from_outcomes(vec![TestOutcome {
            input: Some(json!("[5]")),
            expected: "[5]".to_string(),
            actual: "[5]".to_string(),
            passed: true,
            status: OutcomeStatus::Passed,
        }]);

        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["totalTests"], 1);
        assert_eq!(value["passedTests"], 1);
        assert_eq!(value["testResults"][0]["status"], "passed");
    }
}
