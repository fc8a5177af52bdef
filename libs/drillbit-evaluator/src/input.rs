// Turning raw test-case inputs into call arguments
use drillbit_common::types::TestCase;
use serde_json::Value;

/// One positional argument for the function under test
#[derive(Debug, Clone, PartialEq)]
pub enum Argument {
    /// No input was supplied
    Undefined,
    /// Structured value, either given as-is or parsed from strict JSON
    Value(Value),
    /// Text that is not strict JSON. The engine evaluates it as a literal
    /// expression (single quotes, trailing commas, unquoted keys) and passes
    /// the original text through unchanged when that evaluation throws.
    Literal(String),
}

/// Materialize a single raw input.
///
/// Non-strings are used as-is; strings are tried as strict JSON first and
/// otherwise deferred to the engine as a literal.
pub fn materialize(input: Option<&Value>) -> Argument {
    match input {
        None => Argument::Undefined,
        Some(Value::String(text)) => match serde_json::from_str::<Value>(text) {
            Ok(parsed) => Argument::Value(parsed),
            Err(_) => Argument::Literal(text.clone()),
        },
        Some(other) => Argument::Value(other.clone()),
    }
}

/// Ordered argument list for a test case. Without explicit `args` the
/// function receives the materialized `input` as its only argument.
pub fn arguments_for(test_case: &TestCase) -> Vec<Argument> {
    match &test_case.args {
        Some(args) => args.iter().map(|arg| materialize(Some(arg))).collect(),
        None => vec![materialize(test_case.input.as_ref())],
    }
}

/// Approximate size of the input, used by the evaluator's guardrails
pub fn input_size(test_case: &TestCase) -> usize {
    let measure = |value: &Value| match value {
        Value::String(text) => text.len(),
        other => other.to_string().len(),
    };
    match &test_case.args {
        Some(args) => args.iter().map(measure).sum(),
        None => test_case.input.as_ref().map(measure).unwrap_or(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_structured_input_passes_through() {
        assert_eq!(materialize(Some(&json!([1, 2, 3]))), Argument::Value(json!([1, 2, 3])));
        assert_eq!(materialize(Some(&json!(7))), Argument::Value(json!(7)));
        assert_eq!(materialize(Some(&Value::Null)), Argument::Value(Value::Null));
    }

    #[test]
    fn test_json_string_is_parsed() {
        assert_eq!(materialize(Some(&json!("[1,2,3]"))), Argument::Value(json!([1, 2, 3])));
        assert_eq!(materialize(Some(&json!("21"))), Argument::Value(json!(21)));
        assert_eq!(materialize(Some(&json!(" true "))), Argument::Value(json!(true)));
        assert_eq!(materialize(Some(&json!("[]"))), Argument::Value(json!([])));
    }

    #[test]
    fn test_non_json_string_becomes_literal() {
        assert_eq!(
            materialize(Some(&json!("[1, 2, 3,]"))),
            Argument::Literal("[1, 2, 3,]".to_string())
        );
        assert_eq!(
            materialize(Some(&json!("hello world"))),
            Argument::Literal("hello world".to_string())
        );
    }

    #[test]
    fn test_missing_input_is_undefined() {
        assert_eq!(materialize(None), Argument::Undefined);
    }

    #[test]
    fn test_arguments_for_single_and_multi() {
        let single = TestCase::new("[2,7,11,15]", "[0,1]");
        assert_eq!(arguments_for(&single), vec![Argument::Value(json!([2, 7, 11, 15]))]);

        let multi = TestCase::with_args(vec![json!("[2,7,11,15]"), json!(9)], "[0,1]");
        assert_eq!(
            arguments_for(&multi),
            vec![Argument::Value(json!([2, 7, 11, 15])), Argument::Value(json!(9))]
        );
    }

    #[test]
    fn test_input_size() {
        assert_eq!(input_size(&TestCase::new("abc", "x")), 3);
        assert_eq!(input_size(&TestCase::new(json!([1, 2]), "x")), 5);
    }
}
