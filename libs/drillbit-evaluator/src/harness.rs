/// Harness - the script an engine actually runs for one test case
///
/// The harness is a single ECMAScript expression that evaluates to a JSON
/// report string. It:
/// 1. Captures `JSON`, `String` and indirect `eval` before user code can touch
///    them, and installs a silent `console` so debug logging is harmless
/// 2. Materializes the call arguments (strict JSON or permissive literal)
/// 3. Builds the callable with `new Function(<submission> + "return <name>")`
/// 4. Invokes it and renders the return value: canonical JSON for non-null
///    objects and arrays, `String(value)` for everything else
/// 5. Reports `{"status":"returned","actual":...}` or
///    `{"status":"threw","message":...}`
///
/// Exceptions thrown anywhere in steps 2-4 land in the report; only engine
/// failures (timeouts, uncatchable limits) escape it.

use crate::error::EngineError;
use crate::input::Argument;
use serde::Deserialize;
use serde_json::Value;

const PRELUDE: &str = r#"(function () {
  var __stringify = JSON.stringify;
  var __parse = JSON.parse;
  var __String = String;
  var __eval = eval;
  function __literal(text) {
    try {
      return __eval("(" + text + ")");
    } catch (error) {
      return text;
    }
  }
  var __silent = function () {};
  globalThis.console = {
    log: __silent, info: __silent, warn: __silent, error: __silent, debug: __silent,
    trace: __silent, dir: __silent, table: __silent, assert: __silent,
    group: __silent, groupEnd: __silent, time: __silent, timeEnd: __silent
  };
  function __describe(error) {
    if (error !== null && typeof error === "object" && "message" in error) {
      return __String(error.message);
    }
    return __String(error);
  }
  function __render(value) {
    if (typeof value === "object" && value !== null) {
      return __String(__stringify(value));
    }
    return __String(value);
  }
  try {
"#;

const EPILOGUE: &str = r#"    return __stringify({ status: "returned", actual: __render(__entry.apply(undefined, __args)) });
  } catch (error) {
    return __stringify({ status: "threw", message: __describe(error) });
  }
})()"#;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Harness {
    script: String,
}

impl Harness {
    pub fn build(submission: &str, entry_point: &str, args: &[Argument]) -> Self {
        let args = args.iter().map(argument_expression).collect::<Vec<_>>().join(", ");
        let body = format!("{}\nreturn {};", submission, entry_point);

        let mut script = String::with_capacity(PRELUDE.len() + EPILOGUE.len() + body.len() * 2);
        script.push_str(PRELUDE);
        script.push_str(&format!("    var __args = [{}];\n", args));
        script.push_str(&format!("    var __entry = new Function({})();\n", js_string(&body)));
        script.push_str(EPILOGUE);

        Self { script }
    }

    /// Script for engines that take the completion value of an expression
    pub fn script(&self) -> &str {
        &self.script
    }

    /// Program for engines that communicate over stdout. The report follows
    /// `REPORT_MARKER` on its own line so stray writes cannot corrupt it.
    pub fn stdout_program(&self) -> String {
        format!(
            "var __report = {};\nprocess.stdout.write({} + __report);\n",
            self.script,
            js_string(&format!("\n{}\n", REPORT_MARKER))
        )
    }
}

/// Separates anything the submission printed from the harness report
pub const REPORT_MARKER: &str = "--drillbit-report--";

fn argument_expression(argument: &Argument) -> String {
    match argument {
        Argument::Undefined => "undefined".to_string(),
        Argument::Value(value) => format!("__parse({})", js_string(&value.to_string())),
        Argument::Literal(text) => format!("__literal({})", js_string(text)),
    }
}

/// Quote text as a string literal. JSON string syntax is valid ECMAScript.
fn js_string(text: &str) -> String {
    Value::String(text.to_string()).to_string()
}

/// What the harness observed for one invocation
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum HarnessReport {
    /// Function returned; `actual` is its rendered form
    Returned { actual: String },
    /// Construction or invocation threw; `message` is the error's message
    Threw { message: String },
}

impl HarnessReport {
    /// Parse the report out of captured stdout, ignoring everything before
    /// the last `REPORT_MARKER`
    pub fn from_stdout(stdout: &str) -> Result<Self, EngineError> {
        match stdout.rfind(REPORT_MARKER) {
            Some(index) => Self::parse(&stdout[index + REPORT_MARKER.len()..]),
            None => Self::parse(stdout),
        }
    }

    pub fn parse(text: &str) -> Result<Self, EngineError> {
        serde_json::from_str(text.trim()).map_err(|e| {
            let preview: String = text.chars().take(200).collect();
            EngineError::MalformedReport(format!("{} (got: {:?})", e, preview))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_arguments_are_embedded_as_quoted_text() {
        let harness = Harness::build(
            "function solution(arr) { return arr; }",
            "solution",
            &[
                Argument::Value(json!([1, 2, 3])),
                Argument::Literal("{a: 'x',}".to_string()),
                Argument::Undefined,
            ],
        );

        let script = harness.script();
        assert!(script.contains(r#"var __args = [__parse("[1,2,3]"), __literal("{a: 'x',}"), undefined];"#));
        assert!(script.starts_with("(function () {"));
        assert!(script.ends_with("})()"));
    }

    #[test]
    fn test_submission_is_quoted_not_spliced() {
        let harness = Harness::build("const f = (s) => \"}\"; // \"quote\"", "f", &[]);

        assert!(harness
            .script()
            .contains(r#"new Function("const f = (s) => \"}\"; // \"quote\"\nreturn f;")()"#));
    }

    #[test]
    fn test_stdout_program_wraps_script() {
        let harness = Harness::build("function f() {}", "f", &[]);
        let program = harness.stdout_program();

        assert!(program.starts_with("var __report = (function () {"));
        assert!(program.contains(REPORT_MARKER));
        assert!(program.trim_end().ends_with("+ __report);"));
    }

    #[test]
    fn test_console_is_installed_before_submission() {
        let harness = Harness::build("function f() { console.log('x'); }", "f", &[]);
        let script = harness.script();

        let console_at = script.find("globalThis.console").unwrap();
        let submission_at = script.find("new Function(").unwrap();
        assert!(console_at < submission_at);
    }

    #[test]
    fn test_report_after_printed_output() {
        let stdout = format!(
            "dbg\n[ 1, 2, 3 ]\n{}\n{{\"status\":\"returned\",\"actual\":\"[3,2,1]\"}}",
            REPORT_MARKER
        );

        assert_eq!(
            HarnessReport::from_stdout(&stdout).unwrap(),
            HarnessReport::Returned { actual: "[3,2,1]".to_string() }
        );
        assert!(matches!(
            HarnessReport::from_stdout("dbg\n"),
            Err(EngineError::MalformedReport(_))
        ));
    }

    #[test]
    fn test_parse_reports() {
        assert_eq!(
            HarnessReport::parse(r#"{"status":"returned","actual":"[3,2,1]"}"#).unwrap(),
            HarnessReport::Returned { actual: "[3,2,1]".to_string() }
        );
        assert_eq!(
            HarnessReport::parse("{\"status\":\"threw\",\"message\":\"boom\"}\n").unwrap(),
            HarnessReport::Threw { message: "boom".to_string() }
        );
    }

    #[test]
    fn test_parse_malformed_report() {
        assert!(matches!(
            HarnessReport::parse("undefined"),
            Err(EngineError::MalformedReport(_))
        ));
        assert!(matches!(
            HarnessReport::parse(r#"{"status":"exploded"}"#),
            Err(EngineError::MalformedReport(_))
        ));
    }
}
