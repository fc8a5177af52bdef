use thiserror::Error;

/// Message shown to the user when no callable could be located.
pub const NO_FUNCTION_FOUND: &str = "No function found. Please define a function using: function name(params) { } or const name = (params) => { }";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    #[error("{}", NO_FUNCTION_FOUND)]
    NoFunctionFound,
}

/// Failures of the execution backend itself, as opposed to exceptions
/// thrown by the submission (those come back in the harness report).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("Execution timed out after {limit_ms}ms")]
    TimedOut { limit_ms: u64 },

    /// The interpreter stopped the script in a way user code cannot catch,
    /// e.g. a loop-iteration or recursion limit
    #[error("{0}")]
    Aborted(String),

    #[error("Execution engine unavailable: {0}")]
    Unavailable(String),

    #[error("Malformed harness report: {0}")]
    MalformedReport(String),
}
