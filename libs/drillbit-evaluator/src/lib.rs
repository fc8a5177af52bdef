//! Dynamic evaluation of submitted solution functions.
//!
//! The pipeline for one submission:
//! 1. `extract` finds the entry-point function in the source text
//! 2. `input` turns each test case's input into call arguments
//! 3. `harness` wraps submission and arguments into a self-reporting script
//! 4. `engine` runs the script in a fresh, time-limited context
//! 5. `compare` normalizes actual and expected values and checks equality
//! 6. `evaluator` drives the loop and tallies the result

pub mod compare;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod extract;
pub mod harness;
pub mod input;
pub mod node;


pub use engine::{build_engine, BoaEngine, ExecutionEngine, ExecutionLimits};
pub use error::{EngineError, ExtractError};
pub use evaluator::{evaluate, Evaluator};
pub use node::NodeEngine;
