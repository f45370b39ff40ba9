//! Run a script inside an interpreter and report whether it completed.
//!
//! The [`executor::ScriptExecutor`] opens a script file, hands the stream to an
//! [`interpreter::Interpreter`] and closes it again on every path. Checking
//! for files the script was supposed to write is left to the caller; see
//! [`artifact`].

pub mod artifact;
pub mod config;
pub mod executor;
pub mod interpreter;
pub mod printer;

pub use artifact::{verify, ArtifactConvention, VerifyError};
pub use executor::{RunError, ScriptExecutor};
pub use interpreter::{EvaluationError, Interpreter};
