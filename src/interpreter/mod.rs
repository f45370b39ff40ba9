//! Interpreter hosts: the single `evaluate` primitive and its implementations.

use std::{io::Read, path::PathBuf, str::FromStr, time::Duration};

use thiserror::Error;

pub mod embedded;
pub mod process;

pub use embedded::EmbeddedInterpreter;
pub use process::ProcessInterpreter;

/// Runs script source to completion. One runtime is created per call and
/// discarded when the call returns.
pub trait Interpreter {
    fn evaluate(&self, source: &mut dyn Read) -> Result<(), EvaluationError>;
}

impl<T: Interpreter + ?Sized> Interpreter for Box<T> {
    fn evaluate(&self, source: &mut dyn Read) -> Result<(), EvaluationError> {
        (**self).evaluate(source)
    }
}

#[derive(Debug, Error)]
pub enum EvaluationError {
    #[error("failed to start {what}: {source}")]
    Startup {
        what: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read script source: {0}")]
    Source(#[source] std::io::Error),

    #[error("script exited with {}: {stderr}", exit_label(.code))]
    Raised { code: Option<i32>, stderr: String },

    #[error("script raised: {0}")]
    Script(String),

    #[error("script did not finish within {0:?}")]
    TimedOut(Duration),
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!("status {c}"),
        None => "no status (terminated by signal)".to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InterpreterKind {
    /// External interpreter binary fed through stdin.
    #[default]
    Process,
    /// In-process rhai engine.
    Embedded,
}

impl FromStr for InterpreterKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "process" | "subprocess" => Ok(Self::Process),
            "embedded" | "rhai" => Ok(Self::Embedded),
            other => Err(format!("unknown script engine: {other}")),
        }
    }
}

/// Everything needed to construct an interpreter host.
#[derive(Debug, Clone)]
pub struct InterpreterSettings {
    pub kind: InterpreterKind,
    pub program: String,
    pub args: Vec<String>,
    pub timeout: Option<Duration>,
    pub working_dir: Option<PathBuf>,
}

impl Default for InterpreterSettings {
    fn default() -> Self {
        Self {
            kind: InterpreterKind::Process,
            program: "ruby".to_string(),
            args: Vec::new(),
            timeout: None,
            working_dir: None,
        }
    }
}

pub fn build(settings: &InterpreterSettings) -> Box<dyn Interpreter> {
    match settings.kind {
        InterpreterKind::Process => {
            let mut host = ProcessInterpreter::new(&settings.program).args(settings.args.clone());
            if let Some(limit) = settings.timeout {
                host = host.timeout(limit);
            }
            if let Some(dir) = &settings.working_dir {
                host = host.working_dir(dir);
            }
            Box::new(host)
        }
        InterpreterKind::Embedded => {
            let mut host = EmbeddedInterpreter::new();
            if let Some(limit) = settings.timeout {
                host = host.timeout(limit);
            }
            if let Some(dir) = &settings.working_dir {
                host = host.working_dir(dir);
            }
            Box::new(host)
        }
    }
}
