//! Script executor: open the script, hand it to the interpreter, close it.

use std::{
    fmt,
    fs::File,
    io::{self, BufReader, Read},
    path::{Path, PathBuf},
};

use thiserror::Error;

use crate::interpreter::{EvaluationError, Interpreter};

#[derive(Debug, Error)]
pub enum RunError {
    #[error("cannot open script {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Evaluation(#[from] EvaluationError),
}

impl RunError {
    pub fn is_io(&self) -> bool {
        matches!(self, Self::Io { .. })
    }
}

/// Per-call progress. `Failed` can be reached from `Opening` directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Opening,
    Evaluating,
    Succeeded,
    Failed,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Opening => "opening",
            Self::Evaluating => "evaluating",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Produces the readable stream for a script path. The stream is closed by
/// dropping it.
pub trait SourceOpener {
    fn open(&self, path: &Path) -> io::Result<Box<dyn Read>>;
}

/// Opens scripts from the local file system.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsOpener;

impl SourceOpener for FsOpener {
    fn open(&self, path: &Path) -> io::Result<Box<dyn Read>> {
        let file = File::open(path)?;
        if file.metadata()?.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "path is a directory",
            ));
        }
        Ok(Box::new(BufReader::new(file)))
    }
}

pub struct ScriptExecutor<I: Interpreter> {
    interpreter: I,
    opener: Box<dyn SourceOpener>,
}

impl<I: Interpreter> ScriptExecutor<I> {
    pub fn new(interpreter: I) -> Self {
        Self {
            interpreter,
            opener: Box::new(FsOpener),
        }
    }

    pub fn with_opener(interpreter: I, opener: impl SourceOpener + 'static) -> Self {
        Self {
            interpreter,
            opener: Box::new(opener),
        }
    }

    /// Run the script at `path` to completion.
    ///
    /// Errors from the interpreter are returned as `RunError::Evaluation`
    /// without alteration. The script stream is closed before this returns,
    /// whatever the outcome.
    pub fn run(&self, path: impl AsRef<Path>) -> Result<(), RunError> {
        let path = path.as_ref();
        let mut state = RunState::Idle;
        tracing::debug!(script = %path.display(), %state, "run requested");

        state = RunState::Opening;
        tracing::debug!(script = %path.display(), %state);
        let mut source = match self.open(path) {
            Ok(source) => source,
            Err(err) => {
                state = RunState::Failed;
                tracing::warn!(script = %path.display(), %state, error = %err, "script not readable");
                return Err(err);
            }
        };

        state = RunState::Evaluating;
        tracing::debug!(script = %path.display(), %state);
        let outcome = self.interpreter.evaluate(&mut source);
        drop(source);

        match outcome {
            Ok(()) => {
                state = RunState::Succeeded;
                tracing::info!(script = %path.display(), %state, "script completed");
                Ok(())
            }
            Err(err) => {
                state = RunState::Failed;
                tracing::warn!(script = %path.display(), %state, error = %err, "script failed");
                Err(err.into())
            }
        }
    }

    fn open(&self, path: &Path) -> Result<Box<dyn Read>, RunError> {
        if path.as_os_str().is_empty() {
            return Err(RunError::Io {
                path: path.to_path_buf(),
                source: io::Error::new(io::ErrorKind::InvalidInput, "empty script path"),
            });
        }
        self.opener.open(path).map_err(|source| RunError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}
