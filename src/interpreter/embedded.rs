//! In-process script evaluation on the rhai engine.

use std::{
    fs,
    io::Read,
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

use rhai::{Dynamic, Engine, EvalAltResult};

use super::{EvaluationError, Interpreter};

const TIMEOUT_TOKEN: &str = "scriptbridge:timeout";

/// Evaluates rhai source on a fresh `Engine` per call.
///
/// Scripts get two host functions for producing output files:
/// `write_file(path, contents)` and `touch(path)`. Relative paths resolve
/// against the working directory, if one is set.
#[derive(Debug, Clone, Default)]
pub struct EmbeddedInterpreter {
    timeout: Option<Duration>,
    working_dir: Option<PathBuf>,
}

impl EmbeddedInterpreter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn timeout(mut self, limit: Duration) -> Self {
        self.timeout = Some(limit);
        self
    }

    pub fn working_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.working_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    fn engine(&self) -> Engine {
        let mut engine = Engine::new();

        let base = self.working_dir.clone();
        engine.register_fn(
            "write_file",
            move |path: &str, contents: &str| -> Result<(), Box<EvalAltResult>> {
                let target = resolve(base.as_deref(), path);
                fs::write(&target, contents)
                    .map_err(|e| format!("write_file {}: {}", target.display(), e).into())
            },
        );
        let base = self.working_dir.clone();
        engine.register_fn("touch", move |path: &str| -> Result<(), Box<EvalAltResult>> {
            let target = resolve(base.as_deref(), path);
            fs::write(&target, b"")
                .map_err(|e| format!("touch {}: {}", target.display(), e).into())
        });

        if let Some(limit) = self.timeout {
            let started = Instant::now();
            engine.on_progress(move |_ops| {
                if started.elapsed() > limit {
                    Some(Dynamic::from(TIMEOUT_TOKEN.to_string()))
                } else {
                    None
                }
            });
        }
        engine
    }
}

fn resolve(base: Option<&Path>, path: &str) -> PathBuf {
    let p = Path::new(path);
    match base {
        Some(dir) if p.is_relative() => dir.join(p),
        _ => p.to_path_buf(),
    }
}

impl Interpreter for EmbeddedInterpreter {
    fn evaluate(&self, source: &mut dyn Read) -> Result<(), EvaluationError> {
        let mut text = String::new();
        source
            .read_to_string(&mut text)
            .map_err(EvaluationError::Source)?;

        let engine = self.engine();
        engine.run(&text).map_err(|err| match *err {
            EvalAltResult::ErrorTerminated(..) => {
                EvaluationError::TimedOut(self.timeout.unwrap_or_default())
            }
            other => EvaluationError::Script(other.to_string()),
        })
    }
}
