//! External interpreter process: the script source is piped through stdin.

use std::{
    io::{self, Read},
    path::{Path, PathBuf},
    process::{ExitStatus, Stdio},
    time::Duration,
};

use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    process::{Child, ChildStderr, Command},
    time::timeout,
};

use super::{EvaluationError, Interpreter};

const STDERR_GRACE: Duration = Duration::from_millis(100);

/// Runs scripts with an external interpreter binary, e.g. `ruby`,
/// `python3 -` or `sh -s`. The binary must read its program from stdin.
#[derive(Debug, Clone)]
pub struct ProcessInterpreter {
    program: String,
    args: Vec<String>,
    timeout: Option<Duration>,
    working_dir: Option<PathBuf>,
}

impl ProcessInterpreter {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout: None,
            working_dir: None,
        }
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Kill the interpreter and fail with `TimedOut` once `limit` elapses.
    pub fn timeout(mut self, limit: Duration) -> Self {
        self.timeout = Some(limit);
        self
    }

    pub fn working_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.working_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    async fn run_child(&self, source: Vec<u8>) -> Result<(), EvaluationError> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::inherit())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }

        let mut child = cmd.spawn().map_err(|source| EvaluationError::Startup {
            what: format!("interpreter {}", self.program),
            source,
        })?;
        tracing::debug!(program = %self.program, pid = ?child.id(), "interpreter started");

        let stdin = child.stdin.take();
        let stderr = child.stderr.take();
        let mut captured = Vec::new();
        let feed = async move {
            if let Some(mut stdin) = stdin {
                // The interpreter may exit before draining its input; only the
                // exit status decides the outcome.
                stdin.write_all(&source).await.ok();
                stdin.shutdown().await.ok();
            }
        };
        let finished = async {
            let ((), status) = tokio::join!(feed, wait_draining(&mut child, stderr, &mut captured));
            status
        };

        let status = match self.timeout {
            Some(limit) => timeout(limit, finished)
                .await
                .map_err(|_| EvaluationError::TimedOut(limit))?,
            None => finished.await,
        }
        .map_err(|source| EvaluationError::Startup {
            what: format!("interpreter {}", self.program),
            source,
        })?;

        let stderr = String::from_utf8_lossy(&captured).trim_end().to_string();
        if status.success() {
            if !stderr.is_empty() {
                tracing::debug!(program = %self.program, %stderr, "interpreter wrote to stderr");
            }
            Ok(())
        } else {
            Err(EvaluationError::Raised {
                code: status.code(),
                stderr,
            })
        }
    }

    fn block_on_child(&self, source: Vec<u8>) -> Result<(), EvaluationError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|source| EvaluationError::Startup {
                what: "async runtime".to_string(),
                source,
            })?;
        runtime.block_on(self.run_child(source))
    }
}

enum Step {
    Exited(io::Result<ExitStatus>),
    Read(io::Result<usize>),
}

/// Wait for the interpreter itself to exit while collecting its stderr.
///
/// Background processes started by the script may inherit the stderr pipe,
/// so after the exit only `STDERR_GRACE` is spent on leftover output.
async fn wait_draining(
    child: &mut Child,
    mut stderr: Option<ChildStderr>,
    buf: &mut Vec<u8>,
) -> io::Result<ExitStatus> {
    let mut chunk = [0u8; 4096];
    let status = loop {
        let step = tokio::select! {
            status = child.wait() => Step::Exited(status),
            n = read_some(stderr.as_mut(), &mut chunk) => Step::Read(n),
        };
        match step {
            Step::Exited(status) => break status?,
            Step::Read(Ok(n)) if n > 0 => buf.extend_from_slice(&chunk[..n]),
            Step::Read(_) => stderr = None,
        }
    };

    if let Some(mut pipe) = stderr {
        let leftover = async {
            while let Ok(n) = pipe.read(&mut chunk).await {
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
            }
        };
        timeout(STDERR_GRACE, leftover).await.ok();
    }
    Ok(status)
}

async fn read_some(pipe: Option<&mut ChildStderr>, chunk: &mut [u8]) -> io::Result<usize> {
    match pipe {
        Some(pipe) => pipe.read(chunk).await,
        None => std::future::pending().await,
    }
}

impl Interpreter for ProcessInterpreter {
    fn evaluate(&self, source: &mut dyn Read) -> Result<(), EvaluationError> {
        let mut text = Vec::new();
        source
            .read_to_end(&mut text)
            .map_err(EvaluationError::Source)?;

        if tokio::runtime::Handle::try_current().is_err() {
            return self.block_on_child(text);
        }
        // A runtime cannot be started on a thread that already drives one.
        std::thread::scope(|scope| {
            scope
                .spawn(move || self.block_on_child(text))
                .join()
                .unwrap_or_else(|_| {
                    Err(EvaluationError::Startup {
                        what: format!("interpreter thread for {}", self.program),
                        source: io::Error::other("thread panicked"),
                    })
                })
        })
    }
}
