//! Subprocess execution for a single compiler pass.
//!
//! The orchestrator depends on [`CompilerRunner`] rather than on
//! `tokio::process` directly so tests can script pass outcomes.

use std::{
    path::PathBuf,
    process::Stdio,
    sync::Arc,
    time::Duration,
};

use async_trait::async_trait;
use thiserror::Error;
use tokio::{
    io::{AsyncRead, AsyncReadExt},
    process::Command,
    sync::watch,
    task::JoinHandle,
    time::Instant,
};
use tracing::{debug, warn};

/// Fully resolved invocation of one pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassCommand {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
    /// Directory the compiler was told to write into.
    pub output_dir: PathBuf,
    /// Base name of the job's output files (`<job_name>.pdf`, `.log`, ...).
    pub job_name: String,
}

impl PassCommand {
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Debug, Clone)]
pub struct PassOutput {
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub duration: Duration,
}

impl PassOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error("could not start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("pass exceeded its time limit of {0:?}")]
    TimedOut(Duration),

    #[error("pass was cancelled")]
    Cancelled,

    #[error("i/o error while waiting for the compiler: {0}")]
    Io(#[from] std::io::Error),
}

#[async_trait]
pub trait CompilerRunner: Send + Sync {
    /// Runs one pass to completion. Implementations must terminate the
    /// process when `limit` elapses or `cancel` fires.
    async fn run(
        &self,
        command: &PassCommand,
        limit: Duration,
        cancel: &CancelToken,
    ) -> Result<PassOutput, RunError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Cancellation
// ────────────────────────────────────────────────────────────────────────────

/// Owner side of a cancellation signal.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    /// A token that never fires.
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(false);
        Self { rx }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once cancellation is requested. Pends forever if the handle
    /// is dropped without cancelling.
    pub async fn cancelled(&mut self) {
        loop {
            if *self.rx.borrow_and_update() {
                return;
            }
            if self.rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

pub fn cancel_pair() -> (CancelHandle, CancelToken) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx: Arc::new(tx) }, CancelToken { rx })
}

// ────────────────────────────────────────────────────────────────────────────
// tokio::process implementation
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

enum Waited {
    Exited(std::io::Result<std::process::ExitStatus>),
    TimedOut,
    Cancelled,
}

#[async_trait]
impl CompilerRunner for ProcessRunner {
    async fn run(
        &self,
        command: &PassCommand,
        limit: Duration,
        cancel: &CancelToken,
    ) -> Result<PassOutput, RunError> {
        let started = Instant::now();
        debug!(command = %command.display(), "spawning compiler pass");

        let mut child = Command::new(&command.program)
            .args(&command.args)
            .current_dir(&command.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| RunError::Spawn {
                program: command.program.clone(),
                source,
            })?;

        // Drain both pipes concurrently so a chatty compiler never blocks on
        // a full pipe buffer.
        let mut stdout_task = child.stdout.take().map(drain);
        let mut stderr_task = child.stderr.take().map(drain);

        let mut cancel = cancel.clone();
        let waited = tokio::select! {
            status = child.wait() => Waited::Exited(status),
            _ = tokio::time::sleep(limit) => Waited::TimedOut,
            _ = cancel.cancelled() => Waited::Cancelled,
        };

        let status = match waited {
            Waited::Exited(status) => status?,
            Waited::TimedOut => {
                warn!(program = %command.program, ?limit, "terminating compiler after time limit");
                terminate(&mut child, [stdout_task, stderr_task]).await;
                return Err(RunError::TimedOut(limit));
            }
            Waited::Cancelled => {
                warn!(program = %command.program, "terminating compiler on cancellation");
                terminate(&mut child, [stdout_task, stderr_task]).await;
                return Err(RunError::Cancelled);
            }
        };

        // A helper the compiler spawned can inherit the pipes and keep them
        // open after the compiler itself exits; the limit covers draining too.
        let deadline = started + limit;
        let captured = tokio::time::timeout_at(deadline, async {
            let stdout = collect(stdout_task.as_mut()).await?;
            let stderr = collect(stderr_task.as_mut()).await?;
            Ok::<_, RunError>((stdout, stderr))
        })
        .await;
        let (stdout, stderr) = match captured {
            Ok(output) => output?,
            Err(_) => {
                warn!(
                    program = %command.program,
                    ?limit,
                    "compiler output still open after time limit"
                );
                for reader in [stdout_task, stderr_task].into_iter().flatten() {
                    reader.abort();
                }
                return Err(RunError::TimedOut(limit));
            }
        };

        Ok(PassOutput {
            exit_code: status.code(),
            stdout,
            stderr,
            duration: started.elapsed(),
        })
    }
}

fn drain<R>(mut reader: R) -> JoinHandle<std::io::Result<String>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).await?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    })
}

async fn collect(
    task: Option<&mut JoinHandle<std::io::Result<String>>>,
) -> Result<String, RunError> {
    match task {
        Some(handle) => handle
            .await
            .map_err(|e| RunError::Io(std::io::Error::other(e)))?
            .map_err(RunError::Io),
        None => Ok(String::new()),
    }
}

async fn terminate(
    child: &mut tokio::process::Child,
    readers: [Option<JoinHandle<std::io::Result<String>>>; 2],
) {
    if let Err(e) = child.kill().await {
        warn!(error = %e, "failed to kill compiler process");
    }
    for reader in readers.into_iter().flatten() {
        reader.abort();
    }
}
