//! Multi-pass compilation of one document.
//!
//! A [`CompileJob`] owns exactly one source document. It moves through
//! `Pending -> Running(1..=max_passes) -> Succeeded | Failed`, runs each pass
//! in a private scratch directory, and decides success by the artifact alone:
//! an existing, non-empty artifact is a success whatever the exit codes were.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, info, warn, Instrument};
use uuid::Uuid;

use super::{
    diagnostics::{parse_log, Diagnostic, RerunSignal},
    opener::open_artifact,
    runner::{CancelToken, CompilerRunner, PassCommand, ProcessRunner, RunError},
    workspace::{remove_stale_auxiliary_files, JobWorkspace},
    CompileOptions,
};
use crate::errors::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum JobState {
    Pending,
    Running { pass: u32 },
    Succeeded,
    Failed,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Succeeded | JobState::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum FailureKind {
    /// The compiler could not be started, or the source was missing.
    Invocation(String),
    /// Error diagnostics and no usable artifact.
    Diagnostics,
    /// Passes finished but no non-empty artifact appeared.
    NoArtifact,
    Timeout,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CompileOutcome {
    Succeeded,
    Failed { failure: FailureKind },
}

#[derive(Debug, Clone, Serialize)]
pub struct CompilationResult {
    pub job_id: Uuid,
    pub source: PathBuf,
    pub artifact: Option<PathBuf>,
    pub outcome: CompileOutcome,
    pub diagnostics: Vec<Diagnostic>,
    pub warnings: Vec<String>,
    pub passes: u32,
    /// Cross-references settled before `max_passes` ran out.
    pub stabilized: bool,
    /// Terminal state the job ended in.
    pub state: JobState,
    pub timeout: Duration,
}

impl CompilationResult {
    pub fn is_success(&self) -> bool {
        self.outcome == CompileOutcome::Succeeded
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_error())
    }

    /// Artifact path on success, otherwise the matching [`AppError`].
    pub fn into_result(self) -> Result<PathBuf, AppError> {
        let failure = match self.outcome {
            CompileOutcome::Succeeded => {
                return self.artifact.ok_or_else(|| {
                    AppError::Internal(anyhow::anyhow!("successful job without artifact"))
                });
            }
            CompileOutcome::Failed { failure } => failure,
        };
        Err(match failure {
            FailureKind::Invocation(reason) => AppError::CompilerInvocation(reason),
            FailureKind::Timeout => AppError::Timeout(self.timeout),
            FailureKind::Cancelled => AppError::Cancelled,
            FailureKind::Diagnostics | FailureKind::NoArtifact => {
                let errors = self.diagnostics.iter().filter(|d| d.is_error()).count();
                let summary = match self.diagnostics.iter().find(|d| d.is_error()) {
                    Some(first) => format!("{errors} error(s), first: {first}"),
                    None => "no artifact was produced".to_string(),
                };
                AppError::CompilerDiagnostics {
                    summary,
                    diagnostics: self.diagnostics,
                }
            }
        })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Job
// ────────────────────────────────────────────────────────────────────────────

pub struct CompileJob {
    id: Uuid,
    source: PathBuf,
    options: CompileOptions,
    runner: Arc<dyn CompilerRunner>,
    state: JobState,
    diagnostics: Vec<Diagnostic>,
    warnings: Vec<String>,
    passes: u32,
}

/// Compiles `source` with the system compiler and no cancellation.
pub async fn compile(source: &Path, options: &CompileOptions) -> CompilationResult {
    CompileJob::new(source, options.clone(), Arc::new(ProcessRunner))
        .run(CancelToken::never())
        .await
}

impl CompileJob {
    pub fn new(source: &Path, options: CompileOptions, runner: Arc<dyn CompilerRunner>) -> Self {
        Self {
            id: Uuid::new_v4(),
            source: source.to_path_buf(),
            options,
            runner,
            state: JobState::Pending,
            diagnostics: Vec::new(),
            warnings: Vec::new(),
            passes: 0,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub async fn run(self, cancel: CancelToken) -> CompilationResult {
        let span = tracing::info_span!(
            "compile",
            job_id = %self.id,
            source = %self.source.display(),
            compiler = %self.options.compiler,
        );
        self.execute(cancel).instrument(span).await
    }

    async fn execute(mut self, cancel: CancelToken) -> CompilationResult {
        let started = Instant::now();
        let deadline = started + self.options.timeout;

        if !self.source.is_file() {
            let reason = format!("source document not found: {}", self.source.display());
            return self.fail(FailureKind::Invocation(reason), None, false);
        }
        let Some(job_name) = self
            .source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
        else {
            let reason = format!("source has no file name: {}", self.source.display());
            return self.fail(FailureKind::Invocation(reason), None, false);
        };
        let source = match self.source.canonicalize() {
            Ok(path) => path,
            Err(e) => {
                let reason = format!("cannot resolve {}: {e}", self.source.display());
                return self.fail(FailureKind::Invocation(reason), None, false);
            }
        };
        let working_dir = source
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let output_dir = self
            .options
            .output_dir
            .clone()
            .unwrap_or_else(|| working_dir.clone());

        let workspace = match JobWorkspace::create(&output_dir, &job_name) {
            Ok(ws) => ws,
            Err(e) => return self.fail(FailureKind::Invocation(e.to_string()), None, false),
        };

        let command = PassCommand {
            program: self.options.program().to_string(),
            args: self.options.compiler.pass_args(
                &source,
                workspace.path(),
                self.options.stop_on_first_error,
            ),
            working_dir,
            output_dir: workspace.path().to_path_buf(),
            job_name: job_name.clone(),
        };
        if self.options.verbose {
            info!(command = %command.display(), "compiler command");
        }

        let max_passes = self.options.max_passes.max(1);
        let mut previous: Option<RerunSignal> = None;
        let mut stabilized = false;

        for pass in 1..=max_passes {
            if cancel.is_cancelled() {
                return self.fail(FailureKind::Cancelled, Some(workspace), true);
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return self.timed_out(pass, workspace);
            }
            self.transition(JobState::Running { pass });

            let output = match self.runner.run(&command, remaining, &cancel).await {
                Ok(output) => output,
                Err(RunError::TimedOut(_)) => return self.timed_out(pass, workspace),
                Err(RunError::Cancelled) => {
                    self.diagnostics
                        .push(Diagnostic::error(pass, "compilation was cancelled"));
                    return self.fail(FailureKind::Cancelled, Some(workspace), true);
                }
                Err(e @ RunError::Spawn { .. }) | Err(e @ RunError::Io(_)) => {
                    return self.fail(FailureKind::Invocation(e.to_string()), Some(workspace), true);
                }
            };
            self.passes = pass;

            let log = workspace
                .read_log()
                .unwrap_or_else(|| output.stdout.clone());
            if self.options.verbose {
                for line in output.stdout.lines().chain(output.stderr.lines()) {
                    info!(pass, "{line}");
                }
            }

            self.diagnostics = parse_log(&log, pass);
            let errors = self.diagnostics.iter().filter(|d| d.is_error()).count();
            info!(
                pass,
                exit_code = ?output.exit_code,
                errors,
                duration_ms = output.duration.as_millis() as u64,
                "compiler pass finished"
            );

            if self.options.stop_on_first_error && errors > 0 {
                return self.fail(FailureKind::Diagnostics, Some(workspace), true);
            }

            let signal = RerunSignal::from_log(&log);
            if !signal.wants_another_pass(previous.as_ref()) {
                stabilized = true;
                break;
            }
            debug!(pass, "cross-references changed, another pass needed");
            previous = Some(signal);
        }

        if !stabilized {
            self.warnings.push(format!(
                "cross-references did not stabilize after {max_passes} pass(es)"
            ));
        }

        let extension = self.options.compiler.artifact_extension();
        if !workspace.artifact_ready(extension) {
            let kind = if self.diagnostics.iter().any(Diagnostic::is_error) {
                FailureKind::Diagnostics
            } else {
                FailureKind::NoArtifact
            };
            return self.fail(kind, Some(workspace), true);
        }
        let errors = self.diagnostics.iter().filter(|d| d.is_error()).count();
        if errors > 0 {
            self.warnings.push(format!(
                "compiler reported {errors} error(s) but produced an artifact"
            ));
        }

        let artifact = match workspace.persist_artifact(extension, &output_dir) {
            Ok(path) => path,
            Err(e) => {
                self.warnings.push(format!("could not move artifact: {e}"));
                return self.fail(FailureKind::NoArtifact, Some(workspace), true);
            }
        };

        self.finish_workspace(workspace, &output_dir, &job_name);
        self.transition(JobState::Succeeded);

        if self.options.open_after_success {
            if let Err(e) = open_artifact(&artifact) {
                warn!(error = %e, "could not open artifact");
                self.warnings.push(format!("could not open artifact: {e}"));
            }
        }

        info!(
            artifact = %artifact.display(),
            passes = self.passes,
            stabilized,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "compilation succeeded"
        );
        self.result(CompileOutcome::Succeeded, Some(artifact), stabilized)
    }

    fn transition(&mut self, next: JobState) {
        debug!(from = ?self.state, to = ?next, "job state");
        self.state = next;
    }

    fn timed_out(mut self, pass: u32, workspace: JobWorkspace) -> CompilationResult {
        self.diagnostics.push(Diagnostic::error(
            pass,
            format!(
                "compilation exceeded {:?} and was terminated",
                self.options.timeout
            ),
        ));
        self.fail(FailureKind::Timeout, Some(workspace), true)
    }

    /// Ends the job as failed. Auxiliary files (the log in particular) are
    /// kept next to the source when cleanup is off.
    fn fail(
        mut self,
        failure: FailureKind,
        workspace: Option<JobWorkspace>,
        started: bool,
    ) -> CompilationResult {
        if let Some(workspace) = workspace {
            if started && !self.options.cleanup_auxiliary_files {
                let output_dir = self
                    .options
                    .output_dir
                    .clone()
                    .or_else(|| self.source.parent().map(Path::to_path_buf))
                    .unwrap_or_else(|| PathBuf::from("."));
                let kept = workspace
                    .keep_auxiliary_files(&output_dir, self.options.compiler.artifact_extension());
                self.warnings.extend(kept);
            }
            if let Some(w) = workspace.close() {
                self.warnings.push(w);
            }
        }
        self.transition(JobState::Failed);
        warn!(failure = ?failure, passes = self.passes, "compilation failed");
        self.result(CompileOutcome::Failed { failure }, None, false)
    }

    fn finish_workspace(&mut self, workspace: JobWorkspace, output_dir: &Path, job_name: &str) {
        let extension = self.options.compiler.artifact_extension();
        if self.options.cleanup_auxiliary_files {
            self.warnings.extend(workspace.delete_auxiliary_files(extension));
            self.warnings
                .extend(remove_stale_auxiliary_files(output_dir, job_name, extension));
        } else {
            self.warnings
                .extend(workspace.keep_auxiliary_files(output_dir, extension));
        }
        if let Some(w) = workspace.close() {
            self.warnings.push(w);
        }
    }

    fn result(
        self,
        outcome: CompileOutcome,
        artifact: Option<PathBuf>,
        stabilized: bool,
    ) -> CompilationResult {
        CompilationResult {
            job_id: self.id,
            source: self.source,
            artifact,
            outcome,
            diagnostics: self.diagnostics,
            warnings: self.warnings,
            passes: self.passes,
            stabilized,
            state: self.state,
            timeout: self.options.timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::{runner::PassOutput, CancelHandle, CompilerBackend};
    use async_trait::async_trait;
    use std::{fs, sync::Mutex};

    /// What one scripted pass does to the scratch directory.
    #[derive(Clone, Default)]
    struct FakePass {
        log: String,
        artifact: bool,
        exit_code: i32,
        /// Pass takes this long (respecting the runner limit).
        delay: Option<Duration>,
    }

    impl FakePass {
        fn clean() -> Self {
            Self {
                log: "This is pdfTeX\nOutput written on resume.pdf (1 page).\n".to_string(),
                artifact: true,
                ..Self::default()
            }
        }

        fn rerun() -> Self {
            Self {
                log: "LaTeX Warning: Label(s) may have changed. Rerun to get cross-references right.\n"
                    .to_string(),
                artifact: true,
                ..Self::default()
            }
        }

        fn broken() -> Self {
            Self {
                log: "./resume.tex:12: Undefined control sequence.\nl.12 \\oops\n".to_string(),
                artifact: false,
                exit_code: 1,
                ..Self::default()
            }
        }
    }

    struct ScriptedRunner {
        passes: Mutex<Vec<FakePass>>,
        calls: Mutex<Vec<PassCommand>>,
        spawn_fails: bool,
        /// Fired while the first pass runs, which then completes normally.
        cancel_during_first_pass: Mutex<Option<CancelHandle>>,
    }

    impl ScriptedRunner {
        fn new(passes: Vec<FakePass>) -> Arc<Self> {
            Arc::new(Self {
                passes: Mutex::new(passes),
                calls: Mutex::new(Vec::new()),
                spawn_fails: false,
                cancel_during_first_pass: Mutex::new(None),
            })
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl CompilerRunner for ScriptedRunner {
        async fn run(
            &self,
            command: &PassCommand,
            limit: Duration,
            cancel: &CancelToken,
        ) -> Result<PassOutput, RunError> {
            self.calls.lock().unwrap().push(command.clone());
            if let Some(handle) = self.cancel_during_first_pass.lock().unwrap().take() {
                handle.cancel();
            }
            if self.spawn_fails {
                return Err(RunError::Spawn {
                    program: command.program.clone(),
                    source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
                });
            }
            let pass = {
                let mut passes = self.passes.lock().unwrap();
                if passes.len() > 1 {
                    passes.remove(0)
                } else {
                    passes[0].clone()
                }
            };
            if let Some(delay) = pass.delay {
                let mut cancel = cancel.clone();
                tokio::select! {
                    _ = tokio::time::sleep(delay.min(limit)) => {
                        if delay > limit {
                            return Err(RunError::TimedOut(limit));
                        }
                    }
                    _ = cancel.cancelled() => return Err(RunError::Cancelled),
                }
            }
            let file = |ext: &str| command.output_dir.join(format!("{}.{ext}", command.job_name));
            fs::write(file("log"), &pass.log).unwrap();
            fs::write(file("aux"), "\\relax\n").unwrap();
            if pass.artifact {
                fs::write(file("pdf"), "%PDF-1.5 fake").unwrap();
            }
            Ok(PassOutput {
                exit_code: Some(pass.exit_code),
                stdout: String::new(),
                stderr: String::new(),
                duration: Duration::from_millis(5),
            })
        }
    }

    fn source_in(dir: &Path) -> PathBuf {
        let path = dir.join("resume.tex");
        fs::write(&path, "\\documentclass{article}\\begin{document}x\\end{document}").unwrap();
        path
    }

    fn listing(dir: &Path) -> Vec<String> {
        let mut names: Vec<_> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    async fn run_job(
        runner: Arc<ScriptedRunner>,
        source: &Path,
        options: CompileOptions,
    ) -> CompilationResult {
        CompileJob::new(source, options, runner)
            .run(CancelToken::never())
            .await
    }

    #[tokio::test]
    async fn test_clean_document_succeeds_in_one_pass() {
        let dir = tempfile::tempdir().unwrap();
        let source = source_in(dir.path());
        let runner = ScriptedRunner::new(vec![FakePass::clean()]);

        let result = run_job(runner.clone(), &source, CompileOptions::default()).await;
        assert!(result.is_success());
        assert_eq!(result.passes, 1);
        assert!(result.stabilized);
        assert_eq!(runner.call_count(), 1);
        let artifact = result.artifact.clone().unwrap();
        assert_eq!(artifact.file_name().unwrap(), "resume.pdf");
        assert_eq!(artifact.parent().unwrap(), source.canonicalize().unwrap().parent().unwrap());
        assert_eq!(result.into_result().unwrap(), artifact);
    }

    #[tokio::test]
    async fn test_cleanup_leaves_only_source_and_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let source = source_in(dir.path());
        fs::write(dir.path().join("resume.aux"), "stale").unwrap();
        let runner = ScriptedRunner::new(vec![FakePass::clean()]);
        let options = CompileOptions {
            cleanup_auxiliary_files: true,
            ..CompileOptions::default()
        };

        let result = run_job(runner, &source, options).await;
        assert!(result.is_success());
        assert!(result.warnings.is_empty(), "{:?}", result.warnings);
        assert_eq!(listing(dir.path()), vec!["resume.pdf", "resume.tex"]);
    }

    #[tokio::test]
    async fn test_cleanup_keeps_a_dvi_artifact_from_another_job() {
        let dir = tempfile::tempdir().unwrap();
        let source = source_in(dir.path());
        fs::write(dir.path().join("resume.dvi"), "dvi from a latex job").unwrap();
        let options = CompileOptions {
            cleanup_auxiliary_files: true,
            ..CompileOptions::default()
        };

        let result = run_job(ScriptedRunner::new(vec![FakePass::clean()]), &source, options).await;
        assert!(result.is_success());
        assert_eq!(listing(dir.path()), vec!["resume.dvi", "resume.pdf", "resume.tex"]);
    }

    #[tokio::test]
    async fn test_without_cleanup_aux_files_sit_next_to_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let source = source_in(dir.path());
        let runner = ScriptedRunner::new(vec![FakePass::clean()]);

        let result = run_job(runner, &source, CompileOptions::default()).await;
        assert!(result.is_success());
        assert_eq!(
            listing(dir.path()),
            vec!["resume.aux", "resume.log", "resume.pdf", "resume.tex"]
        );
    }

    #[tokio::test]
    async fn test_rerun_requests_extra_passes_until_stable() {
        let dir = tempfile::tempdir().unwrap();
        let source = source_in(dir.path());
        let runner = ScriptedRunner::new(vec![FakePass::rerun(), FakePass::clean()]);

        let result = run_job(runner.clone(), &source, CompileOptions::default()).await;
        assert!(result.is_success());
        assert_eq!(result.passes, 2);
        assert!(result.stabilized);
        assert_eq!(runner.call_count(), 2);
    }

    #[tokio::test]
    async fn test_never_stabilizing_is_a_warning_not_a_failure() {
        let dir = tempfile::tempdir().unwrap();
        let source = source_in(dir.path());
        let runner = ScriptedRunner::new(vec![FakePass::rerun()]);

        let result = run_job(runner.clone(), &source, CompileOptions::default()).await;
        assert!(result.is_success());
        assert_eq!(result.passes, 3);
        assert!(!result.stabilized);
        assert!(result.warnings.iter().any(|w| w.contains("did not stabilize")));
        assert_eq!(runner.call_count(), 3);
    }

    #[tokio::test]
    async fn test_artifact_despite_nonzero_exit_is_success() {
        let dir = tempfile::tempdir().unwrap();
        let source = source_in(dir.path());
        let pass = FakePass {
            exit_code: 1,
            ..FakePass::clean()
        };
        let result = run_job(ScriptedRunner::new(vec![pass]), &source, CompileOptions::default()).await;
        assert!(result.is_success());
    }

    #[tokio::test]
    async fn test_errors_with_artifact_succeed_with_warning() {
        let dir = tempfile::tempdir().unwrap();
        let source = source_in(dir.path());
        let pass = FakePass {
            artifact: true,
            ..FakePass::broken()
        };
        let result = run_job(ScriptedRunner::new(vec![pass]), &source, CompileOptions::default()).await;
        assert!(result.is_success());
        assert_eq!(result.errors().count(), 1);
        assert!(result.warnings.iter().any(|w| w.contains("1 error(s)")));
    }

    #[tokio::test]
    async fn test_errors_without_artifact_fail_with_diagnostics() {
        let dir = tempfile::tempdir().unwrap();
        let source = source_in(dir.path());
        let result =
            run_job(ScriptedRunner::new(vec![FakePass::broken()]), &source, CompileOptions::default()).await;

        assert_eq!(
            result.outcome,
            CompileOutcome::Failed {
                failure: FailureKind::Diagnostics
            }
        );
        assert!(result.artifact.is_none());
        let diag = result.errors().next().unwrap();
        assert_eq!(diag.line, Some(12));
        // The log is kept for inspection when cleanup is off.
        assert!(dir.path().join("resume.log").exists());
        match result.into_result().unwrap_err() {
            AppError::CompilerDiagnostics { diagnostics, summary } => {
                assert_eq!(diagnostics.len(), 1);
                assert!(summary.contains("Undefined control sequence"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_stop_on_first_error_aborts_after_the_failing_pass() {
        let dir = tempfile::tempdir().unwrap();
        let source = source_in(dir.path());
        let flaky = FakePass {
            artifact: true,
            ..FakePass::broken()
        };
        let runner = ScriptedRunner::new(vec![flaky, FakePass::clean()]);
        let options = CompileOptions {
            stop_on_first_error: true,
            ..CompileOptions::default()
        };

        let result = run_job(runner.clone(), &source, options).await;
        assert!(!result.is_success());
        assert_eq!(runner.call_count(), 1);
        assert_eq!(result.passes, 1);
        let calls = runner.calls.lock().unwrap();
        assert!(calls[0].args.iter().any(|a| a == "-halt-on-error"));
    }

    #[tokio::test]
    async fn test_empty_artifact_is_not_success() {
        let dir = tempfile::tempdir().unwrap();
        let source = source_in(dir.path());
        let pass = FakePass {
            artifact: false,
            ..FakePass::clean()
        };
        let result = run_job(ScriptedRunner::new(vec![pass]), &source, CompileOptions::default()).await;
        assert_eq!(
            result.outcome,
            CompileOutcome::Failed {
                failure: FailureKind::NoArtifact
            }
        );
    }

    #[tokio::test]
    async fn test_missing_source_fails_as_invocation() {
        let dir = tempfile::tempdir().unwrap();
        let runner = ScriptedRunner::new(vec![FakePass::clean()]);
        let result = run_job(
            runner.clone(),
            &dir.path().join("absent.tex"),
            CompileOptions::default(),
        )
        .await;
        assert!(matches!(
            result.outcome,
            CompileOutcome::Failed {
                failure: FailureKind::Invocation(_)
            }
        ));
        assert_eq!(runner.call_count(), 0);
        assert_eq!(result.into_result().unwrap_err().code(), "COMPILER_INVOCATION_ERROR");
    }

    #[tokio::test]
    async fn test_spawn_failure_is_invocation_failure() {
        let dir = tempfile::tempdir().unwrap();
        let source = source_in(dir.path());
        let runner = Arc::new(ScriptedRunner {
            passes: Mutex::new(vec![FakePass::clean()]),
            calls: Mutex::new(Vec::new()),
            spawn_fails: true,
            cancel_during_first_pass: Mutex::new(None),
        });
        let result = run_job(runner, &source, CompileOptions::default()).await;
        match &result.outcome {
            CompileOutcome::Failed {
                failure: FailureKind::Invocation(reason),
            } => assert!(reason.contains("pdflatex")),
            other => panic!("unexpected outcome: {other:?}"),
        }
        // No scratch directory is left behind.
        assert_eq!(listing(dir.path()), vec!["resume.tex"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_reports_timeout_failure() {
        let dir = tempfile::tempdir().unwrap();
        let source = source_in(dir.path());
        let slow = FakePass {
            delay: Some(Duration::from_secs(600)),
            ..FakePass::clean()
        };
        let options = CompileOptions {
            timeout: Duration::from_secs(5),
            cleanup_auxiliary_files: true,
            ..CompileOptions::default()
        };
        let result = run_job(ScriptedRunner::new(vec![slow]), &source, options).await;
        assert_eq!(
            result.outcome,
            CompileOutcome::Failed {
                failure: FailureKind::Timeout
            }
        );
        assert!(result.errors().any(|d| d.message.contains("exceeded 5s")));
        let err = result.into_result().unwrap_err();
        assert_eq!(err.code(), "TIMEOUT");
        assert_eq!(err.to_string(), "Compilation timed out after 5s");
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_stops_the_job() {
        let dir = tempfile::tempdir().unwrap();
        let source = source_in(dir.path());
        let slow = FakePass {
            delay: Some(Duration::from_secs(60)),
            ..FakePass::clean()
        };
        let (handle, token) = crate::compiler::cancel_pair();
        let job = CompileJob::new(&source, CompileOptions::default(), ScriptedRunner::new(vec![slow]));
        let task = tokio::spawn(job.run(token));
        tokio::time::sleep(Duration::from_secs(1)).await;
        handle.cancel();
        let result = task.await.unwrap();
        assert_eq!(
            result.outcome,
            CompileOutcome::Failed {
                failure: FailureKind::Cancelled
            }
        );
    }

    #[tokio::test]
    async fn test_cancellation_between_passes_skips_remaining_passes() {
        let dir = tempfile::tempdir().unwrap();
        let source = source_in(dir.path());
        let (handle, token) = crate::compiler::cancel_pair();
        let runner = ScriptedRunner::new(vec![FakePass::rerun()]);
        *runner.cancel_during_first_pass.lock().unwrap() = Some(handle);

        let result = CompileJob::new(&source, CompileOptions::default(), runner.clone())
            .run(token)
            .await;
        assert_eq!(
            result.outcome,
            CompileOutcome::Failed {
                failure: FailureKind::Cancelled
            }
        );
        assert_eq!(result.passes, 1);
        assert_eq!(runner.call_count(), 1);
        assert_eq!(result.state, JobState::Failed);
        assert!(result.artifact.is_none());
        assert_eq!(result.into_result().unwrap_err().code(), "CANCELLED");
    }

    #[tokio::test(start_paused = true)]
    async fn test_sub_second_timeout_is_reported_precisely() {
        let dir = tempfile::tempdir().unwrap();
        let source = source_in(dir.path());
        let slow = FakePass {
            delay: Some(Duration::from_secs(10)),
            ..FakePass::clean()
        };
        let options = CompileOptions {
            timeout: Duration::from_millis(250),
            ..CompileOptions::default()
        };
        let result = run_job(ScriptedRunner::new(vec![slow]), &source, options).await;
        assert!(result.errors().any(|d| d.message.contains("exceeded 250ms")));
        assert_eq!(
            result.into_result().unwrap_err().to_string(),
            "Compilation timed out after 250ms"
        );
    }

    #[tokio::test]
    async fn test_concurrent_jobs_with_same_base_name_do_not_collide() {
        let dir = tempfile::tempdir().unwrap();
        let a_dir = dir.path().join("a");
        let b_dir = dir.path().join("b");
        fs::create_dir_all(&a_dir).unwrap();
        fs::create_dir_all(&b_dir).unwrap();
        let out = dir.path().join("out");
        let options = |d: &Path| CompileOptions {
            output_dir: Some(d.to_path_buf()),
            cleanup_auxiliary_files: true,
            ..CompileOptions::default()
        };
        let first = CompileJob::new(&source_in(&a_dir), options(&out), ScriptedRunner::new(vec![FakePass::clean()]));
        let second = CompileJob::new(&source_in(&b_dir), options(&out), ScriptedRunner::new(vec![FakePass::clean()]));
        assert_ne!(first.id(), second.id());

        let (a, b) = tokio::join!(first.run(CancelToken::never()), second.run(CancelToken::never()));
        assert!(a.is_success() && b.is_success());
        assert_eq!(a.state, JobState::Succeeded);
        assert_eq!(listing(&out), vec!["resume.pdf"]);
    }

    #[tokio::test]
    async fn test_dvi_backend_expects_dvi_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let source = source_in(dir.path());
        // The scripted runner only ever writes a .pdf.
        let options = CompileOptions {
            compiler: CompilerBackend::Latex,
            ..CompileOptions::default()
        };
        let result = run_job(ScriptedRunner::new(vec![FakePass::clean()]), &source, options).await;
        assert!(!result.is_success());
    }

    #[test]
    fn test_terminal_states() {
        assert!(JobState::Succeeded.is_terminal());
        assert!(JobState::Failed.is_terminal());
        assert!(!JobState::Running { pass: 1 }.is_terminal());
        assert!(!JobState::Pending.is_terminal());
    }
}
