//! TeX compilation: backend selection, pass execution and artifact handling.

pub mod diagnostics;
pub mod opener;
pub mod orchestrator;
pub mod runner;
pub mod workspace;

use std::{
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

use serde::{Deserialize, Serialize};

use crate::errors::AppError;

pub use diagnostics::{needs_rerun, parse_log, Diagnostic, RerunSignal, Severity};
pub use orchestrator::{
    compile, CompilationResult, CompileJob, CompileOutcome, FailureKind, JobState,
};
pub use runner::{
    cancel_pair, CancelHandle, CancelToken, CompilerRunner, PassCommand, PassOutput, ProcessRunner,
};

pub const DEFAULT_MAX_PASSES: u32 = 3;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Supported TeX engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompilerBackend {
    /// Standard engine, PDF output.
    #[default]
    Pdflatex,
    /// Extended-unicode engine with system font support.
    Xelatex,
    /// Script-oriented engine.
    Lualatex,
    /// Classic engine producing DVI.
    Latex,
}

impl CompilerBackend {
    pub const ALL: [CompilerBackend; 4] = [
        CompilerBackend::Pdflatex,
        CompilerBackend::Xelatex,
        CompilerBackend::Lualatex,
        CompilerBackend::Latex,
    ];

    pub fn program(self) -> &'static str {
        match self {
            CompilerBackend::Pdflatex => "pdflatex",
            CompilerBackend::Xelatex => "xelatex",
            CompilerBackend::Lualatex => "lualatex",
            CompilerBackend::Latex => "latex",
        }
    }

    pub fn artifact_extension(self) -> &'static str {
        match self {
            CompilerBackend::Latex => "dvi",
            _ => "pdf",
        }
    }

    /// Arguments for one pass over `source`, writing into `output_dir`.
    pub fn pass_args(self, source: &Path, output_dir: &Path, halt_on_error: bool) -> Vec<String> {
        let mut args = vec![
            "-interaction=nonstopmode".to_string(),
            "-file-line-error".to_string(),
        ];
        if halt_on_error {
            args.push("-halt-on-error".to_string());
        }
        args.push(format!("-output-directory={}", output_dir.display()));
        args.push(source.display().to_string());
        args
    }
}

impl fmt::Display for CompilerBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.program())
    }
}

impl FromStr for CompilerBackend {
    type Err = AppError;

    /// Accepts program names and role aliases, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pdflatex" | "standard" => Ok(CompilerBackend::Pdflatex),
            "xelatex" | "extended-unicode" | "unicode" => Ok(CompilerBackend::Xelatex),
            "lualatex" | "script-oriented" | "script" => Ok(CompilerBackend::Lualatex),
            "latex" | "dvi" => Ok(CompilerBackend::Latex),
            other => Err(AppError::Config(format!(
                "unknown compiler '{other}' (expected pdflatex, xelatex, lualatex or latex)"
            ))),
        }
    }
}

/// Settings for one compilation job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileOptions {
    pub compiler: CompilerBackend,
    /// Overrides the executable path; defaults to [`CompilerBackend::program`].
    pub compiler_program: Option<String>,
    /// Where the artifact lands. Defaults to the source document's directory.
    pub output_dir: Option<PathBuf>,
    pub stop_on_first_error: bool,
    pub verbose: bool,
    pub open_after_success: bool,
    pub cleanup_auxiliary_files: bool,
    pub max_passes: u32,
    /// Budget for the whole job, across every pass.
    pub timeout: Duration,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            compiler: CompilerBackend::default(),
            compiler_program: None,
            output_dir: None,
            stop_on_first_error: false,
            verbose: false,
            open_after_success: false,
            cleanup_auxiliary_files: false,
            max_passes: DEFAULT_MAX_PASSES,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl CompileOptions {
    pub fn program(&self) -> &str {
        self.compiler_program
            .as_deref()
            .unwrap_or_else(|| self.compiler.program())
    }
}
