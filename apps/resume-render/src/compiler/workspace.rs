//! Per-job scratch directory.
//!
//! Every compilation writes into its own hidden directory inside the output
//! directory, so concurrent jobs over documents sharing a base name never
//! see each other's auxiliary files. Only the artifact (and, when cleanup is
//! off, the auxiliary files) are moved out when the job finishes.

use std::{
    fs,
    path::{Path, PathBuf},
};

use tempfile::TempDir;
use tracing::debug;

use super::CompilerBackend;
use crate::errors::AppError;

/// Extensions the TeX toolchain leaves behind next to an artifact.
pub const AUXILIARY_EXTENSIONS: &[&str] = &[
    "aux",
    "log",
    "out",
    "toc",
    "lof",
    "lot",
    "bbl",
    "blg",
    "fls",
    "fdb_latexmk",
    "synctex.gz",
    "nav",
    "snm",
    "vrb",
    "run.xml",
    "bcf",
    "dvi",
];

const SCRATCH_PREFIX: &str = ".texjob-";

#[derive(Debug)]
pub struct JobWorkspace {
    dir: TempDir,
    job_name: String,
}

impl JobWorkspace {
    pub fn create(output_dir: &Path, job_name: &str) -> Result<Self, AppError> {
        fs::create_dir_all(output_dir).map_err(|e| AppError::io(output_dir, e))?;
        let dir = tempfile::Builder::new()
            .prefix(SCRATCH_PREFIX)
            .tempdir_in(output_dir)
            .map_err(|e| AppError::io(output_dir, e))?;
        debug!(scratch = %dir.path().display(), "created job workspace");
        Ok(Self {
            dir,
            job_name: job_name.to_string(),
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn file(&self, extension: &str) -> PathBuf {
        self.dir
            .path()
            .join(format!("{}.{extension}", self.job_name))
    }

    /// The current pass's log, if the compiler got far enough to write one.
    pub fn read_log(&self) -> Option<String> {
        fs::read(self.file("log"))
            .ok()
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
    }

    /// True when the artifact exists and is non-empty.
    pub fn artifact_ready(&self, extension: &str) -> bool {
        fs::metadata(self.file(extension))
            .map(|m| m.is_file() && m.len() > 0)
            .unwrap_or(false)
    }

    /// Moves the artifact into `output_dir`, replacing any previous one.
    pub fn persist_artifact(&self, extension: &str, output_dir: &Path) -> Result<PathBuf, AppError> {
        let from = self.file(extension);
        let to = output_dir.join(format!("{}.{extension}", self.job_name));
        move_file(&from, &to)?;
        Ok(to)
    }

    /// Moves every auxiliary file next to the artifact. Returns one warning
    /// per file that could not be moved.
    pub fn keep_auxiliary_files(&self, output_dir: &Path, artifact_extension: &str) -> Vec<String> {
        let mut warnings = Vec::new();
        for ext in auxiliary_extensions(artifact_extension) {
            let from = self.file(ext);
            if !from.exists() {
                continue;
            }
            let to = output_dir.join(format!("{}.{ext}", self.job_name));
            if let Err(e) = move_file(&from, &to) {
                warnings.push(format!("could not keep auxiliary file: {e}"));
            }
        }
        warnings
    }

    /// Deletes the auxiliary files in the scratch directory.
    pub fn delete_auxiliary_files(&self, artifact_extension: &str) -> Vec<String> {
        auxiliary_extensions(artifact_extension)
            .filter_map(|ext| remove_if_present(&self.file(ext)))
            .collect()
    }

    /// Removes the scratch directory. Returns a warning on failure.
    pub fn close(self) -> Option<String> {
        let path = self.dir.path().to_path_buf();
        self.dir
            .close()
            .err()
            .map(|e| format!("could not remove scratch directory {}: {e}", path.display()))
    }
}

/// Removes `<job_name>.<ext>` leftovers in `output_dir` from earlier runs
/// that compiled in place. Extensions any backend produces as its artifact
/// are left alone: another job may have put its artifact there.
pub fn remove_stale_auxiliary_files(
    output_dir: &Path,
    job_name: &str,
    artifact_extension: &str,
) -> Vec<String> {
    auxiliary_extensions(artifact_extension)
        .filter(|ext| !is_artifact_extension(ext))
        .filter_map(|ext| remove_if_present(&output_dir.join(format!("{job_name}.{ext}"))))
        .collect()
}

fn is_artifact_extension(extension: &str) -> bool {
    CompilerBackend::ALL
        .iter()
        .any(|backend| backend.artifact_extension() == extension)
}

fn auxiliary_extensions(artifact_extension: &str) -> impl Iterator<Item = &'static str> + '_ {
    AUXILIARY_EXTENSIONS
        .iter()
        .copied()
        .filter(move |ext| *ext != artifact_extension)
}

fn remove_if_present(path: &Path) -> Option<String> {
    match fs::remove_file(path) {
        Ok(()) => {
            debug!(file = %path.display(), "removed auxiliary file");
            None
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(e) => Some(format!("could not delete {}: {e}", path.display())),
    }
}

fn move_file(from: &Path, to: &Path) -> Result<(), AppError> {
    if fs::rename(from, to).is_ok() {
        return Ok(());
    }
    // Cross-device fallback.
    fs::copy(from, to).map_err(|e| AppError::io(to, e))?;
    fs::remove_file(from).map_err(|e| AppError::io(from, e))
}
