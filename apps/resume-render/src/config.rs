use std::{path::PathBuf, str::FromStr, time::Duration};

use anyhow::{bail, Context, Result};

use crate::compiler::{CompileOptions, CompilerBackend, DEFAULT_MAX_PASSES, DEFAULT_TIMEOUT};
use crate::pipeline::GenerateOptions;

pub const MAX_PASSES_LIMIT: u32 = 5;

/// Application configuration loaded from environment variables.
/// Every setting is optional; CLI flags override what is read here.
#[derive(Debug, Clone)]
pub struct Config {
    pub compile_after_render: bool,
    pub compiler: CompilerBackend,
    pub compiler_program: Option<String>,
    pub output_dir: Option<PathBuf>,
    pub stop_on_first_error: bool,
    pub verbose: bool,
    pub open_after_success: bool,
    pub cleanup_auxiliary_files: bool,
    pub max_passes: u32,
    pub compile_timeout: Duration,
    pub template: Option<PathBuf>,
    pub rust_log: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            compile_after_render: false,
            compiler: CompilerBackend::default(),
            compiler_program: None,
            output_dir: None,
            stop_on_first_error: false,
            verbose: false,
            open_after_success: false,
            cleanup_auxiliary_files: false,
            max_passes: DEFAULT_MAX_PASSES,
            compile_timeout: DEFAULT_TIMEOUT,
            template: None,
            rust_log: "info".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key lookup, so tests need not touch the
    /// process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Config::default();
        let max_passes = parse_var(&lookup, "RESUME_MAX_PASSES")?.unwrap_or(defaults.max_passes);
        if !(1..=MAX_PASSES_LIMIT).contains(&max_passes) {
            bail!("RESUME_MAX_PASSES must be between 1 and {MAX_PASSES_LIMIT}, got {max_passes}");
        }
        let compiler = match lookup("RESUME_COMPILER") {
            Some(raw) => CompilerBackend::from_str(&raw)
                .map_err(anyhow::Error::from)
                .context("RESUME_COMPILER is not a supported compiler")?,
            None => defaults.compiler,
        };

        Ok(Config {
            compile_after_render: flag(&lookup, "RESUME_COMPILE")?,
            compiler,
            compiler_program: non_empty(lookup("RESUME_COMPILER_BIN")),
            output_dir: non_empty(lookup("RESUME_OUTPUT_DIR")).map(PathBuf::from),
            stop_on_first_error: flag(&lookup, "RESUME_STOP_ON_ERROR")?,
            verbose: flag(&lookup, "RESUME_VERBOSE")?,
            open_after_success: flag(&lookup, "RESUME_OPEN")?,
            cleanup_auxiliary_files: flag(&lookup, "RESUME_CLEANUP")?,
            max_passes,
            compile_timeout: parse_var::<u64>(&lookup, "RESUME_COMPILE_TIMEOUT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.compile_timeout),
            template: non_empty(lookup("RESUME_TEMPLATE")).map(PathBuf::from),
            rust_log: lookup("RUST_LOG").unwrap_or(defaults.rust_log),
        })
    }

    pub fn compile_options(&self) -> CompileOptions {
        CompileOptions {
            compiler: self.compiler,
            compiler_program: self.compiler_program.clone(),
            output_dir: self.output_dir.clone(),
            stop_on_first_error: self.stop_on_first_error,
            verbose: self.verbose,
            open_after_success: self.open_after_success,
            cleanup_auxiliary_files: self.cleanup_auxiliary_files,
            max_passes: self.max_passes,
            timeout: self.compile_timeout,
        }
    }

    pub fn generate_options(&self) -> GenerateOptions {
        GenerateOptions {
            compile_after_render: self.compile_after_render,
            compile: self.compile_options(),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn flag(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<bool> {
    match non_empty(lookup(key)) {
        None => Ok(false),
        Some(raw) => parse_bool(&raw).with_context(|| format!("{key} must be a boolean, got '{raw}'")),
    }
}

fn parse_bool(raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => bail!("unrecognised boolean '{other}'"),
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    non_empty(lookup(key))
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .with_context(|| format!("{key} must be a number, got '{raw}'"))
        })
        .transpose()
}
