//! resume-render: turns a JSON resume record into LaTeX and, optionally, a PDF.
//!
//! Usage:
//!   resume-render render --json <PATH> [OPTIONS]   Render (and compile) a record
//!   resume-render validate --json <PATH>           Report field problems

use std::{path::PathBuf, process::ExitCode, time::Duration};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use resume_render::{
    config::{Config, MAX_PASSES_LIMIT},
    pipeline::{self, GenerateRequest},
    validation::{unwrap_envelope, validate},
    CompilerBackend,
};

#[derive(Parser)]
#[command(
    name = "resume-render",
    about = "Render a JSON resume into LaTeX and compile it",
    version
)]
struct Cli {
    /// Verbose logging and compiler output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a record to a .tex file, optionally compiling it
    Render {
        /// Resume record (JSON)
        #[arg(long)]
        json: PathBuf,

        /// Template with {{PLACEHOLDER}} slots (defaults to the bundled one)
        #[arg(long)]
        template: Option<PathBuf>,

        /// Explicit .tex output path
        #[arg(long)]
        output: Option<PathBuf>,

        /// Compile after rendering
        #[arg(short = 'c', long)]
        compile: bool,

        /// pdflatex | xelatex | lualatex | latex (or standard, extended-unicode, script-oriented)
        #[arg(long, value_parser = parse_backend)]
        compiler: Option<CompilerBackend>,

        /// Directory for the rendered source and the artifact
        #[arg(short = 'o', long)]
        output_dir: Option<PathBuf>,

        /// Abort on the first error-severity diagnostic
        #[arg(short = 's', long)]
        stop_on_error: bool,

        /// Open the artifact after a successful compile
        #[arg(short = 'p', long)]
        open: bool,

        /// Delete auxiliary files after compiling
        #[arg(short = 'C', long)]
        cleanup: bool,

        /// Maximum compiler passes
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..=MAX_PASSES_LIMIT as i64))]
        max_passes: Option<u32>,

        /// Overall compile timeout in seconds
        #[arg(long)]
        timeout_secs: Option<u64>,

        /// Print the report as JSON on stdout
        #[arg(long)]
        report: bool,
    },

    /// Check a record and list every field problem
    Validate {
        /// Resume record (JSON)
        #[arg(long)]
        json: PathBuf,
    },
}

fn parse_backend(raw: &str) -> Result<CompilerBackend, String> {
    raw.parse().map_err(|e: resume_render::AppError| e.to_string())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("configuration error: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    let level = if cli.verbose || config.verbose {
        "debug"
    } else {
        config.rust_log.as_str()
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={level}", env!("CARGO_CRATE_NAME")))
        }))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run(cli, config).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, mut config: Config) -> Result<bool> {
    config.verbose |= cli.verbose;

    match cli.command {
        Commands::Render {
            json,
            template,
            output,
            compile,
            compiler,
            output_dir,
            stop_on_error,
            open,
            cleanup,
            max_passes,
            timeout_secs,
            report,
        } => {
            config.compile_after_render |= compile;
            config.stop_on_first_error |= stop_on_error;
            config.open_after_success |= open;
            config.cleanup_auxiliary_files |= cleanup;
            if let Some(compiler) = compiler {
                config.compiler = compiler;
            }
            if output_dir.is_some() {
                config.output_dir = output_dir;
            }
            if let Some(passes) = max_passes {
                config.max_passes = passes;
            }
            if let Some(secs) = timeout_secs {
                config.compile_timeout = Duration::from_secs(secs);
            }

            let request = GenerateRequest {
                record: json,
                template: template.or_else(|| config.template.clone()),
                output,
            };
            info!("Starting resume-render v{}", env!("CARGO_PKG_VERSION"));
            let result = pipeline::generate(&request, &config.generate_options())
                .await
                .with_context(|| format!("failed to render {}", request.record.display()))?;

            if report {
                println!("{}", serde_json::to_string_pretty(&result)?);
            }
            info!(path = %result.rendered.display(), "wrote LaTeX source");

            let Some(compilation) = result.compilation else {
                return Ok(true);
            };
            for diag in compilation.errors() {
                warn!("{diag}");
            }
            let success = compilation.is_success();
            match compilation.into_result() {
                Ok(artifact) => info!(artifact = %artifact.display(), "compiled"),
                Err(e) => error!(code = e.code(), "{e}"),
            }
            Ok(success)
        }

        Commands::Validate { json } => {
            let raw = pipeline::load_record(&json).await?;
            let report = validate(unwrap_envelope(&raw))?;
            if report.is_ok() {
                println!("{}: ok", json.display());
                return Ok(true);
            }
            println!("{}: {} problem(s)", json.display(), report.problems.len());
            for problem in &report.problems {
                println!("  {}: {}", problem.path, problem.reason);
            }
            Ok(false)
        }
    }
}
