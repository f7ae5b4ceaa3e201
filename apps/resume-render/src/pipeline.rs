//! End-to-end flow: raw record → validated record → fragments → document,
//! then optionally a compiled artifact.

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::compiler::{self, CompilationResult, CompileOptions};
use crate::errors::AppError;
use crate::sections::format_all;
use crate::template::{self, remaining_placeholders, DEFAULT_TEMPLATE};
use crate::validation::{into_record, unwrap_envelope};

/// Fully substituted markup, ready to be written or compiled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDocument {
    pub text: String,
}

impl RenderedDocument {
    pub async fn write_to(&self, path: &Path) -> Result<(), AppError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::io(parent, e))?;
        }
        tokio::fs::write(path, &self.text)
            .await
            .map_err(|e| AppError::io(path, e))
    }
}

/// Validates `raw` and renders it into `template`. Pure; no I/O.
pub fn render_document(raw: &Value, template: &str) -> Result<RenderedDocument, AppError> {
    let record = into_record(unwrap_envelope(raw))?;
    let fragments = format_all(&record)?;
    let text = template::render(template, &fragments);

    let leftover = remaining_placeholders(&text);
    if !leftover.is_empty() {
        let names: Vec<String> = leftover.iter().map(ToString::to_string).collect();
        return Err(AppError::render(
            "template",
            format!("placeholders left after substitution: {}", names.join(", ")),
        ));
    }
    Ok(RenderedDocument { text })
}

pub async fn load_record(path: &Path) -> Result<Value, AppError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| AppError::io(path, e))?;
    serde_json::from_slice(&bytes).map_err(|source| AppError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Reads a template file, or returns the bundled one.
pub async fn load_template(path: Option<&Path>) -> Result<String, AppError> {
    match path {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .map_err(|e| AppError::io(path, e)),
        None => Ok(DEFAULT_TEMPLATE.to_string()),
    }
}

#[derive(Debug, Clone, Default)]
pub struct GenerateRequest {
    pub record: PathBuf,
    pub template: Option<PathBuf>,
    /// Explicit `.tex` destination. Defaults to `<output dir>/<record stem>.tex`.
    pub output: Option<PathBuf>,
}

#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    pub compile_after_render: bool,
    pub compile: CompileOptions,
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerateReport {
    pub rendered: PathBuf,
    pub compilation: Option<CompilationResult>,
}

impl GenerateReport {
    pub fn is_success(&self) -> bool {
        self.compilation
            .as_ref()
            .map_or(true, CompilationResult::is_success)
    }
}

/// Reads, renders and writes the document, then compiles it when asked.
///
/// Render failures are returned as errors. A failed compilation is not: it
/// comes back inside the report so callers can inspect its diagnostics.
pub async fn generate(
    request: &GenerateRequest,
    options: &GenerateOptions,
) -> Result<GenerateReport, AppError> {
    let raw = load_record(&request.record).await?;
    let template = load_template(request.template.as_deref()).await?;
    let document = render_document(&raw, &template)?;

    let rendered = output_path(request, &options.compile);
    document.write_to(&rendered).await?;
    info!(path = %rendered.display(), bytes = document.text.len(), "rendered document");

    if !options.compile_after_render {
        return Ok(GenerateReport {
            rendered,
            compilation: None,
        });
    }

    let mut compile_options = options.compile.clone();
    if compile_options.output_dir.is_none() {
        compile_options.output_dir = rendered.parent().map(Path::to_path_buf);
    }
    let result = compiler::compile(&rendered, &compile_options).await;
    for warning in &result.warnings {
        warn!("{warning}");
    }

    Ok(GenerateReport {
        rendered,
        compilation: Some(result),
    })
}

fn output_path(request: &GenerateRequest, options: &CompileOptions) -> PathBuf {
    if let Some(path) = &request.output {
        return path.clone();
    }
    let stem = request
        .record
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "resume".to_string());
    let dir = options
        .output_dir
        .clone()
        .or_else(|| request.record.parent().map(Path::to_path_buf))
        .unwrap_or_default();
    dir.join(format!("{stem}.tex"))
}
