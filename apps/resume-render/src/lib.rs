//! Resume rendering core: validates a structured resume record, renders it
//! into a LaTeX template, and drives a multi-pass TeX compiler.

pub mod compiler;
pub mod config;
pub mod errors;
pub mod escape;
pub mod models;
pub mod pipeline;
pub mod sections;
pub mod template;
pub mod validation;

pub use compiler::{CompilationResult, CompileOptions, CompilerBackend};
pub use errors::AppError;
pub use pipeline::{
    generate, render_document, GenerateOptions, GenerateReport, GenerateRequest, RenderedDocument,
};
