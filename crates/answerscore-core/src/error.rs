//! Error types for the grading pipeline.
//!
//! Extraction failures are classified so the caller can tell "no such file"
//! from "not a PDF" without string matching. Everything that aborts a grading
//! run surfaces as a [`GradeError`].

use std::path::PathBuf;

use thiserror::Error;

/// Failures reading text out of a PDF.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// Nothing exists at the given path.
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// The file exists but could not be opened or parsed as a PDF.
    #[error("failed to read PDF {}: {message}", path.display())]
    Unreadable { path: PathBuf, message: String },
}

impl ExtractionError {
    pub fn path(&self) -> &std::path::Path {
        match self {
            ExtractionError::FileNotFound(path) => path,
            ExtractionError::Unreadable { path, .. } => path,
        }
    }
}

/// Errors that abort a grading run. No partial grade is produced.
#[derive(Debug, Error)]
pub enum GradeError {
    /// One of the two PDFs is missing or unreadable.
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    /// An embedding or classification call failed where no fallback exists.
    #[error("model call failed: {0:#}")]
    Model(anyhow::Error),

    /// A background task panicked or was cancelled.
    #[error("grading task failed: {0}")]
    Task(String),
}
