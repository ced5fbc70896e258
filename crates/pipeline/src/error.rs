use repowiki_generation::GenerationError;
use repowiki_protocol::RepoUrlError;
use repowiki_vector_store::VectorStoreError;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PipelineError>;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Invalid repository URL: {0}")]
    InvalidRepoUrl(#[from] RepoUrlError),

    #[error("{0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("No valid files: {0}")]
    NoValidFiles(String),

    #[error("Generation error: {0}")]
    GenerationError(#[from] GenerationError),

    #[error("Vector store error: {0}")]
    VectorStoreError(#[from] VectorStoreError),

    #[error("Content source error: {0}")]
    SourceError(String),

    #[error("Store error: {0}")]
    StoreError(String),

    #[error("Run exceeded its {0:?} budget")]
    Timeout(Duration),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

/// Caller-visible outcome class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidInput,
    NotFound,
    NoValidFiles,
    Internal,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InvalidInput => "invalid_input",
            Self::NotFound => "not_found",
            Self::NoValidFiles => "no_valid_files",
            Self::Internal => "internal",
        }
    }
}

/// The only error type returned by the public entry points.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{message}")]
pub struct GenerateError {
    pub kind: ErrorKind,
    pub message: String,
}

impl GenerateError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl From<PipelineError> for GenerateError {
    fn from(err: PipelineError) -> Self {
        let kind = match &err {
            PipelineError::InvalidRepoUrl(_) | PipelineError::InvalidInput(_) => {
                ErrorKind::InvalidInput
            }
            PipelineError::NotFound(_) => ErrorKind::NotFound,
            PipelineError::NoValidFiles(_)
            | PipelineError::GenerationError(GenerationError::NoValidFiles(_)) => {
                ErrorKind::NoValidFiles
            }
            _ => ErrorKind::Internal,
        };
        // Internal details stay in the log; callers get a stable message.
        let message = match kind {
            ErrorKind::Internal => {
                log::error!("Pipeline run failed: {err}");
                "internal error while generating the wiki".to_string()
            }
            _ => err.to_string(),
        };
        Self { kind, message }
    }
}
