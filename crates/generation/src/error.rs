use thiserror::Error;

pub type Result<T> = std::result::Result<T, GenerationError>;

#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Text generation failed: {0}")]
    ApiError(String),

    #[error("Text generation returned no text")]
    EmptyResponse,

    /// Model output did not match the declared JSON shape.
    #[error("Could not parse model output: {0}")]
    ParseError(String),

    /// Re-validation left nothing usable.
    #[error("No valid files: {0}")]
    NoValidFiles(String),

    #[error("{0}")]
    Other(String),
}
