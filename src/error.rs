use std::io;

use thiserror::Error;

/// Error loading questions or paper text from disk.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to extract text from {path}: {reason}")]
    Pdf { path: String, reason: String },
    #[error("{0} must contain at least one question")]
    Empty(String),
}

/// Error talking to the generative-language API.
#[derive(Error, Debug)]
pub enum AiError {
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("API error: {0}")]
    Api(String),
    #[error("Rate limit exceeded")]
    RateLimit,
    #[error("Authentication failed")]
    Authentication,
    #[error("No API key configured")]
    MissingKey,
}

/// Error type for quiz operations.
#[derive(Error, Debug)]
pub enum QuizError {
    #[error("Failed to load questions: {0}")]
    Load(#[from] LoadError),
    #[error("AI error: {0}")]
    Ai(#[from] AiError),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}
