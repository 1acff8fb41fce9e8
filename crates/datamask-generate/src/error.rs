use datamask_transform::{ConfigError, CopycatError};
use thiserror::Error;

/// Errors raised while reading a generated config module back.
#[derive(Debug, Error)]
pub enum ModuleParseError {
    #[error("line {line}: expected {expected}, found {found}")]
    Unexpected {
        line: usize,
        expected: String,
        found: String,
    },
    #[error("unexpected end of module, expected {expected}")]
    UnexpectedEnd { expected: String },
    #[error("line {line}: unterminated string")]
    UnterminatedString { line: usize },
    #[error("line {line}: unsupported expression for {path}: {message}")]
    Unsupported {
        line: usize,
        path: String,
        message: String,
    },
    #[error("{path}: {message}")]
    Invalid { path: String, message: String },
    #[error("module does not export a config")]
    MissingConfig,
    #[error("invalid select block: {0}")]
    Select(#[from] ConfigError),
    #[error(transparent)]
    Copycat(#[from] CopycatError),
}

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("invalid shape predictions: {0}")]
    Predictions(#[source] serde_json::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Module(#[from] ModuleParseError),
}

pub type Result<T> = std::result::Result<T, GenerateError>;
