use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::engine::RowData;

/// Errors raised by the deterministic value generator.
#[derive(Debug, Error)]
pub enum CopycatError {
    #[error("unknown copycat method \"{0}\"")]
    UnknownMethod(String),
    #[error("copycat.{method}: {message}")]
    InvalidArgument { method: String, message: String },
}

impl CopycatError {
    pub(crate) fn invalid(method: &str, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            method: method.to_string(),
            message: message.into(),
        }
    }
}

/// Why a single column could not be transformed.
#[derive(Debug, Error)]
pub enum ColumnFailure {
    #[error(
        "no transform given for column \"{column}\" while in strict transform mode; \
         add an entry for it or switch to auto or unsafe mode"
    )]
    StrictMode { column: String },
    #[error("could not find info about the column \"{column}\" in the database structure")]
    MissingColumnInfo { column: String },
    #[error("we do not yet support transforming values of type \"{type_name}\" (column \"{column}\")")]
    UnsupportedType { column: String, type_name: String },
    #[error("could not find enum \"{enum_id}\" for column \"{column}\"")]
    UnknownEnum { column: String, enum_id: String },
    #[error("cannot transform {found} as \"{type_name}\"")]
    InvalidValue { type_name: String, found: String },
    #[error(transparent)]
    Copycat(#[from] CopycatError),
    #[error("{0:#}")]
    User(anyhow::Error),
}

/// A failure tied to the row it happened in.
#[derive(Debug, Error)]
pub struct TransformError {
    pub schema: String,
    pub table: String,
    /// `None` when the table transform function itself failed.
    pub column: Option<String>,
    /// The row being transformed, shared by every error raised for it.
    pub row: Arc<RowData>,
    #[source]
    pub cause: ColumnFailure,
}

impl fmt::Display for TransformError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.column {
            Some(column) => write!(
                f,
                "error transforming {}.{}.{} on line {}: {}",
                self.schema, self.table, column, self.row.line, self.cause
            ),
            None => write!(
                f,
                "error transforming {}.{} on line {}: {}",
                self.schema, self.table, self.row.line, self.cause
            ),
        }
    }
}

/// Every failure collected while transforming one row.
#[derive(Debug, Default, Error)]
pub struct TransformErrors {
    pub errors: Vec<TransformError>,
}

impl TransformErrors {
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TransformError> {
        self.errors.iter()
    }

    /// Failed column names, `None` entries for table-level failures.
    pub fn columns(&self) -> Vec<Option<&str>> {
        self.errors.iter().map(|error| error.column.as_deref()).collect()
    }
}

impl fmt::Display for TransformErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.errors.as_slice() {
            [] => write!(f, "no transform errors"),
            [single] => write!(f, "{single}"),
            errors => {
                write!(f, "{} transform errors:", errors.len())?;
                for error in errors {
                    write!(f, "\n  - {error}")?;
                }
                Ok(())
            }
        }
    }
}

/// Errors raised while resolving or compiling a transform config.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("transform config factory failed: {0:#}")]
    Factory(anyhow::Error),
    #[error("invalid transform config at {path}: {message}")]
    InvalidTransform { path: String, message: String },
    #[error("invalid select config at {path}: {message}")]
    InvalidSelect { path: String, message: String },
    #[error("unknown transform mode \"{0}\" (expected strict, auto or unsafe)")]
    InvalidMode(String),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
