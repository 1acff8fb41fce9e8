use thiserror::Error;

/// Core error type shared across datamask crates.
#[derive(Debug, Error)]
pub enum Error {
    /// A column references an enum type that is missing from the structure.
    ///
    /// This means the introspection result is corrupt, so model construction
    /// stops here.
    #[error("could not find enum \"{type_id}\" when creating data model (column {column})")]
    EnumNotFound { type_id: String, column: String },
    /// The structure violates internal invariants.
    #[error("invalid structure: {0}")]
    InvalidStructure(String),
    /// The structure JSON could not be decoded.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    /// The structure JSON schema could not be compiled.
    #[error("schema error: {0}")]
    Schema(String),
}

/// Convenience alias for results returned by datamask crates.
pub type Result<T> = std::result::Result<T, Error>;
