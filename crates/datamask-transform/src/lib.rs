//! Transform configs and the row transformation engine.
//!
//! A [`Transform`] tree is resolved from a literal or a factory, bound to a
//! database structure by [`create_transform_config`], and then applied row
//! by row with [`CompiledTransformConfig::transform_row`].

pub mod compile;
pub mod config;
pub mod copycat;
pub mod engine;
pub mod error;
mod fallback;
mod index;
pub mod select;

pub use compile::{
    AsyncTransformFactory, CompiledTransformConfig, FactoryContext, TransformConfigSource,
    TransformFactory, create_transform_config, validate_transform,
};
pub use config::{
    ColumnFn, ColumnInput, ColumnTransform, Row, TableFn, TableInput, TableTransform, Transform,
    TransformMode, TransformOptions, TransformOverrides,
};
pub use copycat::{CallInput, Copycat, CopycatCall, CopycatOptions};
pub use engine::{RawRow, RowContext, RowData};
pub use error::{
    ColumnFailure, ConfigError, CopycatError, Result, TransformError, TransformErrors,
};
pub use select::{SelectConfig, SelectOutcome};
