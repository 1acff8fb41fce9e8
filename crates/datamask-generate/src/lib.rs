//! Transform config generation for datamask.
//!
//! Columns are matched to [`Shape`]s, from model predictions or from their
//! names, and each shape is rendered through a type-keyed template table
//! into a config module. [`parse_module`] reads such modules back into a
//! runnable [`Transform`](datamask_transform::Transform).

pub mod error;
pub mod generate;
pub mod module;
pub mod shapes;
pub mod templates;

pub use error::{GenerateError, ModuleParseError, Result};
pub use generate::{
    GenerateOptions, TYPEDEF_INCLUSION, generate_column_transform_code, generate_transform,
};
pub use module::{GeneratedModule, ModuleColumn, ModuleTable, parse_module};
pub use shapes::{
    SHAPE_CONFIDENCE_THRESHOLD, Shape, ShapePrediction, TableShapePredictions,
    guess_shape_from_column_name, parse_predictions, predicted_shape, resolve_shape,
};
pub use templates::{
    DEFAULT_TEMPLATE_KEY, TemplateContext, TemplateFn, Templates, TypeTemplates,
    generate_copycat_call,
};
