use std::sync::Arc;

use datamask_core::{IntrospectedStructure, ValidationIssue, ValidationReport};
use futures::future::BoxFuture;
use tracing::{debug, info, warn};

use crate::config::{TableTransform, Transform, TransformOptions, TransformOverrides};
use crate::copycat::Copycat;
use crate::error::{ConfigError, Result};
use crate::index::StructureIndex;

/// Handed to config factories.
#[derive(Debug, Clone)]
pub struct FactoryContext {
    pub structure: Arc<IntrospectedStructure>,
}

pub type TransformFactory =
    Box<dyn FnOnce(FactoryContext) -> anyhow::Result<Transform> + Send>;
pub type AsyncTransformFactory =
    Box<dyn FnOnce(FactoryContext) -> BoxFuture<'static, anyhow::Result<Transform>> + Send>;

/// Where a transform config comes from.
pub enum TransformConfigSource {
    Static(Transform),
    Factory(TransformFactory),
    AsyncFactory(AsyncTransformFactory),
}

impl TransformConfigSource {
    pub fn factory<F>(f: F) -> Self
    where
        F: FnOnce(FactoryContext) -> anyhow::Result<Transform> + Send + 'static,
    {
        Self::Factory(Box::new(f))
    }

    pub fn async_factory<F>(f: F) -> Self
    where
        F: FnOnce(FactoryContext) -> BoxFuture<'static, anyhow::Result<Transform>> + Send + 'static,
    {
        Self::AsyncFactory(Box::new(f))
    }

    async fn resolve(self, structure: &IntrospectedStructure) -> Result<Transform> {
        let context = || FactoryContext {
            structure: Arc::new(structure.clone()),
        };
        match self {
            TransformConfigSource::Static(transform) => Ok(transform),
            TransformConfigSource::Factory(factory) => {
                factory(context()).map_err(ConfigError::Factory)
            }
            TransformConfigSource::AsyncFactory(factory) => {
                factory(context()).await.map_err(ConfigError::Factory)
            }
        }
    }
}

impl From<Transform> for TransformConfigSource {
    fn from(transform: Transform) -> Self {
        Self::Static(transform)
    }
}

/// A resolved config bound to a database structure.
#[derive(Debug, Clone)]
pub struct CompiledTransformConfig {
    pub transform: Transform,
    pub options: TransformOptions,
    pub(crate) copycat: Copycat,
    pub(crate) index: StructureIndex,
}

impl CompiledTransformConfig {
    pub fn copycat(&self) -> &Copycat {
        &self.copycat
    }
}

/// Resolve `source` and bind it to `structure`.
///
/// Option precedence, lowest first: defaults (`auto`, JSON parsing on),
/// options carried by the config, `overrides`.
pub async fn create_transform_config(
    source: impl Into<TransformConfigSource>,
    structure: &IntrospectedStructure,
    overrides: TransformOverrides,
) -> Result<CompiledTransformConfig> {
    let transform = source.into().resolve(structure).await?;
    let overrides = transform.overrides().merged_with(&overrides);
    let options = overrides.apply(TransformOptions::default());

    let report = validate_transform(&transform, structure);
    for issue in &report.warnings {
        warn!(code = %issue.code, path = %issue.path, "{}", issue.message);
    }

    let copycat = Copycat::new(overrides.hash_key.clone());
    info!(
        mode = %options.mode,
        parse_json = options.parse_json,
        tables = transform.table_count(),
        hash_key = %copycat.key_fingerprint(),
        "compiled transform config"
    );

    Ok(CompiledTransformConfig {
        index: StructureIndex::new(structure),
        transform,
        options,
        copycat,
    })
}

/// Report config entries that reference schemas, tables or columns missing
/// from the structure. Such entries are never used.
pub fn validate_transform(transform: &Transform, structure: &IntrospectedStructure) -> ValidationReport {
    let index = StructureIndex::new(structure);
    let mut report = ValidationReport::default();

    for (schema, tables) in transform.schemas() {
        if !index.has_schema(schema) {
            report.push(ValidationIssue::warning(
                "unknown_schema",
                format!("/{schema}"),
                format!("schema \"{schema}\" does not exist in the database structure"),
            ));
            continue;
        }
        for (table, node) in tables {
            if !index.has_table(schema, table) {
                report.push(ValidationIssue::warning(
                    "unknown_table",
                    format!("/{schema}/{table}"),
                    format!("table \"{schema}.{table}\" does not exist in the database structure"),
                ));
                continue;
            }
            if let TableTransform::Columns(columns) = node {
                for column in columns.keys() {
                    if index.column(schema, table, column).is_none() {
                        report.push(ValidationIssue::warning(
                            "unknown_column",
                            format!("/{schema}/{table}/{column}"),
                            format!(
                                "column \"{schema}.{table}.{column}\" does not exist in the database structure"
                            ),
                        ));
                    }
                }
            }
        }
    }

    debug!(
        warnings = report.warnings.len(),
        "validated transform config against structure"
    );
    report
}
