use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ConfigError, Result};

/// A row keyed by column name, in source column order.
pub type Row = Map<String, Value>;

/// Argument passed to table transform functions.
#[derive(Debug, Clone, Copy)]
pub struct TableInput<'a> {
    pub row: &'a Row,
}

/// Argument passed to column transform functions.
#[derive(Debug, Clone, Copy)]
pub struct ColumnInput<'a> {
    pub row: &'a Row,
    pub value: &'a Value,
}

pub type TableFn = Arc<dyn Fn(TableInput<'_>) -> anyhow::Result<Row> + Send + Sync>;
pub type ColumnFn = Arc<dyn Fn(ColumnInput<'_>) -> anyhow::Result<Value> + Send + Sync>;

#[derive(Clone)]
pub enum ColumnTransform {
    Function(ColumnFn),
    /// Literal replacement, `null` included.
    Value(Value),
}

impl ColumnTransform {
    pub fn function<F>(f: F) -> Self
    where
        F: Fn(ColumnInput<'_>) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        Self::Function(Arc::new(f))
    }
}

impl fmt::Debug for ColumnTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnTransform::Function(_) => f.write_str("ColumnTransform::Function(..)"),
            ColumnTransform::Value(value) => write!(f, "ColumnTransform::Value({value})"),
        }
    }
}

#[derive(Clone)]
pub enum TableTransform {
    /// Copy every value as read.
    PassThrough,
    Function(TableFn),
    Columns(BTreeMap<String, ColumnTransform>),
}

impl TableTransform {
    pub fn function<F>(f: F) -> Self
    where
        F: Fn(TableInput<'_>) -> anyhow::Result<Row> + Send + Sync + 'static,
    {
        Self::Function(Arc::new(f))
    }

    pub fn columns() -> Self {
        Self::Columns(BTreeMap::new())
    }

    /// Add a column entry; turns a pass-through or function node into a
    /// column map.
    pub fn with_column(mut self, column: impl Into<String>, transform: ColumnTransform) -> Self {
        match &mut self {
            TableTransform::Columns(columns) => {
                columns.insert(column.into(), transform);
                self
            }
            _ => Self::Columns(BTreeMap::from([(column.into(), transform)])),
        }
    }

    pub fn column(&self, column: &str) -> Option<&ColumnTransform> {
        match self {
            TableTransform::Columns(columns) => columns.get(column),
            _ => None,
        }
    }
}

impl fmt::Debug for TableTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableTransform::PassThrough => f.write_str("TableTransform::PassThrough"),
            TableTransform::Function(_) => f.write_str("TableTransform::Function(..)"),
            TableTransform::Columns(columns) => {
                f.debug_tuple("TableTransform::Columns").field(columns).finish()
            }
        }
    }
}

/// How columns without an explicit transform are handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransformMode {
    /// Every non-key column must be configured.
    Strict,
    /// Unconfigured columns get a type-driven replacement.
    #[default]
    Auto,
    /// Unconfigured columns are copied as read.
    Unsafe,
}

impl TransformMode {
    pub const ALL: [TransformMode; 3] = [
        TransformMode::Strict,
        TransformMode::Auto,
        TransformMode::Unsafe,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TransformMode::Strict => "strict",
            TransformMode::Auto => "auto",
            TransformMode::Unsafe => "unsafe",
        }
    }
}

impl fmt::Display for TransformMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransformMode {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "strict" => Ok(TransformMode::Strict),
            "auto" => Ok(TransformMode::Auto),
            "unsafe" => Ok(TransformMode::Unsafe),
            other => Err(ConfigError::InvalidMode(other.to_string())),
        }
    }
}

/// Resolved options of a compiled config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformOptions {
    pub mode: TransformMode,
    /// Parse JSON column text before transforming and return JSON values.
    pub parse_json: bool,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            mode: TransformMode::Auto,
            parse_json: true,
        }
    }
}

/// Option overrides, applied over the defaults and over `$mode` /
/// `$parseJson` keys found in the config itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformOverrides {
    pub mode: Option<TransformMode>,
    pub parse_json: Option<bool>,
    /// Seed for the deterministic generator.
    pub hash_key: Option<String>,
}

impl TransformOverrides {
    pub fn mode(mode: TransformMode) -> Self {
        Self {
            mode: Some(mode),
            ..Self::default()
        }
    }

    pub fn apply(&self, options: TransformOptions) -> TransformOptions {
        TransformOptions {
            mode: self.mode.unwrap_or(options.mode),
            parse_json: self.parse_json.unwrap_or(options.parse_json),
        }
    }

    /// Fields set in `other` win.
    pub fn merged_with(&self, other: &TransformOverrides) -> TransformOverrides {
        TransformOverrides {
            mode: other.mode.or(self.mode),
            parse_json: other.parse_json.or(self.parse_json),
            hash_key: other.hash_key.clone().or_else(|| self.hash_key.clone()),
        }
    }
}

/// Transform tree: schema -> table -> table transform.
#[derive(Debug, Clone, Default)]
pub struct Transform {
    schemas: BTreeMap<String, BTreeMap<String, TableTransform>>,
    overrides: TransformOverrides,
}

impl Transform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(
        mut self,
        schema: impl Into<String>,
        table: impl Into<String>,
        transform: TableTransform,
    ) -> Self {
        self.insert_table(schema, table, transform);
        self
    }

    pub fn with_overrides(mut self, overrides: TransformOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn insert_table(
        &mut self,
        schema: impl Into<String>,
        table: impl Into<String>,
        transform: TableTransform,
    ) {
        self.schemas
            .entry(schema.into())
            .or_default()
            .insert(table.into(), transform);
    }

    /// Register an empty schema node.
    pub fn insert_schema(&mut self, schema: impl Into<String>) {
        self.schemas.entry(schema.into()).or_default();
    }

    pub fn table(&self, schema: &str, table: &str) -> Option<&TableTransform> {
        self.schemas.get(schema).and_then(|tables| tables.get(table))
    }

    pub fn schemas(&self) -> impl Iterator<Item = (&str, &BTreeMap<String, TableTransform>)> {
        self.schemas
            .iter()
            .map(|(schema, tables)| (schema.as_str(), tables))
    }

    pub fn overrides(&self) -> &TransformOverrides {
        &self.overrides
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    pub fn table_count(&self) -> usize {
        self.schemas.values().map(BTreeMap::len).sum()
    }

    /// Load a literal config: `{ "$mode"?, "$parseJson"?, schema: { table:
    /// true | { column: value } } }`.
    pub fn from_json(value: &Value) -> Result<Self> {
        let root = value.as_object().ok_or_else(|| ConfigError::InvalidTransform {
            path: "/".to_string(),
            message: format!("expected an object, found {}", json_kind(value)),
        })?;

        let mut transform = Transform::default();
        for (key, node) in root {
            match key.as_str() {
                "$mode" => {
                    let mode = node.as_str().ok_or_else(|| ConfigError::InvalidTransform {
                        path: "/$mode".to_string(),
                        message: "expected a string".to_string(),
                    })?;
                    transform.overrides.mode = Some(mode.parse()?);
                }
                "$parseJson" => {
                    let parse_json = node.as_bool().ok_or_else(|| ConfigError::InvalidTransform {
                        path: "/$parseJson".to_string(),
                        message: "expected a boolean".to_string(),
                    })?;
                    transform.overrides.parse_json = Some(parse_json);
                }
                schema => {
                    let tables = node.as_object().ok_or_else(|| ConfigError::InvalidTransform {
                        path: format!("/{schema}"),
                        message: format!("expected an object, found {}", json_kind(node)),
                    })?;
                    transform.insert_schema(schema);
                    for (table, table_node) in tables {
                        let table_transform = match table_node {
                            Value::Bool(true) => TableTransform::PassThrough,
                            Value::Object(columns) => TableTransform::Columns(
                                columns
                                    .iter()
                                    .map(|(column, value)| {
                                        (column.clone(), ColumnTransform::Value(value.clone()))
                                    })
                                    .collect(),
                            ),
                            other => {
                                return Err(ConfigError::InvalidTransform {
                                    path: format!("/{schema}/{table}"),
                                    message: format!(
                                        "expected true or an object, found {}",
                                        json_kind(other)
                                    ),
                                });
                            }
                        };
                        transform.insert_table(schema, table.as_str(), table_transform);
                    }
                }
            }
        }
        Ok(transform)
    }
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
