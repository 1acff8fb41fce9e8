use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::trace;

use crate::compile::CompiledTransformConfig;
use crate::config::{ColumnInput, ColumnTransform, Row, TableInput, TableTransform, TransformMode};
use crate::error::{ColumnFailure, TransformError, TransformErrors};
use crate::fallback::{AutoColumn, auto_value};

/// Column values as text, exactly as read from the dump; `None` for NULL.
pub type RawRow = BTreeMap<String, Option<String>>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowData {
    pub parsed: Row,
    pub raw: RawRow,
    /// 1-based line in the source stream, for diagnostics.
    pub line: usize,
}

impl RowData {
    pub fn new(parsed: Row, raw: RawRow, line: usize) -> Self {
        Self { parsed, raw, line }
    }

    /// Derive the raw text form from the parsed values.
    pub fn from_parsed(parsed: Row, line: usize) -> Self {
        let raw = parsed
            .iter()
            .map(|(column, value)| {
                let text = match value {
                    Value::Null => None,
                    Value::String(text) => Some(text.clone()),
                    other => Some(other.to_string()),
                };
                (column.clone(), text)
            })
            .collect();
        Self { parsed, raw, line }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RowContext<'a> {
    pub schema: &'a str,
    pub table: &'a str,
    pub row: &'a RowData,
}

impl CompiledTransformConfig {
    /// Transform one row.
    ///
    /// The output has one entry per parsed column, in the same order. Every
    /// column is attempted; failures are returned together.
    pub fn transform_row(&self, ctx: &RowContext<'_>) -> Result<Row, TransformErrors> {
        let parsed = &ctx.row.parsed;
        let node = self.transform.table(ctx.schema, ctx.table);
        let mut errors = TransformErrors::default();
        let mut failed_row: Option<Arc<RowData>> = None;

        let table_output = match node {
            Some(TableTransform::PassThrough) => return Ok(parsed.clone()),
            Some(TableTransform::Function(f)) => match f(TableInput { row: parsed }) {
                Ok(output) => Some(output),
                Err(err) => {
                    let row = Arc::new(ctx.row.clone());
                    errors.errors.push(error(ctx, row, None, ColumnFailure::User(err)));
                    return Err(errors);
                }
            },
            _ => None,
        };

        let mut output = Row::with_capacity(parsed.len());
        for (column, value) in parsed {
            let result = match table_output.as_ref().and_then(|row| row.get(column)) {
                Some(replaced) => Ok(replaced.clone()),
                None => match node.and_then(|table| table.column(column)) {
                    Some(ColumnTransform::Function(f)) => {
                        f(ColumnInput { row: parsed, value }).map_err(ColumnFailure::User)
                    }
                    Some(ColumnTransform::Value(literal)) => Ok(literal.clone()),
                    None => self.default_value(ctx, column, value),
                },
            };
            match result {
                Ok(value) => {
                    output.insert(column.clone(), value);
                }
                Err(cause) => {
                    let row = failed_row.get_or_insert_with(|| Arc::new(ctx.row.clone()));
                    errors
                        .errors
                        .push(error(ctx, Arc::clone(row), Some(column.as_str()), cause));
                }
            }
        }

        if errors.is_empty() {
            Ok(output)
        } else {
            trace!(
                schema = ctx.schema,
                table = ctx.table,
                line = ctx.row.line,
                failures = errors.len(),
                "row transform failed"
            );
            Err(errors)
        }
    }

    fn default_value(
        &self,
        ctx: &RowContext<'_>,
        column: &str,
        value: &Value,
    ) -> Result<Value, ColumnFailure> {
        let info = self.index.column(ctx.schema, ctx.table, column);
        match self.options.mode {
            TransformMode::Unsafe => Ok(value.clone()),
            TransformMode::Strict => match info {
                Some(info) if info.is_key => Ok(value.clone()),
                _ => Err(ColumnFailure::StrictMode {
                    column: column.to_string(),
                }),
            },
            TransformMode::Auto => {
                let info = info.ok_or_else(|| ColumnFailure::MissingColumnInfo {
                    column: column.to_string(),
                })?;
                auto_value(
                    &self.copycat,
                    &self.index,
                    self.options.parse_json,
                    AutoColumn {
                        column,
                        info,
                        value,
                        raw: ctx.row.raw.get(column).and_then(Option::as_deref),
                    },
                )
            }
        }
    }
}

fn error(
    ctx: &RowContext<'_>,
    row: Arc<RowData>,
    column: Option<&str>,
    cause: ColumnFailure,
) -> TransformError {
    TransformError {
        schema: ctx.schema.to_string(),
        table: ctx.table.to_string(),
        column: column.map(str::to_string),
        row,
        cause,
    }
}
