use std::fmt::Write as _;

use datamask_core::{IntrospectedColumn, IntrospectedTable};
use datamask_transform::SelectConfig;
use datamask_transform::copycat::{render_key, render_literal, row_access};
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::shapes::{Shape, TableShapePredictions, resolve_shape};
use crate::templates::{
    DEFAULT_TEMPLATE_KEY, TemplateContext, Templates, TypeTemplates, is_string_type,
    normalize_type,
};

pub const TYPEDEF_INCLUSION: &str = "// eslint-disable-next-line @typescript-eslint/triple-slash-reference\n/// <reference path=\".datamask/datamask.d.ts\" />";

const HEADER_COMMENT: &str =
    "// This config was generated by datamask make sure to check it over before using it.";

const IMPORTS: &str = "import { copycat, faker } from \"@snaplet/copycat\";\nimport { defineConfig } from \"datamask\";";

#[derive(Debug, Clone)]
pub struct GenerateOptions {
    pub table_shape_predictions: Vec<TableShapePredictions>,
    /// Emitted as `copycat.setHashKey(..)` when set.
    pub copycat_secret_key: Option<String>,
    /// Keep schemas and tables without any generated column.
    pub include_empty: bool,
    pub templates: Templates,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            table_shape_predictions: Vec::new(),
            copycat_secret_key: None,
            include_empty: false,
            templates: Templates::builtin(),
        }
    }
}

/// Replacement expression for one column, if any template applies.
pub fn generate_column_transform_code(
    input: &str,
    column: &IntrospectedColumn,
    shape: Option<Shape>,
    templates: &Templates,
) -> Option<String> {
    let type_name = normalize_type(&column.type_name);
    let ctx = TemplateContext {
        input,
        column,
        shape,
        type_name: &type_name,
        is_string: is_string_type(&type_name),
    };
    match templates.get(&type_name)? {
        TypeTemplates::Dynamic(template) => template(&ctx),
        TypeTemplates::Shapes(shapes) => {
            let template = shape
                .and_then(|shape| shapes.get(shape.as_str()))
                .or_else(|| shapes.get(DEFAULT_TEMPLATE_KEY))?;
            template(&ctx)
        }
    }
}

struct TableBlock<'a> {
    name: &'a str,
    columns: Vec<(&'a str, String)>,
}

struct SchemaBlock<'a> {
    name: &'a str,
    tables: Vec<TableBlock<'a>>,
}

/// Render a config module for `tables`.
///
/// Schemas appear in order of first appearance, tables and columns in
/// input order, so equal inputs give byte-identical output.
pub fn generate_transform(
    tables: &[IntrospectedTable],
    options: &GenerateOptions,
    subset: Option<&Value>,
    select: Option<&SelectConfig>,
) -> String {
    let schemas = collect_schemas(tables, options);
    let generated: usize = schemas
        .iter()
        .flat_map(|schema| schema.tables.iter())
        .map(|table| table.columns.len())
        .sum();

    let mut out = String::new();
    out.push_str(TYPEDEF_INCLUSION);
    out.push('\n');
    out.push_str(HEADER_COMMENT);
    out.push('\n');
    out.push_str(IMPORTS);
    out.push('\n');
    if let Some(key) = &options.copycat_secret_key {
        let _ = writeln!(out, "copycat.setHashKey({});", render_literal(&Value::String(key.clone())));
    }
    out.push_str("export default defineConfig({\n");

    if let Some(Value::Object(subset)) = subset {
        write_object_entry(&mut out, 1, "subset", subset);
    }
    if let Some(select) = select.filter(|select| !select.is_empty()) {
        write_object_entry(&mut out, 1, "select", select.entries());
    }

    if schemas.is_empty() {
        out.push_str("  transform: {},\n");
    } else {
        out.push_str("  transform: {\n");
        for schema in &schemas {
            write_schema(&mut out, schema);
        }
        out.push_str("  },\n");
    }
    out.push_str("});\n");

    info!(
        tables = tables.len(),
        schemas = schemas.len(),
        columns = generated,
        "generated transform config"
    );
    out
}

fn collect_schemas<'a>(
    tables: &'a [IntrospectedTable],
    options: &GenerateOptions,
) -> Vec<SchemaBlock<'a>> {
    let mut schemas: Vec<SchemaBlock<'a>> = Vec::new();

    for table in tables {
        let columns: Vec<(&str, String)> = table
            .columns
            .iter()
            .filter(|column| !column.is_generated_always())
            .filter_map(|column| {
                let shape = resolve_shape(
                    &options.table_shape_predictions,
                    &table.schema,
                    &table.name,
                    &column.name,
                );
                let input = row_access(&column.name);
                let code =
                    generate_column_transform_code(&input, column, shape, &options.templates)?;
                debug!(
                    schema = %table.schema,
                    table = %table.name,
                    column = %column.name,
                    shape = shape.map(|shape| shape.as_str()).unwrap_or("none"),
                    "generated column transform"
                );
                Some((column.name.as_str(), code))
            })
            .collect();

        if columns.is_empty() && !options.include_empty {
            continue;
        }

        let block = TableBlock {
            name: &table.name,
            columns,
        };
        match schemas.iter_mut().find(|schema| schema.name == table.schema) {
            Some(schema) => schema.tables.push(block),
            None => schemas.push(SchemaBlock {
                name: &table.schema,
                tables: vec![block],
            }),
        }
    }

    schemas
}

fn write_schema(out: &mut String, schema: &SchemaBlock<'_>) {
    if schema.tables.is_empty() {
        let _ = writeln!(out, "    {}: {{}},", render_key(schema.name));
        return;
    }
    let _ = writeln!(out, "    {}: {{", render_key(schema.name));
    for table in &schema.tables {
        if table.columns.is_empty() {
            let _ = writeln!(out, "      {}: {{}},", render_key(table.name));
            continue;
        }
        let _ = writeln!(out, "      {}({{ row }}) {{", render_key(table.name));
        out.push_str("        return {\n");
        for (column, code) in &table.columns {
            let _ = writeln!(out, "          {}: {},", render_key(column), code);
        }
        out.push_str("        };\n");
        out.push_str("      },\n");
    }
    out.push_str("    },\n");
}

/// `key: { ... },` with nested objects expanded one entry per line.
fn write_object_entry(out: &mut String, depth: usize, key: &str, entries: &Map<String, Value>) {
    let indent = "  ".repeat(depth);
    if entries.is_empty() {
        let _ = writeln!(out, "{indent}{}: {{}},", render_key(key));
        return;
    }
    let _ = writeln!(out, "{indent}{}: {{", render_key(key));
    for (child, value) in entries {
        match value {
            Value::Object(nested) => write_object_entry(out, depth + 1, child, nested),
            other => {
                let _ = writeln!(out, "{indent}  {}: {},", render_key(child), render_literal(other));
            }
        }
    }
    let _ = writeln!(out, "{indent}}},");
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn expands_nested_objects() {
        let mut out = String::new();
        let entries = json!({ "enabled": true, "targets": [{ "table": "any", "percent": 100 }], "nested": { "a": 1 } });
        let Value::Object(entries) = entries else {
            unreachable!("literal object")
        };
        write_object_entry(&mut out, 1, "subset", &entries);
        assert_eq!(
            out,
            "  subset: {\n    enabled: true,\n    targets: [{ table: \"any\", percent: 100 }],\n    nested: {\n      a: 1,\n    },\n  },\n"
        );
    }

    #[test]
    fn dynamic_templates_decide_for_every_shape() {
        let templates = Templates::new().with_dynamic("text", |ctx| {
            (ctx.shape == Some(Shape::Email)).then(|| format!("winrar({})", ctx.input))
        });
        let column = IntrospectedColumn::new("s", "t", "c1", "text");
        assert_eq!(
            generate_column_transform_code("foo", &column, Some(Shape::Email), &templates),
            Some("winrar(foo)".to_string())
        );
        assert_eq!(
            generate_column_transform_code("foo", &column, Some(Shape::City), &templates),
            None
        );
    }
}
