use std::collections::{BTreeMap, BTreeSet};

use jsonschema::JSONSchema;
use schemars::schema::RootSchema;
use schemars::schema_for;
use serde::Serialize;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::structure::IntrospectedStructure;

/// Severity level for validation issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueSeverity {
    Error,
    Warning,
}

/// Structured validation issue with location and hint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    pub severity: IssueSeverity,
    pub code: String,
    pub path: String,
    pub message: String,
    pub hint: Option<String>,
}

impl ValidationIssue {
    pub fn new(
        severity: IssueSeverity,
        code: impl Into<String>,
        path: impl Into<String>,
        message: impl Into<String>,
        hint: Option<String>,
    ) -> Self {
        Self {
            severity,
            code: code.into(),
            path: path.into(),
            message: message.into(),
            hint,
        }
    }

    pub fn error(code: impl Into<String>, path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(IssueSeverity::Error, code, path, message, None)
    }

    pub fn warning(
        code: impl Into<String>,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(IssueSeverity::Warning, code, path, message, None)
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

/// Aggregated validation report with errors and warnings.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationReport {
    /// Returns true when there are no errors.
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn push(&mut self, issue: ValidationIssue) {
        match issue.severity {
            IssueSeverity::Error => self.errors.push(issue),
            IssueSeverity::Warning => self.warnings.push(issue),
        }
    }

    pub fn merge(&mut self, other: ValidationReport) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }

    /// All issues, errors first.
    pub fn issues(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.errors.iter().chain(self.warnings.iter())
    }
}

/// JSON Schema of the introspected structure document.
pub fn structure_json_schema() -> RootSchema {
    schema_for!(IntrospectedStructure)
}

/// Validate a raw structure document against [`structure_json_schema`].
pub fn validate_structure_json(structure_json: &Value) -> Result<ValidationReport> {
    let schema = serde_json::to_value(structure_json_schema())?;
    let compiled = JSONSchema::compile(&schema).map_err(|err| Error::Schema(err.to_string()))?;

    let mut report = ValidationReport::default();
    if let Err(errors) = compiled.validate(structure_json) {
        for error in errors {
            let pointer = error.instance_path.to_string();
            let path = if pointer.is_empty() { "/".to_string() } else { pointer };
            report.push(ValidationIssue::error("schema_violation", path, error.to_string()));
        }
    }
    Ok(report)
}

/// Check internal consistency of a decoded structure.
///
/// Errors cover duplicated tables or columns, key columns that do not exist
/// and enum columns whose enum is missing. Relations pointing at unknown
/// tables are warnings: the data model skips them.
pub fn validate_structure(structure: &IntrospectedStructure) -> ValidationReport {
    let mut report = ValidationReport::default();
    let mut catalog: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();

    for (table_index, table) in structure.tables.iter().enumerate() {
        let path = format!("/tables/{table_index}");
        if catalog.contains_key(table.id.as_str()) {
            report.push(ValidationIssue::error(
                "duplicate_table",
                &path,
                format!("duplicate table id: {}", table.id),
            ));
            continue;
        }

        let mut columns = BTreeSet::new();
        for (column_index, column) in table.columns.iter().enumerate() {
            if !columns.insert(column.name.as_str()) {
                report.push(ValidationIssue::error(
                    "duplicate_column",
                    format!("{path}/columns/{column_index}"),
                    format!("duplicate column name: {}.{}", table.id, column.name),
                ));
            }
            if column.is_enum() && structure.enum_by_id(&column.type_id).is_none() {
                report.push(
                    ValidationIssue::error(
                        "unknown_enum",
                        format!("{path}/columns/{column_index}/typeId"),
                        format!("enum {} not found for column {}", column.type_id, column.id),
                    )
                    .with_hint("include the enum in the structure enums list"),
                );
            }
        }
        catalog.insert(table.id.as_str(), columns);
    }

    for (table_index, table) in structure.tables.iter().enumerate() {
        let path = format!("/tables/{table_index}");
        let Some(columns) = catalog.get(table.id.as_str()) else {
            continue;
        };

        if let Some(primary_keys) = &table.primary_keys {
            for key in &primary_keys.keys {
                if !columns.contains(key.name.as_str()) {
                    report.push(ValidationIssue::error(
                        "primary_key_column_not_found",
                        format!("{path}/primaryKeys"),
                        format!("primary key column not found: {}.{}", table.id, key.name),
                    ));
                }
            }
        }

        for constraint in &table.constraints {
            for column in &constraint.columns {
                if !columns.contains(column.as_str()) {
                    report.push(ValidationIssue::error(
                        "unique_column_not_found",
                        format!("{path}/constraints"),
                        format!(
                            "unique constraint {} references missing column {}.{}",
                            constraint.name, table.id, column
                        ),
                    ));
                }
            }
        }

        for (relation_index, relation) in table.parents.iter().enumerate() {
            let relation_path = format!("{path}/parents/{relation_index}");
            for key in &relation.keys {
                if !columns.contains(key.fk_column.as_str()) {
                    report.push(ValidationIssue::error(
                        "foreign_key_column_not_found",
                        &relation_path,
                        format!("foreign key column not found: {}.{}", table.id, key.fk_column),
                    ));
                }
            }
            match catalog.get(relation.target_table.as_str()) {
                Some(target_columns) => {
                    for key in &relation.keys {
                        if !target_columns.contains(key.target_column.as_str()) {
                            report.push(ValidationIssue::error(
                                "referenced_column_not_found",
                                &relation_path,
                                format!(
                                    "referenced column not found: {}.{}",
                                    relation.target_table, key.target_column
                                ),
                            ));
                        }
                    }
                }
                None => report.push(
                    ValidationIssue::warning(
                        "relation_target_not_found",
                        &relation_path,
                        format!(
                            "relation {} targets unknown table {}",
                            relation.id, relation.target_table
                        ),
                    )
                    .with_hint("the relation field will be skipped"),
                ),
            }
        }

        for (relation_index, relation) in table.children.iter().enumerate() {
            if !catalog.contains_key(relation.fk_table.as_str()) {
                report.push(
                    ValidationIssue::warning(
                        "relation_child_not_found",
                        format!("{path}/children/{relation_index}"),
                        format!(
                            "relation {} comes from unknown table {}",
                            relation.id, relation.fk_table
                        ),
                    )
                    .with_hint("the relation field will be skipped"),
                );
            }
        }
    }

    report
}
