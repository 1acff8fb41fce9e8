use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Catalog-derived description of a database, as produced by the introspector.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct IntrospectedStructure {
    pub tables: Vec<IntrospectedTable>,
    #[serde(default)]
    pub enums: Vec<IntrospectedEnum>,
    /// Sequences grouped by schema name.
    #[serde(default)]
    pub sequences: BTreeMap<String, Vec<IntrospectedSequence>>,
}

impl IntrospectedStructure {
    pub fn table(&self, schema: &str, name: &str) -> Option<&IntrospectedTable> {
        self.tables
            .iter()
            .find(|table| table.schema == schema && table.name == name)
    }

    pub fn table_by_id(&self, id: &str) -> Option<&IntrospectedTable> {
        self.tables.iter().find(|table| table.id == id)
    }

    pub fn enum_by_id(&self, id: &str) -> Option<&IntrospectedEnum> {
        self.enums.iter().find(|item| item.id == id)
    }

    pub fn sequence(&self, schema: &str, name: &str) -> Option<&IntrospectedSequence> {
        self.sequences
            .get(schema)
            .and_then(|sequences| sequences.iter().find(|sequence| sequence.name == name))
    }
}

/// A table with its columns and relationships.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct IntrospectedTable {
    pub id: String,
    pub schema: String,
    pub name: String,
    pub columns: Vec<IntrospectedColumn>,
    /// Foreign keys declared on this table.
    #[serde(default)]
    pub parents: Vec<Relationship>,
    /// Foreign keys declared on other tables that point at this table.
    #[serde(default)]
    pub children: Vec<Relationship>,
    #[serde(default)]
    pub primary_keys: Option<PrimaryKeys>,
    /// Unique constraints declared on the table.
    #[serde(default)]
    pub constraints: Vec<UniqueConstraint>,
}

impl IntrospectedTable {
    pub fn new(schema: &str, name: &str, columns: Vec<IntrospectedColumn>) -> Self {
        Self {
            id: format!("{schema}.{name}"),
            schema: schema.to_string(),
            name: name.to_string(),
            columns,
            ..Self::default()
        }
    }

    pub fn column(&self, name: &str) -> Option<&IntrospectedColumn> {
        self.columns.iter().find(|column| column.name == name)
    }

    pub fn is_primary_key_column(&self, name: &str) -> bool {
        self.primary_keys
            .as_ref()
            .is_some_and(|pk| pk.keys.iter().any(|key| key.name == name))
    }
}

/// Column metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct IntrospectedColumn {
    pub id: String,
    pub schema: String,
    pub table: String,
    pub name: String,
    /// Formatted type name, e.g. `text`, `int4`, `_int4` or `"Status"[]`.
    #[serde(rename = "type")]
    pub type_name: String,
    /// Identifier of the type, used to resolve enum types.
    #[serde(default)]
    pub type_id: String,
    #[serde(default)]
    pub type_category: TypeCategory,
    pub nullable: bool,
    #[serde(default)]
    pub default: Option<String>,
    #[serde(default)]
    pub generated: ColumnGenerated,
    #[serde(default)]
    pub identity: Option<ColumnIdentity>,
    #[serde(default)]
    pub max_length: Option<u32>,
    #[serde(default)]
    pub constraints: Vec<ColumnConstraint>,
}

impl IntrospectedColumn {
    pub fn new(schema: &str, table: &str, name: &str, type_name: &str) -> Self {
        Self {
            id: format!("{schema}.{table}.{name}"),
            schema: schema.to_string(),
            table: table.to_string(),
            name: name.to_string(),
            type_name: type_name.to_string(),
            type_id: format!("pg_catalog.{type_name}"),
            ..Self::default()
        }
    }

    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    pub fn with_category(mut self, category: TypeCategory) -> Self {
        self.type_category = category;
        self
    }

    pub fn with_type_id(mut self, type_id: &str) -> Self {
        self.type_id = type_id.to_string();
        self
    }

    pub fn with_default(mut self, default: &str) -> Self {
        self.default = Some(default.to_string());
        self
    }

    pub fn with_max_length(mut self, max_length: u32) -> Self {
        self.max_length = Some(max_length);
        self
    }

    pub fn with_constraint(mut self, constraint: ColumnConstraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    pub fn with_generated(mut self, generated: ColumnGenerated) -> Self {
        self.generated = generated;
        self
    }

    pub fn with_identity(mut self, identity: ColumnIdentity) -> Self {
        self.identity = Some(identity);
        self
    }

    /// Primary and foreign key columns are never rewritten.
    pub fn is_key(&self) -> bool {
        self.constraints.iter().any(|constraint| {
            matches!(
                constraint,
                ColumnConstraint::PrimaryKey | ColumnConstraint::ForeignKey
            )
        })
    }

    /// True when Postgres computes the value itself on insert.
    pub fn is_generated_always(&self) -> bool {
        self.generated == ColumnGenerated::Always
            || self
                .identity
                .as_ref()
                .is_some_and(|identity| identity.generated == IdentityGeneration::Always)
    }

    pub fn is_enum(&self) -> bool {
        self.type_category == TypeCategory::Enum
    }
}

/// Postgres `pg_type.typcategory` codes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum TypeCategory {
    #[serde(rename = "A")]
    Array,
    #[serde(rename = "B")]
    Boolean,
    #[serde(rename = "C")]
    Composite,
    #[serde(rename = "D")]
    DateTime,
    #[serde(rename = "E")]
    Enum,
    #[serde(rename = "G")]
    Geometric,
    #[serde(rename = "I")]
    Network,
    #[serde(rename = "N")]
    Numeric,
    #[serde(rename = "P")]
    Pseudo,
    #[serde(rename = "R")]
    Range,
    #[serde(rename = "S")]
    String,
    #[serde(rename = "T")]
    Timespan,
    #[serde(rename = "U")]
    UserDefined,
    #[serde(rename = "V")]
    BitString,
    #[default]
    #[serde(rename = "X")]
    Unknown,
}

/// Value of `attgenerated` as reported by the introspector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum ColumnGenerated {
    Always,
    #[default]
    Never,
}

/// Identity generation strategy for `GENERATED ... AS IDENTITY` columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum IdentityGeneration {
    #[serde(rename = "ALWAYS")]
    Always,
    #[serde(rename = "BY DEFAULT")]
    ByDefault,
}

/// Identity metadata for a column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ColumnIdentity {
    pub generated: IdentityGeneration,
    /// Result of `pg_get_serial_sequence`, already escaped where needed.
    #[serde(default)]
    pub sequence_name: Option<String>,
    #[serde(default)]
    pub start: Option<i64>,
    #[serde(default)]
    pub increment: Option<i64>,
    #[serde(default)]
    pub current: Option<i64>,
}

/// Constraint kinds a column takes part in, using `pg_constraint.contype` codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum ColumnConstraint {
    #[serde(rename = "p")]
    PrimaryKey,
    #[serde(rename = "f")]
    ForeignKey,
    #[serde(rename = "u")]
    Unique,
    #[serde(rename = "c")]
    Check,
}

/// A foreign key between `fk_table` and `target_table`, both given by table id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Relationship {
    pub id: String,
    pub fk_table: String,
    pub target_table: String,
    pub keys: Vec<RelationshipKey>,
}

/// Column pair of a foreign key, preserving constraint order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipKey {
    pub fk_column: String,
    #[serde(default)]
    pub fk_type: String,
    pub target_column: String,
    #[serde(default)]
    pub target_type: String,
    pub nullable: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PrimaryKeys {
    pub keys: Vec<PrimaryKeyColumn>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PrimaryKeyColumn {
    pub name: String,
    #[serde(rename = "type", default)]
    pub type_name: String,
}

/// Unique constraint definition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UniqueConstraint {
    pub name: String,
    pub columns: Vec<String>,
}

/// Representation of Postgres enum types.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct IntrospectedEnum {
    pub id: String,
    pub schema: String,
    pub name: String,
    pub values: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct IntrospectedSequence {
    pub name: String,
    pub start: i64,
    pub current: i64,
    pub interval: i64,
}
