use std::collections::{BTreeMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Error, Result};
use crate::quoting::escape_qualified;
use crate::structure::{
    IntrospectedColumn, IntrospectedEnum, IntrospectedStructure, IntrospectedTable, Relationship,
    UniqueConstraint,
};

/// Relation-aware object model of a database.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DataModel {
    pub models: BTreeMap<String, DataModelModel>,
    pub enums: BTreeMap<String, DataModelEnum>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DataModelEnum {
    pub schema_name: String,
    pub values: Vec<DataModelEnumValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DataModelEnumValue {
    pub name: String,
}

/// One model per table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DataModelModel {
    pub id: String,
    pub schema_name: String,
    pub table_name: String,
    pub fields: Vec<DataModelField>,
    pub unique_constraints: Vec<UniqueConstraint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DataModelSequence {
    /// Schema-qualified, escaped sequence name when known.
    pub identifier: Option<String>,
    pub current: i64,
    pub start: i64,
    pub increment: i64,
}

/// A model field: either a column or a relation to another model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataModelField {
    Scalar(DataModelScalarField),
    Object(DataModelObjectField),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DataModelScalarField {
    pub id: String,
    pub name: String,
    pub column_name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    pub is_required: bool,
    pub is_generated: bool,
    pub has_default_value: bool,
    pub is_list: bool,
    pub is_id: bool,
    pub sequence: Option<DataModelSequence>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DataModelObjectField {
    pub name: String,
    /// Name of the related model.
    #[serde(rename = "type")]
    pub type_name: String,
    pub is_required: bool,
    pub is_generated: bool,
    pub has_default_value: bool,
    pub is_list: bool,
    pub is_id: bool,
    pub sequence: Option<DataModelSequence>,
    pub relation_name: String,
    /// Owning columns; empty on the reverse (child) side.
    pub relation_from_fields: Vec<String>,
    /// Referenced columns; empty on the reverse (child) side.
    pub relation_to_fields: Vec<String>,
}

impl DataModelField {
    pub fn name(&self) -> &str {
        match self {
            DataModelField::Scalar(field) => &field.name,
            DataModelField::Object(field) => &field.name,
        }
    }

    pub fn type_name(&self) -> &str {
        match self {
            DataModelField::Scalar(field) => &field.type_name,
            DataModelField::Object(field) => &field.type_name,
        }
    }

    pub fn is_required(&self) -> bool {
        match self {
            DataModelField::Scalar(field) => field.is_required,
            DataModelField::Object(field) => field.is_required,
        }
    }

    pub fn is_list(&self) -> bool {
        match self {
            DataModelField::Scalar(field) => field.is_list,
            DataModelField::Object(field) => field.is_list,
        }
    }

    pub fn is_id(&self) -> bool {
        match self {
            DataModelField::Scalar(field) => field.is_id,
            DataModelField::Object(field) => field.is_id,
        }
    }

    pub fn sequence(&self) -> Option<&DataModelSequence> {
        match self {
            DataModelField::Scalar(field) => field.sequence.as_ref(),
            DataModelField::Object(field) => field.sequence.as_ref(),
        }
    }
}

/// Name of the model for a table, prefixed with its schema only when the
/// table name exists in more than one schema.
pub fn model_name(structure: &IntrospectedStructure, table: &IntrospectedTable) -> String {
    let ambiguous = structure
        .tables
        .iter()
        .any(|other| other.name == table.name && other.schema != table.schema);
    if ambiguous {
        format!("{}_{}", table.schema, table.name)
    } else {
        table.name.clone()
    }
}

/// Name of an enum, disambiguated the same way as model names.
pub fn enum_name(structure: &IntrospectedStructure, item: &IntrospectedEnum) -> String {
    let ambiguous = structure
        .enums
        .iter()
        .any(|other| other.name == item.name && other.schema != item.schema);
    if ambiguous {
        format!("{}_{}", item.schema, item.name)
    } else {
        item.name.clone()
    }
}

/// Build the data model for an introspected structure.
///
/// Fails only when an enum-typed column references an unknown enum.
/// Relations whose other side cannot be found are skipped with a warning.
pub fn build_data_model(structure: &IntrospectedStructure) -> Result<DataModel> {
    let mut data_model = DataModel::default();

    for item in &structure.enums {
        data_model.enums.insert(
            enum_name(structure, item),
            DataModelEnum {
                schema_name: item.schema.clone(),
                values: item
                    .values
                    .iter()
                    .map(|value| DataModelEnumValue {
                        name: value.clone(),
                    })
                    .collect(),
            },
        );
    }

    for table in &structure.tables {
        let model = build_model(structure, table)?;
        data_model.models.insert(model_name(structure, table), model);
    }

    Ok(data_model)
}

fn build_model(structure: &IntrospectedStructure, table: &IntrospectedTable) -> Result<DataModelModel> {
    let primary_key_columns: HashSet<&str> = table
        .primary_keys
        .iter()
        .flat_map(|pk| pk.keys.iter().map(|key| key.name.as_str()))
        .collect();

    let mut fields = Vec::with_capacity(
        table.columns.len() + table.parents.len() + table.children.len(),
    );

    for column in &table.columns {
        let type_name = if column.is_enum() {
            resolve_enum_type(structure, column)?
        } else {
            column.type_name.clone()
        };
        fields.push(DataModelField::Scalar(DataModelScalarField {
            id: column.id.clone(),
            name: column.name.clone(),
            column_name: column.name.clone(),
            type_name,
            is_required: !column.nullable,
            is_generated: column.is_generated_always(),
            has_default_value: column.default.is_some(),
            is_list: false,
            is_id: primary_key_columns.contains(column.name.as_str()),
            sequence: column_sequence(column, structure),
        }));
    }

    for relation in &table.parents {
        let Some(target) = structure.table_by_id(&relation.target_table) else {
            warn!(
                relation = %relation.id,
                table = %table.id,
                "could not find target table for relation"
            );
            continue;
        };
        let names = parent_relation_names(structure, table, target, relation);
        fields.push(DataModelField::Object(DataModelObjectField {
            name: names.field_name,
            type_name: model_name(structure, target),
            is_required: relation.keys.iter().all(|key| !key.nullable),
            is_generated: false,
            has_default_value: false,
            is_list: false,
            is_id: false,
            sequence: None,
            relation_name: names.relation_name,
            relation_from_fields: relation.keys.iter().map(|key| key.fk_column.clone()).collect(),
            relation_to_fields: relation
                .keys
                .iter()
                .map(|key| key.target_column.clone())
                .collect(),
        }));
    }

    // Reverse sides are always lists: unique constraints on the foreign key
    // columns are not consulted, so one-to-one children are not detected.
    for relation in &table.children {
        let Some(child) = structure.table_by_id(&relation.fk_table) else {
            warn!(
                relation = %relation.id,
                table = %table.id,
                "could not find child table for relation"
            );
            continue;
        };
        let names = child_relation_names(structure, table, child, relation);
        fields.push(DataModelField::Object(DataModelObjectField {
            name: names.field_name,
            type_name: model_name(structure, child),
            is_required: false,
            is_generated: false,
            has_default_value: false,
            is_list: true,
            is_id: false,
            sequence: None,
            relation_name: names.relation_name,
            relation_from_fields: Vec::new(),
            relation_to_fields: Vec::new(),
        }));
    }

    Ok(DataModelModel {
        id: table.id.clone(),
        schema_name: table.schema.clone(),
        table_name: table.name.clone(),
        fields,
        unique_constraints: table.constraints.clone(),
    })
}

struct RelationNames {
    relation_name: String,
    field_name: String,
}

fn parent_relation_names(
    structure: &IntrospectedStructure,
    table: &IntrospectedTable,
    target: &IntrospectedTable,
    relation: &Relationship,
) -> RelationNames {
    let model = model_name(structure, table);
    let target_model = model_name(structure, target);
    let is_multiple = table
        .parents
        .iter()
        .filter(|parent| parent.target_table == relation.target_table)
        .count()
        > 1;

    if is_multiple {
        let relation_name = format!("{model}_{}To{target_model}", joined_fk_columns(relation));
        RelationNames {
            field_name: format!("{target_model}_{relation_name}"),
            relation_name,
        }
    } else {
        RelationNames {
            relation_name: format!("{model}To{target_model}"),
            field_name: target_model,
        }
    }
}

fn child_relation_names(
    structure: &IntrospectedStructure,
    table: &IntrospectedTable,
    child: &IntrospectedTable,
    relation: &Relationship,
) -> RelationNames {
    let model = model_name(structure, table);
    let child_model = model_name(structure, child);
    let is_multiple = table
        .children
        .iter()
        .filter(|other| other.fk_table == relation.fk_table)
        .count()
        > 1;

    if is_multiple {
        let relation_name = format!("{child_model}_{}To{model}", joined_fk_columns(relation));
        RelationNames {
            field_name: format!("{child_model}_{relation_name}"),
            relation_name,
        }
    } else {
        RelationNames {
            relation_name: format!("{child_model}To{model}"),
            field_name: child_model,
        }
    }
}

fn joined_fk_columns(relation: &Relationship) -> String {
    relation
        .keys
        .iter()
        .map(|key| key.fk_column.as_str())
        .collect::<Vec<_>>()
        .join("_")
}

fn resolve_enum_type(structure: &IntrospectedStructure, column: &IntrospectedColumn) -> Result<String> {
    let item = structure
        .enum_by_id(&column.type_id)
        .ok_or_else(|| Error::EnumNotFound {
            type_id: column.type_id.clone(),
            column: column.id.clone(),
        })?;
    // keep array annotations such as `[]`
    let suffix = column.type_name.strip_prefix(item.name.as_str()).unwrap_or("");
    Ok(format!("{}{suffix}", enum_name(structure, item)))
}

fn column_sequence(
    column: &IntrospectedColumn,
    structure: &IntrospectedStructure,
) -> Option<DataModelSequence> {
    if let Some(identity) = &column.identity {
        let start = identity.start.unwrap_or(1);
        return Some(DataModelSequence {
            identifier: identity.sequence_name.clone(),
            current: identity.current.unwrap_or(start),
            start,
            increment: identity.increment.unwrap_or(1),
        });
    }

    let default = column.default.as_deref()?;
    if !default.starts_with("nextval(") {
        return None;
    }
    let (schema, name) = extract_sequence_details(default, &column.schema)?;
    let sequence = structure.sequence(&schema, &name)?;
    Some(DataModelSequence {
        identifier: Some(escape_qualified(&schema, &name)),
        current: sequence.current,
        start: sequence.start,
        increment: sequence.interval,
    })
}

static QUALIFIED_NEXTVAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"nextval\('(?:"([^"]+)"|([^."']+))\."?([^'"]+)"?'::regclass\)"#)
        .expect("qualified nextval pattern")
});

static UNQUALIFIED_NEXTVAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)nextval\('"?([^".']+)"?'::regclass\)"#).expect("unqualified nextval pattern")
});

/// Extract `(schema, sequence)` from a `nextval('...'::regclass)` default.
fn extract_sequence_details(default: &str, default_schema: &str) -> Option<(String, String)> {
    if let Some(captures) = QUALIFIED_NEXTVAL.captures(default) {
        let schema = captures.get(1).or_else(|| captures.get(2))?.as_str();
        let sequence = captures.get(3)?.as_str();
        return Some((schema.to_string(), sequence.to_string()));
    }

    let captures = UNQUALIFIED_NEXTVAL.captures(default)?;
    Some((default_schema.to_string(), captures.get(1)?.as_str().to_string()))
}

/// True for the many-to-one side of a relation.
pub fn is_parent_field(field: &DataModelField) -> bool {
    matches!(field, DataModelField::Object(object) if !object.relation_from_fields.is_empty())
}

/// Fields split by role, preserving order within each group.
#[derive(Debug, Default)]
pub struct GroupedFields<'a> {
    pub scalars: Vec<&'a DataModelScalarField>,
    pub parents: Vec<&'a DataModelObjectField>,
    pub children: Vec<&'a DataModelObjectField>,
}

pub fn group_fields(fields: &[DataModelField]) -> GroupedFields<'_> {
    let mut grouped = GroupedFields::default();
    for field in fields {
        match field {
            DataModelField::Scalar(scalar) => grouped.scalars.push(scalar),
            DataModelField::Object(object) if object.relation_from_fields.is_empty() => {
                grouped.children.push(object)
            }
            DataModelField::Object(object) => grouped.parents.push(object),
        }
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structure::{
        ColumnIdentity, IdentityGeneration, IntrospectedSequence, PrimaryKeyColumn, PrimaryKeys,
        RelationshipKey, TypeCategory,
    };

    fn relation(id: &str, fk_table: &str, target_table: &str, columns: &[(&str, bool)]) -> Relationship {
        Relationship {
            id: id.to_string(),
            fk_table: fk_table.to_string(),
            target_table: target_table.to_string(),
            keys: columns
                .iter()
                .map(|(column, nullable)| RelationshipKey {
                    fk_column: column.to_string(),
                    fk_type: "int4".to_string(),
                    target_column: "id".to_string(),
                    target_type: "int4".to_string(),
                    nullable: *nullable,
                })
                .collect(),
        }
    }

    fn users_and_orders(order_parents: Vec<Relationship>) -> IntrospectedStructure {
        let mut users = IntrospectedTable::new(
            "public",
            "users",
            vec![IntrospectedColumn::new("public", "users", "id", "int4")],
        );
        users.primary_keys = Some(PrimaryKeys {
            keys: vec![PrimaryKeyColumn {
                name: "id".to_string(),
                type_name: "int4".to_string(),
            }],
        });
        users.children = order_parents.clone();

        let mut orders = IntrospectedTable::new(
            "public",
            "orders",
            vec![
                IntrospectedColumn::new("public", "orders", "id", "int4"),
                IntrospectedColumn::new("public", "orders", "buyer_id", "int4"),
                IntrospectedColumn::new("public", "orders", "seller_id", "int4").with_nullable(true),
            ],
        );
        orders.parents = order_parents;

        IntrospectedStructure {
            tables: vec![users, orders],
            ..IntrospectedStructure::default()
        }
    }

    fn object_fields(model: &DataModelModel) -> Vec<&DataModelObjectField> {
        model
            .fields
            .iter()
            .filter_map(|field| match field {
                DataModelField::Object(object) => Some(object),
                DataModelField::Scalar(_) => None,
            })
            .collect()
    }

    #[test]
    fn single_foreign_key_uses_short_names() {
        let structure = users_and_orders(vec![relation(
            "orders_buyer_fkey",
            "public.orders",
            "public.users",
            &[("buyer_id", false)],
        )]);

        let model = build_data_model(&structure).expect("build model");
        let orders = &model.models["orders"];
        let parents = object_fields(orders);
        assert_eq!(parents.len(), 1);
        assert_eq!(parents[0].name, "users");
        assert_eq!(parents[0].relation_name, "ordersTousers");
        assert_eq!(parents[0].type_name, "users");
        assert!(parents[0].is_required);
        assert_eq!(parents[0].relation_from_fields, vec!["buyer_id"]);
        assert_eq!(parents[0].relation_to_fields, vec!["id"]);

        let users = &model.models["users"];
        let children = object_fields(users);
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].name, "orders");
        assert_eq!(children[0].relation_name, "ordersTousers");
        assert!(children[0].is_list);
        assert!(!children[0].is_required);
        assert!(children[0].relation_from_fields.is_empty());
    }

    #[test]
    fn multiple_foreign_keys_to_same_target_include_columns() {
        let structure = users_and_orders(vec![
            relation("orders_buyer_fkey", "public.orders", "public.users", &[("buyer_id", false)]),
            relation("orders_seller_fkey", "public.orders", "public.users", &[("seller_id", true)]),
        ]);

        let model = build_data_model(&structure).expect("build model");
        let parents = object_fields(&model.models["orders"]);
        assert_eq!(parents[0].relation_name, "orders_buyer_idTousers");
        assert_eq!(parents[0].name, "users_orders_buyer_idTousers");
        assert_eq!(parents[1].relation_name, "orders_seller_idTousers");
        assert!(!parents[1].is_required);

        let children = object_fields(&model.models["users"]);
        assert_eq!(children[0].relation_name, "orders_buyer_idTousers");
        assert_eq!(children[0].name, "orders_orders_buyer_idTousers");
        assert_eq!(children[1].name, "orders_orders_seller_idTousers");
    }

    #[test]
    fn fields_are_ordered_scalars_parents_children() {
        let mut structure = users_and_orders(vec![relation(
            "orders_buyer_fkey",
            "public.orders",
            "public.users",
            &[("buyer_id", false)],
        )]);
        // self reference so a single model has both sides
        structure.tables[0].parents.push(relation(
            "users_referrer_fkey",
            "public.users",
            "public.users",
            &[("id", true)],
        ));

        let model = build_data_model(&structure).expect("build model");
        let grouped = group_fields(&model.models["users"].fields);
        assert_eq!(grouped.scalars.len(), 1);
        assert_eq!(grouped.parents.len(), 1);
        assert_eq!(grouped.children.len(), 1);

        let kinds: Vec<bool> = model.models["users"]
            .fields
            .iter()
            .map(is_parent_field)
            .collect();
        assert_eq!(kinds, vec![false, true, false]);
        assert!(model.models["users"].fields[0].is_id());
    }

    #[test]
    fn unknown_relation_target_is_skipped() {
        let structure = users_and_orders(vec![relation(
            "orders_ghost_fkey",
            "public.orders",
            "public.ghosts",
            &[("buyer_id", false)],
        )]);

        let model = build_data_model(&structure).expect("build model");
        assert!(object_fields(&model.models["orders"]).is_empty());
        // the users side still references orders, which exists
        assert_eq!(object_fields(&model.models["users"]).len(), 1);
    }

    #[test]
    fn same_table_name_in_two_schemas_is_prefixed() {
        let structure = IntrospectedStructure {
            tables: vec![
                IntrospectedTable::new("public", "users", Vec::new()),
                IntrospectedTable::new("auth", "users", Vec::new()),
                IntrospectedTable::new("public", "posts", Vec::new()),
            ],
            ..IntrospectedStructure::default()
        };

        let model = build_data_model(&structure).expect("build model");
        let names: Vec<&str> = model.models.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["auth_users", "posts", "public_users"]);
    }

    #[test]
    fn enum_columns_use_resolved_enum_name_and_keep_array_suffix() {
        let structure = IntrospectedStructure {
            enums: vec![
                IntrospectedEnum {
                    id: "public.Status".to_string(),
                    schema: "public".to_string(),
                    name: "Status".to_string(),
                    values: vec!["on".to_string(), "off".to_string()],
                },
                IntrospectedEnum {
                    id: "audit.Status".to_string(),
                    schema: "audit".to_string(),
                    name: "Status".to_string(),
                    values: vec!["open".to_string()],
                },
            ],
            tables: vec![IntrospectedTable::new(
                "public",
                "devices",
                vec![
                    IntrospectedColumn::new("public", "devices", "status", "Status")
                        .with_category(TypeCategory::Enum)
                        .with_type_id("public.Status"),
                    IntrospectedColumn::new("public", "devices", "history", "Status[]")
                        .with_category(TypeCategory::Enum)
                        .with_type_id("public.Status"),
                ],
            )],
            ..IntrospectedStructure::default()
        };

        let model = build_data_model(&structure).expect("build model");
        assert!(model.enums.contains_key("public_Status"));
        assert!(model.enums.contains_key("audit_Status"));
        let fields = &model.models["devices"].fields;
        assert_eq!(fields[0].type_name(), "public_Status");
        assert_eq!(fields[1].type_name(), "public_Status[]");
    }

    #[test]
    fn unknown_enum_aborts_the_build() {
        let structure = IntrospectedStructure {
            tables: vec![IntrospectedTable::new(
                "public",
                "devices",
                vec![
                    IntrospectedColumn::new("public", "devices", "status", "Status")
                        .with_category(TypeCategory::Enum)
                        .with_type_id("public.Status"),
                ],
            )],
            ..IntrospectedStructure::default()
        };

        let err = build_data_model(&structure).expect_err("missing enum must fail");
        assert!(matches!(err, Error::EnumNotFound { ref type_id, .. } if type_id == "public.Status"));
        assert!(err.to_string().contains("could not find enum"));
    }

    #[test]
    fn identity_columns_use_identity_metadata() {
        let structure = IntrospectedStructure {
            tables: vec![IntrospectedTable::new(
                "public",
                "users",
                vec![
                    IntrospectedColumn::new("public", "users", "id", "int8").with_identity(
                        ColumnIdentity {
                            generated: IdentityGeneration::ByDefault,
                            sequence_name: Some("public.\"User_id_seq\"".to_string()),
                            start: Some(5),
                            increment: None,
                            current: None,
                        },
                    ),
                ],
            )],
            ..IntrospectedStructure::default()
        };

        let model = build_data_model(&structure).expect("build model");
        let sequence = model.models["users"].fields[0].sequence().expect("sequence");
        assert_eq!(sequence.identifier.as_deref(), Some("public.\"User_id_seq\""));
        assert_eq!(sequence.start, 5);
        assert_eq!(sequence.current, 5);
        assert_eq!(sequence.increment, 1);
    }

    #[test]
    fn nextval_defaults_resolve_known_sequences() {
        let mut sequences = BTreeMap::new();
        sequences.insert(
            "public".to_string(),
            vec![
                IntrospectedSequence {
                    name: "User_id_seq".to_string(),
                    start: 1,
                    current: 42,
                    interval: 2,
                },
                IntrospectedSequence {
                    name: "orders_id_seq".to_string(),
                    start: 10,
                    current: 11,
                    interval: 1,
                },
            ],
        );
        let structure = IntrospectedStructure {
            tables: vec![IntrospectedTable::new(
                "public",
                "users",
                vec![
                    IntrospectedColumn::new("public", "users", "id", "int4")
                        .with_default("nextval('public.\"User_id_seq\"'::regclass)"),
                    IntrospectedColumn::new("public", "users", "order_id", "int4")
                        .with_default("nextval('orders_id_seq'::regclass)"),
                    IntrospectedColumn::new("public", "users", "other", "int4")
                        .with_default("nextval('missing_seq'::regclass)"),
                    IntrospectedColumn::new("public", "users", "created", "int4")
                        .with_default("now()"),
                ],
            )],
            sequences,
            ..IntrospectedStructure::default()
        };

        let model = build_data_model(&structure).expect("build model");
        let fields = &model.models["users"].fields;

        let qualified = fields[0].sequence().expect("qualified sequence");
        assert_eq!(qualified.identifier.as_deref(), Some("\"public\".\"User_id_seq\""));
        assert_eq!(qualified.current, 42);
        assert_eq!(qualified.increment, 2);

        let unqualified = fields[1].sequence().expect("unqualified sequence");
        assert_eq!(unqualified.identifier.as_deref(), Some("\"public\".\"orders_id_seq\""));
        assert_eq!(unqualified.start, 10);

        assert!(fields[2].sequence().is_none());
        assert!(fields[3].sequence().is_none());
        assert!(matches!(&fields[3], DataModelField::Scalar(field) if field.has_default_value));
    }

    #[test]
    fn extracts_sequence_names_from_all_default_shapes() {
        assert_eq!(
            extract_sequence_details("nextval('\"Other\".\"seq\"'::regclass)", "public"),
            Some(("Other".to_string(), "seq".to_string()))
        );
        assert_eq!(
            extract_sequence_details("nextval('app.users_id_seq'::regclass)", "public"),
            Some(("app".to_string(), "users_id_seq".to_string()))
        );
        assert_eq!(
            extract_sequence_details("nextval('\"User_id_seq\"'::regclass)", "crm"),
            Some(("crm".to_string(), "User_id_seq".to_string()))
        );
        assert_eq!(extract_sequence_details("nextval(42)", "crm"), None);
    }

    #[test]
    fn nextval_patterns_compile_once() {
        let qualified: *const Regex = &*QUALIFIED_NEXTVAL;
        let unqualified: *const Regex = &*UNQUALIFIED_NEXTVAL;
        for _ in 0..3 {
            extract_sequence_details("nextval('app.users_id_seq'::regclass)", "public");
        }
        assert!(std::ptr::eq(qualified, &*QUALIFIED_NEXTVAL));
        assert!(std::ptr::eq(unqualified, &*UNQUALIFIED_NEXTVAL));
        assert!(QUALIFIED_NEXTVAL.is_match("nextval('a.b'::regclass)"));
        assert!(UNQUALIFIED_NEXTVAL.is_match("NEXTVAL('b'::regclass)"));
    }
}
