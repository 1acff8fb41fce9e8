//! Core contracts and helpers for datamask.
//!
//! This crate defines the introspected structure consumed from the catalog
//! introspector, the relation-aware data model built from it, and the
//! validation helpers shared by the transform compiler, the code generator
//! and the CLI.

pub mod data_model;
pub mod error;
pub mod quoting;
pub mod structure;
pub mod validation;

pub use data_model::{
    DataModel, DataModelEnum, DataModelEnumValue, DataModelField, DataModelModel,
    DataModelObjectField, DataModelScalarField, DataModelSequence, GroupedFields,
    build_data_model, enum_name, group_fields, is_parent_field, model_name,
};
pub use error::{Error, Result};
pub use quoting::{escape_identifier, escape_qualified};
pub use structure::{
    ColumnConstraint, ColumnGenerated, ColumnIdentity, IdentityGeneration, IntrospectedColumn,
    IntrospectedEnum, IntrospectedSequence, IntrospectedStructure, IntrospectedTable,
    PrimaryKeyColumn, PrimaryKeys, Relationship, RelationshipKey, TypeCategory, UniqueConstraint,
};
pub use validation::{
    IssueSeverity, ValidationIssue, ValidationReport, structure_json_schema,
    validate_structure, validate_structure_json,
};
