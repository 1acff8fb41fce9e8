use std::collections::{HashMap, HashSet};

use datamask_core::IntrospectedStructure;

/// Column facts the row engine needs, keyed for constant-time lookup.
#[derive(Debug, Clone, Default)]
pub(crate) struct StructureIndex {
    tables: HashMap<(String, String), HashMap<String, ColumnInfo>>,
    schemas: HashSet<String>,
    enums: HashMap<String, Vec<String>>,
}

#[derive(Debug, Clone)]
pub(crate) struct ColumnInfo {
    pub type_name: String,
    pub type_id: String,
    pub is_enum: bool,
    pub nullable: bool,
    /// Primary or foreign key column.
    pub is_key: bool,
}

impl StructureIndex {
    pub fn new(structure: &IntrospectedStructure) -> Self {
        let mut index = StructureIndex::default();
        for table in &structure.tables {
            index.schemas.insert(table.schema.clone());
            let foreign_keys: HashSet<&str> = table
                .parents
                .iter()
                .flat_map(|relation| relation.keys.iter().map(|key| key.fk_column.as_str()))
                .collect();
            let columns = table
                .columns
                .iter()
                .map(|column| {
                    let info = ColumnInfo {
                        type_name: column.type_name.clone(),
                        type_id: column.type_id.clone(),
                        is_enum: column.is_enum(),
                        nullable: column.nullable,
                        is_key: column.is_key()
                            || table.is_primary_key_column(&column.name)
                            || foreign_keys.contains(column.name.as_str()),
                    };
                    (column.name.clone(), info)
                })
                .collect();
            index
                .tables
                .insert((table.schema.clone(), table.name.clone()), columns);
        }
        for item in &structure.enums {
            index.enums.insert(item.id.clone(), item.values.clone());
        }
        index
    }

    pub fn has_schema(&self, schema: &str) -> bool {
        self.schemas.contains(schema)
    }

    pub fn has_table(&self, schema: &str, table: &str) -> bool {
        self.tables
            .contains_key(&(schema.to_string(), table.to_string()))
    }

    pub fn column(&self, schema: &str, table: &str, column: &str) -> Option<&ColumnInfo> {
        self.tables
            .get(&(schema.to_string(), table.to_string()))
            .and_then(|columns| columns.get(column))
    }

    pub fn enum_values(&self, id: &str) -> Option<&[String]> {
        self.enums.get(id).map(Vec::as_slice)
    }
}
