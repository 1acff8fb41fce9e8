use serde_json::{Map, Value};

use crate::config::json_kind;
use crate::error::{ConfigError, Result};

pub const DEFAULT_KEY: &str = "$default";

/// What happens to a table when dumping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectOutcome {
    Data,
    Skip,
    Structure,
}

/// Table selection tree.
///
/// Directives are `true` (data), `false` (skip) or `"structure"`. The root
/// and every schema object may carry `$default`, which applies to anything
/// not listed below it. Entry order is preserved.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectConfig {
    root: Map<String, Value>,
}

impl SelectConfig {
    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    pub fn entries(&self) -> &Map<String, Value> {
        &self.root
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.root.clone())
    }

    pub fn resolve(&self, schema: &str, table: &str) -> SelectOutcome {
        let root_default = self.root.get(DEFAULT_KEY).and_then(directive);
        let resolved = match self.root.get(schema) {
            Some(Value::Object(tables)) => tables
                .get(table)
                .and_then(directive)
                .or_else(|| tables.get(DEFAULT_KEY).and_then(directive))
                .or(root_default),
            Some(node) => directive(node).or(root_default),
            None => root_default,
        };
        resolved.unwrap_or(SelectOutcome::Data)
    }
}

fn directive(value: &Value) -> Option<SelectOutcome> {
    match value {
        Value::Bool(true) => Some(SelectOutcome::Data),
        Value::Bool(false) => Some(SelectOutcome::Skip),
        Value::String(text) if text == "structure" => Some(SelectOutcome::Structure),
        _ => None,
    }
}

fn check_directive(value: &Value, path: &str) -> Result<()> {
    directive(value).map(|_| ()).ok_or_else(|| ConfigError::InvalidSelect {
        path: path.to_string(),
        message: format!(
            "expected true, false or \"structure\", found {}",
            json_kind(value)
        ),
    })
}

impl TryFrom<Value> for SelectConfig {
    type Error = ConfigError;

    fn try_from(value: Value) -> Result<Self> {
        let root = match value {
            Value::Object(root) => root,
            other => {
                return Err(ConfigError::InvalidSelect {
                    path: "/".to_string(),
                    message: format!("expected an object, found {}", json_kind(&other)),
                });
            }
        };

        for (schema, node) in &root {
            let path = format!("/{schema}");
            match node {
                Value::Object(tables) if schema != DEFAULT_KEY => {
                    for (table, table_node) in tables {
                        check_directive(table_node, &format!("{path}/{table}"))?;
                    }
                }
                other => check_directive(other, &path)?,
            }
        }
        Ok(Self { root })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn select(value: Value) -> SelectConfig {
        SelectConfig::try_from(value).expect("valid select config")
    }

    #[test]
    fn defaults_cascade_from_root_to_tables() {
        let config = select(json!({
            "$default": false,
            "public": true,
            "audit": { "$default": "structure", "events": true },
            "billing": { "invoices": false }
        }));

        assert_eq!(config.resolve("public", "users"), SelectOutcome::Data);
        assert_eq!(config.resolve("audit", "events"), SelectOutcome::Data);
        assert_eq!(config.resolve("audit", "logins"), SelectOutcome::Structure);
        assert_eq!(config.resolve("billing", "invoices"), SelectOutcome::Skip);
        assert_eq!(config.resolve("billing", "plans"), SelectOutcome::Skip);
        assert_eq!(config.resolve("other", "things"), SelectOutcome::Skip);
    }

    #[test]
    fn empty_config_selects_everything() {
        let config = SelectConfig::default();
        assert!(config.is_empty());
        assert_eq!(config.resolve("public", "users"), SelectOutcome::Data);
    }

    #[test]
    fn keeps_entry_order() {
        let config = select(json!({ "zeta": true, "$default": false, "alpha": "structure" }));
        let keys: Vec<&str> = config.entries().keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["zeta", "$default", "alpha"]);
    }

    #[test]
    fn rejects_unknown_directives() {
        let err = SelectConfig::try_from(json!({ "public": { "users": "data" } }))
            .expect_err("invalid directive");
        assert!(err.to_string().contains("/public/users"));
    }
}
