use std::fmt;

use serde_json::{Map, Value};

use super::{Copycat, CopycatOptions, truncate_chars, value_text};
use crate::config::Row;
use crate::error::CopycatError;

/// First argument of a call: the row value being replaced, or a constant.
#[derive(Debug, Clone, PartialEq)]
pub enum CallInput {
    Column(String),
    Literal(Value),
    /// Any other source expression; rendered as written, never evaluated.
    Expression(String),
}

impl CallInput {
    /// Classify a source expression: `row.name` and `row["odd name"]` read a
    /// column, anything else is kept verbatim.
    pub fn from_expression(expression: &str) -> Self {
        let expression = expression.trim();
        if let Some(column) = expression.strip_prefix("row.") {
            if is_identifier(column) {
                return CallInput::Column(column.to_string());
            }
        }
        let bracketed = expression
            .strip_prefix("row[")
            .and_then(|rest| rest.strip_suffix(']'))
            .and_then(|key| serde_json::from_str::<String>(key).ok());
        match bracketed {
            Some(column) => CallInput::Column(column),
            None => CallInput::Expression(expression.to_string()),
        }
    }
}

/// A `copycat.<method>(...)` expression, optionally followed by
/// `.toString()` and `.slice(0, n)`.
#[derive(Debug, Clone, PartialEq)]
pub struct CopycatCall {
    pub method: String,
    pub input: CallInput,
    pub args: Vec<Value>,
    pub options: Map<String, Value>,
    pub to_string: bool,
    pub slice: Option<usize>,
}

impl CopycatCall {
    pub fn new(method: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            input: CallInput::Column(column.into()),
            args: Vec::new(),
            options: Map::new(),
            to_string: false,
            slice: None,
        }
    }

    pub fn with_input(mut self, input: CallInput) -> Self {
        self.input = input;
        self
    }

    pub fn with_arg(mut self, arg: Value) -> Self {
        self.args.push(arg);
        self
    }

    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    pub fn stringified(mut self) -> Self {
        self.to_string = true;
        self
    }

    pub fn sliced(mut self, len: usize) -> Self {
        self.slice = Some(len);
        self
    }

    pub fn render(&self) -> String {
        let mut out = format!("copycat.{}(", self.method);
        match &self.input {
            CallInput::Column(column) => out.push_str(&row_access(column)),
            CallInput::Literal(value) => out.push_str(&render_literal(value)),
            CallInput::Expression(expression) => out.push_str(expression),
        }
        for arg in &self.args {
            out.push_str(", ");
            out.push_str(&render_literal(arg));
        }
        if !self.options.is_empty() {
            out.push_str(", ");
            out.push_str(&render_literal(&Value::Object(self.options.clone())));
        }
        out.push(')');
        if self.to_string {
            out.push_str(".toString()");
        }
        if let Some(len) = self.slice {
            out.push_str(&format!(".slice(0, {len})"));
        }
        out
    }

    /// Run the call against a row.
    pub fn evaluate(&self, copycat: &Copycat, row: &Row) -> Result<Value, CopycatError> {
        let input = match &self.input {
            CallInput::Column(column) => row.get(column).cloned().unwrap_or(Value::Null),
            CallInput::Literal(value) => value.clone(),
            CallInput::Expression(expression) => {
                return Err(CopycatError::invalid(
                    &self.method,
                    format!("cannot evaluate input expression `{expression}`"),
                ));
            }
        };
        let options =
            CopycatOptions::from_value(&self.method, &Value::Object(self.options.clone()))?;
        let mut value = copycat.call(&self.method, &input, &self.args, &options)?;
        if self.to_string {
            value = Value::String(value_text(&value));
        }
        if let Some(len) = self.slice {
            value = match value {
                Value::String(text) => Value::String(truncate_chars(&text, len)),
                other => {
                    return Err(CopycatError::invalid(
                        &self.method,
                        format!("cannot slice non-string result {other}"),
                    ));
                }
            };
        }
        Ok(value)
    }
}

impl fmt::Display for CopycatCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// True when `key` can be written as a bare property name.
pub fn is_identifier(key: &str) -> bool {
    let mut chars = key.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' || first == '$' => {}
        _ => return false,
    }
    chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '$')
}

/// Property key, quoted when needed.
pub fn render_key(key: &str) -> String {
    if is_identifier(key) {
        key.to_string()
    } else {
        quote(key)
    }
}

/// `row.name` or `row["odd name"]`.
pub fn row_access(column: &str) -> String {
    if is_identifier(column) {
        format!("row.{column}")
    } else {
        format!("row[{}]", quote(column))
    }
}

/// Literal in source form: `{ min: 0, max: 65535 }`, `["a", "b"]`.
pub fn render_literal(value: &Value) -> String {
    match value {
        Value::String(text) => quote(text),
        Value::Array(items) => {
            let items: Vec<String> = items.iter().map(render_literal).collect();
            format!("[{}]", items.join(", "))
        }
        Value::Object(entries) if entries.is_empty() => "{}".to_string(),
        Value::Object(entries) => {
            let entries: Vec<String> = entries
                .iter()
                .map(|(key, value)| format!("{}: {}", render_key(key), render_literal(value)))
                .collect();
            format!("{{ {} }}", entries.join(", "))
        }
        other => other.to_string(),
    }
}

fn quote(text: &str) -> String {
    Value::String(text.to_string()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn renders_plain_and_quoted_access() {
        assert_eq!(
            CopycatCall::new("firstName", "firstName1").render(),
            "copycat.firstName(row.firstName1)"
        );
        assert_eq!(
            CopycatCall::new("email", "e-mail").render(),
            "copycat.email(row[\"e-mail\"])"
        );
    }

    #[test]
    fn renders_options_and_postfix_calls() {
        let call = CopycatCall::new("int", "age")
            .with_option("min", 0)
            .with_option("max", 65535)
            .stringified()
            .sliced(4);
        assert_eq!(
            call.render(),
            "copycat.int(row.age, { min: 0, max: 65535 }).toString().slice(0, 4)"
        );

        let one_of = CopycatCall::new("oneOfString", "status").with_arg(json!(["on", "off"]));
        assert_eq!(one_of.to_string(), "copycat.oneOfString(row.status, [\"on\", \"off\"])");
    }

    #[test]
    fn evaluates_against_a_row() {
        let copycat = Copycat::new(Some("key".to_string()));
        let mut row = Row::new();
        row.insert("age".to_string(), json!(31));

        let call = CopycatCall::new("int", "age")
            .with_option("min", 0)
            .with_option("max", 99)
            .stringified()
            .sliced(1);
        let value = call.evaluate(&copycat, &row).expect("evaluate");
        let text = value.as_str().expect("string output");
        assert_eq!(text.chars().count(), 1);
        assert!(text.chars().all(|ch| ch.is_ascii_digit()));
        assert_eq!(call.evaluate(&copycat, &row).expect("again"), value);
    }

    #[test]
    fn classifies_input_expressions() {
        assert_eq!(
            CallInput::from_expression("row.email"),
            CallInput::Column("email".to_string())
        );
        assert_eq!(
            CallInput::from_expression("row[\"e-mail\"]"),
            CallInput::Column("e-mail".to_string())
        );
        let custom = CallInput::from_expression("row.email.toLowerCase()");
        assert_eq!(
            custom,
            CallInput::Expression("row.email.toLowerCase()".to_string())
        );

        let call = CopycatCall::new("email", "email").with_input(custom);
        assert_eq!(call.render(), "copycat.email(row.email.toLowerCase())");
        assert!(call.evaluate(&Copycat::default(), &Row::new()).is_err());
    }

    #[test]
    fn identifiers() {
        assert!(is_identifier("firstName1"));
        assert!(is_identifier("_private"));
        assert!(!is_identifier("62r"));
        assert!(!is_identifier("first name"));
        assert!(!is_identifier(""));
        assert_eq!(render_key("62r"), "\"62r\"");
    }
}
