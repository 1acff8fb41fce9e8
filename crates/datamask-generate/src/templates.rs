//! Column SQL type × shape template table.
//!
//! Each entry renders the replacement expression for one column, or `None`
//! when the column should be left alone.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use datamask_core::IntrospectedColumn;
use datamask_transform::copycat::{LIMITED_METHODS, NON_STRING_METHODS};
use datamask_transform::{CallInput, CopycatCall};
use serde_json::{Map, Value};

use crate::shapes::Shape;

/// Key of the per-type entry used when no shape-specific template exists.
pub const DEFAULT_TEMPLATE_KEY: &str = "__DEFAULT";

/// What a template sees.
#[derive(Debug, Clone, Copy)]
pub struct TemplateContext<'a> {
    /// Expression reading the current value, e.g. `row.email`.
    pub input: &'a str,
    pub column: &'a IntrospectedColumn,
    pub shape: Option<Shape>,
    /// Normalized SQL type the template was looked up by.
    pub type_name: &'a str,
    /// The column holds text on the wire.
    pub is_string: bool,
}

pub type TemplateFn = Arc<dyn Fn(&TemplateContext<'_>) -> Option<String> + Send + Sync>;

#[derive(Clone)]
pub enum TypeTemplates {
    /// Keyed by shape name, with an optional `__DEFAULT` entry.
    Shapes(BTreeMap<String, TemplateFn>),
    /// A single function deciding for every shape.
    Dynamic(TemplateFn),
}

impl fmt::Debug for TypeTemplates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeTemplates::Shapes(shapes) => f
                .debug_tuple("Shapes")
                .field(&shapes.keys().collect::<Vec<_>>())
                .finish(),
            TypeTemplates::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Templates {
    by_type: BTreeMap<String, TypeTemplates>,
}

impl Templates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, type_name: &str) -> Option<&TypeTemplates> {
        self.by_type.get(type_name)
    }

    /// Register a template for `type_name` and a shape key (a shape name
    /// or [`DEFAULT_TEMPLATE_KEY`]).
    pub fn with_shape<F>(mut self, type_name: &str, shape_key: &str, template: F) -> Self
    where
        F: Fn(&TemplateContext<'_>) -> Option<String> + Send + Sync + 'static,
    {
        self.insert_shape(type_name, shape_key, Arc::new(template));
        self
    }

    pub fn with_default<F>(self, type_name: &str, template: F) -> Self
    where
        F: Fn(&TemplateContext<'_>) -> Option<String> + Send + Sync + 'static,
    {
        self.with_shape(type_name, DEFAULT_TEMPLATE_KEY, template)
    }

    pub fn with_dynamic<F>(mut self, type_name: &str, template: F) -> Self
    where
        F: Fn(&TemplateContext<'_>) -> Option<String> + Send + Sync + 'static,
    {
        self.by_type
            .insert(normalize_type(type_name), TypeTemplates::Dynamic(Arc::new(template)));
        self
    }

    pub fn insert_shape(&mut self, type_name: &str, shape_key: &str, template: TemplateFn) {
        let entry = self
            .by_type
            .entry(normalize_type(type_name))
            .or_insert_with(|| TypeTemplates::Shapes(BTreeMap::new()));
        // A dynamic entry is replaced by a keyed one.
        if let TypeTemplates::Dynamic(_) = entry {
            *entry = TypeTemplates::Shapes(BTreeMap::new());
        }
        if let TypeTemplates::Shapes(shapes) = entry {
            shapes.insert(shape_key.to_string(), template);
        }
    }

    /// The built-in table backed by copycat.
    pub fn builtin() -> Self {
        let mut templates = Self::new();

        for type_name in TEXT_TYPES {
            for &(shape, method) in TEXT_SHAPES {
                templates.insert_shape(type_name, shape.as_str(), copycat_template(method));
            }
        }
        for type_name in INTEGER_TYPES {
            templates.insert_shape(
                type_name,
                Shape::Age.as_str(),
                copycat_template_with(
                    "int",
                    Vec::new(),
                    options(&[("min", Value::from(0)), ("max", Value::from(65535))]),
                ),
            );
            templates.insert_shape(
                type_name,
                Shape::Pin.as_str(),
                copycat_template_with(
                    "int",
                    Vec::new(),
                    options(&[("min", Value::from(0)), ("max", Value::from(9999))]),
                ),
            );
        }
        templates.insert_shape("uuid", Shape::Uuid.as_str(), copycat_template("uuid"));
        templates.insert_shape("inet", Shape::IpAddress.as_str(), copycat_template("ipv4"));
        templates
    }
}

const TEXT_TYPES: &[&str] = &[
    "text",
    "varchar",
    "character varying",
    "character",
    "char",
    "bpchar",
    "citext",
];

const INTEGER_TYPES: &[&str] = &["int2", "int4", "int8", "smallint", "integer", "bigint"];

const TEXT_SHAPES: &[(Shape, &str)] = &[
    (Shape::FirstName, "firstName"),
    (Shape::LastName, "lastName"),
    (Shape::FullName, "fullName"),
    (Shape::Email, "email"),
    (Shape::Username, "username"),
    (Shape::Phone, "phoneNumber"),
    (Shape::FullAddress, "postalAddress"),
    (Shape::StreetAddress, "streetAddress"),
    (Shape::City, "city"),
    (Shape::Country, "country"),
    (Shape::ZipCode, "scramble"),
    (Shape::Url, "url"),
    (Shape::Uuid, "uuid"),
    (Shape::IpAddress, "ipv4"),
    (Shape::Password, "password"),
    (Shape::CreditDebitNumber, "scramble"),
    (Shape::CreditDebitCvv, "scramble"),
    (Shape::CreditDebitExpiry, "scramble"),
    (Shape::Pin, "scramble"),
    (Shape::SsnFull, "scramble"),
    (Shape::TaxCode, "scramble"),
    (Shape::BankAccount, "scramble"),
    (Shape::Description, "paragraph"),
];

const NON_STRING_TYPES: &[&str] = &[
    "int2",
    "int4",
    "int8",
    "smallint",
    "integer",
    "bigint",
    "serial",
    "bigserial",
    "float4",
    "float8",
    "real",
    "double precision",
    "numeric",
    "decimal",
    "bool",
    "boolean",
    "json",
    "jsonb",
];

/// Lower-cased, trimmed, without a `(n)` / `(p,s)` suffix.
pub fn normalize_type(type_name: &str) -> String {
    let lowered = type_name.trim().to_ascii_lowercase();
    match lowered.find('(') {
        Some(open) => lowered[..open].trim_end().to_string(),
        None => lowered,
    }
}

/// Whether values of the (normalized) type are carried as strings.
pub fn is_string_type(type_name: &str) -> bool {
    !NON_STRING_TYPES.contains(&type_name)
}

/// Build the copycat call for `method`, fitted to the column: `limit`
/// for methods that support it when the column has a maximum length,
/// `.toString()` and `.slice(0, n)` for text columns otherwise.
pub fn generate_copycat_call(
    ctx: &TemplateContext<'_>,
    method: &str,
    args: &[Value],
    extra_options: &Map<String, Value>,
) -> CopycatCall {
    let mut call = CopycatCall::new(method, ctx.column.name.as_str())
        .with_input(CallInput::from_expression(ctx.input));
    call.args = args.to_vec();
    call.options = extra_options.clone();

    let mut truncate_to = None;
    if let Some(max_length) = ctx.column.max_length {
        if LIMITED_METHODS.contains(&method) {
            call = call.with_option("limit", max_length);
        } else {
            truncate_to = Some(max_length as usize);
        }
    }
    if ctx.is_string && NON_STRING_METHODS.contains(&method) {
        call = call.stringified();
    }
    if let (Some(len), true) = (truncate_to, ctx.is_string) {
        call = call.sliced(len);
    }
    call
}

pub fn copycat_template(method: &'static str) -> TemplateFn {
    copycat_template_with(method, Vec::new(), Map::new())
}

pub fn copycat_template_with(
    method: &'static str,
    args: Vec<Value>,
    extra_options: Map<String, Value>,
) -> TemplateFn {
    Arc::new(move |ctx: &TemplateContext<'_>| {
        Some(generate_copycat_call(ctx, method, &args, &extra_options).render())
    })
}

fn options(entries: &[(&str, Value)]) -> Map<String, Value> {
    entries
        .iter()
        .map(|(key, value)| (key.to_string(), value.clone()))
        .collect()
}
