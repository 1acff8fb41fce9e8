//! Type-driven replacements used by `auto` mode.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::{Map, Value};

use crate::config::json_kind;
use crate::copycat::Copycat;
use crate::error::ColumnFailure;
use crate::index::{ColumnInfo, StructureIndex};

const MAX_SAFE_INTEGER: i64 = 9_007_199_254_740_991;
const MIN_YEAR: i32 = 1970;
const MAX_YEAR: i32 = 2050;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TypeFamily {
    Integer { max: i64 },
    Float,
    Boolean,
    Uuid,
    Inet,
    Text,
    Date,
    Timestamp,
    Time,
    Interval,
    Json,
}

const TYPE_FAMILIES: &[(&str, TypeFamily)] = &[
    ("int2", TypeFamily::Integer { max: 32_767 }),
    ("smallint", TypeFamily::Integer { max: 32_767 }),
    ("smallserial", TypeFamily::Integer { max: 32_767 }),
    ("int4", TypeFamily::Integer { max: 2_147_483_647 }),
    ("integer", TypeFamily::Integer { max: 2_147_483_647 }),
    ("serial", TypeFamily::Integer { max: 2_147_483_647 }),
    ("int8", TypeFamily::Integer { max: MAX_SAFE_INTEGER }),
    ("bigint", TypeFamily::Integer { max: MAX_SAFE_INTEGER }),
    ("bigserial", TypeFamily::Integer { max: MAX_SAFE_INTEGER }),
    ("float4", TypeFamily::Float),
    ("float8", TypeFamily::Float),
    ("real", TypeFamily::Float),
    ("double precision", TypeFamily::Float),
    ("numeric", TypeFamily::Float),
    ("decimal", TypeFamily::Float),
    ("bool", TypeFamily::Boolean),
    ("boolean", TypeFamily::Boolean),
    ("uuid", TypeFamily::Uuid),
    ("inet", TypeFamily::Inet),
    ("cidr", TypeFamily::Inet),
    ("text", TypeFamily::Text),
    ("varchar", TypeFamily::Text),
    ("character varying", TypeFamily::Text),
    ("bpchar", TypeFamily::Text),
    ("char", TypeFamily::Text),
    ("character", TypeFamily::Text),
    ("citext", TypeFamily::Text),
    ("name", TypeFamily::Text),
    ("date", TypeFamily::Date),
    ("timestamp", TypeFamily::Timestamp),
    ("timestamptz", TypeFamily::Timestamp),
    ("timestamp without time zone", TypeFamily::Timestamp),
    ("timestamp with time zone", TypeFamily::Timestamp),
    ("time", TypeFamily::Time),
    ("timetz", TypeFamily::Time),
    ("time without time zone", TypeFamily::Time),
    ("time with time zone", TypeFamily::Time),
    ("interval", TypeFamily::Interval),
    ("json", TypeFamily::Json),
    ("jsonb", TypeFamily::Json),
];

/// Resolve a Postgres type name to its family and whether it is an array
/// (`_int4` or `int4[]`).
pub(crate) fn classify(type_name: &str) -> Option<(TypeFamily, bool)> {
    let normalized = type_name.trim().to_lowercase();
    let (base, is_array) = match normalized.strip_suffix("[]") {
        Some(base) => (base, true),
        None => match normalized.strip_prefix('_') {
            Some(base) => (base, true),
            None => (normalized.as_str(), false),
        },
    };
    let base = base.split('(').next().unwrap_or(base).trim();
    TYPE_FAMILIES
        .iter()
        .find(|(name, _)| *name == base)
        .map(|(_, family)| (*family, is_array))
}

/// Inputs for one auto-mode column replacement.
pub(crate) struct AutoColumn<'a> {
    pub column: &'a str,
    pub info: &'a ColumnInfo,
    pub value: &'a Value,
    pub raw: Option<&'a str>,
}

pub(crate) fn auto_value(
    copycat: &Copycat,
    index: &StructureIndex,
    parse_json: bool,
    input: AutoColumn<'_>,
) -> Result<Value, ColumnFailure> {
    let AutoColumn {
        column,
        info,
        value,
        raw,
    } = input;

    if info.is_key || value.is_null() {
        return Ok(value.clone());
    }

    if info.is_enum {
        let values = index.enum_values(&info.type_id).ok_or_else(|| {
            ColumnFailure::UnknownEnum {
                column: column.to_string(),
                enum_id: info.type_id.clone(),
            }
        })?;
        return match value {
            Value::Array(items) => Ok(Value::Array(
                items
                    .iter()
                    .map(|item| remap_enum(copycat, values, item, None))
                    .collect(),
            )),
            other => Ok(remap_enum(copycat, values, other, raw)),
        };
    }

    let Some((family, is_array)) = classify(&info.type_name) else {
        if info.nullable {
            return Ok(Value::Null);
        }
        return Err(ColumnFailure::UnsupportedType {
            column: column.to_string(),
            type_name: info.type_name.clone(),
        });
    };

    let scalar = Scalar {
        copycat,
        family,
        type_name: &info.type_name,
        parse_json,
    };
    match (is_array, value) {
        (true, Value::Array(items)) => items
            .iter()
            .map(|item| scalar.transform(item))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        (true, other) => Err(invalid(&info.type_name, other)),
        (false, other) => scalar.transform(other),
    }
}

/// Deterministically pick another member of the enum; a single-member enum
/// maps to itself.
fn remap_enum(copycat: &Copycat, values: &[String], value: &Value, raw: Option<&str>) -> Value {
    if value.is_null() {
        return Value::Null;
    }
    let current = value.as_str();
    let candidates: Vec<&String> = values
        .iter()
        .filter(|candidate| Some(candidate.as_str()) != current)
        .collect();
    let seed = match raw {
        Some(raw) => Value::String(raw.to_string()),
        None => value.clone(),
    };
    match copycat.index(&seed, candidates.len()) {
        Some(position) => Value::String(candidates[position].clone()),
        None => value.clone(),
    }
}

struct Scalar<'a> {
    copycat: &'a Copycat,
    family: TypeFamily,
    type_name: &'a str,
    parse_json: bool,
}

impl Scalar<'_> {
    fn transform(&self, value: &Value) -> Result<Value, ColumnFailure> {
        if value.is_null() {
            return Ok(Value::Null);
        }
        match self.family {
            TypeFamily::Integer { max } => match value {
                Value::Number(number) => match number.as_i64() {
                    Some(n) => Ok(Value::from(similar_int(self.copycat, value, n, max)?)),
                    None => Err(invalid(self.type_name, value)),
                },
                Value::String(text) => match text.trim().parse::<i64>() {
                    Ok(n) => Ok(Value::String(
                        similar_int(self.copycat, value, n, max)?.to_string(),
                    )),
                    Err(_) => Err(invalid(self.type_name, value)),
                },
                other => Err(invalid(self.type_name, other)),
            },
            TypeFamily::Float => match value {
                Value::Number(number) => {
                    let n = number.as_f64().ok_or_else(|| invalid(self.type_name, value))?;
                    let replaced = similar_float(self.copycat, value, n)?;
                    serde_json::Number::from_f64(replaced)
                        .map(Value::Number)
                        .ok_or_else(|| invalid(self.type_name, value))
                }
                Value::String(text) => match text.trim().parse::<f64>() {
                    Ok(n) if n.is_finite() => Ok(Value::String(
                        similar_float(self.copycat, value, n)?.to_string(),
                    )),
                    // NaN and infinities carry no information
                    _ => Ok(value.clone()),
                },
                other => Err(invalid(self.type_name, other)),
            },
            TypeFamily::Boolean => match value {
                Value::Bool(_) => Ok(Value::Bool(self.copycat.bool(value))),
                Value::String(text) => {
                    let replaced = self.copycat.bool(value);
                    let text = match (text.len() == 1, replaced) {
                        (true, true) => "t",
                        (true, false) => "f",
                        (false, true) => "true",
                        (false, false) => "false",
                    };
                    Ok(Value::String(text.to_string()))
                }
                other => Err(invalid(self.type_name, other)),
            },
            TypeFamily::Uuid => match value {
                Value::String(_) => Ok(Value::String(self.copycat.uuid(value))),
                other => Err(invalid(self.type_name, other)),
            },
            TypeFamily::Inet => match value {
                Value::String(text) => {
                    let address = self.copycat.ipv4(value);
                    Ok(Value::String(match text.split_once('/') {
                        Some((_, mask)) => format!("{address}/{mask}"),
                        None => address,
                    }))
                }
                other => Err(invalid(self.type_name, other)),
            },
            TypeFamily::Text => match value {
                Value::String(text) => Ok(Value::String(self.copycat.scramble(text))),
                Value::Number(number) => Ok(Value::String(
                    self.copycat.scramble(&number.to_string()),
                )),
                other => Err(invalid(self.type_name, other)),
            },
            TypeFamily::Date
            | TypeFamily::Timestamp
            | TypeFamily::Time
            | TypeFamily::Interval => match value {
                Value::String(text) => self.temporal(text),
                other => Err(invalid(self.type_name, other)),
            },
            TypeFamily::Json => self.json(value),
        }
    }

    fn temporal(&self, text: &str) -> Result<Value, ColumnFailure> {
        // Parsable values are seeded by their normalized form; sentinels
        // such as `infinity` by their text.
        let seed = Value::String(
            normalize_temporal(self.family, text).unwrap_or_else(|| text.to_string()),
        );
        let generated = self.copycat.date_time(&seed, MIN_YEAR, MAX_YEAR)?;
        let formatted = match self.family {
            TypeFamily::Date => generated.format("%Y-%m-%d").to_string(),
            TypeFamily::Time => generated.format("%H:%M:%S%.3fZ").to_string(),
            TypeFamily::Interval => generated.format("%H:%M:%S%.3f").to_string(),
            _ => generated.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string(),
        };
        Ok(Value::String(formatted))
    }

    fn json(&self, value: &Value) -> Result<Value, ColumnFailure> {
        // Parsed rows already hold the document; a string is a JSON string.
        let transformed = match value {
            Value::String(text) if !self.parse_json => {
                let document = serde_json::from_str::<Value>(text)
                    .map_err(|_| invalid(self.type_name, value))?;
                self.json_leaves(&document)?
            }
            other => self.json_leaves(other)?,
        };
        if self.parse_json {
            Ok(transformed)
        } else {
            Ok(Value::String(transformed.to_string()))
        }
    }

    fn json_leaves(&self, value: &Value) -> Result<Value, ColumnFailure> {
        Ok(match value {
            Value::Null => Value::Null,
            Value::Bool(_) => Value::Bool(self.copycat.bool(value)),
            Value::String(text) => Value::String(self.copycat.scramble(text)),
            Value::Number(number) => match number.as_i64() {
                Some(n) => Value::from(similar_int(self.copycat, value, n, MAX_SAFE_INTEGER)?),
                None => {
                    let n = number.as_f64().unwrap_or_default();
                    serde_json::Number::from_f64(similar_float(self.copycat, value, n)?)
                        .map_or(Value::Null, Value::Number)
                }
            },
            Value::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|item| self.json_leaves(item))
                    .collect::<Result<_, _>>()?,
            ),
            Value::Object(entries) => {
                let mut out = Map::with_capacity(entries.len());
                for (key, entry) in entries {
                    out.insert(key.clone(), self.json_leaves(entry)?);
                }
                Value::Object(out)
            }
        })
    }
}

/// Integer of roughly the same magnitude and the same sign.
fn similar_int(copycat: &Copycat, seed: &Value, n: i64, max: i64) -> Result<i64, ColumnFailure> {
    let bound = n
        .unsigned_abs()
        .saturating_mul(10)
        .clamp(100, max.unsigned_abs());
    let bound = i64::try_from(bound).unwrap_or(max);
    let replaced = copycat.int(seed, 0, bound)?;
    Ok(if n < 0 { -replaced } else { replaced })
}

fn similar_float(copycat: &Copycat, seed: &Value, n: f64) -> Result<f64, ColumnFailure> {
    let bound = (n.abs() * 10.0).clamp(100.0, f64::MAX);
    let replaced = copycat.float(seed, 0.0, bound)?;
    let cents = replaced * 100.0;
    let rounded = if cents.is_finite() {
        cents.round() / 100.0
    } else {
        replaced
    };
    Ok(if n < 0.0 { -rounded } else { rounded })
}

fn normalize_temporal(family: TypeFamily, text: &str) -> Option<String> {
    let text = text.trim();
    match family {
        TypeFamily::Date => NaiveDate::parse_from_str(text, "%Y-%m-%d")
            .ok()
            .map(|date| date.to_string()),
        TypeFamily::Timestamp => DateTime::parse_from_rfc3339(text)
            .map(|value| value.naive_utc())
            .or_else(|_| {
                DateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f%#z")
                    .map(|value| value.naive_utc())
            })
            .or_else(|_| {
                NaiveDateTime::parse_from_str(text.trim_end_matches('Z'), "%Y-%m-%d %H:%M:%S%.f")
            })
            .ok()
            .map(|value| value.to_string()),
        TypeFamily::Time | TypeFamily::Interval => {
            let clock = text.split(['+', '-', 'Z']).next().unwrap_or(text);
            NaiveTime::parse_from_str(clock, "%H:%M:%S%.f")
                .ok()
                .map(|time| time.to_string())
        }
        _ => None,
    }
}

fn invalid(type_name: &str, value: &Value) -> ColumnFailure {
    ColumnFailure::InvalidValue {
        type_name: type_name.to_string(),
        found: json_kind(value).to_string(),
    }
}
