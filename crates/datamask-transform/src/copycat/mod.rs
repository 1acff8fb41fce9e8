//! Deterministic fake values.
//!
//! Every method seeds a ChaCha8 generator from `sha256(hash_key || input)`,
//! so the same input always produces the same output for a given key.

mod call;
mod scramble;
mod values;

use chrono::NaiveDateTime;
use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Deserialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::error::CopycatError;

pub use call::{CallInput, CopycatCall, is_identifier, render_key, render_literal, row_access};

/// Methods addressable through [`Copycat::call`].
pub const METHODS: &[&str] = &[
    "firstName",
    "lastName",
    "fullName",
    "email",
    "username",
    "phoneNumber",
    "postalAddress",
    "streetAddress",
    "city",
    "country",
    "url",
    "uuid",
    "ipv4",
    "int",
    "float",
    "bool",
    "oneOf",
    "oneOfString",
    "scramble",
    "dateString",
    "word",
    "words",
    "sentence",
    "paragraph",
    "password",
];

/// Methods that honour the `limit` option natively.
pub const LIMITED_METHODS: &[&str] = &[
    "email",
    "username",
    "firstName",
    "lastName",
    "fullName",
    "oneOfString",
    "url",
];

/// Methods that do not return strings.
pub const NON_STRING_METHODS: &[&str] = &["bool", "float", "int", "oneOf"];

const MAX_SAFE_INTEGER: i64 = 9_007_199_254_740_991;
const DEFAULT_MIN_YEAR: i32 = 1980;
const DEFAULT_MAX_YEAR: i32 = 2019;

/// Options object accepted by every method.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CopycatOptions {
    pub limit: Option<usize>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub min_year: Option<i32>,
    pub max_year: Option<i32>,
    /// Characters `scramble` leaves untouched.
    pub preserve: Option<Vec<String>>,
}

impl CopycatOptions {
    pub fn from_value(method: &str, value: &Value) -> Result<Self, CopycatError> {
        if value.is_null() {
            return Ok(Self::default());
        }
        serde_json::from_value(value.clone())
            .map_err(|err| CopycatError::invalid(method, format!("invalid options: {err}")))
    }

    fn preserved_chars(&self) -> Vec<char> {
        self.preserve
            .iter()
            .flatten()
            .flat_map(|entry| entry.chars())
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Copycat {
    hash_key: Option<String>,
}

impl Copycat {
    pub fn new(hash_key: Option<String>) -> Self {
        Self { hash_key }
    }

    pub fn hash_key(&self) -> Option<&str> {
        self.hash_key.as_deref()
    }

    /// Short digest of the hash key, safe to log.
    pub fn key_fingerprint(&self) -> String {
        match &self.hash_key {
            Some(key) => hex::encode(&Sha256::digest(key.as_bytes())[..6]),
            None => "none".to_string(),
        }
    }

    pub fn rng(&self, input: &Value) -> ChaCha8Rng {
        let mut hasher = Sha256::new();
        if let Some(key) = &self.hash_key {
            hasher.update(key.as_bytes());
        }
        hasher.update(canonical(input).as_bytes());
        let seed: [u8; 32] = hasher.finalize().into();
        ChaCha8Rng::from_seed(seed)
    }

    /// Invoke a method by name.
    pub fn call(
        &self,
        method: &str,
        input: &Value,
        args: &[Value],
        options: &CopycatOptions,
    ) -> Result<Value, CopycatError> {
        let mut rng = self.rng(input);
        let value = match method {
            "firstName" => Value::String(values::first_name(&mut rng)),
            "lastName" => Value::String(values::last_name(&mut rng)),
            "fullName" => Value::String(values::full_name(&mut rng)),
            "email" => Value::String(values::email(&mut rng)),
            "username" => Value::String(values::username(&mut rng)),
            "phoneNumber" => Value::String(values::phone_number(&mut rng)),
            "postalAddress" => Value::String(values::postal_address(&mut rng)),
            "streetAddress" => Value::String(values::street_address(&mut rng)),
            "city" => Value::String(values::city(&mut rng)),
            "country" => Value::String(values::country(&mut rng)),
            "url" => Value::String(values::url(&mut rng)),
            "uuid" => Value::String(values::uuid(&mut rng)),
            "ipv4" => Value::String(values::ipv4(&mut rng)),
            "word" => Value::String(values::word(&mut rng)),
            "words" => Value::String(values::words(&mut rng)),
            "sentence" => Value::String(values::sentence(&mut rng)),
            "paragraph" => Value::String(values::paragraph(&mut rng)),
            "password" => Value::String(values::password(&mut rng)),
            "int" => {
                let min = options.min.map_or(0, |min| min as i64);
                let max = options.max.map_or(MAX_SAFE_INTEGER, |max| max as i64);
                Value::from(int_in_range(method, &mut rng, min, max)?)
            }
            "float" => {
                let min = options.min.unwrap_or(0.0);
                let max = options.max.unwrap_or(1_000_000.0);
                let value = float_in_range(method, &mut rng, min, max)?;
                serde_json::Number::from_f64(value)
                    .map(Value::Number)
                    .ok_or_else(|| CopycatError::invalid(method, "generated a non-finite float"))?
            }
            "bool" => Value::Bool(rng.random_bool(0.5)),
            "oneOf" => pick(method, &mut rng, args)?.clone(),
            "oneOfString" => Value::String(value_text(pick(method, &mut rng, args)?)),
            "scramble" => match input {
                Value::Null => Value::Null,
                other => Value::String(scramble::scramble(
                    &mut rng,
                    &value_text(other),
                    &options.preserved_chars(),
                )),
            },
            "dateString" => {
                let min_year = options.min_year.unwrap_or(DEFAULT_MIN_YEAR);
                let max_year = options.max_year.unwrap_or(DEFAULT_MAX_YEAR);
                let value = date_time_in_years(method, &mut rng, min_year, max_year)?;
                Value::String(value.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string())
            }
            other => return Err(CopycatError::UnknownMethod(other.to_string())),
        };

        Ok(match (value, options.limit) {
            (Value::String(text), Some(limit)) => Value::String(truncate_chars(&text, limit)),
            (value, _) => value,
        })
    }

    pub fn scramble(&self, input: &str) -> String {
        let mut rng = self.rng(&Value::String(input.to_string()));
        scramble::scramble(&mut rng, input, &[])
    }

    pub fn int(&self, input: &Value, min: i64, max: i64) -> Result<i64, CopycatError> {
        int_in_range("int", &mut self.rng(input), min, max)
    }

    pub fn float(&self, input: &Value, min: f64, max: f64) -> Result<f64, CopycatError> {
        float_in_range("float", &mut self.rng(input), min, max)
    }

    pub fn bool(&self, input: &Value) -> bool {
        self.rng(input).random_bool(0.5)
    }

    pub fn uuid(&self, input: &Value) -> String {
        values::uuid(&mut self.rng(input))
    }

    pub fn ipv4(&self, input: &Value) -> String {
        values::ipv4(&mut self.rng(input))
    }

    /// Timestamp between the given years, millisecond precision.
    pub fn date_time(
        &self,
        input: &Value,
        min_year: i32,
        max_year: i32,
    ) -> Result<NaiveDateTime, CopycatError> {
        date_time_in_years("dateString", &mut self.rng(input), min_year, max_year)
    }

    /// Index into a list of `len` items.
    pub fn index(&self, input: &Value, len: usize) -> Option<usize> {
        (len > 0).then(|| self.rng(input).random_range(0..len))
    }
}

/// Text form of a value; `null` becomes the empty string.
pub fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

pub fn truncate_chars(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}

fn canonical(input: &Value) -> String {
    match input {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn int_in_range(
    method: &str,
    rng: &mut impl RngCore,
    min: i64,
    max: i64,
) -> Result<i64, CopycatError> {
    if min > max {
        return Err(CopycatError::invalid(
            method,
            format!("min ({min}) is greater than max ({max})"),
        ));
    }
    Ok(rng.random_range(min..=max))
}

fn float_in_range(
    method: &str,
    rng: &mut impl RngCore,
    min: f64,
    max: f64,
) -> Result<f64, CopycatError> {
    if !(min.is_finite() && max.is_finite()) || min > max {
        return Err(CopycatError::invalid(
            method,
            format!("invalid range {min}..{max}"),
        ));
    }
    if min == max {
        return Ok(min);
    }
    if !(max - min).is_finite() {
        // span overflows f64; interpolate so neither term does
        let t: f64 = rng.random();
        return Ok((min * (1.0 - t) + max * t).clamp(min, max));
    }
    Ok(rng.random_range(min..max))
}

fn pick<'a>(
    method: &str,
    rng: &mut impl RngCore,
    args: &'a [Value],
) -> Result<&'a Value, CopycatError> {
    let items = args
        .first()
        .and_then(Value::as_array)
        .ok_or_else(|| CopycatError::invalid(method, "expected a list of options"))?;
    if items.is_empty() {
        return Err(CopycatError::invalid(method, "options list is empty"));
    }
    Ok(&items[rng.random_range(0..items.len())])
}

fn date_time_in_years(
    method: &str,
    rng: &mut impl RngCore,
    min_year: i32,
    max_year: i32,
) -> Result<NaiveDateTime, CopycatError> {
    let start = chrono::NaiveDate::from_ymd_opt(min_year, 1, 1)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .ok_or_else(|| CopycatError::invalid(method, format!("invalid year {min_year}")))?;
    let end = chrono::NaiveDate::from_ymd_opt(max_year, 12, 31)
        .and_then(|date| date.and_hms_milli_opt(23, 59, 59, 999))
        .ok_or_else(|| CopycatError::invalid(method, format!("invalid year {max_year}")))?;
    if start > end {
        return Err(CopycatError::invalid(
            method,
            format!("minYear ({min_year}) is greater than maxYear ({max_year})"),
        ));
    }
    let span = (end - start).num_milliseconds();
    let offset = rng.random_range(0..=span);
    Ok(start + chrono::Duration::milliseconds(offset))
}
