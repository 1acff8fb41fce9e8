use serde::{Deserialize, Serialize};

use crate::error::{GenerateError, Result};

/// Minimum confidence for a prediction to be used.
pub const SHAPE_CONFIDENCE_THRESHOLD: f64 = 0.65;

/// Semantic kind of value stored in a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Shape {
    FirstName,
    LastName,
    FullName,
    Email,
    Username,
    Phone,
    FullAddress,
    StreetAddress,
    City,
    Country,
    ZipCode,
    Url,
    Uuid,
    IpAddress,
    Age,
    Password,
    CreditDebitNumber,
    CreditDebitCvv,
    CreditDebitExpiry,
    Pin,
    SsnFull,
    TaxCode,
    BankAccount,
    Description,
    Date,
    Logs,
    Status,
    Location,
    #[serde(other)]
    Unknown,
}

impl Shape {
    pub fn as_str(&self) -> &'static str {
        match self {
            Shape::FirstName => "FIRST_NAME",
            Shape::LastName => "LAST_NAME",
            Shape::FullName => "FULL_NAME",
            Shape::Email => "EMAIL",
            Shape::Username => "USERNAME",
            Shape::Phone => "PHONE",
            Shape::FullAddress => "FULL_ADDRESS",
            Shape::StreetAddress => "STREET_ADDRESS",
            Shape::City => "CITY",
            Shape::Country => "COUNTRY",
            Shape::ZipCode => "ZIP_CODE",
            Shape::Url => "URL",
            Shape::Uuid => "UUID",
            Shape::IpAddress => "IP_ADDRESS",
            Shape::Age => "AGE",
            Shape::Password => "PASSWORD",
            Shape::CreditDebitNumber => "CREDIT_DEBIT_NUMBER",
            Shape::CreditDebitCvv => "CREDIT_DEBIT_CVV",
            Shape::CreditDebitExpiry => "CREDIT_DEBIT_EXPIRY",
            Shape::Pin => "PIN",
            Shape::SsnFull => "SSN_FULL",
            Shape::TaxCode => "TAX_CODE",
            Shape::BankAccount => "BANK_ACCOUNT",
            Shape::Description => "DESCRIPTION",
            Shape::Date => "DATE",
            Shape::Logs => "LOGS",
            Shape::Status => "STATUS",
            Shape::Location => "LOCATION",
            Shape::Unknown => "UNKNOWN",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapePrediction {
    pub column: String,
    pub shape: Shape,
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,
}

/// Predictions for the columns of one table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableShapePredictions {
    pub schema_name: String,
    pub table_name: String,
    #[serde(default)]
    pub predictions: Vec<ShapePrediction>,
}

/// Parse a `TableShapePredictions[]` document.
pub fn parse_predictions(json: &str) -> Result<Vec<TableShapePredictions>> {
    serde_json::from_str(json).map_err(GenerateError::Predictions)
}

/// Shape predicted for `schema.table.column`, if confident enough.
pub fn predicted_shape(
    predictions: &[TableShapePredictions],
    schema: &str,
    table: &str,
    column: &str,
) -> Option<Shape> {
    predictions
        .iter()
        .filter(|entry| entry.schema_name == schema && entry.table_name == table)
        .flat_map(|entry| entry.predictions.iter())
        .find(|prediction| prediction.column == column)
        .filter(|prediction| prediction.confidence >= SHAPE_CONFIDENCE_THRESHOLD)
        .map(|prediction| prediction.shape)
}

const EXACT_NAMES: &[(&str, Shape)] = &[
    ("email", Shape::Email),
    ("emailaddress", Shape::Email),
    ("mail", Shape::Email),
    ("firstname", Shape::FirstName),
    ("givenname", Shape::FirstName),
    ("fname", Shape::FirstName),
    ("lastname", Shape::LastName),
    ("surname", Shape::LastName),
    ("familyname", Shape::LastName),
    ("lname", Shape::LastName),
    ("name", Shape::FullName),
    ("fullname", Shape::FullName),
    ("displayname", Shape::FullName),
    ("username", Shape::Username),
    ("login", Shape::Username),
    ("handle", Shape::Username),
    ("phone", Shape::Phone),
    ("phonenumber", Shape::Phone),
    ("mobile", Shape::Phone),
    ("telephone", Shape::Phone),
    ("address", Shape::FullAddress),
    ("fulladdress", Shape::FullAddress),
    ("postaladdress", Shape::FullAddress),
    ("street", Shape::StreetAddress),
    ("streetaddress", Shape::StreetAddress),
    ("address1", Shape::StreetAddress),
    ("addressline1", Shape::StreetAddress),
    ("city", Shape::City),
    ("town", Shape::City),
    ("country", Shape::Country),
    ("zip", Shape::ZipCode),
    ("zipcode", Shape::ZipCode),
    ("postcode", Shape::ZipCode),
    ("postalcode", Shape::ZipCode),
    ("url", Shape::Url),
    ("website", Shape::Url),
    ("homepage", Shape::Url),
    ("ip", Shape::IpAddress),
    ("ipaddress", Shape::IpAddress),
    ("age", Shape::Age),
    ("password", Shape::Password),
    ("ssn", Shape::SsnFull),
];

// Checked in order; longer fragments first.
const NAME_FRAGMENTS: &[(&str, Shape)] = &[
    ("email", Shape::Email),
    ("firstname", Shape::FirstName),
    ("lastname", Shape::LastName),
    ("fullname", Shape::FullName),
    ("username", Shape::Username),
    ("phonenumber", Shape::Phone),
    ("streetaddress", Shape::StreetAddress),
    ("creditcard", Shape::CreditDebitNumber),
    ("cardnumber", Shape::CreditDebitNumber),
    ("password", Shape::Password),
    ("address", Shape::FullAddress),
    ("phone", Shape::Phone),
    ("zipcode", Shape::ZipCode),
    ("postcode", Shape::ZipCode),
];

/// Lower-case ASCII alphanumerics only: `first_name` and `FirstName` both
/// become `firstname`.
pub fn normalize_column_name(column: &str) -> String {
    column
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|ch| ch.to_ascii_lowercase())
        .collect()
}

/// Guess a shape from the column name alone.
pub fn guess_shape_from_column_name(column: &str) -> Option<Shape> {
    let name = normalize_column_name(column);
    if name.is_empty() {
        return None;
    }
    EXACT_NAMES
        .iter()
        .find(|(exact, _)| *exact == name)
        .or_else(|| {
            NAME_FRAGMENTS
                .iter()
                .find(|(fragment, _)| name.contains(fragment))
        })
        .map(|(_, shape)| *shape)
}

/// Prediction first, then the name heuristics.
pub fn resolve_shape(
    predictions: &[TableShapePredictions],
    schema: &str,
    table: &str,
    column: &str,
) -> Option<Shape> {
    predicted_shape(predictions, schema, table, column)
        .or_else(|| guess_shape_from_column_name(column))
}
