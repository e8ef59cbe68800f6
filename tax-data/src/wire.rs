//! JSON payloads exchanged with the remote bracket source.
//!
//! Success body:
//!
//! ```json
//! { "tax_brackets": [ { "min": 0, "max": 50197, "rate": 0.15 }, { "min": 50197, "rate": 0.33 } ] }
//! ```
//!
//! Numbers are read from their source text (serde_json's `arbitrary_precision`),
//! so amounts keep every digit up to [`Decimal`]'s 28 significant digits.
//!
//! Error body (best effort, each field is read on its own and may be missing):
//!
//! ```json
//! { "message": "Database not found", "code": "DB_DOWN" }
//! ```

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tax_core::{BracketTable, BracketTableError, TaxBracket};

/// Success payload: the bracket list for one tax year, as sent.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BracketsResponse {
    pub tax_brackets: Vec<WireBracket>,
}

impl BracketsResponse {
    /// Validates the brackets and builds a [`BracketTable`].
    pub fn into_table(self) -> Result<BracketTable, BracketTableError> {
        let brackets = self
            .tax_brackets
            .into_iter()
            .map(|b| TaxBracket::new(b.min, b.max, b.rate))
            .collect();
        BracketTable::try_new(brackets)
    }
}

/// One bracket as it appears on the wire. `max` is absent or `null` for the
/// top bracket.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WireBracket {
    #[serde(deserialize_with = "deserialize_decimal")]
    pub min: Decimal,
    #[serde(default, deserialize_with = "deserialize_optional_decimal")]
    pub max: Option<Decimal>,
    #[serde(deserialize_with = "deserialize_decimal")]
    pub rate: Decimal,
}

/// Error payload. A field that is absent or not a string is `None`; a body
/// that is not JSON at all yields an empty payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorPayload {
    pub message: Option<String>,
    pub code: Option<String>,
}

impl ErrorPayload {
    pub fn parse(body: &str) -> Self {
        let Ok(value) = serde_json::from_str::<Value>(body) else {
            return Self::default();
        };
        let field = |name: &str| value.get(name).and_then(Value::as_str).map(str::to_string);

        Self {
            message: field("message"),
            code: field("code"),
        }
    }
}

/// Reads a JSON number into a [`Decimal`] through the text it was sent as,
/// so `0.205` arrives as exactly `0.205`.
fn number_to_decimal(number: &serde_json::Number) -> Result<Decimal, rust_decimal::Error> {
    let text = number.to_string();
    Decimal::from_str(&text).or_else(|_| Decimal::from_scientific(&text))
}

fn deserialize_decimal<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    let number = serde_json::Number::deserialize(deserializer)?;
    number_to_decimal(&number).map_err(serde::de::Error::custom)
}

fn deserialize_optional_decimal<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    let number: Option<serde_json::Number> = Option::deserialize(deserializer)?;
    number
        .as_ref()
        .map(number_to_decimal)
        .transpose()
        .map_err(serde::de::Error::custom)
}
