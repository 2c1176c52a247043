//! Custom serde deserializers for loosely typed upstream data
//!
//! Account records come from a persistence layer that stores flags as `0`/`1`,
//! and betting operators report balances as either JSON numbers or strings.

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, de};
use std::str::FromStr;

/// Deserialize a flexible boolean value that can be:
/// - JSON boolean: `true`, `false`
/// - Integer: `0` (false), any positive integer (true, negative integers treated as false)
/// - String: `"0"`, `"1"`, `"false"`, `"true"` (case-insensitive)
///
/// Strings like "yes"/"no" and empty strings are rejected.
pub fn deserialize_flexible_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum FlexibleBool {
        Bool(bool),
        Int(i64),
        String(String),
    }

    let value: Option<FlexibleBool> = Option::deserialize(deserializer)?;

    match value {
        None => Ok(None),
        Some(FlexibleBool::Bool(b)) => Ok(Some(b)),
        Some(FlexibleBool::Int(i)) => Ok(Some(i > 0)),
        Some(FlexibleBool::String(s)) => match s.trim().to_lowercase().as_str() {
            "true" | "1" => Ok(Some(true)),
            "false" | "0" => Ok(Some(false)),
            _ => Err(de::Error::custom(format!("invalid boolean string: {}", s))),
        },
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FlexibleDecimal {
    Number(serde_json::Number),
    String(String),
}

impl FlexibleDecimal {
    fn into_decimal<E: de::Error>(self) -> Result<Decimal, E> {
        let raw = match self {
            Self::Number(n) => n.to_string(),
            Self::String(s) => s.trim().to_string(),
        };
        Decimal::from_str(&raw)
            .or_else(|_| Decimal::from_scientific(&raw))
            .map_err(|e| de::Error::custom(format!("invalid decimal amount '{}': {}", raw, e)))
    }
}

/// Deserialize a monetary amount sent either as a JSON number or a numeric string
///
/// Numbers are parsed from their textual form rather than through `f64` arithmetic.
pub fn deserialize_flexible_decimal<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    FlexibleDecimal::deserialize(deserializer)?.into_decimal()
}

/// Optional variant of [`deserialize_flexible_decimal`]; `null` and missing map to `None`
pub fn deserialize_optional_flexible_decimal<'de, D>(
    deserializer: D,
) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<FlexibleDecimal>::deserialize(deserializer)?
        .map(FlexibleDecimal::into_decimal)
        .transpose()
}

/// Deserialize an identifier sent either as a JSON string or a JSON integer
pub fn deserialize_string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrNumber {
        String(String),
        Number(serde_json::Number),
    }

    match StringOrNumber::deserialize(deserializer)? {
        StringOrNumber::String(s) => Ok(s),
        StringOrNumber::Number(n) => Ok(n.to_string()),
    }
}
