//! Row-to-JSON conversion for target database rows.
//!
//! # Architecture
//!
//! Type conversion uses a two-phase approach:
//! 1. `TypeCategory` classifies column types into logical categories
//! 2. Engine-specific decoders handle the actual value extraction
//!
//! Decoding never fails: a value that cannot be decoded becomes `null` and is
//! logged, so one odd column does not fail a whole table read.

use crate::models::EngineKind;
use serde_json::{Map, Value as JsonValue};
use sqlx::mysql::MySqlRow;
use sqlx::postgres::PgRow;
use sqlx::types::{BigDecimal, Uuid};
use sqlx::{Column, ColumnIndex, Decode, Row, Type, TypeInfo};

/// Logical category for database column types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCategory {
    Integer,
    Float,
    Decimal,
    Boolean,
    Text,
    Binary,
    Json,
    Uuid,
}

/// Classify a database type name into a logical category.
pub fn categorize_type(type_name: &str, engine: EngineKind) -> TypeCategory {
    let lower = type_name.to_lowercase();

    // Checked first: "numeric" would otherwise never be reached.
    if lower.contains("decimal") || lower.contains("numeric") {
        return TypeCategory::Decimal;
    }

    // MySQL reports BOOLEAN columns as TINYINT(1); they decode as integers.
    if lower == "bool" || lower == "boolean" {
        return TypeCategory::Boolean;
    }

    if lower.contains("int") || lower.contains("serial") || lower == "year" {
        return TypeCategory::Integer;
    }

    if lower.contains("float") || lower.contains("double") || lower == "real" {
        return TypeCategory::Float;
    }

    if lower == "json" || lower == "jsonb" {
        return TypeCategory::Json;
    }

    if lower == "uuid" {
        return TypeCategory::Uuid;
    }

    if lower.contains("blob") || lower.contains("binary") || lower == "bytea" {
        return TypeCategory::Binary;
    }

    // BIT(n) has no text form on MySQL.
    if engine == EngineKind::MySQL && lower == "bit" {
        return TypeCategory::Binary;
    }

    // varchar, text, char, enum, date/time, ...
    TypeCategory::Text
}

/// Encode binary data as a JSON value: UTF-8 text when valid, base64 otherwise.
pub fn binary_to_json(bytes: &[u8]) -> JsonValue {
    use base64::{Engine as _, engine::general_purpose::STANDARD};

    match std::str::from_utf8(bytes) {
        Ok(s) => JsonValue::String(s.to_string()),
        Err(_) => JsonValue::String(STANDARD.encode(bytes)),
    }
}

fn float_to_json(v: f64) -> JsonValue {
    serde_json::Number::from_f64(v)
        .map(JsonValue::Number)
        .unwrap_or_else(|| JsonValue::String(v.to_string()))
}

/// Decimals are returned as strings to keep their exact representation.
fn decode_decimal<R>(row: &R, idx: usize) -> JsonValue
where
    R: Row,
    usize: ColumnIndex<R>,
    for<'r> BigDecimal: Decode<'r, R::Database> + Type<R::Database>,
{
    match row.try_get::<BigDecimal, _>(idx) {
        Ok(v) => JsonValue::String(v.to_string()),
        Err(e) => {
            tracing::error!("Failed to decode DECIMAL: {:?}", e);
            JsonValue::Null
        }
    }
}

/// Trait for converting database rows to JSON maps.
pub trait RowToJson {
    fn to_json_map(&self) -> Map<String, JsonValue>;
}

impl RowToJson for MySqlRow {
    fn to_json_map(&self) -> Map<String, JsonValue> {
        self.columns()
            .iter()
            .map(|col| {
                let type_name = col.type_info().name();
                let category = categorize_type(type_name, EngineKind::MySQL);
                let value = mysql::decode_column(self, col.ordinal(), category);
                (col.name().to_string(), value)
            })
            .collect()
    }
}

impl RowToJson for PgRow {
    fn to_json_map(&self) -> Map<String, JsonValue> {
        self.columns()
            .iter()
            .map(|col| {
                let type_name = col.type_info().name();
                let category = categorize_type(type_name, EngineKind::PostgreSQL);
                let value = postgres::decode_column(self, col.ordinal(), type_name, category);
                (col.name().to_string(), value)
            })
            .collect()
    }
}

/// Read a textual metadata column that some servers return as bytes.
///
/// MySQL 8 reports several `information_schema`/`DESCRIBE` columns as
/// VARBINARY or BLOB, so a plain `String` decode is not enough.
pub fn text_or_bytes<R, I>(row: &R, index: I) -> Option<String>
where
    R: Row,
    I: ColumnIndex<R> + Copy,
    for<'r> Option<String>: Decode<'r, R::Database> + Type<R::Database>,
    for<'r> Option<Vec<u8>>: Decode<'r, R::Database> + Type<R::Database>,
{
    if let Ok(v) = row.try_get::<Option<String>, _>(index) {
        return v;
    }
    row.try_get::<Option<Vec<u8>>, _>(index)
        .ok()
        .flatten()
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
}

mod mysql {
    use super::*;

    pub fn decode_column(row: &MySqlRow, idx: usize, category: TypeCategory) -> JsonValue {
        if let Ok(None) = row.try_get_unchecked::<Option<Vec<u8>>, _>(idx) {
            return JsonValue::Null;
        }
        match category {
            TypeCategory::Decimal => decode_decimal(row, idx),
            TypeCategory::Integer => decode_integer(row, idx),
            TypeCategory::Boolean => row
                .try_get::<bool, _>(idx)
                .map(JsonValue::Bool)
                .unwrap_or(JsonValue::Null),
            TypeCategory::Float => {
                if let Ok(v) = row.try_get::<f64, _>(idx) {
                    return float_to_json(v);
                }
                row.try_get::<f32, _>(idx)
                    .map(|v| float_to_json(f64::from(v)))
                    .unwrap_or(JsonValue::Null)
            }
            TypeCategory::Binary => row
                .try_get::<Vec<u8>, _>(idx)
                .map(|v| binary_to_json(&v))
                .unwrap_or(JsonValue::Null),
            TypeCategory::Json => row
                .try_get::<JsonValue, _>(idx)
                .unwrap_or(JsonValue::Null),
            TypeCategory::Text | TypeCategory::Uuid => decode_text(row, idx),
        }
    }

    fn decode_integer(row: &MySqlRow, idx: usize) -> JsonValue {
        if let Ok(v) = row.try_get::<i64, _>(idx) {
            return JsonValue::Number(v.into());
        }
        if let Ok(v) = row.try_get::<i32, _>(idx) {
            return JsonValue::Number(v.into());
        }
        if let Ok(v) = row.try_get::<i16, _>(idx) {
            return JsonValue::Number(v.into());
        }
        if let Ok(v) = row.try_get::<i8, _>(idx) {
            return JsonValue::Number(v.into());
        }
        if let Ok(v) = row.try_get::<u64, _>(idx) {
            return JsonValue::Number(v.into());
        }
        if let Ok(v) = row.try_get::<u32, _>(idx) {
            return JsonValue::Number(v.into());
        }
        if let Ok(v) = row.try_get::<u16, _>(idx) {
            return JsonValue::Number(v.into());
        }
        if let Ok(v) = row.try_get::<u8, _>(idx) {
            return JsonValue::Number(v.into());
        }
        JsonValue::Null
    }

    fn decode_text(row: &MySqlRow, idx: usize) -> JsonValue {
        if let Ok(v) = row.try_get::<String, _>(idx) {
            return JsonValue::String(v);
        }
        // DATE/DATETIME/TIME and friends.
        if let Ok(v) = row.try_get::<chrono::NaiveDateTime, _>(idx) {
            return JsonValue::String(v.to_string());
        }
        if let Ok(v) = row.try_get::<chrono::NaiveDate, _>(idx) {
            return JsonValue::String(v.to_string());
        }
        if let Ok(v) = row.try_get::<chrono::NaiveTime, _>(idx) {
            return JsonValue::String(v.to_string());
        }
        row.try_get_unchecked::<Vec<u8>, _>(idx)
            .map(|v| binary_to_json(&v))
            .unwrap_or(JsonValue::Null)
    }
}

mod postgres {
    use super::*;

    pub fn decode_column(
        row: &PgRow,
        idx: usize,
        type_name: &str,
        category: TypeCategory,
    ) -> JsonValue {
        if let Ok(None) = row.try_get_unchecked::<Option<Vec<u8>>, _>(idx) {
            return JsonValue::Null;
        }
        match category {
            TypeCategory::Decimal => decode_decimal(row, idx),
            TypeCategory::Integer => {
                if let Ok(v) = row.try_get::<i64, _>(idx) {
                    return JsonValue::Number(v.into());
                }
                if let Ok(v) = row.try_get::<i32, _>(idx) {
                    return JsonValue::Number(v.into());
                }
                row.try_get::<i16, _>(idx)
                    .map(|v| JsonValue::Number(v.into()))
                    .unwrap_or(JsonValue::Null)
            }
            TypeCategory::Boolean => row
                .try_get::<bool, _>(idx)
                .map(JsonValue::Bool)
                .unwrap_or(JsonValue::Null),
            TypeCategory::Float => {
                if let Ok(v) = row.try_get::<f64, _>(idx) {
                    return float_to_json(v);
                }
                row.try_get::<f32, _>(idx)
                    .map(|v| float_to_json(f64::from(v)))
                    .unwrap_or(JsonValue::Null)
            }
            TypeCategory::Binary => row
                .try_get::<Vec<u8>, _>(idx)
                .map(|v| binary_to_json(&v))
                .unwrap_or(JsonValue::Null),
            TypeCategory::Json => row
                .try_get::<JsonValue, _>(idx)
                .unwrap_or(JsonValue::Null),
            TypeCategory::Uuid => row
                .try_get::<Uuid, _>(idx)
                .map(|v| JsonValue::String(v.to_string()))
                .unwrap_or(JsonValue::Null),
            TypeCategory::Text => decode_text(row, idx, type_name),
        }
    }

    fn decode_text(row: &PgRow, idx: usize, type_name: &str) -> JsonValue {
        if let Ok(v) = row.try_get::<String, _>(idx) {
            return JsonValue::String(v);
        }
        let value = match type_name.to_uppercase().as_str() {
            "TIMESTAMPTZ" => row
                .try_get::<chrono::DateTime<chrono::Utc>, _>(idx)
                .map(|v| v.to_rfc3339())
                .ok(),
            "TIMESTAMP" => row
                .try_get::<chrono::NaiveDateTime, _>(idx)
                .map(|v| v.to_string())
                .ok(),
            "DATE" => row
                .try_get::<chrono::NaiveDate, _>(idx)
                .map(|v| v.to_string())
                .ok(),
            "TIME" => row
                .try_get::<chrono::NaiveTime, _>(idx)
                .map(|v| v.to_string())
                .ok(),
            // enums and domains are sent as text
            _ => row.try_get_unchecked::<String, _>(idx).ok(),
        };
        value.map(JsonValue::String).unwrap_or(JsonValue::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categorize_type_integer() {
        assert_eq!(
            categorize_type("INT", EngineKind::MySQL),
            TypeCategory::Integer
        );
        assert_eq!(
            categorize_type("BIGINT UNSIGNED", EngineKind::MySQL),
            TypeCategory::Integer
        );
        assert_eq!(
            categorize_type("INT8", EngineKind::PostgreSQL),
            TypeCategory::Integer
        );
    }

    #[test]
    fn test_categorize_type_decimal_before_integer() {
        assert_eq!(
            categorize_type("DECIMAL", EngineKind::MySQL),
            TypeCategory::Decimal
        );
        assert_eq!(
            categorize_type("NUMERIC", EngineKind::PostgreSQL),
            TypeCategory::Decimal
        );
    }

    #[test]
    fn test_categorize_type_misc() {
        assert_eq!(
            categorize_type("BOOL", EngineKind::PostgreSQL),
            TypeCategory::Boolean
        );
        assert_eq!(
            categorize_type("JSONB", EngineKind::PostgreSQL),
            TypeCategory::Json
        );
        assert_eq!(
            categorize_type("UUID", EngineKind::PostgreSQL),
            TypeCategory::Uuid
        );
        assert_eq!(
            categorize_type("BYTEA", EngineKind::PostgreSQL),
            TypeCategory::Binary
        );
        assert_eq!(
            categorize_type("BIT", EngineKind::MySQL),
            TypeCategory::Binary
        );
        assert_eq!(
            categorize_type("VARCHAR", EngineKind::MySQL),
            TypeCategory::Text
        );
        assert_eq!(
            categorize_type("TIMESTAMPTZ", EngineKind::PostgreSQL),
            TypeCategory::Text
        );
    }

    #[test]
    fn test_binary_to_json() {
        assert_eq!(binary_to_json(b"hello"), JsonValue::String("hello".into()));
        assert_eq!(
            binary_to_json(&[0xFF, 0xFE, 0x00, 0x01]),
            JsonValue::String("//4AAQ==".into())
        );
        assert_eq!(binary_to_json(&[]), JsonValue::String(String::new()));
    }

    #[test]
    fn test_float_to_json_non_finite() {
        assert_eq!(float_to_json(1.5), serde_json::json!(1.5));
        assert_eq!(float_to_json(f64::NAN), JsonValue::String("NaN".into()));
    }
}
