// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::fmt::{Display, Write};

use bytes::BytesMut;
use chrono::{DateTime, SecondsFormat, Utc};
use tokio_postgres::types::{Format, IsNull, ToSql, Type, to_sql_checked};

use crate::database_error::DatabaseError;

/// A value bound to a statement parameter.
///
/// Parameters are always sent to Postgres in the text format, so the server parses each value
/// according to the type it inferred for the placeholder (or the explicit cast next to it). This
/// lets a single dynamic value type serve every column type.
#[derive(Debug, Clone, PartialEq)]
pub enum SQLValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Json(serde_json::Value),
    Timestamp(DateTime<Utc>),
    Array(Vec<SQLValue>),
    /// The `DEFAULT` keyword. Rendered inline, never bound as a parameter.
    Default,
}

impl SQLValue {
    pub fn is_null(&self) -> bool {
        matches!(self, SQLValue::Null)
    }

    /// Normalize the value before binding it. Timestamps become their canonical ISO-8601 text
    /// (`2024-01-31T10:00:00.000Z`); everything else is unchanged.
    pub fn canonical(self) -> SQLValue {
        match self {
            SQLValue::Timestamp(ts) => SQLValue::Text(iso_8601(&ts)),
            SQLValue::Array(elems) => {
                SQLValue::Array(elems.into_iter().map(SQLValue::canonical).collect())
            }
            value => value,
        }
    }

    /// Lowercase textual values (used for case-insensitive lookups).
    pub fn to_lowercase(&self) -> SQLValue {
        match self {
            SQLValue::Text(text) => SQLValue::Text(text.to_lowercase()),
            SQLValue::Array(elems) => SQLValue::Array(elems.iter().map(Self::to_lowercase).collect()),
            value => value.clone(),
        }
    }

    /// The text-format representation sent to the server. `None` stands for SQL `NULL`.
    pub fn to_text(&self) -> Result<Option<String>, DatabaseError> {
        let text = match self {
            SQLValue::Null => return Ok(None),
            SQLValue::Bool(b) => if *b { "t" } else { "f" }.to_string(),
            SQLValue::Int(i) => i.to_string(),
            SQLValue::Float(f) => float_text(*f),
            SQLValue::Text(s) => s.clone(),
            SQLValue::Json(json) => json.to_string(),
            SQLValue::Timestamp(ts) => iso_8601(ts),
            SQLValue::Array(elems) => {
                let mut out = String::new();
                write_array_literal(elems, &mut out)?;
                out
            }
            SQLValue::Default => {
                return Err(DatabaseError::Validation(
                    "DEFAULT cannot be bound as a parameter".into(),
                ));
            }
        };

        Ok(Some(text))
    }
}

fn iso_8601(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn float_text(f: f64) -> String {
    if f.is_nan() {
        "NaN".to_string()
    } else if f.is_infinite() {
        if f > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else {
        f.to_string()
    }
}

/// Write a Postgres array literal such as `{1,"two",NULL,{3,4}}`.
fn write_array_literal(elems: &[SQLValue], out: &mut String) -> Result<(), DatabaseError> {
    out.push('{');
    for (i, elem) in elems.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        match elem {
            SQLValue::Array(nested) => write_array_literal(nested, out)?,
            elem => match elem.to_text()? {
                None => out.push_str("NULL"),
                Some(text) => {
                    out.push('"');
                    for c in text.chars() {
                        if c == '"' || c == '\\' {
                            out.push('\\');
                        }
                        out.push(c);
                    }
                    out.push('"');
                }
            },
        }
    }
    out.push('}');
    Ok(())
}

impl Display for SQLValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SQLValue::Default => f.write_str("DEFAULT"),
            value => match value.to_text() {
                Ok(Some(text)) => f.write_str(&text),
                Ok(None) => f.write_str("NULL"),
                Err(_) => f.write_char('?'),
            },
        }
    }
}

impl ToSql for SQLValue {
    fn to_sql(
        &self,
        _ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn std::error::Error + Sync + Send>> {
        match self.to_text()? {
            Some(text) => {
                out.extend_from_slice(text.as_bytes());
                Ok(IsNull::No)
            }
            None => Ok(IsNull::Yes),
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    fn encode_format(&self, _ty: &Type) -> Format {
        Format::Text
    }

    to_sql_checked!();
}

impl From<bool> for SQLValue {
    fn from(value: bool) -> Self {
        SQLValue::Bool(value)
    }
}

impl From<i32> for SQLValue {
    fn from(value: i32) -> Self {
        SQLValue::Int(value as i64)
    }
}

impl From<i64> for SQLValue {
    fn from(value: i64) -> Self {
        SQLValue::Int(value)
    }
}

impl From<f64> for SQLValue {
    fn from(value: f64) -> Self {
        SQLValue::Float(value)
    }
}

impl From<&str> for SQLValue {
    fn from(value: &str) -> Self {
        SQLValue::Text(value.to_string())
    }
}

impl From<String> for SQLValue {
    fn from(value: String) -> Self {
        SQLValue::Text(value)
    }
}

impl From<DateTime<Utc>> for SQLValue {
    fn from(value: DateTime<Utc>) -> Self {
        SQLValue::Timestamp(value)
    }
}

impl<T: Into<SQLValue>> From<Option<T>> for SQLValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(SQLValue::Null)
    }
}

impl<T: Into<SQLValue>> From<Vec<T>> for SQLValue {
    fn from(value: Vec<T>) -> Self {
        SQLValue::Array(value.into_iter().map(Into::into).collect())
    }
}

impl From<&serde_json::Value> for SQLValue {
    fn from(value: &serde_json::Value) -> Self {
        use serde_json::Value;

        match value {
            Value::Null => SQLValue::Null,
            Value::Bool(b) => SQLValue::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => SQLValue::Int(i),
                None => SQLValue::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => SQLValue::Text(s.clone()),
            Value::Array(elems) => SQLValue::Array(elems.iter().map(SQLValue::from).collect()),
            Value::Object(_) => SQLValue::Json(value.clone()),
        }
    }
}

impl From<serde_json::Value> for SQLValue {
    fn from(value: serde_json::Value) -> Self {
        SQLValue::from(&value)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;

    fn text(value: impl Into<SQLValue>) -> Option<String> {
        let value: SQLValue = value.into();
        value.to_text().unwrap()
    }

    #[test]
    fn scalars() {
        assert_eq!(text(true).as_deref(), Some("t"));
        assert_eq!(text(42).as_deref(), Some("42"));
        assert_eq!(text(1.5).as_deref(), Some("1.5"));
        assert_eq!(text(f64::NEG_INFINITY).as_deref(), Some("-Infinity"));
        assert_eq!(text("Sam").as_deref(), Some("Sam"));
        assert_eq!(text(SQLValue::Null), None);
    }

    #[test]
    fn arrays_are_quoted() {
        let value = SQLValue::from(vec![
            SQLValue::from("plain"),
            SQLValue::from(r#"with "quote" and \"#),
            SQLValue::Null,
            SQLValue::from(vec![1, 2]),
        ]);

        assert_eq!(
            value.to_text().unwrap().as_deref(),
            Some(r#"{"plain","with \"quote\" and \\",NULL,{"1","2"}}"#)
        );
    }

    #[test]
    fn timestamps_are_canonical() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 31, 10, 0, 5).unwrap();

        assert_eq!(
            SQLValue::from(ts).canonical(),
            SQLValue::Text("2024-01-31T10:00:05.000Z".into())
        );
    }

    #[test]
    fn from_json() {
        assert_eq!(SQLValue::from(json!(1)), SQLValue::Int(1));
        assert_eq!(SQLValue::from(json!(1.25)), SQLValue::Float(1.25));
        assert_eq!(
            SQLValue::from(json!(["a", null])),
            SQLValue::Array(vec![SQLValue::Text("a".into()), SQLValue::Null])
        );
        assert_eq!(
            SQLValue::from(json!({"a": 1})),
            SQLValue::Json(json!({"a": 1}))
        );
    }

    #[test]
    fn default_is_not_bindable() {
        assert!(SQLValue::Default.to_text().is_err());
    }
}
