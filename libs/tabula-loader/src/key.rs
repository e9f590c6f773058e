// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use serde_json::Value;
use tabula_sql::{Row, SQLValue};

/// A lookup key: one value for a single-column loader, one value per column (in the loader's
/// column order) for a multi-column loader.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadKey {
    Single(SQLValue),
    Composite(Vec<SQLValue>),
}

impl LoadKey {
    pub fn composite<T: Into<SQLValue>>(values: impl IntoIterator<Item = T>) -> Self {
        LoadKey::Composite(values.into_iter().map(Into::into).collect())
    }

    /// Read the key for `columns` out of a row. `None` if the row lacks one of the columns.
    pub fn from_row(row: &Row, columns: &[String], composite: bool) -> Option<Self> {
        let values = columns
            .iter()
            .map(|column| row.get(column).map(SQLValue::from))
            .collect::<Option<Vec<_>>>()?;

        match (composite, values.as_slice()) {
            (false, [value]) => Some(LoadKey::Single(value.clone())),
            (false, _) => None,
            (true, _) => Some(LoadKey::Composite(values)),
        }
    }

    pub fn values(&self) -> &[SQLValue] {
        match self {
            LoadKey::Single(value) => std::slice::from_ref(value),
            LoadKey::Composite(values) => values,
        }
    }

    /// The values as they appear in fetched rows.
    pub(crate) fn json_values(&self) -> Vec<Value> {
        self.values().iter().map(to_json).collect()
    }

    /// The cache key: the serialized values, in column order. Strings are lowercased for loaders
    /// that ignore case, so that `"A"` and `"a"` share an entry. This is the same folding the batch
    /// lookup applies (`lower()`), so keys sharing an entry are also the same key to the database.
    pub(crate) fn cache_key(&self, ignore_case: bool) -> String {
        let values = self
            .json_values()
            .into_iter()
            .map(|value| match value {
                Value::String(s) if ignore_case => Value::String(s.to_lowercase()),
                value => value,
            })
            .collect();

        Value::Array(values).to_string()
    }
}

pub(crate) fn to_json(value: &SQLValue) -> Value {
    match value {
        SQLValue::Null | SQLValue::Default => Value::Null,
        SQLValue::Bool(b) => Value::Bool(*b),
        SQLValue::Int(i) => Value::from(*i),
        // Integral floats are the same key as the integer (`1.0` and `1`)
        SQLValue::Float(f)
            if f.fract() == 0.0 && (i64::MIN as f64..i64::MAX as f64).contains(f) =>
        {
            Value::from(*f as i64)
        }
        SQLValue::Float(f) => serde_json::Number::from_f64(*f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        SQLValue::Text(s) => Value::String(s.clone()),
        SQLValue::Json(json) => json.clone(),
        SQLValue::Timestamp(_) => to_json(&value.clone().canonical()),
        SQLValue::Array(elems) => Value::Array(elems.iter().map(to_json).collect()),
    }
}

impl From<SQLValue> for LoadKey {
    fn from(value: SQLValue) -> Self {
        LoadKey::Single(value)
    }
}

impl From<Vec<SQLValue>> for LoadKey {
    fn from(values: Vec<SQLValue>) -> Self {
        LoadKey::Composite(values)
    }
}

macro_rules! single_load_key {
    ($($t:ty),*) => {
        $(
            impl From<$t> for LoadKey {
                fn from(value: $t) -> Self {
                    LoadKey::Single(value.into())
                }
            }
        )*
    };
}

single_load_key!(bool, i32, i64, f64, &str, String);
