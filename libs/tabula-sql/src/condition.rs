// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Structured filters and their compilation into boolean SQL fragments.

use indexmap::IndexMap;

use crate::{Fragment, SQLValue, TableMetadata, database_error::DatabaseError};

/// The right-hand side of a column condition.
#[derive(Debug, Clone, PartialEq)]
pub enum ConditionValue {
    /// `column = value` (`column IS NULL` for [`SQLValue::Null`])
    Value(SQLValue),
    /// `column = ANY(values)`
    List(Vec<SQLValue>),
    /// `column <fragment>`, e.g. `Fragment::raw("> ").param(1)`
    Raw(Fragment),
}

impl ConditionValue {
    pub fn null() -> Self {
        ConditionValue::Value(SQLValue::Null)
    }
}

macro_rules! scalar_condition_value {
    ($($t:ty),*) => {
        $(
            impl From<$t> for ConditionValue {
                fn from(value: $t) -> Self {
                    ConditionValue::Value(value.into())
                }
            }
        )*
    };
}

scalar_condition_value!(bool, i32, i64, f64, &str, String, chrono::DateTime<chrono::Utc>);

impl From<SQLValue> for ConditionValue {
    fn from(value: SQLValue) -> Self {
        match value {
            SQLValue::Array(elems) => ConditionValue::List(elems),
            value => ConditionValue::Value(value),
        }
    }
}

impl From<&serde_json::Value> for ConditionValue {
    fn from(value: &serde_json::Value) -> Self {
        SQLValue::from(value).into()
    }
}

impl<T: Into<SQLValue>> From<Vec<T>> for ConditionValue {
    fn from(values: Vec<T>) -> Self {
        ConditionValue::List(values.into_iter().map(Into::into).collect())
    }
}

impl From<Fragment> for ConditionValue {
    fn from(fragment: Fragment) -> Self {
        ConditionValue::Raw(fragment)
    }
}

/// An ordered mapping from column key to condition. A key mapped to `None` places no constraint
/// on the column, which is different from filtering by `NULL`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ColumnConditions(IndexMap<String, Option<ConditionValue>>);

impl ColumnConditions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, key: impl Into<String>, value: impl Into<ConditionValue>) -> Self {
        self.0.insert(key.into(), Some(value.into()));
        self
    }

    /// Constrain the column only if a value is present.
    pub fn maybe<V: Into<ConditionValue>>(mut self, key: impl Into<String>, value: Option<V>) -> Self {
        self.0.insert(key.into(), value.map(Into::into));
        self
    }

    pub fn is_null(self, key: impl Into<String>) -> Self {
        self.eq(key, ConditionValue::null())
    }

    pub fn any<T: Into<SQLValue>>(mut self, key: impl Into<String>, values: Vec<T>) -> Self {
        self.0.insert(key.into(), Some(values.into()));
        self
    }

    pub fn raw(mut self, key: impl Into<String>, fragment: Fragment) -> Self {
        self.0.insert(key.into(), Some(ConditionValue::Raw(fragment)));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.values().all(Option::is_none)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&ConditionValue>)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_ref()))
    }
}

/// A filter on a table.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Columns(ColumnConditions),
    /// Pre-built boolean fragments, passed through unchanged
    Fragments(Vec<Fragment>),
    /// A single pre-built boolean fragment
    Raw(Fragment),
}

impl Default for Condition {
    fn default() -> Self {
        Condition::Columns(ColumnConditions::default())
    }
}

impl Condition {
    /// Build column conditions from a JSON object (`{"code": "abc", "id": [1, 2]}`). JSON arrays
    /// become `ANY` lists.
    pub fn from_json(object: &serde_json::Map<String, serde_json::Value>) -> Self {
        Condition::Columns(ColumnConditions(
            object
                .iter()
                .map(|(key, value)| (key.clone(), Some(ConditionValue::from(value))))
                .collect(),
        ))
    }

    /// Compile to a list of boolean fragments, one per constrained column (in key order).
    pub fn compile(&self, table: &TableMetadata) -> Result<Vec<Fragment>, DatabaseError> {
        match self {
            Condition::Columns(columns) => columns
                .iter()
                .filter_map(|(key, value)| value.map(|value| compile_column(table, key, value)))
                .collect(),
            Condition::Fragments(fragments) => Ok(fragments.clone()),
            Condition::Raw(fragment) => Ok(vec![fragment.clone()]),
        }
    }
}

impl From<ColumnConditions> for Condition {
    fn from(columns: ColumnConditions) -> Self {
        Condition::Columns(columns)
    }
}

impl From<Fragment> for Condition {
    fn from(fragment: Fragment) -> Self {
        Condition::Raw(fragment)
    }
}

impl From<Vec<Fragment>> for Condition {
    fn from(fragments: Vec<Fragment>) -> Self {
        Condition::Fragments(fragments)
    }
}

fn compile_column(
    table: &TableMetadata,
    key: &str,
    value: &ConditionValue,
) -> Result<Fragment, DatabaseError> {
    let column = table.column_fragment(key);

    match value {
        ConditionValue::Value(SQLValue::Null) => Ok(column.sql(" IS NULL")),
        ConditionValue::Value(value) => Ok(column.sql(" = ").param(value.clone())),
        ConditionValue::Raw(fragment) => Ok(column.sql(" ").append(fragment.clone())),
        ConditionValue::List(values) => {
            let element_type = table.native_type(key).ok_or_else(|| {
                DatabaseError::Config(format!(
                    "cannot use array condition: column type not provided for `{key}` in `{}`",
                    table.name
                ))
            })?;

            let (nulls, values): (Vec<_>, Vec<_>) =
                values.iter().cloned().partition(SQLValue::is_null);

            let any = column
                .clone()
                .sql(" = ANY(")
                .typed_param(SQLValue::Array(values), format!("{element_type}[]"))
                .sql(")");

            // NULL never compares equal, so a NULL member needs its own test
            if nulls.is_empty() {
                Ok(any)
            } else {
                Ok(Fragment::join([any, column.sql(" IS NULL")], " OR ").parenthesized())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::ExpressionBuilder;
    use crate::test_util::{people_table, products_table};

    fn compile_one(condition: Condition) -> (String, Vec<SQLValue>) {
        let fragments = condition.compile(&people_table()).unwrap();
        assert_eq!(fragments.len(), 1);
        fragments[0].to_sql()
    }

    #[test]
    fn scalar() {
        assert_binding!(
            compile_one(ColumnConditions::new().eq("age", 5).into()),
            r#""people"."age" = $1"#,
            5
        );
    }

    #[test]
    fn null_filter_vs_no_filter() {
        let condition: Condition = ColumnConditions::new()
            .is_null("age")
            .maybe::<i32>("name", None)
            .into();

        assert_binding!(compile_one(condition), r#""people"."age" IS NULL"#);
    }

    #[test]
    fn list_uses_declared_type() {
        assert_binding!(
            compile_one(ColumnConditions::new().any("createdAt", vec!["2024-01-01"]).into()),
            r#""people"."created_at" = ANY($1::timestamptz[])"#,
            vec!["2024-01-01"]
        );
    }

    #[test]
    fn list_with_null() {
        assert_binding!(
            compile_one(
                ColumnConditions::new()
                    .any("age", vec![SQLValue::Int(1), SQLValue::Null])
                    .into()
            ),
            r#"("people"."age" = ANY($1::int4[]) OR "people"."age" IS NULL)"#,
            vec![1]
        );
    }

    #[test]
    fn list_without_type_is_a_config_error() {
        let condition: Condition = ColumnConditions::new().any("price", vec![1, 2]).into();

        let err = condition.compile(&products_table()).unwrap_err();
        assert!(err.is_config());
        assert!(
            err.to_string()
                .contains("cannot use array condition: column type not provided")
        );
    }

    #[test]
    fn raw_right_hand_side() {
        assert_binding!(
            compile_one(
                ColumnConditions::new()
                    .raw("age", Fragment::raw("> ").param(1))
                    .into()
            ),
            r#""people"."age" > $1"#,
            1
        );
    }

    #[test]
    fn key_order_is_preserved() {
        let condition: Condition = ColumnConditions::new()
            .eq("name", "Sam")
            .eq("age", 30)
            .into();

        let sql: Vec<String> = condition
            .compile(&people_table())
            .unwrap()
            .iter()
            .map(|f| f.to_sql().0)
            .collect();

        assert_eq!(sql, vec![r#""people"."name" = $1"#, r#""people"."age" = $1"#]);
    }

    #[test]
    fn fragments_pass_through() {
        let fragments = vec![Fragment::raw("1 = 1"), Fragment::raw("2 = 2")];

        assert_eq!(
            Condition::from(fragments.clone())
                .compile(&people_table())
                .unwrap(),
            fragments
        );
    }

    #[test]
    fn from_json_object() {
        let object = json!({"name": "Sam", "age": [30, 31], "email": null});
        let condition = Condition::from_json(object.as_object().unwrap());

        let sql: Vec<String> = condition
            .compile(&people_table())
            .unwrap()
            .iter()
            .map(|f| f.to_sql().0)
            .collect();

        assert_eq!(
            sql,
            vec![
                r#""people"."name" = $1"#,
                r#""people"."age" = ANY($1::int4[])"#,
                r#""people"."email" IS NULL"#,
            ]
        );
    }
}
