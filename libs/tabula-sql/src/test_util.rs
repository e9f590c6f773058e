// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

#![cfg(test)]

//! Test assertions to check SQL statements and parameters, plus shared table fixtures.

use crate::{ColumnMetadata, SQLValue, Statement, TableMetadata};

/// Anything that can be compared against an expected statement.
pub(crate) trait IntoBinding {
    fn into_binding(self) -> (String, Vec<SQLValue>);
}

impl IntoBinding for (String, Vec<SQLValue>) {
    fn into_binding(self) -> (String, Vec<SQLValue>) {
        self
    }
}

impl IntoBinding for Statement {
    fn into_binding(self) -> (String, Vec<SQLValue>) {
        self.into_parts()
    }
}

/// Assert that the given statement matches the expected SQL and parameters.
///
/// # Usage:
/// ```no_run
/// assert_binding!(statement, r#"SELECT * FROM "people" WHERE "people"."age" = $1"#, 5);
/// ```
macro_rules! assert_binding {
    ($actual:expr, $expected_stmt:expr) => {{
        let (actual_stmt, actual_params) = $crate::test_util::IntoBinding::into_binding($actual);
        assert_eq!(actual_stmt, $expected_stmt);
        assert!(
            actual_params.is_empty(),
            "Extra actual parameters: {:?}",
            actual_params
        );
    }};
    ($actual:expr, $expected_stmt:expr, $($expected_param:expr),+ $(,)?) => {{
        let (actual_stmt, actual_params) = $crate::test_util::IntoBinding::into_binding($actual);
        assert_eq!(actual_stmt, $expected_stmt);
        let expected_params: Vec<$crate::SQLValue> =
            vec![$($crate::SQLValue::from($expected_param)),+];
        assert_eq!(actual_params, expected_params, "Parameter mismatch");
    }};
}

/// `people (id int4, name text, age int4, email varchar, created_at timestamptz)` in the
/// `public` schema, with camelCase logical keys.
pub(crate) fn people_table() -> TableMetadata {
    TableMetadata::new("people")
        .with_column("id", ColumnMetadata::new("id", "int4").with_default(true))
        .with_column("name", ColumnMetadata::new("name", "text"))
        .with_column("age", ColumnMetadata::new("age", "int4").with_nullable(true))
        .with_column("email", ColumnMetadata::new("email", "varchar"))
        .with_column(
            "createdAt",
            ColumnMetadata::new("created_at", "timestamptz").with_default(true),
        )
}

/// `products (name text, code text, price)` where `price` carries no type information.
pub(crate) fn products_table() -> TableMetadata {
    TableMetadata::new("products")
        .with_column("name", ColumnMetadata::new("name", "text"))
        .with_column("code", ColumnMetadata::new("code", "text"))
        .with_column("price", ColumnMetadata::untyped("price"))
}
