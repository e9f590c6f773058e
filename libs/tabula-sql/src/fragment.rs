// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use crate::SQLValue;

use super::sql_builder::{ExpressionBuilder, SQLBuilder};

/// A piece of SQL supplied (or assembled) outside of the structured builders: the escape hatch for
/// custom operators and expressions.
///
/// Text parts are inserted verbatim, so they must never contain user input. Values go through
/// [`Fragment::param`], which renders a placeholder and binds the value; placeholders are numbered
/// when the fragment is embedded in a statement, so fragments compose freely.
///
/// ```no_run
/// // "people"."age" > $1
/// Fragment::column("people", "age").sql(" > ").param(18);
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Fragment {
    parts: Vec<FragmentPart>,
}

#[derive(Debug, Clone, PartialEq)]
enum FragmentPart {
    Sql(String),
    /// A dotted path of quoted identifiers: `"schema"."table"`
    Identifier(Vec<String>),
    /// A table-qualified column; honors the builder's qualification mode
    Column { table: String, column: String },
    Param(SQLValue),
    TypedParam(SQLValue, String),
}

const TAUTOLOGY: &str = "true";

impl Fragment {
    pub fn new() -> Self {
        Self::default()
    }

    /// A fragment of verbatim SQL text, e.g. `Fragment::raw("> 1")`.
    pub fn raw(sql: impl Into<String>) -> Self {
        Self::new().sql(sql)
    }

    /// The literal `true`, what an empty set of conditions compiles to.
    pub fn tautology() -> Self {
        Self::raw(TAUTOLOGY)
    }

    /// A quoted identifier path such as `"people"` or `"public"."people"."id"`.
    pub fn identifier<T: Into<String>>(path: impl IntoIterator<Item = T>) -> Self {
        Self {
            parts: vec![FragmentPart::Identifier(
                path.into_iter().map(Into::into).collect(),
            )],
        }
    }

    /// A column qualified by its table name.
    pub fn column(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            parts: vec![FragmentPart::Column {
                table: table.into(),
                column: column.into(),
            }],
        }
    }

    pub fn sql(mut self, sql: impl Into<String>) -> Self {
        self.parts.push(FragmentPart::Sql(sql.into()));
        self
    }

    pub fn param(mut self, value: impl Into<SQLValue>) -> Self {
        self.parts.push(FragmentPart::Param(value.into()));
        self
    }

    /// A parameter followed by an explicit cast (`$1::int4[]`).
    pub fn typed_param(mut self, value: impl Into<SQLValue>, typ: impl Into<String>) -> Self {
        self.parts
            .push(FragmentPart::TypedParam(value.into(), typ.into()));
        self
    }

    pub fn append(mut self, other: Fragment) -> Self {
        self.parts.extend(other.parts);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn is_tautology(&self) -> bool {
        matches!(self.parts.as_slice(), [FragmentPart::Sql(sql)] if sql.trim().eq_ignore_ascii_case(TAUTOLOGY))
    }

    /// Wrap in parentheses.
    pub fn parenthesized(self) -> Self {
        Self::raw("(").append(self).sql(")")
    }

    /// Join fragments with a separator (`", "`, `" AND "`, ...).
    pub fn join(fragments: impl IntoIterator<Item = Fragment>, sep: &str) -> Self {
        let mut joined = Fragment::new();
        for (i, fragment) in fragments.into_iter().enumerate() {
            if i > 0 {
                joined = joined.sql(sep);
            }
            joined = joined.append(fragment);
        }
        joined
    }
}

impl ExpressionBuilder for Fragment {
    fn build(&self, builder: &mut SQLBuilder) {
        for part in &self.parts {
            match part {
                FragmentPart::Sql(sql) => builder.push_str(sql),
                FragmentPart::Identifier(path) => builder.push_identifier_path(path),
                FragmentPart::Column { table, column } => builder.push_column(table, column),
                FragmentPart::Param(value) => builder.push_value(value.clone()),
                FragmentPart::TypedParam(value, typ) => {
                    builder.push_typed_param(value.clone().canonical(), typ)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_are_renumbered_when_embedded() {
        let first = Fragment::column("people", "age").sql(" > ").param(18);
        let second = Fragment::column("people", "name")
            .sql(" = ANY(")
            .typed_param(vec!["a", "b"], "text[]")
            .sql(")");

        assert_binding!(
            Fragment::join([first, second], " OR ").parenthesized().to_sql(),
            r#"("people"."age" > $1 OR "people"."name" = ANY($2::text[]))"#,
            18,
            vec!["a", "b"]
        );
    }

    #[test]
    fn identifiers() {
        assert_binding!(
            Fragment::identifier(["public", "people", "id"]).to_sql(),
            r#""public"."people"."id""#
        );
    }

    #[test]
    fn tautology() {
        assert!(Fragment::tautology().is_tautology());
        assert!(Fragment::raw(" TRUE ").is_tautology());
        assert!(!Fragment::raw("1 = 1").is_tautology());
    }
}
