// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::fmt::Display;

use crate::SQLValue;

/// Anything that can render itself as (part of) an SQL statement.
pub trait ExpressionBuilder {
    /// Build the SQL expression into the given builder.
    fn build(&self, builder: &mut SQLBuilder);

    /// Build the expression in isolation, returning the SQL text and its parameters.
    fn to_sql(&self) -> (String, Vec<SQLValue>) {
        let mut builder = SQLBuilder::new();
        self.build(&mut builder);
        builder.into_sql()
    }
}

impl<T: ExpressionBuilder + ?Sized> ExpressionBuilder for &T {
    fn build(&self, builder: &mut SQLBuilder) {
        (**self).build(builder)
    }
}

/// A complete statement ready to hand to a [`DatabaseExecutor`](crate::DatabaseExecutor).
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<SQLValue>,
}

impl Statement {
    pub fn new(sql: String, params: Vec<SQLValue>) -> Self {
        Self { sql, params }
    }

    pub fn into_parts(self) -> (String, Vec<SQLValue>) {
        (self.sql, self.params)
    }
}

impl Display for Statement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.sql)?;
        if !self.params.is_empty() {
            write!(f, " -- [")?;
            for (i, param) in self.params.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "${}={param}", i + 1)?;
            }
            write!(f, "]")?;
        }
        Ok(())
    }
}

pub struct SQLBuilder {
    /// The SQL being built with placeholders for each parameter
    sql: String,
    /// The list of parameters
    params: Vec<SQLValue>,
    /// Indicates if column name should be rendered with the table name i.e. "table"."col"  instead
    /// of "col" (INSERT column lists and UPDATE targets must not be qualified)
    fully_qualify_column_names: bool,
}

impl Default for SQLBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SQLBuilder {
    pub fn new() -> Self {
        Self {
            sql: String::new(),
            params: Vec::new(),
            fully_qualify_column_names: true,
        }
    }

    /// Push a string
    pub fn push_str<T: AsRef<str>>(&mut self, s: T) {
        self.sql.push_str(s.as_ref());
    }

    /// Push a character
    pub fn push(&mut self, c: char) {
        self.sql.push(c);
    }

    /// Push a space
    pub fn push_space(&mut self) {
        self.sql.push(' ');
    }

    /// Push a string surrounded by double quotes. Embedded double quotes are doubled, so the
    /// identifier is always read back verbatim (including its case).
    pub fn push_identifier<T: AsRef<str>>(&mut self, s: T) {
        self.sql.push('"');
        for c in s.as_ref().chars() {
            if c == '"' {
                self.sql.push('"');
            }
            self.sql.push(c);
        }
        self.sql.push('"');
    }

    /// Push a dotted identifier path such as `"schema"."table"`.
    pub fn push_identifier_path<T: AsRef<str>>(&mut self, path: &[T]) {
        self.push_iter(path.iter(), ".", |builder, part| {
            builder.push_identifier(part)
        });
    }

    /// Push a column. Push `"<table_name>"."<column_name>"` if in fully-qualified mode, otherwise
    /// just `"<column_name>"`. See [`SQLBuilder::without_fully_qualified_column_names`].
    pub fn push_column<T: AsRef<str>>(&mut self, table_name: T, column_name: T) {
        if self.fully_qualify_column_names {
            self.push_identifier(table_name);
            self.push('.');
        }
        self.push_identifier(column_name);
    }

    /// Push a parameter, which will be replaced with a placeholder in the SQL string
    /// and the parameter will be added to the list of parameters.
    pub fn push_param(&mut self, param: SQLValue) {
        self.params.push(param);
        self.push('$');
        self.push_str(self.params.len().to_string());
    }

    /// Push a parameter followed by an explicit cast, e.g. `$1::int4[]`.
    pub fn push_typed_param(&mut self, param: SQLValue, typ: &str) {
        self.push_param(param);
        self.push_str("::");
        self.push_str(typ);
    }

    /// Push a value. [`SQLValue::Default`] is rendered as the `DEFAULT` keyword, everything else
    /// becomes a parameter.
    pub fn push_value(&mut self, value: SQLValue) {
        match value {
            SQLValue::Default => self.push_str("DEFAULT"),
            value => self.push_param(value.canonical()),
        }
    }

    /// Push elements of an iterator, separated by `sep`. The `push_elem` function provides
    /// the flexibility to map the elements (compared to [`SQLBuilder::push_elems`], which assumes that
    /// the elements implement [`ExpressionBuilder`] and [`build`](ExpressionBuilder::build) is all you need to call).
    pub fn push_iter<T>(
        &mut self,
        iter: impl ExactSizeIterator<Item = T>,
        sep: &str,
        push_elem: impl Fn(&mut Self, T),
    ) {
        let len = iter.len();
        for (i, item) in iter.enumerate() {
            push_elem(self, item);

            if i < len - 1 {
                self.sql.push_str(sep);
            }
        }
    }

    /// Push elements of a slice, separated by `sep`. The elements must themselves implement
    /// `ExpressionBuilder`.
    pub fn push_elems<T: ExpressionBuilder>(&mut self, elems: &[T], sep: &str) {
        self.push_iter(elems.iter(), sep, |builder, elem| {
            elem.build(builder);
        });
    }

    /// Get the SQL string and the list of parameters. Calling this method should be the final step
    /// in building an SQL expression, and thus this builder consumes the `self`.
    pub fn into_sql(self) -> (String, Vec<SQLValue>) {
        (self.sql, self.params)
    }

    pub fn into_statement(self) -> Statement {
        Statement::new(self.sql, self.params)
    }

    /// Execute the given function with the [`Self::fully_qualify_column_names`] flag set to false.
    /// This takes a closure, so that we can restore the original value of the flag after executing
    /// the function.
    pub fn without_fully_qualified_column_names<F, R>(&mut self, func: F) -> R
    where
        F: FnOnce(&mut Self) -> R,
    {
        let cur_fully_qualify_column_names = self.fully_qualify_column_names;
        self.fully_qualify_column_names = false;
        let ret = func(self);
        self.fully_qualify_column_names = cur_fully_qualify_column_names;
        ret
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholders_are_numbered_in_order() {
        let mut builder = SQLBuilder::new();
        builder.push_column("people", "age");
        builder.push_str(" BETWEEN ");
        builder.push_param(SQLValue::Int(18));
        builder.push_str(" AND ");
        builder.push_typed_param(SQLValue::Int(65), "int4");

        assert_binding!(
            builder.into_sql(),
            r#""people"."age" BETWEEN $1 AND $2::int4"#,
            18,
            65
        );
    }

    #[test]
    fn identifiers_escape_quotes() {
        let mut builder = SQLBuilder::new();
        builder.push_identifier_path(&["odd\"schema", "people"]);

        assert_binding!(builder.into_sql(), r#""odd""schema"."people""#);
    }

    #[test]
    fn plain_columns() {
        let mut builder = SQLBuilder::new();
        builder.without_fully_qualified_column_names(|builder| {
            builder.push_column("people", "name");
        });
        builder.push_str(" = ");
        builder.push_value(SQLValue::Default);

        assert_binding!(builder.into_sql(), r#""name" = DEFAULT"#);
    }
}
