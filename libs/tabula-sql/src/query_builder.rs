// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use tracing::debug;

use crate::{
    CaseSensitivity, ColumnConditions, Condition, ExpressionBuilder, Fragment, GroupBy, Limit,
    OrderBy, SQLValue, Statement, TableMetadata,
    clause::{having_clause, where_clause},
    database_error::DatabaseError,
};

/// Row locking for a `SELECT`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ForUpdate {
    #[default]
    None,
    /// `FOR UPDATE OF "<this table>"`
    This,
    /// `FOR UPDATE OF "a", "b"`
    Tables(Vec<String>),
}

impl From<bool> for ForUpdate {
    fn from(lock: bool) -> Self {
        if lock { ForUpdate::This } else { ForUpdate::None }
    }
}

impl From<&str> for ForUpdate {
    fn from(table: &str) -> Self {
        ForUpdate::Tables(vec![table.to_string()])
    }
}

impl From<Vec<&str>> for ForUpdate {
    fn from(tables: Vec<&str>) -> Self {
        ForUpdate::Tables(tables.into_iter().map(String::from).collect())
    }
}

/// Clauses of a `SELECT` (and the subset that applies to other statements).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueryOptions {
    pub condition: Option<Condition>,
    pub group_by: Option<GroupBy>,
    pub having: Option<Condition>,
    pub order_by: Option<OrderBy>,
    pub limit: Option<Limit>,
    pub for_update: ForUpdate,
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_where(mut self, condition: impl Into<Condition>) -> Self {
        self.condition = Some(condition.into());
        self
    }

    pub fn with_group_by(mut self, group_by: GroupBy) -> Self {
        self.group_by = Some(group_by);
        self
    }

    pub fn with_having(mut self, condition: impl Into<Condition>) -> Self {
        self.having = Some(condition.into());
        self
    }

    pub fn with_order_by(mut self, order_by: OrderBy) -> Self {
        self.order_by = Some(order_by);
        self
    }

    pub fn with_limit(mut self, limit: impl Into<Limit>) -> Self {
        self.limit = Some(limit.into());
        self
    }

    pub fn with_for_update(mut self, for_update: impl Into<ForUpdate>) -> Self {
        self.for_update = for_update.into();
        self
    }
}

impl From<Condition> for QueryOptions {
    fn from(condition: Condition) -> Self {
        QueryOptions::new().with_where(condition)
    }
}

impl From<ColumnConditions> for QueryOptions {
    fn from(conditions: ColumnConditions) -> Self {
        QueryOptions::new().with_where(conditions)
    }
}

/// A value written by `INSERT` or `UPDATE`.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValue {
    Value(SQLValue),
    /// Used verbatim, e.g. `now()`
    Raw(Fragment),
}

/// Column values keyed by logical column key, in insertion order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record(IndexMap<String, ColumnValue>);

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, key: impl Into<String>, value: impl Into<SQLValue>) -> Self {
        self.0.insert(key.into(), ColumnValue::Value(value.into()));
        self
    }

    pub fn raw(mut self, key: impl Into<String>, fragment: Fragment) -> Self {
        self.0.insert(key.into(), ColumnValue::Raw(fragment));
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: ColumnValue) -> Option<ColumnValue> {
        self.0.insert(key.into(), value)
    }

    pub fn get(&self, key: &str) -> Option<&ColumnValue> {
        self.0.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ColumnValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl From<&serde_json::Map<String, serde_json::Value>> for Record {
    fn from(object: &serde_json::Map<String, serde_json::Value>) -> Self {
        Self(
            object
                .iter()
                .map(|(key, value)| (key.clone(), ColumnValue::Value(value.into())))
                .collect(),
        )
    }
}

/// What to delete. An unconstrained delete must be requested explicitly with `true`.
#[derive(Debug, Clone, PartialEq)]
pub enum DeleteRequest {
    Options(QueryOptions),
    Force(bool),
}

impl Default for DeleteRequest {
    fn default() -> Self {
        DeleteRequest::Force(false)
    }
}

impl From<bool> for DeleteRequest {
    fn from(force: bool) -> Self {
        DeleteRequest::Force(force)
    }
}

impl From<QueryOptions> for DeleteRequest {
    fn from(options: QueryOptions) -> Self {
        DeleteRequest::Options(options)
    }
}

impl From<Condition> for DeleteRequest {
    fn from(condition: Condition) -> Self {
        DeleteRequest::Options(condition.into())
    }
}

impl From<ColumnConditions> for DeleteRequest {
    fn from(conditions: ColumnConditions) -> Self {
        DeleteRequest::Options(conditions.into())
    }
}

/// Builds statements against a single table. Every operation returns a parameterized
/// [`Statement`]; nothing is executed here.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    table: Arc<TableMetadata>,
    /// Written for columns a row of a multi-row insert doesn't provide
    missing_value: SQLValue,
}

impl QueryBuilder {
    pub fn new(table: Arc<TableMetadata>) -> Self {
        Self {
            table,
            missing_value: SQLValue::Default,
        }
    }

    pub fn with_missing_value(mut self, missing_value: SQLValue) -> Self {
        self.missing_value = missing_value;
        self
    }

    pub fn table(&self) -> &TableMetadata {
        &self.table
    }

    /// `SELECT * FROM "t" ...`
    pub fn select(&self, options: &QueryOptions) -> Result<Statement, DatabaseError> {
        self.select_columns::<&str>(&[], options)
    }

    /// `SELECT "t"."a", "t"."b" FROM "t" ...`. An empty projection selects every column.
    pub fn select_columns<K: AsRef<str>>(
        &self,
        keys: &[K],
        options: &QueryOptions,
    ) -> Result<Statement, DatabaseError> {
        let projection = if keys.is_empty() {
            Fragment::raw("*")
        } else {
            self.column_list(keys)
        };

        let mut stmt = self.select_from(projection);
        stmt = self.push_where(stmt, options.condition.as_ref())?;

        if let Some(group_by) = options.group_by.as_ref().and_then(|g| g.compile(&self.table)) {
            stmt = stmt.sql(" GROUP BY ").append(group_by);
        }
        if let Some(having) = &options.having {
            stmt = stmt
                .sql(" HAVING ")
                .append(having_clause(having, &self.table)?);
        }
        stmt = self.push_order_and_limit(stmt, options);

        match &options.for_update {
            ForUpdate::None => {}
            ForUpdate::This => {
                stmt = stmt
                    .sql(" FOR UPDATE OF ")
                    .append(Fragment::identifier([&self.table.name]));
            }
            ForUpdate::Tables(tables) => {
                stmt = stmt.sql(" FOR UPDATE OF ").append(Fragment::join(
                    tables.iter().map(|table| Fragment::identifier([table])),
                    ", ",
                ));
            }
        }

        Ok(self.finish(stmt))
    }

    /// `SELECT count(*) AS "count" FROM "t" [WHERE ...]`. Only the condition of the options applies.
    pub fn count(&self, options: &QueryOptions) -> Result<Statement, DatabaseError> {
        let stmt = self.select_from(Fragment::raw(r#"count(*) AS "count""#));
        let stmt = self.push_where(stmt, options.condition.as_ref())?;

        Ok(self.finish(stmt))
    }

    /// Count rows per distinct combination of `keys`:
    /// `SELECT "t"."a", count(*) AS "count" FROM "t" [WHERE] GROUP BY "t"."a" [HAVING] [ORDER BY] [LIMIT]`.
    pub fn count_group<K: AsRef<str>>(
        &self,
        keys: &[K],
        options: &QueryOptions,
    ) -> Result<Statement, DatabaseError> {
        if keys.is_empty() {
            return Err(DatabaseError::Config(
                "count_group requires at least one column".into(),
            ));
        }

        let columns = self.column_list(keys);

        let stmt = self.select_from(columns.clone().sql(r#", count(*) AS "count""#));
        let mut stmt = self
            .push_where(stmt, options.condition.as_ref())?
            .sql(" GROUP BY ")
            .append(columns);

        if let Some(having) = &options.having {
            stmt = stmt
                .sql(" HAVING ")
                .append(having_clause(having, &self.table)?);
        }
        let stmt = self.push_order_and_limit(stmt, options);

        Ok(self.finish(stmt))
    }

    /// `INSERT INTO "t" ("a", "b") VALUES ($1, $2), ($3, DEFAULT) RETURNING *`.
    ///
    /// The column list is the union of the keys of all rows, in order of first appearance. Rows
    /// that lack a column get the builder's missing value (`DEFAULT` unless configured otherwise).
    pub fn insert(&self, rows: &[Record]) -> Result<Statement, DatabaseError> {
        let columns: IndexSet<&str> = rows.iter().flat_map(Record::keys).collect();

        let stmt = Fragment::raw("INSERT INTO ").append(self.table.name_fragment());

        let stmt = match (rows.len(), columns.is_empty()) {
            (0, _) => {
                return Err(DatabaseError::Config(format!(
                    "no rows provided to insert into `{}`",
                    self.table.name
                )));
            }
            (1, true) => stmt.sql(" DEFAULT VALUES"),
            (_, true) => {
                return Err(DatabaseError::Config(format!(
                    "cannot insert several rows without columns into `{}`",
                    self.table.name
                )));
            }
            (_, false) => {
                let values = rows.iter().map(|row| {
                    Fragment::join(
                        columns.iter().map(|key| match row.get(key) {
                            Some(value) => value_fragment(value),
                            None => Fragment::new().param(self.missing_value.clone()),
                        }),
                        ", ",
                    )
                    .parenthesized()
                });

                stmt.sql(" ")
                    .append(self.target_list(columns.iter()).parenthesized())
                    .sql(" VALUES ")
                    .append(Fragment::join(values, ", "))
            }
        };

        Ok(self.finish(stmt.sql(" RETURNING *")))
    }

    /// `UPDATE "t" SET "a" = $1, ... [WHERE ...] RETURNING *`
    pub fn update(
        &self,
        data: &Record,
        condition: Option<&Condition>,
    ) -> Result<Statement, DatabaseError> {
        if data.is_empty() {
            return Err(DatabaseError::Config(format!(
                "no columns provided to update in `{}`",
                self.table.name
            )));
        }

        let assignments = data.iter().map(|(key, value)| {
            Fragment::identifier([self.table.native_name(key)])
                .sql(" = ")
                .append(value_fragment(value))
        });

        let stmt = Fragment::raw("UPDATE ")
            .append(self.table.name_fragment())
            .sql(" SET ")
            .append(Fragment::join(assignments, ", "));
        let stmt = self.push_where(stmt, condition)?.sql(" RETURNING *");

        Ok(self.finish(stmt))
    }

    /// `DELETE FROM "t" WHERE ... RETURNING *`. Refuses to build a statement that would delete
    /// every row unless asked with `true`.
    pub fn delete(&self, request: impl Into<DeleteRequest>) -> Result<Statement, DatabaseError> {
        let stmt = Fragment::raw("DELETE FROM ").append(self.table.name_fragment());

        let stmt = match request.into() {
            DeleteRequest::Force(true) => stmt,
            DeleteRequest::Force(false) => return Err(self.unconstrained_delete_error()),
            DeleteRequest::Options(options) => {
                let condition = match &options.condition {
                    Some(Condition::Raw(fragment)) => fragment.clone(),
                    Some(condition) => {
                        let fragments = condition.compile(&self.table)?;
                        if fragments.is_empty() {
                            return Err(self.unconstrained_delete_error());
                        }
                        crate::clause::and(fragments)
                    }
                    None => return Err(self.unconstrained_delete_error()),
                };
                stmt.sql(" WHERE ").append(condition)
            }
        };

        Ok(self.finish(stmt.sql(" RETURNING *")))
    }

    /// Fetch every row whose `key` column is one of `values`:
    /// `SELECT * FROM "t" WHERE "t"."a" = ANY($1::int4[])`.
    ///
    /// With [`CaseSensitivity::Insensitive`] a textual column and the values are lowercased and
    /// compared as `text`.
    pub fn batch_get(
        &self,
        key: &str,
        native_type: Option<&str>,
        values: Vec<SQLValue>,
        case: CaseSensitivity,
    ) -> Result<Statement, DatabaseError> {
        let native_type = self.resolve_type(key, native_type)?;

        let fold = case == CaseSensitivity::Insensitive && is_textual(native_type);

        let condition = if fold {
            Fragment::raw("lower(")
                .append(self.table.column_fragment(key))
                .sql(") = ANY(")
                .typed_param(
                    SQLValue::Array(values.iter().map(SQLValue::to_lowercase).collect()),
                    "text[]",
                )
        } else {
            self.table
                .column_fragment(key)
                .sql(" = ANY(")
                .typed_param(SQLValue::Array(values), format!("{native_type}[]"))
        }
        .sql(")");

        let stmt = self
            .select_from(Fragment::raw("*"))
            .sql(" WHERE ")
            .append(condition);

        Ok(self.finish(stmt))
    }

    /// Fetch every row matching one of the composite `keys` (each holding one value per column):
    /// `SELECT * FROM "t" WHERE ("t"."a", "t"."b") IN (SELECT * FROM unnest($1::ta[], $2::tb[]))`.
    pub fn multi_column_batch_get<C: AsRef<str>, T: AsRef<str>>(
        &self,
        keys: &[Vec<SQLValue>],
        columns: &[C],
        types: &[T],
    ) -> Result<Statement, DatabaseError> {
        self.multi_column_batch_get_with(keys, columns, types, CaseSensitivity::Sensitive)
    }

    /// Like [`Self::multi_column_batch_get`]. With [`CaseSensitivity::Insensitive`], textual
    /// columns and their values are lowercased on both sides.
    pub fn multi_column_batch_get_with<C: AsRef<str>, T: AsRef<str>>(
        &self,
        keys: &[Vec<SQLValue>],
        columns: &[C],
        types: &[T],
        case: CaseSensitivity,
    ) -> Result<Statement, DatabaseError> {
        if columns.len() != types.len() {
            return Err(DatabaseError::Config(
                "Same number of types and keys must be provided".into(),
            ));
        }
        if columns.is_empty() {
            return Err(DatabaseError::Config(
                "at least one column must be provided for a batch lookup".into(),
            ));
        }
        if let Some(key) = keys.iter().find(|key| key.len() != columns.len()) {
            return Err(DatabaseError::Config(format!(
                "expected {} values per key, got {}",
                columns.len(),
                key.len()
            )));
        }

        let mut lhs = Vec::with_capacity(columns.len());
        let mut arrays = Vec::with_capacity(columns.len());

        for (index, (column, typ)) in columns.iter().zip(types).enumerate() {
            let (column, typ) = (column.as_ref(), typ.as_ref());
            let fold = case == CaseSensitivity::Insensitive && is_textual(typ);

            let values = keys.iter().map(|key| &key[index]);
            let values: Vec<SQLValue> = if fold {
                values.map(SQLValue::to_lowercase).collect()
            } else {
                values.cloned().collect()
            };

            let column = self.table.column_fragment(column);
            lhs.push(if fold {
                Fragment::raw("lower(").append(column).sql(")")
            } else {
                column
            });
            arrays.push(Fragment::new().typed_param(SQLValue::Array(values), format!("{typ}[]")));
        }

        let stmt = self
            .select_from(Fragment::raw("*"))
            .sql(" WHERE ")
            .append(Fragment::join(lhs, ", ").parenthesized())
            .sql(" IN (SELECT * FROM unnest(")
            .append(Fragment::join(arrays, ", "))
            .sql("))");

        Ok(self.finish(stmt))
    }

    fn resolve_type<'a>(
        &'a self,
        key: &str,
        native_type: Option<&'a str>,
    ) -> Result<&'a str, DatabaseError> {
        native_type
            .or_else(|| self.table.native_type(key))
            .ok_or_else(|| {
                DatabaseError::Config(format!(
                    "column type not provided for `{key}` in `{}`",
                    self.table.name
                ))
            })
    }

    fn select_from(&self, projection: Fragment) -> Fragment {
        Fragment::raw("SELECT ")
            .append(projection)
            .sql(" FROM ")
            .append(self.table.name_fragment())
    }

    fn column_list<K: AsRef<str>>(&self, keys: &[K]) -> Fragment {
        Fragment::join(
            keys.iter().map(|key| self.table.column_fragment(key.as_ref())),
            ", ",
        )
    }

    /// Unqualified column names, for INSERT column lists
    fn target_list<'a>(&self, keys: impl Iterator<Item = &'a &'a str>) -> Fragment {
        Fragment::join(
            keys.map(|key| Fragment::identifier([self.table.native_name(key)])),
            ", ",
        )
    }

    fn push_where(
        &self,
        stmt: Fragment,
        condition: Option<&Condition>,
    ) -> Result<Fragment, DatabaseError> {
        Ok(match condition {
            Some(condition) => stmt
                .sql(" WHERE ")
                .append(where_clause(condition, &self.table)?),
            None => stmt,
        })
    }

    fn push_order_and_limit(&self, mut stmt: Fragment, options: &QueryOptions) -> Fragment {
        if let Some(order_by) = options.order_by.as_ref().and_then(|o| o.compile(&self.table)) {
            stmt = stmt.sql(" ORDER BY ").append(order_by);
        }
        if let Some(limit) = &options.limit {
            stmt = stmt.sql(" ").append(limit.compile());
        }
        stmt
    }

    fn finish(&self, stmt: Fragment) -> Statement {
        let (sql, params) = stmt.to_sql();
        let statement = Statement::new(sql, params);
        debug!(table = %self.table.name, %statement, "Built statement");
        statement
    }

    fn unconstrained_delete_error(&self) -> DatabaseError {
        DatabaseError::Config(format!(
            "refusing to delete every row of `{}` without a condition (pass `true` to do so)",
            self.table.name
        ))
    }
}

fn value_fragment(value: &ColumnValue) -> Fragment {
    match value {
        ColumnValue::Value(value) => Fragment::new().param(value.clone()),
        ColumnValue::Raw(fragment) => fragment.clone(),
    }
}

/// Types whose values can be case-folded with `lower()`.
fn is_textual(native_type: &str) -> bool {
    matches!(
        native_type.to_ascii_lowercase().as_str(),
        "text" | "varchar" | "character varying" | "char" | "character" | "bpchar" | "citext" | "name"
    )
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::{OrderByItem, test_util::people_table};

    fn people() -> QueryBuilder {
        QueryBuilder::new(Arc::new(people_table()))
    }

    #[test]
    fn select_all() {
        assert_binding!(
            people().select(&QueryOptions::new()).unwrap(),
            r#"SELECT * FROM "people""#
        );
    }

    #[test]
    fn select_with_every_clause() {
        let options = QueryOptions::new()
            .with_where(ColumnConditions::new().eq("name", "Sam"))
            .with_order_by(OrderBy::new([OrderByItem::desc("createdAt")]))
            .with_limit((10u64, 5u64))
            .with_for_update(true);

        assert_binding!(
            people().select(&options).unwrap(),
            r#"SELECT * FROM "people" WHERE "people"."name" = $1 ORDER BY "people"."created_at" DESC LIMIT $2 OFFSET $3 FOR UPDATE OF "people""#,
            "Sam",
            10i64,
            5i64
        );
    }

    #[test]
    fn empty_where_is_true() {
        assert_binding!(
            people()
                .select(&QueryOptions::new().with_where(ColumnConditions::new()))
                .unwrap(),
            r#"SELECT * FROM "people" WHERE true"#
        );
        assert_binding!(
            people()
                .select(&QueryOptions::new().with_where(Condition::Fragments(vec![])))
                .unwrap(),
            r#"SELECT * FROM "people" WHERE true"#
        );
    }

    #[test]
    fn projection_grouping_and_locking_other_tables() {
        let options = QueryOptions::new()
            .with_group_by(GroupBy::new(["age"]))
            .with_having(Fragment::raw("count(*) > ").param(1))
            .with_for_update(vec!["people", "teams"]);

        assert_binding!(
            people().select_columns(&["age"], &options).unwrap(),
            r#"SELECT "people"."age" FROM "people" GROUP BY "people"."age" HAVING count(*) > $1 FOR UPDATE OF "people", "teams""#,
            1
        );
    }

    #[test]
    fn schema_qualified_table() {
        let table = people_table().with_schema("crm");
        let builder = QueryBuilder::new(Arc::new(table));

        assert_binding!(
            builder
                .select(&QueryOptions::from(ColumnConditions::new().eq("id", 1)))
                .unwrap(),
            r#"SELECT * FROM "crm"."people" WHERE "people"."id" = $1"#,
            1
        );
    }

    #[test]
    fn count_ignores_other_clauses() {
        let options = QueryOptions::new()
            .with_where(ColumnConditions::new().eq("age", 30))
            .with_order_by(OrderBy::new(["name"]))
            .with_limit(Limit::Count(3))
            .with_for_update(true);

        assert_binding!(
            people().count(&options).unwrap(),
            r#"SELECT count(*) AS "count" FROM "people" WHERE "people"."age" = $1"#,
            30
        );
    }

    #[test]
    fn count_group() {
        let options = QueryOptions::new()
            .with_having(Fragment::raw(r#"count(*) > 1"#))
            .with_order_by(OrderBy(vec![OrderByItem::Identifier(vec![
                "count".to_string(),
            ])]));

        assert_binding!(
            people().count_group(&["age"], &options).unwrap(),
            r#"SELECT "people"."age", count(*) AS "count" FROM "people" GROUP BY "people"."age" HAVING count(*) > 1 ORDER BY "count""#
        );

        assert!(people().count_group::<&str>(&[], &options).is_err());
    }

    #[test]
    fn insert_union_of_columns() {
        let rows = vec![
            Record::new().set("name", "Sam").set("age", 30),
            Record::new().set("email", "jo@example.com").set("name", "Jo"),
        ];

        assert_binding!(
            people().insert(&rows).unwrap(),
            r#"INSERT INTO "people" ("name", "age", "email") VALUES ($1, $2, DEFAULT), ($3, DEFAULT, $4) RETURNING *"#,
            "Sam",
            30,
            "Jo",
            "jo@example.com"
        );
    }

    #[test]
    fn insert_with_custom_missing_value() {
        let rows = vec![
            Record::new().set("name", "Sam").set("age", 30),
            Record::new().set("name", "Jo"),
        ];

        assert_binding!(
            people()
                .with_missing_value(SQLValue::Null)
                .insert(&rows)
                .unwrap(),
            r#"INSERT INTO "people" ("name", "age") VALUES ($1, $2), ($3, $4) RETURNING *"#,
            "Sam",
            30,
            "Jo",
            SQLValue::Null
        );
    }

    #[test]
    fn insert_defaults() {
        assert_binding!(
            people().insert(&[Record::new()]).unwrap(),
            r#"INSERT INTO "people" DEFAULT VALUES RETURNING *"#
        );

        let err = people().insert(&[]).unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn insert_canonicalizes_timestamps_and_keeps_raw_values() {
        let created_at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 5).unwrap();
        let rows = vec![
            Record::new()
                .set("createdAt", created_at)
                .raw("email", Fragment::raw("lower(").param("A@B.C").sql(")")),
        ];

        assert_binding!(
            people().insert(&rows).unwrap(),
            r#"INSERT INTO "people" ("created_at", "email") VALUES ($1, lower($2)) RETURNING *"#,
            "2024-03-01T12:30:05.000Z",
            "A@B.C"
        );
    }

    #[test]
    fn update() {
        let data = Record::new()
            .set("name", "Sam")
            .raw("createdAt", Fragment::raw("now()"));
        let condition: Condition = ColumnConditions::new().eq("id", 7).into();

        assert_binding!(
            people().update(&data, Some(&condition)).unwrap(),
            r#"UPDATE "people" SET "name" = $1, "created_at" = now() WHERE "people"."id" = $2 RETURNING *"#,
            "Sam",
            7
        );

        assert_binding!(
            people().update(&data, None).unwrap(),
            r#"UPDATE "people" SET "name" = $1, "created_at" = now() RETURNING *"#,
            "Sam"
        );

        assert!(people().update(&Record::new(), None).unwrap_err().is_config());
    }

    #[test]
    fn delete_requires_a_condition() {
        assert!(
            people()
                .delete(DeleteRequest::default())
                .unwrap_err()
                .is_config()
        );
        assert!(people().delete(false).unwrap_err().is_config());
        assert!(
            people()
                .delete(ColumnConditions::new().maybe::<i32>("id", None))
                .unwrap_err()
                .is_config()
        );
        assert!(people().delete(QueryOptions::new()).unwrap_err().is_config());

        assert_binding!(
            people().delete(true).unwrap(),
            r#"DELETE FROM "people" RETURNING *"#
        );
        assert_binding!(
            people().delete(ColumnConditions::new().eq("id", 7)).unwrap(),
            r#"DELETE FROM "people" WHERE "people"."id" = $1 RETURNING *"#,
            7
        );
    }

    #[test]
    fn batch_get() {
        assert_binding!(
            people()
                .batch_get("id", None, vec![1.into(), 2.into()], CaseSensitivity::Sensitive)
                .unwrap(),
            r#"SELECT * FROM "people" WHERE "people"."id" = ANY($1::int4[])"#,
            vec![1, 2]
        );

        assert_binding!(
            people()
                .batch_get(
                    "email",
                    None,
                    vec!["Sam@Example.com".into()],
                    CaseSensitivity::Insensitive
                )
                .unwrap(),
            r#"SELECT * FROM "people" WHERE lower("people"."email") = ANY($1::text[])"#,
            vec!["sam@example.com"]
        );
    }

    #[test]
    fn multi_column_batch_get() {
        let keys = vec![
            vec![SQLValue::from("Sam"), SQLValue::from(30)],
            vec![SQLValue::from("Jo"), SQLValue::from(41)],
        ];

        assert_binding!(
            people()
                .multi_column_batch_get(&keys, &["name", "age"], &["text", "int4"])
                .unwrap(),
            r#"SELECT * FROM "people" WHERE ("people"."name", "people"."age") IN (SELECT * FROM unnest($1::text[], $2::int4[]))"#,
            vec!["Sam", "Jo"],
            vec![30, 41]
        );
    }

    #[test]
    fn multi_column_batch_get_ignoring_case() {
        let keys = vec![vec![SQLValue::from("Sam"), SQLValue::from(30)]];

        assert_binding!(
            people()
                .multi_column_batch_get_with(
                    &keys,
                    &["name", "age"],
                    &["varchar", "int4"],
                    CaseSensitivity::Insensitive
                )
                .unwrap(),
            r#"SELECT * FROM "people" WHERE (lower("people"."name"), "people"."age") IN (SELECT * FROM unnest($1::varchar[], $2::int4[]))"#,
            vec!["sam"],
            vec![30]
        );
    }

    #[test]
    fn multi_column_batch_get_requires_one_type_per_column() {
        let err = people()
            .multi_column_batch_get(&[], &["name", "code"], &["t1"])
            .unwrap_err();

        assert!(err.is_config());
        assert!(
            err.to_string()
                .contains("Same number of types and keys must be provided")
        );
    }
}
