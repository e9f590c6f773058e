// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::sync::Arc;

use crate::{
    CaseSensitivity, Condition, DatabaseExecutor, QueryBuilder, QueryOptions, Record, Row,
    SQLValue, Statement, TableMetadata,
    database_error::{DatabaseError, WithContext},
    query_builder::DeleteRequest,
};

/// A [`QueryBuilder`] bound to an executor. Rows come back keyed by logical column key.
#[derive(Clone)]
pub struct TableQuery {
    builder: QueryBuilder,
    executor: Arc<dyn DatabaseExecutor>,
}

impl TableQuery {
    pub fn new(builder: QueryBuilder, executor: Arc<dyn DatabaseExecutor>) -> Self {
        Self { builder, executor }
    }

    pub fn table(&self) -> &TableMetadata {
        self.builder.table()
    }

    pub fn builder(&self) -> &QueryBuilder {
        &self.builder
    }

    pub async fn select(&self, options: &QueryOptions) -> Result<Vec<Row>, DatabaseError> {
        self.run(self.builder.select(options)?).await
    }

    pub async fn select_columns<K: AsRef<str>>(
        &self,
        keys: &[K],
        options: &QueryOptions,
    ) -> Result<Vec<Row>, DatabaseError> {
        self.run(self.builder.select_columns(keys, options)?).await
    }

    pub async fn count(&self, options: &QueryOptions) -> Result<i64, DatabaseError> {
        let rows = self.run(self.builder.count(options)?).await?;

        rows.first()
            .and_then(|row| row.get("count"))
            .and_then(serde_json::Value::as_i64)
            .ok_or_else(|| {
                DatabaseError::Validation(format!(
                    "count of `{}` did not return a number",
                    self.table().name
                ))
            })
    }

    pub async fn count_group<K: AsRef<str>>(
        &self,
        keys: &[K],
        options: &QueryOptions,
    ) -> Result<Vec<Row>, DatabaseError> {
        self.run(self.builder.count_group(keys, options)?).await
    }

    pub async fn insert(&self, rows: &[Record]) -> Result<Vec<Row>, DatabaseError> {
        self.run(self.builder.insert(rows)?).await
    }

    pub async fn update(
        &self,
        data: &Record,
        condition: Option<&Condition>,
    ) -> Result<Vec<Row>, DatabaseError> {
        self.run(self.builder.update(data, condition)?).await
    }

    pub async fn delete(
        &self,
        request: impl Into<DeleteRequest>,
    ) -> Result<Vec<Row>, DatabaseError> {
        self.run(self.builder.delete(request)?).await
    }

    pub async fn batch_get(
        &self,
        key: &str,
        native_type: Option<&str>,
        values: Vec<SQLValue>,
        case: CaseSensitivity,
    ) -> Result<Vec<Row>, DatabaseError> {
        self.run(self.builder.batch_get(key, native_type, values, case)?)
            .await
    }

    pub async fn multi_column_batch_get<C: AsRef<str>, T: AsRef<str>>(
        &self,
        keys: &[Vec<SQLValue>],
        columns: &[C],
        types: &[T],
        case: CaseSensitivity,
    ) -> Result<Vec<Row>, DatabaseError> {
        self.run(
            self.builder
                .multi_column_batch_get_with(keys, columns, types, case)?,
        )
        .await
    }

    async fn run(&self, statement: Statement) -> Result<Vec<Row>, DatabaseError> {
        let rows = self
            .executor
            .query(&statement)
            .await
            .with_context(format!("while querying `{}`", self.table().name))?;

        Ok(rows
            .into_iter()
            .map(|row| self.table().decode_row(row))
            .collect())
    }
}
