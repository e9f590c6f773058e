// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use async_trait::async_trait;
use tokio_postgres::{GenericClient, types::ToSql};
use tracing::{debug, instrument};

use crate::{Row, Statement, database_error::DatabaseError};

/// The execution channel: runs a statement and returns its rows keyed by native column name.
#[async_trait]
pub trait DatabaseExecutor: Send + Sync {
    async fn query(&self, statement: &Statement) -> Result<Vec<Row>, DatabaseError>;
}

#[async_trait]
impl<T: DatabaseExecutor + ?Sized> DatabaseExecutor for std::sync::Arc<T> {
    async fn query(&self, statement: &Statement) -> Result<Vec<Row>, DatabaseError> {
        (**self).query(statement).await
    }
}

/// Executes statements through a `tokio-postgres` client (or transaction).
///
/// The statement is wrapped so that Postgres aggregates the result into a single JSON array, which
/// gives rows of any shape without a per-column type mapping:
///
/// ```sql
/// WITH "rows" AS (<statement>) SELECT COALESCE(json_agg("rows"), '[]')::text FROM "rows"
/// ```
pub struct PgExecutor<C> {
    client: C,
}

impl<C> PgExecutor<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    pub fn into_inner(self) -> C {
        self.client
    }
}

pub(crate) fn json_rows_sql(sql: &str) -> String {
    format!(r#"WITH "rows" AS ({sql}) SELECT COALESCE(json_agg("rows"), '[]')::text FROM "rows""#)
}

#[async_trait]
impl<C: GenericClient + Send + Sync> DatabaseExecutor for PgExecutor<C> {
    #[instrument(name = "PgExecutor::query", skip_all, fields(sql = %statement.sql))]
    async fn query(&self, statement: &Statement) -> Result<Vec<Row>, DatabaseError> {
        let sql = json_rows_sql(&statement.sql);
        let params: Vec<&(dyn ToSql + Sync)> = statement
            .params
            .iter()
            .map(|param| param as &(dyn ToSql + Sync))
            .collect();

        debug!(%statement, "Executing statement");

        let row = self
            .client
            .query_one(sql.as_str(), &params)
            .await
            .map_err(|e| DatabaseError::Delegate(e).with_context(statement.sql.clone()))?;

        let json: String = row.try_get(0)?;
        let rows: Vec<Row> = serde_json::from_str(&json)?;

        debug!(count = rows.len(), "Fetched rows");
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_statement_in_json_aggregate() {
        assert_eq!(
            json_rows_sql(r#"SELECT * FROM "people""#),
            r#"WITH "rows" AS (SELECT * FROM "people") SELECT COALESCE(json_agg("rows"), '[]')::text FROM "rows""#
        );
    }
}
