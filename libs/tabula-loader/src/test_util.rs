// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use tabula_sql::{
    ColumnMetadata, DatabaseError, DatabaseExecutor, QueryBuilder, Row, Statement, TableMetadata,
    TableQuery,
};

use crate::{BatchFetch, LoadKey, LoaderConfig, LoaderFactory, LoaderShape};

pub(crate) fn rows(value: serde_json::Value) -> Vec<Row> {
    value
        .as_array()
        .unwrap()
        .iter()
        .map(|row| row.as_object().unwrap().clone())
        .collect()
}

pub(crate) fn row(value: serde_json::Value) -> Row {
    value.as_object().unwrap().clone()
}

pub(crate) fn products_table() -> TableMetadata {
    TableMetadata::new("products")
        .with_column("id", ColumnMetadata::new("id", "int4"))
        .with_column("name", ColumnMetadata::new("name", "text"))
        .with_column("code", ColumnMetadata::new("code", "text"))
        .with_column("price", ColumnMetadata::untyped("price"))
}

/// Returns canned rows and records every statement
pub(crate) struct CannedExecutor {
    rows: Vec<Row>,
    pub(crate) statements: Mutex<Vec<Statement>>,
}

#[async_trait]
impl DatabaseExecutor for CannedExecutor {
    async fn query(&self, statement: &Statement) -> Result<Vec<Row>, DatabaseError> {
        self.statements.lock().unwrap().push(statement.clone());
        Ok(self.rows.clone())
    }
}

/// A factory over `products` whose default fetch path answers with `rows`.
pub(crate) fn products_factory(
    rows: Vec<Row>,
    config: LoaderConfig,
) -> (LoaderFactory, Arc<CannedExecutor>) {
    let executor = Arc::new(CannedExecutor {
        rows,
        statements: Mutex::new(vec![]),
    });
    let query = TableQuery::new(
        QueryBuilder::new(Arc::new(products_table())),
        executor.clone(),
    );

    (LoaderFactory::new(query, config), executor)
}

/// A fetch that answers every batch with the same rows (or an error) and records the keys of each
/// call.
#[derive(Clone)]
pub(crate) struct RecordingFetch {
    rows: Vec<Row>,
    fail: bool,
    delay: Option<Duration>,
    calls: Arc<Mutex<Vec<Vec<LoadKey>>>>,
}

impl RecordingFetch {
    pub(crate) fn new(rows: Vec<Row>) -> Self {
        Self {
            rows,
            fail: false,
            delay: None,
            calls: Arc::new(Mutex::new(vec![])),
        }
    }

    pub(crate) fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(vec![])
        }
    }

    /// Answer each batch only after `delay`
    pub(crate) fn with_delay(self, delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..self
        }
    }

    pub(crate) fn calls(&self) -> Vec<Vec<LoadKey>> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl BatchFetch for RecordingFetch {
    async fn fetch(
        &self,
        _shape: &LoaderShape,
        keys: &[LoadKey],
    ) -> Result<Vec<Row>, DatabaseError> {
        self.calls.lock().unwrap().push(keys.to_vec());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if self.fail {
            Err(DatabaseError::Validation("connection reset".into()))
        } else {
            Ok(self.rows.clone())
        }
    }
}
