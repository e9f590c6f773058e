// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::future::Future;

use async_trait::async_trait;
use tabula_sql::{CaseSensitivity, DatabaseError, Row, SQLValue, TableQuery};

use crate::{LoadKey, LoaderShape};

/// Fetches the rows for a batch of distinct keys in one call. The rows may come in any order and
/// may include rows matching no key; the loader assigns them to keys.
#[async_trait]
pub trait BatchFetch: Send + Sync {
    async fn fetch(&self, shape: &LoaderShape, keys: &[LoadKey]) -> Result<Vec<Row>, DatabaseError>;
}

/// The default fetch path: a batch lookup against the loader's table.
pub struct TableFetch {
    query: TableQuery,
}

impl TableFetch {
    pub fn new(query: TableQuery) -> Self {
        Self { query }
    }
}

#[async_trait]
impl BatchFetch for TableFetch {
    async fn fetch(&self, shape: &LoaderShape, keys: &[LoadKey]) -> Result<Vec<Row>, DatabaseError> {
        let types = shape
            .columns()
            .iter()
            .zip(shape.types())
            .map(|(column, typ)| {
                typ.as_deref().ok_or_else(|| {
                    DatabaseError::Config(format!("column type not provided for `{column}`"))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let case = CaseSensitivity::from(shape.ignore_case());

        if shape.is_composite() {
            let keys: Vec<Vec<SQLValue>> = keys.iter().map(|key| key.values().to_vec()).collect();

            self.query
                .multi_column_batch_get(&keys, shape.columns(), &types, case)
                .await
        } else {
            let values = keys
                .iter()
                .flat_map(|key| key.values().iter().cloned())
                .collect();

            self.query
                .batch_get(&shape.columns()[0], Some(types[0]), values, case)
                .await
        }
    }
}

/// Adapts an async function of the batch keys, for custom joins and tests.
pub struct FnFetch<F> {
    func: F,
}

impl<F> FnFetch<F> {
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

#[async_trait]
impl<F, Fut> BatchFetch for FnFetch<F>
where
    F: Fn(Vec<LoadKey>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Vec<Row>, DatabaseError>> + Send,
{
    async fn fetch(&self, _shape: &LoaderShape, keys: &[LoadKey]) -> Result<Vec<Row>, DatabaseError> {
        (self.func)(keys.to_vec()).await
    }
}
