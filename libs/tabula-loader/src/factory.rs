// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::{sync::Arc, time::Duration};

use tabula_env::{Environment, TABULA_LOADER_BATCH_DELAY_MS, TABULA_LOADER_CACHE};
use tabula_sql::{Row, TableQuery};
use tracing::debug;

use crate::{
    BatchFetch, CollectionWindow, Loader, LoaderError, LoaderShape, RowCallback, TableFetch,
    loader::{LoaderInner, LoaderRegistry, PrimeTargets},
};

/// Defaults for every loader of a factory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoaderConfig {
    pub window: CollectionWindow,
    pub cache: bool,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            window: CollectionWindow::Yield,
            cache: true,
        }
    }
}

impl LoaderConfig {
    /// Read `TABULA_LOADER_BATCH_DELAY_MS` and `TABULA_LOADER_CACHE`.
    pub fn from_env(env: &dyn Environment) -> Result<Self, LoaderError> {
        let window = match env.get_number(TABULA_LOADER_BATCH_DELAY_MS)? {
            Some(delay) => CollectionWindow::Delay(Duration::from_millis(delay)),
            None => CollectionWindow::Yield,
        };

        Ok(Self {
            window,
            cache: env.enabled(TABULA_LOADER_CACHE, true)?,
        })
    }
}

/// Which loaders to seed with the rows a loader fetches.
#[derive(Clone, Default)]
pub enum AutoPrime {
    #[default]
    Off,
    /// Every other loader created by the same factory
    Siblings,
    Loaders(Vec<Loader>),
}

#[derive(Clone, Default)]
pub struct LoaderOptions {
    /// Resolve every matching row (`Loaded::Many`) instead of the first one
    pub multi: bool,
    pub ignore_case: bool,
    /// Replaces the table lookup
    pub get_data: Option<Arc<dyn BatchFetch>>,
    pub auto_prime: AutoPrime,
    pub callback: Option<RowCallback>,
    /// Overrides the factory's cache setting
    pub cache: Option<bool>,
}

impl LoaderOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn multi(mut self) -> Self {
        self.multi = true;
        self
    }

    pub fn ignore_case(mut self) -> Self {
        self.ignore_case = true;
        self
    }

    pub fn with_get_data(mut self, get_data: impl BatchFetch + 'static) -> Self {
        self.get_data = Some(Arc::new(get_data));
        self
    }

    pub fn with_auto_prime(mut self, auto_prime: AutoPrime) -> Self {
        self.auto_prime = auto_prime;
        self
    }

    pub fn with_callback(mut self, callback: impl Fn(&Row) + Send + Sync + 'static) -> Self {
        self.callback = Some(Arc::new(callback));
        self
    }

    pub fn with_cache(mut self, cache: bool) -> Self {
        self.cache = Some(cache);
        self
    }
}

#[derive(Clone)]
pub struct SingleColumnRequest {
    pub column: String,
    /// Defaults to the column's type in the table metadata
    pub native_type: Option<String>,
    pub options: LoaderOptions,
}

#[derive(Clone)]
pub struct MultiColumnRequest {
    pub columns: Vec<String>,
    /// One per column. Defaults to the columns' types in the table metadata.
    pub types: Option<Vec<String>>,
    pub options: LoaderOptions,
}

#[derive(Clone)]
pub enum LoaderRequest {
    Single(SingleColumnRequest),
    Multi(MultiColumnRequest),
}

/// Creates loaders over one table and tracks them for auto-priming.
pub struct LoaderFactory {
    query: TableQuery,
    config: LoaderConfig,
    registry: Arc<LoaderRegistry>,
}

impl LoaderFactory {
    pub fn new(query: TableQuery, config: LoaderConfig) -> Self {
        Self {
            query,
            config,
            registry: Arc::new(LoaderRegistry::default()),
        }
    }

    pub fn from_env(query: TableQuery, env: &dyn Environment) -> Result<Self, LoaderError> {
        Ok(Self::new(query, LoaderConfig::from_env(env)?))
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Every live loader created by this factory.
    pub fn loaders(&self) -> Vec<Loader> {
        self.registry
            .live()
            .into_iter()
            .map(|inner| Loader { inner })
            .collect()
    }

    pub fn create_single(
        &self,
        column: impl Into<String>,
        native_type: Option<&str>,
        options: LoaderOptions,
    ) -> Result<Loader, LoaderError> {
        self.create(LoaderRequest::Single(SingleColumnRequest {
            column: column.into(),
            native_type: native_type.map(str::to_string),
            options,
        }))
    }

    pub fn create_multi<C: Into<String>>(
        &self,
        columns: impl IntoIterator<Item = C>,
        types: Option<&[&str]>,
        options: LoaderOptions,
    ) -> Result<Loader, LoaderError> {
        self.create(LoaderRequest::Multi(MultiColumnRequest {
            columns: columns.into_iter().map(Into::into).collect(),
            types: types.map(|types| types.iter().map(|t| t.to_string()).collect()),
            options,
        }))
    }

    pub fn create(&self, request: LoaderRequest) -> Result<Loader, LoaderError> {
        let (columns, types, composite, options) = match request {
            LoaderRequest::Single(request) => (
                vec![request.column],
                Some(vec![request.native_type]),
                false,
                request.options,
            ),
            LoaderRequest::Multi(request) => {
                if let Some(types) = &request.types {
                    if types.len() != request.columns.len() {
                        return Err(LoaderError::Config(
                            "Same number of types and keys must be provided".into(),
                        ));
                    }
                }
                (
                    request.columns,
                    request.types.map(|types| types.into_iter().map(Some).collect()),
                    true,
                    request.options,
                )
            }
        };

        if columns.is_empty() {
            return Err(LoaderError::Config(
                "a loader needs at least one column".into(),
            ));
        }

        let table = self.query.table();
        let types: Vec<Option<String>> = match types {
            Some(types) => columns
                .iter()
                .zip(types)
                .map(|(column, typ)| {
                    typ.or_else(|| table.native_type(column).map(str::to_string))
                })
                .collect(),
            None => columns
                .iter()
                .map(|column| table.native_type(column).map(str::to_string))
                .collect(),
        };

        let fetch: Arc<dyn BatchFetch> = match options.get_data {
            Some(get_data) => get_data,
            None => {
                if let Some((column, _)) = columns.iter().zip(&types).find(|(_, t)| t.is_none()) {
                    return Err(LoaderError::Config(format!(
                        "column type not provided for `{column}` in `{}`",
                        table.name
                    )));
                }
                Arc::new(TableFetch::new(self.query.clone()))
            }
        };

        let prime_targets = match options.auto_prime {
            AutoPrime::Off => PrimeTargets::Off,
            AutoPrime::Siblings => PrimeTargets::Siblings,
            AutoPrime::Loaders(loaders) => PrimeTargets::Loaders(
                loaders
                    .iter()
                    .map(|loader| Arc::downgrade(&loader.inner))
                    .collect(),
            ),
        };

        let shape = LoaderShape {
            columns,
            types,
            composite,
            multi: options.multi,
            ignore_case: options.ignore_case,
        };
        debug!(table = %table.name, ?shape, "Creating loader");

        let loader = Loader::new(LoaderInner::new(
            shape,
            fetch,
            self.config.window,
            options.cache.unwrap_or(self.config.cache),
            options.callback,
            prime_targets,
            self.registry.clone(),
        ));
        self.registry.add(&loader);

        Ok(loader)
    }
}
