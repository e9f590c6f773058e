// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::{future::Future, sync::Arc};

use async_trait::async_trait;
use tabula_sql::Row;

use crate::{LoadKey, Loaded, Loader, LoaderError};

/// A raw lookup result, before a [`Finder`] normalizes it.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Found {
    #[default]
    None,
    One(Row),
    Many(Vec<Row>),
}

impl From<Loaded> for Found {
    fn from(loaded: Loaded) -> Self {
        match loaded {
            Loaded::One(Some(row)) => Found::One(row),
            Loaded::One(None) => Found::None,
            Loaded::Many(rows) => Found::Many(rows),
        }
    }
}

impl From<Option<Row>> for Found {
    fn from(row: Option<Row>) -> Self {
        row.map(Found::One).unwrap_or_default()
    }
}

impl From<Vec<Row>> for Found {
    fn from(rows: Vec<Row>) -> Self {
        Found::Many(rows)
    }
}

#[async_trait]
pub trait FinderSource: Send + Sync {
    async fn load(&self, key: LoadKey) -> Result<Found, LoaderError>;

    /// Whether the source resolves keys to lists, if it knows.
    fn multiplicity(&self) -> Option<bool> {
        None
    }
}

#[async_trait]
impl FinderSource for Loader {
    async fn load(&self, key: LoadKey) -> Result<Found, LoaderError> {
        Ok(Loader::load(self, key).await?.into())
    }

    fn multiplicity(&self) -> Option<bool> {
        Some(self.is_multi_loader())
    }
}

/// A finder source backed by an async function.
pub struct FnSource<F> {
    func: F,
}

impl<F> FnSource<F> {
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

#[async_trait]
impl<F, Fut> FinderSource for FnSource<F>
where
    F: Fn(LoadKey) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Found, LoaderError>> + Send,
{
    async fn load(&self, key: LoadKey) -> Result<Found, LoaderError> {
        (self.func)(key).await
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FinderOptions {
    /// Overrides the multiplicity the source reports
    pub multi: Option<bool>,
}

/// What a finder returns: a list for multi finders, one-or-none otherwise.
#[derive(Debug, Clone, PartialEq)]
pub enum Finding {
    One(Option<Row>),
    Many(Vec<Row>),
}

impl Finding {
    pub fn into_one(self) -> Option<Row> {
        match self {
            Finding::One(row) => row,
            Finding::Many(rows) => rows.into_iter().next(),
        }
    }

    pub fn into_many(self) -> Vec<Row> {
        match self {
            Finding::One(row) => row.into_iter().collect(),
            Finding::Many(rows) => rows,
        }
    }
}

/// Normalizes the result shape of a loader (or any [`FinderSource`]).
#[derive(Clone)]
pub struct Finder {
    source: Arc<dyn FinderSource>,
    multi: bool,
}

impl Finder {
    /// Sources that don't report their multiplicity default to single results.
    pub fn create(source: impl FinderSource + 'static, options: FinderOptions) -> Self {
        let multi = options
            .multi
            .or_else(|| source.multiplicity())
            .unwrap_or(false);

        Self {
            source: Arc::new(source),
            multi,
        }
    }

    pub fn is_multi(&self) -> bool {
        self.multi
    }

    pub async fn find(&self, key: impl Into<LoadKey>) -> Result<Finding, LoaderError> {
        let found = self.source.load(key.into()).await?;

        Ok(if self.multi {
            Finding::Many(match found {
                Found::None => vec![],
                Found::One(row) => vec![row],
                Found::Many(rows) => rows,
            })
        } else {
            Finding::One(match found {
                Found::None => None,
                Found::One(row) => Some(row),
                Found::Many(rows) => rows.into_iter().next(),
            })
        })
    }

    /// The first match, whatever the finder's multiplicity.
    pub async fn find_one(&self, key: impl Into<LoadKey>) -> Result<Option<Row>, LoaderError> {
        Ok(self.find(key).await?.into_one())
    }

    /// Every match, whatever the finder's multiplicity.
    pub async fn find_many(&self, key: impl Into<LoadKey>) -> Result<Vec<Row>, LoaderError> {
        Ok(self.find(key).await?.into_many())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use test_log::test;

    use super::*;
    use crate::{
        LoaderConfig, LoaderOptions,
        test_util::{RecordingFetch, products_factory, rows},
    };

    fn row(value: serde_json::Value) -> Row {
        value.as_object().unwrap().clone()
    }

    fn returning(
        found: Found,
    ) -> FnSource<impl Fn(LoadKey) -> futures::future::Ready<Result<Found, LoaderError>>> {
        FnSource::new(move |_: LoadKey| futures::future::ready(Ok(found.clone())))
    }

    #[test(tokio::test)]
    async fn multi_finder_always_returns_a_list() {
        let finder = Finder::create(returning(Found::None), FinderOptions { multi: Some(true) });
        assert_eq!(finder.find("x").await.unwrap(), Finding::Many(vec![]));

        let finder = Finder::create(
            returning(Found::One(row(json!({"id": 1})))),
            FinderOptions { multi: Some(true) },
        );
        assert_eq!(finder.find_many("x").await.unwrap(), vec![row(json!({"id": 1}))]);
    }

    #[test(tokio::test)]
    async fn single_finder_unwraps() {
        let finder = Finder::create(returning(Found::None), FinderOptions::default());
        assert!(!finder.is_multi());
        assert_eq!(finder.find("x").await.unwrap(), Finding::One(None));

        let finder = Finder::create(
            returning(Found::Many(vec![row(json!({"id": 1}))])),
            FinderOptions::default(),
        );
        assert_eq!(
            finder.find("x").await.unwrap(),
            Finding::One(Some(row(json!({"id": 1}))))
        );

        let finder = Finder::create(
            returning(Found::Many(vec![row(json!({"id": 1})), row(json!({"id": 2}))])),
            FinderOptions::default(),
        );
        assert_eq!(finder.find_one("x").await.unwrap(), Some(row(json!({"id": 1}))));
    }

    fn code_loader(options: LoaderOptions) -> Loader {
        let fetch = RecordingFetch::new(rows(json!([
            {"id": 1, "code": "abc"},
            {"id": 2, "code": "def"}
        ])));
        let (factory, _) = products_factory(vec![], LoaderConfig::default());
        factory
            .create_single("code", None, options.with_get_data(fetch))
            .unwrap()
    }

    #[test(tokio::test)]
    async fn finder_over_a_multi_loader_returns_lists() {
        let finder = Finder::create(
            code_loader(LoaderOptions::new().multi()),
            FinderOptions::default(),
        );

        assert!(finder.is_multi());
        assert_eq!(finder.find("nope").await.unwrap(), Finding::Many(vec![]));
        assert_eq!(
            finder.find("abc").await.unwrap(),
            Finding::Many(vec![row(json!({"id": 1, "code": "abc"}))])
        );
    }

    #[test(tokio::test)]
    async fn finder_over_a_single_loader_returns_one_or_none() {
        let finder = Finder::create(code_loader(LoaderOptions::new()), FinderOptions::default());

        assert!(!finder.is_multi());
        assert_eq!(finder.find("nope").await.unwrap(), Finding::One(None));
        assert_eq!(
            finder.find("abc").await.unwrap(),
            Finding::One(Some(row(json!({"id": 1, "code": "abc"}))))
        );
    }

    #[test(tokio::test)]
    async fn explicit_multiplicity_overrides_the_loader() {
        let finder = Finder::create(
            code_loader(LoaderOptions::new()),
            FinderOptions { multi: Some(true) },
        );

        assert!(finder.is_multi());
        assert_eq!(
            finder.find("def").await.unwrap(),
            Finding::Many(vec![row(json!({"id": 2, "code": "def"}))])
        );
        assert_eq!(finder.find("nope").await.unwrap(), Finding::Many(vec![]));
    }

    #[test(tokio::test)]
    async fn errors_pass_through() {
        let finder = Finder::create(
            FnSource::new(|_: LoadKey| async { Err::<Found, _>(LoaderError::Config("nope".into())) }),
            FinderOptions::default(),
        );

        assert!(finder.find("x").await.unwrap_err().is_config());
    }
}
