// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! The batching, caching loader.
//!
//! A loader goes through `Idle -> Batching -> Fetching -> Resolving -> Idle`. The first request of
//! a batch spawns a dispatch task that waits for the [`CollectionWindow`], takes every request
//! registered so far and fetches the distinct keys with a single [`BatchFetch`] call. Identical
//! keys share one cache entry, so they are fetched once and resolve to the same result.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError, Weak},
    time::Duration,
};

use futures::{
    FutureExt,
    future::{BoxFuture, Shared, join_all},
};
use tabula_sql::{DatabaseError, Row};
use tokio::sync::oneshot;
use tracing::{debug, instrument, warn};

use crate::{BatchFetch, LoadKey, LoaderError, matcher::matches_key};

/// What a loader resolves a key to.
#[derive(Debug, Clone, PartialEq)]
pub enum Loaded {
    /// From a single-result loader: the first matching row, if any
    One(Option<Row>),
    /// From a multi-result loader: every matching row
    Many(Vec<Row>),
}

impl Loaded {
    pub fn into_one(self) -> Option<Row> {
        match self {
            Loaded::One(row) => row,
            Loaded::Many(rows) => rows.into_iter().next(),
        }
    }

    pub fn into_many(self) -> Vec<Row> {
        match self {
            Loaded::One(row) => row.into_iter().collect(),
            Loaded::Many(rows) => rows,
        }
    }
}

/// How long a loader collects requests before dispatching a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CollectionWindow {
    /// Until the dispatch task has yielded once to the scheduler. Requests issued together by one
    /// task (`join!`, `join_all`) land in the same batch on a current-thread runtime.
    #[default]
    Yield,
    /// A fixed delay after the first request of the batch
    Delay(Duration),
}

impl CollectionWindow {
    async fn wait(self) {
        match self {
            CollectionWindow::Yield => tokio::task::yield_now().await,
            CollectionWindow::Delay(delay) => tokio::time::sleep(delay).await,
        }
    }
}

/// Static description of a loader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderShape {
    pub(crate) columns: Vec<String>,
    /// Cast type per column, if known
    pub(crate) types: Vec<Option<String>>,
    pub(crate) composite: bool,
    pub(crate) multi: bool,
    pub(crate) ignore_case: bool,
}

impl LoaderShape {
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn types(&self) -> &[Option<String>] {
        &self.types
    }

    /// Keyed by several columns (see [`LoadKey::Composite`])
    pub fn is_composite(&self) -> bool {
        self.composite
    }

    pub fn is_multi(&self) -> bool {
        self.multi
    }

    pub fn ignore_case(&self) -> bool {
        self.ignore_case
    }
}

/// Called once per fetched row.
pub type RowCallback = Arc<dyn Fn(&Row) + Send + Sync>;

type SharedLoad = Shared<BoxFuture<'static, Result<Loaded, LoaderError>>>;

struct PendingLoad {
    cache_key: String,
    key: LoadKey,
    /// The handle callers await; identifies this request's cache entry
    load: SharedLoad,
    sender: oneshot::Sender<Result<Loaded, LoaderError>>,
}

#[derive(Default)]
struct LoaderState {
    cache: HashMap<String, SharedLoad>,
    batch: Vec<PendingLoad>,
}

pub(crate) enum PrimeTargets {
    Off,
    Siblings,
    Loaders(Vec<Weak<LoaderInner>>),
}

/// The loaders created by one factory. Holds weak handles, so dropping a loader unregisters it.
#[derive(Default)]
pub(crate) struct LoaderRegistry {
    loaders: Mutex<Vec<Weak<LoaderInner>>>,
}

impl LoaderRegistry {
    pub(crate) fn add(&self, loader: &Loader) {
        let mut loaders = self.loaders.lock().unwrap_or_else(PoisonError::into_inner);
        loaders.retain(|loader| loader.strong_count() > 0);
        loaders.push(Arc::downgrade(&loader.inner));
    }

    pub(crate) fn live(&self) -> Vec<Arc<LoaderInner>> {
        self.loaders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter_map(Weak::upgrade)
            .collect()
    }
}

pub(crate) struct LoaderInner {
    pub(crate) shape: LoaderShape,
    pub(crate) fetch: Arc<dyn BatchFetch>,
    pub(crate) window: CollectionWindow,
    pub(crate) cache_enabled: bool,
    pub(crate) callback: Option<RowCallback>,
    pub(crate) prime_targets: PrimeTargets,
    pub(crate) registry: Arc<LoaderRegistry>,
    /// Held while fetching: a loader never has two fetches in flight
    fetch_gate: tokio::sync::Mutex<()>,
    state: Mutex<LoaderState>,
}

impl LoaderInner {
    pub(crate) fn new(
        shape: LoaderShape,
        fetch: Arc<dyn BatchFetch>,
        window: CollectionWindow,
        cache_enabled: bool,
        callback: Option<RowCallback>,
        prime_targets: PrimeTargets,
        registry: Arc<LoaderRegistry>,
    ) -> Self {
        Self {
            shape,
            fetch,
            window,
            cache_enabled,
            callback,
            prime_targets,
            registry,
            fetch_gate: tokio::sync::Mutex::new(()),
            state: Mutex::new(LoaderState::default()),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, LoaderState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn validate(&self, key: &LoadKey) -> Result<(), LoaderError> {
        match (key, self.shape.composite) {
            (LoadKey::Single(_), false) => Ok(()),
            (LoadKey::Composite(values), true) if values.len() == self.shape.columns.len() => {
                Ok(())
            }
            (LoadKey::Composite(values), true) => Err(LoaderError::Config(format!(
                "expected {} key values for columns {:?}, got {}",
                self.shape.columns.len(),
                self.shape.columns,
                values.len()
            ))),
            (LoadKey::Composite(_), false) => Err(LoaderError::Config(format!(
                "loader on `{}` expects a single key value",
                self.shape.columns.join(", ")
            ))),
            (LoadKey::Single(_), true) => Err(LoaderError::Config(format!(
                "loader on {:?} expects a composite key",
                self.shape.columns
            ))),
        }
    }

    fn cache_key(&self, key: &LoadKey) -> String {
        key.cache_key(self.shape.ignore_case)
    }

    /// The cached (or pending) result for `key` if any, otherwise register it with the current
    /// batch. Returns whether the batch needs a dispatch task.
    fn enqueue(&self, state: &mut LoaderState, key: LoadKey) -> (SharedLoad, bool) {
        let cache_key = self.cache_key(&key);

        if let Some(existing) = state.cache.get(&cache_key) {
            return (existing.clone(), false);
        }

        // Cleared while still waiting for dispatch: rejoin the pending request
        if let Some(pending) = state.batch.iter().find(|p| p.cache_key == cache_key) {
            let load = pending.load.clone();
            state.cache.insert(cache_key, load.clone());
            return (load, false);
        }

        let (sender, receiver) = oneshot::channel();
        let load = async move { receiver.await.unwrap_or(Err(LoaderError::Abandoned)) }
            .boxed()
            .shared();

        state.cache.insert(cache_key.clone(), load.clone());
        state.batch.push(PendingLoad {
            cache_key,
            key,
            load: load.clone(),
            sender,
        });

        (load, state.batch.len() == 1)
    }

    /// Insert a resolved entry unless one exists.
    fn prime(&self, key: &LoadKey, loaded: Loaded) -> bool {
        let cache_key = self.cache_key(key);
        let mut state = self.lock_state();

        if state.cache.contains_key(&cache_key) {
            return false;
        }
        state
            .cache
            .insert(cache_key, futures::future::ready(Ok(loaded)).boxed().shared());
        true
    }

    /// Drop the cache entries of a finished batch. An entry that was cleared and re-requested since
    /// belongs to a newer batch and stays.
    fn evict(&self, batch: &[(String, SharedLoad)]) {
        let mut state = self.lock_state();
        for (cache_key, load) in batch {
            if state
                .cache
                .get(cache_key)
                .is_some_and(|cached| cached.ptr_eq(load))
            {
                state.cache.remove(cache_key);
            }
        }
    }

    /// The result for one requested key out of the fetched rows.
    fn select(&self, key: &LoadKey, rows: &[Row]) -> Loaded {
        let mut matching = rows.iter().filter(|row| {
            self.shape
                .columns
                .iter()
                .zip(key.values())
                .all(|(column, requested)| {
                    row.get(column).is_some_and(|candidate| {
                        matches_key(requested, candidate, self.shape.ignore_case)
                    })
                })
        });

        if self.shape.multi {
            Loaded::Many(matching.cloned().collect())
        } else {
            Loaded::One(matching.next().cloned())
        }
    }

    fn resolve(self: &Arc<Self>, batch: Vec<PendingLoad>, rows: Vec<Row>) {
        if let Some(callback) = &self.callback {
            rows.iter().for_each(|row| callback(row));
        }

        let entries: Vec<_> = batch
            .iter()
            .map(|p| (p.cache_key.clone(), p.load.clone()))
            .collect();

        for pending in batch {
            let loaded = self.select(&pending.key, &rows);
            // The receiver is gone only if every caller awaiting this key was dropped
            let _ = pending.sender.send(Ok(loaded));
        }

        if !self.cache_enabled {
            self.evict(&entries);
        }

        self.auto_prime(&rows);
    }

    fn reject(&self, batch: Vec<PendingLoad>, error: DatabaseError) {
        warn!(
            columns = ?self.shape.columns,
            keys = batch.len(),
            %error,
            "Batch fetch failed"
        );

        let entries: Vec<_> = batch
            .iter()
            .map(|p| (p.cache_key.clone(), p.load.clone()))
            .collect();
        self.evict(&entries);

        let error = LoaderError::Fetch(Arc::new(error));
        for pending in batch {
            let _ = pending.sender.send(Err(error.clone()));
        }
    }

    fn auto_prime(self: &Arc<Self>, rows: &[Row]) {
        let targets = match &self.prime_targets {
            PrimeTargets::Off => return,
            PrimeTargets::Siblings => self.registry.live(),
            PrimeTargets::Loaders(loaders) => loaders.iter().filter_map(Weak::upgrade).collect(),
        };

        // A single row says nothing about every row matching a key of a multi-result loader
        let targets: Vec<_> = targets
            .into_iter()
            .filter(|target| {
                !Arc::ptr_eq(target, self) && !target.shape.multi && target.cache_enabled
            })
            .collect();

        let mut primed = 0;
        for row in rows {
            for target in &targets {
                if let Some(key) =
                    LoadKey::from_row(row, &target.shape.columns, target.shape.composite)
                {
                    if target.prime(&key, Loaded::One(Some(row.clone()))) {
                        primed += 1;
                    }
                }
            }
        }

        if primed > 0 {
            debug!(primed, "Primed loader caches");
        }
    }
}

#[instrument(name = "Loader::dispatch", skip_all, fields(columns = ?inner.shape.columns))]
async fn dispatch(inner: Arc<LoaderInner>) {
    inner.window.wait().await;
    let _gate = inner.fetch_gate.lock().await;

    let batch = std::mem::take(&mut inner.lock_state().batch);
    if batch.is_empty() {
        return;
    }

    let keys: Vec<LoadKey> = batch.iter().map(|pending| pending.key.clone()).collect();
    debug!(keys = keys.len(), "Fetching batch");

    match inner.fetch.fetch(&inner.shape, &keys).await {
        Ok(rows) => {
            debug!(rows = rows.len(), "Resolving batch");
            inner.resolve(batch, rows)
        }
        Err(error) => inner.reject(batch, error),
    }
}

/// A caching, batching lookup of rows by key. Cloning yields another handle to the same loader
/// (and cache).
#[derive(Clone)]
pub struct Loader {
    pub(crate) inner: Arc<LoaderInner>,
}

impl Loader {
    pub(crate) fn new(inner: LoaderInner) -> Self {
        Self {
            inner: Arc::new(inner),
        }
    }

    pub fn shape(&self) -> &LoaderShape {
        &self.inner.shape
    }

    pub fn is_multi_loader(&self) -> bool {
        self.inner.shape.multi
    }

    pub fn columns(&self) -> &[String] {
        &self.inner.shape.columns
    }

    /// Load the rows for one key. Requests issued within the same collection window are fetched
    /// together.
    pub async fn load(&self, key: impl Into<LoadKey>) -> Result<Loaded, LoaderError> {
        let mut loads = self.register(vec![key.into()])?;
        match loads.pop() {
            Some(load) => load?.await,
            None => Err(LoaderError::Abandoned),
        }
    }

    /// Load several keys as part of one batch. Results are in the order of `keys`; an invalid key
    /// fails only its own entry.
    pub async fn load_many<K: Into<LoadKey>>(
        &self,
        keys: impl IntoIterator<Item = K>,
    ) -> Result<Vec<Result<Loaded, LoaderError>>, LoaderError> {
        let loads = self.register(keys.into_iter().map(Into::into).collect())?;

        Ok(join_all(loads.into_iter().map(|load| async move {
            match load {
                Ok(load) => load.await,
                Err(e) => Err(e),
            }
        }))
        .await)
    }

    /// Seed the cache with a known result. An existing entry (resolved or pending) wins; returns
    /// whether the value was stored.
    pub fn prime(&self, key: impl Into<LoadKey>, loaded: Loaded) -> Result<bool, LoaderError> {
        let key = key.into();
        self.inner.validate(&key)?;
        Ok(self.inner.prime(&key, loaded))
    }

    /// Forget the cached result for one key. A pending request for it still resolves.
    pub fn clear(&self, key: impl Into<LoadKey>) {
        let cache_key = self.inner.cache_key(&key.into());
        self.inner.lock_state().cache.remove(&cache_key);
    }

    pub fn clear_all(&self) {
        self.inner.lock_state().cache.clear();
    }

    fn register(
        &self,
        keys: Vec<LoadKey>,
    ) -> Result<Vec<Result<SharedLoad, LoaderError>>, LoaderError> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| {
            LoaderError::Config("loaders must be used within a tokio runtime".into())
        })?;

        let mut spawn = false;
        let loads: Vec<Result<SharedLoad, LoaderError>> = {
            let mut state = self.inner.lock_state();
            keys.into_iter()
                .map(|key| {
                    self.inner.validate(&key)?;
                    let (load, new_batch) = self.inner.enqueue(&mut state, key);
                    spawn |= new_batch;
                    Ok(load)
                })
                .collect()
        };

        if spawn {
            runtime.spawn(dispatch(self.inner.clone()));
        }

        Ok(loads)
    }
}

impl std::fmt::Debug for Loader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Loader")
            .field("shape", &self.inner.shape)
            .field("cache_enabled", &self.inner.cache_enabled)
            .finish_non_exhaustive()
    }
}
