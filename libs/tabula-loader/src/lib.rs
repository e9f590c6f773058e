// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Batching, caching row loaders over a table, and finders that normalize their results.

mod error;
mod factory;
mod fetch;
mod finder;
mod key;
mod loader;
mod matcher;

#[cfg(test)]
mod test_util;

pub use error::LoaderError;
pub use factory::{
    AutoPrime, LoaderConfig, LoaderFactory, LoaderOptions, LoaderRequest, MultiColumnRequest,
    SingleColumnRequest,
};
pub use fetch::{BatchFetch, FnFetch, TableFetch};
pub use finder::{Finder, FinderOptions, FinderSource, Finding, FnSource, Found};
pub use key::LoadKey;
pub use loader::{CollectionWindow, Loaded, Loader, LoaderShape, RowCallback};
pub use matcher::matches;
