// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Table metadata from catalog snapshots.
//!
//! A [`CatalogProvider`] supplies a [`CatalogSnapshot`]; the [`SchemaRegistry`] turns each table
//! into a [`tabula_sql::TableMetadata`] whose column keys follow a [`CaseConverter`] policy.

mod case;
mod catalog;
mod error;
mod native_type;
mod registry;

pub use case::{CaseConverter, CaseStyle};
pub use catalog::{CatalogColumn, CatalogEnum, CatalogProvider, CatalogSnapshot, CatalogTable, StaticCatalog};
pub use error::SchemaError;
pub use native_type::normalize_native_type;
pub use registry::SchemaRegistry;
