// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! The catalog snapshot consumed by the registry. Producing it (the introspection queries) happens
//! elsewhere; this is a read-only, pull-based view.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::SchemaError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogColumn {
    pub name: String,
    /// Type tag as reported by the catalog (`int4`, `_text`, `character varying(255)`, ...)
    pub native_type: String,
    #[serde(default)]
    pub nullable: bool,
    #[serde(default)]
    pub has_default: bool,
    #[serde(default)]
    pub is_array: bool,
    #[serde(default)]
    pub ordinal: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogTable {
    #[serde(default)]
    pub schema: Option<String>,
    pub name: String,
    pub columns: Vec<CatalogColumn>,
}

impl CatalogTable {
    /// `name` for tables in the default schema, `schema.name` otherwise.
    pub fn qualified_name(&self) -> String {
        qualified_name(self.schema.as_deref(), &self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEnum {
    #[serde(default)]
    pub schema: Option<String>,
    pub name: String,
    pub labels: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    #[serde(default)]
    pub tables: Vec<CatalogTable>,
    #[serde(default)]
    pub enums: Vec<CatalogEnum>,
}

impl CatalogSnapshot {
    pub fn from_json(json: &str) -> Result<Self, SchemaError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn enum_named(&self, name: &str) -> Option<&CatalogEnum> {
        self.enums.iter().find(|e| e.name == name)
    }
}

pub(crate) fn qualified_name(schema: Option<&str>, name: &str) -> String {
    match schema {
        Some(schema) if schema != "public" => format!("{schema}.{name}"),
        _ => name.to_string(),
    }
}

/// A source of catalog snapshots.
#[async_trait]
pub trait CatalogProvider: Send + Sync {
    async fn snapshot(&self) -> Result<CatalogSnapshot, SchemaError>;
}

/// A provider serving a snapshot held in memory.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    snapshot: CatalogSnapshot,
}

impl StaticCatalog {
    pub fn new(snapshot: CatalogSnapshot) -> Self {
        Self { snapshot }
    }

    pub fn from_json(json: &str) -> Result<Self, SchemaError> {
        Ok(Self::new(CatalogSnapshot::from_json(json)?))
    }
}

#[async_trait]
impl CatalogProvider for StaticCatalog {
    async fn snapshot(&self) -> Result<CatalogSnapshot, SchemaError> {
        Ok(self.snapshot.clone())
    }
}
