// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::collections::HashMap;

use indexmap::IndexMap;
use tracing::warn;

use crate::{Fragment, Row};

/// Storage-level facts about a column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMetadata {
    /// Name of the column in the database
    pub native_name: String,
    /// Type usable in a cast expression (`int4`, `text`, `timestamptz`, ...). Required for array
    /// conditions and batch lookups.
    pub native_type: Option<String>,
    pub nullable: bool,
    pub has_default: bool,
}

impl ColumnMetadata {
    pub fn new(native_name: impl Into<String>, native_type: impl Into<String>) -> Self {
        Self {
            native_name: native_name.into(),
            native_type: Some(native_type.into()),
            nullable: false,
            has_default: false,
        }
    }

    pub fn untyped(native_name: impl Into<String>) -> Self {
        Self {
            native_name: native_name.into(),
            native_type: None,
            nullable: false,
            has_default: false,
        }
    }

    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    pub fn with_default(mut self, has_default: bool) -> Self {
        self.has_default = has_default;
        self
    }
}

/// A table as seen by the builders: its native name plus columns keyed by their logical key (the
/// identifier style callers use, e.g. `createdAt` for the `created_at` column).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableMetadata {
    pub name: String,
    pub schema: Option<String>,
    columns: IndexMap<String, ColumnMetadata>,
    native_to_key: HashMap<String, String>,
}

impl TableMetadata {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schema: None,
            columns: IndexMap::new(),
            native_to_key: HashMap::new(),
        }
    }

    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    pub fn with_column(mut self, key: impl Into<String>, column: ColumnMetadata) -> Self {
        self.add_column(key, column);
        self
    }

    /// Add (or replace) a column, returning the replaced metadata if any.
    pub fn add_column(
        &mut self,
        key: impl Into<String>,
        column: ColumnMetadata,
    ) -> Option<ColumnMetadata> {
        let key = key.into();
        self.native_to_key
            .insert(column.native_name.clone(), key.clone());
        let previous = self.columns.insert(key, column);

        if let Some(previous) = &previous {
            if !self.columns.values().any(|c| c.native_name == previous.native_name) {
                self.native_to_key.remove(&previous.native_name);
            }
        }

        previous
    }

    pub fn column(&self, key: &str) -> Option<&ColumnMetadata> {
        self.columns.get(key)
    }

    pub fn columns(&self) -> impl Iterator<Item = (&str, &ColumnMetadata)> {
        self.columns.iter().map(|(k, c)| (k.as_str(), c))
    }

    /// The native name for a logical key. Unknown keys are used verbatim.
    pub fn native_name<'a>(&'a self, key: &'a str) -> &'a str {
        match self.columns.get(key) {
            Some(column) => &column.native_name,
            None => {
                warn!(
                    table = %self.name,
                    key,
                    "Unknown column key, using it as the column name"
                );
                key
            }
        }
    }

    pub fn native_type(&self, key: &str) -> Option<&str> {
        self.columns
            .get(key)
            .and_then(|column| column.native_type.as_deref())
    }

    /// The logical key for a native column name, if the column is known.
    pub fn logical_key(&self, native_name: &str) -> Option<&str> {
        self.native_to_key.get(native_name).map(String::as_str)
    }

    /// `"schema"."table"` or `"table"`
    pub fn name_fragment(&self) -> Fragment {
        Fragment::identifier(self.schema.iter().chain(std::iter::once(&self.name)))
    }

    /// `"people"."age"` for the key `age`.
    pub fn column_fragment(&self, key: &str) -> Fragment {
        Fragment::column(&self.name, self.native_name(key))
    }

    /// Convert a row keyed by native column names into one keyed by logical keys. Columns unknown
    /// to the metadata (computed expressions, aggregates) keep their name.
    pub fn decode_row(&self, row: Row) -> Row {
        row.into_iter()
            .map(|(name, value)| match self.logical_key(&name) {
                Some(key) => (key.to_string(), value),
                None => (name, value),
            })
            .collect()
    }
}
