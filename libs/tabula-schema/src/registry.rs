// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::{collections::HashMap, sync::Arc};

use tabula_env::Environment;
use tabula_sql::{ColumnMetadata, QueryBuilder, TableMetadata};
use tracing::{debug, warn};

use crate::{
    CaseConverter, CaseStyle, CatalogProvider, CatalogSnapshot, CatalogTable, SchemaError,
    catalog::qualified_name, native_type::normalize_native_type,
};

/// Table metadata for every known table, keyed by qualified native name (`people`,
/// `crm.contacts`). Column keys are produced by the registry's [`CaseConverter`].
pub struct SchemaRegistry {
    converter: Box<dyn CaseConverter>,
    tables: HashMap<String, Arc<TableMetadata>>,
    enums: HashMap<String, Vec<String>>,
}

impl SchemaRegistry {
    pub fn new(converter: impl CaseConverter + 'static) -> Self {
        Self {
            converter: Box::new(converter),
            tables: HashMap::new(),
            enums: HashMap::new(),
        }
    }

    /// A registry using the case style named by `TABULA_CASE_STYLE`.
    pub fn from_env(env: &dyn Environment) -> Result<Self, SchemaError> {
        Ok(Self::new(CaseStyle::from_env(env)?))
    }

    /// Register a table, returning the metadata it replaced.
    pub fn register(&mut self, table: TableMetadata) -> Option<Arc<TableMetadata>> {
        let name = qualified_name(table.schema.as_deref(), &table.name);
        let previous = self.tables.insert(name.clone(), Arc::new(table));

        if previous.is_some() {
            warn!(table = %name, "Table re-registered, replacing its previous metadata");
        }
        previous
    }

    /// Register every table and enum of a snapshot.
    pub fn load(&mut self, snapshot: &CatalogSnapshot) {
        for catalog_enum in &snapshot.enums {
            let name = qualified_name(catalog_enum.schema.as_deref(), &catalog_enum.name);
            if self
                .enums
                .insert(name.clone(), catalog_enum.labels.clone())
                .is_some()
            {
                warn!(name = %name, "Enum re-registered, replacing its previous labels");
            }
        }

        for table in &snapshot.tables {
            let metadata = self.table_metadata(table, snapshot);
            self.register(metadata);
        }

        debug!(
            tables = snapshot.tables.len(),
            enums = snapshot.enums.len(),
            "Loaded catalog snapshot"
        );
    }

    pub async fn load_from(&mut self, provider: &dyn CatalogProvider) -> Result<(), SchemaError> {
        let snapshot = provider.snapshot().await?;
        self.load(&snapshot);
        Ok(())
    }

    pub fn table(&self, name: &str) -> Result<Arc<TableMetadata>, SchemaError> {
        self.tables
            .get(name)
            .cloned()
            .ok_or_else(|| SchemaError::UnknownTable(name.to_string()))
    }

    pub fn query_builder(&self, name: &str) -> Result<QueryBuilder, SchemaError> {
        Ok(QueryBuilder::new(self.table(name)?))
    }

    pub fn enum_labels(&self, name: &str) -> Option<&[String]> {
        self.enums.get(name).map(Vec::as_slice)
    }

    /// The logical key for a native name under this registry's case policy.
    pub fn key_for(&self, native_name: &str) -> String {
        self.converter.convert(native_name)
    }

    fn table_metadata(&self, table: &CatalogTable, snapshot: &CatalogSnapshot) -> TableMetadata {
        let mut metadata = TableMetadata::new(&table.name);
        if let Some(schema) = &table.schema {
            metadata = metadata.with_schema(schema);
        }

        let mut columns: Vec<_> = table.columns.iter().collect();
        columns.sort_by_key(|column| column.ordinal);

        for column in columns {
            let native_type = normalize_native_type(&column.native_type, column.is_array);
            let native_type = match snapshot.enum_named(type_base(&native_type)) {
                Some(_) => quote_type(&native_type),
                None => native_type,
            };

            let key = self.key_for(&column.name);
            let previous = metadata.add_column(
                key.clone(),
                ColumnMetadata::new(&column.name, native_type)
                    .with_nullable(column.nullable)
                    .with_default(column.has_default),
            );

            if let Some(previous) = previous {
                warn!(
                    table = %table.qualified_name(),
                    key = %key,
                    previous = %previous.native_name,
                    column = %column.name,
                    "Two columns map to the same key, keeping the later one"
                );
            }
        }

        metadata
    }
}

fn type_base(native_type: &str) -> &str {
    native_type.trim_end_matches("[]")
}

/// Quote a user-defined type name so that its case survives in a cast: `Mood[]` -> `"Mood"[]`.
fn quote_type(native_type: &str) -> String {
    let base = type_base(native_type);
    let dims = &native_type[base.len()..];

    if base.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_') {
        native_type.to_string()
    } else {
        format!("\"{}\"{dims}", base.replace('"', "\"\""))
    }
}
