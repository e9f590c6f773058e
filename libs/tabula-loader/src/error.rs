// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::sync::Arc;

use tabula_env::EnvError;
use tabula_sql::DatabaseError;
use thiserror::Error;

/// Errors delivered to loader callers. Cloneable, since one batch failure reaches every request
/// coalesced into that batch.
#[derive(Error, Debug, Clone)]
pub enum LoaderError {
    #[error("Loader configuration error: {0}")]
    Config(String),

    #[error("Batch fetch failed: {0}")]
    Fetch(Arc<DatabaseError>),

    #[error("Batch was abandoned before it resolved")]
    Abandoned,
}

impl LoaderError {
    pub fn is_config(&self) -> bool {
        matches!(self, LoaderError::Config(_))
    }
}

impl From<EnvError> for LoaderError {
    fn from(e: EnvError) -> Self {
        LoaderError::Config(e.to_string())
    }
}
