// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use tabula_env::EnvError;
use tabula_sql::DatabaseError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Unknown table `{0}`")]
    UnknownTable(String),

    #[error("Invalid catalog snapshot: {0}")]
    Parse(#[from] serde_json::Error),

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Env(#[from] EnvError),
}
