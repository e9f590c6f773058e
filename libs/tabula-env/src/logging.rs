// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! # Tracing setup.
//!
//! The tabula crates are instrumented with `tracing`. Applications embedding them may call [`init`]
//! to install a console subscriber filtered by the `TABULA_LOG` variable, which follows the same
//! conventions as `RUST_LOG`. Without it, the default level is `WARN`.

use tracing_subscriber::{EnvFilter, filter::LevelFilter, prelude::*};

use crate::{Environment, TABULA_LOG};

/// Initialize the global tracing subscriber. Fails if a global subscriber is already installed.
pub fn init(env: &dyn Environment) -> Result<(), tracing_subscriber::util::TryInitError> {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .parse_lossy(env.get(TABULA_LOG).unwrap_or_default());

    let fmt_layer = tracing_subscriber::fmt::layer().compact();

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
}
