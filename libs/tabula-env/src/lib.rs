// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Configuration lookup for the tabula crates.
//!
//! Every tunable is read through an [`Environment`] so that callers (and tests) can supply values
//! without touching the process environment.

mod map;

pub mod logging;

pub use map::MapEnvironment;

/// Log filter directive (same syntax as `RUST_LOG`)
pub const TABULA_LOG: &str = "TABULA_LOG";
/// Collection window for loaders, in milliseconds. When absent, loaders coalesce requests issued
/// before the next scheduler yield.
pub const TABULA_LOADER_BATCH_DELAY_MS: &str = "TABULA_LOADER_BATCH_DELAY_MS";
/// Whether loaders keep resolved entries in their cache (default: true)
pub const TABULA_LOADER_CACHE: &str = "TABULA_LOADER_CACHE";
/// Default identifier case style used by the schema registry (default: camel)
pub const TABULA_CASE_STYLE: &str = "TABULA_CASE_STYLE";

pub trait Environment: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    fn enabled(&self, key: &str, default_value: bool) -> Result<bool, EnvError> {
        match self.get(key) {
            Some(value) => match value.to_lowercase().as_str() {
                "true" | "1" | "yes" | "on" | "enabled" | "enable" => Ok(true),
                "false" | "0" | "no" | "off" | "disabled" | "disable" => Ok(false),
                _ => Err(EnvError::InvalidBoolean {
                    key: key.to_string(),
                    value,
                }),
            },
            None => Ok(default_value),
        }
    }

    fn get_or_else(&self, key: &str, default_value: &str) -> String {
        self.get(key).unwrap_or(default_value.to_string())
    }

    fn get_list(&self, key: &str, default_value: Vec<String>) -> Vec<String> {
        self.get(key)
            .map(|value| value.split(',').map(|s| s.trim().into()).collect())
            .unwrap_or(default_value)
    }

    /// Parse an unsigned number. Absent keys yield `Ok(None)`.
    fn get_number(&self, key: &str) -> Result<Option<u64>, EnvError> {
        match self.get(key) {
            Some(value) => value
                .trim()
                .parse::<u64>()
                .map(Some)
                .map_err(|_| EnvError::InvalidNumber {
                    key: key.to_string(),
                    value,
                }),
            None => Ok(None),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EnvError {
    #[error(
        "Invalid value for {key}: {value}. Expected true, 1, yes, on, enabled, enable OR false, 0, no, off, disabled, disable"
    )]
    InvalidBoolean { key: String, value: String },

    #[error("Invalid value for {key}: {value}. Expected a non-negative integer")]
    InvalidNumber { key: String, value: String },

    #[error("Invalid env value {env_value} for {env_key}: {message}")]
    InvalidEnum {
        env_key: &'static str,
        env_value: String,
        message: String,
    },
}

pub struct SystemEnvironment;

impl Environment for SystemEnvironment {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}
