// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::str::FromStr;

use heck::{ToLowerCamelCase, ToShoutySnakeCase, ToSnakeCase, ToUpperCamelCase};
use tabula_env::{EnvError, Environment, TABULA_CASE_STYLE};

/// Maps a native column or table name to the identifier style callers use for keys. Must be pure
/// and total over valid identifiers.
pub trait CaseConverter: Send + Sync {
    fn convert(&self, name: &str) -> String;
}

impl<F> CaseConverter for F
where
    F: Fn(&str) -> String + Send + Sync,
{
    fn convert(&self, name: &str) -> String {
        self(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaseStyle {
    Preserve,
    /// `created_at`
    Snake,
    /// `createdAt`
    #[default]
    Camel,
    /// `CreatedAt`
    Pascal,
    /// `CREATED_AT`
    ScreamingSnake,
}

impl CaseStyle {
    pub fn from_env(env: &dyn Environment) -> Result<Self, EnvError> {
        match env.get(TABULA_CASE_STYLE) {
            Some(value) => value.parse().map_err(|message| EnvError::InvalidEnum {
                env_key: TABULA_CASE_STYLE,
                env_value: value,
                message,
            }),
            None => Ok(CaseStyle::default()),
        }
    }
}

impl CaseConverter for CaseStyle {
    fn convert(&self, name: &str) -> String {
        match self {
            CaseStyle::Preserve => name.to_string(),
            CaseStyle::Snake => name.to_snake_case(),
            CaseStyle::Camel => name.to_lower_camel_case(),
            CaseStyle::Pascal => name.to_upper_camel_case(),
            CaseStyle::ScreamingSnake => name.to_shouty_snake_case(),
        }
    }
}

impl FromStr for CaseStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "preserve" | "none" => Ok(CaseStyle::Preserve),
            "snake" | "snake_case" => Ok(CaseStyle::Snake),
            "camel" | "camelcase" => Ok(CaseStyle::Camel),
            "pascal" | "pascalcase" => Ok(CaseStyle::Pascal),
            "screaming_snake" | "screaming_snake_case" => Ok(CaseStyle::ScreamingSnake),
            _ => Err(
                "expected one of preserve, snake, camel, pascal, screaming-snake".to_string(),
            ),
        }
    }
}
