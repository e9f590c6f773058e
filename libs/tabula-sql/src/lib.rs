// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Parameterized SQL for Postgres tables described by [`TableMetadata`].
//!
//! Conditions ([`Condition`]) compile into boolean [`Fragment`]s, clauses are composed around them,
//! and [`QueryBuilder`] assembles complete [`Statement`]s. A [`TableQuery`] runs those statements
//! through a [`DatabaseExecutor`].

#[macro_use]
#[cfg(test)]
mod test_util;

pub mod clause;
mod condition;
pub mod database_error;
mod executor;
mod fragment;
mod query_builder;
mod sql_builder;
mod sql_value;
mod table;
mod table_query;

/// A result row keyed by column name, in column order.
pub type Row = serde_json::Map<String, serde_json::Value>;

pub use clause::{
    CaseSensitivity, GroupBy, GroupByItem, Limit, LimitCount, OrderBy, OrderByItem, Ordering,
};
pub use condition::{ColumnConditions, Condition, ConditionValue};
pub use database_error::DatabaseError;
pub use executor::{DatabaseExecutor, PgExecutor};
pub use fragment::Fragment;
pub use query_builder::{
    ColumnValue, DeleteRequest, ForUpdate, QueryBuilder, QueryOptions, Record,
};
pub use sql_builder::{ExpressionBuilder, SQLBuilder, Statement};
pub use sql_value::SQLValue;
pub use table::{ColumnMetadata, TableMetadata};
pub use table_query::TableQuery;
