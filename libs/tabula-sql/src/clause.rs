// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Clauses composed around compiled conditions: boolean combinators, `WHERE`/`HAVING`,
//! `ORDER BY`, `GROUP BY` and `LIMIT`.

use crate::{Condition, Fragment, SQLValue, TableMetadata, database_error::DatabaseError};

/// `(<f1> AND <f2> ...)`. A single fragment is returned as is and no fragments yield `true`.
pub fn and(fragments: Vec<Fragment>) -> Fragment {
    combine(fragments, " AND ")
}

/// `(<f1> OR <f2> ...)`. A single fragment is returned as is and no fragments yield `true`.
pub fn or(fragments: Vec<Fragment>) -> Fragment {
    combine(fragments, " OR ")
}

fn combine(mut fragments: Vec<Fragment>, sep: &str) -> Fragment {
    match fragments.len() {
        0 => Fragment::tautology(),
        1 => fragments.remove(0),
        _ => Fragment::join(fragments, sep).parenthesized(),
    }
}

/// The boolean expression for a `WHERE` clause (without the keyword). A single raw fragment is used
/// verbatim.
pub fn where_clause(condition: &Condition, table: &TableMetadata) -> Result<Fragment, DatabaseError> {
    match condition {
        Condition::Raw(fragment) => Ok(fragment.clone()),
        condition => Ok(and(condition.compile(table)?)),
    }
}

/// Same as [`where_clause`], for use after `GROUP BY`.
pub fn having_clause(condition: &Condition, table: &TableMetadata) -> Result<Fragment, DatabaseError> {
    where_clause(condition, table)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ordering {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq)]
pub enum OrderByItem {
    /// A logical column key
    Column(String),
    Raw(Fragment),
    /// A quoted identifier path such as an alias (`["count"]`) or `["other", "col"]`
    Identifier(Vec<String>),
    Directed(String, Ordering),
}

impl OrderByItem {
    pub fn asc(key: impl Into<String>) -> Self {
        OrderByItem::Directed(key.into(), Ordering::Asc)
    }

    pub fn desc(key: impl Into<String>) -> Self {
        OrderByItem::Directed(key.into(), Ordering::Desc)
    }

    fn compile(&self, table: &TableMetadata) -> Fragment {
        match self {
            OrderByItem::Column(key) => table.column_fragment(key),
            OrderByItem::Raw(fragment) => fragment.clone(),
            OrderByItem::Identifier(path) => Fragment::identifier(path.iter().cloned()),
            OrderByItem::Directed(key, ordering) => {
                table.column_fragment(key).sql(match ordering {
                    Ordering::Asc => " ASC",
                    Ordering::Desc => " DESC",
                })
            }
        }
    }
}

impl From<&str> for OrderByItem {
    fn from(key: &str) -> Self {
        OrderByItem::Column(key.to_string())
    }
}

impl From<String> for OrderByItem {
    fn from(key: String) -> Self {
        OrderByItem::Column(key)
    }
}

impl From<Fragment> for OrderByItem {
    fn from(fragment: Fragment) -> Self {
        OrderByItem::Raw(fragment)
    }
}

impl<K: Into<String>> From<(K, Ordering)> for OrderByItem {
    fn from((key, ordering): (K, Ordering)) -> Self {
        OrderByItem::Directed(key.into(), ordering)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct OrderBy(pub Vec<OrderByItem>);

impl OrderBy {
    pub fn new<I: Into<OrderByItem>>(items: impl IntoIterator<Item = I>) -> Self {
        Self(items.into_iter().map(Into::into).collect())
    }

    /// The comma-separated element list, or `None` if there is nothing to order by.
    pub fn compile(&self, table: &TableMetadata) -> Option<Fragment> {
        (!self.0.is_empty())
            .then(|| Fragment::join(self.0.iter().map(|item| item.compile(table)), ", "))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GroupByItem {
    Column(String),
    Raw(Fragment),
    Identifier(Vec<String>),
}

impl GroupByItem {
    fn compile(&self, table: &TableMetadata) -> Fragment {
        match self {
            GroupByItem::Column(key) => table.column_fragment(key),
            GroupByItem::Raw(fragment) => fragment.clone(),
            GroupByItem::Identifier(path) => Fragment::identifier(path.iter().cloned()),
        }
    }
}

impl From<&str> for GroupByItem {
    fn from(key: &str) -> Self {
        GroupByItem::Column(key.to_string())
    }
}

impl From<String> for GroupByItem {
    fn from(key: String) -> Self {
        GroupByItem::Column(key)
    }
}

impl From<Fragment> for GroupByItem {
    fn from(fragment: Fragment) -> Self {
        GroupByItem::Raw(fragment)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct GroupBy(pub Vec<GroupByItem>);

impl GroupBy {
    pub fn new<I: Into<GroupByItem>>(items: impl IntoIterator<Item = I>) -> Self {
        Self(items.into_iter().map(Into::into).collect())
    }

    pub fn compile(&self, table: &TableMetadata) -> Option<Fragment> {
        (!self.0.is_empty())
            .then(|| Fragment::join(self.0.iter().map(|item| item.compile(table)), ", "))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitCount {
    Count(u64),
    All,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Limit {
    Count(u64),
    All,
    WithOffset(LimitCount, u64),
    /// Rendered after the `LIMIT` keyword
    Raw(Fragment),
}

impl Limit {
    /// `LIMIT <count> [OFFSET <offset>]`
    pub fn compile(&self) -> Fragment {
        let limit = Fragment::raw("LIMIT ");

        match self {
            Limit::Count(count) => count_fragment(limit, LimitCount::Count(*count)),
            Limit::All => count_fragment(limit, LimitCount::All),
            Limit::WithOffset(count, offset) => count_fragment(limit, *count)
                .sql(" OFFSET ")
                .param(to_int(*offset)),
            Limit::Raw(fragment) => limit.append(fragment.clone()),
        }
    }
}

fn count_fragment(limit: Fragment, count: LimitCount) -> Fragment {
    match count {
        LimitCount::Count(count) => limit.param(to_int(count)),
        LimitCount::All => limit.sql("ALL"),
    }
}

fn to_int(value: u64) -> SQLValue {
    SQLValue::Int(i64::try_from(value).unwrap_or(i64::MAX))
}

impl From<u64> for Limit {
    fn from(count: u64) -> Self {
        Limit::Count(count)
    }
}

impl From<(u64, u64)> for Limit {
    fn from((count, offset): (u64, u64)) -> Self {
        Limit::WithOffset(LimitCount::Count(count), offset)
    }
}

impl From<Fragment> for Limit {
    fn from(fragment: Fragment) -> Self {
        Limit::Raw(fragment)
    }
}

/// Whether textual comparisons in a batch lookup fold case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaseSensitivity {
    #[default]
    Sensitive,
    Insensitive,
}

impl From<bool> for CaseSensitivity {
    /// `true` means "ignore case"
    fn from(ignore_case: bool) -> Self {
        if ignore_case {
            CaseSensitivity::Insensitive
        } else {
            CaseSensitivity::Sensitive
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ExpressionBuilder;
    use crate::condition::ColumnConditions;
    use crate::test_util::people_table;

    #[test]
    fn empty_conditions_are_true() {
        let table = people_table();

        assert_binding!(
            where_clause(&Condition::from(ColumnConditions::new()), &table)
                .unwrap()
                .to_sql(),
            "true"
        );
        assert_binding!(
            where_clause(&Condition::Fragments(vec![]), &table)
                .unwrap()
                .to_sql(),
            "true"
        );
    }

    #[test]
    fn single_fragment_is_not_parenthesized() {
        assert_binding!(or(vec![Fragment::raw("a")]).to_sql(), "a");
        assert_binding!(
            and(vec![Fragment::raw("a"), Fragment::raw("b")]).to_sql(),
            "(a AND b)"
        );
    }

    #[test]
    fn nested_combinators_number_params_in_order() {
        let table = people_table();
        let name: Condition = ColumnConditions::new().eq("name", "Sam").into();
        let age: Condition = ColumnConditions::new().eq("age", 30).into();

        let fragment = and(vec![
            Fragment::raw("x"),
            or(vec![
                where_clause(&name, &table).unwrap(),
                where_clause(&age, &table).unwrap(),
            ]),
        ]);

        assert_binding!(
            fragment.to_sql(),
            r#"(x AND ("people"."name" = $1 OR "people"."age" = $2))"#,
            "Sam",
            30
        );
    }

    #[test]
    fn raw_where_is_verbatim() {
        assert_binding!(
            where_clause(&Condition::Raw(Fragment::raw("id > 10")), &people_table())
                .unwrap()
                .to_sql(),
            "id > 10"
        );
    }

    #[test]
    fn mixed_order_by() {
        let order_by = OrderBy(vec![
            "name".into(),
            OrderByItem::desc("createdAt"),
            OrderByItem::Identifier(vec!["count".to_string()]),
            Fragment::raw("random()").into(),
        ]);

        assert_binding!(
            order_by.compile(&people_table()).unwrap().to_sql(),
            r#""people"."name", "people"."created_at" DESC, "count", random()"#
        );
        assert_eq!(OrderBy::default().compile(&people_table()), None);
    }

    #[test]
    fn group_by() {
        assert_binding!(
            GroupBy::new(["age", "name"])
                .compile(&people_table())
                .unwrap()
                .to_sql(),
            r#""people"."age", "people"."name""#
        );
    }

    #[test]
    fn limits() {
        assert_binding!(Limit::Count(10).compile().to_sql(), "LIMIT $1", 10i64);
        assert_binding!(Limit::All.compile().to_sql(), "LIMIT ALL");
        assert_binding!(
            Limit::WithOffset(LimitCount::All, 20).compile().to_sql(),
            "LIMIT ALL OFFSET $1",
            20i64
        );
        assert_binding!(
            Limit::from((10u64, 20u64)).compile().to_sql(),
            "LIMIT $1 OFFSET $2",
            10i64,
            20i64
        );
        assert_binding!(Limit::Raw(Fragment::raw("5")).compile().to_sql(), "LIMIT 5");
    }
}
