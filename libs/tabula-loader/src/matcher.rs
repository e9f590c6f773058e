// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Re-associates fetched rows with the keys that requested them.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;
use tabula_sql::SQLValue;

use crate::key::to_json;

/// Does the `candidate` value (from a fetched row) satisfy the `requested` key value?
///
/// Numbers compare numerically (`1` matches `1.0`). Strings compare exactly unless `ignore_case`
/// is set, in which case they compare by Unicode case folding (`"straße"` matches `"STRASSE"`,
/// `"é"` does not match `"e"`). Everything else must be equal.
pub fn matches(requested: &Value, candidate: &Value, ignore_case: bool) -> bool {
    match (requested, candidate) {
        (Value::Number(requested), Value::Number(candidate)) => {
            match (requested.as_i64(), candidate.as_i64()) {
                (Some(requested), Some(candidate)) => requested == candidate,
                _ => requested.as_f64() == candidate.as_f64(),
            }
        }
        (Value::String(requested), Value::String(candidate)) if ignore_case => {
            requested == candidate || fold_case(requested) == fold_case(candidate)
        }
        (requested, candidate) => requested == candidate,
    }
}

/// [`matches`] for one value of a load key. Timestamp keys compare as instants, so a row rendering
/// `2024-01-31T10:00:05+00:00` matches the key `2024-01-31T10:00:05.000Z`.
pub(crate) fn matches_key(requested: &SQLValue, candidate: &Value, ignore_case: bool) -> bool {
    match (requested, candidate) {
        (SQLValue::Timestamp(requested), Value::String(candidate)) => {
            parse_timestamp(candidate).is_some_and(|candidate| candidate == *requested)
        }
        _ => matches(&to_json(requested), candidate, ignore_case),
    }
}

/// `timestamptz` columns render with an offset, `timestamp` columns without one (read as UTC).
fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|timestamp| timestamp.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|timestamp| timestamp.and_utc())
        })
}

/// Full case folding approximated through the uppercase mapping, which expands characters such as
/// `ß` to `SS` before lowering.
fn fold_case(s: &str) -> String {
    s.chars()
        .flat_map(char::to_uppercase)
        .flat_map(char::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;

    #[test]
    fn numbers() {
        assert!(matches(&json!(1), &json!(1.0), false));
        assert!(!matches(&json!(1.001), &json!(1), false));
        assert!(matches(&json!(9007199254740993i64), &json!(9007199254740993i64), false));
        assert!(!matches(&json!(9007199254740993i64), &json!(9007199254740992i64), false));
    }

    #[test]
    fn strings() {
        assert!(matches(&json!("a"), &json!("A"), true));
        assert!(!matches(&json!("a"), &json!("A"), false));
        assert!(matches(&json!("straße"), &json!("STRASSE"), true));
        assert!(!matches(&json!("résumé"), &json!("RESUME"), true));
    }

    #[test]
    fn timestamps_compare_as_instants() {
        let key = SQLValue::Timestamp(Utc.with_ymd_and_hms(2024, 1, 31, 10, 0, 5).unwrap());

        assert!(matches_key(&key, &json!("2024-01-31T10:00:05+00:00"), false));
        assert!(matches_key(&key, &json!("2024-01-31T10:00:05.000Z"), false));
        assert!(matches_key(&key, &json!("2024-01-31T15:30:05+05:30"), false));
        assert!(matches_key(&key, &json!("2024-01-31T10:00:05"), false));
        assert!(!matches_key(&key, &json!("2024-01-31T10:00:06+00:00"), false));
        assert!(!matches_key(&key, &json!("yesterday"), false));
    }

    #[test]
    fn non_timestamp_keys_match_as_json() {
        assert!(matches_key(&SQLValue::Int(1), &json!(1.0), false));
        assert!(matches_key(&SQLValue::from("abc"), &json!("ABC"), true));
        assert!(!matches_key(
            &SQLValue::from("2024-01-31T10:00:05Z"),
            &json!("2024-01-31T10:00:05+00:00"),
            false
        ));
    }

    #[test]
    fn other_values_are_exact() {
        assert!(matches(&json!(null), &json!(null), true));
        assert!(!matches(&json!(true), &json!("true"), true));
        assert!(!matches(&json!("1"), &json!(1), false));
    }
}
