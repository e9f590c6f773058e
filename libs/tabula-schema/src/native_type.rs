// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::sync::LazyLock;

use regex::Regex;

static TYPE_MODIFIER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s*\([^)]*\)").unwrap());

/// Turn a catalog type tag into a type usable in a cast (`$1::<type>`).
///
/// Modifiers are dropped (`varchar(255)` -> `varchar`), SQL-standard spellings become the internal
/// names (`integer` -> `int4`) and the catalog's array naming (`_int4`) becomes `int4[]`.
pub fn normalize_native_type(native_type: &str, is_array: bool) -> String {
    let typ = TYPE_MODIFIER.replace_all(native_type.trim(), "");

    let (base, mut dims) = match typ.find('[') {
        Some(idx) => (&typ[..idx], typ[idx..].matches("[]").count()),
        None => (&*typ, 0),
    };

    let base = match base.strip_prefix('_') {
        Some(element) if dims == 0 => {
            dims = 1;
            element
        }
        _ => base,
    };

    let base = canonical_name(base.trim());

    if is_array && dims == 0 {
        dims = 1;
    }

    format!("{base}{}", "[]".repeat(dims))
}

fn canonical_name(name: &str) -> String {
    let lower = name.to_lowercase();

    let canonical = match lower.as_str() {
        "smallint" | "smallserial" => "int2",
        "int" | "integer" | "serial" => "int4",
        "bigint" | "bigserial" => "int8",
        "real" => "float4",
        "double precision" => "float8",
        "boolean" => "bool",
        "character varying" => "varchar",
        "character" => "bpchar",
        "timestamp with time zone" => "timestamptz",
        "timestamp without time zone" => "timestamp",
        "time with time zone" => "timetz",
        "time without time zone" => "time",
        // User-defined types keep their (case-sensitive) name
        _ if lower != name => return name.to_string(),
        other => other,
    };

    canonical.to_string()
}
