//! Completeness scoring over extracted items.
use crate::result::QualityReport;
use crate::schema::join_path;
use serde_json::Value;
use std::collections::BTreeMap;

/// Tally missing leaves across `items`.
///
/// A leaf is missing when it is `null` or the empty string. Objects recurse
/// with dotted paths; list elements recurse under the list's own path. An
/// item with any missing leaf is incomplete. `errors` is left empty for the
/// caller to fill.
pub fn score(items: &[Value]) -> QualityReport {
    let mut missing_fields = BTreeMap::new();
    let mut complete_items = 0;

    for item in items {
        let before: usize = missing_fields.values().sum();
        walk("", item, &mut missing_fields);
        let after: usize = missing_fields.values().sum();
        if after == before {
            complete_items += 1;
        }
    }

    let total_items = items.len();
    let completion_rate = if total_items == 0 {
        0.0
    } else {
        complete_items as f64 / total_items as f64
    };

    QualityReport {
        total_items,
        complete_items,
        completion_rate,
        missing_fields,
        errors: Vec::new(),
    }
}

fn walk(path: &str, v: &Value, missing: &mut BTreeMap<String, usize>) {
    match v {
        Value::Object(obj) => {
            for (k, child) in obj {
                walk(&join_path(path, k), child, missing);
            }
        }
        Value::Array(elems) => {
            for e in elems {
                walk(path, e, missing);
            }
        }
        Value::Null => bump(path, missing),
        Value::String(s) if s.is_empty() => bump(path, missing),
        _ => {}
    }
}

fn bump(path: &str, missing: &mut BTreeMap<String, usize>) {
    let key = if path.is_empty() { "<item>" } else { path };
    *missing.entry(key.to_string()).or_insert(0) += 1;
}
