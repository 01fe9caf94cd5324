//! Canonical publication date selection.
//!
//! Upstream records carry several "when" signals (`published`, `issued`,
//! `deposited`, ...), each a CSL `date-parts` array of one to three integers.
//! The earliest of them becomes the record's `date`.

use serde_json::Value;

use crate::models::{MetadataRecord, keys};

/// Candidate keys, in first-seen order for tie-breaking.
pub const DATE_SOURCE_KEYS: [&str; 6] = [
    "published",
    "published-online",
    "published-print",
    "issued",
    "created",
    "deposited",
];

/// Assign the earliest candidate date to `record.date` and return it.
///
/// A record that already carries a valid `date` is left alone. Missing month
/// or day are padded with 1. Returns `None` when no candidate is present.
pub fn resolve_date(record: &mut MetadataRecord) -> Option<[i64; 3]> {
    if let Some(date) = record.date() {
        return Some(date);
    }

    let mut candidates = DATE_SOURCE_KEYS
        .iter()
        .filter_map(|key| record.get(key).and_then(date_parts))
        .collect::<Vec<_>>();

    // stable: equal keys keep candidate order
    candidates.sort_by_key(|date| sort_key(date));

    let earliest = *candidates.first()?;
    record.set_date(earliest);
    Some(earliest)
}

/// Read `{"date-parts": [[y, m?, d?]]}` and pad it to three parts.
///
/// Parts are read by position; a missing or non-integer month or day
/// counts as 1.
fn date_parts(value: &Value) -> Option<[i64; 3]> {
    let parts = value.get("date-parts")?.as_array()?.first()?.as_array()?;
    let part = |i: usize| parts.get(i).and_then(Value::as_i64);

    let year = part(0)?;
    Some([year, part(1).unwrap_or(1), part(2).unwrap_or(1)])
}

fn sort_key(date: &[i64; 3]) -> String {
    format!("{:04}{:02}{:02}", date[0], date[1], date[2])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> MetadataRecord {
        MetadataRecord::from_value(value).unwrap()
    }

    #[test]
    fn earliest_candidate_wins_after_padding() {
        let mut rec = record(json!({
            "published-online": {"date-parts": [[2020, 6]]},
            "issued": {"date-parts": [[2020]]},
        }));
        assert_eq!(resolve_date(&mut rec), Some([2020, 1, 1]));
        assert_eq!(rec.get(keys::DATE), Some(&json!([2020, 1, 1])));
    }

    #[test]
    fn two_digit_months_compare_correctly() {
        let mut rec = record(json!({
            "published-print": {"date-parts": [[2019, 10, 2]]},
            "created": {"date-parts": [[2019, 9, 30]]},
        }));
        assert_eq!(resolve_date(&mut rec), Some([2019, 9, 30]));
    }

    #[test]
    fn missing_day_pads_to_first_of_month() {
        let mut rec = record(json!({
            "deposited": {"date-parts": [[2021, 3, 2]]},
            "published": {"date-parts": [[2021, 3]]},
        }));
        assert_eq!(resolve_date(&mut rec), Some([2021, 3, 1]));
    }

    #[test]
    fn null_month_keeps_day_in_place() {
        let mut rec = record(json!({"issued": {"date-parts": [[2020, null, 15]]}}));
        assert_eq!(resolve_date(&mut rec), Some([2020, 1, 15]));

        let mut rec = record(json!({"issued": {"date-parts": [[2020, 7, "x"]]}}));
        assert_eq!(resolve_date(&mut rec), Some([2020, 7, 1]));
    }

    #[test]
    fn existing_date_is_kept() {
        let mut rec = record(json!({
            "date": [1999, 12, 31],
            "issued": {"date-parts": [[1990]]},
        }));
        assert_eq!(resolve_date(&mut rec), Some([1999, 12, 31]));
    }

    #[test]
    fn null_parts_are_skipped() {
        let mut rec = record(json!({
            "issued": {"date-parts": [[null]]},
            "created": {"date-parts": [[2005, 4, 12]]},
        }));
        assert_eq!(resolve_date(&mut rec), Some([2005, 4, 12]));
    }

    #[test]
    fn no_candidates_leaves_date_absent() {
        let mut rec = record(json!({"title": "Untitled"}));
        assert_eq!(resolve_date(&mut rec), None);
        assert!(!rec.has(keys::DATE));
    }
}
