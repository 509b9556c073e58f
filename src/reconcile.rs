//! Mapping of list-field values onto the index references the write API expects.
//!
//! The backend assigns list indices itself and keeps them stable: deleting a
//! value never renumbers the rest, and re-adding a value restores its original
//! index. Indices are therefore always resolved against a freshly fetched
//! [`ListDefinition`]; nothing here caches across calls.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;
use tracing::debug;

use crate::error::{Error, Result};

const NAIVE_DATETIME_FORMATS: [&str; 6] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];
const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%m/%d/%Y"];

/// Value type of a list field, which decides how values are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    Text,
    Number,
    /// Compared by instant, since one date admits several textual encodings.
    DateTime,
}

impl ListKind {
    /// Parse a backend field type such as `LIST-STRING`; `None` for non-list types.
    pub fn from_field_type(field_type: &str) -> Option<Self> {
        match field_type.trim().to_ascii_uppercase().as_str() {
            "LIST-STRING" => Some(ListKind::Text),
            "LIST-NUMBER" => Some(ListKind::Number),
            "LIST-DATE/TIME" => Some(ListKind::DateTime),
            _ => None,
        }
    }
}

/// Ordered index→value map describing the values a list field accepts.
///
/// Indices are positive, may have gaps and need not start at 1. They are
/// only ever added or removed, never renumbered.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListDefinition {
    entries: BTreeMap<u32, Value>,
}

impl ListDefinition {
    /// Parse the backend's `{"<index>": value, ...}` object.
    ///
    /// A malformed body is a backend fault and surfaces as a transport error.
    pub fn from_json(value: &Value) -> Result<Self> {
        let Value::Object(map) = value else {
            return Err(unexpected_definition(format!(
                "expected an object of index to value, got {value}"
            )));
        };
        let mut entries = BTreeMap::new();
        for (key, item) in map {
            let index = key
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|index| *index > 0)
                .ok_or_else(|| {
                    unexpected_definition(format!("index `{key}` is not a positive integer"))
                })?;
            entries.insert(index, item.clone());
        }
        Ok(Self { entries })
    }

    pub fn get(&self, index: u32) -> Option<&Value> {
        self.entries.get(&index)
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &Value)> {
        self.entries.iter().map(|(index, value)| (*index, value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn unexpected_definition(detail: String) -> Error {
    Error::transport(None, format!("unexpected list definition: {detail}"))
}

impl FromIterator<(u32, Value)> for ListDefinition {
    fn from_iter<I: IntoIterator<Item = (u32, Value)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum ListKey {
    Text(String),
    Instant(i64),
}

/// Resolve `desired` values to the indices they hold in `definition`.
///
/// Values absent from the definition are dropped rather than assigned a new
/// index; the server mints indices for genuinely new values on write. The
/// result keeps the order of `desired`.
pub fn reconcile(definition: &ListDefinition, kind: ListKind, desired: &[Value]) -> Vec<u32> {
    let mut reverse: HashMap<ListKey, u32> = HashMap::with_capacity(definition.len());
    for (index, value) in definition.iter() {
        if let Some(key) = list_key(kind, value) {
            reverse.entry(key).or_insert(index);
        }
    }

    desired
        .iter()
        .filter_map(|value| {
            let index = list_key(kind, value).and_then(|key| reverse.get(&key).copied());
            if index.is_none() {
                debug!(%value, "list value not present in definition, dropping");
            }
            index
        })
        .collect()
}

fn list_key(kind: ListKind, value: &Value) -> Option<ListKey> {
    match kind {
        ListKind::Text => match value {
            Value::String(text) => Some(ListKey::Text(text.clone())),
            Value::Number(number) => Some(ListKey::Text(number.to_string())),
            _ => None,
        },
        ListKind::Number => {
            let number = match value {
                Value::Number(number) => number.as_f64()?,
                Value::String(text) => text.trim().parse::<f64>().ok()?,
                _ => return None,
            };
            Some(ListKey::Text(canonical_number(number)))
        }
        ListKind::DateTime => match value {
            Value::String(text) => epoch_millis(text).map(ListKey::Instant),
            Value::Number(number) => number
                .as_i64()
                .or_else(|| {
                    number
                        .as_f64()
                        .filter(|millis| millis.fract() == 0.0 && millis.abs() < 9.0e15)
                        .map(|millis| millis as i64)
                })
                .map(ListKey::Instant),
            _ => None,
        },
    }
}

fn canonical_number(number: f64) -> String {
    if number.fract() == 0.0 && number.abs() < 1e15 {
        format!("{}", number as i64)
    } else {
        format!("{number}")
    }
}

/// Epoch milliseconds for the date encodings the backend emits and accepts.
/// Values without an offset are taken as UTC.
pub fn epoch_millis(text: &str) -> Option<i64> {
    let text = text.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.timestamp_millis());
    }
    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(text, format) {
            return Some(parsed.and_utc().timestamp_millis());
        }
    }
    for format in DATE_FORMATS {
        if let Ok(parsed) = NaiveDate::parse_from_str(text, format) {
            return parsed
                .and_hms_opt(0, 0, 0)
                .map(|midnight| midnight.and_utc().timestamp_millis());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn definition(value: Value) -> ListDefinition {
        ListDefinition::from_json(&value).expect("valid definition")
    }

    #[test]
    fn absent_values_are_dropped_not_invented() {
        let pets = definition(json!({ "1": "Cat", "4": "Frog", "6": "Mouse" }));
        let indices = reconcile(&pets, ListKind::Text, &[json!("Cat"), json!("Dog"), json!("Frog")]);
        assert_eq!(indices, vec![1, 4]);
    }

    #[test]
    fn result_follows_desired_order() {
        let pets = definition(json!({ "1": "Cat", "4": "Frog", "6": "Mouse" }));
        let indices = reconcile(&pets, ListKind::Text, &[json!("Mouse"), json!("Cat")]);
        assert_eq!(indices, vec![6, 1]);
    }

    #[test]
    fn each_call_uses_only_the_definition_it_is_given() {
        let before = definition(json!({ "1": "Cat", "4": "Frog", "6": "Mouse" }));
        let desired = [json!("Dog"), json!("Frog")];
        assert_eq!(reconcile(&before, ListKind::Text, &desired), vec![4]);

        // "Dog" was re-added upstream and got its historical index back.
        let after = definition(json!({ "1": "Cat", "2": "Dog", "4": "Frog", "6": "Mouse" }));
        assert_eq!(reconcile(&after, ListKind::Text, &desired), vec![2, 4]);

        assert_eq!(reconcile(&before, ListKind::Text, &desired), vec![4]);
    }

    #[test]
    fn dates_match_across_encodings() {
        let dates = definition(json!({
            "3": "2024-01-05T00:00:00",
            "7": "2024-02-29T13:30:00",
        }));
        let desired = [
            json!("2024-02-29T13:30:00Z"),
            json!("2024-01-05"),
            json!("2024-02-29T14:30:00+01:00"),
            json!("not a date"),
        ];
        assert_eq!(reconcile(&dates, ListKind::DateTime, &desired), vec![7, 3, 7]);
    }

    #[test]
    fn dates_without_seconds_or_as_float_millis_still_match() {
        let visits = definition(json!({ "2": "2024-03-01T09:30:00" }));
        let desired = [
            json!("2024-03-01T09:30"),
            json!("2024-03-01 09:30"),
            json!(1709285400000.0),
            json!(1709285400000i64),
            json!(1709285400000.5),
        ];
        assert_eq!(
            reconcile(&visits, ListKind::DateTime, &desired),
            vec![2, 2, 2, 2]
        );
    }

    #[test]
    fn numbers_match_regardless_of_representation() {
        let sizes = definition(json!({ "2": 5, "3": "7.5", "9": 10 }));
        let desired = [json!("5"), json!(7.5), json!(10.0), json!(11)];
        assert_eq!(reconcile(&sizes, ListKind::Number, &desired), vec![2, 3, 9]);
    }

    #[test]
    fn text_lists_compare_exactly() {
        let pets = definition(json!({ "1": "Cat" }));
        assert!(reconcile(&pets, ListKind::Text, &[json!("cat"), json!(null)]).is_empty());
    }

    #[test]
    fn malformed_definitions_are_backend_faults() {
        for value in [json!(["Cat"]), json!({ "a": "Cat" }), json!({ "0": "Cat" })] {
            let err = ListDefinition::from_json(&value).expect_err("must be rejected");
            assert!(matches!(err, Error::Transport { status: None, .. }));
            assert!(err.to_string().contains("unexpected list definition"));
        }
    }

    #[test]
    fn field_types_map_to_list_kinds() {
        assert_eq!(ListKind::from_field_type("LIST-STRING"), Some(ListKind::Text));
        assert_eq!(ListKind::from_field_type("list-number"), Some(ListKind::Number));
        assert_eq!(
            ListKind::from_field_type("LIST-DATE/TIME"),
            Some(ListKind::DateTime)
        );
        assert_eq!(ListKind::from_field_type("STRING"), None);
    }

    #[test]
    fn definition_iterates_in_index_order() {
        let pets = definition(json!({ "6": "Mouse", "1": "Cat", "4": "Frog" }));
        let indices: Vec<u32> = pets.iter().map(|(index, _)| index).collect();
        assert_eq!(indices, vec![1, 4, 6]);
        assert_eq!(pets.get(4), Some(&json!("Frog")));
    }
}
