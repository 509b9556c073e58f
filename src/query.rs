//! Selection criteria validation and `q.`-prefixed query string encoding.
//!
//! Criteria arrive as a JSON object so callers can pass through whatever they
//! were given; [`Criteria`] is a typed builder producing the same object.

use serde_json::{json, Map, Value};
use urlencoding::encode;

use crate::error::{Error, Result};

/// Maximum number of rows the backend returns for a single list request.
pub const PAGE_CEILING: u64 = 1000;
pub const DEFAULT_LIMIT: u64 = 100;
pub const DEFAULT_PAGE_NUMBER: u64 = 1;
pub const DEFAULT_PAGE_SIZE: u64 = 25;
const MIN_PAGE_SIZE: u64 = 5;

const LIMIT: &str = "limit";
const PAGE_NUMBER: &str = "pageNumber";
const PAGE_SIZE: &str = "pageSize";

pub const ALLOWED_KEYS: [&str; 7] = [
    "select",
    "where",
    "groupBy",
    "orderBy",
    LIMIT,
    PAGE_NUMBER,
    PAGE_SIZE,
];

/// How pagination controls are derived when encoding criteria.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryMode {
    /// One bounded page; the caller controls `limit` or `pageNumber`/`pageSize`.
    Paginated,
    /// One page of an exhaustive read. Caller pagination keys are ignored and
    /// the page is addressed as `limit=1000` for page 1, otherwise as
    /// `pageNumber=<n>&pageSize=1000`.
    Bulk { page_number: u64 },
}

/// Validate `criteria` and encode it as `?q.<key>=<value>&q.<key>=<value>...`.
///
/// The input is never modified, so building twice yields identical output.
pub fn build_query(criteria: &Map<String, Value>, mode: QueryMode) -> Result<String> {
    check_keys(criteria)?;
    let params = match mode {
        QueryMode::Paginated => paginated_params(criteria)?,
        QueryMode::Bulk { page_number } => bulk_params(criteria, page_number)?,
    };
    encode_params(&params)
}

fn check_keys(criteria: &Map<String, Value>) -> Result<()> {
    let unknown: Vec<String> = criteria
        .keys()
        .filter(|key| !ALLOWED_KEYS.contains(&key.as_str()))
        .map(|key| format!("`{key}`"))
        .collect();
    if unknown.is_empty() {
        return Ok(());
    }
    Err(Error::validation(format!(
        "unknown query parameter(s) {}; allowed parameters are {}",
        unknown.join(", "),
        ALLOWED_KEYS.join(", ")
    )))
}

fn paginated_params(criteria: &Map<String, Value>) -> Result<Vec<(String, Value)>> {
    let mut params = vec![(LIMIT.to_string(), json!(DEFAULT_LIMIT))];
    for (key, value) in criteria {
        match params.iter_mut().find(|(existing, _)| existing == key) {
            Some(slot) => slot.1 = value.clone(),
            None => params.push((key.clone(), value.clone())),
        }
    }

    let has_page_number = criteria.contains_key(PAGE_NUMBER);
    let has_page_size = criteria.contains_key(PAGE_SIZE);
    if has_page_number || has_page_size {
        params.retain(|(key, _)| key != LIMIT);
        if !has_page_number {
            params.push((PAGE_NUMBER.to_string(), json!(DEFAULT_PAGE_NUMBER)));
        }
        if !has_page_size {
            params.push((PAGE_SIZE.to_string(), json!(DEFAULT_PAGE_SIZE)));
        }
    }

    for (key, value) in &params {
        check_range(key, value)?;
    }
    Ok(params)
}

fn bulk_params(criteria: &Map<String, Value>, page_number: u64) -> Result<Vec<(String, Value)>> {
    check_range(PAGE_NUMBER, &json!(page_number))?;
    let mut params = if page_number == 1 {
        vec![(LIMIT.to_string(), json!(PAGE_CEILING))]
    } else {
        vec![
            (PAGE_NUMBER.to_string(), json!(page_number)),
            (PAGE_SIZE.to_string(), json!(PAGE_CEILING)),
        ]
    };
    params.extend(
        criteria
            .iter()
            .filter(|(key, _)| ![LIMIT, PAGE_NUMBER, PAGE_SIZE].contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone())),
    );
    Ok(params)
}

fn check_range(key: &str, value: &Value) -> Result<()> {
    let (min, max) = match key {
        LIMIT => (1, Some(PAGE_CEILING)),
        PAGE_NUMBER => (1, None),
        PAGE_SIZE => (MIN_PAGE_SIZE, Some(PAGE_CEILING)),
        _ => return Ok(()),
    };
    let range = match max {
        Some(max) => format!("between {min} and {max}"),
        None => format!("at least {min}"),
    };
    let in_range = value
        .as_u64()
        .is_some_and(|n| n >= min && max.is_none_or(|max| n <= max));
    if in_range {
        Ok(())
    } else {
        Err(Error::validation(format!(
            "`{key}` must be an integer {range}, got {value}"
        )))
    }
}

fn encode_params(params: &[(String, Value)]) -> Result<String> {
    let mut query = String::new();
    for (key, value) in params {
        let raw = match value {
            // The query language only delimits string literals with single quotes.
            Value::String(text) => text.replace('"', "'"),
            Value::Number(number) => number.to_string(),
            other => {
                return Err(Error::validation(format!(
                    "`{key}` must be a string or a number, got {}",
                    type_name(other)
                )))
            }
        };
        query.push(if query.is_empty() { '?' } else { '&' });
        query.push_str("q.");
        query.push_str(key);
        query.push('=');
        query.push_str(&encode(&raw));
    }
    Ok(query)
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Typed builder for the criteria object accepted by [`build_query`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Criteria {
    pub select: Option<String>,
    pub r#where: Option<String>,
    pub group_by: Option<String>,
    pub order_by: Option<String>,
    pub limit: Option<u64>,
    pub page_number: Option<u64>,
    pub page_size: Option<u64>,
}

impl Criteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select(mut self, select: impl Into<String>) -> Self {
        self.select = Some(select.into());
        self
    }

    pub fn r#where(mut self, predicate: impl Into<String>) -> Self {
        self.r#where = Some(predicate.into());
        self
    }

    pub fn group_by(mut self, group_by: impl Into<String>) -> Self {
        self.group_by = Some(group_by.into());
        self
    }

    pub fn order_by(mut self, order_by: impl Into<String>) -> Self {
        self.order_by = Some(order_by.into());
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn page_number(mut self, page_number: u64) -> Self {
        self.page_number = Some(page_number);
        self
    }

    pub fn page_size(mut self, page_size: u64) -> Self {
        self.page_size = Some(page_size);
        self
    }

    pub fn to_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        let text_fields = [
            ("select", &self.select),
            ("where", &self.r#where),
            ("groupBy", &self.group_by),
            ("orderBy", &self.order_by),
        ];
        for (key, value) in text_fields {
            if let Some(value) = value {
                map.insert(key.to_string(), Value::String(value.clone()));
            }
        }
        let numeric_fields = [
            (LIMIT, self.limit),
            (PAGE_NUMBER, self.page_number),
            (PAGE_SIZE, self.page_size),
        ];
        for (key, value) in numeric_fields {
            if let Some(value) = value {
                map.insert(key.to_string(), json!(value));
            }
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn criteria(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn default_limit_applies_without_pagination_keys() -> Result<()> {
        let query = build_query(
            &criteria(json!({ "select": "Name", "where": "Age > 3" })),
            QueryMode::Paginated,
        )?;
        assert_eq!(query, "?q.limit=100&q.select=Name&q.where=Age%20%3E%203");
        Ok(())
    }

    #[test]
    fn caller_limit_overrides_default_in_place() -> Result<()> {
        let query = build_query(
            &criteria(json!({ "where": "Age > 3", "limit": 7 })),
            QueryMode::Paginated,
        )?;
        assert_eq!(query, "?q.limit=7&q.where=Age%20%3E%203");
        Ok(())
    }

    #[test]
    fn page_number_alone_defaults_page_size_and_drops_limit() -> Result<()> {
        let query = build_query(
            &criteria(json!({ "pageNumber": 3, "limit": 50 })),
            QueryMode::Paginated,
        )?;
        assert_eq!(query, "?q.pageNumber=3&q.pageSize=25");
        assert!(!query.contains("limit"));
        Ok(())
    }

    #[test]
    fn page_size_alone_defaults_page_number() -> Result<()> {
        let query = build_query(&criteria(json!({ "pageSize": 40 })), QueryMode::Paginated)?;
        assert_eq!(query, "?q.pageSize=40&q.pageNumber=1");
        Ok(())
    }

    #[test]
    fn double_quotes_become_single_quotes_before_encoding() -> Result<()> {
        let query = build_query(
            &criteria(json!({ "where": "Name=\"Rex\" AND Owner='Ann'" })),
            QueryMode::Paginated,
        )?;
        assert_eq!(
            query,
            "?q.limit=100&q.where=Name%3D%27Rex%27%20AND%20Owner%3D%27Ann%27"
        );
        Ok(())
    }

    #[test]
    fn output_has_one_question_mark_and_no_reserved_characters() -> Result<()> {
        let query = build_query(
            &criteria(json!({
                "select": "Name, Age",
                "where": "Notes LIKE '%a&b?c#d%'",
                "orderBy": "Age DESC",
                "groupBy": "Owner",
            })),
            QueryMode::Paginated,
        )?;
        assert!(query.starts_with("?q."));
        assert_eq!(query.matches('?').count(), 1);
        for param in query[1..].split('&') {
            assert!(param.starts_with("q."), "unexpected parameter {param}");
            let (_, value) = param.split_once('=').unwrap_or_default();
            assert!(!value.contains(['#', ' ', '\'', '"', '=', '?', ',']));
        }
        Ok(())
    }

    #[test]
    fn building_twice_is_byte_identical() -> Result<()> {
        let input = criteria(json!({ "where": "A=\"b\"", "pageSize": 10 }));
        let first = build_query(&input, QueryMode::Paginated)?;
        let second = build_query(&input, QueryMode::Paginated)?;
        assert_eq!(first, second);
        assert_eq!(input.get("where"), Some(&json!("A=\"b\"")));
        Ok(())
    }

    #[test]
    fn unknown_keys_are_named_with_the_allow_list() {
        let err = build_query(
            &criteria(json!({ "filter": "x", "sort": "y" })),
            QueryMode::Paginated,
        )
        .expect_err("unknown keys must be rejected");
        let message = err.to_string();
        assert!(matches!(err, Error::Validation(_)));
        assert!(message.contains("`filter`"));
        assert!(message.contains("`sort`"));
        assert!(message.contains("pageNumber"));
    }

    #[test]
    fn out_of_range_values_name_parameter_value_and_range() {
        let cases = [
            (json!({ "limit": 5000 }), "`limit`", "5000", "between 1 and 1000"),
            (json!({ "limit": 0 }), "`limit`", "0", "between 1 and 1000"),
            (json!({ "pageNumber": 0 }), "`pageNumber`", "0", "at least 1"),
            (json!({ "pageSize": 4 }), "`pageSize`", "4", "between 5 and 1000"),
            (json!({ "pageSize": 1001 }), "`pageSize`", "1001", "between 5 and 1000"),
            (json!({ "limit": "ten" }), "`limit`", "\"ten\"", "between 1 and 1000"),
        ];
        for (input, key, value, range) in cases {
            let err = build_query(&criteria(input), QueryMode::Paginated)
                .expect_err("out of range values must be rejected");
            let message = err.to_string();
            assert!(message.contains(key), "{message}");
            assert!(message.contains(value), "{message}");
            assert!(message.contains(range), "{message}");
        }
    }

    #[test]
    fn non_scalar_values_are_rejected() {
        for value in [json!(null), json!(true), json!(["a"]), json!({ "a": 1 })] {
            let err = build_query(&criteria(json!({ "select": value })), QueryMode::Paginated)
                .expect_err("non string/number values must be rejected");
            assert!(err.to_string().contains("`select` must be a string or a number"));
        }
    }

    #[test]
    fn bulk_mode_ignores_caller_pagination() -> Result<()> {
        let input = criteria(json!({
            "where": "Age > 3",
            "limit": 5000,
            "pageNumber": 9,
            "pageSize": 2,
        }));
        assert_eq!(
            build_query(&input, QueryMode::Bulk { page_number: 1 })?,
            "?q.limit=1000&q.where=Age%20%3E%203"
        );
        assert_eq!(
            build_query(&input, QueryMode::Bulk { page_number: 2 })?,
            "?q.pageNumber=2&q.pageSize=1000&q.where=Age%20%3E%203"
        );
        Ok(())
    }

    #[test]
    fn typed_criteria_matches_raw_object() -> Result<()> {
        let typed = Criteria::new()
            .select("Name")
            .r#where("Age > 3")
            .order_by("Name")
            .page_number(2);
        let raw = criteria(json!({
            "select": "Name",
            "where": "Age > 3",
            "orderBy": "Name",
            "pageNumber": 2,
        }));
        assert_eq!(typed.to_map(), raw);
        assert_eq!(
            build_query(&typed.to_map(), QueryMode::Paginated)?,
            "?q.select=Name&q.where=Age%20%3E%203&q.orderBy=Name&q.pageNumber=2&q.pageSize=25"
        );
        Ok(())
    }
}
