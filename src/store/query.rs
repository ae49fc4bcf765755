//! Backend-neutral record query.

use std::cmp::Ordering;

use serde_json::Value as JsonValue;

/// Equality filters plus ordering and paging.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    filters: Vec<(String, JsonValue)>,
    order_by: Vec<(String, bool)>,
    limit: Option<usize>,
    offset: usize,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Match records whose `field` equals `value`.
    pub fn eq(
        mut self,
        field: &str,
        value: impl Into<JsonValue>,
    ) -> Self {
        self.filters.push((field.to_string(), value.into()));
        self
    }

    /// Order by `field`; `rev` sorts descending.
    pub fn order(
        mut self,
        field: &str,
        rev: bool,
    ) -> Self {
        self.order_by.push((field.to_string(), rev));
        self
    }

    pub fn limit(
        mut self,
        limit: usize,
    ) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(
        mut self,
        offset: usize,
    ) -> Self {
        self.offset = offset;
        self
    }

    pub fn filters(&self) -> &[(String, JsonValue)] {
        &self.filters
    }

    pub fn order_by(&self) -> &[(String, bool)] {
        &self.order_by
    }

    pub fn get_limit(&self) -> Option<usize> {
        self.limit
    }

    pub fn get_offset(&self) -> usize {
        self.offset
    }
}

/// Total order over the JSON scalars stored in documents.
/// Numbers sort before strings, missing values sort first.
pub(crate) fn compare_values(
    a: Option<&JsonValue>,
    b: Option<&JsonValue>,
) -> Ordering {
    match (a, b) {
        (Some(JsonValue::Number(x)), Some(JsonValue::Number(y))) => {
            let x = x.as_f64().unwrap_or_default();
            let y = y.as_f64().unwrap_or_default();
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(JsonValue::String(x)), Some(JsonValue::String(y))) => x.cmp(y),
        (Some(JsonValue::Number(_)), Some(_)) => Ordering::Less,
        (Some(_), Some(JsonValue::Number(_))) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_builder() {
        let q = Query::new().eq("wid", "w1").order("version", true).limit(10).offset(5);
        assert_eq!(q.filters(), &[("wid".to_string(), json!("w1"))]);
        assert_eq!(q.order_by(), &[("version".to_string(), true)]);
        assert_eq!(q.get_limit(), Some(10));
        assert_eq!(q.get_offset(), 5);
    }

    #[test]
    fn test_compare_numbers_numerically() {
        assert_eq!(compare_values(Some(&json!(2)), Some(&json!(10))), Ordering::Less);
        assert_eq!(compare_values(Some(&json!("b")), Some(&json!("a"))), Ordering::Greater);
        assert_eq!(compare_values(None, Some(&json!(1))), Ordering::Less);
    }
}
