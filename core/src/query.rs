//! Query-string and path-segment encoding, and the options shared by the
//! list endpoints.

use serde::Serialize;

use crate::error::ApiError;

/// A scalar query-parameter value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum QueryValue {
    Str(String),
    Int(u64),
}

impl From<&str> for QueryValue {
    fn from(value: &str) -> Self {
        QueryValue::Str(value.to_string())
    }
}

impl From<String> for QueryValue {
    fn from(value: String) -> Self {
        QueryValue::Str(value)
    }
}

impl From<u64> for QueryValue {
    fn from(value: u64) -> Self {
        QueryValue::Int(value)
    }
}

/// Options accepted by the latest, popular and recommend endpoints.
///
/// Every field is independently optional. Absent fields are left out of the
/// query string entirely.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListOptions {
    /// Feedback type recorded for returned items (`write-back-type`).
    pub write_back_type: Option<String>,
    /// Delay before the write-back feedback becomes effective, e.g. `"10m"`.
    pub write_back_delay: Option<String>,
    pub n: Option<u64>,
    pub offset: Option<u64>,
}

impl ListOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_back_type(mut self, value: impl Into<String>) -> Self {
        self.write_back_type = Some(value.into());
        self
    }

    pub fn write_back_delay(mut self, value: impl Into<String>) -> Self {
        self.write_back_delay = Some(value.into());
        self
    }

    pub fn n(mut self, value: u64) -> Self {
        self.n = Some(value);
        self
    }

    pub fn offset(mut self, value: u64) -> Self {
        self.offset = Some(value);
        self
    }

    /// Present options as ordered pairs: write-back-type, write-back-delay, n, offset.
    pub fn to_query(&self) -> Vec<(&'static str, QueryValue)> {
        let mut query = Vec::with_capacity(4);
        if let Some(value) = &self.write_back_type {
            query.push(("write-back-type", QueryValue::from(value.as_str())));
        }
        if let Some(value) = &self.write_back_delay {
            query.push(("write-back-delay", QueryValue::from(value.as_str())));
        }
        if let Some(value) = self.n {
            query.push(("n", QueryValue::Int(value)));
        }
        if let Some(value) = self.offset {
            query.push(("offset", QueryValue::Int(value)));
        }
        query
    }
}

/// Form-encode `pairs` in order, joined with `&`. Empty input gives `""`.
pub fn encode_query(pairs: &[(&str, QueryValue)]) -> Result<String, ApiError> {
    Ok(serde_urlencoded::to_string(pairs)?)
}

/// Percent-encode one path segment so identifiers cannot alter the path.
pub fn encode_segment(segment: &str) -> String {
    urlencoding::encode(segment).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_options_produce_no_pairs() {
        assert!(ListOptions::default().to_query().is_empty());
        assert_eq!(encode_query(&[]).unwrap(), "");
    }

    #[test]
    fn all_options_follow_canonical_order() {
        let options = ListOptions::new()
            .offset(20)
            .n(10)
            .write_back_delay("10m")
            .write_back_type("read");
        let query = encode_query(&options.to_query()).unwrap();
        assert_eq!(query, "write-back-type=read&write-back-delay=10m&n=10&offset=20");
    }

    #[test]
    fn absent_options_are_omitted() {
        let options = ListOptions::new().write_back_delay("10m").n(5);
        let query = encode_query(&options.to_query()).unwrap();
        assert_eq!(query, "write-back-delay=10m&n=5");
        assert!(!query.contains("write-back-type"));
        assert!(!query.contains("offset"));
    }

    #[test]
    fn zero_is_a_present_value() {
        let options = ListOptions::new().offset(0);
        assert_eq!(encode_query(&options.to_query()).unwrap(), "offset=0");
    }

    #[test]
    fn values_are_percent_encoded() {
        let options = ListOptions::new().write_back_type("read & like");
        let query = encode_query(&options.to_query()).unwrap();
        assert_eq!(query, "write-back-type=read+%26+like");
    }

    #[test]
    fn segments_escape_reserved_characters() {
        assert_eq!(encode_segment("alice"), "alice");
        assert_eq!(encode_segment("a/b"), "a%2Fb");
        assert_eq!(encode_segment("x y?z"), "x%20y%3Fz");
        assert_eq!(encode_segment("caf\u{e9}"), "caf%C3%A9");
    }
}
