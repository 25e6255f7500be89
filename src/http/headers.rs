//! Ordered response header accumulation.
//!
//! # Design Decisions
//! - Insertion order is kept: it feeds the ETag and must be deterministic
//! - Names keep the caller's casing; setting an existing name (exact text)
//!   replaces its value in place, a differently-cased name is a new entry
//! - Values are a single string or a list (sent as repeated header lines)

use axum::http::header::{HeaderMap, HeaderName, HeaderValue};

/// A header value: one string or a list of strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    One(String),
    Many(Vec<String>),
}

impl FieldValue {
    /// Each individual value, in order.
    pub fn values(&self) -> impl Iterator<Item = &str> {
        let (one, many) = match self {
            FieldValue::One(v) => (Some(v.as_str()), [].iter()),
            FieldValue::Many(vs) => (None, vs.iter()),
        };
        one.into_iter().chain(many.map(String::as_str))
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::One(value.to_owned())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::One(value)
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(values: Vec<String>) -> Self {
        FieldValue::Many(values)
    }
}

impl From<Vec<&str>> for FieldValue {
    fn from(values: Vec<&str>) -> Self {
        FieldValue::Many(values.into_iter().map(str::to_owned).collect())
    }
}

macro_rules! numeric_field_value {
    ($($ty:ty),*) => {
        $(impl From<$ty> for FieldValue {
            fn from(value: $ty) -> Self {
                FieldValue::One(value.to_string())
            }
        })*
    };
}

numeric_field_value!(u16, u32, u64, usize, i32, i64);

/// Insertion-ordered header collection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, FieldValue)>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`Headers::set`].
    pub fn with(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.set(name, value);
        self
    }

    /// Set a header, replacing the value of an entry with the same name.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Assign every entry of `other`, in its order.
    pub fn merge(&mut self, other: Headers) {
        for (name, value) in other.entries {
            self.set(name, value);
        }
    }

    /// Value stored under exactly `name`.
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Whether any entry matches `name` ignoring ASCII case.
    pub fn contains_ignore_case(&self, name: &str) -> bool {
        self.entries.iter().any(|(n, _)| n.eq_ignore_ascii_case(name))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Copy every entry into a transport header map.
    ///
    /// Entries that are not valid HTTP header names or values are skipped.
    pub fn write_to(&self, map: &mut HeaderMap) {
        for (name, value) in &self.entries {
            let Ok(header_name) = HeaderName::from_bytes(name.as_bytes()) else {
                tracing::warn!(header = %name, "Skipping invalid header name");
                continue;
            };
            map.remove(&header_name);
            for item in value.values() {
                match HeaderValue::from_str(item) {
                    Ok(v) => {
                        map.append(header_name.clone(), v);
                    }
                    Err(_) => tracing::warn!(header = %name, "Skipping invalid header value"),
                }
            }
        }
    }
}

impl<K, V, const N: usize> From<[(K, V); N]> for Headers
where
    K: Into<String>,
    V: Into<FieldValue>,
{
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

impl<K, V> FromIterator<(K, V)> for Headers
where
    K: Into<String>,
    V: Into<FieldValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (name, value) in iter {
            headers.set(name, value);
        }
        headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_replaces_in_place() {
        let mut headers = Headers::new()
            .with("A", "1")
            .with("B", "2");
        headers.set("A", "3");

        let names: Vec<_> = headers.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["A", "B"]);
        assert_eq!(headers.get("A"), Some(&FieldValue::from("3")));
    }

    #[test]
    fn names_are_exact_but_lookup_can_ignore_case() {
        let headers = Headers::from([("Content-Type", "text/plain")]);
        assert!(headers.get("content-type").is_none());
        assert!(headers.contains_ignore_case("content-type"));
    }

    #[test]
    fn merge_assigns_in_order() {
        let mut headers = Headers::from([("X-One", "1")]);
        headers.merge(Headers::from([("X-Two", "2"), ("X-One", "uno")]));
        let pairs: Vec<_> = headers
            .iter()
            .map(|(n, v)| (n.to_owned(), v.clone()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("X-One".to_owned(), FieldValue::from("uno")),
                ("X-Two".to_owned(), FieldValue::from("2")),
            ]
        );
    }

    #[test]
    fn write_to_appends_list_values_and_skips_invalid() {
        let headers = Headers::new()
            .with("Set-Cookie", vec!["a=1", "b=2"])
            .with("Content-Length", 5u64)
            .with("bad header", "x");

        let mut map = HeaderMap::new();
        headers.write_to(&mut map);

        let cookies: Vec<_> = map.get_all("set-cookie").iter().collect();
        assert_eq!(cookies, vec!["a=1", "b=2"]);
        assert_eq!(map.get("content-length").unwrap(), "5");
        assert_eq!(map.len(), 3);
    }
}
