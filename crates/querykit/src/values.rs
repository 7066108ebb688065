//! Ordered multi-valued input map.
//!
//! [`QueryValues`] is the parser's input: decoded query parameters, one entry
//! per distinct key, each holding the values in the order they appeared.
//! Decoding the URL itself is the caller's job.

use indexmap::map::{Entry, IndexMap};

/// Decoded query parameters: `key -> [value, ...]`.
///
/// Keys keep the order of their first appearance, which is also the order in
/// which [`Parser`](crate::Parser) processes them.
///
/// # Example
///
/// ```
/// use querykit::QueryValues;
///
/// let values: QueryValues = [("name[eq]", "foo"), ("or", "a=1"), ("or", "b=2")]
///     .into_iter()
///     .collect();
///
/// assert_eq!(values.len(), 2);
/// assert_eq!(values.get("or"), Some(&["a=1".to_string(), "b=2".to_string()][..]));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryValues {
    entries: IndexMap<String, Vec<String>>,
}

impl QueryValues {
    /// Creates an empty value map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a map holding a single `key=value` pair.
    ///
    /// This is the input shape of a nested sub-query.
    pub fn single(key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut values = Self::new();
        values.add(key, value);
        values
    }

    /// Appends a value to `key`, creating the entry if needed.
    pub fn add(&mut self, key: impl Into<String>, value: impl Into<String>) {
        match self.entries.entry(key.into()) {
            Entry::Occupied(mut entry) => entry.get_mut().push(value.into()),
            Entry::Vacant(entry) => {
                entry.insert(vec![value.into()]);
            }
        }
    }

    /// Replaces all values of `key`.
    pub fn insert(&mut self, key: impl Into<String>, values: Vec<String>) {
        self.entries.insert(key.into(), values);
    }

    /// Returns the values of `key`, if present.
    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.entries.get(key).map(Vec::as_slice)
    }

    /// Returns the first value of `key`, if present.
    pub fn first(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(|v| v.first()).map(String::as_str)
    }

    /// Returns `true` if `key` is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Iterates over `(key, values)` in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if there are no keys.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for QueryValues
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut values = QueryValues::new();
        values.extend(iter);
        values
    }
}

impl<K, V> Extend<(K, V)> for QueryValues
where
    K: Into<String>,
    V: Into<String>,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.add(key, value);
        }
    }
}
