//! Per-field outcomes and the accumulated parse result.

use indexmap::IndexMap;

use crate::error::FieldError;

/// Outcome of processing one field.
///
/// A mapping function may succeed without producing a value
/// ([`ResultOrError::Empty`]); combinator fields do this because their real
/// effect is delivered through a finalize sink.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultOrError<T> {
    /// The field mapped to a value.
    Value(T),
    /// The field mapped successfully but produced nothing.
    Empty,
    /// Some stage failed; later stages did not run.
    Error(FieldError),
}

impl<T> ResultOrError<T> {
    /// Returns `true` if this outcome is an error.
    pub fn is_error(&self) -> bool {
        matches!(self, ResultOrError::Error(_))
    }

    /// Returns `true` for the value-less success.
    pub fn is_empty(&self) -> bool {
        matches!(self, ResultOrError::Empty)
    }

    /// Returns the mapped value, if any.
    pub fn value(&self) -> Option<&T> {
        match self {
            ResultOrError::Value(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the error, if any.
    pub fn error(&self) -> Option<&FieldError> {
        match self {
            ResultOrError::Error(e) => Some(e),
            _ => None,
        }
    }

    /// Whether the default result map keeps this outcome.
    pub(crate) fn is_recordable(&self) -> bool {
        !self.is_empty()
    }

    /// Converts into a plain `Result`.
    pub fn into_result(self) -> Result<Option<T>, FieldError> {
        match self {
            ResultOrError::Value(v) => Ok(Some(v)),
            ResultOrError::Empty => Ok(None),
            ResultOrError::Error(e) => Err(e),
        }
    }
}

impl<T> From<Result<Option<T>, FieldError>> for ResultOrError<T> {
    fn from(result: Result<Option<T>, FieldError>) -> Self {
        match result {
            Ok(Some(v)) => ResultOrError::Value(v),
            Ok(None) => ResultOrError::Empty,
            Err(e) => ResultOrError::Error(e),
        }
    }
}

/// Outcomes of one parse call keyed by the original field string.
///
/// Only errors and present values are stored by the parser itself; finalize
/// sinks may insert or remove entries as they see fit.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseResult<T> {
    entries: IndexMap<String, ResultOrError<T>>,
}

impl<T> Default for ParseResult<T> {
    fn default() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }
}

impl<T> ParseResult<T> {
    /// Creates an empty result.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the outcome of `field`, replacing any previous one.
    pub fn insert(&mut self, field: impl Into<String>, outcome: ResultOrError<T>) {
        self.entries.insert(field.into(), outcome);
    }

    /// Removes and returns the outcome of `field`.
    pub fn remove(&mut self, field: &str) -> Option<ResultOrError<T>> {
        self.entries.shift_remove(field)
    }

    /// Returns the outcome of `field`.
    pub fn get(&self, field: &str) -> Option<&ResultOrError<T>> {
        self.entries.get(field)
    }

    /// Returns the mapped value of `field`, if it succeeded with one.
    pub fn value(&self, field: &str) -> Option<&T> {
        self.get(field).and_then(ResultOrError::value)
    }

    /// Returns the error of `field`, if it failed.
    pub fn error(&self, field: &str) -> Option<&FieldError> {
        self.get(field).and_then(ResultOrError::error)
    }

    /// Returns `true` if an outcome is stored for `field`.
    pub fn contains_key(&self, field: &str) -> bool {
        self.entries.contains_key(field)
    }

    /// Returns `true` if any stored outcome is an error.
    pub fn has_errors(&self) -> bool {
        self.entries.values().any(ResultOrError::is_error)
    }

    /// Iterates over the stored errors.
    pub fn errors(&self) -> impl Iterator<Item = (&str, &FieldError)> {
        self.entries
            .iter()
            .filter_map(|(k, v)| v.error().map(|e| (k.as_str(), e)))
    }

    /// Iterates over all stored outcomes in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ResultOrError<T>)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of stored outcomes.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing was stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T> IntoIterator for ParseResult<T> {
    type Item = (String, ResultOrError<T>);
    type IntoIter = indexmap::map::IntoIter<String, ResultOrError<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
