//! Finalize sinks.
//!
//! By default the parser writes every error and every present value into the
//! [`ParseResult`]. A schema item with a [`ResultSink`] takes over that
//! decision for its field: the sink receives every outcome, including
//! [`ResultOrError::Empty`], and may write it to the result, to a structure
//! it owns, or nowhere.
//!
//! Any `Fn(&mut ParseResult<T>, &str, ResultOrError<T>)` closure is a sink.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::result::{ParseResult, ResultOrError};

/// Receives a field's outcome in place of the default result map.
pub trait ResultSink<T> {
    /// Handles the outcome of `field`.
    fn finalize(&self, result: &mut ParseResult<T>, field: &str, outcome: ResultOrError<T>);
}

impl<T, F> ResultSink<T> for F
where
    F: Fn(&mut ParseResult<T>, &str, ResultOrError<T>),
{
    fn finalize(&self, result: &mut ParseResult<T>, field: &str, outcome: ResultOrError<T>) {
        self(result, field, outcome)
    }
}

/// Drops every outcome.
#[derive(Debug, Clone, Copy, Default)]
pub struct Discard;

impl<T> ResultSink<T> for Discard {
    fn finalize(&self, _: &mut ParseResult<T>, _: &str, _: ResultOrError<T>) {}
}

/// Records errors in the result and drops everything else.
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorsOnly;

impl<T> ResultSink<T> for ErrorsOnly {
    fn finalize(&self, result: &mut ParseResult<T>, field: &str, outcome: ResultOrError<T>) {
        if outcome.is_error() {
            result.insert(field, outcome);
        }
    }
}

/// Appends mapped values to a list shared with the caller.
///
/// Errors go to the result map as usual; empty outcomes are dropped. Clones
/// share the same list.
///
/// ```
/// use querykit::sink::{Collector, ResultSink};
/// use querykit::{ParseResult, ResultOrError};
///
/// let collector = Collector::new();
/// let mut result = ParseResult::new();
/// collector.finalize(&mut result, "tag", ResultOrError::Value(1));
/// collector.finalize(&mut result, "tag", ResultOrError::Value(2));
///
/// assert!(result.is_empty());
/// assert_eq!(collector.take(), vec![1, 2]);
/// ```
pub struct Collector<T> {
    items: Rc<RefCell<Vec<T>>>,
}

impl<T> Collector<T> {
    /// Creates a collector with an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of collected values.
    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    /// Returns `true` if nothing was collected.
    pub fn is_empty(&self) -> bool {
        self.items.borrow().is_empty()
    }

    /// Moves the collected values out, leaving the list empty.
    pub fn take(&self) -> Vec<T> {
        self.items.take()
    }
}

impl<T> Default for Collector<T> {
    fn default() -> Self {
        Self {
            items: Rc::new(RefCell::new(Vec::new())),
        }
    }
}

impl<T> Clone for Collector<T> {
    fn clone(&self) -> Self {
        Self {
            items: Rc::clone(&self.items),
        }
    }
}

impl<T> fmt::Debug for Collector<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collector").field("len", &self.len()).finish()
    }
}

impl<T> ResultSink<T> for Collector<T> {
    fn finalize(&self, result: &mut ParseResult<T>, field: &str, outcome: ResultOrError<T>) {
        match outcome {
            ResultOrError::Value(v) => self.items.borrow_mut().push(v),
            ResultOrError::Empty => {}
            err @ ResultOrError::Error(_) => result.insert(field, err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FieldError;

    #[test]
    fn closure_is_a_sink() {
        let sink = |result: &mut ParseResult<u8>, field: &str, outcome: ResultOrError<u8>| {
            result.insert(format!("seen:{field}"), outcome);
        };
        let mut result = ParseResult::new();
        sink.finalize(&mut result, "a", ResultOrError::Empty);
        assert!(result.get("seen:a").unwrap().is_empty());
    }

    #[test]
    fn discard_drops_all() {
        let mut result = ParseResult::new();
        Discard.finalize(&mut result, "a", ResultOrError::Value(1u8));
        Discard.finalize(&mut result, "b", ResultOrError::<u8>::Error(FieldError::NotFound));
        assert!(result.is_empty());
    }

    #[test]
    fn errors_only_keeps_errors() {
        let mut result = ParseResult::new();
        ErrorsOnly.finalize(&mut result, "a", ResultOrError::Value(1u8));
        ErrorsOnly.finalize(&mut result, "b", ResultOrError::Error(FieldError::NotFound));
        assert_eq!(result.len(), 1);
        assert_eq!(result.error("b"), Some(&FieldError::NotFound));
    }

    #[test]
    fn collector_shares_list_and_reports_errors() {
        let collector = Collector::new();
        let handle = collector.clone();
        let mut result = ParseResult::new();

        collector.finalize(&mut result, "a", ResultOrError::Value("x"));
        collector.finalize(&mut result, "a", ResultOrError::Empty);
        collector.finalize(&mut result, "b", ResultOrError::Error(FieldError::NotFound));

        assert_eq!(handle.len(), 1);
        assert_eq!(result.len(), 1);
        assert_eq!(handle.take(), vec!["x"]);
        assert!(collector.is_empty());
    }
}
