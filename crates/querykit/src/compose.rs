//! Nested sub-queries.
//!
//! A combinator field carries a whole query in its value:
//!
//! ```text
//! or=name[like]=dan*,age[gt]=30
//!    └─────┬──────┘ └───┬────┘
//!      child 1       child 2
//! ```
//!
//! Each delimited `field=value` entry becomes a single-entry [`QueryValues`]
//! that the caller parses with a fresh, independent parser. A [`Composer`]
//! tracks how deep the nesting has gone so that hostile input cannot recurse
//! without bound.

use crate::error::FieldError;
use crate::values::QueryValues;

/// Default sub-expression delimiter.
pub const DEFAULT_DELIMITER: char = ',';

/// Splits a combinator value into `(field, value)` sub-expressions.
///
/// Entries are trimmed and split on their first `=`. Empty entries and
/// entries without `=` are dropped.
///
/// ```
/// use querykit::compose::split_sub_expressions;
///
/// let parts: Vec<_> = split_sub_expressions("name[eq]=a, bogus ,age[gt]=x=y", ',').collect();
/// assert_eq!(parts, vec![("name[eq]", "a"), ("age[gt]", "x=y")]);
/// ```
pub fn split_sub_expressions(raw: &str, delimiter: char) -> impl Iterator<Item = (&str, &str)> {
    raw.split(delimiter)
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .filter_map(|entry| {
            let split = entry.split_once('=');
            if split.is_none() {
                tracing::debug!(entry, "dropping malformed sub-expression");
            }
            split
        })
}

/// Builds child queries for combinator fields and bounds their nesting.
///
/// A composer is a small value: copy it into schema closures and hand the
/// child composer it produces to the nested parse.
///
/// # Example
///
/// ```
/// use querykit::compose::Composer;
///
/// let root = Composer::new(';').max_depth(1);
/// let children = root
///     .children("a=1;b=2", |child, input| {
///         assert_eq!(child.depth(), 1);
///         input.iter().map(|(k, _)| k.to_string()).collect::<String>()
///     })
///     .unwrap();
/// assert_eq!(children, vec!["a", "b"]);
///
/// let nested = Composer::new(';').max_depth(1).descend().unwrap();
/// assert!(nested.children("a=1", |_, _| ()).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Composer {
    delimiter: char,
    max_depth: Option<usize>,
    depth: usize,
}

impl Default for Composer {
    fn default() -> Self {
        Self::new(DEFAULT_DELIMITER)
    }
}

impl Composer {
    /// Creates a root composer with no depth limit.
    pub fn new(delimiter: char) -> Self {
        Self {
            delimiter,
            max_depth: None,
            depth: 0,
        }
    }

    /// Limits nesting to `limit` levels below the root.
    pub fn max_depth(mut self, limit: usize) -> Self {
        self.max_depth = Some(limit);
        self
    }

    /// Nesting level of this composer; the root is 0.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Separator between sub-expressions.
    pub fn delimiter(&self) -> char {
        self.delimiter
    }

    /// The nesting limit, if any.
    pub fn limit(&self) -> Option<usize> {
        self.max_depth
    }

    /// Returns the composer for the next nesting level.
    pub fn descend(&self) -> Result<Self, FieldError> {
        let depth = self.depth + 1;
        if let Some(limit) = self.max_depth {
            if depth > limit {
                tracing::warn!(depth, limit, "sub-query nesting limit reached");
                return Err(FieldError::DepthExceeded { limit });
            }
        }
        Ok(Self { depth, ..*self })
    }

    /// Builds one child per sub-expression of `raw`, in order.
    ///
    /// `build` receives the child-level composer and the sub-expression as
    /// single-entry query values; it is expected to run a nested parse.
    pub fn children<C, F>(&self, raw: &str, mut build: F) -> Result<Vec<C>, FieldError>
    where
        F: FnMut(Composer, QueryValues) -> C,
    {
        let child = self.descend()?;
        Ok(split_sub_expressions(raw, self.delimiter)
            .map(|(field, value)| build(child, QueryValues::single(field, value)))
            .collect())
    }
}
