//! Error types for the querykit crate.
//!
//! Two families of errors exist and they never mix:
//!
//! - [`FieldError`] is a per-field, per-request failure. It is captured into
//!   that field's [`ResultOrError`](crate::ResultOrError) and never aborts a
//!   parse pass.
//! - [`SchemaError`] is a configuration failure raised while building a
//!   schema, a type mapper or a factory, before any input is parsed.

use std::fmt;

use thiserror::Error;

/// Failure of a single field during validation, mapping or post-validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    /// No type mapper is registered under the requested key.
    #[error("field not found")]
    NotFound,

    /// The field name itself is malformed (e.g. unknown operator suffix).
    #[error("invalid field: {0}")]
    InvalidField(String),

    /// The value list has the wrong arity or shape.
    #[error("invalid values: {0}")]
    InvalidValues(String),

    /// Converting the raw values into a domain value failed.
    #[error("{0}")]
    Mapping(String),

    /// The mapped value was rejected by a post-mapping predicate.
    #[error("{0}")]
    Validation(String),

    /// A type predicate saw a value of another type.
    #[error("unexpected type, expected {expected}")]
    UnexpectedType { expected: &'static str },

    /// A nested sub-query went deeper than the configured limit.
    #[error("sub-query nesting exceeds the limit of {limit}")]
    DepthExceeded { limit: usize },
}

impl FieldError {
    /// Create an invalid-field error.
    pub fn invalid_field(msg: impl Into<String>) -> Self {
        Self::InvalidField(msg.into())
    }

    /// Create an invalid-values error.
    pub fn invalid_values(msg: impl Into<String>) -> Self {
        Self::InvalidValues(msg.into())
    }

    /// Create a mapping error from anything printable.
    ///
    /// Handy with `map_err`: `raw.parse::<i64>().map_err(FieldError::mapping)`.
    pub fn mapping(err: impl fmt::Display) -> Self {
        Self::Mapping(err.to_string())
    }

    /// Create a post-validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Returns `true` for the factory's lookup-miss sentinel.
    pub fn is_not_found(&self) -> bool {
        matches!(self, FieldError::NotFound)
    }
}

/// Errors raised while configuring schemas, type mappers and factories.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// A type mapper was built without its required map function.
    #[error("map function not set for '{key}'")]
    MissingMapFunc { key: String },

    /// A pattern key is not a valid regular expression.
    #[error("invalid field pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, SchemaError>;
