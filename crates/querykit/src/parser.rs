//! The parse dispatch loop.
//!
//! For each input field the [`Parser`]:
//!
//! ```text
//! (field, values)
//!   → resolve schema entry        (no entry → skip, nothing recorded)
//!   → register unit in factory    (under the canonical key)
//!   → validate field and values   (through that key; failure → error outcome)
//!   → map                         (through that key; failure → error outcome)
//!   → post-validate               (failure → error outcome)
//!   → finalize sink, or result map (errors and present values only)
//! ```
//!
//! Fields are processed in input order. A failing field never affects the
//! others.

use crate::factory::{Factory, TypeMapperFactory};
use crate::result::{ParseResult, ResultOrError};
use crate::schema::{Schema, SchemaEntry};
use crate::values::QueryValues;

/// Runs a [`Schema`] over query values.
///
/// # Example
///
/// ```
/// use querykit::{FieldError, Parser, QueryValues, Schema, SchemaItem};
///
/// let schema = Schema::builder()
///     .item(
///         "offset",
///         SchemaItem::exact()
///             .validate_values(|values| match values.len() {
///                 1 => Ok(()),
///                 _ => Err(FieldError::invalid_values("too many values")),
///             })
///             .map_with(|_, values| values[0].parse::<i64>().map(Some).map_err(FieldError::mapping))
///             .post_validate(|offset| {
///                 if *offset < 0 {
///                     return Err(FieldError::validation("offset can't be lower than zero"));
///                 }
///                 Ok(())
///             }),
///     )
///     .build()
///     .unwrap();
///
/// let parser = Parser::new(schema);
/// let input: QueryValues = [("offset", "14"), ("limit", "10")].into_iter().collect();
/// let result = parser.parse(&input);
///
/// assert_eq!(result.value("offset"), Some(&14));
/// assert!(!result.contains_key("limit"));
/// ```
#[derive(Debug)]
pub struct Parser<T> {
    schema: Schema<T>,
}

impl<T> Parser<T> {
    /// Creates a parser for `schema`.
    pub fn new(schema: Schema<T>) -> Self {
        Self { schema }
    }

    /// The schema this parser runs.
    pub fn schema(&self) -> &Schema<T> {
        &self.schema
    }
}

impl<T: 'static> Parser<T> {
    /// Parses `input` with a fresh [`TypeMapperFactory`].
    pub fn parse(&self, input: &QueryValues) -> ParseResult<T> {
        let mut factory = TypeMapperFactory::new();
        self.parse_with(&mut factory, input)
    }

    /// Parses `input`, registering type mappers into `factory`.
    pub fn parse_with<F>(&self, factory: &mut F, input: &QueryValues) -> ParseResult<T>
    where
        F: Factory<T>,
    {
        let mut result = ParseResult::new();

        for (field, values) in input.iter() {
            let Some(entry) = self.schema.resolve(field) else {
                tracing::trace!(field, "no schema entry, skipping");
                continue;
            };

            factory.add_field(entry.key().clone(), Box::new(entry.type_mapper()));

            let outcome = process_field(factory, entry, field, values);
            if let ResultOrError::Error(err) = &outcome {
                tracing::debug!(field, key = %entry.key(), error = %err, "field rejected");
            }

            match entry.sink() {
                Some(sink) => sink.finalize(&mut result, field, outcome),
                None if outcome.is_recordable() => result.insert(field, outcome),
                None => {}
            }
        }

        result
    }
}

fn process_field<T, F>(
    factory: &F,
    entry: &SchemaEntry<T>,
    field: &str,
    values: &[String],
) -> ResultOrError<T>
where
    F: Factory<T>,
{
    let key = entry.key();
    let mapped = factory
        .validate_keyed(key, field, values)
        .and_then(|()| factory.map_keyed(key, field, values));

    let checked = mapped.and_then(|value| match value {
        Some(v) => entry.post_validate(&v).map(|()| Some(v)),
        None => Ok(None),
    });

    checked.into()
}
