//! Declarative per-field parse schema.
//!
//! A [`Schema`] is an ordered list of `(key, item)` pairs. Each
//! [`SchemaItem`] says whether its key is an exact field name or a pattern
//! and carries the functions that validate, convert and post-validate the
//! field, plus an optional [`ResultSink`] that takes over the outcome.
//!
//! Resolution order is declaration order: pattern items are tried first, in
//! the order they were declared, and the first match wins; exact items are
//! looked up afterwards.

use std::fmt;
use std::rc::Rc;

use crate::error::{FieldError, SchemaError};
use crate::factory::FieldKey;
use crate::sink::ResultSink;
use crate::typemapper::{CustomTypeMapper, TypeMapFn, ValidateFieldFn, ValidateValuesFn};
use crate::validator::ValidateFn;

/// Behavior of one schema key.
///
/// Only the map function is required; every other hook defaults to a no-op.
///
/// ```
/// use querykit::{FieldError, SchemaItem};
///
/// let offset = SchemaItem::exact()
///     .validate_values(|values| match values.len() {
///         1 => Ok(()),
///         _ => Err(FieldError::invalid_values("too many values")),
///     })
///     .map_with(|_, values| values[0].parse::<i64>().map(Some).map_err(FieldError::mapping))
///     .post_validate(|value| {
///         if *value < 0 {
///             return Err(FieldError::validation("offset can't be lower than zero"));
///         }
///         Ok(())
///     });
///
/// assert!(!offset.is_regex());
/// ```
pub struct SchemaItem<T> {
    is_regex: bool,
    validate_field: Option<ValidateFieldFn>,
    validate_values: Option<ValidateValuesFn>,
    map: Option<TypeMapFn<T>>,
    post_validation: Option<ValidateFn<T>>,
    finalize: Option<Rc<dyn ResultSink<T>>>,
}

impl<T> SchemaItem<T> {
    fn with_regex(is_regex: bool) -> Self {
        Self {
            is_regex,
            validate_field: None,
            validate_values: None,
            map: None,
            post_validation: None,
            finalize: None,
        }
    }

    /// An item whose key is an exact field name.
    pub fn exact() -> Self {
        Self::with_regex(false)
    }

    /// An item whose key is a field pattern.
    pub fn pattern() -> Self {
        Self::with_regex(true)
    }

    /// Returns `true` if the key is a pattern.
    pub fn is_regex(&self) -> bool {
        self.is_regex
    }

    /// Sets the field-name check.
    pub fn validate_field<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) -> Result<(), FieldError> + 'static,
    {
        self.validate_field = Some(Rc::new(f));
        self
    }

    /// Sets the value-list check.
    pub fn validate_values<F>(mut self, f: F) -> Self
    where
        F: Fn(&[String]) -> Result<(), FieldError> + 'static,
    {
        self.validate_values = Some(Rc::new(f));
        self
    }

    /// Sets the map function. Required.
    pub fn map_with<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, &[String]) -> Result<Option<T>, FieldError> + 'static,
    {
        self.map = Some(Rc::new(f));
        self
    }

    /// Sets the post-mapping predicate.
    pub fn post_validate<F>(mut self, f: F) -> Self
    where
        F: Fn(&T) -> Result<(), FieldError> + 'static,
    {
        self.post_validation = Some(Rc::new(f));
        self
    }

    /// Sets an already shared post-mapping predicate, e.g. one from
    /// [`merge_validations`](crate::validator::merge_validations).
    pub fn post_validate_with(mut self, f: ValidateFn<T>) -> Self {
        self.post_validation = Some(f);
        self
    }

    /// Hands every outcome of this field to `sink` instead of the result map.
    pub fn finalize<S>(mut self, sink: S) -> Self
    where
        S: ResultSink<T> + 'static,
    {
        self.finalize = Some(Rc::new(sink));
        self
    }
}

impl<T> Clone for SchemaItem<T> {
    fn clone(&self) -> Self {
        Self {
            is_regex: self.is_regex,
            validate_field: self.validate_field.clone(),
            validate_values: self.validate_values.clone(),
            map: self.map.clone(),
            post_validation: self.post_validation.clone(),
            finalize: self.finalize.clone(),
        }
    }
}

impl<T> fmt::Debug for SchemaItem<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaItem")
            .field("is_regex", &self.is_regex)
            .field("validate_field", &self.validate_field.is_some())
            .field("validate_values", &self.validate_values.is_some())
            .field("map", &self.map.is_some())
            .field("post_validation", &self.post_validation.is_some())
            .field("finalize", &self.finalize.is_some())
            .finish()
    }
}

/// A checked schema entry: compiled key plus its item.
pub struct SchemaEntry<T> {
    key: FieldKey,
    item: SchemaItem<T>,
    map: TypeMapFn<T>,
}

impl<T> SchemaEntry<T> {
    /// The canonical key of this entry.
    pub fn key(&self) -> &FieldKey {
        &self.key
    }

    /// Returns `true` if the key is a pattern.
    pub fn is_regex(&self) -> bool {
        self.item.is_regex
    }

    /// Builds a fresh type mapper unit from this entry's functions.
    pub fn type_mapper(&self) -> CustomTypeMapper<T> {
        CustomTypeMapper::from_parts(
            self.item.validate_field.clone(),
            self.item.validate_values.clone(),
            Rc::clone(&self.map),
        )
    }

    /// Runs the post-mapping predicate, if any.
    pub fn post_validate(&self, value: &T) -> Result<(), FieldError> {
        match &self.item.post_validation {
            Some(f) => f(value),
            None => Ok(()),
        }
    }

    /// The finalize sink, if any.
    pub fn sink(&self) -> Option<&dyn ResultSink<T>> {
        self.item.finalize.as_deref()
    }
}

/// Ordered, checked collection of schema entries.
///
/// Built with [`Schema::builder`]; building compiles every pattern and
/// rejects items without a map function.
///
/// ```
/// use querykit::{FieldError, Schema, SchemaItem};
///
/// let schema: Schema<String> = Schema::builder()
///     .item(r"name\[.*\]", SchemaItem::pattern().map_with(|_, v| Ok(Some(v[0].clone()))))
///     .item("or", SchemaItem::exact().map_with(|_, _| Ok(None)))
///     .build()
///     .unwrap();
///
/// assert_eq!(schema.resolve("name[eq]").unwrap().key().as_str(), r"name\[.*\]");
/// assert_eq!(schema.resolve("or").unwrap().key().as_str(), "or");
/// assert!(schema.resolve("limit").is_none());
///
/// let missing = Schema::<String>::builder().item("x", SchemaItem::exact()).build();
/// assert!(missing.is_err());
/// ```
pub struct Schema<T> {
    entries: Vec<SchemaEntry<T>>,
}

impl<T> Schema<T> {
    /// Starts a schema.
    pub fn builder() -> SchemaBuilder<T> {
        SchemaBuilder::new()
    }

    /// Finds the entry responsible for `field`.
    ///
    /// Pattern entries are tried in declaration order, then exact entries.
    pub fn resolve(&self, field: &str) -> Option<&SchemaEntry<T>> {
        self.entries
            .iter()
            .find(|entry| entry.is_regex() && entry.key.matches(field))
            .or_else(|| {
                self.entries
                    .iter()
                    .find(|entry| !entry.is_regex() && entry.key.as_str() == field)
            })
    }

    /// Entries in declaration order.
    pub fn entries(&self) -> impl Iterator<Item = &SchemaEntry<T>> {
        self.entries.iter()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the schema has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T> fmt::Debug for Schema<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|e| e.key.as_str()))
            .finish()
    }
}

/// Builder for [`Schema`].
pub struct SchemaBuilder<T> {
    items: Vec<(String, SchemaItem<T>)>,
}

impl<T> Default for SchemaBuilder<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T> SchemaBuilder<T> {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares `key`. Declaring the same key twice replaces the first
    /// item but keeps its position.
    pub fn item(mut self, key: impl Into<String>, item: SchemaItem<T>) -> Self {
        let key = key.into();
        match self.items.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = item,
            None => self.items.push((key, item)),
        }
        self
    }

    /// Checks every item and compiles pattern keys.
    pub fn build(self) -> Result<Schema<T>, SchemaError> {
        let entries = self
            .items
            .into_iter()
            .map(|(key, item)| -> Result<SchemaEntry<T>, SchemaError> {
                let map = item
                    .map
                    .clone()
                    .ok_or_else(|| SchemaError::MissingMapFunc { key: key.clone() })?;
                let key = if item.is_regex {
                    FieldKey::pattern(&key)?
                } else {
                    FieldKey::exact(key)
                };
                Ok(SchemaEntry { key, item, map })
            })
            .collect::<Result<Vec<_>, SchemaError>>()?;
        Ok(Schema { entries })
    }
}
