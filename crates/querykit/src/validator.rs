//! Post-mapping validation.
//!
//! Predicates here run on values that have already been converted, unlike
//! the field and value checks of a [`TypeMapper`](crate::TypeMapper), which
//! run on raw strings before conversion. Everything in this module is pure.

use std::any::{self, Any};
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::error::FieldError;

/// A predicate over an already mapped value.
pub type ValidateFn<T> = Rc<dyn Fn(&T) -> Result<(), FieldError>>;

/// Wraps a closure as a [`ValidateFn`].
pub fn validate_fn<T, F>(f: F) -> ValidateFn<T>
where
    T: ?Sized,
    F: Fn(&T) -> Result<(), FieldError> + 'static,
{
    Rc::new(f)
}

/// Per-field post-mapping predicates.
///
/// A field may be registered without a predicate; it then validates like an
/// unregistered field.
///
/// # Example
///
/// ```
/// use querykit::validator::{validate_fn, Validations};
/// use querykit::FieldError;
///
/// let validations = Validations::new()
///     .with("offset", validate_fn(|v: &i64| {
///         if *v < 0 {
///             return Err(FieldError::validation("offset can't be lower than zero"));
///         }
///         Ok(())
///     }))
///     .without("limit");
///
/// assert!(validations.validate("offset", &14).is_ok());
/// assert!(validations.validate("offset", &-5).is_err());
/// assert!(validations.validate("limit", &-5).is_ok());
/// assert!(validations.validate("unknown", &-5).is_ok());
/// ```
pub struct Validations<T: ?Sized> {
    rules: IndexMap<String, Option<ValidateFn<T>>>,
}

impl<T: ?Sized> Default for Validations<T> {
    fn default() -> Self {
        Self {
            rules: IndexMap::new(),
        }
    }
}

impl<T: ?Sized> Validations<T> {
    /// Creates an empty rule set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a predicate for `field`.
    pub fn with(mut self, field: impl Into<String>, f: ValidateFn<T>) -> Self {
        self.rules.insert(field.into(), Some(f));
        self
    }

    /// Registers `field` with no predicate.
    pub fn without(mut self, field: impl Into<String>) -> Self {
        self.rules.insert(field.into(), None);
        self
    }

    /// Returns the predicate of `field`, if one is set.
    pub fn get(&self, field: &str) -> Option<&ValidateFn<T>> {
        self.rules.get(field).and_then(Option::as_ref)
    }

    /// Validates `value` as the value of `field`.
    ///
    /// Succeeds when `field` has no predicate. The value itself is never
    /// inspected here, only handed to the predicate.
    pub fn validate(&self, field: &str, value: &T) -> Result<(), FieldError> {
        match self.get(field) {
            Some(f) => f(value),
            None => Ok(()),
        }
    }
}

impl<T: ?Sized> fmt::Debug for Validations<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.rules.iter().map(|(k, v)| (k, v.is_some())))
            .finish()
    }
}

/// Composes predicates into one, evaluated left to right.
///
/// The first failure is returned and the remaining predicates are skipped.
pub fn merge_validations<T, I>(funcs: I) -> ValidateFn<T>
where
    T: ?Sized + 'static,
    I: IntoIterator<Item = ValidateFn<T>>,
{
    let funcs: Vec<ValidateFn<T>> = funcs.into_iter().collect();
    Rc::new(move |value: &T| funcs.iter().try_for_each(|f| f(value)))
}

/// Predicate accepting only values of type `U`.
pub fn type_is<U: Any>() -> ValidateFn<dyn Any> {
    Rc::new(|value: &dyn Any| {
        if value.is::<U>() {
            Ok(())
        } else {
            Err(FieldError::UnexpectedType {
                expected: any::type_name::<U>(),
            })
        }
    })
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    fn validations() -> Validations<dyn Any> {
        Validations::new()
            .without("field_1")
            .with("field_2", type_is::<i32>())
            .with(
                "field_3",
                validate_fn(|value: &dyn Any| match value.downcast_ref::<i32>() {
                    Some(n) if *n < 0 => Err(FieldError::validation(
                        "value should be greater then zero",
                    )),
                    _ => Ok(()),
                }),
            )
            .with(
                "field_4",
                merge_validations([
                    type_is::<String>(),
                    validate_fn(|value: &dyn Any| match value.downcast_ref::<String>() {
                        Some(s) if s == "string" => Ok(()),
                        _ => Err(FieldError::validation("expect string")),
                    }),
                ]),
            )
    }

    #[test]
    fn unset_predicate_always_passes() {
        let v = validations();
        assert!(v.validate("field_1", &()).is_ok());
        assert!(v.validate("field_1", &"string").is_ok());
        assert!(v.validate("not_registered", &1).is_ok());
    }

    #[test]
    fn type_predicate() {
        let v = validations();
        assert!(v.validate("field_2", &12i32).is_ok());
        assert_eq!(
            v.validate("field_2", &"string"),
            Err(FieldError::UnexpectedType { expected: "i32" })
        );
    }

    #[test]
    fn value_predicate() {
        let v = validations();
        assert!(v.validate("field_3", &12i32).is_ok());
        assert!(v.validate("field_3", &-1i32).is_err());
    }

    #[test]
    fn merged_predicates() {
        let v = validations();
        assert!(v.validate("field_4", &"string".to_string()).is_ok());
        assert_eq!(
            v.validate("field_4", &"string123".to_string()),
            Err(FieldError::validation("expect string"))
        );
        assert!(matches!(
            v.validate("field_4", &12i32),
            Err(FieldError::UnexpectedType { .. })
        ));
    }

    #[test]
    fn merge_short_circuits() {
        let calls = Rc::new(Cell::new(0));
        let seen = calls.clone();
        let merged: ValidateFn<i64> = merge_validations([
            validate_fn(|_: &i64| Err(FieldError::validation("first"))),
            validate_fn(move |_: &i64| {
                seen.set(seen.get() + 1);
                Ok(())
            }),
        ]);

        assert_eq!(merged(&1), Err(FieldError::validation("first")));
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn merge_of_nothing_passes() {
        let merged: ValidateFn<i64> = merge_validations(Vec::new());
        assert!(merged(&-1).is_ok());
    }
}
