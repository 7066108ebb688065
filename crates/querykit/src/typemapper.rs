//! Type mapper units.
//!
//! A [`TypeMapper`] is the atomic building block of a parse: given a field
//! name and its raw values it can check the field name, check the values and
//! convert them into a domain value. [`CustomTypeMapper`] is the closure-backed
//! implementation assembled by [`TypeMapperBuilder`].

use std::fmt;
use std::rc::Rc;

use crate::error::{FieldError, SchemaError};

/// Checks the shape of a field name, e.g. its `[op]` suffix.
pub type ValidateFieldFn = Rc<dyn Fn(&str) -> Result<(), FieldError>>;

/// Checks the arity or shape of a field's raw values.
pub type ValidateValuesFn = Rc<dyn Fn(&[String]) -> Result<(), FieldError>>;

/// Converts a field and its raw values into a domain value.
///
/// `Ok(None)` means "succeeded, nothing to record".
pub type TypeMapFn<T> = Rc<dyn Fn(&str, &[String]) -> Result<Option<T>, FieldError>>;

/// Validation and conversion for one field.
///
/// Both validation methods default to "always valid", so implementors only
/// have to provide [`map`](Self::map).
///
/// # Example
///
/// ```
/// use querykit::{FieldError, TypeMapper};
///
/// struct Offset;
///
/// impl TypeMapper<i64> for Offset {
///     fn validate_values(&self, values: &[String]) -> Result<(), FieldError> {
///         if values.len() != 1 {
///             return Err(FieldError::invalid_values("expected one value"));
///         }
///         Ok(())
///     }
///
///     fn map(&self, _field: &str, values: &[String]) -> Result<Option<i64>, FieldError> {
///         values[0].parse().map(Some).map_err(FieldError::mapping)
///     }
/// }
///
/// assert!(Offset.validate_values(&["1".into(), "2".into()]).is_err());
/// assert_eq!(Offset.map("offset", &["14".into()]), Ok(Some(14)));
/// ```
pub trait TypeMapper<T> {
    /// Checks the field name. Default: always valid.
    fn validate_field(&self, _field: &str) -> Result<(), FieldError> {
        Ok(())
    }

    /// Checks the raw values. Default: always valid.
    fn validate_values(&self, _values: &[String]) -> Result<(), FieldError> {
        Ok(())
    }

    /// Converts the raw values.
    fn map(&self, field: &str, values: &[String]) -> Result<Option<T>, FieldError>;
}

impl<T, M: TypeMapper<T> + ?Sized> TypeMapper<T> for Box<M> {
    fn validate_field(&self, field: &str) -> Result<(), FieldError> {
        (**self).validate_field(field)
    }

    fn validate_values(&self, values: &[String]) -> Result<(), FieldError> {
        (**self).validate_values(values)
    }

    fn map(&self, field: &str, values: &[String]) -> Result<Option<T>, FieldError> {
        (**self).map(field, values)
    }
}

/// A [`TypeMapper`] backed by closures.
pub struct CustomTypeMapper<T> {
    validate_field: Option<ValidateFieldFn>,
    validate_values: Option<ValidateValuesFn>,
    map: TypeMapFn<T>,
}

impl<T> CustomTypeMapper<T> {
    /// Starts building a mapper.
    pub fn builder() -> TypeMapperBuilder<T> {
        TypeMapperBuilder::new()
    }

    /// Assembles a mapper from already-checked parts.
    pub(crate) fn from_parts(
        validate_field: Option<ValidateFieldFn>,
        validate_values: Option<ValidateValuesFn>,
        map: TypeMapFn<T>,
    ) -> Self {
        Self {
            validate_field,
            validate_values,
            map,
        }
    }
}

impl<T> TypeMapper<T> for CustomTypeMapper<T> {
    fn validate_field(&self, field: &str) -> Result<(), FieldError> {
        match &self.validate_field {
            Some(f) => f(field),
            None => Ok(()),
        }
    }

    fn validate_values(&self, values: &[String]) -> Result<(), FieldError> {
        match &self.validate_values {
            Some(f) => f(values),
            None => Ok(()),
        }
    }

    fn map(&self, field: &str, values: &[String]) -> Result<Option<T>, FieldError> {
        (self.map)(field, values)
    }
}

impl<T> fmt::Debug for CustomTypeMapper<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomTypeMapper")
            .field("validate_field", &self.validate_field.is_some())
            .field("validate_values", &self.validate_values.is_some())
            .finish_non_exhaustive()
    }
}

/// Fluent builder for [`CustomTypeMapper`].
///
/// The map function is required; [`build`](Self::build) fails without it.
///
/// ```
/// use querykit::{CustomTypeMapper, FieldError, TypeMapper};
///
/// let mapper = CustomTypeMapper::builder()
///     .validate_values(|values| match values.len() {
///         1 => Ok(()),
///         _ => Err(FieldError::invalid_values("expected one value")),
///     })
///     .map_with(|_field, values| Ok(Some(values[0].clone())))
///     .build()
///     .unwrap();
///
/// assert_eq!(mapper.map("f", &["v".into()]), Ok(Some("v".to_string())));
/// assert!(CustomTypeMapper::<String>::builder().build().is_err());
/// ```
pub struct TypeMapperBuilder<T> {
    validate_field: Option<ValidateFieldFn>,
    validate_values: Option<ValidateValuesFn>,
    map: Option<TypeMapFn<T>>,
}

impl<T> Default for TypeMapperBuilder<T> {
    fn default() -> Self {
        Self {
            validate_field: None,
            validate_values: None,
            map: None,
        }
    }
}

impl<T> TypeMapperBuilder<T> {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the field-name check. Optional.
    pub fn validate_field<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) -> Result<(), FieldError> + 'static,
    {
        self.validate_field = Some(Rc::new(f));
        self
    }

    /// Sets the value-list check. Optional.
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

    /// Finishes the mapper.
    pub fn build(self) -> Result<CustomTypeMapper<T>, SchemaError> {
        let map = self.map.ok_or_else(|| SchemaError::MissingMapFunc {
            key: "<type mapper>".to_string(),
        })?;
        Ok(CustomTypeMapper::from_parts(
            self.validate_field,
            self.validate_values,
            map,
        ))
    }
}
