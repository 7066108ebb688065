//! The type mapper registry.
//!
//! A [`Factory`] holds [`TypeMapper`] units keyed by a canonical
//! [`FieldKey`] and resolves incoming fields to them, either by exact key or
//! by pattern. [`TypeMapperFactory`] is the stock implementation; the parser
//! creates a fresh one for every parse call.
//!
//! The factory resolves, validates and maps, but it does not enforce that
//! validation runs before mapping. Ordering is the caller's job.

use std::fmt;

use indexmap::IndexMap;
use regex::Regex;

use crate::error::{FieldError, SchemaError};
use crate::typemapper::TypeMapper;

/// Canonical registration key: an exact field name or a field pattern.
#[derive(Debug, Clone)]
pub enum FieldKey {
    /// Matches exactly this field name.
    Exact(String),
    /// Matches every field the pattern finds a match in.
    Pattern(Regex),
}

impl FieldKey {
    /// Creates an exact key.
    pub fn exact(name: impl Into<String>) -> Self {
        FieldKey::Exact(name.into())
    }

    /// Compiles a pattern key.
    pub fn pattern(pattern: &str) -> Result<Self, SchemaError> {
        Regex::new(pattern)
            .map(FieldKey::Pattern)
            .map_err(|source| SchemaError::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            })
    }

    /// The key string: the field name or the pattern source.
    pub fn as_str(&self) -> &str {
        match self {
            FieldKey::Exact(name) => name,
            FieldKey::Pattern(regex) => regex.as_str(),
        }
    }

    /// Returns `true` for pattern keys.
    pub fn is_pattern(&self) -> bool {
        matches!(self, FieldKey::Pattern(_))
    }

    /// Tests whether `field` resolves to this key.
    pub fn matches(&self, field: &str) -> bool {
        match self {
            FieldKey::Exact(name) => name == field,
            FieldKey::Pattern(regex) => regex.is_match(field),
        }
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Registry capabilities the parser relies on.
pub trait Factory<T> {
    /// Registers `mapper` under `key`, replacing any previous registration of
    /// the same key string.
    fn add_field(&mut self, key: FieldKey, mapper: Box<dyn TypeMapper<T>>);

    /// Validates a directly keyed field: field check, then values check.
    fn validate(&self, field: &str, values: &[String]) -> Result<(), FieldError>;

    /// Validates a field through the first matching pattern.
    fn validate_regex_field(&self, field: &str, values: &[String]) -> Result<(), FieldError>;

    /// Maps a directly keyed field.
    fn map_field(&self, field: &str, values: &[String]) -> Result<Option<T>, FieldError>;

    /// Maps a field through the first matching pattern.
    fn map_regex_field(&self, field: &str, values: &[String]) -> Result<Option<T>, FieldError>;

    /// Validates `field` with the unit registered under `key`.
    ///
    /// The default resolves `field` by name again; registries that can look
    /// up a key directly should override it so overlapping patterns resolve
    /// to the unit the caller registered.
    fn validate_keyed(
        &self,
        key: &FieldKey,
        field: &str,
        values: &[String],
    ) -> Result<(), FieldError> {
        if key.is_pattern() {
            self.validate_regex_field(field, values)
        } else {
            self.validate(field, values)
        }
    }

    /// Maps `field` with the unit registered under `key`.
    fn map_keyed(
        &self,
        key: &FieldKey,
        field: &str,
        values: &[String],
    ) -> Result<Option<T>, FieldError> {
        if key.is_pattern() {
            self.map_regex_field(field, values)
        } else {
            self.map_field(field, values)
        }
    }
}

struct Registered<T> {
    key: FieldKey,
    mapper: Box<dyn TypeMapper<T>>,
}

/// Ordered registry of type mappers.
///
/// Pattern lookups by field name walk the registered patterns in
/// registration order and use the first that matches; keyed lookups go
/// straight to the unit stored under the given key. Re-registering a key
/// keeps its position.
///
/// # Example
///
/// ```
/// use querykit::{CustomTypeMapper, Factory, FieldError, TypeMapperFactory};
///
/// let factory = TypeMapperFactory::new()
///     .with_field(
///         "limit",
///         CustomTypeMapper::builder()
///             .map_with(|_, values| values[0].parse::<i64>().map(Some).map_err(FieldError::mapping))
///             .build()
///             .unwrap(),
///     )
///     .with_pattern(
///         r"age\[.*\]",
///         CustomTypeMapper::builder()
///             .map_with(|_, values| values[0].parse::<i64>().map(Some).map_err(FieldError::mapping))
///             .build()
///             .unwrap(),
///     )
///     .unwrap();
///
/// assert_eq!(factory.map_field("limit", &["10".into()]), Ok(Some(10)));
/// assert_eq!(factory.map_regex_field("age[lte]", &["30".into()]), Ok(Some(30)));
/// assert_eq!(factory.map_field("offset", &["1".into()]), Err(FieldError::NotFound));
/// ```
pub struct TypeMapperFactory<T> {
    entries: IndexMap<String, Registered<T>>,
}

impl<T> Default for TypeMapperFactory<T> {
    fn default() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }
}

impl<T> TypeMapperFactory<T> {
    /// Creates an empty factory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an exact field.
    pub fn with_field<M>(mut self, field: impl Into<String>, mapper: M) -> Self
    where
        M: TypeMapper<T> + 'static,
    {
        self.add_field(FieldKey::exact(field), Box::new(mapper));
        self
    }

    /// Registers a pattern field.
    pub fn with_pattern<M>(mut self, pattern: &str, mapper: M) -> Result<Self, SchemaError>
    where
        M: TypeMapper<T> + 'static,
    {
        self.add_field(FieldKey::pattern(pattern)?, Box::new(mapper));
        Ok(self)
    }

    /// Number of registered units.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns `true` if a unit is registered under this key string.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Registered key strings in registration order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Wraps the whole factory as a single mapper resolving fields exactly.
    pub fn into_mapper(self) -> FactoryMapper<T> {
        FactoryMapper {
            factory: self,
            by_pattern: false,
        }
    }

    /// Wraps the whole factory as a single mapper resolving fields by pattern.
    pub fn into_regex_mapper(self) -> FactoryMapper<T> {
        FactoryMapper {
            factory: self,
            by_pattern: true,
        }
    }

    fn find_exact(&self, field: &str) -> Result<&dyn TypeMapper<T>, FieldError> {
        self.entries
            .get(field)
            .map(|entry| entry.mapper.as_ref())
            .ok_or(FieldError::NotFound)
    }

    // A pattern key must still match the field it is asked to handle.
    fn find_keyed(&self, key: &FieldKey, field: &str) -> Result<&dyn TypeMapper<T>, FieldError> {
        self.entries
            .get(key.as_str())
            .filter(|entry| {
                entry.key.is_pattern() == key.is_pattern() && entry.key.matches(field)
            })
            .map(|entry| entry.mapper.as_ref())
            .ok_or(FieldError::NotFound)
    }

    fn find_pattern(&self, field: &str) -> Result<&dyn TypeMapper<T>, FieldError> {
        self.entries
            .values()
            .find(|entry| entry.key.is_pattern() && entry.key.matches(field))
            .map(|entry| entry.mapper.as_ref())
            .ok_or(FieldError::NotFound)
    }
}

fn run_checks<T>(
    mapper: &dyn TypeMapper<T>,
    field: &str,
    values: &[String],
) -> Result<(), FieldError> {
    mapper.validate_field(field)?;
    mapper.validate_values(values)
}

impl<T> Factory<T> for TypeMapperFactory<T> {
    fn add_field(&mut self, key: FieldKey, mapper: Box<dyn TypeMapper<T>>) {
        tracing::trace!(key = %key, pattern = key.is_pattern(), "registering type mapper");
        self.entries
            .insert(key.as_str().to_string(), Registered { key, mapper });
    }

    fn validate(&self, field: &str, values: &[String]) -> Result<(), FieldError> {
        run_checks(self.find_exact(field)?, field, values)
    }

    fn validate_regex_field(&self, field: &str, values: &[String]) -> Result<(), FieldError> {
        run_checks(self.find_pattern(field)?, field, values)
    }

    fn map_field(&self, field: &str, values: &[String]) -> Result<Option<T>, FieldError> {
        self.find_exact(field)?.map(field, values)
    }

    fn map_regex_field(&self, field: &str, values: &[String]) -> Result<Option<T>, FieldError> {
        self.find_pattern(field)?.map(field, values)
    }

    fn validate_keyed(
        &self,
        key: &FieldKey,
        field: &str,
        values: &[String],
    ) -> Result<(), FieldError> {
        run_checks(self.find_keyed(key, field)?, field, values)
    }

    fn map_keyed(
        &self,
        key: &FieldKey,
        field: &str,
        values: &[String],
    ) -> Result<Option<T>, FieldError> {
        self.find_keyed(key, field)?.map(field, values)
    }
}

impl<T> fmt::Debug for TypeMapperFactory<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeMapperFactory")
            .field("keys", &self.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// A factory used as one [`TypeMapper`], so registries can nest.
///
/// Its own field and value checks always pass; [`map`](TypeMapper::map)
/// validates through the wrapped factory first and maps only on success.
pub struct FactoryMapper<T> {
    factory: TypeMapperFactory<T>,
    by_pattern: bool,
}

impl<T> FactoryMapper<T> {
    /// The wrapped factory.
    pub fn factory(&self) -> &TypeMapperFactory<T> {
        &self.factory
    }
}

impl<T> TypeMapper<T> for FactoryMapper<T> {
    fn map(&self, field: &str, values: &[String]) -> Result<Option<T>, FieldError> {
        if self.by_pattern {
            self.factory.validate_regex_field(field, values)?;
            self.factory.map_regex_field(field, values)
        } else {
            self.factory.validate(field, values)?;
            self.factory.map_field(field, values)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;
    use crate::typemapper::CustomTypeMapper;

    #[derive(Debug, Clone, PartialEq)]
    enum Mapped {
        Text(String),
        Pairs(Vec<(String, String)>),
        Operation { op: String, value: String },
    }

    fn operation_of(field: &str) -> &str {
        field
            .split_once('[')
            .and_then(|(_, rest)| rest.strip_suffix(']'))
            .unwrap_or("")
    }

    fn factory() -> TypeMapperFactory<Mapped> {
        TypeMapperFactory::new()
            .with_field(
                "field_1",
                CustomTypeMapper::builder()
                    .validate_values(|values| match values.len() {
                        1 => Ok(()),
                        _ => Err(FieldError::invalid_values("expect 1 value")),
                    })
                    .map_with(|_, values| Ok(Some(Mapped::Text(values[0].clone()))))
                    .build()
                    .unwrap(),
            )
            .with_field(
                "field_2",
                CustomTypeMapper::builder()
                    .validate_values(|values| {
                        if values.is_empty() {
                            return Err(FieldError::invalid_values("expect slice"));
                        }
                        Ok(())
                    })
                    .map_with(|_, values| {
                        let pairs = values
                            .iter()
                            .filter_map(|v| v.split_once(':'))
                            .map(|(k, v)| (k.to_string(), v.to_string()))
                            .collect();
                        Ok(Some(Mapped::Pairs(pairs)))
                    })
                    .build()
                    .unwrap(),
            )
            .with_pattern(
                r"field_3\[.*\]",
                CustomTypeMapper::builder()
                    .validate_values(|values| match values.len() {
                        1 => Ok(()),
                        _ => Err(FieldError::invalid_values("values should be one")),
                    })
                    .validate_field(|field| match operation_of(field) {
                        "eq" | "lte" => Ok(()),
                        _ => Err(FieldError::invalid_field("bad operation")),
                    })
                    .map_with(|field, values| {
                        Ok(Some(Mapped::Operation {
                            op: operation_of(field).to_string(),
                            value: values[0].clone(),
                        }))
                    })
                    .build()
                    .unwrap(),
            )
            .unwrap()
    }

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn direct_field_single_value() {
        let f = factory();
        assert!(f.validate("field_1", &strings(&["value_1"])).is_ok());
        assert!(f.validate("field_1", &strings(&["value_1", "value_2"])).is_err());
        assert_eq!(
            f.map_field("field_1", &strings(&["value_1"])),
            Ok(Some(Mapped::Text("value_1".into())))
        );
    }

    #[test]
    fn direct_field_pairs() {
        let f = factory();
        assert!(f.validate("field_2", &strings(&["a"])).is_ok());
        assert!(f.validate("field_2", &[]).is_err());
        assert_eq!(
            f.map_field("field_2", &strings(&["field_1:value_1", "field_2:value_2", "junk"])),
            Ok(Some(Mapped::Pairs(vec![
                ("field_1".into(), "value_1".into()),
                ("field_2".into(), "value_2".into()),
            ])))
        );
    }

    #[test]
    fn pattern_field() {
        let f = factory();
        assert!(f.validate_regex_field("field_3[eq]", &strings(&["v"])).is_ok());
        assert!(f.validate_regex_field("field_3[lte]", &strings(&["v"])).is_ok());
        assert_eq!(
            f.validate_regex_field("field_3[gt]", &strings(&["v"])),
            Err(FieldError::invalid_field("bad operation"))
        );
        assert_eq!(
            f.validate_regex_field("field_3", &strings(&["v"])),
            Err(FieldError::NotFound)
        );
        assert!(f.validate_regex_field("field_3[eq]", &[]).is_err());
        assert!(f
            .validate_regex_field("field_3[eq]", &strings(&["a", "b"]))
            .is_err());

        assert_eq!(
            f.map_regex_field("field_3[lte]", &strings(&["value_2"])),
            Ok(Some(Mapped::Operation {
                op: "lte".into(),
                value: "value_2".into()
            }))
        );
    }

    #[test]
    fn lookup_miss_is_not_found() {
        let f = factory();
        assert_eq!(f.validate("nope", &[]), Err(FieldError::NotFound));
        assert_eq!(f.map_field("nope", &[]), Err(FieldError::NotFound));
        assert_eq!(f.map_regex_field("nope", &[]), Err(FieldError::NotFound));
        // exact keys never take part in pattern resolution
        assert_eq!(
            f.map_regex_field("field_1", &strings(&["v"])),
            Err(FieldError::NotFound)
        );
    }

    #[test]
    fn factory_does_not_validate_before_mapping() {
        let f = factory();
        // two values would fail validation, but map_field alone does not check
        assert_eq!(
            f.map_field("field_1", &strings(&["a", "b"])),
            Ok(Some(Mapped::Text("a".into())))
        );
    }

    #[test]
    fn first_registered_pattern_wins() {
        let f = TypeMapperFactory::<i32>::new()
            .with_pattern(
                r"name\[.*\]",
                CustomTypeMapper::builder()
                    .map_with(|_, _| Ok(Some(1)))
                    .build()
                    .unwrap(),
            )
            .unwrap()
            .with_pattern(
                r".*\[eq\]",
                CustomTypeMapper::builder()
                    .map_with(|_, _| Ok(Some(2)))
                    .build()
                    .unwrap(),
            )
            .unwrap();

        assert_eq!(f.map_regex_field("name[eq]", &[]), Ok(Some(1)));
        assert_eq!(f.map_regex_field("age[eq]", &[]), Ok(Some(2)));
    }

    #[test]
    fn keyed_lookup_ignores_registration_order() {
        let eq = FieldKey::pattern(r".*\[eq\]").unwrap();
        let f = TypeMapperFactory::<i32>::new()
            .with_pattern(
                r"name\[.*\]",
                CustomTypeMapper::builder()
                    .map_with(|_, _| Ok(Some(1)))
                    .build()
                    .unwrap(),
            )
            .unwrap()
            .with_pattern(
                eq.as_str(),
                CustomTypeMapper::builder()
                    .validate_field(|field| match field {
                        "age[eq]" => Err(FieldError::invalid_field("no age")),
                        _ => Ok(()),
                    })
                    .map_with(|_, _| Ok(Some(2)))
                    .build()
                    .unwrap(),
            )
            .unwrap();

        assert_eq!(f.map_regex_field("name[eq]", &[]), Ok(Some(1)));
        assert_eq!(f.map_keyed(&eq, "name[eq]", &[]), Ok(Some(2)));
        assert!(f.validate_keyed(&eq, "name[eq]", &[]).is_ok());
        assert_eq!(
            f.validate_keyed(&eq, "age[eq]", &[]),
            Err(FieldError::invalid_field("no age"))
        );
        // the key is registered but does not match this field
        assert_eq!(f.map_keyed(&eq, "name[gt]", &[]), Err(FieldError::NotFound));
        assert_eq!(
            f.map_keyed(&FieldKey::pattern("other").unwrap(), "other", &[]),
            Err(FieldError::NotFound)
        );
    }

    #[test]
    fn keyed_lookup_of_exact_keys() {
        let f = factory();
        let key = FieldKey::exact("field_1");
        assert_eq!(
            f.map_keyed(&key, "field_1", &strings(&["v"])),
            Ok(Some(Mapped::Text("v".into())))
        );
        assert!(f.validate_keyed(&key, "field_1", &[]).is_err());
        assert_eq!(f.map_keyed(&key, "field_2", &[]), Err(FieldError::NotFound));
    }

    #[test]
    fn re_registering_replaces_in_place() {
        let mut f: TypeMapperFactory<u8> = TypeMapperFactory::new();
        let one = CustomTypeMapper::<u8>::builder()
            .map_with(|_, _| Ok(Some(1)))
            .build()
            .unwrap();
        let two = CustomTypeMapper::<u8>::builder()
            .map_with(|_, _| Ok(Some(2)))
            .build()
            .unwrap();
        let three = CustomTypeMapper::<u8>::builder()
            .map_with(|_, _| Ok(Some(3)))
            .build()
            .unwrap();

        f.add_field(FieldKey::exact("a"), Box::new(one));
        f.add_field(FieldKey::exact("b"), Box::new(two));
        f.add_field(FieldKey::exact("a"), Box::new(three));

        assert_eq!(f.len(), 2);
        assert_eq!(f.keys().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(f.map_field("a", &[]), Ok(Some(3)));
    }

    #[test]
    fn invalid_pattern_is_a_schema_error() {
        let result = TypeMapperFactory::<u8>::new().with_pattern(
            "a(",
            CustomTypeMapper::<u8>::builder()
                .map_with(|_, _| Ok(None))
                .build()
                .unwrap(),
        );
        assert!(matches!(result, Err(SchemaError::InvalidPattern { .. })));
    }

    #[test]
    fn factory_as_mapper_validates_first() {
        let calls = Rc::new(Cell::new(0));
        let seen = calls.clone();
        let inner = TypeMapperFactory::new().with_field(
            "x",
            CustomTypeMapper::builder()
                .validate_values(|values| match values.len() {
                    1 => Ok(()),
                    _ => Err(FieldError::invalid_values("one")),
                })
                .map_with(move |_, _| {
                    seen.set(seen.get() + 1);
                    Ok(Some(9u8))
                })
                .build()
                .unwrap(),
        );

        let mapper = inner.into_mapper();
        assert!(mapper.validate_field("x").is_ok());
        assert!(mapper.validate_values(&[]).is_ok());
        assert!(mapper.map("x", &[]).is_err());
        assert_eq!(calls.get(), 0);
        assert_eq!(mapper.map("x", &strings(&["v"])), Ok(Some(9)));
        assert_eq!(calls.get(), 1);
        assert_eq!(mapper.map("y", &strings(&["v"])), Err(FieldError::NotFound));
    }

    #[test]
    fn factories_nest_by_pattern() {
        let inner = TypeMapperFactory::new()
            .with_pattern(
                r"^tag\.",
                CustomTypeMapper::builder()
                    .map_with(|field, _| Ok(Some(field.len())))
                    .build()
                    .unwrap(),
            )
            .unwrap();

        let outer = TypeMapperFactory::new()
            .with_pattern(r"^tag", inner.into_regex_mapper())
            .unwrap();

        assert_eq!(outer.map_regex_field("tag.abc", &[]), Ok(Some(7)));
        assert_eq!(outer.map_regex_field("tags", &[]), Err(FieldError::NotFound));
    }
}
