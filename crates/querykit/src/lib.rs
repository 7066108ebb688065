//! Querykit - schema-driven parsing of URL query parameters.
//!
//! Querykit turns the key/value pairs of a query string into typed, validated
//! values. A [`Schema`] declares which fields are understood and how each is
//! checked and converted; a [`Parser`] runs that schema over incoming
//! [`QueryValues`] and reports one outcome per field. It supports:
//!
//! - Exact field names (`offset`) and regex patterns (`name\[.*\]`)
//! - Field-name and value checks before conversion, predicates after it
//! - Per-field error isolation: one bad parameter never hides the others
//! - Finalize sinks that route outcomes into caller-owned structures
//! - Nested sub-queries inside a field value, with an optional depth limit
//!
//! # Quick Start
//!
//! ```rust
//! use querykit::{FieldError, Parser, QueryValues, Schema, SchemaItem};
//!
//! #[derive(Debug, PartialEq)]
//! enum Param {
//!     Name { op: String, value: String },
//!     Offset(u64),
//! }
//!
//! let schema = Schema::builder()
//!     .item(
//!         r"name\[.*\]",
//!         SchemaItem::pattern().map_with(|field, values| {
//!             let op = field.trim_start_matches("name[").trim_end_matches(']');
//!             Ok(Some(Param::Name { op: op.into(), value: values[0].clone() }))
//!         }),
//!     )
//!     .item(
//!         "offset",
//!         SchemaItem::exact().map_with(|_, values| {
//!             values[0].parse().map(|n| Some(Param::Offset(n))).map_err(FieldError::mapping)
//!         }),
//!     )
//!     .build()
//!     .unwrap();
//!
//! let input: QueryValues = [("name[eq]", "foo"), ("offset", "x"), ("page", "2")]
//!     .into_iter()
//!     .collect();
//! let result = Parser::new(schema).parse(&input);
//!
//! assert_eq!(
//!     result.value("name[eq]"),
//!     Some(&Param::Name { op: "eq".into(), value: "foo".into() })
//! );
//! assert!(result.error("offset").is_some());
//! assert!(!result.contains_key("page"));
//! ```
//!
//! # Parse Semantics
//!
//! Every input field runs through a fixed pipeline:
//!
//! ```text
//! resolve → register → validate field → validate values → map → post-validate → finalize
//! ```
//!
//! - **resolve**: pattern entries are tried first, in declaration order, then
//!   exact names. A field nothing resolves to is skipped and never reported.
//! - **validate / map**: the first failing stage becomes the field's error.
//! - **finalize**: a [`sink::ResultSink`] on the item receives the outcome;
//!   without one, errors and present values land in the [`ParseResult`],
//!   keyed by the original field name.
//!
//! # Outcomes
//!
//! | Outcome | Default recording |
//! |---------|-------------------|
//! | `Value(T)` | stored under the field name |
//! | `Empty` | dropped |
//! | `Error(FieldError)` | stored under the field name |

pub mod compose;
mod error;
mod factory;
mod parser;
mod result;
mod schema;
pub mod sink;
mod typemapper;
pub mod validator;
mod values;

// Re-export public API
pub use compose::Composer;
pub use error::{FieldError, Result, SchemaError};
pub use factory::{Factory, FactoryMapper, FieldKey, TypeMapperFactory};
pub use parser::Parser;
pub use result::{ParseResult, ResultOrError};
pub use schema::{Schema, SchemaBuilder, SchemaEntry, SchemaItem};
pub use sink::ResultSink;
pub use typemapper::{
    CustomTypeMapper, TypeMapFn, TypeMapper, TypeMapperBuilder, ValidateFieldFn, ValidateValuesFn,
};
pub use values::QueryValues;
