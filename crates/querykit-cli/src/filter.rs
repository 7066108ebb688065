//! The filter tree and the schema that builds it.
//!
//! A query such as
//!
//! ```text
//! name[eq]=some_name&or=name[like]=dan*,age[gt]=30&limit=10
//! ```
//!
//! becomes one [`FilterNode`] per level:
//!
//! ```text
//! root
//! ├── name  eq "some_name"
//! ├── limit 10
//! └── or
//!     ├── name like "dan*"
//!     └── age  gt 30
//! ```
//!
//! Every level is parsed by its own [`Parser`] whose finalize sinks write
//! straight into that level's node. Combinator fields (`or`, `and`) parse
//! their sub-expressions as child levels before the sink attaches them, so
//! nothing is shared between levels except the composer's depth count.

use std::cell::RefCell;
use std::rc::Rc;

use querykit::compose::DEFAULT_DELIMITER;
use querykit::{
    Composer, FieldError, ParseResult, Parser, QueryValues, ResultOrError, ResultSink, Schema,
    SchemaError, SchemaItem,
};
use serde::Serialize;
use url::{form_urlencoded, Url};

use crate::op::{Op, UnknownOp};

/// An operator applied to one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldOperation<V> {
    pub op: Op,
    pub value: V,
}

impl<V> FieldOperation<V> {
    pub fn new(op: Op, value: V) -> Self {
        Self { op, value }
    }
}

/// One level of the filter tree.
///
/// Absent fields and empty child lists are left out of the JSON form.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct FilterNode {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<FieldOperation<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<FieldOperation<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<FieldOperation<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<FieldOperation<i64>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub or: Vec<FilterNode>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub and: Vec<FilterNode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
}

impl FilterNode {
    /// Returns `true` if no field of this node is set.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// A parsed filter tree together with every field error found in it.
///
/// Errors of nested levels are keyed by their path, e.g. `or[1].age[gt]`.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ParsedFilter {
    pub node: FilterNode,
    pub errors: Vec<(String, FieldError)>,
}

impl ParsedFilter {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Returns the error recorded for `field`, if any.
    pub fn error(&self, field: &str) -> Option<&FieldError> {
        self.errors
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, err)| err)
    }
}

/// Settings for parsing filter queries.
///
/// # Example
///
/// ```
/// use querykit_cli::{FilterSchema, Op};
///
/// let parsed = FilterSchema::new()
///     .parse_query("?name[eq]=foo&or=age[gt]=30,age[lt]=10")
///     .unwrap();
///
/// let name = parsed.node.name.as_ref().unwrap();
/// assert_eq!((name.op, name.value.as_str()), (Op::Eq, "foo"));
/// assert_eq!(parsed.node.or.len(), 2);
/// assert!(!parsed.has_errors());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterSchema {
    delimiter: char,
    max_depth: usize,
}

/// Combinator nesting allowed unless [`FilterSchema::max_depth`] says otherwise.
pub const DEFAULT_MAX_DEPTH: usize = 32;

impl Default for FilterSchema {
    fn default() -> Self {
        Self {
            delimiter: DEFAULT_DELIMITER,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl FilterSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the separator between combinator sub-expressions.
    pub fn delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Limits how deep combinators may nest (default [`DEFAULT_MAX_DEPTH`]).
    pub fn max_depth(mut self, limit: usize) -> Self {
        self.max_depth = limit;
        self
    }

    fn composer(&self) -> Composer {
        Composer::new(self.delimiter).max_depth(self.max_depth)
    }

    /// Parses decoded query values into a filter tree.
    pub fn parse(&self, input: &QueryValues) -> querykit::Result<ParsedFilter> {
        parse_level(self.composer(), input.clone())
    }

    /// Decodes `query` with [`decode_query`] and parses it.
    pub fn parse_query(&self, query: &str) -> querykit::Result<ParsedFilter> {
        self.parse(&decode_query(query))
    }
}

/// Decodes a full URL or a bare query string (leading `?` optional).
///
/// ```
/// use querykit_cli::decode_query;
///
/// let values = decode_query("http://localhost:8080/users?name[eq]=a%20b&or=age[gt]=1,age[lt]=9");
/// assert_eq!(values.first("name[eq]"), Some("a b"));
/// assert_eq!(values.first("or"), Some("age[gt]=1,age[lt]=9"));
/// assert_eq!(decode_query("?limit=5"), decode_query("limit=5"));
/// ```
pub fn decode_query(query: &str) -> QueryValues {
    let raw = match Url::parse(query) {
        Ok(url) => url.query().unwrap_or_default().to_string(),
        Err(_) => query.strip_prefix('?').unwrap_or(query).to_string(),
    };
    form_urlencoded::parse(raw.as_bytes()).collect()
}

/// Where a level's sink puts a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Name,
    Email,
    Phone,
    Age,
    Or,
    And,
}

impl Slot {
    const LEAVES: [Slot; 4] = [Slot::Name, Slot::Email, Slot::Phone, Slot::Age];

    fn field(self) -> &'static str {
        match self {
            Slot::Name => "name",
            Slot::Email => "email",
            Slot::Phone => "phone",
            Slot::Age => "age",
            Slot::Or => "or",
            Slot::And => "and",
        }
    }

    fn is_integer(self) -> bool {
        self == Slot::Age
    }
}

/// Intermediate value of one field at one level.
#[derive(Debug, Clone, PartialEq)]
enum FilterValue {
    Text(Op, String),
    Integer(Op, i64),
    Count(i64),
    Children(Vec<ParsedFilter>),
}

/// Finalize sink writing one slot of a level's node.
struct NodeSink {
    node: Rc<RefCell<FilterNode>>,
    slot: Slot,
}

impl ResultSink<FilterValue> for NodeSink {
    fn finalize(
        &self,
        result: &mut ParseResult<FilterValue>,
        field: &str,
        outcome: ResultOrError<FilterValue>,
    ) {
        let value = match outcome {
            ResultOrError::Value(value) => value,
            ResultOrError::Empty => return,
            err @ ResultOrError::Error(_) => {
                result.insert(field, err);
                return;
            }
        };

        let mut node = self.node.borrow_mut();
        match (self.slot, value) {
            (Slot::Name, FilterValue::Text(op, v)) => node.name = Some(FieldOperation::new(op, v)),
            (Slot::Email, FilterValue::Text(op, v)) => node.email = Some(FieldOperation::new(op, v)),
            (Slot::Phone, FilterValue::Text(op, v)) => node.phone = Some(FieldOperation::new(op, v)),
            (Slot::Age, FilterValue::Integer(op, v)) => node.age = Some(FieldOperation::new(op, v)),
            (Slot::Or, FilterValue::Children(children)) => {
                attach(&mut node.or, Slot::Or, children, result)
            }
            (Slot::And, FilterValue::Children(children)) => {
                attach(&mut node.and, Slot::And, children, result)
            }
            (slot, value) => tracing::warn!(field, ?slot, ?value, "value does not fit its slot"),
        }
    }
}

fn attach(
    list: &mut Vec<FilterNode>,
    slot: Slot,
    children: Vec<ParsedFilter>,
    result: &mut ParseResult<FilterValue>,
) {
    for child in children {
        let index = list.len();
        for (field, err) in child.errors {
            let path = format!("{}[{index}].{field}", slot.field());
            result.insert(path, ResultOrError::Error(err));
        }
        list.push(child.node);
    }
}

fn exactly_one(values: &[String]) -> Result<(), FieldError> {
    match values.len() {
        1 => Ok(()),
        n => Err(FieldError::invalid_values(format!(
            "expected exactly one value, got {n}"
        ))),
    }
}

/// Operator inside the brackets of `field`.
fn operation_of(field: &str) -> Result<Op, FieldError> {
    let name = field
        .split_once('[')
        .and_then(|(_, rest)| rest.strip_suffix(']'))
        .ok_or_else(|| FieldError::invalid_field(format!("missing operation in '{field}'")))?;
    name.parse()
        .map_err(|err: UnknownOp| FieldError::invalid_field(err.to_string()))
}

fn leaf_item(slot: Slot, sink: NodeSink) -> SchemaItem<FilterValue> {
    SchemaItem::pattern()
        .validate_field(move |field| {
            let op = operation_of(field)?;
            if slot.is_integer() && !op.is_number_op() {
                return Err(FieldError::invalid_field(format!(
                    "operation '{op}' is not supported on '{}'",
                    slot.field()
                )));
            }
            Ok(())
        })
        .validate_values(exactly_one)
        .map_with(move |field, values| {
            let op = operation_of(field)?;
            let raw = &values[0];
            if slot.is_integer() {
                raw.parse::<i64>()
                    .map(|n| Some(FilterValue::Integer(op, n)))
                    .map_err(FieldError::mapping)
            } else {
                Ok(Some(FilterValue::Text(op, raw.clone())))
            }
        })
        .finalize(sink)
}

fn combinator_item(composer: Composer, sink: NodeSink) -> SchemaItem<FilterValue> {
    SchemaItem::exact()
        .map_with(move |_, values| {
            let mut children = Vec::new();
            for raw in values {
                for child in composer.children(raw, parse_level)? {
                    children.push(child.map_err(FieldError::mapping)?);
                }
            }
            Ok(Some(FilterValue::Children(children)))
        })
        .finalize(sink)
}

fn count_item(field: &'static str) -> SchemaItem<FilterValue> {
    SchemaItem::exact()
        .validate_values(exactly_one)
        .map_with(|_, values| {
            values[0]
                .parse::<i64>()
                .map(|n| Some(FilterValue::Count(n)))
                .map_err(FieldError::mapping)
        })
        .post_validate(move |value| match value {
            FilterValue::Count(n) if *n < 0 => Err(FieldError::validation(format!(
                "{field} can't be lower than zero"
            ))),
            _ => Ok(()),
        })
}

fn count(result: &ParseResult<FilterValue>, field: &str) -> Option<u64> {
    match result.value(field) {
        Some(FilterValue::Count(n)) => u64::try_from(*n).ok(),
        _ => None,
    }
}

fn parse_level(composer: Composer, input: QueryValues) -> Result<ParsedFilter, SchemaError> {
    let node = Rc::new(RefCell::new(FilterNode::default()));
    let sink = |slot| NodeSink {
        node: Rc::clone(&node),
        slot,
    };
    let top = composer.depth() == 0;

    let mut builder = Schema::builder();
    for slot in Slot::LEAVES {
        let pattern = format!(r"^{}\[.*\]$", slot.field());
        builder = builder.item(pattern, leaf_item(slot, sink(slot)));
    }
    builder = builder
        .item("or", combinator_item(composer, sink(Slot::Or)))
        .item("and", combinator_item(composer, sink(Slot::And)));
    if top {
        builder = builder
            .item("offset", count_item("offset"))
            .item("limit", count_item("limit"));
    }

    let result = Parser::new(builder.build()?).parse(&input);
    tracing::debug!(depth = composer.depth(), fields = input.len(), "level parsed");

    let mut tree = node.take();
    if top {
        tree.offset = count(&result, "offset");
        tree.limit = count(&result, "limit");
    }
    let errors = result
        .errors()
        .map(|(field, err)| (field.to_string(), err.clone()))
        .collect();

    Ok(ParsedFilter { node: tree, errors })
}
