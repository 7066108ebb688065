//! Filter operators.
//!
//! An operator is written inside the brackets of a field name:
//! `age[gte]=30`, `name[like]=dan*`.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;

/// Comparison operator of a filter field.
///
/// - **Universal**: `Eq`, `Ne`
/// - **Pattern**: `Like` - text fields only
/// - **Ordering**: `Gt`, `Gte`, `Lt`, `Lte` - numeric order on integer
///   fields, lexicographic order on text fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Op {
    /// Equal.
    Eq,
    /// Not equal.
    Ne,
    /// Matches a `*` wildcard pattern.
    Like,
    /// Greater than.
    Gt,
    /// Greater than or equal.
    Gte,
    /// Less than.
    Lt,
    /// Less than or equal.
    Lte,
}

/// Every operator, in declaration order.
pub const ALL: [Op; 7] = [Op::Eq, Op::Ne, Op::Like, Op::Gt, Op::Gte, Op::Lt, Op::Lte];

/// An operator name that is not one of [`Op`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown operation '{0}'")]
pub struct UnknownOp(pub String);

impl Op {
    /// Returns `true` if this operator is valid for integer fields.
    pub fn is_number_op(self) -> bool {
        !matches!(self, Op::Like)
    }

    /// Returns the name used inside field brackets.
    pub fn as_str(self) -> &'static str {
        match self {
            Op::Eq => "eq",
            Op::Ne => "ne",
            Op::Like => "like",
            Op::Gt => "gt",
            Op::Gte => "gte",
            Op::Lt => "lt",
            Op::Lte => "lte",
        }
    }
}

impl FromStr for Op {
    type Err = UnknownOp;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ALL.into_iter()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| UnknownOp(s.to_string()))
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
