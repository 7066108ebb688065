//! Querykit CLI - filter trees from URL queries.
//!
//! This crate puts [`querykit`] to work on a concrete filter language and
//! ships the `querykit` binary that prints the result as JSON:
//!
//! ```text
//! $ querykit 'name[eq]=some_name&or=name[like]=dan*,name[lte]=asd'
//! {
//!   "name": { "op": "eq", "value": "some_name" },
//!   "or": [
//!     { "name": { "op": "like", "value": "dan*" } },
//!     { "name": { "op": "lte", "value": "asd" } }
//!   ]
//! }
//! ```
//!
//! # Filter Language
//!
//! | Field | Kind | Operators |
//! |-------|------|-----------|
//! | `name[op]`, `email[op]`, `phone[op]` | text | `eq`, `ne`, `like`, `gt`, `gte`, `lt`, `lte` |
//! | `age[op]` | integer | `eq`, `ne`, `gt`, `gte`, `lt`, `lte` |
//! | `or`, `and` | sub-expressions | delimited `field=value` list |
//! | `offset`, `limit` | integer ≥ 0 | top level only |

pub mod cli;
pub mod filter;
pub mod op;

pub use filter::{
    decode_query, FieldOperation, FilterNode, FilterSchema, ParsedFilter, DEFAULT_MAX_DEPTH,
};
pub use op::{Op, UnknownOp};
