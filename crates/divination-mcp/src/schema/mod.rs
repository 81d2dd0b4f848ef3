//! Declarative input schemas for tools.
//!
//! A [`SchemaNode`] describes the shape of a tool's arguments. It renders the
//! JSON Schema advertised by `tools/list` and validates (and leniently
//! coerces) the arguments of every `tools/call` before a handler sees them.

mod node;
mod validate;

pub use node::{Field, SchemaKind, SchemaNode};
pub use validate::{validate, ValidationError, ValidationIssue, ValidationReason};
