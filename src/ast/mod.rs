//! Pre-parsed domain and instance descriptions.
//!
//! The textual grammar is handled by an external parser; this module is the
//! data model it produces. Definitions are serde-serializable so they can be
//! exchanged as JSON, and carry builder helpers for programmatic construction.

mod domain;
mod expr;
mod instance;
mod serialization;
mod validation;

pub use domain::{CpfDef, DomainDef, FluentKind, PVariableDecl};
pub use expr::{AggregateOp, ArithOp, CmpOp, Expr, Term, TypedVar};
pub use instance::{Assignment, InstanceDef, ObjectsDecl};

pub use serialization::{from_json, from_json_file, to_json_pretty};
pub use validation::is_identifier;
