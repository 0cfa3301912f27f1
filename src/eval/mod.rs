//! Expression evaluation.
//!
//! Compiled trees ([`Node`]) are walked by an [`Evaluator`] against an
//! [`Env`] snapshot. A CPF root yields a [`Distribution`], which the caller
//! hands to the `Sampler`.

mod distribution;
mod env;
mod evaluator;
mod node;

pub use distribution::Distribution;
pub use env::Env;
pub use evaluator::Evaluator;
pub use node::{Arg, Binder, CompiledExpr, Layer, Node, ObjRef};
