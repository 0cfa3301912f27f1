//! Compiled expression trees.
//!
//! The grounder lowers `ast::Expr` into `Node`s: fluent names resolve to
//! pvariable ids, variables to binding slots and object constants to
//! ordinals within their type. Evaluation never touches strings.

use crate::ast::{AggregateOp, ArithOp, CmpOp, FluentKind};
use crate::grounding::{PVarId, TypeId};
use crate::value::Value;

/// Which generation of a state fluent a read refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Layer {
    /// The committed snapshot.
    Current,
    /// The generation being computed (`fluent'`).
    Next,
}

/// A resolved fluent argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arg {
    /// Ordinal held in a binding slot.
    Slot(usize),
    /// Fixed object ordinal.
    Object(usize),
}

/// An object-valued operand of an identity comparison.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjRef {
    pub arg: Arg,
    pub type_id: TypeId,
}

/// A quantified variable bound to a slot.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Binder {
    pub slot: usize,
    pub type_id: TypeId,
}

#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Const(Value),
    Read {
        pvar: PVarId,
        kind: FluentKind,
        layer: Layer,
        args: Vec<Arg>,
    },
    SameObject {
        lhs: ObjRef,
        rhs: ObjRef,
        negate: bool,
    },
    Not(Box<Node>),
    And(Vec<Node>),
    Or(Vec<Node>),
    Implies(Box<Node>, Box<Node>),
    Equiv(Box<Node>, Box<Node>),
    Compare(CmpOp, Box<Node>, Box<Node>),
    Arith(ArithOp, Box<Node>, Box<Node>),
    Neg(Box<Node>),
    If(Box<Node>, Box<Node>, Box<Node>),
    Aggregate {
        op: AggregateOp,
        vars: Vec<Binder>,
        body: Box<Node>,
    },
    KronDelta(Box<Node>),
    DiracDelta(Box<Node>),
    Bernoulli(Box<Node>),
    Uniform(Box<Node>, Box<Node>),
}

/// A compiled expression together with its binding-slot requirements.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledExpr {
    /// Root node.
    pub node: Node,
    /// Number of binding slots the expression needs (parameters included).
    pub slots: usize,
    /// Human-readable origin used in error messages, e.g. `damaged'`.
    pub label: String,
}
