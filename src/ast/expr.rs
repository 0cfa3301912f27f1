//! Expression trees for CPFs, rewards and constraints.
//!
//! Expressions are built either from JSON or with the constructor helpers
//! below, which read close to the textual modeling language:
//!
//! ```
//! use fluentsim::ast::Expr;
//!
//! // damaged'(?t) = if (damaged(?t)) then KronDelta(true) else Bernoulli(DAMAGE_PROB(?t))
//! let cpf = Expr::if_then_else(
//!     Expr::fluent("damaged", &["?t"]),
//!     Expr::kron_delta(Expr::bool(true)),
//!     Expr::bernoulli(Expr::fluent("DAMAGE_PROB", &["?t"])),
//! );
//! assert!(cpf.has_distribution());
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// A fluent argument: a `?variable` or an object constant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Term {
    /// Variable reference, stored without the leading `?`.
    Var(String),
    /// Object constant.
    Object(String),
}

impl Term {
    /// Returns the variable name (without `?`) if this is a variable.
    #[must_use]
    pub fn as_var(&self) -> Option<&str> {
        match self {
            Self::Var(v) => Some(v),
            Self::Object(_) => None,
        }
    }
}

impl From<String> for Term {
    fn from(s: String) -> Self {
        match s.strip_prefix('?') {
            Some(var) => Self::Var(var.to_string()),
            None => Self::Object(s),
        }
    }
}

impl From<&str> for Term {
    fn from(s: &str) -> Self {
        Self::from(s.to_string())
    }
}

impl From<Term> for String {
    fn from(t: Term) -> Self {
        match t {
            Term::Var(v) => format!("?{v}"),
            Term::Object(o) => o,
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Var(v) => write!(f, "?{v}"),
            Self::Object(o) => f.write_str(o),
        }
    }
}

/// A variable bound by a quantifier or aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypedVar {
    /// Variable name without the leading `?`.
    pub var: String,
    /// Object type the variable ranges over.
    pub type_name: String,
}

impl TypedVar {
    /// Creates a typed variable; a leading `?` on `var` is stripped.
    #[must_use]
    pub fn new(var: &str, type_name: &str) -> Self {
        Self {
            var: var.strip_prefix('?').unwrap_or(var).to_string(),
            type_name: type_name.to_string(),
        }
    }
}

#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CmpOp {
    Eq,
    Neq,
    Lt,
    Le,
    Gt,
    Ge,
}

#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}

/// Quantifiers and aggregates over typed variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateOp {
    /// True iff at least one binding satisfies the body.
    Exists,
    /// True iff every binding satisfies the body.
    Forall,
    /// Sum of the body over all bindings.
    Sum,
    /// Product of the body over all bindings.
    Prod,
}

impl AggregateOp {
    /// Returns the keyword used in the textual language.
    #[must_use]
    pub const fn keyword(self) -> &'static str {
        match self {
            Self::Exists => "exists",
            Self::Forall => "forall",
            Self::Sum => "sum",
            Self::Prod => "prod",
        }
    }
}

/// Expression AST node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Expr {
    Const {
        value: Value,
    },

    /// Fluent read. `next` selects the post-transition (primed) value.
    Fluent {
        name: String,
        #[serde(default)]
        args: Vec<Term>,
        #[serde(default)]
        next: bool,
    },

    /// Bare object or variable, only meaningful inside `==` / `~=`.
    Term {
        term: Term,
    },

    Not {
        arg: Box<Expr>,
    },

    And {
        args: Vec<Expr>,
    },

    Or {
        args: Vec<Expr>,
    },

    Implies {
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },

    Equiv {
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },

    Compare {
        op: CmpOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },

    Arith {
        op: ArithOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },

    Neg {
        arg: Box<Expr>,
    },

    If {
        cond: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },

    Aggregate {
        op: AggregateOp,
        vars: Vec<TypedVar>,
        body: Box<Expr>,
    },

    KronDelta {
        arg: Box<Expr>,
    },

    DiracDelta {
        arg: Box<Expr>,
    },

    Bernoulli {
        p: Box<Expr>,
    },

    Uniform {
        low: Box<Expr>,
        high: Box<Expr>,
    },
}

impl Expr {
    #[must_use]
    pub fn constant(value: impl Into<Value>) -> Self {
        Self::Const {
            value: value.into(),
        }
    }

    #[must_use]
    pub fn bool(v: bool) -> Self {
        Self::constant(v)
    }

    #[must_use]
    pub fn real(v: f64) -> Self {
        Self::constant(v)
    }

    #[must_use]
    pub fn int(v: i64) -> Self {
        Self::constant(v)
    }

    /// Current-step read of `name(args...)`.
    #[must_use]
    pub fn fluent(name: &str, args: &[&str]) -> Self {
        Self::Fluent {
            name: name.to_string(),
            args: args.iter().map(|a| Term::from(*a)).collect(),
            next: false,
        }
    }

    /// Post-transition read of `name'(args...)`.
    #[must_use]
    pub fn next(name: &str, args: &[&str]) -> Self {
        Self::Fluent {
            name: name.to_string(),
            args: args.iter().map(|a| Term::from(*a)).collect(),
            next: true,
        }
    }

    #[must_use]
    pub fn term(term: &str) -> Self {
        Self::Term {
            term: Term::from(term),
        }
    }

    #[must_use]
    pub fn and(args: Vec<Self>) -> Self {
        Self::And { args }
    }

    #[must_use]
    pub fn or(args: Vec<Self>) -> Self {
        Self::Or { args }
    }

    #[must_use]
    pub fn implies(lhs: Self, rhs: Self) -> Self {
        Self::Implies {
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    #[must_use]
    pub fn equiv(lhs: Self, rhs: Self) -> Self {
        Self::Equiv {
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    #[must_use]
    pub fn compare(op: CmpOp, lhs: Self, rhs: Self) -> Self {
        Self::Compare {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    #[must_use]
    pub fn equals(lhs: Self, rhs: Self) -> Self {
        Self::compare(CmpOp::Eq, lhs, rhs)
    }

    #[must_use]
    pub fn not_equals(lhs: Self, rhs: Self) -> Self {
        Self::compare(CmpOp::Neq, lhs, rhs)
    }

    #[must_use]
    pub fn le(lhs: Self, rhs: Self) -> Self {
        Self::compare(CmpOp::Le, lhs, rhs)
    }

    #[must_use]
    pub fn lt(lhs: Self, rhs: Self) -> Self {
        Self::compare(CmpOp::Lt, lhs, rhs)
    }

    #[must_use]
    pub fn ge(lhs: Self, rhs: Self) -> Self {
        Self::compare(CmpOp::Ge, lhs, rhs)
    }

    #[must_use]
    pub fn gt(lhs: Self, rhs: Self) -> Self {
        Self::compare(CmpOp::Gt, lhs, rhs)
    }

    #[must_use]
    pub fn arith(op: ArithOp, lhs: Self, rhs: Self) -> Self {
        Self::Arith {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    #[must_use]
    pub fn if_then_else(cond: Self, then: Self, otherwise: Self) -> Self {
        Self::If {
            cond: Box::new(cond),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        }
    }

    /// Aggregate over `(var, type)` pairs; variables may carry a leading `?`.
    #[must_use]
    pub fn aggregate(op: AggregateOp, vars: &[(&str, &str)], body: Self) -> Self {
        Self::Aggregate {
            op,
            vars: vars.iter().map(|(v, t)| TypedVar::new(v, t)).collect(),
            body: Box::new(body),
        }
    }

    #[must_use]
    pub fn exists(vars: &[(&str, &str)], body: Self) -> Self {
        Self::aggregate(AggregateOp::Exists, vars, body)
    }

    #[must_use]
    pub fn forall(vars: &[(&str, &str)], body: Self) -> Self {
        Self::aggregate(AggregateOp::Forall, vars, body)
    }

    #[must_use]
    pub fn sum(vars: &[(&str, &str)], body: Self) -> Self {
        Self::aggregate(AggregateOp::Sum, vars, body)
    }

    #[must_use]
    pub fn prod(vars: &[(&str, &str)], body: Self) -> Self {
        Self::aggregate(AggregateOp::Prod, vars, body)
    }

    #[must_use]
    pub fn kron_delta(arg: Self) -> Self {
        Self::KronDelta { arg: Box::new(arg) }
    }

    #[must_use]
    pub fn dirac_delta(arg: Self) -> Self {
        Self::DiracDelta { arg: Box::new(arg) }
    }

    #[must_use]
    pub fn bernoulli(p: Self) -> Self {
        Self::Bernoulli { p: Box::new(p) }
    }

    #[must_use]
    pub fn uniform(low: Self, high: Self) -> Self {
        Self::Uniform {
            low: Box::new(low),
            high: Box::new(high),
        }
    }

    /// Returns true if a distribution primitive appears anywhere in this tree.
    #[must_use]
    pub fn has_distribution(&self) -> bool {
        let mut found = false;
        self.visit(&mut |e| {
            found |= matches!(
                e,
                Self::KronDelta { .. }
                    | Self::DiracDelta { .. }
                    | Self::Bernoulli { .. }
                    | Self::Uniform { .. }
            );
        });
        found
    }

    /// Pre-order traversal over every node.
    pub fn visit<'e>(&'e self, f: &mut impl FnMut(&'e Self)) {
        f(self);
        match self {
            Self::Const { .. } | Self::Fluent { .. } | Self::Term { .. } => {}
            Self::Not { arg }
            | Self::Neg { arg }
            | Self::KronDelta { arg }
            | Self::DiracDelta { arg } => arg.visit(f),
            Self::Bernoulli { p } => p.visit(f),
            Self::And { args } | Self::Or { args } => {
                for a in args {
                    a.visit(f);
                }
            }
            Self::Implies { lhs, rhs }
            | Self::Equiv { lhs, rhs }
            | Self::Compare { lhs, rhs, .. }
            | Self::Arith { lhs, rhs, .. } => {
                lhs.visit(f);
                rhs.visit(f);
            }
            Self::Uniform { low, high } => {
                low.visit(f);
                high.visit(f);
            }
            Self::If {
                cond,
                then,
                otherwise,
            } => {
                cond.visit(f);
                then.visit(f);
                otherwise.visit(f);
            }
            Self::Aggregate { body, .. } => body.visit(f),
        }
    }
}

impl std::ops::Not for Expr {
    type Output = Self;

    fn not(self) -> Self {
        Self::Not { arg: Box::new(self) }
    }
}

impl std::ops::Neg for Expr {
    type Output = Self;

    fn neg(self) -> Self {
        Self::Neg { arg: Box::new(self) }
    }
}

macro_rules! impl_arith_op {
    ($trait:ident, $method:ident, $op:expr) => {
        impl std::ops::$trait for Expr {
            type Output = Self;

            fn $method(self, rhs: Self) -> Self {
                Self::arith($op, self, rhs)
            }
        }
    };
}

impl_arith_op!(Add, add, ArithOp::Add);
impl_arith_op!(Sub, sub, ArithOp::Sub);
impl_arith_op!(Mul, mul, ArithOp::Mul);
impl_arith_op!(Div, div, ArithOp::Div);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn term_parses_variables_and_objects() {
        assert_eq!(Term::from("?x"), Term::Var("x".to_string()));
        assert_eq!(Term::from("o1"), Term::Object("o1".to_string()));
        assert_eq!(Term::from("?x").to_string(), "?x");
    }

    #[test]
    fn typed_var_strips_prefix() {
        let v = TypedVar::new("?t", "tool");
        assert_eq!(v.var, "t");
        assert_eq!(v.type_name, "tool");
    }

    #[test]
    fn operators_build_nodes() {
        let e = !Expr::fluent("damaged", &["?t"]);
        assert!(matches!(e, Expr::Not { .. }));

        let e = Expr::real(1.0) + Expr::real(2.0) * Expr::real(3.0);
        let Expr::Arith { op, rhs, .. } = e else {
            panic!("expected arithmetic node");
        };
        assert_eq!(op, ArithOp::Add);
        assert!(matches!(*rhs, Expr::Arith { op: ArithOp::Mul, .. }));
    }

    #[test]
    fn distribution_detection() {
        assert!(!Expr::fluent("a", &[]).has_distribution());
        let nested = Expr::sum(
            &[("?o", "obj")],
            Expr::if_then_else(Expr::bool(true), Expr::bernoulli(Expr::real(0.5)), Expr::bool(false)),
        );
        assert!(nested.has_distribution());
    }

    #[test]
    fn term_serializes_as_string() {
        let e = Expr::next("agentAt", &["?a", "x1"]);
        let json = serde_json::to_string(&e).unwrap();
        assert!(json.contains("\"?a\""));
        assert!(json.contains("\"x1\""));
        let decoded: Expr = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, e);
    }

    #[test]
    fn visit_yields_borrows_that_outlive_the_walk() {
        let e = Expr::sum(
            &[("?x", "x_pos")],
            Expr::exists(&[("?o", "obj"), ("?t", "tool")], Expr::fluent("useToolOn", &["?a", "?t", "?o"])),
        );
        let mut types: Vec<&str> = Vec::new();
        e.visit(&mut |node| {
            if let Expr::Aggregate { vars, .. } = node {
                types.extend(vars.iter().map(|v| v.type_name.as_str()));
            }
        });
        assert_eq!(types, vec!["x_pos", "obj", "tool"]);
    }
}
