//! Tree-walking evaluation of compiled expressions.

use std::ops::ControlFlow;

use crate::ast::{AggregateOp, ArithOp, CmpOp, FluentKind};
use crate::error::DomainError;
use crate::grounding::GroundedModel;
use crate::sampler::Sampler;
use crate::value::Value;

use super::distribution::Distribution;
use super::env::Env;
use super::node::{Arg, Binder, CompiledExpr, Layer, Node, ObjRef};

/// Evaluates compiled expressions of one model against one snapshot.
#[derive(Debug, Clone, Copy)]
pub struct Evaluator<'a> {
    model: &'a GroundedModel,
    env: Env<'a>,
}

impl<'a> Evaluator<'a> {
    #[must_use]
    pub const fn new(model: &'a GroundedModel, env: Env<'a>) -> Self {
        Self { model, env }
    }

    /// Evaluates a CPF root to its distribution descriptor.
    ///
    /// `slots` must hold at least `expr.slots` entries with the CPF's
    /// parameter ordinals in the leading positions. Conditionals at the root
    /// select a branch; distributions anywhere else are sampled inline.
    ///
    /// # Errors
    ///
    /// Returns a `DomainError` on invalid distribution parameters, type
    /// errors or division by zero.
    pub fn distribution(
        &self,
        expr: &CompiledExpr,
        slots: &mut [usize],
        sampler: &mut Sampler,
    ) -> Result<Distribution, DomainError> {
        Walk {
            ev: self,
            label: &expr.label,
            slots,
            sampler,
        }
        .distribution(&expr.node)
    }

    /// Evaluates an expression to a value, sampling any distributions it contains.
    ///
    /// # Errors
    ///
    /// See [`Evaluator::distribution`].
    pub fn value(&self, expr: &CompiledExpr, slots: &mut [usize], sampler: &mut Sampler) -> Result<Value, DomainError> {
        Walk {
            ev: self,
            label: &expr.label,
            slots,
            sampler,
        }
        .value(&expr.node)
    }

    /// Evaluates a boolean expression.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::TypeMismatch` if the result is not boolean.
    pub fn truth(&self, expr: &CompiledExpr, slots: &mut [usize], sampler: &mut Sampler) -> Result<bool, DomainError> {
        Walk {
            ev: self,
            label: &expr.label,
            slots,
            sampler,
        }
        .truth(&expr.node)
    }

    /// Evaluates a numeric expression as a real.
    ///
    /// # Errors
    ///
    /// See [`Evaluator::distribution`].
    pub fn real(&self, expr: &CompiledExpr, slots: &mut [usize], sampler: &mut Sampler) -> Result<f64, DomainError> {
        Walk {
            ev: self,
            label: &expr.label,
            slots,
            sampler,
        }
        .real(&expr.node)
    }

    fn table(&self, kind: FluentKind, layer: Layer) -> &'a [Value] {
        match (kind, layer) {
            (FluentKind::NonFluent, _) => self.env.non_fluents,
            (FluentKind::StateFluent, Layer::Current) => self.env.state,
            (FluentKind::StateFluent, Layer::Next) => self.env.next_state,
            (FluentKind::ObservFluent, _) => self.env.observations,
            (FluentKind::ActionFluent, _) => self.env.action,
        }
    }
}

struct Walk<'w, 'a> {
    ev: &'w Evaluator<'a>,
    label: &'w str,
    slots: &'w mut [usize],
    sampler: &'w mut Sampler,
}

impl Walk<'_, '_> {
    fn mismatch(&self, expected: &str, found: Value) -> DomainError {
        DomainError::TypeMismatch {
            expected: expected.to_string(),
            found: found.type_name().to_string(),
            context: self.label.to_string(),
        }
    }

    fn distribution(&mut self, node: &Node) -> Result<Distribution, DomainError> {
        match node {
            Node::KronDelta(arg) => Ok(Distribution::KronDelta {
                value: self.value(arg)?,
            }),
            Node::DiracDelta(arg) => Ok(Distribution::DiracDelta {
                value: self.real(arg)?,
            }),
            Node::Bernoulli(p) => {
                let p = self.real(p)?;
                Distribution::bernoulli(p, self.label)
            }
            Node::Uniform(low, high) => {
                let low = self.real(low)?;
                let high = self.real(high)?;
                Distribution::uniform(low, high, self.label)
            }
            Node::If(cond, then, otherwise) => {
                if self.truth(cond)? {
                    self.distribution(then)
                } else {
                    self.distribution(otherwise)
                }
            }
            other => Ok(Distribution::KronDelta {
                value: self.value(other)?,
            }),
        }
    }

    fn truth(&mut self, node: &Node) -> Result<bool, DomainError> {
        let v = self.value(node)?;
        v.as_bool().ok_or_else(|| self.mismatch("bool", v))
    }

    fn real(&mut self, node: &Node) -> Result<f64, DomainError> {
        let v = self.value(node)?;
        v.as_real().ok_or_else(|| self.mismatch("number", v))
    }

    fn resolve(&self, arg: Arg) -> usize {
        match arg {
            Arg::Slot(s) => self.slots[s],
            Arg::Object(o) => o,
        }
    }

    fn same_object(&self, lhs: ObjRef, rhs: ObjRef) -> bool {
        lhs.type_id == rhs.type_id && self.resolve(lhs.arg) == self.resolve(rhs.arg)
    }

    fn read(&self, pvar: usize, kind: FluentKind, layer: Layer, args: &[Arg]) -> Value {
        let pv = &self.ev.model.pvariables[pvar];
        let index = pv.offset
            + args
                .iter()
                .zip(&pv.strides)
                .map(|(&a, s)| self.resolve(a) * s)
                .sum::<usize>();
        // Observation tables are empty outside observ CPFs.
        self.ev
            .table(kind, layer)
            .get(index)
            .copied()
            .unwrap_or(pv.default)
    }

    fn value(&mut self, node: &Node) -> Result<Value, DomainError> {
        Ok(match node {
            Node::Const(v) => *v,
            Node::Read {
                pvar,
                kind,
                layer,
                args,
            } => self.read(*pvar, *kind, *layer, args),
            Node::SameObject { lhs, rhs, negate } => Value::Bool(self.same_object(*lhs, *rhs) != *negate),
            Node::Not(arg) => Value::Bool(!self.truth(arg)?),
            Node::And(args) => {
                for a in args {
                    if !self.truth(a)? {
                        return Ok(Value::Bool(false));
                    }
                }
                Value::Bool(true)
            }
            Node::Or(args) => {
                for a in args {
                    if self.truth(a)? {
                        return Ok(Value::Bool(true));
                    }
                }
                Value::Bool(false)
            }
            Node::Implies(lhs, rhs) => Value::Bool(!self.truth(lhs)? || self.truth(rhs)?),
            Node::Equiv(lhs, rhs) => Value::Bool(self.truth(lhs)? == self.truth(rhs)?),
            Node::Compare(op, lhs, rhs) => {
                let l = self.value(lhs)?;
                let r = self.value(rhs)?;
                Value::Bool(self.compare(*op, l, r)?)
            }
            Node::Arith(op, lhs, rhs) => {
                let l = self.value(lhs)?;
                let r = self.value(rhs)?;
                self.arith(*op, l, r)?
            }
            Node::Neg(arg) => match self.value(arg)? {
                Value::Real(x) => Value::Real(-x),
                v => match v.as_int().and_then(i64::checked_neg) {
                    Some(n) => Value::Int(n),
                    None => Value::Real(-v.as_real().unwrap_or_default()),
                },
            },
            Node::If(cond, then, otherwise) => {
                if self.truth(cond)? {
                    self.value(then)?
                } else {
                    self.value(otherwise)?
                }
            }
            Node::Aggregate { op, vars, body } => self.aggregate(*op, vars, body)?,
            Node::KronDelta(_) | Node::DiracDelta(_) | Node::Bernoulli(_) | Node::Uniform(..) => {
                let dist = self.distribution(node)?;
                self.sampler.sample(&dist)
            }
        })
    }

    #[allow(clippy::float_cmp)]
    fn compare(&self, op: CmpOp, l: Value, r: Value) -> Result<bool, DomainError> {
        if let (Value::Bool(a), Value::Bool(b)) = (l, r) {
            match op {
                CmpOp::Eq => return Ok(a == b),
                CmpOp::Neq => return Ok(a != b),
                _ => {}
            }
        }
        if let (Value::Int(_) | Value::Bool(_), Value::Int(_) | Value::Bool(_)) = (l, r) {
            if let (Some(a), Some(b)) = (l.as_int(), r.as_int()) {
                return Ok(match op {
                    CmpOp::Eq => a == b,
                    CmpOp::Neq => a != b,
                    CmpOp::Lt => a < b,
                    CmpOp::Le => a <= b,
                    CmpOp::Gt => a > b,
                    CmpOp::Ge => a >= b,
                });
            }
        }
        let a = l.as_real().ok_or_else(|| self.mismatch("number", l))?;
        let b = r.as_real().ok_or_else(|| self.mismatch("number", r))?;
        Ok(match op {
            CmpOp::Eq => a == b,
            CmpOp::Neq => a != b,
            CmpOp::Lt => a < b,
            CmpOp::Le => a <= b,
            CmpOp::Gt => a > b,
            CmpOp::Ge => a >= b,
        })
    }

    fn arith(&self, op: ArithOp, l: Value, r: Value) -> Result<Value, DomainError> {
        let integral = !matches!(l, Value::Real(_)) && !matches!(r, Value::Real(_));
        if integral && op != ArithOp::Div {
            if let (Some(a), Some(b)) = (l.as_int(), r.as_int()) {
                let exact = match op {
                    ArithOp::Add => a.checked_add(b),
                    ArithOp::Sub => a.checked_sub(b),
                    ArithOp::Mul => a.checked_mul(b),
                    ArithOp::Div => None,
                };
                if let Some(n) = exact {
                    return Ok(Value::Int(n));
                }
            }
        }
        let a = l.as_real().ok_or_else(|| self.mismatch("number", l))?;
        let b = r.as_real().ok_or_else(|| self.mismatch("number", r))?;
        Ok(Value::Real(match op {
            ArithOp::Add => a + b,
            ArithOp::Sub => a - b,
            ArithOp::Mul => a * b,
            ArithOp::Div => {
                if b == 0.0 {
                    return Err(DomainError::DivisionByZero {
                        context: self.label.to_string(),
                    });
                }
                a / b
            }
        }))
    }

    fn aggregate(&mut self, op: AggregateOp, vars: &[Binder], body: &Node) -> Result<Value, DomainError> {
        let mut acc = match op {
            AggregateOp::Exists => Value::Bool(false),
            AggregateOp::Forall => Value::Bool(true),
            AggregateOp::Sum => Value::Int(0),
            AggregateOp::Prod => Value::Int(1),
        };
        self.for_each_binding(vars, &mut |walk| {
            match op {
                AggregateOp::Exists => {
                    if walk.truth(body)? {
                        acc = Value::Bool(true);
                        return Ok(ControlFlow::Break(()));
                    }
                }
                AggregateOp::Forall => {
                    if !walk.truth(body)? {
                        acc = Value::Bool(false);
                        return Ok(ControlFlow::Break(()));
                    }
                }
                AggregateOp::Sum => {
                    let v = walk.value(body)?;
                    acc = walk.arith(ArithOp::Add, acc, v)?;
                }
                AggregateOp::Prod => {
                    let v = walk.value(body)?;
                    acc = walk.arith(ArithOp::Mul, acc, v)?;
                }
            }
            Ok(ControlFlow::Continue(()))
        })?;
        Ok(acc)
    }

    /// Enumerates bindings of `vars` in declared object order, first variable outermost.
    fn for_each_binding(
        &mut self,
        vars: &[Binder],
        f: &mut dyn FnMut(&mut Self) -> Result<ControlFlow<()>, DomainError>,
    ) -> Result<ControlFlow<()>, DomainError> {
        let Some((first, rest)) = vars.split_first() else {
            return f(self);
        };
        for ordinal in 0..self.ev.model.domain_len(first.type_id) {
            self.slots[first.slot] = ordinal;
            if self.for_each_binding(rest, f)?.is_break() {
                return Ok(ControlFlow::Break(()));
            }
        }
        Ok(ControlFlow::Continue(()))
    }
}
