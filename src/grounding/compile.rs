//! Lowering of AST expressions into slot-resolved evaluation trees.
//!
//! Compilation is where every reference in a domain is checked: fluent names
//! and arities, variable scoping and types, object constants, and which
//! fluents a given expression is allowed to read.

use std::collections::{BTreeSet, HashMap};

use crate::ast::{CmpOp, Expr, FluentKind, Term};
use crate::error::ModelError;
use crate::eval::{Arg, Binder, CompiledExpr, Layer, Node, ObjRef};

use super::model::{ObjectDomain, PVarId, PVariable, TypeId};

/// Where an expression appears; decides which reads are legal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Site {
    StateCpf(PVarId),
    ObservCpf(PVarId),
    Reward,
    Constraint,
}

/// Name tables the compiler resolves against.
pub(crate) struct Scope<'m> {
    pub types: &'m [ObjectDomain],
    pub type_index: &'m HashMap<String, TypeId>,
    pub pvariables: &'m [PVariable],
    pub pvar_index: &'m HashMap<String, PVarId>,
}

impl Scope<'_> {
    fn object(&self, name: &str) -> Option<(TypeId, usize)> {
        self.types
            .iter()
            .enumerate()
            .find_map(|(t, d)| d.ordinal(name).map(|o| (t, o)))
    }
}

/// Output of compiling one expression.
pub(crate) struct Compiled {
    pub expr: CompiledExpr,
    /// Observ fluents read by an observ CPF (dependency edges).
    pub reads: BTreeSet<PVarId>,
}

struct Compiler<'s, 'm> {
    scope: &'s Scope<'m>,
    site: Site,
    label: String,
    bound: Vec<(String, usize, TypeId)>,
    next_slot: usize,
    max_slots: usize,
    reads: BTreeSet<PVarId>,
}

/// Compiles `expr` with `params` pre-bound to slots `0..params.len()`.
pub(crate) fn compile(
    scope: &Scope<'_>,
    site: Site,
    label: String,
    params: &[(String, TypeId)],
    expr: &Expr,
) -> Result<Compiled, ModelError> {
    let mut compiler = Compiler {
        scope,
        site,
        label,
        bound: params
            .iter()
            .enumerate()
            .map(|(slot, (name, t))| (name.clone(), slot, *t))
            .collect(),
        next_slot: params.len(),
        max_slots: params.len(),
        reads: BTreeSet::new(),
    };
    let node = compiler.lower(expr)?;
    Ok(Compiled {
        expr: CompiledExpr {
            node,
            slots: compiler.max_slots,
            label: compiler.label,
        },
        reads: compiler.reads,
    })
}

impl Compiler<'_, '_> {
    fn lookup_var(&self, var: &str) -> Result<(usize, TypeId), ModelError> {
        self.bound
            .iter()
            .rev()
            .find(|(name, _, _)| name == var)
            .map(|&(_, slot, t)| (slot, t))
            .ok_or_else(|| ModelError::UnboundVariable {
                var: format!("?{var}"),
                context: self.label.clone(),
            })
    }

    fn invalid(&self, reason: impl Into<String>) -> ModelError {
        ModelError::InvalidExpression {
            context: self.label.clone(),
            reason: reason.into(),
        }
    }

    fn illegal(&self, pv: &PVariable, reason: &str) -> ModelError {
        ModelError::IllegalReference {
            fluent: pv.name.clone(),
            context: self.label.clone(),
            reason: reason.to_string(),
        }
    }

    fn boxed(&mut self, expr: &Expr) -> Result<Box<Node>, ModelError> {
        self.lower(expr).map(Box::new)
    }

    fn lower(&mut self, expr: &Expr) -> Result<Node, ModelError> {
        Ok(match expr {
            Expr::Const { value } => Node::Const(*value),
            Expr::Fluent { name, args, next } => self.lower_read(name, args, *next)?,
            Expr::Term { term } => {
                return Err(self.invalid(format!(
                    "object term '{term}' may only appear in an equality comparison"
                )))
            }
            Expr::Not { arg } => Node::Not(self.boxed(arg)?),
            Expr::And { args } => Node::And(args.iter().map(|a| self.lower(a)).collect::<Result<_, _>>()?),
            Expr::Or { args } => Node::Or(args.iter().map(|a| self.lower(a)).collect::<Result<_, _>>()?),
            Expr::Implies { lhs, rhs } => Node::Implies(self.boxed(lhs)?, self.boxed(rhs)?),
            Expr::Equiv { lhs, rhs } => Node::Equiv(self.boxed(lhs)?, self.boxed(rhs)?),
            Expr::Compare { op, lhs, rhs } => match (lhs.as_ref(), rhs.as_ref()) {
                (Expr::Term { term: l }, Expr::Term { term: r }) => {
                    let negate = match op {
                        CmpOp::Eq => false,
                        CmpOp::Neq => true,
                        _ => return Err(self.invalid("objects only support == and ~=")),
                    };
                    Node::SameObject {
                        lhs: self.object_ref(l)?,
                        rhs: self.object_ref(r)?,
                        negate,
                    }
                }
                _ => Node::Compare(*op, self.boxed(lhs)?, self.boxed(rhs)?),
            },
            Expr::Arith { op, lhs, rhs } => Node::Arith(*op, self.boxed(lhs)?, self.boxed(rhs)?),
            Expr::Neg { arg } => Node::Neg(self.boxed(arg)?),
            Expr::If {
                cond,
                then,
                otherwise,
            } => Node::If(self.boxed(cond)?, self.boxed(then)?, self.boxed(otherwise)?),
            Expr::Aggregate { op, vars, body } => {
                if vars.is_empty() {
                    return Err(self.invalid(format!("{} binds no variables", op.keyword())));
                }
                let saved_bound = self.bound.len();
                let saved_slot = self.next_slot;
                let mut binders = Vec::with_capacity(vars.len());
                for v in vars {
                    let type_id = *self.scope.type_index.get(&v.type_name).ok_or_else(|| {
                        ModelError::UnknownType {
                            type_name: v.type_name.clone(),
                            context: self.label.clone(),
                        }
                    })?;
                    let slot = self.next_slot;
                    self.next_slot += 1;
                    self.max_slots = self.max_slots.max(self.next_slot);
                    self.bound.push((v.var.clone(), slot, type_id));
                    binders.push(Binder { slot, type_id });
                }
                let body = self.boxed(body);
                self.bound.truncate(saved_bound);
                self.next_slot = saved_slot;
                Node::Aggregate {
                    op: *op,
                    vars: binders,
                    body: body?,
                }
            }
            Expr::KronDelta { arg } => Node::KronDelta(self.boxed(arg)?),
            Expr::DiracDelta { arg } => Node::DiracDelta(self.boxed(arg)?),
            Expr::Bernoulli { p } => Node::Bernoulli(self.boxed(p)?),
            Expr::Uniform { low, high } => Node::Uniform(self.boxed(low)?, self.boxed(high)?),
        })
    }

    fn object_ref(&self, term: &Term) -> Result<ObjRef, ModelError> {
        match term {
            Term::Var(v) => {
                let (slot, type_id) = self.lookup_var(v)?;
                Ok(ObjRef {
                    arg: Arg::Slot(slot),
                    type_id,
                })
            }
            Term::Object(o) => {
                let (type_id, ordinal) = self
                    .scope
                    .object(o)
                    .ok_or_else(|| self.invalid(format!("unknown object '{o}'")))?;
                Ok(ObjRef {
                    arg: Arg::Object(ordinal),
                    type_id,
                })
            }
        }
    }

    fn lower_read(&mut self, name: &str, args: &[Term], next: bool) -> Result<Node, ModelError> {
        let scope = self.scope;
        let pvar = *scope.pvar_index.get(name).ok_or_else(|| ModelError::UnknownFluent {
            name: name.to_string(),
            context: self.label.clone(),
        })?;
        let pv = &scope.pvariables[pvar];
        if pv.param_types.len() != args.len() {
            return Err(ModelError::ArityMismatch {
                fluent: pv.name.clone(),
                expected: pv.param_types.len(),
                actual: args.len(),
            });
        }

        let layer = self.check_read(pvar, pv, next)?;

        let mut resolved = Vec::with_capacity(args.len());
        for (&expected, term) in pv.param_types.iter().zip(args) {
            let arg = match term {
                Term::Var(v) => {
                    let (slot, actual) = self.lookup_var(v)?;
                    if actual != expected {
                        return Err(ModelError::VariableTypeMismatch {
                            var: format!("?{v}"),
                            fluent: pv.name.clone(),
                            expected: scope.types[expected].name().to_string(),
                            actual: scope.types[actual].name().to_string(),
                        });
                    }
                    Arg::Slot(slot)
                }
                Term::Object(o) => {
                    let domain = &scope.types[expected];
                    let ordinal = domain.ordinal(o).ok_or_else(|| ModelError::ObjectOutOfDomain {
                        fluent: pv.name.clone(),
                        object: o.clone(),
                        type_name: domain.name().to_string(),
                    })?;
                    Arg::Object(ordinal)
                }
            };
            resolved.push(arg);
        }

        Ok(Node::Read {
            pvar,
            kind: pv.kind,
            layer,
            args: resolved,
        })
    }

    /// Enforces the per-site read rules and records observ dependencies.
    fn check_read(&mut self, pvar: PVarId, pv: &PVariable, next: bool) -> Result<Layer, ModelError> {
        match pv.kind {
            FluentKind::NonFluent | FluentKind::ActionFluent => {
                if next {
                    return Err(self.illegal(pv, "only state and observ fluents have next values"));
                }
                Ok(Layer::Current)
            }
            FluentKind::StateFluent => match (self.site, next) {
                (_, false) => Ok(Layer::Current),
                (Site::ObservCpf(_), true) => Ok(Layer::Next),
                (Site::StateCpf(target), true) if target == pvar => {
                    Err(self.illegal(pv, "a CPF cannot read its own next value"))
                }
                (Site::StateCpf(_), true) => Err(self.illegal(
                    pv,
                    "state CPFs are evaluated against the pre-step snapshot and cannot read next values",
                )),
                (Site::Reward | Site::Constraint, true) => {
                    Err(self.illegal(pv, "only current-step values are visible here"))
                }
            },
            FluentKind::ObservFluent => match self.site {
                Site::ObservCpf(target) if target == pvar => {
                    Err(self.illegal(pv, "an observation cannot read itself"))
                }
                Site::ObservCpf(_) => {
                    self.reads.insert(pvar);
                    Ok(Layer::Next)
                }
                _ => Err(self.illegal(pv, "observations are only visible to other observ CPFs")),
            },
        }
    }
}
