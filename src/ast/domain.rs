//! Domain definitions: types, pvariables, CPFs, reward and constraints.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::value::{Value, ValueType};

use super::expr::Expr;

/// Category of a pvariable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FluentKind {
    /// Per-instance constant.
    NonFluent,
    /// Hidden state, updated by a CPF every step.
    StateFluent,
    /// Emitted to the policy, computed from the post-transition state.
    ObservFluent,
    /// Chosen by the policy each step.
    ActionFluent,
}

impl FluentKind {
    /// Returns true if this kind requires exactly one CPF.
    #[must_use]
    pub const fn has_cpf(self) -> bool {
        matches!(self, Self::StateFluent | Self::ObservFluent)
    }
}

impl fmt::Display for FluentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NonFluent => "non-fluent",
            Self::StateFluent => "state-fluent",
            Self::ObservFluent => "observ-fluent",
            Self::ActionFluent => "action-fluent",
        })
    }
}

/// Declaration of a parameterized fluent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PVariableDecl {
    /// Fluent name.
    pub name: String,
    /// Category.
    pub kind: FluentKind,
    /// Value range.
    pub range: ValueType,
    /// Parameter types, in order.
    #[serde(default)]
    pub params: Vec<String>,
    /// Declared default. Observ-fluents may omit it; the range's zero is used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl PVariableDecl {
    /// Creates a declaration.
    #[must_use]
    pub fn new(
        name: &str,
        kind: FluentKind,
        range: ValueType,
        params: &[&str],
        default: Option<Value>,
    ) -> Self {
        Self {
            name: name.to_string(),
            kind,
            range,
            params: params.iter().map(|p| (*p).to_string()).collect(),
            default,
        }
    }

    #[must_use]
    pub fn non_fluent(name: &str, range: ValueType, params: &[&str], default: impl Into<Value>) -> Self {
        Self::new(name, FluentKind::NonFluent, range, params, Some(default.into()))
    }

    #[must_use]
    pub fn state(name: &str, range: ValueType, params: &[&str], default: impl Into<Value>) -> Self {
        Self::new(name, FluentKind::StateFluent, range, params, Some(default.into()))
    }

    #[must_use]
    pub fn observ(name: &str, range: ValueType, params: &[&str]) -> Self {
        Self::new(name, FluentKind::ObservFluent, range, params, None)
    }

    #[must_use]
    pub fn action(name: &str, range: ValueType, params: &[&str], default: impl Into<Value>) -> Self {
        Self::new(name, FluentKind::ActionFluent, range, params, Some(default.into()))
    }
}

/// Conditional probability function for one state or observ fluent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CpfDef {
    /// Target fluent name (without prime).
    pub fluent: String,
    /// Parameter variables, bound to the target's parameter types in order.
    #[serde(default)]
    pub params: Vec<String>,
    /// Next-value expression.
    pub expr: Expr,
}

impl CpfDef {
    /// Creates a CPF; a leading `?` on parameters is stripped.
    #[must_use]
    pub fn new(fluent: &str, params: &[&str], expr: Expr) -> Self {
        Self {
            fluent: fluent.to_string(),
            params: params
                .iter()
                .map(|p| p.strip_prefix('?').unwrap_or(p).to_string())
                .collect(),
            expr,
        }
    }
}

/// A complete domain description, as produced by an external parser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainDef {
    /// Domain name; instances refer to it.
    pub name: String,
    /// Object type names.
    #[serde(default)]
    pub types: Vec<String>,
    /// Fluent declarations.
    #[serde(default)]
    pub pvariables: Vec<PVariableDecl>,
    /// One CPF per state/observ fluent.
    #[serde(default)]
    pub cpfs: Vec<CpfDef>,
    /// Per-step reward.
    pub reward: Expr,
    /// Boolean constraints over state and action.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub state_action_constraints: Vec<Expr>,
}

impl DomainDef {
    /// Creates an empty domain with zero reward.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            types: Vec::new(),
            pvariables: Vec::new(),
            cpfs: Vec::new(),
            reward: Expr::real(0.0),
            state_action_constraints: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_types(mut self, types: &[&str]) -> Self {
        self.types.extend(types.iter().map(|t| (*t).to_string()));
        self
    }

    #[must_use]
    pub fn with_pvariable(mut self, decl: PVariableDecl) -> Self {
        self.pvariables.push(decl);
        self
    }

    #[must_use]
    pub fn with_cpf(mut self, cpf: CpfDef) -> Self {
        self.cpfs.push(cpf);
        self
    }

    #[must_use]
    pub fn with_reward(mut self, reward: Expr) -> Self {
        self.reward = reward;
        self
    }

    #[must_use]
    pub fn with_constraint(mut self, constraint: Expr) -> Self {
        self.state_action_constraints.push(constraint);
        self
    }

    /// Looks up a pvariable declaration by name.
    #[must_use]
    pub fn pvariable(&self, name: &str) -> Option<&PVariableDecl> {
        self.pvariables.iter().find(|p| p.name == name)
    }
}
