//! Instance definitions: objects, non-fluent overrides, initial state and
//! episode parameters.

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// Ordered object enumeration for one type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectsDecl {
    /// Type the objects belong to.
    pub type_name: String,
    /// Objects in declared order.
    pub objects: Vec<String>,
}

/// A ground value assignment `name(args...) = value`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    /// Fluent name.
    pub fluent: String,
    /// Object arguments.
    #[serde(default)]
    pub args: Vec<String>,
    /// Assigned value.
    pub value: Value,
}

impl Assignment {
    /// Creates an assignment.
    #[must_use]
    pub fn new(fluent: &str, args: &[&str], value: impl Into<Value>) -> Self {
        Self {
            fluent: fluent.to_string(),
            args: args.iter().map(|a| (*a).to_string()).collect(),
            value: value.into(),
        }
    }
}

/// Binds a domain to concrete objects and episode parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceDef {
    /// Instance name.
    pub name: String,
    /// Name of the domain this instance targets.
    pub domain: String,
    /// Object enumerations, one per type.
    #[serde(default)]
    pub objects: Vec<ObjectsDecl>,
    /// Non-fluent overrides.
    #[serde(default)]
    pub non_fluents: Vec<Assignment>,
    /// Initial state-fluent values; unset fluents take their defaults.
    #[serde(default)]
    pub init_state: Vec<Assignment>,
    /// Bound on simultaneously non-default action fluents; `None` is unbounded.
    #[serde(default)]
    pub max_nondef_actions: Option<usize>,
    /// Steps per episode.
    pub horizon: u32,
    /// Per-step discount factor in [0, 1].
    pub discount: f64,
}

impl InstanceDef {
    /// Creates an instance with an unbounded action budget, horizon 1 and no discounting.
    #[must_use]
    pub fn new(name: &str, domain: &str) -> Self {
        Self {
            name: name.to_string(),
            domain: domain.to_string(),
            objects: Vec::new(),
            non_fluents: Vec::new(),
            init_state: Vec::new(),
            max_nondef_actions: None,
            horizon: 1,
            discount: 1.0,
        }
    }

    #[must_use]
    pub fn with_objects(mut self, type_name: &str, objects: &[&str]) -> Self {
        self.objects.push(ObjectsDecl {
            type_name: type_name.to_string(),
            objects: objects.iter().map(|o| (*o).to_string()).collect(),
        });
        self
    }

    #[must_use]
    pub fn with_non_fluent(mut self, fluent: &str, args: &[&str], value: impl Into<Value>) -> Self {
        self.non_fluents.push(Assignment::new(fluent, args, value));
        self
    }

    #[must_use]
    pub fn with_init(mut self, fluent: &str, args: &[&str], value: impl Into<Value>) -> Self {
        self.init_state.push(Assignment::new(fluent, args, value));
        self
    }

    #[must_use]
    pub fn with_max_nondef_actions(mut self, max: usize) -> Self {
        self.max_nondef_actions = Some(max);
        self
    }

    #[must_use]
    pub fn with_horizon(mut self, horizon: u32) -> Self {
        self.horizon = horizon;
        self
    }

    #[must_use]
    pub fn with_discount(mut self, discount: f64) -> Self {
        self.discount = discount;
        self
    }
}
