//! Ground fluent keys and ordered assignments.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// A fluent grounded over concrete objects: `(name, argument tuple)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroundFluent {
    /// Fluent name.
    pub name: String,
    /// Object arguments, in parameter order.
    #[serde(default)]
    pub args: Vec<String>,
}

impl GroundFluent {
    /// Creates a ground fluent key.
    #[must_use]
    pub fn new(name: &str, args: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            args: args.iter().map(|a| (*a).to_string()).collect(),
        }
    }

    fn matches(&self, name: &str, args: &[&str]) -> bool {
        self.name == name && self.args.len() == args.len() && self.args.iter().zip(args).all(|(a, b)| a == b)
    }
}

impl fmt::Display for GroundFluent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.args.is_empty() {
            return f.write_str(&self.name);
        }
        write!(f, "{}({})", self.name, self.args.join(", "))
    }
}

/// An ordered, total assignment of values to ground fluents of one category.
///
/// Entries follow the canonical ground order: fluent name, then argument
/// tuples in the declared object order of each parameter type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FluentValues {
    entries: Vec<(GroundFluent, Value)>,
}

impl FluentValues {
    pub(crate) fn from_entries(entries: Vec<(GroundFluent, Value)>) -> Self {
        Self { entries }
    }

    /// Looks up the value of `name(args...)`.
    #[must_use]
    pub fn get(&self, name: &str, args: &[&str]) -> Option<Value> {
        self.entries
            .iter()
            .find(|(key, _)| key.matches(name, args))
            .map(|(_, v)| *v)
    }

    /// Boolean view of `name(args...)`; `None` if absent or not boolean.
    #[must_use]
    pub fn is_true(&self, name: &str, args: &[&str]) -> Option<bool> {
        self.get(name, args).and_then(|v| v.as_bool())
    }

    /// Iterates entries in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (&GroundFluent, &Value)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    /// Ground fluents whose value is boolean `true`.
    pub fn true_fluents(&self) -> impl Iterator<Item = &GroundFluent> {
        self.entries
            .iter()
            .filter(|(_, v)| *v == Value::Bool(true))
            .map(|(k, _)| k)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for FluentValues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (k, v)) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{k} = {v}")?;
        }
        f.write_str("}")
    }
}
