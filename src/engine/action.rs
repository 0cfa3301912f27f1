//! Actions submitted to the engine and their resolution into a dense table.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ast::FluentKind;
use crate::error::ActionError;
use crate::grounding::{GroundFluent, GroundedModel};
use crate::value::Value;

/// One ground action fluent set to a value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionAssignment {
    pub fluent: GroundFluent,
    pub value: Value,
}

/// A (possibly empty) set of action fluent assignments.
///
/// Fluents not mentioned take their declared default.
///
/// # Examples
///
/// ```
/// use fluentsim::Action;
///
/// let action = Action::noop().with("useToolOn", &["a1", "l1", "o1"], true);
/// assert_eq!(action.len(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Action {
    assignments: Vec<ActionAssignment>,
}

impl Action {
    /// The empty action: every action fluent at its default.
    #[must_use]
    pub fn noop() -> Self {
        Self::default()
    }

    /// Adds an assignment.
    #[must_use]
    pub fn with(mut self, fluent: &str, args: &[&str], value: impl Into<Value>) -> Self {
        self.set(fluent, args, value);
        self
    }

    /// Adds an assignment in place.
    pub fn set(&mut self, fluent: &str, args: &[&str], value: impl Into<Value>) {
        self.assignments.push(ActionAssignment {
            fluent: GroundFluent::new(fluent, args),
            value: value.into(),
        });
    }

    #[must_use]
    pub fn assignments(&self) -> &[ActionAssignment] {
        &self.assignments
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.assignments.is_empty() {
            return f.write_str("noop");
        }
        for (i, a) in self.assignments.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{} = {}", a.fluent, a.value)?;
        }
        Ok(())
    }
}

/// Validates `action` against `model` and produces the full action table.
pub(crate) fn resolve(model: &GroundedModel, action: &Action) -> Result<Vec<Value>, ActionError> {
    let defaults = model.action_defaults();
    let mut table = defaults.to_vec();
    let mut seen = HashSet::with_capacity(action.len());

    for a in &action.assignments {
        let name = &a.fluent.name;
        let pv = model.pvariable(name).ok_or_else(|| ActionError::UnknownFluent {
            fluent: name.clone(),
        })?;
        if pv.kind() != FluentKind::ActionFluent {
            return Err(ActionError::NotAnAction {
                fluent: name.clone(),
            });
        }
        if pv.param_types().len() != a.fluent.args.len() {
            return Err(ActionError::ArityMismatch {
                fluent: name.clone(),
                expected: pv.param_types().len(),
                actual: a.fluent.args.len(),
            });
        }
        let domains = model.object_domains();
        let mut ordinals = Vec::with_capacity(a.fluent.args.len());
        for (&t, arg) in pv.param_types().iter().zip(&a.fluent.args) {
            let ordinal = domains[t].ordinal(arg).ok_or_else(|| ActionError::UnknownObject {
                fluent: name.clone(),
                object: arg.clone(),
                type_name: domains[t].name().to_string(),
            })?;
            ordinals.push(ordinal);
        }
        let value = a.value.coerce(pv.range()).ok_or_else(|| ActionError::ValueTypeMismatch {
            fluent: name.clone(),
            expected: pv.range().to_string(),
            actual: a.value.type_name().to_string(),
        })?;
        let index = pv.index_of(&ordinals);
        if !seen.insert(index) {
            return Err(ActionError::DuplicateAssignment {
                fluent: a.fluent.to_string(),
            });
        }
        table[index] = value;
    }

    if let Some(max) = model.max_nondef_actions() {
        let actual = table.iter().zip(defaults).filter(|(v, d)| v != d).count();
        if actual > max {
            return Err(ActionError::TooManyNonDefault { max, actual });
        }
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_lists_assignments() {
        assert_eq!(Action::noop().to_string(), "noop");
        let a = Action::noop().with("move", &["a1", "x2"], true).with("speed", &[], 2.5);
        assert_eq!(a.to_string(), "move(a1, x2) = true, speed = 2.5");
    }

    #[test]
    fn set_appends_in_order() {
        let mut a = Action::noop();
        a.set("repair", &["a1", "c1"], true);
        a.set("up", &["a1"], true);
        let names: Vec<_> = a.assignments().iter().map(|x| x.fluent.name.as_str()).collect();
        assert_eq!(names, vec!["repair", "up"]);
        assert!(!a.is_empty());
    }
}
