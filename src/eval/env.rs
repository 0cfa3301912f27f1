//! The snapshot an expression is evaluated against.

use crate::value::Value;

/// Dense fluent tables visible to one evaluation.
///
/// Tables are indexed by the offsets the grounder assigned. For state CPFs
/// `next_state` is never read; for observ CPFs both `state` and `next_state`
/// hold the post-transition generation.
#[derive(Debug, Clone, Copy)]
#[allow(missing_docs)]
pub struct Env<'a> {
    pub non_fluents: &'a [Value],
    pub state: &'a [Value],
    pub next_state: &'a [Value],
    pub action: &'a [Value],
    /// Observations computed so far in the current step.
    pub observations: &'a [Value],
}

impl<'a> Env<'a> {
    /// Environment for state CPFs, reward and constraints.
    #[must_use]
    pub const fn current(non_fluents: &'a [Value], state: &'a [Value], action: &'a [Value]) -> Self {
        Self {
            non_fluents,
            state,
            next_state: state,
            action,
            observations: &[],
        }
    }

    /// Environment for observ CPFs: reads see the post-transition state.
    #[must_use]
    pub const fn observing(
        non_fluents: &'a [Value],
        next_state: &'a [Value],
        action: &'a [Value],
        observations: &'a [Value],
    ) -> Self {
        Self {
            non_fluents,
            state: next_state,
            next_state,
            action,
            observations,
        }
    }
}
