//! Grounding: expansion of a lifted domain over an instance's objects.
//!
//! [`ground`] turns a `DomainDef` and an `InstanceDef` into an immutable
//! [`GroundedModel`] that every episode of the instance shares.

mod compile;
mod dependency;
mod fluent;
mod grounder;
mod model;

use std::sync::Arc;

use crate::ast::{DomainDef, InstanceDef};
use crate::error::SimResult;

pub use fluent::{FluentValues, GroundFluent};
pub use model::{Cpf, GroundedModel, ObjectDomain, PVarId, PVariable, TypeId};

/// Grounds `domain` against `instance`.
///
/// # Errors
///
/// Returns `SimError::Model` for invalid domain references, unknown types,
/// missing CPFs or cyclic observation dependencies, and
/// `SimError::Instantiation` for invalid instance data.
pub fn ground(domain: &DomainDef, instance: &InstanceDef) -> SimResult<Arc<GroundedModel>> {
    grounder::build(domain, instance).map(Arc::new)
}
