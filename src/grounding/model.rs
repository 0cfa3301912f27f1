//! The immutable grounded model shared by every episode of an instance.

use std::collections::HashMap;

use crate::ast::FluentKind;
use crate::eval::CompiledExpr;
use crate::value::{Value, ValueType};

use super::fluent::{FluentValues, GroundFluent};

/// Index of an object type in the model.
pub type TypeId = usize;

/// Index of a pvariable in the model (pvariables are sorted by name).
pub type PVarId = usize;

/// A named type with its ordered object enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectDomain {
    name: String,
    objects: Vec<String>,
    index: HashMap<String, usize>,
}

impl ObjectDomain {
    pub(crate) fn new(name: String, objects: Vec<String>) -> Self {
        let index = objects
            .iter()
            .enumerate()
            .map(|(i, o)| (o.clone(), i))
            .collect();
        Self {
            name,
            objects,
            index,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Objects in declared order.
    #[must_use]
    pub fn objects(&self) -> &[String] {
        &self.objects
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Position of `object` in the declared order.
    #[must_use]
    pub fn ordinal(&self, object: &str) -> Option<usize> {
        self.index.get(object).copied()
    }
}

/// A grounded pvariable: its declaration plus its slice of the dense table
/// for its category.
#[derive(Debug, Clone, PartialEq)]
pub struct PVariable {
    pub(crate) name: String,
    pub(crate) kind: FluentKind,
    pub(crate) range: ValueType,
    pub(crate) param_types: Vec<TypeId>,
    pub(crate) default: Value,
    pub(crate) offset: usize,
    pub(crate) strides: Vec<usize>,
    pub(crate) size: usize,
}

impl PVariable {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn kind(&self) -> FluentKind {
        self.kind
    }

    #[must_use]
    pub const fn range(&self) -> ValueType {
        self.range
    }

    #[must_use]
    pub fn param_types(&self) -> &[TypeId] {
        &self.param_types
    }

    #[must_use]
    pub const fn default_value(&self) -> Value {
        self.default
    }

    /// Number of ground instances (product of parameter domain sizes).
    #[must_use]
    pub const fn ground_count(&self) -> usize {
        self.size
    }

    /// Table index for a tuple of object ordinals.
    #[must_use]
    pub fn index_of(&self, ordinals: &[usize]) -> usize {
        self.offset
            + ordinals
                .iter()
                .zip(&self.strides)
                .map(|(o, s)| o * s)
                .sum::<usize>()
    }

    /// Writes the object ordinals of the `local`-th ground instance into `out`.
    pub(crate) fn decode(&self, local: usize, out: &mut [usize]) {
        let mut rest = local;
        for (slot, stride) in out.iter_mut().zip(&self.strides) {
            *slot = rest / stride;
            rest %= stride;
        }
    }
}

/// A CPF bound to its target pvariable.
#[derive(Debug, Clone, PartialEq)]
pub struct Cpf {
    pub(crate) pvar: PVarId,
    pub(crate) expr: CompiledExpr,
}

impl Cpf {
    #[must_use]
    pub const fn target(&self) -> PVarId {
        self.pvar
    }
}

/// Immutable result of grounding a domain against an instance.
///
/// Built once by [`ground`](super::ground) and shared read-only (via `Arc`)
/// by every episode of the instance.
#[derive(Debug, Clone)]
pub struct GroundedModel {
    pub(crate) domain_name: String,
    pub(crate) instance_name: String,
    pub(crate) types: Vec<ObjectDomain>,
    pub(crate) type_index: HashMap<String, TypeId>,
    pub(crate) pvariables: Vec<PVariable>,
    pub(crate) pvar_index: HashMap<String, PVarId>,
    pub(crate) non_fluents: Vec<Value>,
    pub(crate) initial_state: Vec<Value>,
    pub(crate) action_defaults: Vec<Value>,
    pub(crate) observ_defaults: Vec<Value>,
    pub(crate) state_cpfs: Vec<Cpf>,
    pub(crate) observ_cpfs: Vec<Cpf>,
    pub(crate) reward: CompiledExpr,
    pub(crate) constraints: Vec<CompiledExpr>,
    pub(crate) horizon: u32,
    pub(crate) discount: f64,
    pub(crate) max_nondef_actions: Option<usize>,
    pub(crate) fingerprint: [u8; 32],
}

impl GroundedModel {
    #[must_use]
    pub fn domain_name(&self) -> &str {
        &self.domain_name
    }

    #[must_use]
    pub fn instance_name(&self) -> &str {
        &self.instance_name
    }

    #[must_use]
    pub const fn horizon(&self) -> u32 {
        self.horizon
    }

    #[must_use]
    pub const fn discount(&self) -> f64 {
        self.discount
    }

    #[must_use]
    pub const fn max_nondef_actions(&self) -> Option<usize> {
        self.max_nondef_actions
    }

    /// blake3 digest of the domain and instance definitions this model was built from.
    #[must_use]
    pub const fn fingerprint(&self) -> &[u8; 32] {
        &self.fingerprint
    }

    #[must_use]
    pub fn object_domains(&self) -> &[ObjectDomain] {
        &self.types
    }

    #[must_use]
    pub fn object_domain(&self, type_name: &str) -> Option<&ObjectDomain> {
        self.type_index.get(type_name).map(|&t| &self.types[t])
    }

    pub(crate) fn domain_len(&self, type_id: TypeId) -> usize {
        self.types[type_id].len()
    }

    /// All pvariables, sorted by name.
    #[must_use]
    pub fn pvariables(&self) -> &[PVariable] {
        &self.pvariables
    }

    #[must_use]
    pub fn pvariable(&self, name: &str) -> Option<&PVariable> {
        self.pvariable_id(name).map(|id| &self.pvariables[id])
    }

    pub(crate) fn pvariable_id(&self, name: &str) -> Option<PVarId> {
        self.pvar_index.get(name).copied()
    }

    /// State CPFs in sampling order.
    #[must_use]
    pub fn state_cpfs(&self) -> &[Cpf] {
        &self.state_cpfs
    }

    /// Observ CPFs in dependency order.
    #[must_use]
    pub fn observ_cpfs(&self) -> &[Cpf] {
        &self.observ_cpfs
    }

    /// Number of ground fluents of the given category.
    #[must_use]
    pub fn ground_count(&self, kind: FluentKind) -> usize {
        self.pvariables
            .iter()
            .filter(|p| p.kind == kind)
            .map(|p| p.size)
            .sum()
    }

    /// Ground fluent keys of one category in table order.
    #[must_use]
    pub fn ground_fluents(&self, kind: FluentKind) -> Vec<GroundFluent> {
        let mut out = Vec::with_capacity(self.ground_count(kind));
        for pv in self.pvariables.iter().filter(|p| p.kind == kind) {
            let mut ordinals = vec![0; pv.param_types.len()];
            for local in 0..pv.size {
                pv.decode(local, &mut ordinals);
                out.push(self.ground_key(pv, &ordinals));
            }
        }
        out
    }

    fn ground_key(&self, pv: &PVariable, ordinals: &[usize]) -> GroundFluent {
        GroundFluent {
            name: pv.name.clone(),
            args: pv
                .param_types
                .iter()
                .zip(ordinals)
                .map(|(&t, &o)| self.types[t].objects[o].clone())
                .collect(),
        }
    }

    /// Pairs a dense table of one category with its ground keys.
    #[must_use]
    pub fn describe(&self, kind: FluentKind, values: &[Value]) -> FluentValues {
        FluentValues::from_entries(self.ground_fluents(kind).into_iter().zip(values.iter().copied()).collect())
    }

    /// Resolves `name(args...)` to its category and table index.
    #[must_use]
    pub fn locate(&self, name: &str, args: &[&str]) -> Option<(FluentKind, usize)> {
        let pv = self.pvariable(name)?;
        if pv.param_types.len() != args.len() {
            return None;
        }
        let mut ordinals = Vec::with_capacity(args.len());
        for (&t, arg) in pv.param_types.iter().zip(args) {
            ordinals.push(self.types[t].ordinal(arg)?);
        }
        Some((pv.kind, pv.index_of(&ordinals)))
    }

    /// All non-fluent values.
    #[must_use]
    pub fn non_fluents(&self) -> FluentValues {
        self.describe(FluentKind::NonFluent, &self.non_fluents)
    }

    /// Value of one ground non-fluent.
    #[must_use]
    pub fn non_fluent(&self, name: &str, args: &[&str]) -> Option<Value> {
        match self.locate(name, args)? {
            (FluentKind::NonFluent, idx) => self.non_fluents.get(idx).copied(),
            _ => None,
        }
    }

    /// Initial state (init-state over defaults).
    #[must_use]
    pub fn initial_state(&self) -> FluentValues {
        self.describe(FluentKind::StateFluent, &self.initial_state)
    }

    pub(crate) fn initial_state_table(&self) -> &[Value] {
        &self.initial_state
    }

    pub(crate) fn non_fluent_table(&self) -> &[Value] {
        &self.non_fluents
    }

    pub(crate) fn action_defaults(&self) -> &[Value] {
        &self.action_defaults
    }

    pub(crate) fn observ_defaults(&self) -> &[Value] {
        &self.observ_defaults
    }

    pub(crate) fn reward(&self) -> &CompiledExpr {
        &self.reward
    }

    pub(crate) fn constraints(&self) -> &[CompiledExpr] {
        &self.constraints
    }

    /// Largest slot count over every compiled expression.
    pub(crate) fn max_slots(&self) -> usize {
        self.state_cpfs
            .iter()
            .chain(&self.observ_cpfs)
            .map(|c| c.expr.slots)
            .chain(std::iter::once(self.reward.slots))
            .chain(self.constraints.iter().map(|c| c.slots))
            .max()
            .unwrap_or(0)
    }
}
