//! Builds a [`GroundedModel`] from a domain and an instance.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::ast::{Assignment, DomainDef, Expr, FluentKind, InstanceDef};
use crate::error::{InstantiationError, ModelError, SimError, SimResult};
use crate::value::Value;

use super::compile::{compile, Scope, Site};
use super::dependency::topological_order;
use super::model::{Cpf, GroundedModel, ObjectDomain, PVarId, PVariable, TypeId};

fn object_domains(
    domain: &DomainDef,
    instance: &InstanceDef,
) -> Result<(Vec<ObjectDomain>, HashMap<String, TypeId>), SimError> {
    let type_index: HashMap<String, TypeId> = domain
        .types
        .iter()
        .enumerate()
        .map(|(i, t)| (t.clone(), i))
        .collect();

    let mut objects: Vec<Vec<String>> = vec![Vec::new(); domain.types.len()];
    for decl in &instance.objects {
        let t = *type_index
            .get(&decl.type_name)
            .ok_or_else(|| InstantiationError::UnknownObjectType {
                type_name: decl.type_name.clone(),
            })?;
        objects[t].extend(decl.objects.iter().cloned());
    }

    let types = domain
        .types
        .iter()
        .cloned()
        .zip(objects)
        .map(|(name, objs)| ObjectDomain::new(name, objs))
        .collect();
    Ok((types, type_index))
}

/// Types that must be inhabited: parameter types and quantified variable types.
fn required_types(domain: &DomainDef) -> BTreeSet<&str> {
    let mut required: BTreeSet<&str> = domain
        .pvariables
        .iter()
        .flat_map(|p| p.params.iter().map(String::as_str))
        .collect();
    let exprs = domain
        .cpfs
        .iter()
        .map(|c| &c.expr)
        .chain(std::iter::once(&domain.reward))
        .chain(&domain.state_action_constraints);
    for expr in exprs {
        expr.visit(&mut |e| {
            if let Expr::Aggregate { vars, .. } = e {
                required.extend(vars.iter().map(|v| v.type_name.as_str()));
            }
        });
    }
    required
}

fn pvariables(
    domain: &DomainDef,
    types: &[ObjectDomain],
    type_index: &HashMap<String, TypeId>,
) -> Result<Vec<PVariable>, ModelError> {
    let mut decls: Vec<_> = domain.pvariables.iter().collect();
    decls.sort_by(|a, b| a.name.cmp(&b.name));

    let mut offsets = [0usize; 4];
    let mut out = Vec::with_capacity(decls.len());
    for decl in decls {
        let mut param_types = Vec::with_capacity(decl.params.len());
        for p in &decl.params {
            let t = *type_index.get(p).ok_or_else(|| ModelError::UnknownType {
                type_name: p.clone(),
                context: format!("pvariable '{}'", decl.name),
            })?;
            param_types.push(t);
        }

        let sizes: Vec<usize> = param_types.iter().map(|&t| types[t].len()).collect();
        let mut strides = vec![1usize; sizes.len()];
        for k in (0..sizes.len().saturating_sub(1)).rev() {
            strides[k] = strides[k + 1] * sizes[k + 1];
        }
        let size = sizes.iter().product();

        let default = match decl.default {
            None => decl.range.zero(),
            Some(v) => v.coerce(decl.range).ok_or_else(|| ModelError::InvalidDefault {
                fluent: decl.name.clone(),
                reason: format!("{} default for a {} fluent", v.type_name(), decl.range),
            })?,
        };

        let slot = &mut offsets[kind_slot(decl.kind)];
        let offset = *slot;
        *slot += size;

        out.push(PVariable {
            name: decl.name.clone(),
            kind: decl.kind,
            range: decl.range,
            param_types,
            default,
            offset,
            strides,
            size,
        });
    }
    Ok(out)
}

const fn kind_slot(kind: FluentKind) -> usize {
    match kind {
        FluentKind::NonFluent => 0,
        FluentKind::StateFluent => 1,
        FluentKind::ObservFluent => 2,
        FluentKind::ActionFluent => 3,
    }
}

fn default_table(pvars: &[PVariable], kind: FluentKind) -> Vec<Value> {
    pvars
        .iter()
        .filter(|p| p.kind == kind)
        .flat_map(|p| std::iter::repeat(p.default).take(p.size))
        .collect()
}

/// Applies instance assignments of `kind` onto `table`.
fn apply_assignments(
    table: &mut [Value],
    assignments: &[Assignment],
    kind: FluentKind,
    context: &str,
    types: &[ObjectDomain],
    pvars: &[PVariable],
    pvar_index: &HashMap<String, PVarId>,
) -> Result<(), SimError> {
    for a in assignments {
        let pv = pvar_index
            .get(&a.fluent)
            .map(|&id| &pvars[id])
            .ok_or_else(|| InstantiationError::UndeclaredFluent {
                fluent: a.fluent.clone(),
                context: context.to_string(),
            })?;
        if pv.kind != kind {
            return Err(InstantiationError::WrongFluentKind {
                fluent: a.fluent.clone(),
                context: context.to_string(),
                actual: pv.kind.to_string(),
            }
            .into());
        }
        if pv.param_types.len() != a.args.len() {
            return Err(ModelError::ArityMismatch {
                fluent: a.fluent.clone(),
                expected: pv.param_types.len(),
                actual: a.args.len(),
            }
            .into());
        }
        let mut ordinals = Vec::with_capacity(a.args.len());
        for (&t, arg) in pv.param_types.iter().zip(&a.args) {
            let ordinal = types[t].ordinal(arg).ok_or_else(|| ModelError::ObjectOutOfDomain {
                fluent: a.fluent.clone(),
                object: arg.clone(),
                type_name: types[t].name().to_string(),
            })?;
            ordinals.push(ordinal);
        }
        let value = a
            .value
            .coerce(pv.range)
            .ok_or_else(|| InstantiationError::ValueTypeMismatch {
                fluent: a.fluent.clone(),
                expected: pv.range.to_string(),
                actual: a.value.type_name().to_string(),
            })?;
        table[pv.index_of(&ordinals)] = value;
    }
    Ok(())
}

fn fingerprint(domain: &DomainDef, instance: &InstanceDef) -> SimResult<[u8; 32]> {
    let mut hasher = blake3::Hasher::new();
    for bytes in [serde_json::to_vec(domain), serde_json::to_vec(instance)] {
        let bytes = bytes.map_err(|e| SimError::internal(format!("fingerprint definition: {e}")))?;
        hasher.update(&(bytes.len() as u64).to_le_bytes());
        hasher.update(&bytes);
    }
    Ok(*hasher.finalize().as_bytes())
}

/// Grounds `domain` against `instance`.
///
/// Either returns a complete, validated model or fails with a `ModelError` /
/// `InstantiationError`; no partial model is ever returned.
pub fn build(domain: &DomainDef, instance: &InstanceDef) -> SimResult<GroundedModel> {
    domain.validate()?;
    instance.validate()?;
    if instance.domain != domain.name {
        return Err(InstantiationError::DomainMismatch {
            instance: instance.name.clone(),
            expected: instance.domain.clone(),
            actual: domain.name.clone(),
        }
        .into());
    }

    let (types, type_index) = object_domains(domain, instance)?;
    let pvars = pvariables(domain, &types, &type_index)?;

    for type_name in required_types(domain) {
        // Unknown names surface as ModelError::UnknownType during compilation.
        if let Some(&t) = type_index.get(type_name) {
            if types[t].is_empty() {
                return Err(InstantiationError::EmptyObjectDomain {
                    type_name: type_name.to_string(),
                }
                .into());
            }
        }
    }

    let pvar_index: HashMap<String, PVarId> = pvars
        .iter()
        .enumerate()
        .map(|(i, p)| (p.name.clone(), i))
        .collect();

    let mut non_fluents = default_table(&pvars, FluentKind::NonFluent);
    apply_assignments(
        &mut non_fluents,
        &instance.non_fluents,
        FluentKind::NonFluent,
        "non-fluents",
        &types,
        &pvars,
        &pvar_index,
    )?;
    let mut initial_state = default_table(&pvars, FluentKind::StateFluent);
    apply_assignments(
        &mut initial_state,
        &instance.init_state,
        FluentKind::StateFluent,
        "init-state",
        &types,
        &pvars,
        &pvar_index,
    )?;

    let scope = Scope {
        types: &types,
        type_index: &type_index,
        pvariables: &pvars,
        pvar_index: &pvar_index,
    };

    let mut state_cpfs = BTreeMap::new();
    let mut observ_cpfs = BTreeMap::new();
    let mut observ_reads = BTreeMap::new();
    for def in &domain.cpfs {
        let pvar = *pvar_index.get(&def.fluent).ok_or_else(|| ModelError::UnknownFluent {
            name: def.fluent.clone(),
            context: "cpfs".to_string(),
        })?;
        let pv = &pvars[pvar];
        let (site, label) = match pv.kind {
            FluentKind::StateFluent => (Site::StateCpf(pvar), format!("{}'", pv.name)),
            FluentKind::ObservFluent => (Site::ObservCpf(pvar), pv.name.clone()),
            FluentKind::NonFluent | FluentKind::ActionFluent => {
                return Err(ModelError::UnexpectedCpf {
                    fluent: def.fluent.clone(),
                }
                .into())
            }
        };
        if def.params.len() != pv.param_types.len() {
            return Err(ModelError::ArityMismatch {
                fluent: def.fluent.clone(),
                expected: pv.param_types.len(),
                actual: def.params.len(),
            }
            .into());
        }
        let params: Vec<(String, TypeId)> = def
            .params
            .iter()
            .cloned()
            .zip(pv.param_types.iter().copied())
            .collect();
        let compiled = compile(&scope, site, label, &params, &def.expr)?;
        let cpf = Cpf {
            pvar,
            expr: compiled.expr,
        };
        if pv.kind == FluentKind::StateFluent {
            state_cpfs.insert(pvar, cpf);
        } else {
            observ_reads.insert(pvar, compiled.reads);
            observ_cpfs.insert(pvar, cpf);
        }
    }

    for (id, pv) in pvars.iter().enumerate() {
        let present = match pv.kind {
            FluentKind::StateFluent => state_cpfs.contains_key(&id),
            FluentKind::ObservFluent => observ_cpfs.contains_key(&id),
            FluentKind::NonFluent | FluentKind::ActionFluent => true,
        };
        if !present {
            return Err(ModelError::MissingCpf {
                fluent: pv.name.clone(),
            }
            .into());
        }
    }

    let observ_ids: Vec<PVarId> = observ_cpfs.keys().copied().collect();
    let order = topological_order(&observ_ids, &observ_reads, |id| pvars[id].name.clone())?;
    let observ_cpfs: Vec<Cpf> = order
        .into_iter()
        .filter_map(|id| observ_cpfs.remove(&id))
        .collect();
    let state_cpfs: Vec<Cpf> = state_cpfs.into_values().collect();

    let reward = compile(&scope, Site::Reward, "reward".to_string(), &[], &domain.reward)?.expr;
    let constraints = domain
        .state_action_constraints
        .iter()
        .enumerate()
        .map(|(i, c)| {
            compile(&scope, Site::Constraint, format!("state-action-constraint #{i}"), &[], c)
                .map(|compiled| compiled.expr)
        })
        .collect::<Result<Vec<_>, _>>()?;

    let model = GroundedModel {
        domain_name: domain.name.clone(),
        instance_name: instance.name.clone(),
        action_defaults: default_table(&pvars, FluentKind::ActionFluent),
        observ_defaults: default_table(&pvars, FluentKind::ObservFluent),
        types,
        type_index,
        pvariables: pvars,
        pvar_index,
        non_fluents,
        initial_state,
        state_cpfs,
        observ_cpfs,
        reward,
        constraints,
        horizon: instance.horizon,
        discount: instance.discount,
        max_nondef_actions: instance.max_nondef_actions,
        fingerprint: fingerprint(domain, instance)?,
    };

    tracing::debug!(
        domain = %model.domain_name,
        instance = %model.instance_name,
        state = model.ground_count(FluentKind::StateFluent),
        observ = model.ground_count(FluentKind::ObservFluent),
        action = model.ground_count(FluentKind::ActionFluent),
        non_fluents = model.ground_count(FluentKind::NonFluent),
        "grounded model"
    );
    Ok(model)
}
