//! Per-step CPF dependency ordering.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::ModelError;

use super::model::PVarId;

/// Orders `nodes` so that every node comes after the nodes it reads.
///
/// `reads[a]` holds the nodes whose same-step value `a` reads. Ready nodes are
/// emitted smallest id first, which makes the order stable (ids follow name
/// order). A cycle is reported with the names along it.
pub(crate) fn topological_order(
    nodes: &[PVarId],
    reads: &BTreeMap<PVarId, BTreeSet<PVarId>>,
    name: impl Fn(PVarId) -> String,
) -> Result<Vec<PVarId>, ModelError> {
    let members: BTreeSet<PVarId> = nodes.iter().copied().collect();
    let mut pending: BTreeMap<PVarId, usize> = BTreeMap::new();
    let mut readers: BTreeMap<PVarId, Vec<PVarId>> = BTreeMap::new();

    for &n in nodes {
        let deps: Vec<PVarId> = reads
            .get(&n)
            .into_iter()
            .flatten()
            .copied()
            .filter(|d| *d != n && members.contains(d))
            .collect();
        pending.insert(n, deps.len());
        for d in deps {
            readers.entry(d).or_default().push(n);
        }
    }

    let mut ready: BTreeSet<PVarId> = pending
        .iter()
        .filter(|(_, &count)| count == 0)
        .map(|(&n, _)| n)
        .collect();
    let mut order = Vec::with_capacity(nodes.len());

    while let Some(n) = ready.pop_first() {
        order.push(n);
        for &r in readers.get(&n).into_iter().flatten() {
            if let Some(count) = pending.get_mut(&r) {
                *count -= 1;
                if *count == 0 {
                    ready.insert(r);
                }
            }
        }
    }

    if order.len() == nodes.len() {
        return Ok(order);
    }

    let emitted: BTreeSet<PVarId> = order.into_iter().collect();
    let stuck: BTreeSet<PVarId> = members.difference(&emitted).copied().collect();
    Err(ModelError::CyclicDependency {
        cycle: find_cycle(&stuck, reads).into_iter().map(name).collect(),
    })
}

/// Walks read edges inside `stuck` (every member of which lies on or leads
/// to a cycle) until a node repeats.
fn find_cycle(stuck: &BTreeSet<PVarId>, reads: &BTreeMap<PVarId, BTreeSet<PVarId>>) -> Vec<PVarId> {
    let Some(&start) = stuck.first() else {
        return Vec::new();
    };
    let mut path = vec![start];
    let mut current = start;
    loop {
        let next = reads
            .get(&current)
            .into_iter()
            .flatten()
            .copied()
            .find(|d| *d != current && stuck.contains(d));
        let Some(next) = next else {
            return path;
        };
        if let Some(pos) = path.iter().position(|&p| p == next) {
            let mut cycle = path.split_off(pos);
            cycle.push(next);
            return cycle;
        }
        path.push(next);
        current = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edges(pairs: &[(PVarId, PVarId)]) -> BTreeMap<PVarId, BTreeSet<PVarId>> {
        let mut m: BTreeMap<PVarId, BTreeSet<PVarId>> = BTreeMap::new();
        for &(a, b) in pairs {
            m.entry(a).or_default().insert(b);
        }
        m
    }

    #[test]
    fn independent_nodes_keep_id_order() {
        let order = topological_order(&[3, 1, 2], &BTreeMap::new(), |n| n.to_string()).unwrap();
        assert_eq!(order, vec![1, 2, 3]);
    }

    #[test]
    fn readers_follow_their_dependencies() {
        // 1 reads 3, 2 reads 1
        let order = topological_order(&[1, 2, 3], &edges(&[(1, 3), (2, 1)]), |n| n.to_string()).unwrap();
        assert_eq!(order, vec![3, 1, 2]);
    }

    #[test]
    fn self_reads_are_ignored() {
        let order = topological_order(&[1], &edges(&[(1, 1)]), |n| n.to_string()).unwrap();
        assert_eq!(order, vec![1]);
    }

    #[test]
    fn cycles_are_reported() {
        let err = topological_order(&[1, 2, 3], &edges(&[(1, 2), (2, 1)]), |n| format!("f{n}")).unwrap_err();
        let ModelError::CyclicDependency { cycle } = err else {
            panic!("expected cycle error");
        };
        assert_eq!(cycle, vec!["f1".to_string(), "f2".to_string(), "f1".to_string()]);
    }
}
