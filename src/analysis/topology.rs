use crate::error::{InvariantViolation, Result};
use crate::store::registry::Registry;
use crate::store::types::QuantityId;
use std::collections::{HashSet, VecDeque};

/// Performs a Topological Sort using Depth-First Search (DFS).
///
/// Returns every quantity, each after all of its parents. Fails on the first
/// cycle found, naming a quantity on it.
pub fn sort(registry: &Registry) -> Result<Vec<QuantityId>> {
    let count = registry.count();
    let mut order = Vec::with_capacity(count);
    let mut state = vec![VisitState::None; count];

    // Edges are followed child -> parent, so post-order puts parents first.
    for id in registry.ids() {
        if state[id.index()] == VisitState::None {
            visit(id, registry, &mut state, &mut order)?;
        }
    }
    Ok(order)
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum VisitState {
    None,
    Visiting,
    Visited,
}

fn visit(id: QuantityId, registry: &Registry, state: &mut [VisitState], order: &mut Vec<QuantityId>) -> Result<()> {
    let idx = id.index();
    match state[idx] {
        VisitState::Visited => return Ok(()),
        VisitState::Visiting => {
            return Err(InvariantViolation::CycleDetected { name: registry.get(id).name().to_string() }.into());
        }
        VisitState::None => state[idx] = VisitState::Visiting,
    }

    for &parent in registry.get(id).parents() {
        visit(parent, registry, state, order)?;
    }

    state[idx] = VisitState::Visited;
    order.push(id);
    Ok(())
}

/// The start quantities and everything computed from them.
/// This is exactly the set an invalidation of the start quantities reaches.
pub fn downstream_from(registry: &Registry, start: &[QuantityId]) -> HashSet<QuantityId> {
    closure(start, |id| registry.get(id).children())
}

/// The start quantities and everything they are computed from.
pub fn upstream_from(registry: &Registry, start: &[QuantityId]) -> HashSet<QuantityId> {
    closure(start, |id| registry.get(id).parents())
}

fn closure<'a>(start: &[QuantityId], next: impl Fn(QuantityId) -> &'a [QuantityId]) -> HashSet<QuantityId> {
    let mut visited = HashSet::new();
    let mut queue = VecDeque::from(start.to_vec());
    while let Some(id) = queue.pop_front() {
        if visited.insert(id) {
            queue.extend(next(id).iter().copied());
        }
    }
    visited
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;
    use crate::store::types::{Kind, QuantityMetadata, Unit};

    fn add(reg: &mut Registry, name: &str) -> QuantityId {
        reg.add(QuantityMetadata::new(name, Unit::default()), 1, Kind::Value, None).unwrap()
    }

    #[test]
    fn test_sort_diamond_dependency() {
        // Shape: A -> B, A -> C, B+C -> D
        let mut reg = Registry::new();
        let d = add(&mut reg, "D");
        let b = add(&mut reg, "B");
        let c = add(&mut reg, "C");
        let a = add(&mut reg, "A");
        for (child, parent) in [(b, a), (c, a), (d, b), (d, c)] {
            reg.depends(child, parent).unwrap();
        }

        let res = sort(&reg).unwrap();
        let pos = |id: QuantityId| res.iter().position(|&x| x == id).unwrap();
        assert!(pos(a) < pos(b));
        assert!(pos(a) < pos(c));
        assert!(pos(b) < pos(d));
        assert!(pos(c) < pos(d));
        assert_eq!(res.len(), 4);
    }

    #[test]
    fn test_cycle_detection() {
        let mut reg = Registry::new();
        let a = add(&mut reg, "A");
        let b = add(&mut reg, "B");
        let c = add(&mut reg, "C");
        reg.depends(b, a).unwrap();
        reg.depends(c, b).unwrap();
        reg.depends(a, c).unwrap();
        let err = sort(&reg).unwrap_err();
        assert!(matches!(err, EngineError::Invariant(InvariantViolation::CycleDetected { .. })));
    }

    #[test]
    fn test_closures() {
        let mut reg = Registry::new();
        let a = add(&mut reg, "A");
        let b = add(&mut reg, "B");
        let c = add(&mut reg, "C");
        let x = add(&mut reg, "X");
        reg.depends(b, a).unwrap();
        reg.depends(c, b).unwrap();
        assert_eq!(downstream_from(&reg, &[b]), HashSet::from([b, c]));
        assert_eq!(upstream_from(&reg, &[b]), HashSet::from([a, b]));
        assert_eq!(downstream_from(&reg, &[x]), HashSet::from([x]));
    }
}
