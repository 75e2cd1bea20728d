use crate::store::registry::Registry;
use crate::store::types::Kind;
use std::collections::BTreeMap;
use std::fmt;

/// Structural summary of the graph plus how much recomputation it has done.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GraphStats {
    pub quantities: usize,
    pub edges: usize,
    /// Quantities without an updater.
    pub inputs: usize,
    pub valid: usize,
    pub kind_counts: BTreeMap<String, usize>,
    /// Quantities per updater name.
    pub updater_counts: BTreeMap<String, usize>,
    /// Updater invocations per updater name, summed over quantities.
    pub update_counts: BTreeMap<String, u64>,
    /// Longest parent chain, counted in edges.
    pub depth: usize,
}

impl GraphStats {
    pub fn analyze(registry: &Registry) -> Self {
        let mut stats = GraphStats { quantities: registry.count(), edges: registry.edge_count(), ..Default::default() };
        for (_, q) in registry.iter() {
            *stats.kind_counts.entry(q.kind().to_string()).or_insert(0) += 1;
            if q.is_valid() {
                stats.valid += 1;
            }
            match q.updater() {
                None => stats.inputs += 1,
                Some(u) => {
                    *stats.updater_counts.entry(u.name().to_string()).or_insert(0) += 1;
                    *stats.update_counts.entry(u.name().to_string()).or_insert(0) += q.update_count();
                }
            }
        }
        stats.depth = Self::depth(registry);
        stats
    }

    /// Zero on a cyclic graph, where depth is not defined.
    fn depth(registry: &Registry) -> usize {
        let Ok(order) = super::topology::sort(registry) else {
            return 0;
        };
        let mut depth = vec![0usize; registry.count()];
        for id in order {
            let d = registry.get(id).parents().iter().map(|p| depth[p.index()] + 1).max().unwrap_or(0);
            depth[id.index()] = d;
        }
        depth.into_iter().max().unwrap_or(0)
    }

    pub fn count_of(&self, kind: Kind) -> usize {
        self.kind_counts.get(&kind.to_string()).copied().unwrap_or(0)
    }
}

impl fmt::Display for GraphStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} quantities ({} inputs, {} valid), {} edges, depth {}", self.quantities, self.inputs, self.valid, self.edges, self.depth)?;
        for (name, n) in &self.updater_counts {
            writeln!(f, "  {name:<12} {n:>4} quantities {:>8} updates", self.update_counts.get(name).copied().unwrap_or(0))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::sum::SumUpdater;
    use crate::compute::updater::Updater;
    use crate::store::types::{QuantityMetadata, Unit};

    #[test]
    fn test_counts_and_depth() {
        let mut reg = Registry::new();
        let meta = |n: &str| QuantityMetadata::new(n, Unit::default());
        let a = reg.add(meta("a"), 1, Kind::Value, None).unwrap();
        let b = reg.add(meta("b"), 1, Kind::Value, None).unwrap();
        let s = reg.add(meta("s"), 1, Kind::Value, None).unwrap();
        let mut sum = SumUpdater::new();
        sum.add_term(a);
        sum.add_term(b);
        reg.depends(s, a).unwrap();
        reg.depends(s, b).unwrap();
        reg.set_updater(s, Updater::Sum(sum));
        reg.set_scalar(a, 1.0).unwrap();
        reg.set_scalar(b, 1.0).unwrap();
        reg.update(s).unwrap();

        let stats = GraphStats::analyze(&reg);
        assert_eq!(stats.quantities, 3);
        assert_eq!(stats.edges, 2);
        assert_eq!(stats.inputs, 2);
        assert_eq!(stats.valid, 3);
        assert_eq!(stats.depth, 1);
        assert_eq!(stats.count_of(Kind::Value), 3);
        assert_eq!(stats.update_counts.get("sum"), Some(&1));
        assert!(stats.to_string().contains("sum"));
    }
}
