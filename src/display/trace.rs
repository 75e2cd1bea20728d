//! Textual views: a one-line-per-quantity dump and the audit trace of one
//! quantity with everything it is computed from.
use crate::store::quantity::Quantity;
use crate::store::registry::Registry;
use crate::store::types::{shape_name, QuantityId};
use std::collections::HashMap;
use std::fmt::Write;

/// `engine` followed by `name(parent parent ...)` per quantity, in creation order.
pub fn dump(registry: &Registry) -> String {
    let mut out = String::from("engine\n");
    for (_, q) in registry.iter() {
        let parents: Vec<&str> = q.parents().iter().map(|&p| registry.get(p).name()).collect();
        let _ = writeln!(
            out,
            "\t{}({}) {} {} [{}] {} {}",
            q.meta().full_name(),
            parents.join(" "),
            q.kind(),
            shape_name(q.ncomp()),
            q.unit(),
            q.updater_name(),
            if q.is_valid() { "valid" } else { "stale" },
        );
    }
    out
}

/// Walks parents depth first. A quantity reached a second time is printed as a
/// back-reference to the level where it first appeared.
pub struct Tracer<'a> {
    registry: &'a Registry,
    visited_at_level: HashMap<QuantityId, usize>,
    output: String,
}

impl<'a> Tracer<'a> {
    pub fn new(registry: &'a Registry) -> Self {
        Self { registry, visited_at_level: HashMap::new(), output: String::new() }
    }

    /// Values are shown as stored; the caller updates `target` first if it
    /// wants them current.
    pub fn trace(mut self, target: QuantityId) -> String {
        let name = self.registry.get(target).name();
        let _ = writeln!(self.output, "AUDIT TRACE for quantity '{}':", name);
        let _ = writeln!(self.output, "--------------------------------------------------");
        self.trace_node(target, 1, "");
        self.output
    }

    fn trace_node(&mut self, id: QuantityId, level: usize, prefix: &str) {
        if let Some(&first_seen) = self.visited_at_level.get(&id) {
            let _ = writeln!(self.output, "{}-> {} (Ref to L{})", prefix, self.registry.get(id).name(), first_seen);
            return;
        }
        self.visited_at_level.insert(id, level);

        let q = self.registry.get(id);
        let header = format!("[L{}] {}{} {} {}", level, q.name(), format_value(q), q.kind(), q.unit());
        let stale = if q.is_valid() { "" } else { " (stale)" };
        match q.updater() {
            None => {
                let _ = writeln!(self.output, "{}{} -> Input{}", prefix, header, stale);
            }
            Some(u) => {
                let parents: Vec<&str> = q.parents().iter().map(|&p| self.registry.get(p).name()).collect();
                let _ = writeln!(self.output, "{}{} = {}({}){}", prefix, header, u.name(), parents.join(", "), stale);
                self.recurse_parents(prefix, q.parents(), level);
            }
        }
    }

    fn recurse_parents(&mut self, prefix: &str, parents: &[QuantityId], level: usize) {
        let stem = build_child_stem(prefix);
        for (i, &parent) in parents.iter().enumerate() {
            let connector = if i == parents.len() - 1 { "`--" } else { "|--" };
            self.trace_node(parent, level + 1, &format!("{}{}", stem, connector));
        }
    }
}

fn format_value(q: &Quantity) -> String {
    if let Some(a) = q.storage().array.as_ref() {
        return format!("[max|v|={:.3e}]", a.max_abs(q.multiplier()));
    }
    match q.multiplier() {
        [v] => format!("[{:.3}]", v),
        vs if vs.len() <= 3 => {
            let parts: Vec<String> = vs.iter().map(|v| format!("{:.3}", v)).collect();
            format!("[{}]", parts.join(", "))
        }
        vs => format!("[{:.3}, ... x{}]", vs[0], vs.len()),
    }
}

fn build_child_stem(prefix: &str) -> String {
    prefix.replace("`--", "   ").replace("|--", "|  ")
}
