//! Periodic actions keyed by an opaque, never reused handle.
use crate::error::{InputError, Result};
use crate::store::types::QuantityId;
use std::collections::BTreeMap;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Save one quantity to an automatically numbered file.
    AutoSave { quantity: QuantityId, format: String },
    /// Append one row to a table.
    AutoTabulate { quantities: Vec<QuantityId>, table: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PeriodicAction {
    pub action: Action,
    pub period: f64,
    /// Number of times the action has fired.
    pub count: u64,
}

impl PeriodicAction {
    /// Fires once `period` of simulated time has elapsed since the last
    /// scheduled instant. At most once per step, so a step longer than the
    /// period fires late rather than repeatedly.
    fn due(&self, time: f64) -> bool {
        time - self.count as f64 * self.period >= self.period
    }
}

#[derive(Debug, Default)]
pub struct HandleTable {
    next: usize,
    entries: BTreeMap<usize, PeriodicAction>,
}

impl HandleTable {
    pub fn new() -> Self { Self::default() }
    pub fn len(&self) -> usize { self.entries.len() }
    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    pub fn get(&self, handle: usize) -> Option<&PeriodicAction> { self.entries.get(&handle) }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &PeriodicAction)> {
        self.entries.iter().map(|(&h, a)| (h, a))
    }

    pub fn register(&mut self, action: Action, period: f64) -> usize {
        let handle = self.next;
        self.next += 1;
        info!(handle, period, ?action, "periodic action registered");
        self.entries.insert(handle, PeriodicAction { action, period, count: 0 });
        handle
    }

    pub fn remove(&mut self, handle: usize) -> Result<PeriodicAction> {
        let removed = self.entries.remove(&handle).ok_or(InputError::UnknownHandle { handle })?;
        info!(handle, "periodic action removed");
        Ok(removed)
    }

    /// The actions due at `time`, in handle order. Nothing is counted as fired
    /// until [`mark_fired`](Self::mark_fired) confirms the effect happened.
    pub fn due(&self, time: f64) -> Vec<(usize, Action)> {
        self.entries
            .iter()
            .filter(|(_, entry)| entry.due(time))
            .map(|(&handle, entry)| (handle, entry.action.clone()))
            .collect()
    }

    /// Records one completed firing. Unknown handles are ignored.
    pub fn mark_fired(&mut self, handle: usize, time: f64) {
        if let Some(entry) = self.entries.get_mut(&handle) {
            entry.count += 1;
            debug!(handle, time, count = entry.count, "periodic action fired");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;

    fn save() -> Action {
        Action::AutoSave { quantity: QuantityId(0), format: "json".into() }
    }

    /// Fires everything due at `time`, as a successful step would.
    fn fire(table: &mut HandleTable, time: f64) -> usize {
        let due = table.due(time);
        for &(handle, _) in &due {
            table.mark_fired(handle, time);
        }
        due.len()
    }

    #[test]
    fn test_fires_at_each_period() {
        let mut table = HandleTable::new();
        table.register(save(), 1.0);
        let fired: Vec<f64> = [0.5, 1.0, 1.5, 2.0, 2.5, 3.0]
            .into_iter()
            .filter(|&t| fire(&mut table, t) > 0)
            .collect();
        assert_eq!(fired, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_large_step_fires_once() {
        let mut table = HandleTable::new();
        let h = table.register(save(), 1.0);
        assert_eq!(fire(&mut table, 3.5), 1);
        assert_eq!(table.get(h).map(|a| a.count), Some(1));
        // Catches up one period per step.
        assert_eq!(fire(&mut table, 3.5), 1);
    }

    #[test]
    fn test_handles_are_not_reused() {
        let mut table = HandleTable::new();
        let a = table.register(save(), 1.0);
        let b = table.register(save(), 1.0);
        table.remove(a).unwrap();
        let c = table.register(save(), 1.0);
        assert!(c > b);
        assert!(matches!(table.remove(a), Err(EngineError::Input(InputError::UnknownHandle { handle })) if handle == a));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_unconfirmed_action_stays_due() {
        let mut table = HandleTable::new();
        let a = table.register(save(), 1.0);
        let b = table.register(save(), 1.0);
        assert_eq!(table.due(1.0).len(), 2);
        table.mark_fired(b, 1.0);
        assert_eq!(table.due(1.0), vec![(a, save())]);
        assert_eq!(table.get(a).map(|e| e.count), Some(0));
    }
}
