//! In-memory sink. Clones share the same event log, so a test can keep one
//! clone and hand the other to the engine.
use super::{OutputSink, Snapshot};
use crate::error::Result;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone, PartialEq)]
pub enum OutputEvent {
    Save { file_name: String, format: String, snapshot: Snapshot },
    Tabulate { table: String, header: Vec<String>, row: Vec<f64> },
}

#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<OutputEvent>>>,
}

impl RecordingSink {
    pub fn new() -> Self { Self::default() }

    fn lock(&self) -> MutexGuard<'_, Vec<OutputEvent>> {
        // A poisoned log is still a valid log.
        self.events.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn events(&self) -> Vec<OutputEvent> { self.lock().clone() }

    pub fn saves(&self) -> Vec<(String, Snapshot)> {
        self.lock()
            .iter()
            .filter_map(|e| match e {
                OutputEvent::Save { file_name, snapshot, .. } => Some((file_name.clone(), snapshot.clone())),
                _ => None,
            })
            .collect()
    }

    pub fn rows(&self, table: &str) -> Vec<Vec<f64>> {
        self.lock()
            .iter()
            .filter_map(|e| match e {
                OutputEvent::Tabulate { table: t, row, .. } if t == table => Some(row.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) { self.lock().clear() }
}

impl OutputSink for RecordingSink {
    fn save(&mut self, file_name: &str, format: &str, snapshot: &Snapshot) -> Result<()> {
        self.lock().push(OutputEvent::Save {
            file_name: file_name.to_string(),
            format: format.to_string(),
            snapshot: snapshot.clone(),
        });
        Ok(())
    }

    fn tabulate(&mut self, table: &str, header: &[String], row: &[f64]) -> Result<()> {
        self.lock().push(OutputEvent::Tabulate { table: table.to_string(), header: header.to_vec(), row: row.to_vec() });
        Ok(())
    }
}
