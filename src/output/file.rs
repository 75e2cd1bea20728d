//! Writes snapshots and tables under an output directory.
//!
//! Snapshots: `json` (the serialized [`Snapshot`]) or `txt` (one line per cell,
//! one column per component). Tables: tab-separated text, header line prefixed
//! with `#`.
use super::{OutputSink, Snapshot};
use crate::error::{InputError, Result};
use std::collections::hash_map::{Entry, HashMap};
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug)]
pub struct FileSink {
    dir: PathBuf,
    tables: HashMap<String, BufWriter<File>>,
}

impl FileSink {
    /// Creates `dir` if needed.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir, tables: HashMap::new() })
    }

    pub fn dir(&self) -> &Path { &self.dir }

    fn write_text(path: &Path, snapshot: &Snapshot) -> Result<()> {
        let mut w = BufWriter::new(File::create(path)?);
        writeln!(w, "# quantity: {}", snapshot.quantity)?;
        writeln!(w, "# unit: {}", snapshot.unit)?;
        writeln!(w, "# time: {}", snapshot.time)?;
        match &snapshot.buffer {
            None => {
                let line: Vec<String> = snapshot.multiplier.iter().map(|v| v.to_string()).collect();
                writeln!(w, "{}", line.join("\t"))?;
            }
            Some(buffer) => {
                writeln!(w, "# size: {:?}", buffer.size3d())?;
                for i in 0..buffer.cells() {
                    let line: Vec<String> = (0..buffer.ncomp()).map(|c| buffer.component(c)[i].to_string()).collect();
                    writeln!(w, "{}", line.join("\t"))?;
                }
            }
        }
        w.flush()?;
        Ok(())
    }
}

impl OutputSink for FileSink {
    fn save(&mut self, file_name: &str, format: &str, snapshot: &Snapshot) -> Result<()> {
        let path = self.dir.join(file_name);
        match format {
            "json" => {
                let w = BufWriter::new(File::create(&path)?);
                serde_json::to_writer_pretty(w, snapshot)?;
            }
            "txt" => Self::write_text(&path, snapshot)?,
            other => return Err(InputError::UnsupportedFormat { format: other.to_string() }.into()),
        }
        debug!(path = %path.display(), "saved");
        Ok(())
    }

    fn tabulate(&mut self, table: &str, header: &[String], row: &[f64]) -> Result<()> {
        let w = match self.tables.entry(table.to_string()) {
            Entry::Occupied(e) => e.into_mut(),
            Entry::Vacant(e) => {
                let path = self.dir.join(table);
                let mut w = BufWriter::new(OpenOptions::new().create(true).append(true).open(&path)?);
                writeln!(w, "# {}", header.join("\t"))?;
                debug!(path = %path.display(), "opened table");
                e.insert(w)
            }
        };
        let line: Vec<String> = row.iter().map(|v| v.to_string()).collect();
        writeln!(w, "{}", line.join("\t"))?;
        w.flush()?;
        Ok(())
    }
}
