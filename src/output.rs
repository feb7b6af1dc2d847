use std::collections::BTreeMap;
use std::io::{self, Write};

use serde::Serialize;

use crate::dataset::{Acquisition, MmashDataset, ProgressEvent, ProgressSink};
use crate::domain::TableName;
use crate::store::SampleCollection;

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Interactive,
    NonInteractive,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoadSummary {
    pub dataset: String,
    pub root: String,
    pub dev: bool,
    pub acquisition: Acquisition,
    pub tables: Vec<TableName>,
    pub subjects: Vec<SubjectSummary>,
    pub skipped: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubjectSummary {
    pub patient_id: String,
    /// Row count per table.
    pub rows: BTreeMap<TableName, usize>,
}

impl From<&MmashDataset<SampleCollection>> for LoadSummary {
    fn from(dataset: &MmashDataset<SampleCollection>) -> Self {
        let store = dataset.store();
        Self {
            dataset: store.dataset_name().to_string(),
            root: dataset.dataset_folder().to_string(),
            dev: store.dev(),
            acquisition: dataset.acquisition(),
            tables: dataset.config().tables.clone(),
            subjects: store
                .samples()
                .iter()
                .map(|sample| SubjectSummary {
                    patient_id: sample.patient_id.clone(),
                    rows: sample
                        .record
                        .iter()
                        .map(|(name, table)| (*name, table.len()))
                        .collect(),
                })
                .collect(),
            skipped: dataset
                .skipped()
                .iter()
                .map(|subject| subject.to_string())
                .collect(),
        }
    }
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_summary(summary: &LoadSummary) -> io::Result<()> {
        Self::print_json(summary)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

impl ProgressSink for JsonOutput {
    fn event(&self, _event: ProgressEvent) {}
}

/// Writes phase messages and a running byte count to stderr.
pub struct StderrProgress;

impl ProgressSink for StderrProgress {
    fn event(&self, event: ProgressEvent) {
        let mut stderr = io::stderr().lock();
        let _ = match event.transfer {
            Some(transfer) => match transfer.total {
                Some(total) if total > 0 => write!(
                    stderr,
                    "\rDownloading MMASH: {} / {}",
                    format_bytes(transfer.received),
                    format_bytes(total)
                ),
                _ => write!(
                    stderr,
                    "\rDownloading MMASH: {}",
                    format_bytes(transfer.received)
                ),
            },
            None => match event.elapsed {
                Some(elapsed) => writeln!(
                    stderr,
                    "\n{} ({:.1}s)",
                    event.message,
                    elapsed.as_secs_f64()
                ),
                None => writeln!(stderr, "{}", event.message),
            },
        };
    }
}

fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}
