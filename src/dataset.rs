use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::archive::ArchiveClient;
use crate::config::DatasetConfig;
use crate::domain::{SubjectId, TableName};
use crate::error::MmashError;
use crate::fs_util::{extract_zip, list_subject_dirs};
use crate::store::{Record, Sample, SampleCollection, SampleStore, StoreOptions};
use crate::table::{SUBJECT_COLUMN, read_table};

pub const DATASET_NAME: &str = "MMASH";
/// Directory under the root holding the extracted archive.
pub const MMASH_FOLDER: &str = "MMASH";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Transfer {
    pub received: u64,
    pub total: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
    pub transfer: Option<Transfer>,
}

impl ProgressEvent {
    pub fn phase(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            elapsed: None,
            transfer: None,
        }
    }

    pub fn transfer(received: u64, total: Option<u64>) -> Self {
        Self {
            message: "archive.download".to_string(),
            elapsed: None,
            transfer: Some(Transfer { received, total }),
        }
    }
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "action")]
pub enum Acquisition {
    AlreadyPresent,
    Downloaded { bytes: u64, entries: usize },
}

/// The MMASH dataset: one sample per subject directory holding every requested table.
#[derive(Debug)]
pub struct MmashDataset<S: SampleStore = SampleCollection> {
    config: DatasetConfig,
    dataset_folder: Utf8PathBuf,
    store: S,
    acquisition: Acquisition,
    skipped: Vec<SubjectId>,
}

impl MmashDataset<SampleCollection> {
    pub fn new<C: ArchiveClient>(
        config: DatasetConfig,
        client: &C,
        sink: &dyn ProgressSink,
    ) -> Result<Self, MmashError> {
        Self::with_store(config, SampleCollection::new, client, sink)
    }

    pub fn samples(&self) -> &[Sample] {
        self.store.samples()
    }
}

impl<S: SampleStore> MmashDataset<S> {
    /// Builds the store from the dataset's [`StoreOptions`], fetches the archive
    /// if needed and loads every subject into the store.
    pub fn with_store<C, F>(
        config: DatasetConfig,
        make_store: F,
        client: &C,
        sink: &dyn ProgressSink,
    ) -> Result<Self, MmashError>
    where
        C: ArchiveClient,
        F: FnOnce(StoreOptions) -> S,
    {
        let store = make_store(store_options(&config));
        let dataset_folder = config.root().join(MMASH_FOLDER);
        let acquisition = ensure_archive(&dataset_folder, &config.archive_url, client, sink)?;

        let mut dataset = Self {
            config,
            dataset_folder,
            store,
            acquisition,
            skipped: Vec::new(),
        };
        dataset.load_data(sink)?;
        Ok(dataset)
    }

    pub fn config(&self) -> &DatasetConfig {
        &self.config
    }

    pub fn dataset_folder(&self) -> &Utf8Path {
        &self.dataset_folder
    }

    /// Directory whose children are the subject directories.
    pub fn subjects_root(&self) -> Utf8PathBuf {
        self.dataset_folder.join(MMASH_FOLDER)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub fn acquisition(&self) -> Acquisition {
        self.acquisition
    }

    /// Subjects left out because a requested table file was missing.
    pub fn skipped(&self) -> &[SubjectId] {
        &self.skipped
    }

    fn load_data(&mut self, sink: &dyn ProgressSink) -> Result<(), MmashError> {
        let root = self.subjects_root();
        let subjects = list_subject_dirs(root.as_std_path())?;
        sink.event(ProgressEvent::phase(format!(
            "phase=Assemble; {} subject directories",
            subjects.len()
        )));

        for subject in subjects {
            let subject_dir = root.join(subject.as_str());
            match assemble_record(subject_dir.as_std_path(), &subject, &self.config.tables)? {
                Some(record) => {
                    debug!(subject = %subject, tables = record.len(), "adding sample");
                    self.store
                        .add_sample(subject.as_str(), subject.as_str(), record)?;
                }
                None => self.skipped.push(subject),
            }
        }
        Ok(())
    }
}

pub fn store_options(config: &DatasetConfig) -> StoreOptions {
    StoreOptions {
        dataset_name: DATASET_NAME.to_string(),
        root: config.root.clone(),
        tables: config.tables.clone(),
        dev: config.dev,
        extra: config.extra.clone(),
    }
}

/// Downloads and extracts the archive into `dataset_folder` unless the
/// extracted `MMASH` directory is already there.
///
/// The temporary archive lives next to the extracted data and is removed
/// whether or not the download and extraction succeed.
pub fn ensure_archive<C: ArchiveClient>(
    dataset_folder: &Utf8Path,
    url: &str,
    client: &C,
    sink: &dyn ProgressSink,
) -> Result<Acquisition, MmashError> {
    let marker = dataset_folder.join(MMASH_FOLDER);
    if marker.as_std_path().exists() {
        info!(path = %marker, "archive already extracted");
        sink.event(ProgressEvent::phase("phase=Acquire; already extracted"));
        return Ok(Acquisition::AlreadyPresent);
    }

    fs::create_dir_all(dataset_folder.as_std_path())
        .map_err(|err| MmashError::Filesystem(err.to_string()))?;
    let mut archive = tempfile::Builder::new()
        .prefix("mmash")
        .suffix(".zip")
        .tempfile_in(dataset_folder.as_std_path())
        .map_err(|err| MmashError::Filesystem(err.to_string()))?;

    info!(url, "downloading archive");
    sink.event(ProgressEvent::phase("phase=Acquire; downloading archive"));
    let start = Instant::now();
    let bytes = client.download(url, archive.as_file_mut(), sink)?;
    sink.event(ProgressEvent {
        message: format!("archive.response bytes={bytes}"),
        elapsed: Some(start.elapsed()),
        transfer: None,
    });

    info!(bytes, "extracting archive");
    sink.event(ProgressEvent::phase("phase=Extract; unpacking archive"));
    let entries = extract_zip(archive.path(), dataset_folder.as_std_path())?;
    archive
        .close()
        .map_err(|err| MmashError::Filesystem(err.to_string()))?;

    Ok(Acquisition::Downloaded { bytes, entries })
}

/// Reads the requested tables for one subject.
///
/// Returns `Ok(None)` when any requested file is absent; every other read
/// failure is returned as an error.
pub fn assemble_record(
    subject_dir: &Path,
    subject: &SubjectId,
    tables: &[TableName],
) -> Result<Option<Record>, MmashError> {
    let mut record = Record::new();
    for table in TableName::ALL
        .into_iter()
        .filter(|table| tables.contains(table))
    {
        let path = subject_dir.join(table.file_name());
        let mut data = match read_table(&path) {
            Ok(data) => data,
            Err(MmashError::TableNotFound(missing)) => {
                warn!(subject = %subject, file = %missing.display(), "skipping subject");
                return Ok(None);
            }
            Err(err) => return Err(err),
        };
        data.set_column(SUBJECT_COLUMN, subject.as_str());
        record.insert(table, data);
    }
    Ok(Some(record))
}
