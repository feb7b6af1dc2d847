use std::collections::BTreeMap;

use camino::Utf8PathBuf;
use serde::Serialize;
use serde_json::Value;

use crate::domain::TableName;
use crate::error::MmashError;
use crate::table::Table;

/// Tables read for one subject, keyed by table name.
pub type Record = BTreeMap<TableName, Table>;

#[derive(Debug, Clone, Serialize)]
pub struct Sample {
    pub patient_id: String,
    pub visit_id: String,
    pub record: Record,
}

/// Construction parameters handed to the sample store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoreOptions {
    pub dataset_name: String,
    pub root: Utf8PathBuf,
    pub tables: Vec<TableName>,
    pub dev: bool,
    pub extra: BTreeMap<String, Value>,
}

/// Receiver of assembled records.
pub trait SampleStore {
    fn add_sample(
        &mut self,
        patient_id: &str,
        visit_id: &str,
        record: Record,
    ) -> Result<(), MmashError>;
}

/// In-memory store keeping samples in insertion order.
#[derive(Debug, Clone)]
pub struct SampleCollection {
    options: StoreOptions,
    samples: Vec<Sample>,
}

impl SampleCollection {
    pub fn new(options: StoreOptions) -> Self {
        Self {
            options,
            samples: Vec::new(),
        }
    }

    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    pub fn dataset_name(&self) -> &str {
        &self.options.dataset_name
    }

    pub fn dev(&self) -> bool {
        self.options.dev
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn patient_ids(&self) -> Vec<&str> {
        self.samples
            .iter()
            .map(|sample| sample.patient_id.as_str())
            .collect()
    }

    pub fn get(&self, patient_id: &str) -> Option<&Sample> {
        self.samples
            .iter()
            .find(|sample| sample.patient_id == patient_id)
    }
}

impl SampleStore for SampleCollection {
    fn add_sample(
        &mut self,
        patient_id: &str,
        visit_id: &str,
        record: Record,
    ) -> Result<(), MmashError> {
        self.samples.push(Sample {
            patient_id: patient_id.to_string(),
            visit_id: visit_id.to_string(),
            record,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> StoreOptions {
        StoreOptions {
            dataset_name: "MMASH".to_string(),
            root: Utf8PathBuf::from("data"),
            tables: vec![TableName::Sleep],
            dev: true,
            extra: BTreeMap::new(),
        }
    }

    #[test]
    fn keeps_insertion_order() {
        let mut store = SampleCollection::new(options());
        store.add_sample("user_2", "user_2", Record::new()).unwrap();
        store.add_sample("user_1", "user_1", Record::new()).unwrap();

        assert_eq!(store.patient_ids(), ["user_2", "user_1"]);
        assert_eq!(store.get("user_1").unwrap().visit_id, "user_1");
        assert!(store.dev());
        assert_eq!(store.dataset_name(), "MMASH");
    }
}
