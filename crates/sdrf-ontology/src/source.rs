use parking_lot::RwLock;

use sdrf_model::{OntologyEntry, OntologyType, Result};

/// Read-only provider of ontology vocabulary records.
pub trait OntologySource: Send + Sync {
    /// Returns every record of one ontology type. An unknown or empty
    /// vocabulary yields an empty list.
    fn records(&self, ontology_type: OntologyType) -> Result<Vec<OntologyEntry>>;

    /// Short label used in log output.
    fn describe(&self) -> String {
        "ontology source".to_string()
    }
}

/// In-memory records, replaceable between refreshes.
#[derive(Debug, Default)]
pub struct MemorySource {
    records: RwLock<Vec<OntologyEntry>>,
}

impl MemorySource {
    pub fn new(records: Vec<OntologyEntry>) -> Self {
        Self {
            records: RwLock::new(records),
        }
    }

    /// Replaces the records; the index sees them on its next refresh.
    pub fn replace(&self, records: Vec<OntologyEntry>) {
        *self.records.write() = records;
    }

    pub fn push(&self, record: OntologyEntry) {
        self.records.write().push(record);
    }
}

impl OntologySource for MemorySource {
    fn records(&self, ontology_type: OntologyType) -> Result<Vec<OntologyEntry>> {
        Ok(self
            .records
            .read()
            .iter()
            .filter(|record| record.ontology_type == ontology_type)
            .cloned()
            .collect())
    }

    fn describe(&self) -> String {
        format!("in-memory source ({} records)", self.records.read().len())
    }
}
