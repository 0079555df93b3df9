//! Ontology index with build-aside refresh.
//!
//! An [`IndexSnapshot`] is immutable once built. [`OntologyIndex`] holds the
//! active snapshot behind an `Arc`; readers clone the `Arc` and keep using it
//! for the whole operation, so a concurrent refresh never changes what they
//! see. A refresh builds a complete replacement first and only then takes the
//! write lock to swap the pointer.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tracing::{info, info_span, warn};

use sdrf_model::{AnnotatorError, OntologyEntry, OntologyType, Result, normalize_text};

use crate::source::{MemorySource, OntologySource};

/// An entry together with its normalized canonical name and synonyms.
#[derive(Debug, Clone)]
pub struct IndexedEntry {
    pub entry: OntologyEntry,
    /// Normalized names, canonical first, without duplicates or empties.
    pub normalized_names: Vec<String>,
}

impl IndexedEntry {
    fn new(entry: OntologyEntry) -> Self {
        let mut normalized_names: Vec<String> = Vec::new();
        for name in entry.names() {
            let normalized = normalize_text(name);
            if !normalized.is_empty() && !normalized_names.contains(&normalized) {
                normalized_names.push(normalized);
            }
        }
        Self {
            entry,
            normalized_names,
        }
    }
}

#[derive(Debug, Default)]
struct CategoryIndex {
    /// Sorted by accession.
    entries: Vec<IndexedEntry>,
    /// Normalized name or synonym -> position in `entries`.
    by_name: HashMap<String, usize>,
    /// Some name starts with a digit (`18o`, `10plex`).
    numeric_names: bool,
}

impl CategoryIndex {
    fn build(ontology_type: OntologyType, records: Vec<OntologyEntry>) -> Result<Self> {
        let mut records = records;
        records.sort_by(|a, b| a.accession.cmp(&b.accession));
        for pair in records.windows(2) {
            if pair[0].accession == pair[1].accession {
                return Err(AnnotatorError::configuration(format!(
                    "duplicate accession '{}' in {ontology_type} vocabulary",
                    pair[0].accession
                )));
            }
        }

        let entries: Vec<IndexedEntry> = records.into_iter().map(IndexedEntry::new).collect();
        let mut by_name = HashMap::new();
        for (position, indexed) in entries.iter().enumerate() {
            for name in &indexed.normalized_names {
                // Entries are visited in accession order, so a name shared by
                // several entries resolves to the smallest accession.
                by_name.entry(name.clone()).or_insert(position);
            }
        }
        let numeric_names = by_name
            .keys()
            .any(|name| name.starts_with(|ch: char| ch.is_ascii_digit()));
        Ok(Self {
            entries,
            by_name,
            numeric_names,
        })
    }
}

/// Immutable per-category lookup structure.
#[derive(Debug, Default)]
pub struct IndexSnapshot {
    generation: u64,
    categories: BTreeMap<OntologyType, CategoryIndex>,
}

impl IndexSnapshot {
    /// Groups records by ontology type and indexes every normalized name.
    ///
    /// Fails with a configuration error when an accession repeats within a
    /// category.
    pub fn build(records: Vec<OntologyEntry>, generation: u64) -> Result<Self> {
        let mut grouped: BTreeMap<OntologyType, Vec<OntologyEntry>> = BTreeMap::new();
        for record in records {
            grouped.entry(record.ontology_type).or_default().push(record);
        }
        let mut categories = BTreeMap::new();
        for (ontology_type, group) in grouped {
            categories.insert(ontology_type, CategoryIndex::build(ontology_type, group)?);
        }
        Ok(Self {
            generation,
            categories,
        })
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// O(1) lookup of an already-normalized name.
    pub fn lookup_exact(
        &self,
        normalized_text: &str,
        ontology_type: OntologyType,
    ) -> Option<&OntologyEntry> {
        let category = self.categories.get(&ontology_type)?;
        let position = *category.by_name.get(normalized_text)?;
        category.entries.get(position).map(|indexed| &indexed.entry)
    }

    /// Entries of one category in accession order.
    ///
    /// The iterator is finite and can be restarted by calling this again.
    pub fn candidates(
        &self,
        ontology_type: OntologyType,
    ) -> impl Iterator<Item = &IndexedEntry> + Clone + '_ {
        self.categories
            .get(&ontology_type)
            .map(|category| category.entries.as_slice())
            .unwrap_or_default()
            .iter()
    }

    /// Types with at least one name starting with a digit, in canonical order.
    pub fn types_with_numeric_names(&self) -> Vec<OntologyType> {
        self.categories
            .iter()
            .filter(|(_, category)| category.numeric_names)
            .map(|(ontology_type, _)| *ontology_type)
            .collect()
    }

    pub fn len(&self, ontology_type: OntologyType) -> usize {
        self.categories
            .get(&ontology_type)
            .map_or(0, |category| category.entries.len())
    }

    pub fn total_len(&self) -> usize {
        self.categories
            .values()
            .map(|category| category.entries.len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total_len() == 0
    }

    pub fn stats(&self) -> IndexStats {
        IndexStats {
            generation: self.generation,
            total_entries: self.total_len(),
            entries: OntologyType::ALL
                .iter()
                .map(|ontology_type| (*ontology_type, self.len(*ontology_type)))
                .collect(),
        }
    }
}

/// Entry counts of the active snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    pub generation: u64,
    pub total_entries: usize,
    pub entries: BTreeMap<OntologyType, usize>,
}

/// The shared ontology index.
pub struct OntologyIndex {
    source: Arc<dyn OntologySource>,
    active: RwLock<Arc<IndexSnapshot>>,
    // Serializes refreshes; readers never take it.
    refresh_lock: Mutex<()>,
}

impl std::fmt::Debug for OntologyIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OntologyIndex")
            .field("source", &self.source.describe())
            .field("generation", &self.active.read().generation())
            .finish()
    }
}

impl OntologyIndex {
    /// Builds the first snapshot from `source`.
    ///
    /// An index with no entries at all is a configuration error.
    pub fn load(source: Arc<dyn OntologySource>) -> Result<Self> {
        let _span = info_span!("refresh", generation = 1u64).entered();
        let snapshot = build_snapshot(source.as_ref(), 1)?;
        Ok(Self {
            source,
            active: RwLock::new(Arc::new(snapshot)),
            refresh_lock: Mutex::new(()),
        })
    }

    /// Convenience constructor over an in-memory record set.
    pub fn from_records(records: Vec<OntologyEntry>) -> Result<Self> {
        Self::load(Arc::new(MemorySource::new(records)))
    }

    /// The current snapshot. Hold on to it for the duration of an operation.
    pub fn snapshot(&self) -> Arc<IndexSnapshot> {
        Arc::clone(&*self.active.read())
    }

    /// Rebuilds from the source and swaps the new snapshot in.
    ///
    /// On failure the previous snapshot stays active.
    pub fn refresh(&self) -> Result<IndexStats> {
        let _guard = self.refresh_lock.lock();
        let generation = self.active.read().generation() + 1;
        let _span = info_span!("refresh", generation).entered();

        match build_snapshot(self.source.as_ref(), generation) {
            Ok(snapshot) => {
                let stats = snapshot.stats();
                *self.active.write() = Arc::new(snapshot);
                Ok(stats)
            }
            Err(error) => {
                warn!(%error, "ontology refresh failed; keeping previous snapshot");
                Err(error)
            }
        }
    }

    pub fn stats(&self) -> IndexStats {
        self.snapshot().stats()
    }
}

fn build_snapshot(source: &dyn OntologySource, generation: u64) -> Result<IndexSnapshot> {
    let started = Instant::now();
    let mut records = Vec::new();
    for ontology_type in OntologyType::ALL {
        records.extend(source.records(ontology_type)?);
    }
    let snapshot = IndexSnapshot::build(records, generation)?;
    if snapshot.is_empty() {
        return Err(AnnotatorError::configuration(format!(
            "ontology index is empty ({})",
            source.describe()
        )));
    }
    info!(
        generation,
        entries = snapshot.total_len(),
        duration_ms = started.elapsed().as_millis() as u64,
        "ontology index built"
    );
    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: u64, ontology_type: OntologyType, name: &str, accession: &str) -> OntologyEntry {
        OntologyEntry::new(id, ontology_type, name, accession)
    }

    #[test]
    fn lookup_uses_normalized_names_and_synonyms() {
        let snapshot = IndexSnapshot::build(
            vec![
                entry(1, OntologyType::Species, "Mus musculus", "NCBITaxon:10090")
                    .with_synonyms(["mouse"]),
            ],
            1,
        )
        .unwrap();
        assert!(snapshot.lookup_exact("mus musculus", OntologyType::Species).is_some());
        assert!(snapshot.lookup_exact("mouse", OntologyType::Species).is_some());
        assert!(snapshot.lookup_exact("mouse", OntologyType::Tissue).is_none());
    }

    #[test]
    fn shared_synonym_resolves_to_smallest_accession() {
        let snapshot = IndexSnapshot::build(
            vec![
                entry(1, OntologyType::Tissue, "hepatic tissue", "UBERON:9").with_synonyms(["liver"]),
                entry(2, OntologyType::Tissue, "liver", "UBERON:1"),
            ],
            1,
        )
        .unwrap();
        let found = snapshot.lookup_exact("liver", OntologyType::Tissue).unwrap();
        assert_eq!(found.accession, "UBERON:1");
    }

    #[test]
    fn reports_types_with_numeric_names() {
        let snapshot = IndexSnapshot::build(
            vec![
                entry(1, OntologyType::Modification, "Label:18O(2)", "UNIMOD:193")
                    .with_synonyms(["18O"]),
                entry(2, OntologyType::Modification, "Oxidation", "UNIMOD:35"),
                entry(3, OntologyType::Tissue, "liver", "UBERON:0002107"),
            ],
            1,
        )
        .unwrap();
        assert_eq!(snapshot.types_with_numeric_names(), vec![OntologyType::Modification]);
    }

    #[test]
    fn duplicate_accession_in_category_is_rejected() {
        let error = IndexSnapshot::build(
            vec![
                entry(1, OntologyType::Disease, "cancer", "DOID:162"),
                entry(2, OntologyType::Disease, "malignant neoplasm", "DOID:162"),
            ],
            1,
        )
        .unwrap_err();
        assert_eq!(error.error_type(), "configuration_error");
    }

    #[test]
    fn same_accession_in_different_categories_is_allowed() {
        let snapshot = IndexSnapshot::build(
            vec![
                entry(1, OntologyType::Disease, "x", "SHARED:1"),
                entry(2, OntologyType::Tissue, "y", "SHARED:1"),
            ],
            1,
        );
        assert!(snapshot.is_ok());
    }

    #[test]
    fn candidates_are_restartable() {
        let snapshot = IndexSnapshot::build(
            vec![
                entry(1, OntologyType::Tissue, "liver", "UBERON:2"),
                entry(2, OntologyType::Tissue, "kidney", "UBERON:1"),
            ],
            1,
        )
        .unwrap();
        let first: Vec<_> = snapshot
            .candidates(OntologyType::Tissue)
            .map(|c| c.entry.accession.clone())
            .collect();
        let second: Vec<_> = snapshot
            .candidates(OntologyType::Tissue)
            .map(|c| c.entry.accession.clone())
            .collect();
        assert_eq!(first, vec!["UBERON:1", "UBERON:2"]);
        assert_eq!(first, second);
        assert_eq!(snapshot.candidates(OntologyType::Disease).count(), 0);
    }
}
