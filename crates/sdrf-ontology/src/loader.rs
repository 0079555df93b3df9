//! On-disk ontology vocabularies.
//!
//! A vocabulary directory holds one tab-separated file per ontology type,
//! named after the type (`species.tsv`, `ms_vocabulary.tsv`, ...). Each file
//! has a header row with the columns `accession`, `name`, `synonyms` and an
//! optional `category` (and optional numeric `id`). Synonyms are separated by
//! `;`. A missing file means the vocabulary is empty.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use csv::ReaderBuilder;
use tracing::debug;

use sdrf_model::{AnnotatorError, OntologyEntry, OntologyType, Result};

use crate::source::OntologySource;

/// Reads `<dir>/<ontology_type>.tsv` files.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn file_for(&self, ontology_type: OntologyType) -> PathBuf {
        self.root.join(format!("{}.tsv", ontology_type.as_str()))
    }
}

impl OntologySource for DirectorySource {
    fn records(&self, ontology_type: OntologyType) -> Result<Vec<OntologyEntry>> {
        let path = self.file_for(ontology_type);
        if !path.is_file() {
            debug!(path = %path.display(), %ontology_type, "vocabulary file absent");
            return Ok(Vec::new());
        }
        load_vocabulary(&path, ontology_type)
    }

    fn describe(&self) -> String {
        format!("directory {}", self.root.display())
    }
}

/// Loads one vocabulary file.
pub fn load_vocabulary(path: &Path, ontology_type: OntologyType) -> Result<Vec<OntologyEntry>> {
    let rows = read_tsv_rows(path)?;
    let mut entries = Vec::with_capacity(rows.len());

    for (index, row) in rows.iter().enumerate() {
        let line = index + 2;
        let accession = get_field(row, "accession");
        let name = get_field(row, "name");
        if accession.is_empty() && name.is_empty() {
            continue;
        }
        if accession.is_empty() || name.is_empty() {
            return Err(AnnotatorError::configuration(format!(
                "{}:{line}: both accession and name are required",
                path.display()
            )));
        }

        let id = match get_optional(row, "id") {
            Some(raw) => raw.parse::<u64>().map_err(|_| {
                AnnotatorError::configuration(format!(
                    "{}:{line}: invalid id '{raw}'",
                    path.display()
                ))
            })?,
            None => (index + 1) as u64,
        };

        let mut entry = OntologyEntry::new(id, ontology_type, name, accession)
            .with_synonyms(parse_synonyms(&get_field(row, "synonyms")));
        if let Some(category) = get_optional(row, "category") {
            entry = entry.with_category(category);
        }
        entries.push(entry);
    }

    debug!(path = %path.display(), %ontology_type, entries = entries.len(), "loaded vocabulary");
    Ok(entries)
}

/// Parse semicolon-separated synonyms.
fn parse_synonyms(raw: &str) -> Vec<String> {
    raw.split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn read_tsv_rows(path: &Path) -> Result<Vec<BTreeMap<String, String>>> {
    let mut reader = ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .quoting(false)
        .flexible(true)
        .from_path(path)
        .map_err(|error| csv_error(path, &error))?;

    let headers = reader
        .headers()
        .map_err(|error| csv_error(path, &error))?
        .iter()
        .map(|header| header.trim_matches('\u{feff}').trim().to_lowercase())
        .collect::<Vec<_>>();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|error| csv_error(path, &error))?;
        let mut row = BTreeMap::new();
        for (idx, value) in record.iter().enumerate() {
            if let Some(key) = headers.get(idx) {
                row.insert(key.clone(), value.trim().to_string());
            }
        }
        rows.push(row);
    }
    Ok(rows)
}

fn csv_error(path: &Path, error: &csv::Error) -> AnnotatorError {
    AnnotatorError::configuration(format!("failed to read {}: {error}", path.display()))
}

fn get_field(row: &BTreeMap<String, String>, key: &str) -> String {
    row.get(key).cloned().unwrap_or_default()
}

fn get_optional(row: &BTreeMap<String, String>, key: &str) -> Option<String> {
    row.get(key).filter(|v| !v.is_empty()).cloned()
}
