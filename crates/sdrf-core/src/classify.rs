//! SDRF column classification.
//!
//! Maps accepted matches to SDRF column names through a static rule table.
//! MS vocabulary entries are routed by their sub-category; every other
//! ontology type has exactly one column.

use std::collections::BTreeMap;

use tracing::warn;

use sdrf_model::{
    ColumnFormat, MatchResult, MetadataColumn, OntologyEntry, OntologyType, SDRF_COLUMNS,
    column_format, numbered_column,
};

/// MS vocabulary sub-category -> column.
const MS_CATEGORY_RULES: &[(&str, &str)] = &[
    ("instrument", "comment[instrument]"),
    ("fragmentation method", "comment[fragmentation method]"),
    ("dissociation method", "comment[fragmentation method]"),
    ("cleavage agent", "comment[cleavage agent details]"),
    ("label", "comment[label]"),
];

/// The SDRF column an entry belongs in, if a rule covers it.
pub fn column_for(entry: &OntologyEntry) -> Option<&'static str> {
    match entry.ontology_type {
        OntologyType::Species => Some("characteristics[organism]"),
        OntologyType::Tissue => Some("characteristics[organism part]"),
        OntologyType::Disease => Some("characteristics[disease]"),
        OntologyType::SubcellularLocation => Some("comment[subcellular location]"),
        OntologyType::Modification => Some("comment[modification parameters]"),
        OntologyType::MsVocabulary => {
            let category = entry.category.as_deref()?.trim().to_lowercase().replace(['_', '-'], " ");
            MS_CATEGORY_RULES
                .iter()
                .find(|(name, _)| *name == category)
                .map(|(_, column)| *column)
        }
    }
}

/// Cell value for `entry` in `column`.
pub fn column_value(column: &str, entry: &OntologyEntry) -> String {
    match column_format(column) {
        Some(ColumnFormat::Ontology) => entry.sdrf_value(),
        _ => entry.canonical_name.clone(),
    }
}

fn canonical_position(column: &str) -> usize {
    SDRF_COLUMNS
        .iter()
        .position(|spec| spec.name == column)
        .unwrap_or(SDRF_COLUMNS.len())
}

/// Turns matches into numbered metadata columns.
///
/// Matches without a rule are dropped with a warning. Within one column an
/// accession appears once (its best match), ordered by confidence and then
/// accession; the first keeps the bare name and later ones are numbered
/// `.1`, `.2`, ... Columns come out in canonical SDRF header order.
pub fn classify(matches: &[MatchResult]) -> Vec<MetadataColumn> {
    let mut by_column: BTreeMap<&'static str, Vec<&MatchResult>> = BTreeMap::new();
    for result in matches {
        match column_for(&result.entry) {
            Some(column) => by_column.entry(column).or_default().push(result),
            None => warn!(
                accession = %result.entry.accession,
                ontology_type = %result.entry.ontology_type,
                category = result.entry.category.as_deref().unwrap_or(""),
                "no SDRF column rule for match, dropping"
            ),
        }
    }

    let mut grouped: Vec<(&'static str, Vec<&MatchResult>)> = by_column.into_iter().collect();
    grouped.sort_by_key(|(column, _)| canonical_position(column));

    let mut columns = Vec::new();
    for (column, mut results) in grouped {
        results.sort_by(|a, b| {
            b.confidence
                .total_cmp(&a.confidence)
                .then_with(|| a.entry.accession.cmp(&b.entry.accession))
        });
        let mut seen: Vec<&str> = Vec::new();
        for result in results {
            if seen.contains(&result.entry.accession.as_str()) {
                continue;
            }
            seen.push(&result.entry.accession);
            let name = numbered_column(column, seen.len() - 1);
            columns.push(
                MetadataColumn::new(name, column_value(column, &result.entry))
                    .with_source(result.clone()),
            );
        }
    }
    columns
}

#[cfg(test)]
mod tests {
    use sdrf_model::{ExtractedTerm, MatchType};

    use super::*;

    fn matched(entry: OntologyEntry, confidence: f64) -> MatchResult {
        let match_type = if confidence == 1.0 {
            MatchType::Exact
        } else {
            MatchType::Fuzzy
        };
        let term = ExtractedTerm::standalone(&entry.canonical_name, 0);
        MatchResult::new(term, entry, confidence, match_type).unwrap()
    }

    #[test]
    fn ms_categories_route_to_columns() {
        let orbitrap = OntologyEntry::new(1, OntologyType::MsVocabulary, "Orbitrap Fusion", "MS:1002416")
            .with_category("instrument");
        let hcd = OntologyEntry::new(2, OntologyType::MsVocabulary, "HCD", "MS:1000422")
            .with_category("Dissociation_Method");
        let unknown = OntologyEntry::new(3, OntologyType::MsVocabulary, "mass spectrometer", "MS:1000031");
        assert_eq!(column_for(&orbitrap), Some("comment[instrument]"));
        assert_eq!(column_for(&hcd), Some("comment[fragmentation method]"));
        assert_eq!(column_for(&unknown), None);
    }

    #[test]
    fn repeated_columns_are_numbered_by_confidence() {
        let oxidation = OntologyEntry::new(1, OntologyType::Modification, "Oxidation", "UNIMOD:35");
        let acetyl = OntologyEntry::new(2, OntologyType::Modification, "Acetyl", "UNIMOD:1");
        let phospho = OntologyEntry::new(3, OntologyType::Modification, "Phospho", "UNIMOD:21");
        let columns = classify(&[
            matched(phospho, 0.7),
            matched(oxidation, 1.0),
            matched(acetyl, 0.7),
        ]);
        let names: Vec<_> = columns.iter().map(|column| column.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "comment[modification parameters]",
                "comment[modification parameters].1",
                "comment[modification parameters].2",
            ]
        );
        assert_eq!(columns[0].value, "NT=Oxidation;AC=UNIMOD:35");
        // Equal confidence: smaller accession first.
        assert_eq!(columns[1].value, "NT=Acetyl;AC=UNIMOD:1");
    }

    #[test]
    fn same_accession_appears_once() {
        let liver = OntologyEntry::new(1, OntologyType::Tissue, "liver", "UBERON:0002107");
        let columns = classify(&[matched(liver.clone(), 0.7), matched(liver, 1.0)]);
        assert_eq!(columns.len(), 1);
        assert_eq!(columns[0].source_match.as_ref().unwrap().confidence, 1.0);
    }

    #[test]
    fn columns_follow_canonical_order() {
        let mouse = OntologyEntry::new(1, OntologyType::Species, "Mus musculus", "NCBITaxon:10090");
        let liver = OntologyEntry::new(2, OntologyType::Tissue, "liver", "UBERON:0002107");
        let columns = classify(&[matched(liver, 1.0), matched(mouse, 1.0)]);
        assert_eq!(columns[0].name, "characteristics[organism]");
        assert_eq!(columns[1].name, "characteristics[organism part]");
        assert!(columns.iter().all(|column| !column.persisted));
    }
}
