#![allow(missing_docs)]

use proptest::prelude::*;

use sdrf_map::{ExtractionOptions, MatchOptions, TermExtractor, TermMatcher};
use sdrf_model::{ExtractedTerm, MatchType, OntologyEntry, OntologyType};
use sdrf_ontology::IndexSnapshot;

fn fixtures() -> IndexSnapshot {
    IndexSnapshot::build(
        vec![
            OntologyEntry::new(1, OntologyType::Species, "Mus musculus", "NCBITaxon:10090")
                .with_synonyms(["mouse"]),
            OntologyEntry::new(2, OntologyType::Species, "Homo sapiens", "NCBITaxon:9606")
                .with_synonyms(["human"]),
            OntologyEntry::new(3, OntologyType::Tissue, "liver", "UBERON:0002107"),
            OntologyEntry::new(4, OntologyType::Tissue, "kidney", "UBERON:0002113"),
            OntologyEntry::new(5, OntologyType::SubcellularLocation, "hepatocytes", "GO:0000001"),
            OntologyEntry::new(6, OntologyType::SubcellularLocation, "nucleus", "GO:0005634"),
            OntologyEntry::new(7, OntologyType::Modification, "Oxidation", "UNIMOD:35"),
            OntologyEntry::new(8, OntologyType::Modification, "Carbamidomethyl", "UNIMOD:4"),
            OntologyEntry::new(9, OntologyType::MsVocabulary, "Orbitrap Fusion Lumos", "MS:1002732")
                .with_category("instrument"),
        ],
        1,
    )
    .unwrap()
}

#[test]
fn protocol_sentence_yields_exact_species_and_tissue() {
    let snapshot = fixtures();
    let extractor = TermExtractor::default();
    let matcher = TermMatcher::default();

    let terms = extractor.extract("Lyse cells in liver tissue from Mus musculus at 4°C", &[]);
    let spans: Vec<&str> = terms.iter().map(|term| term.text_span.as_str()).collect();
    assert!(spans.contains(&"liver"));
    assert!(spans.contains(&"Mus musculus"));

    let liver = terms.iter().find(|term| term.text_span == "liver").unwrap();
    let liver_matches = matcher.match_term(&snapshot, liver, &[]).unwrap();
    assert_eq!(liver_matches[0].entry.canonical_name, "liver");
    assert_eq!(liver_matches[0].match_type, MatchType::Exact);
    assert_eq!(liver_matches[0].confidence, 1.0);

    let mouse = terms.iter().find(|term| term.text_span == "Mus musculus").unwrap();
    let mouse_matches = matcher.match_term(&snapshot, mouse, &[]).unwrap();
    assert_eq!(mouse_matches[0].entry.accession, "NCBITaxon:10090");
    assert_eq!(mouse_matches[0].match_type, MatchType::Exact);
    assert_eq!(mouse_matches[0].confidence, 1.0);
}

#[test]
fn near_miss_is_a_fuzzy_match() {
    let snapshot = fixtures();
    let matcher = TermMatcher::default();
    let term = ExtractedTerm::standalone("hepatocyte", 0);
    let results = matcher
        .match_term_with(&snapshot, &term, &[OntologyType::SubcellularLocation], 0.5)
        .unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].match_type, MatchType::Fuzzy);
    assert!(results[0].confidence > 0.5 && results[0].confidence < 1.0);
}

#[test]
fn synonyms_match_exactly() {
    let snapshot = fixtures();
    let matcher = TermMatcher::default();
    let term = ExtractedTerm::standalone("Human", 3);
    let results = matcher.match_term(&snapshot, &term, &[OntologyType::Species]).unwrap();
    assert_eq!(results[0].entry.canonical_name, "Homo sapiens");
    assert_eq!(results[0].match_type, MatchType::Exact);
}

#[test]
fn partial_match_lands_in_band() {
    let snapshot = fixtures();
    let matcher = TermMatcher::default();
    let term = ExtractedTerm::standalone("Orbitrap Fusion", 0);
    let results = matcher
        .match_term(&snapshot, &term, &[OntologyType::MsVocabulary])
        .unwrap();
    assert_eq!(results.len(), 1);
    assert!(results[0].confidence >= 0.6 && results[0].confidence < 1.0);
    assert_ne!(results[0].match_type, MatchType::Exact);
}

#[test]
fn empty_category_yields_no_matches() {
    let snapshot = fixtures();
    let matcher = TermMatcher::default();
    let term = ExtractedTerm::standalone("liver", 0);
    let results = matcher.match_term(&snapshot, &term, &[OntologyType::Disease]).unwrap();
    assert!(results.is_empty());
}

#[test]
fn results_are_ordered_by_confidence() {
    let snapshot = fixtures();
    let matcher = TermMatcher::new(MatchOptions {
        min_confidence: 0.0,
        ..MatchOptions::default()
    });
    let extractor = TermExtractor::new(ExtractionOptions::default());
    let terms = extractor.extract("mouse liver nucleus oxidation on an Orbitrap Fusion", &[]);
    let results = matcher.match_terms(&snapshot, &terms, &[], 0.0).unwrap();
    assert!(!results.is_empty());
    assert!(
        results
            .windows(2)
            .all(|pair| pair[0].confidence >= pair[1].confidence)
    );
}

fn word() -> impl Strategy<Value = String> {
    prop::sample::select(vec![
        "liver", "livers", "kidney", "mouse", "mus", "musculus", "human", "homo", "nucleus",
        "nuclei", "hepatocyte", "oxidation", "oxidized", "orbitrap", "fusion", "lumos", "cells",
    ])
    .prop_map(String::from)
}

proptest! {
    #[test]
    fn raising_threshold_only_removes_matches(
        words in prop::collection::vec(word(), 1..4),
        t1 in 0.0f64..1.0,
        t2 in 0.0f64..1.0,
    ) {
        let (low, high) = if t1 <= t2 { (t1, t2) } else { (t2, t1) };
        let snapshot = fixtures();
        let matcher = TermMatcher::default();
        let term = ExtractedTerm::standalone(&words.join(" "), 0);

        let loose = matcher.match_term_with(&snapshot, &term, &[], low).unwrap();
        let strict = matcher.match_term_with(&snapshot, &term, &[], high).unwrap();

        for result in &strict {
            prop_assert!(loose.contains(result));
            prop_assert!(result.confidence >= high);
        }
    }

    #[test]
    fn confidence_stays_in_unit_interval(words in prop::collection::vec(word(), 1..4)) {
        let snapshot = fixtures();
        let matcher = TermMatcher::default();
        let term = ExtractedTerm::standalone(&words.join(" "), 0);
        for result in matcher.match_term_with(&snapshot, &term, &[], 0.0).unwrap() {
            prop_assert!((0.0..=1.0).contains(&result.confidence));
            prop_assert_eq!(result.confidence == 1.0, result.match_type == MatchType::Exact);
        }
    }
}
