//! Tool-level behavior of the annotator service.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::json;

use sdrf_core::{
    AllowAnonymous, AnnotatorConfig, AnnotatorService, Capability, MemoryStore, MetadataStore,
    StaticTokens, TokenValidator,
};
use sdrf_model::{MatchType, MetadataColumn, OntologyEntry, OntologyType, ProtocolId, StepId};
use sdrf_ontology::{MemorySource, OntologyIndex};
use sdrf_report::parse_tsv;

const LYSE_STEP: &str = "Lyse cells in liver tissue from Mus musculus at 4°C";

fn vocabulary() -> Vec<OntologyEntry> {
    vec![
        OntologyEntry::new(1, OntologyType::Species, "Mus musculus", "NCBITaxon:10090")
            .with_synonyms(["mouse"]),
        OntologyEntry::new(2, OntologyType::Tissue, "liver", "UBERON:0002107"),
        OntologyEntry::new(3, OntologyType::Tissue, "kidney", "UBERON:0002113"),
        OntologyEntry::new(4, OntologyType::SubcellularLocation, "hepatocytes", "GO:0005623"),
        OntologyEntry::new(5, OntologyType::Disease, "hepatocellular carcinoma", "DOID:684"),
        OntologyEntry::new(6, OntologyType::MsVocabulary, "Orbitrap Fusion Lumos", "MS:1002732")
            .with_category("instrument"),
        OntologyEntry::new(7, OntologyType::Modification, "Oxidation", "UNIMOD:35"),
    ]
}

struct Fixture {
    store: Arc<MemoryStore>,
    service: AnnotatorService,
}

fn fixture_with(auth: Arc<dyn TokenValidator>, steps: &[&str]) -> Fixture {
    let store = Arc::new(MemoryStore::new());
    store.add_protocol("Liver proteomics", steps.iter().copied());
    let index = Arc::new(OntologyIndex::from_records(vocabulary()).unwrap());
    let service = AnnotatorService::new(
        AnnotatorConfig::default(),
        index,
        store.clone(),
        store.clone(),
        auth,
    )
    .unwrap();
    Fixture { store, service }
}

fn fixture(steps: &[&str]) -> Fixture {
    fixture_with(Arc::new(AllowAnonymous), steps)
}

#[test]
fn lyse_cells_step_matches_liver_and_mouse_exactly() {
    let Fixture { service, .. } = fixture(&[LYSE_STEP]);
    let analysis = service.analyze_step(&Capability::Anonymous, StepId(1)).unwrap();

    let spans: Vec<_> = analysis
        .extracted_terms
        .iter()
        .map(|term| term.text_span.as_str())
        .collect();
    assert!(spans.contains(&"liver"));
    assert!(spans.contains(&"Mus musculus"));

    for (span, accession) in [("liver", "UBERON:0002107"), ("Mus musculus", "NCBITaxon:10090")] {
        let found = analysis
            .ontology_matches
            .iter()
            .find(|scored| scored.result.term.text_span == span && scored.result.entry.accession == accession)
            .unwrap_or_else(|| panic!("no match for {span}"));
        assert_eq!(found.result.match_type, MatchType::Exact);
        assert_eq!(found.result.confidence, 1.0);
    }

    let columns: BTreeMap<_, _> = analysis
        .sdrf_suggestions
        .iter()
        .map(|column| (column.name.as_str(), column.value.as_str()))
        .collect();
    assert_eq!(columns["characteristics[organism part]"], "NT=liver;AC=UBERON:0002107");
    assert_eq!(columns["characteristics[organism]"], "NT=Mus musculus;AC=NCBITaxon:10090");
}

#[test]
fn hepatocyte_is_a_fuzzy_match() {
    let Fixture { service, .. } = fixture(&[LYSE_STEP]);
    let response = service.match_ontology_terms(
        &["hepatocyte".to_string()],
        Some(&["subcellular_location".to_string()]),
        None,
    );
    let value = response.to_json();
    assert_eq!(value["success"], json!(true));
    let matches = value["matches"].as_array().unwrap();
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0]["match_type"], json!("fuzzy"));
    let confidence = matches[0]["confidence"].as_f64().unwrap();
    assert!(confidence > 0.5 && confidence < 1.0, "confidence {confidence}");
}

#[test]
fn unknown_ontology_type_is_a_validation_error() {
    let Fixture { service, .. } = fixture(&[LYSE_STEP]);
    let response =
        service.match_ontology_terms(&["liver".to_string()], Some(&["planet".to_string()]), None);
    assert_eq!(response.error_type(), Some("validation_error"));
}

#[test]
fn higher_threshold_returns_a_subset() {
    let Fixture { service, .. } = fixture(&[LYSE_STEP]);
    let terms = vec!["liver tissue".to_string(), "hepatocyte".to_string(), "mouse".to_string()];
    let loose = service.match_terms(&terms, &[], Some(0.5)).unwrap().matches;
    let strict = service.match_terms(&terms, &[], Some(0.9)).unwrap().matches;
    assert!(strict.len() <= loose.len());
    for scored in &strict {
        assert!(loose.contains(scored));
    }
}

#[test]
fn dry_run_is_idempotent_and_writes_nothing() {
    let Fixture { store, service } = fixture(&[LYSE_STEP]);
    let first = service.generate_sdrf_metadata(1, Some(false), Some("alice"));
    let second = service.generate_sdrf_metadata(1, None, Some("alice"));
    assert!(first.is_success());
    assert_eq!(first, second);
    assert_eq!(first.field("created_columns"), Some(&json!(0)));
    assert_eq!(store.column_count(StepId(1)), 0);
}

#[test]
fn auto_create_persists_columns() {
    let Fixture { store, service } = fixture(&[LYSE_STEP]);
    let response = service.generate_sdrf_metadata(1, Some(true), Some("alice"));
    assert!(response.is_success());
    let created = response.field("created_columns").and_then(|value| value.as_u64()).unwrap();
    assert!(created >= 2);
    assert_eq!(store.column_count(StepId(1)), created as usize);

    // Running again finds every column already present.
    let again = service.generate_sdrf_metadata(1, Some(true), Some("alice"));
    assert_eq!(again.field("created_columns"), Some(&json!(0)));
}

#[test]
fn failed_commit_leaves_nothing_behind() {
    let Fixture { store, service } = fixture(&[LYSE_STEP]);
    store.fail_creates_after(1);
    let response = service.generate_sdrf_metadata(1, Some(true), Some("alice"));
    let value = response.to_json();
    assert_eq!(value["success"], json!(false));
    assert_eq!(value["error_type"], json!("persistence_error"));
    assert_eq!(value["created_columns"], json!(0));
    assert_eq!(store.column_count(StepId(1)), 0);
}

#[test]
fn failed_rollback_reports_columns_left_behind() {
    let Fixture { store, service } = fixture(&[LYSE_STEP]);
    store.fail_creates_after(1);
    store.fail_deletes();
    let value = service.generate_sdrf_metadata(1, Some(true), Some("alice")).to_json();
    assert_eq!(value["success"], json!(false));
    assert_eq!(value["error_type"], json!("partial_commit"));
    assert_eq!(value["created_columns"], json!(1));
    assert_eq!(store.column_count(StepId(1)), 1);
}

#[test]
fn existing_column_values_are_reported_unchanged() {
    let Fixture { store, service } = fixture(&[LYSE_STEP]);
    let human =
        MetadataColumn::new("characteristics[organism]", "NT=Homo sapiens;AC=NCBITaxon:9606");
    store.create_column(StepId(1), &human).unwrap();

    let alice = Capability::Authenticated {
        user: "alice".to_string(),
    };
    let generated = service.generate(&alice, StepId(1), true).unwrap();
    let organism = generated
        .column_details
        .iter()
        .find(|column| column.name == "characteristics[organism]")
        .unwrap();
    assert_eq!(organism.value, human.value);

    let stored = store.list_columns(StepId(1)).unwrap();
    for reported in &generated.column_details {
        assert!(
            stored
                .iter()
                .any(|column| column.name == reported.name && column.value == reported.value),
            "{} is not stored",
            reported.name
        );
    }
}

#[test]
fn auto_create_requires_a_user() {
    let Fixture { store, service } = fixture(&[LYSE_STEP]);
    let response = service.generate_sdrf_metadata(1, Some(true), None);
    assert_eq!(response.error_type(), Some("authentication_error"));
    assert_eq!(store.column_count(StepId(1)), 0);
}

#[test]
fn required_token_is_enforced() {
    let tokens = StaticTokens::new(
        BTreeMap::from([("secret-token".to_string(), "alice".to_string())]),
        true,
    );
    let Fixture { service, .. } = fixture_with(Arc::new(tokens), &[LYSE_STEP]);
    assert_eq!(
        service.analyze_protocol_step(1, None).error_type(),
        Some("authentication_error")
    );
    assert_eq!(
        service.analyze_protocol_step(1, Some("wrong")).error_type(),
        Some("authentication_error")
    );
    assert!(service.analyze_protocol_step(1, Some("secret-token")).is_success());
}

#[test]
fn unknown_ids_are_not_found() {
    let Fixture { service, .. } = fixture(&[LYSE_STEP]);
    assert_eq!(service.analyze_protocol_step(99, None).error_type(), Some("not_found"));
    assert_eq!(service.export_sdrf_file(99, None).error_type(), Some("not_found"));
    assert_eq!(service.analyze_full_protocol(99, None).error_type(), Some("not_found"));
}

#[test]
fn fully_annotated_step_is_compliant() {
    let Fixture { store, service } = fixture(&[LYSE_STEP]);
    for (name, value) in [
        ("characteristics[organism]", "NT=Mus musculus;AC=NCBITaxon:10090"),
        ("characteristics[organism part]", "NT=liver;AC=UBERON:0002107"),
        ("characteristics[disease]", "NT=normal;AC=PATO:0000461"),
        ("comment[instrument]", "NT=Orbitrap Fusion Lumos;AC=MS:1002732"),
    ] {
        store.create_column(StepId(1), &MetadataColumn::new(name, value)).unwrap();
    }
    let report = service.validate_step(&Capability::Anonymous, StepId(1)).unwrap();
    assert!(report.compliant);
    assert!(report.missing_columns.is_empty());
    assert!(report.invalid_columns.is_empty());
    assert!(report.suggestions.is_empty());
}

#[test]
fn gaps_are_reported_with_matcher_candidates() {
    let Fixture { store, service } = fixture(&[LYSE_STEP]);
    store
        .create_column(StepId(1), &MetadataColumn::new("characteristics[organism part]", "liver"))
        .unwrap();
    let response = service.validate_sdrf_compliance(1, None);
    let value = response.to_json();
    assert_eq!(value["compliant"], json!(false));
    let missing: Vec<_> = value["missing_columns"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|column| column.as_str())
        .collect();
    assert!(missing.contains(&"characteristics[organism]"));
    assert!(!missing.contains(&"characteristics[organism part]"));
    assert_eq!(value["invalid_columns"], json!(["characteristics[organism part]"]));

    let suggestions = value["suggestions"].as_array().unwrap();
    assert!(
        suggestions
            .iter()
            .filter_map(|line| line.as_str())
            .any(|line| line.contains("NT=Mus musculus;AC=NCBITaxon:10090"))
    );
}

#[test]
fn export_round_trips_through_tsv() {
    let Fixture { service, .. } = fixture(&[LYSE_STEP, "Homogenize mouse kidney samples"]);
    for step in [1, 2] {
        assert!(service.generate_sdrf_metadata(step, Some(true), Some("alice")).is_success());
    }
    let export = service.export(&Capability::Anonymous, ProtocolId(1)).unwrap();
    assert_eq!(export.rows.len(), 2);
    assert!(export.headers.contains(&"characteristics[organism]".to_string()));

    let parsed = parse_tsv(&export.tsv_content).unwrap();
    assert_eq!(parsed.headers, export.headers);
    assert_eq!(parsed.rows, export.rows);
    assert!(parsed.is_rectangular());
}

#[test]
fn protocol_analysis_promotes_shared_columns() {
    let Fixture { service, .. } = fixture(&[LYSE_STEP, "Homogenize mouse kidney samples"]);
    let analysis = service.analyze_protocol(&Capability::Anonymous, ProtocolId(1)).unwrap();
    let ids: Vec<_> = analysis.step_results.iter().map(|result| result.step_id).collect();
    assert_eq!(ids, vec![StepId(1), StepId(2)]);

    let promoted: Vec<_> = analysis
        .protocol_sdrf_suggestions
        .iter()
        .map(|column| column.name.as_str())
        .collect();
    assert_eq!(promoted, vec!["characteristics[organism]"]);
    assert!(
        analysis
            .step_suggestions(StepId(2))
            .unwrap()
            .iter()
            .any(|column| column.value == "NT=kidney;AC=UBERON:0002113")
    );

    let response = service.analyze_full_protocol(1, None);
    assert!(response.field("step_results").is_some());
    assert!(response.field("protocol_sdrf_suggestions").is_some());
}

#[test]
fn refresh_swaps_in_new_vocabulary() {
    let source = Arc::new(MemorySource::new(vocabulary()));
    let index = Arc::new(OntologyIndex::load(source.clone()).unwrap());
    let store = Arc::new(MemoryStore::new());
    store.add_protocol("p", ["Digest with trypsin"]);
    let service = AnnotatorService::new(
        AnnotatorConfig::default(),
        index,
        store.clone(),
        store,
        Arc::new(AllowAnonymous),
    )
    .unwrap();

    let terms = vec!["trypsin".to_string()];
    let types = vec!["ms_vocabulary".to_string()];
    assert!(service.match_terms(&terms, &types, None).unwrap().matches.is_empty());

    source.push(
        OntologyEntry::new(8, OntologyType::MsVocabulary, "Trypsin", "MS:1001251")
            .with_category("cleavage agent"),
    );
    let stats = service.refresh_ontologies().unwrap();
    assert_eq!(stats.generation, 2);
    assert_eq!(service.ontology_stats().entries[&OntologyType::MsVocabulary], 2);

    let matches = service.match_terms(&terms, &types, None).unwrap().matches;
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].result.match_type, MatchType::Exact);
}
