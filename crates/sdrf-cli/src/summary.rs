use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use sdrf_core::{GeneratedMetadata, ProtocolAnalysis, ScoredMatch, StepAnalysis, TermMatches};
use sdrf_map::ConfidenceLevel;
use sdrf_model::{ComplianceReport, MetadataColumn};
use sdrf_ontology::IndexStats;
use sdrf_report::SdrfExport;

pub fn print_step_analysis(analysis: &StepAnalysis) {
    let summary = &analysis.analysis_summary;
    println!("Step: {}", analysis.step_id);
    println!(
        "Terms: {}  Matches: {} ({} high, {} low)  Suggested columns: {}",
        summary.term_count,
        summary.match_count,
        summary.high_confidence,
        summary.low_confidence,
        summary.suggested_columns
    );
    print_match_table(&analysis.ontology_matches);
    print_column_table(&analysis.sdrf_suggestions);
}

pub fn print_matches(matches: &TermMatches) {
    print_match_table(&matches.matches);
}

pub fn print_generated(generated: &GeneratedMetadata) {
    println!(
        "Step: {}  auto_create: {}  created columns: {}",
        generated.step_id, generated.auto_create, generated.created_columns
    );
    print_column_table(&generated.column_details);
}

pub fn print_compliance(report: &ComplianceReport) {
    if report.compliant {
        println!("Compliant: all required columns present and well formed");
        return;
    }
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Column"),
        header_cell("Issue"),
    ]);
    apply_table_style(&mut table);
    for column in &report.missing_columns {
        table.add_row(vec![Cell::new(column), Cell::new("missing").fg(Color::Red)]);
    }
    for column in &report.invalid_columns {
        table.add_row(vec![Cell::new(column), Cell::new("invalid").fg(Color::Yellow)]);
    }
    println!("{table}");
    for suggestion in &report.suggestions {
        println!("- {suggestion}");
    }
}

pub fn print_export(export: &SdrfExport) {
    if export.headers.is_empty() {
        println!("No persisted columns to export");
        return;
    }
    let mut table = Table::new();
    table.set_header(export.headers.iter().map(|header| header_cell(header)));
    apply_table_style(&mut table);
    for row in &export.rows {
        table.add_row(
            export
                .headers
                .iter()
                .map(|header| row.get(header).map_or("", String::as_str)),
        );
    }
    println!("{table}");
}

pub fn print_protocol_analysis(analysis: &ProtocolAnalysis) {
    println!("Protocol: {}", analysis.protocol_id);
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Step"),
        header_cell("Terms"),
        header_cell("Matches"),
        header_cell("High"),
        header_cell("Columns"),
    ]);
    apply_table_style(&mut table);
    for step in &analysis.step_results {
        let summary = &step.analysis_summary;
        table.add_row(vec![
            Cell::new(step.step_id),
            Cell::new(summary.term_count),
            Cell::new(summary.match_count),
            Cell::new(summary.high_confidence),
            Cell::new(summary.suggested_columns),
        ]);
    }
    for index in 1..5 {
        align_column(&mut table, index, CellAlignment::Right);
    }
    println!("{table}");
    println!("Protocol-wide columns:");
    print_column_table(&analysis.protocol_sdrf_suggestions);
}

pub fn print_stats(stats: &IndexStats) {
    println!("Generation: {}", stats.generation);
    let mut table = Table::new();
    table.set_header(vec![header_cell("Ontology"), header_cell("Entries")]);
    apply_table_style(&mut table);
    for (ontology_type, count) in &stats.entries {
        table.add_row(vec![Cell::new(ontology_type), Cell::new(count)]);
    }
    table.add_row(vec![
        Cell::new("TOTAL").fg(Color::Cyan).add_attribute(Attribute::Bold),
        Cell::new(stats.total_entries).add_attribute(Attribute::Bold),
    ]);
    align_column(&mut table, 1, CellAlignment::Right);
    println!("{table}");
}

fn print_match_table(matches: &[ScoredMatch]) {
    if matches.is_empty() {
        println!("No matches above the confidence threshold");
        return;
    }
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Term"),
        header_cell("Ontology"),
        header_cell("Entry"),
        header_cell("Accession"),
        header_cell("Type"),
        header_cell("Confidence"),
    ]);
    apply_table_style(&mut table);
    for scored in matches {
        let result = &scored.result;
        table.add_row(vec![
            Cell::new(&result.term.text_span),
            Cell::new(result.entry.ontology_type),
            Cell::new(&result.entry.canonical_name),
            Cell::new(&result.entry.accession),
            Cell::new(result.match_type),
            confidence_cell(result.confidence, scored.confidence_level),
        ]);
    }
    align_column(&mut table, 5, CellAlignment::Right);
    println!("{table}");
}

fn print_column_table(columns: &[MetadataColumn]) {
    if columns.is_empty() {
        println!("No SDRF columns");
        return;
    }
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Column"),
        header_cell("Value"),
        header_cell("Persisted"),
    ]);
    apply_table_style(&mut table);
    for column in columns {
        table.add_row(vec![
            Cell::new(&column.name),
            Cell::new(&column.value),
            Cell::new(if column.persisted { "yes" } else { "-" }),
        ]);
    }
    align_column(&mut table, 2, CellAlignment::Center);
    println!("{table}");
}

pub fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn confidence_cell(confidence: f64, level: ConfidenceLevel) -> Cell {
    let color = match level {
        ConfidenceLevel::High => Color::Green,
        ConfidenceLevel::Low => Color::Yellow,
    };
    Cell::new(format!("{confidence:.3}")).fg(color)
}
