//! CLI argument definitions for the SDRF annotator.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "sdrf-annotator",
    version,
    about = "Annotate protocol steps with ontology terms and SDRF metadata",
    long_about = "Extract terms from protocol steps, match them against curated ontologies,\n\
                  and generate, validate and export SDRF (Sample and Data Relationship Format)\n\
                  metadata. Tool output is written to stdout; logs go to stderr."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Annotator configuration (TOML).
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Workspace file holding protocols, steps and persisted columns.
    #[arg(long, value_name = "PATH", global = true)]
    pub workspace: Option<PathBuf>,

    /// Directory of `<ontology_type>.tsv` vocabularies (overrides the config).
    #[arg(long = "ontology-dir", value_name = "DIR", global = true)]
    pub ontology_dir: Option<PathBuf>,

    /// User token passed to the token validator.
    #[arg(long, value_name = "TOKEN", global = true)]
    pub token: Option<String>,

    /// Output format for tool results.
    #[arg(long, value_enum, default_value = "json", global = true)]
    pub output: OutputArg,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Extract, match and classify the terms of one protocol step.
    AnalyzeStep(StepArgs),

    /// Match standalone terms against the ontologies.
    MatchTerms(MatchTermsArgs),

    /// Suggest SDRF columns for a step and optionally persist them.
    Generate(GenerateArgs),

    /// Check a step's persisted columns against the required-column policy.
    Validate(StepArgs),

    /// Export a protocol's persisted columns as SDRF.
    Export(ExportArgs),

    /// Analyze every step of a protocol.
    AnalyzeProtocol(ProtocolArgs),

    /// Show ontology index statistics.
    OntologyStats(StatsArgs),

    /// Add a protocol with its steps to the workspace.
    AddProtocol(AddProtocolArgs),
}

#[derive(Args)]
pub struct StepArgs {
    #[arg(value_name = "STEP_ID")]
    pub step_id: u64,
}

#[derive(Args)]
pub struct ProtocolArgs {
    #[arg(value_name = "PROTOCOL_ID")]
    pub protocol_id: u64,
}

#[derive(Args)]
pub struct MatchTermsArgs {
    /// Terms to match.
    #[arg(value_name = "TERM", required = true)]
    pub terms: Vec<String>,

    /// Restrict matching to these ontology types (comma separated).
    #[arg(long = "types", value_name = "TYPE", value_delimiter = ',')]
    pub ontology_types: Vec<String>,

    /// Drop results below this confidence (default from config).
    #[arg(long = "min-confidence", value_name = "FLOAT")]
    pub min_confidence: Option<f64>,
}

#[derive(Args)]
pub struct GenerateArgs {
    #[arg(value_name = "STEP_ID")]
    pub step_id: u64,

    /// Persist the suggested columns (requires a token).
    #[arg(long = "auto-create")]
    pub auto_create: bool,
}

#[derive(Args)]
pub struct ExportArgs {
    #[arg(value_name = "PROTOCOL_ID")]
    pub protocol_id: u64,

    /// Also write the TSV text to this file.
    #[arg(long = "output-file", value_name = "PATH")]
    pub output_file: Option<PathBuf>,
}

#[derive(Args)]
pub struct StatsArgs {
    /// Reload the vocabularies before reporting.
    #[arg(long)]
    pub refresh: bool,
}

#[derive(Args)]
pub struct AddProtocolArgs {
    /// Protocol title.
    #[arg(long)]
    pub title: String,

    /// Step text; repeat for each step, in order.
    #[arg(long = "step", value_name = "TEXT", required = true)]
    pub steps: Vec<String>,
}

/// Tool output choices.
#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputArg {
    Json,
    Table,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
