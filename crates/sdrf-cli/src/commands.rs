use std::fs;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{error, info};

use sdrf_cli::runtime::{Runtime, RuntimeOptions, open_workspace};
use sdrf_core::{Capability, ProtocolStore, ToolResponse};
use sdrf_model::{AnnotatorError, ProtocolId, StepId};

use crate::cli::{
    AddProtocolArgs, Cli, Command, ExportArgs, GenerateArgs, MatchTermsArgs, OutputArg,
};
use crate::summary;

/// Runs the selected command; `Ok(false)` means the tool call failed.
pub fn run(cli: &Cli) -> Result<bool> {
    let options = RuntimeOptions {
        config: cli.config.clone(),
        workspace: cli.workspace.clone(),
        ontology_dir: cli.ontology_dir.clone(),
    };
    if let Command::AddProtocol(args) = &cli.command {
        return add_protocol(&options, args);
    }

    let runtime = Runtime::open(&options)?;
    let service = &runtime.service;
    let token = cli.token.as_deref();
    let output = cli.output;

    match &cli.command {
        Command::AnalyzeStep(args) => emit(
            output,
            with_capability(&runtime, token, |capability| {
                service.analyze_step(capability, StepId(args.step_id))
            }),
            ToolResponse::failure,
            summary::print_step_analysis,
        ),
        Command::MatchTerms(args) => match_terms(&runtime, output, args),
        Command::Generate(args) => generate(&runtime, output, token, args),
        Command::Validate(args) => emit(
            output,
            with_capability(&runtime, token, |capability| {
                service.validate_step(capability, StepId(args.step_id))
            }),
            ToolResponse::failure,
            summary::print_compliance,
        ),
        Command::Export(args) => export(&runtime, output, token, args),
        Command::AnalyzeProtocol(args) => emit(
            output,
            with_capability(&runtime, token, |capability| {
                service.analyze_protocol(capability, ProtocolId(args.protocol_id))
            }),
            ToolResponse::failure,
            summary::print_protocol_analysis,
        ),
        Command::OntologyStats(args) => {
            let stats = if args.refresh {
                service.refresh_ontologies()
            } else {
                Ok(service.ontology_stats())
            };
            emit(output, stats, ToolResponse::failure, summary::print_stats)
        }
        Command::AddProtocol(args) => add_protocol(&options, args),
    }
}

fn with_capability<T>(
    runtime: &Runtime,
    token: Option<&str>,
    operation: impl FnOnce(&Capability) -> sdrf_model::Result<T>,
) -> sdrf_model::Result<T> {
    let capability = runtime.service.authorize(token)?;
    operation(&capability)
}

fn match_terms(runtime: &Runtime, output: OutputArg, args: &MatchTermsArgs) -> Result<bool> {
    let result = runtime
        .service
        .match_terms(&args.terms, &args.ontology_types, args.min_confidence);
    emit(output, result, ToolResponse::failure, summary::print_matches)
}

fn generate(
    runtime: &Runtime,
    output: OutputArg,
    token: Option<&str>,
    args: &GenerateArgs,
) -> Result<bool> {
    let result = with_capability(runtime, token, |capability| {
        runtime
            .service
            .generate(capability, StepId(args.step_id), args.auto_create)
    });
    emit(output, result, ToolResponse::generation_failure, summary::print_generated)
}

fn export(
    runtime: &Runtime,
    output: OutputArg,
    token: Option<&str>,
    args: &ExportArgs,
) -> Result<bool> {
    let result = with_capability(runtime, token, |capability| {
        runtime.service.export(capability, ProtocolId(args.protocol_id))
    });
    if let (Ok(export), Some(path)) = (&result, &args.output_file) {
        fs::write(path, &export.tsv_content)
            .with_context(|| format!("write SDRF file {}", path.display()))?;
        info!(path = %path.display(), rows = export.rows.len(), "SDRF file written");
    }
    emit(output, result, ToolResponse::failure, summary::print_export)
}

fn add_protocol(options: &RuntimeOptions, args: &AddProtocolArgs) -> Result<bool> {
    let workspace = open_workspace(options)?;
    let protocol_id = workspace
        .store()
        .add_protocol(args.title.clone(), args.steps.iter().cloned());
    workspace.save().context("save workspace")?;
    let protocol = workspace.protocol(protocol_id)?;
    println!("{}", serde_json::to_string_pretty(&protocol)?);
    Ok(true)
}

/// Prints a typed result as a tool response or as tables.
fn emit<T: Serialize>(
    output: OutputArg,
    result: sdrf_model::Result<T>,
    failure: fn(&AnnotatorError) -> ToolResponse,
    table: fn(&T),
) -> Result<bool> {
    match (output, result) {
        (OutputArg::Json, Ok(value)) => {
            print_json(&ToolResponse::success(&value))?;
            Ok(true)
        }
        (OutputArg::Json, Err(failed)) => {
            error!(error_type = failed.error_type(), "{failed}");
            print_json(&failure(&failed))?;
            Ok(false)
        }
        (OutputArg::Table, Ok(value)) => {
            table(&value);
            Ok(true)
        }
        (OutputArg::Table, Err(failed)) => {
            eprintln!("error [{}]: {failed}", failed.error_type());
            Ok(false)
        }
    }
}

fn print_json(response: &ToolResponse) -> Result<()> {
    let text = serde_json::to_string_pretty(response).context("serialize tool response")?;
    println!("{text}");
    Ok(())
}
