//! Classification, generation and the tool-level annotator service.
//!
//! The pipeline for one step is extract -> match -> classify; everything
//! else in this crate either persists the result, validates it, or wraps
//! it for the tool boundary.

#![deny(unsafe_code)]

pub mod analysis;
pub mod auth;
pub mod classify;
pub mod config;
pub mod generate;
pub mod response;
pub mod service;
pub mod store;
pub mod workspace;

pub use analysis::{
    AnalysisSummary, Analyzer, ProtocolAnalysis, ScoredMatch, StepAnalysis, StepSuggestions,
};
pub use auth::{AllowAnonymous, Capability, StaticTokens, TokenValidator};
pub use classify::{classify, column_for};
pub use config::{AnnotatorConfig, AuthConfig, OntologyConfig, WorkerConfig};
pub use generate::{CommitOutcome, commit_columns, protocol_suggestions};
pub use response::ToolResponse;
pub use service::{AnnotatorService, GeneratedMetadata, TermMatches};
pub use store::{ColumnId, MemoryStore, MetadataStore, ProtocolStore, StepLocks, StoredColumn};
pub use workspace::WorkspaceFile;
