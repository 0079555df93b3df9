#![deny(unsafe_code)]

pub mod column;
pub mod conformance;
pub mod error;
pub mod ontology;
pub mod protocol;
pub mod table;
pub mod term;
pub mod text;

pub use column::{
    ColumnFormat, ColumnSpec, MetadataColumn, SDRF_COLUMNS, base_column_name, column_format,
    column_spec, is_recognized_column, numbered_column,
};
pub use conformance::ComplianceReport;
pub use error::{AnnotatorError, Result};
pub use ontology::{OntologyEntry, OntologyType};
pub use protocol::{Protocol, ProtocolId, ProtocolStep, StepId};
pub use table::SdrfTable;
pub use term::{ExtractedTerm, MatchResult, MatchType};
pub use text::normalize_text;
