use thiserror::Error;

/// Errors surfaced by the annotator pipeline.
///
/// Each variant maps to a stable `error_type` tag used at the tool boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnnotatorError {
    /// Malformed input: unknown ontology type, empty required field, bad threshold.
    #[error("validation error: {0}")]
    Validation(String),

    /// Unknown step or protocol id.
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: u64 },

    /// Ontology index unavailable, empty, or invalid configuration.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Internal scoring invariant violated.
    #[error("matching invariant violated: {0}")]
    Matching(String),

    /// Missing or rejected user token.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// Metadata collaborator failed to write or delete a column.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// A failed commit whose rollback could not delete every column it wrote.
    #[error(
        "partial commit on step {step}: {cause}; rollback left {} column(s) behind (ids {stranded:?})",
        .stranded.len()
    )]
    PartialCommit {
        step: u64,
        stranded: Vec<u64>,
        cause: String,
    },
}

impl AnnotatorError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication(message.into())
    }

    pub fn persistence(message: impl Into<String>) -> Self {
        Self::Persistence(message.into())
    }

    /// Stable snake_case tag reported as `error_type`.
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::NotFound { .. } => "not_found",
            Self::Configuration(_) => "configuration_error",
            Self::Matching(_) => "matching_error",
            Self::Authentication(_) => "authentication_error",
            Self::Persistence(_) => "persistence_error",
            Self::PartialCommit { .. } => "partial_commit",
        }
    }

    /// Columns still committed after a failed write, if any.
    pub fn stranded_columns(&self) -> usize {
        match self {
            Self::PartialCommit { stranded, .. } => stranded.len(),
            _ => 0,
        }
    }
}

pub type Result<T> = std::result::Result<T, AnnotatorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_message_names_kind_and_id() {
        let error = AnnotatorError::NotFound {
            kind: "step",
            id: 42,
        };
        assert_eq!(error.to_string(), "step 42 not found");
        assert_eq!(error.error_type(), "not_found");
    }

    #[test]
    fn partial_commit_names_stranded_columns() {
        let error = AnnotatorError::PartialCommit {
            step: 3,
            stranded: vec![7, 8],
            cause: "store offline".to_string(),
        };
        assert_eq!(error.error_type(), "partial_commit");
        assert_eq!(error.stranded_columns(), 2);
        assert_eq!(
            error.to_string(),
            "partial commit on step 3: store offline; rollback left 2 column(s) behind (ids [7, 8])"
        );
        assert_eq!(AnnotatorError::persistence("x").stranded_columns(), 0);
    }

    #[test]
    fn authentication_is_distinct_from_validation() {
        let auth = AnnotatorError::authentication("token rejected");
        let validation = AnnotatorError::validation("token rejected");
        assert_ne!(auth.error_type(), validation.error_type());
    }
}
