//! Tool responses.
//!
//! Every tool call returns a [`ToolResponse`]; errors never cross the tool
//! boundary as Rust errors. A success carries the operation's payload fields
//! next to `success: true`. A failure carries the message and a stable
//! `error_type` tag.

use serde::Serialize;
use serde_json::{Map, Value};

use sdrf_model::AnnotatorError;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ToolResponse {
    Success {
        success: bool,
        #[serde(flatten)]
        payload: Map<String, Value>,
    },
    Failure {
        success: bool,
        error: String,
        error_type: &'static str,
        /// Reported by metadata generation: zero after a clean rollback,
        /// otherwise the columns the rollback could not remove.
        #[serde(skip_serializing_if = "Option::is_none")]
        created_columns: Option<usize>,
    },
}

impl ToolResponse {
    /// Wraps a payload that serializes to a JSON object.
    ///
    /// Non-object payloads are placed under `result`.
    pub fn success<T: Serialize>(payload: &T) -> Self {
        match serde_json::to_value(payload) {
            Ok(Value::Object(payload)) => Self::Success {
                success: true,
                payload,
            },
            Ok(other) => {
                let mut payload = Map::new();
                payload.insert("result".to_string(), other);
                Self::Success {
                    success: true,
                    payload,
                }
            }
            Err(error) => Self::failure(&AnnotatorError::Matching(format!(
                "failed to serialize response: {error}"
            ))),
        }
    }

    pub fn failure(error: &AnnotatorError) -> Self {
        Self::Failure {
            success: false,
            error: error.to_string(),
            error_type: error.error_type(),
            created_columns: None,
        }
    }

    /// A failed generation, reporting what is still committed.
    pub fn generation_failure(error: &AnnotatorError) -> Self {
        Self::Failure {
            success: false,
            error: error.to_string(),
            error_type: error.error_type(),
            created_columns: Some(error.stranded_columns()),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn error_type(&self) -> Option<&'static str> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { error_type, .. } => Some(error_type),
        }
    }

    /// A payload field of a successful response.
    pub fn field(&self, name: &str) -> Option<&Value> {
        match self {
            Self::Success { payload, .. } => payload.get(name),
            Self::Failure { .. } => None,
        }
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

impl<T: Serialize> From<sdrf_model::Result<T>> for ToolResponse {
    fn from(result: sdrf_model::Result<T>) -> Self {
        match result {
            Ok(payload) => Self::success(&payload),
            Err(error) => Self::failure(&error),
        }
    }
}
