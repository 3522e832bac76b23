use serde::{Deserialize, Serialize};

/// JSON body returned for non-200 responses from the query endpoint.
///
/// Mirrors the teacher's tool-facing `ErrorEnvelope`, trimmed to the
/// fields spec.md §6 actually calls for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ErrorEnvelope {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            hint: None,
        }
    }

    pub fn with_hint(error: impl Into<String>, hint: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            hint: Some(hint.into()),
        }
    }
}
