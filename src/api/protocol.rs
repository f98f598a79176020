//! Purpose: Define the wire envelopes for the single query/mutation endpoint.
//! Exports: `Operation`, `DataEnvelope`, `ErrorEnvelope`, `ErrorBody`, `QUERY_PATH`.
//! Role: Shared by the axum server and `RemoteClient` so both sides agree on shapes.
//! Invariants: Requests are `{"operation": <name>, "arguments": {...}}`.
//! Invariants: Success is `{"data": ...}`; failure is `{"error": {"kind", "message", ...}}`.
use serde::{Deserialize, Serialize};

use crate::core::error::{Error, ErrorKind};
use crate::core::record::SummaryInput;

/// Path segments of the query endpoint relative to the server base URL.
pub const QUERY_PATH: [&str; 2] = ["v0", "query"];

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "operation", content = "arguments", rename_all = "camelCase")]
pub enum Operation {
    ListAll,
    GetById { id: String },
    GetByTextFragment { text: String },
    GetByTimestamp { ts: String },
    GetByKeyword { keyword: String },
    GetByRatingRange { min: f64, max: f64 },
    Create { input: SummaryInput },
    Replace { id: String, input: SummaryInput },
    Delete { id: String },
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::ListAll => "listAll",
            Operation::GetById { .. } => "getById",
            Operation::GetByTextFragment { .. } => "getByTextFragment",
            Operation::GetByTimestamp { .. } => "getByTimestamp",
            Operation::GetByKeyword { .. } => "getByKeyword",
            Operation::GetByRatingRange { .. } => "getByRatingRange",
            Operation::Create { .. } => "create",
            Operation::Replace { .. } => "replace",
            Operation::Delete { .. } => "delete",
        }
    }

    pub fn is_write(&self) -> bool {
        matches!(
            self,
            Operation::Create { .. } | Operation::Replace { .. } | Operation::Delete { .. }
        )
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DataEnvelope<T> {
    pub data: T,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub kind: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl ErrorBody {
    pub fn from_error(err: &Error) -> Self {
        Self {
            kind: err.kind().as_str().to_string(),
            message: err.message().unwrap_or("error").to_string(),
            hint: err.hint().map(str::to_string),
            id: err.id().map(str::to_string),
        }
    }

    pub fn into_error(self) -> Error {
        let mut err = Error::new(ErrorKind::parse(&self.kind)).with_message(self.message);
        if let Some(hint) = self.hint {
            err = err.with_hint(hint);
        }
        if let Some(id) = self.id {
            err = err.with_id(id);
        }
        err
    }
}
