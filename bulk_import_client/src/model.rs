use bulk_import_types::SessionSummary;
use bytes::Bytes;

use crate::error::{BulkImportError, Result};
use crate::interface::RequestBody;

/// Inputs to `create session`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateSessionRequest {
    pub name: String,
    pub database: String,
    pub table: String,
}

impl CreateSessionRequest {
    pub fn new(name: impl Into<String>, database: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            database: database.into(),
            table: table.into(),
        }
    }

    pub(crate) fn validate(&self, operation: &'static str) -> Result<()> {
        require_segment(operation, "session name", &self.name)?;
        require_segment(operation, "database name", &self.database)?;
        require_segment(operation, "table name", &self.table)
    }
}

/// One binary part to upload, with the length the caller declares for it.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadPartRequest {
    pub part_id: String,
    pub payload: Bytes,
    pub size: u64,
}

impl UploadPartRequest {
    /// Declares the payload's own length.
    pub fn new(part_id: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        let payload = payload.into();
        let size = payload.len() as u64;
        Self {
            part_id: part_id.into(),
            payload,
            size,
        }
    }

    /// Declares an explicit size, which must match the payload exactly.
    pub fn with_declared_size(part_id: impl Into<String>, payload: impl Into<Bytes>, size: u64) -> Self {
        Self {
            part_id: part_id.into(),
            payload: payload.into(),
            size,
        }
    }

    pub(crate) fn validate(&self, operation: &'static str) -> Result<()> {
        require_segment(operation, "part id", &self.part_id)?;
        let actual = self.payload.len() as u64;
        if actual != self.size {
            return Err(BulkImportError::validation(
                operation,
                format!(
                    "declared size {} does not match payload length {actual} for part '{}'",
                    self.size, self.part_id
                ),
            ));
        }
        Ok(())
    }

    pub(crate) fn body(&self) -> RequestBody {
        RequestBody::Binary {
            data: self.payload.clone(),
            size: self.size,
        }
    }
}

/// A value that becomes one path segment: non-empty and not a `.` or `..` dot segment, which URL
/// normalization would collapse into a different endpoint.
pub(crate) fn require_segment(operation: &'static str, what: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(BulkImportError::validation(operation, format!("{what} must not be empty")));
    }
    if value == "." || value == ".." {
        return Err(BulkImportError::validation(operation, format!("{what} must not be '{value}'")));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListSessionsResult {
    /// In the order the server returned them.
    pub sessions: Vec<SessionSummary>,
}

impl ListSessionsResult {
    pub fn find(&self, name: &str) -> Option<&SessionSummary> {
        self.sessions.iter().find(|s| s.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListPartsResult {
    pub session_name: String,
    /// Unfiltered; may include parts the server failed to validate.
    pub parts: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPartResult {
    pub session_name: String,
    pub part_id: String,
    pub size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletePartResult {
    pub session_name: String,
    pub part_id: String,
}

/// Acknowledgement of a freeze, unfreeze or commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionAck {
    pub session_name: String,
    pub frozen: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PerformSessionResult {
    pub session_name: String,
    /// Job created for the aggregation, when the server reported one.
    pub job_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteResult {
    pub session_name: String,
}
