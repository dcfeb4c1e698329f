use thiserror::Error;

use crate::interface::TransportError;
use crate::session::SessionState;

#[non_exhaustive]
#[derive(Error, Debug)]
pub enum BulkImportError {
    /// Caller-supplied input was rejected before anything was sent.
    #[error("Validation Error: {operation}: {message}")]
    ValidationError { operation: &'static str, message: String },

    /// The operation is not legal in the session's current local state; nothing was sent.
    #[error("Invalid State: cannot {operation} '{session}' while it is {state}")]
    InvalidState {
        operation: &'static str,
        session: String,
        state: SessionState,
    },

    #[error("Not Found: {operation}: {what}")]
    NotFound { operation: &'static str, what: String },

    #[error("Transport Error: {operation} failed: {source}")]
    TransportError {
        operation: &'static str,
        #[source]
        source: TransportError,
    },

    #[error("Request Failed: {operation} failed with {status_code} {status_message}, detail = {detail}")]
    RequestFailed {
        operation: &'static str,
        status_code: u16,
        status_message: String,
        detail: String,
    },

    #[error("Malformed Response: {operation}: {reason}; body = {body}")]
    MalformedResponse {
        operation: &'static str,
        reason: String,
        body: String,
    },

    #[error("Unexpected Shape: {operation}: expected {expected}, found {found}")]
    UnexpectedShape {
        operation: &'static str,
        expected: String,
        found: &'static str,
    },

    #[error("Field Type Mismatch: {operation}: field '{field}' expected {expected}, found {found}")]
    FieldTypeMismatch {
        operation: &'static str,
        field: String,
        expected: &'static str,
        found: &'static str,
    },
}

pub type Result<T> = std::result::Result<T, BulkImportError>;

impl BulkImportError {
    pub(crate) fn validation(operation: &'static str, message: impl Into<String>) -> Self {
        BulkImportError::ValidationError {
            operation,
            message: message.into(),
        }
    }

    pub(crate) fn transport(operation: &'static str, source: impl Into<TransportError>) -> Self {
        BulkImportError::TransportError {
            operation,
            source: source.into(),
        }
    }

    /// The operation that failed.
    pub fn operation(&self) -> &'static str {
        match self {
            BulkImportError::ValidationError { operation, .. }
            | BulkImportError::InvalidState { operation, .. }
            | BulkImportError::NotFound { operation, .. }
            | BulkImportError::TransportError { operation, .. }
            | BulkImportError::RequestFailed { operation, .. }
            | BulkImportError::MalformedResponse { operation, .. }
            | BulkImportError::UnexpectedShape { operation, .. }
            | BulkImportError::FieldTypeMismatch { operation, .. } => operation,
        }
    }

    /// The HTTP status of a failed request, if the server answered.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            BulkImportError::RequestFailed { status_code, .. } => Some(*status_code),
            _ => None,
        }
    }

    /// True for a session or part the server (or the local handle) knows to be gone.
    pub fn is_not_found(&self) -> bool {
        match self {
            BulkImportError::NotFound { .. } => true,
            BulkImportError::RequestFailed { status_code, .. } => *status_code == 404,
            _ => false,
        }
    }

    /// True when the server refused the request outright, as opposed to a failure that may pass
    /// on retry (5xx, timeouts, throttling, auth or routing problems).
    pub fn is_definitive_rejection(&self) -> bool {
        match self {
            BulkImportError::RequestFailed { status_code, .. } => {
                (400..500).contains(status_code) && !matches!(status_code, 401 | 403 | 404 | 408 | 429)
            },
            _ => false,
        }
    }

    /// True for errors raised before any request reached the transport.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            BulkImportError::ValidationError { .. } | BulkImportError::InvalidState { .. } | BulkImportError::NotFound { .. }
        )
    }

    /// True when the response arrived but did not match the expected contract.
    pub fn is_decode_error(&self) -> bool {
        matches!(
            self,
            BulkImportError::MalformedResponse { .. }
                | BulkImportError::UnexpectedShape { .. }
                | BulkImportError::FieldTypeMismatch { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_classification() {
        let e = BulkImportError::RequestFailed {
            operation: "delete part",
            status_code: 404,
            status_message: "Not Found".into(),
            detail: "part not found".into(),
        };
        assert!(e.is_not_found());
        assert_eq!(e.status_code(), Some(404));
        assert!(!e.is_validation());

        let e = BulkImportError::RequestFailed {
            operation: "delete part",
            status_code: 409,
            status_message: "Conflict".into(),
            detail: String::new(),
        };
        assert!(!e.is_not_found());

        let e = BulkImportError::NotFound {
            operation: "delete session",
            what: "session 'sess01' was already deleted".into(),
        };
        assert!(e.is_not_found());
        assert!(e.is_validation());
    }

    fn failed(status_code: u16) -> BulkImportError {
        BulkImportError::RequestFailed {
            operation: "commit session",
            status_code,
            status_message: String::new(),
            detail: String::new(),
        }
    }

    #[test]
    fn test_definitive_rejection() {
        for code in [400, 409, 410, 422] {
            assert!(failed(code).is_definitive_rejection(), "{code}");
        }
        for code in [201, 401, 403, 404, 408, 429, 500, 502, 503, 504] {
            assert!(!failed(code).is_definitive_rejection(), "{code}");
        }
        assert!(!BulkImportError::transport("commit session", TransportError::msg("reset")).is_definitive_rejection());
    }

    #[test]
    fn test_invalid_state_message() {
        let e = BulkImportError::InvalidState {
            operation: "commit session",
            session: "s".into(),
            state: SessionState::Open,
        };
        assert_eq!(e.to_string(), "Invalid State: cannot commit session 's' while it is open");
    }

    #[test]
    fn test_message_carries_diagnostics() {
        let e = BulkImportError::RequestFailed {
            operation: "perform session",
            status_code: 500,
            status_message: "Internal Server Error".into(),
            detail: "job queue unavailable".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("perform session"));
        assert!(msg.contains("500"));
        assert!(msg.contains("job queue unavailable"));
        assert_eq!(e.operation(), "perform session");
    }
}
