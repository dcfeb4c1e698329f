use std::fmt::{Display, Formatter};

use bulk_import_types::{SessionCounters, SessionStatus, SessionSummary};

use crate::error::{BulkImportError, Result};

/// Local lifecycle state of a session handle.
///
/// ```text
///  Open --freeze--> Frozen --perform--> Performing --commit--> Committed
///   ^                 |  ^                 |   |
///   +----unfreeze-----+  +----perform------+   +--failed perform/commit--> Error
///
///  any state but Deleted --delete--> Deleted
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    Open,
    Frozen,
    Performing,
    Committed,
    Error,
    Deleted,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Open => "open",
            SessionState::Frozen => "frozen",
            SessionState::Performing => "performing",
            SessionState::Committed => "committed",
            SessionState::Error => "in error",
            SessionState::Deleted => "deleted",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Committed | SessionState::Error | SessionState::Deleted)
    }

    /// Uploads are rejected in every state but `Open`.
    pub fn is_frozen(&self) -> bool {
        !matches!(self, SessionState::Open)
    }
}

impl Display for SessionState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The lifecycle operations a session handle gates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Transition {
    UploadPart,
    DeletePart,
    ListParts,
    Freeze,
    Unfreeze,
    Perform,
    ErrorRecords,
    Commit,
    Delete,
}

/// A named, server-tracked bulk import bound to one destination table.
///
/// The name, database and table never change. Everything else is only updated from successful
/// server responses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    name: String,
    database: String,
    table: String,
    state: SessionState,
    job_id: Option<String>,
    counters: Option<SessionCounters>,
    performed: bool,
}

impl Session {
    /// A handle for a freshly created session; no request is made.
    pub fn new(name: impl Into<String>, database: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            database: database.into(),
            table: table.into(),
            state: SessionState::Open,
            job_id: None,
            counters: None,
            performed: false,
        }
    }

    /// Attaches a handle to a session that already exists on the server, deriving the local
    /// state from the listed status.
    pub fn from_summary(summary: &SessionSummary) -> Self {
        let performed = summary.job_id.is_some()
            || matches!(summary.status, SessionStatus::Performing | SessionStatus::Ready);

        let state = match summary.status {
            SessionStatus::Error => SessionState::Error,
            SessionStatus::Performing | SessionStatus::Ready => SessionState::Performing,
            SessionStatus::Uploading | SessionStatus::Unknown if summary.upload_frozen => SessionState::Frozen,
            SessionStatus::Uploading | SessionStatus::Unknown => SessionState::Open,
        };

        Self {
            name: summary.name.clone(),
            database: summary.database.clone(),
            table: summary.table.clone(),
            state,
            job_id: summary.job_id.clone(),
            counters: performed.then_some(summary.counters),
            performed,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_frozen(&self) -> bool {
        self.state.is_frozen()
    }

    pub fn job_id(&self) -> Option<&str> {
        self.job_id.as_deref()
    }

    /// Counters last reported by the server; `None` until the session has been performed.
    pub fn counters(&self) -> Option<SessionCounters> {
        self.counters
    }

    pub fn has_performed(&self) -> bool {
        self.performed
    }

    /// Rejects `transition` locally when the current state does not allow it.
    pub(crate) fn check(&self, transition: Transition, operation: &'static str) -> Result<()> {
        use SessionState::*;

        if self.state == Deleted {
            return Err(BulkImportError::NotFound {
                operation,
                what: format!("session '{}' was already deleted", self.name),
            });
        }

        let allowed = match transition {
            Transition::UploadPart => self.state == Open,
            Transition::DeletePart => matches!(self.state, Open | Frozen | Performing),
            Transition::ListParts | Transition::Delete => true,
            Transition::Freeze | Transition::Unfreeze => matches!(self.state, Open | Frozen | Performing),
            Transition::Perform => matches!(self.state, Frozen | Performing),
            Transition::ErrorRecords => self.performed,
            Transition::Commit => self.state == Performing,
        };

        if allowed {
            Ok(())
        } else {
            Err(BulkImportError::InvalidState {
                operation,
                session: self.name.clone(),
                state: self.state,
            })
        }
    }

    pub(crate) fn mark_frozen(&mut self) {
        if self.state == SessionState::Open {
            self.state = SessionState::Frozen;
        }
    }

    pub(crate) fn mark_unfrozen(&mut self) {
        self.state = SessionState::Open;
    }

    pub(crate) fn mark_performed(&mut self, job_id: Option<String>) {
        self.state = SessionState::Performing;
        self.performed = true;
        if job_id.is_some() {
            self.job_id = job_id;
        }
    }

    pub(crate) fn mark_committed(&mut self) {
        self.state = SessionState::Committed;
    }

    pub(crate) fn mark_failed(&mut self) {
        self.state = SessionState::Error;
    }

    pub(crate) fn mark_deleted(&mut self) {
        self.state = SessionState::Deleted;
    }

    /// Applies server-reported job id, counters and frozen flag from a listing entry.
    pub(crate) fn apply_summary(&mut self, summary: &SessionSummary) {
        if summary.job_id.is_some() {
            self.job_id = summary.job_id.clone();
        }
        if summary.job_id.is_some() || self.performed {
            self.counters = Some(summary.counters);
        }
        match (self.state, summary.upload_frozen) {
            (SessionState::Open, true) => self.state = SessionState::Frozen,
            (SessionState::Frozen, false) => self.state = SessionState::Open,
            _ => {},
        }
    }
}
