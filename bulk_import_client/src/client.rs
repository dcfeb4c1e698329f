use std::sync::Arc;

use bytes::Bytes;
use tracing::info;
use utils::CredentialProvider;

use crate::adaptor::{self, Adaptor};
use crate::config::ClientConfig;
use crate::error::{BulkImportError, Result};
use crate::error_records::ErrorRecords;
use crate::http_client::HttpTransport;
use crate::interface::{RequestBody, Transport};
use crate::model::{
    CreateSessionRequest, DeletePartResult, DeleteResult, ListPartsResult, ListSessionsResult, PerformSessionResult,
    SessionAck, UploadPartRequest, UploadPartResult, require_segment,
};
use crate::session::{Session, Transition};

/// Client for the bulk import API.
///
/// Operations that move a session through its lifecycle take `&mut Session` and update it only
/// after the server confirms; requests the current state rules out fail locally with
/// [`BulkImportError::InvalidState`] and are never sent.
pub struct BulkImportClient {
    adaptor: Adaptor,
}

impl BulkImportClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let transport = HttpTransport::new(&config).map_err(|e| BulkImportError::transport("build client", e))?;
        Ok(Self::with_transport(Arc::new(transport), config.credentials))
    }

    pub fn with_transport(transport: Arc<dyn Transport>, credentials: Arc<dyn CredentialProvider>) -> Self {
        Self {
            adaptor: Adaptor::new(transport, credentials),
        }
    }

    pub async fn list_sessions(&self) -> Result<ListSessionsResult> {
        let op = &adaptor::LIST_SESSIONS;
        let sessions = self.adaptor.call(op, &[], RequestBody::Empty).await?;
        Ok(ListSessionsResult { sessions })
    }

    pub async fn create_session(&self, name: &str, database: &str, table: &str) -> Result<Session> {
        self.create(CreateSessionRequest::new(name, database, table)).await
    }

    pub async fn create(&self, request: CreateSessionRequest) -> Result<Session> {
        let op = &adaptor::CREATE_SESSION;
        request.validate(op.name)?;
        self.adaptor
            .call(op, &[request.name.as_str(), request.database.as_str(), request.table.as_str()], RequestBody::Empty)
            .await?;

        info!("created bulk import session {} for {}.{}", request.name, request.database, request.table);
        Ok(Session::new(request.name, request.database, request.table))
    }

    pub async fn list_parts(&self, session: &Session) -> Result<ListPartsResult> {
        let op = &adaptor::LIST_PARTS;
        session.check(Transition::ListParts, op.name)?;
        let parts = self.adaptor.call(op, &[session.name()], RequestBody::Empty).await?;
        Ok(ListPartsResult {
            session_name: session.name().to_owned(),
            parts,
        })
    }

    /// Uploads `payload` as part `part_id`. `size` must equal the payload length.
    pub async fn upload_part(
        &self,
        session: &Session,
        part_id: &str,
        payload: impl Into<Bytes>,
        size: u64,
    ) -> Result<UploadPartResult> {
        self.upload(session, UploadPartRequest::with_declared_size(part_id, payload, size))
            .await
    }

    pub async fn upload(&self, session: &Session, request: UploadPartRequest) -> Result<UploadPartResult> {
        let op = &adaptor::UPLOAD_PART;
        request.validate(op.name)?;
        session.check(Transition::UploadPart, op.name)?;

        self.adaptor
            .call(op, &[session.name(), request.part_id.as_str()], request.body())
            .await?;

        info!("uploaded part {} ({} bytes) to session {}", request.part_id, request.size, session.name());
        Ok(UploadPartResult {
            session_name: session.name().to_owned(),
            part_id: request.part_id,
            size: request.size,
        })
    }

    pub async fn delete_part(&self, session: &Session, part_id: &str) -> Result<DeletePartResult> {
        let op = &adaptor::DELETE_PART;
        require_segment(op.name, "part id", part_id)?;
        session.check(Transition::DeletePart, op.name)?;

        self.adaptor.call(op, &[session.name(), part_id], RequestBody::Empty).await?;

        info!("deleted part {part_id} from session {}", session.name());
        Ok(DeletePartResult {
            session_name: session.name().to_owned(),
            part_id: part_id.to_owned(),
        })
    }

    /// Stops uploads to the session. Freezing a frozen session is a no-op on the server.
    pub async fn freeze_session(&self, session: &mut Session) -> Result<SessionAck> {
        let op = &adaptor::FREEZE_SESSION;
        session.check(Transition::Freeze, op.name)?;
        self.adaptor.call(op, &[session.name()], RequestBody::Empty).await?;

        session.mark_frozen();
        info!("froze session {} ({})", session.name(), session.state());
        Ok(ack(session))
    }

    pub async fn unfreeze_session(&self, session: &mut Session) -> Result<SessionAck> {
        let op = &adaptor::UNFREEZE_SESSION;
        session.check(Transition::Unfreeze, op.name)?;
        self.adaptor.call(op, &[session.name()], RequestBody::Empty).await?;

        session.mark_unfrozen();
        info!("unfroze session {}", session.name());
        Ok(ack(session))
    }

    /// Starts aggregating the uploaded parts. A perform the server rejects outright (a 4xx other
    /// than auth, not-found, timeout or throttling) leaves the session in
    /// [`SessionState::Error`](crate::SessionState::Error).
    pub async fn perform_session(&self, session: &mut Session) -> Result<PerformSessionResult> {
        let op = &adaptor::PERFORM_SESSION;
        session.check(Transition::Perform, op.name)?;
        let res = self.adaptor.call(op, &[session.name()], RequestBody::Empty).await;
        let job_id = res.inspect_err(|e| fail_on_rejection(session, e))?;

        session.mark_performed(job_id.clone());
        info!("performing session {}, job {}", session.name(), job_id.as_deref().unwrap_or("(none reported)"));
        Ok(PerformSessionResult {
            session_name: session.name().to_owned(),
            job_id,
        })
    }

    /// Opens the stream of records rejected during perform.
    pub async fn get_error_records(&self, session: &Session) -> Result<ErrorRecords> {
        let op = &adaptor::GET_ERROR_RECORDS;
        session.check(Transition::ErrorRecords, op.name)?;
        let body = self.adaptor.call(op, &[session.name()], RequestBody::Empty).await?;
        Ok(ErrorRecords::new(op.name, session.name().to_owned(), body))
    }

    /// Makes the performed data visible in the target table. A commit the server rejects outright
    /// leaves the session in [`SessionState::Error`](crate::SessionState::Error).
    pub async fn commit_session(&self, session: &mut Session) -> Result<SessionAck> {
        let op = &adaptor::COMMIT_SESSION;
        session.check(Transition::Commit, op.name)?;
        let res = self.adaptor.call(op, &[session.name()], RequestBody::Empty).await;
        res.inspect_err(|e| fail_on_rejection(session, e))?;

        session.mark_committed();
        info!("committed session {}", session.name());
        Ok(ack(session))
    }

    pub async fn delete_session(&self, session: &mut Session) -> Result<DeleteResult> {
        let op = &adaptor::DELETE_SESSION;
        session.check(Transition::Delete, op.name)?;
        self.adaptor.call(op, &[session.name()], RequestBody::Empty).await?;

        session.mark_deleted();
        info!("deleted session {}", session.name());
        Ok(DeleteResult {
            session_name: session.name().to_owned(),
        })
    }

    /// Pulls job id, counters and frozen flag for `session` from the server's session listing.
    pub async fn refresh_session(&self, session: &mut Session) -> Result<()> {
        let op = &adaptor::LIST_SESSIONS;
        session.check(Transition::ListParts, op.name)?;
        let listing = self.list_sessions().await?;
        let summary = listing.find(session.name()).ok_or_else(|| BulkImportError::NotFound {
            operation: op.name,
            what: format!("session '{}' is not in the session listing", session.name()),
        })?;
        session.apply_summary(summary);
        Ok(())
    }
}

fn ack(session: &Session) -> SessionAck {
    SessionAck {
        session_name: session.name().to_owned(),
        frozen: session.is_frozen(),
    }
}

/// Only a definitive server rejection moves the session to `Error`. Transport failures and
/// retryable statuses leave it as it was.
fn fail_on_rejection(session: &mut Session, e: &BulkImportError) {
    if e.is_definitive_rejection() {
        session.mark_failed();
    }
}
