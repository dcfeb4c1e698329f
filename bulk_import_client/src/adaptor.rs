use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use bulk_import_types::SessionSummary;
use bytes::Bytes;
use error_printer::ErrorPrinter;
use http::header::{AUTHORIZATION, CONTENT_TYPE};
use http::{HeaderMap, HeaderValue, Method};
use tracing::{debug, error};
use urlencoding::encode;
use utils::CredentialProvider;

use crate::decoder;
use crate::error::{BulkImportError, Result};
use crate::interface::{RequestBody, ResponseBody, Transport, TransportRequest, TransportResponse};
use crate::model::require_segment;

/// Every path lives under this versioned namespace.
pub const API_PREFIX: &str = "/v3/bulk_import/";

/// Scheme of the `Authorization` header: `TD1 <api key>`.
pub const AUTH_SCHEME: &str = "TD1";

/// How a successful response body becomes the operation's result.
pub enum ResponseFormat<R> {
    /// A single JSON object, read fully and decoded.
    Json(fn(&'static str, &[u8]) -> Result<R>),
    /// Concatenated MessagePack records, handed over unread for incremental decoding.
    RecordStream(fn(ResponseBody) -> R),
}

impl<R> Debug for ResponseFormat<R> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ResponseFormat::Json(_) => f.write_str("Json"),
            ResponseFormat::RecordStream(_) => f.write_str("RecordStream"),
        }
    }
}

/// Describes one API operation: how to address it and how to read what comes back.
#[derive(Debug)]
pub struct OperationDescriptor<R> {
    /// Human readable name used in errors and logs.
    pub name: &'static str,
    pub method: Method,
    /// Path below [`API_PREFIX`]; each `{}` is replaced by one percent-encoded segment.
    pub template: &'static str,
    pub sends_body: bool,
    pub response: ResponseFormat<R>,
}

fn unread(body: ResponseBody) -> ResponseBody {
    body
}

macro_rules! operation {
    ($ident:ident: $result:ty, $name:literal, $method:ident, $template:literal, $sends_body:literal, $response:expr) => {
        pub static $ident: OperationDescriptor<$result> = OperationDescriptor {
            name: $name,
            method: Method::$method,
            template: $template,
            sends_body: $sends_body,
            response: $response,
        };
    };
}

operation!(LIST_SESSIONS: Vec<SessionSummary>, "list sessions", GET, "list", false, ResponseFormat::Json(decoder::decode_session_list));
operation!(LIST_PARTS: Vec<String>, "list parts", GET, "list_parts/{}", false, ResponseFormat::Json(decoder::decode_part_list));
operation!(CREATE_SESSION: (), "create session", POST, "create/{}/{}/{}", false, ResponseFormat::Json(decoder::decode_ack));
operation!(UPLOAD_PART: (), "upload part", PUT, "upload_part/{}/{}", true, ResponseFormat::Json(decoder::decode_ack));
operation!(DELETE_PART: (), "delete part", POST, "delete_part/{}/{}", false, ResponseFormat::Json(decoder::decode_ack));
operation!(FREEZE_SESSION: (), "freeze session", POST, "freeze/{}", false, ResponseFormat::Json(decoder::decode_ack));
operation!(UNFREEZE_SESSION: (), "unfreeze session", POST, "unfreeze/{}", false, ResponseFormat::Json(decoder::decode_ack));
operation!(PERFORM_SESSION: Option<String>, "perform session", POST, "perform/{}", false, ResponseFormat::Json(decoder::decode_perform));
operation!(GET_ERROR_RECORDS: ResponseBody, "get error records", GET, "error_records/{}", false, ResponseFormat::RecordStream(unread));
operation!(COMMIT_SESSION: (), "commit session", POST, "commit/{}", false, ResponseFormat::Json(decoder::decode_ack));
operation!(DELETE_SESSION: (), "delete session", POST, "delete/{}", false, ResponseFormat::Json(decoder::decode_ack));

impl<R> OperationDescriptor<R> {
    /// Absolute request path with every segment percent-encoded.
    pub fn path(&self, segments: &[&str]) -> String {
        debug_assert_eq!(self.template.matches("{}").count(), segments.len(), "{}", self.name);

        let mut pieces = self.template.split("{}");
        let mut path = String::from(API_PREFIX);
        path.push_str(pieces.next().unwrap_or_default());
        for (segment, piece) in segments.iter().zip(pieces) {
            path.push_str(&encode(segment));
            path.push_str(piece);
        }
        path
    }
}

/// Drives the build-request, send, check-status sequence shared by every operation.
pub struct Adaptor {
    transport: Arc<dyn Transport>,
    credentials: Arc<dyn CredentialProvider>,
}

impl Adaptor {
    pub fn new(transport: Arc<dyn Transport>, credentials: Arc<dyn CredentialProvider>) -> Self {
        Self { transport, credentials }
    }

    /// Headers for one call. Credentials are read fresh each time.
    fn headers<R>(&self, op: &OperationDescriptor<R>) -> Result<HeaderMap> {
        let credentials = self
            .credentials
            .current_credentials()
            .map_err(|e| BulkImportError::validation(op.name, format!("missing credentials: {e}")))?;
        if credentials.is_empty() {
            return Err(BulkImportError::validation(op.name, "missing credentials: API key is empty"));
        }

        let mut auth = HeaderValue::from_str(&format!("{AUTH_SCHEME} {}", credentials.token()))
            .map_err(|_| BulkImportError::validation(op.name, "API key contains characters not allowed in a header"))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        if op.sends_body {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/octet-stream"));
        }
        Ok(headers)
    }

    /// Sends the request and returns the response if, and only if, the server answered 200.
    async fn send<R>(&self, op: &OperationDescriptor<R>, segments: &[&str], body: RequestBody) -> Result<TransportResponse> {
        debug_assert!(op.sends_body || body.is_empty(), "{} takes no body", op.name);
        for segment in segments {
            require_segment(op.name, "path segment", segment)?;
        }

        let request = TransportRequest {
            operation: op.name,
            method: op.method.clone(),
            path: op.path(segments),
            headers: self.headers(op)?,
            body,
        };
        debug!("{}: {} {} ({} byte body)", op.name, request.method, request.path, request.body.len());

        let response = self
            .transport
            .send(request)
            .await
            .map_err(|e| BulkImportError::transport(op.name, e))
            .log_error(op.name)?;

        if response.status == 200 {
            return Ok(response);
        }

        let status_code = response.status;
        let status_message = response.status_message;
        // The response body is consumed (and the connection released) here on the error path too.
        let body = match response.body.bytes().await {
            Ok(b) => b,
            Err(e) => {
                debug!("{}: could not read error body: {e}", op.name);
                Bytes::new()
            },
        };
        let detail = self
            .transport
            .error_detail(&body)
            .unwrap_or_else(|| format!("{status_code} {status_message}"));

        error!("{} failed: {status_code} {status_message}, detail = {detail}", op.name);
        Err(BulkImportError::RequestFailed {
            operation: op.name,
            status_code,
            status_message,
            detail,
        })
    }

    /// Runs `op` and reads its result the way its descriptor says.
    pub async fn call<R>(&self, op: &OperationDescriptor<R>, segments: &[&str], body: RequestBody) -> Result<R> {
        let response = self.send(op, segments, body).await?;
        match op.response {
            ResponseFormat::Json(decode) => {
                let body = response
                    .body
                    .bytes()
                    .await
                    .map_err(|e| BulkImportError::transport(op.name, e))
                    .log_error(op.name)?;
                decode(op.name, &body)
            },
            ResponseFormat::RecordStream(wrap) => Ok(wrap(response.body)),
        }
    }
}
