#![cfg_attr(feature = "strict", deny(warnings))]

pub use adaptor::{API_PREFIX, AUTH_SCHEME, OperationDescriptor, ResponseFormat};
pub use bulk_import_types::{ErrorRecord, SessionCounters, SessionStatus, SessionSummary};
pub use client::BulkImportClient;
pub use config::ClientConfig;
pub use error::{BulkImportError, Result};
pub use error_records::ErrorRecords;
pub use http_client::{Api, HttpTransport, RequestLogger, build_http_client};
pub use interface::{
    RequestBody, ResponseBody, Transport, TransportError, TransportRequest, TransportResponse, TransportResult,
    default_error_detail,
};
pub use model::{
    CreateSessionRequest, DeletePartResult, DeleteResult, ListPartsResult, ListSessionsResult, PerformSessionResult,
    SessionAck, UploadPartRequest, UploadPartResult,
};
pub use session::{Session, SessionState};

pub mod adaptor;
pub mod config;
#[cfg(any(test, feature = "testing"))]
pub mod testing_utils;

mod client;
mod decoder;
mod error;
mod error_records;
mod http_client;
mod interface;
mod model;
mod session;
