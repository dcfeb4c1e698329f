//! Turns control-plane response bodies into typed values.
//!
//! Every control response is a single JSON object. Fields are pulled out by name with an explicit
//! type; a present field of the wrong type is a [`FieldTypeMismatch`], while absent or `null`
//! counters read as zero.
//!
//! [`FieldTypeMismatch`]: BulkImportError::FieldTypeMismatch

use bulk_import_types::{SessionCounters, SessionStatus, SessionSummary};
use serde_json::{Map, Value};

use crate::error::{BulkImportError, Result};

/// Key under which the session listing is returned.
pub(crate) const SESSION_LIST_KEY: &str = "bulk_imports";
pub(crate) const PART_LIST_KEY: &str = "parts";

fn kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// A JSON object from a response, remembering where it came from for error messages.
#[derive(Debug)]
pub(crate) struct ResponseObject {
    operation: &'static str,
    path: String,
    map: Map<String, Value>,
}

impl ResponseObject {
    pub(crate) fn parse(operation: &'static str, body: &[u8]) -> Result<Self> {
        let value: Value = serde_json::from_slice(body).map_err(|e| BulkImportError::MalformedResponse {
            operation,
            reason: e.to_string(),
            body: String::from_utf8_lossy(body).into_owned(),
        })?;
        Self::from_value(operation, String::new(), value)
    }

    fn from_value(operation: &'static str, path: String, value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(Self { operation, path, map }),
            other => Err(BulkImportError::UnexpectedShape {
                operation,
                expected: if path.is_empty() {
                    "a JSON object".to_owned()
                } else {
                    format!("a JSON object at {path}")
                },
                found: kind(&other),
            }),
        }
    }

    fn field_path(&self, field: &str) -> String {
        if self.path.is_empty() {
            field.to_owned()
        } else {
            format!("{}.{field}", self.path)
        }
    }

    fn mismatch(&self, field: &str, expected: &'static str, found: &Value) -> BulkImportError {
        BulkImportError::FieldTypeMismatch {
            operation: self.operation,
            field: self.field_path(field),
            expected,
            found: kind(found),
        }
    }

    fn missing(&self, field: &str) -> BulkImportError {
        BulkImportError::UnexpectedShape {
            operation: self.operation,
            expected: format!("field '{}'", self.field_path(field)),
            found: "nothing",
        }
    }

    /// Absent and `null` both read as `None`.
    fn present(&self, field: &str) -> Option<&Value> {
        self.map.get(field).filter(|v| !v.is_null())
    }

    pub(crate) fn required_str(&self, field: &str) -> Result<&str> {
        self.optional_str(field)?.ok_or_else(|| self.missing(field))
    }

    pub(crate) fn optional_str(&self, field: &str) -> Result<Option<&str>> {
        match self.present(field) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s)),
            Some(other) => Err(self.mismatch(field, "string", other)),
        }
    }

    pub(crate) fn optional_bool(&self, field: &str) -> Result<Option<bool>> {
        match self.present(field) {
            None => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(other) => Err(self.mismatch(field, "boolean", other)),
        }
    }

    /// A counter; absent or `null` means zero.
    pub(crate) fn count(&self, field: &str) -> Result<u64> {
        match self.present(field) {
            None => Ok(0),
            Some(v) => v.as_u64().ok_or_else(|| self.mismatch(field, "non-negative integer", v)),
        }
    }

    pub(crate) fn required_array(&self, field: &str) -> Result<&[Value]> {
        match self.present(field) {
            None => Err(self.missing(field)),
            Some(Value::Array(items)) => Ok(items),
            Some(other) => Err(self.mismatch(field, "array", other)),
        }
    }
}

/// Acknowledgements carry only the session name, which is not trusted over the request's own.
pub(crate) fn decode_ack(operation: &'static str, body: &[u8]) -> Result<()> {
    let obj = ResponseObject::parse(operation, body)?;
    obj.optional_str("name")?;
    Ok(())
}

/// `{"name":"sess01","job_id":"127949"}`
pub(crate) fn decode_perform(operation: &'static str, body: &[u8]) -> Result<Option<String>> {
    let obj = ResponseObject::parse(operation, body)?;
    obj.optional_str("name")?;
    Ok(obj.optional_str("job_id")?.map(str::to_owned))
}

/// `{"name":"t01","parts":["error01","ok01"]}`
pub(crate) fn decode_part_list(operation: &'static str, body: &[u8]) -> Result<Vec<String>> {
    let obj = ResponseObject::parse(operation, body)?;
    obj.required_array(PART_LIST_KEY)?
        .iter()
        .enumerate()
        .map(|(i, v)| match v {
            Value::String(s) => Ok(s.clone()),
            other => Err(obj.mismatch(&format!("{PART_LIST_KEY}[{i}]"), "string", other)),
        })
        .collect()
}

/// `{"bulk_imports":[{"name":..., "database":..., "table":..., "status":..., "upload_frozen":...,
/// "job_id":..., "valid_records":..., "error_records":..., "valid_parts":..., "error_parts":...}]}`
pub(crate) fn decode_session_list(operation: &'static str, body: &[u8]) -> Result<Vec<SessionSummary>> {
    let obj = ResponseObject::parse(operation, body)?;
    obj.required_array(SESSION_LIST_KEY)?
        .iter()
        .enumerate()
        .map(|(i, v)| {
            let entry = ResponseObject::from_value(operation, format!("{SESSION_LIST_KEY}[{i}]"), v.clone())?;
            decode_summary(&entry)
        })
        .collect()
}

fn decode_summary(entry: &ResponseObject) -> Result<SessionSummary> {
    Ok(SessionSummary {
        name: entry.required_str("name")?.to_owned(),
        database: entry.required_str("database")?.to_owned(),
        table: entry.required_str("table")?.to_owned(),
        status: entry
            .optional_str("status")?
            .map(SessionStatus::from_server_str)
            .unwrap_or_default(),
        upload_frozen: entry.optional_bool("upload_frozen")?.unwrap_or(false),
        job_id: entry.optional_str("job_id")?.map(str::to_owned),
        counters: SessionCounters {
            valid_records: entry.count("valid_records")?,
            error_records: entry.count("error_records")?,
            valid_parts: entry.count("valid_parts")?,
            error_parts: entry.count("error_parts")?,
        },
    })
}
