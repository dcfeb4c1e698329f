use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

mod status;

pub use status::SessionStatus;

/// A record the server rejected while performing a session, as returned by `error_records`.
///
/// Records are arbitrary MessagePack values; their layout is whatever the uploaded parts contained.
pub type ErrorRecord = rmpv::Value;

/// Server-computed record and part counters for a session.
///
/// The server reports these as `null` until the first perform; they are read as zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCounters {
    pub valid_records: u64,
    pub error_records: u64,
    pub valid_parts: u64,
    pub error_parts: u64,
}

impl SessionCounters {
    pub fn total_records(&self) -> u64 {
        self.valid_records.saturating_add(self.error_records)
    }

    pub fn total_parts(&self) -> u64 {
        self.valid_parts.saturating_add(self.error_parts)
    }
}

/// One entry of the session listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub name: String,
    pub database: String,
    pub table: String,
    pub status: SessionStatus,
    pub upload_frozen: bool,
    pub job_id: Option<String>,
    #[serde(flatten)]
    pub counters: SessionCounters,
}

impl SessionSummary {
    pub fn valid_records(&self) -> u64 {
        self.counters.valid_records
    }

    pub fn error_records(&self) -> u64 {
        self.counters.error_records
    }

    pub fn valid_parts(&self) -> u64 {
        self.counters.valid_parts
    }

    pub fn error_parts(&self) -> u64 {
        self.counters.error_parts
    }
}

impl Display for SessionSummary {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({}.{}) status={} frozen={} job={} records={}/{} parts={}/{}",
            self.name,
            self.database,
            self.table,
            self.status,
            self.upload_frozen,
            self.job_id.as_deref().unwrap_or("-"),
            self.counters.valid_records,
            self.counters.error_records,
            self.counters.valid_parts,
            self.counters.error_parts,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary() -> SessionSummary {
        SessionSummary {
            name: "t01".into(),
            database: "sfdb".into(),
            table: "bi02".into(),
            status: SessionStatus::Ready,
            upload_frozen: false,
            job_id: Some("70220".into()),
            counters: SessionCounters {
                valid_records: 100,
                error_records: 10,
                valid_parts: 2,
                error_parts: 1,
            },
        }
    }

    #[test]
    fn test_counter_totals() {
        let s = summary();
        assert_eq!(s.counters.total_records(), 110);
        assert_eq!(s.counters.total_parts(), 3);
    }

    #[test]
    fn test_summary_serializes_with_wire_field_names() {
        let v = serde_json::to_value(summary()).unwrap();
        assert_eq!(v["status"], "ready");
        assert_eq!(v["upload_frozen"], false);
        assert_eq!(v["valid_records"], 100);
        assert_eq!(v["error_parts"], 1);
    }

    #[test]
    fn test_display() {
        assert_eq!(
            summary().to_string(),
            "t01 (sfdb.bi02) status=ready frozen=false job=70220 records=100/10 parts=2/1"
        );
    }
}
