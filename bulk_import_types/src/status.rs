use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Server-side status of a bulk import session.
///
/// Status strings the client does not know map to [`SessionStatus::Unknown`] instead of failing,
/// so new server states do not break listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Uploading,
    Performing,
    Ready,
    Error,
    #[default]
    #[serde(other)]
    Unknown,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Unknown => "unknown",
            SessionStatus::Uploading => "uploading",
            SessionStatus::Performing => "performing",
            SessionStatus::Ready => "ready",
            SessionStatus::Error => "error",
        }
    }

    /// Parses a server status string; never fails.
    pub fn from_server_str(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "uploading" => SessionStatus::Uploading,
            "performing" => SessionStatus::Performing,
            "ready" => SessionStatus::Ready,
            "error" => SessionStatus::Error,
            _ => SessionStatus::Unknown,
        }
    }
}

impl FromStr for SessionStatus {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(SessionStatus::from_server_str(s))
    }
}

impl Display for SessionStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_statuses() {
        assert_eq!(SessionStatus::from_server_str("uploading"), SessionStatus::Uploading);
        assert_eq!(SessionStatus::from_server_str("performing"), SessionStatus::Performing);
        assert_eq!(SessionStatus::from_server_str("ready"), SessionStatus::Ready);
        assert_eq!(SessionStatus::from_server_str("Error"), SessionStatus::Error);
    }

    #[test]
    fn test_unknown_status_falls_back() {
        assert_eq!(SessionStatus::from_server_str("committing"), SessionStatus::Unknown);
        assert_eq!(SessionStatus::from_server_str(""), SessionStatus::Unknown);
        assert_eq!("committed".parse::<SessionStatus>().unwrap(), SessionStatus::Unknown);
    }

    #[test]
    fn test_serde_round_trip_and_fallback() {
        let s: SessionStatus = serde_json::from_str("\"ready\"").unwrap();
        assert_eq!(s, SessionStatus::Ready);
        let s: SessionStatus = serde_json::from_str("\"something_new\"").unwrap();
        assert_eq!(s, SessionStatus::Unknown);
        assert_eq!(serde_json::to_string(&SessionStatus::Uploading).unwrap(), "\"uploading\"");
    }
}
