use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A dataset backing one or more reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dataset {
    pub id: String,
    pub name: String,
    pub configured_by: Option<String>,
    pub is_refreshable: bool,
}

/// Outcome of a dataset refresh as reported by the service.
///
/// The service reports in-flight refreshes as `Unknown`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum RefreshStatus {
    InProgress,
    Completed,
    Failed,
    Cancelled,
    Disabled,
    Other(String),
}

impl From<&str> for RefreshStatus {
    fn from(raw: &str) -> Self {
        match raw {
            "Unknown" => Self::InProgress,
            "Completed" => Self::Completed,
            "Failed" => Self::Failed,
            "Cancelled" => Self::Cancelled,
            "Disabled" => Self::Disabled,
            other => Self::Other(other.to_owned()),
        }
    }
}

impl fmt::Display for RefreshStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InProgress => f.write_str("in progress"),
            Self::Completed => f.write_str("completed"),
            Self::Failed => f.write_str("failed"),
            Self::Cancelled => f.write_str("cancelled"),
            Self::Disabled => f.write_str("disabled"),
            Self::Other(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RefreshRecord {
    pub request_id: Option<String>,
    pub refresh_type: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub status: RefreshStatus,
}

impl RefreshRecord {
    pub fn duration(&self) -> Option<chrono::TimeDelta> {
        Some(self.ended_at? - self.started_at?)
    }
}
