// ── Core error types ──
//
// `CoreError` is the user-facing cause of a failed remote call. Consumers
// never see reqwest errors or raw JSON failures; the `From<embedctl_api::Error>`
// impl flattens them into string-carrying variants so causes can be cloned
// into every published session snapshot.
//
// `SessionError` is the controller's taxonomy: which tier failed, with which
// inputs, and why.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::{ReportId, WorkspaceId};

/// Unified error type for remote operations.
#[derive(Debug, Clone, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot reach {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Rate limited by the service, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Not found: {identifier}")]
    NotFound { identifier: String },

    #[error("Unexpected response: {message}")]
    InvalidResponse { message: String },

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("Service error: {message}")]
    Api {
        message: String,
        /// Service error code (e.g. `PowerBIEntityNotFound`).
        code: Option<String>,
        status: Option<u16>,
    },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Worth retrying unchanged: timeouts, throttling, connectivity and
    /// server-side failures.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::RateLimited { .. } | Self::ConnectionFailed { .. } => true,
            Self::Api { status, .. } => status.is_some_and(|s| s >= 500),
            _ => false,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<embedctl_api::Error> for CoreError {
    fn from(err: embedctl_api::Error) -> Self {
        use embedctl_api::Error as ApiError;

        match err {
            ApiError::Authentication { message } => CoreError::AuthenticationFailed { message },
            ApiError::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout { timeout_secs: 0 }
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map_or_else(|| "<unknown>".into(), ToString::to_string),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        code: None,
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            ApiError::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            ApiError::UnsupportedBaseUrl(url) => CoreError::Config {
                message: format!("Base URL cannot carry API paths: {url}"),
            },
            ApiError::Timeout { timeout_secs } => CoreError::Timeout { timeout_secs },
            ApiError::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            ApiError::RateLimited { retry_after_secs } => {
                CoreError::RateLimited { retry_after_secs }
            }
            ApiError::Api {
                status: 404,
                message,
                ..
            } => CoreError::NotFound {
                identifier: message,
            },
            ApiError::Api {
                message,
                code,
                status,
            } => CoreError::Api {
                message,
                code,
                status: Some(status),
            },
            ApiError::Deserialization { message, body: _ } => {
                CoreError::InvalidResponse { message }
            }
        }
    }
}

// ── Session errors ───────────────────────────────────────────────────

/// Failure of a controller command or of the fetch it started.
///
/// Fetch failures are recorded in [`SessionState::last_error`](crate::SessionState)
/// and never returned from a command. Only selection errors and a closed
/// session surface as a command's `Err`.
#[derive(Debug, Clone, Error)]
pub enum SessionError {
    #[error("Failed to load workspaces: {source}")]
    WorkspaceFetch { source: CoreError },

    #[error("Failed to load reports for workspace {workspace_id}: {source}")]
    ReportFetch {
        workspace_id: WorkspaceId,
        source: CoreError,
    },

    #[error("Failed to issue embed configuration for report {report_id} in workspace {workspace_id}: {source}")]
    EmbedConfig {
        workspace_id: WorkspaceId,
        report_id: ReportId,
        source: CoreError,
    },

    #[error("{}", describe_selection(.workspace_id.as_ref(), .report_id.as_ref()))]
    InvalidSelection {
        workspace_id: Option<WorkspaceId>,
        report_id: Option<ReportId>,
    },

    #[error("Session controller has shut down")]
    SessionClosed,
}

impl SessionError {
    /// Fetch failures can be re-attempted with `retry()`. Selection errors
    /// are caller bugs and a closed session stays closed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::WorkspaceFetch { .. } | Self::ReportFetch { .. } | Self::EmbedConfig { .. }
        )
    }

    /// The underlying remote cause, for fetch failures.
    pub fn cause(&self) -> Option<&CoreError> {
        match self {
            Self::WorkspaceFetch { source }
            | Self::ReportFetch { source, .. }
            | Self::EmbedConfig { source, .. } => Some(source),
            Self::InvalidSelection { .. } | Self::SessionClosed => None,
        }
    }
}

fn describe_selection(workspace_id: Option<&WorkspaceId>, report_id: Option<&ReportId>) -> String {
    match (workspace_id, report_id) {
        (Some(ws), Some(r)) => format!("Report {r} is not available in workspace {ws}"),
        (None, Some(r)) => format!("Report {r} is not available: no workspace selected"),
        (Some(ws), None) => format!("Workspace {ws} is not available"),
        (None, None) => "Invalid selection".into(),
    }
}

/// A failure as it appears in session state.
#[derive(Debug, Clone)]
pub struct ErrorRecord {
    pub error: SessionError,
    pub at: DateTime<Utc>,
}

impl ErrorRecord {
    pub fn now(error: SessionError) -> Self {
        Self {
            error,
            at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_api_error_maps_to_not_found() {
        let err: CoreError = embedctl_api::Error::Api {
            message: "Report not found".into(),
            code: Some("ItemNotFound".into()),
            status: 404,
        }
        .into();
        assert!(err.is_not_found());
        assert!(!err.is_transient());
    }

    #[test]
    fn server_errors_stay_transient_through_conversion() {
        let err: CoreError = embedctl_api::Error::Api {
            message: "busy".into(),
            code: None,
            status: 503,
        }
        .into();
        assert!(err.is_transient());
    }

    #[test]
    fn fetch_errors_expose_cause() {
        let err = SessionError::ReportFetch {
            workspace_id: "ws-1".into(),
            source: CoreError::Timeout { timeout_secs: 30 },
        };
        assert!(err.is_retryable());
        assert!(matches!(err.cause(), Some(CoreError::Timeout { timeout_secs: 30 })));
        assert_eq!(
            err.to_string(),
            "Failed to load reports for workspace ws-1: Request timed out after 30s"
        );
    }

    #[test]
    fn invalid_selection_names_the_inputs() {
        let err = SessionError::InvalidSelection {
            workspace_id: Some("ws-1".into()),
            report_id: Some("r9".into()),
        };
        assert!(!err.is_retryable());
        assert_eq!(err.to_string(), "Report r9 is not available in workspace ws-1");
    }
}
