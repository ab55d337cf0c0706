//! CLI error types with miette diagnostics.
//!
//! Maps core, session and config errors into user-facing errors with
//! actionable help text and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use embedctl_config::ConfigError;
use embedctl_core::{CoreError, SessionError};

pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach {url}")]
    #[diagnostic(
        code(embedctl::connection_failed),
        help(
            "Check network access and the service URL.\n\
             Reason: {reason}"
        )
    )]
    ConnectionFailed { url: String, reason: String },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(embedctl::auth_failed),
        help(
            "Verify the tenant id, client id and client secret of the profile.\n\
             Store a new secret with: embedctl config set-secret"
        )
    )]
    AuthFailed { message: String },

    #[error("No credentials configured for profile '{profile}'")]
    #[diagnostic(
        code(embedctl::no_credentials),
        help(
            "Configure credentials with: embedctl config init\n\
             Or pass --access-token / set EMBEDCTL_ACCESS_TOKEN."
        )
    )]
    NoCredentials { profile: String },

    // ── Resources ────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(embedctl::not_found),
        help("Run: embedctl {list_command} to see available {resource_type}s")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    #[error("No {resource_type}s available")]
    #[diagnostic(code(embedctl::empty), help("{hint}"))]
    NothingAvailable { resource_type: String, hint: String },

    // ── API ──────────────────────────────────────────────────────────
    #[error("API error ({code}): {message}")]
    #[diagnostic(code(embedctl::api_error))]
    ApiError { code: String, message: String },

    #[error("Rate limited by the service")]
    #[diagnostic(
        code(embedctl::rate_limited),
        help("Retry after {retry_after_secs}s.")
    )]
    RateLimited { retry_after_secs: u64 },

    #[error("{stage} failed")]
    #[diagnostic(code(embedctl::session))]
    Session {
        stage: &'static str,
        #[source]
        source: Box<CliError>,
    },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(embedctl::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(embedctl::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: embedctl config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("Configuration file not found")]
    #[diagnostic(
        code(embedctl::no_config),
        help(
            "Create one with: embedctl config init\n\
             Expected at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(embedctl::config))]
    Config(Box<figment::Error>),

    #[error("Keyring error: {message}")]
    #[diagnostic(
        code(embedctl::keyring),
        help("Fall back to client_secret_env or a plaintext client_secret in the profile.")
    )]
    Keyring { message: String },

    // ── Timeout ──────────────────────────────────────────────────────
    #[error("Request timed out after {seconds}s")]
    #[diagnostic(
        code(embedctl::timeout),
        help("Increase timeout with --timeout or the profile's fetch_timeout.")
    )]
    Timeout { seconds: u64 },

    #[error("Session controller stopped unexpectedly")]
    #[diagnostic(code(embedctl::session_closed))]
    SessionClosed,

    // ── IO ───────────────────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for CliError {
    fn from(err: figment::Error) -> Self {
        Self::Config(Box::new(err))
    }
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Validation { .. } | Self::ProfileNotFound { .. } => exit_code::USAGE,
            Self::Session { source, .. } => source.exit_code(),
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => Self::ConnectionFailed { url, reason },
            CoreError::AuthenticationFailed { message } => Self::AuthFailed { message },
            CoreError::Timeout { timeout_secs } => Self::Timeout {
                seconds: timeout_secs,
            },
            CoreError::RateLimited { retry_after_secs } => Self::RateLimited { retry_after_secs },
            CoreError::NotFound { identifier } => Self::NotFound {
                resource_type: "resource".into(),
                identifier,
                list_command: "workspaces list".into(),
            },
            CoreError::InvalidResponse { message } => Self::ApiError {
                code: "invalid_response".into(),
                message,
            },
            CoreError::Api {
                message,
                code,
                status,
            } => Self::ApiError {
                code: code
                    .or_else(|| status.map(|s| s.to_string()))
                    .unwrap_or_else(|| "unknown".into()),
                message,
            },
            CoreError::Config { message } => Self::Validation {
                field: "configuration".into(),
                reason: message,
            },
            CoreError::Internal(message) => Self::ApiError {
                code: "internal".into(),
                message,
            },
        }
    }
}

// ── SessionError → CliError mapping ──────────────────────────────────

fn staged(stage: &'static str, source: CliError) -> CliError {
    CliError::Session {
        stage,
        source: Box::new(source),
    }
}

impl From<SessionError> for CliError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::WorkspaceFetch { source } => staged("Loading workspaces", source.into()),
            SessionError::ReportFetch {
                workspace_id,
                source,
            } => {
                let cause = if source.is_not_found() {
                    Self::NotFound {
                        resource_type: "workspace".into(),
                        identifier: workspace_id.to_string(),
                        list_command: "workspaces list".into(),
                    }
                } else {
                    source.into()
                };
                staged("Loading reports", cause)
            }
            SessionError::EmbedConfig {
                workspace_id,
                report_id,
                source,
            } => {
                let cause = if source.is_not_found() {
                    Self::NotFound {
                        resource_type: "report".into(),
                        identifier: report_id.to_string(),
                        list_command: format!("reports list -w {workspace_id}"),
                    }
                } else {
                    source.into()
                };
                staged("Issuing embed configuration", cause)
            }
            SessionError::InvalidSelection {
                workspace_id,
                report_id: Some(report_id),
            } => Self::NotFound {
                resource_type: "report".into(),
                identifier: report_id.to_string(),
                list_command: workspace_id.map_or_else(
                    || "reports list".into(),
                    |ws| format!("reports list -w {ws}"),
                ),
            },
            SessionError::InvalidSelection {
                workspace_id,
                report_id: None,
            } => Self::NotFound {
                resource_type: "workspace".into(),
                identifier: workspace_id.map(|w| w.to_string()).unwrap_or_default(),
                list_command: "workspaces list".into(),
            },
            SessionError::SessionClosed => Self::SessionClosed,
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            ConfigError::NoCredentials { profile } => Self::NoCredentials { profile },
            ConfigError::Keyring(e) => Self::Keyring {
                message: e.to_string(),
            },
            ConfigError::Figment(e) => Self::Config(e),
            ConfigError::Serialization(e) => Self::Validation {
                field: "config".into(),
                reason: e.to_string(),
            },
            ConfigError::Io(e) => Self::Io(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_failures_keep_the_cause_exit_code() {
        let err: CliError = SessionError::WorkspaceFetch {
            source: CoreError::Timeout { timeout_secs: 30 },
        }
        .into();
        assert_eq!(err.exit_code(), exit_code::TIMEOUT);

        let err: CliError = SessionError::ReportFetch {
            workspace_id: "ws-1".into(),
            source: CoreError::NotFound {
                identifier: "ws-1".into(),
            },
        }
        .into();
        assert_eq!(err.exit_code(), exit_code::NOT_FOUND);
    }

    #[test]
    fn unknown_report_is_not_found() {
        let err: CliError = SessionError::InvalidSelection {
            workspace_id: Some("ws-1".into()),
            report_id: Some("r-9".into()),
        }
        .into();
        assert_eq!(err.exit_code(), exit_code::NOT_FOUND);
        assert!(err.to_string().contains("r-9"));
    }

    #[test]
    fn auth_and_connection_codes() {
        let auth: CliError = CoreError::AuthenticationFailed {
            message: "AADSTS7000215".into(),
        }
        .into();
        assert_eq!(auth.exit_code(), exit_code::AUTH);

        let conn: CliError = CoreError::ConnectionFailed {
            url: "https://api.example".into(),
            reason: "refused".into(),
        }
        .into();
        assert_eq!(conn.exit_code(), exit_code::CONNECTION);
    }
}
