use thiserror::Error;

/// Top-level error type for the `embedctl-api` crate.
///
/// Covers every failure mode of the catalog and token endpoints:
/// authentication, transport, service-reported errors, and payload decoding.
/// `embedctl-core` maps these into user-facing causes.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Token acquisition failed or the service rejected the bearer token.
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The configured base URL cannot carry path segments (e.g. `mailto:`).
    #[error("Base URL cannot be used for API paths: {0}")]
    UnsupportedBaseUrl(String),

    /// Request timed out.
    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// TLS setup or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    /// Throttled by the service. Includes retry-after in seconds.
    #[error("Rate limited -- retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    // ── Service ─────────────────────────────────────────────────────
    /// Structured error from the service (`{"error": {"code", "message"}}`).
    #[error("Service error (HTTP {status}): {message}")]
    Api {
        message: String,
        code: Option<String>,
        status: u16,
    },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if this error indicates the bearer token is no longer
    /// accepted and re-authentication might resolve it.
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Self::Authentication { .. })
    }

    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Timeout { .. } | Self::RateLimited { .. } => true,
            Self::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Transport(e) => e.status() == Some(reqwest::StatusCode::NOT_FOUND),
            Self::Api { status: 404, .. } => true,
            _ => false,
        }
    }

    /// Extract the service error code, if available.
    pub fn api_error_code(&self) -> Option<&str> {
        match self {
            Self::Api { code, .. } => code.as_deref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_errors_are_transient() {
        let err = Error::Api {
            message: "boom".into(),
            code: None,
            status: 503,
        };
        assert!(err.is_transient());
        assert!(!err.is_not_found());
    }

    #[test]
    fn client_errors_are_not_transient() {
        let err = Error::Api {
            message: "missing".into(),
            code: Some("ItemNotFound".into()),
            status: 404,
        };
        assert!(!err.is_transient());
        assert!(err.is_not_found());
        assert_eq!(err.api_error_code(), Some("ItemNotFound"));
    }

    #[test]
    fn rate_limit_is_transient() {
        assert!(Error::RateLimited { retry_after_secs: 5 }.is_transient());
    }
}
