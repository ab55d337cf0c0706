use chrono::{DateTime, Utc};
use serde::Serialize;

/// Snapshot of the service connection: which identity is configured and
/// whether it can currently authenticate.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceStatus {
    pub service_url: String,
    pub auth_mode: &'static str,
    pub tenant_id: Option<String>,
    pub client_id: Option<String>,
    pub authenticated: bool,
    pub token_expires_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

impl ServiceStatus {
    /// Short machine-friendly label: `ready` or `not_authenticated`.
    pub fn label(&self) -> &'static str {
        if self.authenticated {
            "ready"
        } else {
            "not_authenticated"
        }
    }
}
