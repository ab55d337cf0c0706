// Wire types for the catalog service.
//
// Field names follow the service's camelCase JSON. Optional fields default
// so older service versions that omit them still decode.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The `{ "value": [...] }` envelope every list endpoint returns.
#[derive(Debug, Clone, Deserialize)]
pub struct ValueList<T> {
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
}

// ── Workspaces & reports ─────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceResponse {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub is_read_only: bool,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportResponse {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub report_type: Option<String>,
    #[serde(default)]
    pub embed_url: Option<String>,
    #[serde(default)]
    pub web_url: Option<String>,
    #[serde(default)]
    pub dataset_id: Option<String>,
}

// ── Embed tokens ─────────────────────────────────────────────────────

/// Row-level-security identity the token is issued for.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectiveIdentity {
    pub username: String,
    pub roles: Vec<String>,
    pub datasets: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateTokenRequest {
    pub access_level: String,
    pub allow_save_as: bool,
    pub identities: Vec<EffectiveIdentity>,
}

impl GenerateTokenRequest {
    /// Read-only token, optionally bound to one effective identity.
    pub fn view(identity: Option<EffectiveIdentity>) -> Self {
        Self {
            access_level: "View".into(),
            allow_save_as: false,
            identities: identity.into_iter().collect(),
        }
    }
}

#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateTokenResponse {
    pub token: String,
    #[serde(default)]
    pub token_id: Option<Uuid>,
    pub expiration: DateTime<Utc>,
}

impl fmt::Debug for GenerateTokenResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerateTokenResponse")
            .field("token", &"[REDACTED]")
            .field("token_id", &self.token_id)
            .field("expiration", &self.expiration)
            .finish()
    }
}

// ── Datasets ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetResponse {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub configured_by: Option<String>,
    #[serde(default)]
    pub is_refreshable: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    #[serde(default)]
    pub request_id: Option<String>,
    #[serde(default)]
    pub refresh_type: Option<String>,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    pub status: String,
}

/// One page (tab) of a report.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResponse {
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub order: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterResponse {
    pub name: String,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub is_required: Option<bool>,
    #[serde(default)]
    pub current_value: Option<String>,
}

// ── Errors ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn view_request_serializes_camel_case() {
        let req = GenerateTokenRequest::view(Some(EffectiveIdentity {
            username: "ana@example.com".into(),
            roles: vec!["Viewer".into()],
            datasets: vec!["ds-1".into()],
        }));
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["accessLevel"], "View");
        assert_eq!(json["allowSaveAs"], false);
        assert_eq!(json["identities"][0]["username"], "ana@example.com");
    }

    #[test]
    fn view_request_without_identity_sends_empty_list() {
        let json = serde_json::to_value(GenerateTokenRequest::view(None)).unwrap();
        assert_eq!(json["identities"], serde_json::json!([]));
    }

    #[test]
    fn token_debug_is_redacted() {
        let resp: GenerateTokenResponse = serde_json::from_str(
            r#"{"token":"H4sI-secret","expiration":"2030-01-01T00:00:00Z"}"#,
        )
        .unwrap();
        let rendered = format!("{resp:?}");
        assert!(!rendered.contains("H4sI-secret"));
        assert!(resp.token_id.is_none());
    }
}
