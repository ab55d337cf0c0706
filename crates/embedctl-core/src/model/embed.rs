// ── Embed configuration ──
//
// A short-lived, settings-bound credential bundle for one report. Produced
// whole by the token service and replaced whole on any input change.

use chrono::{DateTime, TimeDelta, Utc};
use secrecy::{ExposeSecret, SecretString};
use url::Url;

use super::ids::{ReportId, WorkspaceId};
use crate::error::CoreError;

/// Report name used when the report lookup yields nothing.
pub const DEFAULT_REPORT_NAME: &str = "Unknown Report";
/// Report type used when the report lookup yields nothing.
pub const DEFAULT_REPORT_TYPE: &str = "Report";

/// Query parameter carrying the access token in an embed locator.
const TOKEN_PARAM: &str = "accessToken";

#[derive(Debug, Clone)]
pub struct EmbedConfiguration {
    pub workspace_id: WorkspaceId,
    pub report_id: ReportId,
    /// Frame URL with the display settings already bound in.
    pub display_url: Url,
    pub access_token: SecretString,
    pub token_id: Option<String>,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub report_name: String,
    pub report_type: String,
}

impl EmbedConfiguration {
    /// Reject configurations whose expiry does not come after issue time.
    pub fn check_lifetime(&self) -> Result<(), CoreError> {
        if self.expires_at > self.issued_at {
            Ok(())
        } else {
            Err(CoreError::InvalidResponse {
                message: format!(
                    "embed token for report {} expires at {} which is not after its issue time {}",
                    self.report_id, self.expires_at, self.issued_at
                ),
            })
        }
    }

    /// `true` iff `now` is strictly before `expires_at`.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }

    /// Time left before expiry, or `None` once expired.
    pub fn remaining_at(&self, now: DateTime<Utc>) -> Option<std::time::Duration> {
        (self.expires_at - now).to_std().ok().filter(|d| !d.is_zero())
    }

    pub fn lifetime(&self) -> TimeDelta {
        self.expires_at - self.issued_at
    }

    /// Whether this configuration was issued for exactly this selection.
    pub fn matches(
        &self,
        workspace_id: Option<&WorkspaceId>,
        report_id: Option<&ReportId>,
    ) -> bool {
        workspace_id == Some(&self.workspace_id) && report_id == Some(&self.report_id)
    }

    /// The single resource locator handed to an embedding frame: the display
    /// URL with the access token appended. Treat the result as a secret.
    pub fn embed_locator(&self) -> Url {
        let mut url = self.display_url.clone();
        url.query_pairs_mut()
            .append_pair(TOKEN_PARAM, self.access_token.expose_secret());
        url
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn config(lifetime_secs: i64) -> EmbedConfiguration {
        let issued_at = Utc::now();
        EmbedConfiguration {
            workspace_id: "ws-1".into(),
            report_id: "r-1".into(),
            display_url: Url::parse("https://app.example/reportEmbed?reportId=r-1&groupId=ws-1")
                .unwrap(),
            access_token: SecretString::from("tok+en/=".to_string()),
            token_id: None,
            issued_at,
            expires_at: issued_at + TimeDelta::seconds(lifetime_secs),
            report_name: DEFAULT_REPORT_NAME.into(),
            report_type: DEFAULT_REPORT_TYPE.into(),
        }
    }

    #[test]
    fn lifetime_must_be_positive() {
        assert!(config(3600).check_lifetime().is_ok());
        assert!(matches!(
            config(0).check_lifetime(),
            Err(CoreError::InvalidResponse { .. })
        ));
        assert!(config(-5).check_lifetime().is_err());
    }

    #[test]
    fn valid_strictly_before_expiry() {
        let cfg = config(10);
        assert!(cfg.is_valid_at(cfg.issued_at));
        assert!(!cfg.is_valid_at(cfg.expires_at));
        assert!(cfg.remaining_at(cfg.expires_at).is_none());
        assert_eq!(
            cfg.remaining_at(cfg.issued_at),
            Some(std::time::Duration::from_secs(10))
        );
    }

    #[test]
    fn locator_appends_encoded_token() {
        let locator = config(60).embed_locator();
        let pairs: Vec<(String, String)> = locator.query_pairs().into_owned().collect();
        assert_eq!(pairs[0], ("reportId".into(), "r-1".into()));
        assert_eq!(pairs[2], ("accessToken".into(), "tok+en/=".into()));
        assert!(locator.as_str().contains("accessToken=tok%2Ben%2F%3D"));
    }

    #[test]
    fn matches_requires_both_ids() {
        let cfg = config(60);
        let ws = WorkspaceId::from("ws-1");
        let r = ReportId::from("r-1");
        assert!(cfg.matches(Some(&ws), Some(&r)));
        assert!(!cfg.matches(Some(&ws), None));
        assert!(!cfg.matches(None, Some(&r)));
        assert!(!cfg.matches(Some(&ws), Some(&ReportId::from("r-2"))));
    }
}
