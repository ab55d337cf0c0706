// ── Session state ──
//
// The aggregate root of one embed session. Only the controller's actor
// mutates it; everyone else sees immutable `Arc<SessionState>` snapshots.

use chrono::{DateTime, Utc};
use serde::Serialize;
use strum::Display;

use crate::error::ErrorRecord;
use crate::model::{DisplaySettings, EmbedConfiguration, Report, ReportId, Workspace, WorkspaceId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Idle,
    LoadingWorkspaces,
    LoadingReports,
    LoadingConfiguration,
    Ready,
    Failed,
}

impl SessionStatus {
    pub fn is_loading(self) -> bool {
        matches!(
            self,
            Self::LoadingWorkspaces | Self::LoadingReports | Self::LoadingConfiguration
        )
    }
}

#[derive(Debug, Clone)]
pub struct SessionState {
    pub selected_workspace_id: Option<WorkspaceId>,
    pub selected_report_id: Option<ReportId>,
    pub available_workspaces: Vec<Workspace>,
    /// Scoped to `selected_workspace_id`; emptied whenever it changes.
    pub available_reports: Vec<Report>,
    pub active_configuration: Option<EmbedConfiguration>,
    pub settings: DisplaySettings,
    pub status: SessionStatus,
    pub last_error: Option<ErrorRecord>,
}

impl SessionState {
    pub fn new(settings: DisplaySettings) -> Self {
        Self {
            selected_workspace_id: None,
            selected_report_id: None,
            available_workspaces: Vec::new(),
            available_reports: Vec::new(),
            active_configuration: None,
            settings,
            status: SessionStatus::Idle,
            last_error: None,
        }
    }

    pub fn selected_workspace(&self) -> Option<&Workspace> {
        let id = self.selected_workspace_id.as_ref()?;
        self.available_workspaces.iter().find(|w| &w.id == id)
    }

    pub fn selected_report(&self) -> Option<&Report> {
        let id = self.selected_report_id.as_ref()?;
        self.available_reports.iter().find(|r| &r.id == id)
    }

    /// The active configuration, but only while it is still valid at `now`.
    /// This is what a rendering surface may be handed.
    pub fn renderable_configuration(&self, now: DateTime<Utc>) -> Option<&EmbedConfiguration> {
        self.active_configuration
            .as_ref()
            .filter(|c| c.is_valid_at(now))
    }

    /// Check the structural invariants every published snapshot upholds.
    pub fn check_invariants(&self) -> Result<(), String> {
        if let Some(ws) = &self.selected_workspace_id {
            if !self.available_workspaces.iter().any(|w| &w.id == ws) {
                return Err(format!("selected workspace {ws} is not among available workspaces"));
            }
        }

        if let Some(stray) = self
            .available_reports
            .iter()
            .find(|r| Some(&r.workspace_id) != self.selected_workspace_id.as_ref())
        {
            return Err(format!(
                "report {} belongs to workspace {}, not the selected one",
                stray.id, stray.workspace_id
            ));
        }

        if let Some(r) = &self.selected_report_id {
            if self.selected_report().is_none() {
                return Err(format!("selected report {r} is not among available reports"));
            }
        }

        if let Some(cfg) = &self.active_configuration {
            if !cfg.matches(
                self.selected_workspace_id.as_ref(),
                self.selected_report_id.as_ref(),
            ) {
                return Err(format!(
                    "configuration for {}/{} does not match the selection",
                    cfg.workspace_id, cfg.report_id
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeDelta;
    use secrecy::SecretString;
    use url::Url;

    use super::*;

    fn config_for(ws: &str, r: &str, lifetime_secs: i64) -> EmbedConfiguration {
        let issued_at = Utc::now();
        EmbedConfiguration {
            workspace_id: ws.into(),
            report_id: r.into(),
            display_url: Url::parse("https://app.example/reportEmbed").unwrap(),
            access_token: SecretString::from("t".to_string()),
            token_id: None,
            issued_at,
            expires_at: issued_at + TimeDelta::seconds(lifetime_secs),
            report_name: "Quarterly".into(),
            report_type: "PowerBIReport".into(),
        }
    }

    fn ready_state() -> SessionState {
        let mut state = SessionState::new(DisplaySettings::default());
        state.available_workspaces = vec![Workspace::new("ws-1", "Sales")];
        state.selected_workspace_id = Some("ws-1".into());
        state.available_reports = vec![Report::new("r-1", "Quarterly", "ws-1")];
        state.selected_report_id = Some("r-1".into());
        state.active_configuration = Some(config_for("ws-1", "r-1", 3600));
        state.status = SessionStatus::Ready;
        state
    }

    #[test]
    fn fresh_state_is_idle_and_consistent() {
        let state = SessionState::new(DisplaySettings::default());
        assert_eq!(state.status, SessionStatus::Idle);
        assert!(state.check_invariants().is_ok());
    }

    #[test]
    fn ready_state_is_consistent() {
        let state = ready_state();
        assert!(state.check_invariants().is_ok());
        assert_eq!(state.selected_report().unwrap().name, "Quarterly");
    }

    #[test]
    fn mismatched_configuration_is_flagged() {
        let mut state = ready_state();
        state.active_configuration = Some(config_for("ws-1", "r-2", 3600));
        assert!(state.check_invariants().is_err());
    }

    #[test]
    fn report_from_other_workspace_is_flagged() {
        let mut state = ready_state();
        state.available_reports.push(Report::new("r-9", "Other", "ws-2"));
        assert!(state.check_invariants().is_err());
    }

    #[test]
    fn expired_configuration_is_not_renderable() {
        let mut state = ready_state();
        assert!(state.renderable_configuration(Utc::now()).is_some());
        state.active_configuration = Some(config_for("ws-1", "r-1", 1));
        let later = Utc::now() + TimeDelta::seconds(5);
        assert!(state.renderable_configuration(later).is_none());
    }

    #[test]
    fn loading_statuses() {
        assert!(SessionStatus::LoadingReports.is_loading());
        assert!(!SessionStatus::Failed.is_loading());
        assert_eq!(SessionStatus::LoadingConfiguration.to_string(), "loading_configuration");
    }
}
