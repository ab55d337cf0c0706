// Shared fixtures: a `ResourceClient` whose calls are parked until the test
// answers them, so tests decide completion order explicitly.
#![allow(dead_code, clippy::unwrap_used, clippy::missing_panics_doc)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeDelta, Utc};
use secrecy::SecretString;
use tokio::sync::{mpsc, oneshot};
use url::Url;

use embedctl_core::client::compose_display_url;
use embedctl_core::{
    CoreError, DisplaySettings, EmbedConfiguration, EmbedController, Report, ReportId,
    ResourceClient, SessionOptions, Workspace, WorkspaceId,
};

pub type Responder<T> = oneshot::Sender<Result<T, CoreError>>;

#[derive(Debug)]
pub enum PendingCall {
    Workspaces(Responder<Vec<Workspace>>),
    Reports(WorkspaceId, Responder<Vec<Report>>),
    Configuration {
        workspace_id: WorkspaceId,
        report_id: ReportId,
        settings: DisplaySettings,
        respond: Responder<EmbedConfiguration>,
    },
}

pub struct ScriptedClient {
    calls: mpsc::UnboundedSender<PendingCall>,
}

async fn parked<T>(
    calls: &mpsc::UnboundedSender<PendingCall>,
    make: impl FnOnce(Responder<T>) -> PendingCall,
) -> Result<T, CoreError> {
    let (tx, rx) = oneshot::channel();
    calls
        .send(make(tx))
        .map_err(|_| CoreError::Internal("test harness gone".into()))?;
    rx.await
        .map_err(|_| CoreError::Internal("call abandoned by test".into()))?
}

#[async_trait]
impl ResourceClient for ScriptedClient {
    async fn list_workspaces(&self) -> Result<Vec<Workspace>, CoreError> {
        parked(&self.calls, PendingCall::Workspaces).await
    }

    async fn list_reports(&self, workspace_id: &WorkspaceId) -> Result<Vec<Report>, CoreError> {
        let ws = workspace_id.clone();
        parked(&self.calls, |tx| PendingCall::Reports(ws, tx)).await
    }

    async fn issue_embed_configuration(
        &self,
        workspace_id: &WorkspaceId,
        report_id: &ReportId,
        settings: &DisplaySettings,
    ) -> Result<EmbedConfiguration, CoreError> {
        let (workspace_id, report_id, settings) =
            (workspace_id.clone(), report_id.clone(), settings.clone());
        parked(&self.calls, |respond| PendingCall::Configuration {
            workspace_id,
            report_id,
            settings,
            respond,
        })
        .await
    }
}

/// Which remote step of [`FaultyClient`] panics.
#[derive(Debug, Clone, Copy)]
pub enum PanicAt {
    Workspaces,
    Configuration,
}

/// Answers immediately from a fixed catalog (`w1` / `r1`) except at one step,
/// where the call panics.
pub struct FaultyClient {
    pub panic_at: PanicAt,
}

#[async_trait]
impl ResourceClient for FaultyClient {
    async fn list_workspaces(&self) -> Result<Vec<Workspace>, CoreError> {
        if matches!(self.panic_at, PanicAt::Workspaces) {
            panic!("workspace listing blew up");
        }
        Ok(workspaces(&["w1"]))
    }

    async fn list_reports(&self, workspace_id: &WorkspaceId) -> Result<Vec<Report>, CoreError> {
        Ok(reports(workspace_id.as_str(), &["r1"]))
    }

    async fn issue_embed_configuration(
        &self,
        _workspace_id: &WorkspaceId,
        _report_id: &ReportId,
        _settings: &DisplaySettings,
    ) -> Result<EmbedConfiguration, CoreError> {
        if matches!(self.panic_at, PanicAt::Configuration) {
            panic!("token issue blew up");
        }
        Err(CoreError::Internal("unreachable in these tests".into()))
    }
}

// ── Fixtures ────────────────────────────────────────────────────────

pub fn workspaces(ids: &[&str]) -> Vec<Workspace> {
    ids.iter()
        .map(|id| Workspace::new(*id, format!("Workspace {id}")))
        .collect()
}

pub fn reports(workspace_id: &str, ids: &[&str]) -> Vec<Report> {
    ids.iter()
        .map(|id| Report::new(*id, format!("Report {id}"), workspace_id))
        .collect()
}

/// A one-hour configuration whose display URL carries the settings.
pub fn config_for(
    workspace_id: &WorkspaceId,
    report_id: &ReportId,
    settings: &DisplaySettings,
) -> EmbedConfiguration {
    let base = Url::parse("https://embed.example").unwrap();
    let issued_at = Utc::now();
    EmbedConfiguration {
        workspace_id: workspace_id.clone(),
        report_id: report_id.clone(),
        display_url: compose_display_url(&base, workspace_id, report_id, settings).unwrap(),
        access_token: SecretString::from(format!("token-{report_id}")),
        token_id: Some(format!("tid-{}", issued_at.timestamp_nanos_opt().unwrap_or_default())),
        issued_at,
        expires_at: issued_at + TimeDelta::hours(1),
        report_name: format!("Report {report_id}"),
        report_type: "PowerBIReport".into(),
    }
}

pub fn answer<T: std::fmt::Debug>(respond: Responder<T>, result: Result<T, CoreError>) {
    // The fetch may already have been abandoned; that's not a test failure.
    let _ = respond.send(result);
}

/// Let spawned fetch tasks and the session actor run to quiescence.
pub async fn settle() {
    for _ in 0..50 {
        tokio::task::yield_now().await;
    }
}

// ── Harness ─────────────────────────────────────────────────────────

pub struct Harness {
    pub controller: EmbedController,
    calls: mpsc::UnboundedReceiver<PendingCall>,
}

impl Harness {
    pub fn start() -> Self {
        Self::with_options(SessionOptions::default())
    }

    pub fn with_options(options: SessionOptions) -> Self {
        let (tx, calls) = mpsc::unbounded_channel();
        let client: Arc<dyn ResourceClient> = Arc::new(ScriptedClient { calls: tx });
        Self {
            controller: EmbedController::new(client, options),
            calls,
        }
    }

    pub async fn next_call(&mut self) -> PendingCall {
        tokio::time::timeout(Duration::from_secs(5), self.calls.recv())
            .await
            .expect("timed out waiting for a remote call")
            .expect("scripted client dropped")
    }

    /// Drain whatever calls are parked right now, without waiting.
    pub async fn drain_calls(&mut self) -> Vec<PendingCall> {
        settle().await;
        let mut parked = Vec::new();
        while let Ok(call) = self.calls.try_recv() {
            parked.push(call);
        }
        parked
    }

    pub async fn assert_no_call(&mut self) {
        settle().await;
        if let Ok(call) = self.calls.try_recv() {
            panic!("unexpected remote call: {call:?}");
        }
    }

    pub async fn expect_workspaces(&mut self) -> Responder<Vec<Workspace>> {
        match self.next_call().await {
            PendingCall::Workspaces(respond) => respond,
            other => panic!("expected a workspace fetch, got {other:?}"),
        }
    }

    pub async fn expect_reports(&mut self) -> (WorkspaceId, Responder<Vec<Report>>) {
        match self.next_call().await {
            PendingCall::Reports(ws, respond) => (ws, respond),
            other => panic!("expected a report fetch, got {other:?}"),
        }
    }

    pub async fn expect_configuration(
        &mut self,
    ) -> (
        WorkspaceId,
        ReportId,
        DisplaySettings,
        Responder<EmbedConfiguration>,
    ) {
        match self.next_call().await {
            PendingCall::Configuration {
                workspace_id,
                report_id,
                settings,
                respond,
            } => (workspace_id, report_id, settings, respond),
            other => panic!("expected a configuration fetch, got {other:?}"),
        }
    }

    /// Answer the configuration call that is expected next with a valid
    /// configuration for exactly what was asked.
    pub async fn grant_configuration(&mut self) -> (WorkspaceId, ReportId) {
        let (ws, r, settings, respond) = self.expect_configuration().await;
        answer(respond, Ok(config_for(&ws, &r, &settings)));
        (ws, r)
    }

    /// initialize → `workspace_ids` → reports `report_ids` for the first
    /// workspace → configuration for the first report → Ready.
    pub async fn ready(&mut self, workspace_ids: &[&str], report_ids: &[&str]) {
        self.controller.initialize().await.unwrap();
        answer(self.expect_workspaces().await, Ok(workspaces(workspace_ids)));
        let (ws, respond) = self.expect_reports().await;
        answer(respond, Ok(reports(ws.as_str(), report_ids)));
        self.grant_configuration().await;
        self.controller.settled().await.unwrap();
    }
}
