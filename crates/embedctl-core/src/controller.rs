// ── Cascade controller ──
//
// Single-writer actor owning the session state. Commands arrive over an mpsc
// channel and mutate state synchronously; remote fetches run as spawned tasks
// and report back over a second channel. Every fetch carries a stamp (a
// per-tier sequence number plus the selection it was issued for). A result is
// applied only if its sequence number is still the tier's pending ticket and
// the selection still matches; anything else was superseded and is dropped.
// Arrival order never decides freshness.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, mpsc, oneshot, watch};
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::client::ResourceClient;
use crate::config::SessionOptions;
use crate::error::{CoreError, ErrorRecord, SessionError};
use crate::expiry::{ExpiryMonitor, ExpiryStatus};
use crate::model::{DisplaySettings, EmbedConfiguration, Report, ReportId, Workspace, WorkspaceId};
use crate::session::{SessionState, SessionStatus};
use crate::stream::SessionStream;

const COMMAND_CHANNEL_SIZE: usize = 64;

// ── Commands ─────────────────────────────────────────────────────

#[derive(Debug)]
enum Command {
    Initialize,
    SelectWorkspace(WorkspaceId),
    SelectReport(ReportId),
    UpdateSettings(DisplaySettings),
    Refresh,
    Retry,
}

struct CommandEnvelope {
    command: Command,
    response_tx: oneshot::Sender<Result<(), SessionError>>,
}

// ── EmbedController ──────────────────────────────────────────────

/// Handle to one embed session.
///
/// Cheaply cloneable via `Arc<ControllerInner>`. Commands return as soon as
/// the actor has applied their synchronous effect (selection changes, status
/// transitions, fetches issued); use [`settled()`](Self::settled) or
/// [`subscribe()`](Self::subscribe) to observe fetch completion.
#[derive(Clone)]
pub struct EmbedController {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    state_rx: watch::Receiver<Arc<SessionState>>,
    command_tx: mpsc::Sender<CommandEnvelope>,
    cancel: CancellationToken,
    monitor: ExpiryMonitor,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for ControllerInner {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl EmbedController {
    /// Spawn the session actor. Must be called within a Tokio runtime.
    pub fn new(client: Arc<dyn ResourceClient>, options: SessionOptions) -> Self {
        let state = SessionState::new(options.settings);
        let (state_tx, state_rx) = watch::channel(Arc::new(state.clone()));
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_SIZE);
        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        let actor = SessionActor {
            client,
            state,
            state_tx,
            outcome_tx,
            cancel: cancel.clone(),
            fetch_timeout: options.fetch_timeout,
            next_seq: 0,
            settings_version: 0,
            pending: Pending::default(),
            dirty: false,
        };
        let handle = tokio::spawn(actor.run(command_rx, outcome_rx));

        Self {
            inner: Arc::new(ControllerInner {
                state_rx,
                command_tx,
                cancel,
                monitor: ExpiryMonitor::new(options.expiry_lead),
                task: Mutex::new(Some(handle)),
            }),
        }
    }

    // ── Commands ─────────────────────────────────────────────────

    /// Reset the session and fetch the workspace list. The first workspace
    /// is auto-selected, cascading into its reports and their first report.
    pub async fn initialize(&self) -> Result<(), SessionError> {
        self.send(Command::Initialize).await
    }

    /// Switch workspace. Clears the report selection and configuration, then
    /// fetches the workspace's reports. No-op if already selected.
    pub async fn select_workspace(&self, id: impl Into<WorkspaceId>) -> Result<(), SessionError> {
        self.send(Command::SelectWorkspace(id.into())).await
    }

    /// Switch report and request a configuration for it. Fails with
    /// [`SessionError::InvalidSelection`] (state untouched) for ids not among
    /// the available reports. No-op if already selected.
    pub async fn select_report(&self, id: impl Into<ReportId>) -> Result<(), SessionError> {
        self.send(Command::SelectReport(id.into())).await
    }

    /// Replace the display settings. A changed value invalidates and
    /// regenerates the configuration of the selected report.
    pub async fn update_settings(&self, settings: DisplaySettings) -> Result<(), SessionError> {
        self.send(Command::UpdateSettings(settings)).await
    }

    /// Re-issue the configuration for the current selection. The current
    /// configuration stays visible until its replacement arrives.
    pub async fn refresh(&self) -> Result<(), SessionError> {
        self.send(Command::Refresh).await
    }

    /// Re-attempt whichever fetch last failed, with the inputs it failed on.
    pub async fn retry(&self) -> Result<(), SessionError> {
        self.send(Command::Retry).await
    }

    async fn send(&self, command: Command) -> Result<(), SessionError> {
        let (tx, rx) = oneshot::channel();
        self.inner
            .command_tx
            .send(CommandEnvelope {
                command,
                response_tx: tx,
            })
            .await
            .map_err(|_| SessionError::SessionClosed)?;
        rx.await.map_err(|_| SessionError::SessionClosed)?
    }

    // ── State observation ────────────────────────────────────────

    /// The latest published snapshot.
    pub fn snapshot(&self) -> Arc<SessionState> {
        self.inner.state_rx.borrow().clone()
    }

    pub fn subscribe(&self) -> SessionStream {
        SessionStream::new(self.inner.state_rx.clone())
    }

    /// Wait until no fetch is in flight and return that snapshot.
    pub async fn settled(&self) -> Result<Arc<SessionState>, SessionError> {
        let mut rx = self.inner.state_rx.clone();
        let state = rx
            .wait_for(|s| !s.status.is_loading())
            .await
            .map_err(|_| SessionError::SessionClosed)?;
        Ok(Arc::clone(&*state))
    }

    pub fn expiry_monitor(&self) -> ExpiryMonitor {
        self.inner.monitor
    }

    /// Expiry status of the active configuration, if there is one.
    pub fn expiry_status(&self) -> Option<ExpiryStatus> {
        self.expiry_status_at(Utc::now())
    }

    pub fn expiry_status_at(&self, now: DateTime<Utc>) -> Option<ExpiryStatus> {
        let snapshot = self.snapshot();
        snapshot
            .active_configuration
            .as_ref()
            .map(|config| self.inner.monitor.status_at(config, now))
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Stop the actor and abandon in-flight fetches. Later commands fail
    /// with [`SessionError::SessionClosed`].
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();
        let handle = self.inner.task.lock().await.take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
        debug!("session controller shut down");
    }
}

// ── Fetch bookkeeping ────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tier {
    Workspaces,
    Reports,
    Configuration,
}

/// The selection a fetch was issued for.
#[derive(Debug, Clone)]
struct Stamp {
    seq: u64,
    workspace_id: Option<WorkspaceId>,
    report_id: Option<ReportId>,
    settings_version: u64,
}

/// Ticket of the one fetch per tier whose result may still be applied.
#[derive(Debug, Default)]
struct Pending {
    workspaces: Option<u64>,
    reports: Option<u64>,
    configuration: Option<u64>,
}

impl Pending {
    fn get(&self, tier: Tier) -> Option<u64> {
        match tier {
            Tier::Workspaces => self.workspaces,
            Tier::Reports => self.reports,
            Tier::Configuration => self.configuration,
        }
    }

    fn slot(&mut self, tier: Tier) -> &mut Option<u64> {
        match tier {
            Tier::Workspaces => &mut self.workspaces,
            Tier::Reports => &mut self.reports,
            Tier::Configuration => &mut self.configuration,
        }
    }
}

enum Fetched {
    Workspaces(Result<Vec<Workspace>, CoreError>),
    Reports(Result<Vec<Report>, CoreError>),
    Configuration(Result<EmbedConfiguration, CoreError>),
}

impl Fetched {
    fn tier(&self) -> Tier {
        match self {
            Self::Workspaces(_) => Tier::Workspaces,
            Self::Reports(_) => Tier::Reports,
            Self::Configuration(_) => Tier::Configuration,
        }
    }
}

struct FetchOutcome {
    stamp: Stamp,
    fetched: Fetched,
}

/// Bound a fetch by the configured window; overrunning counts as a failure
/// of that fetch.
/// Run `fetch` as a child task bounded by `limit`. A panic inside the client
/// surfaces as [`CoreError::Internal`] instead of losing the outcome.
async fn bounded<T>(
    limit: Duration,
    fetch: impl Future<Output = Result<T, CoreError>> + Send + 'static,
) -> Result<T, CoreError>
where
    T: Send + 'static,
{
    let mut child = AbortOnDrop(tokio::spawn(fetch));
    match tokio::time::timeout(limit, &mut child.0).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_err)) => Err(join_failure(join_err)),
        Err(_elapsed) => Err(CoreError::Timeout {
            timeout_secs: limit.as_secs(),
        }),
    }
}

/// Aborts the child fetch when the waiting side goes away (timeout, shutdown).
struct AbortOnDrop<T>(JoinHandle<T>);

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

fn join_failure(err: JoinError) -> CoreError {
    if !err.is_panic() {
        return CoreError::Internal("fetch task was cancelled".into());
    }
    let payload = err.into_panic();
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".into());
    warn!(%message, "fetch task panicked");
    CoreError::Internal(format!("fetch panicked: {message}"))
}

// ── Session actor ────────────────────────────────────────────────

struct SessionActor {
    client: Arc<dyn ResourceClient>,
    state: SessionState,
    state_tx: watch::Sender<Arc<SessionState>>,
    outcome_tx: mpsc::UnboundedSender<FetchOutcome>,
    cancel: CancellationToken,
    fetch_timeout: Duration,
    next_seq: u64,
    settings_version: u64,
    pending: Pending,
    dirty: bool,
}

impl SessionActor {
    async fn run(
        mut self,
        mut commands: mpsc::Receiver<CommandEnvelope>,
        mut outcomes: mpsc::UnboundedReceiver<FetchOutcome>,
    ) {
        let cancel = self.cancel.clone();

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                Some(outcome) = outcomes.recv() => {
                    self.apply(outcome);
                    self.publish();
                }
                envelope = commands.recv() => {
                    let Some(envelope) = envelope else { break };
                    let result = self.handle(envelope.command);
                    self.publish();
                    let _ = envelope.response_tx.send(result);
                }
            }
        }
        debug!("session actor stopped");
    }

    fn publish(&mut self) {
        if !std::mem::take(&mut self.dirty) {
            return;
        }
        let verdict = self.state.check_invariants();
        debug_assert!(verdict.is_ok(), "session invariant violated: {verdict:?}");
        self.state_tx.send_replace(Arc::new(self.state.clone()));
    }

    // ── Command handling ─────────────────────────────────────────

    fn handle(&mut self, command: Command) -> Result<(), SessionError> {
        debug!(?command, "session command");
        match command {
            Command::SelectWorkspace(id) => self.select_workspace(id),
            Command::SelectReport(id) => self.select_report(id),
            Command::Initialize => {
                self.initialize();
                Ok(())
            }
            Command::UpdateSettings(settings) => {
                self.update_settings(settings);
                Ok(())
            }
            Command::Refresh => {
                self.refresh();
                Ok(())
            }
            Command::Retry => {
                self.retry();
                Ok(())
            }
        }
    }

    fn initialize(&mut self) {
        self.pending = Pending::default();
        let state = &mut self.state;
        state.selected_workspace_id = None;
        state.selected_report_id = None;
        state.available_workspaces.clear();
        state.available_reports.clear();
        state.active_configuration = None;
        state.last_error = None;
        state.status = SessionStatus::LoadingWorkspaces;
        self.dirty = true;
        self.fetch_workspaces();
    }

    fn select_workspace(&mut self, id: WorkspaceId) -> Result<(), SessionError> {
        if self.state.selected_workspace_id.as_ref() == Some(&id) {
            debug!(workspace_id = %id, "workspace already selected");
            return Ok(());
        }
        if !self.state.available_workspaces.iter().any(|w| w.id == id) {
            return Err(SessionError::InvalidSelection {
                workspace_id: Some(id),
                report_id: None,
            });
        }
        self.enter_workspace(id);
        Ok(())
    }

    fn select_report(&mut self, id: ReportId) -> Result<(), SessionError> {
        if self.state.selected_report_id.as_ref() == Some(&id) {
            debug!(report_id = %id, "report already selected");
            return Ok(());
        }
        if !self.state.available_reports.iter().any(|r| r.id == id) {
            return Err(SessionError::InvalidSelection {
                workspace_id: self.state.selected_workspace_id.clone(),
                report_id: Some(id),
            });
        }
        self.enter_report(id);
        Ok(())
    }

    fn update_settings(&mut self, settings: DisplaySettings) {
        if self.state.settings == settings {
            return;
        }
        self.state.settings = settings;
        self.settings_version += 1;
        self.dirty = true;
        if self.state.selected_report_id.is_some() {
            self.state.active_configuration = None;
            self.begin_configuration();
        }
    }

    fn refresh(&mut self) {
        if self.state.selected_report_id.is_none() {
            debug!("refresh ignored: no report selected");
            return;
        }
        self.begin_configuration();
    }

    fn retry(&mut self) {
        let Some(record) = self.state.last_error.clone() else {
            debug!("retry ignored: nothing failed");
            return;
        };
        match record.error {
            SessionError::WorkspaceFetch { .. } => {
                self.state.last_error = None;
                self.state.status = SessionStatus::LoadingWorkspaces;
                self.dirty = true;
                self.fetch_workspaces();
            }
            SessionError::ReportFetch { workspace_id, .. } => {
                if self.state.selected_workspace_id.as_ref() == Some(&workspace_id) {
                    self.state.last_error = None;
                    self.state.status = SessionStatus::LoadingReports;
                    self.dirty = true;
                    self.fetch_reports(workspace_id);
                }
            }
            SessionError::EmbedConfig {
                workspace_id,
                report_id,
                ..
            } => {
                if self.state.selected_workspace_id.as_ref() == Some(&workspace_id)
                    && self.state.selected_report_id.as_ref() == Some(&report_id)
                {
                    self.begin_configuration();
                }
            }
            SessionError::InvalidSelection { .. } | SessionError::SessionClosed => {}
        }
    }

    // ── Tier transitions ─────────────────────────────────────────

    fn enter_workspace(&mut self, id: WorkspaceId) {
        self.pending.configuration = None;
        let state = &mut self.state;
        state.selected_workspace_id = Some(id.clone());
        state.selected_report_id = None;
        state.available_reports.clear();
        state.active_configuration = None;
        state.last_error = None;
        state.status = SessionStatus::LoadingReports;
        self.dirty = true;
        self.fetch_reports(id);
    }

    fn enter_report(&mut self, id: ReportId) {
        self.state.selected_report_id = Some(id);
        self.state.active_configuration = None;
        self.begin_configuration();
    }

    fn begin_configuration(&mut self) {
        let (Some(workspace_id), Some(report_id)) = (
            self.state.selected_workspace_id.clone(),
            self.state.selected_report_id.clone(),
        ) else {
            return;
        };
        self.state.last_error = None;
        self.state.status = SessionStatus::LoadingConfiguration;
        self.dirty = true;
        self.fetch_configuration(workspace_id, report_id);
    }

    fn fail(&mut self, error: SessionError) {
        self.state.status = SessionStatus::Failed;
        self.state.last_error = Some(ErrorRecord::now(error));
    }

    // ── Fetch issue ──────────────────────────────────────────────

    fn stamp(&mut self, tier: Tier) -> Stamp {
        self.next_seq += 1;
        *self.pending.slot(tier) = Some(self.next_seq);
        Stamp {
            seq: self.next_seq,
            workspace_id: self.state.selected_workspace_id.clone(),
            report_id: self.state.selected_report_id.clone(),
            settings_version: self.settings_version,
        }
    }

    fn spawn_fetch(&self, stamp: Stamp, fetch: impl Future<Output = Fetched> + Send + 'static) {
        let outcome_tx = self.outcome_tx.clone();
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            tokio::select! {
                () = cancel.cancelled() => {}
                fetched = fetch => {
                    let _ = outcome_tx.send(FetchOutcome { stamp, fetched });
                }
            }
        });
    }

    fn fetch_workspaces(&mut self) {
        let stamp = self.stamp(Tier::Workspaces);
        debug!(seq = stamp.seq, "fetching workspaces");
        let client = Arc::clone(&self.client);
        let limit = self.fetch_timeout;
        self.spawn_fetch(stamp, async move {
            Fetched::Workspaces(
                bounded(limit, async move { client.list_workspaces().await }).await,
            )
        });
    }

    fn fetch_reports(&mut self, workspace_id: WorkspaceId) {
        let stamp = self.stamp(Tier::Reports);
        debug!(seq = stamp.seq, %workspace_id, "fetching reports");
        let client = Arc::clone(&self.client);
        let limit = self.fetch_timeout;
        self.spawn_fetch(stamp, async move {
            Fetched::Reports(
                bounded(limit, async move { client.list_reports(&workspace_id).await }).await,
            )
        });
    }

    fn fetch_configuration(&mut self, workspace_id: WorkspaceId, report_id: ReportId) {
        let stamp = self.stamp(Tier::Configuration);
        debug!(
            seq = stamp.seq,
            %workspace_id,
            %report_id,
            settings_version = stamp.settings_version,
            "fetching embed configuration"
        );
        let client = Arc::clone(&self.client);
        let limit = self.fetch_timeout;
        let settings = self.state.settings.clone();
        self.spawn_fetch(stamp, async move {
            Fetched::Configuration(
                bounded(limit, async move {
                    client
                        .issue_embed_configuration(&workspace_id, &report_id, &settings)
                        .await
                })
                .await,
            )
        });
    }

    // ── Fetch apply ──────────────────────────────────────────────

    fn is_current(&self, tier: Tier, stamp: &Stamp) -> bool {
        if self.pending.get(tier) != Some(stamp.seq) {
            return false;
        }
        let state = &self.state;
        match tier {
            Tier::Workspaces => true,
            Tier::Reports => {
                stamp.workspace_id.is_some() && stamp.workspace_id == state.selected_workspace_id
            }
            Tier::Configuration => {
                stamp.report_id.is_some()
                    && stamp.workspace_id == state.selected_workspace_id
                    && stamp.report_id == state.selected_report_id
                    && stamp.settings_version == self.settings_version
            }
        }
    }

    fn apply(&mut self, outcome: FetchOutcome) {
        let FetchOutcome { stamp, fetched } = outcome;
        let tier = fetched.tier();
        if !self.is_current(tier, &stamp) {
            debug!(seq = stamp.seq, ?tier, "discarding superseded fetch result");
            return;
        }
        *self.pending.slot(tier) = None;
        self.dirty = true;

        match fetched {
            Fetched::Workspaces(result) => self.apply_workspaces(result),
            Fetched::Reports(result) => self.apply_reports(stamp, result),
            Fetched::Configuration(result) => self.apply_configuration(stamp, result),
        }
    }

    fn apply_workspaces(&mut self, result: Result<Vec<Workspace>, CoreError>) {
        match result {
            Ok(workspaces) => {
                debug!(count = workspaces.len(), "workspaces loaded");
                let first = workspaces.first().map(|w| w.id.clone());
                self.state.available_workspaces = workspaces;
                match first {
                    Some(id) => self.enter_workspace(id),
                    None => self.state.status = SessionStatus::Ready,
                }
            }
            Err(source) => {
                warn!(error = %source, "workspace fetch failed");
                self.fail(SessionError::WorkspaceFetch { source });
            }
        }
    }

    fn apply_reports(&mut self, stamp: Stamp, result: Result<Vec<Report>, CoreError>) {
        let Some(workspace_id) = stamp.workspace_id else {
            return;
        };
        match result {
            Ok(mut reports) => {
                let listed = reports.len();
                reports.retain(|r| r.workspace_id == workspace_id);
                if reports.len() < listed {
                    warn!(
                        %workspace_id,
                        dropped = listed - reports.len(),
                        "dropping reports that belong to another workspace"
                    );
                }
                debug!(%workspace_id, count = reports.len(), "reports loaded");
                let first = reports.first().map(|r| r.id.clone());
                self.state.available_reports = reports;
                match first {
                    Some(id) => self.enter_report(id),
                    None => self.state.status = SessionStatus::Ready,
                }
            }
            Err(source) => {
                warn!(%workspace_id, error = %source, "report fetch failed");
                self.fail(SessionError::ReportFetch {
                    workspace_id,
                    source,
                });
            }
        }
    }

    fn apply_configuration(
        &mut self,
        stamp: Stamp,
        result: Result<EmbedConfiguration, CoreError>,
    ) {
        let (Some(workspace_id), Some(report_id)) = (stamp.workspace_id, stamp.report_id) else {
            return;
        };
        let result = result.and_then(|config| {
            if !config.matches(Some(&workspace_id), Some(&report_id)) {
                return Err(CoreError::InvalidResponse {
                    message: format!(
                        "configuration issued for {}/{} instead of {workspace_id}/{report_id}",
                        config.workspace_id, config.report_id
                    ),
                });
            }
            config.check_lifetime()?;
            Ok(config)
        });

        match result {
            Ok(config) => {
                debug!(
                    %workspace_id,
                    %report_id,
                    expires_at = %config.expires_at,
                    "embed configuration installed"
                );
                self.state.active_configuration = Some(config);
                self.state.status = SessionStatus::Ready;
            }
            Err(source) => {
                warn!(%workspace_id, %report_id, error = %source, "embed configuration failed");
                self.state.active_configuration = None;
                self.fail(SessionError::EmbedConfig {
                    workspace_id,
                    report_id,
                    source,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn bounded_turns_overrun_into_timeout() {
        let slow = async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok::<_, CoreError>(())
        };
        let result = bounded(Duration::from_secs(3), slow).await;
        assert!(matches!(result, Err(CoreError::Timeout { timeout_secs: 3 })));
    }

    #[tokio::test(start_paused = true)]
    async fn bounded_passes_results_through() {
        let fast = async { Err::<(), _>(CoreError::Internal("boom".into())) };
        let result = bounded(Duration::from_secs(3), fast).await;
        assert!(matches!(result, Err(CoreError::Internal(_))));
    }

    #[tokio::test]
    async fn bounded_turns_panic_into_internal_error() {
        let exploding = async {
            let items: Vec<u8> = Vec::new();
            Ok::<_, CoreError>(items[3])
        };
        let result = bounded(Duration::from_secs(3), exploding).await;
        match result {
            Err(CoreError::Internal(message)) => assert!(message.contains("index out of bounds")),
            other => panic!("expected an internal error, got {other:?}"),
        }
    }

    #[test]
    fn pending_slots_are_independent() {
        let mut pending = Pending::default();
        *pending.slot(Tier::Reports) = Some(4);
        assert_eq!(pending.get(Tier::Reports), Some(4));
        assert_eq!(pending.get(Tier::Configuration), None);
        assert_eq!(pending.get(Tier::Workspaces), None);
    }
}
