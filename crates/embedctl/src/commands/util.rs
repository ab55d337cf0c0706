//! Shared helpers for command handlers: driving the session to the tier a
//! command needs, progress spinners, and display-setting resolution.

use std::io::IsTerminal;
use std::sync::Arc;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use embedctl_core::{
    DisplaySettings, EmbedController, ReportId, SessionState, SessionStatus, Theme, WorkspaceId,
};

use crate::cli::{DisplayArgs, GlobalOpts, SelectionArgs, ThemeArg};
use crate::error::CliError;

use super::Context;

/// How far down the workspace -> report -> configuration chain a command
/// needs the session to get.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Depth {
    Workspaces,
    Reports,
    Configuration,
}

/// Spinner on stderr, hidden when quiet or not attached to a terminal.
pub fn spinner(global: &GlobalOpts, message: &'static str) -> ProgressBar {
    if global.quiet || !std::io::stderr().is_terminal() {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
        bar.set_style(style);
    }
    bar.set_message(message);
    bar.enable_steady_tick(Duration::from_millis(80));
    bar
}

fn status_message(status: SessionStatus) -> &'static str {
    match status {
        SessionStatus::LoadingWorkspaces => "Loading workspaces...",
        SessionStatus::LoadingReports => "Loading reports...",
        SessionStatus::LoadingConfiguration => "Issuing embed configuration...",
        SessionStatus::Idle | SessionStatus::Ready | SessionStatus::Failed => "Working...",
    }
}

/// Wait for the first published snapshot satisfying `done`.
pub async fn wait_until(
    controller: &EmbedController,
    progress: &ProgressBar,
    done: impl Fn(&SessionState) -> bool,
) -> Result<Arc<SessionState>, CliError> {
    let mut stream = controller.subscribe();
    let mut snap = stream.latest();
    loop {
        if done(&snap) {
            return Ok(snap);
        }
        progress.set_message(status_message(snap.status));
        snap = stream.changed().await.ok_or(CliError::SessionClosed)?;
    }
}

/// The recorded failure of a `Failed` snapshot, as a CLI error.
pub fn failure(state: &SessionState) -> Option<CliError> {
    if state.status != SessionStatus::Failed {
        return None;
    }
    Some(state.last_error.as_ref().map_or(CliError::SessionClosed, |record| {
        record.error.clone().into()
    }))
}

fn check(state: Arc<SessionState>) -> Result<Arc<SessionState>, CliError> {
    match failure(&state) {
        Some(err) => Err(err),
        None => Ok(state),
    }
}

/// Initialize the session and steer it to `depth`, switching to the
/// requested workspace and report as their tiers load. Unset selections
/// fall back to the profile's, then to whatever the session auto-selected.
pub async fn drive(
    ctx: &Context,
    global: &GlobalOpts,
    selection: &SelectionArgs,
    depth: Depth,
) -> Result<Arc<SessionState>, CliError> {
    let controller = &ctx.controller;
    let progress = spinner(global, "Loading workspaces...");
    let result = drive_inner(ctx, controller, selection, depth, &progress).await;
    progress.finish_and_clear();
    result
}

async fn drive_inner(
    ctx: &Context,
    controller: &EmbedController,
    selection: &SelectionArgs,
    depth: Depth,
    progress: &ProgressBar,
) -> Result<Arc<SessionState>, CliError> {
    controller.initialize().await?;
    let state = check(
        wait_until(controller, progress, |s| {
            s.status != SessionStatus::LoadingWorkspaces
        })
        .await?,
    )?;
    if state.available_workspaces.is_empty() {
        return Err(CliError::NothingAvailable {
            resource_type: "workspace".into(),
            hint: "The configured identity has no workspaces. Grant it access to one first.".into(),
        });
    }
    if depth == Depth::Workspaces {
        return Ok(state);
    }

    let workspace = selection
        .workspace
        .clone()
        .or_else(|| ctx.default_workspace.clone());
    if let Some(ws) = workspace {
        controller.select_workspace(ws).await?;
    }
    let state = check(
        wait_until(controller, progress, |s| {
            !matches!(
                s.status,
                SessionStatus::LoadingWorkspaces | SessionStatus::LoadingReports
            )
        })
        .await?,
    )?;
    if depth == Depth::Reports {
        return Ok(state);
    }
    if state.available_reports.is_empty() {
        let ws = state
            .selected_workspace_id
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default();
        return Err(CliError::NothingAvailable {
            resource_type: "report".into(),
            hint: format!("Workspace '{ws}' has no reports. Pick another with --workspace."),
        });
    }

    let report = selection.report.clone().or_else(|| {
        // The profile's report only applies to the profile's workspace.
        if selection.workspace.is_none() {
            ctx.default_report.clone()
        } else {
            None
        }
    });
    if let Some(r) = report {
        controller.select_report(r).await?;
    }
    let state = check(wait_until(controller, progress, |s| !s.status.is_loading()).await?)?;
    if state.active_configuration.is_none() {
        return Err(CliError::NothingAvailable {
            resource_type: "embed configuration".into(),
            hint: "Select a report with --report.".into(),
        });
    }
    Ok(state)
}

/// Workspace for commands outside the session chain: the flag, the
/// profile's, or the first one the identity can see.
pub async fn resolve_workspace(
    ctx: &Context,
    global: &GlobalOpts,
    flag: Option<String>,
) -> Result<WorkspaceId, CliError> {
    if let Some(ws) = flag.or_else(|| ctx.default_workspace.clone()) {
        return Ok(WorkspaceId::new(ws));
    }
    let state = drive(ctx, global, &SelectionArgs::default(), Depth::Workspaces).await?;
    state
        .available_workspaces
        .first()
        .map(|w| w.id.clone())
        .ok_or_else(|| CliError::NothingAvailable {
            resource_type: "workspace".into(),
            hint: "Pass --workspace explicitly.".into(),
        })
}

/// Workspace and report for read-only report lookups. Flags and profile
/// defaults are used as given; anything missing comes from the session.
pub async fn resolve_report(
    ctx: &Context,
    global: &GlobalOpts,
    selection: &SelectionArgs,
) -> Result<(WorkspaceId, ReportId), CliError> {
    let workspace = selection
        .workspace
        .clone()
        .or_else(|| ctx.default_workspace.clone());
    let report = selection.report.clone().or_else(|| {
        if selection.workspace.is_none() {
            ctx.default_report.clone()
        } else {
            None
        }
    });
    if let (Some(ws), Some(r)) = (&workspace, &report) {
        return Ok((WorkspaceId::new(ws.as_str()), ReportId::new(r.as_str())));
    }

    let state = drive(ctx, global, selection, Depth::Reports).await?;
    let ws = state
        .selected_workspace_id
        .clone()
        .ok_or_else(|| CliError::NothingAvailable {
            resource_type: "workspace".into(),
            hint: "Pass --workspace explicitly.".into(),
        })?;
    let r = match report {
        Some(r) => ReportId::new(r),
        None => state
            .available_reports
            .first()
            .map(|r| r.id.clone())
            .ok_or_else(|| CliError::NothingAvailable {
                resource_type: "report".into(),
                hint: format!("Workspace '{ws}' has no reports. Pick another with --workspace."),
            })?,
    };
    Ok((ws, r))
}

/// Display settings from CLI flags layered over the session's current ones.
pub fn display_settings(base: &DisplaySettings, args: &DisplayArgs) -> DisplaySettings {
    DisplaySettings {
        theme: args.theme.map_or(base.theme, theme_from_arg),
        filter_pane_enabled: base.filter_pane_enabled && !args.hide_filter_pane,
        navigation_enabled: base.navigation_enabled && !args.hide_navigation,
    }
}

fn theme_from_arg(arg: ThemeArg) -> Theme {
    match arg {
        ThemeArg::Light => Theme::Light,
        ThemeArg::Dark => Theme::Dark,
        ThemeArg::HighContrast => Theme::HighContrast,
    }
}

/// Apply display flags before the session is driven, so the first
/// configuration is already issued with them.
pub async fn apply_display(ctx: &Context, args: &DisplayArgs) -> Result<(), CliError> {
    let current = ctx.controller.snapshot().settings.clone();
    let wanted = display_settings(&current, args);
    if wanted != current {
        ctx.controller.update_settings(wanted).await?;
    }
    Ok(())
}

/// `1h 2m 3s` style rendering, truncated to whole seconds.
pub fn human_duration(d: Duration) -> String {
    humantime::format_duration(Duration::from_secs(d.as_secs())).to_string()
}
