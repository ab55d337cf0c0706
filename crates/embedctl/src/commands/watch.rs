//! `watch`: keep a session open and report expiry transitions, optionally
//! refreshing the configuration before it lapses.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use embedctl_core::{ExpiryMonitor, ExpiryStatus, SessionState, SessionStatus};

use crate::cli::{GlobalOpts, OutputFormat, WatchArgs};
use crate::error::CliError;
use crate::output;

use super::Context;
use super::util::{self, Depth};

/// One line of watch output.
#[derive(Debug, Serialize)]
struct WatchEvent {
    at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    report_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    token_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<ExpiryStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl WatchEvent {
    fn render(&self, format: &OutputFormat, color: bool) -> String {
        match format {
            OutputFormat::Json | OutputFormat::JsonCompact => {
                serde_json::to_string(self).unwrap_or_default()
            }
            OutputFormat::Yaml => {
                format!("---\n{}", serde_yaml::to_string(self).unwrap_or_default())
            }
            OutputFormat::Table | OutputFormat::Plain => self.line(color),
        }
    }

    fn line(&self, color: bool) -> String {
        let at = self.at.format("%H:%M:%S");
        if let Some(ref error) = self.error {
            return format!("{at}  error  {error}");
        }
        let status = self
            .status
            .map(|s| output::expiry_label(s, color))
            .unwrap_or_default();
        let remaining = self
            .expires_at
            .and_then(|e| (e - self.at).to_std().ok())
            .map_or_else(|| "0s".into(), util::human_duration);
        format!(
            "{at}  {status}  report={} token={} expires_in={remaining}",
            self.report_id.as_deref().unwrap_or("-"),
            self.token_id.as_deref().unwrap_or("-"),
        )
    }
}

/// Loop bookkeeping, kept apart from the I/O so the decisions are testable.
#[derive(Debug, Default)]
struct Tracker {
    /// Last reported (issue time, status) pair.
    reported: Option<(DateTime<Utc>, ExpiryStatus)>,
    /// Issue time of the configuration a refresh was already requested for.
    refreshed_for: Option<DateTime<Utc>>,
    /// Time of the last error reported.
    error_seen: Option<DateTime<Utc>>,
    /// When the failed fetch should be retried.
    retry_due: Option<DateTime<Utc>>,
}

#[derive(Debug, PartialEq, Eq)]
enum Action {
    None,
    Refresh,
    Retry,
    Stop,
}

impl Tracker {
    /// Inspect a snapshot at `now`: what to print, and what to do.
    fn observe(
        &mut self,
        state: &SessionState,
        monitor: ExpiryMonitor,
        now: DateTime<Utc>,
        auto_refresh: bool,
        interval: Duration,
    ) -> (Option<WatchEvent>, Action) {
        if state.status == SessionStatus::Failed {
            let Some(record) = state.last_error.as_ref() else {
                return (None, Action::Stop);
            };
            let event = (self.error_seen != Some(record.at)).then(|| {
                self.error_seen = Some(record.at);
                WatchEvent {
                    at: now,
                    report_id: state.selected_report_id.as_ref().map(ToString::to_string),
                    token_id: None,
                    status: None,
                    expires_at: None,
                    error: Some(record.error.to_string()),
                }
            });
            if !auto_refresh {
                return (event, Action::Stop);
            }
            let due = *self.retry_due.get_or_insert_with(|| {
                now + chrono::TimeDelta::from_std(interval).unwrap_or(chrono::TimeDelta::zero())
            });
            if now >= due {
                self.retry_due = None;
                return (event, Action::Retry);
            }
            return (event, Action::None);
        }
        self.retry_due = None;

        let Some(config) = state.active_configuration.as_ref() else {
            return (None, Action::None);
        };
        let status = monitor.status_at(config, now);
        let key = (config.issued_at, status);
        let event = (self.reported != Some(key)).then(|| {
            self.reported = Some(key);
            WatchEvent {
                at: now,
                report_id: Some(config.report_id.to_string()),
                token_id: config.token_id.clone(),
                status: Some(status),
                expires_at: Some(config.expires_at),
                error: None,
            }
        });

        let action = if auto_refresh {
            if state.status == SessionStatus::Ready
                && status.refresh_recommended()
                && self.refreshed_for != Some(config.issued_at)
            {
                self.refreshed_for = Some(config.issued_at);
                Action::Refresh
            } else {
                Action::None
            }
        } else if status == ExpiryStatus::Expired {
            Action::Stop
        } else {
            Action::None
        };
        (event, action)
    }
}

pub async fn handle(ctx: &Context, args: WatchArgs, global: &GlobalOpts) -> Result<(), CliError> {
    util::apply_display(ctx, &args.display).await?;
    util::drive(ctx, global, &args.selection, Depth::Configuration).await?;

    let controller = &ctx.controller;
    let monitor = args.lead.map_or_else(
        || controller.expiry_monitor(),
        |secs| ExpiryMonitor::new(Duration::from_secs(secs)),
    );
    let interval = Duration::from_secs(args.interval.max(1));
    let color = output::should_color(&global.color);
    let mut stream = controller.subscribe();
    let mut tracker = Tracker::default();

    loop {
        let snap = stream.latest();
        let now = Utc::now();
        let (event, action) = tracker.observe(&snap, monitor, now, args.auto_refresh, interval);
        if let Some(event) = event {
            output::print_output(&event.render(&global.output, color), global.quiet);
        }
        match action {
            Action::None => {}
            Action::Refresh => {
                info!(report = ?snap.selected_report_id, "refreshing embed configuration");
                controller.refresh().await?;
                continue;
            }
            Action::Retry => {
                warn!("retrying failed fetch");
                controller.retry().await?;
                continue;
            }
            Action::Stop => {
                return match util::failure(&snap) {
                    Some(err) => Err(err),
                    None => Ok(()),
                };
            }
        }

        let wait = snap
            .active_configuration
            .as_ref()
            .and_then(|c| monitor.until_next_transition(c, now))
            .map_or(interval, |d| d.min(interval));

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                return Ok(());
            }
            changed = stream.changed() => {
                if changed.is_none() {
                    return Err(CliError::SessionClosed);
                }
            }
            () = tokio::time::sleep(wait) => {}
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeDelta;
    use secrecy::SecretString;
    use url::Url;

    use embedctl_core::{DisplaySettings, EmbedConfiguration, ErrorRecord, SessionError};

    use super::*;

    const LEAD: Duration = Duration::from_secs(60);
    const INTERVAL: Duration = Duration::from_secs(15);

    fn ready(issued: DateTime<Utc>, lifetime_secs: i64) -> SessionState {
        let mut state = SessionState::new(DisplaySettings::default());
        state.status = SessionStatus::Ready;
        state.selected_workspace_id = Some("ws".into());
        state.selected_report_id = Some("r".into());
        state.active_configuration = Some(EmbedConfiguration {
            workspace_id: "ws".into(),
            report_id: "r".into(),
            display_url: Url::parse("https://embed.example/reportEmbed").unwrap(),
            access_token: SecretString::from("t"),
            token_id: Some("tid".into()),
            issued_at: issued,
            expires_at: issued + TimeDelta::seconds(lifetime_secs),
            report_name: "R".into(),
            report_type: "Report".into(),
        });
        state
    }

    #[test]
    fn reports_each_transition_once() {
        let t0 = Utc::now();
        let state = ready(t0, 300);
        let monitor = ExpiryMonitor::new(LEAD);
        let mut tracker = Tracker::default();

        let (event, action) = tracker.observe(&state, monitor, t0, false, INTERVAL);
        assert_eq!(event.unwrap().status, Some(ExpiryStatus::Valid));
        assert_eq!(action, Action::None);

        let (event, _) = tracker.observe(
            &state,
            monitor,
            t0 + TimeDelta::seconds(10),
            false,
            INTERVAL,
        );
        assert!(event.is_none());

        let (event, _) = tracker.observe(
            &state,
            monitor,
            t0 + TimeDelta::seconds(250),
            false,
            INTERVAL,
        );
        assert_eq!(event.unwrap().status, Some(ExpiryStatus::NearingExpiry));
    }

    #[test]
    fn expiry_stops_without_auto_refresh() {
        let t0 = Utc::now();
        let state = ready(t0, 300);
        let mut tracker = Tracker::default();
        let (event, action) = tracker.observe(
            &state,
            ExpiryMonitor::new(LEAD),
            t0 + TimeDelta::seconds(300),
            false,
            INTERVAL,
        );
        assert_eq!(event.unwrap().status, Some(ExpiryStatus::Expired));
        assert_eq!(action, Action::Stop);
    }

    #[test]
    fn refreshes_once_per_configuration() {
        let t0 = Utc::now();
        let state = ready(t0, 300);
        let monitor = ExpiryMonitor::new(LEAD);
        let mut tracker = Tracker::default();
        let near = t0 + TimeDelta::seconds(260);

        let (_, action) = tracker.observe(&state, monitor, near, true, INTERVAL);
        assert_eq!(action, Action::Refresh);
        let (_, action) = tracker.observe(
            &state,
            monitor,
            near + TimeDelta::seconds(1),
            true,
            INTERVAL,
        );
        assert_eq!(action, Action::None);

        let renewed = ready(near, 300);
        let (_, action) = tracker.observe(
            &renewed,
            monitor,
            near + TimeDelta::seconds(2),
            true,
            INTERVAL,
        );
        assert_eq!(action, Action::None);
    }

    #[test]
    fn failures_retry_after_the_interval() {
        let t0 = Utc::now();
        let mut state = ready(t0, 300);
        state.status = SessionStatus::Failed;
        state.active_configuration = None;
        state.last_error = Some(ErrorRecord::now(SessionError::EmbedConfig {
            workspace_id: "ws".into(),
            report_id: "r".into(),
            source: embedctl_core::CoreError::Timeout { timeout_secs: 30 },
        }));
        let monitor = ExpiryMonitor::new(LEAD);
        let mut tracker = Tracker::default();

        let (event, action) = tracker.observe(&state, monitor, t0, true, INTERVAL);
        assert!(event.unwrap().error.is_some());
        assert_eq!(action, Action::None);

        let (event, action) = tracker.observe(
            &state,
            monitor,
            t0 + TimeDelta::seconds(15),
            true,
            INTERVAL,
        );
        assert!(event.is_none());
        assert_eq!(action, Action::Retry);
    }

    #[test]
    fn failures_stop_without_auto_refresh() {
        let mut state = SessionState::new(DisplaySettings::default());
        state.status = SessionStatus::Failed;
        state.last_error = Some(ErrorRecord::now(SessionError::WorkspaceFetch {
            source: embedctl_core::CoreError::Timeout { timeout_secs: 30 },
        }));
        let (_, action) =
            Tracker::default().observe(
                &state,
                ExpiryMonitor::new(LEAD),
                Utc::now(),
                false,
                INTERVAL,
            );
        assert_eq!(action, Action::Stop);
    }
}
