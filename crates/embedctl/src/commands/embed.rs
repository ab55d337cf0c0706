//! `embed`: drive the session to a configuration and print it.

use chrono::{DateTime, Utc};
use secrecy::ExposeSecret;
use serde::Serialize;

use embedctl_core::{DisplaySettings, EmbedConfiguration, ExpiryMonitor, ExpiryStatus};

use crate::cli::{EmbedArgs, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::Context;
use super::util::{self, Depth};

const REDACTED: &str = "<redacted: pass --show-token>";

/// What the command prints. The token and the locator carrying it are
/// redacted unless asked for.
#[derive(Debug, Serialize)]
pub struct EmbedView {
    pub workspace_id: String,
    pub report_id: String,
    pub report_name: String,
    pub report_type: String,
    pub display_url: String,
    pub embed_locator: String,
    pub access_token: String,
    pub token_id: Option<String>,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub expiry_status: ExpiryStatus,
    pub remaining_secs: u64,
    pub settings: DisplaySettings,
}

impl EmbedView {
    pub fn new(
        config: &EmbedConfiguration,
        settings: &DisplaySettings,
        monitor: ExpiryMonitor,
        now: DateTime<Utc>,
        show_token: bool,
    ) -> Self {
        let (embed_locator, access_token) = if show_token {
            (
                config.embed_locator().to_string(),
                config.access_token.expose_secret().to_owned(),
            )
        } else {
            (REDACTED.to_owned(), REDACTED.to_owned())
        };
        Self {
            workspace_id: config.workspace_id.to_string(),
            report_id: config.report_id.to_string(),
            report_name: config.report_name.clone(),
            report_type: config.report_type.clone(),
            display_url: config.display_url.to_string(),
            embed_locator,
            access_token,
            token_id: config.token_id.clone(),
            issued_at: config.issued_at,
            expires_at: config.expires_at,
            expiry_status: monitor.status_at(config, now),
            remaining_secs: config.remaining_at(now).map_or(0, |d| d.as_secs()),
            settings: settings.clone(),
        }
    }
}

fn detail(view: &EmbedView, color: bool) -> String {
    let remaining = util::human_duration(std::time::Duration::from_secs(view.remaining_secs));
    output::detail_lines(&[
        ("Report", format!("{} ({})", view.report_name, view.report_id)),
        ("Type", view.report_type.clone()),
        ("Workspace", view.workspace_id.clone()),
        ("Display URL", view.display_url.clone()),
        ("Locator", view.embed_locator.clone()),
        ("Token", view.access_token.clone()),
        ("Token ID", view.token_id.clone().unwrap_or_default()),
        ("Issued", view.issued_at.to_rfc3339()),
        ("Expires", format!("{} (in {remaining})", view.expires_at.to_rfc3339())),
        ("Status", output::expiry_label(view.expiry_status, color)),
        ("Theme", view.settings.theme.to_string()),
        ("Filter pane", on_off(view.settings.filter_pane_enabled)),
        ("Navigation", on_off(view.settings.navigation_enabled)),
    ])
}

fn on_off(enabled: bool) -> String {
    let label = if enabled { "shown" } else { "hidden" };
    label.into()
}

pub async fn handle(ctx: &Context, args: EmbedArgs, global: &GlobalOpts) -> Result<(), CliError> {
    util::apply_display(ctx, &args.display).await?;
    let state = util::drive(ctx, global, &args.selection, Depth::Configuration).await?;
    let Some(config) = state.active_configuration.as_ref() else {
        return Err(CliError::SessionClosed);
    };

    let view = EmbedView::new(
        config,
        &state.settings,
        ctx.controller.expiry_monitor(),
        Utc::now(),
        args.show_token,
    );
    let color = output::should_color(&global.color);
    let out = output::render_single(
        &global.output,
        &view,
        |v| detail(v, color),
        |v| {
            if args.show_token {
                v.embed_locator.clone()
            } else {
                v.display_url.clone()
            }
        },
    );
    output::print_output(&out, global.quiet);
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use chrono::TimeDelta;
    use secrecy::SecretString;
    use url::Url;

    use super::*;

    fn config(now: DateTime<Utc>) -> EmbedConfiguration {
        EmbedConfiguration {
            workspace_id: "ws-1".into(),
            report_id: "r-1".into(),
            display_url: Url::parse("https://embed.example/reportEmbed?reportId=r-1").unwrap(),
            access_token: SecretString::from("tok-secret"),
            token_id: Some("tid".into()),
            issued_at: now,
            expires_at: now + TimeDelta::minutes(60),
            report_name: "Sales".into(),
            report_type: "Report".into(),
        }
    }

    #[test]
    fn token_is_redacted_by_default() {
        let now = Utc::now();
        let monitor = ExpiryMonitor::new(Duration::from_secs(60));
        let view = EmbedView::new(&config(now), &DisplaySettings::default(), monitor, now, false);
        assert_eq!(view.access_token, REDACTED);
        assert!(!view.embed_locator.contains("tok-secret"));
        assert_eq!(view.expiry_status, ExpiryStatus::Valid);
        assert_eq!(view.remaining_secs, 3600);
    }

    #[test]
    fn show_token_exposes_locator() {
        let now = Utc::now();
        let monitor = ExpiryMonitor::new(Duration::from_secs(60));
        let view = EmbedView::new(&config(now), &DisplaySettings::default(), monitor, now, true);
        assert_eq!(view.access_token, "tok-secret");
        assert!(view.embed_locator.contains("accessToken=tok-secret"));
    }
}
