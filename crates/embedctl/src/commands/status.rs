//! `status`: which identity is configured and whether it authenticates.

use owo_colors::OwoColorize;

use embedctl_core::ServiceStatus;

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

use super::{Context, util};

fn detail(s: &ServiceStatus, color: bool) -> String {
    let label = s.label();
    let state = match (color, s.authenticated) {
        (false, _) => label.to_owned(),
        (true, true) => label.green().to_string(),
        (true, false) => label.red().to_string(),
    };
    let mut pairs = vec![
        ("Service", s.service_url.clone()),
        ("Auth mode", s.auth_mode.to_owned()),
    ];
    if let Some(ref tenant) = s.tenant_id {
        pairs.push(("Tenant", tenant.clone()));
    }
    if let Some(ref client) = s.client_id {
        pairs.push(("Client", client.clone()));
    }
    pairs.push(("Status", state));
    if let Some(expires) = s.token_expires_at {
        pairs.push(("Token expires", expires.to_rfc3339()));
    }
    if let Some(ref error) = s.error {
        pairs.push(("Error", error.clone()));
    }
    output::detail_lines(&pairs)
}

pub async fn handle(ctx: &Context, global: &GlobalOpts) -> Result<(), CliError> {
    let progress = util::spinner(global, "Authenticating...");
    let status = ctx.client.service_status().await;
    progress.finish_and_clear();

    let color = output::should_color(&global.color);
    let out = output::render_single(
        &global.output,
        &status,
        |s| detail(s, color),
        |s| s.label().to_owned(),
    );
    output::print_output(&out, global.quiet);

    if status.authenticated {
        Ok(())
    } else {
        Err(CliError::AuthFailed {
            message: status.error.unwrap_or_else(|| "not authenticated".into()),
        })
    }
}
