//! CLI configuration: thin wrapper around `embedctl_config`.
//!
//! Adds the resolution that respects `GlobalOpts` overrides
//! (`--service-url`, `--access-token`, `--timeout`).

use std::time::Duration;

use secrecy::SecretString;

use embedctl_config::checked_timeout;
use embedctl_core::{ServiceCredentials, SessionConfig};

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub use embedctl_config::{Config, Profile, config_path, load_config_or_default, save_config};

/// Session config plus the selection defaults the profile carries.
#[derive(Debug)]
pub struct Resolved {
    pub session: SessionConfig,
    pub workspace: Option<String>,
    pub report: Option<String>,
}

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Build the session config from the config file, the active profile and
/// CLI overrides. Without a profile, `--access-token` alone is enough.
pub fn resolve(global: &GlobalOpts) -> Result<Resolved, CliError> {
    let cfg = load_config_or_default();
    let profile_name = active_profile_name(global, &cfg);

    if let Some(profile) = cfg.profiles.get(&profile_name) {
        let mut profile = profile.clone();
        if global.access_token.is_some() {
            // A flag token replaces whatever credentials the profile names.
            profile.tenant_id = None;
            profile.client_id = None;
        }
        let mut session =
            embedctl_config::profile_to_session_config(&profile, &profile_name, &cfg.defaults)?;
        apply_overrides(&mut session, global)?;
        return Ok(Resolved {
            session,
            workspace: profile.workspace.clone(),
            report: profile.report.clone(),
        });
    }

    if global.profile.is_some() {
        return Err(CliError::ProfileNotFound {
            name: profile_name,
            available: available_profiles(&cfg),
        });
    }

    let Some(token) = global.access_token.as_ref() else {
        if cfg.profiles.is_empty() && !config_path().exists() {
            return Err(CliError::NoConfig {
                path: config_path().display().to_string(),
            });
        }
        return Err(CliError::NoCredentials {
            profile: profile_name,
        });
    };

    let mut session = SessionConfig::new(ServiceCredentials::AccessToken(SecretString::from(
        token.clone(),
    )));
    session.timeout = checked_timeout("timeout", cfg.defaults.timeout)?;
    session.fetch_timeout = checked_timeout("fetch_timeout", cfg.defaults.fetch_timeout)?;
    session.expiry_lead = Duration::from_secs(cfg.defaults.expiry_lead);
    apply_overrides(&mut session, global)?;
    Ok(Resolved {
        session,
        workspace: None,
        report: None,
    })
}

fn apply_overrides(session: &mut SessionConfig, global: &GlobalOpts) -> Result<(), CliError> {
    if let Some(ref url) = global.service_url {
        url::Url::parse(url).map_err(|e| CliError::Validation {
            field: "service-url".into(),
            reason: format!("invalid URL '{url}': {e}"),
        })?;
        session.service_url.clone_from(url);
    }
    if let Some(ref token) = global.access_token {
        session.credentials = ServiceCredentials::AccessToken(SecretString::from(token.clone()));
    }
    if let Some(secs) = global.timeout {
        let limit = checked_timeout("timeout", secs)?;
        session.timeout = limit;
        session.fetch_timeout = limit;
    }
    Ok(())
}

pub fn available_profiles(cfg: &Config) -> String {
    if cfg.profiles.is_empty() {
        "(none)".into()
    } else {
        cfg.profiles.keys().cloned().collect::<Vec<_>>().join(", ")
    }
}
