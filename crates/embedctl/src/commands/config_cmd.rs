//! Config subcommand handlers.

use dialoguer::{Input, Password, Select};

use embedctl_config::{SecretKind, store_secret};
use embedctl_core::config::DEFAULT_SERVICE_URL;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts, SecretArg};
use crate::config::{self, Config, Profile};
use crate::error::CliError;
use crate::output;

const MASK: &str = "****";

// ── Helpers ─────────────────────────────────────────────────────────

/// Copy of `cfg` with every stored secret masked.
fn redacted(cfg: &Config) -> Config {
    let mut cfg = cfg.clone();
    for profile in cfg.profiles.values_mut() {
        if profile.client_secret.is_some() {
            profile.client_secret = Some(MASK.into());
        }
        if profile.access_token.is_some() {
            profile.access_token = Some(MASK.into());
        }
    }
    cfg
}

fn render_toml(cfg: &Config) -> String {
    toml::to_string_pretty(cfg).unwrap_or_else(|e| format!("# could not render config: {e}"))
}

fn save_config(cfg: &Config) -> Result<(), CliError> {
    config::save_config(cfg)?;
    Ok(())
}

/// Map a dialoguer / interactive I/O failure into CliError.
fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

fn prompt_secret(label: &str) -> Result<String, CliError> {
    let secret = Password::new()
        .with_prompt(label)
        .interact()
        .map_err(prompt_err)?;
    if secret.is_empty() {
        return Err(CliError::Validation {
            field: "secret".into(),
            reason: "value cannot be empty".into(),
        });
    }
    Ok(secret)
}

/// Offer the keyring or plaintext config for a secret. Returns the value to
/// write into the profile, `None` when it went to the keyring.
fn store_choice(
    profile_name: &str,
    kind: SecretKind,
    secret: String,
    label: &str,
) -> Result<Option<String>, CliError> {
    let choices = &[
        "Store in system keyring (recommended)",
        "Save to config file (plaintext)",
    ];
    let selection = Select::new()
        .with_prompt(format!("Where to store the {label}?"))
        .items(choices)
        .default(0)
        .interact()
        .map_err(prompt_err)?;

    if selection == 0 {
        store_secret(profile_name, kind, &secret)?;
        eprintln!("   ✓ {label} stored in system keyring");
        Ok(None)
    } else {
        Ok(Some(secret))
    }
}

fn profile_not_found(name: String, cfg: &Config) -> CliError {
    CliError::ProfileNotFound {
        name,
        available: config::available_profiles(cfg),
    }
}

fn init_wizard() -> Result<(), CliError> {
    let config_path = config::config_path();
    eprintln!("embedctl configuration wizard");
    eprintln!("   Config path: {}\n", config_path.display());

    let profile_name: String = Input::new()
        .with_prompt("Profile name")
        .default("default".into())
        .interact_text()
        .map_err(prompt_err)?;

    let service_url: String = Input::new()
        .with_prompt("Service URL")
        .default(DEFAULT_SERVICE_URL.into())
        .interact_text()
        .map_err(prompt_err)?;

    let auth_choices = &[
        "Service principal (client credentials)",
        "Pre-issued access token",
    ];
    let auth_selection = Select::new()
        .with_prompt("Authentication method")
        .items(auth_choices)
        .default(0)
        .interact()
        .map_err(prompt_err)?;

    let mut profile = Profile {
        service_url: (service_url != DEFAULT_SERVICE_URL).then_some(service_url),
        ..Profile::default()
    };

    if auth_selection == 0 {
        let tenant_id: String = Input::new()
            .with_prompt("Tenant ID")
            .interact_text()
            .map_err(prompt_err)?;
        let client_id: String = Input::new()
            .with_prompt("Client ID")
            .interact_text()
            .map_err(prompt_err)?;
        let secret = prompt_secret("Client secret")?;
        profile.tenant_id = Some(tenant_id);
        profile.client_id = Some(client_id);
        profile.client_secret =
            store_choice(&profile_name, SecretKind::ClientSecret, secret, "client secret")?;
    } else {
        let token = prompt_secret("Access token")?;
        profile.access_token =
            store_choice(&profile_name, SecretKind::AccessToken, token, "access token")?;
    }

    let workspace: String = Input::new()
        .with_prompt("Default workspace ID (empty for the first listed)")
        .allow_empty(true)
        .interact_text()
        .map_err(prompt_err)?;
    if !workspace.is_empty() {
        profile.workspace = Some(workspace);
    }

    let mut cfg = config::load_config_or_default();
    cfg.profiles.insert(profile_name.clone(), profile);
    cfg.default_profile = Some(profile_name.clone());
    save_config(&cfg)?;

    eprintln!("\n✓ Configuration written to {}", config_path.display());
    eprintln!("  Active profile: {profile_name}");
    eprintln!("\n  Test it: embedctl status");
    Ok(())
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Init => init_wizard(),

        ConfigCommand::Show => {
            let cfg = redacted(&config::load_config_or_default());
            let out = output::render_single(&global.output, &cfg, render_toml, |_| {
                config::config_path().display().to_string()
            });
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Path => {
            output::print_output(&config::config_path().display().to_string(), global.quiet);
            Ok(())
        }

        ConfigCommand::Profiles => {
            let cfg = config::load_config_or_default();
            let default = cfg.default_profile.as_deref().unwrap_or("default");
            if cfg.profiles.is_empty() {
                eprintln!("No profiles configured. Run: embedctl config init");
            } else {
                let lines: Vec<String> = cfg
                    .profiles
                    .keys()
                    .map(|name| {
                        let marker = if name == default { " *" } else { "" };
                        format!("{name}{marker}")
                    })
                    .collect();
                output::print_output(&lines.join("\n"), global.quiet);
            }
            Ok(())
        }

        ConfigCommand::Use { name } => {
            let mut cfg = config::load_config_or_default();
            if !cfg.profiles.contains_key(&name) {
                return Err(profile_not_found(name, &cfg));
            }
            cfg.default_profile = Some(name.clone());
            save_config(&cfg)?;
            eprintln!("✓ Default profile set to '{name}'");
            Ok(())
        }

        ConfigCommand::SetSecret { kind } => {
            let cfg = config::load_config_or_default();
            let profile_name = config::active_profile_name(global, &cfg);
            if !cfg.profiles.contains_key(&profile_name) {
                return Err(profile_not_found(profile_name, &cfg));
            }
            let (kind, label) = match kind {
                SecretArg::ClientSecret => (SecretKind::ClientSecret, "Client secret"),
                SecretArg::AccessToken => (SecretKind::AccessToken, "Access token"),
            };
            let secret = prompt_secret(label)?;
            store_secret(&profile_name, kind, &secret)?;
            eprintln!("✓ {label} stored in system keyring for profile '{profile_name}'");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn show_masks_secrets() {
        let mut cfg = Config::default();
        cfg.profiles.insert(
            "prod".into(),
            Profile {
                tenant_id: Some("t".into()),
                client_id: Some("c".into()),
                client_secret: Some("hunter2".into()),
                ..Profile::default()
            },
        );
        let out = render_toml(&redacted(&cfg));
        assert!(!out.contains("hunter2"));
        assert!(out.contains("[profiles.prod]"));
        assert!(out.contains("client_secret = \"****\""));
        assert!(out.contains("tenant_id = \"t\""));
    }
}
