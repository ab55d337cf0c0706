//! Shared configuration for embedctl.
//!
//! TOML profiles, secret resolution (env + keyring + plaintext), and
//! translation to `embedctl_core::SessionConfig`. The CLI layers its
//! `GlobalOpts` flag overrides on top of what this crate resolves.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use embedctl_core::config::{DEFAULT_AUTHORITY_URL, DEFAULT_EMBED_BASE_URL, DEFAULT_SERVICE_URL};
use embedctl_core::{
    DisplaySettings, IdentityConfig, ServiceCredentials, SessionConfig, Theme, TlsVerification,
};

/// Service name secrets are stored under in the system keyring.
pub const KEYRING_SERVICE: &str = "embedctl";

/// Overrides the config file location when set.
pub const CONFIG_PATH_ENV: &str = "EMBEDCTL_CONFIG";

const ENV_PREFIX: &str = "EMBEDCTL_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no credentials configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    /// Named service profiles.
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    /// HTTP request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Upper bound on one session fetch, in seconds.
    #[serde(default = "default_timeout")]
    pub fetch_timeout: u64,

    /// Seconds before expiry a configuration counts as nearing expiry.
    #[serde(default = "default_expiry_lead")]
    pub expiry_lead: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            timeout: default_timeout(),
            fetch_timeout: default_timeout(),
            expiry_lead: default_expiry_lead(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    30
}
fn default_expiry_lead() -> u64 {
    60
}

/// A named service profile.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Profile {
    /// Directory (tenant) the app registration lives in.
    pub tenant_id: Option<String>,

    /// App registration (client) id.
    pub client_id: Option<String>,

    /// Client secret (plaintext, prefer keyring or env var).
    pub client_secret: Option<String>,

    /// Environment variable name containing the client secret.
    pub client_secret_env: Option<String>,

    /// Pre-issued bearer token, used instead of the client-credentials flow.
    pub access_token: Option<String>,

    pub service_url: Option<String>,
    pub authority_url: Option<String>,
    pub embed_base_url: Option<String>,

    /// Path to custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    /// Effective identity (username) embed tokens are issued for.
    pub identity: Option<String>,

    /// Roles for `identity`. Defaults to `Viewer`.
    pub identity_roles: Option<Vec<String>>,

    /// Workspace to select instead of the first one listed.
    pub workspace: Option<String>,

    /// Report to select instead of the first one listed.
    pub report: Option<String>,

    pub timeout: Option<u64>,
    pub fetch_timeout: Option<u64>,
    pub expiry_lead: Option<u64>,

    /// `light`, `dark` or `high-contrast`.
    pub theme: Option<String>,
    pub filter_pane: Option<bool>,
    pub navigation: Option<bool>,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path: `$EMBEDCTL_CONFIG`, else the platform
/// config directory.
pub fn config_path() -> PathBuf {
    if let Some(path) = std::env::var_os(CONFIG_PATH_ENV) {
        return PathBuf::from(path);
    }
    ProjectDirs::from("com", "embedctl", "embedctl").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("embedctl");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from `path` merged with `EMBEDCTL_`-prefixed env vars. Nested keys
/// use `__`, e.g. `EMBEDCTL_PROFILES__PROD__TENANT_ID`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"));

    let config: Config = figment.extract()?;
    debug!(path = %path.display(), profiles = config.profiles.len(), "config loaded");
    Ok(config)
}

/// Load config, returning a default if the file doesn't exist.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Keyring ─────────────────────────────────────────────────────────

/// Secrets a profile may keep in the system keyring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretKind {
    ClientSecret,
    AccessToken,
}

impl SecretKind {
    /// Keyring account name for this secret within a profile.
    pub fn keyring_key(self, profile_name: &str) -> String {
        match self {
            Self::ClientSecret => format!("{profile_name}/client-secret"),
            Self::AccessToken => format!("{profile_name}/access-token"),
        }
    }
}

/// Store a secret for `profile_name` in the system keyring.
pub fn store_secret(profile_name: &str, kind: SecretKind, secret: &str) -> Result<(), ConfigError> {
    let entry = keyring::Entry::new(KEYRING_SERVICE, &kind.keyring_key(profile_name))?;
    entry.set_password(secret)?;
    Ok(())
}

fn keyring_secret(profile_name: &str, kind: SecretKind) -> Option<SecretString> {
    let entry = keyring::Entry::new(KEYRING_SERVICE, &kind.keyring_key(profile_name)).ok()?;
    entry.get_password().ok().map(SecretString::from)
}

// ── Credential resolution (without CLI flags) ───────────────────────

/// Resolve the client secret: `client_secret_env` → keyring → plaintext.
pub fn resolve_client_secret(
    profile: &Profile,
    profile_name: &str,
) -> Result<SecretString, ConfigError> {
    if let Some(ref env_name) = profile.client_secret_env {
        if let Ok(val) = std::env::var(env_name) {
            debug!(profile = profile_name, source = "env", "client secret resolved");
            return Ok(SecretString::from(val));
        }
    }

    if let Some(secret) = keyring_secret(profile_name, SecretKind::ClientSecret) {
        debug!(profile = profile_name, source = "keyring", "client secret resolved");
        return Ok(secret);
    }

    if let Some(ref secret) = profile.client_secret {
        debug!(profile = profile_name, source = "config", "client secret resolved");
        return Ok(SecretString::from(secret.clone()));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
    })
}

/// A static access token from the keyring or the profile, if any.
pub fn resolve_access_token(profile: &Profile, profile_name: &str) -> Option<SecretString> {
    keyring_secret(profile_name, SecretKind::AccessToken).or_else(|| {
        profile
            .access_token
            .as_ref()
            .map(|t| SecretString::from(t.clone()))
    })
}

/// Service principal when tenant and client ids are set, else a static
/// access token.
pub fn resolve_credentials(
    profile: &Profile,
    profile_name: &str,
) -> Result<ServiceCredentials, ConfigError> {
    match (&profile.tenant_id, &profile.client_id) {
        (Some(tenant_id), Some(client_id)) => Ok(ServiceCredentials::ServicePrincipal {
            tenant_id: tenant_id.clone(),
            client_id: client_id.clone(),
            client_secret: resolve_client_secret(profile, profile_name)?,
        }),
        (Some(_), None) | (None, Some(_)) => Err(ConfigError::Validation {
            field: "client_id".into(),
            reason: "tenant_id and client_id must be set together".into(),
        }),
        (None, None) => resolve_access_token(profile, profile_name)
            .map(ServiceCredentials::AccessToken)
            .ok_or_else(|| ConfigError::NoCredentials {
                profile: profile_name.into(),
            }),
    }
}

// ── Profile translation ─────────────────────────────────────────────

/// Display settings the profile asks for, defaults filling the gaps.
pub fn display_settings(profile: &Profile) -> Result<DisplaySettings, ConfigError> {
    let defaults = DisplaySettings::default();
    let theme = match profile.theme.as_deref() {
        Some(raw) => Theme::from_str(raw).map_err(|_| ConfigError::Validation {
            field: "theme".into(),
            reason: format!("expected 'light', 'dark' or 'high-contrast', got '{raw}'"),
        })?,
        None => defaults.theme,
    };
    Ok(DisplaySettings {
        theme,
        filter_pane_enabled: profile.filter_pane.unwrap_or(defaults.filter_pane_enabled),
        navigation_enabled: profile.navigation.unwrap_or(defaults.navigation_enabled),
    })
}

pub fn identity(profile: &Profile) -> Option<IdentityConfig> {
    let username = profile.identity.clone()?;
    Some(match &profile.identity_roles {
        Some(roles) if !roles.is_empty() => IdentityConfig {
            username,
            roles: roles.clone(),
        },
        _ => IdentityConfig::viewer(username),
    })
}

fn checked_url(field: &str, value: Option<&str>, default: &str) -> Result<String, ConfigError> {
    let raw = value.unwrap_or(default);
    url::Url::parse(raw).map_err(|e| ConfigError::Validation {
        field: field.into(),
        reason: format!("invalid URL '{raw}': {e}"),
    })?;
    Ok(raw.to_owned())
}

/// A timeout in whole seconds. Zero would fail every request at once.
pub fn checked_timeout(field: &str, secs: u64) -> Result<Duration, ConfigError> {
    if secs == 0 {
        return Err(ConfigError::Validation {
            field: field.into(),
            reason: "must be at least 1 second".into(),
        });
    }
    Ok(Duration::from_secs(secs))
}

/// Build a `SessionConfig` from a profile, no CLI flag overrides.
pub fn profile_to_session_config(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<SessionConfig, ConfigError> {
    let credentials = resolve_credentials(profile, profile_name)?;

    let tls = profile
        .ca_cert
        .clone()
        .map_or(TlsVerification::SystemDefaults, TlsVerification::CustomCa);

    Ok(SessionConfig {
        service_url: checked_url(
            "service_url",
            profile.service_url.as_deref(),
            DEFAULT_SERVICE_URL,
        )?,
        authority_url: checked_url(
            "authority_url",
            profile.authority_url.as_deref(),
            DEFAULT_AUTHORITY_URL,
        )?,
        embed_base_url: checked_url(
            "embed_base_url",
            profile.embed_base_url.as_deref(),
            DEFAULT_EMBED_BASE_URL,
        )?,
        credentials,
        tls,
        timeout: checked_timeout("timeout", profile.timeout.unwrap_or(defaults.timeout))?,
        fetch_timeout: checked_timeout(
            "fetch_timeout",
            profile.fetch_timeout.unwrap_or(defaults.fetch_timeout),
        )?,
        expiry_lead: Duration::from_secs(profile.expiry_lead.unwrap_or(defaults.expiry_lead)),
        settings: display_settings(profile)?,
        identity: identity(profile),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::result_large_err)]
mod tests {
    use figment::Jail;
    use pretty_assertions::assert_eq;
    use secrecy::ExposeSecret;

    use super::*;

    const SAMPLE: &str = r#"
default_profile = "prod"

[defaults]
timeout = 10

[profiles.prod]
tenant_id = "contoso-tenant"
client_id = "app-123"
client_secret_env = "PROD_SECRET"
theme = "dark"
filter_pane = false

[profiles.dev]
access_token = "dev-token"
service_url = "http://localhost:8080/v1.0/myorg"
"#;

    fn to_figment(e: ConfigError) -> figment::Error {
        figment::Error::from(e.to_string())
    }

    #[test]
    fn file_profiles_and_defaults_load() {
        Jail::expect_with(|jail| {
            jail.create_file("config.toml", SAMPLE)?;
            let cfg = load_config_from(Path::new("config.toml")).map_err(to_figment)?;

            assert_eq!(cfg.default_profile.as_deref(), Some("prod"));
            assert_eq!(cfg.defaults.timeout, 10);
            assert_eq!(cfg.defaults.expiry_lead, 60);
            assert_eq!(cfg.defaults.output, "table");
            assert_eq!(cfg.profiles.len(), 2);
            assert_eq!(cfg.profiles["prod"].theme.as_deref(), Some("dark"));
            Ok(())
        });
    }

    #[test]
    fn env_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file("config.toml", SAMPLE)?;
            jail.set_env("EMBEDCTL_DEFAULTS__EXPIRY_LEAD", "120");
            jail.set_env("EMBEDCTL_PROFILES__PROD__CLIENT_ID", "app-456");
            let cfg = load_config_from(Path::new("config.toml")).map_err(to_figment)?;

            assert_eq!(cfg.defaults.expiry_lead, 120);
            assert_eq!(cfg.profiles["prod"].client_id.as_deref(), Some("app-456"));
            Ok(())
        });
    }

    #[test]
    fn missing_file_yields_defaults() {
        Jail::expect_with(|_jail| {
            let cfg = load_config_from(Path::new("absent.toml")).map_err(to_figment)?;
            assert_eq!(cfg.default_profile.as_deref(), Some("default"));
            assert!(cfg.profiles.is_empty());
            Ok(())
        });
    }

    #[test]
    fn service_principal_profile_translates() {
        Jail::expect_with(|jail| {
            jail.create_file("config.toml", SAMPLE)?;
            jail.set_env("PROD_SECRET", "from-env");
            let cfg = load_config_from(Path::new("config.toml")).map_err(to_figment)?;
            let session =
                profile_to_session_config(&cfg.profiles["prod"], "prod", &cfg.defaults)
                    .map_err(to_figment)?;

            match &session.credentials {
                ServiceCredentials::ServicePrincipal {
                    tenant_id,
                    client_secret,
                    ..
                } => {
                    assert_eq!(tenant_id, "contoso-tenant");
                    assert_eq!(client_secret.expose_secret(), "from-env");
                }
                ServiceCredentials::AccessToken(_) => panic!("expected a service principal"),
            }
            assert_eq!(session.service_url, DEFAULT_SERVICE_URL);
            assert_eq!(session.timeout, Duration::from_secs(10));
            assert_eq!(session.settings.theme, Theme::Dark);
            assert!(!session.settings.filter_pane_enabled);
            assert!(session.settings.navigation_enabled);
            Ok(())
        });
    }

    #[test]
    fn access_token_profile_translates() {
        let profile = Profile {
            access_token: Some("dev-token".into()),
            service_url: Some("http://localhost:8080/v1.0/myorg".into()),
            ..Profile::default()
        };
        let session =
            profile_to_session_config(&profile, "embedctl-test-dev", &Defaults::default()).unwrap();
        assert_eq!(session.credentials.mode(), "access-token");
        assert_eq!(session.service_url, "http://localhost:8080/v1.0/myorg");
        assert_eq!(session.fetch_timeout, Duration::from_secs(30));
    }

    #[test]
    fn half_configured_service_principal_is_rejected() {
        let profile = Profile {
            tenant_id: Some("contoso-tenant".into()),
            ..Profile::default()
        };
        let err = resolve_credentials(&profile, "embedctl-test-half").unwrap_err();
        assert!(matches!(err, ConfigError::Validation { .. }));
    }

    #[test]
    fn profile_without_credentials_is_rejected() {
        let err =
            resolve_credentials(&Profile::default(), "embedctl-test-empty").unwrap_err();
        assert!(matches!(err, ConfigError::NoCredentials { .. }));
    }

    #[test]
    fn bad_theme_and_url_are_validation_errors() {
        let profile = Profile {
            theme: Some("sepia".into()),
            ..Profile::default()
        };
        assert!(matches!(
            display_settings(&profile),
            Err(ConfigError::Validation { .. })
        ));

        let profile = Profile {
            access_token: Some("t".into()),
            embed_base_url: Some("not a url".into()),
            ..Profile::default()
        };
        let err = profile_to_session_config(&profile, "embedctl-test-url", &Defaults::default())
            .unwrap_err();
        assert!(err.to_string().contains("embed_base_url"), "{err}");
    }

    #[test]
    fn zero_timeouts_are_validation_errors() {
        let profile = Profile {
            access_token: Some("t".into()),
            fetch_timeout: Some(0),
            ..Profile::default()
        };
        let err = profile_to_session_config(&profile, "embedctl-test-zero", &Defaults::default())
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Validation { ref field, .. } if field == "fetch_timeout"
        ));

        let defaults = Defaults {
            timeout: 0,
            ..Defaults::default()
        };
        let profile = Profile {
            access_token: Some("t".into()),
            ..Profile::default()
        };
        let err = profile_to_session_config(&profile, "embedctl-test-zero", &defaults).unwrap_err();
        assert!(err.to_string().contains("timeout"), "{err}");
        assert_eq!(checked_timeout("timeout", 5).unwrap(), Duration::from_secs(5));
    }

    #[test]
    fn identity_defaults_to_viewer_role() {
        let profile = Profile {
            identity: Some("analyst@contoso.com".into()),
            ..Profile::default()
        };
        assert_eq!(identity(&profile).unwrap().roles, vec!["Viewer"]);
        assert!(identity(&Profile::default()).is_none());
    }

    #[test]
    fn saved_config_round_trips_through_loader() {
        Jail::expect_with(|jail| {
            let mut cfg = Config::default();
            cfg.profiles.insert(
                "default".into(),
                Profile {
                    access_token: Some("t".into()),
                    report: Some("r-1".into()),
                    ..Profile::default()
                },
            );
            let path = jail.directory().join("nested").join("config.toml");
            save_config_to(&cfg, &path).map_err(to_figment)?;

            let loaded = load_config_from(&path).map_err(to_figment)?;
            assert_eq!(loaded.profiles["default"].report.as_deref(), Some("r-1"));
            Ok(())
        });
    }
}
