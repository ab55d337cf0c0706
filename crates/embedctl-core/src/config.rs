// ── Runtime session configuration ──
//
// These types describe *how* to reach the catalog and token services and how
// the controller should behave. They carry credential data and tuning but
// never touch disk: the CLI (via embedctl-config) builds a `SessionConfig`
// and hands it in.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::model::DisplaySettings;

pub const DEFAULT_SERVICE_URL: &str = "https://api.powerbi.com/v1.0/myorg";
pub const DEFAULT_AUTHORITY_URL: &str = "https://login.microsoftonline.com";
pub const DEFAULT_EMBED_BASE_URL: &str = "https://app.powerbi.com";

/// How to authenticate against the service.
#[derive(Debug, Clone)]
pub enum ServiceCredentials {
    /// App registration using the client-credentials grant.
    ServicePrincipal {
        tenant_id: String,
        client_id: String,
        client_secret: SecretString,
    },
    /// Pre-issued bearer token, used verbatim.
    AccessToken(SecretString),
}

impl ServiceCredentials {
    pub fn mode(&self) -> &'static str {
        match self {
            Self::ServicePrincipal { .. } => "service-principal",
            Self::AccessToken(_) => "access-token",
        }
    }
}

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// Bundled CA roots.
    #[default]
    SystemDefaults,
    /// Additionally trust a custom CA certificate (PEM).
    CustomCa(PathBuf),
}

/// Row-level-security identity embed tokens are issued for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityConfig {
    pub username: String,
    pub roles: Vec<String>,
}

impl IdentityConfig {
    /// Identity with the single `Viewer` role.
    pub fn viewer(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            roles: vec!["Viewer".into()],
        }
    }
}

/// Everything needed to build an [`HttpResourceClient`](crate::HttpResourceClient)
/// and an [`EmbedController`](crate::EmbedController).
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Catalog service base URL.
    pub service_url: String,
    /// Identity authority used for the client-credentials grant.
    pub authority_url: String,
    /// Host serving the embed frame (`{base}/reportEmbed`).
    pub embed_base_url: String,
    pub credentials: ServiceCredentials,
    pub tls: TlsVerification,
    /// Per-HTTP-request timeout.
    pub timeout: Duration,
    /// Upper bound on one controller fetch, auth round-trip included.
    pub fetch_timeout: Duration,
    /// How long before expiry a configuration counts as nearing expiry.
    pub expiry_lead: Duration,
    /// Display settings the session starts with.
    pub settings: DisplaySettings,
    pub identity: Option<IdentityConfig>,
}

impl SessionConfig {
    /// Config with service defaults for everything but the credentials.
    pub fn new(credentials: ServiceCredentials) -> Self {
        Self {
            service_url: DEFAULT_SERVICE_URL.into(),
            authority_url: DEFAULT_AUTHORITY_URL.into(),
            embed_base_url: DEFAULT_EMBED_BASE_URL.into(),
            credentials,
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(30),
            fetch_timeout: Duration::from_secs(30),
            expiry_lead: Duration::from_secs(60),
            settings: DisplaySettings::default(),
            identity: None,
        }
    }

    /// The controller-facing subset of this config.
    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            fetch_timeout: self.fetch_timeout,
            expiry_lead: self.expiry_lead,
            settings: self.settings.clone(),
        }
    }
}

/// Controller tuning, independent of how the remote client is built.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub fetch_timeout: Duration,
    pub expiry_lead: Duration,
    pub settings: DisplaySettings,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(30),
            expiry_lead: Duration::from_secs(60),
            settings: DisplaySettings::default(),
        }
    }
}
