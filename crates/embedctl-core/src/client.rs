// ── Remote resource client ──
//
// `ResourceClient` is the controller's only view of the outside world: three
// request/response calls with no caching and no retry policy. The HTTP
// implementation composes them from catalog endpoints and also carries the
// dataset and status operations the CLI needs outside the cascade.

use async_trait::async_trait;
use chrono::Utc;
use secrecy::SecretString;
use tracing::{debug, warn};
use url::Url;

use embedctl_api::catalog_types::{EffectiveIdentity, GenerateTokenRequest};
use embedctl_api::{CatalogClient, Credentials, ServicePrincipal, TlsMode, TransportConfig};

use crate::config::{IdentityConfig, ServiceCredentials, SessionConfig, TlsVerification};
use crate::error::CoreError;
use crate::model::embed::{DEFAULT_REPORT_NAME, DEFAULT_REPORT_TYPE};
use crate::model::{
    Dataset, DisplaySettings, EmbedConfiguration, RefreshRecord, Report, ReportId, ReportPage,
    ReportParameter, ServiceStatus, Workspace, WorkspaceId,
};

/// The three logical calls the cascade depends on.
#[async_trait]
pub trait ResourceClient: Send + Sync {
    /// Workspaces in service order.
    async fn list_workspaces(&self) -> Result<Vec<Workspace>, CoreError>;

    /// Reports within one workspace, in service order.
    async fn list_reports(&self, workspace_id: &WorkspaceId) -> Result<Vec<Report>, CoreError>;

    /// A fresh configuration bound to the given settings.
    async fn issue_embed_configuration(
        &self,
        workspace_id: &WorkspaceId,
        report_id: &ReportId,
        settings: &DisplaySettings,
    ) -> Result<EmbedConfiguration, CoreError>;
}

// ── HTTP implementation ─────────────────────────────────────────────

pub struct HttpResourceClient {
    catalog: CatalogClient,
    embed_base: Url,
    identity: Option<IdentityConfig>,
}

impl HttpResourceClient {
    pub fn new(config: &SessionConfig) -> Result<Self, CoreError> {
        let transport = TransportConfig {
            tls: match &config.tls {
                TlsVerification::SystemDefaults => TlsMode::System,
                TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
            },
            timeout: config.timeout,
        };
        let catalog = CatalogClient::new(
            &config.service_url,
            &config.authority_url,
            api_credentials(&config.credentials),
            &transport,
        )?;
        let embed_base = Url::parse(&config.embed_base_url).map_err(|e| CoreError::Config {
            message: format!("invalid embed base URL {:?}: {e}", config.embed_base_url),
        })?;
        Ok(Self::from_catalog(catalog, embed_base, config.identity.clone()))
    }

    /// Wrap an already-built catalog client.
    pub fn from_catalog(
        catalog: CatalogClient,
        embed_base: Url,
        identity: Option<IdentityConfig>,
    ) -> Self {
        Self {
            catalog,
            embed_base,
            identity,
        }
    }

    pub fn catalog(&self) -> &CatalogClient {
        &self.catalog
    }

    // ── Report details ───────────────────────────────────────────

    pub async fn report_pages(
        &self,
        workspace_id: &WorkspaceId,
        report_id: &ReportId,
    ) -> Result<Vec<ReportPage>, CoreError> {
        let pages = self
            .catalog
            .list_report_pages(workspace_id.as_str(), report_id.as_str())
            .await?;
        Ok(pages.into_iter().map(ReportPage::from).collect())
    }

    pub async fn report_parameters(
        &self,
        workspace_id: &WorkspaceId,
        report_id: &ReportId,
    ) -> Result<Vec<ReportParameter>, CoreError> {
        let params = self
            .catalog
            .list_report_parameters(workspace_id.as_str(), report_id.as_str())
            .await?;
        Ok(params.into_iter().map(ReportParameter::from).collect())
    }

    // ── Datasets ─────────────────────────────────────────────────

    pub async fn list_datasets(
        &self,
        workspace_id: &WorkspaceId,
    ) -> Result<Vec<Dataset>, CoreError> {
        let datasets = self.catalog.list_datasets(workspace_id.as_str()).await?;
        Ok(datasets.into_iter().map(Dataset::from).collect())
    }

    pub async fn refresh_dataset(
        &self,
        workspace_id: &WorkspaceId,
        dataset_id: &str,
    ) -> Result<(), CoreError> {
        self.catalog
            .refresh_dataset(workspace_id.as_str(), dataset_id)
            .await?;
        Ok(())
    }

    pub async fn refresh_history(
        &self,
        workspace_id: &WorkspaceId,
        dataset_id: &str,
        top: Option<u32>,
    ) -> Result<Vec<RefreshRecord>, CoreError> {
        let history = self
            .catalog
            .refresh_history(workspace_id.as_str(), dataset_id, top)
            .await?;
        Ok(history.into_iter().map(RefreshRecord::from).collect())
    }

    // ── Status ───────────────────────────────────────────────────

    /// Try to obtain a bearer token and report the outcome. Never fails;
    /// authentication problems land in [`ServiceStatus::error`].
    pub async fn service_status(&self) -> ServiceStatus {
        let provider = self.catalog.token_provider();
        let (auth_mode, tenant_id, client_id) = match provider.credentials() {
            Credentials::ServicePrincipal(sp) => (
                "service-principal",
                Some(sp.tenant_id.clone()),
                Some(sp.client_id.clone()),
            ),
            Credentials::StaticToken(_) => ("access-token", None, None),
        };

        let (authenticated, token_expires_at, error) = match provider.bearer().await {
            Ok(token) => (true, token.expires_at(), None),
            Err(e) => (false, None, Some(CoreError::from(e).to_string())),
        };

        ServiceStatus {
            service_url: self.catalog.base_url().to_string(),
            auth_mode,
            tenant_id,
            client_id,
            authenticated,
            token_expires_at,
            error,
        }
    }
}

#[async_trait]
impl ResourceClient for HttpResourceClient {
    async fn list_workspaces(&self) -> Result<Vec<Workspace>, CoreError> {
        let workspaces = self.catalog.list_workspaces().await?;
        Ok(workspaces.into_iter().map(Workspace::from).collect())
    }

    async fn list_reports(&self, workspace_id: &WorkspaceId) -> Result<Vec<Report>, CoreError> {
        let reports = self.catalog.list_reports(workspace_id.as_str()).await?;
        Ok(reports
            .into_iter()
            .map(|r| Report::from_response(r, workspace_id))
            .collect())
    }

    async fn issue_embed_configuration(
        &self,
        workspace_id: &WorkspaceId,
        report_id: &ReportId,
        settings: &DisplaySettings,
    ) -> Result<EmbedConfiguration, CoreError> {
        let ws = workspace_id.as_str();
        let r = report_id.as_str();
        let display_url = compose_display_url(&self.embed_base, workspace_id, report_id, settings)?;

        // An effective identity must name the report's dataset, so the lookup
        // has to finish first. Without one, both calls run concurrently.
        let (token, report) = if let Some(identity) = &self.identity {
            let report = self.catalog.get_report(ws, r).await;
            let datasets = report
                .as_ref()
                .ok()
                .and_then(|rep| rep.dataset_id.clone())
                .into_iter()
                .collect();
            let request = GenerateTokenRequest::view(Some(EffectiveIdentity {
                username: identity.username.clone(),
                roles: identity.roles.clone(),
                datasets,
            }));
            (self.catalog.generate_report_token(ws, r, &request).await, report)
        } else {
            let request = GenerateTokenRequest::view(None);
            tokio::join!(
                self.catalog.generate_report_token(ws, r, &request),
                self.catalog.get_report(ws, r),
            )
        };

        let token = token?;
        let (report_name, report_type) = match report {
            Ok(rep) => (
                rep.name,
                rep.report_type
                    .unwrap_or_else(|| DEFAULT_REPORT_TYPE.to_owned()),
            ),
            Err(e) => {
                if e.is_not_found() {
                    debug!(report_id = r, "report lookup found nothing, using defaults");
                } else {
                    warn!(report_id = r, error = %e, "report lookup failed, using defaults");
                }
                (DEFAULT_REPORT_NAME.to_owned(), DEFAULT_REPORT_TYPE.to_owned())
            }
        };

        let config = EmbedConfiguration {
            workspace_id: workspace_id.clone(),
            report_id: report_id.clone(),
            display_url,
            token_id: token.token_id.map(|id| id.to_string()),
            issued_at: Utc::now(),
            expires_at: token.expiration,
            access_token: SecretString::from(token.token),
            report_name,
            report_type,
        };
        config.check_lifetime()?;

        debug!(
            workspace_id = ws,
            report_id = r,
            expires_at = %config.expires_at,
            "embed configuration issued"
        );
        Ok(config)
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

fn api_credentials(credentials: &ServiceCredentials) -> Credentials {
    match credentials {
        ServiceCredentials::ServicePrincipal {
            tenant_id,
            client_id,
            client_secret,
        } => Credentials::ServicePrincipal(ServicePrincipal {
            tenant_id: tenant_id.clone(),
            client_id: client_id.clone(),
            client_secret: client_secret.clone(),
        }),
        ServiceCredentials::AccessToken(token) => Credentials::StaticToken(token.clone()),
    }
}

/// `{base}/reportEmbed?reportId=..&groupId=..` with the display settings
/// bound as query parameters.
pub fn compose_display_url(
    base: &Url,
    workspace_id: &WorkspaceId,
    report_id: &ReportId,
    settings: &DisplaySettings,
) -> Result<Url, CoreError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| CoreError::Config {
            message: format!("embed base URL cannot carry a path: {base}"),
        })?
        .pop_if_empty()
        .push("reportEmbed");
    url.query_pairs_mut()
        .append_pair("reportId", report_id.as_str())
        .append_pair("groupId", workspace_id.as_str())
        .append_pair("filterPaneEnabled", bool_param(settings.filter_pane_enabled))
        .append_pair("navContentPaneEnabled", bool_param(settings.navigation_enabled))
        .append_pair("theme", &settings.theme.to_string());
    Ok(url)
}

fn bool_param(value: bool) -> &'static str {
    if value { "true" } else { "false" }
}
