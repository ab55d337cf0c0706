// Catalog service HTTP client
//
// Wraps `reqwest::Client` with bearer-token injection, segment-safe URL
// construction, and error-envelope parsing. Endpoint groups (workspaces,
// embed tokens, datasets) are implemented as inherent methods in sibling
// files to keep this module focused on transport mechanics.

use secrecy::ExposeSecret;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::auth::{Credentials, TokenProvider};
use crate::catalog::types::ErrorEnvelope;
use crate::error::Error;
use crate::transport::{TransportConfig, join_segments};

/// Async client for the report catalog and token service.
///
/// All paths are relative to the service base URL
/// (e.g. `https://api.powerbi.com/v1.0/myorg`).
pub struct CatalogClient {
    http: reqwest::Client,
    base_url: Url,
    auth: TokenProvider,
}

impl CatalogClient {
    // ── Constructors ─────────────────────────────────────────────────

    /// Build from a transport config. The same HTTP client is shared by
    /// the token provider.
    pub fn new(
        base_url: &str,
        authority_url: &str,
        credentials: Credentials,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Self::from_reqwest(base_url, authority_url, http, credentials)
    }

    /// Wrap an existing `reqwest::Client`.
    pub fn from_reqwest(
        base_url: &str,
        authority_url: &str,
        http: reqwest::Client,
        credentials: Credentials,
    ) -> Result<Self, Error> {
        let base_url = Url::parse(base_url)?;
        let authority = Url::parse(authority_url)?;
        let auth = TokenProvider::new(http.clone(), authority, credentials);
        Ok(Self {
            http,
            base_url,
            auth,
        })
    }

    /// The service base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The token provider (for status reporting and explicit auth checks).
    pub fn token_provider(&self) -> &TokenProvider {
        &self.auth
    }

    // ── URL builder ──────────────────────────────────────────────────

    pub(crate) fn url(&self, segments: &[&str]) -> Result<Url, Error> {
        join_segments(&self.base_url, segments)
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Attach the bearer token and send. A 401 drops the cached token so
    /// the next request re-authenticates.
    async fn send(&self, builder: reqwest::RequestBuilder) -> Result<reqwest::Response, Error> {
        let token = self.auth.bearer().await?;
        let resp = builder
            .bearer_auth(token.secret().expose_secret())
            .send()
            .await?;

        if resp.status() == reqwest::StatusCode::UNAUTHORIZED {
            self.auth.invalidate().await;
        }
        Ok(resp)
    }

    pub(crate) async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T, Error> {
        debug!("GET {url}");
        let resp = self.send(self.http.get(url)).await?;
        Self::handle_response(resp).await
    }

    pub(crate) async fn get_with_params<T: DeserializeOwned>(
        &self,
        url: Url,
        params: &[(&str, String)],
    ) -> Result<T, Error> {
        debug!("GET {url} params={params:?}");
        let resp = self.send(self.http.get(url).query(params)).await?;
        Self::handle_response(resp).await
    }

    pub(crate) async fn post<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        url: Url,
        body: &B,
    ) -> Result<T, Error> {
        debug!("POST {url}");
        let resp = self.send(self.http.post(url).json(body)).await?;
        Self::handle_response(resp).await
    }

    pub(crate) async fn post_no_response(&self, url: Url) -> Result<(), Error> {
        debug!("POST {url}");
        let resp = self.send(self.http.post(url)).await?;
        Self::handle_empty(resp).await
    }

    // ── Response handling ────────────────────────────────────────────

    async fn handle_response<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
        let status = resp.status();
        if status.is_success() {
            let body = resp.text().await?;
            serde_json::from_str(&body).map_err(|e| {
                let preview: String = body.chars().take(200).collect();
                Error::Deserialization {
                    message: format!("{e} (body preview: {preview:?})"),
                    body,
                }
            })
        } else {
            Err(Self::parse_error(status, resp).await)
        }
    }

    async fn handle_empty(resp: reqwest::Response) -> Result<(), Error> {
        let status = resp.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(Self::parse_error(status, resp).await)
        }
    }

    async fn parse_error(status: reqwest::StatusCode, resp: reqwest::Response) -> Error {
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Error::Authentication {
                message: "access token rejected by the service".into(),
            };
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = resp
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(0);
            return Error::RateLimited { retry_after_secs };
        }

        let raw = resp.text().await.unwrap_or_default();

        if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(&raw) {
            Error::Api {
                status: status.as_u16(),
                message: envelope
                    .error
                    .message
                    .or_else(|| envelope.error.code.clone())
                    .unwrap_or_else(|| status.to_string()),
                code: envelope.error.code,
            }
        } else {
            Error::Api {
                status: status.as_u16(),
                message: if raw.is_empty() {
                    status.to_string()
                } else {
                    raw
                },
                code: None,
            }
        }
    }
}
