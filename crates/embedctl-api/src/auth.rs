// Service authentication
//
// Bearer tokens for the catalog service come from one of two places: an
// OAuth2 client-credentials grant against the identity authority (service
// principal), or a pre-issued token handed in by the caller. Acquired tokens
// are cached and reused until they approach expiry.

use chrono::{DateTime, TimeDelta, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::transport::join_segments;

/// OAuth2 scope granting access to the reporting REST API.
pub const SERVICE_SCOPE: &str = "https://analysis.windows.net/powerbi/api/.default";

/// Tokens this close to expiry are treated as already expired.
const EXPIRY_SKEW_SECS: i64 = 60;

/// An app registration authorized to call the service on its own behalf.
#[derive(Debug, Clone)]
pub struct ServicePrincipal {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: SecretString,
}

/// How the client obtains bearer tokens.
#[derive(Debug, Clone)]
pub enum Credentials {
    /// Client-credentials grant, re-run whenever the cached token expires.
    ServicePrincipal(ServicePrincipal),
    /// Caller-supplied token, used as-is and never refreshed.
    StaticToken(SecretString),
}

/// A bearer token plus its expiry (unknown for static tokens).
#[derive(Debug, Clone)]
pub struct AccessToken {
    secret: SecretString,
    expires_at: Option<DateTime<Utc>>,
}

impl AccessToken {
    pub fn new(secret: SecretString, expires_at: Option<DateTime<Utc>>) -> Self {
        Self { secret, expires_at }
    }

    pub fn secret(&self) -> &SecretString {
        &self.secret
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// `true` if the token can still be presented at `now` with the expiry
    /// skew applied. Tokens without a known expiry are always fresh.
    pub fn is_fresh_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at
            .is_none_or(|exp| now + TimeDelta::seconds(EXPIRY_SKEW_SECS) < exp)
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Deserialize)]
struct TokenErrorResponse {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

/// Hands out bearer tokens, acquiring and caching them as needed.
pub struct TokenProvider {
    http: reqwest::Client,
    authority: Url,
    credentials: Credentials,
    cached: Mutex<Option<AccessToken>>,
}

impl TokenProvider {
    pub fn new(http: reqwest::Client, authority: Url, credentials: Credentials) -> Self {
        Self {
            http,
            authority,
            credentials,
            cached: Mutex::new(None),
        }
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Return a token valid for at least the expiry skew, acquiring a new
    /// one when the cache is empty or stale.
    pub async fn bearer(&self) -> Result<AccessToken, Error> {
        let principal = match &self.credentials {
            Credentials::StaticToken(secret) => return Ok(AccessToken::new(secret.clone(), None)),
            Credentials::ServicePrincipal(principal) => principal,
        };

        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.is_fresh_at(Utc::now()) {
                return Ok(token.clone());
            }
            debug!("cached service token is stale, re-acquiring");
        }

        let fresh = self.acquire(principal).await?;
        *cached = Some(fresh.clone());
        Ok(fresh)
    }

    /// The currently cached token, if any, without acquiring one.
    pub async fn cached(&self) -> Option<AccessToken> {
        self.cached.lock().await.clone()
    }

    /// Drop the cached token so the next call re-authenticates.
    pub async fn invalidate(&self) {
        *self.cached.lock().await = None;
    }

    async fn acquire(&self, principal: &ServicePrincipal) -> Result<AccessToken, Error> {
        let url = join_segments(
            &self.authority,
            &[principal.tenant_id.as_str(), "oauth2", "v2.0", "token"],
        )?;
        debug!(client_id = %principal.client_id, "requesting service token at {url}");

        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", principal.client_id.as_str()),
            ("client_secret", principal.client_secret.expose_secret()),
            ("scope", SERVICE_SCOPE),
        ];

        let resp = self.http.post(url).form(&form).send().await?;
        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            let detail = serde_json::from_str::<TokenErrorResponse>(&body)
                .ok()
                .and_then(|e| e.error_description.or(e.error))
                .unwrap_or(body);
            return Err(Error::Authentication {
                message: format!("token request failed (HTTP {status}): {detail}"),
            });
        }

        let parsed: TokenResponse =
            serde_json::from_str(&body).map_err(|e| Error::Deserialization {
                message: format!("token response: {e}"),
                body: String::new(),
            })?;

        let expires_at = token_expiry(Utc::now(), parsed.expires_in)?;
        debug!(%expires_at, "service token acquired");
        Ok(AccessToken::new(
            SecretString::from(parsed.access_token),
            Some(expires_at),
        ))
    }
}

/// Absolute expiry for an `expires_in` lifetime. Non-positive or
/// out-of-range lifetimes are rejected.
fn token_expiry(now: DateTime<Utc>, expires_in: i64) -> Result<DateTime<Utc>, Error> {
    if expires_in <= 0 {
        return Err(Error::Authentication {
            message: format!("token response carries a non-positive lifetime ({expires_in}s)"),
        });
    }
    TimeDelta::try_seconds(expires_in)
        .and_then(|lifetime| now.checked_add_signed(lifetime))
        .ok_or_else(|| Error::Deserialization {
            message: format!("token lifetime out of range: {expires_in}s"),
            body: String::new(),
        })
}
