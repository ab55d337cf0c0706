// Shared transport configuration for building reqwest::Client instances.
//
// The catalog client and the token provider share TLS and timeout settings
// through this module, along with the path-segment URL builder.

use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::error::Error;

const USER_AGENT: &str = concat!("embedctl/", env!("CARGO_PKG_VERSION"));

/// TLS verification mode (api-level mirror of core's TlsVerification).
#[derive(Debug, Clone, Default)]
pub enum TlsMode {
    /// Use the bundled webpki roots.
    #[default]
    System,
    /// Additionally trust a custom CA certificate from the given PEM file
    /// (corporate TLS-inspecting proxies).
    CustomCa(PathBuf),
}

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub tls: TlsMode,
    pub timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            tls: TlsMode::System,
            timeout: Duration::from_secs(30),
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, Error> {
        let mut builder = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(USER_AGENT);

        if let TlsMode::CustomCa(path) = &self.tls {
            let cert_pem = std::fs::read(path)
                .map_err(|e| Error::Tls(format!("failed to read CA cert: {e}")))?;
            let cert = reqwest::Certificate::from_pem(&cert_pem)
                .map_err(|e| Error::Tls(format!("invalid CA cert: {e}")))?;
            builder = builder.add_root_certificate(cert);
        }

        builder
            .build()
            .map_err(|e| Error::Tls(format!("failed to build HTTP client: {e}")))
    }
}

/// Append percent-encoded path segments to `base`.
///
/// A trailing slash on the base is ignored, so `https://host/v1.0/myorg/`
/// and `https://host/v1.0/myorg` produce the same endpoint URLs.
pub(crate) fn join_segments(base: &Url, segments: &[&str]) -> Result<Url, Error> {
    let mut url = base.clone();
    {
        let mut path = url
            .path_segments_mut()
            .map_err(|()| Error::UnsupportedBaseUrl(base.to_string()))?;
        path.pop_if_empty();
        path.extend(segments);
    }
    Ok(url)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn join_ignores_trailing_slash() {
        let a = Url::parse("https://api.example.com/v1.0/myorg/").unwrap();
        let b = Url::parse("https://api.example.com/v1.0/myorg").unwrap();
        let left = join_segments(&a, &["groups"]).unwrap();
        let right = join_segments(&b, &["groups"]).unwrap();
        assert_eq!(left, right);
        assert_eq!(left.as_str(), "https://api.example.com/v1.0/myorg/groups");
    }

    #[test]
    fn join_percent_encodes_segments() {
        let base = Url::parse("https://api.example.com/").unwrap();
        let url = join_segments(&base, &["groups", "a b/c", "reports"]).unwrap();
        assert_eq!(url.path(), "/groups/a%20b%2Fc/reports");
    }

    #[test]
    fn join_rejects_opaque_base() {
        let base = Url::parse("mailto:ops@example.com").unwrap();
        assert!(matches!(
            join_segments(&base, &["groups"]),
            Err(Error::UnsupportedBaseUrl(_))
        ));
    }
}
