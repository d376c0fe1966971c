// Topology source HTTP client
//
// Wraps `reqwest::Client` with source-specific URL construction and
// envelope unwrapping. Each endpoint method returns raw wire types; the
// domain normalization lives in `topofuse-core`'s adapters.

use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::models::{
    CloudSwitch, DetectedDevice, FirewallResponse, ManagedSwitch, ScannerEnvelope, ScannerHost,
};
use crate::transport::{SourceAuth, TransportConfig};

const MANAGED_SWITCH_PATH: &str = "api/v2/monitor/switch-controller/managed-switch/status";
const DETECTED_DEVICE_PATH: &str = "api/v2/monitor/switch-controller/detected-device";
const CLOUD_SWITCH_PATH: &str = "api/v1/switches";
const SCANNER_HOSTS_PATH: &str = "api/v1/hosts";

/// Raw HTTP client for one topology source.
///
/// The same client type serves every source family; which endpoint is
/// called decides the response shape.
#[derive(Debug, Clone)]
pub struct SourceClient {
    http: reqwest::Client,
    base_url: Url,
}

impl SourceClient {
    /// Create a client for the source rooted at `base_url`.
    pub fn new(base_url: Url, auth: &SourceAuth, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client_with_auth(auth)?;
        Ok(Self::with_client(http, base_url))
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self {
            http,
            base_url: with_trailing_slash(base_url),
        }
    }

    /// The source base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── Endpoints ────────────────────────────────────────────────────

    /// Managed switches with their port tables.
    pub async fn managed_switches(&self) -> Result<Vec<ManagedSwitch>, Error> {
        let env: FirewallResponse<ManagedSwitch> = self.get_json(MANAGED_SWITCH_PATH).await?;
        Ok(env.results)
    }

    /// MAC addresses learned on managed switch ports.
    pub async fn detected_devices(&self) -> Result<Vec<DetectedDevice>, Error> {
        let env: FirewallResponse<DetectedDevice> = self.get_json(DETECTED_DEVICE_PATH).await?;
        Ok(env.results)
    }

    /// Switches managed by the cloud controller.
    pub async fn cloud_switches(&self) -> Result<Vec<CloudSwitch>, Error> {
        self.get_json(CLOUD_SWITCH_PATH).await
    }

    /// Hosts found by the discovery scanner.
    pub async fn scanner_hosts(&self) -> Result<Vec<ScannerHost>, Error> {
        let env: ScannerEnvelope = self.get_json(SCANNER_HOSTS_PATH).await?;
        Ok(env.into_hosts())
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Send a GET request for `path` (relative to the base URL) and decode JSON.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        let url = self.base_url.join(path)?;
        debug!("GET {}", url);

        let resp = self.http.get(url).send().await.map_err(Error::Transport)?;
        let status = resp.status();

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(Error::Authentication {
                message: format!("source rejected credentials (HTTP {status})"),
            });
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(Error::RateLimited {
                retry_after_secs: retry_after_secs(resp.headers()),
            });
        }

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Status {
                status: status.as_u16(),
                body: preview(&body).to_owned(),
            });
        }

        let body = resp.text().await.map_err(Error::Transport)?;
        serde_json::from_str(&body).map_err(|e| Error::Deserialization {
            message: format!("{e} (body preview: {:?})", preview(&body)),
            body,
        })
    }
}

/// `Url::join` replaces the last path segment unless the base ends in `/`.
pub(crate) fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

/// Parse a `Retry-After` header given in seconds. HTTP-date values are ignored.
pub(crate) fn retry_after_secs(headers: &reqwest::header::HeaderMap) -> u64 {
    headers
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(0)
}

pub(crate) fn preview(body: &str) -> &str {
    let mut end = body.len().min(200);
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_is_added_once() {
        let url = with_trailing_slash(Url::parse("https://fw.local/base").unwrap());
        assert_eq!(url.as_str(), "https://fw.local/base/");
        let url = with_trailing_slash(url);
        assert_eq!(url.as_str(), "https://fw.local/base/");
    }

    #[test]
    fn preview_respects_char_boundaries() {
        let body = "é".repeat(150);
        assert!(preview(&body).len() <= 200);
    }
}
