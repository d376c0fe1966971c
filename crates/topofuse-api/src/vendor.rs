// MAC vendor lookup client
//
// Queries an external OUI registry (`GET {base}/{OUI}`). The service
// answers with either a plain-text vendor name or a small JSON object,
// depending on the provider.

use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::source::{preview, retry_after_secs, with_trailing_slash};
use crate::transport::TransportConfig;

pub const DEFAULT_LOOKUP_URL: &str = "https://api.macvendors.com/";

/// JSON field names providers use for the organisation name.
const VENDOR_FIELDS: &[&str] = &["company", "vendor", "name", "organization"];

/// HTTP client for the external vendor-lookup service.
#[derive(Debug, Clone)]
pub struct VendorLookupClient {
    http: reqwest::Client,
    base_url: Url,
}

impl VendorLookupClient {
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self::with_client(http, base_url))
    }

    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self {
            http,
            base_url: with_trailing_slash(base_url),
        }
    }

    /// Look up the vendor for a 6-hex-digit OUI (e.g. `"B827EB"`).
    ///
    /// Returns `Ok(None)` when the registry has no entry. HTTP 429 maps to
    /// [`Error::RateLimited`] so the caller can start a cooldown.
    pub async fn lookup(&self, oui_hex: &str) -> Result<Option<String>, Error> {
        let url = self.base_url.join(oui_hex)?;
        debug!("GET {}", url);

        let resp = self.http.get(url).send().await.map_err(Error::Transport)?;
        let status = resp.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(Error::RateLimited {
                retry_after_secs: retry_after_secs(resp.headers()),
            });
        }
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(Error::Authentication {
                message: format!("vendor lookup rejected request (HTTP {status})"),
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
        parse_vendor_body(&body)
    }
}

/// Extract a vendor name from a plain-text or JSON response body.
fn parse_vendor_body(body: &str) -> Result<Option<String>, Error> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    if !trimmed.starts_with('{') {
        return Ok(Some(trimmed.to_owned()));
    }

    let value: serde_json::Value =
        serde_json::from_str(trimmed).map_err(|e| Error::Deserialization {
            message: e.to_string(),
            body: body.to_owned(),
        })?;

    let vendor = VENDOR_FIELDS
        .iter()
        .filter_map(|field| value.get(*field).and_then(serde_json::Value::as_str))
        .map(str::trim)
        .find(|v| !v.is_empty())
        .map(str::to_owned);

    Ok(vendor)
}
