// Shared transport configuration for building reqwest::Client instances.
//
// Source clients and the vendor-lookup client share TLS and timeout
// settings through this module, avoiding duplicated builder logic.

use std::path::PathBuf;
use std::time::Duration;

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use secrecy::{ExposeSecret, SecretString};

use crate::error::Error;

const USER_AGENT: &str = concat!("topofuse/", env!("CARGO_PKG_VERSION"));

/// TLS verification mode.
#[derive(Debug, Clone, Default)]
pub enum TlsMode {
    /// Use the system certificate store.
    #[default]
    System,
    /// Use a custom CA certificate from the given PEM file.
    CustomCa(PathBuf),
    /// Accept any certificate (self-signed appliances).
    DangerAcceptInvalid,
}

/// How a source expects to be authenticated.
#[derive(Debug, Clone, Default)]
pub enum SourceAuth {
    #[default]
    None,
    /// `Authorization: Bearer <token>`.
    Bearer(SecretString),
    /// Token in a custom header (e.g. `X-Cisco-Meraki-API-Key`).
    Header { name: String, value: SecretString },
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
            timeout: Duration::from_secs(10),
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, Error> {
        self.build_client_with_headers(HeaderMap::new())
    }

    /// Build a `reqwest::Client` that sends `auth` on every request.
    pub fn build_client_with_auth(&self, auth: &SourceAuth) -> Result<reqwest::Client, Error> {
        let mut headers = HeaderMap::new();
        match auth {
            SourceAuth::None => {}
            SourceAuth::Bearer(token) => {
                let mut value =
                    HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))
                        .map_err(|_| Error::Authentication {
                            message: "bearer token contains invalid header characters".into(),
                        })?;
                value.set_sensitive(true);
                headers.insert(AUTHORIZATION, value);
            }
            SourceAuth::Header { name, value } => {
                let name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| {
                    Error::Authentication {
                        message: format!("invalid auth header name: {name}"),
                    }
                })?;
                let mut value = HeaderValue::from_str(value.expose_secret()).map_err(|_| {
                    Error::Authentication {
                        message: "API key contains invalid header characters".into(),
                    }
                })?;
                value.set_sensitive(true);
                headers.insert(name, value);
            }
        }
        self.build_client_with_headers(headers)
    }

    fn build_client_with_headers(&self, headers: HeaderMap) -> Result<reqwest::Client, Error> {
        let mut builder = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(USER_AGENT)
            .default_headers(headers);

        match &self.tls {
            TlsMode::System => {}
            TlsMode::CustomCa(path) => {
                let cert_pem = std::fs::read(path)
                    .map_err(|e| Error::Tls(format!("failed to read CA cert: {e}")))?;
                let cert = reqwest::Certificate::from_pem(&cert_pem)
                    .map_err(|e| Error::Tls(format!("invalid CA cert: {e}")))?;
                builder = builder.add_root_certificate(cert);
            }
            TlsMode::DangerAcceptInvalid => {
                builder = builder.danger_accept_invalid_certs(true);
            }
        }

        builder
            .build()
            .map_err(|e| Error::Tls(format!("failed to build HTTP client: {e}")))
    }
}
