//! Configuration for the topofuse binary.
//!
//! TOML file + `TOPOFUSE_` environment overrides, credential resolution
//! (env → keyring → plaintext), and translation to the engine types in
//! `topofuse_core::config`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use topofuse_api::{SourceAuth, TlsMode, TransportConfig};
use topofuse_core::{
    EngineConfig, IdentityConfig, Oui, SourceConfig, SourceEndpoint, SourceKind, TopologyFilter,
};

const KEYRING_SERVICE: &str = "topofuse";
const ENV_PREFIX: &str = "TOPOFUSE_";
const REDACTED: &str = "<redacted>";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

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

fn invalid(field: impl Into<String>, reason: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        field: field.into(),
        reason: reason.into(),
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineSection,

    #[serde(default)]
    pub identity: IdentitySection,

    /// Named sources. Registered with the engine in name order.
    #[serde(default)]
    pub sources: BTreeMap<String, SourceSection>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineSection {
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,

    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,

    #[serde(default = "default_deadline")]
    pub deadline_secs: u64,

    #[serde(default)]
    pub include_cloud: bool,

    #[serde(default = "default_true")]
    pub include_scanner: bool,

    #[serde(default = "default_true")]
    pub resolve_identities: bool,
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            cache_ttl_secs: default_cache_ttl(),
            fetch_timeout_secs: default_fetch_timeout(),
            deadline_secs: default_deadline(),
            include_cloud: false,
            include_scanner: true,
            resolve_identities: true,
        }
    }
}

fn default_cache_ttl() -> u64 {
    30
}
fn default_fetch_timeout() -> u64 {
    10
}
fn default_deadline() -> u64 {
    20
}
fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IdentitySection {
    #[serde(default = "default_true")]
    pub online_lookup: bool,

    /// Vendor registry base URL. Unset means the public registry.
    pub lookup_url: Option<String>,

    #[serde(default = "default_requests_per_window")]
    pub requests_per_window: u32,

    #[serde(default = "default_window")]
    pub window_secs: u64,

    #[serde(default = "default_cooldown")]
    pub cooldown_secs: u64,

    #[serde(default = "default_cache_expiry_days")]
    pub cache_expiry_days: u64,

    /// Vendor cache file. Unset means the platform cache directory.
    pub cache_path: Option<PathBuf>,

    #[serde(default = "default_lookup_timeout")]
    pub timeout_secs: u64,

    /// Site-specific OUI → vendor overrides.
    #[serde(default)]
    pub vendors: BTreeMap<String, String>,
}

impl Default for IdentitySection {
    fn default() -> Self {
        Self {
            online_lookup: true,
            lookup_url: None,
            requests_per_window: default_requests_per_window(),
            window_secs: default_window(),
            cooldown_secs: default_cooldown(),
            cache_expiry_days: default_cache_expiry_days(),
            cache_path: None,
            timeout_secs: default_lookup_timeout(),
            vendors: BTreeMap::new(),
        }
    }
}

fn default_requests_per_window() -> u32 {
    1
}
fn default_window() -> u64 {
    1
}
fn default_cooldown() -> u64 {
    60
}
fn default_cache_expiry_days() -> u64 {
    30
}
fn default_lookup_timeout() -> u64 {
    5
}

/// One `[sources.<name>]` table.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SourceSection {
    /// `switch_controller`, `snmp_static`, `detected_devices`,
    /// `cloud_switch`, or `scanner`.
    pub kind: String,

    /// Base URL for HTTP sources.
    pub url: Option<String>,

    /// Inventory file for `snmp_static`.
    pub path: Option<PathBuf>,

    /// API token (plaintext; prefer keyring or env var).
    pub token: Option<String>,

    /// Environment variable holding the API token.
    pub token_env: Option<String>,

    /// Send the token in this header instead of `Authorization: Bearer`.
    pub token_header: Option<String>,

    /// Accept self-signed certificates.
    #[serde(default)]
    pub insecure: bool,

    /// Path to a custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    /// Per-request HTTP timeout.
    pub timeout_secs: Option<u64>,
}

// ── Paths ───────────────────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("io", "topofuse", "topofuse")
}

fn dirs_fallback(kind: &str) -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(kind);
    p.push("topofuse");
    p
}

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    project_dirs().map_or_else(
        || dirs_fallback(".config").join("config.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Default location of the persistent vendor cache.
pub fn vendor_cache_path() -> PathBuf {
    project_dirs().map_or_else(
        || dirs_fallback(".cache").join("vendors.json"),
        |dirs| dirs.cache_dir().join("vendors.json"),
    )
}

// ── Loading ─────────────────────────────────────────────────────────

fn base_figment() -> Figment {
    Figment::new().merge(Serialized::defaults(Config::default()))
}

fn extract(figment: Figment) -> Result<Config, ConfigError> {
    let config: Config = figment.extract()?;
    config.validate()?;
    Ok(config)
}

/// Load from `path` (or the default path) and the environment.
///
/// Nested keys use a double underscore:
/// `TOPOFUSE_ENGINE__CACHE_TTL_SECS=5`. A missing file is not an error.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.map_or_else(config_path, Path::to_path_buf);
    extract(
        base_figment()
            .merge(Toml::file(&path))
            .merge(Env::prefixed(ENV_PREFIX).split("__")),
    )
}

impl Config {
    /// Parse a TOML document without consulting the environment.
    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        extract(base_figment().merge(Toml::string(toml)))
    }

    /// A copy safe to display: every plaintext token is replaced.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        for source in copy.sources.values_mut() {
            if source.token.is_some() {
                source.token = Some(REDACTED.into());
            }
        }
        copy
    }

    pub fn to_redacted_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(&self.redacted())?)
    }

    /// Check everything that does not need credentials.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.engine_config()?;
        self.identity_config()?;
        for (name, source) in &self.sources {
            source.endpoint_shape(name)?;
        }
        Ok(())
    }

    pub fn topology_filter(&self) -> TopologyFilter {
        TopologyFilter {
            include_cloud: self.engine.include_cloud,
            include_scanner: self.engine.include_scanner,
            resolve_identities: self.engine.resolve_identities,
        }
    }

    pub fn engine_config(&self) -> Result<EngineConfig, ConfigError> {
        let e = &self.engine;
        Ok(EngineConfig {
            cache_ttl: Duration::from_secs(e.cache_ttl_secs),
            fetch_timeout: non_zero_secs("engine.fetch_timeout_secs", e.fetch_timeout_secs)?,
            deadline: non_zero_secs("engine.deadline_secs", e.deadline_secs)?,
        })
    }

    pub fn identity_config(&self) -> Result<IdentityConfig, ConfigError> {
        let id = &self.identity;

        let lookup_url = id
            .lookup_url
            .as_deref()
            .map(|raw| parse_url("identity.lookup_url", raw))
            .transpose()?;

        if id.online_lookup && id.requests_per_window == 0 {
            return Err(invalid(
                "identity.requests_per_window",
                "must be at least 1 when online_lookup is enabled",
            ));
        }

        let cache_expiry = id
            .cache_expiry_days
            .checked_mul(24 * 60 * 60)
            .map(Duration::from_secs)
            .ok_or_else(|| invalid("identity.cache_expiry_days", "value too large"))?;

        let local_vendors = id
            .vendors
            .iter()
            .map(|(key, vendor)| {
                let oui = key
                    .parse::<Oui>()
                    .map_err(|e| invalid(format!("identity.vendors.{key}"), e.to_string()))?;
                Ok((oui, vendor.clone()))
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        Ok(IdentityConfig {
            online_lookup: id.online_lookup,
            lookup_url,
            requests_per_window: id.requests_per_window,
            window: non_zero_secs("identity.window_secs", id.window_secs)?,
            cooldown: Duration::from_secs(id.cooldown_secs),
            cache_expiry,
            cache_path: Some(id.cache_path.clone().unwrap_or_else(vendor_cache_path)),
            local_vendors,
            timeout: non_zero_secs("identity.timeout_secs", id.timeout_secs)?,
        })
    }

    /// Every configured source with credentials resolved from the system
    /// environment and keyring.
    pub fn source_configs(&self) -> Result<Vec<SourceConfig>, ConfigError> {
        self.source_configs_with(&SystemCredentials)
    }

    pub fn source_configs_with(
        &self,
        store: &dyn CredentialStore,
    ) -> Result<Vec<SourceConfig>, ConfigError> {
        self.sources
            .iter()
            .map(|(name, source)| source.to_source_config(name, store))
            .collect()
    }
}

fn non_zero_secs(field: &str, secs: u64) -> Result<Duration, ConfigError> {
    if secs == 0 {
        return Err(invalid(field, "must be greater than zero"));
    }
    Ok(Duration::from_secs(secs))
}

fn parse_url(field: &str, raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw).map_err(|e| invalid(field, format!("invalid URL '{raw}': {e}")))
}

// ── Source translation ──────────────────────────────────────────────

enum EndpointShape<'a> {
    Http(Url),
    File(&'a Path),
}

impl SourceSection {
    fn kind(&self, name: &str) -> Result<SourceKind, ConfigError> {
        self.kind.parse().map_err(|_| {
            invalid(
                format!("sources.{name}.kind"),
                format!(
                    "expected one of switch_controller, snmp_static, detected_devices, \
                     cloud_switch, scanner; got '{}'",
                    self.kind
                ),
            )
        })
    }

    fn endpoint_shape(&self, name: &str) -> Result<EndpointShape<'_>, ConfigError> {
        if self.kind(name)? == SourceKind::SnmpStatic {
            let path = self
                .path
                .as_deref()
                .ok_or_else(|| invalid(format!("sources.{name}.path"), "required for snmp_static"))?;
            return Ok(EndpointShape::File(path));
        }
        let raw = self
            .url
            .as_deref()
            .ok_or_else(|| invalid(format!("sources.{name}.url"), "required for HTTP sources"))?;
        let url = parse_url(&format!("sources.{name}.url"), raw)?;
        if self.timeout_secs == Some(0) {
            return Err(invalid(
                format!("sources.{name}.timeout_secs"),
                "must be greater than zero",
            ));
        }
        Ok(EndpointShape::Http(url))
    }

    fn to_source_config(
        &self,
        name: &str,
        store: &dyn CredentialStore,
    ) -> Result<SourceConfig, ConfigError> {
        let kind = self.kind(name)?;
        let endpoint = match self.endpoint_shape(name)? {
            EndpointShape::File(path) => SourceEndpoint::File(path.to_path_buf()),
            EndpointShape::Http(url) => {
                let auth = match (resolve_token(self, name, store), &self.token_header) {
                    (None, _) => SourceAuth::None,
                    (Some(token), None) => SourceAuth::Bearer(token),
                    (Some(token), Some(header)) => SourceAuth::Header {
                        name: header.clone(),
                        value: token,
                    },
                };
                let tls = if self.insecure {
                    TlsMode::DangerAcceptInvalid
                } else if let Some(ref ca) = self.ca_cert {
                    TlsMode::CustomCa(ca.clone())
                } else {
                    TlsMode::System
                };
                let mut transport = TransportConfig {
                    tls,
                    ..TransportConfig::default()
                };
                if let Some(secs) = self.timeout_secs {
                    transport.timeout = Duration::from_secs(secs);
                }
                SourceEndpoint::Http {
                    url,
                    auth,
                    transport,
                }
            }
        };
        Ok(SourceConfig {
            name: name.to_owned(),
            kind,
            endpoint,
        })
    }
}

// ── Credential resolution ───────────────────────────────────────────

/// Where secrets come from. Swappable so resolution can be tested without
/// touching the process environment or the OS keyring.
pub trait CredentialStore {
    fn env(&self, var: &str) -> Option<String>;
    fn keyring(&self, source: &str) -> Option<String>;
}

/// Process environment + OS keyring (service `topofuse`, user `<source>/token`).
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemCredentials;

impl CredentialStore for SystemCredentials {
    fn env(&self, var: &str) -> Option<String> {
        std::env::var(var).ok()
    }

    fn keyring(&self, source: &str) -> Option<String> {
        keyring::Entry::new(KEYRING_SERVICE, &format!("{source}/token"))
            .ok()?
            .get_password()
            .ok()
    }
}

/// Resolve a source token. `None` means the source is unauthenticated.
pub fn resolve_token(
    source: &SourceSection,
    name: &str,
    store: &dyn CredentialStore,
) -> Option<SecretString> {
    // 1. Source's token_env → env var lookup
    if let Some(ref var) = source.token_env {
        if let Some(val) = store.env(var) {
            return Some(SecretString::from(val));
        }
    }

    // 2. System keyring
    if let Some(secret) = store.keyring(name) {
        return Some(SecretString::from(secret));
    }

    // 3. Plaintext in config
    source.token.clone().map(SecretString::from)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use pretty_assertions::assert_eq;
    use secrecy::ExposeSecret;

    use super::*;

    #[derive(Default)]
    struct FakeCredentials {
        env: HashMap<String, String>,
        keyring: HashMap<String, String>,
    }

    impl CredentialStore for FakeCredentials {
        fn env(&self, var: &str) -> Option<String> {
            self.env.get(var).cloned()
        }
        fn keyring(&self, source: &str) -> Option<String> {
            self.keyring.get(source).cloned()
        }
    }

    const SAMPLE: &str = r#"
        [engine]
        cache_ttl_secs = 5
        include_cloud = true

        [identity]
        online_lookup = false
        cache_path = "/tmp/vendors.json"

        [identity.vendors]
        "AA:BB:CC" = "Acme Sensors"

        [sources.fw]
        kind = "switch_controller"
        url = "https://fw.example.net"
        token = "plain"
        insecure = true

        [sources.inventory]
        kind = "snmp_static"
        path = "/var/lib/topofuse/inventory.json"

        [sources.meraki]
        kind = "cloud_switch"
        url = "https://api.meraki.example"
        token_env = "MERAKI_KEY"
        token_header = "X-Cisco-Meraki-API-Key"
        timeout_secs = 3
    "#;

    fn token_of(config: &SourceConfig) -> Option<String> {
        match &config.endpoint {
            SourceEndpoint::Http {
                auth: SourceAuth::Bearer(t) | SourceAuth::Header { value: t, .. },
                ..
            } => Some(t.expose_secret().to_owned()),
            _ => None,
        }
    }

    fn field_of(err: ConfigError) -> String {
        match err {
            ConfigError::Validation { field, .. } => field,
            other => panic!("expected validation error, got {other}"),
        }
    }

    #[test]
    fn defaults_without_any_file() {
        let config = Config::from_toml_str("").unwrap();
        let engine = config.engine_config().unwrap();

        assert_eq!(engine.cache_ttl, Duration::from_secs(30));
        assert_eq!(engine.fetch_timeout, Duration::from_secs(10));
        assert_eq!(engine.deadline, Duration::from_secs(20));
        assert_eq!(config.topology_filter(), TopologyFilter::default());

        let identity = config.identity_config().unwrap();
        assert!(identity.online_lookup);
        assert_eq!(identity.cache_expiry, Duration::from_secs(30 * 24 * 60 * 60));
        assert_eq!(identity.cache_path, Some(vendor_cache_path()));
        assert!(config.sources.is_empty());
    }

    #[test]
    fn sample_translates_to_engine_types() {
        let config = Config::from_toml_str(SAMPLE).unwrap();
        assert_eq!(config.engine_config().unwrap().cache_ttl, Duration::from_secs(5));
        assert!(config.topology_filter().include_cloud);

        let identity = config.identity_config().unwrap();
        assert!(!identity.online_lookup);
        assert_eq!(identity.local_vendors.len(), 1);
        assert_eq!(identity.local_vendors[0].1, "Acme Sensors");

        let store = FakeCredentials {
            env: HashMap::from([("MERAKI_KEY".into(), "from-env".into())]),
            ..FakeCredentials::default()
        };
        let sources = config.source_configs_with(&store).unwrap();
        let names: Vec<&str> = sources.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["fw", "inventory", "meraki"]);

        assert_eq!(sources[0].kind, SourceKind::SwitchController);
        assert!(matches!(
            &sources[0].endpoint,
            SourceEndpoint::Http { transport, .. } if matches!(transport.tls, TlsMode::DangerAcceptInvalid)
        ));
        assert!(matches!(&sources[1].endpoint, SourceEndpoint::File(p) if p.ends_with("inventory.json")));
        match &sources[2].endpoint {
            SourceEndpoint::Http {
                auth: SourceAuth::Header { name, .. },
                transport,
                ..
            } => {
                assert_eq!(name, "X-Cisco-Meraki-API-Key");
                assert_eq!(transport.timeout, Duration::from_secs(3));
            }
            other => panic!("unexpected endpoint {other:?}"),
        }
        assert_eq!(token_of(&sources[2]).as_deref(), Some("from-env"));
    }

    #[test]
    fn credential_chain_order() {
        let section = SourceSection {
            kind: "scanner".into(),
            url: Some("http://scanner.local".into()),
            path: None,
            token: Some("plain".into()),
            token_env: Some("SCAN_TOKEN".into()),
            token_header: None,
            insecure: false,
            ca_cert: None,
            timeout_secs: None,
        };
        let reveal = |store: &FakeCredentials| {
            resolve_token(&section, "scan", store).map(|s| s.expose_secret().to_owned())
        };

        let mut store = FakeCredentials::default();
        assert_eq!(reveal(&store).as_deref(), Some("plain"));

        store.keyring.insert("scan".into(), "from-keyring".into());
        assert_eq!(reveal(&store).as_deref(), Some("from-keyring"));

        store.env.insert("SCAN_TOKEN".into(), "from-env".into());
        assert_eq!(reveal(&store).as_deref(), Some("from-env"));
    }

    #[test]
    fn unauthenticated_source_has_no_auth() {
        let config = Config::from_toml_str(
            r#"
            [sources.scan]
            kind = "scanner"
            url = "http://scanner.local"
            "#,
        )
        .unwrap();
        let sources = config.source_configs_with(&FakeCredentials::default()).unwrap();
        assert!(matches!(
            &sources[0].endpoint,
            SourceEndpoint::Http { auth: SourceAuth::None, .. }
        ));
    }

    #[test]
    fn validation_names_the_field() {
        let cases = [
            ("[engine]\ndeadline_secs = 0", "engine.deadline_secs"),
            ("[engine]\nfetch_timeout_secs = 0", "engine.fetch_timeout_secs"),
            ("[identity]\nrequests_per_window = 0", "identity.requests_per_window"),
            ("[identity]\nlookup_url = \"not a url\"", "identity.lookup_url"),
            ("[identity.vendors]\n\"XYZ\" = \"Bad\"", "identity.vendors.XYZ"),
            ("[sources.a]\nkind = \"telnet\"\nurl = \"http://a\"", "sources.a.kind"),
            ("[sources.a]\nkind = \"scanner\"", "sources.a.url"),
            ("[sources.a]\nkind = \"snmp_static\"", "sources.a.path"),
            (
                "[sources.a]\nkind = \"scanner\"\nurl = \"http://a\"\ntimeout_secs = 0",
                "sources.a.timeout_secs",
            ),
        ];
        for (toml, field) in cases {
            assert_eq!(field_of(Config::from_toml_str(toml).unwrap_err()), field, "{toml}");
        }
    }

    #[test]
    fn zero_requests_allowed_when_offline() {
        let config =
            Config::from_toml_str("[identity]\nonline_lookup = false\nrequests_per_window = 0")
                .unwrap();
        assert!(config.identity_config().is_ok());
    }

    #[test]
    fn redacted_toml_hides_plaintext_tokens() {
        let config = Config::from_toml_str(SAMPLE).unwrap();
        let shown = config.to_redacted_toml().unwrap();
        assert!(!shown.contains("plain\""));
        assert!(shown.contains(REDACTED));
        assert!(shown.contains("MERAKI_KEY"));
    }

    #[test]
    fn load_from_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[engine]\ncache_ttl_secs = 0\n").unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.engine_config().unwrap().cache_ttl, Duration::ZERO);
    }

    #[test]
    fn missing_file_is_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(Some(&dir.path().join("absent.toml"))).unwrap();
        assert!(config.sources.is_empty());
    }
}
