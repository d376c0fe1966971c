// ── Source adapters ──
//
// One adapter per backing system. Each owns the format sniffing for its
// source and hands the engine typed `Switch`/`ScannedHost` records; the
// fusion logic never sees raw JSON.

mod cloud;
mod detected;
mod scanner;
mod snmp;
mod switch_controller;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use topofuse_api::SourceClient;

use crate::config::{SourceConfig, SourceEndpoint};
use crate::error::{CoreError, SourceError};
use crate::model::{SourceKind, SourcePayload};

pub use cloud::CloudSwitchAdapter;
pub use detected::DetectedDeviceAdapter;
pub use scanner::ScannerAdapter;
pub use snmp::{InventoryDocument, SnmpInventoryAdapter};
pub use switch_controller::SwitchControllerAdapter;

/// A backing system the engine can pull topology from.
///
/// `fetch` must be idempotent and side-effect free on failure. An adapter
/// that finds nothing returns an empty payload; an adapter that could not
/// ask returns an error. The engine keeps the two apart.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Unique name, used in provenance and metadata.
    fn name(&self) -> &str;

    /// Merge role of this source.
    fn kind(&self) -> SourceKind;

    async fn fetch(&self, ctx: &FetchContext) -> Result<SourcePayload, SourceError>;
}

/// Cancellation and deadline for one fetch.
#[derive(Debug, Clone)]
pub struct FetchContext {
    cancel: CancellationToken,
    deadline: Instant,
}

impl FetchContext {
    pub fn new(cancel: CancellationToken, deadline: Instant) -> Self {
        Self { cancel, deadline }
    }

    /// A context with its own token, expiring `budget` from now.
    pub fn with_budget(budget: Duration) -> Self {
        Self::new(CancellationToken::new(), Instant::now() + budget)
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    /// Run `fut` until it finishes, the deadline passes, or the token fires.
    pub async fn guard<T, E, F>(&self, fut: F) -> Result<T, SourceError>
    where
        F: Future<Output = Result<T, E>>,
        E: Into<SourceError>,
    {
        let budget = self.remaining();
        tokio::select! {
            () = self.cancel.cancelled() => Err(SourceError::Cancelled),
            res = tokio::time::timeout_at(self.deadline, fut) => match res {
                Ok(inner) => inner.map_err(Into::into),
                Err(_) => Err(SourceError::Timeout {
                    timeout_ms: duration_ms(budget),
                }),
            },
        }
    }
}

pub(crate) fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

/// Build the adapter a `SourceConfig` describes.
pub fn from_config(config: &SourceConfig) -> Result<Arc<dyn SourceAdapter>, CoreError> {
    let name = config.name.clone();
    let adapter: Arc<dyn SourceAdapter> = match config.kind {
        SourceKind::SnmpStatic => match &config.endpoint {
            SourceEndpoint::File(path) => Arc::new(SnmpInventoryAdapter::new(name, path.clone())),
            SourceEndpoint::Http { .. } => {
                return Err(CoreError::config(format!(
                    "source '{name}': snmp_static sources read a local inventory file; set path"
                )));
            }
        },
        SourceKind::SwitchController => {
            Arc::new(SwitchControllerAdapter::new(name, http_client(config)?))
        }
        SourceKind::DetectedDevices => {
            Arc::new(DetectedDeviceAdapter::new(name, http_client(config)?))
        }
        SourceKind::CloudSwitch => Arc::new(CloudSwitchAdapter::new(name, http_client(config)?)),
        SourceKind::Scanner => Arc::new(ScannerAdapter::new(name, http_client(config)?)),
    };
    Ok(adapter)
}

fn http_client(config: &SourceConfig) -> Result<SourceClient, CoreError> {
    let name = &config.name;
    match &config.endpoint {
        SourceEndpoint::Http {
            url,
            auth,
            transport,
        } => SourceClient::new(url.clone(), auth, transport)
            .map_err(|e| CoreError::config(format!("source '{name}': {e}"))),
        SourceEndpoint::File(_) => Err(CoreError::config(format!(
            "source '{name}': {} sources need a url, not a path",
            config.kind
        ))),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn guard_reports_timeout() {
        let ctx = FetchContext::with_budget(Duration::from_millis(10));
        let res: Result<(), SourceError> = ctx
            .guard(async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok::<(), SourceError>(())
            })
            .await;
        assert!(matches!(res, Err(SourceError::Timeout { .. })));
    }

    #[tokio::test]
    async fn guard_reports_cancellation() {
        let ctx = FetchContext::with_budget(Duration::from_secs(5));
        ctx.cancellation().cancel();
        let res: Result<(), SourceError> = ctx
            .guard(std::future::pending::<Result<(), SourceError>>())
            .await;
        assert_eq!(res, Err(SourceError::Cancelled));
    }

    #[test]
    fn file_endpoint_only_for_snmp() {
        let cfg = SourceConfig {
            name: "fw".into(),
            kind: SourceKind::SwitchController,
            endpoint: SourceEndpoint::File("inv.json".into()),
        };
        assert!(matches!(from_config(&cfg), Err(CoreError::Config { .. })));

        let cfg = SourceConfig {
            name: "inv".into(),
            kind: SourceKind::SnmpStatic,
            endpoint: SourceEndpoint::File("inv.json".into()),
        };
        let adapter = from_config(&cfg).unwrap();
        assert_eq!(adapter.kind(), SourceKind::SnmpStatic);
        assert_eq!(adapter.name(), "inv");
    }
}
