// ── Concurrent source fan-out ──
//
// Every adapter runs as its own future; `join_all` is the fan-in barrier
// and returns results in registration order, whatever order they finish in.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::adapter::{FetchContext, SourceAdapter, duration_ms};
use crate::clock::Clock;
use crate::model::SourceResult;

/// Fetch from every adapter. Each call gets `min(fetch_timeout, time left
/// on the parent deadline)` and a child of the parent's cancellation token.
pub(crate) async fn fan_out(
    adapters: &[Arc<dyn SourceAdapter>],
    fetch_timeout: Duration,
    parent: &FetchContext,
    clock: &dyn Clock,
) -> Vec<SourceResult> {
    join_all(
        adapters
            .iter()
            .map(|adapter| fetch_one(adapter.as_ref(), fetch_timeout, parent, clock)),
    )
    .await
}

async fn fetch_one(
    adapter: &dyn SourceAdapter,
    fetch_timeout: Duration,
    parent: &FetchContext,
    clock: &dyn Clock,
) -> SourceResult {
    let budget = fetch_timeout.min(parent.remaining());
    let started = Instant::now();
    let ctx = FetchContext::new(parent.cancellation().child_token(), started + budget);
    let fetched_at = clock.now();

    // Adapters are expected to honor `ctx`; the guard makes sure of it.
    let outcome = ctx.guard(adapter.fetch(&ctx)).await;
    let elapsed_ms = duration_ms(started.elapsed());

    match &outcome {
        Ok(payload) => debug!(
            source = adapter.name(),
            kind = %adapter.kind(),
            switches = payload.switches.len(),
            hosts = payload.hosts.len(),
            malformed = payload.malformed,
            elapsed_ms,
            "source fetched"
        ),
        Err(e) => warn!(
            source = adapter.name(),
            kind = %adapter.kind(),
            error = %e,
            elapsed_ms,
            "source unavailable, continuing without it"
        ),
    }

    SourceResult::from_outcome(adapter.name(), adapter.kind(), outcome, fetched_at, elapsed_ms)
}
