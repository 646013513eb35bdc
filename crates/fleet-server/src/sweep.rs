//! Periodic stale-connection sweep.
//!
//! Runs independently of any in-flight request; removal-only, so it can
//! never produce torn state.

use std::sync::Arc;
use std::time::Duration;

use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use fleet_registry::ConnectionRegistry;

/// Sweep the registry for closed channels until cancelled.
pub async fn run_sweeper(
    registry: Arc<ConnectionRegistry>,
    interval: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = time::interval(interval);
    // The first tick fires immediately; skip it so a fresh server does not
    // sweep before anything has connected.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let removed = registry.sweep_stale();
                if removed > 0 {
                    debug!(removed, "periodic sweep removed stale connections");
                }
            }
            () = cancel.cancelled() => return,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
