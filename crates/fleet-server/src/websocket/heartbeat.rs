//! Heartbeat ping/pong liveness monitoring.

use std::sync::Arc;
use std::time::Duration;

use tokio::time;
use tokio_util::sync::CancellationToken;

use fleet_registry::MpscChannel;

/// Outcome of the heartbeat loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatResult {
    /// The peer stopped responding within the timeout window.
    TimedOut,
    /// The heartbeat was cancelled externally.
    Cancelled,
}

/// Run heartbeat liveness checks for one connection.
///
/// The write task sends a Ping frame every `interval`; the read loop marks
/// the channel alive on any Pong. At each tick here the alive flag is
/// checked and reset; once `timeout / interval` consecutive checks (at
/// least 1) find the flag unset, the peer is considered dead.
pub async fn run_heartbeat(
    channel: Arc<MpscChannel>,
    interval: Duration,
    timeout: Duration,
    cancel: CancellationToken,
) -> HeartbeatResult {
    let mut check_interval = time::interval(interval);
    // The immediate first tick would read the flag before any ping went out.
    check_interval.tick().await;

    let mut missed_pongs: u32 = 0;
    let interval_ms = interval.as_millis().max(1);
    #[allow(clippy::cast_possible_truncation)]
    let max_missed = (timeout.as_millis() / interval_ms).max(1) as u32;

    loop {
        tokio::select! {
            _ = check_interval.tick() => {
                if channel.check_alive() {
                    missed_pongs = 0;
                } else {
                    missed_pongs += 1;
                    if missed_pongs >= max_missed {
                        return HeartbeatResult::TimedOut;
                    }
                }
            }
            () = cancel.cancelled() => {
                return HeartbeatResult::Cancelled;
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn make_channel() -> Arc<MpscChannel> {
        let (tx, rx) = mpsc::channel(8);
        // Keep the receiver alive for the duration of the test.
        std::mem::forget(rx);
        Arc::new(MpscChannel::new(tx))
    }

    #[tokio::test]
    async fn heartbeat_cancelled() {
        let channel = make_channel();
        let cancel = CancellationToken::new();
        let cancel2 = cancel.clone();

        let handle = tokio::spawn(async move {
            run_heartbeat(
                channel,
                Duration::from_secs(100),
                Duration::from_secs(300),
                cancel2,
            )
            .await
        });

        cancel.cancel();
        let result = handle.await.unwrap();
        assert_eq!(result, HeartbeatResult::Cancelled);
    }

    #[tokio::test]
    async fn silent_peer_times_out() {
        let channel = make_channel();
        // Consume the initial alive flag so every check is a miss.
        let _ = channel.check_alive();
        let cancel = CancellationToken::new();

        let result = run_heartbeat(
            channel,
            Duration::from_millis(10),
            Duration::from_millis(10),
            cancel,
        )
        .await;

        assert_eq!(result, HeartbeatResult::TimedOut);
    }

    #[tokio::test]
    async fn responsive_peer_stays_alive() {
        let channel = make_channel();
        let channel2 = channel.clone();
        let cancel = CancellationToken::new();
        let cancel2 = cancel.clone();

        let handle = tokio::spawn(async move {
            run_heartbeat(
                channel2,
                Duration::from_millis(50),
                Duration::from_millis(200),
                cancel2,
            )
            .await
        });

        for _ in 0..5 {
            tokio::time::sleep(Duration::from_millis(20)).await;
            channel.mark_alive();
        }

        cancel.cancel();
        let result = handle.await.unwrap();
        assert_eq!(result, HeartbeatResult::Cancelled);
    }

    #[tokio::test]
    async fn max_missed_computed_from_timeout_and_interval() {
        // timeout=300ms, interval=100ms → 3 consecutive misses required.
        let channel = make_channel();
        let _ = channel.check_alive();
        let cancel = CancellationToken::new();

        let start = tokio::time::Instant::now();
        let result = run_heartbeat(
            channel,
            Duration::from_millis(100),
            Duration::from_millis(300),
            cancel,
        )
        .await;

        assert_eq!(result, HeartbeatResult::TimedOut);
        assert!(start.elapsed() >= Duration::from_millis(250));
    }
}
