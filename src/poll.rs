use std::sync::Weak;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Something a poller can ask to refresh. Returns whether a cycle started.
pub trait Refresh: Send + Sync + 'static {
    fn refresh(&self) -> bool;
}

/// Background task that periodically refreshes `target`. Stops when the
/// token is cancelled or the target has been dropped.
pub async fn run_poller<R: Refresh>(target: Weak<R>, period: Duration, token: CancellationToken) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // first tick completes immediately; the mount already fetched
    interval.tick().await;
    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = interval.tick() => {}
        }
        let Some(target) = target.upgrade() else { break };
        if target.refresh() {
            debug!("poll refresh dispatched");
        }
    }
    debug!("poller stopped");
}
