//! Bounded polling.

use std::future::Future;
use std::time::Duration;

use tokio::time::{Instant, sleep, timeout};
use tracing::debug;

use crate::errors::ScrapeError;

/// Poll `probe` every `interval` until it yields a value or `limit` elapses.
///
/// The probe runs at least once. Probe errors count as "not yet" so a flaky
/// read does not cut the wait short. Returns `None` on timeout.
pub async fn poll_until<T, F, Fut>(limit: Duration, interval: Duration, mut probe: F) -> Option<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, ScrapeError>>,
{
    let deadline = Instant::now() + limit;
    let polling = async {
        loop {
            match probe().await {
                Ok(Some(value)) => return Some(value),
                Ok(None) => {}
                Err(e) => debug!(error = %e, "Probe failed; polling again"),
            }
            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            sleep(interval.min(deadline - now)).await;
        }
    };
    // A probe that never resolves must not outlive the limit either.
    timeout(limit, polling).await.ok().flatten()
}
