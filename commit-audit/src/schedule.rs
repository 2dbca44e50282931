//! Periodic trigger for audit runs.

use std::future::Future;
use std::time::Duration;

use tokio::time::{interval, MissedTickBehavior};

/// Call `run` every `period`, starting immediately. A failed run is logged and
/// the schedule carries on. Stops after `max_runs` runs when given.
pub async fn watch<F, Fut, E>(period: Duration, max_runs: Option<usize>, mut run: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(), E>>,
    E: std::fmt::Display,
{
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut runs = 0usize;

    loop {
        ticker.tick().await;
        tracing::info!(run = runs + 1, "Cron started");
        if let Err(e) = run().await {
            tracing::error!(error = %e, "Scheduled audit run failed");
        }
        runs += 1;
        if max_runs.is_some_and(|max| runs >= max) {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn keeps_running_after_failures() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        watch(Duration::from_secs(60), Some(3), move || {
            let counter = counter.clone();
            async move {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                if n == 0 {
                    Err("first run failed")
                } else {
                    Ok(())
                }
            }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn runs_are_spaced_by_the_period() {
        let start = tokio::time::Instant::now();

        watch(Duration::from_secs(600), Some(2), || async { Ok::<(), String>(()) }).await;

        assert!(start.elapsed() >= Duration::from_secs(600));
    }
}
