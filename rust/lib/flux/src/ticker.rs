use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::scope::Scope;

const MIN_PERIOD: Duration = Duration::from_millis(1);

/// A periodic task bound to a [`Scope`].
///
/// The first tick fires immediately. Each tick's future is awaited before
/// the next tick is considered, so one ticker never has two ticks in
/// flight; ticks missed while a slow one runs are delayed, not bunched.
/// Any condition the tick depends on should be read inside the tick so it
/// is evaluated at fire time. A zero period is raised to one millisecond.
pub struct Ticker {
    handle: JoinHandle<()>,
}

impl Ticker {
    pub fn start<F, Fut>(scope: &Scope, name: &'static str, period: Duration, mut tick: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let scope = scope.clone();
        let period = period.max(MIN_PERIOD);
        let handle = tokio::spawn(async move {
            info!("{name} ticker started (period={period:?})");
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = scope.cancelled() => {
                        info!("{name} ticker stopped");
                        break;
                    }
                    _ = interval.tick() => {
                        debug!("{name} tick");
                        tick().await;
                    }
                }
            }
        });
        Self { handle }
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    /// Wait for the ticker loop to exit (after its scope unmounts).
    pub async fn join(self) {
        let _ = self.handle.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    use crate::store::StateStore;

    fn counting_ticker(scope: &Scope, period: Duration) -> (Ticker, Arc<AtomicU64>) {
        let count = Arc::new(AtomicU64::new(0));
        let c = count.clone();
        let ticker = Ticker::start(scope, "test", period, move || {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
            }
        });
        (ticker, count)
    }

    #[tokio::test(start_paused = true)]
    async fn first_tick_is_immediate_then_periodic() {
        let scope = Scope::new(Arc::new(StateStore::new()));
        let (ticker, count) = counting_ticker(&scope, Duration::from_secs(30));

        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(count.load(Ordering::SeqCst), 4);

        assert!(ticker.is_running());
        scope.unmount();
        ticker.join().await;
    }

    #[tokio::test(start_paused = true)]
    async fn unmount_stops_ticks() {
        let scope = Scope::new(Arc::new(StateStore::new()));
        let (ticker, count) = counting_ticker(&scope, Duration::from_secs(30));
        tokio::time::sleep(Duration::from_millis(1)).await;

        scope.unmount();
        ticker.join().await;
        tokio::time::sleep(Duration::from_secs(300)).await;

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_period_is_clamped() {
        let scope = Scope::new(Arc::new(StateStore::new()));
        let (ticker, count) = counting_ticker(&scope, Duration::ZERO);

        tokio::time::sleep(Duration::from_millis(10)).await;
        let seen = count.load(Ordering::SeqCst);
        assert!(seen >= 2, "expected repeated ticks, saw {seen}");
        assert!(ticker.is_running());

        scope.unmount();
        ticker.join().await;
    }

    #[tokio::test(start_paused = true)]
    async fn slow_tick_never_overlaps() {
        let scope = Scope::new(Arc::new(StateStore::new()));
        let in_flight = Arc::new(AtomicU64::new(0));
        let max_seen = Arc::new(AtomicU64::new(0));
        let (f, m) = (in_flight.clone(), max_seen.clone());
        let ticker = Ticker::start(&scope, "slow", Duration::from_secs(1), move || {
            let (f, m) = (f.clone(), m.clone());
            async move {
                let now = f.fetch_add(1, Ordering::SeqCst) + 1;
                m.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_secs(5)).await;
                f.fetch_sub(1, Ordering::SeqCst);
            }
        });

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(max_seen.load(Ordering::SeqCst), 1);

        scope.unmount();
        ticker.join().await;
    }
}
