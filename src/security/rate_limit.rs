//! Per-client admission limiting.
//!
//! Each client gets `rate` tokens per window. Tokens are restored all at
//! once when a full window has elapsed since the last reset, not trickled
//! back continuously. A client can therefore spend `rate` tokens at the end
//! of one window and `rate` more at the start of the next.
//!
//! Idle buckets are dropped by a background task so one-shot clients do not
//! accumulate forever.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::config::{RateLimitConfig, ValidationError};
use crate::observability::metrics;

/// Immutable limiter parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimiterConfig {
    rate: u32,
    window: Duration,
}

impl LimiterConfig {
    pub fn new(rate: u32, window: Duration) -> Result<Self, ValidationError> {
        if rate == 0 {
            return Err(ValidationError::NotPositive("rate_limit.requests"));
        }
        if window.is_zero() {
            return Err(ValidationError::NotPositive("rate_limit.window_secs"));
        }
        Ok(Self { rate, window })
    }

    pub fn from_config(config: &RateLimitConfig) -> Result<Self, ValidationError> {
        Self::new(config.requests, Duration::from_secs(config.window_secs))
    }

    pub fn rate(&self) -> u32 {
        self.rate
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Buckets untouched for longer than this are reclaimed; also the
    /// reclamation period.
    pub fn stale_after(&self) -> Duration {
        self.window * 2
    }
}

/// Quota state for one client.
#[derive(Debug, Clone, Copy)]
struct ClientBucket {
    tokens: u32,
    last_refill: Instant,
}

struct Shared {
    buckets: Mutex<HashMap<String, ClientBucket>>,
    config: LimiterConfig,
}

impl Shared {
    // Every update leaves the map consistent, so a panic elsewhere while the
    // lock was held does not invalidate it.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, ClientBucket>> {
        self.buckets.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn allow_at(&self, key: &str, now: Instant) -> bool {
        let rate = self.config.rate;
        let window = self.config.window;

        let mut buckets = self.lock();
        let Some(bucket) = buckets.get_mut(key) else {
            buckets.insert(
                key.to_string(),
                ClientBucket {
                    tokens: rate - 1,
                    last_refill: now,
                },
            );
            metrics::record_limiter_buckets(buckets.len());
            return true;
        };

        if now.saturating_duration_since(bucket.last_refill) >= window {
            bucket.tokens = rate;
            bucket.last_refill = now;
        }

        if bucket.tokens > 0 {
            bucket.tokens -= 1;
            true
        } else {
            false
        }
    }

    fn reclaim_at(&self, now: Instant) -> usize {
        let stale_after = self.config.stale_after();

        let mut buckets = self.lock();
        let before = buckets.len();
        buckets.retain(|_, bucket| now.saturating_duration_since(bucket.last_refill) <= stale_after);
        let removed = before - buckets.len();

        metrics::record_limiter_buckets(buckets.len());
        removed
    }
}

/// Fixed-window per-client limiter.
///
/// All bucket reads and writes, including reclamation, go through one mutex,
/// so decisions for the same key are serialized and two callers can never
/// both spend the last token.
pub struct AdmissionLimiter {
    shared: Arc<Shared>,
    stop_tx: Mutex<Option<oneshot::Sender<()>>>,
}

impl AdmissionLimiter {
    /// Create a limiter without background reclamation.
    ///
    /// Callers using this constructor must call [`AdmissionLimiter::reclaim`]
    /// themselves if they want idle buckets dropped.
    pub fn new(config: LimiterConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                buckets: Mutex::new(HashMap::new()),
                config,
            }),
            stop_tx: Mutex::new(None),
        }
    }

    /// Create a limiter and spawn its reclamation task on the current tokio
    /// runtime. Must be called from within a runtime.
    pub fn start(config: LimiterConfig) -> Self {
        let limiter = Self::new(config);
        let (stop_tx, stop_rx) = oneshot::channel();
        *limiter.stop_tx.lock().unwrap_or_else(PoisonError::into_inner) = Some(stop_tx);

        tokio::spawn(run_reclaimer(limiter.shared.clone(), stop_rx));
        limiter
    }

    pub fn config(&self) -> LimiterConfig {
        self.shared.config
    }

    /// Decide whether `client_key` may make one more request, spending a
    /// token if so. A spent token is never returned.
    pub fn allow(&self, client_key: &str) -> bool {
        self.shared.allow_at(client_key, Instant::now())
    }

    /// Retry hint for rejected clients: the window length in whole seconds.
    /// This is a fixed value, not the time until this client's next reset.
    pub fn retry_after_secs(&self) -> u64 {
        self.shared.config.window.as_secs().max(1)
    }

    /// Run one reclamation pass now. Returns the number of buckets removed.
    pub fn reclaim(&self) -> usize {
        self.shared.reclaim_at(Instant::now())
    }

    /// Number of tracked clients.
    pub fn len(&self) -> usize {
        self.shared.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stop the reclamation task.
    ///
    /// Intended as one-time teardown at process shutdown. Calling it again,
    /// or on a limiter built with [`AdmissionLimiter::new`], does nothing.
    /// Admission decisions after `stop` still work but idle buckets are no
    /// longer reclaimed.
    pub fn stop(&self) {
        let stop_tx = self
            .stop_tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(tx) = stop_tx {
            let _ = tx.send(());
        }
    }

    #[cfg(test)]
    fn tokens(&self, client_key: &str) -> Option<u32> {
        self.shared.lock().get(client_key).map(|b| b.tokens)
    }
}

impl std::fmt::Debug for AdmissionLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdmissionLimiter")
            .field("config", &self.shared.config)
            .field("clients", &self.len())
            .finish()
    }
}

/// Background loop: every `2×window`, drop buckets idle for longer than
/// `2×window`. Exits when the stop signal fires or its sender is dropped.
async fn run_reclaimer(shared: Arc<Shared>, mut stop_rx: oneshot::Receiver<()>) {
    let period = shared.config.stale_after();
    let mut ticker = time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    tracing::debug!(period_secs = period.as_secs(), "Rate limiter reclamation started");

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let removed = shared.reclaim_at(Instant::now());
                if removed > 0 {
                    metrics::record_limiter_reclaimed(removed);
                    tracing::debug!(removed, "Reclaimed idle rate limit buckets");
                }
            }
            _ = &mut stop_rx => {
                tracing::debug!("Rate limiter reclamation stopped");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(rate: u32, window_secs: u64) -> AdmissionLimiter {
        AdmissionLimiter::new(LimiterConfig::new(rate, Duration::from_secs(window_secs)).unwrap())
    }

    #[test]
    fn test_config_rejects_zero_values() {
        assert_eq!(
            LimiterConfig::new(0, Duration::from_secs(60)).unwrap_err(),
            ValidationError::NotPositive("rate_limit.requests")
        );
        assert_eq!(
            LimiterConfig::new(10, Duration::ZERO).unwrap_err(),
            ValidationError::NotPositive("rate_limit.window_secs")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_admits_up_to_rate() {
        let limiter = limiter(5, 60);
        for i in 0..5 {
            assert!(limiter.allow("client-a"), "request {} should be admitted", i);
        }
        assert!(!limiter.allow("client-a"));
        assert_eq!(limiter.retry_after_secs(), 60);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clients_are_independent() {
        let limiter = limiter(1, 60);
        assert!(limiter.allow("client-a"));
        assert!(!limiter.allow("client-a"));
        assert!(limiter.allow("client-b"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_two_scenario() {
        let limiter = limiter(2, 60);

        let results: Vec<bool> = (0..3).map(|_| limiter.allow("A")).collect();
        assert_eq!(results, vec![true, true, false]);
        assert_eq!(limiter.retry_after_secs(), 60);

        time::advance(Duration::from_secs(61)).await;

        assert!(limiter.allow("A"));
        assert_eq!(limiter.tokens("A"), Some(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_refill_only_after_full_window() {
        let limiter = limiter(1, 60);
        assert!(limiter.allow("A"));

        time::advance(Duration::from_secs(59)).await;
        assert!(!limiter.allow("A"));

        time::advance(Duration::from_secs(1)).await;
        assert!(limiter.allow("A"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_boundary_allows_double_burst() {
        let limiter = limiter(3, 60);

        time::advance(Duration::from_secs(0)).await;
        assert!(limiter.allow("A")); // window starts here
        time::advance(Duration::from_secs(59)).await;
        assert!(limiter.allow("A"));
        assert!(limiter.allow("A"));
        assert!(!limiter.allow("A"));

        time::advance(Duration::from_secs(1)).await;
        for _ in 0..3 {
            assert!(limiter.allow("A"));
        }
        assert!(!limiter.allow("A"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reclaim_removes_only_stale_buckets() {
        let limiter = limiter(10, 60);
        assert!(limiter.allow("idle"));

        time::advance(Duration::from_secs(90)).await;
        assert!(limiter.allow("active"));

        time::advance(Duration::from_secs(31)).await;
        // idle: 121s > 120s; active: 31s
        assert_eq!(limiter.reclaim(), 1);
        assert_eq!(limiter.len(), 1);
        assert!(limiter.tokens("idle").is_none());
        assert!(limiter.tokens("active").is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reclaim_on_empty_map_is_noop() {
        let limiter = limiter(10, 60);
        assert_eq!(limiter.reclaim(), 0);
        assert!(limiter.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_background_reclamation() {
        let limiter =
            AdmissionLimiter::start(LimiterConfig::new(10, Duration::from_secs(60)).unwrap());
        assert!(limiter.allow("one-shot"));
        assert_eq!(limiter.len(), 1);

        // First tick fires at 120s, when the bucket is exactly 120s old and
        // kept; the next tick at 240s removes it.
        time::sleep(Duration::from_secs(121)).await;
        assert_eq!(limiter.len(), 1);

        time::sleep(Duration::from_secs(120)).await;
        assert!(limiter.is_empty());

        limiter.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_recent_bucket_survives_background_pass() {
        let limiter =
            AdmissionLimiter::start(LimiterConfig::new(10, Duration::from_secs(60)).unwrap());

        time::sleep(Duration::from_secs(100)).await;
        assert!(limiter.allow("recent"));

        time::sleep(Duration::from_secs(21)).await; // past the 120s tick
        assert_eq!(limiter.len(), 1);

        limiter.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_is_idempotent_and_halts_reclamation() {
        let limiter =
            AdmissionLimiter::start(LimiterConfig::new(10, Duration::from_secs(60)).unwrap());
        assert!(limiter.allow("A"));

        limiter.stop();
        limiter.stop();

        time::sleep(Duration::from_secs(600)).await;
        assert_eq!(limiter.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_callers_never_overspend() {
        let limiter = Arc::new(limiter(50, 3600));
        let mut handles = Vec::new();

        for _ in 0..8 {
            let limiter = limiter.clone();
            handles.push(tokio::spawn(async move {
                (0..25).filter(|_| limiter.allow("shared")).count()
            }));
        }

        let mut admitted = 0;
        for handle in handles {
            admitted += handle.await.unwrap();
        }

        assert_eq!(admitted, 50);
        assert_eq!(limiter.tokens("shared"), Some(0));
    }
}
