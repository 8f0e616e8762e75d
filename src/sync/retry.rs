//! Retry policy for package syncs
//!
//! Each package gets `max_retries + 1` attempts, saturating at `u32::MAX`.
//! After a failed attempt that is not the last one, the policy waits
//! `base_delay * 2^attempt` before trying again. There is no jitter; the
//! backoff saturates instead of being capped.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncErrorKind};
use crate::sync::client::PackageSyncer;
use crate::sync::hooks::SyncHooks;

/// Exponential backoff retry policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u32,
    base_delay: Duration,
}

impl RetryPolicy {
    /// Create a policy with `max_retries` retries after the first attempt
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// Policy described by the `retry` and `retry_delay_ms` settings
    pub fn from_config(config: &SyncConfig) -> Self {
        Self::new(config.retry, Duration::from_millis(config.retry_delay_ms))
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    /// Backoff to wait after the failed attempt with index `attempt`
    ///
    /// Attempt 0 waits the base delay, attempt 1 twice that, and so on.
    pub fn calculate_backoff(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
    }

    /// Sync one package, running hooks and retrying failed attempts
    ///
    /// A before-hook failure skips the network entirely and is reported as a
    /// [`SyncErrorKind::Hook`] failure. The after-hook runs exactly once with
    /// the terminal outcome.
    pub async fn sync_with_retry<S>(
        &self,
        package: &str,
        syncer: &S,
        hooks: &SyncHooks,
    ) -> Result<(), SyncError>
    where
        S: PackageSyncer + ?Sized,
    {
        if let Err(e) = hooks.run_before(package).await {
            let err = SyncError::new(package, SyncErrorKind::Hook(e.to_string()));
            warn!(package = %package, error = %err, "Before-sync hook failed");
            hooks.run_after(package, Some(&err)).await;
            return Err(err);
        }

        let mut attempt = 0u32;

        loop {
            debug!(
                package = %package,
                attempt = attempt.saturating_add(1),
                max_attempts = self.max_retries.saturating_add(1),
                "Syncing package"
            );

            match syncer.sync_package(package).await {
                Ok(()) => {
                    if attempt > 0 {
                        info!(
                            package = %package,
                            attempts = attempt.saturating_add(1),
                            "Synced after retry"
                        );
                    }
                    hooks.run_after(package, None).await;
                    return Ok(());
                }
                Err(err) => {
                    if attempt >= self.max_retries {
                        warn!(
                            package = %package,
                            attempts = attempt.saturating_add(1),
                            max_retries = self.max_retries,
                            error = %err,
                            "Max retries exhausted"
                        );
                        hooks.run_after(package, Some(&err)).await;
                        return Err(err);
                    }

                    let backoff = self.calculate_backoff(attempt);
                    debug!(
                        package = %package,
                        attempt = attempt.saturating_add(1),
                        max_retries = self.max_retries,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %err,
                        "Retrying after failed sync"
                    );

                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&SyncConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::hooks::{HookError, PostSync, PreSync};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};

    /// Fails the first `fail_times` attempts, then succeeds
    struct FlakySyncer {
        fail_times: u32,
        calls: AtomicU32,
    }

    impl FlakySyncer {
        fn new(fail_times: u32) -> Self {
            Self {
                fail_times,
                calls: AtomicU32::new(0),
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PackageSyncer for FlakySyncer {
        async fn sync_package(&self, package: &str) -> Result<(), SyncError> {
            let current = self.calls.fetch_add(1, Ordering::SeqCst);
            if current < self.fail_times {
                Err(SyncError::new(
                    package,
                    SyncErrorKind::Status {
                        status: 503,
                        body: None,
                    },
                ))
            } else {
                Ok(())
            }
        }
    }

    struct RejectingHook;

    #[async_trait]
    impl PreSync for RejectingHook {
        async fn before_sync(&self, package: &str) -> Result<(), HookError> {
            Err(HookError::new(format!("{} is blocked", package)))
        }
    }

    #[derive(Default)]
    struct RecordingHook {
        seen: Mutex<Vec<(String, Option<String>)>>,
    }

    #[async_trait]
    impl PostSync for RecordingHook {
        async fn after_sync(&self, package: &str, error: Option<&SyncError>) {
            self.seen
                .lock()
                .unwrap()
                .push((package.to_string(), error.map(|e| e.to_string())));
        }
    }

    fn no_delay(max_retries: u32) -> RetryPolicy {
        RetryPolicy::new(max_retries, Duration::ZERO)
    }

    // Test 1: Success on first attempt returns immediately
    #[tokio::test]
    async fn test_success_on_first_attempt() {
        let syncer = FlakySyncer::new(0);

        let result = no_delay(3)
            .sync_with_retry("pkg", &syncer, &SyncHooks::none())
            .await;

        assert!(result.is_ok());
        assert_eq!(syncer.calls(), 1);
    }

    // Test 2: Retries and eventually succeeds
    #[tokio::test]
    async fn test_retry_succeeds_after_failures() {
        let syncer = FlakySyncer::new(2);

        let result = no_delay(3)
            .sync_with_retry("pkg", &syncer, &SyncHooks::none())
            .await;

        assert!(result.is_ok());
        assert_eq!(syncer.calls(), 3);
    }

    // Test 3: Gives up after retry + 1 attempts
    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let syncer = FlakySyncer::new(u32::MAX);

        let err = no_delay(2)
            .sync_with_retry("pkg", &syncer, &SyncHooks::none())
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Failed to sync pkg: HTTP 503");
        assert_eq!(syncer.calls(), 3);
    }

    // Test 4: Zero retries means exactly one attempt
    #[tokio::test]
    async fn test_zero_retries() {
        let syncer = FlakySyncer::new(1);

        let result = no_delay(0)
            .sync_with_retry("pkg", &syncer, &SyncHooks::none())
            .await;

        assert!(result.is_err());
        assert_eq!(syncer.calls(), 1);
    }

    // Test 5: Backoff doubles per attempt
    #[test]
    fn test_backoff_calculation() {
        let policy = RetryPolicy::new(5, Duration::from_millis(1000));

        assert_eq!(policy.calculate_backoff(0), Duration::from_millis(1000));
        assert_eq!(policy.calculate_backoff(1), Duration::from_millis(2000));
        assert_eq!(policy.calculate_backoff(2), Duration::from_millis(4000));
        assert_eq!(policy.calculate_backoff(3), Duration::from_millis(8000));
    }

    #[test]
    fn test_backoff_saturates() {
        let policy = RetryPolicy::new(100, Duration::from_secs(1));
        assert_eq!(
            policy.calculate_backoff(64),
            Duration::from_secs(u32::MAX as u64)
        );
    }

    // Test 6: Waits at least the sum of the backoffs
    #[tokio::test(start_paused = true)]
    async fn test_backoff_timing() {
        let syncer = FlakySyncer::new(3);
        let policy = RetryPolicy::new(3, Duration::from_millis(100));

        let start = tokio::time::Instant::now();
        let result = policy
            .sync_with_retry("pkg", &syncer, &SyncHooks::none())
            .await;

        assert!(result.is_ok());
        assert_eq!(syncer.calls(), 4);
        // 100 + 200 + 400
        assert!(start.elapsed() >= Duration::from_millis(700));
    }

    // Test 7: A failing before-hook skips the network
    #[tokio::test]
    async fn test_before_hook_failure_skips_sync() {
        let syncer = FlakySyncer::new(0);
        let recorder = Arc::new(RecordingHook::default());
        let hooks = SyncHooks::none()
            .with_before(Arc::new(RejectingHook))
            .with_after(recorder.clone());

        let err = no_delay(3)
            .sync_with_retry("secret", &syncer, &hooks)
            .await
            .unwrap_err();

        assert_eq!(err.kind, SyncErrorKind::Hook("secret is blocked".to_string()));
        assert_eq!(syncer.calls(), 0);

        let seen = recorder.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(
            seen[0],
            (
                "secret".to_string(),
                Some("Failed to sync secret: secret is blocked".to_string())
            )
        );
    }

    // Test 8: The after-hook sees the terminal outcome once
    #[tokio::test]
    async fn test_after_hook_receives_outcome() {
        let recorder = Arc::new(RecordingHook::default());
        let hooks = SyncHooks::none().with_after(recorder.clone());

        no_delay(1)
            .sync_with_retry("ok", &FlakySyncer::new(1), &hooks)
            .await
            .unwrap();
        no_delay(1)
            .sync_with_retry("bad", &FlakySyncer::new(u32::MAX), &hooks)
            .await
            .unwrap_err();

        let seen = recorder.seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0], ("ok".to_string(), None));
        assert_eq!(
            seen[1],
            ("bad".to_string(), Some("Failed to sync bad: HTTP 503".to_string()))
        );
    }

    // Test 9: Unbounded retry settings do not overflow the attempt logs
    #[tokio::test]
    async fn test_max_retries_at_limit() {
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);
        let syncer = FlakySyncer::new(1);

        let result = no_delay(u32::MAX)
            .sync_with_retry("pkg", &syncer, &SyncHooks::none())
            .await;

        assert!(result.is_ok());
        assert_eq!(syncer.calls(), 2);
    }

    #[test]
    fn test_from_config() {
        let config = SyncConfig {
            retry: 7,
            retry_delay_ms: 50,
            ..Default::default()
        };
        let policy = RetryPolicy::from_config(&config);

        assert_eq!(policy.max_retries(), 7);
        assert_eq!(policy.base_delay(), Duration::from_millis(50));
        assert_eq!(RetryPolicy::default().max_retries(), 3);
    }
}
