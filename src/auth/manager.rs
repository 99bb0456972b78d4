//! Token lifecycle: bootstrap, scheduled renewal, atomic replacement.
//!
//! # State Machine
//! ```text
//! Uninitialized ──bootstrap ok──▶ Authenticated
//!                                   │   ▲
//!                     renew_at hit  ▼   │ renewal ok (swap)
//!                            Authenticated (renewing)
//!                                   │
//!                 N consecutive failures → shutdown
//! ```
//!
//! Readers always see a complete token. A renewal in flight never blocks
//! `current_token`, and the previous token stays current until the new one
//! has been obtained.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use arc_swap::ArcSwap;
use tokio::task::JoinHandle;
use tokio::time::{sleep, sleep_until};

use crate::auth::{AccessToken, AuthError, TokenSource};
use crate::config::OAuthConfig;
use crate::lifecycle::Shutdown;
use crate::observability::metrics;
use crate::resilience::BackoffPolicy;

/// Lower bound between renewals so a zero `expires_in` cannot spin.
const MIN_RENEWAL_DELAY: Duration = Duration::from_secs(1);

/// What to do when a renewal handshake fails.
#[derive(Debug, Clone, Copy)]
pub struct RenewalPolicy {
    /// Consecutive failures before giving up. Zero means never give up.
    pub max_attempts: u32,
    pub backoff: BackoffPolicy,
}

impl From<&OAuthConfig> for RenewalPolicy {
    fn from(config: &OAuthConfig) -> Self {
        Self {
            max_attempts: config.renewal_max_attempts,
            backoff: BackoffPolicy {
                base_ms: config.renewal_base_delay_ms,
                max_ms: config.renewal_max_delay_ms,
            },
        }
    }
}

/// Holds the process-wide current access token.
pub struct TokenManager {
    current: ArcSwap<AccessToken>,
    exhausted: AtomicBool,
}

impl TokenManager {
    /// Wrap an already-obtained token. No renewal is scheduled.
    pub fn new(token: AccessToken) -> Self {
        Self {
            current: ArcSwap::from_pointee(token),
            exhausted: AtomicBool::new(false),
        }
    }

    /// Perform the initial handshake and schedule renewals.
    ///
    /// Startup must not proceed to serving traffic if this fails.
    pub async fn bootstrap(
        source: Arc<dyn TokenSource>,
        policy: RenewalPolicy,
        shutdown: Shutdown,
    ) -> Result<Arc<Self>, AuthError> {
        let token = source.fetch_token().await?;
        let manager = Arc::new(Self::new(token));
        manager.clone().spawn_renewal(source, policy, shutdown);
        Ok(manager)
    }

    /// The latest token.
    pub fn current_token(&self) -> Arc<AccessToken> {
        self.current.load_full()
    }

    fn replace(&self, token: AccessToken) {
        self.current.store(Arc::new(token));
    }

    /// Start the background renewal loop.
    pub fn spawn_renewal(
        self: Arc<Self>,
        source: Arc<dyn TokenSource>,
        policy: RenewalPolicy,
        shutdown: Shutdown,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            self.renewal_loop(source, policy, shutdown).await;
        })
    }

    async fn renewal_loop(&self, source: Arc<dyn TokenSource>, policy: RenewalPolicy, shutdown: Shutdown) {
        let mut stop = shutdown.subscribe();

        loop {
            let token = self.current_token();
            let renew_at = token.renew_at().max(token.issued_at + MIN_RENEWAL_DELAY);
            tracing::debug!(expires_in = token.expires_in, "Token renewal scheduled");

            tokio::select! {
                _ = sleep_until(renew_at) => {}
                _ = stop.recv() => return,
            }

            let mut failures: u32 = 0;
            loop {
                match source.fetch_token().await {
                    Ok(token) => {
                        self.replace(token);
                        metrics::record_token_renewal("success");
                        tracing::info!("Access token renewed");
                        break;
                    }
                    Err(e) => {
                        failures += 1;
                        metrics::record_token_renewal("failure");
                        tracing::error!(error = %e, attempt = failures, "Token renewal failed, keeping previous token");

                        if policy.max_attempts != 0 && failures >= policy.max_attempts {
                            tracing::error!(attempts = failures, "Token renewal exhausted, shutting down");
                            self.exhausted.store(true, Ordering::SeqCst);
                            shutdown.trigger();
                            return;
                        }

                        tokio::select! {
                            _ = sleep(policy.backoff.delay(failures)) => {}
                            _ = stop.recv() => return,
                        }
                    }
                }
            }
        }
    }

    /// Whether renewal gave up and requested shutdown.
    pub fn renewal_exhausted(&self) -> bool {
        self.exhausted.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::future::BoxFuture;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    /// Replays scripted handshake outcomes; once the script runs out it keeps
    /// issuing fresh 60s tokens.
    struct ScriptedSource {
        script: Mutex<VecDeque<Result<AccessToken, ()>>>,
        calls: AtomicU32,
    }

    impl ScriptedSource {
        fn new(script: Vec<Result<&str, ()>>) -> Arc<Self> {
            let script = script
                .into_iter()
                .map(|r| r.map(|t| AccessToken::new(t, 60)))
                .collect();
            Arc::new(Self {
                script: Mutex::new(script),
                calls: AtomicU32::new(0),
            })
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl TokenSource for ScriptedSource {
        fn fetch_token(&self) -> BoxFuture<'_, Result<AccessToken, AuthError>> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            let next = self.script.lock().unwrap().pop_front();
            let result = match next {
                Some(Ok(mut token)) => {
                    token.issued_at = Instant::now();
                    Ok(token)
                }
                Some(Err(())) => Err(AuthError::Malformed("scripted failure".into())),
                None => Ok(AccessToken::new(format!("auto-{}", n), 60)),
            };
            Box::pin(async move { result })
        }
    }

    fn policy(max_attempts: u32) -> RenewalPolicy {
        RenewalPolicy {
            max_attempts,
            backoff: BackoffPolicy { base_ms: 1000, max_ms: 1000 },
        }
    }

    async fn settle() {
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_renews_after_expires_in() {
        let source = ScriptedSource::new(vec![Ok("tok-0"), Ok("tok-1")]);
        let manager = TokenManager::bootstrap(source.clone(), policy(3), Shutdown::new())
            .await
            .unwrap();
        assert_eq!(source.calls(), 1);
        assert_eq!(manager.current_token().access_token, "tok-0");

        tokio::time::advance(Duration::from_secs(59)).await;
        settle().await;
        assert_eq!(source.calls(), 1);
        assert_eq!(manager.current_token().access_token, "tok-0");

        tokio::time::advance(Duration::from_secs(2)).await;
        settle().await;
        assert_eq!(source.calls(), 2);
        assert_eq!(manager.current_token().access_token, "tok-1");
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_renewal_keeps_previous_token() {
        let source = ScriptedSource::new(vec![Ok("tok-0"), Err(()), Ok("tok-1")]);
        let manager = TokenManager::bootstrap(source.clone(), policy(3), Shutdown::new())
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(61)).await;
        settle().await;
        assert_eq!(source.calls(), 2);
        assert_eq!(manager.current_token().access_token, "tok-0");

        // backoff is 1s plus up to 10% jitter
        tokio::time::advance(Duration::from_millis(1200)).await;
        settle().await;
        assert_eq!(source.calls(), 3);
        assert_eq!(manager.current_token().access_token, "tok-1");
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_renewal_triggers_shutdown() {
        let source = ScriptedSource::new(vec![Ok("tok-0"), Err(()), Err(())]);
        let shutdown = Shutdown::new();
        let mut stopped = shutdown.subscribe();
        let manager = TokenManager::bootstrap(source.clone(), policy(2), shutdown)
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(61)).await;
        settle().await;
        tokio::time::advance(Duration::from_millis(1200)).await;
        settle().await;

        assert_eq!(source.calls(), 3);
        assert!(stopped.try_recv().is_ok());
        assert!(manager.renewal_exhausted());
        assert_eq!(manager.current_token().access_token, "tok-0");
    }

    #[tokio::test]
    async fn test_bootstrap_failure_is_reported() {
        let source = ScriptedSource::new(vec![Err(())]);
        let result = TokenManager::bootstrap(source, policy(0), Shutdown::new()).await;
        assert!(matches!(result, Err(AuthError::Malformed(_))));
    }
}
