// --- File: crates/meetsync_common/src/retry_test.rs ---
use crate::retry::{RetryPolicy, Retryable};
use crate::services::ProviderError;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tokio::time::Instant;

fn policy() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        base_delay: Duration::from_secs(1),
        factor: 2,
        attempt_timeout: Duration::from_secs(10),
    }
}

#[test]
fn delay_grows_by_factor() {
    let policy = policy();
    assert_eq!(policy.delay_for(1), Duration::from_secs(1));
    assert_eq!(policy.delay_for(2), Duration::from_secs(2));
    assert_eq!(policy.delay_for(3), Duration::from_secs(4));
}

#[tokio::test(start_paused = true)]
async fn retries_transient_errors_with_backoff() {
    let calls = AtomicU32::new(0);
    let started = Instant::now();

    let result: Result<u32, ProviderError> = policy()
        .run("test_op", || {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if n < 3 {
                    Err(ProviderError::Unavailable(format!("attempt {n}")))
                } else {
                    Ok(n)
                }
            }
        })
        .await;

    assert_eq!(result, Ok(3));
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    // 1s after the first failure, 2s after the second.
    assert!(started.elapsed() >= Duration::from_secs(3));
}

#[tokio::test(start_paused = true)]
async fn gives_up_after_max_attempts() {
    let calls = AtomicU32::new(0);
    let result: Result<(), ProviderError> = policy()
        .run("test_op", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(ProviderError::Unavailable("down".into())) }
        })
        .await;

    assert_eq!(result, Err(ProviderError::Unavailable("down".into())));
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn non_retryable_error_stops_immediately() {
    let calls = AtomicU32::new(0);
    let result: Result<(), ProviderError> = policy()
        .run("test_op", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(ProviderError::AuthError("revoked".into())) }
        })
        .await;

    assert!(matches!(result, Err(ProviderError::AuthError(_))));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn slow_attempts_time_out_and_count_as_retryable() {
    let calls = AtomicU32::new(0);
    let policy = RetryPolicy {
        max_attempts: 2,
        base_delay: Duration::from_millis(10),
        factor: 2,
        attempt_timeout: Duration::from_millis(100),
    };

    let result: Result<(), ProviderError> = policy
        .run("slow_op", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(())
            }
        })
        .await;

    assert_eq!(
        result,
        Err(ProviderError::timed_out(Duration::from_millis(100)))
    );
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}
