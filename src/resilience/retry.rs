use std::fmt::Display;
use std::future::Future;

use tokio::time::{sleep, Duration};
use tracing::{debug, error, warn};

use crate::config::settings::RetryConfig;

#[derive(Debug, Clone)]
pub struct RetrySettings {
    pub attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl From<&Option<RetryConfig>> for RetrySettings {
    fn from(retry: &Option<RetryConfig>) -> Self {
        Self {
            attempts: retry.as_ref().and_then(|r| r.attempts).unwrap_or(3).max(1),
            base_delay_ms: retry.as_ref().and_then(|r| r.base_delay_ms).unwrap_or(200),
            max_delay_ms: retry.as_ref().and_then(|r| r.max_delay_ms).unwrap_or(1000),
        }
    }
}

impl RetrySettings {
    /// Run `operation` until it succeeds, `should_retry` rejects the error,
    /// or the attempts are used up. The delay doubles up to `max_delay_ms`.
    ///
    /// A rejected error is handed back as is; only running out of attempts
    /// is logged as an error.
    pub async fn run_with_retry<F, Fut, T, E, P>(&self, mut operation: F, should_retry: P) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
        P: Fn(&E) -> bool,
    {
        let attempts = self.attempts.max(1);
        let mut delay = self.base_delay_ms;
        let mut attempt = 1;

        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < attempts && should_retry(&e) => {
                    warn!("Attempt {attempt}/{attempts} failed: {e}");
                    sleep(Duration::from_millis(delay)).await;
                    delay = (delay * 2).min(self.max_delay_ms);
                    attempt += 1;
                }
                Err(e) if should_retry(&e) => {
                    error!("giving up after {attempt} attempt(s): {e}");
                    return Err(e);
                }
                Err(e) => {
                    debug!("attempt {attempt} failed, not retrying: {e}");
                    return Err(e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl CapturedLogs {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    async fn failing_run(settings: RetrySettings, retryable: bool) -> String {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let result: Result<(), String> = settings
            .run_with_retry(|| async { Err("upstream said no".to_string()) }, |_| retryable)
            .await;
        assert!(result.is_err());
        logs.text()
    }

    fn quick(attempts: u32) -> RetrySettings {
        RetrySettings { attempts, base_delay_ms: 1, max_delay_ms: 2 }
    }

    #[tokio::test]
    async fn retries_until_success() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<u32, String> = quick(3)
            .run_with_retry(
                move || async move {
                    let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                    if n < 3 { Err(format!("boom {n}")) } else { Ok(n) }
                },
                |_| true,
            )
            .await;
        assert_eq!(result.unwrap(), 3);
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn stops_on_non_retryable_error() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<(), String> = quick(5)
            .run_with_retry(
                move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err("fatal".to_string())
                },
                |_| false,
            )
            .await;
        assert!(result.is_err());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn rejected_error_is_returned_without_error_log() {
        let logs = failing_run(quick(3), false).await;
        assert!(!logs.contains("ERROR"), "{logs}");
        assert!(!logs.contains("giving up"), "{logs}");
        assert!(logs.contains("not retrying"), "{logs}");
    }

    #[tokio::test]
    async fn exhausted_attempts_are_logged_as_error() {
        let logs = failing_run(quick(2), true).await;
        assert!(logs.contains("ERROR"), "{logs}");
        assert!(logs.contains("giving up after 2 attempt(s)"), "{logs}");
    }

    #[test]
    fn defaults_when_unset() {
        let settings = RetrySettings::from(&None::<RetryConfig>);
        assert_eq!(settings.attempts, 3);
        assert_eq!(settings.base_delay_ms, 200);
        assert_eq!(settings.max_delay_ms, 1000);
    }
}
