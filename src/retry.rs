use std::thread;
use std::time::Duration;

use crate::error::FetchError;

/// Bounded retry with a fixed delay between attempts. Every fault kind is
/// treated the same; after the final attempt the last error is handed back
/// instead of being raised further.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    max_attempts: u32,
    delay: Duration,
}

#[derive(Debug)]
pub struct RetryExhausted {
    pub error: FetchError,
    pub attempts: u32,
}

impl RetryPolicy {
    pub const fn new(max_attempts: u32, delay: Duration) -> Self {
        let max_attempts = if max_attempts == 0 { 1 } else { max_attempts };
        Self {
            max_attempts,
            delay,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn run<T, F>(&self, mut op: F) -> Result<T, RetryExhausted>
    where
        F: FnMut() -> Result<T, FetchError>,
    {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match op() {
                Ok(value) => return Ok(value),
                Err(error) if attempt < self.max_attempts => {
                    tracing::warn!(attempt, error = %error, "attempt failed, retrying");
                    thread::sleep(self.delay);
                }
                Err(error) => {
                    return Err(RetryExhausted {
                        error,
                        attempts: attempt,
                    });
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(2))
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use assert_matches::assert_matches;

    use super::*;

    fn immediate(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(max_attempts, Duration::ZERO)
    }

    #[test]
    fn first_attempt_success_does_not_retry() {
        let calls = Cell::new(0u32);
        let result = immediate(3).run(|| {
            calls.set(calls.get() + 1);
            Ok(42)
        });

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn recovers_within_the_attempt_budget() {
        let calls = Cell::new(0u32);
        let result = immediate(3).run(|| {
            calls.set(calls.get() + 1);
            if calls.get() < 3 {
                Err(FetchError::Http("connection reset".to_string()))
            } else {
                Ok("done")
            }
        });

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn exhaustion_reports_last_error_and_attempt_count() {
        let calls = Cell::new(0u32);
        let result = immediate(3).run::<(), _>(|| {
            calls.set(calls.get() + 1);
            Err(FetchError::Http(format!("failure {}", calls.get())))
        });

        let exhausted = result.unwrap_err();
        assert_eq!(exhausted.attempts, 3);
        assert_eq!(calls.get(), 3);
        assert_matches!(exhausted.error, FetchError::Http(message) if message == "failure 3");
    }

    #[test]
    fn zero_attempts_still_runs_once() {
        let calls = Cell::new(0u32);
        let result = immediate(0).run::<(), _>(|| {
            calls.set(calls.get() + 1);
            Err(FetchError::Http("nope".to_string()))
        });

        assert_eq!(result.unwrap_err().attempts, 1);
        assert_eq!(calls.get(), 1);
    }
}
