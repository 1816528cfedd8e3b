use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc;
use std::sync::{Mutex, MutexGuard};
use std::thread;

use crate::domain::{FetchOutcome, Item, RunTally, SkipReason};
use crate::error::FetchError;
use crate::report::Observer;
use crate::retry::RetryPolicy;
use crate::source::RemoteSource;
use crate::store::LocalStore;

pub const DEFAULT_WORKERS: usize = 4;

/// The scheduler: a fixed pool of workers draws enumerated items from a
/// bounded channel fed on the caller's thread, so pagination streams while
/// downloads are in flight. Every item yields exactly one outcome; a
/// single item's failure never ends the run.
pub struct Engine {
    workers: usize,
    retry: RetryPolicy,
}

impl Engine {
    pub fn new(workers: usize, retry: RetryPolicy) -> Self {
        Self {
            workers: workers.max(1),
            retry,
        }
    }

    pub fn run<I>(
        &self,
        items: I,
        source: &dyn RemoteSource,
        store: &dyn LocalStore,
        observer: &dyn Observer,
    ) -> RunTally
    where
        I: IntoIterator<Item = Result<Item, FetchError>>,
    {
        let tally = Mutex::new(RunTally::default());
        let (sender, receiver) = mpsc::sync_channel::<Item>(self.workers * 2);
        let receiver = Mutex::new(receiver);

        thread::scope(|scope| {
            for _ in 0..self.workers {
                scope.spawn(|| {
                    loop {
                        let next = lock(&receiver).recv();
                        let Ok(item) = next else { break };
                        let outcome = self.process(&item, source, store);
                        lock(&tally).record(&item, &outcome);
                        notify(observer, &item, &outcome);
                    }
                });
            }

            for next in items {
                match next {
                    Ok(item) => {
                        if sender.send(item).is_err() {
                            break;
                        }
                    }
                    Err(err) => {
                        // stop feeding, let dispatched items drain
                        tracing::error!(error = %err, "enumeration aborted");
                        lock(&tally).enumeration_error = Some(err.to_string());
                        break;
                    }
                }
            }
            drop(sender);
        });

        tally.into_inner().unwrap_or_else(|err| err.into_inner())
    }

    fn process(
        &self,
        item: &Item,
        source: &dyn RemoteSource,
        store: &dyn LocalStore,
    ) -> FetchOutcome {
        let delivery = source.delivery();
        if store.is_present(item, delivery) {
            tracing::debug!(key = %item.remote_key, "already present, skipping");
            return FetchOutcome::Skipped(SkipReason::AlreadyExists);
        }

        let attempt = || {
            let mut body = source.fetch(item)?;
            store.store(item, delivery, body.as_mut())
        };
        match self.retry.run(attempt) {
            Ok(()) => {
                tracing::debug!(key = %item.remote_key, "downloaded");
                FetchOutcome::Downloaded
            }
            Err(exhausted) => {
                tracing::warn!(
                    key = %item.remote_key,
                    attempts = exhausted.attempts,
                    error = %exhausted.error,
                    "giving up on item"
                );
                FetchOutcome::Failed {
                    error: exhausted.error.to_string(),
                    attempts: exhausted.attempts,
                }
            }
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|err| err.into_inner())
}

fn notify(observer: &dyn Observer, item: &Item, outcome: &FetchOutcome) {
    // a misbehaving observer must not take the run down with it
    let result = panic::catch_unwind(AssertUnwindSafe(|| observer.on_outcome(item, outcome)));
    if result.is_err() {
        tracing::warn!(key = %item.remote_key, "observer panicked on outcome");
    }
}
