// archiver_core/src/controller.rs

//! Bounded parallel fetching.
//! Keys are processed in fixed-size batches on a fixed-width Rayon pool and
//! results are committed in key order. A horizon signal or transient failure
//! stops scheduling: keys past it are neither fetched nor persisted, and no
//! further batch starts.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use rayon::prelude::*;

use crate::fetcher::{FetchError, FetchErrorKind};
use crate::keys::ArchiveKey;

pub const DEFAULT_WORKERS: usize = 5;
pub const DEFAULT_BATCH_SIZE: usize = 10;
pub const DEFAULT_DISPATCH_DELAY_MS: u64 = 200;
pub const DEFAULT_TRANSIENT_ABORT_THRESHOLD: usize = 5;

/// Which fetch failures mean "nothing further is published yet".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HorizonPolicy {
    horizon_on: Vec<FetchErrorKind>,
}

impl HorizonPolicy {
    pub fn new(horizon_on: &[FetchErrorKind]) -> Self {
        Self { horizon_on: horizon_on.to_vec() }
    }

    pub fn is_horizon(&self, kind: FetchErrorKind) -> bool {
        self.horizon_on.contains(&kind)
    }
}

impl Default for HorizonPolicy {
    fn default() -> Self {
        Self::new(&[FetchErrorKind::NotFound])
    }
}

/// Outcome counts of one run. Every key of the window lands in exactly one
/// of `fetched`, `skipped`, `failed`, `at_horizon` or `unreached`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary<K> {
    /// Records fetched and persisted.
    pub fetched: usize,
    /// Keys skipped because of a non-horizon validation or not-found failure.
    pub skipped: usize,
    /// Keys lost to transient failures.
    pub failed: usize,
    /// Keys whose failure counted as a horizon signal.
    pub at_horizon: usize,
    /// Keys never fetched, or fetched and discarded, because the run stopped.
    pub unreached: usize,
    /// Lowest key that signalled the horizon.
    pub horizon: Option<K>,
    /// Lowest key lost to a transient failure; nothing above it was persisted,
    /// so the next run starts here again.
    pub retry_from: Option<K>,
    /// The run was abandoned after repeated transient failures.
    pub aborted: bool,
}

impl<K> Default for RunSummary<K> {
    fn default() -> Self {
        Self {
            fetched: 0,
            skipped: 0,
            failed: 0,
            at_horizon: 0,
            unreached: 0,
            horizon: None,
            retry_from: None,
            aborted: false,
        }
    }
}

impl<K> RunSummary<K> {
    /// Number of keys the summary accounts for.
    pub fn total(&self) -> usize {
        self.fetched + self.skipped + self.failed + self.at_horizon + self.unreached
    }
}

/// Result of one key, before it is committed.
enum Resolved<R> {
    Record(R),
    Skipped,
    Failed,
    Horizon,
    NotStarted,
}

/// Commits the results of a batch in key order. A record is persisted only
/// once every lower key of the batch is settled, and never after a transient
/// failure, horizon signal or store error at a lower key.
struct Ledger<K, R> {
    next: usize,
    ready: std::collections::BTreeMap<usize, Resolved<R>>,
    halted: bool,
    store_error: Option<anyhow::Error>,
    summary: RunSummary<K>,
}

impl<K: ArchiveKey, R> Ledger<K, R> {
    fn new() -> Self {
        Self {
            next: 0,
            ready: std::collections::BTreeMap::new(),
            halted: false,
            store_error: None,
            summary: RunSummary::default(),
        }
    }

    fn start_batch(&mut self) {
        self.next = 0;
        self.ready.clear();
    }

    fn settle<S>(&mut self, batch: &[K], index: usize, resolved: Resolved<R>, store_fn: &S)
    where
        S: Fn(&R) -> anyhow::Result<()>,
    {
        self.ready.insert(index, resolved);

        while let Some(resolved) = self.ready.remove(&self.next) {
            let key = &batch[self.next];
            self.next += 1;

            match resolved {
                Resolved::Record(record) if !self.halted => match store_fn(&record) {
                    Ok(()) => {
                        self.summary.fetched += 1;
                        tracing::debug!(%key, "stored");
                    }
                    Err(e) => {
                        self.summary.unreached += 1;
                        self.halted = true;
                        self.store_error = Some(e);
                    }
                },
                Resolved::Record(_) => {
                    tracing::debug!(%key, "discarding record above the stop key");
                    self.summary.unreached += 1;
                }
                Resolved::NotStarted => self.summary.unreached += 1,
                Resolved::Skipped => self.summary.skipped += 1,
                Resolved::Failed => {
                    self.summary.failed += 1;
                    if !self.halted {
                        self.halted = true;
                        self.summary.retry_from = Some(key.clone());
                    }
                }
                Resolved::Horizon => {
                    self.summary.at_horizon += 1;
                    if !self.halted {
                        self.halted = true;
                        self.summary.horizon = Some(key.clone());
                    }
                }
            }
        }
    }
}

/// Bounded parallel fetch-and-persist loop.
#[derive(Debug, Clone)]
pub struct ConcurrencyController {
    workers: usize,
    batch_size: usize,
    dispatch_delay: std::time::Duration,
    transient_abort_threshold: usize,
    horizon_policy: HorizonPolicy,
}

impl ConcurrencyController {
    pub fn new() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            batch_size: DEFAULT_BATCH_SIZE,
            dispatch_delay: std::time::Duration::from_millis(DEFAULT_DISPATCH_DELAY_MS),
            transient_abort_threshold: DEFAULT_TRANSIENT_ABORT_THRESHOLD,
            horizon_policy: HorizonPolicy::default(),
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_dispatch_delay(mut self, dispatch_delay: std::time::Duration) -> Self {
        self.dispatch_delay = dispatch_delay;
        self
    }

    /// `0` disables escalation.
    pub fn with_transient_abort_threshold(mut self, threshold: usize) -> Self {
        self.transient_abort_threshold = threshold;
        self
    }

    pub fn with_horizon_policy(mut self, horizon_policy: HorizonPolicy) -> Self {
        self.horizon_policy = horizon_policy;
        self
    }

    pub fn get_workers(&self) -> usize {
        self.workers
    }

    pub fn get_batch_size(&self) -> usize {
        self.batch_size
    }

    /// Fetches every key and persists each result.
    ///
    /// Results are committed in key order as soon as every lower key of the
    /// batch has settled. A transient failure or horizon signal at key K is a
    /// stop key: keys above K are not started, results above K are discarded
    /// and no further batch is scheduled. The archive therefore never holds a
    /// record above a key that is still missing.
    ///
    /// # Arguments
    /// * `keys` - Ordered keys to fetch.
    /// * `fetch_fn` - Produces the record of one key.
    /// * `store_fn` - Persists one record; called from worker threads, one at a time.
    ///
    /// # Returns
    /// * `RunSummary` with per-outcome counts, or the first store error. A
    ///   store error lets the current batch drain and stops the run.
    pub fn run<K, R, I, F, S>(
        &self,
        keys: I,
        fetch_fn: F,
        store_fn: S,
    ) -> anyhow::Result<RunSummary<K>>
    where
        K: ArchiveKey,
        R: Send,
        I: IntoIterator<Item = K>,
        F: Fn(&K) -> Result<R, FetchError> + Send + Sync,
        S: Fn(&R) -> anyhow::Result<()> + Send + Sync,
    {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create thread pool: {}", e))?;

        let stop_key: Mutex<Option<K>> = Mutex::new(None);
        let ledger: Mutex<Ledger<K, R>> = Mutex::new(Ledger::new());
        let aborted = AtomicBool::new(false);
        let transient_streak = AtomicUsize::new(0);
        let counter = AtomicUsize::new(0);
        let mut skipped_batches = 0;
        let mut stopped = false;

        let lock_ledger = || ledger.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let past_stop_key = |key: &K| -> bool {
            match stop_key.lock() {
                Ok(guard) => guard.as_ref().is_some_and(|s| key > s),
                Err(_) => true,
            }
        };
        let lower_stop_key = |key: &K| {
            if let Ok(mut guard) = stop_key.lock() {
                if guard.as_ref().is_none_or(|s| key < s) {
                    *guard = Some(key.clone());
                }
            }
        };

        let mut keys = keys.into_iter().peekable();
        while keys.peek().is_some() {
            let batch: Vec<K> = keys.by_ref().take(self.batch_size).collect();
            if stopped {
                skipped_batches += batch.len();
                continue;
            }
            lock_ledger().start_batch();

            pool.install(|| {
                batch.par_iter().enumerate().for_each(|(index, key)| {
                    let resolved = if aborted.load(Ordering::Relaxed) || past_stop_key(key) {
                        Resolved::NotStarted
                    } else {
                        if !self.dispatch_delay.is_zero() {
                            std::thread::sleep(self.dispatch_delay);
                        }
                        let current = counter.fetch_add(1, Ordering::Relaxed) + 1;
                        tracing::debug!(%key, current, "fetching");

                        match fetch_fn(key) {
                            Ok(record) => {
                                transient_streak.store(0, Ordering::Relaxed);
                                Resolved::Record(record)
                            }
                            Err(error) if self.horizon_policy.is_horizon(error.kind()) => {
                                lower_stop_key(key);
                                tracing::info!(%key, %error, "Reached horizon");
                                Resolved::Horizon
                            }
                            Err(error) => match error.kind() {
                                FetchErrorKind::Transient => {
                                    lower_stop_key(key);
                                    let streak = transient_streak.fetch_add(1, Ordering::Relaxed) + 1;
                                    tracing::warn!(%key, %error, streak, "Fetch failed");
                                    if self.transient_abort_threshold > 0 && streak >= self.transient_abort_threshold {
                                        aborted.store(true, Ordering::Relaxed);
                                    }
                                    Resolved::Failed
                                }
                                FetchErrorKind::NotFound | FetchErrorKind::Validation => {
                                    tracing::warn!(%key, %error, "Skipping key");
                                    Resolved::Skipped
                                }
                            },
                        }
                    };

                    lock_ledger().settle(&batch, index, resolved, &store_fn);
                });
            });

            let mut guard = lock_ledger();
            if let Some(e) = guard.store_error.take() {
                return Err(e.context("Failed to persist record"));
            }
            if guard.halted {
                stopped = true;
            }
            drop(guard);

            if aborted.load(Ordering::Relaxed) {
                tracing::warn!(threshold = self.transient_abort_threshold, "Too many consecutive transient failures, stopping run");
                stopped = true;
            }
        }

        let mut summary = ledger
            .into_inner()
            .map_err(|_| anyhow::anyhow!("Run state poisoned"))?
            .summary;
        summary.unreached += skipped_batches;
        summary.aborted = aborted.load(Ordering::Relaxed);
        if let Some(retry_from) = &summary.retry_from {
            tracing::warn!(%retry_from, "Nothing above this key was stored, re-run to fetch it again");
        }

        anyhow::Ok(summary)
    }
}

impl Default for ConcurrencyController {
    fn default() -> Self {
        Self::new()
    }
}
