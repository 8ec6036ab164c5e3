use std::{num::NonZeroUsize, path::PathBuf, sync::Arc, thread};

use eyre::Result;
use tokio::{
    sync::Mutex,
    task::JoinHandle,
    time::{sleep, Duration},
};
use tokio_util::sync::CancellationToken;

use crate::{
    constants::scan::{METRICS_PRINT_INTERVAL_S, PROGRESS_FLUSH_INTERVAL_S},
    derive::KeyDeriver,
    keyspace::{Draw, Keyspace, ScanMode},
    known::KnownAddressSet,
    match_handler::{FoundKeyRecord, MatchHandler},
    metrics::ScanMetrics,
    oracle::BalanceOracle,
    progress::ProgressSnapshot,
};

/// The keyspace traversal requested on the command line.
#[derive(Debug, Clone, Copy)]
pub enum ScanRequest {
    /// Scan `[start, end)` in order. A persisted snapshot overrides these
    /// bounds and supplies the resume cursor.
    Sequential { start: u64, end: u64 },
    /// Draw random keys until cancelled.
    Random,
}

pub struct ScannerOptions {
    /// Worker count; `None` or anything above the available parallelism is
    /// clamped to the number of available execution units.
    pub workers: Option<usize>,
    pub cache_path: PathBuf,
    pub found_path: PathBuf,
}

/// The scan coordinator: resolves resumption, spawns the worker pool plus
/// the status reporter and progress tracker tasks, and drives orderly
/// shutdown once a match is reported, the range is exhausted, or the run is
/// cancelled from outside.
pub struct Scanner {
    oracle: Arc<BalanceOracle>,
    known: Arc<KnownAddressSet>,
    options: ScannerOptions,
}

impl Scanner {
    pub fn new(oracle: BalanceOracle, known: KnownAddressSet, options: ScannerOptions) -> Self {
        Self {
            oracle: Arc::new(oracle),
            known: Arc::new(known),
            options,
        }
    }

    /// Run the scan to completion. Returns the found key, if any; `None`
    /// means the range was exhausted or the run was cancelled.
    pub async fn run(
        &self,
        request: ScanRequest,
        token: CancellationToken,
    ) -> Result<Option<FoundKeyRecord>> {
        let keyspace = Arc::new(self.resolve_keyspace(request)?);
        let sequential = keyspace.mode() == ScanMode::Sequential;
        let (range_start, range_end) = keyspace.range();

        let metrics = Arc::new(Mutex::new(ScanMetrics::new(
            sequential,
            range_start,
            range_end,
            keyspace.cursor(),
        )));

        let reporter_handle = self.spawn_reporter(keyspace.clone(), metrics.clone(), token.clone());
        let tracker_handle = sequential
            .then(|| self.spawn_progress_tracker(keyspace.clone(), token.clone()));

        let handler = Arc::new(MatchHandler::new(
            self.options.found_path.clone(),
            token.clone(),
        ));

        let workers = self.worker_count();
        tracing::info!("Starting scan with {workers} workers");
        let worker_handles: Vec<_> = (0..workers)
            .map(|_| self.spawn_worker(keyspace.clone(), handler.clone(), token.clone()))
            .collect();

        let mut found = None;
        let mut worker_failure = None;
        for handle in worker_handles {
            match handle.await {
                Ok(Some(record)) => found = Some(record),
                Ok(None) => {}
                // Keep joining; the background tasks must still be reaped.
                Err(e) => worker_failure = Some(e),
            }
        }

        // Workers are done either way; stop the background tasks too.
        token.cancel();
        reporter_handle.await?;
        if let Some(handle) = tracker_handle {
            handle.await?;
        }
        if let Some(e) = worker_failure {
            return Err(e.into());
        }

        if sequential {
            self.flush_progress(&keyspace);
        }
        let mut metrics = metrics.lock().await;
        metrics.latest_cursor = Self::position(&keyspace);
        metrics.checked = keyspace.drawn();
        metrics.print();

        Ok(found)
    }

    /// Build the keyspace for this run. A sequential scan resumes from a
    /// well-formed snapshot, preserving the originally requested bounds; a
    /// fresh one records its range before any index is handed out.
    fn resolve_keyspace(&self, request: ScanRequest) -> Result<Keyspace> {
        match request {
            ScanRequest::Sequential { start, end } => {
                let snapshot = match ProgressSnapshot::load(&self.options.cache_path)? {
                    Some(snapshot) => {
                        tracing::info!(
                            "Found snapshot, resuming range {}-{} from index {}",
                            snapshot.range_start,
                            snapshot.range_end,
                            snapshot.cursor
                        );
                        snapshot
                    }
                    None => {
                        let snapshot = ProgressSnapshot {
                            cursor: start,
                            range_start: start,
                            range_end: end,
                        };
                        snapshot.store(&self.options.cache_path)?;
                        snapshot
                    }
                };

                Ok(Keyspace::sequential(
                    snapshot.cursor,
                    snapshot.range_start,
                    snapshot.range_end,
                ))
            }
            ScanRequest::Random => Ok(Keyspace::random()),
        }
    }

    fn worker_count(&self) -> usize {
        let available = thread::available_parallelism()
            .map(NonZeroUsize::get)
            .unwrap_or(1);
        match self.options.workers {
            // The user may reduce the pool, never grow it past the machine.
            Some(requested) => requested.clamp(1, available),
            None => available,
        }
    }

    fn spawn_worker(
        &self,
        keyspace: Arc<Keyspace>,
        handler: Arc<MatchHandler>,
        token: CancellationToken,
    ) -> JoinHandle<Option<FoundKeyRecord>> {
        let oracle = self.oracle.clone();
        let known = self.known.clone();

        tokio::spawn(async move {
            let deriver = KeyDeriver::new();

            loop {
                // Cancellation is cooperative: checked between iterations,
                // never preempting an in-flight balance lookup.
                if token.is_cancelled() {
                    tracing::debug!("Shutting down worker...");
                    return None;
                }

                let Some(draw) = keyspace.next() else {
                    tracing::debug!("Keyspace exhausted, shutting down worker...");
                    return None;
                };

                let candidate = match draw {
                    Draw::Index(index) => deriver.from_index(index),
                    Draw::Entropy(entropy) => deriver.from_entropy(&entropy),
                };
                let candidate = match candidate {
                    Ok(candidate) => candidate,
                    Err(e) => {
                        tracing::debug!("skipping underivable candidate: {e}");
                        continue;
                    }
                };

                // The watch list short-circuits the network round trip.
                if known.contains(&candidate.address)
                    || oracle.has_ever_received(&candidate.address).await
                {
                    return match handler.report(&candidate) {
                        Ok(true) => Some(FoundKeyRecord::from(&candidate)),
                        Ok(false) => None,
                        Err(e) => {
                            // The key must still reach the operator even if
                            // the log write failed.
                            tracing::error!("cannot persist found key: {e}");
                            Some(FoundKeyRecord::from(&candidate))
                        }
                    };
                }
            }
        })
    }

    fn spawn_reporter(
        &self,
        keyspace: Arc<Keyspace>,
        metrics: Arc<Mutex<ScanMetrics>>,
        token: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    () = token.cancelled() => {
                        tracing::debug!("Shutting down reporter...");
                        return;
                    }
                    () = sleep(Duration::from_secs(METRICS_PRINT_INTERVAL_S)) => {
                        let mut metrics = metrics.lock().await;
                        metrics.latest_cursor = Self::position(&keyspace);
                        metrics.checked = keyspace.drawn();
                        metrics.print();
                    }
                }
            }
        })
    }

    fn spawn_progress_tracker(
        &self,
        keyspace: Arc<Keyspace>,
        token: CancellationToken,
    ) -> JoinHandle<()> {
        let cache_path = self.options.cache_path.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    () = token.cancelled() => {
                        tracing::debug!("Shutting down progress tracker...");
                        return;
                    }
                    () = sleep(Duration::from_secs(PROGRESS_FLUSH_INTERVAL_S)) => {
                        let (range_start, range_end) = keyspace.range();
                        let snapshot = ProgressSnapshot {
                            cursor: keyspace.cursor(),
                            range_start,
                            range_end,
                        };
                        if let Err(e) = snapshot.store(&cache_path) {
                            tracing::warn!("cannot persist progress snapshot: {e}");
                        }
                    }
                }
            }
        })
    }

    fn flush_progress(&self, keyspace: &Keyspace) {
        let (range_start, range_end) = keyspace.range();
        let snapshot = ProgressSnapshot {
            cursor: keyspace.cursor(),
            range_start,
            range_end,
        };
        if let Err(e) = snapshot.store(&self.options.cache_path) {
            tracing::warn!("cannot persist final progress snapshot: {e}");
        }
    }

    fn position(keyspace: &Keyspace) -> u64 {
        match keyspace.mode() {
            ScanMode::Sequential => keyspace.cursor(),
            ScanMode::Random => keyspace.drawn(),
        }
    }
}
