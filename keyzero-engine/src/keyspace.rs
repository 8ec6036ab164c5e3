use std::sync::atomic::{AtomicU64, Ordering};

use rand::RngCore;

/// The keyspace traversal strategy for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanMode {
    /// A contiguous, deterministic integer range. Resumable.
    Sequential,
    /// Independent uniform draws, unbounded, deliberately without any
    /// intra-run or cross-run duplicate avoidance.
    Random,
}

/// One unit of work handed to a worker.
#[derive(Debug, Clone, Copy)]
pub enum Draw {
    Index(u64),
    Entropy([u8; 32]),
}

/// The shared candidate source for all workers.
///
/// Sequential mode hands out every index in `[cursor, range_end)` exactly
/// once via an atomic counter; the cursor never decreases and never passes
/// `range_end`. Random mode never exhausts and is only stopped by the
/// cancellation signal observed in the worker loop.
pub struct Keyspace {
    mode: ScanMode,
    cursor: AtomicU64,
    range_start: u64,
    range_end: u64,
    drawn: AtomicU64,
}

impl Keyspace {
    /// A sequential keyspace over `[cursor, range_end)`. `cursor` equals
    /// `range_start` on a fresh run and the persisted cursor on resumption.
    pub fn sequential(cursor: u64, range_start: u64, range_end: u64) -> Self {
        Self {
            mode: ScanMode::Sequential,
            cursor: AtomicU64::new(cursor),
            range_start,
            range_end,
            drawn: AtomicU64::new(0),
        }
    }

    pub fn random() -> Self {
        Self {
            mode: ScanMode::Random,
            cursor: AtomicU64::new(0),
            range_start: 0,
            range_end: 0,
            drawn: AtomicU64::new(0),
        }
    }

    pub fn mode(&self) -> ScanMode {
        self.mode
    }

    /// Hand out the next candidate, or `None` once a sequential range is
    /// exhausted. Safe to call from any number of workers concurrently.
    pub fn next(&self) -> Option<Draw> {
        match self.mode {
            ScanMode::Sequential => {
                let index = self
                    .cursor
                    .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |cursor| {
                        (cursor < self.range_end).then_some(cursor + 1)
                    })
                    .ok()?;
                self.drawn.fetch_add(1, Ordering::Relaxed);
                Some(Draw::Index(index))
            }
            ScanMode::Random => {
                let mut entropy = [0u8; 32];
                rand::thread_rng().fill_bytes(&mut entropy);
                self.drawn.fetch_add(1, Ordering::Relaxed);
                Some(Draw::Entropy(entropy))
            }
        }
    }

    /// The next index to be handed out (equivalently, the highest dispatched
    /// index plus one). Only meaningful in sequential mode.
    pub fn cursor(&self) -> u64 {
        self.cursor.load(Ordering::SeqCst)
    }

    /// Number of candidates handed out during this run, either mode.
    pub fn drawn(&self) -> u64 {
        self.drawn.load(Ordering::Relaxed)
    }

    pub fn range(&self) -> (u64, u64) {
        (self.range_start, self.range_end)
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::HashSet, sync::Arc, thread};

    use super::*;

    #[test]
    fn sequential_dispatch_is_exactly_once() {
        let keyspace = Arc::new(Keyspace::sequential(0, 0, 1000));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let keyspace = keyspace.clone();
                thread::spawn(move || {
                    let mut seen = Vec::new();
                    while let Some(Draw::Index(index)) = keyspace.next() {
                        seen.push(index);
                    }
                    seen
                })
            })
            .collect();

        let mut all = Vec::new();
        for handle in handles {
            all.extend(handle.join().unwrap());
        }

        let unique: HashSet<u64> = all.iter().copied().collect();
        assert_eq!(all.len(), 1000, "duplicate dispatch");
        assert_eq!(unique.len(), 1000, "gap in dispatch");
        assert!(unique.contains(&0) && unique.contains(&999));
        assert_eq!(keyspace.cursor(), 1000);
        assert_eq!(keyspace.drawn(), 1000);
    }

    #[test]
    fn sequential_resumes_from_cursor() {
        let keyspace = Keyspace::sequential(500, 0, 1000);
        assert_eq!(keyspace.range(), (0, 1000));
        match keyspace.next() {
            Some(Draw::Index(index)) => assert_eq!(index, 500),
            other => panic!("unexpected draw: {other:?}"),
        }
    }

    #[test]
    fn exhausted_range_yields_none() {
        let keyspace = Keyspace::sequential(10, 0, 10);
        assert!(keyspace.next().is_none());
        assert_eq!(keyspace.cursor(), 10);
    }

    #[test]
    fn random_never_exhausts() {
        let keyspace = Keyspace::random();
        for _ in 0..64 {
            assert!(matches!(keyspace.next(), Some(Draw::Entropy(_))));
        }
        assert_eq!(keyspace.drawn(), 64);
    }
}
