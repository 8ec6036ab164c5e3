use std::{
    fs::OpenOptions,
    io::{self, Write},
    path::PathBuf,
    sync::atomic::{AtomicBool, Ordering},
};

use tokio_util::sync::CancellationToken;

use crate::derive::CandidateKey;

/// A matched key as persisted to the found-key log: two appended lines,
/// address then private-key WIF. The log is append-only and never rewritten.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoundKeyRecord {
    pub address: String,
    pub wif: String,
}

impl From<&CandidateKey> for FoundKeyRecord {
    fn from(key: &CandidateKey) -> Self {
        Self {
            address: key.address.clone(),
            wif: key.wif.clone(),
        }
    }
}

/// The single-shot match sink shared by all workers. The first worker to
/// report wins; it persists the record and raises the cancellation signal,
/// which is never cleared. Every later report is a no-op, so a match race
/// between workers still appends exactly one record.
pub struct MatchHandler {
    found_path: PathBuf,
    reported: AtomicBool,
    token: CancellationToken,
}

impl MatchHandler {
    pub fn new(found_path: PathBuf, token: CancellationToken) -> Self {
        Self {
            found_path,
            reported: AtomicBool::new(false),
            token,
        }
    }

    /// Report a match. Returns `Ok(true)` for the winning report only.
    pub fn report(&self, key: &CandidateKey) -> io::Result<bool> {
        if self
            .reported
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Ok(false);
        }

        tracing::info!("Matching address found: {}", key.address);
        let persisted = self.append(key);
        // The log write settles before the pool is told to stop; shutdown
        // happens even if the write failed.
        self.token.cancel();
        persisted.map(|()| true)
    }

    pub fn matched(&self) -> bool {
        self.reported.load(Ordering::SeqCst)
    }

    fn append(&self, key: &CandidateKey) -> io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.found_path)?;
        writeln!(file, "{}", key.address)?;
        writeln!(file, "{}", key.wif)?;
        file.sync_all()
    }
}

#[cfg(test)]
mod tests {
    use std::{fs, sync::Arc, thread};

    use super::*;

    fn candidate(n: u64) -> CandidateKey {
        CandidateKey {
            index: Some(n),
            address: format!("1Address{n}"),
            wif: format!("KwWif{n}"),
        }
    }

    #[test]
    fn racing_reports_append_exactly_one_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("foundkey.txt");
        let handler = Arc::new(MatchHandler::new(path.clone(), CancellationToken::new()));

        let handles: Vec<_> = (0..2)
            .map(|n| {
                let handler = handler.clone();
                thread::spawn(move || handler.report(&candidate(n)).unwrap())
            })
            .collect();

        let wins: Vec<bool> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(wins.iter().filter(|won| **won).count(), 1);

        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 2);
        assert!(handler.matched());
    }

    #[test]
    fn report_raises_cancellation() {
        let dir = tempfile::tempdir().unwrap();
        let token = CancellationToken::new();
        let handler = MatchHandler::new(dir.path().join("foundkey.txt"), token.clone());

        assert!(handler.report(&candidate(7)).unwrap());
        assert!(token.is_cancelled());
    }

    #[test]
    fn records_accumulate_across_matches() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("foundkey.txt");

        // Two independent runs against the same log file.
        for n in 0..2 {
            let handler = MatchHandler::new(path.clone(), CancellationToken::new());
            handler.report(&candidate(n)).unwrap();
        }

        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 4);
    }
}
