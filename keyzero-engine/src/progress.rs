use std::{fmt, fs, io, path::Path, str::FromStr};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("invalid snapshot line: {0}")]
    InvalidLine(String),

    #[error("snapshot violates range invariant: {0}")]
    InvalidRange(String),
}

/// The persisted progress of a sequential scan, serialized as the single
/// line `cursor-rangeStart-rangeEnd`. The cursor is the next index to
/// dispatch; the bounds are the originally requested range, preserved across
/// resumption.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressSnapshot {
    pub cursor: u64,
    pub range_start: u64,
    pub range_end: u64,
}

impl ProgressSnapshot {
    /// Read the snapshot file. An absent or empty file means no prior
    /// progress; an unparseable one is logged and treated the same way, so a
    /// damaged cache can never abort a scan.
    pub fn load(path: &Path) -> io::Result<Option<Self>> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };

        if contents.trim().is_empty() {
            return Ok(None);
        }

        match contents.trim().parse() {
            Ok(snapshot) => Ok(Some(snapshot)),
            Err(e) => {
                tracing::warn!("ignoring corrupted progress snapshot: {e}");
                Ok(None)
            }
        }
    }

    /// Overwrite the snapshot file wholesale. Written to a sibling temp file
    /// and renamed into place so a concurrent restart never reads a torn
    /// line.
    pub fn store(&self, path: &Path) -> io::Result<()> {
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, self.to_string())?;
        fs::rename(&tmp, path)
    }
}

impl FromStr for ProgressSnapshot {
    type Err = SnapshotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse = |field: &str| {
            field
                .trim()
                .parse::<u64>()
                .map_err(|_| SnapshotError::InvalidLine(s.to_string()))
        };

        let fields: Vec<&str> = s.split('-').collect();
        let &[cursor, range_start, range_end] = fields.as_slice() else {
            return Err(SnapshotError::InvalidLine(s.to_string()));
        };
        let cursor = parse(cursor)?;
        let range_start = parse(range_start)?;
        let range_end = parse(range_end)?;

        if range_start > cursor || cursor > range_end {
            return Err(SnapshotError::InvalidRange(s.to_string()));
        }

        Ok(Self {
            cursor,
            range_start,
            range_end,
        })
    }
}

impl fmt::Display for ProgressSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.cursor, self.range_start, self.range_end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_round_trips() {
        let snapshot = ProgressSnapshot {
            cursor: 500,
            range_start: 0,
            range_end: 1000,
        };
        assert_eq!(snapshot.to_string(), "500-0-1000");
        assert_eq!("500-0-1000".parse::<ProgressSnapshot>().unwrap(), snapshot);
    }

    #[test]
    fn rejects_malformed_lines() {
        assert!("".parse::<ProgressSnapshot>().is_err());
        assert!("abc-0-10".parse::<ProgressSnapshot>().is_err());
        assert!("5-0".parse::<ProgressSnapshot>().is_err());
        assert!("5-0-10-3".parse::<ProgressSnapshot>().is_err());
        // Cursor outside the range bounds.
        assert!("11-0-10".parse::<ProgressSnapshot>().is_err());
        assert!("1-5-10".parse::<ProgressSnapshot>().is_err());
    }

    #[test]
    fn store_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.txt");
        let snapshot = ProgressSnapshot {
            cursor: 42,
            range_start: 10,
            range_end: 100,
        };

        snapshot.store(&path).unwrap();
        assert_eq!(ProgressSnapshot::load(&path).unwrap(), Some(snapshot));
    }

    #[test]
    fn absent_empty_and_corrupt_mean_fresh_start() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.txt");

        assert_eq!(ProgressSnapshot::load(&path).unwrap(), None);

        fs::write(&path, "").unwrap();
        assert_eq!(ProgressSnapshot::load(&path).unwrap(), None);

        fs::write(&path, "garbage").unwrap();
        assert_eq!(ProgressSnapshot::load(&path).unwrap(), None);
    }
}
