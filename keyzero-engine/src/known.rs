use std::{collections::HashSet, fs, io, path::Path};

use crate::constants::storage::WATCHLIST_MARKER;

/// The watch list of addresses of special interest, loaded once at startup
/// and immutable for the lifetime of the process. Consulted before any
/// network call so a known address never costs a round trip.
#[derive(Debug, Default)]
pub struct KnownAddressSet(HashSet<String>);

impl KnownAddressSet {
    /// Load the watch list, one address per line. Blank lines and label
    /// lines containing the reserved marker token are dropped. A missing
    /// file is an empty set, not an error.
    pub fn load(path: &Path) -> io::Result<Self> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!("no watch list at {}, starting empty", path.display());
                return Ok(Self::default());
            }
            Err(e) => return Err(e),
        };

        let addresses: HashSet<String> = contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.contains(WATCHLIST_MARKER))
            .map(String::from)
            .collect();

        tracing::info!(
            "Loaded {} watched addresses from {}",
            addresses.len(),
            path.display()
        );
        Ok(Self(addresses))
    }

    pub fn contains(&self, address: &str) -> bool {
        self.0.contains(address)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
