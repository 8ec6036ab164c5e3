use clap::{Parser, Subcommand};
use keyzero_engine::constants::storage;

#[derive(Subcommand)]
pub enum ScanStrategy {
    /// Scan a contiguous index range in order, resuming from the cache file.
    Sequential {
        /// First index of the range.
        #[arg(short, long, default_value_t = 1)]
        start: u64,
        /// One past the last index of the range.
        #[arg(short, long)]
        end: u64,
    },
    /// Draw uniformly random keys without bound. Not resumable.
    Random,
}

#[derive(Subcommand)]
pub enum Command {
    /// Search the keyspace for addresses that have ever received funds.
    Scan {
        /// The keyspace traversal strategy.
        #[command(subcommand)]
        strategy: ScanStrategy,
        /// Number of concurrent workers; capped at the available parallelism.
        #[arg(short, long)]
        workers: Option<usize>,
        /// The path of the progress cache file.
        #[arg(long, env = "KEYZERO_CACHE_FILE", default_value = storage::DEFAULT_CACHE_FILE)]
        cache_file: String,
        /// The path of the watch-list file.
        #[arg(long, env = "KEYZERO_ADDRESS_FILE", default_value = storage::DEFAULT_ADDRESS_FILE)]
        address_file: String,
        /// The path of the append-only found-key log.
        #[arg(long, env = "KEYZERO_FOUND_FILE", default_value = storage::DEFAULT_FOUND_FILE)]
        found_file: String,
    },
    /// Generate one random key pair and print it.
    Generate,
    /// Derive the public address for a private key (WIF or hex).
    Address {
        /// The private key to derive from.
        #[arg(short, long)]
        key: String,
    },
}

#[derive(Parser)]
#[command(author, version, about = "Bitcoin keyspace scanner")]
pub struct Cli {
    #[command(subcommand)]
    pub subcommand: Command,
}
