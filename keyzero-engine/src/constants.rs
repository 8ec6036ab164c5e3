pub mod providers {
    /// Blockchain.info total-received endpoint; responds with plain numeric text.
    pub const BLOCKCHAIN_INFO_URL: &str = "https://blockchain.info/q/getreceivedbyaddress/";

    /// BlockCypher address balance endpoint; responds with a JSON object
    /// carrying a `balance` field.
    pub const BLOCKCYPHER_URL_BASE: &str = "https://api.blockcypher.com/v1/btc/main/addrs/";

    /// Blockstream address endpoint; responds with a JSON object carrying
    /// `chain_stats.funded_txo_sum`.
    pub const BLOCKSTREAM_URL: &str = "https://blockstream.info/api/address/";

    /// Per-request timeout in seconds for any balance provider.
    pub const REQUEST_TIMEOUT_S: u64 = 10;
}

pub mod storage {
    /// The default path of the progress cache file.
    pub const DEFAULT_CACHE_FILE: &str = "cache.txt";

    /// The default path of the watch-list file.
    pub const DEFAULT_ADDRESS_FILE: &str = "address.txt";

    /// The default path of the append-only found-key log.
    pub const DEFAULT_FOUND_FILE: &str = "foundkey.txt";

    /// Watch-list lines containing this marker are labels, not addresses.
    pub const WATCHLIST_MARKER: &str = "wallet";
}

pub mod scan {
    /// The interval in seconds in which to flush the progress snapshot.
    pub const PROGRESS_FLUSH_INTERVAL_S: u64 = 2;

    /// The interval in seconds in which to print scan metrics.
    pub const METRICS_PRINT_INTERVAL_S: u64 = 2;
}
