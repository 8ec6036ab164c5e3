use async_trait::async_trait;
use eyre::Result;
use serde::Deserialize;
use thiserror::Error;
use tokio::time::Duration;

use crate::constants::providers;

#[derive(Error, Debug)]
pub enum OracleError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("unexpected status code: {0}")]
    Status(reqwest::StatusCode),

    #[error("malformed provider response: {0}")]
    Malformed(String),
}

/// One external balance-lookup service. Each provider has its own response
/// shape; only the boolean "has this address ever been funded" predicate is
/// shared.
#[async_trait]
pub trait BalanceProvider: Send + Sync {
    fn name(&self) -> &'static str;

    fn format_url(&self, address: &str) -> String;

    /// Apply the provider's funded predicate to a raw response body.
    fn parse_funded(&self, body: &str) -> Result<bool, OracleError>;

    async fn is_funded(
        &self,
        client: &reqwest::Client,
        address: &str,
    ) -> Result<bool, OracleError> {
        let response = client.get(self.format_url(address)).send().await?;
        if !response.status().is_success() {
            return Err(OracleError::Status(response.status()));
        }
        let body = response.text().await?;
        self.parse_funded(&body)
    }
}

/// Blockchain.info `getreceivedbyaddress`: plain numeric text, total satoshi
/// ever received.
pub struct BlockchainInfo;

#[async_trait]
impl BalanceProvider for BlockchainInfo {
    fn name(&self) -> &'static str {
        "blockchain.info"
    }

    fn format_url(&self, address: &str) -> String {
        format!("{}{address}", providers::BLOCKCHAIN_INFO_URL)
    }

    fn parse_funded(&self, body: &str) -> Result<bool, OracleError> {
        let received: u64 = body
            .trim()
            .parse()
            .map_err(|_| OracleError::Malformed(body.to_string()))?;
        Ok(received > 0)
    }
}

/// BlockCypher address balance: JSON object with a `balance` field.
pub struct BlockCypher;

#[derive(Deserialize)]
struct BlockCypherBalance {
    #[serde(default)]
    balance: u64,
}

#[async_trait]
impl BalanceProvider for BlockCypher {
    fn name(&self) -> &'static str {
        "blockcypher"
    }

    fn format_url(&self, address: &str) -> String {
        format!("{}{address}/balance", providers::BLOCKCYPHER_URL_BASE)
    }

    fn parse_funded(&self, body: &str) -> Result<bool, OracleError> {
        let parsed: BlockCypherBalance =
            serde_json::from_str(body).map_err(|e| OracleError::Malformed(e.to_string()))?;
        Ok(parsed.balance > 0)
    }
}

/// Blockstream address stats: JSON object with the funded output sum nested
/// under `chain_stats`.
pub struct Blockstream;

#[derive(Deserialize)]
struct BlockstreamAddress {
    chain_stats: BlockstreamChainStats,
}

#[derive(Deserialize)]
struct BlockstreamChainStats {
    #[serde(default)]
    funded_txo_sum: u64,
}

#[async_trait]
impl BalanceProvider for Blockstream {
    fn name(&self) -> &'static str {
        "blockstream"
    }

    fn format_url(&self, address: &str) -> String {
        format!("{}{address}", providers::BLOCKSTREAM_URL)
    }

    fn parse_funded(&self, body: &str) -> Result<bool, OracleError> {
        let parsed: BlockstreamAddress =
            serde_json::from_str(body).map_err(|e| OracleError::Malformed(e.to_string()))?;
        Ok(parsed.chain_stats.funded_txo_sum > 0)
    }
}

/// Asks a fixed, ordered list of providers whether an address has ever
/// received funds. The first positive predicate short-circuits; any failing
/// provider is skipped; a run where every provider fails is reported as
/// unfunded rather than retried, trading an accepted false-negative risk for
/// bounded scan throughput.
pub struct BalanceOracle {
    client: reqwest::Client,
    providers: Vec<Box<dyn BalanceProvider>>,
}

impl BalanceOracle {
    pub fn new(providers: Vec<Box<dyn BalanceProvider>>) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Accept",
            reqwest::header::HeaderValue::from_static("application/json"),
        );
        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(providers::REQUEST_TIMEOUT_S))
            .build()?;

        Ok(Self { client, providers })
    }

    /// The default mainnet provider chain.
    pub fn mainnet() -> Result<Self> {
        Self::new(vec![
            Box::new(BlockchainInfo),
            Box::new(BlockCypher),
            Box::new(Blockstream),
        ])
    }

    pub async fn has_ever_received(&self, address: &str) -> bool {
        for provider in &self.providers {
            match provider.is_funded(&self.client, address).await {
                Ok(true) => return true,
                Ok(false) => {}
                Err(e) => {
                    tracing::debug!("provider {} skipped for {address}: {e}", provider.name());
                }
            }
        }

        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blockchain_info_parses_plain_text() {
        assert!(!BlockchainInfo.parse_funded("0").unwrap());
        assert!(BlockchainInfo.parse_funded("5000000000\n").unwrap());
        assert!(BlockchainInfo.parse_funded("<html>rate limited</html>").is_err());
    }

    #[test]
    fn blockcypher_parses_balance_field() {
        assert!(BlockCypher
            .parse_funded(r#"{"address":"x","balance":546,"final_balance":546}"#)
            .unwrap());
        assert!(!BlockCypher.parse_funded(r#"{"balance":0}"#).unwrap());
        assert!(BlockCypher.parse_funded("not json").is_err());
    }

    #[test]
    fn blockstream_parses_funded_txo_sum() {
        let body = r#"{"address":"x","chain_stats":{"funded_txo_sum":1000,"tx_count":2}}"#;
        assert!(Blockstream.parse_funded(body).unwrap());
        let empty = r#"{"chain_stats":{"funded_txo_sum":0}}"#;
        assert!(!Blockstream.parse_funded(empty).unwrap());
        assert!(Blockstream.parse_funded(r#"{"no_stats":true}"#).is_err());
    }

    struct FixedProvider {
        outcome: Option<bool>,
    }

    #[async_trait]
    impl BalanceProvider for FixedProvider {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn format_url(&self, _address: &str) -> String {
            String::new()
        }

        fn parse_funded(&self, _body: &str) -> Result<bool, OracleError> {
            unreachable!("is_funded is overridden")
        }

        async fn is_funded(
            &self,
            _client: &reqwest::Client,
            _address: &str,
        ) -> Result<bool, OracleError> {
            match self.outcome {
                Some(funded) => Ok(funded),
                None => Err(OracleError::Malformed("provider down".to_string())),
            }
        }
    }

    #[tokio::test]
    async fn fallback_reaches_later_providers() {
        let oracle = BalanceOracle::new(vec![
            Box::new(FixedProvider { outcome: None }),
            Box::new(FixedProvider { outcome: None }),
            Box::new(FixedProvider {
                outcome: Some(true),
            }),
        ])
        .unwrap();

        assert!(oracle.has_ever_received("1BitcoinEaterAddressDontSendf59kuE").await);
    }

    #[tokio::test]
    async fn total_failure_reads_as_unfunded() {
        let oracle = BalanceOracle::new(vec![
            Box::new(FixedProvider { outcome: None }),
            Box::new(FixedProvider { outcome: None }),
            Box::new(FixedProvider { outcome: None }),
        ])
        .unwrap();

        assert!(!oracle.has_ever_received("1BitcoinEaterAddressDontSendf59kuE").await);
    }
}
