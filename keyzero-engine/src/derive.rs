use bitcoin::{
    secp256k1::{self, Secp256k1, SecretKey},
    Address, Network, PrivateKey, PublicKey,
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DeriveError {
    #[error("secret value out of curve range: {0}")]
    OutOfRange(String),

    #[error("invalid private key encoding: {0}")]
    InvalidEncoding(String),
}

/// One candidate private key and its derived address. `index` is only
/// present for candidates drawn from a sequential range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateKey {
    pub index: Option<u64>,
    pub address: String,
    pub wif: String,
}

/// Derives compressed-P2PKH mainnet candidates from indices, raw entropy or
/// user-supplied key encodings. Holds a single secp256k1 context; cloning is
/// cheap enough to hand one to every worker.
#[derive(Clone)]
pub struct KeyDeriver {
    secp: Secp256k1<secp256k1::All>,
}

impl Default for KeyDeriver {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyDeriver {
    pub fn new() -> Self {
        Self {
            secp: Secp256k1::new(),
        }
    }

    /// Derive the candidate for a sequential index. The index-to-key mapping
    /// is a pure function: the secret key is the index as a 32-byte
    /// big-endian integer, so a given index always derives the same address.
    pub fn from_index(&self, index: u64) -> Result<CandidateKey, DeriveError> {
        let mut secret = [0u8; 32];
        secret[24..].copy_from_slice(&index.to_be_bytes());
        let key = SecretKey::from_slice(&secret)
            .map_err(|e| DeriveError::OutOfRange(e.to_string()))?;
        Ok(self.encode(key, Some(index)))
    }

    /// Derive the candidate for 32 bytes of raw entropy (random mode).
    pub fn from_entropy(&self, entropy: &[u8; 32]) -> Result<CandidateKey, DeriveError> {
        let key = SecretKey::from_slice(entropy)
            .map_err(|e| DeriveError::OutOfRange(e.to_string()))?;
        Ok(self.encode(key, None))
    }

    /// Derive the candidate for a user-supplied private key, accepting WIF
    /// or a 64-character hex string.
    pub fn from_raw(&self, raw: &str) -> Result<CandidateKey, DeriveError> {
        let raw = raw.trim();
        if let Ok(private_key) = PrivateKey::from_wif(raw) {
            return Ok(self.address_for(private_key, None));
        }

        let bytes = hex::decode(raw)
            .map_err(|_| DeriveError::InvalidEncoding("expected WIF or hex".to_string()))?;
        let key = SecretKey::from_slice(&bytes)
            .map_err(|e| DeriveError::InvalidEncoding(e.to_string()))?;
        Ok(self.encode(key, None))
    }

    /// Derive a fresh random candidate.
    pub fn random(&self) -> CandidateKey {
        use rand::RngCore;

        let mut rng = rand::thread_rng();
        loop {
            let mut entropy = [0u8; 32];
            rng.fill_bytes(&mut entropy);
            // Rejected only for entropy outside the curve order.
            if let Ok(key) = self.from_entropy(&entropy) {
                return key;
            }
        }
    }

    fn encode(&self, key: SecretKey, index: Option<u64>) -> CandidateKey {
        self.address_for(PrivateKey::new(key, Network::Bitcoin), index)
    }

    fn address_for(&self, private_key: PrivateKey, index: Option<u64>) -> CandidateKey {
        let public_key = PublicKey::from_private_key(&self.secp, &private_key);
        let address = Address::p2pkh(&public_key, Network::Bitcoin);

        CandidateKey {
            index,
            address: address.to_string(),
            wif: private_key.to_wif(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Textbook vectors for secret key 1 (compressed, mainnet).
    const KEY_ONE_ADDRESS: &str = "1BgGZ9tcN4rm9KBzDn7KprQz87SZ26SAMH";
    const KEY_ONE_WIF: &str = "KwDiBf89QgGbjEhKnhXJuH7LrciVrZi3qYjgd9M7rFU73sVHnoWn";

    #[test]
    fn index_one_derives_known_vector() {
        let deriver = KeyDeriver::new();
        let key = deriver.from_index(1).unwrap();
        assert_eq!(key.index, Some(1));
        assert_eq!(key.address, KEY_ONE_ADDRESS);
        assert_eq!(key.wif, KEY_ONE_WIF);
    }

    #[test]
    fn index_derivation_is_deterministic() {
        let deriver = KeyDeriver::new();
        let first = deriver.from_index(123_456).unwrap();
        let second = KeyDeriver::new().from_index(123_456).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn index_zero_is_rejected() {
        let deriver = KeyDeriver::new();
        assert!(matches!(
            deriver.from_index(0),
            Err(DeriveError::OutOfRange(_))
        ));
    }

    #[test]
    fn raw_wif_and_hex_agree() {
        let deriver = KeyDeriver::new();
        let from_wif = deriver.from_raw(KEY_ONE_WIF).unwrap();
        let from_hex = deriver
            .from_raw("0000000000000000000000000000000000000000000000000000000000000001")
            .unwrap();
        assert_eq!(from_wif.address, KEY_ONE_ADDRESS);
        assert_eq!(from_hex.address, KEY_ONE_ADDRESS);
        assert_eq!(from_hex.wif, KEY_ONE_WIF);
    }

    #[test]
    fn malformed_raw_key_is_reported() {
        let deriver = KeyDeriver::new();
        assert!(deriver.from_raw("not a key").is_err());
    }
}
