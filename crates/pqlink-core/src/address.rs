//! Post-quantum addresses
//!
//! An address commits to `(network, version, key type, SHA-256(public key))`.
//! [`encode_address`] resolves the algorithm's key-type tag and hands the
//! fields to [`codec`], which owns the binary framing and checksum.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::algorithm::AlgorithmId;

/// Protocol version written into every address
pub const PQ_ADDRESS_VERSION: u8 = 1;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("Unsupported algorithm for addresses: {0}")]
    UnsupportedAlgorithm(AlgorithmId),
    #[error("Malformed PQ address: {0}")]
    Malformed(String),
}

/// Network an address is valid on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PqNetwork {
    Mainnet,
    Testnet,
}

impl PqNetwork {
    /// Human-readable prefix of the bech32m encoding
    pub fn hrp(self) -> &'static str {
        match self {
            Self::Mainnet => "pq",
            Self::Testnet => "tpq",
        }
    }

    fn from_hrp(hrp: &str) -> Option<Self> {
        match hrp {
            "pq" => Some(Self::Mainnet),
            "tpq" => Some(Self::Testnet),
            _ => None,
        }
    }
}

impl fmt::Display for PqNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mainnet => f.write_str("mainnet"),
            Self::Testnet => f.write_str("testnet"),
        }
    }
}

impl FromStr for PqNetwork {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mainnet" | "bitcoin" | "main" => Ok(Self::Mainnet),
            "testnet" | "test" => Ok(Self::Testnet),
            other => Err(format!("Unknown network: {}", other)),
        }
    }
}

/// Decoded address fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressFields {
    pub network: PqNetwork,
    pub version: u8,
    pub key_type: u8,
    pub public_key_hash: [u8; 32],
}

impl AddressFields {
    /// Algorithm this key-type tag belongs to, if known
    pub fn algorithm(&self) -> Option<AlgorithmId> {
        AlgorithmId::from_address_key_type(self.key_type)
    }
}

/// Encoded PQ address string
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PqAddress(String);

impl PqAddress {
    /// Parse and checksum-validate an address string.
    pub fn parse(s: &str) -> Result<Self, AddressError> {
        let fields = codec::decode(s)?;
        // Re-encode so the stored form is canonical lowercase
        codec::encode(&fields).map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn decode(&self) -> Result<AddressFields, AddressError> {
        codec::decode(&self.0)
    }

    /// Whether this address commits to `public_key`.
    pub fn matches_public_key(&self, public_key: &[u8]) -> bool {
        self.decode()
            .map(|f| f.public_key_hash == public_key_hash(public_key))
            .unwrap_or(false)
    }
}

impl fmt::Display for PqAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PqAddress {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

fn public_key_hash(public_key: &[u8]) -> [u8; 32] {
    Sha256::digest(public_key).into()
}

/// Encode `public_key` as an address for `algorithm` on `network`.
pub fn encode_address(
    public_key: &[u8],
    algorithm: AlgorithmId,
    network: PqNetwork,
) -> Result<PqAddress, AddressError> {
    let key_type = algorithm
        .address_key_type()
        .ok_or(AddressError::UnsupportedAlgorithm(algorithm))?;

    let fields = AddressFields {
        network,
        version: PQ_ADDRESS_VERSION,
        key_type,
        public_key_hash: public_key_hash(public_key),
    };

    codec::encode(&fields).map(PqAddress)
}

/// Bech32m framing: `hrp 1 [version | key_type | sha256(pk)] checksum`
pub mod codec {
    use super::{AddressError, AddressFields, PqNetwork};
    use bech32::primitives::decode::CheckedHrpstring;
    use bech32::{Bech32m, Hrp};

    /// version + key type + 32-byte hash
    pub const PAYLOAD_LEN: usize = 34;

    pub fn encode(fields: &AddressFields) -> Result<String, AddressError> {
        let hrp = Hrp::parse(fields.network.hrp())
            .map_err(|e| AddressError::Malformed(e.to_string()))?;

        let mut data = Vec::with_capacity(PAYLOAD_LEN);
        data.push(fields.version);
        data.push(fields.key_type);
        data.extend_from_slice(&fields.public_key_hash);

        bech32::encode::<Bech32m>(hrp, &data).map_err(|e| AddressError::Malformed(e.to_string()))
    }

    pub fn decode(address: &str) -> Result<AddressFields, AddressError> {
        let checked = CheckedHrpstring::new::<Bech32m>(address)
            .map_err(|e| AddressError::Malformed(e.to_string()))?;

        let hrp = checked.hrp().to_lowercase();
        let network = PqNetwork::from_hrp(&hrp)
            .ok_or_else(|| AddressError::Malformed(format!("unknown prefix '{}'", hrp)))?;

        let data: Vec<u8> = checked.byte_iter().collect();
        if data.len() != PAYLOAD_LEN {
            return Err(AddressError::Malformed(format!(
                "payload is {} bytes, expected {}",
                data.len(),
                PAYLOAD_LEN
            )));
        }

        let mut public_key_hash = [0u8; 32];
        public_key_hash.copy_from_slice(&data[2..]);

        Ok(AddressFields {
            network,
            version: data[0],
            key_type: data[1],
            public_key_hash,
        })
    }
}
