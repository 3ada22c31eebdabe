//! Supported post-quantum signature algorithms
//!
//! Each algorithm owns a distinct hardened BIP-85 subtree (its numeric id is
//! the last path segment) and a fixed seed length.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Width of the HMAC-SHA512 output that entropy is truncated from.
pub const MAX_ENTROPY_LEN: usize = 64;

/// Static per-algorithm parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlgorithmConfig {
    /// Final hardened index in the BIP-85 derivation path
    pub index: u32,
    /// Bytes of derived entropy fed to key generation
    pub entropy_len: usize,
    /// Key-type tag written into PQ addresses (`None` = not addressable)
    pub address_key_type: Option<u8>,
    /// Display name used in bundles and logs
    pub name: &'static str,
}

/// Post-quantum algorithm selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AlgorithmId {
    /// Reserved for reproducing the published BIP-85 vectors.
    #[serde(rename = "TEST")]
    Test,
    /// ML-DSA-44 (FIPS 204)
    #[serde(rename = "ML-DSA-44")]
    MlDsa44,
    /// SLH-DSA-SHA2-128s (FIPS 205)
    #[serde(rename = "SLH-DSA-SHA2-128s")]
    SlhDsaSha2_128s,
}

const TEST_CONFIG: AlgorithmConfig = AlgorithmConfig {
    index: 0,
    entropy_len: 64,
    address_key_type: None,
    name: "TEST",
};

const ML_DSA_44_CONFIG: AlgorithmConfig = AlgorithmConfig {
    index: 1,
    entropy_len: 32,
    address_key_type: Some(0x01),
    name: "ML-DSA-44",
};

const SLH_DSA_SHA2_128S_CONFIG: AlgorithmConfig = AlgorithmConfig {
    index: 2,
    entropy_len: 48,
    address_key_type: Some(0x02),
    name: "SLH-DSA-SHA2-128s",
};

impl AlgorithmId {
    /// Algorithms that produce signing keys, in signing order.
    pub const SIGNING: [AlgorithmId; 2] = [AlgorithmId::MlDsa44, AlgorithmId::SlhDsaSha2_128s];

    /// Configuration table lookup
    pub const fn config(self) -> &'static AlgorithmConfig {
        match self {
            Self::Test => &TEST_CONFIG,
            Self::MlDsa44 => &ML_DSA_44_CONFIG,
            Self::SlhDsaSha2_128s => &SLH_DSA_SHA2_128S_CONFIG,
        }
    }

    pub const fn index(self) -> u32 {
        self.config().index
    }

    pub const fn entropy_len(self) -> usize {
        self.config().entropy_len
    }

    pub const fn address_key_type(self) -> Option<u8> {
        self.config().address_key_type
    }

    pub const fn name(self) -> &'static str {
        self.config().name
    }

    /// Reverse lookup from a BIP-85 index.
    pub fn from_index(index: u32) -> Option<Self> {
        [Self::Test, Self::MlDsa44, Self::SlhDsaSha2_128s]
            .into_iter()
            .find(|a| a.index() == index)
    }

    /// Reverse lookup from an address key-type tag.
    pub fn from_address_key_type(tag: u8) -> Option<Self> {
        Self::SIGNING
            .into_iter()
            .find(|a| a.address_key_type() == Some(tag))
    }
}

impl fmt::Display for AlgorithmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AlgorithmId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ml-dsa-44" | "mldsa44" => Ok(Self::MlDsa44),
            "slh-dsa-sha2-128s" | "slhdsa128s" => Ok(Self::SlhDsaSha2_128s),
            "test" => Ok(Self::Test),
            other => Err(format!("Unknown algorithm: {}", other)),
        }
    }
}
