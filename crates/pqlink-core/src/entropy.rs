//! BIP-85 entropy derivation for post-quantum key seeds
//!
//! Every supported algorithm gets its own hardened subtree:
//!
//! ```text
//! m / 83696968' / 0' / {algorithm index}'
//! ```
//!
//! The private key at that node is run through
//! `HMAC-SHA512(key = "bip-entropy-from-k")` and truncated to the
//! algorithm's seed length. Same mnemonic + same algorithm always gives the
//! same bytes, which is what lets a user re-register from their phrase alone.

use bip39::{Language, Mnemonic};
use bitcoin::bip32::{ChildNumber, DerivationPath, Xpriv};
use bitcoin::secp256k1::Secp256k1;
use bitcoin::Network;
use hmac::{Hmac, Mac};
use sha2::Sha512;
use thiserror::Error;
use zeroize::{Zeroize, Zeroizing};

use crate::algorithm::{AlgorithmId, MAX_ENTROPY_LEN};
use crate::memory::LockedBuffer;

/// BIP-85 purpose ("BIP" in ASCII digits)
pub const BIP85_PURPOSE: u32 = 83696968;

/// Application index for post-quantum key seeds
pub const PQ_APPLICATION_INDEX: u32 = 0;

/// HMAC key fixed by BIP-85
pub const BIP85_HMAC_KEY: &[u8] = b"bip-entropy-from-k";

/// Required mnemonic length
pub const MNEMONIC_WORD_COUNT: usize = 24;

#[derive(Error, Debug)]
pub enum EntropyError {
    #[error("Malformed mnemonic: {0}")]
    MalformedMnemonic(String),
    #[error("Derivation failed: {0}")]
    DerivationFailure(String),
    #[error("Invalid entropy length: requested {requested} bytes, maximum is {max}")]
    InvalidEntropyLength { requested: usize, max: usize },
}

/// Parse a 24-word English mnemonic.
///
/// Word count is checked before BIP-39 parsing so that a 12-word phrase is
/// reported as the wrong length rather than as a checksum problem.
pub fn parse_mnemonic(words: &str) -> Result<Mnemonic, EntropyError> {
    let count = words.split_whitespace().count();
    if count != MNEMONIC_WORD_COUNT {
        return Err(EntropyError::MalformedMnemonic(format!(
            "expected {} words, got {}",
            MNEMONIC_WORD_COUNT, count
        )));
    }

    Mnemonic::parse_in(Language::English, words)
        .map_err(|e| EntropyError::MalformedMnemonic(e.to_string()))
}

/// Hardened path `m/83696968'/0'/{index}'`
pub fn derivation_path(index: u32) -> Result<DerivationPath, EntropyError> {
    let hardened = |i: u32| {
        ChildNumber::from_hardened_idx(i).map_err(|e| EntropyError::DerivationFailure(e.to_string()))
    };
    Ok(DerivationPath::from(vec![
        hardened(BIP85_PURPOSE)?,
        hardened(PQ_APPLICATION_INDEX)?,
        hardened(index)?,
    ]))
}

/// Derive the seed bytes for `algorithm` from a 24-word mnemonic.
pub fn derive_entropy(
    mnemonic: &str,
    algorithm: AlgorithmId,
) -> Result<Zeroizing<Vec<u8>>, EntropyError> {
    let mnemonic = parse_mnemonic(mnemonic)?;

    let mut seed_bytes = mnemonic.to_seed("");
    let seed = LockedBuffer::from_slice(&seed_bytes);
    seed_bytes.zeroize();

    let root = Xpriv::new_master(Network::Bitcoin, seed.as_slice())
        .map_err(|e| EntropyError::DerivationFailure(e.to_string()))?;

    log::debug!(
        "Deriving {} bytes of entropy for {} (index {})",
        algorithm.entropy_len(),
        algorithm,
        algorithm.index()
    );

    derive_entropy_from_root(&root, algorithm.index(), algorithm.entropy_len())
}

/// BIP-85 derivation from an explicit root key.
///
/// `length` may be anything up to the 64-byte HMAC-SHA512 width.
pub fn derive_entropy_from_root(
    root: &Xpriv,
    index: u32,
    length: usize,
) -> Result<Zeroizing<Vec<u8>>, EntropyError> {
    if length > MAX_ENTROPY_LEN {
        return Err(EntropyError::InvalidEntropyLength {
            requested: length,
            max: MAX_ENTROPY_LEN,
        });
    }

    let path = derivation_path(index)?;
    let secp = Secp256k1::signing_only();
    let node = root
        .derive_priv(&secp, &path)
        .map_err(|e| EntropyError::DerivationFailure(e.to_string()))?;

    let private_key = Zeroizing::new(node.private_key.secret_bytes());

    let mut mac = Hmac::<Sha512>::new_from_slice(BIP85_HMAC_KEY)
        .map_err(|e| EntropyError::DerivationFailure(e.to_string()))?;
    mac.update(private_key.as_ref());
    let mut digest = mac.finalize().into_bytes();

    let entropy = Zeroizing::new(digest[..length].to_vec());
    digest.as_mut_slice().zeroize();

    Ok(entropy)
}
