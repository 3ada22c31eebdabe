//! Deterministic post-quantum key pairs
//!
//! - ML-DSA-44 (FIPS 204): the 32-byte BIP-85 entropy is the `ξ` seed of
//!   `ML-DSA.KeyGen_internal`.
//! - SLH-DSA-SHA2-128s (FIPS 205): the 48-byte entropy is split into
//!   `SK.seed ‖ SK.prf ‖ PK.seed`, 16 bytes each.
//!
//! Signing is deterministic with an empty context string for both schemes,
//! so the same key and message always give the same signature.

use std::fmt;
use thiserror::Error;
use zeroize::{Zeroize, Zeroizing};

use crate::address::{encode_address, AddressError, PqAddress, PqNetwork};
use crate::algorithm::AlgorithmId;
use crate::entropy::{derive_entropy, EntropyError};

/// ML-DSA-44 encoded verifying key size
pub const ML_DSA_44_PUBLIC_KEY_LEN: usize = 1312;
/// ML-DSA-44 encoded signing key size
pub const ML_DSA_44_PRIVATE_KEY_LEN: usize = 2560;
/// ML-DSA-44 signature size
pub const ML_DSA_44_SIGNATURE_LEN: usize = 2420;

/// SLH-DSA-SHA2-128s public key size (PK.seed ‖ PK.root)
pub const SLH_DSA_128S_PUBLIC_KEY_LEN: usize = 32;
/// SLH-DSA-SHA2-128s private key size (SK.seed ‖ SK.prf ‖ PK.seed ‖ PK.root)
pub const SLH_DSA_128S_PRIVATE_KEY_LEN: usize = 64;
/// SLH-DSA-SHA2-128s signature size
pub const SLH_DSA_128S_SIGNATURE_LEN: usize = 7856;

/// SLH-DSA security parameter n for the 128-bit sets
const SLH_DSA_N: usize = 16;

#[derive(Error, Debug)]
pub enum KeyError {
    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(AlgorithmId),
    #[error("{algorithm} key generation failed: {reason}")]
    KeyGeneration {
        algorithm: AlgorithmId,
        reason: String,
    },
    #[error("{algorithm} signing failed: {reason}")]
    Signing {
        algorithm: AlgorithmId,
        reason: String,
    },
    #[error(transparent)]
    Entropy(#[from] EntropyError),
    #[error(transparent)]
    Address(#[from] AddressError),
}

/// A derived signing key pair and its address.
///
/// The private key is zeroized on drop; [`PqKeypair::wipe`] clears it
/// earlier, as soon as the caller is done signing.
pub struct PqKeypair {
    algorithm: AlgorithmId,
    public_key: Vec<u8>,
    private_key: Zeroizing<Vec<u8>>,
    address: PqAddress,
}

impl PqKeypair {
    pub fn algorithm(&self) -> AlgorithmId {
        self.algorithm
    }

    pub fn public_key(&self) -> &[u8] {
        &self.public_key
    }

    pub fn address(&self) -> &PqAddress {
        &self.address
    }

    /// Zero the private key in place. Signing afterwards fails.
    pub fn wipe(&mut self) {
        self.private_key.as_mut_slice().zeroize();
    }

    /// Whether every private key byte is zero.
    pub fn is_wiped(&self) -> bool {
        self.private_key.iter().all(|&b| b == 0)
    }

    /// Sign `message` with this key pair.
    pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>, KeyError> {
        if self.is_wiped() {
            return Err(KeyError::Signing {
                algorithm: self.algorithm,
                reason: "private key has been wiped".into(),
            });
        }

        match self.algorithm {
            AlgorithmId::MlDsa44 => ml_dsa_44::sign(&self.private_key, message),
            AlgorithmId::SlhDsaSha2_128s => slh_dsa_128s::sign(&self.private_key, message),
            AlgorithmId::Test => Err(KeyError::UnsupportedAlgorithm(self.algorithm)),
        }
    }
}

impl fmt::Debug for PqKeypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PqKeypair")
            .field("algorithm", &self.algorithm)
            .field("address", &self.address)
            .field("private_key", &"***")
            .finish()
    }
}

/// Derive the key pair for `algorithm` from a 24-word mnemonic.
pub fn generate_keypair(
    mnemonic: &str,
    algorithm: AlgorithmId,
    network: PqNetwork,
) -> Result<PqKeypair, KeyError> {
    ensure_supported(algorithm)?;
    let entropy = derive_entropy(mnemonic, algorithm)?;
    generate_keypair_from_entropy(&entropy, algorithm, network)
}

/// Build the key pair for `algorithm` from already-derived entropy.
pub fn generate_keypair_from_entropy(
    entropy: &[u8],
    algorithm: AlgorithmId,
    network: PqNetwork,
) -> Result<PqKeypair, KeyError> {
    ensure_supported(algorithm)?;

    if entropy.len() != algorithm.entropy_len() {
        return Err(KeyError::KeyGeneration {
            algorithm,
            reason: format!(
                "expected {} bytes of entropy, got {}",
                algorithm.entropy_len(),
                entropy.len()
            ),
        });
    }

    let (public_key, private_key) = match algorithm {
        AlgorithmId::MlDsa44 => ml_dsa_44::keygen(entropy)?,
        AlgorithmId::SlhDsaSha2_128s => slh_dsa_128s::keygen(entropy)?,
        AlgorithmId::Test => return Err(KeyError::UnsupportedAlgorithm(algorithm)),
    };

    let address = encode_address(&public_key, algorithm, network)?;
    log::debug!("Generated {} key pair for {}", algorithm, address);

    Ok(PqKeypair {
        algorithm,
        public_key,
        private_key,
        address,
    })
}

/// Verify `signature` over `message` under `algorithm`'s verifier.
///
/// Malformed keys or signatures verify as `false`.
pub fn verify(algorithm: AlgorithmId, public_key: &[u8], message: &[u8], signature: &[u8]) -> bool {
    match algorithm {
        AlgorithmId::MlDsa44 => ml_dsa_44::verify(public_key, message, signature),
        AlgorithmId::SlhDsaSha2_128s => slh_dsa_128s::verify(public_key, message, signature),
        AlgorithmId::Test => false,
    }
}

fn ensure_supported(algorithm: AlgorithmId) -> Result<(), KeyError> {
    match algorithm {
        AlgorithmId::MlDsa44 | AlgorithmId::SlhDsaSha2_128s => Ok(()),
        AlgorithmId::Test => Err(KeyError::UnsupportedAlgorithm(algorithm)),
    }
}

mod ml_dsa_44 {
    use super::*;
    use ml_dsa::signature::{Signer as _, Verifier as _};
    use ml_dsa::{EncodedSignature, EncodedSigningKey, EncodedVerifyingKey, KeyGen, MlDsa44, B32};

    const ALG: AlgorithmId = AlgorithmId::MlDsa44;

    fn err(reason: impl ToString) -> KeyError {
        KeyError::KeyGeneration {
            algorithm: ALG,
            reason: reason.to_string(),
        }
    }

    pub(super) fn keygen(entropy: &[u8]) -> Result<(Vec<u8>, Zeroizing<Vec<u8>>), KeyError> {
        let mut xi = B32::try_from(entropy).map_err(err)?;
        let keypair = MlDsa44::key_gen_internal(&xi);
        xi.as_mut_slice().zeroize();

        let public_key = keypair.verifying_key().encode().to_vec();
        let mut encoded = keypair.signing_key().encode();
        let private_key = Zeroizing::new(encoded.to_vec());
        encoded.as_mut_slice().zeroize();

        Ok((public_key, private_key))
    }

    pub(super) fn sign(private_key: &[u8], message: &[u8]) -> Result<Vec<u8>, KeyError> {
        let mut encoded = EncodedSigningKey::<MlDsa44>::try_from(private_key).map_err(|e| {
            KeyError::Signing {
                algorithm: ALG,
                reason: e.to_string(),
            }
        })?;
        let signing_key = ml_dsa::SigningKey::<MlDsa44>::decode(&encoded);
        encoded.as_mut_slice().zeroize();

        let signature: ml_dsa::Signature<MlDsa44> = signing_key.sign(message);
        Ok(signature.encode().to_vec())
    }

    pub(super) fn verify(public_key: &[u8], message: &[u8], signature: &[u8]) -> bool {
        let Ok(vk_bytes) = EncodedVerifyingKey::<MlDsa44>::try_from(public_key) else {
            return false;
        };
        let Ok(sig_bytes) = EncodedSignature::<MlDsa44>::try_from(signature) else {
            return false;
        };
        let Some(signature) = ml_dsa::Signature::<MlDsa44>::decode(&sig_bytes) else {
            return false;
        };

        let verifying_key = ml_dsa::VerifyingKey::<MlDsa44>::decode(&vk_bytes);
        verifying_key.verify(message, &signature).is_ok()
    }
}

mod slh_dsa_128s {
    use super::*;
    use slh_dsa::signature::{Keypair as _, SignatureEncoding as _, Signer as _, Verifier as _};
    use slh_dsa::Sha2_128s;

    const ALG: AlgorithmId = AlgorithmId::SlhDsaSha2_128s;

    pub(super) fn keygen(entropy: &[u8]) -> Result<(Vec<u8>, Zeroizing<Vec<u8>>), KeyError> {
        if entropy.len() != 3 * SLH_DSA_N {
            return Err(KeyError::KeyGeneration {
                algorithm: ALG,
                reason: format!("seed must be {} bytes", 3 * SLH_DSA_N),
            });
        }

        let (sk_seed, rest) = entropy.split_at(SLH_DSA_N);
        let (sk_prf, pk_seed) = rest.split_at(SLH_DSA_N);
        let signing_key =
            slh_dsa::SigningKey::<Sha2_128s>::slh_keygen_internal(sk_seed, sk_prf, pk_seed);

        let public_key = signing_key.verifying_key().to_bytes().to_vec();
        let mut encoded = signing_key.to_bytes();
        let private_key = Zeroizing::new(encoded.to_vec());
        encoded.as_mut_slice().zeroize();

        Ok((public_key, private_key))
    }

    pub(super) fn sign(private_key: &[u8], message: &[u8]) -> Result<Vec<u8>, KeyError> {
        let signing_key =
            slh_dsa::SigningKey::<Sha2_128s>::try_from(private_key).map_err(|e| {
                KeyError::Signing {
                    algorithm: ALG,
                    reason: e.to_string(),
                }
            })?;

        let signature: slh_dsa::Signature<Sha2_128s> = signing_key.sign(message);
        Ok(signature.to_vec())
    }

    pub(super) fn verify(public_key: &[u8], message: &[u8], signature: &[u8]) -> bool {
        let Ok(verifying_key) = slh_dsa::VerifyingKey::<Sha2_128s>::try_from(public_key) else {
            return false;
        };
        let Ok(signature) = slh_dsa::Signature::<Sha2_128s>::try_from(signature) else {
            return false;
        };
        verifying_key.verify(message, &signature).is_ok()
    }
}
