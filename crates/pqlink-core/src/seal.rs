//! Hybrid sealing of proof requests: ML-KEM-768 + AES-256-GCM
//!
//! The verifier encapsulates to our ephemeral encapsulation key; we
//! decapsulate its ciphertext to a 32-byte shared secret and use that as
//! the AES-256-GCM key for exactly one message.
//!
//! # Wire format
//!
//! ```text
//! [nonce (12 bytes)][ciphertext + tag (payload + 16 bytes)]
//! ```
//!
//! No header and no length prefix.
//!
//! # Secret lifetime
//!
//! Every buffer that holds key material during a seal (shared secret,
//! working nonce, both halves of the ephemeral key pair) is owned or borrowed
//! by a `SealSession`, which zeroes them when the pipeline finishes and again
//! on drop if it is unwound early. Each buffer keeps its length so callers
//! can check the wipe.

use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Key, Nonce,
};
use ml_kem::kem::{Decapsulate, DecapsulationKey, Encapsulate, EncapsulationKey};
use ml_kem::{Ciphertext, Encoded, EncodedSizeUser, KemCore, MlKem768, MlKem768Params};
use std::fmt;
use thiserror::Error;
use zeroize::{Zeroize, Zeroizing};

/// ML-KEM-768 ciphertext size
pub const KEM_CIPHERTEXT_LEN: usize = 1088;
/// ML-KEM-768 decapsulation key size
pub const KEM_DECAPSULATION_KEY_LEN: usize = 2400;
/// ML-KEM-768 encapsulation key size
pub const KEM_ENCAPSULATION_KEY_LEN: usize = 1184;
/// ML-KEM shared secret size, also the AES-256 key size
pub const SHARED_SECRET_LEN: usize = 32;
/// AES-256-GCM nonce size
pub const NONCE_LEN: usize = 12;
/// AES-256-GCM tag size
pub const TAG_LEN: usize = 16;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SealError {
    #[error("Invalid KEM ciphertext length: expected {expected}, got {actual}")]
    InvalidCiphertextLength { expected: usize, actual: usize },
    #[error("Invalid decapsulation key length: expected {expected}, got {actual}")]
    InvalidDecapsulationKeyLength { expected: usize, actual: usize },
    #[error("Invalid encapsulation key length: expected {expected}, got {actual}")]
    InvalidEncapsulationKeyLength { expected: usize, actual: usize },
    #[error("Invalid shared secret length: expected {expected}, got {actual}")]
    InvalidSharedSecretLength { expected: usize, actual: usize },
    #[error("Encryption failed: {0}")]
    EncryptionFailure(String),
    #[error("Decryption failed: {0}")]
    DecryptionFailure(String),
    #[error("Invalid sealed request format")]
    InvalidFormat,
}

/// Pipeline progress, logged at trace level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SealState {
    Idle,
    Decapsulating,
    SecretDerived,
    Encrypting,
    Sealed,
    Failed,
}

/// One-shot ML-KEM-768 key pair for a single proof submission.
///
/// Both halves are zeroed in place by [`encrypt_proof_request`], whatever
/// its outcome, and zeroized again on drop.
#[derive(Clone)]
pub struct EphemeralKemKeypair {
    encapsulation_key: Vec<u8>,
    decapsulation_key: Vec<u8>,
}

impl EphemeralKemKeypair {
    /// Fresh key pair from the OS RNG.
    pub fn generate() -> Self {
        let (dk, ek) = MlKem768::generate(&mut OsRng);
        let mut dk_bytes = dk.as_bytes();
        let keypair = Self {
            encapsulation_key: ek.as_bytes().to_vec(),
            decapsulation_key: dk_bytes.to_vec(),
        };
        dk_bytes.as_mut_slice().zeroize();
        keypair
    }

    /// Wrap existing key bytes. Lengths are checked when the pair is used.
    pub fn from_parts(encapsulation_key: Vec<u8>, decapsulation_key: Vec<u8>) -> Self {
        Self {
            encapsulation_key,
            decapsulation_key,
        }
    }

    /// Public half, sent to the verifier.
    pub fn encapsulation_key(&self) -> &[u8] {
        &self.encapsulation_key
    }

    /// Secret half. Never log or persist this.
    pub fn decapsulation_key(&self) -> &[u8] {
        &self.decapsulation_key
    }

    /// Zero both halves, keeping their lengths.
    pub fn wipe(&mut self) {
        self.encapsulation_key.as_mut_slice().zeroize();
        self.decapsulation_key.as_mut_slice().zeroize();
    }

    pub fn is_wiped(&self) -> bool {
        self.encapsulation_key.iter().all(|&b| b == 0)
            && self.decapsulation_key.iter().all(|&b| b == 0)
    }
}

impl Drop for EphemeralKemKeypair {
    fn drop(&mut self) {
        self.encapsulation_key.zeroize();
        self.decapsulation_key.zeroize();
    }
}

impl fmt::Debug for EphemeralKemKeypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EphemeralKemKeypair")
            .field("encapsulation_key_len", &self.encapsulation_key.len())
            .field("decapsulation_key", &"***")
            .finish()
    }
}

/// Sealed proof request: `nonce || ciphertext_and_tag`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedProofRequest {
    nonce: [u8; NONCE_LEN],
    ciphertext: Vec<u8>,
}

impl SealedProofRequest {
    pub fn nonce(&self) -> &[u8; NONCE_LEN] {
        &self.nonce
    }

    /// AES-256-GCM ciphertext with the tag appended
    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }

    /// Serialize to bytes: nonce || ciphertext
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(NONCE_LEN + self.ciphertext.len());
        bytes.extend_from_slice(&self.nonce);
        bytes.extend_from_slice(&self.ciphertext);
        bytes
    }

    /// Deserialize from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SealError> {
        // nonce + tag + at least one payload byte
        if bytes.len() < NONCE_LEN + TAG_LEN + 1 {
            return Err(SealError::InvalidFormat);
        }

        let mut nonce = [0u8; NONCE_LEN];
        nonce.copy_from_slice(&bytes[..NONCE_LEN]);

        Ok(Self {
            nonce,
            ciphertext: bytes[NONCE_LEN..].to_vec(),
        })
    }
}

/// Seal `payload` for the verifier that produced `server_ciphertext`.
///
/// The key pair is consumed in the sense that it is zeroed before this
/// returns, on success and on every error.
pub fn encrypt_proof_request(
    payload: &[u8],
    keypair: &mut EphemeralKemKeypair,
    server_ciphertext: &[u8],
) -> Result<SealedProofRequest, SealError> {
    let mut session = SealSession::new(keypair);
    session.run(payload, server_ciphertext)
}

/// Verifier side: encapsulate to `encapsulation_key`.
///
/// Returns the ciphertext to send back and the shared secret to keep.
pub fn encapsulate_for(
    encapsulation_key: &[u8],
) -> Result<(Vec<u8>, Zeroizing<Vec<u8>>), SealError> {
    let encoded = Encoded::<EncapsulationKey<MlKem768Params>>::try_from(encapsulation_key)
        .map_err(|_| SealError::InvalidEncapsulationKeyLength {
            expected: KEM_ENCAPSULATION_KEY_LEN,
            actual: encapsulation_key.len(),
        })?;
    let ek = EncapsulationKey::<MlKem768Params>::from_bytes(&encoded);

    let (ciphertext, mut shared) = ek
        .encapsulate(&mut OsRng)
        .map_err(|_| SealError::EncryptionFailure("encapsulation failed".into()))?;
    let secret = Zeroizing::new(shared.to_vec());
    shared.as_mut_slice().zeroize();

    Ok((ciphertext.to_vec(), secret))
}

/// Verifier side: decrypt a sealed request with the shared secret.
pub fn open_sealed_request(
    sealed: &SealedProofRequest,
    shared_secret: &[u8],
) -> Result<Zeroizing<Vec<u8>>, SealError> {
    if shared_secret.len() != SHARED_SECRET_LEN {
        return Err(SealError::InvalidSharedSecretLength {
            expected: SHARED_SECRET_LEN,
            actual: shared_secret.len(),
        });
    }

    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(shared_secret));
    cipher
        .decrypt(Nonce::from_slice(&sealed.nonce), sealed.ciphertext.as_slice())
        .map(Zeroizing::new)
        .map_err(|e| SealError::DecryptionFailure(e.to_string()))
}

/// Owns the secrets of one seal and guarantees they are wiped.
struct SealSession<'a> {
    keypair: &'a mut EphemeralKemKeypair,
    shared_secret: Vec<u8>,
    nonce: [u8; NONCE_LEN],
    state: SealState,
    wiped: bool,
}

impl<'a> SealSession<'a> {
    fn new(keypair: &'a mut EphemeralKemKeypair) -> Self {
        Self {
            keypair,
            shared_secret: Vec::with_capacity(SHARED_SECRET_LEN),
            nonce: [0u8; NONCE_LEN],
            state: SealState::Idle,
            wiped: false,
        }
    }

    fn transition(&mut self, next: SealState) {
        log::trace!("Seal pipeline: {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    fn run(&mut self, payload: &[u8], server_ciphertext: &[u8]) -> Result<SealedProofRequest, SealError> {
        let result = self
            .decapsulate(server_ciphertext)
            .and_then(|()| self.encrypt(payload));

        match result {
            Ok(_) => self.transition(SealState::Sealed),
            Err(ref e) => {
                log::debug!("Sealing proof request failed: {}", e);
                self.transition(SealState::Failed);
            }
        }
        self.wipe();
        result
    }

    fn decapsulate(&mut self, server_ciphertext: &[u8]) -> Result<(), SealError> {
        self.transition(SealState::Decapsulating);

        if server_ciphertext.len() != KEM_CIPHERTEXT_LEN {
            return Err(SealError::InvalidCiphertextLength {
                expected: KEM_CIPHERTEXT_LEN,
                actual: server_ciphertext.len(),
            });
        }
        let dk_len = self.keypair.decapsulation_key.len();
        if dk_len != KEM_DECAPSULATION_KEY_LEN {
            return Err(SealError::InvalidDecapsulationKeyLength {
                expected: KEM_DECAPSULATION_KEY_LEN,
                actual: dk_len,
            });
        }

        let ciphertext = Ciphertext::<MlKem768>::try_from(server_ciphertext).map_err(|_| {
            SealError::InvalidCiphertextLength {
                expected: KEM_CIPHERTEXT_LEN,
                actual: server_ciphertext.len(),
            }
        })?;
        let mut encoded = Encoded::<DecapsulationKey<MlKem768Params>>::try_from(
            self.keypair.decapsulation_key.as_slice(),
        )
        .map_err(|_| SealError::InvalidDecapsulationKeyLength {
            expected: KEM_DECAPSULATION_KEY_LEN,
            actual: dk_len,
        })?;
        let dk = DecapsulationKey::<MlKem768Params>::from_bytes(&encoded);
        encoded.as_mut_slice().zeroize();

        let mut shared = dk
            .decapsulate(&ciphertext)
            .map_err(|_| SealError::EncryptionFailure("decapsulation failed".into()))?;
        self.shared_secret.extend_from_slice(shared.as_slice());
        shared.as_mut_slice().zeroize();

        if self.shared_secret.len() != SHARED_SECRET_LEN {
            return Err(SealError::InvalidSharedSecretLength {
                expected: SHARED_SECRET_LEN,
                actual: self.shared_secret.len(),
            });
        }

        self.transition(SealState::SecretDerived);
        Ok(())
    }

    fn encrypt(&mut self, payload: &[u8]) -> Result<SealedProofRequest, SealError> {
        self.transition(SealState::Encrypting);

        let fresh = Aes256Gcm::generate_nonce(&mut OsRng);
        self.nonce.copy_from_slice(&fresh);

        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.shared_secret));
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&self.nonce), payload)
            .map_err(|e| SealError::EncryptionFailure(e.to_string()))?;

        Ok(SealedProofRequest {
            nonce: self.nonce,
            ciphertext,
        })
    }

    fn wipe(&mut self) {
        if self.wiped {
            return;
        }
        self.shared_secret.as_mut_slice().zeroize();
        self.nonce.zeroize();
        self.keypair.wipe();
        self.wiped = true;
    }
}

impl Drop for SealSession<'_> {
    fn drop(&mut self) {
        self.wipe();
    }
}
