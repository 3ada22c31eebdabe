//! Dual-scheme signing of the linkage message
//!
//! Both key pairs live only for the duration of [`generate_signed_messages`]:
//! they are wiped right after signing, and dropping them on an early return
//! zeroizes them as well.

use base64::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::address::{PqAddress, PqNetwork};
use crate::algorithm::AlgorithmId;
use crate::keys::{generate_keypair, KeyError, PqKeypair};
use crate::message::compose_linkage_message;

#[derive(Error, Debug)]
pub enum SigningError {
    #[error("Signing failed: {0}")]
    Key(#[from] KeyError),
}

/// One algorithm's entry in the bundle. Binary fields are base64.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedMessage {
    pub public_key: String,
    pub signed_message: String,
    pub address: PqAddress,
}

impl SignedMessage {
    fn from_keypair(keypair: &PqKeypair, message: &[u8]) -> Result<Self, SigningError> {
        let signature = keypair.sign(message)?;
        Ok(Self {
            public_key: BASE64_STANDARD.encode(keypair.public_key()),
            signed_message: BASE64_STANDARD.encode(signature),
            address: keypair.address().clone(),
        })
    }

    pub fn public_key_bytes(&self) -> Option<Vec<u8>> {
        BASE64_STANDARD.decode(&self.public_key).ok()
    }

    pub fn signature_bytes(&self) -> Option<Vec<u8>> {
        BASE64_STANDARD.decode(&self.signed_message).ok()
    }
}

/// Signatures over one linkage message, keyed by algorithm name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedMessageBundle {
    #[serde(rename = "ML-DSA-44")]
    pub ml_dsa_44: SignedMessage,
    #[serde(rename = "SLH-DSA-SHA2-128s")]
    pub slh_dsa_sha2_128s: SignedMessage,
    /// Linkage message text that was signed
    pub message: String,
}

impl SignedMessageBundle {
    pub fn get(&self, algorithm: AlgorithmId) -> Option<&SignedMessage> {
        match algorithm {
            AlgorithmId::MlDsa44 => Some(&self.ml_dsa_44),
            AlgorithmId::SlhDsaSha2_128s => Some(&self.slh_dsa_sha2_128s),
            AlgorithmId::Test => None,
        }
    }

    /// Check every entry's signature against its public key and address.
    pub fn verify(&self) -> bool {
        AlgorithmId::SIGNING.into_iter().all(|alg| {
            let Some(entry) = self.get(alg) else {
                return false;
            };
            let (Some(pk), Some(sig)) = (entry.public_key_bytes(), entry.signature_bytes()) else {
                return false;
            };
            entry.address.matches_public_key(&pk)
                && crate::keys::verify(alg, &pk, self.message.as_bytes(), &sig)
        })
    }
}

/// Derive both PQ key pairs, sign the linkage message with each, and
/// return the bundle.
pub fn generate_signed_messages(
    mnemonic: &str,
    btc_address: &str,
    network: PqNetwork,
) -> Result<SignedMessageBundle, SigningError> {
    let mut ml_dsa = generate_keypair(mnemonic, AlgorithmId::MlDsa44, network)?;
    let mut slh_dsa = generate_keypair(mnemonic, AlgorithmId::SlhDsaSha2_128s, network)?;

    let message = compose_linkage_message(
        btc_address,
        ml_dsa.address().as_str(),
        slh_dsa.address().as_str(),
    );

    let (ml_dsa_entry, slh_dsa_entry) =
        sign_and_wipe(&mut ml_dsa, &mut slh_dsa, message.as_bytes())?;

    log::debug!(
        "Signed linkage message for {} with {} and {}",
        btc_address,
        AlgorithmId::MlDsa44,
        AlgorithmId::SlhDsaSha2_128s
    );

    Ok(SignedMessageBundle {
        ml_dsa_44: ml_dsa_entry,
        slh_dsa_sha2_128s: slh_dsa_entry,
        message: message.text,
    })
}

/// Sign with each key in turn, wiping it right after. Stops at the first
/// failure; the untouched key is left to zeroize on drop.
fn sign_and_wipe(
    ml_dsa: &mut PqKeypair,
    slh_dsa: &mut PqKeypair,
    message: &[u8],
) -> Result<(SignedMessage, SignedMessage), SigningError> {
    let ml_dsa_entry = SignedMessage::from_keypair(ml_dsa, message);
    ml_dsa.wipe();
    let ml_dsa_entry = ml_dsa_entry?;

    let slh_dsa_entry = SignedMessage::from_keypair(slh_dsa, message);
    slh_dsa.wipe();
    Ok((ml_dsa_entry, slh_dsa_entry?))
}
