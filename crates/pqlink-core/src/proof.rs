//! Proof submission payload
//!
//! Pairs the Bitcoin signature over the linkage message with the ML-DSA-44
//! entry of a [`SignedMessageBundle`]. The JSON form is what gets sealed.

use serde::{Deserialize, Serialize};

use crate::address::PqAddress;
use crate::signer::SignedMessageBundle;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofRequest {
    pub bitcoin_address: String,
    /// Base64 Bitcoin message signature over the linkage message
    pub bitcoin_signed_message: String,
    pub mldsa44_address: PqAddress,
    pub mldsa44_signed_message: String,
    pub mldsa44_public_key: String,
}

impl ProofRequest {
    pub fn from_bundle(
        bitcoin_address: &str,
        bitcoin_signature: &str,
        bundle: &SignedMessageBundle,
    ) -> Self {
        let ml_dsa = &bundle.ml_dsa_44;
        Self {
            bitcoin_address: bitcoin_address.to_string(),
            bitcoin_signed_message: bitcoin_signature.to_string(),
            mldsa44_address: ml_dsa.address.clone(),
            mldsa44_signed_message: ml_dsa.signed_message.clone(),
            mldsa44_public_key: ml_dsa.public_key.clone(),
        }
    }

    pub fn to_json_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    pub fn from_json_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}
