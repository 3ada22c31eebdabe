//! Bitcoin address gating and message signature verification
//!
//! Only mainnet single-key addresses (P2PKH, P2WPKH) are accepted.
//!
//! Wallets disagree on how the signature header byte encodes the address
//! type, so verification runs twice:
//!
//! 1. **Classic** (BIP-137): the header range selects the address type
//!    (27-30 uncompressed P2PKH, 31-34 compressed P2PKH, 35-38 P2SH-P2WPKH,
//!    39-42 P2WPKH) and the address rebuilt for that type must match.
//! 2. **Segwit-aware** (Electrum): a compressed P2PKH header (31-34) only
//!    carries the recovery id, and the key matches if any of its single-key
//!    address forms do. Segwit headers (35-42) still pin their address type.
//!
//! Errors in either attempt count as a failed attempt, never as a hard error.

use base64::prelude::*;
use bitcoin::address::AddressType;
use bitcoin::hashes::Hash;
use bitcoin::secp256k1::ecdsa::{RecoverableSignature, RecoveryId};
use bitcoin::secp256k1::{Message, Secp256k1};
use bitcoin::sign_message::signed_msg_hash;
use bitcoin::{Address, CompressedPublicKey, Network, PublicKey};
use std::str::FromStr;
use thiserror::Error;

/// Compact recoverable signature plus header byte
const SIGNATURE_LEN: usize = 65;

#[derive(Error, Debug)]
enum BtcSignatureError {
    #[error("signature is not 65 bytes of base64")]
    InvalidEncoding,
    #[error("unknown header byte {0}")]
    InvalidHeader(u8),
    #[error("public key recovery failed: {0}")]
    Recovery(String),
    #[error("invalid address: {0}")]
    InvalidAddress(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Convention {
    Classic,
    SegwitAware,
}

/// What the header byte says about the signing key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HeaderKind {
    P2pkhUncompressed,
    P2pkhCompressed,
    P2shP2wpkh,
    P2wpkh,
}

impl HeaderKind {
    fn from_header(header: u8) -> Result<Self, BtcSignatureError> {
        match header {
            27..=30 => Ok(Self::P2pkhUncompressed),
            31..=34 => Ok(Self::P2pkhCompressed),
            35..=38 => Ok(Self::P2shP2wpkh),
            39..=42 => Ok(Self::P2wpkh),
            other => Err(BtcSignatureError::InvalidHeader(other)),
        }
    }

}

fn parse_mainnet_address(address: &str) -> Result<Address, BtcSignatureError> {
    Address::from_str(address)
        .map_err(|e| BtcSignatureError::InvalidAddress(e.to_string()))?
        .require_network(Network::Bitcoin)
        .map_err(|e| BtcSignatureError::InvalidAddress(e.to_string()))
}

fn is_supported_type(address: &Address) -> bool {
    matches!(
        address.address_type(),
        Some(AddressType::P2pkh) | Some(AddressType::P2wpkh)
    )
}

/// Whether `address` is a mainnet P2PKH or P2WPKH address.
pub fn is_valid_bitcoin_address(address: &str) -> bool {
    parse_mainnet_address(address)
        .map(|a| is_supported_type(&a))
        .unwrap_or(false)
}

/// Verify a base64 Bitcoin message signature against `address`.
pub fn is_valid_bitcoin_signature(message: &str, signature: &str, address: &str) -> bool {
    match verify_with(Convention::Classic, message, signature, address) {
        Ok(true) => return true,
        Ok(false) => {}
        Err(e) => log::debug!("Classic signature check failed: {}", e),
    }

    match verify_with(Convention::SegwitAware, message, signature, address) {
        Ok(valid) => valid,
        Err(e) => {
            log::debug!("Segwit-aware signature check failed: {}", e);
            false
        }
    }
}

fn verify_with(
    convention: Convention,
    message: &str,
    signature: &str,
    address: &str,
) -> Result<bool, BtcSignatureError> {
    let target = parse_mainnet_address(address)?;
    let (kind, key) = recover_signer(message, signature)?;

    let candidates = match convention {
        Convention::Classic => vec![address_for(kind, key)],
        Convention::SegwitAware => match kind {
            HeaderKind::P2pkhUncompressed => return Ok(false),
            HeaderKind::P2shP2wpkh | HeaderKind::P2wpkh => vec![address_for(kind, key)],
            HeaderKind::P2pkhCompressed => {
                let compressed = CompressedPublicKey(key);
                vec![
                    Address::p2pkh(PublicKey::new(key).pubkey_hash(), Network::Bitcoin),
                    Address::p2wpkh(&compressed, Network::Bitcoin),
                    Address::p2shwpkh(&compressed, Network::Bitcoin),
                ]
            }
        },
    };

    Ok(candidates.iter().any(|candidate| *candidate == target))
}

/// Recover the signing key from a BIP-137 style signature over the
/// standard `"\x18Bitcoin Signed Message:\n"` digest.
fn recover_signer(
    message: &str,
    signature: &str,
) -> Result<(HeaderKind, bitcoin::secp256k1::PublicKey), BtcSignatureError> {
    let bytes = BASE64_STANDARD
        .decode(signature.trim())
        .map_err(|_| BtcSignatureError::InvalidEncoding)?;
    if bytes.len() != SIGNATURE_LEN {
        return Err(BtcSignatureError::InvalidEncoding);
    }

    let header = bytes[0];
    let kind = HeaderKind::from_header(header)?;
    let recovery_id = RecoveryId::from_i32(i32::from((header - 27) & 3))
        .map_err(|e| BtcSignatureError::Recovery(e.to_string()))?;
    let signature = RecoverableSignature::from_compact(&bytes[1..], recovery_id)
        .map_err(|e| BtcSignatureError::Recovery(e.to_string()))?;

    let digest = Message::from_digest(signed_msg_hash(message).to_byte_array());
    let secp = Secp256k1::verification_only();
    let key = secp
        .recover_ecdsa(&digest, &signature)
        .map_err(|e| BtcSignatureError::Recovery(e.to_string()))?;

    Ok((kind, key))
}

fn address_for(kind: HeaderKind, key: bitcoin::secp256k1::PublicKey) -> Address {
    let compressed = CompressedPublicKey(key);
    match kind {
        HeaderKind::P2pkhUncompressed => {
            let pk = PublicKey {
                compressed: false,
                inner: key,
            };
            Address::p2pkh(pk.pubkey_hash(), Network::Bitcoin)
        }
        HeaderKind::P2pkhCompressed => Address::p2pkh(PublicKey::new(key).pubkey_hash(), Network::Bitcoin),
        HeaderKind::P2shP2wpkh => Address::p2shwpkh(&compressed, Network::Bitcoin),
        HeaderKind::P2wpkh => Address::p2wpkh(&compressed, Network::Bitcoin),
    }
}
