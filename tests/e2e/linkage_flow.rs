//! End-to-end linkage flow.
//!
//! Mirrors what a wallet and a verifier do together:
//! 1. Derive both PQ key pairs and sign the linkage message
//! 2. Sign the same message with the Bitcoin key
//! 3. Build the proof request and seal it to the verifier's KEM ciphertext
//! 4. Verifier opens it and checks every signature

use base64::prelude::*;
use bitcoin::bip32::{DerivationPath, Xpriv};
use bitcoin::hashes::Hash;
use bitcoin::secp256k1::{Message, Secp256k1, SecretKey};
use bitcoin::sign_message::signed_msg_hash;
use bitcoin::{Address, CompressedPublicKey, Network};
use pqlink_core::entropy::parse_mnemonic;
use pqlink_core::keys::verify;
use pqlink_core::seal::{encapsulate_for, open_sealed_request};
use pqlink_core::worker::{spawn_signing_job, SigningRequest};
use pqlink_core::{
    encrypt_proof_request, generate_signed_messages, is_valid_bitcoin_address,
    is_valid_bitcoin_signature, AlgorithmId, EphemeralKemKeypair, PqAddress, PqNetwork,
    ProofRequest, SealedProofRequest,
};
use std::str::FromStr;
use zeroize::Zeroizing;

const TEST_MNEMONIC: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon art";

/// BIP-84 first receive key and its P2WPKH address.
fn bitcoin_wallet(mnemonic: &str) -> (SecretKey, Address) {
    let secp = Secp256k1::new();
    let seed = parse_mnemonic(mnemonic).unwrap().to_seed("");
    let root = Xpriv::new_master(Network::Bitcoin, &seed).unwrap();
    let path = DerivationPath::from_str("m/84'/0'/0'/0/0").unwrap();
    let child = root.derive_priv(&secp, &path).unwrap();

    let pubkey = CompressedPublicKey(child.private_key.public_key(&secp));
    (child.private_key, Address::p2wpkh(&pubkey, Network::Bitcoin))
}

/// BIP-137 signature with the P2WPKH header range.
fn sign_bitcoin_message(secret: &SecretKey, message: &str) -> String {
    let secp = Secp256k1::new();
    let digest = Message::from_digest(signed_msg_hash(message).to_byte_array());
    let (recid, compact) = secp
        .sign_ecdsa_recoverable(&digest, secret)
        .serialize_compact();

    let mut bytes = vec![39 + recid.to_i32() as u8];
    bytes.extend_from_slice(&compact);
    BASE64_STANDARD.encode(bytes)
}

#[test]
fn test_full_linkage_flow() {
    // Wallet side
    let (btc_secret, btc_address) = bitcoin_wallet(TEST_MNEMONIC);
    let btc_address = btc_address.to_string();
    assert!(is_valid_bitcoin_address(&btc_address));

    let bundle = generate_signed_messages(TEST_MNEMONIC, &btc_address, PqNetwork::Mainnet).unwrap();
    assert!(bundle.verify());

    let btc_signature = sign_bitcoin_message(&btc_secret, &bundle.message);
    assert!(is_valid_bitcoin_signature(
        &bundle.message,
        &btc_signature,
        &btc_address
    ));

    let request = ProofRequest::from_bundle(&btc_address, &btc_signature, &bundle);
    let payload = request.to_json_bytes().unwrap();

    // Verifier issues a ciphertext for our ephemeral key
    let mut kem = EphemeralKemKeypair::generate();
    let (server_ciphertext, server_secret) = encapsulate_for(kem.encapsulation_key()).unwrap();

    let sealed = encrypt_proof_request(&payload, &mut kem, &server_ciphertext).unwrap();
    assert!(kem.is_wiped());
    let wire = sealed.to_bytes();

    // Verifier side
    let received = SealedProofRequest::from_bytes(&wire).unwrap();
    let opened = open_sealed_request(&received, &server_secret).unwrap();
    let proof = ProofRequest::from_json_bytes(&opened).unwrap();
    assert_eq!(proof, request);

    assert!(is_valid_bitcoin_signature(
        &bundle.message,
        &proof.bitcoin_signed_message,
        &proof.bitcoin_address
    ));

    let pk = BASE64_STANDARD.decode(&proof.mldsa44_public_key).unwrap();
    let sig = BASE64_STANDARD.decode(&proof.mldsa44_signed_message).unwrap();
    assert!(verify(AlgorithmId::MlDsa44, &pk, bundle.message.as_bytes(), &sig));
    assert!(proof.mldsa44_address.matches_public_key(&pk));
}

#[test]
fn test_bitcoin_signature_over_other_message_rejected() {
    let (btc_secret, btc_address) = bitcoin_wallet(TEST_MNEMONIC);
    let btc_address = btc_address.to_string();
    let bundle = generate_signed_messages(TEST_MNEMONIC, &btc_address, PqNetwork::Mainnet).unwrap();

    let signature = sign_bitcoin_message(&btc_secret, &bundle.message);
    let mutated = bundle.message.replace("permanently", "temporarily");
    assert!(!is_valid_bitcoin_signature(&mutated, &signature, &btc_address));
}

#[test]
fn test_reregistration_reproduces_addresses() {
    let (_, btc_address) = bitcoin_wallet(TEST_MNEMONIC);
    let btc_address = btc_address.to_string();

    let first = generate_signed_messages(TEST_MNEMONIC, &btc_address, PqNetwork::Mainnet).unwrap();
    let again = generate_signed_messages(TEST_MNEMONIC, &btc_address, PqNetwork::Mainnet).unwrap();

    assert_eq!(first.ml_dsa_44.address, again.ml_dsa_44.address);
    assert_eq!(first.slh_dsa_sha2_128s.address, again.slh_dsa_sha2_128s.address);
    assert_eq!(first.message, again.message);
}

#[test]
fn test_every_bundle_signature_verifies() {
    for entropy in [[0x11u8; 32], [0x5Au8; 32], [0xF0u8; 32]] {
        let mnemonic = bip39::Mnemonic::from_entropy(&entropy).unwrap().to_string();
        let (_, btc_address) = bitcoin_wallet(&mnemonic);

        let bundle =
            generate_signed_messages(&mnemonic, &btc_address.to_string(), PqNetwork::Testnet)
                .unwrap();

        for alg in AlgorithmId::SIGNING {
            let entry = bundle.get(alg).unwrap();
            let pk = entry.public_key_bytes().unwrap();
            let sig = entry.signature_bytes().unwrap();
            assert!(verify(alg, &pk, bundle.message.as_bytes(), &sig), "{} failed", alg);

            let fields = PqAddress::parse(entry.address.as_str()).unwrap().decode().unwrap();
            assert_eq!(fields.network, PqNetwork::Testnet);
            assert_eq!(fields.algorithm(), Some(alg));
        }
    }
}

#[test]
fn test_worker_matches_direct_signing() {
    let btc_address = "1BvBMSEYstWetqTFn5Au4m4GFg7xJaNVN2";

    let job = spawn_signing_job(SigningRequest {
        mnemonic: Zeroizing::new(TEST_MNEMONIC.to_string()),
        bitcoin_address: btc_address.to_string(),
        network: PqNetwork::Mainnet,
    })
    .unwrap();

    let from_worker = job.wait().unwrap();
    let direct = generate_signed_messages(TEST_MNEMONIC, btc_address, PqNetwork::Mainnet).unwrap();
    assert_eq!(from_worker, direct);
}

#[test]
fn test_cancelled_worker_does_not_panic() {
    let job = spawn_signing_job(SigningRequest {
        mnemonic: Zeroizing::new(TEST_MNEMONIC.to_string()),
        bitcoin_address: "1BvBMSEYstWetqTFn5Au4m4GFg7xJaNVN2".to_string(),
        network: PqNetwork::Mainnet,
    })
    .unwrap();
    job.cancel();

    // A fresh job still works after an abandoned one
    let job = spawn_signing_job(SigningRequest {
        mnemonic: Zeroizing::new(TEST_MNEMONIC.to_string()),
        bitcoin_address: "1BvBMSEYstWetqTFn5Au4m4GFg7xJaNVN2".to_string(),
        network: PqNetwork::Mainnet,
    })
    .unwrap();
    assert!(job.wait().is_ok());
}
