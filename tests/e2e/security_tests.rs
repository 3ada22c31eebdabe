//! Security-specific tests for audit preparation.
//!
//! These tests verify:
//! 1. Secrets are zeroed after use, on success and on failure
//! 2. Sealing never reuses a nonce
//! 3. Length invariants of the KEM pipeline are enforced
//! 4. Derivation is deterministic and separated per algorithm
//! 5. Malformed inputs don't panic

use base64::prelude::*;
use pqlink_core::entropy::derive_entropy_from_root;
use pqlink_core::keys::generate_keypair_from_entropy;
use pqlink_core::seal::{
    encapsulate_for, KEM_CIPHERTEXT_LEN, KEM_DECAPSULATION_KEY_LEN, SHARED_SECRET_LEN,
};
use pqlink_core::{
    derive_entropy, encrypt_proof_request, generate_keypair, is_valid_bitcoin_address,
    is_valid_bitcoin_signature, AlgorithmId, EntropyError, EphemeralKemKeypair, PqAddress,
    PqNetwork, SealError, SealedProofRequest,
};
use secp256k1::rand::{thread_rng, RngCore};
use std::str::FromStr;

const TEST_MNEMONIC: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon art";

// ============================================================================
// 1. Zeroization
// ============================================================================

#[test]
fn test_kem_keypair_zeroed_after_success() {
    let mut kp = EphemeralKemKeypair::generate();
    let (ct, _ss) = encapsulate_for(kp.encapsulation_key()).unwrap();

    encrypt_proof_request(b"{}", &mut kp, &ct).unwrap();

    assert!(kp.is_wiped());
    assert_eq!(kp.decapsulation_key().len(), KEM_DECAPSULATION_KEY_LEN);
}

#[test]
fn test_kem_keypair_zeroed_after_bad_ciphertext() {
    let mut kp = EphemeralKemKeypair::generate();
    let result = encrypt_proof_request(b"{}", &mut kp, &[0u8; 12]);

    assert!(result.is_err());
    assert!(kp.is_wiped(), "Keypair must be wiped on the error path too");
}

#[test]
fn test_kem_keypair_zeroed_after_bad_key() {
    let mut kp = EphemeralKemKeypair::from_parts(vec![0xAA; 1184], vec![0xBB; 100]);
    let result = encrypt_proof_request(b"{}", &mut kp, &[0u8; KEM_CIPHERTEXT_LEN]);

    assert!(matches!(
        result,
        Err(SealError::InvalidDecapsulationKeyLength { actual: 100, .. })
    ));
    assert!(kp.is_wiped());
}

#[test]
fn test_pq_keypair_wipe() {
    let mut kp =
        generate_keypair(TEST_MNEMONIC, AlgorithmId::SlhDsaSha2_128s, PqNetwork::Mainnet).unwrap();
    assert!(kp.sign(b"before").is_ok());

    kp.wipe();
    assert!(kp.is_wiped());
    assert!(kp.sign(b"after").is_err());
}

#[test]
fn test_debug_output_has_no_secrets() {
    let kp = generate_keypair(TEST_MNEMONIC, AlgorithmId::MlDsa44, PqNetwork::Mainnet).unwrap();
    let debug = format!("{:?}", kp);
    assert!(debug.contains("***"));
    assert!(!debug.contains("private_key: ["));

    let kem = EphemeralKemKeypair::generate();
    let debug = format!("{:?}", kem);
    assert!(!debug.contains(&format!("{:?}", &kem.decapsulation_key()[..4])));
}

// ============================================================================
// 2. Nonce freshness
// ============================================================================

#[test]
fn test_identical_seals_differ() {
    let kp = EphemeralKemKeypair::generate();
    let (ct, _ss) = encapsulate_for(kp.encapsulation_key()).unwrap();

    let mut nonces = Vec::new();
    let mut ciphertexts = Vec::new();
    for _ in 0..8 {
        let mut copy = kp.clone();
        let sealed = encrypt_proof_request(b"identical payload", &mut copy, &ct).unwrap();
        nonces.push(*sealed.nonce());
        ciphertexts.push(sealed.ciphertext().to_vec());
    }

    for i in 0..nonces.len() {
        for j in (i + 1)..nonces.len() {
            assert_ne!(nonces[i], nonces[j], "Nonce reused");
            assert_ne!(ciphertexts[i], ciphertexts[j]);
        }
    }
}

// ============================================================================
// 3. KEM length invariants
// ============================================================================

#[test]
fn test_ciphertext_must_be_exact_length() {
    let kp = EphemeralKemKeypair::generate();
    let (ct, ss) = encapsulate_for(kp.encapsulation_key()).unwrap();
    assert_eq!(ct.len(), KEM_CIPHERTEXT_LEN);
    assert_eq!(ss.len(), SHARED_SECRET_LEN);

    let mut short = ct.clone();
    short.pop();
    let mut long = ct.clone();
    long.push(0);

    for bad in [short, long] {
        let mut copy = kp.clone();
        assert_eq!(
            encrypt_proof_request(b"{}", &mut copy, &bad),
            Err(SealError::InvalidCiphertextLength {
                expected: KEM_CIPHERTEXT_LEN,
                actual: bad.len()
            })
        );
    }

    let mut copy = kp.clone();
    assert!(encrypt_proof_request(b"{}", &mut copy, &ct).is_ok());
}

// ============================================================================
// 4. Derivation
// ============================================================================

#[test]
fn test_entropy_deterministic_and_separated() {
    for seed in [[0x01u8; 32], [0x7Fu8; 32], [0xFEu8; 32]] {
        let mnemonic = bip39::Mnemonic::from_entropy(&seed).unwrap().to_string();

        let ml_a = derive_entropy(&mnemonic, AlgorithmId::MlDsa44).unwrap();
        let ml_b = derive_entropy(&mnemonic, AlgorithmId::MlDsa44).unwrap();
        let slh = derive_entropy(&mnemonic, AlgorithmId::SlhDsaSha2_128s).unwrap();
        let test = derive_entropy(&mnemonic, AlgorithmId::Test).unwrap();

        assert_eq!(ml_a.as_slice(), ml_b.as_slice());
        assert_eq!(ml_a.len(), 32);
        assert_eq!(slh.len(), 48);
        assert_eq!(test.len(), 64);
        assert_ne!(ml_a.as_slice(), &slh[..32]);
        assert_ne!(&slh[..], &test[..48]);
    }
}

#[test]
fn test_bip85_vector_through_public_api() {
    let root = bitcoin::bip32::Xpriv::from_str(
        "xprv9s21ZrQH143K2LBWUUQRFXhucrQqBpKdRRxNVq2zBqsx8HVqFk2uYo8kmbaLLHRdqtQpUm98uKfu3vca1LqdGhUtyoFnCNkfmXRyPXLjbKb",
    )
    .unwrap();
    let entropy = derive_entropy_from_root(&root, 0, 64).unwrap();
    assert_eq!(
        hex::encode(entropy.as_slice()),
        "efecfbccffea313214232d29e71563d941229afb4338c21f9517c41aaa0d16f00b83d2a09ef747e7a64e8e2bd5a14869e693da66ce94ac2da570ab7ee48618f7"
    );

    assert!(matches!(
        derive_entropy_from_root(&root, 0, 65),
        Err(EntropyError::InvalidEntropyLength { .. })
    ));
}

#[test]
fn test_keygen_rejects_wrong_entropy_length() {
    for len in [0, 31, 33, 48, 64] {
        let result =
            generate_keypair_from_entropy(&vec![7u8; len], AlgorithmId::MlDsa44, PqNetwork::Mainnet);
        assert!(result.is_err(), "ML-DSA-44 accepted {} bytes", len);
    }
}

// ============================================================================
// 5. Malformed inputs don't panic
// ============================================================================

#[test]
fn test_random_pq_addresses_rejected() {
    let mut rng = thread_rng();
    for len in 0..100 {
        let mut bytes = vec![0u8; len];
        rng.fill_bytes(&mut bytes);
        let s = String::from_utf8_lossy(&bytes);
        let _ = PqAddress::parse(&s);
        let _ = PqAddress::parse(&format!("pq1{}", s));
    }
}

#[test]
fn test_random_sealed_requests_dont_panic() {
    let mut rng = thread_rng();
    for len in 0..200 {
        let mut bytes = vec![0u8; len];
        rng.fill_bytes(&mut bytes);
        if let Ok(parsed) = SealedProofRequest::from_bytes(&bytes) {
            assert_eq!(parsed.to_bytes(), bytes);
        }
    }
}

#[test]
fn test_random_bitcoin_signatures_rejected() {
    let mut rng = thread_rng();
    for header in 0u8..=255 {
        let mut bytes = vec![0u8; 65];
        rng.fill_bytes(&mut bytes);
        bytes[0] = header;
        let sig = BASE64_STANDARD.encode(&bytes);
        assert!(!is_valid_bitcoin_signature(
            "message",
            &sig,
            "bc1qcr8te4kr609gcawutmrza0j4xv80jy8z306fyu"
        ));
    }
}

#[test]
fn test_garbage_bitcoin_addresses_rejected() {
    for addr in ["", " ", "bc1", "1", "pq1qqqq", "\u{0}", "bc1qcr8te4kr609gcawutmrza0j4xv80jy8z306fy"] {
        assert!(!is_valid_bitcoin_address(addr), "{:?} accepted", addr);
    }
}
