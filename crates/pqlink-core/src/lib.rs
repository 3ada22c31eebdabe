//! PQLink Core
//!
//! Links a Bitcoin address to post-quantum signing keys derived from the
//! same 24-word recovery phrase.
//!
//! # Key Derivation
//!
//! From a single BIP-39 mnemonic, one BIP-85 subtree per algorithm:
//! - ML-DSA-44 seed:          m/83696968'/0'/1'  (32 bytes)
//! - SLH-DSA-SHA2-128s seed:  m/83696968'/0'/2'  (48 bytes)
//!
//! # Proof Submission
//!
//! The linkage message is signed with both PQ keys, the resulting proof
//! request is sealed with ML-KEM-768 + AES-256-GCM before it leaves the
//! process.

pub mod address;
pub mod algorithm;
pub mod btc;
pub mod entropy;
pub mod keys;
pub mod memory;
pub mod message;
pub mod proof;
pub mod seal;
pub mod signer;
pub mod worker;

pub use address::{encode_address, AddressError, PqAddress, PqNetwork};
pub use algorithm::AlgorithmId;
pub use btc::{is_valid_bitcoin_address, is_valid_bitcoin_signature};
pub use entropy::{derive_entropy, EntropyError};
pub use keys::{generate_keypair, KeyError, PqKeypair};
pub use message::{compose_linkage_message, LinkageMessage};
pub use proof::ProofRequest;
pub use seal::{encrypt_proof_request, EphemeralKemKeypair, SealError, SealedProofRequest};
pub use signer::{generate_signed_messages, SignedMessage, SignedMessageBundle, SigningError};
