//! Subcommand implementations
//!
//! Each command reads secrets from `input` and writes results to `out`, so
//! they can be driven from tests without touching the real stdin/stdout.

use anyhow::{bail, Context, Result};
use base64::prelude::*;
use pqlink_core::seal::{encrypt_proof_request, EphemeralKemKeypair};
use pqlink_core::worker::{spawn_signing_job, SigningRequest};
use pqlink_core::{generate_keypair, is_valid_bitcoin_address, is_valid_bitcoin_signature, AlgorithmId};
use serde::Serialize;
use std::io::{BufRead, Write};
use std::path::Path;
use zeroize::Zeroizing;

use crate::config::PqlinkConfig;

/// Read one line (a mnemonic or hex blob) from `input`.
fn read_line(input: &mut impl BufRead) -> Result<Zeroizing<String>> {
    let mut line = Zeroizing::new(String::new());
    input
        .read_line(&mut line)
        .context("Failed to read from stdin")?;
    let trimmed = Zeroizing::new(line.trim().to_string());
    if trimmed.is_empty() {
        bail!("Expected input on stdin");
    }
    Ok(trimmed)
}

fn write_json(out: &mut impl Write, value: &impl Serialize, pretty: bool) -> Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    writeln!(out, "{}", json)?;
    Ok(())
}

/// `sign <btc-address>`: mnemonic on stdin, signed bundle on stdout.
pub fn sign(
    config: &PqlinkConfig,
    btc_address: &str,
    input: &mut impl BufRead,
    out: &mut impl Write,
) -> Result<()> {
    if !is_valid_bitcoin_address(btc_address) {
        bail!(
            "Unsupported Bitcoin address: {} (mainnet P2PKH or P2WPKH required)",
            btc_address
        );
    }

    let mnemonic = read_line(input)?;
    let job = spawn_signing_job(SigningRequest {
        mnemonic,
        bitcoin_address: btc_address.to_string(),
        network: config.network()?,
    })?;
    let bundle = job.wait().context("Signing failed")?;

    log::info!("Signed linkage message for {}", btc_address);
    write_json(out, &bundle, config.output.pretty)
}

/// `check-address <addr>`
pub fn check_address(address: &str, out: &mut impl Write) -> Result<bool> {
    let valid = is_valid_bitcoin_address(address);
    writeln!(out, "{}", if valid { "valid" } else { "invalid" })?;
    Ok(valid)
}

/// `verify-message <addr> <signature> <message>`
pub fn verify_message(
    address: &str,
    signature: &str,
    message: &str,
    out: &mut impl Write,
) -> Result<bool> {
    let valid = is_valid_bitcoin_signature(message, signature, address);
    writeln!(out, "{}", if valid { "valid" } else { "invalid" })?;
    Ok(valid)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DerivedAddress {
    algorithm: AlgorithmId,
    address: String,
    public_key: String,
}

/// `derive-address <algorithm>`: mnemonic on stdin, address + public key out.
pub fn derive_address(
    config: &PqlinkConfig,
    algorithm: &str,
    input: &mut impl BufRead,
    out: &mut impl Write,
) -> Result<()> {
    let algorithm: AlgorithmId = algorithm.parse().map_err(anyhow::Error::msg)?;
    let mnemonic = read_line(input)?;

    let mut keypair = generate_keypair(&mnemonic, algorithm, config.network()?)
        .with_context(|| format!("Failed to derive {} key pair", algorithm))?;
    keypair.wipe();

    let derived = DerivedAddress {
        algorithm,
        address: keypair.address().to_string(),
        public_key: BASE64_STANDARD.encode(keypair.public_key()),
    };
    write_json(out, &derived, config.output.pretty)
}

/// `seal <payload-file>`: prints the ephemeral encapsulation key, reads the
/// verifier's ciphertext (hex) from stdin, prints the sealed request (hex).
pub fn seal(payload_path: &Path, input: &mut impl BufRead, out: &mut impl Write) -> Result<()> {
    let payload = std::fs::read(payload_path)
        .with_context(|| format!("Failed to read payload: {}", payload_path.display()))?;

    let mut keypair = EphemeralKemKeypair::generate();
    writeln!(out, "{}", hex::encode(keypair.encapsulation_key()))?;
    out.flush()?;

    // keypair is zeroized on drop if either of these fails
    let ciphertext_hex = read_line(input)?;
    let ciphertext =
        hex::decode(ciphertext_hex.as_str()).context("Ciphertext is not valid hex")?;

    let sealed = encrypt_proof_request(&payload, &mut keypair, &ciphertext)
        .context("Failed to seal payload")?;

    writeln!(out, "{}", hex::encode(sealed.to_bytes()))?;
    Ok(())
}
