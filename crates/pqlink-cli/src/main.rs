//! PQLink CLI: link a Bitcoin address to post-quantum keys
//!
//! # Usage
//!
//! ```bash
//! pqlink sign bc1q...                 # mnemonic on stdin
//! pqlink derive-address ml-dsa-44     # mnemonic on stdin
//! pqlink check-address 1BvBM...
//! pqlink verify-message <address> <signature> <message>
//! pqlink seal proof.json              # ciphertext hex on stdin
//! pqlink --config /path/to/pqlink.toml <command> ...
//! ```

mod commands;
mod config;

use anyhow::{Context, Result};
use std::io::{self, Write};
use std::path::PathBuf;

fn main() -> Result<()> {
    // Security hardening: disable core dumps to prevent seed material leaking to disk
    pqlink_core::memory::disable_core_dumps();

    // Parse CLI args
    let args: Vec<String> = std::env::args().collect();

    let mut config_path = PathBuf::from("pqlink.toml");
    let mut positional: Vec<String> = Vec::new();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                i += 1;
                if i < args.len() {
                    config_path = PathBuf::from(&args[i]);
                } else {
                    anyhow::bail!("--config requires a path argument");
                }
            }
            "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            "--version" | "-V" => {
                println!("pqlink {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            other if other.starts_with('-') && positional.is_empty() => {
                anyhow::bail!("Unknown argument: {}", other);
            }
            other => positional.push(other.to_string()),
        }
        i += 1;
    }

    // Load config
    let mut cli_config = config::PqlinkConfig::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    // Apply env overrides
    cli_config.apply_env_overrides();

    // Validate
    cli_config
        .validate()
        .context("Configuration validation failed")?;

    // Init logger
    std::env::set_var("RUST_LOG", &cli_config.general.log_level);
    env_logger::init();

    let Some((command, rest)) = positional.split_first() else {
        print_help();
        std::process::exit(2);
    };

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let stdout = io::stdout();
    let mut out = stdout.lock();

    let ok = match (command.as_str(), rest) {
        ("sign", [btc_address]) => {
            commands::sign(&cli_config, btc_address, &mut input, &mut out)?;
            true
        }
        ("derive-address", [algorithm]) => {
            commands::derive_address(&cli_config, algorithm, &mut input, &mut out)?;
            true
        }
        ("check-address", [address]) => commands::check_address(address, &mut out)?,
        ("verify-message", [address, signature, message]) => {
            commands::verify_message(address, signature, message, &mut out)?
        }
        ("seal", [payload]) => {
            commands::seal(&PathBuf::from(payload), &mut input, &mut out)?;
            true
        }
        _ => {
            anyhow::bail!(
                "Unknown command or wrong number of arguments: {}",
                positional.join(" ")
            );
        }
    };

    out.flush()?;
    if !ok {
        std::process::exit(1);
    }
    Ok(())
}

fn print_help() {
    println!(
        r#"PQLink: link a Bitcoin address to post-quantum keys

USAGE:
    pqlink [OPTIONS] <COMMAND> [ARGS]

COMMANDS:
    sign <btc-address>                         Sign the linkage message (mnemonic on stdin)
    derive-address <algorithm>                 Print a PQ address (mnemonic on stdin)
                                               algorithm: ml-dsa-44 | slh-dsa-sha2-128s
    check-address <btc-address>                Check a Bitcoin address is supported
    verify-message <address> <sig> <message>   Verify a Bitcoin message signature
    seal <payload-file>                        Seal a proof request for the verifier
                                               (prints encapsulation key, reads ciphertext hex)

OPTIONS:
    -c, --config <PATH>   Config file path [default: pqlink.toml]
    -h, --help            Print this help
    -V, --version         Print version

ENVIRONMENT:
    PQLINK_LOG_LEVEL      Log level (off, error, warn, info, debug, trace)
    PQLINK_NETWORK        PQ address network (mainnet, testnet)
    PQLINK_PRETTY         Pretty-print JSON output (true, false)

CONFIG FILE (TOML):
    [general]
    log_level = "info"

    [address]
    network = "mainnet"

    [output]
    pretty = true
"#
    );
}
