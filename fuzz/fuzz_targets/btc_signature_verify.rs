#![no_main]

use libfuzzer_sys::fuzz_target;
use pqlink_core::{is_valid_bitcoin_address, is_valid_bitcoin_signature};

fuzz_target!(|data: &[u8]| {
    let Ok(s) = std::str::from_utf8(data) else {
        return;
    };

    // Split the input into message / signature / address on '|'
    let mut parts = s.splitn(3, '|');
    let message = parts.next().unwrap_or_default();
    let signature = parts.next().unwrap_or_default();
    let address = parts.next().unwrap_or_default();

    let _ = is_valid_bitcoin_address(address);
    let _ = is_valid_bitcoin_signature(message, signature, address);
});
