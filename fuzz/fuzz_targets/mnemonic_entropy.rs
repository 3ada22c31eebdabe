#![no_main]

use libfuzzer_sys::fuzz_target;
use pqlink_core::{derive_entropy, AlgorithmId};

fuzz_target!(|data: &[u8]| {
    // derive_entropy must never panic, only return Ok or Err.
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(entropy) = derive_entropy(s, AlgorithmId::MlDsa44) {
            assert_eq!(entropy.len(), AlgorithmId::MlDsa44.entropy_len());
        }
    }
});
