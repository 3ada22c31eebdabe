#![no_main]

use libfuzzer_sys::fuzz_target;
use pqlink_core::seal::open_sealed_request;
use pqlink_core::SealedProofRequest;

fuzz_target!(|data: &[u8]| {
    if let Ok(sealed) = SealedProofRequest::from_bytes(data) {
        assert_eq!(sealed.to_bytes(), data);

        // Decryption of attacker-chosen bytes must fail cleanly
        let _ = open_sealed_request(&sealed, &[0u8; 32]);
    }
});
