#![no_main]

use libfuzzer_sys::fuzz_target;
use pqlink_core::address::codec;
use pqlink_core::PqAddress;

fuzz_target!(|data: &[u8]| {
    let Ok(s) = std::str::from_utf8(data) else {
        return;
    };

    // Anything that decodes must re-encode to the same fields.
    if let Ok(fields) = codec::decode(s) {
        let encoded = codec::encode(&fields).expect("decoded fields re-encode");
        assert_eq!(codec::decode(&encoded).ok(), Some(fields));
    }

    // Exercise the known prefixes too
    let _ = PqAddress::parse(&format!("pq1{}", s));
    let _ = PqAddress::parse(&format!("tpq1{}", s));
});
