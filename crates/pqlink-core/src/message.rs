//! Canonical linkage message
//!
//! The exact text is signed by both PQ keys and by the Bitcoin key, so any
//! change to the template (including the en dashes) breaks verification on
//! the other side.

use std::fmt;

/// Text and UTF-8 bytes of the linkage message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkageMessage {
    pub text: String,
    pub bytes: Vec<u8>,
}

impl LinkageMessage {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Display for LinkageMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Build the message binding `btc_address` to both PQ addresses.
///
/// No validation happens here.
pub fn compose_linkage_message(
    btc_address: &str,
    ml_dsa_address: &str,
    slh_dsa_address: &str,
) -> LinkageMessage {
    let text = format!(
        "I want to permanently link my Bitcoin address {} with my post-quantum addresses: \
         ML-DSA-44 \u{2013} {}, SLH-DSA-SHA2-128 \u{2013} {}",
        btc_address, ml_dsa_address, slh_dsa_address
    );
    let bytes = text.as_bytes().to_vec();
    LinkageMessage { text, bytes }
}
