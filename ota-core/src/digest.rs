/// Integrity digest handling for downloaded firmware images
use core::fmt;
use md5::{Digest, Md5};

/// Length of an MD5 digest rendered as hex
pub const DIGEST_HEX_LEN: usize = 32;

/// Expected MD5 digest of a firmware image, as published in the manifest.
///
/// Only constructible from exactly 32 ASCII hex characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegrityDigest {
    hex: heapless::String<DIGEST_HEX_LEN>,
    bytes: [u8; 16],
}

impl IntegrityDigest {
    pub fn parse(hex_str: &str) -> Option<Self> {
        if hex_str.len() != DIGEST_HEX_LEN {
            return None;
        }
        let mut bytes = [0u8; 16];
        hex::decode_to_slice(hex_str, &mut bytes).ok()?;

        let mut text = heapless::String::new();
        for c in hex_str.chars() {
            text.push(c.to_ascii_lowercase()).ok()?;
        }
        Some(Self { hex: text, bytes })
    }

    pub fn as_str(&self) -> &str {
        self.hex.as_str()
    }

    pub fn to_bytes(&self) -> [u8; 16] {
        self.bytes
    }
}

impl fmt::Display for IntegrityDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Running MD5 over the bytes written to the update partition.
///
/// Storage adapters feed every chunk through [`DigestVerifier::update`] and
/// check the result before switching the boot slot.
pub struct DigestVerifier {
    expected: IntegrityDigest,
    hasher: Md5,
}

impl DigestVerifier {
    pub fn new(expected: IntegrityDigest) -> Self {
        Self { expected, hasher: Md5::new() }
    }

    pub fn expected(&self) -> &IntegrityDigest {
        &self.expected
    }

    pub fn update(&mut self, chunk: &[u8]) {
        self.hasher.update(chunk);
    }

    /// Consume the verifier. `Err` carries the hex digest that was actually computed.
    pub fn finish(self) -> Result<(), String> {
        let actual = self.hasher.finalize();
        if actual.as_slice() == self.expected.to_bytes().as_slice() {
            Ok(())
        } else {
            Err(hex::encode(actual.as_slice()))
        }
    }
}
