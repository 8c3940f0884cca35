//! Incrementing-key XOR cipher used by several game archives

use super::StreamTransform;
use crate::error::Result;

/// XOR each byte with a key that starts at `seed` and increases by one per
/// byte, wrapping at 256
#[derive(Debug, Clone, Copy, Default)]
pub struct XorTransform {
    seed: u8,
}

impl XorTransform {
    /// Cipher starting at `seed`
    pub fn new(seed: u8) -> Self {
        Self { seed }
    }

    fn apply(&self, data: &[u8]) -> Vec<u8> {
        data.iter()
            .enumerate()
            .map(|(i, b)| b ^ self.seed.wrapping_add(i as u8))
            .collect()
    }
}

impl StreamTransform for XorTransform {
    fn encode(&self, plain: &[u8]) -> Result<Vec<u8>> {
        Ok(self.apply(plain))
    }

    fn decode(&self, stored: &[u8]) -> Result<Vec<u8>> {
        Ok(self.apply(stored))
    }
}
