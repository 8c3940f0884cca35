//! Zlib transform

use super::StreamTransform;
use crate::error::{Error, Result};
use flate2::Compression;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use std::io::{Read, Write};

/// Zlib/deflate compression of a whole file
#[derive(Debug, Clone, Copy)]
pub struct ZlibTransform {
    level: Compression,
}

impl Default for ZlibTransform {
    fn default() -> Self {
        Self::new()
    }
}

impl ZlibTransform {
    /// Compress at the default level
    pub fn new() -> Self {
        Self {
            level: Compression::default(),
        }
    }

    /// Compress at `level`, 0 to 9
    pub fn with_level(level: u32) -> Self {
        Self {
            level: Compression::new(level.min(9)),
        }
    }
}

impl StreamTransform for ZlibTransform {
    fn encode(&self, plain: &[u8]) -> Result<Vec<u8>> {
        let mut encoder = ZlibEncoder::new(Vec::new(), self.level);
        encoder
            .write_all(plain)
            .map_err(|e| Error::transform(format!("zlib compression failed: {e}")))?;
        encoder
            .finish()
            .map_err(|e| Error::transform(format!("zlib compression failed: {e}")))
    }

    fn decode(&self, stored: &[u8]) -> Result<Vec<u8>> {
        if stored.is_empty() {
            return Ok(Vec::new());
        }
        let mut decoder = ZlibDecoder::new(stored);
        let mut plain = Vec::new();
        decoder.read_to_end(&mut plain).map_err(|e| {
            log::debug!("Zlib decompression failed: {e}");
            log::trace!(
                "First 16 bytes of data: {:02X?}",
                &stored[..16.min(stored.len())]
            );
            Error::transform(format!("zlib decompression failed: {e}"))
        })?;
        Ok(plain)
    }
}
