//! Pluggable compression for fd-content update payloads.
//!
//! Codecs are a black-box transform applied to a diff before it crosses the
//! channel and reversed on the receiving side. This module only owns the
//! seam and two real codecs; it does not invent one.

use crate::{config::CompressionMode, error::WorkerError};

/// A byte-transform applied to an update payload before it is queued for
/// transmission, and reversed on the receiving side.
pub trait Compressor: Send + Sync {
    fn compress(&self, input: &[u8]) -> Result<Vec<u8>, WorkerError>;
    fn decompress(&self, input: &[u8], expected_len: usize) -> Result<Vec<u8>, WorkerError>;
}

/// Payload crosses the channel unmodified.
#[derive(Debug, Default)]
pub struct NoneCompressor;

impl Compressor for NoneCompressor {
    fn compress(&self, input: &[u8]) -> Result<Vec<u8>, WorkerError> {
        Ok(input.to_vec())
    }

    fn decompress(&self, input: &[u8], _expected_len: usize) -> Result<Vec<u8>, WorkerError> {
        Ok(input.to_vec())
    }
}

#[derive(Debug, Default)]
pub struct Lz4Compressor;

impl Compressor for Lz4Compressor {
    fn compress(&self, input: &[u8]) -> Result<Vec<u8>, WorkerError> {
        Ok(lz4_flex::compress_prepend_size(input))
    }

    fn decompress(&self, input: &[u8], _expected_len: usize) -> Result<Vec<u8>, WorkerError> {
        lz4_flex::decompress_size_prepended(input)
            .map_err(|e| WorkerError::Compression(e.to_string()))
    }
}

pub struct ZstdCompressor {
    level: i32,
}

impl ZstdCompressor {
    pub fn new(level: u32) -> Self {
        Self {
            level: level.min(i32::MAX as u32) as i32,
        }
    }
}

impl Compressor for ZstdCompressor {
    fn compress(&self, input: &[u8]) -> Result<Vec<u8>, WorkerError> {
        zstd::bulk::compress(input, self.level).map_err(|e| WorkerError::Compression(e.to_string()))
    }

    fn decompress(&self, input: &[u8], expected_len: usize) -> Result<Vec<u8>, WorkerError> {
        zstd::bulk::decompress(input, expected_len)
            .map_err(|e| WorkerError::Compression(e.to_string()))
    }
}

/// Build the configured compressor.
pub fn build(mode: CompressionMode, level: u32) -> Box<dyn Compressor> {
    match mode {
        CompressionMode::None => Box::new(NoneCompressor),
        CompressionMode::Lz4 => Box::new(Lz4Compressor),
        CompressionMode::Zstd => Box::new(ZstdCompressor::new(level)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(compressor: &dyn Compressor, data: &[u8]) {
        let compressed = compressor.compress(data).unwrap();
        let decompressed = compressor.decompress(&compressed, data.len()).unwrap();
        assert_eq!(decompressed, data);
    }

    #[test]
    fn none_round_trips() {
        round_trip(&NoneCompressor, b"abcdefgh");
    }

    #[test]
    fn lz4_round_trips_repetitive_data() {
        let data = vec![0x42u8; 4096];
        round_trip(&Lz4Compressor, &data);
    }

    #[test]
    fn zstd_round_trips_repetitive_data() {
        let data = vec![0x7eu8; 4096];
        round_trip(&ZstdCompressor::new(3), &data);
    }

    #[test]
    fn build_selects_requested_backend() {
        let none = build(CompressionMode::None, 1);
        round_trip(none.as_ref(), b"hello");
        let lz4 = build(CompressionMode::Lz4, 1);
        round_trip(lz4.as_ref(), b"hello world hello world");
        let zstd = build(CompressionMode::Zstd, 5);
        round_trip(zstd.as_ref(), b"hello world hello world");
    }
}
