//! # Record Compression
//!
//! Blocks and transactions are persisted as zstd-compressed bincode.

use crate::error::{Result, StorageError};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Compression settings for persisted records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressionConfig {
    /// zstd level, 1-22.
    pub level: i32,
    /// When false records are stored as raw bincode.
    pub enabled: bool,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            level: 3,
            enabled: true,
        }
    }
}

impl CompressionConfig {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Build the compressor these settings describe.
    pub fn build(&self) -> Box<dyn Compressor> {
        if self.enabled {
            Box::new(ZstdCompressor::new(self.clone()))
        } else {
            Box::new(NoOpCompressor)
        }
    }
}

/// Byte-level codec for persisted records.
pub trait Compressor: Send + Sync {
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>>;

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>>;

    fn is_enabled(&self) -> bool;
}

/// Serialize with bincode, then compress.
pub fn encode_record<T: Serialize + ?Sized>(compressor: &dyn Compressor, value: &T) -> Result<Vec<u8>> {
    let raw = bincode::serialize(value)?;
    compressor.compress(&raw)
}

/// Decompress, then deserialize with bincode.
pub fn decode_record<T: DeserializeOwned>(compressor: &dyn Compressor, bytes: &[u8]) -> Result<T> {
    let raw = compressor.decompress(bytes)?;
    Ok(bincode::deserialize(&raw)?)
}

fn compression_error(context: &str, err: std::io::Error) -> StorageError {
    StorageError::Compression(format!("{}: {}", context, err))
}

/// zstd compressor.
pub struct ZstdCompressor {
    config: CompressionConfig,
}

impl ZstdCompressor {
    pub fn new(config: CompressionConfig) -> Self {
        Self { config }
    }
}

impl Default for ZstdCompressor {
    fn default() -> Self {
        Self::new(CompressionConfig::default())
    }
}

impl Compressor for ZstdCompressor {
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        if !self.config.enabled {
            return Ok(data.to_vec());
        }
        zstd::encode_all(data, self.config.level).map_err(|e| compression_error("compress", e))
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>> {
        if !self.config.enabled {
            return Ok(data.to_vec());
        }
        zstd::decode_all(data).map_err(|e| compression_error("decompress", e))
    }

    fn is_enabled(&self) -> bool {
        self.config.enabled
    }
}

/// Passthrough codec.
pub struct NoOpCompressor;

impl Compressor for NoOpCompressor {
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        Ok(data.to_vec())
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>> {
        Ok(data.to_vec())
    }

    fn is_enabled(&self) -> bool {
        false
    }
}
