use serde::Deserialize;

use crate::{
    Encoding,
    codec::{DEFAULT_BUFFER_SIZE, DEFAULT_MAX_IDLE, brotli::BrotliOptions, lzw::BitOrder},
};

/// Parameters of the LZW adapter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LzwOptions {
    pub order: BitOrder,
    /// Literal code width in bits, `2..=8`.
    pub width: u8,
}

impl Default for LzwOptions {
    fn default() -> Self {
        Self {
            order: BitOrder::Lsb,
            width: 8,
        }
    }
}

/// Configuration of a [`Codecs`](crate::Codecs) registry.
///
/// Every field has a default, so a partial document deserializes.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Codecs the registry builds, in preference order.
    pub enabled: Vec<Encoding>,
    /// Compression level for gzip.
    pub gzip_level: u32,
    /// Compression level for deflate.
    pub deflate_level: u32,
    /// Preset dictionary for deflate.
    pub deflate_dictionary: Option<Vec<u8>>,
    pub brotli: BrotliOptions,
    /// Compression level for zstd.
    #[cfg(feature = "zstd")]
    pub zstd_level: i32,
    pub lzw: LzwOptions,
    /// Capacity of the wrappers' pooled scratch buffers.
    pub buffer_size: usize,
    /// Idle items each pool retains.
    pub max_idle: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            enabled: Encoding::ALL.to_vec(),
            gzip_level: 5,
            deflate_level: 5,
            deflate_dictionary: None,
            brotli: BrotliOptions::default(),
            #[cfg(feature = "zstd")]
            zstd_level: 3,
            lzw: LzwOptions::default(),
            buffer_size: DEFAULT_BUFFER_SIZE,
            max_idle: DEFAULT_MAX_IDLE,
        }
    }
}
