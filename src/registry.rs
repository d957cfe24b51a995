//! Registry of configured codecs.
//!
//! A [`Codecs`] value is built once at service start. It owns the pools that do
//! not depend on configuration and hands them to every adapter it builds, so
//! all gzip decoders of one service come from one pool while nothing is shared
//! between two registries.
//!
//! # Examples
//!
//! ```rust
//! use std::io::{Read, Write};
//! use tako_compress::{Codecs, Compressor};
//!
//! let codecs = Codecs::builder()
//!     .enable_lzw(false)
//!     .gzip_level(6)
//!     .build()?;
//!
//! let gzip = codecs.get("gzip").expect("gzip is enabled");
//! let mut encoder = gzip.new_encoder(Vec::new())?;
//! encoder.write_all(b"hello")?;
//! let compressed = encoder.finish()?;
//!
//! let mut decoded = String::new();
//! gzip.new_decoder(&compressed[..])?.read_to_string(&mut decoded)?;
//! assert_eq!(decoded, "hello");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use bytes::Bytes;

#[cfg(feature = "zstd")]
use crate::codec::Zstd;
use crate::{
    Codec, Encoding,
    codec::{Brotli, Deflate, Gzip, Lzw, Pools, brotli::BrotliOptions, lzw::BitOrder},
    config::{Config, LzwOptions},
    error::{Error, Result},
};

/// The codecs a service supports, looked up by content-coding token.
#[derive(Clone, Debug)]
pub struct Codecs {
    codecs: Vec<Codec>,
}

impl Codecs {
    pub fn builder() -> CodecsBuilder {
        CodecsBuilder::new()
    }

    /// Builds every codec enabled in `config`.
    pub fn from_config(config: Config) -> Result<Self> {
        if config.buffer_size == 0 {
            return Err(Error::config("registry", "buffer size must be positive"));
        }

        let pools = Pools::new(config.buffer_size, config.max_idle);
        let mut codecs: Vec<Codec> = Vec::with_capacity(config.enabled.len());

        for encoding in &config.enabled {
            if codecs.iter().any(|c| c.encoding() == *encoding) {
                continue;
            }
            let codec: Codec = match encoding {
                Encoding::Gzip => Gzip::with_pools(config.gzip_level, &pools)?.into(),
                Encoding::Deflate => Deflate::with_pools(
                    config.deflate_level,
                    config.deflate_dictionary.clone().map(Bytes::from),
                    &pools,
                )?
                .into(),
                Encoding::Compress => {
                    Lzw::with_pools(config.lzw.order, config.lzw.width, &pools)?.into()
                }
                Encoding::Brotli => Brotli::with_pools(config.brotli, &pools)?.into(),
                #[cfg(feature = "zstd")]
                Encoding::Zstd => Zstd::with_pools(config.zstd_level, &pools)?.into(),
            };
            codecs.push(codec);
        }

        tracing::debug!(
            codecs = ?codecs.iter().map(|c| c.encoding().as_str()).collect::<Vec<_>>(),
            "built codec registry"
        );
        Ok(Self { codecs })
    }

    /// Looks a codec up by token. Aliases such as `x-gzip` resolve too.
    pub fn get(&self, name: &str) -> Option<&Codec> {
        let encoding = name.parse().ok()?;
        self.get_encoding(encoding)
    }

    pub fn get_encoding(&self, encoding: Encoding) -> Option<&Codec> {
        self.codecs.iter().find(|c| c.encoding() == encoding)
    }

    /// Tokens of the enabled codecs, in preference order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.codecs.iter().map(|c| c.encoding().as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Codec> {
        self.codecs.iter()
    }
}

/// Builder for a [`Codecs`] registry.
pub struct CodecsBuilder(Config);

impl Default for CodecsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CodecsBuilder {
    /// Creates a new builder with default configuration.
    pub fn new() -> Self {
        Self(Config::default())
    }

    pub fn from_config(config: Config) -> Self {
        Self(config)
    }

    fn enable(mut self, encoding: Encoding, yes: bool) -> Self {
        if yes && !self.0.enabled.contains(&encoding) {
            self.0.enabled.push(encoding)
        }
        if !yes {
            self.0.enabled.retain(|e| *e != encoding)
        }
        self
    }

    /// Enables or disables gzip.
    pub fn enable_gzip(self, yes: bool) -> Self {
        self.enable(Encoding::Gzip, yes)
    }

    /// Enables or disables deflate.
    pub fn enable_deflate(self, yes: bool) -> Self {
        self.enable(Encoding::Deflate, yes)
    }

    /// Enables or disables LZW ("compress").
    pub fn enable_lzw(self, yes: bool) -> Self {
        self.enable(Encoding::Compress, yes)
    }

    /// Enables or disables Brotli.
    pub fn enable_brotli(self, yes: bool) -> Self {
        self.enable(Encoding::Brotli, yes)
    }

    /// Enables or disables zstd.
    #[cfg(feature = "zstd")]
    pub fn enable_zstd(self, yes: bool) -> Self {
        self.enable(Encoding::Zstd, yes)
    }

    pub fn gzip_level(mut self, lvl: u32) -> Self {
        self.0.gzip_level = lvl;
        self
    }

    pub fn deflate_level(mut self, lvl: u32) -> Self {
        self.0.deflate_level = lvl;
        self
    }

    /// Sets the preset dictionary for deflate. Readers need the same bytes.
    pub fn deflate_dictionary(mut self, dictionary: impl Into<Vec<u8>>) -> Self {
        self.0.deflate_dictionary = Some(dictionary.into());
        self
    }

    pub fn brotli(mut self, options: BrotliOptions) -> Self {
        self.0.brotli = options;
        self
    }

    /// Sets the Brotli quality, keeping the other Brotli options.
    pub fn brotli_level(mut self, lvl: u32) -> Self {
        self.0.brotli.quality = lvl;
        self
    }

    #[cfg(feature = "zstd")]
    pub fn zstd_level(mut self, lvl: i32) -> Self {
        self.0.zstd_level = lvl;
        self
    }

    pub fn lzw(mut self, order: BitOrder, width: u8) -> Self {
        self.0.lzw = LzwOptions { order, width };
        self
    }

    /// Sets the capacity of the wrappers' pooled scratch buffers.
    pub fn buffer_size(mut self, bytes: usize) -> Self {
        self.0.buffer_size = bytes;
        self
    }

    /// Sets how many idle items each pool keeps.
    pub fn max_idle(mut self, items: usize) -> Self {
        self.0.max_idle = items;
        self
    }

    /// Validates the configuration and builds the registry.
    pub fn build(self) -> Result<Codecs> {
        Codecs::from_config(self.0)
    }
}
