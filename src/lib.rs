//! Pooled multi-codec compression for Tako.
//!
//! Gzip, deflate, LZW, Brotli and zstd behind one [`Compressor`] contract, with
//! codec engines recycled through pools instead of rebuilt per request.

pub mod codec;
pub mod config;
pub mod decoder;
pub mod encoder;
pub mod engine;
pub mod error;
pub mod pool;
pub mod stream;
pub mod types;

mod compressor;
mod registry;
mod seed;

pub use codec::{Brotli, Deflate, Gzip, Lzw, PoolStats};
#[cfg(feature = "zstd")]
pub use codec::Zstd;
pub use compressor::{Codec, Compressor, Encoding};
pub use config::Config;
pub use decoder::Decoder;
pub use encoder::Encoder;
pub use error::{Error, Result};
pub use registry::{Codecs, CodecsBuilder};
