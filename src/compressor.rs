//! The uniform codec contract and runtime selection by name.

use std::{
    fmt,
    io::{Read, Write},
    str::FromStr,
};

use serde::Deserialize;

#[cfg(feature = "zstd")]
use crate::codec::Zstd;
use crate::{
    codec::{Brotli, Deflate, Engines, Gzip, Lzw, PoolStats},
    decoder::Decoder,
    encoder::Encoder,
    error::{Error, Result},
};

/// One compression algorithm with fixed parameters.
///
/// Implementations are immutable after construction and safe to share across
/// threads. Every encoder or decoder they hand out borrows a pooled engine
/// for the lifetime of the wrapper.
pub trait Compressor: Send + Sync {
    /// Stable content-coding token, e.g. `"gzip"` or `"br"`.
    fn name(&self) -> &'static str;

    /// Returns a compressing writer bound to `sink`.
    ///
    /// Never waits for a pooled engine; a new one is built when none is idle.
    fn new_encoder<W: Write>(&self, sink: W) -> Result<Encoder<W>>;

    /// Returns a decompressing reader bound to `source`.
    ///
    /// The leading bytes of `source` are checked before this returns, so a
    /// source in the wrong format fails with [`Error::Decode`].
    fn new_decoder<R: Read>(&self, source: R) -> Result<Decoder<R>>;
}

/// Supported content codings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    #[serde(alias = "x-gzip")]
    Gzip,
    Deflate,
    #[serde(alias = "x-compress")]
    Compress,
    #[serde(rename = "br")]
    Brotli,
    #[cfg(feature = "zstd")]
    Zstd,
}

impl Encoding {
    /// Every coding compiled into this build.
    pub const ALL: &'static [Encoding] = &[
        Encoding::Gzip,
        Encoding::Deflate,
        Encoding::Compress,
        Encoding::Brotli,
        #[cfg(feature = "zstd")]
        Encoding::Zstd,
    ];

    /// Returns the string representation of the encoding.
    pub fn as_str(&self) -> &'static str {
        match self {
            Encoding::Gzip => "gzip",
            Encoding::Deflate => "deflate",
            Encoding::Compress => "compress",
            Encoding::Brotli => "br",
            #[cfg(feature = "zstd")]
            Encoding::Zstd => "zstd",
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Encoding {
    type Err = Error;

    /// Parses a content-coding token. Matching is case-insensitive and accepts
    /// the legacy `x-gzip` and `x-compress` spellings.
    fn from_str(token: &str) -> Result<Self> {
        let token = token.trim();
        let encoding = match token.to_ascii_lowercase().as_str() {
            "gzip" | "x-gzip" => Encoding::Gzip,
            "deflate" => Encoding::Deflate,
            "compress" | "x-compress" => Encoding::Compress,
            "br" => Encoding::Brotli,
            #[cfg(feature = "zstd")]
            "zstd" => Encoding::Zstd,
            _ => {
                return Err(Error::config(
                    "encoding",
                    format!("unsupported content coding {token:?}"),
                ));
            }
        };
        Ok(encoding)
    }
}

/// Any adapter, selected at runtime.
#[derive(Clone, Debug)]
pub enum Codec {
    Gzip(Gzip),
    Deflate(Deflate),
    Lzw(Lzw),
    Brotli(Brotli),
    #[cfg(feature = "zstd")]
    Zstd(Zstd),
}

impl Codec {
    pub fn encoding(&self) -> Encoding {
        match self {
            Codec::Gzip(_) => Encoding::Gzip,
            Codec::Deflate(_) => Encoding::Deflate,
            Codec::Lzw(_) => Encoding::Compress,
            Codec::Brotli(_) => Encoding::Brotli,
            #[cfg(feature = "zstd")]
            Codec::Zstd(_) => Encoding::Zstd,
        }
    }

    /// Idle engine counts of this codec's pools.
    pub fn pool_stats(&self) -> PoolStats {
        self.engines().stats()
    }

    pub(crate) fn engines(&self) -> &Engines {
        match self {
            Codec::Gzip(c) => c.engines(),
            Codec::Deflate(c) => c.engines(),
            Codec::Lzw(c) => c.engines(),
            Codec::Brotli(c) => c.engines(),
            #[cfg(feature = "zstd")]
            Codec::Zstd(c) => c.engines(),
        }
    }
}

impl Compressor for Codec {
    fn name(&self) -> &'static str {
        self.encoding().as_str()
    }

    fn new_encoder<W: Write>(&self, sink: W) -> Result<Encoder<W>> {
        self.engines().encoder(sink)
    }

    fn new_decoder<R: Read>(&self, source: R) -> Result<Decoder<R>> {
        self.engines().decoder(source)
    }
}

impl From<Gzip> for Codec {
    fn from(c: Gzip) -> Self {
        Codec::Gzip(c)
    }
}

impl From<Deflate> for Codec {
    fn from(c: Deflate) -> Self {
        Codec::Deflate(c)
    }
}

impl From<Lzw> for Codec {
    fn from(c: Lzw) -> Self {
        Codec::Lzw(c)
    }
}

impl From<Brotli> for Codec {
    fn from(c: Brotli) -> Self {
        Codec::Brotli(c)
    }
}

#[cfg(feature = "zstd")]
impl From<Zstd> for Codec {
    fn from(c: Zstd) -> Self {
        Codec::Zstd(c)
    }
}
