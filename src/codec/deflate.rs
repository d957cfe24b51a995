//! Raw DEFLATE (RFC 1951) adapter with an optional preset dictionary.
//!
//! A dictionary changes what the decoder must know, so an adapter configured
//! with one owns a private decoder pool scoped to that dictionary. Without a
//! dictionary the decoders are shared with every other dictionary-less deflate
//! adapter of the same registry.

use std::{
    io::{self, Read, Write},
    sync::Arc,
};

use bytes::Bytes;
use flate2::{Compress, Compression, Decompress, FlushCompress};

use super::{
    DecoderPool, Engines, PoolStats, Pools, check_level, seeded_decoder_pool,
    flate::{compress_into, decompress_step},
};
use crate::{
    Compressor,
    decoder::Decoder,
    encoder::Encoder,
    engine::{Decode, Encode, Progress},
    error::{Error, Result},
    pool::Pool,
};

pub const NAME: &str = "deflate";

#[derive(Clone, Debug)]
pub struct Deflate {
    level: u32,
    dictionary: Option<Bytes>,
    engines: Engines,
}

impl Deflate {
    /// Creates a standalone deflate adapter with its own pools.
    ///
    /// `level` must be within `0..=9`. Streams written with a dictionary can
    /// only be read by an adapter holding the same dictionary.
    pub fn new(level: u32, dictionary: Option<Bytes>) -> Result<Self> {
        Self::with_pools(level, dictionary, &Pools::default())
    }

    pub(crate) fn with_pools(level: u32, dictionary: Option<Bytes>, pools: &Pools) -> Result<Self> {
        check_level(NAME, level, 9)?;
        let dictionary = dictionary.filter(|dict| !dict.is_empty());
        if let Some(dict) = &dictionary {
            DeflateEncoder::new(level, Some(dict.clone()))
                .map_err(|err| Error::config(NAME, format!("unusable dictionary: {err}")))?;
        }

        let encoder_dict = dictionary.clone();
        let encoders = Pool::new("deflate encoders", pools.max_idle(), move || {
            Ok(Box::new(DeflateEncoder::new(level, encoder_dict.clone())?) as Box<dyn Encode>)
        });
        let decoders = match &dictionary {
            Some(dict) => Arc::new(decoder_pool(Some(dict.clone()), pools.max_idle())),
            None => pools.deflate_decoders(),
        };

        Ok(Self {
            level,
            dictionary,
            engines: Engines::new(NAME, Arc::new(encoders), decoders, pools.buffers()),
        })
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn dictionary(&self) -> Option<&Bytes> {
        self.dictionary.as_ref()
    }

    pub fn pool_stats(&self) -> PoolStats {
        self.engines.stats()
    }

    pub(crate) fn engines(&self) -> &Engines {
        &self.engines
    }
}

impl Compressor for Deflate {
    fn name(&self) -> &'static str {
        NAME
    }

    fn new_encoder<W: Write>(&self, sink: W) -> Result<Encoder<W>> {
        self.engines.encoder(sink)
    }

    fn new_decoder<R: Read>(&self, source: R) -> Result<Decoder<R>> {
        self.engines.decoder(source)
    }
}

pub(crate) fn decoder_pool(dictionary: Option<Bytes>, max_idle: usize) -> DecoderPool {
    let seed_dict = dictionary.clone();
    seeded_decoder_pool(
        "deflate decoders",
        max_idle,
        move || {
            let level = Compression::default().level();
            Ok(Box::new(DeflateEncoder::new(level, seed_dict.clone())?) as Box<dyn Encode>)
        },
        move || Ok(Box::new(DeflateDecoder::new(dictionary.clone())?) as Box<dyn Decode>),
    )
}

struct DeflateEncoder {
    compress: Compress,
    dictionary: Option<Bytes>,
}

impl DeflateEncoder {
    fn new(level: u32, dictionary: Option<Bytes>) -> io::Result<Self> {
        let mut engine = Self {
            compress: Compress::new(Compression::new(level), false),
            dictionary,
        };
        engine.apply_dictionary()?;
        Ok(engine)
    }

    fn apply_dictionary(&mut self) -> io::Result<()> {
        if let Some(dict) = &self.dictionary {
            self.compress
                .set_dictionary(dict)
                .map_err(io::Error::other)?;
        }
        Ok(())
    }
}

impl Encode for DeflateEncoder {
    fn encode(&mut self, input: &[u8], out: &mut Vec<u8>) -> io::Result<()> {
        compress_into(&mut self.compress, input, out, FlushCompress::None)
    }

    fn flush(&mut self, out: &mut Vec<u8>) -> io::Result<()> {
        compress_into(&mut self.compress, &[], out, FlushCompress::Sync)
    }

    fn finish(&mut self, out: &mut Vec<u8>) -> io::Result<()> {
        compress_into(&mut self.compress, &[], out, FlushCompress::Finish)
    }

    fn reset(&mut self) -> io::Result<()> {
        self.compress.reset();
        self.apply_dictionary()
    }
}

struct DeflateDecoder {
    decompress: Decompress,
    dictionary: Option<Bytes>,
    done: bool,
}

impl DeflateDecoder {
    fn new(dictionary: Option<Bytes>) -> io::Result<Self> {
        let mut engine = Self {
            decompress: Decompress::new(false),
            dictionary,
            done: false,
        };
        engine.apply_dictionary()?;
        Ok(engine)
    }

    fn apply_dictionary(&mut self) -> io::Result<()> {
        if let Some(dict) = &self.dictionary {
            self.decompress
                .set_dictionary(dict)
                .map_err(io::Error::other)?;
        }
        Ok(())
    }
}

impl Decode for DeflateDecoder {
    fn decode(&mut self, input: &[u8], output: &mut [u8], _eof: bool) -> io::Result<Progress> {
        if self.done {
            return Ok(Progress {
                done: true,
                ..Progress::default()
            });
        }
        let (consumed, produced, end) = decompress_step(&mut self.decompress, input, output)?;
        self.done = end;
        Ok(Progress {
            consumed,
            produced,
            done: end,
        })
    }

    fn reset(&mut self) -> io::Result<()> {
        self.decompress.reset(false);
        self.done = false;
        self.apply_dictionary()
    }
}
