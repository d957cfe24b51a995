//! Zstandard (RFC 8878) adapter.
//!
//! Both directions drive `zstd`'s raw streaming contexts, which reset in place
//! with `reinit`. The decoder pool is shared; encoders are scoped by level.

use std::{
    io::{self, Read, Write},
    sync::Arc,
};

use zstd::stream::raw::{
    Decoder as RawDecoder, Encoder as RawEncoder, InBuffer, Operation, OutBuffer,
};

use super::{DecoderPool, Engines, PoolStats, Pools, seeded_decoder_pool};
use crate::{
    Compressor,
    decoder::Decoder,
    encoder::Encoder,
    engine::{Decode, Encode, Progress},
    error::{Error, Result, invalid_data},
    pool::Pool,
};

pub const NAME: &str = "zstd";

pub const DEFAULT_LEVEL: i32 = 3;

const FRAME_MAGIC: u32 = 0xFD2F_B528;
const SKIPPABLE_MAGIC: u32 = 0x184D_2A50;
const SKIPPABLE_MASK: u32 = 0xFFFF_FFF0;

const CHUNK: usize = 16 * 1024;

#[derive(Clone, Debug)]
pub struct Zstd {
    level: i32,
    engines: Engines,
}

impl Zstd {
    /// Creates a standalone zstd adapter at the default level.
    pub fn new() -> Result<Self> {
        Self::with_level(DEFAULT_LEVEL)
    }

    /// Creates a standalone zstd adapter.
    ///
    /// `level` must be within `zstd::compression_level_range()`.
    pub fn with_level(level: i32) -> Result<Self> {
        Self::with_pools(level, &Pools::default())
    }

    pub(crate) fn with_pools(level: i32, pools: &Pools) -> Result<Self> {
        let range = zstd::compression_level_range();
        if !range.contains(&level) {
            return Err(Error::config(
                NAME,
                format!(
                    "level {level} is out of range {}..={}",
                    range.start(),
                    range.end()
                ),
            ));
        }

        let encoders = Pool::new("zstd encoders", pools.max_idle(), move || {
            Ok(Box::new(ZstdEncoder::new(level)?) as Box<dyn Encode>)
        });

        Ok(Self {
            level,
            engines: Engines::new(
                NAME,
                Arc::new(encoders),
                pools.zstd_decoders(),
                pools.buffers(),
            ),
        })
    }

    pub fn level(&self) -> i32 {
        self.level
    }

    pub fn pool_stats(&self) -> PoolStats {
        self.engines.stats()
    }

    pub(crate) fn engines(&self) -> &Engines {
        &self.engines
    }
}

impl Compressor for Zstd {
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

pub(crate) fn decoder_pool(max_idle: usize) -> DecoderPool {
    seeded_decoder_pool(
        "zstd decoders",
        max_idle,
        || Ok(Box::new(ZstdEncoder::new(DEFAULT_LEVEL)?) as Box<dyn Encode>),
        || Ok(Box::new(ZstdDecoder::new()?) as Box<dyn Decode>),
    )
}

struct ZstdEncoder {
    raw: RawEncoder<'static>,
    scratch: Vec<u8>,
}

impl ZstdEncoder {
    fn new(level: i32) -> io::Result<Self> {
        Ok(Self {
            raw: RawEncoder::new(level)?,
            scratch: vec![0; CHUNK],
        })
    }

    /// Repeats `op` until it reports nothing left to write.
    fn drain<F>(&mut self, out: &mut Vec<u8>, mut op: F) -> io::Result<()>
    where
        F: FnMut(&mut RawEncoder<'static>, &mut OutBuffer<'_, [u8]>) -> io::Result<usize>,
    {
        loop {
            let mut dst = OutBuffer::around(&mut self.scratch[..]);
            let remaining = op(&mut self.raw, &mut dst)?;
            let written = dst.pos();
            out.extend_from_slice(&self.scratch[..written]);
            if remaining == 0 {
                return Ok(());
            }
        }
    }
}

impl Encode for ZstdEncoder {
    fn encode(&mut self, input: &[u8], out: &mut Vec<u8>) -> io::Result<()> {
        let mut src = InBuffer::around(input);
        while src.pos() < input.len() {
            let before = src.pos();
            let mut dst = OutBuffer::around(&mut self.scratch[..]);
            self.raw.run(&mut src, &mut dst)?;
            let written = dst.pos();
            out.extend_from_slice(&self.scratch[..written]);
            if src.pos() == before && written == 0 {
                return Err(io::Error::other("zstd encoder made no progress"));
            }
        }
        Ok(())
    }

    fn flush(&mut self, out: &mut Vec<u8>) -> io::Result<()> {
        self.drain(out, |raw, dst| raw.flush(dst))
    }

    fn finish(&mut self, out: &mut Vec<u8>) -> io::Result<()> {
        self.drain(out, |raw, dst| raw.finish(dst, true))
    }

    fn reset(&mut self) -> io::Result<()> {
        self.raw.reinit()
    }
}

struct ZstdDecoder {
    raw: RawDecoder<'static>,
    /// The last step ended exactly on a frame boundary.
    at_boundary: bool,
}

impl ZstdDecoder {
    fn new() -> io::Result<Self> {
        Ok(Self {
            raw: RawDecoder::new()?,
            at_boundary: false,
        })
    }
}

impl Decode for ZstdDecoder {
    fn check_header(&self, head: &[u8], _eof: bool) -> io::Result<bool> {
        let Some(magic) = head.get(..4) else {
            return Ok(false);
        };
        let magic = u32::from_le_bytes([magic[0], magic[1], magic[2], magic[3]]);
        if magic == FRAME_MAGIC || magic & SKIPPABLE_MASK == SKIPPABLE_MAGIC {
            Ok(true)
        } else {
            Err(invalid_data("not a zstd frame"))
        }
    }

    fn decode(&mut self, input: &[u8], output: &mut [u8], eof: bool) -> io::Result<Progress> {
        if input.is_empty() && self.at_boundary {
            return Ok(Progress {
                done: eof,
                ..Progress::default()
            });
        }

        let mut src = InBuffer::around(input);
        let mut dst = OutBuffer::around(output);
        let hint = self
            .raw
            .run(&mut src, &mut dst)
            .map_err(|err| invalid_data(format!("corrupt zstd stream: {err}")))?;
        let (consumed, produced) = (src.pos(), dst.pos());
        self.at_boundary = hint == 0;

        Ok(Progress {
            consumed,
            produced,
            done: false,
        })
    }

    fn reset(&mut self) -> io::Result<()> {
        self.at_boundary = false;
        self.raw.reinit()
    }
}
