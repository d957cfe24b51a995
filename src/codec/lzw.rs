//! LZW adapter ("compress" content coding), backed by `weezl`.
//!
//! Bit order and literal width are part of the stream format but are not
//! recorded in it. An adapter fixes both, and a stream written by one
//! `(order, width)` pair is generally unreadable by another. Every [`Lzw`]
//! owns private pools for both directions.

use std::{
    io::{self, Read, Write},
    sync::Arc,
};

use serde::Deserialize;
use weezl::{LzwStatus, decode::Decoder as WeezlDecoder, encode::Encoder as WeezlEncoder};

use super::{DecoderPool, Engines, PoolStats, Pools, seeded_decoder_pool};
use crate::{
    Compressor,
    decoder::Decoder,
    encoder::Encoder,
    engine::{Decode, Encode, Progress},
    error::{Error, Result, invalid_data},
    pool::Pool,
};

pub const NAME: &str = "compress";

const CHUNK: usize = 4 * 1024;

/// Packing order of codes within bytes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BitOrder {
    /// Least significant bit first, as in GIF.
    #[default]
    Lsb,
    /// Most significant bit first, as in TIFF and PDF.
    Msb,
}

impl From<BitOrder> for weezl::BitOrder {
    fn from(order: BitOrder) -> Self {
        match order {
            BitOrder::Lsb => weezl::BitOrder::Lsb,
            BitOrder::Msb => weezl::BitOrder::Msb,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Lzw {
    order: BitOrder,
    width: u8,
    engines: Engines,
}

impl Lzw {
    /// Creates a standalone LZW adapter.
    ///
    /// `width` is the literal code width in bits and must be within `2..=8`.
    pub fn new(order: BitOrder, width: u8) -> Result<Self> {
        Self::with_pools(order, width, &Pools::default())
    }

    pub(crate) fn with_pools(order: BitOrder, width: u8, pools: &Pools) -> Result<Self> {
        if !(2..=8).contains(&width) {
            return Err(Error::config(
                NAME,
                format!("literal width {width} is out of range 2..=8"),
            ));
        }

        let encoders = Pool::new("lzw encoders", pools.max_idle(), move || {
            Ok(Box::new(LzwEncoder::new(order, width)) as Box<dyn Encode>)
        });

        Ok(Self {
            order,
            width,
            engines: Engines::new(
                NAME,
                Arc::new(encoders),
                Arc::new(decoder_pool(order, width, pools.max_idle())),
                pools.buffers(),
            ),
        })
    }

    pub fn order(&self) -> BitOrder {
        self.order
    }

    pub fn width(&self) -> u8 {
        self.width
    }

    pub fn pool_stats(&self) -> PoolStats {
        self.engines.stats()
    }

    pub(crate) fn engines(&self) -> &Engines {
        &self.engines
    }
}

impl Compressor for Lzw {
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

fn decoder_pool(order: BitOrder, width: u8, max_idle: usize) -> DecoderPool {
    seeded_decoder_pool(
        "lzw decoders",
        max_idle,
        move || Ok(Box::new(LzwEncoder::new(order, width)) as Box<dyn Encode>),
        move || Ok(Box::new(LzwDecoder::new(order, width)) as Box<dyn Decode>),
    )
}

fn lzw_error(err: weezl::LzwError) -> io::Error {
    invalid_data(format!("corrupt lzw stream: {err}"))
}

struct LzwEncoder {
    encoder: WeezlEncoder,
    width: u8,
}

impl LzwEncoder {
    fn new(order: BitOrder, width: u8) -> Self {
        Self {
            encoder: WeezlEncoder::new(order.into(), width),
            width,
        }
    }

    /// Runs one encode call into the spare tail of `out`.
    fn step(&mut self, input: &[u8], out: &mut Vec<u8>) -> io::Result<(usize, usize, LzwStatus)> {
        let start = out.len();
        out.resize(start + CHUNK, 0);
        let res = self.encoder.encode_bytes(input, &mut out[start..]);
        out.truncate(start + res.consumed_out);
        let status = res.status.map_err(lzw_error)?;
        Ok((res.consumed_in, res.consumed_out, status))
    }
}

impl Encode for LzwEncoder {
    fn encode(&mut self, mut input: &[u8], out: &mut Vec<u8>) -> io::Result<()> {
        if self.width < 8 {
            if let Some(byte) = input.iter().find(|&&b| b >> self.width != 0) {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("byte {byte:#04x} does not fit in {} bits", self.width),
                ));
            }
        }

        while !input.is_empty() {
            let (consumed, produced, _) = self.step(input, out)?;
            if consumed == 0 && produced == 0 {
                return Err(io::Error::other("lzw encoder made no progress"));
            }
            input = &input[consumed..];
        }
        Ok(())
    }

    /// LZW has no partial flush; pending bits go out with the end code.
    fn flush(&mut self, _out: &mut Vec<u8>) -> io::Result<()> {
        Ok(())
    }

    fn finish(&mut self, out: &mut Vec<u8>) -> io::Result<()> {
        self.encoder.finish();
        loop {
            let (_, produced, status) = self.step(&[], out)?;
            if matches!(status, LzwStatus::Done) {
                return Ok(());
            }
            if produced == 0 {
                return Err(io::Error::other("lzw encoder did not terminate"));
            }
        }
    }

    fn reset(&mut self) -> io::Result<()> {
        self.encoder.reset();
        Ok(())
    }
}

struct LzwDecoder {
    decoder: WeezlDecoder,
}

impl LzwDecoder {
    fn new(order: BitOrder, width: u8) -> Self {
        Self {
            decoder: WeezlDecoder::new(order.into(), width),
        }
    }
}

impl Decode for LzwDecoder {
    fn decode(&mut self, input: &[u8], output: &mut [u8], _eof: bool) -> io::Result<Progress> {
        if self.decoder.has_ended() {
            return Ok(Progress {
                done: true,
                ..Progress::default()
            });
        }
        let res = self.decoder.decode_bytes(input, output);
        let status = res.status.map_err(lzw_error)?;
        Ok(Progress {
            consumed: res.consumed_in,
            produced: res.consumed_out,
            done: matches!(status, LzwStatus::Done),
        })
    }

    fn reset(&mut self) -> io::Result<()> {
        self.decoder.reset();
        Ok(())
    }
}
