//! Brotli (RFC 7932) adapter.
//!
//! Encoders are scoped by [`BrotliOptions`], so each adapter owns its encoder
//! pool. The decoder is parameter free and reads any quality or window, so
//! decoder pools are shared.
//!
//! The `brotli` crate exposes no in-place reset. A brotli engine resets by
//! rebuilding its codec state around the output buffer it already owns.

use std::{
    io::{self, Read, Write},
    sync::Arc,
};

use brotli::{CompressorWriter, DecompressorWriter};
use serde::Deserialize;

use super::{DecoderPool, Engines, PoolStats, Pools, seeded_decoder_pool};
use crate::{
    Compressor,
    decoder::Decoder,
    encoder::Encoder,
    engine::{Decode, Encode, Progress},
    error::{Error, Result, closed, invalid_data},
    pool::Pool,
};

pub const NAME: &str = "br";

/// Largest compressed slice fed to the decoder per step, bounding how much
/// decompressed output can pile up between reads.
const INPUT_STEP: usize = 1024;

/// Encoder parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BrotliOptions {
    /// Compression quality, `0..=11`.
    pub quality: u32,
    /// Base-2 logarithm of the sliding window, `10..=24`.
    pub window: u32,
    /// Internal buffer size of the codec in bytes.
    pub buffer_size: usize,
}

impl Default for BrotliOptions {
    fn default() -> Self {
        Self {
            quality: 5,
            window: 22,
            buffer_size: 4096,
        }
    }
}

impl BrotliOptions {
    pub fn quality(mut self, quality: u32) -> Self {
        self.quality = quality;
        self
    }

    pub fn window(mut self, window: u32) -> Self {
        self.window = window;
        self
    }

    pub fn buffer_size(mut self, bytes: usize) -> Self {
        self.buffer_size = bytes;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.quality > 11 {
            return Err(Error::config(
                NAME,
                format!("quality {} is out of range 0..=11", self.quality),
            ));
        }
        if !(10..=24).contains(&self.window) {
            return Err(Error::config(
                NAME,
                format!("window {} is out of range 10..=24", self.window),
            ));
        }
        if self.buffer_size == 0 {
            return Err(Error::config(NAME, "buffer size must be positive"));
        }
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct Brotli {
    options: BrotliOptions,
    engines: Engines,
}

impl Brotli {
    /// Creates a standalone brotli adapter with its own pools.
    pub fn new(options: BrotliOptions) -> Result<Self> {
        Self::with_pools(options, &Pools::default())
    }

    pub(crate) fn with_pools(options: BrotliOptions, pools: &Pools) -> Result<Self> {
        options.validate()?;
        let encoders = Pool::new("brotli encoders", pools.max_idle(), move || {
            Ok(Box::new(BrotliEncoder::new(options)) as Box<dyn Encode>)
        });

        Ok(Self {
            options,
            engines: Engines::new(
                NAME,
                Arc::new(encoders),
                pools.brotli_decoders(),
                pools.buffers(),
            ),
        })
    }

    pub fn options(&self) -> BrotliOptions {
        self.options
    }

    pub fn pool_stats(&self) -> PoolStats {
        self.engines.stats()
    }

    pub(crate) fn engines(&self) -> &Engines {
        &self.engines
    }
}

impl Compressor for Brotli {
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
    let decode_buffer = BrotliOptions::default().buffer_size;
    seeded_decoder_pool(
        "brotli decoders",
        max_idle,
        || Ok(Box::new(BrotliEncoder::new(BrotliOptions::default())) as Box<dyn Encode>),
        move || Ok(Box::new(BrotliDecoder::new(decode_buffer)) as Box<dyn Decode>),
    )
}

struct BrotliEncoder {
    options: BrotliOptions,
    writer: Option<CompressorWriter<Vec<u8>>>,
    spare: Vec<u8>,
}

impl BrotliEncoder {
    fn new(options: BrotliOptions) -> Self {
        let mut engine = Self {
            options,
            writer: None,
            spare: Vec::new(),
        };
        engine.rebuild();
        engine
    }

    fn rebuild(&mut self) {
        let sink = std::mem::take(&mut self.spare);
        self.writer = Some(CompressorWriter::new(
            sink,
            self.options.buffer_size,
            self.options.quality,
            self.options.window,
        ));
    }

    fn writer(&mut self) -> io::Result<&mut CompressorWriter<Vec<u8>>> {
        self.writer.as_mut().ok_or_else(closed)
    }
}

impl Encode for BrotliEncoder {
    fn encode(&mut self, input: &[u8], out: &mut Vec<u8>) -> io::Result<()> {
        let writer = self.writer()?;
        writer.write_all(input)?;
        out.append(writer.get_mut());
        Ok(())
    }

    fn flush(&mut self, out: &mut Vec<u8>) -> io::Result<()> {
        let writer = self.writer()?;
        writer.flush()?;
        out.append(writer.get_mut());
        Ok(())
    }

    fn finish(&mut self, out: &mut Vec<u8>) -> io::Result<()> {
        let writer = self.writer.take().ok_or_else(closed)?;
        let mut tail = writer.into_inner();
        out.append(&mut tail);
        self.spare = tail;
        Ok(())
    }

    fn reset(&mut self) -> io::Result<()> {
        if let Some(writer) = self.writer.take() {
            let mut sink = writer.into_inner();
            sink.clear();
            self.spare = sink;
        }
        self.rebuild();
        Ok(())
    }
}

struct BrotliDecoder {
    buffer_size: usize,
    writer: Option<DecompressorWriter<Vec<u8>>>,
    pending: Vec<u8>,
    pos: usize,
    finished: bool,
}

impl BrotliDecoder {
    fn new(buffer_size: usize) -> Self {
        Self {
            buffer_size,
            writer: Some(DecompressorWriter::new(Vec::new(), buffer_size)),
            pending: Vec::new(),
            pos: 0,
            finished: false,
        }
    }

    fn drain_into(&mut self, output: &mut [u8]) -> usize {
        let n = (self.pending.len() - self.pos).min(output.len());
        output[..n].copy_from_slice(&self.pending[self.pos..self.pos + n]);
        self.pos += n;
        n
    }
}

impl Decode for BrotliDecoder {
    fn decode(&mut self, input: &[u8], output: &mut [u8], eof: bool) -> io::Result<Progress> {
        if self.pos < self.pending.len() {
            let produced = self.drain_into(output);
            return Ok(Progress {
                consumed: 0,
                produced,
                done: self.finished && self.pos == self.pending.len(),
            });
        }
        if self.finished {
            return Ok(Progress {
                done: true,
                ..Progress::default()
            });
        }

        self.pending.clear();
        self.pos = 0;
        let mut consumed = 0;

        if !input.is_empty() {
            let writer = self.writer.as_mut().ok_or_else(closed)?;
            let step = &input[..input.len().min(INPUT_STEP)];
            consumed = writer
                .write(step)
                .map_err(|err| invalid_data(format!("corrupt brotli stream: {err}")))?;
            std::mem::swap(&mut self.pending, writer.get_mut());
            if consumed == 0 {
                // The stream is complete; whatever follows it is ignored.
                self.writer = None;
                self.finished = true;
                consumed = input.len();
            }
        } else if eof {
            let writer = self.writer.take().ok_or_else(closed)?;
            self.pending = writer.into_inner().map_err(|_| {
                io::Error::new(io::ErrorKind::UnexpectedEof, "brotli stream is truncated")
            })?;
            self.finished = true;
        }

        let produced = self.drain_into(output);
        Ok(Progress {
            consumed,
            produced,
            done: self.finished && self.pos == self.pending.len(),
        })
    }

    fn reset(&mut self) -> io::Result<()> {
        self.writer = Some(DecompressorWriter::new(Vec::new(), self.buffer_size));
        self.pending.clear();
        self.pos = 0;
        self.finished = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::decode_to_vec;

    fn compress(data: &[u8]) -> Vec<u8> {
        let mut engine = BrotliEncoder::new(BrotliOptions::default());
        let mut out = Vec::new();
        engine.encode(data, &mut out).unwrap();
        engine.finish(&mut out).unwrap();
        out
    }

    #[test]
    fn bytes_after_the_stream_are_ignored() {
        let mut stream = compress(b"brotli payload");
        stream.extend_from_slice(b"trailing garbage");

        let mut decoder = BrotliDecoder::new(4096);
        let mut out = Vec::new();
        assert!(decode_to_vec(&mut decoder, &stream, true, &mut out).unwrap());
        assert_eq!(out, b"brotli payload");
    }

    #[test]
    fn reset_decoder_reads_a_new_stream() {
        let mut decoder = BrotliDecoder::new(4096);
        for text in [&b"first"[..], b"second"] {
            let mut out = Vec::new();
            decode_to_vec(&mut decoder, &compress(text), true, &mut out).unwrap();
            assert_eq!(out, text);
            decoder.reset().unwrap();
        }
    }
}
