//! Gzip (RFC 1952) adapter.
//!
//! Both engines are `flate2`'s gzip writers over an owned output buffer, which
//! is drained after every step. Header, checksum and length trailer are
//! handled by `flate2`; a decoder only sniffs the leading magic bytes itself so
//! that foreign input is rejected before the first read. The writers have no
//! reset, so a pooled gzip engine is rebuilt around the buffer it already owns.
//!
//! # Examples
//!
//! ```rust
//! use std::io::{Read, Write};
//! use tako_compress::{Compressor, codec::Gzip};
//!
//! let fast = Gzip::new(3)?;
//! let mut encoder = fast.new_encoder(Vec::new())?;
//! encoder.write_all(b"123")?;
//! let body = encoder.finish()?;
//!
//! // Any level reads any other level's output.
//! let mut decoder = Gzip::new(5)?.new_decoder(body.as_slice())?;
//! let mut text = String::new();
//! decoder.read_to_string(&mut text)?;
//! assert_eq!(text, "123");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::{
    io::{self, Read, Write},
    sync::Arc,
};

use flate2::{
    Compression,
    write::{GzDecoder, GzEncoder},
};

use super::{DecoderPool, Engines, PoolStats, Pools, check_level, seeded_decoder_pool};
use crate::{
    Compressor,
    decoder::Decoder,
    encoder::Encoder,
    engine::{Decode, Encode, Progress},
    error::{Result, closed, invalid_data},
    pool::Pool,
};

pub const NAME: &str = "gzip";

/// ID1, ID2 and the DEFLATE method byte every gzip member starts with.
const MAGIC: [u8; 3] = [0x1f, 0x8b, 8];

/// Largest compressed slice fed to the decoder per step.
const INPUT_STEP: usize = 512;

/// Gzip compressor. The level applies to encoding only; decoding is level
/// agnostic.
#[derive(Clone, Debug)]
pub struct Gzip {
    level: u32,
    engines: Engines,
}

impl Gzip {
    /// Creates a standalone gzip adapter with its own pools.
    ///
    /// `level` must be within `0..=9`.
    pub fn new(level: u32) -> Result<Self> {
        Self::with_pools(level, &Pools::default())
    }

    pub(crate) fn with_pools(level: u32, pools: &Pools) -> Result<Self> {
        check_level(NAME, level, 9)?;
        let encoders = Pool::new("gzip encoders", pools.max_idle(), move || {
            Ok(Box::new(GzipEncoder::new(level)) as Box<dyn Encode>)
        });

        Ok(Self {
            level,
            engines: Engines::new(
                NAME,
                Arc::new(encoders),
                pools.gzip_decoders(),
                pools.buffers(),
            ),
        })
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn pool_stats(&self) -> PoolStats {
        self.engines.stats()
    }

    pub(crate) fn engines(&self) -> &Engines {
        &self.engines
    }
}

impl Compressor for Gzip {
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
        "gzip decoders",
        max_idle,
        || Ok(Box::new(GzipEncoder::new(Compression::default().level())) as Box<dyn Encode>),
        || Ok(Box::new(GzipDecoder::new()) as Box<dyn Decode>),
    )
}

struct GzipEncoder {
    level: Compression,
    writer: Option<GzEncoder<Vec<u8>>>,
    spare: Vec<u8>,
}

impl GzipEncoder {
    fn new(level: u32) -> Self {
        let level = Compression::new(level);
        Self {
            level,
            writer: Some(GzEncoder::new(Vec::new(), level)),
            spare: Vec::new(),
        }
    }

    fn writer(&mut self) -> io::Result<&mut GzEncoder<Vec<u8>>> {
        self.writer.as_mut().ok_or_else(closed)
    }
}

impl Encode for GzipEncoder {
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
        let mut tail = writer.finish()?;
        out.append(&mut tail);
        self.spare = tail;
        Ok(())
    }

    fn reset(&mut self) -> io::Result<()> {
        if let Some(writer) = self.writer.take() {
            self.spare = writer.finish()?;
        }
        let mut sink = std::mem::take(&mut self.spare);
        sink.clear();
        self.writer = Some(GzEncoder::new(sink, self.level));
        Ok(())
    }
}

struct GzipDecoder {
    writer: Option<GzDecoder<Vec<u8>>>,
    pending: Vec<u8>,
    pos: usize,
    finished: bool,
}

impl GzipDecoder {
    fn new() -> Self {
        Self {
            writer: Some(GzDecoder::new(Vec::new())),
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

fn corrupt(err: io::Error) -> io::Error {
    invalid_data(format!("corrupt gzip stream: {err}"))
}

impl Decode for GzipDecoder {
    fn check_header(&self, head: &[u8], eof: bool) -> io::Result<bool> {
        let n = head.len().min(MAGIC.len());
        if head[..n] != MAGIC[..n] {
            return Err(invalid_data("not a gzip stream"));
        }
        if n == MAGIC.len() {
            return Ok(true);
        }
        if eof {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "gzip stream ended inside its header",
            ));
        }
        Ok(false)
    }

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
            consumed = writer.write(step).map_err(corrupt)?;
            if consumed == 0 {
                // Trailer already read; the rest is not part of this member.
                writer.try_finish().map_err(corrupt)?;
                self.finished = true;
                consumed = input.len();
            }
            std::mem::swap(&mut self.pending, writer.get_mut());
        } else if eof {
            let writer = self.writer.as_mut().ok_or_else(closed)?;
            writer.try_finish().map_err(corrupt)?;
            std::mem::swap(&mut self.pending, writer.get_mut());
            self.finished = true;
        }
        if self.finished {
            self.writer = None;
        }

        let produced = self.drain_into(output);
        Ok(Progress {
            consumed,
            produced,
            done: self.finished && self.pos == self.pending.len(),
        })
    }

    fn reset(&mut self) -> io::Result<()> {
        self.writer = Some(GzDecoder::new(Vec::new()));
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

    fn compress(level: u32, data: &[u8]) -> Vec<u8> {
        let mut engine = GzipEncoder::new(level);
        let mut out = Vec::new();
        engine.encode(data, &mut out).unwrap();
        engine.finish(&mut out).unwrap();
        out
    }

    #[test]
    fn header_check_waits_for_magic() {
        let decoder = GzipDecoder::new();
        assert!(!decoder.check_header(&[], false).unwrap());
        assert!(!decoder.check_header(&[0x1f, 0x8b], false).unwrap());
        assert!(decoder.check_header(&[0x1f, 0x8b, 8], false).unwrap());
        assert_eq!(
            decoder.check_header(&[0x1f, 0x8b], true).unwrap_err().kind(),
            io::ErrorKind::UnexpectedEof
        );
    }

    #[test]
    fn header_check_rejects_foreign_bytes_early() {
        let decoder = GzipDecoder::new();
        for head in [&b"{"[..], &[0x1f, 0x8c], &[0x1f, 0x8b, 7]] {
            assert!(decoder.check_header(head, false).is_err(), "{head:?}");
        }
    }

    #[test]
    fn encoder_emits_standard_framing() {
        let out = compress(9, b"abc");
        assert_eq!(&out[..3], &MAGIC);
        assert_eq!(out[8], 2);
        assert_eq!(&out[out.len() - 4..], &3u32.to_le_bytes());
    }

    #[test]
    fn encoder_reset_starts_a_new_member() {
        let mut engine = GzipEncoder::new(6);
        let mut first = Vec::new();
        engine.encode(b"abandoned", &mut first).unwrap();
        engine.reset().unwrap();
        let mut second = Vec::new();
        engine.encode(b"kept", &mut second).unwrap();
        engine.finish(&mut second).unwrap();

        let mut out = Vec::new();
        assert!(decode_to_vec(&mut GzipDecoder::new(), &second, true, &mut out).unwrap());
        assert_eq!(out, b"kept");
    }

    #[test]
    fn decoder_rejects_corrupted_trailer() {
        let mut stream = compress(6, b"payload");
        let last = stream.len() - 5;
        stream[last] ^= 0x01;

        let mut decoder = GzipDecoder::new();
        let mut out = Vec::new();
        let err = decode_to_vec(&mut decoder, &stream, true, &mut out).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn bytes_after_the_member_are_ignored() {
        let mut stream = compress(6, b"member");
        stream.extend_from_slice(b"trailing garbage");

        let mut decoder = GzipDecoder::new();
        let mut out = Vec::new();
        assert!(decode_to_vec(&mut decoder, &stream, true, &mut out).unwrap());
        assert_eq!(out, b"member");
    }
}
