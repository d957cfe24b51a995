//! Algorithm adapters.
//!
//! Each adapter owns the engine pools its configuration needs and translates
//! its codec library's construction and reset rules into the uniform
//! [`Compressor`](crate::Compressor) contract. Pools that do not depend on
//! configuration (the gzip, brotli and zstd decoders, the dictionary-less
//! deflate decoder and the wrapper buffers) are shared through [`Pools`] when
//! adapters are built by one [`Codecs`](crate::Codecs) registry.

use std::{
    io::{Read, Write},
    sync::Arc,
};

use once_cell::sync::OnceCell;

use crate::{
    decoder::Decoder,
    encoder::Encoder,
    engine::{Decode, Encode},
    error::{Error, Result},
    pool::{Buffer, Lease, Pool},
    seed::Seed,
};

pub mod brotli;
pub mod deflate;
mod flate;
pub mod gzip;
pub mod lzw;
#[cfg(feature = "zstd")]
pub mod zstd;

pub use brotli::Brotli;
pub use deflate::Deflate;
pub use gzip::Gzip;
pub use lzw::Lzw;
#[cfg(feature = "zstd")]
pub use zstd::Zstd;

pub(crate) type EncoderPool = Pool<Box<dyn Encode>>;
pub(crate) type DecoderPool = Pool<Box<dyn Decode>>;

/// Default size of the wrappers' scratch buffers.
pub const DEFAULT_BUFFER_SIZE: usize = 32 * 1024;
/// Default cap on idle items per pool.
pub const DEFAULT_MAX_IDLE: usize = 64;

/// Pools shared by every adapter built from the same registry.
#[derive(Debug)]
pub(crate) struct Pools {
    max_idle: usize,
    buffers: Arc<Pool<Buffer>>,
    gzip: OnceCell<Arc<DecoderPool>>,
    deflate: OnceCell<Arc<DecoderPool>>,
    brotli: OnceCell<Arc<DecoderPool>>,
    #[cfg(feature = "zstd")]
    zstd: OnceCell<Arc<DecoderPool>>,
}

impl Pools {
    pub(crate) fn new(buffer_size: usize, max_idle: usize) -> Self {
        Self {
            max_idle,
            buffers: Arc::new(Pool::new("buffers", max_idle, move || {
                Ok(Buffer::new(buffer_size))
            })),
            gzip: OnceCell::new(),
            deflate: OnceCell::new(),
            brotli: OnceCell::new(),
            #[cfg(feature = "zstd")]
            zstd: OnceCell::new(),
        }
    }

    pub(crate) fn max_idle(&self) -> usize {
        self.max_idle
    }

    pub(crate) fn buffers(&self) -> Arc<Pool<Buffer>> {
        self.buffers.clone()
    }

    pub(crate) fn gzip_decoders(&self) -> Arc<DecoderPool> {
        self.gzip
            .get_or_init(|| Arc::new(gzip::decoder_pool(self.max_idle)))
            .clone()
    }

    pub(crate) fn deflate_decoders(&self) -> Arc<DecoderPool> {
        self.deflate
            .get_or_init(|| Arc::new(deflate::decoder_pool(None, self.max_idle)))
            .clone()
    }

    pub(crate) fn brotli_decoders(&self) -> Arc<DecoderPool> {
        self.brotli
            .get_or_init(|| Arc::new(brotli::decoder_pool(self.max_idle)))
            .clone()
    }

    #[cfg(feature = "zstd")]
    pub(crate) fn zstd_decoders(&self) -> Arc<DecoderPool> {
        self.zstd
            .get_or_init(|| Arc::new(zstd::decoder_pool(self.max_idle)))
            .clone()
    }
}

impl Default for Pools {
    fn default() -> Self {
        Self::new(DEFAULT_BUFFER_SIZE, DEFAULT_MAX_IDLE)
    }
}

/// The pools one adapter draws from, and the wrapper plumbing around them.
#[derive(Clone, Debug)]
pub(crate) struct Engines {
    codec: &'static str,
    encoders: Arc<EncoderPool>,
    decoders: Arc<DecoderPool>,
    buffers: Arc<Pool<Buffer>>,
}

impl Engines {
    pub(crate) fn new(
        codec: &'static str,
        encoders: Arc<EncoderPool>,
        decoders: Arc<DecoderPool>,
        buffers: Arc<Pool<Buffer>>,
    ) -> Self {
        Self {
            codec,
            encoders,
            decoders,
            buffers,
        }
    }

    pub(crate) fn encoder<W: Write>(&self, sink: W) -> Result<Encoder<W>> {
        let engine = Pool::get(&self.encoders)?;
        let buf = Pool::get(&self.buffers)?;
        Ok(Encoder::attach(sink, engine, buf))
    }

    pub(crate) fn decoder<R: Read>(&self, source: R) -> Result<Decoder<R>> {
        let engine = Pool::get(&self.decoders).map_err(|err| Error::from_decode(self.codec, err))?;
        let buf = Pool::get(&self.buffers)?;
        Decoder::attach(self.codec, source, engine, buf)
    }

    pub(crate) fn decode_engine(&self) -> Result<Lease<Box<dyn Decode>>> {
        Pool::get(&self.decoders).map_err(|err| Error::from_decode(self.codec, err))
    }

    pub(crate) fn stats(&self) -> PoolStats {
        PoolStats {
            idle_encoders: self.encoders.idle(),
            idle_decoders: self.decoders.idle(),
        }
    }
}

/// Idle engine counts of one adapter's pools.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub idle_encoders: usize,
    pub idle_decoders: usize,
}

/// Builds a decoder pool whose engines are primed with the codec's seed.
pub(crate) fn seeded_decoder_pool<E, D>(
    label: &'static str,
    max_idle: usize,
    make_encoder: E,
    make_decoder: D,
) -> DecoderPool
where
    E: Fn() -> std::io::Result<Box<dyn Encode>> + Send + Sync + 'static,
    D: Fn() -> std::io::Result<Box<dyn Decode>> + Send + Sync + 'static,
{
    let seed = Seed::new(label, make_encoder);
    Pool::new(label, max_idle, move || {
        let mut engine = make_decoder()?;
        seed.prime(engine.as_mut())?;
        Ok(engine)
    })
}

pub(crate) fn check_level(codec: &'static str, level: u32, max: u32) -> Result<()> {
    if level > max {
        return Err(Error::config(
            codec,
            format!("level {level} is out of range 0..={max}"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};

    use super::*;
    use crate::Compressor;

    fn noise(len: usize) -> Vec<u8> {
        let mut state = 0x2545_f491_u32;
        (0..len)
            .map(|_| {
                state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
                (state >> 24) as u8
            })
            .collect()
    }

    #[test]
    fn large_writes_leave_buffers_at_their_size() {
        let pools = Pools::new(32 * 1024, 4);
        let gzip = Gzip::with_pools(6, &pools).unwrap();
        let payload = noise(4 << 20);

        let mut encoder = gzip.new_encoder(Vec::new()).unwrap();
        encoder.write_all(&payload).unwrap();
        let compressed = encoder.finish().unwrap();

        let mut out = Vec::new();
        gzip.new_decoder(&compressed[..])
            .unwrap()
            .read_to_end(&mut out)
            .unwrap();
        assert!(out == payload);

        let buffers = pools.buffers();
        assert!(buffers.idle() >= 1);
        let buf = Pool::get(&buffers).unwrap();
        assert!(buf.capacity() <= 32 * 1024, "capacity {}", buf.capacity());
    }
}
