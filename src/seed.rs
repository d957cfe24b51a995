//! Seed payloads: each codec's compression of the empty input.
//!
//! A seed is generated lazily, once per pool, the first time that pool has to
//! build a decoder. Every new decoder decodes its seed before it is handed out,
//! which proves its parameters can read what the matching encoder writes and
//! leaves it fully initialized and detached.

use std::{fmt, io};

use once_cell::sync::OnceCell;

use crate::{
    engine::{Decode, Encode, decode_to_vec},
    error::invalid_data,
};

type MakeEncoder = Box<dyn Fn() -> io::Result<Box<dyn Encode>> + Send + Sync>;

pub(crate) struct Seed {
    codec: &'static str,
    payload: OnceCell<Vec<u8>>,
    make: MakeEncoder,
}

impl Seed {
    pub(crate) fn new<F>(codec: &'static str, make: F) -> Self
    where
        F: Fn() -> io::Result<Box<dyn Encode>> + Send + Sync + 'static,
    {
        Self {
            codec,
            payload: OnceCell::new(),
            make: Box::new(make),
        }
    }

    /// Returns the seed, generating it on first use.
    pub(crate) fn payload(&self) -> io::Result<&[u8]> {
        self.payload
            .get_or_try_init(|| {
                let mut engine = (self.make)()?;
                let payload = compress_empty(engine.as_mut())?;
                tracing::debug!(codec = self.codec, len = payload.len(), "generated seed payload");
                Ok(payload)
            })
            .map(Vec::as_slice)
    }

    /// Decodes the seed with `engine`, then resets it.
    pub(crate) fn prime(&self, engine: &mut dyn Decode) -> io::Result<()> {
        let payload = self.payload()?;
        if !engine.check_header(payload, true)? {
            return Err(invalid_data(format!("{} seed payload is incomplete", self.codec)));
        }

        let mut out = Vec::new();
        decode_to_vec(engine, payload, true, &mut out)?;
        if !out.is_empty() {
            return Err(invalid_data(format!(
                "{} seed payload decoded to {} bytes",
                self.codec,
                out.len()
            )));
        }
        engine.reset()
    }
}

impl fmt::Debug for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Seed")
            .field("codec", &self.codec)
            .field("generated", &self.payload.get().is_some())
            .finish()
    }
}

/// `codec(empty input)` for the given engine.
pub(crate) fn compress_empty(engine: &mut dyn Encode) -> io::Result<Vec<u8>> {
    let mut out = Vec::new();
    engine.finish(&mut out)?;
    engine.reset()?;
    Ok(out)
}
