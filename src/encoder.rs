//! Write-side stream wrapper.
//!
//! An [`Encoder`] binds one pooled compression engine and one pooled scratch
//! buffer to a caller-supplied sink. Bytes written to it are compressed and
//! forwarded to the sink; [`Encoder::close`] emits the trailing framing and
//! returns the engine to its pool.
//!
//! # Examples
//!
//! ```rust
//! use std::io::Write;
//! use tako_compress::{Compressor, codec::Gzip};
//!
//! let gzip = Gzip::new(6)?;
//! let mut encoder = gzip.new_encoder(Vec::new())?;
//! encoder.write_all(b"hello, tako")?;
//! let compressed = encoder.finish()?;
//! assert!(!compressed.is_empty());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::io::{self, Write};

use crate::{
    engine::Encode,
    error::closed,
    pool::{Buffer, Lease},
};

/// Compressing writer over a pooled engine.
pub struct Encoder<W: Write> {
    sink: W,
    attached: Option<Attached>,
}

struct Attached {
    engine: Lease<Box<dyn Encode>>,
    buf: Lease<Buffer>,
}

impl<W: Write> Encoder<W> {
    pub(crate) fn attach(
        sink: W,
        engine: Lease<Box<dyn Encode>>,
        mut buf: Lease<Buffer>,
    ) -> Self {
        buf.clear();
        Self {
            sink,
            attached: Some(Attached { engine, buf }),
        }
    }

    /// Finalizes the stream and releases the engine.
    ///
    /// Writes the codec's trailing framing to the sink and flushes it. Only the
    /// first call has an effect; later calls return `Ok(())`. The engine goes
    /// back to its pool even when finalizing fails.
    pub fn close(&mut self) -> io::Result<()> {
        let Some(mut attached) = self.attached.take() else {
            return Ok(());
        };

        let Attached { engine, buf } = &mut attached;
        engine.finish(buf)?;
        self.sink.write_all(&buf[..])?;
        self.sink.flush()
    }

    /// Closes the encoder and hands back the sink.
    pub fn finish(mut self) -> io::Result<W> {
        self.close()?;
        Ok(self.sink)
    }

    /// Returns `true` once [`close`](Self::close) has run.
    pub fn is_closed(&self) -> bool {
        self.attached.is_none()
    }

    pub fn get_ref(&self) -> &W {
        &self.sink
    }

    /// Mutable access to the sink. Writing to it directly interleaves with the
    /// compressed stream.
    pub fn get_mut(&mut self) -> &mut W {
        &mut self.sink
    }

    /// Drops the engine without finalizing and returns the sink.
    pub fn into_inner(self) -> W {
        self.sink
    }

    fn drain(sink: &mut W, buf: &mut Vec<u8>) -> io::Result<()> {
        if buf.is_empty() {
            return Ok(());
        }
        let res = sink.write_all(&buf[..]);
        buf.clear();
        res
    }
}

impl<W: Write> Write for Encoder<W> {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let attached = self.attached.as_mut().ok_or_else(closed)?;
        // One buffer's worth per step keeps the scratch buffer near its size.
        let step = attached.buf.size().max(1);
        for part in data.chunks(step) {
            attached.engine.encode(part, &mut attached.buf)?;
            Self::drain(&mut self.sink, &mut attached.buf)?;
        }
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        let attached = self.attached.as_mut().ok_or_else(closed)?;
        attached.engine.flush(&mut attached.buf)?;
        Self::drain(&mut self.sink, &mut attached.buf)?;
        self.sink.flush()
    }
}

impl<W: Write> std::fmt::Debug for Encoder<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Encoder")
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}
