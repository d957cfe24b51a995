//! Read-side stream wrapper.
//!
//! A [`Decoder`] binds one pooled decompression engine and one pooled input
//! buffer to a caller-supplied source. The leading bytes of the source are
//! checked when the decoder is created, so a stream in the wrong format is
//! rejected before the first read.

use std::io::{self, Read};

use crate::{
    engine::{Decode, unexpected_eof},
    error::{Error, Result, closed, invalid_data},
    pool::{Buffer, Lease},
};

const MIN_INPUT: usize = 512;

/// Decompressing reader over a pooled engine.
pub struct Decoder<R: Read> {
    source: R,
    attached: Option<Attached>,
}

struct Attached {
    engine: Lease<Box<dyn Decode>>,
    buf: Lease<Buffer>,
    pos: usize,
    len: usize,
    eof: bool,
    done: bool,
}

impl Attached {
    fn pending(&self) -> &[u8] {
        &self.buf[self.pos..self.len]
    }

    /// Moves unread input to the front and reads more from `source`.
    fn fill<R: Read>(&mut self, source: &mut R) -> io::Result<()> {
        if self.pos > 0 {
            self.buf.copy_within(self.pos..self.len, 0);
            self.len -= self.pos;
            self.pos = 0;
        }
        if self.len == self.buf.len() {
            return Err(invalid_data("decoder input buffer exhausted"));
        }

        loop {
            match source.read(&mut self.buf[self.len..]) {
                Ok(0) => {
                    self.eof = true;
                    return Ok(());
                }
                Ok(n) => {
                    self.len += n;
                    return Ok(());
                }
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err),
            }
        }
    }
}

impl<R: Read> Decoder<R> {
    pub(crate) fn attach(
        codec: &'static str,
        mut source: R,
        engine: Lease<Box<dyn Decode>>,
        mut buf: Lease<Buffer>,
    ) -> Result<Self> {
        let size = buf.size().max(MIN_INPUT);
        buf.clear();
        buf.resize(size, 0);

        let mut attached = Attached {
            engine,
            buf,
            pos: 0,
            len: 0,
            eof: false,
            done: false,
        };

        loop {
            match attached.engine.check_header(attached.pending(), attached.eof) {
                Ok(true) => break,
                Ok(false) if attached.eof => {
                    return Err(Error::Decode {
                        codec,
                        source: unexpected_eof(),
                    });
                }
                Ok(false) => attached.fill(&mut source)?,
                Err(err) => return Err(Error::from_decode(codec, err)),
            }
        }

        Ok(Self {
            source,
            attached: Some(attached),
        })
    }

    /// Releases the engine back to its pool.
    ///
    /// Only the first call has an effect. Reading after close fails.
    pub fn close(&mut self) -> io::Result<()> {
        self.attached = None;
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.attached.is_none()
    }

    pub fn get_ref(&self) -> &R {
        &self.source
    }

    /// Releases the engine and returns the source.
    ///
    /// Input already buffered by the decoder is not given back.
    pub fn into_inner(self) -> R {
        self.source
    }
}

impl<R: Read> Read for Decoder<R> {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        let attached = self.attached.as_mut().ok_or_else(closed)?;
        if out.is_empty() || attached.done {
            return Ok(0);
        }

        loop {
            let progress = {
                let Attached {
                    engine,
                    buf,
                    pos,
                    len,
                    eof,
                    ..
                } = &mut *attached;
                engine.decode(&buf[*pos..*len], out, *eof)?
            };
            attached.pos += progress.consumed;
            attached.done = progress.done;

            if progress.produced > 0 {
                return Ok(progress.produced);
            }
            if progress.done {
                return Ok(0);
            }
            if progress.consumed > 0 {
                continue;
            }
            if attached.eof {
                return Err(unexpected_eof());
            }
            attached.fill(&mut self.source)?;
        }
    }
}

impl<R: Read> std::fmt::Debug for Decoder<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Decoder")
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}
