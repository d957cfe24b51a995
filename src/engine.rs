//! Step-driven codec engines.
//!
//! An engine is the reusable, allocation-heavy half of a codec: the deflate
//! window, the zstd context, the LZW dictionary. Engines never own the caller's
//! stream. The stream wrappers move bytes between the caller and the engine, so
//! attaching an engine to a new stream is nothing more than resetting it.

use std::io;

use crate::{error::invalid_data, pool::Recycle};

const CHUNK: usize = 8 * 1024;

/// Outcome of one [`Decode::decode`] step.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Progress {
    /// Input bytes consumed.
    pub consumed: usize,
    /// Output bytes written to the front of the output slice.
    pub produced: usize,
    /// The compressed stream has ended; no further output will follow.
    pub done: bool,
}

/// Compression half of a codec.
///
/// All methods append to `out` and never shrink it.
pub trait Encode: Send + 'static {
    /// Compresses `input`. Output may be withheld until a flush.
    fn encode(&mut self, input: &[u8], out: &mut Vec<u8>) -> io::Result<()>;

    /// Emits everything written so far in a decodable form, if the format
    /// supports it. Codecs without a partial flush treat this as a no-op.
    fn flush(&mut self, out: &mut Vec<u8>) -> io::Result<()>;

    /// Terminates the stream, emitting trailing framing.
    fn finish(&mut self, out: &mut Vec<u8>) -> io::Result<()>;

    /// Returns the engine to its freshly constructed state.
    fn reset(&mut self) -> io::Result<()>;
}

/// Decompression half of a codec.
pub trait Decode: Send + 'static {
    /// Inspects the leading bytes of a stream without consuming them.
    ///
    /// Returns `Ok(false)` when `head` is too short to judge, `Ok(true)` when it
    /// looks like the start of a valid stream and an `InvalidData` error when it
    /// cannot be one. `eof` reports that `head` is all the input there is.
    fn check_header(&self, head: &[u8], eof: bool) -> io::Result<bool> {
        let _ = (head, eof);
        Ok(true)
    }

    /// Decompresses from `input` into `output`.
    ///
    /// `eof` is set once the source is exhausted; `input` is then the final
    /// remainder (possibly empty). A step that consumes and produces nothing
    /// while `eof` is set means the stream was truncated.
    fn decode(&mut self, input: &[u8], output: &mut [u8], eof: bool) -> io::Result<Progress>;

    /// Returns the engine to its freshly constructed state.
    fn reset(&mut self) -> io::Result<()>;
}

impl Recycle for Box<dyn Encode> {
    fn recycle(&mut self) -> io::Result<()> {
        (**self).reset()
    }
}

impl Recycle for Box<dyn Decode> {
    fn recycle(&mut self) -> io::Result<()> {
        (**self).reset()
    }
}

/// Runs `input` through `engine`, appending all output to `out`.
///
/// Returns whether the stream ended. With `eof` set the stream must end, or
/// an `UnexpectedEof` error is returned.
pub(crate) fn decode_to_vec(
    engine: &mut dyn Decode,
    mut input: &[u8],
    eof: bool,
    out: &mut Vec<u8>,
) -> io::Result<bool> {
    loop {
        let start = out.len();
        out.resize(start + CHUNK, 0);
        let step = engine.decode(input, &mut out[start..], eof);
        let progress = match step {
            Ok(progress) => progress,
            Err(err) => {
                out.truncate(start);
                return Err(err);
            }
        };
        out.truncate(start + progress.produced);
        input = &input[progress.consumed..];

        if progress.done {
            return Ok(true);
        }
        if progress.consumed == 0 && progress.produced == 0 {
            if eof {
                return Err(unexpected_eof());
            }
            if input.is_empty() {
                return Ok(false);
            }
            return Err(invalid_data("decoder stalled on pending input"));
        }
    }
}

pub(crate) fn unexpected_eof() -> io::Error {
    io::Error::new(
        io::ErrorKind::UnexpectedEof,
        "compressed stream ended unexpectedly",
    )
}
