//! Raw DEFLATE stepping shared by the gzip and deflate adapters.

use std::io;

use flate2::{Compress, Decompress, FlushCompress, FlushDecompress, Status};

use crate::error::invalid_data;

const CHUNK: usize = 8 * 1024;

/// Pushes `input` through `compress`, appending output to `out`.
///
/// With `FlushCompress::None` this returns once all input is consumed; with
/// `Sync` once the flush marker is fully written; with `Finish` once the final
/// block is out.
pub(super) fn compress_into(
    compress: &mut Compress,
    mut input: &[u8],
    out: &mut Vec<u8>,
    flush: FlushCompress,
) -> io::Result<()> {
    loop {
        out.reserve(CHUNK);
        let (before_in, before_out) = (compress.total_in(), compress.total_out());
        let status = compress
            .compress_vec(input, out, flush)
            .map_err(io::Error::other)?;
        let consumed = (compress.total_in() - before_in) as usize;
        let produced = (compress.total_out() - before_out) as usize;
        input = &input[consumed..];

        let complete = match flush {
            FlushCompress::Finish => status == Status::StreamEnd,
            FlushCompress::None => input.is_empty(),
            _ => input.is_empty() && out.len() < out.capacity(),
        };
        if complete {
            return Ok(());
        }
        if consumed == 0 && produced == 0 && out.len() < out.capacity() {
            return Err(io::Error::other("deflate made no progress"));
        }
    }
}

/// One inflate step: `(consumed, produced, stream_end)`.
pub(super) fn decompress_step(
    decompress: &mut Decompress,
    input: &[u8],
    output: &mut [u8],
) -> io::Result<(usize, usize, bool)> {
    let (before_in, before_out) = (decompress.total_in(), decompress.total_out());
    let status = decompress
        .decompress(input, output, FlushDecompress::None)
        .map_err(|err| invalid_data(format!("corrupt deflate stream: {err}")))?;
    let consumed = (decompress.total_in() - before_in) as usize;
    let produced = (decompress.total_out() - before_out) as usize;
    Ok((consumed, produced, status == Status::StreamEnd))
}
