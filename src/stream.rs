//! Async body adapters.
//!
//! [`EncodeStream`] and [`DecodeStream`] push a stream of body chunks through a
//! pooled engine, so a server can compress a response or decompress a request
//! without buffering the whole body. The engine goes back to its pool when the
//! stream is dropped. Picking the codec from request headers is left to the
//! caller.
//!
//! # Examples
//!
//! ```rust,no_run
//! use bytes::{Buf, Bytes};
//! use http_body_util::{BodyExt, Full};
//! use tako_compress::{Codecs, stream::encode_body};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//! let codecs = Codecs::builder().build()?;
//! let gzip = codecs.get("gzip").expect("gzip is enabled");
//!
//! let body = Full::new(Bytes::from("Hello, World!")).map_err(|never| match never {});
//! let compressed = encode_body(gzip, body)?.collect().await?.to_bytes();
//! assert!(!compressed.is_empty());
//! # Ok(())
//! # }
//! ```

use std::{
    mem,
    pin::Pin,
    task::{Context, Poll},
};

use bytes::{Buf, Bytes};
use futures_util::{Stream, TryStreamExt};
use http_body::{Body, Frame};
use http_body_util::{BodyExt, StreamBody};
use pin_project_lite::pin_project;

use crate::{
    Codec, Compressor,
    encoder::Encoder,
    engine::{Decode, unexpected_eof},
    error::{Error, Result, invalid_data},
    pool::Lease,
    types::{BoxBody, BoxError},
};

/// Largest item a [`DecodeStream`] yields, in bytes.
pub const DECODE_CHUNK: usize = 8 * 1024;

/// Compresses an HTTP body with `codec`.
pub fn encode_body<B>(codec: &Codec, body: B) -> Result<BoxBody>
where
    B: Body<Data = Bytes, Error = BoxError> + Send + 'static,
{
    let upstream = body.into_data_stream();
    let encoded = EncodeStream::new(codec, upstream)?.map_ok(Frame::data);
    Ok(StreamBody::new(encoded).boxed_unsync())
}

/// Decompresses an HTTP body with `codec`.
///
/// Malformed input surfaces as a body error carrying [`Error::Decode`].
pub fn decode_body<B>(codec: &Codec, body: B) -> Result<BoxBody>
where
    B: Body<Data = Bytes, Error = BoxError> + Send + 'static,
{
    let upstream = body.into_data_stream();
    let decoded = DecodeStream::new(codec, upstream)?.map_ok(Frame::data);
    Ok(StreamBody::new(decoded).boxed_unsync())
}

pin_project! {
    /// Streaming compressor over an inner stream of chunks.
    ///
    /// Every input chunk is compressed and flushed, so each one can be decoded
    /// by the peer as soon as it arrives. The codec's trailer follows the last
    /// chunk.
    pub struct EncodeStream<S> {
        #[pin] inner: S,
        encoder: Encoder<Vec<u8>>,
        done: bool,
    }
}

impl<S> EncodeStream<S> {
    pub fn new<C: Compressor>(codec: &C, stream: S) -> Result<Self> {
        Ok(Self {
            inner: stream,
            encoder: codec.new_encoder(Vec::new())?,
            done: false,
        })
    }
}

impl<S> Stream for EncodeStream<S>
where
    S: Stream<Item = std::result::Result<Bytes, BoxError>>,
{
    type Item = std::result::Result<Bytes, BoxError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        use std::io::Write;

        let mut this = self.project();

        loop {
            // Hand out whatever the encoder has produced so far.
            if !this.encoder.get_ref().is_empty() {
                let chunk = mem::take(this.encoder.get_mut());
                return Poll::Ready(Some(Ok(Bytes::from(chunk))));
            }
            if *this.done {
                return Poll::Ready(None);
            }
            match this.inner.as_mut().poll_next(cx) {
                Poll::Ready(Some(Ok(chunk))) => {
                    if chunk.is_empty() {
                        continue;
                    }
                    if let Err(e) = this
                        .encoder
                        .write_all(&chunk)
                        .and_then(|_| this.encoder.flush())
                    {
                        return Poll::Ready(Some(Err(e.into())));
                    }
                }
                Poll::Ready(Some(Err(e))) => {
                    return Poll::Ready(Some(Err(e)));
                }
                Poll::Ready(None) => {
                    *this.done = true;
                    if let Err(e) = this.encoder.close() {
                        return Poll::Ready(Some(Err(e.into())));
                    }
                }
                Poll::Pending => {
                    return Poll::Pending;
                }
            }
        }
    }
}

pin_project! {
    /// Streaming decompressor over an inner stream of chunks.
    ///
    /// Input is held back until the codec's header can be judged. After that
    /// the stream yields items of at most [`DECODE_CHUNK`] bytes, keeping the
    /// unread part of an input chunk until the next poll. Bytes after the end
    /// of the compressed stream are ignored.
    pub struct DecodeStream<S> {
        #[pin] inner: S,
        codec: &'static str,
        engine: Lease<Box<dyn Decode>>,
        head: Option<Vec<u8>>,
        input: Bytes,
        out: Vec<u8>,
        eof: bool,
        ended: bool,
        done: bool,
    }
}

impl<S> DecodeStream<S> {
    pub fn new(codec: &Codec, stream: S) -> Result<Self> {
        Ok(Self {
            inner: stream,
            codec: codec.name(),
            engine: codec.engines().decode_engine()?,
            head: Some(Vec::new()),
            input: Bytes::new(),
            out: Vec::new(),
            eof: false,
            ended: false,
            done: false,
        })
    }
}

impl<S> Stream for DecodeStream<S>
where
    S: Stream<Item = std::result::Result<Bytes, BoxError>>,
{
    type Item = std::result::Result<Bytes, BoxError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();
        let codec = *this.codec;
        let fail = |err: std::io::Error| -> BoxError { Error::from_decode(codec, err).into() };

        loop {
            if !this.out.is_empty() {
                let chunk = mem::take(this.out);
                return Poll::Ready(Some(Ok(Bytes::from(chunk))));
            }
            if *this.done {
                return Poll::Ready(None);
            }

            if this.input.is_empty() && !*this.eof {
                match this.inner.as_mut().poll_next(cx) {
                    Poll::Ready(Some(Ok(chunk))) => {
                        if *this.ended {
                            continue;
                        }
                        match this.head.as_mut() {
                            Some(head) => head.extend_from_slice(&chunk),
                            None => *this.input = chunk,
                        }
                    }
                    Poll::Ready(Some(Err(e))) => return Poll::Ready(Some(Err(e))),
                    Poll::Ready(None) => *this.eof = true,
                    Poll::Pending => return Poll::Pending,
                }
            }

            if *this.ended {
                *this.done = *this.eof;
                continue;
            }

            if let Some(head) = this.head.take() {
                match this.engine.check_header(&head, *this.eof) {
                    Ok(true) => *this.input = Bytes::from(head),
                    Ok(false) if *this.eof => {
                        *this.done = true;
                        return Poll::Ready(Some(Err(fail(unexpected_eof()))));
                    }
                    Ok(false) => {
                        *this.head = Some(head);
                        continue;
                    }
                    Err(err) => {
                        *this.done = true;
                        return Poll::Ready(Some(Err(fail(err))));
                    }
                }
            }

            this.out.resize(DECODE_CHUNK, 0);
            let step = this
                .engine
                .decode(&this.input[..], &mut this.out[..], *this.eof);
            let progress = match step {
                Ok(progress) => progress,
                Err(err) => {
                    this.out.clear();
                    *this.done = true;
                    return Poll::Ready(Some(Err(fail(err))));
                }
            };
            this.out.truncate(progress.produced);
            this.input.advance(progress.consumed);

            if progress.done {
                *this.ended = true;
                this.input.clear();
            } else if progress.consumed == 0 && progress.produced == 0 {
                if *this.eof {
                    *this.done = true;
                    return Poll::Ready(Some(Err(fail(unexpected_eof()))));
                }
                if !this.input.is_empty() {
                    *this.done = true;
                    return Poll::Ready(Some(Err(fail(invalid_data(
                        "decoder stalled on pending input",
                    )))));
                }
            }
        }
    }
}
