//! Error types for the compression layer.
//!
//! Three kinds of failure exist: a codec was configured with parameters it
//! cannot honor, a byte source does not carry valid framing for the codec it was
//! handed to, or the caller's sink/source failed underneath us. The first is a
//! setup-time mistake, the other two happen per request and are always returned
//! to the caller, never retried here.

use std::io;

use thiserror::Error;

/// Result alias used by every fallible constructor in this crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Static codec parameters are out of range.
    #[error("invalid {codec} configuration: {reason}")]
    Config { codec: &'static str, reason: String },

    /// The byte source is not a valid stream for the codec.
    #[error("{codec} decode error: {source}")]
    Decode {
        codec: &'static str,
        #[source]
        source: io::Error,
    },

    /// Pass-through failure of the caller's sink or source.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    pub(crate) fn config(codec: &'static str, reason: impl Into<String>) -> Self {
        Error::Config {
            codec,
            reason: reason.into(),
        }
    }

    /// Classifies an engine error raised while attaching a decoder.
    ///
    /// Framing problems become [`Error::Decode`], anything else is reported as
    /// the source's own I/O failure.
    pub(crate) fn from_decode(codec: &'static str, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::InvalidData | io::ErrorKind::UnexpectedEof => {
                Error::Decode { codec, source: err }
            }
            _ => Error::Io(err),
        }
    }

    /// Returns `true` for configuration errors.
    pub fn is_config(&self) -> bool {
        matches!(self, Error::Config { .. })
    }

    /// Returns `true` when the input did not decode.
    pub fn is_decode(&self) -> bool {
        matches!(self, Error::Decode { .. })
    }
}

impl From<Error> for io::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Io(err) => err,
            Error::Decode { source, .. } => source,
            Error::Config { .. } => io::Error::new(io::ErrorKind::InvalidInput, err),
        }
    }
}

pub(crate) fn invalid_data(msg: impl Into<String>) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg.into())
}

pub(crate) fn closed() -> io::Error {
    io::Error::other("stream wrapper already closed")
}
