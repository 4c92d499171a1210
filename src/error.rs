//! Centralized error types for mimetree.

use thiserror::Error;

/// All errors produced by the mimetree library.
#[derive(Error, Debug)]
pub enum MimeError {
    /// I/O error on the underlying stream, with a short context tag.
    #[error("I/O error on {context}: {source}")]
    Io {
        context: String,
        source: std::io::Error,
    },

    /// No header could be parsed where one was required.
    #[error("could not parse a message header")]
    BadHeader,

    /// A multipart content-type carried no usable boundary parameter.
    #[error("multipart content-type is missing a boundary parameter")]
    MissingBoundary,

    /// The preamble ended with a close delimiter: a multipart with no parts.
    #[error("multipart closed before any part was seen")]
    EmptyMultipart,

    /// End of input arrived while a terminator was still expected.
    #[error("unexpected end of input in {section}")]
    UnexpectedEof { section: &'static str },

    /// Multipart nesting exceeded the configured limit.
    #[error("multipart nesting deeper than {max_depth} levels")]
    TooDeep { max_depth: usize },

    /// A codec rejected its input.
    #[error("decoding '{encoding}' content failed: {reason}")]
    DecodeFailed { encoding: String, reason: String },

    /// A uuencoded body ended before any `begin` line.
    #[error("uuencoded data has no 'begin' line")]
    NoBegin,

    /// The operation is not available on this stream adaptor.
    #[error("unsupported stream operation: {0}")]
    Unsupported(&'static str),
}

/// Convenience alias for `Result<T, MimeError>`.
pub type Result<T> = std::result::Result<T, MimeError>;

impl MimeError {
    /// Create an `Io` variant from a context tag and an `io::Error`.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}

/// Allow `?` on `std::io::Error` inside functions returning `MimeError`
/// when no better context is available (prefer `MimeError::io`).
impl From<std::io::Error> for MimeError {
    fn from(source: std::io::Error) -> Self {
        Self::Io {
            context: "<stream>".to_string(),
            source,
        }
    }
}
