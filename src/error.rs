use crate::format::Format;
use std::io;

/// Boxed error type used for foreign failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised while buffering or transforming a response body.
///
/// Every variant is scoped to a single response.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Body bytes could not be read or retained.
    #[error("body I/O error: {0}")]
    Io(#[from] io::Error),

    /// The body did not start with a known image signature.
    #[error("unrecognized image format")]
    UnsupportedFormat,

    /// The codec rejected the buffered body.
    #[error("failed to decode {format} image: {source}")]
    Decode {
        /// Format the body was sniffed as.
        format: Format,
        /// Codec error.
        #[source]
        source: BoxError,
    },

    /// The configured operation could not be applied.
    #[error("{operation} failed: {reason}")]
    Transform {
        /// Name of the operation.
        operation: &'static str,
        /// Why it failed.
        reason: String,
    },

    /// The transformed image could not be serialized.
    #[error("failed to encode {format} image: {source}")]
    Encode {
        /// Target format.
        format: Format,
        /// Codec error.
        #[source]
        source: BoxError,
    },

    /// Segments arrived after the response was finalized or failed.
    #[error("segment received after end of stream")]
    Closed,
}

impl Error {
    pub(crate) fn transform(operation: &'static str, reason: impl Into<String>) -> Self {
        Error::Transform {
            operation,
            reason: reason.into(),
        }
    }
}
