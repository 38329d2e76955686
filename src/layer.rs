use crate::codec::RasterCodec;
use crate::reassembler::Reassembler;
use crate::service::ImageTransformService;
use crate::transform::{ImageCodec, Operation};
use std::fmt;
use std::sync::Arc;
use tower::Layer;

/// Default maximum number of body bytes buffered per response (16 MiB).
pub const DEFAULT_MAX_SIZE: usize = 16 * 1024 * 1024;

/// A Tower layer that transforms image response bodies.
///
/// This layer wraps services and buffers every image response body, detects
/// its format from the leading bytes, applies the configured [`Operation`]
/// and re-encodes the result in the same format.
pub struct ImageTransformLayer<C = RasterCodec> {
    settings: Settings<C>,
}

impl ImageTransformLayer {
    /// Creates a new layer applying `operation` with the default codec.
    ///
    /// The default maximum body size is 16 MiB.
    pub fn new(operation: Operation) -> Self {
        Self::with_codec(RasterCodec, operation)
    }
}

impl<C> ImageTransformLayer<C> {
    /// Creates a new layer applying `operation` with a custom codec.
    pub fn with_codec(codec: C, operation: Operation) -> Self {
        Self {
            settings: Settings {
                codec: Arc::new(codec),
                operation,
                max_size: DEFAULT_MAX_SIZE,
            },
        }
    }

    /// Sets the maximum body size that will be buffered.
    ///
    /// Responses with a known Content-Length above this value are passed
    /// through untouched; responses of unknown length that grow past it fail.
    pub fn max_size(mut self, size: usize) -> Self {
        self.settings.max_size = size;
        self
    }
}

impl Default for ImageTransformLayer {
    fn default() -> Self {
        Self::new(Operation::NoOp)
    }
}

impl<C> Clone for ImageTransformLayer<C> {
    fn clone(&self) -> Self {
        Self {
            settings: self.settings.clone(),
        }
    }
}

impl<C> fmt::Debug for ImageTransformLayer<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageTransformLayer")
            .field("settings", &self.settings)
            .finish()
    }
}

impl<S, C> Layer<S> for ImageTransformLayer<C> {
    type Service = ImageTransformService<S, C>;

    fn layer(&self, inner: S) -> Self::Service {
        ImageTransformService::new(inner, self.settings.clone())
    }
}

/// Read-only configuration shared by every response of a service.
pub(crate) struct Settings<C> {
    pub(crate) codec: Arc<C>,
    pub(crate) operation: Operation,
    pub(crate) max_size: usize,
}

impl<C: ImageCodec> Settings<C> {
    /// Creates the per-response state for one body.
    pub(crate) fn reassembler(&self) -> Reassembler<C> {
        Reassembler::new(self.codec.clone(), self.operation.clone()).max_size(self.max_size)
    }
}

impl<C> Clone for Settings<C> {
    fn clone(&self) -> Self {
        Self {
            codec: self.codec.clone(),
            operation: self.operation.clone(),
            max_size: self.max_size,
        }
    }
}

impl<C> fmt::Debug for Settings<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("operation", &self.operation)
            .field("max_size", &self.max_size)
            .finish_non_exhaustive()
    }
}
