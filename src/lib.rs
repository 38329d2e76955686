//! HTTP response image transform middleware for Tower.
//!
//! This crate provides a Tower layer that buffers image response bodies,
//! detects their encoding from the leading bytes, applies a configured
//! transform (resize, resample, crop, watermark or no-op) and re-emits the
//! re-encoded image as a fresh body.
//!
//! # Example
//!
//! ```ignore
//! use http_image_filter::{ImageTransformLayer, Operation};
//! use tower::ServiceBuilder;
//!
//! let service = ServiceBuilder::new()
//!     .layer(ImageTransformLayer::new(Operation::Resize { width: 100, height: 100 }))
//!     .service(my_service);
//! ```
//!
//! # Transform Rules
//!
//! The middleware will **not** touch responses when:
//! - `Content-Encoding` header is already set
//! - `Content-Range` header is present (range responses)
//! - `Content-Type` is set and is not `image/jpeg`, `image/png` or `image/gif`
//! - `Content-Length` is above the maximum buffered size (default: 16 MiB)
//!
//! Every other body is buffered in full. Once it ends:
//! - an empty body is passed on as an empty body
//! - a body that is not JPEG, PNG or GIF fails with [`Error::UnsupportedFormat`]
//! - so does an image whose format differs from the one its `Content-Type` names
//! - otherwise the image is decoded, transformed exactly once and re-encoded in
//!   the format it arrived in
//!
//! Failures surface as a single body error; no partial image is emitted.
//!
//! # Response Modifications
//!
//! When a body is transformed:
//! - `Content-Length` header is removed
//! - `Accept-Ranges` and `ETag` headers are removed
//!
//! # Without Tower
//!
//! [`Reassembler`] is the host-agnostic core: feed it batches of [`Segment`]s
//! and it passes the transformed body, terminated by exactly one
//! [`Segment::EndOfStream`], to a [`SegmentSink`].

#![deny(missing_docs)]

mod body;
mod codec;
mod emit;
mod error;
mod format;
mod future;
mod layer;
mod reassembler;
mod segment;
mod service;
mod transform;

pub use body::TransformBody;
pub use codec::RasterCodec;
pub use emit::{OUTPUT_CHUNK_SIZE, SegmentSink, emit};
pub use error::{BoxError, Error};
pub use format::{Format, detect};
pub use future::ResponseFuture;
pub use layer::{DEFAULT_MAX_SIZE, ImageTransformLayer};
pub use reassembler::{Phase, Reassembler};
pub use segment::{Segment, SegmentStore};
pub use service::ImageTransformService;
pub use transform::{ImageCodec, Operation};
