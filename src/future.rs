use crate::body::TransformBody;
use crate::format::Format;
use crate::layer::Settings;
use crate::transform::ImageCodec;
use http::{Response, header};
use pin_project_lite::pin_project;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

pin_project! {
    /// Future for image transform service responses.
    pub struct ResponseFuture<F, C> {
        #[pin]
        inner: F,
        settings: Settings<C>,
    }
}

impl<F, C> ResponseFuture<F, C> {
    pub(crate) fn new(inner: F, settings: Settings<C>) -> Self {
        Self { inner, settings }
    }
}

impl<F, B, E, C> Future for ResponseFuture<F, C>
where
    F: Future<Output = Result<Response<B>, E>>,
    C: ImageCodec,
{
    type Output = Result<Response<TransformBody<B, C>>, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();

        match this.inner.poll(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Err(e)) => Poll::Ready(Err(e)),
            Poll::Ready(Ok(response)) => Poll::Ready(Ok(wrap_response(response, this.settings))),
        }
    }
}

/// Wraps the response body with a reassembler if it looks like an image.
fn wrap_response<B, C: ImageCodec>(
    response: Response<B>,
    settings: &Settings<C>,
) -> Response<TransformBody<B, C>> {
    let (mut parts, body) = response.into_parts();

    let transform = !has_content_encoding(&parts.headers)
        && !has_content_range(&parts.headers)
        && is_transformable_content_type(&parts.headers)
        && !is_above_max_size(&parts.headers, settings.max_size);

    let body = if transform {
        // The transformed length is only known once the body is complete
        parts.headers.remove(header::CONTENT_LENGTH);

        // Ranges and validators refer to the original representation
        parts.headers.remove(header::ACCEPT_RANGES);
        parts.headers.remove(header::ETAG);

        // The re-encoded body must still match its declared type
        let mut reassembler = settings.reassembler();
        if let Some(format) = declared_format(&parts.headers) {
            reassembler = reassembler.declared_format(format);
        }

        TransformBody::transform(body, reassembler)
    } else {
        TransformBody::passthrough(body)
    };

    Response::from_parts(parts, body)
}

/// Checks if Content-Encoding header is already present.
fn has_content_encoding(headers: &header::HeaderMap) -> bool {
    headers.contains_key(header::CONTENT_ENCODING)
}

/// Checks if Content-Range header is present (range response).
fn has_content_range(headers: &header::HeaderMap) -> bool {
    headers.contains_key(header::CONTENT_RANGE)
}

/// Checks if the content type is absent or names a sniffable image format.
fn is_transformable_content_type(headers: &header::HeaderMap) -> bool {
    !headers.contains_key(header::CONTENT_TYPE) || declared_format(headers).is_some()
}

/// Returns the image format named by the Content-Type header, if any.
fn declared_format(headers: &header::HeaderMap) -> Option<Format> {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(Format::from_content_type)
}

/// Checks if Content-Length exceeds the buffering limit.
fn is_above_max_size(headers: &header::HeaderMap, max_size: usize) -> bool {
    headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
        .is_some_and(|len| len > max_size as u64)
}
