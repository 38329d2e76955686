use crate::body::TransformBody;
use crate::codec::RasterCodec;
use crate::future::ResponseFuture;
use crate::layer::Settings;
use crate::transform::ImageCodec;
use http::Request;
use std::fmt;
use std::task::{Context, Poll};
use tower::Service;

/// A Tower service that transforms image response bodies.
pub struct ImageTransformService<S, C = RasterCodec> {
    inner: S,
    settings: Settings<C>,
}

impl<S, C> ImageTransformService<S, C> {
    pub(crate) fn new(inner: S, settings: Settings<C>) -> Self {
        Self { inner, settings }
    }

    /// Returns a reference to the inner service.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Returns a mutable reference to the inner service.
    pub fn inner_mut(&mut self) -> &mut S {
        &mut self.inner
    }

    /// Consumes this service, returning the inner service.
    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: Clone, C> Clone for ImageTransformService<S, C> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            settings: self.settings.clone(),
        }
    }
}

impl<S: fmt::Debug, C> fmt::Debug for ImageTransformService<S, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageTransformService")
            .field("inner", &self.inner)
            .field("settings", &self.settings)
            .finish()
    }
}

impl<S, C, ReqBody, ResBody> Service<Request<ReqBody>> for ImageTransformService<S, C>
where
    S: Service<Request<ReqBody>, Response = http::Response<ResBody>>,
    C: ImageCodec,
{
    type Response = http::Response<TransformBody<ResBody, C>>;
    type Error = S::Error;
    type Future = ResponseFuture<S::Future, C>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        // Each response gets its own reassembler once its headers are known
        let inner = self.inner.call(req);

        ResponseFuture::new(inner, self.settings.clone())
    }
}
