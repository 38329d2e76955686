use crate::error::{BoxError, Error};
use crate::reassembler::{Phase, Reassembler};
use crate::segment::Segment;
use crate::transform::ImageCodec;
use bytes::{Buf, Bytes};
use http_body::{Body, Frame, SizeHint};
use pin_project_lite::pin_project;
use std::collections::VecDeque;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

pin_project! {
    /// A response body that may be buffered and transformed.
    ///
    /// This type wraps an inner body and either collects it into a single
    /// image that is transformed before being re-emitted, or passes it
    /// through unchanged.
    #[project = TransformBodyProj]
    #[allow(missing_docs)]
    pub enum TransformBody<B, C> {
        /// Buffered body fed through a reassembler.
        Transform {
            #[pin]
            inner: B,
            state: TransformState<C>,
        },
        /// Passthrough body without transformation.
        Passthrough {
            #[pin]
            inner: B,
        },
    }
}

/// Reassembler plus the segments it has emitted but not yet yielded.
pub(crate) struct TransformState<C> {
    reassembler: Reassembler<C>,
    output: VecDeque<Segment>,
    done: bool,
}

impl<C> TransformState<C> {
    fn new(reassembler: Reassembler<C>) -> Self {
        Self {
            reassembler,
            output: VecDeque::new(),
            done: false,
        }
    }

    /// Returns the phase of the underlying reassembler.
    pub(crate) fn phase(&self) -> Phase {
        self.reassembler.phase()
    }

    fn is_done(&self) -> bool {
        self.done
    }

    /// Ends the body, dropping anything not yet yielded.
    fn terminate(&mut self) {
        self.done = true;
        self.output.clear();
    }
}

impl<C: ImageCodec> TransformState<C> {
    /// Polls the inner body until the reassembler has output to yield.
    fn poll_transformed<B>(
        &mut self,
        cx: &mut Context<'_>,
        mut inner: Pin<&mut B>,
    ) -> Poll<Option<Result<Frame<Bytes>, Error>>>
    where
        B: Body,
        B::Data: Buf,
        B::Error: Into<BoxError>,
    {
        loop {
            // Drain what the reassembler has already emitted
            if let Some(segment) = self.output.pop_front() {
                match segment {
                    Segment::Data(data) => return Poll::Ready(Some(Ok(Frame::data(data)))),
                    Segment::EndOfStream => {
                        self.terminate();
                        return Poll::Ready(None);
                    }
                    Segment::Flush | Segment::Metadata => continue,
                }
            }

            if self.done {
                return Poll::Ready(None);
            }

            let segment = match inner.as_mut().poll_frame(cx) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(None) => Segment::EndOfStream,
                Poll::Ready(Some(Err(e))) => {
                    self.terminate();
                    return Poll::Ready(Some(Err(Error::Io(io::Error::other(e.into())))));
                }
                Poll::Ready(Some(Ok(frame))) => match frame.into_data() {
                    Ok(mut data) => Segment::Data(data.copy_to_bytes(data.remaining())),
                    // Trailers describe the original body; drop them
                    Err(_) => Segment::Metadata,
                },
            };

            if let Err(e) = self.reassembler.filter(vec![segment], &mut self.output) {
                self.terminate();
                return Poll::Ready(Some(Err(e)));
            }
        }
    }
}

impl<B, C> TransformBody<B, C> {
    /// Creates a body that is buffered and transformed by `reassembler`.
    pub fn transform(inner: B, reassembler: Reassembler<C>) -> Self {
        Self::Transform {
            inner,
            state: TransformState::new(reassembler),
        }
    }

    /// Creates a passthrough body without transformation.
    pub fn passthrough(inner: B) -> Self {
        Self::Passthrough { inner }
    }
}

impl<B, C> Body for TransformBody<B, C>
where
    B: Body,
    B::Data: Buf,
    B::Error: Into<BoxError>,
    C: ImageCodec,
{
    type Data = Bytes;
    type Error = Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        match self.project() {
            TransformBodyProj::Passthrough { inner } => match inner.poll_frame(cx) {
                Poll::Pending => Poll::Pending,
                Poll::Ready(None) => Poll::Ready(None),
                Poll::Ready(Some(Ok(frame))) => {
                    let frame = frame.map_data(|mut data| data.copy_to_bytes(data.remaining()));
                    Poll::Ready(Some(Ok(frame)))
                }
                Poll::Ready(Some(Err(e))) => {
                    Poll::Ready(Some(Err(Error::Io(io::Error::other(e.into())))))
                }
            },
            TransformBodyProj::Transform { inner, state } => state.poll_transformed(cx, inner),
        }
    }

    fn is_end_stream(&self) -> bool {
        match self {
            TransformBody::Passthrough { inner } => inner.is_end_stream(),
            TransformBody::Transform { state, .. } => state.is_done(),
        }
    }

    fn size_hint(&self) -> SizeHint {
        match self {
            TransformBody::Passthrough { inner } => inner.size_hint(),
            // Only known once the transformed image has been emitted
            TransformBody::Transform { state, .. } => {
                if state.phase() == Phase::Finalized || state.is_done() {
                    let remaining = state.output.iter().map(Segment::len).sum::<usize>();
                    SizeHint::with_exact(remaining as u64)
                } else {
                    SizeHint::default()
                }
            }
        }
    }
}
