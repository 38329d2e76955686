use crate::emit::{self, OUTPUT_CHUNK_SIZE, SegmentSink};
use crate::error::Error;
use crate::format::Format;
use crate::segment::{Segment, SegmentStore};
use crate::transform::{ImageCodec, Operation};
use std::sync::Arc;

/// Observable phase of a [`Reassembler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No segment has been seen yet.
    AwaitingContext,
    /// Data is being buffered; end of stream not seen.
    Accumulating,
    /// The response was transformed and handed downstream.
    Finalized,
    /// The response failed and nothing was handed downstream.
    Failed,
}

/// Per-response state.
enum State {
    AwaitingContext,
    Accumulating(SegmentStore),
    Finalized,
    Failed,
}

/// Buffers one response body and transforms it once it is complete.
///
/// Each response gets its own reassembler; nothing is shared between
/// responses except the codec and the configured operation.
pub struct Reassembler<C> {
    codec: Arc<C>,
    operation: Operation,
    max_size: Option<usize>,
    declared: Option<Format>,
    state: State,
}

impl<C> Reassembler<C> {
    /// Returns the current phase.
    pub fn phase(&self) -> Phase {
        match self.state {
            State::AwaitingContext => Phase::AwaitingContext,
            State::Accumulating(_) => Phase::Accumulating,
            State::Finalized => Phase::Finalized,
            State::Failed => Phase::Failed,
        }
    }
}

impl<C: ImageCodec> Reassembler<C> {
    /// Creates a reassembler that applies `operation` with `codec`.
    pub fn new(codec: Arc<C>, operation: Operation) -> Self {
        Self {
            codec,
            operation,
            max_size: None,
            declared: None,
            state: State::AwaitingContext,
        }
    }

    /// Limits how many body bytes may be buffered.
    pub fn max_size(mut self, max_size: usize) -> Self {
        self.max_size = Some(max_size);
        self
    }

    /// Requires the body to be encoded as `format`.
    ///
    /// A body sniffed as any other format fails with
    /// [`Error::UnsupportedFormat`] instead of being re-encoded under a
    /// mismatching content type.
    pub fn declared_format(mut self, format: Format) -> Self {
        self.declared = Some(format);
        self
    }

    /// Consumes one batch of incoming segments.
    ///
    /// Data segments are buffered and control segments are dropped. On end of
    /// stream the buffered body is sniffed, transformed, re-encoded and passed
    /// to `next` followed by a fresh end-of-stream segment. An empty batch is
    /// passed through untouched.
    ///
    /// Any error fails the response: nothing is passed to `next` and later
    /// batches are rejected with [`Error::Closed`].
    pub fn filter<S>(&mut self, batch: Vec<Segment>, next: &mut S) -> Result<(), Error>
    where
        S: SegmentSink + ?Sized,
    {
        if batch.is_empty() {
            next.pass(batch);
            return Ok(());
        }

        // Stays Failed unless explicitly restored below.
        let mut store = match std::mem::replace(&mut self.state, State::Failed) {
            State::AwaitingContext => {
                log::debug!("creating body buffer for {} transform", self.operation);
                match self.max_size {
                    Some(limit) => SegmentStore::with_limit(limit),
                    None => SegmentStore::new(),
                }
            }
            State::Accumulating(store) => store,
            State::Finalized => {
                self.state = State::Finalized;
                return Err(Error::Closed);
            }
            State::Failed => return Err(Error::Closed),
        };

        let mut segments = batch.into_iter();
        while let Some(segment) = segments.next() {
            match segment {
                Segment::Data(data) => {
                    if let Err(e) = store.append(data) {
                        log::warn!("failed to buffer body segment: {e}");
                        return Err(e);
                    }
                }
                Segment::EndOfStream => {
                    let trailing = segments.len();
                    if trailing > 0 {
                        log::debug!("ignoring {trailing} segments after end of stream");
                    }

                    if let Err(e) = self.finalize(store, next) {
                        log::warn!("{} transform failed: {e}", self.operation);
                        return Err(e);
                    }
                    self.state = State::Finalized;
                    return Ok(());
                }
                Segment::Flush | Segment::Metadata => {}
            }
        }

        self.state = State::Accumulating(store);
        Ok(())
    }

    fn finalize<S>(&self, store: SegmentStore, next: &mut S) -> Result<(), Error>
    where
        S: SegmentSink + ?Sized,
    {
        log::debug!(
            "end of stream received after {} segments ({} bytes)",
            store.len(),
            store.total_len()
        );

        let body = store.flatten()?;
        if body.is_empty() {
            next.pass(vec![Segment::EndOfStream]);
            return Ok(());
        }

        let format = Format::detect(&body).ok_or(Error::UnsupportedFormat)?;
        if let Some(declared) = self.declared.filter(|declared| *declared != format) {
            log::debug!(
                "body sniffed as {} but declared as {}",
                format.content_type(),
                declared.content_type()
            );
            return Err(Error::UnsupportedFormat);
        }
        log::debug!("detected {format} body");

        let transformed = {
            let source = self.codec.decode(&body, format)?;
            self.codec.apply(&source, &self.operation)?
        };
        let encoded = self.codec.encode(&transformed, format)?;
        drop(transformed);

        log::debug!("emitting {} bytes of {format}", encoded.len());
        next.pass(emit::emit(encoded, OUTPUT_CHUNK_SIZE));
        Ok(())
    }
}

impl<C> std::fmt::Debug for Reassembler<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reassembler")
            .field("operation", &self.operation)
            .field("max_size", &self.max_size)
            .field("declared", &self.declared)
            .field("phase", &self.phase())
            .finish()
    }
}
