use crate::error::Error;
use bytes::Bytes;
use std::io;

/// One ordered unit of a response body stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Payload bytes.
    Data(Bytes),
    /// Request to flush anything buffered downstream.
    Flush,
    /// End of the body. Exactly one per response.
    EndOfStream,
    /// Any other control signal, such as trailers.
    Metadata,
}

impl Segment {
    /// Creates a data segment that owns a copy of `data`.
    ///
    /// Use this when the caller may reuse `data` after handing it over.
    pub fn data_from_slice(data: &[u8]) -> Self {
        Segment::Data(Bytes::copy_from_slice(data))
    }

    /// Returns true for data segments.
    pub fn is_data(&self) -> bool {
        matches!(self, Segment::Data(_))
    }

    /// Returns true for the terminal segment.
    pub fn is_end_of_stream(&self) -> bool {
        matches!(self, Segment::EndOfStream)
    }

    /// Returns the payload length; control segments are empty.
    pub fn len(&self) -> usize {
        match self {
            Segment::Data(data) => data.len(),
            _ => 0,
        }
    }

    /// Returns true if the segment carries no payload bytes.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Ordered, append-only storage for the data segments of one response.
///
/// Every retained range is owned by the store, so the producer is free to
/// recycle its buffers once a segment has been handed over. Flattening
/// consumes the store.
#[derive(Debug, Default)]
pub struct SegmentStore {
    segments: Vec<Bytes>,
    total_len: usize,
    limit: Option<usize>,
}

impl SegmentStore {
    /// Creates an empty store without a size limit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty store that refuses to retain more than `limit` bytes.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            ..Self::default()
        }
    }

    /// Appends an owned byte range.
    pub fn append(&mut self, data: Bytes) -> Result<(), Error> {
        let total_len = self
            .total_len
            .checked_add(data.len())
            .filter(|len| self.limit.is_none_or(|limit| *len <= limit))
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::FileTooLarge,
                    format!("body exceeds {} bytes", self.limit.unwrap_or(usize::MAX)),
                )
            })?;

        if data.is_empty() {
            return Ok(());
        }

        self.segments
            .try_reserve(1)
            .map_err(|_| io::Error::from(io::ErrorKind::OutOfMemory))?;
        self.segments.push(data);
        self.total_len = total_len;
        Ok(())
    }

    /// Appends a copy of a borrowed byte range.
    pub fn append_slice(&mut self, data: &[u8]) -> Result<(), Error> {
        self.append(Bytes::copy_from_slice(data))
    }

    /// Returns the number of retained segments.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Returns true if nothing has been retained.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Returns the number of retained bytes.
    pub fn total_len(&self) -> usize {
        self.total_len
    }

    /// Concatenates every retained range, in arrival order, into one buffer.
    ///
    /// An empty store yields an empty buffer. A single retained range is
    /// returned without copying.
    pub fn flatten(mut self) -> Result<Bytes, Error> {
        match self.segments.len() {
            0 => return Ok(Bytes::new()),
            1 => return Ok(self.segments.swap_remove(0)),
            _ => {}
        }

        let mut buffer = Vec::new();
        buffer
            .try_reserve_exact(self.total_len)
            .map_err(|_| io::Error::from(io::ErrorKind::OutOfMemory))?;
        for segment in &self.segments {
            buffer.extend_from_slice(segment);
        }
        Ok(Bytes::from(buffer))
    }
}
