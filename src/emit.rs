use crate::segment::Segment;
use bytes::Bytes;
use std::collections::VecDeque;

/// Maximum size of an emitted data segment (8KB).
pub const OUTPUT_CHUNK_SIZE: usize = 8 * 1024;

/// Downstream ingestion point for emitted segments.
pub trait SegmentSink {
    /// Accepts an ordered batch of segments.
    fn pass(&mut self, segments: Vec<Segment>);
}

impl SegmentSink for Vec<Segment> {
    fn pass(&mut self, segments: Vec<Segment>) {
        self.extend(segments);
    }
}

impl SegmentSink for VecDeque<Segment> {
    fn pass(&mut self, segments: Vec<Segment>) {
        self.extend(segments);
    }
}

/// Splits `buffer` into data segments of at most `chunk_size` bytes followed
/// by exactly one end-of-stream segment.
///
/// Splitting does not copy.
pub fn emit(mut buffer: Bytes, chunk_size: usize) -> Vec<Segment> {
    let chunk_size = chunk_size.max(1);
    let mut segments = Vec::with_capacity(buffer.len().div_ceil(chunk_size) + 1);

    while !buffer.is_empty() {
        let take = chunk_size.min(buffer.len());
        segments.push(Segment::Data(buffer.split_to(take)));
    }
    segments.push(Segment::EndOfStream);

    segments
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_empty() {
        assert_eq!(
            emit(Bytes::new(), OUTPUT_CHUNK_SIZE),
            vec![Segment::EndOfStream]
        );
    }

    #[test]
    fn test_emit_single_chunk() {
        let segments = emit(Bytes::from_static(b"hello"), OUTPUT_CHUNK_SIZE);
        assert_eq!(
            segments,
            vec![
                Segment::Data(Bytes::from_static(b"hello")),
                Segment::EndOfStream
            ]
        );
    }

    #[test]
    fn test_emit_splits_buffer() {
        let segments = emit(Bytes::from_static(b"abcdefg"), 3);
        assert_eq!(
            segments,
            vec![
                Segment::Data(Bytes::from_static(b"abc")),
                Segment::Data(Bytes::from_static(b"def")),
                Segment::Data(Bytes::from_static(b"g")),
                Segment::EndOfStream,
            ]
        );
    }

    #[test]
    fn test_emit_single_terminal() {
        let buffer = Bytes::from(vec![7u8; OUTPUT_CHUNK_SIZE * 3 + 1]);
        let segments = emit(buffer, OUTPUT_CHUNK_SIZE);

        let terminals = segments.iter().filter(|s| s.is_end_of_stream()).count();
        assert_eq!(terminals, 1);
        assert!(segments.last().unwrap().is_end_of_stream());
        assert_eq!(segments.len(), 5);

        let total: usize = segments.iter().map(Segment::len).sum();
        assert_eq!(total, OUTPUT_CHUNK_SIZE * 3 + 1);
    }

    #[test]
    fn test_sink_appends_in_order() {
        let mut sink = VecDeque::new();
        sink.pass(vec![Segment::Flush]);
        sink.pass(vec![Segment::Metadata, Segment::EndOfStream]);
        assert_eq!(
            sink,
            VecDeque::from(vec![Segment::Flush, Segment::Metadata, Segment::EndOfStream])
        );
    }
}
