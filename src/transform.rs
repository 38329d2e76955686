use crate::error::Error;
use crate::format::Format;
use bytes::Bytes;
use std::fmt;

/// Transform applied to every buffered image.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Operation {
    /// Scales to exactly `width` x `height` using nearest-neighbour sampling.
    Resize {
        /// Target width in pixels.
        width: u32,
        /// Target height in pixels.
        height: u32,
    },
    /// Scales to exactly `width` x `height` using a smoothing filter.
    Resample {
        /// Target width in pixels.
        width: u32,
        /// Target height in pixels.
        height: u32,
    },
    /// Cuts out a box anchored at (`x`, `y`).
    Crop {
        /// Left edge of the box.
        x: u32,
        /// Top edge of the box.
        y: u32,
        /// Box width.
        width: u32,
        /// Box height.
        height: u32,
    },
    /// Draws an encoded image on top, with its top-left corner at (`x`, `y`).
    Watermark {
        /// Encoded JPEG, PNG or GIF overlay.
        overlay: Bytes,
        /// Horizontal offset; may be negative.
        x: i64,
        /// Vertical offset; may be negative.
        y: i64,
    },
    /// Leaves the image unchanged.
    #[default]
    NoOp,
}

impl Operation {
    /// Returns a short name for logs and errors.
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Resize { .. } => "resize",
            Operation::Resample { .. } => "resample",
            Operation::Crop { .. } => "crop",
            Operation::Watermark { .. } => "watermark",
            Operation::NoOp => "no-op",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Image codec used to decode, transform and re-encode a buffered body.
///
/// Implementations own the concrete pixel library. Handles are passed
/// explicitly and never shared between calls.
pub trait ImageCodec {
    /// Decoded image.
    type Handle;

    /// Decodes `buffer`, which was sniffed as `format`.
    ///
    /// Fails with [`Error::Decode`].
    fn decode(&self, buffer: &[u8], format: Format) -> Result<Self::Handle, Error>;

    /// Applies `operation`, returning a new image and leaving `image` as is.
    ///
    /// Fails with [`Error::Transform`].
    fn apply(&self, image: &Self::Handle, operation: &Operation) -> Result<Self::Handle, Error>;

    /// Serializes `image` as `format`.
    ///
    /// Fails with [`Error::Encode`].
    fn encode(&self, image: &Self::Handle, format: Format) -> Result<Bytes, Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_noop() {
        assert_eq!(Operation::default(), Operation::NoOp);
    }

    #[test]
    fn test_names() {
        assert_eq!(
            Operation::Resize {
                width: 1,
                height: 1
            }
            .name(),
            "resize"
        );
        assert_eq!(
            Operation::Resample {
                width: 1,
                height: 1
            }
            .name(),
            "resample"
        );
        assert_eq!(
            Operation::Crop {
                x: 0,
                y: 0,
                width: 1,
                height: 1
            }
            .to_string(),
            "crop"
        );
        assert_eq!(
            Operation::Watermark {
                overlay: Bytes::new(),
                x: 0,
                y: 0
            }
            .name(),
            "watermark"
        );
        assert_eq!(Operation::NoOp.to_string(), "no-op");
    }
}
