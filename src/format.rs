use std::fmt;

const JPEG_SIGNATURE: &[u8] = &[0xFF, 0xD8, 0xFF];
const PNG_SIGNATURE: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
const GIF_SIGNATURE: &[u8] = &[0x47, 0x49, 0x46];

/// Image encodings recognized from leading bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    /// JPEG (`FF D8 FF`).
    Jpeg,
    /// PNG (8-byte PNG signature).
    Png,
    /// GIF (`GIF`).
    Gif,
}

impl Format {
    /// Detects the encoding of `buffer` from its magic bytes.
    ///
    /// Returns `None` when the buffer matches no signature, including when it
    /// is shorter than every signature it could match.
    pub fn detect(buffer: &[u8]) -> Option<Format> {
        // Checked in JPEG, PNG, GIF order; the signatures are disjoint.
        [Format::Jpeg, Format::Png, Format::Gif]
            .into_iter()
            .find(|format| buffer.starts_with(format.signature()))
    }

    /// Returns the magic bytes for this format.
    pub fn signature(&self) -> &'static [u8] {
        match self {
            Format::Jpeg => JPEG_SIGNATURE,
            Format::Png => PNG_SIGNATURE,
            Format::Gif => GIF_SIGNATURE,
        }
    }

    /// Returns the Content-Type header value for this format.
    pub fn content_type(&self) -> &'static str {
        match self {
            Format::Jpeg => "image/jpeg",
            Format::Png => "image/png",
            Format::Gif => "image/gif",
        }
    }

    /// Parses a Content-Type header value, ignoring parameters and case.
    pub fn from_content_type(content_type: &str) -> Option<Format> {
        let essence = content_type.split(';').next().unwrap_or("").trim();

        if essence.eq_ignore_ascii_case("image/jpeg")
            || essence.eq_ignore_ascii_case("image/jpg")
            || essence.eq_ignore_ascii_case("image/pjpeg")
        {
            Some(Format::Jpeg)
        } else if essence.eq_ignore_ascii_case("image/png") {
            Some(Format::Png)
        } else if essence.eq_ignore_ascii_case("image/gif") {
            Some(Format::Gif)
        } else {
            None
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Format::Jpeg => "JPEG",
            Format::Png => "PNG",
            Format::Gif => "GIF",
        })
    }
}

/// Detects the image encoding of `buffer`. See [`Format::detect`].
pub fn detect(buffer: &[u8]) -> Option<Format> {
    Format::detect(buffer)
}
