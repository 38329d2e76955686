use crate::error::Error;
use crate::format::Format;
use crate::transform::{ImageCodec, Operation};
use bytes::Bytes;
use image::imageops::{self, FilterType};
use image::{ColorType, DynamicImage, ImageFormat};
use std::io::Cursor;

/// [`ImageCodec`] backed by the `image` crate.
///
/// Which formats can actually be decoded and encoded depends on the `jpeg`,
/// `png` and `gif` cargo features. A disabled format fails like a corrupt one.
#[derive(Debug, Clone, Copy, Default)]
pub struct RasterCodec;

impl ImageCodec for RasterCodec {
    type Handle = DynamicImage;

    fn decode(&self, buffer: &[u8], format: Format) -> Result<DynamicImage, Error> {
        image::load_from_memory_with_format(buffer, image_format(format)).map_err(|e| {
            Error::Decode {
                format,
                source: e.into(),
            }
        })
    }

    fn apply(&self, image: &DynamicImage, operation: &Operation) -> Result<DynamicImage, Error> {
        let name = operation.name();

        match operation {
            Operation::Resize { width, height } => {
                check_dimensions(name, *width, *height)?;
                Ok(image.resize_exact(*width, *height, FilterType::Nearest))
            }
            Operation::Resample { width, height } => {
                check_dimensions(name, *width, *height)?;
                Ok(image.resize_exact(*width, *height, FilterType::Lanczos3))
            }
            Operation::Crop {
                x,
                y,
                width,
                height,
            } => {
                check_dimensions(name, *width, *height)?;
                let fits_x = x.checked_add(*width).is_some_and(|r| r <= image.width());
                let fits_y = y.checked_add(*height).is_some_and(|b| b <= image.height());
                if !fits_x || !fits_y {
                    return Err(Error::transform(
                        name,
                        format!(
                            "box {width}x{height}+{x}+{y} exceeds {}x{} image",
                            image.width(),
                            image.height()
                        ),
                    ));
                }
                Ok(image.crop_imm(*x, *y, *width, *height))
            }
            Operation::Watermark { overlay, x, y } => self.watermark(image, overlay, *x, *y),
            Operation::NoOp => Ok(image.clone()),
        }
    }

    fn encode(&self, image: &DynamicImage, format: Format) -> Result<Bytes, Error> {
        // JPEG carries no alpha channel; the GIF encoder works on RGBA.
        let converted;
        let image = match (format, image.color()) {
            (Format::Jpeg, ColorType::L8 | ColorType::Rgb8) => image,
            (Format::Jpeg, _) => {
                converted = DynamicImage::ImageRgb8(image.to_rgb8());
                &converted
            }
            (Format::Gif, ColorType::Rgba8) => image,
            (Format::Gif, _) => {
                converted = DynamicImage::ImageRgba8(image.to_rgba8());
                &converted
            }
            (Format::Png, _) => image,
        };

        let mut output = Cursor::new(Vec::new());
        image
            .write_to(&mut output, image_format(format))
            .map_err(|e| Error::Encode {
                format,
                source: e.into(),
            })?;
        Ok(Bytes::from(output.into_inner()))
    }
}

impl RasterCodec {
    fn watermark(
        &self,
        image: &DynamicImage,
        overlay: &[u8],
        x: i64,
        y: i64,
    ) -> Result<DynamicImage, Error> {
        const NAME: &str = "watermark";

        let format = Format::detect(overlay)
            .ok_or_else(|| Error::transform(NAME, "overlay is not a recognized image"))?;
        let mark = self
            .decode(overlay, format)
            .map_err(|e| Error::transform(NAME, format!("overlay: {e}")))?;

        let (width, height) = (i64::from(image.width()), i64::from(image.height()));
        let (mark_width, mark_height) = (i64::from(mark.width()), i64::from(mark.height()));
        if x >= width || y >= height || x + mark_width <= 0 || y + mark_height <= 0 {
            return Err(Error::transform(
                NAME,
                format!("overlay at {x},{y} lies outside {width}x{height} image"),
            ));
        }

        let mut canvas = image.to_rgba8();
        imageops::overlay(&mut canvas, &mark.to_rgba8(), x, y);

        let marked = DynamicImage::ImageRgba8(canvas);
        if image.color().has_alpha() {
            Ok(marked)
        } else {
            Ok(DynamicImage::ImageRgb8(marked.to_rgb8()))
        }
    }
}

fn image_format(format: Format) -> ImageFormat {
    match format {
        Format::Jpeg => ImageFormat::Jpeg,
        Format::Png => ImageFormat::Png,
        Format::Gif => ImageFormat::Gif,
    }
}

fn check_dimensions(operation: &'static str, width: u32, height: u32) -> Result<(), Error> {
    if width == 0 || height == 0 {
        return Err(Error::transform(
            operation,
            format!("invalid target size {width}x{height}"),
        ));
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    /// Encodes a solid-colour image for use as a response body.
    #[cfg(any(feature = "jpeg", feature = "png", feature = "gif"))]
    pub(crate) fn fixture(format: Format, width: u32, height: u32) -> Bytes {
        let image =
            DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([200, 40, 10])));
        RasterCodec.encode(&image, format).unwrap()
    }

    #[cfg(feature = "png")]
    fn overlay_png(width: u32, height: u32) -> Bytes {
        use image::{Rgba, RgbaImage};

        let mark =
            DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba([0, 0, 255, 255])));
        RasterCodec.encode(&mark, Format::Png).unwrap()
    }

    fn solid(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([10, 10, 10])))
    }

    #[test]
    #[cfg(feature = "png")]
    fn test_png_decode_dimensions() {
        let body = fixture(Format::Png, 12, 7);
        assert_eq!(Format::detect(&body), Some(Format::Png));

        let image = RasterCodec.decode(&body, Format::Png).unwrap();
        assert_eq!((image.width(), image.height()), (12, 7));
    }

    #[test]
    #[cfg(feature = "jpeg")]
    fn test_jpeg_round_trip_dimensions() {
        let body = fixture(Format::Jpeg, 33, 21);
        assert_eq!(Format::detect(&body), Some(Format::Jpeg));

        let image = RasterCodec.decode(&body, Format::Jpeg).unwrap();
        assert_eq!((image.width(), image.height()), (33, 21));
    }

    #[test]
    #[cfg(feature = "gif")]
    fn test_gif_round_trip_dimensions() {
        let body = fixture(Format::Gif, 9, 4);
        assert_eq!(Format::detect(&body), Some(Format::Gif));

        let image = RasterCodec.decode(&body, Format::Gif).unwrap();
        assert_eq!((image.width(), image.height()), (9, 4));
    }

    #[test]
    #[cfg(feature = "png")]
    fn test_noop_round_trip_keeps_dimensions() {
        let body = fixture(Format::Png, 40, 30);
        let image = RasterCodec.decode(&body, Format::Png).unwrap();
        let same = RasterCodec.apply(&image, &Operation::NoOp).unwrap();
        let encoded = RasterCodec.encode(&same, Format::Png).unwrap();

        let decoded = RasterCodec.decode(&encoded, Format::Png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (40, 30));
    }

    #[test]
    fn test_decode_garbage_fails() {
        let err = RasterCodec
            .decode(b"\x89PNG\r\n\x1a\nnot really", Format::Png)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Decode {
                format: Format::Png,
                ..
            }
        ));
    }

    #[test]
    fn test_resize_exact() {
        let image = solid(300, 200);
        let op = Operation::Resize {
            width: 100,
            height: 100,
        };
        let resized = RasterCodec.apply(&image, &op).unwrap();

        assert_eq!((resized.width(), resized.height()), (100, 100));
        // Input is left untouched
        assert_eq!((image.width(), image.height()), (300, 200));
    }

    #[test]
    fn test_resample_exact() {
        let image = solid(50, 50);
        let op = Operation::Resample {
            width: 20,
            height: 10,
        };
        let resampled = RasterCodec.apply(&image, &op).unwrap();
        assert_eq!((resampled.width(), resampled.height()), (20, 10));
    }

    #[test]
    fn test_resize_zero_fails() {
        let op = Operation::Resize {
            width: 0,
            height: 10,
        };
        let err = RasterCodec.apply(&solid(5, 5), &op).unwrap_err();
        assert!(matches!(
            err,
            Error::Transform {
                operation: "resize",
                ..
            }
        ));
    }

    #[test]
    fn test_crop_inside() {
        let op = Operation::Crop {
            x: 10,
            y: 5,
            width: 20,
            height: 15,
        };
        let cropped = RasterCodec.apply(&solid(30, 20), &op).unwrap();
        assert_eq!((cropped.width(), cropped.height()), (20, 15));
    }

    #[test]
    fn test_crop_out_of_bounds_fails() {
        let op = Operation::Crop {
            x: 25,
            y: 0,
            width: 10,
            height: 10,
        };
        let err = RasterCodec.apply(&solid(30, 20), &op).unwrap_err();
        assert!(matches!(
            err,
            Error::Transform {
                operation: "crop",
                ..
            }
        ));

        let op = Operation::Crop {
            x: u32::MAX,
            y: 0,
            width: 2,
            height: 1,
        };
        assert!(RasterCodec.apply(&solid(30, 20), &op).is_err());
    }

    #[test]
    #[cfg(feature = "png")]
    fn test_watermark_draws_overlay() {
        let op = Operation::Watermark {
            overlay: overlay_png(4, 4),
            x: 2,
            y: 3,
        };
        let marked = RasterCodec.apply(&solid(10, 10), &op).unwrap();

        assert_eq!((marked.width(), marked.height()), (10, 10));
        assert_eq!(marked.color(), ColorType::Rgb8);
        let pixels = marked.to_rgb8();
        assert_eq!(pixels.get_pixel(3, 4), &Rgb([0, 0, 255]));
        assert_eq!(pixels.get_pixel(0, 0), &Rgb([10, 10, 10]));
    }

    #[test]
    #[cfg(feature = "png")]
    fn test_watermark_outside_fails() {
        let op = Operation::Watermark {
            overlay: overlay_png(4, 4),
            x: -4,
            y: 0,
        };
        let err = RasterCodec.apply(&solid(10, 10), &op).unwrap_err();
        assert!(matches!(
            err,
            Error::Transform {
                operation: "watermark",
                ..
            }
        ));
    }

    #[test]
    fn test_watermark_unrecognized_overlay_fails() {
        let op = Operation::Watermark {
            overlay: Bytes::from_static(b"not an image"),
            x: 0,
            y: 0,
        };
        let err = RasterCodec.apply(&solid(10, 10), &op).unwrap_err();
        assert!(matches!(
            err,
            Error::Transform {
                operation: "watermark",
                ..
            }
        ));
    }

    #[test]
    #[cfg(feature = "jpeg")]
    fn test_jpeg_encode_drops_alpha() {
        use image::{Rgba, RgbaImage};

        let image = DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 8, Rgba([1, 2, 3, 128])));
        let encoded = RasterCodec.encode(&image, Format::Jpeg).unwrap();
        assert_eq!(Format::detect(&encoded), Some(Format::Jpeg));
    }
}
