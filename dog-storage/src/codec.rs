use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::GenericImageView;

use crate::{ImageCodec, StorageError, StorageResult};

/// `ImageCodec` backed by the `image` crate
#[derive(Debug, Clone, Copy)]
pub struct JpegThumbnailCodec {
    filter: FilterType,
}

impl Default for JpegThumbnailCodec {
    fn default() -> Self {
        Self {
            filter: FilterType::Lanczos3,
        }
    }
}

impl JpegThumbnailCodec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filter(mut self, filter: FilterType) -> Self {
        self.filter = filter;
        self
    }
}

impl ImageCodec for JpegThumbnailCodec {
    fn thumbnail(&self, source: &[u8], width: u32, height: u32, quality: u8) -> StorageResult<Bytes> {
        if width == 0 || height == 0 {
            return Err(StorageError::codec(format!(
                "thumbnail box must be non-empty, got {}x{}",
                width, height
            )));
        }

        let image = image::load_from_memory(source).map_err(|e| StorageError::codec(e.to_string()))?;

        // Never upsize: each side is capped at the source's own size.
        let (source_width, source_height) = image.dimensions();
        let target = (width.min(source_width), height.min(source_height));
        let image = if target == (source_width, source_height) {
            image
        } else {
            image.resize_exact(target.0, target.1, self.filter)
        };

        let rgb = image.to_rgb8();
        let mut out = Vec::new();
        JpegEncoder::new_with_quality(&mut out, quality.clamp(1, 100))
            .encode_image(&rgb)
            .map_err(|e| StorageError::codec(e.to_string()))?;

        Ok(Bytes::from(out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([200, 40, 40])));
        let mut out = Vec::new();
        image.write_to(&mut Cursor::new(&mut out), ImageFormat::Png).unwrap();
        out
    }

    fn decoded(bytes: &[u8]) -> (ImageFormat, (u32, u32)) {
        let format = image::guess_format(bytes).unwrap();
        let image = image::load_from_memory(bytes).unwrap();
        (format, image.dimensions())
    }

    #[test]
    fn scales_down_to_box() {
        let out = JpegThumbnailCodec::new().thumbnail(&png(800, 1200), 230, 335, 100).unwrap();
        assert_eq!(decoded(&out), (ImageFormat::Jpeg, (230, 335)));
    }

    #[test]
    fn never_upsizes() {
        let out = JpegThumbnailCodec::new().thumbnail(&png(100, 50), 230, 335, 100).unwrap();
        assert_eq!(decoded(&out), (ImageFormat::Jpeg, (100, 50)));

        let out = JpegThumbnailCodec::new().thumbnail(&png(400, 100), 230, 335, 90).unwrap();
        assert_eq!(decoded(&out).1, (230, 100));
    }

    #[test]
    fn rejects_garbage_and_empty_box() {
        let codec = JpegThumbnailCodec::new();
        assert!(matches!(
            codec.thumbnail(b"not an image", 230, 335, 100),
            Err(StorageError::Codec { .. })
        ));
        assert!(matches!(
            codec.thumbnail(&png(10, 10), 0, 335, 100),
            Err(StorageError::Codec { .. })
        ));
    }
}
