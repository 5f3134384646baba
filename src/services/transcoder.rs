use image::codecs::jpeg::JpegEncoder;
use image::ImageError;

/// Decodes any supported raster image and re-encodes it as RGB JPEG.
#[derive(Debug, Clone, Copy)]
pub struct Transcoder {
    quality: u8,
}

impl Transcoder {
    pub fn new(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
        }
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }

    /// Alpha is dropped, not blended; the output is always JPEG.
    pub fn transcode(&self, bytes: &[u8]) -> Result<Vec<u8>, TranscodeError> {
        let decoded = image::load_from_memory(bytes).map_err(TranscodeError::Decode)?;
        let rgb = decoded.to_rgb8();

        let mut output = Vec::new();
        JpegEncoder::new_with_quality(&mut output, self.quality)
            .encode_image(&rgb)
            .map_err(TranscodeError::Encode)?;

        Ok(output)
    }
}

impl Default for Transcoder {
    fn default() -> Self {
        Self::new(50)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TranscodeError {
    #[error("Bytes are not a recognized image: {0}")]
    Decode(#[source] ImageError),

    #[error("JPEG encoding failed: {0}")]
    Encode(#[source] ImageError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    fn rgba_png(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x * 8) as u8, (y * 8) as u8, 128, if x % 2 == 0 { 255 } else { 0 }])
        });
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    #[test]
    fn test_png_with_alpha_becomes_rgb_jpeg() {
        let transcoder = Transcoder::default();
        let output = transcoder.transcode(&rgba_png(16, 12)).unwrap();

        assert_eq!(image::guess_format(&output).unwrap(), ImageFormat::Jpeg);
        let decoded = image::load_from_memory(&output).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (16, 12));
        assert_eq!(decoded.color(), image::ColorType::Rgb8);
    }

    #[test]
    fn test_output_is_deterministic() {
        let transcoder = Transcoder::new(50);
        let input = rgba_png(8, 8);
        assert_eq!(
            transcoder.transcode(&input).unwrap(),
            transcoder.transcode(&input).unwrap()
        );
    }

    #[test]
    fn test_garbage_bytes_fail_to_decode() {
        let err = Transcoder::default()
            .transcode(b"<html>not an image</html>")
            .unwrap_err();
        assert!(matches!(err, TranscodeError::Decode(_)));
    }

    #[test]
    fn test_quality_is_clamped() {
        assert_eq!(Transcoder::new(0).quality(), 1);
        assert_eq!(Transcoder::new(255).quality(), 100);
    }
}
