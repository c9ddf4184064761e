use image::{GrayImage, Rgb, RgbImage};

use crate::{Error, Result};

/// One captured frame, RGB8. Immutable once constructed; the pipeline only
/// ever borrows it.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    data: RgbImage,
}

impl Frame {
    /// Build a frame from a caller-supplied raw buffer.
    ///
    /// The declared dimensions must match the buffer length exactly; a
    /// mismatch is a caller contract violation and the only fatal error at
    /// this layer. Single-channel buffers are accepted and replicated to RGB.
    pub fn from_raw(width: u32, height: u32, channels: u8, buf: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize * channels as usize;
        if buf.len() != expected {
            return Err(Error::BufferMismatch(format!(
                "declared {}x{}x{} = {} bytes, buffer holds {}",
                width,
                height,
                channels,
                expected,
                buf.len()
            )));
        }

        match channels {
            3 => {
                let data = RgbImage::from_raw(width, height, buf).ok_or_else(|| {
                    Error::BufferMismatch("buffer rejected by image container".into())
                })?;
                Ok(Self { data })
            }
            1 => {
                let mut rgb = Vec::with_capacity(buf.len() * 3);
                for v in buf {
                    rgb.extend_from_slice(&[v, v, v]);
                }
                let data = RgbImage::from_raw(width, height, rgb).ok_or_else(|| {
                    Error::BufferMismatch("buffer rejected by image container".into())
                })?;
                Ok(Self { data })
            }
            c => Err(Error::DimensionMismatch(format!(
                "unsupported channel count {c}, expected 1 or 3"
            ))),
        }
    }

    pub fn from_rgb(data: RgbImage) -> Self {
        Self { data }
    }

    pub fn from_gray(gray: GrayImage) -> Self {
        let mut data = RgbImage::new(gray.width(), gray.height());
        for (x, y, p) in gray.enumerate_pixels() {
            data.put_pixel(x, y, Rgb([p[0], p[0], p[0]]));
        }
        Self { data }
    }

    pub fn width(&self) -> u32 {
        self.data.width()
    }

    pub fn height(&self) -> u32 {
        self.data.height()
    }

    pub fn as_rgb(&self) -> &RgbImage {
        &self.data
    }

    pub fn into_rgb(self) -> RgbImage {
        self.data
    }

    pub fn to_gray(&self) -> GrayImage {
        image::imageops::colorops::grayscale(&self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_raw_accepts_matching_rgb_buffer() {
        let frame = Frame::from_raw(4, 3, 3, vec![0u8; 36]).unwrap();
        assert_eq!(frame.width(), 4);
        assert_eq!(frame.height(), 3);
    }

    #[test]
    fn from_raw_rejects_short_buffer() {
        let err = Frame::from_raw(4, 3, 3, vec![0u8; 35]).unwrap_err();
        assert!(matches!(err, Error::BufferMismatch(_)));
    }

    #[test]
    fn from_raw_expands_single_channel() {
        let frame = Frame::from_raw(2, 2, 1, vec![10, 20, 30, 40]).unwrap();
        assert_eq!(frame.as_rgb().get_pixel(1, 0).0, [20, 20, 20]);
    }

    #[test]
    fn gray_round_trip_preserves_dimensions() {
        let frame = Frame::from_raw(5, 7, 1, vec![128u8; 35]).unwrap();
        let gray = frame.to_gray();
        assert_eq!((gray.width(), gray.height()), (5, 7));
    }
}
