//! Snapshot images
//!
//! RGBA8 pixel buffers with PNG and PNM encoding and the precision metric
//! used to compare a snapshot against its reference.

use std::io::{self, Write};
use std::path::Path;

use image::{ImageFormat, RgbaImage};

use crate::utils::ImageError;

/// Captured or reference image, always RGBA8
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    pixels: RgbaImage,
}

impl Image {
    /// Channels compared between images
    pub const CHANNELS: u32 = 4;

    /// Transparent black image
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            pixels: RgbaImage::new(width, height),
        }
    }

    /// Wrap a raw row-major RGBA8 buffer
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Result<Self, ImageError> {
        let expected = width as usize * height as usize * Self::CHANNELS as usize;
        let actual = data.len();
        RgbaImage::from_raw(width, height, data)
            .map(|pixels| Self { pixels })
            .ok_or(ImageError::BufferSize {
                width,
                height,
                expected,
                actual,
            })
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Raw RGBA8 bytes
    pub fn as_rgba(&self) -> &[u8] {
        self.pixels.as_raw()
    }

    /// Pixel at (x, y) as `[r, g, b, a]`
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        self.pixels.get_pixel(x, y).0
    }

    /// Load a PNG file
    pub fn read_png<P: AsRef<Path>>(path: P) -> Result<Self, ImageError> {
        let decoded = image::open(path.as_ref())?;
        Ok(Self {
            pixels: decoded.to_rgba8(),
        })
    }

    /// Write a PNG file
    pub fn write_png<P: AsRef<Path>>(&self, path: P) -> Result<(), ImageError> {
        self.pixels
            .save_with_format(path.as_ref(), ImageFormat::Png)?;
        Ok(())
    }

    /// Write a binary PNM (P6) with `comment` on its own header line
    ///
    /// Alpha is dropped; PNM carries RGB only.
    pub fn write_pnm(&self, out: &mut dyn Write, comment: &str) -> io::Result<()> {
        write!(
            out,
            "P6\n#{}\n{} {}\n255\n",
            comment,
            self.width(),
            self.height()
        )?;
        let mut rgb = Vec::with_capacity(self.width() as usize * self.height() as usize * 3);
        for pixel in self.pixels.pixels() {
            rgb.extend_from_slice(&pixel.0[..3]);
        }
        out.write_all(&rgb)
    }

    /// Average precision, in bits, of this image against `reference`
    ///
    /// Identical images yield the maximum value for their size. Images with
    /// different dimensions (or no pixels) yield 0.0.
    pub fn compare(&self, reference: &Image) -> f64 {
        if self.width() != reference.width()
            || self.height() != reference.height()
            || self.width() == 0
            || self.height() == 0
        {
            return 0.0;
        }

        let error: u64 = self
            .as_rgba()
            .iter()
            .zip(reference.as_rgba())
            .map(|(&a, &b)| {
                let delta = a as i64 - b as i64;
                (delta * delta) as u64
            })
            .sum();

        let numerator = error as f64 * 2.0 + 1.0;
        let denominator = self.width() as f64
            * self.height() as f64
            * Self::CHANNELS as f64
            * 255.0
            * 255.0
            * 2.0;

        -(numerator / denominator).log2()
    }
}

impl From<RgbaImage> for Image {
    fn from(pixels: RgbaImage) -> Self {
        Self { pixels }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn checker(width: u32, height: u32) -> Image {
        let mut data = Vec::new();
        for y in 0..height {
            for x in 0..width {
                let v = if (x + y) % 2 == 0 { 255 } else { 0 };
                data.extend_from_slice(&[v, v / 2, 0, 255]);
            }
        }
        Image::from_rgba(width, height, data).unwrap()
    }

    #[test]
    fn test_from_rgba_size_mismatch() {
        let err = Image::from_rgba(2, 2, vec![0; 15]).unwrap_err();
        assert!(matches!(
            err,
            ImageError::BufferSize {
                expected: 16,
                actual: 15,
                ..
            }
        ));
    }

    #[test]
    fn test_compare_self_is_maximum() {
        let image = checker(8, 8);
        let best = image.compare(&image.clone());
        // -log2(1 / (8*8*4*255*255*2))
        let expected = (8.0f64 * 8.0 * 4.0 * 255.0 * 255.0 * 2.0).log2();
        assert!((best - expected).abs() < 1e-9);

        let mut data = image.as_rgba().to_vec();
        data[0] = data[0].wrapping_add(40);
        let altered = Image::from_rgba(8, 8, data).unwrap();
        assert!(altered.compare(&image) < best);
    }

    #[test]
    fn test_compare_dimension_mismatch() {
        assert_eq!(checker(4, 4).compare(&checker(4, 5)), 0.0);
        assert_eq!(Image::new(0, 0).compare(&Image::new(0, 0)), 0.0);
    }

    #[test]
    fn test_png_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("snap.png");
        let image = checker(5, 3);
        image.write_png(&path).unwrap();
        assert_eq!(Image::read_png(&path).unwrap(), image);
    }

    #[test]
    fn test_read_png_missing() {
        assert!(Image::read_png("/nonexistent/ref.png").is_err());
    }

    #[test]
    fn test_pnm_header() {
        let image = checker(2, 1);
        let mut out = Vec::new();
        image.write_pnm(&mut out, "12").unwrap();
        let header = b"P6\n#12\n2 1\n255\n";
        assert_eq!(&out[..header.len()], header);
        assert_eq!(&out[header.len()..], &[255, 127, 0, 0, 0, 0]);
    }
}
