//! Image manipulation.
//!
//! This module provides:
//!
//! - The [`Image`] type, an owned RGB image that the hand detection networks consume.
//! - The [`Frame`] type, a camera frame in either RGB or BGR channel order.
//! - [`draw`] functions to annotate frames.
//! - [`Rect`] and [`Resolution`].

pub mod draw;
mod frame;
mod rect;
mod resolution;

use std::{fmt, path::Path};

use embedded_graphics::{pixelcolor::raw::RawU32, prelude::PixelColor};
use image::{ImageBuffer, Rgb, RgbImage};

pub use frame::*;
pub use rect::*;
pub use resolution::*;

use crate::error::{Error, Result};

/// An 8-bit sRGB image without alpha channel.
#[derive(Clone, PartialEq)]
pub struct Image {
    pub(crate) buf: RgbImage,
}

impl Image {
    /// Loads an image from the filesystem.
    ///
    /// The format is determined by the file extension. PNG and JPEG are supported.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::load_impl(path.as_ref())
    }

    fn load_impl(path: &Path) -> Result<Self> {
        let buf = image::open(path)?.to_rgb8();
        Ok(Self { buf })
    }

    /// Creates an image from tightly packed RGB data.
    ///
    /// Fails if `buf` does not contain exactly `3 * width * height` bytes.
    pub fn from_rgb8(res: Resolution, buf: Vec<u8>) -> Result<Self> {
        let expected = res.num_pixels() * 3;
        let actual = buf.len();
        match ImageBuffer::from_vec(res.width(), res.height(), buf) {
            Some(buf) => Ok(Self { buf }),
            None => Err(Error::DimensionMismatch { expected, actual }),
        }
    }

    /// Saves an image to the file system.
    ///
    /// The format is determined by the file extension.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        Ok(self.buf.save(path.as_ref())?)
    }

    /// Creates a black image of a specified size.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            buf: ImageBuffer::new(width, height),
        }
    }

    /// Returns the width of this image, in pixels.
    #[inline]
    pub fn width(&self) -> u32 {
        self.buf.width()
    }

    /// Returns the height of this image, in pixels.
    #[inline]
    pub fn height(&self) -> u32 {
        self.buf.height()
    }

    /// Returns the size of this image.
    #[inline]
    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.width(), self.height())
    }

    /// Returns a [`Rect`] covering this image.
    #[inline]
    pub fn rect(&self) -> Rect {
        self.resolution().rect()
    }

    /// Gets the image color at the given pixel coordinates.
    ///
    /// # Panics
    ///
    /// This will panic if `(x, y)` is outside the bounds of this image.
    pub fn get(&self, x: u32, y: u32) -> Color {
        let Rgb([r, g, b]) = self.buf[(x, y)];
        Color::from_rgb8(r, g, b)
    }

    /// Sets the image color at the given pixel coordinates.
    ///
    /// # Panics
    ///
    /// This will panic if `(x, y)` is outside the bounds of this image.
    pub fn set(&mut self, x: u32, y: u32, color: Color) {
        self.buf[(x, y)] = Rgb(color.0);
    }

    /// Samples the pixel nearest to the (possibly fractional, possibly out-of-bounds) position
    /// `(x, y)`.
    ///
    /// Positions outside of the image read as [`Color::BLACK`], which pads the image when a
    /// network input region extends past its edges.
    pub fn sample(&self, x: f32, y: f32) -> Color {
        let (x, y) = (x.floor(), y.floor());
        if x < 0.0 || y < 0.0 || x >= self.width() as f32 || y >= self.height() as f32 {
            return Color::BLACK;
        }
        self.get(x as u32, y as u32)
    }

    #[inline]
    pub fn data(&self) -> &[u8] {
        self.buf.as_raw()
    }

    pub fn into_data(self) -> Vec<u8> {
        self.buf.into_raw()
    }
}

impl fmt::Debug for Image {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{} Image", self.width(), self.height())
    }
}

/// An 8-bit sRGB color.
#[derive(PartialEq, Eq, Clone, Copy)]
pub struct Color(pub(crate) [u8; 3]);

impl Color {
    pub const BLACK: Self = Self([0, 0, 0]);
    pub const WHITE: Self = Self([255, 255, 255]);
    pub const RED: Self = Self([255, 0, 0]);
    pub const GREEN: Self = Self([0, 255, 0]);
    pub const BLUE: Self = Self([0, 0, 255]);

    #[inline]
    pub const fn from_rgb8(r: u8, g: u8, b: u8) -> Self {
        Self([r, g, b])
    }

    #[inline]
    pub fn r(&self) -> u8 {
        self.0[0]
    }

    #[inline]
    pub fn g(&self) -> u8 {
        self.0[1]
    }

    #[inline]
    pub fn b(&self) -> u8 {
        self.0[2]
    }
}

impl fmt::Debug for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r(), self.g(), self.b())
    }
}

// FIXME leaks `embedded-graphics` dependency
impl PixelColor for Color {
    type Raw = RawU32;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_rgb8_checks_length() {
        let res = Resolution::new(2, 1);
        let image = Image::from_rgb8(res, vec![1, 2, 3, 4, 5, 6]).unwrap();
        assert_eq!(image.get(1, 0), Color::from_rgb8(4, 5, 6));

        match Image::from_rgb8(res, vec![0; 5]) {
            Err(Error::DimensionMismatch { expected, actual }) => {
                assert_eq!(expected, 6);
                assert_eq!(actual, 5);
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn sample_pads_with_black() {
        let mut image = Image::new(2, 2);
        image.set(1, 1, Color::WHITE);
        assert_eq!(image.sample(1.7, 1.2), Color::WHITE);
        assert_eq!(image.sample(-0.5, 0.0), Color::BLACK);
        assert_eq!(image.sample(2.0, 0.0), Color::BLACK);
    }
}
