use std::fmt;

use super::{Color, Image, Resolution};
use crate::error::{Error, Result};

/// Byte order of the three color channels of a [`Frame`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelOrder {
    /// Red, green, blue.
    Rgb,
    /// Blue, green, red. This is what most capture and streaming stacks deliver (`bgr24`).
    Bgr,
}

impl ChannelOrder {
    fn encode(self, color: Color) -> [u8; 3] {
        match self {
            ChannelOrder::Rgb => [color.r(), color.g(), color.b()],
            ChannelOrder::Bgr => [color.b(), color.g(), color.r()],
        }
    }
}

/// A single video frame: packed 3-channel 8-bit pixels plus dimensions and channel order.
///
/// Frames are owned by exactly one pipeline invocation, which annotates them in place.
#[derive(Clone, PartialEq, Eq)]
pub struct Frame {
    res: Resolution,
    order: ChannelOrder,
    data: Vec<u8>,
}

impl Frame {
    /// Wraps packed pixel data.
    ///
    /// Fails with [`Error::DimensionMismatch`] if `data` does not contain exactly 3 bytes per
    /// pixel.
    pub fn new(res: Resolution, order: ChannelOrder, data: Vec<u8>) -> Result<Self> {
        let expected = res.num_pixels() * 3;
        if data.len() != expected {
            return Err(Error::DimensionMismatch {
                expected,
                actual: data.len(),
            });
        }

        Ok(Self { res, order, data })
    }

    /// Creates a frame from a `bgr24` buffer, as delivered by most video transports.
    pub fn from_bgr24(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        Self::new(Resolution::new(width, height), ChannelOrder::Bgr, data)
    }

    /// Creates an RGB frame that takes ownership of `image`'s pixels.
    pub fn from_image(image: Image) -> Self {
        Self {
            res: image.resolution(),
            order: ChannelOrder::Rgb,
            data: image.into_data(),
        }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.res.width()
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.res.height()
    }

    #[inline]
    pub fn resolution(&self) -> Resolution {
        self.res
    }

    #[inline]
    pub fn channel_order(&self) -> ChannelOrder {
        self.order
    }

    /// Returns the raw pixel bytes, in [`Frame::channel_order`].
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// Converts the frame to an RGB [`Image`], swapping channels if necessary.
    ///
    /// The hand detection networks expect RGB input, so this is applied to every frame before
    /// landmark extraction.
    pub fn to_rgb_image(&self) -> Image {
        let mut data = self.data.clone();
        if self.order == ChannelOrder::Bgr {
            for px in data.chunks_exact_mut(3) {
                px.swap(0, 2);
            }
        }

        Image {
            buf: image::RgbImage::from_raw(self.width(), self.height(), data)
                .expect("frame buffer size is validated on construction"),
        }
    }

    /// Converts the frame to an RGB [`Image`], consuming it.
    pub fn into_rgb_image(self) -> Image {
        match self.order {
            ChannelOrder::Rgb => Image {
                buf: image::RgbImage::from_raw(self.width(), self.height(), self.data)
                    .expect("frame buffer size is validated on construction"),
            },
            ChannelOrder::Bgr => self.to_rgb_image(),
        }
    }

    /// Reads the color at `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics if `(x, y)` is out of bounds.
    pub fn get(&self, x: u32, y: u32) -> Color {
        let i = self.offset(x, y);
        let px = &self.data[i..i + 3];
        match self.order {
            ChannelOrder::Rgb => Color::from_rgb8(px[0], px[1], px[2]),
            ChannelOrder::Bgr => Color::from_rgb8(px[2], px[1], px[0]),
        }
    }

    /// Writes `color` to `(x, y)`, converting it to the frame's channel order.
    ///
    /// Writes outside of the frame are ignored.
    pub fn set(&mut self, x: i32, y: i32, color: Color) {
        if x < 0 || y < 0 || x as u32 >= self.width() || y as u32 >= self.height() {
            return;
        }
        let i = self.offset(x as u32, y as u32);
        self.data[i..i + 3].copy_from_slice(&self.order.encode(color));
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        assert!(x < self.width() && y < self.height());
        (y as usize * self.width() as usize + x as usize) * 3
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:?} Frame", self.res, self.order)
    }
}
