//! Drawing onto [`Frame`]s.
//!
//! Each function returns a guard that can be used to customize the drawn shape. The shape is
//! drawn when the guard is dropped.

use std::convert::Infallible;

use embedded_graphics::{
    draw_target::DrawTarget,
    mono_font::{ascii, MonoFont, MonoTextStyle},
    prelude::*,
    primitives::{PrimitiveStyleBuilder, Rectangle, StrokeAlignment},
    text::{Alignment, Baseline, Text, TextStyleBuilder},
};

use super::{Color, Frame};

/// Guard returned by [`rect`]; draws the rectangle when dropped and allows customization.
pub struct DrawRect<'a> {
    frame: &'a mut Frame,
    corners: [Point; 2],
    color: Color,
    stroke_width: u32,
}

impl DrawRect<'_> {
    /// Sets the rectangle's color.
    pub fn color(&mut self, color: Color) -> &mut Self {
        self.color = color;
        self
    }

    /// Sets the rectangle's stroke width.
    ///
    /// By default, a stroke width of 1 is used. The stroke is centered on the rectangle's edges.
    pub fn stroke_width(&mut self, width: u32) -> &mut Self {
        self.stroke_width = width;
        self
    }
}

impl Drop for DrawRect<'_> {
    fn drop(&mut self) {
        let [a, b] = self.corners;
        let style = PrimitiveStyleBuilder::new()
            .stroke_color(self.color)
            .stroke_width(self.stroke_width)
            .stroke_alignment(StrokeAlignment::Center)
            .build();
        match Rectangle::with_corners(a, b)
            .into_styled(style)
            .draw(&mut Target(self.frame))
        {
            Ok(_) => {}
            Err(infallible) => match infallible {},
        }
    }
}

/// Guard returned by [`text`]; draws the text when dropped and allows customization.
pub struct DrawText<'a> {
    frame: &'a mut Frame,
    x: i32,
    y: i32,
    text: &'a str,
    color: Color,
    font: &'static MonoFont<'static>,
    alignment: Alignment,
    baseline: Baseline,
}

impl<'a> DrawText<'a> {
    /// Sets the text color.
    pub fn color(&mut self, color: Color) -> &mut Self {
        self.color = color;
        self
    }

    /// Sets the font used to render the text.
    pub fn font(&mut self, font: &'static MonoFont<'static>) -> &mut Self {
        self.font = font;
        self
    }

    /// Aligns the bottom of the text with the `y` coordinate.
    pub fn align_bottom(&mut self) -> &mut Self {
        self.baseline = Baseline::Bottom;
        self
    }

    /// Aligns the left side of the text with the `x` coordinate.
    pub fn align_left(&mut self) -> &mut Self {
        self.alignment = Alignment::Left;
        self
    }
}

impl Drop for DrawText<'_> {
    fn drop(&mut self) {
        let character_style = MonoTextStyle::new(self.font, self.color);
        let text_style = TextStyleBuilder::new()
            .alignment(self.alignment)
            .baseline(self.baseline)
            .build();
        match Text::with_text_style(
            self.text,
            Point::new(self.x, self.y),
            character_style,
            text_style,
        )
        .draw(&mut Target(self.frame))
        {
            Ok(_) => {}
            Err(infallible) => match infallible {},
        }
    }
}

/// Draws the outline of the rectangle spanned by two opposite corners.
pub fn rect(frame: &mut Frame, x1: i32, y1: i32, x2: i32, y2: i32) -> DrawRect<'_> {
    DrawRect {
        frame,
        corners: [Point::new(x1, y1), Point::new(x2, y2)],
        color: Color::RED,
        stroke_width: 1,
    }
}

/// Draws a text string onto a frame.
///
/// By default, the text is drawn centered horizontally and vertically around `x` and `y`.
pub fn text<'a>(frame: &'a mut Frame, x: i32, y: i32, text: &'a str) -> DrawText<'a> {
    DrawText {
        frame,
        x,
        y,
        text,
        color: Color::RED,
        font: &ascii::FONT_6X10,
        alignment: Alignment::Center,
        baseline: Baseline::Middle,
    }
}

struct Target<'a>(&'a mut Frame);

impl Dimensions for Target<'_> {
    fn bounding_box(&self) -> Rectangle {
        Rectangle {
            top_left: Point { x: 0, y: 0 },
            size: Size {
                width: self.0.width(),
                height: self.0.height(),
            },
        }
    }
}

impl DrawTarget for Target<'_> {
    type Color = Color;

    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            self.0.set(point.x, point.y, color);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::Resolution;
    use crate::image::ChannelOrder;

    fn blank(w: u32, h: u32) -> Frame {
        Frame::new(
            Resolution::new(w, h),
            ChannelOrder::Rgb,
            vec![0; (w * h * 3) as usize],
        )
        .unwrap()
    }

    #[test]
    fn rect_outline() {
        let mut frame = blank(10, 10);
        rect(&mut frame, 2, 2, 7, 7).color(Color::BLUE);

        assert_eq!(frame.get(2, 2), Color::BLUE);
        assert_eq!(frame.get(7, 7), Color::BLUE);
        assert_eq!(frame.get(2, 5), Color::BLUE);
        // interior and exterior untouched
        assert_eq!(frame.get(4, 4), Color::BLACK);
        assert_eq!(frame.get(0, 0), Color::BLACK);
    }

    #[test]
    fn drawing_is_clipped() {
        let mut frame = blank(4, 4);
        rect(&mut frame, -10, -10, 20, 20).stroke_width(3);
        text(&mut frame, -50, -50, "clipped").align_left();
        assert!(frame.data().iter().all(|&b| b == 0));
    }

    #[test]
    fn text_renders_pixels() {
        let mut frame = blank(40, 20);
        text(&mut frame, 2, 18, "B")
            .color(Color::WHITE)
            .font(&ascii::FONT_10X20)
            .align_left()
            .align_bottom();
        assert!(frame.data().iter().any(|&b| b == 255));
    }
}
