//! Monochrome canvas that implements embedded_graphic's DrawTarget.
//!
//! Used by host-side clients to draw a frame and encode it for the wire.

use embedded_graphics::{
    Pixel,
    pixelcolor::BinaryColor,
    draw_target::DrawTarget,
    geometry::{OriginDimensions, Size},
};
use crate::{framebuf::Frame, FRAME_BYTES, NR_COLS, NR_ROWS};

/// One display-sized frame, drawn in the ingest layout.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Canvas(Frame);

impl Canvas {
    pub const fn new() -> Self {
        Canvas(Frame::blank())
    }

    /// Canvas with every pixel set to `on`.
    pub fn filled(on: bool) -> Self {
        let mut canvas = Canvas::new();
        for b in canvas.0.as_bytes_mut() {
            *b = if on { 0xFF } else { 0x00 };
        }
        canvas
    }

    pub fn from_frame(frame: Frame) -> Self {
        Canvas(frame)
    }

    pub fn frame(&self) -> &Frame {
        &self.0
    }

    pub fn pixel(&self, x: usize, y: usize) -> bool {
        self.0 .0[y].pixel(x)
    }

    pub fn set_pixel(&mut self, x: usize, y: usize, on: bool) {
        self.0 .0[y].set_pixel(x, on);
    }

    /// Encode for sending to the display.
    pub fn to_bytes(&self) -> [u8; FRAME_BYTES] {
        let mut bytes = [0u8; FRAME_BYTES];
        bytes.copy_from_slice(self.0.as_bytes());
        bytes
    }
}

impl Default for Canvas {
    fn default() -> Self {
        Self::new()
    }
}

impl OriginDimensions for Canvas {
    fn size(&self) -> Size {
        Size::new(NR_COLS as u32, NR_ROWS as u32)
    }
}

impl DrawTarget for Canvas {
    type Color = BinaryColor;
    type Error = core::convert::Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
        where I: IntoIterator<Item = Pixel<Self::Color>>
    {
        for Pixel(coord, color) in pixels.into_iter() {
            if let Ok(pos) = coord.try_into() {
                let (x, y): (u32, u32) = pos;
                if (x as usize) < NR_COLS && (y as usize) < NR_ROWS {
                    self.set_pixel(x as usize, y as usize, color.is_on());
                }
            }
        }
        Ok(())
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        *self = Canvas::filled(color.is_on());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_graphics::{
        prelude::*,
        primitives::{Line, PrimitiveStyle},
    };

    #[test]
    fn encodes_leftmost_pixel_in_bit_zero() {
        let mut canvas = Canvas::new();
        Pixel(Point::new(0, 0), BinaryColor::On).draw(&mut canvas).ok();
        Pixel(Point::new(63, 5), BinaryColor::On).draw(&mut canvas).ok();
        let bytes = canvas.to_bytes();
        assert_eq!(bytes[0], 0x01);
        assert_eq!(bytes[FRAME_BYTES - 1], 0x80);
        assert_eq!(bytes.iter().filter(|b| **b != 0).count(), 2);
    }

    #[test]
    fn clips_outside_pixels() {
        let mut canvas = Canvas::new();
        Line::new(Point::new(-10, 2), Point::new(100, 2))
            .into_styled(PrimitiveStyle::with_stroke(BinaryColor::On, 1))
            .draw(&mut canvas)
            .ok();
        assert!((0..NR_COLS).all(|x| canvas.pixel(x, 2)));
        assert!((0..NR_COLS).all(|x| !canvas.pixel(x, 1)));
    }

    #[test]
    fn clear_fills_every_byte() {
        let mut canvas = Canvas::new();
        canvas.clear(BinaryColor::On).ok();
        assert!(canvas.to_bytes().iter().all(|b| *b == 0xFF));
        assert_eq!(canvas, Canvas::filled(true));
    }
}
