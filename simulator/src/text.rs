//! Text layout onto strips wider than the display, and the windows used to
//! scroll across them.

use embedded_graphics::{
    mono_font::{ascii::FONT_4X6, MonoTextStyle},
    pixelcolor::BinaryColor,
    prelude::*,
    text::{Baseline, Text},
};
use uartled::{Canvas, NR_COLS, NR_ROWS};

/// Width of one character cell.
const CHAR_WIDTH: usize = 4;

/// Fewest characters in a laid out string, enough to fill the display.
const MIN_CHARS: usize = NR_COLS / CHAR_WIDTH;

/// A display-high monochrome strip of any width.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Banner {
    width: usize,
    pixels: Vec<bool>,
}

impl Banner {
    pub fn new(width: usize) -> Self {
        Banner { width, pixels: vec![false; width * NR_ROWS] }
    }

    /// Lay out `s` in the 4x6 font.
    ///
    /// Short strings are padded with spaces to fill the display, and every
    /// string is padded to an even number of characters so the width is a
    /// whole number of bytes. Characters outside ASCII are drawn as `?`.
    pub fn text(s: &str) -> Self {
        let mut padded: String = s.chars().map(|c| if c.is_ascii_control() { ' ' } else { c }).collect();
        let mut chars = padded.chars().count();
        while chars < MIN_CHARS || chars % 2 == 1 {
            padded.push(' ');
            chars += 1;
        }

        let mut banner = Banner::new(chars * CHAR_WIDTH);
        let style = MonoTextStyle::new(&FONT_4X6, BinaryColor::On);
        Text::with_baseline(&padded, Point::zero(), style, Baseline::Top)
            .draw(&mut banner)
            .ok();
        banner
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn pixel(&self, x: usize, y: usize) -> bool {
        self.pixels[y * self.width + x]
    }

    /// Number of distinct horizontal scroll positions.
    pub fn positions(&self) -> usize {
        self.width().saturating_sub(NR_COLS) + 1
    }

    /// The display-sized window starting at column `x`.
    ///
    /// Columns past the right edge of the banner are blank.
    pub fn window(&self, x: usize) -> Canvas {
        let mut canvas = Canvas::new();
        for y in 0..NR_ROWS {
            for col in 0..NR_COLS {
                if x + col < self.width && self.pixel(x + col, y) {
                    canvas.set_pixel(col, y, true);
                }
            }
        }
        canvas
    }

    /// Every scroll position in order, left to right.
    pub fn windows(&self) -> impl Iterator<Item = Canvas> + '_ {
        (0..self.positions()).map(move |x| self.window(x))
    }
}

impl OriginDimensions for Banner {
    fn size(&self) -> Size {
        Size::new(self.width as u32, NR_ROWS as u32)
    }
}

impl DrawTarget for Banner {
    type Color = BinaryColor;
    type Error = core::convert::Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
        where I: IntoIterator<Item = Pixel<Self::Color>>
    {
        for Pixel(coord, color) in pixels.into_iter() {
            if let Ok(pos) = coord.try_into() {
                let (x, y): (u32, u32) = pos;
                if (x as usize) < self.width && (y as usize) < NR_ROWS {
                    self.pixels[y as usize * self.width + x as usize] = color.is_on();
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_fills_display() {
        let banner = Banner::text("Hi");
        assert_eq!(banner.width(), NR_COLS);
        assert_eq!(banner.positions(), 1);
        assert!((0..NR_ROWS).any(|y| (0..8).any(|x| banner.pixel(x, y))));
        assert!((0..NR_ROWS).all(|y| (8..NR_COLS).all(|x| !banner.pixel(x, y))));
    }

    #[test]
    fn long_text_is_padded_to_whole_bytes() {
        let banner = Banner::text("seventeen chars!!");
        assert_eq!(banner.width(), 18 * CHAR_WIDTH);
        assert_eq!(banner.width() % 8, 0);
        assert_eq!(banner.positions(), 18 * CHAR_WIDTH - NR_COLS + 1);
    }

    #[test]
    fn windows_scroll_one_column_at_a_time() {
        let banner = Banner::text("abcdefghijklmnopqrstuvwxyz");
        let windows: Vec<Canvas> = banner.windows().collect();
        assert_eq!(windows.len(), banner.positions());
        for (x, pair) in windows.windows(2).enumerate() {
            for y in 0..NR_ROWS {
                for col in 0..NR_COLS - 1 {
                    assert_eq!(pair[1].pixel(col, y), pair[0].pixel(col + 1, y), "x={}", x);
                }
            }
        }
        let last = windows.last().unwrap();
        for y in 0..NR_ROWS {
            assert_eq!(last.pixel(NR_COLS - 1, y), banner.pixel(banner.width() - 1, y));
        }
    }

    #[test]
    fn blank_text_is_blank() {
        let banner = Banner::text("");
        assert_eq!(banner.window(0), Canvas::new());
    }
}
