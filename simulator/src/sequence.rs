//! Frame sequences: scrolling text, row-shift transitions and test patterns.

use std::time::Duration;
use uartled::{Canvas, Frame, NR_COLS, NR_ROWS};
use crate::text::Banner;

/// One frame to send, and how long to leave it up before the next.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Step {
    pub canvas: Canvas,
    pub hold: Duration,
}

/// Delays between frames.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Timing {
    /// Between each step of a row shift.
    pub row_shift: Duration,
    /// Between each column of a scroll.
    pub col_shift: Duration,
    /// After shifting in text that will then scroll.
    pub scroll_hold: Duration,
}

/// Transition from `last` to `now`, one row at a time.
///
/// Rows move up: each step drops the top row of what is showing and brings
/// in the next row of `now` at the bottom. The final step is `now` itself.
pub fn row_shift(last: &Canvas, now: &Canvas) -> Vec<Canvas> {
    let (last, now) = (last.frame(), now.frame());
    (1..=NR_ROWS).map(|step| {
        let mut frame = Frame::blank();
        for (i, row) in frame.0.iter_mut().enumerate() {
            let src = i + step;
            *row = if src < NR_ROWS { last.0[src] } else { now.0[src - NR_ROWS] };
        }
        Canvas::from_frame(frame)
    }).collect()
}

/// Tracks what is on the display and builds the steps to show the next thing.
pub struct Sequencer {
    timing: Timing,
    truncate: bool,
    last: Option<Canvas>,
}

impl Sequencer {
    /// If `truncate` is set, text wider than the display is cut off rather than scrolled.
    pub fn new(timing: Timing, truncate: bool) -> Self {
        Sequencer { timing, truncate, last: None }
    }

    /// Steps to bring `banner` onto the display and scroll across it.
    ///
    /// If something is already showing, the first window is row-shifted in.
    pub fn show(&mut self, banner: &Banner) -> Vec<Step> {
        let positions = if self.truncate { 1 } else { banner.positions() };
        let mut steps = Vec::new();

        for (x, now) in banner.windows().take(positions).enumerate() {
            match (x, self.last) {
                (0, Some(last)) => {
                    steps.extend(row_shift(&last, &now).into_iter()
                        .map(|canvas| Step { canvas, hold: self.timing.row_shift }));
                    if positions > 1 {
                        if let Some(step) = steps.last_mut() {
                            step.hold += self.timing.scroll_hold;
                        }
                    }
                },
                _ => steps.push(Step { canvas: now, hold: self.timing.col_shift }),
            }
            self.last = Some(now);
        }

        steps
    }

    /// Steps to clear the display, row-shifting out whatever was showing.
    pub fn blank(&mut self) -> Vec<Step> {
        self.show(&Banner::new(NR_COLS))
    }
}

/// One cycle of the test pattern: each row lit in turn, then each column.
pub fn test_pattern() -> Vec<Step> {
    let rows = (0..NR_ROWS).map(|y| {
        let mut canvas = Canvas::new();
        for x in 0..NR_COLS {
            canvas.set_pixel(x, y, true);
        }
        Step { canvas, hold: Duration::from_millis(100) }
    });
    let cols = (0..NR_COLS).map(|x| {
        let mut canvas = Canvas::new();
        for y in 0..NR_ROWS {
            canvas.set_pixel(x, y, true);
        }
        Step { canvas, hold: Duration::from_millis(50) }
    });
    rows.chain(cols).collect()
}

/// Every LED on.
pub fn all_on() -> Step {
    Step { canvas: Canvas::filled(true), hold: Duration::ZERO }
}
