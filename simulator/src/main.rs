//! Host client for the UART LED display.
//!
//! Lays out text, builds scrolling and row-shift sequences, and sends the
//! frames either to the board's serial port or to a virtual board running the
//! same refresh engine as the firmware.

mod board;
mod sequence;
mod text;

use std::{
    fs::{File, OpenOptions},
    io::{self, BufRead, Write},
    path::PathBuf,
    thread,
    time::Duration,
};
use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use uartled::{Display, Revision, BAUD_RATE, FRAME_BYTES, REV1, REV2};
use crate::{board::VirtualBoard, sequence::{Sequencer, Step, Timing}, text::Banner};

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Rev {
    Rev1,
    Rev2,
}

impl Rev {
    fn table(self) -> &'static Revision {
        match self {
            Rev::Rev1 => &REV1,
            Rev::Rev2 => &REV2,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "uartled", about = "Write text to the 6x64 UART LED display", version)]
struct Cli {
    /// Turn all 384 LEDs on
    #[arg(long)]
    all_on: bool,

    /// Serial port, which must already be set up for 38400 8N1 (for example with stty)
    #[arg(long, default_value = "/dev/ttyUSB0")]
    port: PathBuf,

    /// Draw a virtual board in the terminal instead of using the serial port
    #[arg(long)]
    simulate: bool,

    /// Board revision to simulate
    #[arg(long, value_enum, default_value_t = Rev::Rev2)]
    revision: Rev,

    /// Don't scroll horizontally, truncate
    #[arg(long)]
    truncate: bool,

    /// Shift in from a blank display at start
    #[arg(long)]
    row_shift_in: bool,

    /// Shift out to a blank display at end
    #[arg(long)]
    row_shift_out: bool,

    /// How long to wait after row-shifting out
    #[arg(long, default_value_t = 1.0, value_name = "SECS")]
    row_out_hold: f64,

    /// How long to pause after row-shifting in text that then scrolls
    #[arg(long, default_value_t = 1.0, value_name = "SECS")]
    row_in_hold: f64,

    /// How long to leave each string up
    #[arg(long, default_value_t = 0.0, value_name = "SECS")]
    hold_time: f64,

    /// Time between each individual row shift
    #[arg(long, default_value_t = 0.05, value_name = "SECS")]
    row_shift: f64,

    /// Time between each column shift
    #[arg(long, default_value_t = 0.01, value_name = "SECS")]
    col_shift: f64,

    /// Run test patterns forever
    #[arg(long)]
    test_pattern: bool,

    /// Strings to write to the display (stdin if none)
    strings: Vec<String>,
}

/// Where frames go.
enum Output<'a> {
    Port(File),
    Board(VirtualBoard<'a>),
}

impl<'a> Output<'a> {
    fn send(&mut self, step: &Step) -> Result<()> {
        let bytes = step.canvas.to_bytes();
        match self {
            Output::Port(port) => {
                port.write_all(&bytes).context("writing frame to serial port")?;
                port.flush().context("flushing serial port")?;
            },
            Output::Board(board) => {
                board.receive(&bytes)?;
                let mut stdout = io::stdout().lock();
                write!(stdout, "\x1b[2J\x1b[H{}", board.render())?;
                stdout.flush()?;
                // Pace as the real UART would.
                thread::sleep(frame_time());
            },
        }
        thread::sleep(step.hold);
        Ok(())
    }

    fn send_all(&mut self, steps: &[Step]) -> Result<()> {
        steps.iter().try_for_each(|step| self.send(step))
    }
}

/// Time to send one frame at 10 bits per byte.
fn frame_time() -> Duration {
    Duration::from_micros((FRAME_BYTES * 10) as u64 * 1_000_000 / BAUD_RATE as u64)
}

fn secs(s: f64) -> Result<Duration> {
    if !s.is_finite() || s < 0.0 {
        bail!("invalid time {}", s);
    }
    Ok(Duration::from_secs_f64(s))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut display = Display::new();
    let mut output = if cli.simulate {
        Output::Board(VirtualBoard::new(&mut display, cli.revision.table())?)
    } else {
        let port = OpenOptions::new().write(true).open(&cli.port)
            .with_context(|| format!("opening {}", cli.port.display()))?;
        Output::Port(port)
    };

    if cli.all_on {
        return output.send(&sequence::all_on());
    }

    if cli.test_pattern {
        let steps = sequence::test_pattern();
        loop {
            output.send_all(&steps)?;
        }
    }

    let timing = Timing {
        row_shift: secs(cli.row_shift)?,
        col_shift: secs(cli.col_shift)?,
        scroll_hold: secs(cli.row_in_hold)?,
    };
    let hold = secs(cli.hold_time)?;
    let mut seq = Sequencer::new(timing, cli.truncate);

    if cli.row_shift_in {
        output.send_all(&seq.blank())?;
    }

    if cli.strings.is_empty() {
        for line in io::stdin().lock().lines() {
            let line = line.context("reading stdin")?;
            output.send_all(&seq.show(&Banner::text(line.trim_end())))?;
            thread::sleep(hold);
        }
    } else {
        for s in &cli.strings {
            output.send_all(&seq.show(&Banner::text(s)))?;
            thread::sleep(hold);
        }
    }

    if cli.row_shift_out {
        output.send_all(&seq.blank())?;
        thread::sleep(secs(cli.row_out_hold)?);
    }

    if let Output::Board(board) = &output {
        eprintln!("{} frames received, at most {} rows lit at once",
                  board.frames(), board.max_rows_on());
    }

    Ok(())
}
