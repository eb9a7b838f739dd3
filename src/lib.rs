//! Refresh engine for the UART-fed 6x64 LED row-scan display.
//!
//! The display is six rows of 64 monochrome LEDs. Column data for one row at a
//! time is shifted into a chain of shift registers, latched, and the row's
//! driver FET is switched on; the next timer tick moves on to the next row.
//! New frames arrive as raw bytes over a UART into a staging buffer and are
//! swapped in once complete.
//!
//! The crate is hardware-independent: the [`periph`] traits describe what it
//! needs from the GPIO, SPI, DMA and UART drivers, which the firmware crate
//! provides for the STM32F030 and the simulator provides for a virtual board.
#![cfg_attr(not(test), no_std)]

mod canvas;
mod framebuf;
mod ingest;
pub mod periph;
mod revision;
mod scan;
mod transform;

pub use canvas::Canvas;
pub use framebuf::{BufferId, Frame, FrameBuffers, Role, Row};
pub use ingest::{FramePump, PumpEvent, RxNotify};
pub use revision::{BitOrder, ClockSource, PinId, Port, Revision, REV1, REV2};
pub use scan::{
    Display, Fault, Latcher, Limits, Peripherals, ScanState, Scanner, TickOutcome,
    DRAIN_SPINS, OVERRUN_SPINS,
};
pub use transform::{restore_row, transform_row, ByteMap};

/// Number of physical rows, each with its own driver FET.
pub const NR_ROWS: usize = 6;

/// Number of LED columns per row.
pub const NR_COLS: usize = 64;

/// Bytes of column data per row.
pub const ROW_BYTES: usize = NR_COLS / 8;

/// Bytes in one frame on the wire.
pub const FRAME_BYTES: usize = NR_ROWS * ROW_BYTES;

/// Full-frame refresh rate; each row is serviced `REFRESH_HZ` times per second.
pub const REFRESH_HZ: u32 = 100;

/// Row timer tick rate.
pub const TICK_HZ: u32 = REFRESH_HZ * NR_ROWS as u32;

/// UART rate of the frame ingest stream.
pub const BAUD_RATE: u32 = 38_400;

// Rows are sent as whole bytes.
const _: () = assert!(NR_COLS % 8 == 0);
