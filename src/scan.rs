//! Row scan state machine.
//!
//! # Concept of operation
//!
//! The display has one driver FET per row and a chain of shift registers
//! holding the column data for whichever row is lit. A periodic timer tick
//! selects the next row and starts a DMA transfer of that row's bytes from the
//! active frame buffer into the SPI peripheral, which clocks them into the
//! shift registers. The shift register outputs only change when the latch
//! line is pulsed, so the previous row stays lit while the next one is loaded.
//!
//! When the DMA has handed its last byte to the SPI peripheral, the
//! transmit-complete interrupt fires. At this point the SPI FIFO may still be
//! holding two or three bytes, so the interrupt:
//!
//! 1. Switches off the previously lit row. The FET takes a while to turn off,
//!    so this is issued first to overlap with the wait below.
//! 2. Waits for the SPI FIFO to empty and the bus to go idle.
//! 3. Pulses the latch to present the new column data.
//! 4. Switches on the newly loaded row.
//!
//! This is break-before-make: two rows are never driven at once, since they
//! share the LED supply rail.
//!
//! # Driver operations sequence
//!
//! 1. Call [`Display::split()`] once, handing each context its handle.
//! 2. Timer tick fires, call [`Scanner::on_tick()`]
//!     * If the previous row is still in flight, wait for it (bounded) and count
//!       an overrun. If it still hasn't finished, skip this tick entirely.
//!     * Apply a pending buffer swap requested by the [`crate::FramePump`].
//!     * Advance the cursor and start the DMA transfer for the new row.
//! 3. Transmit-complete fires, call [`Latcher::on_transmit_complete()`]
//!     * Performs the four steps above.
//! 4. Repeat from 2.
//!
//! The transmit-complete interrupt must have a higher priority than the timer
//! tick, so that it can preempt the overrun wait, and the receive-complete
//! interrupt should have the lowest priority of the three.

use portable_atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};
use crate::{
    framebuf::{BufferId, Frame, FrameBuffers, Role},
    ingest::{FramePump, RxNotify},
    periph::{Latch, RowDrivers, ShiftBus, ShiftOut, StreamIn},
    revision::Revision,
    NR_ROWS,
};

/// Default limit for the overrun wait in the timer tick.
pub const OVERRUN_SPINS: u32 = 2_000;

/// Default limit for the bus drain wait in the transmit-complete interrupt.
///
/// At 1.5MHz SPI clock, the three bytes left in the FIFO take 16µs to send.
pub const DRAIN_SPINS: u32 = 2_000;

/// Iteration limits for the two busy-waits.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Limits {
    pub overrun_spins: u32,
    pub drain_spins: u32,
}

impl Limits {
    pub const DEFAULT: Limits = Limits { overrun_spins: OVERRUN_SPINS, drain_spins: DRAIN_SPINS };
}

impl Default for Limits {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Where the scan is up to.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ScanState {
    /// No tick has been serviced yet.
    Idle,
    /// Row data is being transmitted into the shift registers.
    Loading(u8),
    /// Transmit handed over, waiting for the bus to drain before latching.
    Settling(u8),
    /// Row is latched and lit, ready for the next tick.
    Displaying(u8),
}

impl ScanState {
    fn encode(self) -> u8 {
        match self {
            ScanState::Idle          => 0,
            ScanState::Loading(r)    => 0x10 | r,
            ScanState::Settling(r)   => 0x20 | r,
            ScanState::Displaying(r) => 0x30 | r,
        }
    }

    fn decode(v: u8) -> Self {
        let r = v & 0x0F;
        match v >> 4 {
            1 => ScanState::Loading(r),
            2 => ScanState::Settling(r),
            3 => ScanState::Displaying(r),
            _ => ScanState::Idle,
        }
    }
}

/// Fatal conditions detected in interrupt context.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Fault {
    /// The SPI bus never drained after transmitting `row`.
    ///
    /// All row drivers have been switched off. There is no way to recover
    /// in place; the board should be reset.
    BusStall { row: u8 },
}

/// Result of servicing one timer tick.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// Transmission of `row` was started, after applying a buffer swap if `swapped`.
    Started { row: u8, swapped: bool },
    /// The previous row was still in flight; nothing was started.
    Missed,
}

/// Peripherals handed to [`Display::split()`].
pub struct Peripherals<T, R, L, B, S> {
    pub shift_out: T,
    pub rows: R,
    pub latch: L,
    pub bus: B,
    pub stream_in: S,
}

/// State shared between the scan interrupts and the ingest side.
///
/// Every field crossing an interrupt boundary is a single atomic word.
pub struct Display {
    pub(crate) buffers: FrameBuffers,
    state: AtomicU8,
    pub(crate) overruns: AtomicU32,
    pub(crate) frame_ready: AtomicBool,
    pub(crate) swap_requested: AtomicBool,
}

impl Display {
    pub const fn new() -> Self {
        Display {
            buffers: FrameBuffers::new(),
            state: AtomicU8::new(0),
            overruns: AtomicU32::new(0),
            frame_ready: AtomicBool::new(false),
            swap_requested: AtomicBool::new(false),
        }
    }

    /// Split into one handle per execution context.
    ///
    /// * [`Scanner`]: timer tick interrupt.
    /// * [`Latcher`]: shift register transmit-complete interrupt.
    /// * [`RxNotify`]: ingest receive-complete interrupt.
    /// * [`FramePump`]: background loop.
    #[allow(clippy::type_complexity)]
    pub fn split<'a, T, R, L, B, S>(
        &'a mut self,
        rev: &'a Revision,
        limits: Limits,
        periph: Peripherals<T, R, L, B, S>,
    ) -> (Scanner<'a, T>, Latcher<'a, R, L, B>, RxNotify<'a>, FramePump<'a, S>)
        where T: ShiftOut, R: RowDrivers, L: Latch, B: ShiftBus, S: StreamIn
    {
        let display: &'a Display = self;
        (
            Scanner { display, shift_out: periph.shift_out, limits, cursor: None },
            Latcher {
                display, rows: periph.rows, latch: periph.latch, bus: periph.bus,
                limits, lit: None,
            },
            RxNotify::new(display),
            FramePump::new(display, rev, periph.stream_in),
        )
    }

    pub(crate) fn state(&self) -> ScanState {
        ScanState::decode(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: ScanState) {
        self.state.store(state.encode(), Ordering::Release);
    }

    fn in_flight(&self) -> bool {
        matches!(self.state(), ScanState::Loading(_))
    }
}

impl Default for Display {
    fn default() -> Self {
        Self::new()
    }
}

/// Timer tick handle: owns the scan cursor and the transmit DMA.
pub struct Scanner<'a, T> {
    display: &'a Display,
    shift_out: T,
    limits: Limits,
    cursor: Option<u8>,
}

impl<'a, T: ShiftOut> Scanner<'a, T> {
    /// Call from the row timer ISR.
    pub fn on_tick(&mut self) -> TickOutcome {
        // The previous row should have been latched long before the next tick.
        // If not, wait for the transmit-complete ISR (which preempts us) to
        // finish it rather than clobbering a row that is mid-transfer.
        if self.display.in_flight() {
            self.display.overruns.fetch_add(1, Ordering::Relaxed);
            let mut spins = 0;
            while self.display.in_flight() {
                if spins == self.limits.overrun_spins {
                    return TickOutcome::Missed;
                }
                spins += 1;
                core::hint::spin_loop();
            }
        }

        // Nothing is reading the active buffer now, so this is the one point
        // where the roles may change.
        let swapped = self.display.swap_requested.load(Ordering::Acquire);
        if swapped {
            self.display.buffers.swap_roles();
            self.display.swap_requested.store(false, Ordering::Release);
        }

        let row = match self.cursor {
            None    => 0,
            Some(r) => (r + 1) % NR_ROWS as u8,
        };
        self.cursor = Some(row);

        // Publish the new state before the transfer can possibly complete.
        self.display.set_state(ScanState::Loading(row));

        // NOTE(unsafe): The active buffer is only swapped out by this handle, at
        // NOTE(unsafe): the top of a later tick once this transfer has completed.
        let frame = unsafe { self.display.buffers.active() };
        self.shift_out.start(&frame.0[row as usize].0);

        TickOutcome::Started { row, swapped }
    }

    /// Row most recently started, or `None` before the first tick.
    pub fn cursor(&self) -> Option<u8> {
        self.cursor
    }

    pub fn state(&self) -> ScanState {
        self.display.state()
    }

    /// Number of ticks that found the previous row still in flight.
    pub fn overruns(&self) -> u32 {
        self.display.overruns.load(Ordering::Relaxed)
    }

    pub fn active_id(&self) -> BufferId {
        self.display.buffers.active_id()
    }

    pub fn role_of(&self, id: BufferId) -> Role {
        self.display.buffers.role_of(id)
    }

    /// The frame currently being scanned out.
    pub fn active_frame(&self) -> &Frame {
        // NOTE(unsafe): Roles only change inside `on_tick()`, which needs `&mut self`,
        // NOTE(unsafe): and nothing writes to the active buffer.
        unsafe { self.display.buffers.active() }
    }
}

/// Transmit-complete handle: owns the row drivers, latch and bus status.
pub struct Latcher<'a, R, L, B> {
    display: &'a Display,
    rows: R,
    latch: L,
    bus: B,
    limits: Limits,
    lit: Option<u8>,
}

impl<'a, R: RowDrivers, L: Latch, B: ShiftBus> Latcher<'a, R, L, B> {
    /// Call from the shift register DMA transmit-complete ISR.
    ///
    /// Completions that do not correspond to a transfer started by
    /// [`Scanner::on_tick()`] are ignored.
    pub fn on_transmit_complete(&mut self) -> Result<(), Fault> {
        let row = match self.display.state() {
            ScanState::Loading(row) => row,
            _ => return Ok(()),
        };
        self.display.set_state(ScanState::Settling(row));

        // Break before make: old row off first.
        if let Some(prev) = self.lit.take() {
            self.rows.disable(prev as usize);
        }

        // Wait for the SPI FIFO to empty and the final byte to be clocked out.
        let mut spins = 0;
        while !self.bus.is_drained() {
            if spins == self.limits.drain_spins {
                return Err(Fault::BusStall { row });
            }
            spins += 1;
            core::hint::spin_loop();
        }

        self.latch.pulse();
        self.rows.enable(row as usize);
        self.lit = Some(row);
        self.display.set_state(ScanState::Displaying(row));
        Ok(())
    }

    /// Row currently switched on, if any.
    pub fn lit(&self) -> Option<u8> {
        self.lit
    }

    /// Access the row drivers, for example to inspect a recording implementation.
    pub fn rows(&self) -> &R {
        &self.rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_encoding_round_trips() {
        for row in 0..NR_ROWS as u8 {
            for s in [ScanState::Loading(row), ScanState::Settling(row), ScanState::Displaying(row)] {
                assert_eq!(ScanState::decode(s.encode()), s);
            }
        }
        assert_eq!(ScanState::decode(ScanState::Idle.encode()), ScanState::Idle);
    }

    #[test]
    fn rows_fit_state_word() {
        assert!(NR_ROWS <= 16);
    }
}
