//! What the refresh engine needs from the peripheral drivers.
//!
//! Each trait is owned by exactly one execution context once the display is
//! split: [`ShiftOut`] by the row tick, [`RowDrivers`], [`Latch`] and
//! [`ShiftBus`] by the transmit-complete interrupt, and [`StreamIn`] by the
//! background loop.

/// Row driver FET gates.
pub trait RowDrivers {
    /// Switch on the driver for `row`. Polarity is handled by the implementation.
    fn enable(&mut self, row: usize);

    /// Switch off the driver for `row`.
    fn disable(&mut self, row: usize);
}

/// Shift register latch line.
pub trait Latch {
    /// Assert then deassert the latch, transferring the shifted bits to the outputs.
    fn pulse(&mut self);
}

/// DMA-driven transmit into the shift register chain.
pub trait ShiftOut {
    /// Begin sending `bytes`, returning immediately.
    ///
    /// Completion is signalled by the transmit-complete interrupt, which the
    /// caller routes to [`crate::Latcher::on_transmit_complete()`]. `bytes` must
    /// remain valid and unmodified until then.
    fn start(&mut self, bytes: &[u8]);
}

/// Status of the serial bus feeding the shift registers.
pub trait ShiftBus {
    /// True once nothing is queued for transmission and the bus is not shifting.
    ///
    /// The transmit-complete interrupt fires when the DMA has handed over the
    /// last byte, which may be before the peripheral has finished clocking it out.
    fn is_drained(&self) -> bool;
}

/// DMA-driven receive of the ingest stream.
pub trait StreamIn {
    /// Begin receiving exactly `buf.len()` bytes into `buf`, returning immediately.
    ///
    /// Completion is signalled by the receive-complete interrupt, which the
    /// caller routes to [`crate::RxNotify::on_receive_complete()`]. `buf` must
    /// not be accessed until then.
    fn start(&mut self, buf: &mut [u8]);
}
