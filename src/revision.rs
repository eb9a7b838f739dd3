//! Per-revision board constants.
//!
//! Everything that differs between board revisions lives in one [`Revision`]
//! table. The firmware picks a table once at startup and the rest of the code
//! only ever reads from it.

use crate::{transform::ByteMap, NR_ROWS};

/// GPIO port.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Port {
    A,
    B,
}

/// A single GPIO pin.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PinId {
    pub port: Port,
    pub pin: u8,
}

impl PinId {
    pub const fn pa(pin: u8) -> Self {
        PinId { port: Port::A, pin }
    }

    pub const fn pb(pin: u8) -> Self {
        PinId { port: Port::B, pin }
    }
}

/// Source for the 24MHz system clock.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ClockSource {
    /// 12MHz crystal, PLL x2.
    Hse12MHz,
    /// Internal 8MHz RC, halved into the PLL then x6.
    Hsi,
}

/// Order in which the SPI peripheral serializes each byte.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BitOrder {
    LsbFirst,
    MsbFirst,
}

/// Board revision table.
#[derive(Clone, Debug)]
pub struct Revision {
    pub name: &'static str,
    /// Per-byte column permutation, see [`crate::transform_row`].
    pub byte_map: ByteMap,
    pub bit_order: BitOrder,
    pub clock: ClockSource,
    /// Row driver FET gates, top row first.
    pub rows: [PinId; NR_ROWS],
    /// Row FETs are switched on by pulling the gate line low.
    pub rows_active_low: bool,
    /// Shift register storage clock.
    pub latch: PinId,
    /// LED supply switch, if the board has one.
    pub power_enable: Option<PinId>,
}

/// First board layout.
///
/// The column connectors on this board were routed with the two halves of each
/// shift register swapped, so each byte gets a nibble swap before sending.
pub const REV1: Revision = Revision {
    name: "rev1",
    byte_map: ByteMap::build(true, false),
    bit_order: BitOrder::LsbFirst,
    clock: ClockSource::Hsi,
    rows: [
        PinId::pa(4), PinId::pa(3), PinId::pa(2),
        PinId::pa(1), PinId::pa(0), PinId::pb(1),
    ],
    rows_active_low: true,
    latch: PinId::pa(6),
    power_enable: None,
};

/// Current board layout, with straight column wiring and a switched LED supply.
pub const REV2: Revision = Revision {
    name: "rev2",
    byte_map: ByteMap::IDENTITY,
    bit_order: BitOrder::LsbFirst,
    clock: ClockSource::Hse12MHz,
    rows: [
        PinId::pa(11), PinId::pa(10), PinId::pa(9),
        PinId::pa(8), PinId::pb(15), PinId::pb(14),
    ],
    rows_active_low: true,
    latch: PinId::pa(6),
    power_enable: Some(PinId::pa(12)),
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_pins_are_distinct() {
        for rev in [&REV1, &REV2] {
            for (i, a) in rev.rows.iter().enumerate() {
                assert_ne!(*a, rev.latch, "{}", rev.name);
                assert_ne!(Some(*a), rev.power_enable, "{}", rev.name);
                for b in &rev.rows[i + 1..] {
                    assert_ne!(a, b, "{}", rev.name);
                }
            }
        }
    }

    #[test]
    fn row_pins_avoid_serial_pins() {
        // PA5/PA7 are SPI1 SCK/MOSI, PB6/PB7 are USART1 TX/RX.
        let serial = [PinId::pa(5), PinId::pa(7), PinId::pb(6), PinId::pb(7)];
        for rev in [&REV1, &REV2] {
            for pin in rev.rows.iter().chain(core::iter::once(&rev.latch)) {
                assert!(!serial.contains(pin), "{}: {:?}", rev.name, pin);
            }
        }
    }
}
