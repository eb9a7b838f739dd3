//! Column bit transform.
//!
//! The UART client sends each row left-to-right: byte 0 holds columns 0-7,
//! with column 0 in the least significant bit. The shift registers run
//! left-to-right, so the new bits have to be clocked out right-to-left.
//!
//! The work is split between this module and the SPI peripheral. Here we
//! reverse the byte order of the row and pass every byte through the
//! revision's [`ByteMap`]. The SPI peripheral then sends each byte LSB-first,
//! which completes the reversal within each byte. Boards whose serializer runs
//! MSB-first carry the bit reversal in their byte map instead, and older boards
//! with the nibble-swapped column wiring carry a nibble swap.

use crate::{framebuf::Row, revision::Revision};

/// Per-byte permutation applied to every byte of a row, with its inverse.
///
/// Both tables are built at compile time from the revision's wiring flags.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ByteMap {
    forward: [u8; 256],
    inverse: [u8; 256],
}

impl ByteMap {
    /// Map for straight-wired boards with LSB-first serialization.
    pub const IDENTITY: ByteMap = ByteMap::build(false, false);

    /// Build the tables.
    ///
    /// * `nibble_swap`: swap the high and low four bits of each byte.
    /// * `bit_reverse`: reverse all eight bits, applied after any nibble swap.
    pub const fn build(nibble_swap: bool, bit_reverse: bool) -> Self {
        let mut forward = [0u8; 256];
        let mut inverse = [0u8; 256];
        let mut i = 0;
        while i < 256 {
            let mut b = i as u8;
            if nibble_swap {
                b = b.rotate_left(4);
            }
            if bit_reverse {
                b = b.reverse_bits();
            }
            forward[i] = b;
            inverse[b as usize] = i as u8;
            i += 1;
        }
        ByteMap { forward, inverse }
    }

    /// Map one input byte to its wire form.
    pub fn apply(&self, byte: u8) -> u8 {
        self.forward[byte as usize]
    }

    /// Undo [`ByteMap::apply`].
    pub fn invert(&self, byte: u8) -> u8 {
        self.inverse[byte as usize]
    }
}

/// Transform one row from the ingest layout into shift-register order.
pub fn transform_row(row: &Row, rev: &Revision) -> Row {
    let mut out = Row::blank();
    for (o, i) in out.0.iter_mut().zip(row.0.iter().rev()) {
        *o = rev.byte_map.apply(*i);
    }
    out
}

/// Recover the ingest layout of a row previously passed through [`transform_row`].
pub fn restore_row(row: &Row, rev: &Revision) -> Row {
    let mut out = Row::blank();
    for (o, i) in out.0.iter_mut().rev().zip(row.0.iter()) {
        *o = rev.byte_map.invert(*i);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{REV1, REV2, ROW_BYTES};

    fn counting_row() -> Row {
        let mut row = Row::blank();
        for (i, b) in row.0.iter_mut().enumerate() {
            *b = 0x10 + i as u8;
        }
        row
    }

    #[test]
    fn straight_wiring_only_reverses_bytes() {
        let out = transform_row(&counting_row(), &REV2);
        let expected: [u8; ROW_BYTES] = [0x17, 0x16, 0x15, 0x14, 0x13, 0x12, 0x11, 0x10];
        assert_eq!(out.0, expected);
    }

    #[test]
    fn nibble_swapped_wiring_rotates_each_byte() {
        let out = transform_row(&counting_row(), &REV1);
        let expected: [u8; ROW_BYTES] = [0x71, 0x61, 0x51, 0x41, 0x31, 0x21, 0x11, 0x01];
        assert_eq!(out.0, expected);
    }

    #[test]
    fn byte_maps_are_permutations() {
        for map in [ByteMap::IDENTITY, ByteMap::build(true, false),
                    ByteMap::build(false, true), ByteMap::build(true, true)]
        {
            let mut seen = [false; 256];
            for b in 0..=255u8 {
                let m = map.apply(b);
                assert!(!seen[m as usize], "{:#04x} hit twice", m);
                seen[m as usize] = true;
                assert_eq!(map.invert(m), b);
            }
        }
    }

    #[test]
    fn msb_first_map_reverses_bits() {
        let map = ByteMap::build(false, true);
        assert_eq!(map.apply(0b0000_0001), 0b1000_0000);
        assert_eq!(map.apply(0b1100_0000), 0b0000_0011);
    }

    #[test]
    fn uniform_rows_stay_uniform() {
        let on = Row([0xFF; ROW_BYTES]);
        assert_eq!(transform_row(&on, &REV1), on);
        assert_eq!(transform_row(&on, &REV2), on);
        assert_eq!(transform_row(&Row::blank(), &REV2), Row::blank());
    }

    #[test]
    fn restore_undoes_transform() {
        let row = counting_row();
        for rev in [&REV1, &REV2] {
            assert_eq!(restore_row(&transform_row(&row, rev), rev), row);
        }
    }
}
