//! Virtual display board.
//!
//! Runs the real refresh engine against simulated peripherals: a 64-stage
//! shift register chain with a latch, six row drivers, and a UART that
//! delivers whole frames. What the board shows is reconstructed from the
//! latched shift register contents of each row at the moment it is switched
//! on, so mistakes in latching or row sequencing show up on the virtual board
//! too. The image is decoded with the same revision's byte map, so the
//! transform itself is checked against the chain contents, not the image.

use std::{cell::{Cell, RefCell}, rc::Rc};
use anyhow::{anyhow, bail, Result};
use uartled::{
    periph::{Latch, RowDrivers, ShiftBus, ShiftOut, StreamIn},
    restore_row, BitOrder, Canvas, Display, Frame, FramePump, Latcher, Limits, Peripherals,
    PumpEvent, Revision, Row, RxNotify, Scanner, FRAME_BYTES, NR_COLS, NR_ROWS, ROW_BYTES,
};

/// Electrical state of the board.
struct Hardware {
    bit_order: BitOrder,
    /// Shift register chain, first stage first.
    chain: Vec<bool>,
    /// Register outputs as of the last latch pulse.
    latched: Vec<bool>,
    rows_on: [bool; NR_ROWS],
    max_rows_on: usize,
    /// Wire bytes presented on each row when it was last lit.
    seen: [Row; NR_ROWS],
}

impl Hardware {
    /// Clock one byte into the chain.
    fn shift_byte(&mut self, byte: u8) {
        for i in 0..8 {
            let bit = match self.bit_order {
                BitOrder::LsbFirst => i,
                BitOrder::MsbFirst => 7 - i,
            };
            self.chain.insert(0, (byte >> bit) & 1 == 1);
            self.chain.truncate(NR_COLS);
        }
    }

    /// Recover the bytes that were shifted to produce the latched outputs.
    fn latched_bytes(&self) -> Row {
        let mut row = Row::blank();
        // The first bit clocked in has travelled furthest down the chain.
        let mut sent = self.latched.iter().rev();
        for byte in row.0.iter_mut() {
            for i in 0..8 {
                let bit = match self.bit_order {
                    BitOrder::LsbFirst => i,
                    BitOrder::MsbFirst => 7 - i,
                };
                if sent.next() == Some(&true) {
                    *byte |= 1 << bit;
                }
            }
        }
        row
    }
}

type Shared = Rc<RefCell<Hardware>>;

struct VirtualSpi(Shared);

impl ShiftOut for VirtualSpi {
    fn start(&mut self, bytes: &[u8]) {
        // The virtual transfer completes immediately; the board delivers the
        // completion interrupt afterwards.
        let mut hw = self.0.borrow_mut();
        for byte in bytes {
            hw.shift_byte(*byte);
        }
    }
}

impl ShiftBus for VirtualSpi {
    fn is_drained(&self) -> bool {
        true
    }
}

struct VirtualLatch(Shared);

impl Latch for VirtualLatch {
    fn pulse(&mut self) {
        let mut hw = self.0.borrow_mut();
        hw.latched = hw.chain.clone();
    }
}

struct VirtualRows(Shared);

impl RowDrivers for VirtualRows {
    fn enable(&mut self, row: usize) {
        let mut hw = self.0.borrow_mut();
        hw.rows_on[row] = true;
        let on = hw.rows_on.iter().filter(|on| **on).count();
        hw.max_rows_on = hw.max_rows_on.max(on);
        hw.seen[row] = hw.latched_bytes();
    }

    fn disable(&mut self, row: usize) {
        self.0.borrow_mut().rows_on[row] = false;
    }
}

/// UART receive DMA, remembering where it was last armed.
#[derive(Clone, Default)]
struct VirtualUart {
    target: Rc<Cell<Option<(*mut u8, usize)>>>,
}

impl StreamIn for VirtualUart {
    fn start(&mut self, buf: &mut [u8]) {
        self.target.set(Some((buf.as_mut_ptr(), buf.len())));
    }
}

/// A complete board, driven one interrupt at a time.
pub struct VirtualBoard<'a> {
    rev: &'a Revision,
    scanner: Scanner<'a, VirtualSpi>,
    latcher: Latcher<'a, VirtualRows, VirtualLatch, VirtualSpi>,
    rx: RxNotify<'a>,
    pump: FramePump<'a, VirtualUart>,
    hw: Shared,
    uart: VirtualUart,
}

impl<'a> VirtualBoard<'a> {
    /// Power up: start scanning, then arm frame reception.
    pub fn new(display: &'a mut Display, rev: &'a Revision) -> Result<Self> {
        let hw = Rc::new(RefCell::new(Hardware {
            bit_order: rev.bit_order,
            chain: vec![false; NR_COLS],
            latched: vec![false; NR_COLS],
            rows_on: [false; NR_ROWS],
            max_rows_on: 0,
            seen: [Row::blank(); NR_ROWS],
        }));
        let uart = VirtualUart::default();
        let periph = Peripherals {
            shift_out: VirtualSpi(hw.clone()),
            rows: VirtualRows(hw.clone()),
            latch: VirtualLatch(hw.clone()),
            bus: VirtualSpi(hw.clone()),
            stream_in: uart.clone(),
        };
        let (scanner, latcher, rx, pump) = display.split(rev, Limits::DEFAULT, periph);
        let mut board = VirtualBoard { rev, scanner, latcher, rx, pump, hw, uart };

        board.row_period()?;
        board.pump.arm();
        Ok(board)
    }

    /// One row tick and its transmit completion.
    pub fn row_period(&mut self) -> Result<()> {
        self.scanner.on_tick();
        self.latcher.on_transmit_complete()
            .map_err(|fault| anyhow!("display fault: {:?}", fault))
    }

    /// Scan every row once.
    pub fn refresh(&mut self) -> Result<()> {
        for _ in 0..NR_ROWS {
            self.row_period()?;
        }
        Ok(())
    }

    /// Receive one frame over the UART and run the board until every row
    /// has been scanned out from it.
    pub fn receive(&mut self, bytes: &[u8; FRAME_BYTES]) -> Result<()> {
        let (ptr, len) = self.uart.target.take()
            .ok_or_else(|| anyhow!("frame sent while reception not armed"))?;
        if len != FRAME_BYTES {
            bail!("reception armed for {} bytes, expected {}", len, FRAME_BYTES);
        }
        // NOTE(unsafe): The receive was armed into the display's staging frame,
        // NOTE(unsafe): which nothing else touches until the completion is signalled.
        unsafe { std::ptr::copy_nonoverlapping(bytes.as_ptr(), ptr, len) };
        self.rx.on_receive_complete();

        loop {
            match self.pump.poll() {
                PumpEvent::Transformed(_) | PumpEvent::AwaitingSwap => self.row_period()?,
                PumpEvent::Rearmed(_) => break,
                PumpEvent::Idle => bail!("received frame was not picked up"),
            }
        }
        self.refresh()
    }

    /// What the board is showing, in the ingest layout.
    ///
    /// Each row is decoded from the wire bytes that were latched when it was
    /// lit, undoing the revision's transform.
    pub fn image(&self) -> Canvas {
        let hw = self.hw.borrow();
        let mut frame = Frame::blank();
        for (row, seen) in frame.0.iter_mut().zip(hw.seen.iter()) {
            *row = restore_row(seen, self.rev);
        }
        Canvas::from_frame(frame)
    }

    /// Most rows ever switched on at the same time.
    pub fn max_rows_on(&self) -> usize {
        self.hw.borrow().max_rows_on
    }

    pub fn frames(&self) -> u32 {
        self.pump.frames()
    }

    /// Draw the board as ASCII art, one line per row.
    pub fn render(&self) -> String {
        let image = self.image();
        let mut out = String::with_capacity(NR_ROWS * (NR_COLS + 5));
        for y in 0..NR_ROWS {
            out.push_str("[ ");
            out.extend((0..NR_COLS).map(|x| if image.pixel(x, y) { '*' } else { ' ' }));
            out.push_str(" ]\n");
        }
        out
    }
}

// Rows on the board are whole bytes.
const _: () = assert!(ROW_BYTES * 8 == NR_COLS);
