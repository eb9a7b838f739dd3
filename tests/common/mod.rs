//! Recording peripherals for driving the split display handles on the host.
#![allow(dead_code)]

use std::{cell::{Cell, RefCell}, rc::Rc};
use uartled::{
    periph::{Latch, RowDrivers, ShiftBus, ShiftOut, StreamIn},
    Display, FramePump, Latcher, Limits, Peripherals, Revision, RxNotify, Scanner,
    FRAME_BYTES, NR_ROWS,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    Transmit(Vec<u8>),
    Enable(usize),
    Disable(usize),
    Latch,
}

pub type Log = Rc<RefCell<Vec<Event>>>;

pub struct MockShiftOut {
    pub log: Log,
}

impl ShiftOut for MockShiftOut {
    fn start(&mut self, bytes: &[u8]) {
        self.log.borrow_mut().push(Event::Transmit(bytes.to_vec()));
    }
}

pub struct MockRows {
    pub log: Log,
    pub on: [bool; NR_ROWS],
    /// Largest number of rows ever enabled at once.
    pub max_on: usize,
}

impl RowDrivers for MockRows {
    fn enable(&mut self, row: usize) {
        self.on[row] = true;
        self.max_on = self.max_on.max(self.on.iter().filter(|o| **o).count());
        self.log.borrow_mut().push(Event::Enable(row));
    }

    fn disable(&mut self, row: usize) {
        self.on[row] = false;
        self.log.borrow_mut().push(Event::Disable(row));
    }
}

pub struct MockLatch {
    pub log: Log,
}

impl Latch for MockLatch {
    fn pulse(&mut self) {
        self.log.borrow_mut().push(Event::Latch);
    }
}

pub struct MockBus {
    pub drained: Rc<Cell<bool>>,
}

impl ShiftBus for MockBus {
    fn is_drained(&self) -> bool {
        self.drained.get()
    }
}

/// Stands in for the UART RX DMA, remembering where the last receive was armed.
#[derive(Clone, Default)]
pub struct MockStreamIn {
    target: Rc<Cell<Option<(*mut u8, usize)>>>,
    pub arms: Rc<Cell<u32>>,
}

impl StreamIn for MockStreamIn {
    fn start(&mut self, buf: &mut [u8]) {
        self.target.set(Some((buf.as_mut_ptr(), buf.len())));
        self.arms.set(self.arms.get() + 1);
    }
}

impl MockStreamIn {
    /// Write a frame into the armed buffer, as the DMA would.
    pub fn deliver(&self, bytes: &[u8; FRAME_BYTES]) {
        let (ptr, len) = self.target.take().expect("receive not armed");
        assert_eq!(len, FRAME_BYTES);
        // The buffer is the display's staging frame, which nothing else
        // touches while the receive is armed.
        unsafe { core::ptr::copy_nonoverlapping(bytes.as_ptr(), ptr, len) };
    }

    pub fn armed(&self) -> bool {
        let t = self.target.take();
        self.target.set(t);
        t.is_some()
    }
}

pub struct Rig<'a> {
    pub scanner: Scanner<'a, MockShiftOut>,
    pub latcher: Latcher<'a, MockRows, MockLatch, MockBus>,
    pub rx: RxNotify<'a>,
    pub pump: FramePump<'a, MockStreamIn>,
    pub log: Log,
    pub drained: Rc<Cell<bool>>,
    pub stream: MockStreamIn,
}

pub fn rig<'a>(display: &'a mut Display, rev: &'a Revision, limits: Limits) -> Rig<'a> {
    let log: Log = Rc::default();
    let drained = Rc::new(Cell::new(true));
    let stream = MockStreamIn::default();
    let periph = Peripherals {
        shift_out: MockShiftOut { log: log.clone() },
        rows: MockRows { log: log.clone(), on: [false; NR_ROWS], max_on: 0 },
        latch: MockLatch { log: log.clone() },
        bus: MockBus { drained: drained.clone() },
        stream_in: stream.clone(),
    };
    let (scanner, latcher, rx, pump) = display.split(rev, limits, periph);
    Rig { scanner, latcher, rx, pump, log, drained, stream }
}

impl<'a> Rig<'a> {
    /// One complete row period: tick followed by transmit-complete.
    pub fn row_period(&mut self) {
        self.scanner.on_tick();
        self.latcher.on_transmit_complete().expect("bus stalled");
    }

    /// One full refresh of every row.
    pub fn refresh(&mut self) {
        for _ in 0..NR_ROWS {
            self.row_period();
        }
    }

    /// Receive a frame and run the background work until it is displayed and
    /// the receive is re-armed.
    pub fn ingest(&mut self, bytes: &[u8; FRAME_BYTES]) {
        self.stream.deliver(bytes);
        self.rx.on_receive_complete();
        self.pump.poll();
        self.row_period();
        self.pump.poll();
    }

    /// Rows transmitted so far, oldest first.
    pub fn transmitted(&self) -> Vec<Vec<u8>> {
        self.log.borrow().iter().filter_map(|e| match e {
            Event::Transmit(b) => Some(b.clone()),
            _ => None,
        }).collect()
    }
}
