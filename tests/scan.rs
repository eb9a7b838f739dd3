mod common;

use std::thread;
use common::{rig, Event};
use uartled::{
    periph::{Latch, RowDrivers, ShiftBus, ShiftOut, StreamIn},
    Display, Fault, Limits, Peripherals, ScanState, TickOutcome, NR_ROWS, REV2,
};

#[test]
fn cursor_visits_rows_in_order() {
    let mut display = Display::new();
    let mut rig = rig(&mut display, &REV2, Limits::DEFAULT);
    assert_eq!(rig.scanner.cursor(), None);
    assert_eq!(rig.scanner.state(), ScanState::Idle);

    let mut visited = Vec::new();
    for _ in 0..3 * NR_ROWS {
        match rig.scanner.on_tick() {
            TickOutcome::Started { row, .. } => visited.push(row as usize),
            TickOutcome::Missed => panic!("unexpected overrun"),
        }
        rig.latcher.on_transmit_complete().unwrap();
    }

    let expected: Vec<usize> = (0..3 * NR_ROWS).map(|i| i % NR_ROWS).collect();
    assert_eq!(visited, expected);
    assert_eq!(rig.scanner.overruns(), 0);
}

#[test]
fn tick_loads_then_completion_displays() {
    let mut display = Display::new();
    let mut rig = rig(&mut display, &REV2, Limits::DEFAULT);

    assert_eq!(rig.scanner.on_tick(), TickOutcome::Started { row: 0, swapped: false });
    assert_eq!(rig.scanner.state(), ScanState::Loading(0));
    assert_eq!(rig.latcher.lit(), None);

    rig.latcher.on_transmit_complete().unwrap();
    assert_eq!(rig.scanner.state(), ScanState::Displaying(0));
    assert_eq!(rig.latcher.lit(), Some(0));
}

#[test]
fn break_before_make() {
    let mut display = Display::new();
    let mut rig = rig(&mut display, &REV2, Limits::DEFAULT);
    for _ in 0..2 * NR_ROWS + 1 {
        rig.row_period();
    }
    assert_eq!(rig.latcher.rows().max_on, 1);

    // Every completion after the first reads: old row off, latch, new row on.
    let log = rig.log.borrow();
    let switching: Vec<&Event> = log.iter()
        .filter(|e| !matches!(e, Event::Transmit(_)))
        .collect();
    assert_eq!(switching[0], &Event::Latch);
    assert_eq!(switching[1], &Event::Enable(0));
    for (i, chunk) in switching[2..].chunks(3).enumerate() {
        let prev = i % NR_ROWS;
        let next = (i + 1) % NR_ROWS;
        assert_eq!(chunk, [&Event::Disable(prev), &Event::Latch, &Event::Enable(next)]);
    }
}

#[test]
fn latch_waits_for_bus_to_drain() {
    let mut display = Display::new();
    let mut rig = rig(&mut display, &REV2, Limits { overrun_spins: 10, drain_spins: 10 });
    rig.row_period();
    rig.scanner.on_tick();

    // A bus that never drains is fatal, with every row left off and nothing latched.
    rig.drained.set(false);
    let latches_before = rig.log.borrow().iter().filter(|e| **e == Event::Latch).count();
    assert_eq!(rig.latcher.on_transmit_complete(), Err(Fault::BusStall { row: 1 }));
    assert!(rig.latcher.rows().on.iter().all(|on| !on));
    assert_eq!(rig.latcher.lit(), None);
    let latches_after = rig.log.borrow().iter().filter(|e| **e == Event::Latch).count();
    assert_eq!(latches_before, latches_after);
    assert_eq!(rig.scanner.state(), ScanState::Settling(1));
}

#[test]
fn overrun_counts_each_missed_tick() {
    let mut display = Display::new();
    let mut rig = rig(&mut display, &REV2, Limits { overrun_spins: 50, drain_spins: 50 });
    rig.row_period();

    // Row 1 goes out but its transmit-complete is held back.
    assert_eq!(rig.scanner.on_tick(), TickOutcome::Started { row: 1, swapped: false });
    for n in 1..=3 {
        assert_eq!(rig.scanner.on_tick(), TickOutcome::Missed);
        assert_eq!(rig.scanner.overruns(), n);
        assert_eq!(rig.scanner.cursor(), Some(1));
        assert_eq!(rig.scanner.state(), ScanState::Loading(1));
    }

    // Once released, the scan carries on from where it was.
    rig.latcher.on_transmit_complete().unwrap();
    assert_eq!(rig.scanner.on_tick(), TickOutcome::Started { row: 2, swapped: false });
    assert_eq!(rig.scanner.overruns(), 3);
    assert_eq!(rig.transmitted().len(), 3);
}

#[test]
fn spurious_completion_is_ignored() {
    let mut display = Display::new();
    let mut rig = rig(&mut display, &REV2, Limits::DEFAULT);
    rig.latcher.on_transmit_complete().unwrap();
    assert!(rig.log.borrow().is_empty());

    rig.row_period();
    rig.latcher.on_transmit_complete().unwrap();
    assert_eq!(rig.latcher.lit(), Some(0));
    assert_eq!(rig.log.borrow().len(), 3);
}

#[test]
fn dwell_is_one_row_per_tick() {
    let mut display = Display::new();
    let mut rig = rig(&mut display, &REV2, Limits::DEFAULT);
    rig.refresh();
    rig.refresh();
    let enables = rig.log.borrow().iter().filter(|e| matches!(e, Event::Enable(_))).count();
    assert_eq!(enables, 2 * NR_ROWS);
    assert_eq!(rig.transmitted().len(), 2 * NR_ROWS);
}

/// Peripherals that can be handed to another thread, which stands in for the
/// transmit-complete interrupt preempting the tick.
struct Quiet;

impl ShiftOut for Quiet {
    fn start(&mut self, _bytes: &[u8]) {}
}

impl RowDrivers for Quiet {
    fn enable(&mut self, _row: usize) {}
    fn disable(&mut self, _row: usize) {}
}

impl Latch for Quiet {
    fn pulse(&mut self) {}
}

impl ShiftBus for Quiet {
    fn is_drained(&self) -> bool {
        true
    }
}

impl StreamIn for Quiet {
    fn start(&mut self, _buf: &mut [u8]) {}
}

#[test]
fn overrun_wait_ends_when_transmit_completes() {
    let mut display = Display::new();
    let periph = Peripherals { shift_out: Quiet, rows: Quiet, latch: Quiet, bus: Quiet, stream_in: Quiet };
    let limits = Limits { overrun_spins: u32::MAX, drain_spins: 10 };
    let (mut scanner, mut latcher, _rx, pump) = display.split(&REV2, limits, periph);

    assert_eq!(scanner.on_tick(), TickOutcome::Started { row: 0, swapped: false });

    let lit = thread::scope(|s| {
        let completion = s.spawn(move || {
            // Only complete once the tick has seen row 0 still in flight.
            while pump.overruns() == 0 {
                std::hint::spin_loop();
            }
            latcher.on_transmit_complete().map(|_| latcher.lit())
        });
        assert_eq!(scanner.on_tick(), TickOutcome::Started { row: 1, swapped: false });
        completion.join().unwrap()
    });

    assert_eq!(lit, Ok(Some(0)));
    assert_eq!(scanner.overruns(), 1);
    assert_eq!(scanner.cursor(), Some(1));
    assert_eq!(scanner.state(), ScanState::Loading(1));
}
