//! Frame ingest.
//!
//! Frames arrive as exactly [`FRAME_BYTES`] raw bytes, with no header or
//! checksum, received by DMA straight into the staging buffer. The
//! receive-complete interrupt only raises a flag. The bit transform runs in
//! the background loop so it can never delay the row scan, and the finished
//! buffer is handed to the scanner, which swaps it in at the start of its next
//! tick. Only once the swap has happened is the receive re-armed, into the
//! buffer that was just retired.

use portable_atomic::Ordering;
use crate::{
    framebuf::BufferId,
    periph::StreamIn,
    revision::Revision,
    scan::{Display, ScanState},
    transform::transform_row,
    FRAME_BYTES,
};

/// Receive-complete handle.
pub struct RxNotify<'a> {
    display: &'a Display,
}

impl<'a> RxNotify<'a> {
    pub(crate) fn new(display: &'a Display) -> Self {
        RxNotify { display }
    }

    /// Call from the ingest DMA receive-complete ISR.
    pub fn on_receive_complete(&self) {
        self.display.frame_ready.store(true, Ordering::Release);
    }
}

/// What a call to [`FramePump::poll()`] did.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PumpEvent {
    /// Nothing to do; safe to sleep until the next interrupt.
    Idle,
    /// A frame is transformed and waiting for the scanner to swap it in.
    AwaitingSwap,
    /// A received frame was transformed in the given buffer and a swap requested.
    Transformed(BufferId),
    /// The swap happened and the receive was re-armed into the given buffer.
    Rearmed(BufferId),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Phase {
    Unarmed,
    Receiving,
    AwaitingSwap,
}

/// Background handle: owns the ingest DMA and the staging buffer.
pub struct FramePump<'a, S> {
    display: &'a Display,
    rev: &'a Revision,
    stream_in: S,
    phase: Phase,
    frames: u32,
}

impl<'a, S: StreamIn> FramePump<'a, S> {
    pub(crate) fn new(display: &'a Display, rev: &'a Revision, stream_in: S) -> Self {
        FramePump { display, rev, stream_in, phase: Phase::Unarmed, frames: 0 }
    }

    /// Start receiving the first frame. Does nothing if already started.
    pub fn arm(&mut self) {
        if self.phase == Phase::Unarmed {
            self.start_receive();
        }
    }

    /// Run one step of the background work. Call from the idle loop after each wakeup.
    pub fn poll(&mut self) -> PumpEvent {
        match self.phase {
            Phase::Unarmed => PumpEvent::Idle,

            Phase::Receiving => {
                if !self.display.frame_ready.load(Ordering::Acquire) {
                    return PumpEvent::Idle;
                }

                // NOTE(unsafe): The receive has completed and the scanner never reads
                // NOTE(unsafe): the staging buffer, which stays ours until we request a swap.
                let frame = unsafe { self.display.buffers.staging_mut() };
                for row in frame.0.iter_mut() {
                    *row = transform_row(row, self.rev);
                }

                self.display.frame_ready.store(false, Ordering::Release);
                self.display.swap_requested.store(true, Ordering::Release);
                self.phase = Phase::AwaitingSwap;
                self.frames = self.frames.wrapping_add(1);
                PumpEvent::Transformed(self.display.buffers.staging_id())
            },

            Phase::AwaitingSwap => {
                if self.display.swap_requested.load(Ordering::Acquire) {
                    return PumpEvent::AwaitingSwap;
                }
                PumpEvent::Rearmed(self.start_receive())
            },
        }
    }

    /// Buffer the receive is currently writing into, if armed.
    pub fn ingest_target(&self) -> Option<BufferId> {
        match self.phase {
            Phase::Receiving => Some(self.display.buffers.staging_id()),
            _                => None,
        }
    }

    /// True once the scanner has serviced its first tick.
    pub fn scanning(&self) -> bool {
        self.display.state() != ScanState::Idle
    }

    /// Number of frames received and transformed.
    pub fn frames(&self) -> u32 {
        self.frames
    }

    /// Number of ticks that found the previous row still in flight.
    pub fn overruns(&self) -> u32 {
        self.display.overruns.load(Ordering::Relaxed)
    }

    fn start_receive(&mut self) -> BufferId {
        // NOTE(unsafe): No swap is pending, so the staging buffer is not read by the
        // NOTE(unsafe): scanner, and we don't touch it again until the receive completes.
        let frame = unsafe { self.display.buffers.staging_mut() };
        let buf = frame.as_bytes_mut();
        debug_assert_eq!(buf.len(), FRAME_BYTES);
        // A completion seen while unarmed or waiting for the swap is stale.
        self.display.frame_ready.store(false, Ordering::Release);
        self.stream_in.start(buf);
        self.phase = Phase::Receiving;
        self.display.buffers.staging_id()
    }
}
