//! Row and frame storage, and the active/staging buffer pair.

use core::cell::UnsafeCell;
use portable_atomic::{AtomicU8, Ordering};
use crate::{FRAME_BYTES, NR_COLS, NR_ROWS, ROW_BYTES};

/// One row of column bits.
#[repr(transparent)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Row(pub [u8; ROW_BYTES]);

impl Row {
    /// Row with every LED off.
    pub const fn blank() -> Self {
        Row([0; ROW_BYTES])
    }

    /// Read one pixel, using the ingest layout (column 0 in bit 0 of byte 0).
    pub fn pixel(&self, col: usize) -> bool {
        (self.0[col / 8] >> (col % 8)) & 1 == 1
    }

    /// Write one pixel, using the ingest layout.
    pub fn set_pixel(&mut self, col: usize, on: bool) {
        if on {
            self.0[col / 8] |= 1 << (col % 8);
        } else {
            self.0[col / 8] &= !(1 << (col % 8));
        }
    }

    /// Iterate over pixels left-to-right, using the ingest layout.
    pub fn pixels(&self) -> impl Iterator<Item = bool> + '_ {
        (0..NR_COLS).map(move |col| self.pixel(col))
    }
}

/// One complete frame, top row first.
///
/// The rows are tightly packed, so a frame is exactly the bytes of one frame on
/// the wire and can be received into directly.
#[repr(transparent)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Frame(pub [Row; NR_ROWS]);

impl Frame {
    pub const fn blank() -> Self {
        Frame([Row::blank(); NR_ROWS])
    }

    /// Build a frame from its wire bytes.
    pub fn from_bytes(bytes: &[u8; FRAME_BYTES]) -> Self {
        let mut frame = Frame::blank();
        frame.as_bytes_mut().copy_from_slice(bytes);
        frame
    }

    /// Return a slice that aliases the same memory.
    pub fn as_bytes(&self) -> &[u8] {
        // NOTE(unsafe): Creates a shared reference to the same underlying data,
        // NOTE(unsafe): which we know is tightly packed and so a valid [u8].
        unsafe { core::slice::from_raw_parts(self as *const _ as *const u8,
                                             core::mem::size_of::<Self>()) }
    }

    /// Return a mutable slice that aliases the same memory.
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        // NOTE(unsafe): As for `as_bytes()`, and every bit pattern is a valid Frame.
        unsafe { core::slice::from_raw_parts_mut(self as *mut _ as *mut u8,
                                                 core::mem::size_of::<Self>()) }
    }
}

/// Identifies one of the two frame buffers.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BufferId {
    A,
    B,
}

impl BufferId {
    pub fn index(self) -> usize {
        match self {
            BufferId::A => 0,
            BufferId::B => 1,
        }
    }

    pub fn other(self) -> Self {
        match self {
            BufferId::A => BufferId::B,
            BufferId::B => BufferId::A,
        }
    }

    fn from_index(idx: u8) -> Self {
        if idx == 0 { BufferId::A } else { BufferId::B }
    }
}

/// What a frame buffer is currently used for.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Role {
    /// Being scanned out to the display.
    Active,
    /// Being received into and transformed.
    Staging,
}

/// The two frame buffers and their role assignment.
///
/// The role assignment is a single atomic index, so there is always exactly
/// one active and one staging buffer. Access to the buffer contents goes
/// through the handles produced by [`crate::Display::split()`], which only
/// ever read the active buffer from the scan interrupts and only ever write
/// the staging buffer from the ingest side.
pub struct FrameBuffers {
    frames: [UnsafeCell<Frame>; 2],
    active: AtomicU8,
}

// NOTE(unsafe): The frames are only accessed under the role discipline above,
// NOTE(unsafe): and the role index is atomic.
unsafe impl Sync for FrameBuffers {}

impl FrameBuffers {
    /// Two blank buffers, with A active.
    pub const fn new() -> Self {
        FrameBuffers {
            frames: [UnsafeCell::new(Frame::blank()), UnsafeCell::new(Frame::blank())],
            active: AtomicU8::new(0),
        }
    }

    pub fn role_of(&self, id: BufferId) -> Role {
        if id == self.active_id() { Role::Active } else { Role::Staging }
    }

    pub fn active_id(&self) -> BufferId {
        BufferId::from_index(self.active.load(Ordering::Acquire))
    }

    pub fn staging_id(&self) -> BufferId {
        self.active_id().other()
    }

    /// Exchange the roles of the two buffers.
    ///
    /// The caller must ensure the active buffer is not being read by an
    /// in-flight transmit.
    pub(crate) fn swap_roles(&self) {
        let idx = self.active.load(Ordering::Acquire);
        self.active.store(idx ^ 1, Ordering::Release);
    }

    /// Shared reference to the active buffer.
    ///
    /// # Safety
    /// Only the scan side may call this, and the reference must not be held
    /// across a call to `swap_roles()`.
    pub(crate) unsafe fn active(&self) -> &Frame {
        &*self.frames[self.active_id().index()].get()
    }

    /// Exclusive reference to the staging buffer.
    ///
    /// # Safety
    /// Only the ingest side may call this, while no receive is in progress,
    /// and the reference must not be held across a role swap.
    #[allow(clippy::mut_from_ref)]
    pub(crate) unsafe fn staging_mut(&self) -> &mut Frame {
        &mut *self.frames[self.staging_id().index()].get()
    }
}

impl Default for FrameBuffers {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exactly_one_active_buffer() {
        let bufs = FrameBuffers::new();
        for _ in 0..5 {
            let roles = [bufs.role_of(BufferId::A), bufs.role_of(BufferId::B)];
            assert_eq!(roles.iter().filter(|r| **r == Role::Active).count(), 1);
            assert_eq!(roles.iter().filter(|r| **r == Role::Staging).count(), 1);
            assert_ne!(bufs.active_id(), bufs.staging_id());
            bufs.swap_roles();
        }
    }

    #[test]
    fn swap_twice_is_identity() {
        let bufs = FrameBuffers::new();
        let before = bufs.active_id();
        bufs.swap_roles();
        assert_eq!(bufs.active_id(), before.other());
        assert_eq!(bufs.role_of(before), Role::Staging);
        bufs.swap_roles();
        assert_eq!(bufs.active_id(), before);
    }

    #[test]
    fn swap_exposes_staged_frame() {
        let bufs = FrameBuffers::new();
        unsafe { bufs.staging_mut() }.0[2] = Row([0xA5; ROW_BYTES]);
        assert_eq!(unsafe { bufs.active() }.0[2], Row::blank());
        bufs.swap_roles();
        assert_eq!(unsafe { bufs.active() }.0[2], Row([0xA5; ROW_BYTES]));
        assert_eq!(unsafe { bufs.staging_mut() }.0[2], Row::blank());
    }

    #[test]
    fn frame_bytes_are_rows_in_order() {
        let mut bytes = [0u8; FRAME_BYTES];
        bytes[ROW_BYTES] = 0x01;
        bytes[FRAME_BYTES - 1] = 0x80;
        let frame = Frame::from_bytes(&bytes);
        assert!(frame.0[1].pixel(0));
        assert!(frame.0[NR_ROWS - 1].pixel(NR_COLS - 1));
        assert_eq!(frame.as_bytes(), &bytes[..]);
    }

    #[test]
    fn pixels_are_lsb_first() {
        let mut row = Row::blank();
        row.set_pixel(0, true);
        row.set_pixel(9, true);
        assert_eq!(row.0[0], 0x01);
        assert_eq!(row.0[1], 0x02);
        row.set_pixel(0, false);
        assert_eq!(row.0[0], 0x00);
        assert_eq!(row.pixels().filter(|p| *p).count(), 1);
    }
}
