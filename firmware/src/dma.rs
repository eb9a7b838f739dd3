use stm32ral::{dma, write_reg, modify_reg};
use uartled::periph::{ShiftOut, StreamIn};

/// Safe construction of all 5 channels in the DMA peripheral.
pub struct Dma {
    pub c1: DmaChannel,
    pub c2: DmaChannel,
    pub c3: DmaChannel,
    pub c4: DmaChannel,
    pub c5: DmaChannel,
}

impl Dma {
    /// Create the set of channels for a DMA peripheral, consuming it in the process.
    pub fn new(dma: dma::Instance) -> Self {
        // NOTE(unsafe): We just have to ensure only one DmaChannel instance
        // NOTE(unsafe): is created for each DMA channel.
        unsafe {
            Self {
                c1: DmaChannel::new(&dma, 1),
                c2: DmaChannel::new(&dma, 2),
                c3: DmaChannel::new(&dma, 3),
                c4: DmaChannel::new(&dma, 4),
                c5: DmaChannel::new(&dma, 5),
            }
        }
    }
}

/// Driver for controlling a DMA channel.
pub struct DmaChannel {
    dma: dma::Instance,
    channel: usize,
}

impl DmaChannel {
    /// Create a new DmaChannel for the provided dma instance and channel number (1-5).
    ///
    /// # Safety
    /// Must only create one instance per channel.
    pub unsafe fn new(dma: &dma::Instance, channel: usize) -> DmaChannel {
        // NOTE(unsafe): Make a copy of `dma` which we will only modify
        // NOTE(unsafe): in ways relating exclusively to our channel.
        let dma = core::mem::transmute_copy(dma);
        DmaChannel { dma, channel }
    }

    /// Set up this channel for transmit (memory-to-peripheral) operation.
    /// Configures 8-bit reads and writes, increments memory, and enables the
    /// transfer-complete interrupt.
    pub fn setup_tx(&self, cpar: u32) {
        let ch = self.ch();
        write_reg!(dma, ch, CCR1, EN: 0);
        write_reg!(dma, ch, CCR1,
            MSIZE: 0b00, PSIZE: 0b00, MINC: 1, PINC: 0, CIRC: 0,
            DIR: 1, TCIE: 1, EN: 0);
        write_reg!(dma, ch, CPAR1, cpar);
    }

    /// Set up this channel for receive (peripheral-to-memory) operation.
    /// Configures 8-bit reads and writes, increments memory, and enables the
    /// transfer-complete interrupt.
    pub fn setup_rx(&self, cpar: u32) {
        let ch = self.ch();
        write_reg!(dma, ch, CCR1, EN: 0);
        write_reg!(dma, ch, CCR1,
            MSIZE: 0b00, PSIZE: 0b00, MINC: 1, PINC: 0, CIRC: 0,
            DIR: 0, TCIE: 1, EN: 0);
        write_reg!(dma, ch, CPAR1, cpar);
    }

    /// Start this channel for transmit (memory-to-peripheral) operation,
    /// using the provided slice's address and length.
    pub fn start_tx(&self, cmar: &[u8]) {
        self.start(cmar.as_ptr() as u32, cmar.len() as u32);
    }

    /// Start this channel for receive (peripheral-to-memory) operation,
    /// using the provided slice's address and length.
    pub fn start_rx(&self, cmar: &mut [u8]) {
        self.start(cmar.as_mut_ptr() as u32, cmar.len() as u32);
    }

    fn start(&self, cmar: u32, len: u32) {
        let ch = self.ch();
        // CMAR and CNDTR are only writable while the channel is disabled.
        modify_reg!(dma, ch, CCR1, EN: 0);
        self.clear_flags();
        write_reg!(dma, ch, CMAR1, cmar);
        write_reg!(dma, ch, CNDTR1, len);
        modify_reg!(dma, ch, CCR1, EN: 1);
    }

    /// Clear all flags for this channel.
    pub fn clear_flags(&self) {
        write_reg!(dma, self.dma, IFCR, 0b1111 << self.flag_shift());
    }

    /// Handle for clearing this channel's flags from its interrupt handler,
    /// while the channel itself is owned elsewhere.
    pub fn flags(&self) -> DmaFlags {
        // NOTE(unsafe): DmaFlags only writes this channel's bits of the
        // NOTE(unsafe): write-only, write-one-to-clear IFCR register.
        DmaFlags { dma: unsafe { core::mem::transmute_copy(&self.dma) }, channel: self.channel }
    }

    fn flag_shift(&self) -> u32 {
        4 * (self.channel as u32 - 1)
    }

    /// Return a special dma::Instance where the channel 1 registers
    /// map to our specific channel.
    ///
    /// Do not access ISR/IFCR through this instance!
    fn ch(&self) -> dma::Instance {
        // Channel register blocks are 0x14 bytes apart.
        let ptr = &*self.dma as *const _ as *const u32;
        unsafe { core::mem::transmute(ptr.offset(5 * (self.channel as isize - 1))) }
    }
}

/// Interrupt-side access to one channel's status flags.
pub struct DmaFlags {
    dma: dma::Instance,
    channel: usize,
}

impl DmaFlags {
    /// Clear all flags for this channel.
    pub fn clear(&self) {
        write_reg!(dma, self.dma, IFCR, 0b1111 << (4 * (self.channel as u32 - 1)));
    }
}

/// SPI1 TX channel feeding row data into the shift registers.
pub struct RowTx(pub DmaChannel);

impl ShiftOut for RowTx {
    fn start(&mut self, bytes: &[u8]) {
        self.0.start_tx(bytes);
    }
}

/// USART1 RX channel receiving frames.
pub struct FrameRx(pub DmaChannel);

impl StreamIn for FrameRx {
    fn start(&mut self, buf: &mut [u8]) {
        self.0.start_rx(buf);
    }
}
