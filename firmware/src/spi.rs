use stm32ral::{spi, write_reg, read_reg, modify_reg};
use uartled::{periph::ShiftBus, BitOrder};
use crate::rcc::Clocks;

/// SPI driver.
pub struct Spi {
    spi: spi::Instance,
}

impl Spi {
    pub fn new(spi: spi::Instance) -> Self {
        Self { spi }
    }

    /// Configure for transmit-only output into the column shift registers.
    ///
    /// The shift registers read the serial stream MSB first. Sending LSB first
    /// reverses the bits in each byte, which completes the row transform.
    pub fn setup_regs(&self, clocks: &Clocks, order: BitOrder) {
        // Ensure SPI is disabled and all CR1 settings at default.
        write_reg!(spi, self.spi, CR1, SPE: 0);

        // Use PCLK/2 = 1.5MHz, the slowest edges that still comfortably
        // fit a row inside one tick.
        assert!(clocks.spi1_ck / 2 <= 1_500_000);
        let lsbfirst = match order {
            BitOrder::LsbFirst => 1,
            BitOrder::MsbFirst => 0,
        };

        // Master with software NSS held high, single-line transmit only.
        write_reg!(spi, self.spi, CR1,
            BIDIMODE: 1, BIDIOE: 1, SSM: 1, SSI: 1, LSBFIRST: lsbfirst,
            BR: 0b000, MSTR: 1, CPOL: 0, CPHA: 0);

        // 8-bit frames (DS=7), DMA requests on TXE.
        write_reg!(spi, self.spi, CR2, DS: 8 - 1, TXDMAEN: 1);

        // Enable SPI.
        modify_reg!(spi, self.spi, CR1, SPE: 1);
    }

    /// Get the address of this SPI's DR register.
    pub fn dr(&self) -> u32 {
        &self.spi.DR as *const _ as u32
    }
}

impl ShiftBus for Spi {
    /// True once the TX FIFO is empty and the last frame has left the shifter.
    fn is_drained(&self) -> bool {
        read_reg!(spi, self.spi, SR, FTLVL == 0) && read_reg!(spi, self.spi, SR, BSY == 0)
    }
}
