use stm32ral::{usart, syscfg, write_reg, modify_reg};
use crate::rcc::Clocks;

/// UART driver.
pub struct Uart {
    uart: usart::Instance,
}

impl Uart {
    pub fn new(uart: usart::Instance) -> Self {
        Self { uart }
    }

    /// Configure USART1 for DMA reception of frames at `baud`.
    ///
    /// USART1 requests normally share DMA channels 2 and 3 with SPI1, so they
    /// are remapped onto channels 4 and 5.
    pub fn setup_ingest(&self, syscfg: &syscfg::Instance, clocks: &Clocks, baud: u32) {
        modify_reg!(syscfg, syscfg, CFGR1, USART1_TX_DMA_RMP: 1, USART1_RX_DMA_RMP: 1);

        // Ensure UART is disabled, 16x oversampling, 8-bit data.
        write_reg!(usart, self.uart, CR1, 0);

        // Use all default settings for CR2.
        write_reg!(usart, self.uart, CR2, 0);

        // Enable DMA for received data.
        write_reg!(usart, self.uart, CR3, DMAR: 1);

        // 24MHz / 38400 is exactly 625.
        assert_eq!(clocks.usart1_ck % baud, 0);
        write_reg!(usart, self.uart, BRR, clocks.usart1_ck / baud);

        // Enable UART.
        modify_reg!(usart, self.uart, CR1, TE: 1, RE: 1, UE: 1);
    }

    /// Get address of receive data register.
    pub fn rdr(&self) -> u32 {
        &self.uart.RDR as *const _ as u32
    }
}
