use stm32ral::{rcc, flash, read_reg, write_reg, modify_reg};
use uartled::ClockSource;

/// Frequencies for each clock in the system, in Hz.
#[derive(Copy, Clone, Debug)]
pub struct Clocks {
    pub sys_ck: u32,
    pub ahb_ck: u32,
    pub apb_ck: u32,
    pub tim_ck: u32,
    pub spi1_ck: u32,
    pub usart1_ck: u32,
}

/// Configure device clocks for a 24MHz system clock.
///
/// 24MHz divides evenly by both the 600Hz row tick and 38400 baud.
/// HCLK is undivided and PCLK is HCLK/8, giving a 1.5MHz SPI clock at PCLK/2.
pub fn setup(rcc: rcc::Instance, flash: flash::Instance, source: ClockSource) -> Clocks {
    // Ensure HSI is enabled, stable, and in use, with everything else off.
    // This is the reset state, we just enforce it in case of a soft reset.
    modify_reg!(rcc, rcc, CR, HSION: 1);
    while read_reg!(rcc, rcc, CR, HSIRDY == 0) {}
    write_reg!(rcc, rcc, CFGR, SW: 0b00);
    while read_reg!(rcc, rcc, CFGR, SWS != 0b00) {}
    modify_reg!(rcc, rcc, CR, HSEON: 0, CSSON: 0, PLLON: 0, HSEBYP: 0);
    while read_reg!(rcc, rcc, CR, PLLRDY == 1) {}
    write_reg!(rcc, rcc, CFGR2, 0);
    write_reg!(rcc, rcc, CFGR3, 0);
    write_reg!(rcc, rcc, CIR, 0);

    // Zero wait states are fine up to 24MHz, keep the prefetch buffer on.
    write_reg!(flash, flash, ACR, PRFTBE: 1, LATENCY: 0);

    // PLL input and multiplier for 24MHz out.
    // PLLMUL is the multiplication factor minus two.
    match source {
        ClockSource::Hse12MHz => {
            modify_reg!(rcc, rcc, CR, HSEON: 1);
            while read_reg!(rcc, rcc, CR, HSERDY == 0) {}
            // PLLSRC=1 selects HSE/PREDIV, PREDIV left at /1.
            modify_reg!(rcc, rcc, CFGR, PLLSRC: 1, PLLMUL: 2 - 2);
        },
        ClockSource::Hsi => {
            // PLLSRC=0 selects HSI/2 = 4MHz.
            modify_reg!(rcc, rcc, CFGR, PLLSRC: 0, PLLMUL: 6 - 2);
        },
    }

    // HPRE=/1 -> hclk = sys_ck = 24MHz
    // PPRE=/8 -> pclk = hclk/8 = 3MHz
    modify_reg!(rcc, rcc, CFGR, HPRE: 0b0000, PPRE: 0b110);

    modify_reg!(rcc, rcc, CR, PLLON: 1);
    while read_reg!(rcc, rcc, CR, PLLRDY == 0) {}

    // Swap system clock source to PLL.
    modify_reg!(rcc, rcc, CFGR, SW: 0b10);
    while read_reg!(rcc, rcc, CFGR, SWS != 0b10) {}

    if source == ClockSource::Hse12MHz {
        modify_reg!(rcc, rcc, CR, HSION: 0);
    }

    // Clock USART1 from SYSCLK rather than PCLK.
    modify_reg!(rcc, rcc, CFGR3, USART1SW: 0b01);

    // Enable AHB peripherals: DMA, GPIOA, GPIOB.
    modify_reg!(rcc, rcc, AHBENR, DMAEN: 1, IOPAEN: 1, IOPBEN: 1);

    // Enable APB peripherals: TIM3, SPI1, USART1, SYSCFG.
    modify_reg!(rcc, rcc, APB1ENR, TIM3EN: 1);
    modify_reg!(rcc, rcc, APB2ENR, SPI1EN: 1, USART1EN: 1, SYSCFGEN: 1);

    // Timers run at twice PCLK whenever the APB prescaler is not 1.
    Clocks {
        sys_ck: 24_000_000,
        ahb_ck: 24_000_000,
        apb_ck: 3_000_000,
        tim_ck: 6_000_000,
        spi1_ck: 3_000_000,
        usart1_ck: 24_000_000,
    }
}
