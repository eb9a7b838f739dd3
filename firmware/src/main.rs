#![no_std]
#![no_main]

use panic_rtt_target as _;
mod dma;
mod gpio;
mod rcc;
mod spi;
mod tim;
mod uart;

use uartled::Revision;

/// Board revision this image is built for.
#[cfg(feature = "rev1")]
static REVISION: Revision = uartled::REV1;
#[cfg(not(feature = "rev1"))]
static REVISION: Revision = uartled::REV2;

#[rtic::app(device=stm32ral::stm32f0::stm32f0x0)]
mod app {
    use crate::{
        dma::{self, DmaFlags, FrameRx, RowTx}, gpio::{self, LatchPin, OutputPin, RowPins},
        rcc, spi::Spi, tim, uart, REVISION,
    };
    use rtt_target::{rtt_init_print, rprintln, rprint};
    use uartled::{
        Display, FramePump, Latcher, Limits, Peripherals, PumpEvent, RxNotify, Scanner,
        BAUD_RATE, TICK_HZ,
    };

    #[shared]
    struct Shared {}

    #[local]
    struct Local {
        scanner: Scanner<'static, RowTx>,
        latcher: Latcher<'static, RowPins, LatchPin, Spi>,
        rx: RxNotify<'static>,
        pump: FramePump<'static, FrameRx>,
        tick_tim: tim::Tim,
        tx_flags: DmaFlags,
        rx_flags: DmaFlags,
        power: Option<OutputPin>,
    }

    #[init(local=[display: Display = Display::new()])]
    fn init(cx: init::Context) -> (Shared, Local, init::Monotonics) {
        rtt_init_print!();
        rprintln!("uartled {} initialising...", REVISION.name);

        rprint!("  RCC...      ");
        let clocks = rcc::setup(cx.device.RCC, cx.device.FLASH, REVISION.clock);
        rprintln!("OK");

        rprint!("  GPIO...     ");
        // Rows start switched off and LED power (if present) disabled.
        let pins = gpio::setup(cx.device.GPIOA, cx.device.GPIOB, &REVISION);
        rprintln!("OK");

        rprint!("  TIM...      ");
        // TIM3 generates the row tick, counting at 60kHz.
        let tim3 = tim::Tim::from_tim3(cx.device.TIM3);
        tim3.setup_tick(clocks.tim_ck / 60_000, 60_000 / TICK_HZ);
        rprintln!("OK");

        rprint!("  SPI...      ");
        let spi1 = Spi::new(cx.device.SPI1);
        spi1.setup_regs(&clocks, REVISION.bit_order);
        rprintln!("OK");

        rprint!("  UART...     ");
        let usart1 = uart::Uart::new(cx.device.USART1);
        usart1.setup_ingest(&cx.device.SYSCFG, &clocks, BAUD_RATE);
        rprintln!("OK");

        rprint!("  DMA...      ");
        // Channel 3: SPI1_TX
        // Channel 5: USART1_RX, after the SYSCFG remap
        let dma1 = dma::Dma::new(cx.device.DMA1);
        dma1.c3.setup_tx(spi1.dr());
        dma1.c5.setup_rx(usart1.rdr());
        let tx_flags = dma1.c3.flags();
        let rx_flags = dma1.c5.flags();
        rprintln!("OK");

        rprint!("  Display...  ");
        let periph = Peripherals {
            shift_out: RowTx(dma1.c3),
            rows: pins.rows,
            latch: pins.latch,
            bus: spi1,
            stream_in: FrameRx(dma1.c5),
        };
        let (scanner, latcher, rx, pump) =
            cx.local.display.split(&REVISION, Limits::DEFAULT, periph);
        rprintln!("OK");

        rprintln!("Initialisation complete.");

        // Start the row scan. LED power and frame reception follow from idle.
        tim3.start();

        (
            Shared {},

            Local {
                scanner,
                latcher,
                rx,
                pump,
                tick_tim: tim3,
                tx_flags,
                rx_flags,
                power: pins.power,
            },

            init::Monotonics()
        )
    }

    /// Background loop.
    ///
    /// Powers the LEDs once scanning, then transforms each received frame and
    /// hands it to the scanner, sleeping whenever there is nothing to do.
    #[idle(local=[pump, power])]
    fn idle(cx: idle::Context) -> ! {
        let pump = cx.local.pump;

        // Rows must be cycling before the supply comes up, or the row selected
        // at reset would take the full current.
        while !pump.scanning() {
            core::hint::spin_loop();
        }
        if let Some(power) = cx.local.power {
            power.set_high();
        }
        rprintln!("Scanning, LED power on.");

        pump.arm();

        let mut overruns = 0;
        loop {
            match pump.poll() {
                PumpEvent::Idle | PumpEvent::AwaitingSwap => cortex_m::asm::wfi(),
                PumpEvent::Transformed(_) | PumpEvent::Rearmed(_) => (),
            }

            let n = pump.overruns();
            if n != overruns {
                rprintln!("Row tick overruns: {}", n);
                overruns = n;
            }
        }
    }

    /// Row data DMA transfer complete.
    ///
    /// Must preempt the row tick so that an overrunning tick can wait on it.
    #[task(binds=DMA1_CH2_3, priority=3, local=[latcher, tx_flags])]
    fn dma_rows(cx: dma_rows::Context) {
        cx.local.tx_flags.clear();
        if let Err(fault) = cx.local.latcher.on_transmit_complete() {
            panic!("Display fault: {:?}", fault);
        }
    }

    /// Row tick.
    #[task(binds=TIM3, priority=2, local=[scanner, tick_tim])]
    fn tim_row(cx: tim_row::Context) {
        cx.local.tick_tim.clear_uif();
        cx.local.scanner.on_tick();
    }

    /// Frame reception DMA transfer complete.
    #[task(binds=DMA1_CH4_5, priority=1, local=[rx, rx_flags])]
    fn dma_frame(cx: dma_frame::Context) {
        cx.local.rx_flags.clear();
        cx.local.rx.on_receive_complete();
    }
}
