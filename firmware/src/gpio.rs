use stm32ral::{gpio, write_reg, modify_reg};
use uartled::{periph::{Latch, RowDrivers}, PinId, Port, Revision, NR_ROWS};

type Gpio = gpio::Instance;

/// Row driver FET gates, in display order.
pub struct RowPins {
    pins: [OutputPin; NR_ROWS],
    active_low: bool,
}

impl RowDrivers for RowPins {
    fn enable(&mut self, row: usize) {
        self.pins[row].set(!self.active_low as u32);
    }

    fn disable(&mut self, row: usize) {
        self.pins[row].set(self.active_low as u32);
    }
}

/// Shift register storage clock.
pub struct LatchPin(OutputPin);

impl Latch for LatchPin {
    fn pulse(&mut self) {
        self.0.set_high();
        self.0.set_low();
    }
}

/// Pins container.
///
/// Contains the results of setting up the GPIOs for a board revision.
#[allow(clippy::manual_non_exhaustive)]
pub struct Pins {
    pub rows: RowPins,
    pub latch: LatchPin,
    pub power: Option<OutputPin>,
    _private: (),
}

pub fn setup(gpioa: Gpio, gpiob: Gpio, rev: &Revision) -> Pins {
    // Fixed function pins, the same on every revision:
    // PA5: AF0, SPI1_SCK, REGS_CLK
    // PA7: AF0, SPI1_MOSI, REGS_SER
    // PA13: AF0 SWDIO (reset default)
    // PA14: AF0 SWCLK (reset default)
    // PB6: AF0, USART1_TX
    // PB7: AF0, USART1_RX
    // AF0 is the reset value of AFRL so only MODER needs changing.
    modify_reg!(gpio, gpioa, MODER, MODER5: 0b10, MODER7: 0b10);
    modify_reg!(gpio, gpioa, OSPEEDR, OSPEEDR5: 0b11, OSPEEDR7: 0b11);
    write_reg!(gpio, gpiob, ODR, 0);
    modify_reg!(gpio, gpiob, MODER, MODER6: 0b10, MODER7: 0b10);
    modify_reg!(gpio, gpiob, PUPDR, PUPDR7: 0b01);

    // Row FETs are open-drain, and must be off before becoming outputs.
    let off = rev.rows_active_low as u32;
    let rows = rev.rows.map(|pin| {
        let out = OutputPin::new(port(&gpioa, &gpiob, pin), pin.pin as u32);
        out.set(off);
        configure_output(port(&gpioa, &gpiob, pin), pin, true);
        out
    });

    // Latch and LED power are push-pull, initially low.
    let latch = OutputPin::new(port(&gpioa, &gpiob, rev.latch), rev.latch.pin as u32);
    latch.set_low();
    configure_output(port(&gpioa, &gpiob, rev.latch), rev.latch, false);

    let power = rev.power_enable.map(|pin| {
        let out = OutputPin::new(port(&gpioa, &gpiob, pin), pin.pin as u32);
        out.set_low();
        configure_output(port(&gpioa, &gpiob, pin), pin, false);
        out
    });

    Pins {
        rows: RowPins { pins: rows, active_low: rev.rows_active_low },
        latch: LatchPin(latch),
        power,
        _private: (),
    }
}

fn port<'a>(gpioa: &'a Gpio, gpiob: &'a Gpio, pin: PinId) -> &'a Gpio {
    match pin.port {
        Port::A => gpioa,
        Port::B => gpiob,
    }
}

/// Switch a pin to general purpose output mode.
fn configure_output(gpio: &Gpio, pin: PinId, open_drain: bool) {
    let n = pin.pin as u32;
    if open_drain {
        modify_reg!(gpio, gpio, OTYPER, |r| r | (1 << n));
    } else {
        modify_reg!(gpio, gpio, OTYPER, |r| r & !(1 << n));
    }
    modify_reg!(gpio, gpio, MODER, |r| (r & !(0b11 << (2 * n))) | (0b01 << (2 * n)));
}

/// Pin for runtime control of outputs.
pub struct OutputPin {
    bsrr: u32,
    pin: u32,
}

impl OutputPin {
    /// Construct a new OutputPin from a given GPIO instance and pin number.
    fn new(port: &gpio::Instance, pin: u32) -> OutputPin {
        OutputPin {
            bsrr: &port.BSRR as *const _ as u32, pin
        }
    }

    /// Set pin low if `level` is 0, otherwise set it high.
    pub fn set(&self, level: u32) {
        // NOTE(unsafe): Write into a write-only atomic register.
        unsafe {
            if level == 0 {
                core::ptr::write_volatile(self.bsrr as *mut u32, 1 << (self.pin + 16));
            } else {
                core::ptr::write_volatile(self.bsrr as *mut u32, 1 << self.pin);
            }
        }
    }

    /// Set pin high.
    pub fn set_high(&self) {
        self.set(1);
    }

    /// Set pin low.
    pub fn set_low(&self) {
        self.set(0);
    }
}
