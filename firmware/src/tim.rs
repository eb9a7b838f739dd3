use stm32ral::{tim3, modify_reg, write_reg};

/// Basic timer driver for the row tick.
pub struct Tim {
    tim: tim3::Instance,
}

impl Tim {
    pub fn from_tim3(tim: tim3::Instance) -> Self {
        Tim { tim }
    }

    /// Start the timer running by setting the CEN bit.
    pub fn start(&self) {
        modify_reg!(tim3, self.tim, CR1, CEN: 1);
    }

    /// Clear ISR flags.
    pub fn clear_uif(&self) {
        write_reg!(tim3, self.tim, SR, UIF: 0);
    }

    /// Configure timer for periodic update interrupts.
    ///
    /// The counter runs at f_tim/`psc` and overflows every `period` counts.
    pub fn setup_tick(&self, psc: u32, period: u32) {
        // Ensure timer is disabled.
        write_reg!(tim3, self.tim, CR1, CEN: 0);
        write_reg!(tim3, self.tim, CR2, 0);

        // Prescale by provided prescaler.
        write_reg!(tim3, self.tim, PSC, psc - 1);

        // Set ARR to provided period.
        write_reg!(tim3, self.tim, ARR, period - 1);

        // Generate an update to load the prescaler, then discard its flag
        // so the first interrupt comes a full period after starting.
        write_reg!(tim3, self.tim, EGR, UG: 1);
        self.clear_uif();

        // Enable interrupt on update.
        write_reg!(tim3, self.tim, DIER, UIE: 1);
    }
}
