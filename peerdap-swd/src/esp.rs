// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

//! ESP32-C3 bindings for the [`Gpio`] and [`Delay`] capabilities.
//!
//! ```ignore
//! use peerdap_swd::DebugInterface;
//! use peerdap_swd::esp::{EspGpio, RiscvDelay, SwdLine};
//! use peerdap_swd::interface::SwdConfig;
//!
//! let peripherals = esp_hal::init(config);
//! let gpio = EspGpio::new(peripherals.GPIO0, peripherals.GPIO1);
//! let mut debug = DebugInterface::init(
//!     gpio,
//!     RiscvDelay,
//!     SwdLine::Swdio,
//!     SwdLine::Swclk,
//!     SwdConfig::default(),
//! );
//! ```

use esp_hal::gpio::{
    DriveMode, DriveStrength, Flex, InputConfig, InputPin, OutputConfig, OutputPin, Pull,
};
#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};

use crate::pins::{Delay, Direction, Gpio, Level};

/// Identifies one of the two lines owned by [`EspGpio`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwdLine {
    Swdio,
    Swclk,
}

/// The SWDIO and SWCLK GPIOs, as flexible input/output pins.
#[derive(Debug)]
pub struct EspGpio<'a> {
    swdio: Flex<'a>,
    swclk: Flex<'a>,
}

impl<'a> EspGpio<'a> {
    /// Arguments:
    /// - `swdio_pin`: The pin to use for SWDIO.
    /// - `swclk_pin`: The pin to use for SWCLK.
    ///
    /// Both pins are left as inputs until [`Gpio::set_direction()`].
    pub fn new(
        swdio_pin: impl InputPin + OutputPin + 'a,
        swclk_pin: impl InputPin + OutputPin + 'a,
    ) -> Self {
        Self {
            swdio: Flex::new(swdio_pin),
            swclk: Flex::new(swclk_pin),
        }
    }

    fn pin(&mut self, line: SwdLine) -> &mut Flex<'a> {
        match line {
            SwdLine::Swdio => &mut self.swdio,
            SwdLine::Swclk => &mut self.swclk,
        }
    }
}

impl<'a> Gpio for EspGpio<'a> {
    type Pin = SwdLine;

    fn init(&mut self, pin: SwdLine) {
        let output_config = OutputConfig::default()
            .with_drive_strength(DriveStrength::_20mA)
            .with_drive_mode(DriveMode::PushPull);
        let flex = self.pin(pin);
        flex.apply_output_config(&output_config);
        flex.set_output_enable(false);
        flex.set_input_enable(true);
        trace!("Info:  {pin:?} claimed");
    }

    fn set_direction(&mut self, pin: SwdLine, direction: Direction) {
        let flex = self.pin(pin);
        match direction {
            Direction::Input => {
                flex.set_output_enable(false);
                flex.set_input_enable(true);
            }
            Direction::Output => {
                flex.set_input_enable(false);
                flex.set_output_enable(true);
            }
        }
    }

    fn set_pull(&mut self, pin: SwdLine, up: bool, down: bool) {
        let pull = match (up, down) {
            (true, _) => Pull::Up,
            (false, true) => Pull::Down,
            (false, false) => Pull::None,
        };
        self.pin(pin)
            .apply_input_config(&InputConfig::default().with_pull(pull));
    }

    #[inline]
    fn write(&mut self, pin: SwdLine, level: Level) {
        let flex = self.pin(pin);
        match level {
            Level::High => flex.set_high(),
            Level::Low => flex.set_low(),
        }
    }

    #[inline]
    fn read(&mut self, pin: SwdLine) -> Level {
        Level::from(self.pin(pin).is_high())
    }
}

/// Cycle accurate busy-wait using the RISC-V core.
#[derive(Debug, Default, Clone, Copy)]
pub struct RiscvDelay;

impl Delay for RiscvDelay {
    #[inline]
    fn delay_cycles(&mut self, cycles: u32) {
        if cycles > 0 {
            riscv::asm::delay(cycles);
        }
    }
}
