// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

//! ARM SWD Wire Protocol Implementation
//!
//! This module implements the bit level of the SWD protocol: driving and
//! sampling SWDIO against SWCLK, line turnaround, and the fixed link
//! sequences (line reset, dormant wake).  Transactions are built on top of
//! this by [`crate::SwdInterface`].
//!
//! SWCLK idles high.  Each clock tick drives SWCLK low, waits a half-period,
//! drives it high and waits another half-period.  The target samples SWDIO
//! on the rising edge, and we sample SWDIO just before we generate the
//! falling edge.

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};

use crate::pins::{Delay, Direction, Gpio, Level};
use peerdap_core::arm::Reg;
use peerdap_core::arm::dp::TargetSelRegister;
use peerdap_core::arm::register::DpRegister;

// 50+ clock cycles with SWDIO high, followed by 2+ cycles low.  Sent as two
// words, the second ending in 8 low bits.
const LINE_RESET_SEQUENCE: [u32; 2] = [0xFFFF_FFFF, 0x00FF_FFFF];

// 8 cycles with SWDIO high to begin exiting dormant mode
const DORMANT_EXIT_PREAMBLE: u32 = 0xFF;

const SELECTION_ALERT_SEQUENCE: [u32; 4] = [0x6209_F392, 0x8685_2D95, 0xE3DD_AFE9, 0x19BC_0EA2];

// 4 cycles with SWDIO low, then the SWD activation code 0x1A (LSB first),
// then 4 cycles high.
const SWD_ACTIVATION_SEQUENCE: u32 = 0xF1A0;

/// Idle pad after a link sequence or a complete transaction.
pub(crate) const POST_SEQUENCE_IDLE: u32 = 8;

/// Request frame for a DP write of TARGETSEL (DP 0xC), 0x99.
pub const TARGETSEL_REQUEST: u8 = request(TargetSelRegister::REG, false);

/// SWD protocol speed setting.
///
/// The clock frequency achieved depends on the CPU clock and how long a GPIO
/// write takes on the platform, so the kHz values are approximate, measured
/// on a 160MHz ESP32-C3.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Speed {
    /// Aims to be roughly 250kHz clock
    Slow,

    /// Aims to be roughly 500kHz clock
    Medium,

    /// Aims to be roughly 1MHz clock
    #[default]
    Fast,

    /// As fast as the GPIOs can be toggled
    Turbo,
}

impl Speed {
    /// Returns the **approximate** speed in kHz for this SWD speed setting.
    pub fn speed_khz(&self) -> u32 {
        match self {
            Speed::Slow => 250,
            Speed::Medium => 500,
            Speed::Fast => 1000,
            Speed::Turbo => 4000,
        }
    }

    /// Busy-wait cycles for each SWCLK half-period.
    pub fn delay_cycles(&self) -> u32 {
        match self {
            Speed::Slow => 100,
            Speed::Medium => 50,
            Speed::Fast => 25,
            Speed::Turbo => 0,
        }
    }
}

/// SWD Protocol object
///
/// This is used by [`crate::SwdInterface`] to communicate with the target.
/// Applications should normally use [`crate::DebugInterface`] or
/// [`crate::SwdInterface`] instead, but the bit-level methods are public for
/// anyone needing to send custom sequences.
///
/// Owns the [`Gpio`] and [`Delay`] capabilities until [`Self::release()`].
pub struct SwdProtocol<G: Gpio, D: Delay> {
    gpio: G,
    delay: D,
    swdio: G::Pin,
    swclk: G::Pin,
    direction: Direction,
    speed: Speed,
    half_period: u32,
    idle_padding: bool,
}

impl<G: Gpio, D: Delay> SwdProtocol<G, D> {
    /// Create a new SWD protocol instance, taking control of the pins.
    ///
    /// SWDIO becomes an output driven low, with the pull-up enabled so the
    /// line reads high whenever nobody drives it.  SWCLK becomes an output
    /// idling high.  Levels are set before directions so neither line
    /// glitches as it becomes an output.
    pub fn new(
        mut gpio: G,
        delay: D,
        swdio: G::Pin,
        swclk: G::Pin,
        speed: Speed,
        idle_padding: bool,
    ) -> Self {
        gpio.init(swdio);
        gpio.init(swclk);

        gpio.set_pull(swdio, true, false);
        gpio.write(swdio, Level::Low);
        gpio.set_direction(swdio, Direction::Output);

        gpio.write(swclk, Level::High);
        gpio.set_direction(swclk, Direction::Output);

        debug!("SWD pins claimed, SWDIO {swdio:?} output low, SWCLK {swclk:?} output high");

        Self {
            gpio,
            delay,
            swdio,
            swclk,
            direction: Direction::Output,
            speed,
            half_period: speed.delay_cycles(),
            idle_padding,
        }
    }

    /// Releases both pins to inputs and hands back the capabilities.
    pub fn release(mut self) -> (G, D) {
        self.gpio.set_direction(self.swdio, Direction::Input);
        self.gpio.set_direction(self.swclk, Direction::Input);
        debug!("SWD pins released");
        (self.gpio, self.delay)
    }

    pub fn speed(&self) -> Speed {
        self.speed
    }

    pub fn set_speed(&mut self, speed: Speed) {
        self.speed = speed;
        self.half_period = speed.delay_cycles();
        debug!("SWD speed set to {speed:?}");
    }

    pub fn idle_padding(&self) -> bool {
        self.idle_padding
    }

    pub fn set_idle_padding(&mut self, enabled: bool) {
        self.idle_padding = enabled;
    }

    /// Current SWDIO direction.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Generates `cycles` SWCLK ticks without touching SWDIO.
    #[inline]
    pub fn clock(&mut self, cycles: u32) {
        for _ in 0..cycles {
            self.gpio.write(self.swclk, Level::Low);
            self.delay.delay_cycles(self.half_period);
            self.gpio.write(self.swclk, Level::High);
            self.delay.delay_cycles(self.half_period);
        }
    }

    /// Pads the bus with `ticks` clock periods of silence, when idle padding
    /// is enabled.  No line changes, so the target sees nothing.  Makes the
    /// phases of each transaction easy to pick out on a logic analyzer.
    #[inline]
    pub fn idle(&mut self, ticks: u32) {
        if !self.idle_padding {
            return;
        }
        for _ in 0..ticks {
            self.delay.delay_cycles(self.half_period);
            self.delay.delay_cycles(self.half_period);
        }
    }

    /// Shifts out the `count` least significant bits of `data`, LSB first,
    /// then leaves SWDIO low.  At most 32 bits are sent.
    #[inline]
    pub fn write(&mut self, data: u32, count: u32) {
        let count = count.min(32);
        trace!("Info:  Writing {count} bits: 0x{data:0X}");
        let mut data = data;
        for _ in 0..count {
            self.gpio.write(self.swdio, Level::from(data & 1 == 1));
            self.clock(1);
            data >>= 1;
        }
        self.gpio.write(self.swdio, Level::Low);
    }

    /// Samples `count` bits from SWDIO, LSB first.  At most 32 bits are
    /// clocked in.
    #[inline]
    pub fn read(&mut self, count: u32) -> u32 {
        let count = count.min(32);
        let mut data = 0u32;
        for ii in 0..count {
            // Sample before the clock, as the target presents the next bit
            // on the rising edge.
            if bool::from(self.gpio.read(self.swdio)) {
                data |= 1 << ii;
            }
            self.clock(1);
        }
        data
    }

    /// Turnaround.  Handing the line to the target releases SWDIO before the
    /// turnaround tick; taking it back drives SWDIO after the tick.
    pub fn turn(&mut self, direction: Direction) {
        match direction {
            Direction::Output => {
                self.clock(1);
                self.gpio.set_direction(self.swdio, Direction::Output);
            }
            Direction::Input => {
                self.gpio.set_direction(self.swdio, Direction::Input);
                self.clock(1);
            }
        }
        self.direction = direction;
    }

    /// Sends a line reset: 56 cycles high then 8 low.
    pub fn line_reset(&mut self) {
        for &word in LINE_RESET_SEQUENCE.iter() {
            self.write(word, 32);
        }
        self.idle(POST_SEQUENCE_IDLE);
    }

    /// Wakes an SWD target from dormant state: the 8 high cycles, Selection
    /// Alert, and SWD activation code.  Each stage is followed by an idle
    /// pad.  Must be followed by a line reset.
    pub fn dormant_to_swd(&mut self) {
        self.write(DORMANT_EXIT_PREAMBLE, 8);
        self.idle(POST_SEQUENCE_IDLE);

        for &word in SELECTION_ALERT_SEQUENCE.iter() {
            self.write(word, 32);
        }
        self.idle(POST_SEQUENCE_IDLE);

        self.write(SWD_ACTIVATION_SEQUENCE, 16);
        self.idle(POST_SEQUENCE_IDLE);
    }
}

/// Builds the 8-bit request frame for an access to `reg`.
///
/// ```text
/// Bit 0: Start (1)
/// Bit 1: APnDP
/// Bit 2: RnW
/// Bit 3: A2
/// Bit 4: A3
/// Bit 5: Parity over bits 1-4
/// Bit 6: Stop (0)
/// Bit 7: Park (1)
/// ```
pub const fn request(reg: Reg, read: bool) -> u8 {
    const START: u8 = 1 << 0;
    const RNW: u8 = 1 << 2;
    const PARITY: u8 = 1 << 5;
    const PARK: u8 = 1 << 7;

    let mut frame = START | reg.bits() | PARK;
    if read {
        frame |= RNW;
    }
    if ((frame >> 1) & 0xF).count_ones() % 2 == 1 {
        frame |= PARITY;
    }
    frame
}

/// Calculate SWD parity - 1 for an odd number of bits set to 1, 0 otherwise.
pub fn calculate_parity<T>(value: T) -> bool
where
    T: Into<u64>,
{
    (value.into().count_ones() % 2) == 1
}
