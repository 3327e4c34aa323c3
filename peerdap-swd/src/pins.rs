// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

//! GPIO and delay capabilities consumed by [`crate::SwdProtocol`].
//!
//! The protocol never touches hardware directly.  Instead it is handed
//! something implementing [`Gpio`], which it drives through the two pin
//! identifiers it was given, and something implementing [`Delay`] to time
//! each clock half-period.
//!
//! With the `esp32c3` feature, [`crate::esp`] provides implementations for
//! that chip.  Tests provide an in-memory implementation that records every
//! clock edge.

use core::fmt;

/// Direction of a GPIO line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// High impedance, sampled by [`Gpio::read()`]
    Input,
    /// Driven with the level last passed to [`Gpio::write()`]
    Output,
}

/// Logic level of a GPIO line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Low,
    High,
}

impl From<bool> for Level {
    fn from(value: bool) -> Self {
        if value { Level::High } else { Level::Low }
    }
}

impl From<Level> for bool {
    fn from(value: Level) -> Self {
        value == Level::High
    }
}

/// GPIO capability.
///
/// Pins are addressed by `Pin`, which is whatever identifies a line on the
/// implementing platform.
pub trait Gpio {
    type Pin: Copy + fmt::Debug;

    /// Claim the pin for GPIO use.
    fn init(&mut self, pin: Self::Pin);

    fn set_direction(&mut self, pin: Self::Pin, direction: Direction);

    /// Enable or disable the internal pull-up and pull-down resistors.
    fn set_pull(&mut self, pin: Self::Pin, up: bool, down: bool);

    /// Set the output level.  May be called while the pin is an input, in
    /// which case the level takes effect when the pin becomes an output.
    fn write(&mut self, pin: Self::Pin, level: Level);

    fn read(&mut self, pin: Self::Pin) -> Level;
}

/// Busy-wait capability used to time SWCLK half-periods.
pub trait Delay {
    /// Wait for roughly `cycles` CPU cycles.  0 must return immediately.
    fn delay_cycles(&mut self, cycles: u32);
}

/// Portable busy loop, one spin-loop hint per cycle.
#[derive(Debug, Default, Clone, Copy)]
pub struct SpinDelay;

impl Delay for SpinDelay {
    #[inline]
    fn delay_cycles(&mut self, cycles: u32) {
        for _ in 0..cycles {
            core::hint::spin_loop();
        }
    }
}

/// Delay that doesn't.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoDelay;

impl Delay for NoDelay {
    #[inline]
    fn delay_cycles(&mut self, _cycles: u32) {}
}
