// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

//! peerdap-swd library
//!
//! Bit-banged ARM Serial Wire Debug (SWD) transport.
//!
//! This lets one microcontroller attach to the debug port of a peer chip over
//! two GPIOs, and read and write the peer's registers and memory without any
//! cooperation from the peer's firmware, using the
//! [ARM SWD protocol](https://developer.arm.com/documentation/ihi0031/latest/)
//!
//! It is `no_std`, fully synchronous, and requires an `alloc`
//! implementation.
//!
//! The following diagram shows the key `peerdap-swd` concepts.
//!
//! ```text
//!       Application
//! ----------------------
//!     DebugInterface      \
//! ----------------------   \
//!      SwdInterface         |--  SwdError
//! ----------------------   /
//!      SwdProtocol        /
//! ----------------------
//!   Gpio + Delay (pins)  >======================<       SWD Target
//!                          SWDIO/SWCLK/GND
//! ```
//!
//! * [`DebugInterface`] configures the MEM-AP and provides word-addressed
//!   peek and poke of the target's memory.
//! * [`SwdInterface`] is the session.  It owns the bus, brings the link up,
//!   selects multidrop targets and performs individual register accesses.
//! * [`SwdProtocol`] implements the SWD wire protocol through bit-banging.
//! * [`pins::Gpio`] and [`pins::Delay`] are the capabilities the protocol
//!   consumes.  Bind them to real hardware (see the `esp32c3` feature) or to
//!   an in-memory simulation for testing.
//!
//! Typical use:
//!
//! ```ignore
//! use peerdap_swd::{DebugInterface, SwdInterface};
//! use peerdap_swd::interface::SwdConfig;
//! use peerdap_swd::pins::SpinDelay;
//!
//! let swd = SwdInterface::init(gpio, SpinDelay, SWDIO, SWCLK, SwdConfig::default());
//! let mut debug = DebugInterface::new(swd);
//!
//! let idcode = debug.connect(None)?;
//! let idr = debug.setup_mem()?;
//! let word = debug.peek(0x2000_0000)?;
//! debug.swd_if().noop();
//! ```

#![no_std]

pub mod debug;
#[cfg(feature = "esp32c3")]
pub mod esp;
pub mod interface;
pub mod pins;
pub mod protocol;

#[doc(inline)]
pub use crate::debug::DebugInterface;
#[doc(inline)]
pub use crate::interface::SwdInterface;
#[doc(inline)]
pub use crate::protocol::SwdProtocol;
#[doc(inline)]
pub use peerdap_core::SENTINEL;

extern crate alloc;
use alloc::format;
use core::fmt;
use serde::Serialize;

/// Outcome of a single SWD transaction, as classified from the target's
/// 3-bit ACK.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Status {
    /// ACK 0b001
    Ok,
    /// ACK 0b010 - the target is busy, the request may be repeated
    Wait,
    /// ACK 0b100 - the target signalled a fault
    Fault,
    /// Any other ACK, or a read whose parity did not match its data
    ProtocolError,
}

impl Status {
    /// Decodes a raw 3-bit ACK, received LSB first.
    pub fn from_ack(ack: u8) -> Self {
        match ack {
            1 => Status::Ok,
            2 => Status::Wait,
            4 => Status::Fault,
            _ => Status::ProtocolError,
        }
    }
}

/// Core error type used by all peerdap-swd objects
///
/// Methods are provided to make it easier to handle errors, by checking if
/// either a retry or reset is required:
///
/// - [`SwdError::requires_retry()`]
/// - [`SwdError::requires_reset()`]
///
/// The engine never recovers on its own.  After any error that
/// [`SwdError::requires_reset()`], re-run [`SwdInterface::reset()`],
/// (optionally) [`SwdInterface::select_target()`],
/// [`SwdInterface::read_idcode()`] and [`DebugInterface::setup_mem()`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwdError {
    /// The target answered WAIT to a single attempt.  [`SwdInterface`]
    /// retries these internally, and reports [`SwdError::Stalled`] once it
    /// gives up.
    WaitAck,

    /// The target kept answering WAIT.  Contains the number of attempts
    /// made, which is [`interface::SwdConfig::max_wait_attempts`].
    Stalled(u32),

    /// The target reported a fault.  Sticky error flags are now set on the
    /// DP and must be cleared (setup does this via ABORT) before further AP
    /// accesses will succeed.
    FaultAck,

    /// The target did not produce a recognisable ACK.  The value received is
    /// included.  7 means SWDIO was pulled high for the whole acknowledge
    /// phase, i.e. nothing drove the line - the most common case when the
    /// link is down or a different multidrop target is selected.
    NoAck(u8),

    /// A parity error was detected while reading from the target.  The data
    /// cannot be trusted.  Frequent parity errors suggest noise on the lines
    /// or a clock that is too fast for the wiring.
    ReadParity,

    /// The API was called incorrectly, e.g. with an unaligned address.
    Api,
}

impl SwdError {
    pub(crate) fn from_ack(ack: u8) -> Result<(), SwdError> {
        match Status::from_ack(ack) {
            Status::Ok => Ok(()),
            Status::Wait => Err(SwdError::WaitAck),
            Status::Fault => Err(SwdError::FaultAck),
            Status::ProtocolError => Err(SwdError::NoAck(ack)),
        }
    }

    /// Classifies this error as the transaction [`Status`] that caused it.
    /// [`SwdError::Stalled`] maps to [`Status::Wait`], and
    /// [`SwdError::Api`] (which never reaches the wire) to
    /// [`Status::ProtocolError`].
    pub fn status(&self) -> Status {
        match self {
            SwdError::WaitAck | SwdError::Stalled(_) => Status::Wait,
            SwdError::FaultAck => Status::Fault,
            SwdError::NoAck(_) | SwdError::ReadParity | SwdError::Api => Status::ProtocolError,
        }
    }

    /// Returns true if the error requires the link to be brought back up
    /// before further use.
    pub fn requires_reset(&self) -> bool {
        matches!(
            self,
            SwdError::NoAck(_) | SwdError::FaultAck | SwdError::ReadParity | SwdError::Stalled(_)
        )
    }

    /// Returns true if the error is a transient error that can be retried.
    pub fn requires_retry(&self) -> bool {
        matches!(self, SwdError::WaitAck)
    }

    /// Returns a string representation of the error.
    pub fn as_str(&self) -> &'static str {
        match self {
            SwdError::WaitAck => "Wait ACK",
            SwdError::Stalled(_) => "Stalled",
            SwdError::FaultAck => "Fault ACK",
            SwdError::NoAck(_) => "No ACK",
            SwdError::ReadParity => "Read Parity Error",
            SwdError::Api => "API Error",
        }
    }
}

impl Serialize for SwdError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("SwdError", 2)?;

        let kind = match self {
            SwdError::WaitAck => "wait ack",
            SwdError::Stalled(_) => "stalled",
            SwdError::FaultAck => "fault ack",
            SwdError::NoAck(_) => "no ack",
            SwdError::ReadParity => "read parity",
            SwdError::Api => "api error",
        };
        state.serialize_field("kind", kind)?;

        let detail = match self {
            SwdError::NoAck(code) => format!("{code}"),
            SwdError::Stalled(attempts) => format!("{attempts} attempts"),
            _ => alloc::string::String::new(),
        };
        state.serialize_field("detail", &detail)?;
        state.end()
    }
}

impl fmt::Display for SwdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SwdError::NoAck(ack) => write!(f, "{}: {ack}", self.as_str()),
            SwdError::Stalled(attempts) => write!(f, "{}: {attempts} attempts", self.as_str()),
            _ => write!(f, "{}", self.as_str()),
        }
    }
}

/// Collapses a failed read to [`SENTINEL`].
///
/// ```ignore
/// use peerdap_swd::OrSentinel;
/// let value = swd.get_reg(Reg::DP4).or_sentinel();
/// ```
pub trait OrSentinel {
    fn or_sentinel(self) -> u32;
}

impl<T, E> OrSentinel for Result<T, E>
where
    T: Into<u32>,
{
    fn or_sentinel(self) -> u32 {
        self.map(Into::into).unwrap_or(SENTINEL)
    }
}
