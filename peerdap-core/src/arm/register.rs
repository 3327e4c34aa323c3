// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

//! ARM SWD Register Access Traits
//!
//! These are used to ensure strongly typed access to reading and writing SWD
//! registers, using
//!
//! * `peerdap_swd::interface::SwdInterface::read_dp_register`
//! * `peerdap_swd::interface::SwdInterface::read_ap_register`
//! * `peerdap_swd::interface::SwdInterface::write_dp_register`
//! * `peerdap_swd::interface::SwdInterface::write_ap_register`
//!
//! [`Reg`] is the untyped equivalent, used by
//! `peerdap_swd::interface::SwdInterface::get_reg` and `set_reg`.

use core::fmt;
use static_assertions::const_assert_eq;

/// A DP or AP register address, as it appears in an SWD request frame.
///
/// Only 4 registers of each port are addressable at once - the active bank is
/// chosen by the DP SELECT register.  The value is pre-positioned for the
/// request frame:
///
/// ```text
/// Bit 1: APnDP (0=DP, 1=AP)
/// Bit 3: A2
/// Bit 4: A3
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Reg(u8);

impl Reg {
    const APNDP: u8 = 1 << 1;
    const ADDR_MASK: u8 = 0b11 << 3;

    pub const DP0: Reg = Reg::dp(0x0);
    pub const DP4: Reg = Reg::dp(0x4);
    pub const DP8: Reg = Reg::dp(0x8);
    pub const DPC: Reg = Reg::dp(0xC);
    pub const AP0: Reg = Reg::ap(0x0);
    pub const AP4: Reg = Reg::ap(0x4);
    pub const AP8: Reg = Reg::ap(0x8);
    pub const APC: Reg = Reg::ap(0xC);

    /// All eight addressable registers, DP first.
    pub const ALL: [Reg; 8] = [
        Reg::DP0,
        Reg::DP4,
        Reg::DP8,
        Reg::DPC,
        Reg::AP0,
        Reg::AP4,
        Reg::AP8,
        Reg::APC,
    ];

    /// Debug Port register at byte address `addr`.  Only A[3:2] are kept, so
    /// banked addresses (e.g. 0x24) map onto their in-bank offset.
    pub const fn dp(addr: u8) -> Self {
        Reg((addr & 0x0C) << 1)
    }

    /// Access Port register at byte address `addr`.  Only A[3:2] are kept, so
    /// banked addresses (e.g. 0xFC for IDR) map onto their in-bank offset.
    pub const fn ap(addr: u8) -> Self {
        Reg(((addr & 0x0C) << 1) | Self::APNDP)
    }

    /// Whether this is an Access Port register.
    pub const fn is_ap(&self) -> bool {
        self.0 & Self::APNDP != 0
    }

    /// In-bank byte offset: 0x0, 0x4, 0x8 or 0xC.
    pub const fn offset(&self) -> u8 {
        (self.0 & Self::ADDR_MASK) >> 1
    }

    /// Raw request frame bits (APnDP and A[3:2]).
    pub const fn bits(&self) -> u8 {
        self.0
    }
}

impl fmt::Display for Reg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let port = if self.is_ap() { "AP" } else { "DP" };
        write!(f, "{port} 0x{:X}", self.offset())
    }
}

const_assert_eq!(Reg::DP0.bits(), 0x00);
const_assert_eq!(Reg::DP4.bits(), 0x08);
const_assert_eq!(Reg::DP8.bits(), 0x10);
const_assert_eq!(Reg::DPC.bits(), 0x18);
const_assert_eq!(Reg::AP0.bits(), 0x02);
const_assert_eq!(Reg::APC.bits(), 0x1A);

/// Base trait for all ARM debug register descriptors
pub trait RegisterDescriptor {
    const ADDRESS: u8;
    type Value;
}

/// Registers that can be read
pub trait ReadableRegister: RegisterDescriptor {
    /// Convert raw 32-bit data to register value
    fn from_raw(data: u32) -> Self::Value
    where
        Self::Value: From<u32>,
    {
        Self::Value::from(data)
    }
}

/// Registers that can be written
pub trait WritableRegister: RegisterDescriptor {
    /// Convert register value to raw 32-bit data
    fn to_raw(value: Self::Value) -> u32
    where
        Self::Value: Into<u32>,
    {
        value.into()
    }
}

/// Debug Port registers (accessed via DP operations)
pub trait DpRegister: RegisterDescriptor {
    const REG: Reg = Reg::dp(Self::ADDRESS);
}

/// Access Port registers (accessed via AP operations)
pub trait ApRegister: RegisterDescriptor {
    const REG: Reg = Reg::ap(Self::ADDRESS);
}

/// Generate a read-only register data type
#[macro_export]
macro_rules! register_data_r {
    ($name:ident) => {
        impl From<$name> for u32 {
            fn from(value: $name) -> u32 {
                value.0
            }
        }

        impl From<u32> for $name {
            fn from(value: u32) -> Self {
                $name(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "0x{:08X}", self.0)
            }
        }
    };
}

/// Generate a read-write register data type
#[macro_export]
macro_rules! register_data_rw {
    ($name:ident) => {
        $crate::register_data_r!($name);
    };
}

/// Generate a write-only register data type
#[macro_export]
macro_rules! register_data_w {
    ($name:ident) => {
        impl From<$name> for u32 {
            fn from(value: $name) -> u32 {
                value.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "0x{:08X}", self.0)
            }
        }
    };
}
