// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

//! ARM Memory Access Port Registers

use crate::arm::register::{ApRegister, ReadableRegister, RegisterDescriptor, WritableRegister};
use crate::register_data_rw;
use alloc::{format, string::String};
use core::fmt;

/// Control/Status Word Register descriptor (read-write)
pub struct CswRegister;

impl RegisterDescriptor for CswRegister {
    const ADDRESS: u8 = 0x00;
    type Value = Csw;
}

impl ReadableRegister for CswRegister {}
impl WritableRegister for CswRegister {}
impl ApRegister for CswRegister {}

/// Control/Status Word register data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Csw(u32);

// Standard register data impls
register_data_rw!(Csw);

impl Csw {
    const SIZE_MASK: u32 = 0b111;
    const SIZE_SHIFT: u32 = 0;

    const ADDRINC_MASK: u32 = 0b11;
    const ADDRINC_SHIFT: u32 = 4;

    const DEVICE_EN: u32 = 1 << 6;

    const DBG_SW_ENABLE: u32 = 1 << 31;

    // Size values
    pub const SIZE_8BIT: u32 = 0b000;
    pub const SIZE_16BIT: u32 = 0b001;
    pub const SIZE_32BIT: u32 = 0b010;

    // Address increment values
    pub const ADDRINC_OFF: u32 = 0b00;
    pub const ADDRINC_SINGLE: u32 = 0b01;
    pub const ADDRINC_PACKED: u32 = 0b10;

    /// 32-bit transfers with single auto-increment, device enabled and debug
    /// software access enabled.  0x8000_0052.
    pub const fn auto_increment_32bit() -> Self {
        Csw(Self::DBG_SW_ENABLE
            | Self::DEVICE_EN
            | (Self::ADDRINC_SINGLE << Self::ADDRINC_SHIFT)
            | (Self::SIZE_32BIT << Self::SIZE_SHIFT))
    }

    /// Get raw register value
    pub fn value(&self) -> u32 {
        self.0
    }

    /// Get size field
    pub fn size(&self) -> u32 {
        (self.0 >> Self::SIZE_SHIFT) & Self::SIZE_MASK
    }

    /// Get address increment field
    pub fn addrinc(&self) -> u32 {
        (self.0 >> Self::ADDRINC_SHIFT) & Self::ADDRINC_MASK
    }

    /// Get device enable flag
    pub fn device_en(&self) -> bool {
        self.0 & Self::DEVICE_EN != 0
    }

    /// Get debug software enable flag
    pub fn dbg_sw_enable(&self) -> bool {
        self.0 & Self::DBG_SW_ENABLE != 0
    }

    /// Get transfer configuration description
    pub fn transfer_config(&self) -> String {
        let size = match self.size() {
            Self::SIZE_8BIT => "8-bit",
            Self::SIZE_16BIT => "16-bit",
            Self::SIZE_32BIT => "32-bit",
            _ => "Other",
        };

        let addrinc = match self.addrinc() {
            Self::ADDRINC_OFF => "Off",
            Self::ADDRINC_SINGLE => "Single",
            Self::ADDRINC_PACKED => "Packed",
            _ => "Reserved",
        };

        format!("Size: {size}, AddrInc: {addrinc}")
    }
}

impl Default for Csw {
    fn default() -> Self {
        Self::auto_increment_32bit()
    }
}

/// Transfer Address Register descriptor (read-write)
pub struct TarRegister;

impl RegisterDescriptor for TarRegister {
    const ADDRESS: u8 = 0x04;
    type Value = Tar;
}

impl ReadableRegister for TarRegister {}
impl WritableRegister for TarRegister {}
impl ApRegister for TarRegister {}

/// Transfer Address Register data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Tar(u32);

// Standard register data impls
register_data_rw!(Tar);

impl Tar {
    /// Get target address
    pub fn target_address(&self) -> u32 {
        self.0
    }
}

/// Data Read/Write Register descriptor (read-write)
///
/// Each access transfers one word at TAR, then auto-increments TAR if CSW
/// asks for it.
pub struct DrwRegister;

impl RegisterDescriptor for DrwRegister {
    const ADDRESS: u8 = 0x0C;
    type Value = Drw;
}

impl ReadableRegister for DrwRegister {}
impl WritableRegister for DrwRegister {}
impl ApRegister for DrwRegister {}

/// Data Read/Write Register data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Drw(u32);

// Standard register data impls
register_data_rw!(Drw);

impl Drw {
    /// Get data value
    pub fn data(&self) -> u32 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arm::Reg;
    use pretty_assertions::assert_eq;

    #[test]
    fn csw_setup_word() {
        let csw = Csw::auto_increment_32bit();
        assert_eq!(csw.value(), 0x8000_0052);
        assert_eq!(csw.addrinc(), Csw::ADDRINC_SINGLE);
        assert_eq!(csw.size(), Csw::SIZE_32BIT);
        assert!(csw.device_en());
        assert!(csw.dbg_sw_enable());
        assert_eq!(csw.transfer_config(), "Size: 32-bit, AddrInc: Single");
    }

    #[test]
    fn mem_ap_register_addresses() {
        assert_eq!(<CswRegister as ApRegister>::REG, Reg::AP0);
        assert_eq!(<TarRegister as ApRegister>::REG, Reg::AP4);
        assert_eq!(<DrwRegister as ApRegister>::REG, Reg::APC);
    }
}
